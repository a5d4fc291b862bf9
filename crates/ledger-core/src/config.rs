//! Runtime configuration resolved from the environment and positional arguments.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Environment variables as a plain map, so resolution stays a pure function.
pub type Environment = HashMap<String, String>;

pub const DEFAULT_MSP_ID: &str = "Org1MSP";
pub const DEFAULT_PEER_ENDPOINT: &str = "localhost:7051";
pub const DEFAULT_PEER_HOST_ALIAS: &str = "peer0.org1.example.com";
pub const DEFAULT_CRYPTO_PATH: &str =
    "../../test-network/organizations/peerOrganizations/org1.example.com";

const USER_MSP_DIR: [&str; 3] = ["users", "User1@org1.example.com", "msp"];

/// Variables the client reads.
pub const RECOGNIZED_KEYS: [&str; 14] = [
    "CHANNEL_NAME",
    "CHAINCODE_NAME",
    "MSP_ID",
    "CRYPTO_PATH",
    "KEY_DIRECTORY_PATH",
    "CERT_PATH",
    "TLS_CERT_PATH",
    "PEER_ENDPOINT",
    "PEER_HOST_ALIAS",
    "EVALUATE_TIMEOUT_SECS",
    "ENDORSE_TIMEOUT_SECS",
    "SUBMIT_TIMEOUT_SECS",
    "COMMIT_STATUS_TIMEOUT_SECS",
    "LOG_FORMAT",
];

/// Snapshot of the process environment.
pub fn process_env() -> Result<Environment, ConfigError> {
    environment_from(std::env::vars_os())
}

/// Collect `vars` into an [`Environment`].
///
/// A recognized variable whose value is not UTF-8 is an error, so it can never
/// silently fall back to a default. Other non-UTF-8 entries are skipped.
pub fn environment_from(
    vars: impl IntoIterator<Item = (OsString, OsString)>,
) -> Result<Environment, ConfigError> {
    let mut env = Environment::new();
    for (key, value) in vars {
        let Ok(key) = key.into_string() else {
            continue;
        };
        match value.into_string() {
            Ok(value) => {
                env.insert(key, value);
            }
            Err(_) => {
                if let Some(&known) = RECOGNIZED_KEYS.iter().find(|k| **k == key) {
                    return Err(ConfigError::NotUnicode { key: known });
                }
                tracing::debug!(%key, "skipping non-UTF-8 environment variable");
            }
        }
    }
    Ok(env)
}

/// Value of `key` when set and non-empty, otherwise `default`.
fn env_or_default(env: &Environment, key: &str, default: impl Into<String>) -> String {
    match env.get(key) {
        Some(value) if !value.is_empty() => value.clone(),
        _ => default.into(),
    }
}

fn env_or_path(env: &Environment, key: &str, default: PathBuf) -> PathBuf {
    match env.get(key) {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => default,
    }
}

/// Resolved parameters for one client run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    /// Channel the contract is deployed on.
    pub channel_name: String,
    /// Name of the deployed chaincode.
    pub chaincode_name: String,
    /// Membership service provider the caller's certificate belongs to.
    pub msp_id: String,
    /// Base directory of the organization's crypto material.
    pub crypto_path: PathBuf,
    /// Directory holding the caller's private key.
    pub key_directory_path: PathBuf,
    /// Caller's signing certificate.
    pub cert_path: PathBuf,
    /// Root certificate of the peer's TLS CA.
    pub tls_cert_path: PathBuf,
    /// `host:port` of the gateway peer.
    pub peer_endpoint: String,
    /// Name expected in the peer's TLS certificate.
    pub peer_host_alias: String,
}

impl Configuration {
    /// Resolve every setting from `env`, falling back to `positional`
    /// (index 0 channel, index 1 contract) or to the built-in defaults.
    pub fn resolve(env: &Environment, positional: &[String]) -> Self {
        let positional_or_empty = |idx: usize| positional.get(idx).cloned().unwrap_or_default();

        let crypto_path = env_or_path(env, "CRYPTO_PATH", PathBuf::from(DEFAULT_CRYPTO_PATH));
        let user_msp: PathBuf = USER_MSP_DIR.iter().collect();

        Self {
            channel_name: env_or_default(env, "CHANNEL_NAME", positional_or_empty(0)),
            chaincode_name: env_or_default(env, "CHAINCODE_NAME", positional_or_empty(1)),
            msp_id: env_or_default(env, "MSP_ID", DEFAULT_MSP_ID),
            key_directory_path: env_or_path(
                env,
                "KEY_DIRECTORY_PATH",
                crypto_path.join(&user_msp).join("keystore"),
            ),
            cert_path: env_or_path(
                env,
                "CERT_PATH",
                crypto_path.join(&user_msp).join("signcerts").join("cert.pem"),
            ),
            tls_cert_path: env_or_path(
                env,
                "TLS_CERT_PATH",
                crypto_path
                    .join("peers")
                    .join(DEFAULT_PEER_HOST_ALIAS)
                    .join("tls")
                    .join("ca.crt"),
            ),
            peer_endpoint: env_or_default(env, "PEER_ENDPOINT", DEFAULT_PEER_ENDPOINT),
            peer_host_alias: env_or_default(env, "PEER_HOST_ALIAS", DEFAULT_PEER_HOST_ALIAS),
            crypto_path,
        }
    }

    /// Name/value pairs in display order.
    pub fn parameters(&self) -> [(&'static str, String); 9] {
        [
            ("channelName", self.channel_name.clone()),
            ("chaincodeName", self.chaincode_name.clone()),
            ("mspId", self.msp_id.clone()),
            ("cryptoPath", self.crypto_path.display().to_string()),
            ("keyDirectoryPath", self.key_directory_path.display().to_string()),
            ("certPath", self.cert_path.display().to_string()),
            ("tlsCertPath", self.tls_cert_path.display().to_string()),
            ("peerEndpoint", self.peer_endpoint.clone()),
            ("peerHostAlias", self.peer_host_alias.clone()),
        ]
    }

    /// Log the resolved parameters, one per line.
    pub fn log_parameters(&self) {
        for (name, value) in self.parameters() {
            tracing::info!("{:<18} {}", format!("{name}:"), value);
        }
    }
}

/// Deadlines applied to each category of gateway call, relative to issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub evaluate: Duration,
    pub endorse: Duration,
    pub submit: Duration,
    pub commit_status: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            evaluate: Duration::from_secs(15),
            endorse: Duration::from_secs(30),
            submit: Duration::from_secs(15),
            commit_status: Duration::from_secs(60),
        }
    }
}

impl TimeoutPolicy {
    /// Defaults, overridden by `*_TIMEOUT_SECS` variables that are set and non-empty.
    pub fn from_env(env: &Environment) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            evaluate: seconds(env, "EVALUATE_TIMEOUT_SECS", defaults.evaluate)?,
            endorse: seconds(env, "ENDORSE_TIMEOUT_SECS", defaults.endorse)?,
            submit: seconds(env, "SUBMIT_TIMEOUT_SECS", defaults.submit)?,
            commit_status: seconds(env, "COMMIT_STATUS_TIMEOUT_SECS", defaults.commit_status)?,
        })
    }
}

fn seconds(
    env: &Environment,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let Some(value) = env.get(key).filter(|v| !v.is_empty()) else {
        return Ok(default);
    };
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout {
            key,
            value: value.clone(),
        }),
    }
}
