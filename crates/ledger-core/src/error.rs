//! Error types for the ledger client.

use std::path::PathBuf;
use std::time::Duration;

/// Invalid runtime configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: expected a positive number of seconds")]
    InvalidTimeout { key: &'static str, value: String },

    /// A recognized variable is set to something that is not valid UTF-8.
    #[error("{key} is set but its value is not valid UTF-8")]
    NotUnicode { key: &'static str },
}

/// PEM text that holds no P-256 private key.
#[derive(Debug, thiserror::Error)]
#[error("not a P-256 private key in PKCS#8 or SEC1 PEM form ({pkcs8})")]
pub struct KeyFormatError {
    pkcs8: p256::pkcs8::Error,
}

impl KeyFormatError {
    pub(crate) fn new(pkcs8: p256::pkcs8::Error) -> Self {
        Self { pkcs8 }
    }
}

/// Failures while loading local cryptographic material.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("failed to read {kind} at {path}: {source}")]
    Read {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to list private key directory {path}: {source}")]
    KeyDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("private key directory {0} contains no key file")]
    EmptyKeyDirectory(PathBuf),

    #[error("private key file {0} is not UTF-8 PEM text")]
    KeyNotText(PathBuf),

    #[error("invalid private key in {path}: {source}")]
    InvalidKey {
        path: PathBuf,
        #[source]
        source: KeyFormatError,
    },
}

/// Errors surfaced by the gateway boundary.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Could not establish or use the transport connection.
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer rejected a call.
    #[error("{operation} failed with status {code}: {message}")]
    Status {
        operation: &'static str,
        code: String,
        message: String,
    },

    /// The per-call deadline expired before the peer answered.
    #[error("{operation} did not complete within {}s", timeout.as_secs())]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// The transaction was ordered but failed validation.
    #[error("transaction {transaction_id} failed to commit with status {code}")]
    Commit { transaction_id: String, code: String },

    /// The peer answered with something that could not be decoded.
    #[error("malformed gateway response: {0}")]
    Malformed(String),
}

/// Errors raised while dispatching an invocation.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(
        "function {function} requires {required} non-empty argument(s); argument {missing} must be specified and valid"
    )]
    MissingArguments {
        function: &'static str,
        required: usize,
        missing: usize,
    },

    #[error("{transaction} failed: {source}")]
    Remote {
        transaction: &'static str,
        #[source]
        source: GatewayError,
    },

    #[error("{transaction} returned a response that is not UTF-8 JSON: {reason}")]
    Decode {
        transaction: &'static str,
        reason: String,
    },
}

/// Top-level error for one client run.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("connection error: {0}")]
    Connection(#[from] GatewayError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
