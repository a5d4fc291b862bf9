//! Identity, signer and TLS root loaded from the local filesystem.

use std::path::Path;

use crate::config::Configuration;
use crate::error::CredentialError;
use crate::signer::Signer;

/// The caller's identity: MSP ID paired with its PEM certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    msp_id: String,
    credentials: Vec<u8>,
}

impl Identity {
    pub fn new(msp_id: impl Into<String>, credentials: Vec<u8>) -> Self {
        Self {
            msp_id: msp_id.into(),
            credentials,
        }
    }

    /// Read the certificate at `cert_path` and bind it to `msp_id`.
    pub async fn load(msp_id: &str, cert_path: &Path) -> Result<Self, CredentialError> {
        let credentials = read_file("certificate", cert_path).await?;
        Ok(Self::new(msp_id, credentials))
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    /// Raw certificate bytes as read from disk.
    pub fn credentials(&self) -> &[u8] {
        &self.credentials
    }
}

/// Everything needed to open an authenticated connection.
#[derive(Debug)]
pub struct Credentials {
    pub identity: Identity,
    pub signer: Signer,
    /// PEM root certificate of the peer's TLS CA.
    pub tls_root_cert: Vec<u8>,
}

impl Credentials {
    /// Load identity, signer and TLS root using the configured paths.
    pub async fn load(config: &Configuration) -> Result<Self, CredentialError> {
        let identity = Identity::load(&config.msp_id, &config.cert_path).await?;
        let signer = Signer::from_key_directory(&config.key_directory_path).await?;
        let tls_root_cert = read_file("TLS root certificate", &config.tls_cert_path).await?;

        tracing::info!(
            msp_id = %identity.msp_id(),
            cert = %config.cert_path.display(),
            "loaded client credentials"
        );
        Ok(Self {
            identity,
            signer,
            tls_root_cert,
        })
    }
}

async fn read_file(kind: &'static str, path: &Path) -> Result<Vec<u8>, CredentialError> {
    tokio::fs::read(path)
        .await
        .map_err(|source| CredentialError::Read {
            kind,
            path: path.to_path_buf(),
            source,
        })
}
