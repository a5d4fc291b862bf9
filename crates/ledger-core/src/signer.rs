//! ECDSA P-256 transaction signer bound to the caller's private key.

use std::fmt;
use std::path::{Path, PathBuf};

use p256::ecdsa::signature::Signer as _;
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::DecodePrivateKey;
use zeroize::Zeroizing;

use crate::error::{CredentialError, KeyFormatError};

/// Signs gateway messages with the caller's private key.
///
/// Signatures are SHA-256 digests signed with ECDSA P-256, normalized to
/// low-S and DER encoded. The key never leaves this type.
pub struct Signer {
    key: SigningKey,
}

impl Signer {
    /// Parse a PEM private key. Accepts PKCS#8 (`PRIVATE KEY`) and SEC1
    /// (`EC PRIVATE KEY`) encodings.
    pub fn from_pem(pem: &str) -> Result<Self, KeyFormatError> {
        let pkcs8 = match SigningKey::from_pkcs8_pem(pem) {
            Ok(key) => return Ok(Self { key }),
            Err(e) => e,
        };
        p256::SecretKey::from_sec1_pem(pem)
            .map(|secret| Self {
                key: SigningKey::from(secret),
            })
            .map_err(|_| KeyFormatError::new(pkcs8))
    }

    /// Load the signer from the first key file found in `dir`.
    pub async fn from_key_directory(dir: &Path) -> Result<Self, CredentialError> {
        let key_path = first_key_file(dir).await?;
        let pem = tokio::fs::read(&key_path)
            .await
            .map(Zeroizing::new)
            .map_err(|source| CredentialError::Read {
                kind: "private key",
                path: key_path.clone(),
                source,
            })?;
        let pem = std::str::from_utf8(&pem)
            .map_err(|_| CredentialError::KeyNotText(key_path.clone()))?;

        let signer = Self::from_pem(pem).map_err(|source| CredentialError::InvalidKey {
            path: key_path.clone(),
            source,
        })?;
        tracing::debug!(path = %key_path.display(), "loaded private key");
        Ok(signer)
    }

    /// Sign `message`, returning a DER-encoded low-S signature.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature: Signature = self.key.sign(message);
        let signature = signature.normalize_s().unwrap_or(signature);
        signature.to_der().as_bytes().to_vec()
    }

    /// Public half of the key, for verification.
    pub fn verifying_key(&self) -> VerifyingKey {
        *self.key.verifying_key()
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}

/// First regular file in `dir`. Directory order is whatever the OS reports.
async fn first_key_file(dir: &Path) -> Result<PathBuf, CredentialError> {
    let directory_error = |source| CredentialError::KeyDirectory {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(directory_error)?;
    while let Some(entry) = entries.next_entry().await.map_err(directory_error)? {
        let file_type = entry.file_type().await.map_err(directory_error)?;
        if !file_type.is_dir() {
            return Ok(entry.path());
        }
    }
    Err(CredentialError::EmptyKeyDirectory(dir.to_path_buf()))
}
