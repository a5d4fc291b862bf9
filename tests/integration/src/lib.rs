//! Fixtures for end-to-end client runs without a live peer.
//!
//! [`FakeConnector`] hands out [`FakeGateway`] sessions that answer from a
//! script and count how often they were opened and closed. [`CryptoFixture`]
//! lays out an MSP directory tree with a freshly generated key.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ledger_core::config::Environment;
use ledger_core::{
    Connector, Credentials, Gateway, GatewayError, Mode, PeerTarget, TimeoutPolicy,
    TransactionCall,
};
use p256::pkcs8::{EncodePrivateKey, LineEnding};

/// A call the fake gateway received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub mode: Mode,
    pub channel: String,
    pub contract: String,
    pub function: String,
    pub args: Vec<String>,
}

#[derive(Default)]
struct Shared {
    responses: HashMap<String, Result<Vec<u8>, String>>,
    calls: Mutex<Vec<RecordedCall>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    refuse_connection: bool,
    connected_to: Mutex<Option<PeerTarget>>,
}

/// Scripted stand-in for a peer.
#[derive(Clone, Default)]
pub struct FakeConnector {
    shared: Arc<Shared>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `function` with `body`.
    pub fn respond(mut self, function: &str, body: impl AsRef<[u8]>) -> Self {
        self.shared_mut()
            .responses
            .insert(function.to_string(), Ok(body.as_ref().to_vec()));
        self
    }

    /// Reject `function` with an endorsement error carrying `message`.
    pub fn fail(mut self, function: &str, message: &str) -> Self {
        self.shared_mut()
            .responses
            .insert(function.to_string(), Err(message.to_string()));
        self
    }

    /// Fail every connection attempt.
    pub fn unreachable(mut self) -> Self {
        self.shared_mut().refuse_connection = true;
        self
    }

    pub fn opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.shared.calls.lock().unwrap().clone()
    }

    pub fn connected_to(&self) -> Option<PeerTarget> {
        self.shared.connected_to.lock().unwrap().clone()
    }

    fn shared_mut(&mut self) -> &mut Shared {
        Arc::get_mut(&mut self.shared).expect("script is built before the connector is shared")
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Gateway = FakeGateway;

    async fn connect(
        &self,
        target: &PeerTarget,
        _credentials: Credentials,
        _timeouts: TimeoutPolicy,
    ) -> Result<FakeGateway, GatewayError> {
        if self.shared.refuse_connection {
            return Err(GatewayError::Transport(format!(
                "{}: connection refused",
                target.endpoint
            )));
        }
        *self.shared.connected_to.lock().unwrap() = Some(target.clone());
        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakeGateway {
            shared: Arc::clone(&self.shared),
        })
    }
}

pub struct FakeGateway {
    shared: Arc<Shared>,
}

impl FakeGateway {
    fn answer(&self, mode: Mode, call: TransactionCall<'_>) -> Result<Vec<u8>, GatewayError> {
        self.shared.calls.lock().unwrap().push(RecordedCall {
            mode,
            channel: call.channel.to_string(),
            contract: call.contract.to_string(),
            function: call.function.to_string(),
            args: call.args.to_vec(),
        });

        let operation = match mode {
            Mode::Evaluate => "Evaluate",
            Mode::Submit => "Endorse",
        };
        match self.shared.responses.get(call.function) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(message)) => Err(GatewayError::Status {
                operation,
                code: "Aborted".into(),
                message: message.clone(),
            }),
            None => Err(GatewayError::Status {
                operation,
                code: "Unknown".into(),
                message: format!("function {} not found", call.function),
            }),
        }
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn evaluate(&self, call: TransactionCall<'_>) -> Result<Vec<u8>, GatewayError> {
        self.answer(Mode::Evaluate, call)
    }

    async fn submit(&self, call: TransactionCall<'_>) -> Result<Vec<u8>, GatewayError> {
        self.answer(Mode::Submit, call)
    }

    fn close(self) {
        self.shared.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// An organization crypto directory in a temporary location.
pub struct CryptoFixture {
    dir: tempfile::TempDir,
}

impl CryptoFixture {
    /// Lay out keystore, signing certificate and peer TLS root.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let msp = dir.path().join("users/User1@org1.example.com/msp");

        let key = p256::ecdsa::SigningKey::random(&mut rand::rngs::OsRng);
        let pem = key.to_pkcs8_pem(LineEnding::LF).unwrap();
        write(&msp.join("keystore/priv_sk"), pem.as_bytes());
        write(
            &msp.join("signcerts/cert.pem"),
            b"-----BEGIN CERTIFICATE-----\nY2xpZW50\n-----END CERTIFICATE-----\n",
        );
        write(
            &dir.path().join("peers/peer0.org1.example.com/tls/ca.crt"),
            b"-----BEGIN CERTIFICATE-----\nY2E=\n-----END CERTIFICATE-----\n",
        );
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Environment pointing `CRYPTO_PATH` at this fixture.
    pub fn env(&self) -> Environment {
        let mut env = Environment::new();
        env.insert(
            "CRYPTO_PATH".into(),
            self.path().to_string_lossy().into_owned(),
        );
        env
    }

    pub fn key_directory(&self) -> PathBuf {
        self.path().join("users/User1@org1.example.com/msp/keystore")
    }
}

impl Default for CryptoFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn write(path: &Path, contents: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Positional arguments as the command line would pass them.
pub fn positional(args: &[&str]) -> Vec<String> {
    args.iter().map(|arg| arg.to_string()).collect()
}
