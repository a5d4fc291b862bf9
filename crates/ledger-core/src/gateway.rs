//! Boundary to the ledger platform's gateway.
//!
//! A [`Connector`] opens a [`Gateway`] session against one peer. The session is
//! addressed through [`Network`] (a channel) and [`Contract`] (a chaincode on
//! that channel), which only carry names and forward to the session.

use async_trait::async_trait;

use crate::config::{Configuration, TimeoutPolicy};
use crate::credentials::Credentials;
use crate::error::GatewayError;

/// Where to connect and which name the peer's TLS certificate must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerTarget {
    pub endpoint: String,
    pub host_alias: String,
}

impl From<&Configuration> for PeerTarget {
    fn from(config: &Configuration) -> Self {
        Self {
            endpoint: config.peer_endpoint.clone(),
            host_alias: config.peer_host_alias.clone(),
        }
    }
}

/// One transaction function call, fully addressed.
#[derive(Debug, Clone, Copy)]
pub struct TransactionCall<'a> {
    pub channel: &'a str,
    pub contract: &'a str,
    pub function: &'a str,
    pub args: &'a [String],
}

/// An open gateway session layered on one transport connection.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Run a read-only query against current ledger state.
    async fn evaluate(&self, call: TransactionCall<'_>) -> Result<Vec<u8>, GatewayError>;

    /// Endorse, order and wait for commit of a state-changing transaction.
    async fn submit(&self, call: TransactionCall<'_>) -> Result<Vec<u8>, GatewayError>;

    /// Release the session and the transport beneath it.
    fn close(self)
    where
        Self: Sized;
}

/// Opens gateway sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    type Gateway: Gateway;

    async fn connect(
        &self,
        target: &PeerTarget,
        credentials: Credentials,
        timeouts: TimeoutPolicy,
    ) -> Result<Self::Gateway, GatewayError>;
}

/// A channel reachable through a gateway session.
pub struct Network<'g, G> {
    gateway: &'g G,
    name: String,
}

impl<'g, G: Gateway> Network<'g, G> {
    pub(crate) fn new(gateway: &'g G, name: &str) -> Self {
        Self {
            gateway,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contract(&self, name: &str) -> Contract<'g, G> {
        Contract {
            gateway: self.gateway,
            channel: self.name.clone(),
            name: name.to_string(),
        }
    }
}

/// A chaincode deployed on a channel.
pub struct Contract<'g, G> {
    gateway: &'g G,
    channel: String,
    name: String,
}

impl<'g, G: Gateway> Contract<'g, G> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn evaluate_transaction(
        &self,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, GatewayError> {
        tracing::debug!(
            channel = %self.channel,
            contract = %self.name,
            function,
            "evaluating transaction"
        );
        self.gateway.evaluate(self.call(function, args)).await
    }

    pub async fn submit_transaction(
        &self,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, GatewayError> {
        tracing::debug!(
            channel = %self.channel,
            contract = %self.name,
            function,
            "submitting transaction"
        );
        self.gateway.submit(self.call(function, args)).await
    }

    fn call<'a>(&'a self, function: &'a str, args: &'a [String]) -> TransactionCall<'a> {
        TransactionCall {
            channel: &self.channel,
            contract: &self.name,
            function,
            args,
        }
    }
}
