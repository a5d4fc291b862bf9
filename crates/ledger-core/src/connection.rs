//! Lifetime of the single gateway connection of a run.

use crate::config::TimeoutPolicy;
use crate::credentials::Credentials;
use crate::error::GatewayError;
use crate::gateway::{Connector, Gateway, Network, PeerTarget};

/// Owns an open gateway session.
///
/// The session is released exactly once: either by [`Connection::close`] or,
/// on any early return or panic, when the connection is dropped.
pub struct Connection<G: Gateway> {
    gateway: Option<G>,
    endpoint: String,
}

impl<G: Gateway> Connection<G> {
    /// Open the transport and the gateway session on top of it.
    pub async fn open<C>(
        connector: &C,
        target: &PeerTarget,
        credentials: Credentials,
        timeouts: TimeoutPolicy,
    ) -> Result<Self, GatewayError>
    where
        C: Connector<Gateway = G>,
    {
        tracing::info!(
            endpoint = %target.endpoint,
            host_alias = %target.host_alias,
            "opening gateway connection"
        );
        let gateway = connector.connect(target, credentials, timeouts).await?;
        Ok(Self {
            gateway: Some(gateway),
            endpoint: target.endpoint.clone(),
        })
    }

    /// Address a channel through this connection.
    pub fn network(&self, channel: &str) -> Network<'_, G> {
        let gateway = self
            .gateway
            .as_ref()
            .expect("gateway is present until the connection is released");
        Network::new(gateway, channel)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Release the session now.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(gateway) = self.gateway.take() {
            gateway.close();
            tracing::info!(endpoint = %self.endpoint, "gateway connection closed");
        }
    }
}

impl<G: Gateway> Drop for Connection<G> {
    fn drop(&mut self) {
        self.release();
    }
}
