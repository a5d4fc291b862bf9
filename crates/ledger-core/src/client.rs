//! One complete client run: credentials, connection, dispatch, release.

use crate::config::{Configuration, TimeoutPolicy};
use crate::connection::Connection;
use crate::credentials::Credentials;
use crate::dispatch::{dispatch, Invocation, Outcome};
use crate::error::ClientError;
use crate::gateway::{Connector, PeerTarget};

/// Load credentials, connect through `connector`, dispatch `invocation` and
/// release the connection whatever the dispatch returned.
pub async fn run<C: Connector>(
    connector: &C,
    config: &Configuration,
    timeouts: TimeoutPolicy,
    invocation: &Invocation,
) -> Result<Outcome, ClientError> {
    let credentials = Credentials::load(config).await?;
    let connection = Connection::open(
        connector,
        &PeerTarget::from(config),
        credentials,
        timeouts,
    )
    .await?;

    let outcome = dispatch(&connection, config, invocation).await;
    connection.close();
    Ok(outcome?)
}
