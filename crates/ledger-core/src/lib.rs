//! Ledger client core.
//!
//! Resolves configuration, loads the caller's credentials, owns the lifetime of
//! the single gateway connection and dispatches one named contract operation.
//! The transport itself sits behind the [`gateway::Connector`] seam.

pub mod client;
pub mod config;
pub mod connection;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod signer;

pub use config::{Configuration, TimeoutPolicy};
pub use connection::Connection;
pub use credentials::{Credentials, Identity};
pub use dispatch::{Invocation, Mode, Operation, Outcome};
pub use error::{
    ClientError, ConfigError, CredentialError, DispatchError, GatewayError, KeyFormatError,
};
pub use gateway::{Connector, Contract, Gateway, Network, PeerTarget, TransactionCall};
pub use signer::Signer;
