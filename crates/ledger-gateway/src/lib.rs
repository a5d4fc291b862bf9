//! Gateway connector for Hyperledger Fabric peers.
//!
//! Builds and signs transaction proposals and drives the peer's Gateway gRPC
//! service (evaluate, endorse, submit, commit status) over TLS.

pub mod client;
pub mod proposal;
pub mod proto;

pub use client::{GrpcConnector, GrpcGateway};
