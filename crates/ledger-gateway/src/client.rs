//! gRPC connector for the peer's Gateway service.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use http::uri::PathAndQuery;
use ledger_core::{
    Connector, Credentials, Gateway, GatewayError, Identity, PeerTarget, Signer, TimeoutPolicy,
    TransactionCall,
};
use prost::Message;
use tonic::codec::ProstCodec;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};

use crate::proposal::{endorsed_result, new_proposal, serialize_identity};
use crate::proto;

const EVALUATE: &str = "/gateway.Gateway/Evaluate";
const ENDORSE: &str = "/gateway.Gateway/Endorse";
const SUBMIT: &str = "/gateway.Gateway/Submit";
const COMMIT_STATUS: &str = "/gateway.Gateway/CommitStatus";

/// Connects to a peer over TLS and opens a [`GrpcGateway`] session.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrpcConnector;

#[async_trait]
impl Connector for GrpcConnector {
    type Gateway = GrpcGateway;

    async fn connect(
        &self,
        target: &PeerTarget,
        credentials: Credentials,
        timeouts: TimeoutPolicy,
    ) -> Result<GrpcGateway, GatewayError> {
        let endpoint = tls_endpoint(target, &credentials.tls_root_cert)?;
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| GatewayError::Transport(format!("{}: {e}", target.endpoint)))?;

        tracing::debug!(endpoint = %target.endpoint, "transport connected");
        Ok(GrpcGateway::new(
            channel,
            credentials.identity,
            credentials.signer,
            timeouts,
        ))
    }
}

/// `https://` endpoint trusting `tls_root_cert` and expecting the host alias
/// as the server name.
fn tls_endpoint(target: &PeerTarget, tls_root_cert: &[u8]) -> Result<Endpoint, GatewayError> {
    let tls = ClientTlsConfig::new()
        .ca_certificate(Certificate::from_pem(tls_root_cert))
        .domain_name(target.host_alias.clone());

    Endpoint::from_shared(format!("https://{}", target.endpoint))
        .map_err(|e| {
            GatewayError::Transport(format!("invalid peer endpoint {}: {e}", target.endpoint))
        })?
        .tls_config(tls)
        .map_err(|e| GatewayError::Transport(format!("TLS configuration: {e}")))
}

/// A gateway session over one gRPC channel.
pub struct GrpcGateway {
    channel: Channel,
    signer: Signer,
    creator: Vec<u8>,
    timeouts: TimeoutPolicy,
}

impl GrpcGateway {
    pub fn new(
        channel: Channel,
        identity: Identity,
        signer: Signer,
        timeouts: TimeoutPolicy,
    ) -> Self {
        Self {
            channel,
            creator: serialize_identity(&identity),
            signer,
            timeouts,
        }
    }

    async fn unary<Req, Resp>(
        &self,
        method: &'static str,
        message: Req,
        timeout: Duration,
    ) -> Result<Resp, GatewayError>
    where
        Req: Message + Send + Sync + 'static,
        Resp: Message + Default + Send + Sync + 'static,
    {
        let mut grpc = tonic::client::Grpc::new(self.channel.clone());
        let mut request = tonic::Request::new(message);
        request.set_timeout(timeout);

        let call = async move {
            grpc.ready()
                .await
                .map_err(|e| GatewayError::Transport(e.to_string()))?;
            grpc.unary(request, PathAndQuery::from_static(method), ProstCodec::default())
                .await
                .map(tonic::Response::into_inner)
                .map_err(|status| status_error(method, status))
        };
        with_deadline(method, timeout, call).await
    }

    async fn commit_status(
        &self,
        transaction_id: &str,
        channel_id: &str,
    ) -> Result<(), GatewayError> {
        let request = proto::CommitStatusRequest {
            transaction_id: transaction_id.to_string(),
            channel_id: channel_id.to_string(),
            identity: self.creator.clone(),
        }
        .encode_to_vec();
        let signed = proto::SignedCommitStatusRequest {
            signature: self.signer.sign(&request),
            request,
        };

        let status: proto::CommitStatusResponse = self
            .unary(COMMIT_STATUS, signed, self.timeouts.commit_status)
            .await?;
        match proto::TxValidationCode::try_from(status.result) {
            Ok(proto::TxValidationCode::Valid) => {
                tracing::info!(
                    transaction_id,
                    block = status.block_number,
                    "transaction committed"
                );
                Ok(())
            }
            Ok(code) => Err(GatewayError::Commit {
                transaction_id: transaction_id.to_string(),
                code: format!("{code:?}"),
            }),
            Err(_) => Err(GatewayError::Commit {
                transaction_id: transaction_id.to_string(),
                code: status.result.to_string(),
            }),
        }
    }
}

#[async_trait]
impl Gateway for GrpcGateway {
    async fn evaluate(&self, call: TransactionCall<'_>) -> Result<Vec<u8>, GatewayError> {
        let proposal = new_proposal(&self.creator, &self.signer, call);
        let request = proto::EvaluateRequest {
            transaction_id: proposal.transaction_id,
            channel_id: proposal.channel_id,
            proposed_transaction: Some(proposal.signed),
            target_organizations: Vec::new(),
        };

        let response: proto::EvaluateResponse =
            self.unary(EVALUATE, request, self.timeouts.evaluate).await?;
        Ok(response.result.map(|r| r.payload).unwrap_or_default())
    }

    async fn submit(&self, call: TransactionCall<'_>) -> Result<Vec<u8>, GatewayError> {
        let proposal = new_proposal(&self.creator, &self.signer, call);
        let transaction_id = proposal.transaction_id.clone();
        let channel_id = proposal.channel_id.clone();
        let request = proto::EndorseRequest {
            transaction_id: proposal.transaction_id,
            channel_id: proposal.channel_id,
            proposed_transaction: Some(proposal.signed),
            endorsing_organizations: Vec::new(),
        };

        let endorsed: proto::EndorseResponse =
            self.unary(ENDORSE, request, self.timeouts.endorse).await?;
        let mut envelope = endorsed.prepared_transaction.ok_or_else(|| {
            GatewayError::Malformed("endorse response carries no prepared transaction".into())
        })?;
        let result = endorsed_result(&envelope)?;
        envelope.signature = self.signer.sign(&envelope.payload);

        let submit = proto::SubmitRequest {
            transaction_id: transaction_id.clone(),
            channel_id: channel_id.clone(),
            prepared_transaction: Some(envelope),
        };
        let _: proto::SubmitResponse = self.unary(SUBMIT, submit, self.timeouts.submit).await?;
        tracing::debug!(%transaction_id, "transaction submitted, awaiting commit");

        self.commit_status(&transaction_id, &channel_id).await?;
        Ok(result)
    }

    fn close(self) {
        drop(self.channel);
        tracing::debug!("gRPC channel released");
    }
}

fn status_error(method: &'static str, status: tonic::Status) -> GatewayError {
    GatewayError::Status {
        operation: operation_name(method),
        code: format!("{:?}", status.code()),
        message: status.message().to_string(),
    }
}

/// `Evaluate` for `/gateway.Gateway/Evaluate`.
fn operation_name(method: &'static str) -> &'static str {
    method.rsplit('/').next().unwrap_or(method)
}

async fn with_deadline<T>(
    method: &'static str,
    timeout: Duration,
    call: impl Future<Output = Result<T, GatewayError>>,
) -> Result<T, GatewayError> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout {
            operation: operation_name(method),
            timeout,
        }),
    }
}
