//! Building signed transaction proposals and reading endorsed results.

use std::time::SystemTime;

use ledger_core::{GatewayError, Identity, Signer, TransactionCall};
use prost::Message;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::proto;

const NONCE_LEN: usize = 24;

/// Serialized creator identity carried in every signature header.
pub fn serialize_identity(identity: &Identity) -> Vec<u8> {
    proto::SerializedIdentity {
        mspid: identity.msp_id().to_string(),
        id_bytes: identity.credentials().to_vec(),
    }
    .encode_to_vec()
}

/// Hex SHA-256 of `nonce || creator`, as the peer recomputes it.
pub fn transaction_id(nonce: &[u8], creator: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nonce);
    hasher.update(creator);
    hex::encode(hasher.finalize())
}

/// A signed proposal ready to send for evaluation or endorsement.
#[derive(Debug, Clone)]
pub struct PreparedProposal {
    pub transaction_id: String,
    pub channel_id: String,
    pub signed: proto::SignedProposal,
}

pub fn new_proposal(
    creator: &[u8],
    signer: &Signer,
    call: TransactionCall<'_>,
) -> PreparedProposal {
    let mut nonce = vec![0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    build_proposal(creator, signer, call, nonce)
}

fn build_proposal(
    creator: &[u8],
    signer: &Signer,
    call: TransactionCall<'_>,
    nonce: Vec<u8>,
) -> PreparedProposal {
    let tx_id = transaction_id(&nonce, creator);
    let chaincode_id = proto::ChaincodeId {
        name: call.contract.to_string(),
        ..Default::default()
    };

    let channel_header = proto::ChannelHeader {
        r#type: proto::HeaderType::EndorserTransaction as i32,
        timestamp: Some(prost_types::Timestamp::from(SystemTime::now())),
        channel_id: call.channel.to_string(),
        tx_id: tx_id.clone(),
        extension: proto::ChaincodeHeaderExtension {
            chaincode_id: Some(chaincode_id.clone()),
        }
        .encode_to_vec(),
        ..Default::default()
    };
    let signature_header = proto::SignatureHeader {
        creator: creator.to_vec(),
        nonce,
    };
    let header = proto::Header {
        channel_header: channel_header.encode_to_vec(),
        signature_header: signature_header.encode_to_vec(),
    };

    let args = std::iter::once(call.function)
        .chain(call.args.iter().map(String::as_str))
        .map(|arg| arg.as_bytes().to_vec())
        .collect();
    let invocation = proto::ChaincodeInvocationSpec {
        chaincode_spec: Some(proto::ChaincodeSpec {
            r#type: proto::ChaincodeType::Node as i32,
            chaincode_id: Some(chaincode_id),
            input: Some(proto::ChaincodeInput {
                args,
                ..Default::default()
            }),
            timeout: 0,
        }),
    };
    let payload = proto::ChaincodeProposalPayload {
        input: invocation.encode_to_vec(),
        ..Default::default()
    };

    let proposal_bytes = proto::Proposal {
        header: header.encode_to_vec(),
        payload: payload.encode_to_vec(),
        extension: Vec::new(),
    }
    .encode_to_vec();
    let signature = signer.sign(&proposal_bytes);

    PreparedProposal {
        transaction_id: tx_id,
        channel_id: call.channel.to_string(),
        signed: proto::SignedProposal {
            proposal_bytes,
            signature,
        },
    }
}

/// Chaincode response payload carried inside an endorsed transaction envelope.
pub fn endorsed_result(envelope: &proto::Envelope) -> Result<Vec<u8>, GatewayError> {
    let payload = decode::<proto::Payload>(&envelope.payload, "transaction payload")?;
    let transaction = decode::<proto::Transaction>(&payload.data, "transaction")?;
    let action = transaction
        .actions
        .first()
        .ok_or_else(|| GatewayError::Malformed("transaction carries no actions".into()))?;
    let action_payload =
        decode::<proto::ChaincodeActionPayload>(&action.payload, "chaincode action payload")?;
    let endorsed = action_payload
        .action
        .ok_or_else(|| GatewayError::Malformed("chaincode action payload has no action".into()))?;
    let response_payload = decode::<proto::ProposalResponsePayload>(
        &endorsed.proposal_response_payload,
        "proposal response payload",
    )?;
    let chaincode_action =
        decode::<proto::ChaincodeAction>(&response_payload.extension, "chaincode action")?;

    Ok(chaincode_action
        .response
        .map(|response| response.payload)
        .unwrap_or_default())
}

fn decode<M: Message + Default>(bytes: &[u8], what: &str) -> Result<M, GatewayError> {
    M::decode(bytes).map_err(|e| GatewayError::Malformed(format!("invalid {what}: {e}")))
}
