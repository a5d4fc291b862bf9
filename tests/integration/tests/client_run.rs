//! Integration test: complete client runs against a scripted peer.
//!
//! Each run goes through configuration resolution, credential loading from a
//! crypto directory on disk, connection lifecycle and dispatch.

use ledger_core::{
    client, ClientError, Configuration, DispatchError, Invocation, Mode, Operation, Outcome,
    TimeoutPolicy,
};
use ledger_integration_tests::{positional, CryptoFixture, FakeConnector};

async fn run(
    connector: &FakeConnector,
    fixture: &CryptoFixture,
    args: &[&str],
) -> Result<Outcome, ClientError> {
    let positional = positional(args);
    let config = Configuration::resolve(&fixture.env(), &positional);
    let invocation = Invocation::from_positional(&positional);
    client::run(connector, &config, TimeoutPolicy::default(), &invocation).await
}

// =========================================================================
// Connection lifecycle
// =========================================================================

#[tokio::test]
async fn test_connection_closed_once_after_success() {
    let fixture = CryptoFixture::new();
    let connector = FakeConnector::new().respond("GetAllAssets", "[]");

    let outcome = run(&connector, &fixture, &["mychannel", "sct", "getAllAssets"])
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::Evaluated { .. }));
    assert_eq!(connector.opened(), 1);
    assert_eq!(connector.closed(), 1);
}

#[tokio::test]
async fn test_connection_closed_once_after_remote_failure() {
    let fixture = CryptoFixture::new();
    let connector = FakeConnector::new().fail("GetAllAssets", "chaincode unavailable");

    let err = run(&connector, &fixture, &["mychannel", "sct", "getAllAssets"])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Dispatch(DispatchError::Remote { .. })
    ));
    assert_eq!(connector.closed(), 1);
}

#[tokio::test]
async fn test_connection_closed_once_after_validation_failure() {
    let fixture = CryptoFixture::new();
    let connector = FakeConnector::new();

    let err = run(&connector, &fixture, &["mychannel", "sct", "createAsset", "asset1"])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Dispatch(DispatchError::MissingArguments { missing: 2, .. })
    ));
    assert!(connector.calls().is_empty());
    assert_eq!(connector.opened(), 1);
    assert_eq!(connector.closed(), 1);
}

#[tokio::test]
async fn test_connection_closed_for_unrecognized_function() {
    let fixture = CryptoFixture::new();
    let connector = FakeConnector::new();

    let outcome = run(&connector, &fixture, &["mychannel", "sct", "deleteEverything"])
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Unrecognized {
            function: "deleteEverything".into()
        }
    );
    assert!(connector.calls().is_empty());
    assert_eq!(connector.closed(), 1);
}

#[tokio::test]
async fn test_unreachable_peer_is_a_connection_error() {
    let fixture = CryptoFixture::new();
    let connector = FakeConnector::new().unreachable();

    let err = run(&connector, &fixture, &["mychannel", "sct", "getAllAssets"])
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Connection(_)));
    assert_eq!(connector.opened(), 0);
    assert_eq!(connector.closed(), 0);
}

#[tokio::test]
async fn test_missing_key_directory_fails_before_connecting() {
    let fixture = CryptoFixture::new();
    std::fs::remove_dir_all(fixture.key_directory()).unwrap();
    let connector = FakeConnector::new();

    let err = run(&connector, &fixture, &["mychannel", "sct", "getAllAssets"])
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Credential(_)));
    assert_eq!(connector.opened(), 0);
}

#[tokio::test]
async fn test_connects_to_configured_peer() {
    let fixture = CryptoFixture::new();
    let connector = FakeConnector::new().respond("GetAllAssets", "[]");
    let mut env = fixture.env();
    env.insert("PEER_ENDPOINT".into(), "peer1.example.com:9051".into());
    env.insert("PEER_HOST_ALIAS".into(), "peer1.example.com".into());

    let positional = positional(&["mychannel", "sct", "getAllAssets"]);
    let config = Configuration::resolve(&env, &positional);
    let invocation = Invocation::from_positional(&positional);
    client::run(&connector, &config, TimeoutPolicy::default(), &invocation)
        .await
        .unwrap();

    let target = connector.connected_to().unwrap();
    assert_eq!(target.endpoint, "peer1.example.com:9051");
    assert_eq!(target.host_alias, "peer1.example.com");
}

// =========================================================================
// Operations
// =========================================================================

#[tokio::test]
async fn test_create_asset_commits_and_reports_transaction_id() {
    let fixture = CryptoFixture::new();
    let connector = FakeConnector::new().respond(
        "CreateAsset",
        r#"{"ID":"asset1","transactionId":"a1b2c3"}"#,
    );

    let outcome = run(
        &connector,
        &fixture,
        &[
            "mychannel",
            "sct",
            "createAsset",
            "asset1",
            "serial-9",
            "sas.example.com",
            "root",
            "hash",
        ],
    )
    .await
    .unwrap();

    assert_eq!(
        outcome,
        Outcome::Committed {
            operation: Operation::CreateAsset,
            transaction_id: Some("a1b2c3".into()),
        }
    );
    let calls = connector.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].mode, Mode::Submit);
    assert_eq!(calls[0].channel, "mychannel");
    assert_eq!(calls[0].contract, "sct");
    assert_eq!(
        calls[0].args,
        vec!["asset1", "serial-9", "sas.example.com", "root", "hash"]
    );
}

#[tokio::test]
async fn test_read_asset_by_id_returns_contract_json() {
    let fixture = CryptoFixture::new();
    let body = serde_json::json!({
        "ID": "asset1",
        "SctSerial": "serial-9",
        "SasCommonName": "sas.example.com",
        "MerkleRoot": "root",
        "CurrentHash": "hash",
    });
    let connector = FakeConnector::new().respond("ReadAsset", body.to_string());

    let outcome = run(&connector, &fixture, &["mychannel", "sct", "readAssetByID", "asset1"])
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Evaluated {
            operation: Operation::ReadAssetById,
            result: body,
        }
    );
    assert_eq!(connector.calls()[0].mode, Mode::Evaluate);
    assert_eq!(connector.calls()[0].args, vec!["asset1"]);
}

#[tokio::test]
async fn test_read_missing_asset_propagates_does_not_exist() {
    let fixture = CryptoFixture::new();
    let connector =
        FakeConnector::new().fail("ReadAsset", "the asset doesNotExist does not exist");

    let err = run(
        &connector,
        &fixture,
        &["mychannel", "sct", "readAssetByID", "doesNotExist"],
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("doesNotExist does not exist"));
    assert_eq!(connector.closed(), 1);
}

#[tokio::test]
async fn test_get_transaction_failure_does_not_fail_the_run() {
    let fixture = CryptoFixture::new();
    let connector = FakeConnector::new().fail("GetTransactionByID", "transaction not found");

    let outcome = run(
        &connector,
        &fixture,
        &["mychannel", "sct", "getTransactionByTransactionId", "f00d"],
    )
    .await
    .unwrap();

    assert!(matches!(
        outcome,
        Outcome::QueryFailed {
            operation: Operation::GetTransactionByTransactionId,
            ..
        }
    ));
    assert_eq!(connector.calls()[0].args, vec!["mychannel", "f00d"]);
    assert_eq!(connector.closed(), 1);
}

#[tokio::test]
async fn test_update_non_existent_asset_catches_expected_error() {
    let fixture = CryptoFixture::new();
    let connector = FakeConnector::new().fail("UpdateAsset", "the asset -999 does not exist");

    let outcome = run(&connector, &fixture, &["mychannel", "sct", "updateNonExistentAsset"])
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::CaughtExpectedError { .. }));
    assert_eq!(connector.calls()[0].args[0], "-999");
    assert_eq!(connector.closed(), 1);
}

#[tokio::test]
async fn test_environment_overrides_positional_channel_and_contract() {
    let fixture = CryptoFixture::new();
    let connector = FakeConnector::new().respond("GetAllAssets", "[]");
    let mut env = fixture.env();
    env.insert("CHANNEL_NAME".into(), "auditchannel".into());
    env.insert("CHAINCODE_NAME".into(), "sct-v2".into());

    let positional = positional(&["mychannel", "sct", "getAllAssets"]);
    let config = Configuration::resolve(&env, &positional);
    let invocation = Invocation::from_positional(&positional);
    client::run(&connector, &config, TimeoutPolicy::default(), &invocation)
        .await
        .unwrap();

    assert_eq!(connector.calls()[0].channel, "auditchannel");
    assert_eq!(connector.calls()[0].contract, "sct-v2");
}
