//! Maps a function name onto one of the supported contract operations.

use std::fmt;
use std::io::{self, Write};

use serde_json::Value;

use crate::config::Configuration;
use crate::connection::Connection;
use crate::error::DispatchError;
use crate::gateway::{Contract, Gateway};

/// Whether an operation queries state or changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Evaluate,
    Submit,
}

/// The closed set of operations the client can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    InitLedger,
    GetAllAssets,
    CreateAsset,
    ReadAssetById,
    ReadAssetBySctSerial,
    GetTransactionByTransactionId,
    UpdateNonExistentAsset,
}

/// Identifier that does not exist on the ledger.
const NON_EXISTENT_ASSET_ID: &str = "-999";

impl Operation {
    pub const ALL: [Operation; 7] = [
        Operation::InitLedger,
        Operation::GetAllAssets,
        Operation::CreateAsset,
        Operation::ReadAssetById,
        Operation::ReadAssetBySctSerial,
        Operation::GetTransactionByTransactionId,
        Operation::UpdateNonExistentAsset,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    /// Name accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Operation::InitLedger => "initLedger",
            Operation::GetAllAssets => "getAllAssets",
            Operation::CreateAsset => "createAsset",
            Operation::ReadAssetById => "readAssetByID",
            Operation::ReadAssetBySctSerial => "readAssetBySctSerial",
            Operation::GetTransactionByTransactionId => "getTransactionByTransactionId",
            Operation::UpdateNonExistentAsset => "updateNonExistentAsset",
        }
    }

    /// Chaincode transaction function invoked.
    pub fn transaction(self) -> &'static str {
        match self {
            Operation::InitLedger => "InitLedger",
            Operation::GetAllAssets => "GetAllAssets",
            Operation::CreateAsset => "CreateAsset",
            Operation::ReadAssetById => "ReadAsset",
            Operation::ReadAssetBySctSerial => "ReadAssetBySctSerial",
            Operation::GetTransactionByTransactionId => "GetTransactionByID",
            Operation::UpdateNonExistentAsset => "UpdateAsset",
        }
    }

    pub fn mode(self) -> Mode {
        match self {
            Operation::InitLedger | Operation::CreateAsset | Operation::UpdateNonExistentAsset => {
                Mode::Submit
            }
            _ => Mode::Evaluate,
        }
    }

    /// Number of command-line arguments that must be present and non-empty.
    pub fn required_args(self) -> usize {
        match self {
            Operation::CreateAsset => 5,
            Operation::ReadAssetById
            | Operation::ReadAssetBySctSerial
            | Operation::GetTransactionByTransactionId => 1,
            _ => 0,
        }
    }

    fn headline(self) -> &'static str {
        match self {
            Operation::InitLedger => "creates the initial set of assets on the ledger",
            Operation::GetAllAssets => "returns all the current assets on the ledger",
            Operation::CreateAsset => {
                "creates a new asset with ID, SCT serial, SAS common name, merkle root and current hash"
            }
            Operation::ReadAssetById => "returns asset attributes",
            Operation::ReadAssetBySctSerial => "returns asset attributes, queried by SCT serial",
            Operation::GetTransactionByTransactionId => {
                "returns the transaction associated with a transaction ID"
            }
            Operation::UpdateNonExistentAsset => {
                "updates an asset that does not exist and should return an error"
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A function name and its command-line arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub function: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub const MAX_ARGS: usize = 5;

    pub fn new(function: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            function: function.into(),
            args,
        }
    }

    /// Function from positional index 2, arguments from indices 3 to 7.
    pub fn from_positional(positional: &[String]) -> Self {
        let function = positional.get(2).cloned().unwrap_or_default();
        let args = positional
            .iter()
            .skip(3)
            .take(Self::MAX_ARGS)
            .cloned()
            .collect();
        Self { function, args }
    }

    /// Check that the arguments `operation` needs are present and non-empty.
    /// Returns them in order.
    pub fn required_args(&self, operation: Operation) -> Result<&[String], DispatchError> {
        let required = operation.required_args();
        for position in 0..required {
            match self.args.get(position) {
                Some(arg) if !arg.is_empty() => {}
                _ => {
                    return Err(DispatchError::MissingArguments {
                        function: operation.name(),
                        required,
                        missing: position + 1,
                    })
                }
            }
        }
        Ok(&self.args[..required])
    }
}

/// What a dispatched operation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A submit committed. `transaction_id` is the `transactionId` field of the
    /// contract's JSON response, when it has one.
    Committed {
        operation: Operation,
        transaction_id: Option<String>,
    },
    /// An evaluate returned a JSON document.
    Evaluated { operation: Operation, result: Value },
    /// The expected remote error occurred and was caught.
    CaughtExpectedError { operation: Operation, error: String },
    /// A call that should have failed went through.
    MissingExpectedError { operation: Operation },
    /// A recoverable query failure, reported without failing the run.
    QueryFailed { operation: Operation, error: String },
    /// The function name matched no operation.
    Unrecognized { function: String },
}

impl Outcome {
    /// Print the result to stdout.
    pub fn report(&self) -> io::Result<()> {
        self.write_to(&mut io::stdout().lock())
    }

    /// Render the result as the lines [`Outcome::report`] prints.
    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        match self {
            Outcome::Committed { transaction_id, .. } => {
                match transaction_id {
                    Some(id) => writeln!(out, "Transaction ID: {id}")?,
                    None => writeln!(out, "Transaction ID: not present in contract response")?,
                }
                writeln!(out, "*** Transaction committed successfully")
            }
            Outcome::Evaluated { result, .. } => {
                let pretty =
                    serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string());
                writeln!(out, "*** Result: {pretty}")
            }
            Outcome::CaughtExpectedError { error, .. } | Outcome::QueryFailed { error, .. } => {
                writeln!(out, "*** Successfully caught the error: {error}")
            }
            Outcome::MissingExpectedError { operation } => {
                writeln!(out, "******** FAILED to return an error for {operation}")
            }
            Outcome::Unrecognized { function } => {
                writeln!(out, "Function not recognized: {function}")
            }
        }
    }
}

/// Run `invocation` against the configured channel and contract.
pub async fn dispatch<G: Gateway>(
    connection: &Connection<G>,
    config: &Configuration,
    invocation: &Invocation,
) -> Result<Outcome, DispatchError> {
    let Some(operation) = Operation::from_name(&invocation.function) else {
        tracing::error!(function = %invocation.function, "Function not recognized");
        return Ok(Outcome::Unrecognized {
            function: invocation.function.clone(),
        });
    };

    let args = invocation.required_args(operation)?;
    let verb = match operation.mode() {
        Mode::Evaluate => "Evaluate",
        Mode::Submit => "Submit",
    };
    tracing::info!(
        "--> {verb} Transaction: {}, function {}",
        operation.transaction(),
        operation.headline()
    );

    let contract = connection
        .network(&config.channel_name)
        .contract(&config.chaincode_name);

    match operation {
        Operation::InitLedger | Operation::CreateAsset => {
            submit_for_transaction_id(&contract, operation, args).await
        }
        Operation::GetAllAssets | Operation::ReadAssetById | Operation::ReadAssetBySctSerial => {
            evaluate_json(&contract, operation, args).await
        }
        Operation::GetTransactionByTransactionId => {
            let query = [config.channel_name.clone(), args[0].clone()];
            match evaluate_json(&contract, operation, &query).await {
                Ok(outcome) => Ok(outcome),
                Err(err) => {
                    tracing::warn!(error = %err, "*** Successfully caught the error");
                    Ok(Outcome::QueryFailed {
                        operation,
                        error: err.to_string(),
                    })
                }
            }
        }
        Operation::UpdateNonExistentAsset => {
            let placeholders: Vec<String> = [NON_EXISTENT_ASSET_ID, "1", "1", "1", "1"]
                .iter()
                .map(|s| s.to_string())
                .collect();
            match contract
                .submit_transaction(operation.transaction(), &placeholders)
                .await
            {
                Ok(_) => {
                    tracing::warn!("******** FAILED to return an error");
                    Ok(Outcome::MissingExpectedError { operation })
                }
                Err(err) => {
                    tracing::info!(error = %err, "*** Successfully caught the error");
                    Ok(Outcome::CaughtExpectedError {
                        operation,
                        error: err.to_string(),
                    })
                }
            }
        }
    }
}

async fn evaluate_json<G: Gateway>(
    contract: &Contract<'_, G>,
    operation: Operation,
    args: &[String],
) -> Result<Outcome, DispatchError> {
    let transaction = operation.transaction();
    let bytes = contract
        .evaluate_transaction(transaction, args)
        .await
        .map_err(|source| DispatchError::Remote {
            transaction,
            source,
        })?;

    let text = String::from_utf8(bytes).map_err(|e| DispatchError::Decode {
        transaction,
        reason: e.to_string(),
    })?;
    let result = serde_json::from_str(&text).map_err(|e| DispatchError::Decode {
        transaction,
        reason: e.to_string(),
    })?;
    Ok(Outcome::Evaluated { operation, result })
}

async fn submit_for_transaction_id<G: Gateway>(
    contract: &Contract<'_, G>,
    operation: Operation,
    args: &[String],
) -> Result<Outcome, DispatchError> {
    let transaction = operation.transaction();
    let bytes = contract
        .submit_transaction(transaction, args)
        .await
        .map_err(|source| DispatchError::Remote {
            transaction,
            source,
        })?;

    Ok(Outcome::Committed {
        operation,
        transaction_id: transaction_id_field(&bytes),
    })
}

/// `transactionId` of a JSON object response. The submit has already
/// committed, so an unparseable body only means there is no id to report.
fn transaction_id_field(bytes: &[u8]) -> Option<String> {
    let response: Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "submit response is not JSON");
            return None;
        }
    };
    match response.get("transactionId")? {
        Value::String(id) => Some(id.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
