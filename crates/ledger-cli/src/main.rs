//! Ledger client: run one smart contract function on a Fabric peer.
//!
//! `ledger-client <channel> <contract> <function> [arg1 .. arg5]`
//!
//! Every setting can also come from the environment (`CHANNEL_NAME`,
//! `CHAINCODE_NAME`, `MSP_ID`, `CRYPTO_PATH`, `KEY_DIRECTORY_PATH`,
//! `CERT_PATH`, `TLS_CERT_PATH`, `PEER_ENDPOINT`, `PEER_HOST_ALIAS`).

use std::process::ExitCode;

use clap::Parser;
use ledger_core::config::{process_env, Environment};
use ledger_core::{client, Configuration, Connector, Invocation, TimeoutPolicy};
use ledger_gateway::GrpcConnector;
use tracing_subscriber::EnvFilter;

const FAILURE_PREFIX: &str = "******** FAILED to run the application:";

/// Evaluate or submit a smart contract function through a Fabric gateway peer.
#[derive(Parser, Debug)]
#[command(name = "ledger-client", version, about, long_about = None)]
struct Cli {
    /// Channel the contract is deployed on (CHANNEL_NAME takes precedence).
    #[arg(allow_hyphen_values = true)]
    channel: Option<String>,

    /// Chaincode name (CHAINCODE_NAME takes precedence).
    #[arg(allow_hyphen_values = true)]
    contract: Option<String>,

    /// Function to run, e.g. getAllAssets or createAsset.
    #[arg(allow_hyphen_values = true)]
    function: Option<String>,

    /// Up to five function arguments.
    #[arg(num_args = 0..=5, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl Cli {
    /// Arguments in positional order: channel, contract, function, args.
    fn positional(&self) -> Vec<String> {
        [&self.channel, &self.contract, &self.function]
            .into_iter()
            .map(|arg| arg.clone().unwrap_or_default())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let env = process_env();
    init_tracing(env.as_ref().is_ok_and(json_logs));

    let result = match env {
        Ok(env) => run(&cli, &env, &GrpcConnector).await,
        Err(err) => Err(err.into()),
    };
    ExitCode::from(exit_status(&result))
}

/// Process exit status for a finished run, logging the failure if there was one.
fn exit_status(result: &anyhow::Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            tracing::error!("{FAILURE_PREFIX} {err:#}");
            1
        }
    }
}

async fn run<C: Connector>(cli: &Cli, env: &Environment, connector: &C) -> anyhow::Result<()> {
    let positional = cli.positional();
    let config = Configuration::resolve(env, &positional);
    config.log_parameters();

    let timeouts = TimeoutPolicy::from_env(env)?;
    let invocation = Invocation::from_positional(&positional);

    let outcome = client::run(connector, &config, timeouts, &invocation).await?;
    outcome.report()?;
    Ok(())
}

fn json_logs(env: &Environment) -> bool {
    env.get("LOG_FORMAT").is_some_and(|format| format.eq_ignore_ascii_case("json"))
}

/// `RUST_LOG` filter (default `info`) on stderr, as JSON lines when `json` is set.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
