use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use nftdonate_engine::{
    EngineConfig, GatewayMarketplace, Marketplace, OrchestrationError, Orchestrator, TaskId, WalletSession, estimate_task_cost,
    fetcher, submitter,
};
use nftdonate_types::TaskRequest;
use nftdonate_util::{expand_tilde, parse_json_strict};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod offline;

/// AI donation recommendations computed on a confidential compute marketplace
#[derive(Debug, Parser)]
#[command(name = "nftdonate", version, about, long_about = None)]
struct Cli {
    /// Use a simulated marketplace that completes immediately
    #[arg(long, global = true)]
    offline: bool,

    /// Give up waiting for a task after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    deadline_secs: Option<u64>,

    #[command(flatten)]
    wallet: WalletArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct WalletArgs {
    /// Address of the signed-in wallet
    #[arg(long, env = "WALLET_ADDRESS", global = true, hide_env_values = true)]
    wallet_address: Option<String>,

    /// Chain the wallet is connected to; defaults to the configured network
    #[arg(long, env = "WALLET_CHAIN_ID", global = true)]
    wallet_chain_id: Option<u64>,

    /// Signed session token authorizing order placement
    #[arg(long, env = "WALLET_SESSION_TOKEN", global = true, hide_env_values = true)]
    wallet_session_token: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit a request, wait for the task and print the recommendations
    Recommend {
        /// Worker input document (userAddress, donationHistory, allNFTs)
        #[arg(long, value_name = "FILE")]
        request: PathBuf,
    },

    /// Submit a request and print the deal and task ids
    Submit {
        #[arg(long, value_name = "FILE")]
        request: PathBuf,
    },

    /// Print the current state of a task
    Status { task_id: String },

    /// Download and validate the result of a completed task
    Fetch { task_id: String },

    /// Print the estimated cost of one run in RLC
    EstimateCost,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = EngineConfig::load().context("failed to load configuration")?;
    if let Some(deadline) = cli.deadline_secs {
        config.deadline_secs = deadline;
    }
    config.validate().context("invalid configuration")?;

    let request = match &cli.command {
        Command::Recommend { request } | Command::Submit { request } => Some(read_request(request)?),
        _ => None,
    };

    let result = if cli.offline {
        let marketplace = offline::marketplace(request.as_ref());
        let config = offline::config(config);
        let session = cli.wallet.session(&config).or_else(|| Some(offline::session(&config)));
        run(Orchestrator::new(marketplace, config), cli.command, session, request).await
    } else {
        let marketplace = GatewayMarketplace::from_config(&config).context("invalid marketplace gateway")?;
        let session = cli.wallet.session(&config);
        run(Orchestrator::new(marketplace, config), cli.command, session, request).await
    };

    if let Err(error) = &result
        && let Some(orchestration) = error.downcast_ref::<OrchestrationError>()
        && orchestration.is_retryable_by_user()
    {
        eprintln!("Recommendations are unavailable right now. Run the command again to retry.");
    }
    result
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

impl WalletArgs {
    fn session(&self, config: &EngineConfig) -> Option<WalletSession> {
        let address = self.wallet_address.clone()?;
        Some(WalletSession {
            address,
            chain_id: self.wallet_chain_id.unwrap_or_else(|| config.network.chain_id()),
            token: self.wallet_session_token.clone().unwrap_or_default(),
        })
    }
}

async fn run<M: Marketplace>(
    orchestrator: Orchestrator<M>,
    command: Command,
    session: Option<WalletSession>,
    request: Option<TaskRequest>,
) -> Result<()> {
    match command {
        Command::Recommend { .. } => {
            let request = request.context("recommend needs a request document")?;
            let cancel = CancellationToken::new();
            tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

            match orchestrator.get_recommendations(session.as_ref(), &request, &cancel).await? {
                Some(result) => print_json(&result),
                None => {
                    warn!("cancelled before the task completed");
                    Ok(())
                }
            }
        }
        Command::Submit { .. } => {
            let request = request.context("submit needs a request document")?;
            let session = orchestrator.check_session(session.as_ref())?;
            let handle = orchestrator.submitter().submit(session, &request).await?;
            print_json(&serde_json::json!({
                "dealId": handle.deal_id,
                "taskId": handle.task_id,
            }))
        }
        Command::Status { task_id } => {
            let report = orchestrator
                .marketplace()
                .task_status(&TaskId(task_id.clone()))
                .await
                .with_context(|| format!("failed to query task {task_id}"))?;
            print_json(&serde_json::json!({
                "taskId": task_id,
                "state": report.state,
                "message": report.message,
            }))
        }
        Command::Fetch { task_id } => {
            let result = fetcher::fetch(orchestrator.marketplace(), &TaskId(task_id)).await?;
            print_json(&result)
        }
        Command::EstimateCost => {
            let app = submitter::configured_app(orchestrator.config())?;
            let cost = estimate_task_cost(orchestrator.marketplace(), app).await;
            info!(app = %app, cost = %cost, "cost estimated");
            println!("{cost}");
            Ok(())
        }
    }
}

fn read_request(path: &Path) -> Result<TaskRequest> {
    let path = expand_tilde(&path.to_string_lossy());
    let text = fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let value = parse_json_strict(&text, "request document")?;
    let request: TaskRequest = serde_json::from_value(value).context("request document has the wrong shape")?;
    request.validate()?;
    Ok(request)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        eprintln!("\nReceived Ctrl+C, cancelling...");
        cancel.cancel();
    }
}
