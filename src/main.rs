//! Season Mining Simulator Node
//!
//! Runs one emission season: the block production loop plus the JSON-RPC
//! query surface.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};

use season_core::config::SimConfig;
use season_core::constants::CHAIN_NAME;
use season_core::mining::{Entropy, RngEntropy};
use season_core::node::SeasonNode;
use season_core::rpc::{start_rpc_server, RpcState};

#[derive(Parser, Debug)]
#[command(name = "season-node", version, about = "Season mining simulator node")]
struct Args {
    /// JSON config file; defaults apply to anything it leaves out
    #[arg(long)]
    config: Option<PathBuf>,

    /// RPC port override
    #[arg(long)]
    port: Option<u16>,

    /// Seed for a reproducible season
    #[arg(long)]
    seed: Option<u64>,

    /// Run without the RPC server
    #[arg(long)]
    no_rpc: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!("{} season node starting", CHAIN_NAME);

    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SimConfig::default(),
    };
    if let Some(port) = args.port {
        config.rpc.port = port;
    }
    if args.no_rpc {
        config.rpc.enabled = false;
    }

    let entropy: Box<dyn Entropy + Send> = match args.seed {
        Some(seed) => {
            info!("Using seed {}", seed);
            Box::new(RngEntropy::seeded(seed))
        }
        None => Box::new(RngEntropy::from_os()),
    };

    let node = SeasonNode::new(&config, entropy).context("configuring season")?;
    let handle = node.handle();
    let preview = handle
        .with_producer(|producer, _| producer.emissions_preview())
        .await;
    info!(
        "Emission: {} over {} blocks, R0 {:.4}, halvings at {:?}",
        preview.total_emission, preview.total_blocks, preview.r0, preview.halving_heights
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let producer_task = tokio::spawn(node.run(shutdown_rx.clone()));

    let rpc_task = if config.rpc.enabled {
        let state = Arc::new(RpcState { node: handle.clone() });
        let port = config.rpc.port;
        let rx = shutdown_rx.clone();
        Some(tokio::spawn(async move { start_rpc_server(state, port, rx).await }))
    } else {
        None
    };

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("Shutdown signal received. Stopping node...");
    let _ = shutdown_tx.send(true);

    producer_task.await.context("joining producer task")?;
    if let Some(task) = rpc_task {
        match task.await.context("joining RPC task")? {
            Ok(()) => {}
            Err(e) => warn!("RPC server error: {}", e),
        }
    }

    let telemetry = handle.telemetry();
    info!(
        "Final height {}, emitted {:.4} of {:.0}",
        telemetry.height, telemetry.emissions.emitted_total, telemetry.emissions.total_emission
    );

    Ok(())
}
