use anyhow::Context;
use clap::Parser;
use ledger_core::constants::{MINING_INTERVAL_SECS, POW_DEFAULT_DIFFICULTY};
use ledger_core::crypto::Ed25519Verifier;
use ledger_core::mine::spawn_miner;
use ledger_core::{ChainStore, Ledger, LedgerConfig};
use ledger_node::api::router;
use ledger_node::constants::{DEFAULT_DATA_DIR, DEFAULT_LISTEN, PEER_TIMEOUT_SECS};
use ledger_node::transport::HttpTransport;
use ledger_storage::sled_store::SledStore;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, env = "LEDGER_LISTEN", default_value = DEFAULT_LISTEN)]
    listen: String,

    /// Data directory for sled
    #[arg(long, env = "LEDGER_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: String,

    /// URL other peers reach this node at [default: http://<listen>]
    #[arg(long, env = "LEDGER_ADVERTISE")]
    advertise: Option<String>,

    /// Peer to sync the chain and peer set from at startup
    #[arg(long, env = "LEDGER_SEED")]
    seed: Option<String>,

    /// Leading zero hex digits required of a proof digest
    #[arg(long, env = "LEDGER_DIFFICULTY", default_value_t = POW_DEFAULT_DIFFICULTY)]
    difficulty: usize,

    /// Seconds between mining cycles
    #[arg(long, env = "LEDGER_MINE_INTERVAL", default_value_t = MINING_INTERVAL_SECS)]
    mine_interval: u64,

    /// Timeout in seconds for each outbound peer call
    #[arg(long, env = "LEDGER_PEER_TIMEOUT", default_value_t = PEER_TIMEOUT_SECS)]
    peer_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let addr: SocketAddr = args.listen.parse().context("invalid --listen address")?;

    let store = Arc::new(
        SledStore::open(&args.data_dir)
            .with_context(|| format!("failed to open store at {}", args.data_dir))?,
    );
    let transport = HttpTransport::new(Duration::from_secs(args.peer_timeout))
        .context("failed to build HTTP client")?;
    let config = LedgerConfig {
        difficulty: args.difficulty,
        seed: args.seed,
        self_address: args.advertise.unwrap_or_else(|| format!("http://{addr}")),
    };

    let ledger = Ledger::open(
        config,
        store.clone(),
        Arc::new(Ed25519Verifier),
        Arc::new(transport),
    )
    .await
    .context("failed to initialize ledger")?;
    info!(
        "Ledger initialized with {} blocks and {} peers",
        ledger.chain_len().await,
        ledger.peers().await.len()
    );

    let miner = spawn_miner(ledger.clone(), Duration::from_secs(args.mine_interval));

    let app = router(ledger).layer(TraceLayer::new_for_http());
    info!("ledger-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    miner.abort();
    store.close()?;
    Ok(())
}
