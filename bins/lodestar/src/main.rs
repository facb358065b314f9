use anyhow::{Context, Result};
use clap::Parser;
use lodestar_api::{ClientOptions, RemoteDataClient};
use lodestar_cache::{BulkSearchIndex, IndexOptions, PriceCache, ResolverSet, seed_static};
use lodestar_config::LodestarConfig;
use lodestar_link::SharedMemoryReader;
use lodestar_state::{Notification, StateOrchestrator, Topic};
use lodestar_store::Store;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "lodestar", about = "Tracks game state from the shared-memory link")]
struct Cli {
    /// TOML config file. Defaults apply when it does not exist.
    #[arg(short, long, default_value = "lodestar.toml")]
    config: PathBuf,

    /// Do not build the item index on start.
    #[arg(long)]
    no_index: bool,

    /// Search the local item index and exit.
    #[arg(long, value_name = "QUERY")]
    search: Option<String>,

    /// Refresh and print one trading post price, then exit.
    #[arg(long, value_name = "ITEM_ID")]
    price: Option<u32>,
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

fn load_config(path: &Path) -> Result<(LodestarConfig, bool)> {
    if !path.exists() {
        return Ok((LodestarConfig::default(), false));
    }
    let cfg = LodestarConfig::load(path.display().to_string())
        .with_context(|| format!("loading {}", path.display()))?;
    Ok((cfg, true))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (cfg, from_file) = load_config(&cli.config)?;
    init_tracing(&cfg.log_level);
    if from_file {
        info!(path = %cli.config.display(), "config loaded");
    } else {
        info!(path = %cli.config.display(), "no config file, using defaults");
    }

    let store = Store::open(&cfg.store.path)
        .with_context(|| format!("opening store {}", cfg.store.path.display()))?;
    seed_static(&store)?;

    let client = Arc::new(RemoteDataClient::new(ClientOptions {
        base_url: cfg.api.base_url.clone(),
        request_spacing: cfg.api.request_spacing(),
        timeout: cfg.api.timeout(),
        lang: cfg.api.lang.clone(),
    })?);

    let index = Arc::new(BulkSearchIndex::new(
        store.clone(),
        client.clone(),
        IndexOptions {
            batch_size: cfg.index.batch_size,
            max_age: cfg.index.max_age(),
            search_limit: cfg.index.search_limit,
        },
    ));

    if let Some(query) = &cli.search {
        if !index.is_ready() {
            warn!("item index has not completed a build yet, results may be partial");
        }
        for row in index.search(query) {
            println!("{:>8}  {:<10}  {}", row.id, row.rarity, row.name);
        }
        return Ok(());
    }

    if let Some(id) = cli.price {
        let prices = PriceCache::new(store.clone(), client.clone());
        match prices.refresh(id).await.or_else(|| prices.get(id)) {
            Some(p) => println!(
                "{}: buy {} x{}, sell {} x{} (fetched {})",
                p.id, p.buy_price, p.buy_quantity, p.sell_price, p.sell_quantity, p.fetched_at
            ),
            None => println!("{id}: no price available"),
        }
        return Ok(());
    }

    let reader = SharedMemoryReader::new(cfg.link.segment_path(), cfg.link.stale_threshold);
    let resolvers = ResolverSet::new(&store, client.clone(), Handle::current());
    let orchestrator = StateOrchestrator::new(reader, resolvers, cfg.poll.interval());

    let _log_changes = orchestrator.on(Topic::Any, |note: &Notification<'_>| {
        if let Notification::Changed { fields, state } = note {
            for &field in fields.iter() {
                info!(%field, value = %state.get(field), "state changed");
            }
        }
    });

    if cfg.index.build_on_start && !cli.no_index {
        let index = Arc::clone(&index);
        tokio::spawn(async move {
            let outcome = index.build().await;
            info!(?outcome, "item index build finished");
        });
    }

    orchestrator.start();
    wait_for_shutdown(&orchestrator).await?;
    orchestrator.stop();
    info!("shut down");
    Ok(())
}

/// Block until Ctrl-C. On unix, SIGHUP stands in for the host's resume
/// signal and restarts the link.
#[cfg(unix)]
async fn wait_for_shutdown(orchestrator: &StateOrchestrator) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut resume = signal(SignalKind::hangup())?;
    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => return Ok(res?),
            _ = resume.recv() => {
                info!("resume signal received");
                orchestrator.restart();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(_orchestrator: &StateOrchestrator) -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
