use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use equora_core::analytics::generator::SnapshotGenerator;
use equora_core::domain::snapshot::SentimentSnapshot;
use equora_core::ingest::alpha_vantage::AlphaVantageClient;
use equora_core::ingest::provider::NoopProvider;
use equora_core::notify::TracingNotifier;
use equora_core::service::feed::SentimentFeed;

#[derive(Debug, Parser)]
#[command(name = "equora_worker")]
struct Args {
    /// Refresh interval in milliseconds. Defaults to EQUORA_REFRESH_INTERVAL_MS or 30s.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Number of snapshots to print before exiting. 0 runs until ctrl-c.
    #[arg(long, default_value_t = 1)]
    ticks: u64,

    /// Skip the market data API and synthesize everything.
    #[arg(long)]
    synthetic: bool,

    /// Fixed RNG seed for reproducible output. Overrides EQUORA_RNG_SEED.
    #[arg(long)]
    seed: Option<u64>,

    /// Pretty-print snapshot JSON.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = equora_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if let Err(err) = run(&settings, &args).await {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %err, "worker run failed");
        return Err(err);
    }
    Ok(())
}

async fn run(settings: &equora_core::config::Settings, args: &Args) -> anyhow::Result<()> {
    let seed = args.seed.or(settings.rng_seed);
    let generator = if args.synthetic {
        SnapshotGenerator::new(Arc::new(NoopProvider), seed)
    } else {
        let client = AlphaVantageClient::from_settings(settings)?;
        SnapshotGenerator::new(Arc::new(client), seed)
    };
    let provider = generator.provider_name();

    let feed = SentimentFeed::new(Arc::new(generator), Arc::new(TracingNotifier));
    let (tx, mut rx) = mpsc::unbounded_channel::<Arc<SentimentSnapshot>>();
    let subscription = feed.subscribe(move |snapshot| {
        let _ = tx.send(Arc::clone(snapshot));
    });

    let interval = args
        .interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| settings.refresh_interval());
    tracing::info!(
        provider,
        ticks = args.ticks,
        interval_ms = interval.as_millis() as u64,
        "worker started"
    );
    let updates = feed.start_real_time_updates(interval);

    let mut printed = 0u64;
    loop {
        tokio::select! {
            received = rx.recv() => {
                let Some(snapshot) = received else { break };
                print_snapshot(&snapshot, args.pretty)?;
                printed += 1;
                if args.ticks != 0 && printed >= args.ticks {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    updates.stop();
    subscription.unsubscribe();
    feed.dispose();
    tracing::info!(printed, "worker finished");
    Ok(())
}

fn print_snapshot(snapshot: &SentimentSnapshot, pretty: bool) -> anyhow::Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(snapshot)
    } else {
        serde_json::to_string(snapshot)
    }
    .context("failed to encode snapshot")?;
    println!("{out}");
    Ok(())
}

fn init_sentry(settings: &equora_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
