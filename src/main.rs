use clap::{Parser, Subcommand};
use event_harvester::config::Config;
use event_harvester::geocode::{CachedGeocoder, Geocoder, NominatimGeocoder, NullGeocoder};
use event_harvester::logging;
use event_harvester::normalize::{DisabledSampler, FallbackSampler, RandomSampler};
use event_harvester::runner::Harvester;
use event_harvester::store::{EventStore, InMemoryStore, SupabaseStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;

#[derive(Parser)]
#[command(name = "event_harvester")]
#[command(about = "Multi-format event listing ingestion pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = "harvester.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single ingestion cycle and exit
    Ingest {
        /// Use an in-memory store and skip geocoding (nothing persists)
        #[arg(long)]
        dry_run: bool,
    },
    /// Poll all sources on the configured interval until interrupted
    Serve,
}

fn build_sampler(demo_fallbacks: bool) -> Arc<dyn FallbackSampler> {
    if demo_fallbacks {
        Arc::new(RandomSampler::new())
    } else {
        Arc::new(DisabledSampler)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let sampler = build_sampler(config.settings.demo_fallbacks);

    match cli.command {
        Commands::Ingest { dry_run } => {
            println!("🔄 Running one ingestion cycle...");

            let (store, geocoder): (Arc<dyn EventStore>, Arc<dyn Geocoder>) = if dry_run {
                (Arc::new(InMemoryStore::new()), Arc::new(NullGeocoder))
            } else {
                (
                    Arc::new(SupabaseStore::from_env()?),
                    Arc::new(CachedGeocoder::new(NominatimGeocoder::new())),
                )
            };

            let harvester = Harvester::new(config, store, geocoder, sampler);
            harvester.run_cycle().await;
            println!("✅ Cycle complete");
        }
        Commands::Serve => {
            println!("🚀 Starting harvester poll loop...");

            let store: Arc<dyn EventStore> = Arc::new(SupabaseStore::from_env()?);
            let geocoder: Arc<dyn Geocoder> =
                Arc::new(CachedGeocoder::new(NominatimGeocoder::new()));

            let harvester = Harvester::new(config, store, geocoder, sampler);
            if let Err(e) = harvester.run_until_shutdown().await {
                error!("Harvester exited with error: {}", e);
                println!("❌ Harvester failed: {}", e);
                return Err(e.into());
            }
            println!("✅ Harvester stopped cleanly");
        }
    }
    Ok(())
}
