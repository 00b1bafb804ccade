//! Periodic scheduler: one cycle immediately on startup, then one every poll
//! interval. Cycles never overlap; a tick that lands while the previous
//! cycle is still running is skipped.

use crate::config::Config;
use crate::error::Result;
use crate::geocode::Geocoder;
use crate::normalize::FallbackSampler;
use crate::pipeline;
use crate::store::EventStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct Harvester {
    config: Config,
    store: Arc<dyn EventStore>,
    geocoder: Arc<dyn Geocoder>,
    sampler: Arc<dyn FallbackSampler>,
    in_flight: Arc<AtomicBool>,
}

impl Harvester {
    pub fn new(
        config: Config,
        store: Arc<dyn EventStore>,
        geocoder: Arc<dyn Geocoder>,
        sampler: Arc<dyn FallbackSampler>,
    ) -> Self {
        Self {
            config,
            store,
            geocoder,
            sampler,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs a single cycle and logs the outcome. Errors are reported, not
    /// propagated, so a failed cycle never kills the poll loop.
    pub async fn run_cycle(&self) {
        let run_id = Uuid::new_v4().to_string();
        info!("Starting ingestion cycle {}", run_id);
        match pipeline::prepare_ingestion_run(
            &run_id,
            &self.config,
            self.store.as_ref(),
            self.geocoder.clone(),
            self.sampler.clone(),
        )
        .await
        {
            Ok(outcome) => info!(
                "Cycle {} complete: {} fetched, {} duplicate(s) dropped, {} inserted, {} category row(s)",
                run_id, outcome.fetched, outcome.deduped, outcome.inserted, outcome.category_rows
            ),
            Err(e) => error!("Cycle {} failed: {}", run_id, e),
        }
    }

    /// Polls until ctrl-c. The in-flight flag guarantees at most one cycle
    /// at a time; an in-progress cycle is awaited before shutdown returns.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let poll = Duration::from_secs(self.config.settings.poll_minutes * 60);
        info!(
            "Polling {} source(s) every {} minute(s)",
            self.config.sources.len(),
            self.config.settings.poll_minutes
        );

        let this = Arc::new(self);
        let mut interval = tokio::time::interval(poll);
        let mut last_cycle: Option<tokio::task::JoinHandle<()>> = None;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if this.in_flight.swap(true, Ordering::SeqCst) {
                        warn!("Previous cycle still running, skipping this tick");
                        continue;
                    }
                    let runner = this.clone();
                    last_cycle = Some(tokio::spawn(async move {
                        runner.run_cycle().await;
                        runner.in_flight.store(false, Ordering::SeqCst);
                    }));
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        if let Some(handle) = last_cycle {
            if this.in_flight.load(Ordering::SeqCst) {
                info!("Waiting for in-progress cycle to finish");
            }
            if let Err(e) = handle.await {
                warn!("Cycle task panicked: {}", e);
            }
        }
        Ok(())
    }
}
