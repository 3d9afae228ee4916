//! Composite collector that fans out to the enabled scrapers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use sqlx::MySqlPool;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::exposition::{Observation, ObservationSink};
use crate::scraper::{NAMESPACE, ScrapeError, Scraper};

/// Counters accumulated across requests, logged at shutdown.
#[derive(Debug, Clone, Default)]
pub struct CollectorStats {
    /// Collection rounds served.
    pub scrapes: u64,
    /// Individual scraper runs that failed or timed out.
    pub scraper_failures: u64,
}

/// Runs the filtered scraper set against the database and merges their
/// output with per-scraper meta gauges.
///
/// The collector owns the startup-resolved enabled set and the shared
/// connection pool; everything per-request (filter result, sinks, gauges)
/// is ephemeral.
pub struct Collector {
    pool: MySqlPool,
    scrapers: Vec<Arc<dyn Scraper>>,
    scrape_timeout: Duration,
    stats: RwLock<CollectorStats>,
}

/// Shareable collector handle.
pub type SharedCollector = Arc<Collector>;

impl Collector {
    /// Create a collector over the enabled scraper set.
    pub fn new(pool: MySqlPool, scrapers: Vec<Arc<dyn Scraper>>, scrape_timeout: Duration) -> Self {
        Self {
            pool,
            scrapers,
            scrape_timeout,
            stats: RwLock::new(CollectorStats::default()),
        }
    }

    /// Names of the enabled scrapers, in registry order.
    pub fn scraper_names(&self) -> Vec<&'static str> {
        self.scrapers.iter().map(|s| s.name()).collect()
    }

    /// Narrow the enabled set with `collect[]` tokens from one request.
    ///
    /// An empty token list means no restriction. Unknown tokens are
    /// ignored, so a filter that matches nothing yields an empty set, not
    /// an error. Pure; the enabled set is never mutated.
    pub fn filter(&self, tokens: &[String]) -> Vec<Arc<dyn Scraper>> {
        if tokens.is_empty() {
            return self.scrapers.clone();
        }
        self.scrapers
            .iter()
            .filter(|s| tokens.iter().any(|t| t == s.name()))
            .cloned()
            .collect()
    }

    /// Run one collection round.
    ///
    /// Every scraper in the filtered set runs on its own task, bounded by
    /// the scrape deadline. A failing, panicking, or timed-out scraper
    /// contributes no data observations; it still gets its success and
    /// duration gauges, and never prevents the other scrapers from
    /// completing.
    pub async fn collect(&self, tokens: &[String]) -> Vec<Observation> {
        let selected = self.filter(tokens);
        debug!(scrapers = selected.len(), "starting collection round");

        type Outcome = (Result<Vec<Observation>, ScrapeError>, Duration);
        let mut tasks: Vec<(&'static str, JoinHandle<Outcome>)> =
            Vec::with_capacity(selected.len());

        for scraper in selected {
            let name = scraper.name();
            let pool = self.pool.clone();
            let deadline = self.scrape_timeout;

            let handle = tokio::spawn(async move {
                let sink = ObservationSink::new();
                let started = Instant::now();
                let outcome =
                    match tokio::time::timeout(deadline, scraper.scrape(&pool, &sink)).await {
                        Ok(Ok(())) => Ok(sink.take()),
                        Ok(Err(err)) => Err(err),
                        Err(_) => Err(ScrapeError::DeadlineExceeded(deadline)),
                    };
                (outcome, started.elapsed())
            });
            tasks.push((name, handle));
        }

        let mut observations = Vec::new();
        let mut failures = 0u64;

        for (name, handle) in tasks {
            let (success, elapsed) = match handle.await {
                Ok((Ok(mut emitted), elapsed)) => {
                    observations.append(&mut emitted);
                    (true, elapsed)
                }
                Ok((Err(err), elapsed)) => {
                    warn!(scraper = name, error = %err, "scrape failed");
                    (false, elapsed)
                }
                Err(join_err) => {
                    error!(scraper = name, error = %join_err, "scrape task panicked");
                    (false, Duration::ZERO)
                }
            };

            if !success {
                failures += 1;
            }
            observations.push(
                Observation::gauge(
                    format!("{}_exporter_scraper_duration_seconds", NAMESPACE),
                    "Duration of the scraper run.",
                    elapsed.as_secs_f64(),
                )
                .with_label("scraper", name),
            );
            observations.push(
                Observation::gauge(
                    format!("{}_exporter_scraper_success", NAMESPACE),
                    "Whether the scraper run succeeded.",
                    if success { 1.0 } else { 0.0 },
                )
                .with_label("scraper", name),
            );
        }

        observations.push(Observation::gauge(
            format!("{}_up", NAMESPACE),
            "Whether the collection round completed without a scraper failure.",
            if failures == 0 { 1.0 } else { 0.0 },
        ));

        let mut stats = self.stats.write();
        stats.scrapes += 1;
        stats.scraper_failures += failures;

        observations
    }

    /// Snapshot of the accumulated statistics.
    pub fn stats(&self) -> CollectorStats {
        self.stats.read().clone()
    }
}
