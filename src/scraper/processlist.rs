//! Scraper for `information_schema.processlist`.

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::{MySqlPool, Row};

use super::{NAMESPACE, ScrapeError, Scraper};
use crate::exposition::{MetricKind, Observation, ObservationSink};

// COALESCE folds the NULL state of idle threads into a stable label value.
const PROCESSLIST_QUERY: &str = "\
    SELECT COALESCE(state, 'none') AS state, COUNT(*) AS threads \
    FROM information_schema.processlist \
    GROUP BY state";

/// Counts server threads grouped by their processlist state.
///
/// Disabled by default: the query takes a mutex on the process list, which
/// is measurable overhead on busy servers.
pub struct Processlist;

#[async_trait]
impl Scraper for Processlist {
    fn name(&self) -> &'static str {
        "processlist"
    }

    fn help(&self) -> &'static str {
        "Collect thread counts from information_schema.processlist"
    }

    async fn scrape(&self, pool: &MySqlPool, sink: &ObservationSink) -> Result<(), ScrapeError> {
        let mut rows = sqlx::query(PROCESSLIST_QUERY).fetch(pool);

        while let Some(row) = rows.try_next().await? {
            let state: String = row.try_get("state")?;
            let threads: i64 = row.try_get("threads")?;

            sink.emit(Observation {
                name: format!("{}_processlist_threads", NAMESPACE),
                help: "Number of server threads by processlist state.".to_string(),
                labels: vec![("state".to_string(), state)],
                value: threads as f64,
                kind: MetricKind::Gauge,
            });
        }

        Ok(())
    }
}
