//! Scraper for `SHOW GLOBAL STATUS`.

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::{MySqlPool, Row};

use super::{NAMESPACE, ScrapeError, Scraper, parse_server_value};
use crate::exposition::{MetricKind, Observation, ObservationSink, sanitize_metric_name};

const GLOBAL_STATUS_QUERY: &str = "SHOW GLOBAL STATUS";

/// Status variables that are monotonic counters. Everything else from
/// `SHOW GLOBAL STATUS` is exported as a gauge, as is the whole `Com_*`
/// command-counter family.
const COUNTER_STATUS_VARS: &[&str] = &[
    "aborted_clients",
    "aborted_connects",
    "bytes_received",
    "bytes_sent",
    "connections",
    "created_tmp_disk_tables",
    "created_tmp_files",
    "created_tmp_tables",
    "queries",
    "questions",
    "slow_queries",
    "table_locks_immediate",
    "table_locks_waited",
    "uptime",
];

/// Collects server-wide status counters and gauges.
pub struct GlobalStatus;

#[async_trait]
impl Scraper for GlobalStatus {
    fn name(&self) -> &'static str {
        "global_status"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from SHOW GLOBAL STATUS"
    }

    async fn scrape(&self, pool: &MySqlPool, sink: &ObservationSink) -> Result<(), ScrapeError> {
        let mut rows = sqlx::query(GLOBAL_STATUS_QUERY).fetch(pool);

        while let Some(row) = rows.try_next().await? {
            let variable: String = row.try_get(0)?;
            let raw: String = row.try_get(1)?;

            let Some(value) = parse_server_value(&raw) else {
                continue;
            };

            let key = variable.to_ascii_lowercase();
            let name = format!(
                "{}_global_status_{}",
                NAMESPACE,
                sanitize_metric_name(&key)
            );
            sink.emit(Observation {
                name,
                help: "Generic metric from SHOW GLOBAL STATUS.".to_string(),
                labels: Vec::new(),
                value,
                kind: status_kind(&key),
            });
        }

        Ok(())
    }
}

fn status_kind(variable: &str) -> MetricKind {
    if variable.starts_with("com_") || COUNTER_STATUS_VARS.contains(&variable) {
        MetricKind::Counter
    } else {
        MetricKind::Gauge
    }
}
