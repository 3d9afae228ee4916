//! Scraper for `SHOW GLOBAL VARIABLES`.

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::{MySqlPool, Row};

use super::{NAMESPACE, ScrapeError, Scraper, parse_server_value};
use crate::exposition::{MetricKind, Observation, ObservationSink, sanitize_metric_name};

const GLOBAL_VARIABLES_QUERY: &str = "SHOW GLOBAL VARIABLES";

/// Exports server configuration values that have a numeric or boolean
/// interpretation, such as `max_connections` or `read_only`. Text-valued
/// variables are skipped.
pub struct GlobalVariables;

#[async_trait]
impl Scraper for GlobalVariables {
    fn name(&self) -> &'static str {
        "global_variables"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from SHOW GLOBAL VARIABLES"
    }

    async fn scrape(&self, pool: &MySqlPool, sink: &ObservationSink) -> Result<(), ScrapeError> {
        let mut rows = sqlx::query(GLOBAL_VARIABLES_QUERY).fetch(pool);

        while let Some(row) = rows.try_next().await? {
            let variable: String = row.try_get(0)?;
            let raw: String = row.try_get(1)?;

            let Some(value) = parse_server_value(&raw) else {
                continue;
            };

            let name = format!(
                "{}_global_variables_{}",
                NAMESPACE,
                sanitize_metric_name(&variable.to_ascii_lowercase())
            );
            sink.emit(Observation {
                name,
                help: "Generic metric from SHOW GLOBAL VARIABLES.".to_string(),
                labels: Vec::new(),
                value,
                kind: MetricKind::Gauge,
            });
        }

        Ok(())
    }
}
