//! Scraper contract and the compiled-in scraper registry.
//!
//! A scraper is one unit of metric collection: it runs a query against the
//! database and streams [`Observation`]s into the sink it is handed. The
//! registry maps every known scraper to its default enablement; adding a
//! scraper means adding one module and one registry entry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::MySqlPool;
use thiserror::Error;

use crate::exposition::ObservationSink;

mod global_status;
mod global_variables;
mod processlist;

pub use global_status::GlobalStatus;
pub use global_variables::GlobalVariables;
pub use processlist::Processlist;

/// Metric name prefix shared by all scrapers.
pub const NAMESPACE: &str = "mysql";

/// Errors a scraper can surface. These never escape the collector; they
/// become a `success = 0` gauge for the failing scraper.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("exceeded scrape deadline of {0:?}")]
    DeadlineExceeded(Duration),
}

/// One unit of metric collection.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Stable identifier, lowercase. Used as the `--collect.<name>` toggle
    /// and as a `collect[]` filter token. Unique across the registry.
    fn name(&self) -> &'static str;

    /// One-line description used for flag help text.
    fn help(&self) -> &'static str;

    /// Run the collection queries, streaming observations into `sink` as
    /// rows arrive. Query and decoding failures are returned, never
    /// panicked.
    async fn scrape(&self, pool: &MySqlPool, sink: &ObservationSink) -> Result<(), ScrapeError>;
}

/// All known scrapers with their default enablement.
pub fn registry() -> Vec<(Arc<dyn Scraper>, bool)> {
    vec![
        (Arc::new(GlobalStatus) as Arc<dyn Scraper>, true),
        (Arc::new(GlobalVariables) as Arc<dyn Scraper>, true),
        (Arc::new(Processlist) as Arc<dyn Scraper>, false),
    ]
}

/// Interpret a server-reported value as a sample value.
///
/// MySQL reports numbers as strings and uses ON/OFF and Yes/No for
/// switches. Values with no numeric interpretation yield `None` and the
/// row is skipped.
pub(crate) fn parse_server_value(raw: &str) -> Option<f64> {
    if let Ok(value) = raw.parse::<f64>() {
        return Some(value);
    }
    match raw.to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" => Some(1.0),
        "off" | "no" | "false" => Some(0.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_names_are_distinct() {
        let mut seen = HashSet::new();
        for (scraper, _) in registry() {
            assert!(
                seen.insert(scraper.name()),
                "duplicate scraper name: {}",
                scraper.name()
            );
        }
    }

    #[test]
    fn test_registry_names_are_flag_safe() {
        for (scraper, _) in registry() {
            let name = scraper.name();
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "scraper name {} is not a valid toggle token",
                name
            );
            assert!(!scraper.help().is_empty());
        }
    }

    #[test]
    fn test_registry_defaults() {
        let defaults: Vec<(&str, bool)> = registry()
            .iter()
            .map(|(s, enabled)| (s.name(), *enabled))
            .collect();
        assert_eq!(
            defaults,
            vec![
                ("global_status", true),
                ("global_variables", true),
                ("processlist", false),
            ]
        );
    }

    #[test]
    fn test_parse_server_value() {
        assert_eq!(parse_server_value("42"), Some(42.0));
        assert_eq!(parse_server_value("3.5"), Some(3.5));
        assert_eq!(parse_server_value("ON"), Some(1.0));
        assert_eq!(parse_server_value("Yes"), Some(1.0));
        assert_eq!(parse_server_value("OFF"), Some(0.0));
        assert_eq!(parse_server_value("utf8mb4"), None);
        assert_eq!(parse_server_value(""), None);
    }
}
