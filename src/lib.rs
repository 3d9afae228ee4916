//! Prometheus exporter for MySQL server metrics.
//!
//! The exporter scrapes a running MySQL instance on demand: every request
//! to the metrics endpoint runs the enabled scrapers concurrently against
//! the database and renders their combined output.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │  MySQL server   │<────│    Collector    │<────│   HTTP Server   │
//! │  (SHOW ...)     │     │ (scraper fanout)│     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! Scrapers are the extension point: each implements [`scraper::Scraper`]
//! and is registered in [`scraper::registry`] with a default enablement
//! that operators can override per scraper with `--collect.<name>` flags,
//! or per request with repeatable `collect[]` query parameters.
//!
//! # Usage
//!
//! ```bash
//! DATA_SOURCE_NAME='exporter:secret@localhost:3306' mysqld-exporter
//! ```
//!
//! Credentials can also come from a `.cnf` file, see [`dsn::Dsn`].

pub mod collector;
pub mod config;
pub mod dsn;
pub mod exposition;
pub mod http;
pub mod process;
pub mod scraper;

pub use collector::{Collector, CollectorStats, SharedCollector};
pub use config::{Args, LogFormat};
pub use dsn::Dsn;
pub use exposition::{MetricKind, Observation, ObservationSink};
pub use http::HttpServer;
pub use process::{ProcessMetrics, SharedProcessMetrics};
pub use scraper::{ScrapeError, Scraper};
