//! Command-line surface and scraper enablement resolution.
//!
//! Static flags are declared with clap derive; on top of those, one
//! `--collect.<name>` boolean flag is generated per registry entry, with
//! the default taken from the registry. The resolved enabled set is fixed
//! for the process lifetime.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Arg, ArgMatches, Command, CommandFactory, FromArgMatches, Parser, ValueEnum};
use thiserror::Error;

use crate::scraper::{self, Scraper};

/// Configuration errors. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid listen address: {0}")]
    InvalidListenAddress(String),
    #[error("telemetry path must start with / and not be /: {0}")]
    InvalidTelemetryPath(String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Prometheus exporter for MySQL server metrics.
#[derive(Parser, Debug)]
#[command(name = "mysqld-exporter")]
#[command(about = "Export MySQL server metrics in Prometheus format")]
#[command(version)]
pub struct Args {
    /// Address to listen on for web interface and telemetry.
    #[arg(long = "web.listen-address", default_value = ":9105")]
    pub listen_address: String,

    /// Path under which to expose metrics.
    #[arg(long = "web.telemetry-path", default_value = "/metrics")]
    pub telemetry_path: String,

    /// Path to a .cnf file to read database credentials from
    /// (default: $HOME/.my.cnf).
    #[arg(long = "config.my-cnf")]
    pub config_my_cnf: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// The static flags plus one generated `--collect.<name>` flag per scraper.
pub fn build_command() -> Command {
    let mut cmd = Args::command();

    for (scraper, enabled_by_default) in scraper::registry() {
        let flag = format!("collect.{}", scraper.name());
        cmd = cmd.arg(
            Arg::new(flag.clone())
                .long(flag)
                .help(scraper.help())
                .value_parser(clap::value_parser!(bool))
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true")
                .default_value(if enabled_by_default { "true" } else { "false" }),
        );
    }

    cmd
}

/// Registry entries whose resolved toggle is true.
pub fn enabled_scrapers(matches: &ArgMatches) -> Vec<Arc<dyn Scraper>> {
    scraper::registry()
        .into_iter()
        .filter(|(scraper, enabled_by_default)| {
            matches
                .get_one::<bool>(&format!("collect.{}", scraper.name()))
                .copied()
                .unwrap_or(*enabled_by_default)
        })
        .map(|(scraper, _)| scraper)
        .collect()
}

/// Parse the process arguments.
///
/// Malformed input aborts with a clap diagnostic before anything else
/// starts; a missing scraper toggle falls back to the registry default.
pub fn parse() -> anyhow::Result<(Args, Vec<Arc<dyn Scraper>>)> {
    let matches = build_command().get_matches();
    let args = Args::from_arg_matches(&matches)?;
    let enabled = enabled_scrapers(&matches);
    Ok((args, enabled))
}

/// Normalize and parse the listen address.
///
/// Accepts the bare `:port` form operators know from other exporters and
/// binds it to all interfaces.
pub fn parse_listen_address(raw: &str) -> Result<SocketAddr, ConfigError> {
    let candidate = if raw.starts_with(':') {
        format!("0.0.0.0{}", raw)
    } else {
        raw.to_string()
    };
    candidate
        .parse()
        .map_err(|_| ConfigError::InvalidListenAddress(raw.to_string()))
}

/// Reject telemetry paths the router cannot serve alongside the landing page.
pub fn validate_telemetry_path(path: &str) -> Result<(), ConfigError> {
    if !path.starts_with('/') || path == "/" {
        return Err(ConfigError::InvalidTelemetryPath(path.to_string()));
    }
    Ok(())
}
