//! Prometheus exporter for MySQL server metrics.

use std::sync::Arc;
use std::time::Duration;

use sqlx::mysql::MySqlPoolOptions;
use tokio::sync::watch;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use mysqld_exporter::{Collector, Dsn, HttpServer, LogFormat, ProcessMetrics, config, dsn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (args, enabled) = config::parse()?;

    // Initialize logging
    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("mysqld_exporter={}", log_level).parse()?)
        .add_directive(format!("sqlx={}", Level::WARN).parse()?);

    match args.log_format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting mysqld-exporter");

    let listen_addr = config::parse_listen_address(&args.listen_address)?;
    config::validate_telemetry_path(&args.telemetry_path)?;

    // Resolve credentials once; everything after this point is read-only.
    let cnf_path = match &args.config_my_cnf {
        Some(path) => path.clone(),
        None => dsn::default_cnf_path()?,
    };
    let data_source_name = std::env::var("DATA_SOURCE_NAME").ok();
    let dsn = Dsn::resolve(data_source_name.as_deref(), &cnf_path)?;
    info!(dsn = %dsn, "Resolved database credentials");

    for scraper in &enabled {
        info!(scraper = scraper.name(), "Scraper enabled");
    }

    // Lazy pool: the exporter starts and serves scrapes even while the
    // database is unreachable; failures surface in the success gauges.
    let pool = MySqlPoolOptions::new().connect_lazy_with(dsn.connect_options());

    let collector = Arc::new(Collector::new(
        pool,
        enabled,
        Duration::from_secs(dsn.timeout_secs),
    ));
    let process = Arc::new(ProcessMetrics::new());

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = HttpServer::new(
        collector.clone(),
        process.clone(),
        listen_addr,
        args.telemetry_path.clone(),
    );
    let http_task = tokio::spawn(async move {
        if let Err(e) = server.run(shutdown_rx).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate()
                ).unwrap();
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    shutdown_tx.send(true)?;

    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    let stats = collector.stats();
    info!(
        scrapes = stats.scrapes,
        scraper_failures = stats.scraper_failures,
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}
