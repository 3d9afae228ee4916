//! HTTP server for the Prometheus metrics endpoint.

use std::net::SocketAddr;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::collector::SharedCollector;
use crate::exposition;
use crate::process::SharedProcessMetrics;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    collector: SharedCollector,
    process: SharedProcessMetrics,
}

/// Create the HTTP router.
fn create_router(
    collector: SharedCollector,
    process: SharedProcessMetrics,
    metrics_path: &str,
) -> Router {
    let state = AppState { collector, process };
    let page = landing_page(metrics_path);

    Router::new()
        .route(metrics_path, get(metrics_handler))
        .route(
            "/",
            get(move || {
                let page = page.clone();
                async move { Html(page) }
            }),
        )
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the metrics endpoint.
///
/// The repeatable `collect[]` query parameter narrows the scraper set for
/// this request only; without it the full enabled set runs. The response
/// is 200 even when every scraper fails, with the failures visible in the
/// success gauges.
async fn metrics_handler(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let tokens: Vec<String> = params
        .into_iter()
        .filter(|(key, _)| key == "collect[]")
        .map(|(_, value)| value)
        .collect();
    debug!(?tokens, "collect query");

    state.process.record_scrape();
    let mut observations = state.collector.collect(&tokens).await;
    observations.extend(state.process.observations());

    let body = exposition::render(&observations);

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// Static landing page linking to the metrics path.
fn landing_page(metrics_path: &str) -> String {
    format!(
        "<html>\n\
         <head><title>MySQL exporter</title></head>\n\
         <body>\n\
         <h1>MySQL exporter</h1>\n\
         <p><a href='{}'>Metrics</a></p>\n\
         </body>\n\
         </html>\n",
        metrics_path
    )
}

/// HTTP server configuration.
pub struct HttpServer {
    collector: SharedCollector,
    process: SharedProcessMetrics,
    listen_addr: SocketAddr,
    metrics_path: String,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(
        collector: SharedCollector,
        process: SharedProcessMetrics,
        listen_addr: SocketAddr,
        metrics_path: String,
    ) -> Self {
        Self {
            collector,
            process,
            listen_addr,
            metrics_path,
        }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let router = create_router(self.collector, self.process, &self.metrics_path);

        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        info!(
            addr = %self.listen_addr,
            path = %self.metrics_path,
            "HTTP server listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}
