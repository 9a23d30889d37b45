//! siftdex server binary — thin CLI shell over the [`siftdex`] library crate
//! (§6 "CLI" / "HTTP surface").

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use clap::Parser;
use serde::Deserialize;
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

use siftdex::{Config, Service};

/// Cumulative deadline for a single query handler, matching spec §5's
/// "30-second cumulative deadline" applied to the client socket read. We
/// apply it around the whole request (dispatch onto the worker pool plus
/// the blocking search itself) rather than the raw read, since axum/hyper
/// already own the socket read loop.
const QUERY_DEADLINE: Duration = Duration::from_secs(30);

/// Start the siftdex search server.
#[derive(Parser)]
#[command(name = "siftdex-server", version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file (defaults overridden by anything present).
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Directory ingestion consumes dump files from.
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Directory holding the persistent store.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory of static files served at `GET /`.
    #[arg(long)]
    public_dir: Option<PathBuf>,

    /// Port the HTTP front end binds to.
    #[arg(long)]
    port: Option<u16>,

    /// Number of worker-pool threads serving query requests.
    #[arg(long)]
    num_workers: Option<usize>,

    /// Override the configured `tracing` filter directive.
    #[arg(long)]
    log_level: Option<String>,

    /// Run the startup reindex and exit without serving HTTP.
    #[arg(long)]
    once: bool,
}

impl Cli {
    fn apply_to(self, mut config: Config) -> Config {
        if let Some(v) = self.dump_dir {
            config.dump_dir = v;
        }
        if let Some(v) = self.data_dir {
            config.data_dir = v;
        }
        if let Some(v) = self.public_dir {
            config.public_dir = v;
        }
        if let Some(v) = self.port {
            config.port = v;
        }
        if let Some(v) = self.num_workers {
            config.num_workers = v;
        }
        if let Some(v) = self.log_level {
            config.log_level = v;
        }
        config
    }
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

async fn search_handler(
    State(service): State<Arc<Service>>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    if params.q.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "missing query parameter 'q'").into_response();
    }

    let deadline = tokio::time::timeout(
        QUERY_DEADLINE,
        tokio::task::spawn_blocking(move || service.search(params.q)),
    )
    .await;

    match deadline {
        Ok(Ok(Ok(hits))) => Json(hits).into_response(),
        Ok(Ok(Err(err))) => {
            error!(%err, "query evaluator failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
        Ok(Err(err)) => {
            error!(%err, "search task panicked");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
        Err(_) => {
            // §5: on timeout the connection is closed and the worker
            // returns; the in-flight `spawn_blocking` task is abandoned and
            // its eventual result discarded.
            warn!("query exceeded the 30s deadline, closing connection");
            (
                StatusCode::REQUEST_TIMEOUT,
                [(header::CONNECTION, "close")],
                "query timed out",
            )
                .into_response()
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("received SIGINT, shutting down"),
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("failed to listen for Ctrl+C");
        info!("received Ctrl+C, shutting down");
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = Config::load(&cli.config).unwrap_or_else(|err| {
        eprintln!("failed to load config: {err}");
        std::process::exit(1);
    });
    let config = cli.apply_to(config);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let service = match Service::new(config.clone()) {
        Ok(service) => Arc::new(service),
        Err(err) => {
            error!(%err, "could not open live store, exiting");
            std::process::exit(1);
        }
    };

    if let Err(err) = service.startup_reindex() {
        error!(%err, "startup reindex failed");
    }

    if cli.once {
        info!("--once set, exiting after startup reindex");
        service.shutdown();
        return;
    }

    let app = Router::new()
        .route("/search", get(search_handler))
        .fallback_service(ServeDir::new(&config.public_dir))
        .with_state(Arc::clone(&service));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(%err, %addr, "could not bind HTTP listener");
            std::process::exit(1);
        }
    };

    info!(%addr, "siftdex listening");
    if let Err(err) =
        axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await
    {
        error!(%err, "HTTP server exited with an error");
    }

    service.shutdown();
}
