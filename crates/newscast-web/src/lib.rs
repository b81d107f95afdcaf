//! Newscast Web Server
//!
//! Axum-based HTTP surface: the news event stream plus the endpoints that
//! feed the push path.

pub mod auth;
pub mod routes;
pub mod state;

use std::future::Future;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use newscast_core::NewsItem;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

pub use state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/news", get(routes::news::list_news))
        .route("/news", post(routes::news::create_news))
        .route("/news/stream", get(routes::stream::subscribe))
        .route("/devices", post(routes::devices::register_device))
        .route("/devices/{id}/notify", post(routes::devices::notify_device));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(routes::health::health))
        .route("/internal/news-persisted", post(routes::internal::news_persisted))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the push dispatch for `item` without waiting for it. Returns the
/// number of targets it was started for.
pub(crate) async fn dispatch_in_background(state: &AppState, item: &NewsItem) -> usize {
    let handle = state.orchestrator.news_persisted(item).await;
    let targets = handle.targets();
    if targets > 0 {
        let news_id = item.id;
        tokio::spawn(async move {
            let delivered = handle.delivered().await;
            info!(news_id, targets, delivered, "News notification delivered");
        });
    }
    targets
}

/// Serve on `listener` until `signal` resolves, then drain.
///
/// Draining cancels `stop` (the change detector), closes every stream and
/// gives in-flight requests `grace` to finish before the server is dropped.
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    grace: Duration,
    stop: CancellationToken,
    signal: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let broadcaster = state.broadcaster.clone();
    let app = create_router(state);
    let draining = CancellationToken::new();

    let server = tokio::spawn({
        let draining = draining.clone();
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(draining.cancelled_owned())
                .await
        }
    });

    signal.await;
    info!("Shutdown signal received");
    stop.cancel();
    draining.cancel();
    let report = broadcaster.shutdown(grace).await;
    info!(closed = report.closed, forced = report.forced, "Streams closed");

    let mut server = server;
    match tokio::time::timeout(grace, &mut server).await {
        Ok(joined) => joined??,
        Err(_) => {
            warn!(
                grace_ms = grace.as_millis() as u64,
                "HTTP connections still open after grace period, forcing shutdown"
            );
            server.abort();
        }
    }

    info!("Web server stopped");
    Ok(())
}

/// Bind and run the web server until Ctrl+C or SIGTERM.
pub async fn run_server(
    state: AppState,
    host: &str,
    port: u16,
    grace: Duration,
    stop: CancellationToken,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(format!("{}:{}", host, port)).await?;
    info!("Web server listening on http://{}:{}", host, port);
    serve(listener, state, grace, stop, shutdown_signal()).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
