//! Dashboard — Axum web server re-serving the synchronized state.
//!
//! Serves a JSON API over the watchers' live/history feeds and the market
//! grid, plus a self-contained HTML page. CORS enabled for local
//! development.

pub mod routes;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method},
    response::Html,
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

pub use routes::{AppState, DashboardState, GridSnapshot};

/// The embedded dashboard HTML (compiled into the binary).
const DASHBOARD_HTML: &str = include_str!("templates/index.html");

/// Start the dashboard web server.
///
/// This spawns a background task — it doesn't block.
pub fn spawn_dashboard(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);

    tokio::spawn(async move {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        info!(port, "Dashboard server starting on http://localhost:{port}");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("Failed to bind dashboard port");

        axum::serve(listener, app)
            .await
            .expect("Dashboard server error");
    });

    Ok(())
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // API routes
        .route("/api/status", get(routes::get_status))
        .route("/api/live", get(routes::get_live_all))
        .route("/api/live/:ticker", get(routes::get_live))
        .route("/api/history/:market_id", get(routes::get_history))
        .route("/api/markets", get(routes::get_markets))
        .route("/health", get(routes::health))
        // Dashboard HTML
        .route("/", get(serve_dashboard))
        .layer(cors)
        .with_state(state)
}

/// Serve the embedded HTML dashboard.
async fn serve_dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
