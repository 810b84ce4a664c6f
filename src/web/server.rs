use crate::Result;
use axum::{
    Router,
    routing::{get, post, put},
};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;

use super::routes;

pub fn router() -> Router {
    Router::new()
        // Panel
        .route("/", get(routes::index::index))
        .route("/health", get(|| async { "OK" }))
        // Worker lifecycle
        .route("/worker", post(routes::worker::dispatch))
        // Server profiles
        .route("/servers", get(routes::servers::list))
        .route("/servers/{index}", put(routes::servers::set))
        // Domain allow-lists
        .route(
            "/servers/{index}/domains",
            get(routes::domains::load).post(routes::domains::save),
        )
        // Connectivity check
        .route("/check", post(routes::check::check))
        // the panel front end is served from file://, so any origin goes
        .layer(CorsLayer::permissive())
}

pub async fn serve(port: u16) -> Result<()> {
    let app = router();

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| miette::miette!("Failed to bind API server to {}: {}", addr, e))?;

    info!("API listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| miette::miette!("API server error: {}", e))?;

    Ok(())
}
