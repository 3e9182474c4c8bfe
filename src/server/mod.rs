use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::storage::GtfsStore;

pub mod routes;

/// Server state
pub struct AppState {
    pub store: Mutex<GtfsStore>,
}

pub fn router(store: GtfsStore) -> Router {
    let state = Arc::new(AppState {
        store: Mutex::new(store),
    });

    Router::new()
        .route("/stats", get(routes::get_stats))
        .route("/entities/{name}", get(routes::get_entities))
        .route("/geojson/shapes", get(routes::get_shapes_geojson))
        .route("/geojson/stops", get(routes::get_stops_geojson))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(port: u16, store: GtfsStore) -> anyhow::Result<()> {
    let app = router(store);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);
    println!("🌍 Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
