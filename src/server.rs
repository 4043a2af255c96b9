use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use log::info;

use crate::metrics::exposition::{self, CONTENT_TYPE};
use crate::metrics::SnapshotStore;

pub fn router(store: Arc<SnapshotStore>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/health", get(health))
        .with_state(store)
}

pub async fn serve(addr: SocketAddr, store: Arc<SnapshotStore>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("exporter listening on {}", addr);
    axum::serve(listener, router(store)).await?;

    Ok(())
}

async fn metrics(State(store): State<Arc<SnapshotStore>>) -> impl IntoResponse {
    let snapshot = store.current();
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], exposition::render(&snapshot))
}

async fn health() -> &'static str {
    "ok"
}
