//! RPC HTTP Server
//!
//! Axum-based HTTP server that handles JSON-RPC requests and serves the
//! latest telemetry snapshot.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::mining::TelemetrySnapshot;
use crate::rpc::methods::{handle_request, JsonRpcRequest, JsonRpcResponse, RpcState};

/// Routes with permissive CORS for browser front ends
pub fn router(state: Arc<RpcState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", post(handle_rpc))
        .route("/telemetry", get(serve_telemetry))
        .layer(cors)
        .with_state(state)
}

/// Serve on `port` until `shutdown` flips to true or its sender is dropped
pub async fn start_rpc_server(
    state: Arc<RpcState>,
    port: u16,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("RPC server listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            while shutdown.changed().await.is_ok() {
                if *shutdown.borrow() {
                    break;
                }
            }
        })
        .await?;

    info!("RPC server stopped");
    Ok(())
}

/// Latest telemetry, read without locking the producer
async fn serve_telemetry(State(state): State<Arc<RpcState>>) -> Json<TelemetrySnapshot> {
    Json(state.node.telemetry())
}

/// Handle incoming JSON-RPC requests
async fn handle_rpc(
    State(state): State<Arc<RpcState>>,
    Json(request): Json<JsonRpcRequest>,
) -> (StatusCode, Json<JsonRpcResponse>) {
    let response = handle_request(&state, request).await;
    (StatusCode::OK, Json(response))
}
