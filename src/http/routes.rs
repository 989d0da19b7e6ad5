//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::app::AppState;
use crate::game::RoomStatus;
use crate::ws::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.client_origins))
        .with_state(state)
}

/// CORS for the configured origins; any origin when none are configured
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|s| match s.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %s, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(allowed)
    }
}

// ============================================================================
// Liveness
// ============================================================================

async fn root_handler() -> &'static str {
    "Dodge! multiplayer server is running"
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    connections: usize,
    rooms: Vec<RoomStatus>,
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.sessions.status().await {
        Some(status) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                uptime_secs: state.uptime.secs(),
                connections: status.connections,
                rooms: status.rooms,
            }),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unavailable",
                uptime_secs: state.uptime.secs(),
                connections: 0,
                rooms: Vec::new(),
            }),
        ),
    }
}
