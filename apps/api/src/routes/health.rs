use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use crate::state::AppState;

/// GET /
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "Student API",
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/health"
    }))
}

/// GET /health
/// Liveness plus a round trip to the database.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let database = match state.students.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            warn!("Health check could not reach the database: {e}");
            "disconnected"
        }
    };
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "database": database,
        "version": env!("CARGO_PKG_VERSION")
    }))
}
