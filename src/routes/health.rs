use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    database: &'static str,
    timestamp: i64,
}

// GET /health - Liveness plus a database round trip
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database_ok = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();

    if !database_ok {
        tracing::error!("Health check could not reach the database");
    }

    let (status, code) = if database_ok {
        ("ok", StatusCode::OK)
    } else {
        ("degraded", StatusCode::SERVICE_UNAVAILABLE)
    };

    let response = HealthResponse {
        status,
        database: if database_ok { "up" } else { "down" },
        timestamp: chrono::Utc::now().timestamp(),
    };

    (code, Json(response))
}
