// src/web/system_handlers.rs
use crate::{error::AppError, state::AppState};
use axum::{extract::State, http::Uri, Json};
use chrono::Utc;
use serde_json::{json, Value};

// GET /
pub async fn handle_root() -> Json<Value> {
    Json(json!({
        "message": "🏨 Hostel Management System API",
        "status": "Server is running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// GET /api/health
pub async fn handle_health(State(state): State<AppState>) -> Json<Value> {
    let database = match sqlx::query("SELECT 1").execute(&state.db_pool).await {
        Ok(_) => "Connected",
        Err(e) => {
            tracing::error!("Health check: base de dados indisponível: {}", e);
            "Disconnected"
        }
    };
    Json(json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339(),
        "database": database,
        "environment": state.config.app_env,
    }))
}

// Rotas inexistentes
pub async fn handle_not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("Rota {} não encontrada", uri))
}
