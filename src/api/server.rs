use axum::Json;
use serde_json::{json, Value};

/// GET /api/health - liveness check
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "podsearch service running"
    }))
}
