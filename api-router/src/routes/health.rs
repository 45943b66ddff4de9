use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::api_state::ApiState;

/// Liveness check: always returns 200 while the process is running.
pub async fn live() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

/// Readiness check: returns 200 once the database and document storage answer, else 503.
pub async fn ready(State(state): State<ApiState>) -> impl IntoResponse {
    let db = state.db.client.query("RETURN true").await.map(|_| ());
    let storage = state.documents.list_file_names().await.map(|_| ());

    let status = |ok: bool| if ok { "ok" } else { "fail" };
    let checks = json!({
        "db": status(db.is_ok()),
        "storage": status(storage.is_ok()),
    });

    match (db, storage) {
        (Ok(()), Ok(())) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "checks": checks })),
        ),
        (db, storage) => {
            let reason = db
                .err()
                .map(|e| e.to_string())
                .or_else(|| storage.err().map(|e| e.to_string()))
                .unwrap_or_default();
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "error", "checks": checks, "reason": reason })),
            )
        }
    }
}
