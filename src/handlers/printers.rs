use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};
use tracing::{info, warn};

use super::AppState;
use crate::error::ServiceError;
use crate::formatter::JsonFormatter;

/// GET /printers
pub async fn list_printers(State(state): State<AppState>) -> Json<Value> {
    let printers: Vec<_> = state
        .store
        .records()
        .await
        .iter()
        .map(JsonFormatter::format_printer)
        .collect();

    Json(json!({ "printers": printers }))
}

/// POST /printers/{id}/refresh
///
/// Ошибка опроса не считается ошибкой запроса: 200 и `success: false`.
pub async fn refresh_printer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.service.refresh_one(&id).await {
        Ok(_) => {
            let printer = state.store.record(&id).await.map(|r| JsonFormatter::format_printer(&r));
            (StatusCode::OK, Json(json!({ "success": true, "printer": printer })))
        }
        Err(ServiceError::NotFound(id)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": format!("printer '{}' not found", id) })),
        ),
        Err(e) => {
            warn!(device = %id, error = %e, "обновление не удалось");
            (StatusCode::OK, Json(json!({ "success": false, "error": e.to_string() })))
        }
    }
}

/// POST /printers/refresh
pub async fn refresh_all(State(state): State<AppState>) -> Json<Value> {
    let report = state.service.refresh_all_with(state.shutdown.child_token()).await;
    info!(
        total = report.results.len(),
        failed = report.failures().count(),
        "пакетное обновление завершено"
    );

    Json(json!({ "success": report.success, "results": report.results }))
}
