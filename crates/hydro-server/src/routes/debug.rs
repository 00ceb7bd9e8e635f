use axum::extract::{Path, State};
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/debug/issues/:key/links: links as seen by both read paths.
pub async fn issue_links(
    State(app): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let diagnosis = app.engine.reader().diagnose(&key).await?;
    Ok(Json(serde_json::to_value(diagnosis)?))
}
