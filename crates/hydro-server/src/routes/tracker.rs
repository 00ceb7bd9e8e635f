use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/tracker/me: the account the server authenticates as.
pub async fn whoami(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let account = app.engine.workflow().whoami().await?;
    Ok(Json(serde_json::to_value(account)?))
}
