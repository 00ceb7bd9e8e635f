use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingBody {
    /// Null or blank clears the grouping.
    #[serde(default, alias = "epicKey")]
    pub grouping_key: Option<String>,
}

/// GET /api/groupings: groupings offered in the selector.
pub async fn list_groupings(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let groupings = app.engine.groupings().list_groupings().await?;
    Ok(Json(serde_json::json!({ "groupings": groupings })))
}

/// POST /api/issues/:key/grouping: set the grouping and apply the
/// withdrawal side effect.
pub async fn set_grouping(
    State(app): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<GroupingBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let update = app
        .engine
        .groupings()
        .set_grouping(&key, body.grouping_key.as_deref())
        .await?;
    let mut out = serde_json::to_value(update)?;
    out["ok"] = serde_json::Value::Bool(true);
    Ok(Json(out))
}
