use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use super::KeysParams;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionBody {
    #[serde(default)]
    pub transition_id: Option<String>,
    #[serde(default)]
    pub transition_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct FieldsBody {
    #[serde(default)]
    pub fields: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOptionsParams {
    #[serde(default)]
    pub field_id: String,
}

/// GET /api/issues?keys=A,B: explicit keys, configured keys, or the project.
pub async fn list_issues(
    State(app): State<AppState>,
    Query(params): Query<KeysParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let issues = app.engine.directory().list_issues(&params.keys()).await?;
    Ok(Json(serde_json::json!({ "issues": issues })))
}

/// GET /api/issues/control: equipment that needs attention.
pub async fn control_list(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let issues = app.engine.control().list_for_attention().await?;
    Ok(Json(serde_json::json!({ "issues": issues })))
}

/// GET /api/issues/:key/transitions
pub async fn list_transitions(
    State(app): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let transitions = app.engine.workflow().transitions(&key).await?;
    Ok(Json(serde_json::json!({ "transitions": transitions })))
}

/// POST /api/issues/:key/transition: by `transitionId` or `transitionName`.
pub async fn transition_issue(
    State(app): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<TransitionBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let applied = app
        .engine
        .workflow()
        .transition(
            &key,
            body.transition_id.as_deref(),
            body.transition_name.as_deref(),
        )
        .await?;
    Ok(Json(serde_json::json!({ "ok": true, "transition": applied })))
}

/// POST /api/issues/:key/comment
pub async fn add_comment(
    State(app): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<CommentBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    app.engine.workflow().comment(&key, &body.body).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// POST /api/issues/:key/fields: partial field update.
pub async fn update_fields(
    State(app): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<FieldsBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    app.engine.workflow().update_fields(&key, body.fields).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// GET /api/issues/:key/field-options?fieldId=
pub async fn field_options(
    State(app): State<AppState>,
    Path(key): Path<String>,
    Query(params): Query<FieldOptionsParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let options = app
        .engine
        .workflow()
        .field_options(&key, &params.field_id)
        .await?;
    Ok(Json(serde_json::to_value(options)?))
}
