use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use super::KeysParams;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveEquipmentBody {
    #[serde(default, alias = "selectedKey")]
    pub equipment_key: String,
}

/// GET /api/stations/active?keys=S1,S2: active equipment per station.
pub async fn active_batch(
    State(app): State<AppState>,
    Query(params): Query<KeysParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let keys = params.keys();
    let active = app.engine.active().active_batch(&keys).await;
    let out: serde_json::Map<String, serde_json::Value> = active
        .into_iter()
        .map(|(station, key)| (station, serde_json::json!({ "activeKey": key })))
        .collect();
    Ok(Json(serde_json::Value::Object(out)))
}

/// GET /api/stations/:key/equipment: connectable equipment and the active one.
pub async fn station_options(
    State(app): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let options = app.engine.active().station_options(&key).await?;
    Ok(Json(serde_json::to_value(options)?))
}

/// POST /api/stations/:key/active-equipment: reassign the station.
pub async fn reassign(
    State(app): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<ActiveEquipmentBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let equipment = body.equipment_key.trim();
    if equipment.is_empty() {
        return Err(AppError::bad_request("equipmentKey is required"));
    }
    let outcome = app.engine.reconciler().reassign(&key, equipment).await?;
    let mut out = serde_json::to_value(outcome)?;
    out["ok"] = serde_json::Value::Bool(true);
    Ok(Json(out))
}
