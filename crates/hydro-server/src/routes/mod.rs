pub mod debug;
pub mod groupings;
pub mod issues;
pub mod stations;
pub mod tracker;

use axum::Json;
use serde::Deserialize;

/// `?keys=A,B,C` query string.
#[derive(Debug, Default, Deserialize)]
pub struct KeysParams {
    #[serde(default)]
    pub keys: Option<String>,
}

impl KeysParams {
    pub fn keys(&self) -> Vec<String> {
        hydro_core::config::parse_keys(self.keys.as_deref().unwrap_or_default())
    }
}

/// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}
