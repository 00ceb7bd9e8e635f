use axum::http::StatusCode;
use http_body_util::BodyExt;
use hydro_core::memory::MemoryTracker;
use hydro_core::model::Transition;
use hydro_core::{Engine, HydroConfig, TrackerConfig};
use std::sync::Arc;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Engine over an in-memory tracker holding a small park: S1 connects to P1
/// and P2, P1 is active at S2.
fn park() -> (Arc<MemoryTracker>, Arc<Engine>) {
    let mem = Arc::new(MemoryTracker::new());
    mem.add_issue("S1", "Puesto", "Puesto 1")
        .add_issue("S2", "Puesto", "Puesto 2")
        .add_issue("P1", "Bomba", "Bomba 1")
        .add_issue("P2", "Bomba", "Bomba 2")
        .add_issue("G1", "Epic", "Sistema Gruta N°1")
        .add_issue("W1", "Epic", "Bombas en reparación");
    mem.link("Connects", "P1", "S1");
    mem.link("Connects", "P2", "S1");
    mem.link("Connects", "P1", "S2");
    mem.link("Blocks", "P1", "S2");
    mem.set_grouping("P1", Some("G1"));

    let config = HydroConfig {
        tracker: TrackerConfig {
            project_key: Some("CH".into()),
            ..Default::default()
        },
        ..Default::default()
    };
    let engine = Arc::new(Engine::new(mem.clone(), &config));
    (mem, engine)
}

fn app(engine: &Arc<Engine>) -> axum::Router {
    hydro_server::build_router(Arc::clone(engine), None)
}

/// Send a GET request via `oneshot` and return (status, parsed JSON body).
async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Send a POST request with a JSON body via `oneshot` and return (status, parsed JSON body).
async fn post_json(
    app: axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

// ---------------------------------------------------------------------------
// Health and catalogs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_is_ok() {
    let (_mem, engine) = park();
    let (status, body) = get(app(&engine), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn groupings_are_listed() {
    let (_mem, engine) = park();
    let (status, body) = get(app(&engine), "/api/groupings").await;
    assert_eq!(status, StatusCode::OK);
    let keys: Vec<_> = body["groupings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["key"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(keys, vec!["W1", "G1"]);
}

#[tokio::test]
async fn unknown_api_path_is_404_json() {
    let (_mem, engine) = park();
    let (status, body) = get(app(&engine), "/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

// ---------------------------------------------------------------------------
// Stations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reassign_moves_active_equipment() {
    let (mem, engine) = park();

    let (status, body) = post_json(
        app(&engine),
        "/api/stations/S1/active-equipment",
        serde_json::json!({ "equipmentKey": "P1" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["ok"], true);
    assert_eq!(body["createdLink"], true);
    assert_eq!(body["unlinkedStations"], serde_json::json!([]));
    assert_eq!(body["grouping"], "G1");
    assert_eq!(mem.count_links("Blocks", "P1", "S1"), 1);
    assert_eq!(mem.count_links("Blocks", "P1", "S2"), 0);

    let (_, active) = get(app(&engine), "/api/stations/active?keys=S1,S2").await;
    assert_eq!(active["S1"]["activeKey"], "P1");
    assert_eq!(active["S2"]["activeKey"], serde_json::Value::Null);
}

#[tokio::test]
async fn reassign_accepts_legacy_field_name() {
    let (_mem, engine) = park();
    let (status, _) = post_json(
        app(&engine),
        "/api/stations/S1/active-equipment",
        serde_json::json!({ "selectedKey": "P2" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn reassign_unconnected_equipment_is_400() {
    let (mem, engine) = park();
    mem.add_issue("P9", "Bomba", "Bomba 9");

    let (status, body) = post_json(
        app(&engine),
        "/api/stations/S1/active-equipment",
        serde_json::json!({ "equipmentKey": "P9" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("P9"));
    assert!(mem.created_links().is_empty());
}

#[tokio::test]
async fn reassign_without_equipment_is_400() {
    let (_mem, engine) = park();
    let (status, _) = post_json(
        app(&engine),
        "/api/stations/S1/active-equipment",
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn station_options_flag_equipment_in_use() {
    let (_mem, engine) = park();
    let (status, body) = get(app(&engine), "/api/stations/S1/equipment").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["activeKey"], serde_json::Value::Null);
    let options = body["options"].as_array().unwrap();
    assert_eq!(options.len(), 2);
    assert_eq!(options[0]["key"], "P1");
    assert_eq!(options[0]["inUseElsewhere"], true);
    assert_eq!(options[0]["groupingSummary"], "Sistema Gruta N°1");
}

#[tokio::test]
async fn unknown_station_is_404() {
    let (_mem, engine) = park();
    let (status, _) = get(app(&engine), "/api/stations/S404/equipment").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

#[tokio::test]
async fn withdrawn_grouping_clears_active_link() {
    let (mem, engine) = park();
    mem.link("Blocks", "P2", "S1");

    let (status, body) = post_json(
        app(&engine),
        "/api/issues/S1/grouping",
        serde_json::json!({ "groupingKey": "W1" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["withdrawal"]["withdrawn"], true);
    assert_eq!(mem.count_links("Blocks", "P2", "S1"), 0);
    assert_eq!(mem.count_links("Connects", "P2", "S1"), 1);
}

#[tokio::test]
async fn control_list_reports_ungrouped_equipment() {
    let (_mem, engine) = park();
    let (status, body) = get(app(&engine), "/api/issues/control").await;
    assert_eq!(status, StatusCode::OK);
    let keys: Vec<_> = body["issues"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["key"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(keys, vec!["P2"]);
}

#[tokio::test]
async fn issues_by_key() {
    let (_mem, engine) = park();
    let (status, body) = get(app(&engine), "/api/issues?keys=S1,P1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["issues"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn transition_by_name_and_missing_target() {
    let (mem, engine) = park();
    mem.set_transitions(
        "P1",
        vec![Transition {
            id: "31".into(),
            name: "Averiar".into(),
            to_name: "Rojo".into(),
        }],
    );

    let (_, listed) = get(app(&engine), "/api/issues/P1/transitions").await;
    assert_eq!(listed["transitions"][0]["requiresBreakdownComment"], true);

    let (status, _) = post_json(
        app(&engine),
        "/api/issues/P1/transition",
        serde_json::json!({ "transitionName": "AVERIAR" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mem.status_of("P1").as_deref(), Some("Rojo"));

    let (status, _) = post_json(
        app(&engine),
        "/api/issues/P1/transition",
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn comment_requires_text() {
    let (mem, engine) = park();
    let (status, _) = post_json(
        app(&engine),
        "/api/issues/P1/comment",
        serde_json::json!({ "body": "  " }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        app(&engine),
        "/api/issues/P1/comment",
        serde_json::json!({ "body": "Sello cambiado" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mem.comments().len(), 1);
}

#[tokio::test]
async fn fields_update_and_options() {
    let (mem, engine) = park();
    let (status, _) = post_json(
        app(&engine),
        "/api/issues/P1/fields",
        serde_json::json!({ "fields": { "customfield_10200": "2 HP" } }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        mem.field_of("P1", "customfield_10200"),
        Some(serde_json::json!("2 HP"))
    );

    let (status, _) = post_json(app(&engine), "/api/issues/P1/fields", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(
        app(&engine),
        "/api/issues/P1/field-options?fieldId=customfield_10200",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fieldId"], "customfield_10200");

    let (status, _) = get(app(&engine), "/api/issues/P1/field-options").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Tracker and diagnostics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn whoami_and_link_diagnostics() {
    let (mem, engine) = park();
    let hidden = mem.link("Blocks", "P2", "S1");
    mem.hide_id_from_primary(&hidden);

    let (status, me) = get(app(&engine), "/api/tracker/me").await;
    assert_eq!(status, StatusCode::OK);
    assert!(me["displayName"].is_string());

    let (status, links) = get(app(&engine), "/api/debug/issues/S1/links").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(links["blockingLinkType"]["name"], "Blocks");
    let primary_ids: Vec<_> = links["primary"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["id"].clone())
        .collect();
    assert!(primary_ids.contains(&serde_json::Value::Null));
    let alternate_ids: Vec<_> = links["alternate"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["id"].clone())
        .collect();
    assert!(alternate_ids.contains(&serde_json::json!(hidden.as_str())));
}

#[tokio::test]
async fn static_dir_serves_index_for_client_routes() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>diagram</html>").unwrap();
    let (_mem, engine) = park();
    let app = hydro_server::build_router(engine, Some(dir.path().to_path_buf()));

    let req = axum::http::Request::builder()
        .uri("/stations/S1")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"<html>diagram</html>");
}
