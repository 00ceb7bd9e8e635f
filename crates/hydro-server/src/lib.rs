pub mod error;
pub mod routes;
pub mod state;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use hydro_core::Engine;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
///
/// With `static_dir`, unknown paths are served from that directory and fall
/// back to its `index.html` so client-side routes resolve.
pub fn build_router(engine: Arc<Engine>, static_dir: Option<PathBuf>) -> Router {
    let app_state = state::AppState::new(engine);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/api/health", get(routes::health))
        // Groupings
        .route("/api/groupings", get(routes::groupings::list_groupings))
        // Issues
        .route("/api/issues", get(routes::issues::list_issues))
        .route("/api/issues/control", get(routes::issues::control_list))
        .route(
            "/api/issues/{key}/transitions",
            get(routes::issues::list_transitions),
        )
        .route(
            "/api/issues/{key}/transition",
            post(routes::issues::transition_issue),
        )
        .route(
            "/api/issues/{key}/comment",
            post(routes::issues::add_comment),
        )
        .route(
            "/api/issues/{key}/fields",
            post(routes::issues::update_fields),
        )
        .route(
            "/api/issues/{key}/field-options",
            get(routes::issues::field_options),
        )
        .route(
            "/api/issues/{key}/grouping",
            post(routes::groupings::set_grouping),
        )
        // Stations
        .route("/api/stations/active", get(routes::stations::active_batch))
        .route(
            "/api/stations/{key}/equipment",
            get(routes::stations::station_options),
        )
        .route(
            "/api/stations/{key}/active-equipment",
            post(routes::stations::reassign),
        )
        // Tracker
        .route("/api/tracker/me", get(routes::tracker::whoami))
        .route(
            "/api/debug/issues/{key}/links",
            get(routes::debug::issue_links),
        );

    let router = match static_dir {
        Some(dir) => {
            let index = dir.join("index.html");
            router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)))
        }
        None => router.fallback(not_found),
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "not found" })),
    )
}

/// Start the HTTP server.
pub async fn serve(
    engine: Arc<Engine>,
    static_dir: Option<PathBuf>,
    port: u16,
    open_browser: bool,
) -> anyhow::Result<()> {
    let app = build_router(engine, static_dir);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("hydro server listening on http://localhost:{port}");

    if open_browser {
        let url = format!("http://localhost:{port}");
        let _ = open::that(&url);
    }

    axum::serve(listener, app).await?;
    Ok(())
}
