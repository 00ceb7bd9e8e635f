use crate::context::{runtime, TrackerArgs};
use anyhow::{bail, Result};
use hydro_core::Engine;
use std::path::PathBuf;

pub fn run(tracker: &TrackerArgs, port: u16, static_dir: Option<PathBuf>, open: bool) -> Result<()> {
    if let Some(dir) = &static_dir {
        if !dir.is_dir() {
            bail!("static directory '{}' does not exist", dir.display());
        }
    }

    let engine = tracker.engine()?;
    let rt = runtime()?;
    rt.block_on(async move {
        preload_catalogs(&engine).await;
        hydro_server::serve(engine, static_dir, port, open).await
    })
}

/// Fill the link-type and grouping-field caches before the first request.
/// Failures are left for the first request to retry.
async fn preload_catalogs(engine: &Engine) {
    match engine.link_types().all().await {
        Ok(types) => tracing::info!(count = types.len(), "link types loaded"),
        Err(e) => tracing::warn!(error = %e, "could not load link types"),
    }
    match engine.grouping_field().resolve().await {
        Ok(field) => tracing::info!(field = ?field, "grouping field resolved"),
        Err(e) => tracing::warn!(error = %e, "could not resolve grouping field"),
    }
}
