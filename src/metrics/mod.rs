use once_cell::sync::OnceCell;
use std::error::Error;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialise the global Prometheus recorder and keep a handle for rendering
/// the exposition format.
///
/// Call once at programme start, before any estimate is served. Calling it
/// again after the first success is a no-op.
pub fn init() -> Result<(), Box<dyn Error + Send + Sync>> {
    if PROM_HANDLE.get().is_some() {
        return Ok(()); // already initialised
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

/// Global Prometheus handle, if [`init`] has run.
pub fn handle() -> Option<&'static PrometheusHandle> {
    PROM_HANDLE.get()
}

/// Render all recorded metrics; empty when no recorder is installed.
pub fn render() -> String {
    handle().map(PrometheusHandle::render).unwrap_or_default()
}
