//! # Application State
//!
//! Shared state for the Axum application: the protocol engine and the
//! Prometheus handle, when a recorder is installed.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use tas_engine::TasEngine;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TasEngine>,
    pub prometheus: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine)
            .field("prometheus", &self.prometheus.as_ref().map(|_| "[installed]"))
            .finish()
    }
}

impl AppState {
    /// State around `engine`, without a Prometheus recorder.
    pub fn new(engine: TasEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            prometheus: None,
        }
    }

    /// Render `/metrics` from `handle`.
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}
