//! # tas-api — Trusted Agent HTTP Service
//!
//! Axum service over [`tas_engine::TasEngine`].
//!
//! ## API Surface
//!
//! | Path                                   | Module                    |
//! |----------------------------------------|---------------------------|
//! | `POST /tas/api/v1/*-enroll-entity`     | [`routes::enroll`]        |
//! | `POST /tas/api/v1/request-ecdh`        | [`routes::enroll`]        |
//! | `POST /tas/api/v1/*-issue-vc`, `request-issue-profile` | [`routes::issue`] |
//! | `POST /tas/api/v1/*-revoke-vc`         | [`routes::revoke`]        |
//! | `POST /tas/api/v1/request-issue-offer`, `register-push-token` | [`routes::offer`] |
//! | `GET  /tas/api/v1/transactions/{txId}` | [`routes::transactions`]  |
//! | `GET  /health/liveness`, `/health/readiness` | this module         |
//! | `GET  /metrics`                        | this module               |
//!
//! ## Middleware Stack
//!
//! TraceLayer → MetricsMiddleware → Handler
//!
//! ## Crate Policy
//!
//! - No business logic in route handlers; every step delegates to the engine.
//! - Engine calls run on the blocking pool.
//! - All errors map to `{code, description}` via `AppError`.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::ApiMetrics;

pub use config::{ConfigError, TasConfig};
pub use error::{AppError, ErrorBody};
pub use state::AppState;

/// Assemble the application router.
///
/// Health probes are mounted outside the metrics and trace layers.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();

    let api = Router::new()
        .merge(routes::router())
        .route("/metrics", get(render_metrics))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(metrics))
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .with_state(state);

    Router::new().merge(health).merge(api)
}

/// Liveness probe: 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 once the store answers.
async fn readiness(State(state): State<AppState>) -> Result<&'static str, AppError> {
    routes::run(&state, |engine| engine.check_ready()).await?;
    Ok("ready")
}

/// Prometheus exposition. Falls back to the in-process counters when no
/// recorder is installed.
async fn render_metrics(State(state): State<AppState>, Extension(metrics): Extension<ApiMetrics>) -> impl IntoResponse {
    let body = match &state.prometheus {
        Some(handle) => handle.render(),
        None => metrics.render(),
    };
    (StatusCode::OK, [("content-type", "text/plain; version=0.0.4")], body)
}
