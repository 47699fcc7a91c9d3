//! # Routes
//!
//! Every workflow step is a `POST` under `/tas/api/v1`. Handlers parse the
//! body and run the engine call on the blocking pool; engine calls may
//! block on collaborator HTTP requests.

pub mod enroll;
pub mod issue;
pub mod offer;
pub mod revoke;
pub mod transactions;

use axum::{Json, Router};

use tas_core::TasError;
use tas_engine::TasEngine;

use crate::error::AppError;
use crate::state::AppState;

/// Path prefix of the protocol API.
pub const API_PREFIX: &str = "/tas/api/v1";

/// All protocol routes, nested under [`API_PREFIX`].
pub fn router() -> Router<AppState> {
    let v1 = Router::new()
        .merge(enroll::router())
        .merge(issue::router())
        .merge(revoke::router())
        .merge(offer::router())
        .merge(transactions::router());
    Router::new().nest(API_PREFIX, v1)
}

/// Run `f` against the engine on the blocking pool.
pub(crate) async fn run<T, F>(state: &AppState, f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&TasEngine) -> Result<T, TasError> + Send + 'static,
{
    let engine = state.engine.clone();
    let result = tokio::task::spawn_blocking(move || f(&engine))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(result?)
}

/// [`run`], answering with the value as JSON.
pub(crate) async fn run_json<T, F>(state: &AppState, f: F) -> Result<Json<T>, AppError>
where
    T: Send + 'static,
    F: FnOnce(&TasEngine) -> Result<T, TasError> + Send + 'static,
{
    run(state, f).await.map(Json)
}
