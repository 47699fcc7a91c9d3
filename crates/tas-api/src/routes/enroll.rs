//! Entity enrollment and the shared ECDH step.
//!
//! - `POST /propose-enroll-entity`
//! - `POST /request-ecdh`
//! - `POST /request-enroll-entity`
//! - `POST /confirm-enroll-entity`

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use tas_engine::{
    ConfirmEnrollEntityRequest, ProposeEnrollEntityReply, ProposeEnrollEntityRequest, RequestEcdhReply,
    RequestEcdhRequest, RequestEnrollEntityRequest, SealedVcReply, TxReply,
};

use super::run_json;
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/propose-enroll-entity", post(propose_enroll_entity))
        .route("/request-ecdh", post(request_ecdh))
        .route("/request-enroll-entity", post(request_enroll_entity))
        .route("/confirm-enroll-entity", post(confirm_enroll_entity))
}

async fn propose_enroll_entity(
    State(state): State<AppState>,
    body: Result<Json<ProposeEnrollEntityRequest>, JsonRejection>,
) -> Result<Json<ProposeEnrollEntityReply>, AppError> {
    let req = extract_json(body)?;
    run_json(&state, move |engine| engine.propose_enroll_entity(req)).await
}

async fn request_ecdh(
    State(state): State<AppState>,
    body: Result<Json<RequestEcdhRequest>, JsonRejection>,
) -> Result<Json<RequestEcdhReply>, AppError> {
    let req = extract_json(body)?;
    run_json(&state, move |engine| engine.request_ecdh(req)).await
}

async fn request_enroll_entity(
    State(state): State<AppState>,
    body: Result<Json<RequestEnrollEntityRequest>, JsonRejection>,
) -> Result<Json<SealedVcReply>, AppError> {
    let req = extract_json(body)?;
    run_json(&state, move |engine| engine.request_enroll_entity(req)).await
}

async fn confirm_enroll_entity(
    State(state): State<AppState>,
    body: Result<Json<ConfirmEnrollEntityRequest>, JsonRejection>,
) -> Result<Json<TxReply>, AppError> {
    let req = extract_json(body)?;
    run_json(&state, move |engine| engine.confirm_enroll_entity(req)).await
}
