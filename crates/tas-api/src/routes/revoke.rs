//! REVOKE_VC workflow.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use tas_engine::{
    ConfirmRevokeVcRequest, ProposeRevokeVcReply, ProposeRevokeVcRequest, RequestRevokeVcRequest, TxReply,
};

use super::run_json;
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/propose-revoke-vc", post(propose_revoke_vc))
        .route("/request-revoke-vc", post(request_revoke_vc))
        .route("/confirm-revoke-vc", post(confirm_revoke_vc))
}

async fn propose_revoke_vc(
    State(state): State<AppState>,
    body: Result<Json<ProposeRevokeVcRequest>, JsonRejection>,
) -> Result<Json<ProposeRevokeVcReply>, AppError> {
    let req = extract_json(body)?;
    run_json(&state, move |engine| engine.propose_revoke_vc(req)).await
}

async fn request_revoke_vc(
    State(state): State<AppState>,
    body: Result<Json<RequestRevokeVcRequest>, JsonRejection>,
) -> Result<Json<TxReply>, AppError> {
    let req = extract_json(body)?;
    run_json(&state, move |engine| engine.request_revoke_vc(req)).await
}

async fn confirm_revoke_vc(
    State(state): State<AppState>,
    body: Result<Json<ConfirmRevokeVcRequest>, JsonRejection>,
) -> Result<Json<TxReply>, AppError> {
    let req = extract_json(body)?;
    run_json(&state, move |engine| engine.confirm_revoke_vc(req)).await
}
