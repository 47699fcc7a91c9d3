//! ISSUE_VC workflow.
//!
//! - `POST /propose-issue-vc`
//! - `POST /request-issue-profile`
//! - `POST /request-issue-vc`
//! - `POST /confirm-issue-vc`

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use tas_engine::{
    ConfirmIssueVcRequest, IssueProfileReply, ProposeIssueVcRequest, RequestIssueProfileRequest,
    RequestIssueVcRequest, SealedVcReply, TxReply,
};

use super::run_json;
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/propose-issue-vc", post(propose_issue_vc))
        .route("/request-issue-profile", post(request_issue_profile))
        .route("/request-issue-vc", post(request_issue_vc))
        .route("/confirm-issue-vc", post(confirm_issue_vc))
}

async fn propose_issue_vc(
    State(state): State<AppState>,
    body: Result<Json<ProposeIssueVcRequest>, JsonRejection>,
) -> Result<Json<TxReply>, AppError> {
    let req = extract_json(body)?;
    run_json(&state, move |engine| engine.propose_issue_vc(req)).await
}

async fn request_issue_profile(
    State(state): State<AppState>,
    body: Result<Json<RequestIssueProfileRequest>, JsonRejection>,
) -> Result<Json<IssueProfileReply>, AppError> {
    let req = extract_json(body)?;
    run_json(&state, move |engine| engine.request_issue_profile(req)).await
}

async fn request_issue_vc(
    State(state): State<AppState>,
    body: Result<Json<RequestIssueVcRequest>, JsonRejection>,
) -> Result<Json<SealedVcReply>, AppError> {
    let req = extract_json(body)?;
    run_json(&state, move |engine| engine.request_issue_vc(req)).await
}

async fn confirm_issue_vc(
    State(state): State<AppState>,
    body: Result<Json<ConfirmIssueVcRequest>, JsonRejection>,
) -> Result<Json<TxReply>, AppError> {
    let req = extract_json(body)?;
    run_json(&state, move |engine| engine.confirm_issue_vc(req)).await
}
