//! Issue offers and push token registration.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};

use tas_engine::{IssueOfferReply, RegisterPushTokenRequest, RequestIssueOfferRequest};

use super::{run, run_json};
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/request-issue-offer", post(request_issue_offer))
        .route("/register-push-token", post(register_push_token))
}

async fn request_issue_offer(
    State(state): State<AppState>,
    body: Result<Json<RequestIssueOfferRequest>, JsonRejection>,
) -> Result<Json<IssueOfferReply>, AppError> {
    let req = extract_json(body)?;
    run_json(&state, move |engine| engine.request_issue_offer(req)).await
}

async fn register_push_token(
    State(state): State<AppState>,
    body: Result<Json<RegisterPushTokenRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let req = extract_json(body)?;
    run(&state, move |engine| engine.register_push_token(req)).await?;
    Ok(StatusCode::NO_CONTENT)
}
