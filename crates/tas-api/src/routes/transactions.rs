//! `GET /transactions/{txId}`: status view of a Transaction.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use tas_core::TxId;
use tas_engine::TransactionView;

use super::run_json;
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/transactions/{tx_id}", get(transaction_status))
}

async fn transaction_status(
    State(state): State<AppState>,
    Path(tx_id): Path<String>,
) -> Result<Json<TransactionView>, AppError> {
    let tx_id = TxId::parse(&tx_id).map_err(tas_core::TasError::from)?;
    run_json(&state, move |engine| engine.transaction_status(&tx_id)).await
}
