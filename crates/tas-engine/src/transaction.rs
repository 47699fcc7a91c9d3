//! # Transaction Manager
//!
//! Store-backed operations over [`Transaction`]. Every mutation is a single
//! [`EntityStore::modify_transaction()`] call, so the ordering checks in
//! `tas-state` and the write that follows them are atomic.
//!
//! ## Lazy expiry
//!
//! There is no sweeper. Any load or advance that finds `expiredAt` in the
//! past persists EXPIRED and fails with `TransactionExpired`.
//!
//! ## Metrics
//!
//! `tas_transactions_total{type, outcome}` counts starts and terminal
//! transitions (`started`, `completed`, `failed`, `expired`).

use std::sync::Arc;

use serde::Serialize;

use tas_core::{Did, Nonce, TasError, Timestamp, TxId};
use tas_state::{
    EntityStore, SubTransaction, SubTransactionStatus, SubTransactionType, Transaction, TransactionError,
    TransactionStatus, TransactionType,
};

fn record_outcome(tx_type: TransactionType, outcome: &'static str) {
    metrics::counter!("tas_transactions_total", "type" => tx_type.as_str(), "outcome" => outcome).increment(1);
}

/// Read-only status of a Transaction, safe to return to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    /// Transaction id.
    pub tx_id: TxId,
    /// Workflow.
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    /// Status.
    pub status: TransactionStatus,
    /// Recorded steps.
    pub sub_transactions: Vec<SubTransaction>,
    /// Deadline.
    pub expired_at: Timestamp,
    /// Why the run failed, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl From<&Transaction> for TransactionView {
    fn from(tx: &Transaction) -> Self {
        Self {
            tx_id: tx.tx_id,
            tx_type: tx.tx_type,
            status: tx.status,
            sub_transactions: tx.sub_transactions.clone(),
            expired_at: tx.expired_at,
            failure_reason: tx.failure_reason.clone(),
        }
    }
}

/// Begin, advance, and finish Transactions.
#[derive(Clone)]
pub struct TransactionManager {
    store: Arc<dyn EntityStore>,
    ttl_secs: i64,
}

impl TransactionManager {
    /// Manager creating Transactions that live `ttl_secs`.
    pub fn new(store: Arc<dyn EntityStore>, ttl_secs: i64) -> Self {
        Self { store, ttl_secs }
    }

    /// Create a CREATED Transaction; `init` fills context fields before
    /// the insert.
    pub fn begin_with(
        &self,
        tx_type: TransactionType,
        init: impl FnOnce(&mut Transaction),
    ) -> Result<Transaction, TasError> {
        let mut tx = Transaction::new(tx_type, Timestamp::now(), self.ttl_secs);
        init(&mut tx);
        self.store.insert_transaction(tx.clone())?;
        record_outcome(tx_type, "started");
        tracing::info!(tx_id = %tx.tx_id, tx_type = %tx_type.as_str(), "transaction started");
        Ok(tx)
    }

    /// Create a CREATED Transaction.
    pub fn begin(&self, tx_type: TransactionType) -> Result<Transaction, TasError> {
        self.begin_with(tx_type, |_| {})
    }

    /// Load a Transaction, persisting EXPIRED if it is due.
    pub fn lookup(&self, tx_id: &TxId) -> Result<Transaction, TasError> {
        let tx = self
            .store
            .get_transaction(tx_id)?
            .ok_or_else(|| TasError::TransactionNotFound(tx_id.to_string()))?;
        let mut probe = tx.clone();
        if probe.status != TransactionStatus::Expired && probe.expire_if_due(Timestamp::now()) {
            return Err(self.persist_expiry(tx_id));
        }
        Ok(tx)
    }

    /// Transactions whose subject is `did`.
    pub fn find_by_did(&self, did: &Did) -> Result<Vec<Transaction>, TasError> {
        Ok(self.store.find_transactions_by_did(did)?)
    }

    /// Load `tx_id` and check that step `step` of kind `sub_type` could be
    /// recorded now, without recording it.
    pub fn check_step(&self, tx_id: &TxId, step: u32, sub_type: SubTransactionType) -> Result<Transaction, TasError> {
        let tx = self.lookup(tx_id)?;
        let mut probe = tx.clone();
        probe.append_step(step, sub_type, SubTransactionStatus::Pending, Timestamp::now())?;
        Ok(tx)
    }

    /// Apply `f` atomically after the expiry check. An expired Transaction
    /// is persisted EXPIRED and `f` does not run.
    pub fn mutate(
        &self,
        tx_id: &TxId,
        mut f: impl FnMut(&mut Transaction, Timestamp) -> Result<(), TransactionError>,
    ) -> Result<Transaction, TasError> {
        let now = Timestamp::now();
        let mut expired: Option<TransactionError> = None;
        let mut newly_expired = false;
        let tx = self.store.modify_transaction(tx_id, &mut |tx: &mut Transaction| {
            let was_expired = tx.status == TransactionStatus::Expired;
            if tx.expire_if_due(now) {
                newly_expired = !was_expired;
                expired = Some(tx.expired_error());
                return Ok(());
            }
            f(tx, now)
        })?;
        if let Some(err) = expired {
            if newly_expired {
                record_outcome(tx.tx_type, "expired");
                tracing::info!(tx_id = %tx_id, "transaction expired");
            }
            return Err(err.into());
        }
        Ok(tx)
    }

    /// Record step `step`. PENDING claims it while an external call runs;
    /// FAIL terminates the Transaction.
    pub fn advance(
        &self,
        tx_id: &TxId,
        step: u32,
        sub_type: SubTransactionType,
        status: SubTransactionStatus,
    ) -> Result<Transaction, TasError> {
        let tx = self.mutate(tx_id, |tx, now| tx.append_step(step, sub_type, status, now).map(|_| ()))?;
        if status == SubTransactionStatus::Fail {
            record_outcome(tx.tx_type, "failed");
        }
        tracing::info!(tx_id = %tx_id, step, sub_type = %sub_type, status = ?status, "step recorded");
        Ok(tx)
    }

    /// Finalize a PENDING step.
    pub fn resolve_step(&self, tx_id: &TxId, step: u32, outcome: SubTransactionStatus) -> Result<Transaction, TasError> {
        if outcome == SubTransactionStatus::Fail {
            return self.record_failure(tx_id, |tx, now| tx.resolve_step(step, outcome, now));
        }
        self.mutate(tx_id, |tx, now| tx.resolve_step(step, outcome, now))
    }

    /// COMPLETED, once every step succeeded.
    pub fn complete(&self, tx_id: &TxId) -> Result<Transaction, TasError> {
        self.complete_with(tx_id, |_, _| Ok(()))
    }

    /// Apply `f` (typically recording the last step) and mark the
    /// Transaction COMPLETED in one write. Nothing is committed unless
    /// both succeed.
    pub fn complete_with(
        &self,
        tx_id: &TxId,
        mut f: impl FnMut(&mut Transaction, Timestamp) -> Result<(), TransactionError>,
    ) -> Result<Transaction, TasError> {
        let tx = self.mutate(tx_id, |tx, now| {
            f(tx, now)?;
            tx.complete(now)
        })?;
        record_outcome(tx.tx_type, "completed");
        tracing::info!(tx_id = %tx_id, "transaction completed");
        Ok(tx)
    }

    /// FAILED with `reason`; pending steps become FAIL.
    pub fn fail(&self, tx_id: &TxId, reason: &str) -> Result<Transaction, TasError> {
        let tx = self.record_failure(tx_id, |tx, now| tx.fail(reason, now))?;
        tracing::warn!(tx_id = %tx_id, reason, "transaction failed");
        Ok(tx)
    }

    /// Store the DID-Auth challenge. Write-once.
    pub fn set_auth_nonce(&self, tx_id: &TxId, nonce: Nonce) -> Result<Transaction, TasError> {
        self.mutate(tx_id, |tx, _| tx.set_auth_nonce(nonce.clone()))
    }

    /// Failure paths skip the expiry check: the outcome of an in-flight
    /// external call is recorded even after the deadline.
    fn record_failure(
        &self,
        tx_id: &TxId,
        mut f: impl FnMut(&mut Transaction, Timestamp) -> Result<(), TransactionError>,
    ) -> Result<Transaction, TasError> {
        let now = Timestamp::now();
        let mut newly_failed = false;
        let tx = self.store.modify_transaction(tx_id, &mut |tx: &mut Transaction| {
            let was_terminal = tx.is_terminal();
            f(tx, now)?;
            newly_failed = !was_terminal && tx.status == TransactionStatus::Failed;
            Ok(())
        })?;
        if newly_failed {
            record_outcome(tx.tx_type, "failed");
        }
        Ok(tx)
    }

    fn persist_expiry(&self, tx_id: &TxId) -> TasError {
        match self.mutate(tx_id, |_, _| Ok(())) {
            Err(err) => err,
            Ok(tx) => TransactionError::Expired {
                tx_id: tx.tx_id,
                expired_at: tx.expired_at,
            }
            .into(),
        }
    }
}
