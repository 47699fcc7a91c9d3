//! # Transaction State Machine
//!
//! A Transaction is one protocol run. It owns an ordered list of
//! SubTransactions, one per protocol step, and moves through:
//!
//! ```text
//! CREATED ──▶ IN_PROGRESS ──▶ COMPLETED
//!    │             │
//!    ├─────────────┼──▶ FAILED   (a FAIL step, or fail())
//!    └─────────────┴──▶ EXPIRED  (evaluated lazily on the next step)
//! ```
//!
//! ## Step Tables
//!
//! Each [`TransactionType`] has a fixed sequence of [`SubTransactionType`]s.
//! Step `n` may be recorded only when steps `1..n` exist and are all
//! `SUCCESS`; the recorded max step must be exactly `n - 1`. A step
//! recorded as `PENDING` claims its slot while an external call runs and is
//! finalized by [`Transaction::resolve_step()`].
//!
//! ## Design Decision
//!
//! The step tables are static slices rather than one typestate per step.
//! Six workflows with three or four steps each would need two dozen
//! state types, and every step is checked against the same rule.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tas_core::{Did, Nonce, TasError, Timestamp, TxId};

// ─── Types ───────────────────────────────────────────────────────────

/// Kind of protocol run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Enroll a partner entity with the Trusted Agent.
    EnrollEntity,
    /// Register an end user and their wallet.
    RegisterUser,
    /// Update a user's DID document.
    UpdateDiddoc,
    /// Restore a deactivated DID document.
    RestoreDiddoc,
    /// Issue a credential.
    IssueVc,
    /// Revoke a credential.
    RevokeVc,
}

impl TransactionType {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnrollEntity => "ENROLL_ENTITY",
            Self::RegisterUser => "REGISTER_USER",
            Self::UpdateDiddoc => "UPDATE_DIDDOC",
            Self::RestoreDiddoc => "RESTORE_DIDDOC",
            Self::IssueVc => "ISSUE_VC",
            Self::RevokeVc => "REVOKE_VC",
        }
    }

    /// Ordered step types; index `i` is step `i + 1`.
    pub fn steps(&self) -> &'static [SubTransactionType] {
        use SubTransactionType::*;
        match self {
            Self::EnrollEntity => &[ProposeEnrollEntity, RequestEcdh, RequestEnrollEntity, ConfirmEnrollEntity],
            Self::RegisterUser => &[ProposeRegisterUser, RequestEcdh, RequestRegisterUser, ConfirmRegisterUser],
            Self::UpdateDiddoc => &[ProposeUpdateDiddoc, RequestUpdateDiddoc, ConfirmUpdateDiddoc],
            Self::RestoreDiddoc => &[ProposeRestoreDiddoc, RequestRestoreDiddoc, ConfirmRestoreDiddoc],
            Self::IssueVc => &[ProposeIssueVc, RequestIssueProfile, RequestIssueVc, ConfirmIssueVc],
            Self::RevokeVc => &[ProposeRevokeVc, RequestRevokeVc, ConfirmRevokeVc],
        }
    }

    /// Step type expected at `step` (1-based).
    pub fn step_type(&self, step: u32) -> Option<SubTransactionType> {
        let index = usize::try_from(step).ok()?.checked_sub(1)?;
        self.steps().get(index).copied()
    }

    /// Number of steps in the table.
    pub fn step_count(&self) -> u32 {
        self.steps().len() as u32
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction status. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Begun; no step recorded.
    Created,
    /// At least one step recorded.
    InProgress,
    /// Every step succeeded and the run was confirmed (terminal).
    Completed,
    /// A step failed or the run was aborted (terminal).
    Failed,
    /// Passed `expiredAt` before completing (terminal).
    Expired,
}

impl TransactionStatus {
    /// Whether no further step may be recorded.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Expired)
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol step kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubTransactionType {
    ProposeEnrollEntity,
    RequestEnrollEntity,
    ConfirmEnrollEntity,
    ProposeRegisterUser,
    RequestRegisterUser,
    ConfirmRegisterUser,
    ProposeUpdateDiddoc,
    RequestUpdateDiddoc,
    ConfirmUpdateDiddoc,
    ProposeRestoreDiddoc,
    RequestRestoreDiddoc,
    ConfirmRestoreDiddoc,
    ProposeIssueVc,
    RequestIssueProfile,
    RequestIssueVc,
    ConfirmIssueVc,
    ProposeRevokeVc,
    RequestRevokeVc,
    ConfirmRevokeVc,
    /// ECDH handshake step shared by the enrollment and registration runs.
    RequestEcdh,
}

impl SubTransactionType {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProposeEnrollEntity => "PROPOSE_ENROLL_ENTITY",
            Self::RequestEnrollEntity => "REQUEST_ENROLL_ENTITY",
            Self::ConfirmEnrollEntity => "CONFIRM_ENROLL_ENTITY",
            Self::ProposeRegisterUser => "PROPOSE_REGISTER_USER",
            Self::RequestRegisterUser => "REQUEST_REGISTER_USER",
            Self::ConfirmRegisterUser => "CONFIRM_REGISTER_USER",
            Self::ProposeUpdateDiddoc => "PROPOSE_UPDATE_DIDDOC",
            Self::RequestUpdateDiddoc => "REQUEST_UPDATE_DIDDOC",
            Self::ConfirmUpdateDiddoc => "CONFIRM_UPDATE_DIDDOC",
            Self::ProposeRestoreDiddoc => "PROPOSE_RESTORE_DIDDOC",
            Self::RequestRestoreDiddoc => "REQUEST_RESTORE_DIDDOC",
            Self::ConfirmRestoreDiddoc => "CONFIRM_RESTORE_DIDDOC",
            Self::ProposeIssueVc => "PROPOSE_ISSUE_VC",
            Self::RequestIssueProfile => "REQUEST_ISSUE_PROFILE",
            Self::RequestIssueVc => "REQUEST_ISSUE_VC",
            Self::ConfirmIssueVc => "CONFIRM_ISSUE_VC",
            Self::ProposeRevokeVc => "PROPOSE_REVOKE_VC",
            Self::RequestRevokeVc => "REQUEST_REVOKE_VC",
            Self::ConfirmRevokeVc => "CONFIRM_REVOKE_VC",
            Self::RequestEcdh => "REQUEST_ECDH",
        }
    }
}

impl std::fmt::Display for SubTransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubTransactionStatus {
    /// Step finished successfully.
    Success,
    /// Step failed; the Transaction is FAILED.
    Fail,
    /// Step claimed; an external call is in flight.
    Pending,
}

/// One recorded protocol step. Immutable once its status is final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTransaction {
    /// 1-based step number.
    pub step: u32,
    /// Step kind.
    #[serde(rename = "type")]
    pub sub_type: SubTransactionType,
    /// Outcome.
    pub status: SubTransactionStatus,
    /// When the step was recorded.
    pub created_at: Timestamp,
    /// When the step status last changed.
    pub updated_at: Timestamp,
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Rejected Transaction mutations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    /// `expiredAt` has passed.
    #[error("transaction {tx_id} expired at {expired_at}")]
    Expired {
        /// Transaction id.
        tx_id: TxId,
        /// When it expired.
        expired_at: Timestamp,
    },

    /// Transaction is COMPLETED, FAILED or EXPIRED.
    #[error("transaction {tx_id} is {status}")]
    Terminal {
        /// Transaction id.
        tx_id: TxId,
        /// Terminal status.
        status: TransactionStatus,
    },

    /// Step type does not match the table for this step number.
    #[error("transaction {tx_id}: step {step} of {tx_type} is not {actual}")]
    StepTypeMismatch {
        /// Transaction id.
        tx_id: TxId,
        /// Transaction type.
        tx_type: TransactionType,
        /// Attempted step number.
        step: u32,
        /// Attempted step type.
        actual: SubTransactionType,
    },

    /// Step number is not the next one.
    #[error("transaction {tx_id}: expected step {expected}, got step {attempted}")]
    OutOfOrder {
        /// Transaction id.
        tx_id: TxId,
        /// The only step that may be recorded next.
        expected: u32,
        /// Attempted step number.
        attempted: u32,
    },

    /// A lower step exists but is not SUCCESS.
    #[error("transaction {tx_id}: step {step} is {status:?}, not SUCCESS")]
    PriorStepIncomplete {
        /// Transaction id.
        tx_id: TxId,
        /// The incomplete step.
        step: u32,
        /// Its status.
        status: SubTransactionStatus,
    },

    /// `resolve_step` on a step that is not PENDING.
    #[error("transaction {tx_id}: step {step} is not pending")]
    StepNotPending {
        /// Transaction id.
        tx_id: TxId,
        /// Step number.
        step: u32,
    },

    /// `complete` before every step succeeded.
    #[error("transaction {tx_id}: {recorded} of {required} steps succeeded")]
    Incomplete {
        /// Transaction id.
        tx_id: TxId,
        /// Successful steps.
        recorded: u32,
        /// Steps in the table.
        required: u32,
    },

    /// A context field that may be written once was already written.
    #[error("transaction {tx_id}: {field} already set")]
    AlreadySet {
        /// Transaction id.
        tx_id: TxId,
        /// Field name.
        field: &'static str,
    },
}

impl TransactionError {
    /// Transaction the error refers to.
    pub fn tx_id(&self) -> TxId {
        match self {
            Self::Expired { tx_id, .. }
            | Self::Terminal { tx_id, .. }
            | Self::StepTypeMismatch { tx_id, .. }
            | Self::OutOfOrder { tx_id, .. }
            | Self::PriorStepIncomplete { tx_id, .. }
            | Self::StepNotPending { tx_id, .. }
            | Self::Incomplete { tx_id, .. }
            | Self::AlreadySet { tx_id, .. } => *tx_id,
        }
    }
}

impl From<TransactionError> for TasError {
    fn from(err: TransactionError) -> Self {
        match &err {
            TransactionError::Expired { tx_id, .. } => TasError::TransactionExpired(tx_id.to_string()),
            TransactionError::AlreadySet {
                tx_id,
                field: "authNonce",
            } => TasError::AuthNonceAlreadySet(tx_id.to_string()),
            _ => TasError::transaction_invalid(err.tx_id(), err.to_string()),
        }
    }
}

// ─── Transaction ─────────────────────────────────────────────────────

/// A protocol run and its recorded steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Opaque unique id.
    pub tx_id: TxId,
    /// Protocol run kind.
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    /// Current status.
    pub status: TransactionStatus,
    /// DID the run is about (entity, holder).
    pub subject_did: Option<Did>,
    /// DID-Auth challenge; written once.
    pub auth_nonce: Option<Nonce>,
    /// Certificate VC id issued during enrollment.
    pub certificate_id: Option<String>,
    /// Correlation id from an external system (KYC, issuer).
    pub external_tx_id: Option<String>,
    /// DID of the external counterparty (issuer).
    pub external_did: Option<Did>,
    /// Opaque personal-data reference held for the run.
    pub pii: Option<String>,
    /// VC plan the run works on.
    pub vc_plan_id: Option<String>,
    /// Credential the run issues or revokes.
    pub vc_id: Option<String>,
    /// Offer redeemed by the run.
    pub offer_id: Option<String>,
    /// Why the run failed.
    pub failure_reason: Option<String>,
    /// Recorded steps, ordered by step number.
    pub sub_transactions: Vec<SubTransaction>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last mutation time.
    pub updated_at: Timestamp,
    /// Deadline for completing the run.
    pub expired_at: Timestamp,
}

impl Transaction {
    /// A fresh CREATED Transaction expiring `ttl_secs` after `now`.
    pub fn new(tx_type: TransactionType, now: Timestamp, ttl_secs: i64) -> Self {
        Self {
            tx_id: TxId::new(),
            tx_type,
            status: TransactionStatus::Created,
            subject_did: None,
            auth_nonce: None,
            certificate_id: None,
            external_tx_id: None,
            external_did: None,
            pii: None,
            vc_plan_id: None,
            vc_id: None,
            offer_id: None,
            failure_reason: None,
            sub_transactions: Vec::new(),
            created_at: now,
            updated_at: now,
            expired_at: now.plus_seconds(ttl_secs),
        }
    }

    /// Whether no further step may be recorded.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Highest recorded step number (0 if none).
    pub fn max_step(&self) -> u32 {
        self.sub_transactions.iter().map(|s| s.step).max().unwrap_or(0)
    }

    /// Recorded step `step`, if any.
    pub fn step(&self, step: u32) -> Option<&SubTransaction> {
        self.sub_transactions.iter().find(|s| s.step == step)
    }

    /// Mark EXPIRED if `expiredAt` has passed and the run is not terminal.
    ///
    /// Returns `true` when the Transaction is (now) EXPIRED.
    pub fn expire_if_due(&mut self, now: Timestamp) -> bool {
        if self.status == TransactionStatus::Expired {
            return true;
        }
        if !self.is_terminal() && self.expired_at.is_past(now) {
            self.status = TransactionStatus::Expired;
            self.updated_at = now;
            return true;
        }
        false
    }

    /// Error for an expired run.
    pub fn expired_error(&self) -> TransactionError {
        TransactionError::Expired {
            tx_id: self.tx_id,
            expired_at: self.expired_at,
        }
    }

    fn ensure_live(&self, now: Timestamp) -> Result<(), TransactionError> {
        if self.status == TransactionStatus::Expired
            || (!self.is_terminal() && self.expired_at.is_past(now))
        {
            return Err(self.expired_error());
        }
        if self.is_terminal() {
            return Err(TransactionError::Terminal {
                tx_id: self.tx_id,
                status: self.status,
            });
        }
        Ok(())
    }

    /// Record step `step` of kind `sub_type` with `status`.
    ///
    /// Does not mutate on error. Callers that must persist EXPIRED call
    /// [`expire_if_due()`](Self::expire_if_due) first.
    pub fn append_step(
        &mut self,
        step: u32,
        sub_type: SubTransactionType,
        status: SubTransactionStatus,
        now: Timestamp,
    ) -> Result<&SubTransaction, TransactionError> {
        self.ensure_live(now)?;
        if self.tx_type.step_type(step) != Some(sub_type) {
            return Err(TransactionError::StepTypeMismatch {
                tx_id: self.tx_id,
                tx_type: self.tx_type,
                step,
                actual: sub_type,
            });
        }
        let recorded = self.max_step();
        if step == 0 || recorded != step - 1 {
            return Err(TransactionError::OutOfOrder {
                tx_id: self.tx_id,
                expected: recorded + 1,
                attempted: step,
            });
        }
        for lower in 1..step {
            match self.step(lower).map(|s| s.status) {
                Some(SubTransactionStatus::Success) => {}
                Some(other) => {
                    return Err(TransactionError::PriorStepIncomplete {
                        tx_id: self.tx_id,
                        step: lower,
                        status: other,
                    })
                }
                None => {
                    return Err(TransactionError::OutOfOrder {
                        tx_id: self.tx_id,
                        expected: lower,
                        attempted: step,
                    })
                }
            }
        }

        self.sub_transactions.push(SubTransaction {
            step,
            sub_type,
            status,
            created_at: now,
            updated_at: now,
        });
        self.status = match status {
            SubTransactionStatus::Fail => TransactionStatus::Failed,
            _ => TransactionStatus::InProgress,
        };
        self.updated_at = now;
        let index = self.sub_transactions.len() - 1;
        Ok(&self.sub_transactions[index])
    }

    /// Finalize a PENDING step as SUCCESS or FAIL.
    ///
    /// Resolving to FAIL is permitted even after expiry so the audit trail
    /// records the outcome of an in-flight external call.
    pub fn resolve_step(
        &mut self,
        step: u32,
        outcome: SubTransactionStatus,
        now: Timestamp,
    ) -> Result<(), TransactionError> {
        if outcome == SubTransactionStatus::Success {
            self.ensure_live(now)?;
        }
        let tx_id = self.tx_id;
        let entry = self
            .sub_transactions
            .iter_mut()
            .find(|s| s.step == step && s.status == SubTransactionStatus::Pending)
            .ok_or(TransactionError::StepNotPending { tx_id, step })?;
        if outcome == SubTransactionStatus::Pending {
            return Err(TransactionError::StepNotPending { tx_id, step });
        }
        entry.status = outcome;
        entry.updated_at = now;
        if outcome == SubTransactionStatus::Fail && !self.is_terminal() {
            self.status = TransactionStatus::Failed;
        }
        self.updated_at = now;
        Ok(())
    }

    /// COMPLETED, once every step in the table succeeded.
    pub fn complete(&mut self, now: Timestamp) -> Result<(), TransactionError> {
        self.ensure_live(now)?;
        let required = self.tx_type.step_count();
        let recorded = (1..=required)
            .filter(|n| {
                self.step(*n)
                    .is_some_and(|s| s.status == SubTransactionStatus::Success)
            })
            .count() as u32;
        if recorded != required {
            return Err(TransactionError::Incomplete {
                tx_id: self.tx_id,
                recorded,
                required,
            });
        }
        self.status = TransactionStatus::Completed;
        self.updated_at = now;
        Ok(())
    }

    /// FAILED with `reason`. Pending steps are resolved FAIL.
    pub fn fail(&mut self, reason: impl Into<String>, now: Timestamp) -> Result<(), TransactionError> {
        if self.is_terminal() {
            return Err(TransactionError::Terminal {
                tx_id: self.tx_id,
                status: self.status,
            });
        }
        for sub in self
            .sub_transactions
            .iter_mut()
            .filter(|s| s.status == SubTransactionStatus::Pending)
        {
            sub.status = SubTransactionStatus::Fail;
            sub.updated_at = now;
        }
        self.status = TransactionStatus::Failed;
        self.failure_reason = Some(reason.into());
        self.updated_at = now;
        Ok(())
    }

    /// Store the DID-Auth challenge. Write-once.
    pub fn set_auth_nonce(&mut self, nonce: Nonce) -> Result<(), TransactionError> {
        if self.auth_nonce.is_some() {
            return Err(TransactionError::AlreadySet {
                tx_id: self.tx_id,
                field: "authNonce",
            });
        }
        self.auth_nonce = Some(nonce);
        Ok(())
    }

    /// Store the subject DID. Write-once; re-setting the same DID is a no-op.
    pub fn set_subject_did(&mut self, did: Did) -> Result<(), TransactionError> {
        match &self.subject_did {
            Some(existing) if *existing == did => Ok(()),
            Some(_) => Err(TransactionError::AlreadySet {
                tx_id: self.tx_id,
                field: "subjectDid",
            }),
            None => {
                self.subject_did = Some(did);
                Ok(())
            }
        }
    }
}
