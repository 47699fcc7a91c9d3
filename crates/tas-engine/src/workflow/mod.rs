//! # VC Workflows
//!
//! Each workflow is a fixed sequence of API calls, one per step of its
//! Transaction type. Every call follows the same shape:
//!
//! 1. Load the Transaction and dry-run the step (`check_step`), so a
//!    repeated or out-of-order call fails before any work.
//! 2. Validate the caller (token, DID-Auth, ECDH proof).
//! 3. Claim the step PENDING, or record it SUCCESS when no collaborator
//!    is involved.
//! 4. Call collaborators under [`TasEngine::guarded()`]; an error there
//!    fails the Transaction.
//! 5. Resolve the step SUCCESS.
//!
//! | Workflow | Steps |
//! |----------|-------|
//! | [`issue`]  | propose → request profile (ECDH) → request VC → confirm |
//! | [`revoke`] | propose → request (DID-Auth) → confirm |
//! | [`enroll`] | propose → ECDH → request certificate → confirm |
//! | [`offer`]  | standalone: create and deliver an issue offer |

pub mod enroll;
pub mod issue;
pub mod offer;
pub mod revoke;

use serde::{Deserialize, Serialize};

use tas_core::{Did, TasError, TxId};
use tas_crypto::EncryptedPayload;
use tas_state::EntityRecord;

use crate::engine::TasEngine;

/// Body returned by steps that only report the Transaction id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReply {
    /// Transaction id.
    pub tx_id: TxId,
}

/// Encrypted credential: `{txId, iv, encVc}`, both ciphertext fields
/// multibase-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedVcReply {
    /// Transaction id.
    pub tx_id: TxId,
    /// Multibase IV.
    pub iv: String,
    /// Multibase ciphertext of the credential JSON.
    pub enc_vc: String,
}

impl SealedVcReply {
    pub(crate) fn new(tx_id: TxId, payload: &EncryptedPayload) -> Self {
        Self {
            tx_id,
            iv: payload.iv_multibase(),
            enc_vc: payload.data_multibase(),
        }
    }
}

/// Fresh credential id.
pub(crate) fn new_vc_id() -> String {
    format!("urn:uuid:{}", uuid::Uuid::new_v4())
}

impl TasEngine {
    /// `issuer` must be a known, ENROLLED entity.
    pub(crate) fn enrolled_entity(&self, issuer: &Did) -> Result<EntityRecord, TasError> {
        let entity = self
            .store
            .get_entity(issuer)?
            .ok_or_else(|| TasError::EntityNotFound(issuer.to_string()))?;
        if !entity.is_enrolled() {
            return Err(TasError::EntityNotEnrolled(issuer.to_string()));
        }
        Ok(entity)
    }
}

/// A context field every later step relies on.
pub(crate) fn required<'a, T>(value: &'a Option<T>, tx_id: &TxId, field: &str) -> Result<&'a T, TasError> {
    value
        .as_ref()
        .ok_or_else(|| TasError::transaction_invalid(tx_id, format!("{field} is not set")))
}
