//! # Revoke VC
//!
//! ```text
//! 1 propose-revoke-vc   VC meta exists, not REVOKED     → {txId, authNonce}
//! 2 request-revoke-vc   holder DID-Auth; issuer revokes,
//!                       registry status → REVOKED        → {txId}
//! 3 confirm-revoke-vc   COMPLETED                        → {txId}
//! ```
//!
//! Only the credential's holder (the meta's `subject`) may revoke it.

use serde::{Deserialize, Serialize};

use tas_core::{Nonce, TasError, TxId};
use tas_crypto::random::random_nonce;
use tas_state::{SubTransactionStatus, SubTransactionType, TransactionType};
use tas_vc::{DidAuth, VcMeta, VcStatus};

use super::{required, TxReply};
use crate::did_auth::verify_did_auth;
use crate::engine::TasEngine;

/// Step 1 body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposeRevokeVcRequest {
    /// Credential to revoke.
    pub vc_id: String,
}

/// Step 1 answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposeRevokeVcReply {
    /// Transaction id.
    pub tx_id: TxId,
    /// Challenge the holder signs in step 2.
    pub auth_nonce: Nonce,
}

/// Step 2 body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRevokeVcRequest {
    /// Transaction id.
    pub tx_id: TxId,
    /// Holder's answer to the challenge.
    pub did_auth: DidAuth,
}

/// Step 3 body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRevokeVcRequest {
    /// Transaction id.
    pub tx_id: TxId,
}

impl TasEngine {
    fn revocable_meta(&self, vc_id: &str) -> Result<VcMeta, TasError> {
        let meta = self
            .registry
            .get_vc_meta(vc_id)?
            .ok_or_else(|| TasError::VcMetaNotFound(vc_id.to_string()))?;
        if meta.status == VcStatus::Revoked {
            return Err(TasError::VcAlreadyRevoked(vc_id.to_string()));
        }
        Ok(meta)
    }

    /// Step 1: open a REVOKE_VC run and hand out the challenge.
    pub fn propose_revoke_vc(&self, req: ProposeRevokeVcRequest) -> Result<ProposeRevokeVcReply, TasError> {
        let meta = self.revocable_meta(&req.vc_id)?;
        let tx = self.transactions.begin_with(TransactionType::RevokeVc, |tx| {
            tx.vc_id = Some(meta.id.clone());
            tx.vc_plan_id = Some(meta.vc_plan_id.clone());
            tx.subject_did = Some(meta.subject.clone());
            tx.external_did = Some(meta.issuer.clone());
        })?;
        let tx_id = tx.tx_id;
        let auth_nonce = random_nonce();
        self.transactions.mutate(&tx_id, |tx, now| {
            tx.append_step(1, SubTransactionType::ProposeRevokeVc, SubTransactionStatus::Success, now)?;
            tx.set_auth_nonce(auth_nonce.clone())
        })?;
        tracing::info!(tx_id = %tx_id, vc_id = %meta.id, "revocation proposed");
        Ok(ProposeRevokeVcReply { tx_id, auth_nonce })
    }

    /// Step 2: authenticate the holder, revoke at the issuer and in the
    /// registry.
    pub fn request_revoke_vc(&self, req: RequestRevokeVcRequest) -> Result<TxReply, TasError> {
        let tx_id = req.tx_id;
        let tx = self.transactions.check_step(&tx_id, 2, SubTransactionType::RequestRevokeVc)?;
        let holder = required(&tx.subject_did, &tx_id, "subjectDid")?;
        if &req.did_auth.did != holder {
            return Err(TasError::HolderMismatch(format!(
                "{} is not the holder of the credential",
                req.did_auth.did
            )));
        }
        let vc_id = required(&tx.vc_id, &tx_id, "vcId")?.clone();
        let meta = self.prechecked(&tx_id, || {
            let meta = self.revocable_meta(&vc_id)?;
            verify_did_auth(self.registry.as_ref(), &req.did_auth, &tx)?;
            Ok(meta)
        })?;

        self.transactions.advance(
            &tx_id,
            2,
            SubTransactionType::RequestRevokeVc,
            SubTransactionStatus::Pending,
        )?;
        self.guarded(&tx_id, 2, || {
            self.issuer.revoke_vc(&meta.issuer, &vc_id)?;
            self.registry.update_vc_status(&vc_id, VcStatus::Revoked)?;
            self.transactions.resolve_step(&tx_id, 2, SubTransactionStatus::Success)?;
            tracing::info!(tx_id = %tx_id, vc_id = %vc_id, "credential revoked");
            Ok(TxReply { tx_id })
        })
    }

    /// Step 3: close the run.
    pub fn confirm_revoke_vc(&self, req: ConfirmRevokeVcRequest) -> Result<TxReply, TasError> {
        let tx_id = req.tx_id;
        self.transactions.complete_with(&tx_id, |tx, now| {
            tx.append_step(3, SubTransactionType::ConfirmRevokeVc, SubTransactionStatus::Success, now)
                .map(|_| ())
        })?;
        Ok(TxReply { tx_id })
    }
}
