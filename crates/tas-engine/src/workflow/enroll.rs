//! # Entity Enrollment
//!
//! A partner entity seeded as NEEDS_ENROLLMENT proves control of its DID
//! and receives a certificate VC signed by the Trusted Agent.
//!
//! ```text
//! 1 propose-enroll-entity   entity is enrollable             → {txId, authNonce}
//! 2 request-ecdh            ECDH with the entity             → AccEcdh
//! 3 request-enroll-entity   DID-Auth; certificate VC signed,
//!                           meta registered                  → {txId, iv, encVc}
//! 4 confirm-enroll-entity   entity ENROLLED, COMPLETED       → {txId}
//! ```

use serde::{Deserialize, Serialize};

use tas_core::{Did, Nonce, TasError, Timestamp, TxId};
use tas_crypto::random::random_nonce;
use tas_state::{EntityRecord, SubTransactionStatus, SubTransactionType, TransactionType};
use tas_vc::{AccEcdh, Claim, DidAuth, IssueVcParam, ProofPurpose, ReqEcdh, VerifiableCredential};

use super::{new_vc_id, required, SealedVcReply, TxReply};
use crate::did_auth::verify_did_auth;
use crate::engine::TasEngine;

/// Plan id recorded in the registry for certificate VCs.
pub const CERTIFICATE_PLAN_ID: &str = "tas-entity-certificate";

/// Step 1 body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposeEnrollEntityRequest {
    /// Entity DID.
    pub did: Did,
}

/// Step 1 answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposeEnrollEntityReply {
    /// Transaction id.
    pub tx_id: TxId,
    /// Challenge the entity signs in step 3.
    pub auth_nonce: Nonce,
}

/// ECDH step body, shared by every workflow with a REQUEST_ECDH step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEcdhRequest {
    /// Transaction id.
    pub tx_id: TxId,
    /// Client half of the handshake.
    pub req_ecdh: ReqEcdh,
}

/// ECDH step answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEcdhReply {
    /// Transaction id.
    pub tx_id: TxId,
    /// Server half of the handshake.
    pub acc_ecdh: AccEcdh,
}

/// Step 3 body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnrollEntityRequest {
    /// Transaction id.
    pub tx_id: TxId,
    /// Entity's answer to the challenge.
    pub did_auth: DidAuth,
}

/// Step 4 body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmEnrollEntityRequest {
    /// Transaction id.
    pub tx_id: TxId,
    /// Certificate VC id from step 3.
    pub vc_id: String,
}

impl TasEngine {
    /// Step 1: open an ENROLL_ENTITY run.
    pub fn propose_enroll_entity(&self, req: ProposeEnrollEntityRequest) -> Result<ProposeEnrollEntityReply, TasError> {
        let entity = self
            .store
            .get_entity(&req.did)?
            .ok_or_else(|| TasError::EntityNotFound(req.did.to_string()))?;
        entity.ensure_enrollable()?;

        let tx = self.transactions.begin_with(TransactionType::EnrollEntity, |tx| {
            tx.subject_did = Some(entity.did.clone());
        })?;
        let tx_id = tx.tx_id;
        let auth_nonce = random_nonce();
        self.transactions.mutate(&tx_id, |tx, now| {
            tx.append_step(1, SubTransactionType::ProposeEnrollEntity, SubTransactionStatus::Success, now)?;
            tx.set_auth_nonce(auth_nonce.clone())
        })?;
        tracing::info!(tx_id = %tx_id, did = %entity.did, "enrollment proposed");
        Ok(ProposeEnrollEntityReply { tx_id, auth_nonce })
    }

    /// The REQUEST_ECDH step of any workflow that has one. The handshake
    /// client must be the Transaction's subject.
    pub fn request_ecdh(&self, req: RequestEcdhRequest) -> Result<RequestEcdhReply, TasError> {
        let tx_id = req.tx_id;
        let tx = self.transactions.lookup(&tx_id)?;
        let step = tx
            .tx_type
            .steps()
            .iter()
            .position(|s| *s == SubTransactionType::RequestEcdh)
            .map(|i| i as u32 + 1)
            .ok_or_else(|| TasError::transaction_invalid(tx_id, format!("{} has no ECDH step", tx.tx_type)))?;
        let tx = self.transactions.check_step(&tx_id, step, SubTransactionType::RequestEcdh)?;
        let subject = required(&tx.subject_did, &tx_id, "subjectDid")?;
        if &req.req_ecdh.client != subject {
            return Err(TasError::InvalidRequest(format!(
                "ECDH client {} is not the transaction subject",
                req.req_ecdh.client
            )));
        }

        let (acc_ecdh, _) = self.prechecked(&tx_id, || {
            self.establish_ecdh(tx_id, &req.req_ecdh, &[ProofPurpose::AssertionMethod])
        })?;
        self.transactions
            .advance(&tx_id, step, SubTransactionType::RequestEcdh, SubTransactionStatus::Success)
            .map_err(|err| {
                self.abandon(&tx_id, &err);
                err
            })?;
        Ok(RequestEcdhReply { tx_id, acc_ecdh })
    }

    /// Step 3: authenticate the entity and issue its certificate VC.
    pub fn request_enroll_entity(&self, req: RequestEnrollEntityRequest) -> Result<SealedVcReply, TasError> {
        let tx_id = req.tx_id;
        let tx = self
            .transactions
            .check_step(&tx_id, 3, SubTransactionType::RequestEnrollEntity)?;
        let subject = required(&tx.subject_did, &tx_id, "subjectDid")?.clone();
        if req.did_auth.did != subject {
            return Err(TasError::InvalidRequest(format!(
                "DID-Auth by {} for enrollment of {subject}",
                req.did_auth.did
            )));
        }
        let entity = self.prechecked(&tx_id, || {
            verify_did_auth(self.registry.as_ref(), &req.did_auth, &tx)?;
            self.store
                .get_entity(&subject)?
                .ok_or_else(|| TasError::EntityNotFound(subject.to_string()))
        })?;
        entity.ensure_enrollable()?;

        self.transactions.advance(
            &tx_id,
            3,
            SubTransactionType::RequestEnrollEntity,
            SubTransactionStatus::Pending,
        )?;
        self.guarded(&tx_id, 3, || {
            let settings = &self.config.certificate;
            let now = Timestamp::now();
            let param = IssueVcParam {
                vc_id: new_vc_id(),
                vc_plan_id: CERTIFICATE_PLAN_ID.to_string(),
                holder: subject.clone(),
                issuer: self.identity.did().clone(),
                types: vec![settings.credential_type.clone()],
                schema_id: settings.schema_id.clone(),
                claims: vec![
                    Claim {
                        code: "entity.name".into(),
                        caption: "Name".into(),
                        value: entity.name.clone(),
                        format: None,
                    },
                    Claim {
                        code: "entity.role".into(),
                        caption: "Role".into(),
                        value: entity.role.as_str().to_string(),
                        format: None,
                    },
                ],
                evidence: Vec::new(),
                valid_from: now,
                valid_until: now.plus_hours(settings.validity_hours),
            };
            let mut vc = VerifiableCredential::from_param(&param);
            self.identity.sign(&mut vc, ProofPurpose::AssertionMethod)?;
            self.registry.register_vc_meta(&vc.to_meta(CERTIFICATE_PLAN_ID))?;

            let sealed = self.seal(&tx_id, &vc)?;
            self.transactions.mutate(&tx_id, |tx, now| {
                tx.certificate_id = Some(vc.id.clone());
                tx.vc_id = Some(vc.id.clone());
                tx.resolve_step(3, SubTransactionStatus::Success, now)
            })?;
            tracing::info!(tx_id = %tx_id, did = %subject, vc_id = %vc.id, "certificate issued");
            Ok(SealedVcReply::new(tx_id, &sealed))
        })
    }

    /// Step 4: the entity confirms receipt; it becomes ENROLLED.
    pub fn confirm_enroll_entity(&self, req: ConfirmEnrollEntityRequest) -> Result<TxReply, TasError> {
        let tx_id = req.tx_id;
        let tx = self
            .transactions
            .check_step(&tx_id, 4, SubTransactionType::ConfirmEnrollEntity)?;
        if tx.certificate_id.as_deref() != Some(req.vc_id.as_str()) {
            return Err(TasError::InvalidRequest(format!(
                "vcId {} is not the certificate of transaction {tx_id}",
                req.vc_id
            )));
        }
        let subject = required(&tx.subject_did, &tx_id, "subjectDid")?.clone();

        self.transactions.advance(
            &tx_id,
            4,
            SubTransactionType::ConfirmEnrollEntity,
            SubTransactionStatus::Pending,
        )?;
        self.guarded(&tx_id, 4, || {
            self.store.modify_entity(&subject, &mut |entity: &mut EntityRecord| {
                entity.mark_enrolled(req.vc_id.clone())
            })?;
            self.transactions
                .complete_with(&tx_id, |tx, now| tx.resolve_step(4, SubTransactionStatus::Success, now))?;
            tracing::info!(tx_id = %tx_id, did = %subject, "entity enrolled");
            Ok(TxReply { tx_id })
        })
    }
}
