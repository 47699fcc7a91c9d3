//! # Issue VC
//!
//! ```text
//! 1 propose-issue-vc        plan/issuer/offer checks          → {txId}
//! 2 request-issue-profile   ECDH, issuer profile, authNonce,  → {txId, accEcdh, iv, encProfile}
//!                           server token (ISSUE_VC)
//! 3 request-issue-vc        token, DID-Auth, claims, issuer   → {txId, iv, encVc}
//!                           signs, TA verifies, VC meta
//! 4 confirm-issue-vc        token, vcId, token consumed       → {txId}
//! ```

use serde::{Deserialize, Serialize};

use tas_core::{Did, Nonce, TasError, Timestamp, TxId};
use tas_crypto::random::random_nonce;
use tas_state::{SubTransactionStatus, SubTransactionType, TokenPurpose, TransactionType};
use tas_vc::{
    AccEcdh, DidAuth, IssueProfile, IssueVcParam, OfferType, ProofPurpose, ReqEcdh, VerifiableCredential,
};

use super::{new_vc_id, required, SealedVcReply, TxReply};
use crate::did_auth::verify_did_auth;
use crate::engine::TasEngine;
use crate::proof::verify_proof;

const ISSUE_TOKEN_PURPOSES: [TokenPurpose; 2] = [TokenPurpose::IssueVc, TokenPurpose::CreateDidAndIssueVc];

/// Step 1 body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposeIssueVcRequest {
    /// Plan to issue under.
    pub vc_plan_id: String,
    /// Issuer DID; must be the plan's issuer.
    pub issuer: Did,
    /// Offer being redeemed, if the run started from one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_id: Option<String>,
}

/// Step 2 body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestIssueProfileRequest {
    /// Transaction id.
    pub tx_id: TxId,
    /// Calling app.
    pub app_id: String,
    /// Calling wallet.
    pub wallet_id: String,
    /// Client half of the ECDH handshake.
    pub req_ecdh: ReqEcdh,
}

/// Step 2 answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueProfileReply {
    /// Transaction id.
    pub tx_id: TxId,
    /// Server half of the ECDH handshake.
    pub acc_ecdh: AccEcdh,
    /// Multibase IV.
    pub iv: String,
    /// Multibase ciphertext of [`ProfileEnvelope`].
    pub enc_profile: String,
}

/// Plaintext of `encProfile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileEnvelope {
    /// Issuer profile countersigned by the TA.
    pub profile: IssueProfile,
    /// Challenge for the step 3 DID-Auth.
    pub auth_nonce: Nonce,
    /// Bearer token for steps 3 and 4.
    pub server_token: String,
}

/// Step 3 body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestIssueVcRequest {
    /// Transaction id.
    pub tx_id: TxId,
    /// Token from the profile envelope.
    pub server_token: String,
    /// Holder's answer to the challenge.
    pub did_auth: DidAuth,
}

/// Step 4 body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmIssueVcRequest {
    /// Transaction id.
    pub tx_id: TxId,
    /// Token from the profile envelope.
    pub server_token: String,
    /// Id of the credential the wallet stored.
    pub vc_id: String,
}

impl TasEngine {
    /// Step 1: open an ISSUE_VC run.
    pub fn propose_issue_vc(&self, req: ProposeIssueVcRequest) -> Result<TxReply, TasError> {
        let plan = self.config.plan(&req.vc_plan_id)?;
        if plan.issuer != req.issuer {
            return Err(TasError::IssuerMismatch(format!(
                "plan {} is issued by {}, not {}",
                plan.vc_plan_id, plan.issuer, req.issuer
            )));
        }
        self.enrolled_entity(&req.issuer)?;

        let mut offered_holder = None;
        if let Some(offer_id) = &req.offer_id {
            let offer = self
                .store
                .get_offer(offer_id)?
                .ok_or_else(|| TasError::OfferNotFound(offer_id.clone()))?;
            let same_plan = offer.vc_plan_id.as_deref() == Some(req.vc_plan_id.as_str());
            if offer.offer_type != OfferType::IssueOffer || !same_plan {
                return Err(TasError::InvalidRequest(format!(
                    "offer {offer_id} is not an issue offer for plan {}",
                    req.vc_plan_id
                )));
            }
            offer.ensure_redeemable(Timestamp::now())?;
            offered_holder = offer.did;
        }

        let tx = self.transactions.begin_with(TransactionType::IssueVc, |tx| {
            tx.vc_plan_id = Some(req.vc_plan_id.clone());
            tx.external_did = Some(req.issuer.clone());
            tx.offer_id = req.offer_id.clone();
            tx.subject_did = offered_holder.clone();
        })?;
        let tx_id = tx.tx_id;

        if let Some(offer_id) = &req.offer_id {
            if let Err(err) = self.store.redeem_offer(offer_id, tx_id, Timestamp::now()) {
                let err = TasError::from(err);
                self.transactions.fail(&tx_id, &err.to_string())?;
                return Err(err);
            }
        }
        self.transactions.advance(
            &tx_id,
            1,
            SubTransactionType::ProposeIssueVc,
            SubTransactionStatus::Success,
        )?;
        Ok(TxReply { tx_id })
    }

    /// Step 2: ECDH, then hand the holder the sealed issue profile.
    pub fn request_issue_profile(&self, req: RequestIssueProfileRequest) -> Result<IssueProfileReply, TasError> {
        let tx_id = req.tx_id;
        let tx = self
            .transactions
            .check_step(&tx_id, 2, SubTransactionType::RequestIssueProfile)?;
        let issuer = required(&tx.external_did, &tx_id, "issuer")?.clone();
        let vc_plan_id = required(&tx.vc_plan_id, &tx_id, "vcPlanId")?.clone();

        let (acc_ecdh, _) = self.prechecked(&tx_id, || {
            self.establish_ecdh(tx_id, &req.req_ecdh, &[ProofPurpose::AssertionMethod])
        })?;
        // The session row exists now; a run that cannot record the claim
        // is closed rather than left unable to retry.
        self.transactions
            .advance(
                &tx_id,
                2,
                SubTransactionType::RequestIssueProfile,
                SubTransactionStatus::Pending,
            )
            .map_err(|err| {
                self.abandon(&tx_id, &err);
                err
            })?;

        self.guarded(&tx_id, 2, || {
            let mut profile = self.issuer.issue_profile(&issuer, &vc_plan_id)?;
            if profile.issuer != issuer || profile.vc_plan_id != vc_plan_id {
                return Err(TasError::IssuerUnknownResponse(format!(
                    "profile for {}/{} returned for {issuer}/{vc_plan_id}",
                    profile.issuer, profile.vc_plan_id
                )));
            }
            self.identity.sign(&mut profile, ProofPurpose::AssertionMethod)?;

            let auth_nonce = random_nonce();
            let server_token = self.tokens.issue(
                tx_id,
                TokenPurpose::IssueVc,
                &req.app_id,
                &req.wallet_id,
                self.tokens.default_ttl_hours(),
            )?;
            let sealed = self.seal(
                &tx_id,
                &ProfileEnvelope {
                    profile,
                    auth_nonce: auth_nonce.clone(),
                    server_token,
                },
            )?;

            self.transactions.mutate(&tx_id, |tx, now| {
                tx.set_auth_nonce(auth_nonce.clone())?;
                tx.resolve_step(2, SubTransactionStatus::Success, now)
            })?;
            tracing::info!(tx_id = %tx_id, issuer = %issuer, "issue profile delivered");
            Ok(IssueProfileReply {
                tx_id,
                acc_ecdh,
                iv: sealed.iv_multibase(),
                enc_profile: sealed.data_multibase(),
            })
        })
    }

    /// Step 3: authenticate the holder, have the issuer sign, relay the
    /// sealed credential.
    pub fn request_issue_vc(&self, req: RequestIssueVcRequest) -> Result<SealedVcReply, TasError> {
        let tx_id = req.tx_id;
        let tx = self.transactions.check_step(&tx_id, 3, SubTransactionType::RequestIssueVc)?;
        if let Some(subject) = &tx.subject_did {
            if subject != &req.did_auth.did {
                return Err(TasError::HolderMismatch(format!(
                    "{} is not the holder this run was offered to",
                    req.did_auth.did
                )));
            }
        }
        self.prechecked(&tx_id, || {
            self.tokens.validate(&req.server_token, &tx_id, &ISSUE_TOKEN_PURPOSES)?;
            verify_did_auth(self.registry.as_ref(), &req.did_auth, &tx)
        })?;

        let issuer = required(&tx.external_did, &tx_id, "issuer")?.clone();
        let vc_plan_id = required(&tx.vc_plan_id, &tx_id, "vcPlanId")?.clone();
        let holder = req.did_auth.did.clone();

        self.transactions.mutate(&tx_id, |tx, now| {
            tx.append_step(3, SubTransactionType::RequestIssueVc, SubTransactionStatus::Pending, now)?;
            tx.set_subject_did(holder.clone())
        })?;
        tracing::info!(tx_id = %tx_id, step = 3, holder = %holder, "issuance claimed");

        self.guarded(&tx_id, 3, || {
            let plan = self.config.plan(&vc_plan_id)?;
            let claims = self.issuer.retrieve_claims(&issuer, &holder, &vc_plan_id)?;
            let now = Timestamp::now();
            let param = IssueVcParam {
                vc_id: new_vc_id(),
                vc_plan_id: vc_plan_id.clone(),
                holder: holder.clone(),
                issuer: issuer.clone(),
                types: plan.types.clone(),
                schema_id: plan.schema_id.clone(),
                claims: claims.claims,
                evidence: claims.evidence,
                valid_from: now,
                valid_until: now.plus_hours(plan.validity_hours),
            };
            let vc = self.issuer.sign_vc(&param)?;
            self.check_issued(&vc, &param)?;
            self.registry.register_vc_meta(&vc.to_meta(&vc_plan_id))?;

            let sealed = self.seal(&tx_id, &vc)?;
            self.transactions.mutate(&tx_id, |tx, now| {
                tx.vc_id = Some(vc.id.clone());
                tx.resolve_step(3, SubTransactionStatus::Success, now)
            })?;
            tracing::info!(tx_id = %tx_id, vc_id = %vc.id, "credential issued");
            Ok(SealedVcReply::new(tx_id, &sealed))
        })
    }

    /// Step 4: the wallet confirms it stored the credential.
    pub fn confirm_issue_vc(&self, req: ConfirmIssueVcRequest) -> Result<TxReply, TasError> {
        let tx_id = req.tx_id;
        let tx = self.transactions.check_step(&tx_id, 4, SubTransactionType::ConfirmIssueVc)?;
        let token = self.tokens.validate(&req.server_token, &tx_id, &ISSUE_TOKEN_PURPOSES)?;
        if tx.vc_id.as_deref() != Some(req.vc_id.as_str()) {
            return Err(TasError::InvalidRequest(format!(
                "vcId {} was not issued by transaction {tx_id}",
                req.vc_id
            )));
        }
        self.transactions.complete_with(&tx_id, |tx, now| {
            tx.append_step(4, SubTransactionType::ConfirmIssueVc, SubTransactionStatus::Success, now)
                .map(|_| ())
        })?;
        if let Err(err) = self.tokens.consume(&tx_id, token.purpose) {
            tracing::warn!(tx_id = %tx_id, error = %err, "server token not consumed");
        }
        Ok(TxReply { tx_id })
    }

    /// The issuer must have signed what was asked, with its own
    /// assertion key.
    fn check_issued(&self, vc: &VerifiableCredential, param: &IssueVcParam) -> Result<(), TasError> {
        if vc.id != param.vc_id || vc.issuer != param.issuer || vc.holder() != &param.holder {
            return Err(TasError::IssuerUnknownResponse(format!(
                "credential {} does not match the request {}",
                vc.id, param.vc_id
            )));
        }
        verify_proof(self.registry.as_ref(), vc, &[ProofPurpose::AssertionMethod], &param.issuer).map_err(|err| {
            if err.category() == tas_core::ErrorCategory::External {
                err
            } else {
                TasError::IssuerUnknownResponse(format!("issuer proof rejected: {err}"))
            }
        })?;
        Ok(())
    }
}
