//! Issue offers: invitations that start an ISSUE_VC run.
//!
//! An offer is stored first, then delivered. Delivery failures are
//! reported in the reply and never roll the offer back; the holder can
//! still redeem it with the `offerId` from any channel.

use serde::{Deserialize, Serialize};

use tas_core::{Did, TasError, Timestamp};
use tas_state::DidOffer;
use tas_vc::{IssueOfferPayload, OfferData, OfferType};

use crate::engine::TasEngine;

/// Where to deliver an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferTarget {
    /// Push to every token registered for the holder DID.
    Push,
    /// Email to an address.
    Email {
        /// Recipient.
        address: String,
    },
}

/// `request-issue-offer` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestIssueOfferRequest {
    /// Plan to offer.
    pub vc_plan_id: String,
    /// Holder the offer is for; required for push delivery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<Did>,
    /// Delivery channel.
    pub target: OfferTarget,
}

/// `request-issue-offer` answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueOfferReply {
    /// Offer id to present to `propose-issue-vc`.
    pub offer_id: String,
    /// The notification body as sent.
    pub offer_data: OfferData,
    /// Offer expiry.
    pub valid_until: Timestamp,
    /// Whether delivery succeeded.
    pub notified: bool,
}

/// Register a push token for a DID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPushTokenRequest {
    /// Holder DID.
    pub did: Did,
    /// Push service token.
    pub token: String,
}

impl TasEngine {
    /// Create an issue offer and deliver it.
    pub fn request_issue_offer(&self, req: RequestIssueOfferRequest) -> Result<IssueOfferReply, TasError> {
        let plan = self.config.plan(&req.vc_plan_id)?;
        self.enrolled_entity(&plan.issuer)?;
        if req.target == OfferTarget::Push && req.holder.is_none() {
            return Err(TasError::InvalidRequest("push delivery requires a holder DID".into()));
        }

        let now = Timestamp::now();
        let offer = DidOffer {
            offer_id: uuid::Uuid::new_v4().to_string(),
            offer_type: OfferType::IssueOffer,
            did: req.holder.clone(),
            vc_plan_id: Some(plan.vc_plan_id.clone()),
            issuer: Some(plan.issuer.clone()),
            valid_until: now.plus_seconds(self.config.offer_validity_secs),
            tx_id: None,
            created_at: now,
        };
        let payload = IssueOfferPayload {
            offer_id: offer.offer_id.clone(),
            offer_type: offer.offer_type,
            vc_plan_id: plan.vc_plan_id.clone(),
            issuer: plan.issuer.clone(),
            valid_until: offer.valid_until,
        };
        let offer_data = OfferData::encode(offer.offer_type.payload_type(), &payload)?;
        let offer_id = offer.offer_id.clone();
        let valid_until = offer.valid_until;
        self.store.insert_offer(offer)?;

        let notified = match self.deliver_offer(&req.target, req.holder.as_ref(), &offer_data) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(offer_id = %offer_id, code = err.code(), error = %err, "offer notification failed");
                false
            }
        };
        tracing::info!(offer_id = %offer_id, vc_plan_id = %plan.vc_plan_id, notified, "issue offer created");
        Ok(IssueOfferReply {
            offer_id,
            offer_data,
            valid_until,
            notified,
        })
    }

    fn deliver_offer(&self, target: &OfferTarget, holder: Option<&Did>, offer_data: &OfferData) -> Result<(), TasError> {
        match target {
            OfferTarget::Email { address } => Ok(self.notifier.email(address, offer_data)?),
            OfferTarget::Push => {
                let holder = holder.ok_or_else(|| TasError::InvalidRequest("push delivery requires a holder DID".into()))?;
                let tokens = self.store.push_tokens(holder)?;
                if tokens.is_empty() {
                    return Err(TasError::NotificationFailed(format!("no push tokens registered for {holder}")));
                }
                Ok(self.notifier.push(&tokens, offer_data)?)
            }
        }
    }

    /// Remember a push token for offer delivery.
    pub fn register_push_token(&self, req: RegisterPushTokenRequest) -> Result<(), TasError> {
        if req.token.trim().is_empty() {
            return Err(TasError::InvalidRequest("push token is empty".into()));
        }
        self.store.register_push_token(&req.did, req.token)?;
        tracing::debug!(did = %req.did, "push token registered");
        Ok(())
    }
}
