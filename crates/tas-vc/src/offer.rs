//! # Offers
//!
//! An offer invites a holder to start a protocol run (issue a credential,
//! restore a DID). It travels through a push or email notification as
//! [`OfferData`]: a payload type plus the multibase-encoded canonical JSON
//! of the offer body.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use tas_core::{multibase, CanonicalBytes, Did, TasError, Timestamp};

/// Offer kind, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfferType {
    /// Offer to issue a credential.
    IssueOffer,
    /// Offer to restore a deactivated DID.
    RestoreDidOffer,
}

impl OfferType {
    /// Notification payload type for offers of this kind.
    pub fn payload_type(&self) -> PayloadType {
        match self {
            Self::IssueOffer => PayloadType::IssueVc,
            Self::RestoreDidOffer => PayloadType::RestoreDid,
        }
    }
}

/// What a notification payload asks the wallet to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayloadType {
    /// Start credential issuance.
    IssueVc,
    /// Start DID restoration.
    RestoreDid,
}

/// Body of an issue offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueOfferPayload {
    /// Offer id the holder presents to `propose-issue-vc`.
    pub offer_id: String,
    /// Always [`OfferType::IssueOffer`].
    #[serde(rename = "type")]
    pub offer_type: OfferType,
    /// Plan to issue under.
    pub vc_plan_id: String,
    /// Issuer DID.
    pub issuer: Did,
    /// Offer expiry.
    pub valid_until: Timestamp,
}

/// Notification body: `{payloadType, payload}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferData {
    /// Kind of payload.
    pub payload_type: PayloadType,
    /// Multibase canonical JSON.
    pub payload: String,
}

impl OfferData {
    /// Encode `body` as canonical JSON, then multibase.
    pub fn encode(payload_type: PayloadType, body: &impl Serialize) -> Result<Self, TasError> {
        let canonical = CanonicalBytes::new(body)?;
        Ok(Self {
            payload_type,
            payload: multibase::encode(canonical.as_bytes()),
        })
    }

    /// Decode the payload back into its body type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, TasError> {
        let bytes = multibase::decode(&self.payload).map_err(|e| TasError::DecodingFailed(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| TasError::DecodingFailed(e.to_string()))
    }
}
