//! Offers awaiting redemption by a Transaction.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tas_core::{Did, TasError, Timestamp, TxId};
use tas_vc::OfferType;

/// A generated offer. `offer_type` never changes; `tx_id` is set once, on
/// redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidOffer {
    /// Unique offer id.
    pub offer_id: String,
    /// Offer kind.
    #[serde(rename = "type")]
    pub offer_type: OfferType,
    /// Holder the offer targets, when known.
    pub did: Option<Did>,
    /// Plan for issue offers.
    pub vc_plan_id: Option<String>,
    /// Issuer for issue offers.
    pub issuer: Option<Did>,
    /// Offer expiry.
    pub valid_until: Timestamp,
    /// Transaction that redeemed the offer.
    pub tx_id: Option<TxId>,
    /// Creation time.
    pub created_at: Timestamp,
}

/// Why an offer cannot be redeemed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OfferError {
    /// `validUntil` has passed.
    #[error("offer {offer_id} expired at {valid_until}")]
    Expired {
        /// Offer id.
        offer_id: String,
        /// Expiry.
        valid_until: Timestamp,
    },

    /// Already linked to a Transaction.
    #[error("offer {offer_id} already redeemed by {tx_id}")]
    AlreadyRedeemed {
        /// Offer id.
        offer_id: String,
        /// Redeeming Transaction.
        tx_id: TxId,
    },
}

impl From<OfferError> for TasError {
    fn from(err: OfferError) -> Self {
        match err {
            OfferError::Expired { offer_id, .. } => TasError::OfferExpired(offer_id),
            OfferError::AlreadyRedeemed { offer_id, .. } => TasError::OfferAlreadyRedeemed(offer_id),
        }
    }
}

impl DidOffer {
    /// Check that the offer can still be redeemed.
    pub fn ensure_redeemable(&self, now: Timestamp) -> Result<(), OfferError> {
        if let Some(tx_id) = self.tx_id {
            return Err(OfferError::AlreadyRedeemed {
                offer_id: self.offer_id.clone(),
                tx_id,
            });
        }
        if self.valid_until.is_past(now) {
            return Err(OfferError::Expired {
                offer_id: self.offer_id.clone(),
                valid_until: self.valid_until,
            });
        }
        Ok(())
    }

    /// Link to `tx_id`.
    pub fn redeem(&mut self, tx_id: TxId, now: Timestamp) -> Result<(), OfferError> {
        self.ensure_redeemable(now)?;
        self.tx_id = Some(tx_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(valid_until: Timestamp) -> DidOffer {
        DidOffer {
            offer_id: "o-1".into(),
            offer_type: OfferType::IssueOffer,
            did: None,
            vc_plan_id: Some("plan".into()),
            issuer: None,
            valid_until,
            tx_id: None,
            created_at: Timestamp::now(),
        }
    }

    #[test]
    fn redeem_once() {
        let now = Timestamp::now();
        let mut o = offer(now.plus_seconds(60));
        o.redeem(TxId::new(), now).unwrap();
        let err = o.redeem(TxId::new(), now).unwrap_err();
        assert_eq!(TasError::from(err).code(), "OFFER_ALREADY_REDEEMED");
    }

    #[test]
    fn expired_offer_is_rejected() {
        let now = Timestamp::now();
        let mut o = offer(now.plus_seconds(-1));
        let err = o.redeem(TxId::new(), now).unwrap_err();
        assert_eq!(TasError::from(err).code(), "OFFER_EXPIRED");
        assert!(o.tx_id.is_none());
    }
}
