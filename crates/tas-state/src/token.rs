//! # Server Tokens
//!
//! Opaque bearer tokens scoped to one Transaction and one purpose. The
//! record holds the raw token bytes; comparison is constant-time.

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use tas_core::{TasError, Timestamp, TxId};

/// What a token authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenPurpose {
    /// Create a DID.
    CreateDid,
    /// Update a DID document.
    UpdateDid,
    /// Restore a DID document.
    RestoreDid,
    /// Issue a credential.
    IssueVc,
    /// Remove a credential from the wallet.
    RemoveVc,
    /// Present a VP.
    PresentVp,
    /// List credentials.
    ListVc,
    /// Read one credential.
    DetailVc,
    /// Create a DID and issue a credential in one run.
    CreateDidAndIssueVc,
    /// List credentials and present a VP in one run.
    ListVcAndPresentVp,
}

impl TokenPurpose {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateDid => "CREATE_DID",
            Self::UpdateDid => "UPDATE_DID",
            Self::RestoreDid => "RESTORE_DID",
            Self::IssueVc => "ISSUE_VC",
            Self::RemoveVc => "REMOVE_VC",
            Self::PresentVp => "PRESENT_VP",
            Self::ListVc => "LIST_VC",
            Self::DetailVc => "DETAIL_VC",
            Self::CreateDidAndIssueVc => "CREATE_DID_AND_ISSUE_VC",
            Self::ListVcAndPresentVp => "LIST_VC_AND_PRESENT_VP",
        }
    }
}

impl std::fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TokenPurpose {
    type Err = TasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(|_| TasError::InvalidEnum {
            field: "purpose".into(),
            value: s.to_string(),
        })
    }
}

/// A stored token.
#[derive(Clone)]
pub struct TokenRecord {
    /// Owning Transaction.
    pub tx_id: TxId,
    /// Scope.
    pub purpose: TokenPurpose,
    /// Raw token bytes.
    pub token: Zeroizing<Vec<u8>>,
    /// Calling app.
    pub app_id: String,
    /// Holder wallet.
    pub wallet_id: String,
    /// Issue time.
    pub created_at: Timestamp,
    /// Expiry.
    pub expired_at: Timestamp,
}

impl TokenRecord {
    /// Constant-time comparison against presented bytes.
    pub fn matches(&self, presented: &[u8]) -> bool {
        self.token.as_slice().ct_eq(presented).into()
    }

    /// Whether the token expired before `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expired_at.is_past(now)
    }
}

impl std::fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRecord")
            .field("tx_id", &self.tx_id)
            .field("purpose", &self.purpose)
            .field("token", &"<redacted>")
            .field("app_id", &self.app_id)
            .field("wallet_id", &self.wallet_id)
            .field("expired_at", &self.expired_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(bytes: &[u8]) -> TokenRecord {
        let now = Timestamp::now();
        TokenRecord {
            tx_id: TxId::new(),
            purpose: TokenPurpose::IssueVc,
            token: Zeroizing::new(bytes.to_vec()),
            app_id: "app".into(),
            wallet_id: "wallet".into(),
            created_at: now,
            expired_at: now.plus_hours(1),
        }
    }

    #[test]
    fn comparison_is_exact() {
        let rec = record(&[7; 32]);
        assert!(rec.matches(&[7; 32]));
        assert!(!rec.matches(&[7; 31]));
        assert!(!rec.matches(&[8; 32]));
    }

    #[test]
    fn purpose_names_round_trip() {
        for p in [TokenPurpose::CreateDidAndIssueVc, TokenPurpose::ListVcAndPresentVp, TokenPurpose::RemoveVc] {
            assert_eq!(p.as_str().parse::<TokenPurpose>().unwrap(), p);
        }
        assert_eq!("NOPE".parse::<TokenPurpose>().unwrap_err().code(), "INVALID_ENUM");
    }

    #[test]
    fn debug_redacts_token() {
        let text = format!("{:?}", record(&[1, 2, 3]));
        assert!(text.contains("<redacted>"));
        assert!(!text.contains("[1, 2, 3]"));
    }
}
