//! # Token Service
//!
//! Issues and checks the opaque server tokens a wallet presents on later
//! steps of a Transaction.
//!
//! Validation order is fixed so that clients can tell "no session" from
//! "wrong token":
//!
//! 1. Presented value does not decode → `InvalidToken`.
//! 2. No token for the Transaction → `TokenInfoNotFound`.
//! 3. None of the Transaction's tokens has an allowed purpose → `UnsupportedPurpose`.
//! 4. Every allowed-purpose token has expired → `TokenExpired`.
//! 5. No live token matches (constant time) → `InvalidToken`.

use std::sync::Arc;

use zeroize::Zeroizing;

use tas_core::{multibase, TasError, Timestamp, TxId};
use tas_crypto::random::{random_bytes, TOKEN_LEN};
use tas_state::{EntityStore, TokenPurpose, TokenRecord};

/// Token issue/validate/consume over the store.
#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn EntityStore>,
    default_ttl_hours: i64,
}

impl TokenService {
    /// Service issuing tokens valid for `default_ttl_hours` unless told otherwise.
    pub fn new(store: Arc<dyn EntityStore>, default_ttl_hours: i64) -> Self {
        Self {
            store,
            default_ttl_hours,
        }
    }

    /// Default lifetime.
    pub fn default_ttl_hours(&self) -> i64 {
        self.default_ttl_hours
    }

    /// Issue a fresh token for (`tx_id`, `purpose`), replacing any prior one.
    /// Returns the multibase form handed to the client.
    pub fn issue(
        &self,
        tx_id: TxId,
        purpose: TokenPurpose,
        app_id: &str,
        wallet_id: &str,
        ttl_hours: i64,
    ) -> Result<String, TasError> {
        let bytes = Zeroizing::new(random_bytes::<TOKEN_LEN>().to_vec());
        let encoded = multibase::encode(&bytes);
        let now = Timestamp::now();
        self.store.upsert_token(TokenRecord {
            tx_id,
            purpose,
            token: bytes,
            app_id: app_id.to_string(),
            wallet_id: wallet_id.to_string(),
            created_at: now,
            expired_at: now.plus_hours(ttl_hours),
        })?;
        tracing::debug!(tx_id = %tx_id, purpose = %purpose, "server token issued");
        Ok(encoded)
    }

    /// Check `presented` against the Transaction's tokens with a purpose in
    /// `allowed`. Returns the matching record.
    pub fn validate(&self, presented: &str, tx_id: &TxId, allowed: &[TokenPurpose]) -> Result<TokenRecord, TasError> {
        let presented = Zeroizing::new(multibase::decode(presented).map_err(|_| TasError::InvalidToken)?);
        let rows = self.store.tokens_for(tx_id)?;
        if rows.is_empty() {
            return Err(TasError::TokenInfoNotFound(tx_id.to_string()));
        }
        let candidates: Vec<TokenRecord> = rows.into_iter().filter(|r| allowed.contains(&r.purpose)).collect();
        if candidates.is_empty() {
            let names: Vec<&str> = allowed.iter().map(|p| p.as_str()).collect();
            return Err(TasError::UnsupportedPurpose(names.join("|")));
        }
        let now = Timestamp::now();
        let live: Vec<TokenRecord> = candidates.iter().filter(|r| !r.is_expired(now)).cloned().collect();
        if live.is_empty() {
            let latest = candidates.iter().map(|r| r.expired_at).max().unwrap_or(now);
            return Err(TasError::TokenExpired(latest.to_string()));
        }
        live.into_iter()
            .find(|r| r.matches(&presented))
            .ok_or(TasError::InvalidToken)
    }

    /// Delete the token for (`tx_id`, `purpose`).
    pub fn consume(&self, tx_id: &TxId, purpose: TokenPurpose) -> Result<(), TasError> {
        if self.store.delete_token(tx_id, purpose)? {
            tracing::debug!(tx_id = %tx_id, purpose = %purpose, "server token consumed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tas_state::MemoryStore;

    fn service() -> TokenService {
        TokenService::new(Arc::new(MemoryStore::new()), 1)
    }

    #[test]
    fn issued_token_validates_for_its_purpose() {
        let svc = service();
        let tx = TxId::new();
        let token = svc.issue(tx, TokenPurpose::IssueVc, "app", "wallet", 1).unwrap();
        let rec = svc.validate(&token, &tx, &[TokenPurpose::IssueVc]).unwrap();
        assert_eq!(rec.app_id, "app");
        assert!(token.starts_with('z'));
    }

    #[test]
    fn validation_order() {
        let svc = service();
        let tx = TxId::new();
        assert_eq!(svc.validate("!!", &tx, &[TokenPurpose::IssueVc]).unwrap_err().code(), "INVALID_TOKEN");
        assert_eq!(
            svc.validate("z111", &tx, &[TokenPurpose::IssueVc]).unwrap_err().code(),
            "TOKEN_INFO_NOT_FOUND"
        );

        let token = svc.issue(tx, TokenPurpose::ListVc, "app", "wallet", 1).unwrap();
        assert_eq!(
            svc.validate(&token, &tx, &[TokenPurpose::IssueVc]).unwrap_err().code(),
            "UNSUPPORTED_PURPOSE"
        );

        svc.issue(tx, TokenPurpose::IssueVc, "app", "wallet", -1).unwrap();
        assert_eq!(
            svc.validate(&token, &tx, &[TokenPurpose::IssueVc]).unwrap_err().code(),
            "TOKEN_EXPIRED"
        );

        svc.issue(tx, TokenPurpose::IssueVc, "app", "wallet", 1).unwrap();
        assert_eq!(
            svc.validate(&token, &tx, &[TokenPurpose::IssueVc]).unwrap_err().code(),
            "INVALID_TOKEN"
        );
    }

    #[test]
    fn tokens_are_scoped_to_their_transaction() {
        let svc = service();
        let a = TxId::new();
        let b = TxId::new();
        let token = svc.issue(a, TokenPurpose::IssueVc, "app", "wallet", 1).unwrap();
        svc.issue(b, TokenPurpose::IssueVc, "app", "wallet", 1).unwrap();
        assert_eq!(svc.validate(&token, &b, &[TokenPurpose::IssueVc]).unwrap_err().code(), "INVALID_TOKEN");
    }

    #[test]
    fn reissue_replaces_and_consume_deletes() {
        let svc = service();
        let tx = TxId::new();
        let first = svc.issue(tx, TokenPurpose::IssueVc, "app", "wallet", 1).unwrap();
        let second = svc.issue(tx, TokenPurpose::IssueVc, "app", "wallet", 1).unwrap();
        assert!(svc.validate(&first, &tx, &[TokenPurpose::IssueVc]).is_err());
        svc.validate(&second, &tx, &[TokenPurpose::IssueVc]).unwrap();

        svc.consume(&tx, TokenPurpose::IssueVc).unwrap();
        assert_eq!(
            svc.validate(&second, &tx, &[TokenPurpose::IssueVc]).unwrap_err().code(),
            "TOKEN_INFO_NOT_FOUND"
        );
    }
}
