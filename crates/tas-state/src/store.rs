//! # Entity Store
//!
//! Persistence interface for Transactions and the rows they own, plus the
//! in-memory implementation used by tests and single-node deployments.
//!
//! ## Atomicity
//!
//! [`EntityStore::modify_transaction()`] is the read-check-write primitive
//! behind step ordering: the closure runs under the store's lock and its
//! mutations are committed only when it returns `Ok`. Two concurrent calls
//! for the same Transaction are serialized, so at most one of them can
//! record a given step. ECDH insertion is insert-if-absent and token
//! issuance is an upsert keyed by (Transaction, purpose), both atomic.

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

use tas_core::{Did, TasError, Timestamp, TxId};

use crate::ecdh::EcdhSession;
use crate::entity::{EntityError, EntityRecord};
use crate::offer::{DidOffer, OfferError};
use crate::token::{TokenPurpose, TokenRecord};
use crate::transaction::{Transaction, TransactionError};

/// Store failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No Transaction with this id.
    #[error("transaction {0} not found")]
    TransactionNotFound(TxId),

    /// Transaction id collision on insert.
    #[error("transaction {0} already exists")]
    DuplicateTransaction(TxId),

    /// An ECDH session already exists for this Transaction.
    #[error("ECDH session for {0} already exists")]
    EcdhAlreadyExists(TxId),

    /// No offer with this id.
    #[error("offer {0} not found")]
    OfferNotFound(String),

    /// Offer id collision on insert.
    #[error("offer {0} already exists")]
    DuplicateOffer(String),

    /// No entity with this DID.
    #[error("entity {0} not found")]
    EntityNotFound(Did),

    /// The Transaction closure rejected the mutation.
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// The entity closure rejected the mutation.
    #[error(transparent)]
    Entity(#[from] EntityError),

    /// The offer cannot be redeemed.
    #[error(transparent)]
    Offer(#[from] OfferError),

    /// Backend unavailable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for TasError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TransactionNotFound(id) => TasError::TransactionNotFound(id.to_string()),
            StoreError::EcdhAlreadyExists(id) => TasError::EcdhAlreadyExists(id.to_string()),
            StoreError::OfferNotFound(id) => TasError::OfferNotFound(id),
            StoreError::EntityNotFound(did) => TasError::EntityNotFound(did.to_string()),
            StoreError::Transaction(e) => e.into(),
            StoreError::Entity(e) => e.into(),
            StoreError::Offer(e) => e.into(),
            StoreError::DuplicateTransaction(_) | StoreError::DuplicateOffer(_) => {
                TasError::Unknown(err.to_string())
            }
            StoreError::Unavailable(msg) => TasError::StoreUnavailable(msg),
        }
    }
}

/// Closure applied to a Transaction under the store lock.
pub type TransactionMutation<'a> = dyn FnMut(&mut Transaction) -> Result<(), TransactionError> + 'a;

/// Closure applied to an entity under the store lock.
pub type EntityMutation<'a> = dyn FnMut(&mut EntityRecord) -> Result<(), EntityError> + 'a;

/// Persistence for the Trusted Agent's records.
///
/// Lookups return `Ok(None)` for absent rows; `Err` is reserved for
/// backend failures and rejected mutations.
pub trait EntityStore: Send + Sync {
    // ── Transactions ──

    /// Insert a new Transaction.
    fn insert_transaction(&self, tx: Transaction) -> Result<(), StoreError>;

    /// Transaction by id.
    fn get_transaction(&self, tx_id: &TxId) -> Result<Option<Transaction>, StoreError>;

    /// Transactions whose subject is `did`, oldest first.
    fn find_transactions_by_did(&self, did: &Did) -> Result<Vec<Transaction>, StoreError>;

    /// Atomically apply `mutation`; commit only if it returns `Ok`.
    /// Returns the committed Transaction.
    fn modify_transaction(
        &self,
        tx_id: &TxId,
        mutation: &mut TransactionMutation<'_>,
    ) -> Result<Transaction, StoreError>;

    // ── ECDH ──

    /// Insert if no session exists for the Transaction.
    fn insert_ecdh(&self, session: EcdhSession) -> Result<(), StoreError>;

    /// Session for a Transaction.
    fn get_ecdh(&self, tx_id: &TxId) -> Result<Option<EcdhSession>, StoreError>;

    // ── Tokens ──

    /// Insert or replace the token for (Transaction, purpose).
    fn upsert_token(&self, token: TokenRecord) -> Result<(), StoreError>;

    /// All tokens of a Transaction.
    fn tokens_for(&self, tx_id: &TxId) -> Result<Vec<TokenRecord>, StoreError>;

    /// Delete the token for (Transaction, purpose). Returns whether one existed.
    fn delete_token(&self, tx_id: &TxId, purpose: TokenPurpose) -> Result<bool, StoreError>;

    // ── Offers ──

    /// Insert a new offer.
    fn insert_offer(&self, offer: DidOffer) -> Result<(), StoreError>;

    /// Offer by id.
    fn get_offer(&self, offer_id: &str) -> Result<Option<DidOffer>, StoreError>;

    /// Atomically link an unexpired, unredeemed offer to `tx_id`.
    fn redeem_offer(&self, offer_id: &str, tx_id: TxId, now: Timestamp) -> Result<DidOffer, StoreError>;

    // ── Entities ──

    /// Insert or replace an entity.
    fn upsert_entity(&self, entity: EntityRecord) -> Result<(), StoreError>;

    /// Entity by DID.
    fn get_entity(&self, did: &Did) -> Result<Option<EntityRecord>, StoreError>;

    /// All entities.
    fn list_entities(&self) -> Result<Vec<EntityRecord>, StoreError>;

    /// Atomically apply `mutation` to an entity.
    fn modify_entity(&self, did: &Did, mutation: &mut EntityMutation<'_>) -> Result<EntityRecord, StoreError>;

    // ── Push targets ──

    /// Register a push token for a DID.
    fn register_push_token(&self, did: &Did, token: String) -> Result<(), StoreError>;

    /// Push tokens registered for a DID.
    fn push_tokens(&self, did: &Did) -> Result<Vec<String>, StoreError>;
}

// ─── In-memory store ─────────────────────────────────────────────────

#[derive(Default)]
struct Tables {
    transactions: HashMap<TxId, Transaction>,
    ecdh: HashMap<TxId, EcdhSession>,
    tokens: HashMap<(TxId, TokenPurpose), TokenRecord>,
    offers: HashMap<String, DidOffer>,
    entities: HashMap<Did, EntityRecord>,
    push_tokens: HashMap<Did, Vec<String>>,
}

/// [`EntityStore`] backed by hash maps under one `RwLock`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let t = self.tables.read();
        f.debug_struct("MemoryStore")
            .field("transactions", &t.transactions.len())
            .field("ecdh", &t.ecdh.len())
            .field("tokens", &t.tokens.len())
            .field("offers", &t.offers.len())
            .field("entities", &t.entities.len())
            .finish()
    }
}

impl EntityStore for MemoryStore {
    fn insert_transaction(&self, tx: Transaction) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        if t.transactions.contains_key(&tx.tx_id) {
            return Err(StoreError::DuplicateTransaction(tx.tx_id));
        }
        t.transactions.insert(tx.tx_id, tx);
        Ok(())
    }

    fn get_transaction(&self, tx_id: &TxId) -> Result<Option<Transaction>, StoreError> {
        Ok(self.tables.read().transactions.get(tx_id).cloned())
    }

    fn find_transactions_by_did(&self, did: &Did) -> Result<Vec<Transaction>, StoreError> {
        let t = self.tables.read();
        let mut found: Vec<Transaction> = t
            .transactions
            .values()
            .filter(|tx| tx.subject_did.as_ref() == Some(did))
            .cloned()
            .collect();
        found.sort_by_key(|tx| tx.created_at);
        Ok(found)
    }

    fn modify_transaction(
        &self,
        tx_id: &TxId,
        mutation: &mut TransactionMutation<'_>,
    ) -> Result<Transaction, StoreError> {
        let mut t = self.tables.write();
        let current = t
            .transactions
            .get(tx_id)
            .ok_or(StoreError::TransactionNotFound(*tx_id))?;
        let mut draft = current.clone();
        mutation(&mut draft)?;
        t.transactions.insert(*tx_id, draft.clone());
        Ok(draft)
    }

    fn insert_ecdh(&self, session: EcdhSession) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        if t.ecdh.contains_key(&session.tx_id) {
            return Err(StoreError::EcdhAlreadyExists(session.tx_id));
        }
        t.ecdh.insert(session.tx_id, session);
        Ok(())
    }

    fn get_ecdh(&self, tx_id: &TxId) -> Result<Option<EcdhSession>, StoreError> {
        Ok(self.tables.read().ecdh.get(tx_id).cloned())
    }

    fn upsert_token(&self, token: TokenRecord) -> Result<(), StoreError> {
        self.tables
            .write()
            .tokens
            .insert((token.tx_id, token.purpose), token);
        Ok(())
    }

    fn tokens_for(&self, tx_id: &TxId) -> Result<Vec<TokenRecord>, StoreError> {
        Ok(self
            .tables
            .read()
            .tokens
            .values()
            .filter(|rec| rec.tx_id == *tx_id)
            .cloned()
            .collect())
    }

    fn delete_token(&self, tx_id: &TxId, purpose: TokenPurpose) -> Result<bool, StoreError> {
        Ok(self.tables.write().tokens.remove(&(*tx_id, purpose)).is_some())
    }

    fn insert_offer(&self, offer: DidOffer) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        if t.offers.contains_key(&offer.offer_id) {
            return Err(StoreError::DuplicateOffer(offer.offer_id));
        }
        t.offers.insert(offer.offer_id.clone(), offer);
        Ok(())
    }

    fn get_offer(&self, offer_id: &str) -> Result<Option<DidOffer>, StoreError> {
        Ok(self.tables.read().offers.get(offer_id).cloned())
    }

    fn redeem_offer(&self, offer_id: &str, tx_id: TxId, now: Timestamp) -> Result<DidOffer, StoreError> {
        let mut t = self.tables.write();
        let offer = t
            .offers
            .get_mut(offer_id)
            .ok_or_else(|| StoreError::OfferNotFound(offer_id.to_string()))?;
        offer.redeem(tx_id, now)?;
        Ok(offer.clone())
    }

    fn upsert_entity(&self, entity: EntityRecord) -> Result<(), StoreError> {
        self.tables.write().entities.insert(entity.did.clone(), entity);
        Ok(())
    }

    fn get_entity(&self, did: &Did) -> Result<Option<EntityRecord>, StoreError> {
        Ok(self.tables.read().entities.get(did).cloned())
    }

    fn list_entities(&self) -> Result<Vec<EntityRecord>, StoreError> {
        let mut all: Vec<EntityRecord> = self.tables.read().entities.values().cloned().collect();
        all.sort_by(|a, b| a.did.cmp(&b.did));
        Ok(all)
    }

    fn modify_entity(&self, did: &Did, mutation: &mut EntityMutation<'_>) -> Result<EntityRecord, StoreError> {
        let mut t = self.tables.write();
        let current = t
            .entities
            .get(did)
            .ok_or_else(|| StoreError::EntityNotFound(did.clone()))?;
        let mut draft = current.clone();
        mutation(&mut draft)?;
        t.entities.insert(did.clone(), draft.clone());
        Ok(draft)
    }

    fn register_push_token(&self, did: &Did, token: String) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        let tokens = t.push_tokens.entry(did.clone()).or_default();
        if !tokens.contains(&token) {
            tokens.push(token);
        }
        Ok(())
    }

    fn push_tokens(&self, did: &Did) -> Result<Vec<String>, StoreError> {
        Ok(self.tables.read().push_tokens.get(did).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{SubTransactionStatus, SubTransactionType, TransactionType};
    use tas_crypto::{CipherSuite, SessionKey, SymmetricCipher, SymmetricPadding};
    use zeroize::Zeroizing;

    fn stored_tx(store: &MemoryStore) -> TxId {
        let tx = Transaction::new(TransactionType::IssueVc, Timestamp::now(), 600);
        let id = tx.tx_id;
        store.insert_transaction(tx).unwrap();
        id
    }

    #[test]
    fn rejected_mutation_is_not_committed() {
        let store = MemoryStore::new();
        let id = stored_tx(&store);
        let now = Timestamp::now();
        let err = store
            .modify_transaction(&id, &mut |tx| {
                tx.pii = Some("scribbled".into());
                tx.append_step(2, SubTransactionType::RequestIssueProfile, SubTransactionStatus::Success, now)
                    .map(|_| ())
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Transaction(_)));
        let tx = store.get_transaction(&id).unwrap().unwrap();
        assert!(tx.pii.is_none());
        assert!(tx.sub_transactions.is_empty());
    }

    #[test]
    fn concurrent_claims_of_one_step_yield_one_winner() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let id = stored_tx(&store);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let now = Timestamp::now();
                    store
                        .modify_transaction(&id, &mut |tx| {
                            tx.append_step(1, SubTransactionType::ProposeIssueVc, SubTransactionStatus::Success, now)
                                .map(|_| ())
                        })
                        .is_ok()
                })
            })
            .collect();
        let wins = handles.into_iter().filter_map(|h| h.join().ok()).filter(|ok| *ok).count();
        assert_eq!(wins, 1);
        assert_eq!(store.get_transaction(&id).unwrap().unwrap().sub_transactions.len(), 1);
    }

    #[test]
    fn ecdh_is_insert_once() {
        let store = MemoryStore::new();
        let id = stored_tx(&store);
        let session = EcdhSession {
            tx_id: id,
            client_did: Did::new("did:omn:client").unwrap(),
            nonce: "zabc".into(),
            session_key: SessionKey::from_bytes(vec![0; 32]),
            suite: CipherSuite::new(SymmetricCipher::Aes256Cbc, SymmetricPadding::Pkcs5),
        };
        store.insert_ecdh(session.clone()).unwrap();
        let err = store.insert_ecdh(session).unwrap_err();
        assert_eq!(TasError::from(err).code(), "ECDH_ALREADY_EXISTS");
    }

    #[test]
    fn token_upsert_replaces_per_purpose() {
        let store = MemoryStore::new();
        let id = stored_tx(&store);
        let now = Timestamp::now();
        let token = |bytes: u8, purpose| TokenRecord {
            tx_id: id,
            purpose,
            token: Zeroizing::new(vec![bytes; 32]),
            app_id: "a".into(),
            wallet_id: "w".into(),
            created_at: now,
            expired_at: now.plus_hours(1),
        };
        store.upsert_token(token(1, TokenPurpose::IssueVc)).unwrap();
        store.upsert_token(token(2, TokenPurpose::IssueVc)).unwrap();
        store.upsert_token(token(3, TokenPurpose::ListVc)).unwrap();
        let tokens = store.tokens_for(&id).unwrap();
        assert_eq!(tokens.len(), 2);
        assert!(tokens.iter().any(|t| t.purpose == TokenPurpose::IssueVc && t.matches(&[2; 32])));
        assert!(store.delete_token(&id, TokenPurpose::IssueVc).unwrap());
        assert!(!store.delete_token(&id, TokenPurpose::IssueVc).unwrap());
    }

    #[test]
    fn missing_rows_are_none_or_not_found() {
        let store = MemoryStore::new();
        let id = TxId::new();
        assert!(store.get_transaction(&id).unwrap().is_none());
        let err = store.modify_transaction(&id, &mut |_| Ok(())).unwrap_err();
        assert_eq!(TasError::from(err).code(), "TRANSACTION_NOT_FOUND");
        let err = store.redeem_offer("nope", id, Timestamp::now()).unwrap_err();
        assert_eq!(TasError::from(err).code(), "OFFER_NOT_FOUND");
    }

    #[test]
    fn push_tokens_are_deduplicated() {
        let store = MemoryStore::new();
        let did = Did::new("did:omn:holder").unwrap();
        store.register_push_token(&did, "t1".into()).unwrap();
        store.register_push_token(&did, "t1".into()).unwrap();
        store.register_push_token(&did, "t2".into()).unwrap();
        assert_eq!(store.push_tokens(&did).unwrap(), vec!["t1", "t2"]);
    }
}
