//! # Trusted Agent Engine
//!
//! [`TasEngine`] wires the collaborators together and owns the helpers
//! every workflow shares: the ECDH handshake, payload sealing, and the
//! failure paths: an error after a PENDING claim, or a collaborator
//! outage during validation, leaves the Transaction FAILED.
//!
//! Built once at startup with explicit constructor wiring; there is no
//! global state.

use std::sync::Arc;

use serde::Serialize;

use tas_client::{DidRegistry, IssuerGateway, Notifier};
use tas_core::{ErrorCategory, TasError, TxId};
use tas_crypto::cipher::{encrypt, BLOCK_LEN};
use tas_crypto::{EncryptedPayload, SymmetricPadding};
use tas_state::{EcdhSession, EntityRecord, EntityStore, SubTransactionStatus};
use tas_vc::{AccEcdh, ProofPurpose, ReqEcdh};

use crate::config::EngineConfig;
use crate::ecdh::EcdhEstablisher;
use crate::identity::TaIdentity;
use crate::token::TokenService;
use crate::transaction::{TransactionManager, TransactionView};

/// The protocol engine behind every API operation.
pub struct TasEngine {
    pub(crate) config: EngineConfig,
    pub(crate) identity: TaIdentity,
    pub(crate) store: Arc<dyn EntityStore>,
    pub(crate) registry: Arc<dyn DidRegistry>,
    pub(crate) issuer: Arc<dyn IssuerGateway>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) transactions: TransactionManager,
    pub(crate) tokens: TokenService,
}

impl std::fmt::Debug for TasEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TasEngine")
            .field("identity", &self.identity)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TasEngine {
    /// Wire the engine.
    pub fn new(
        config: EngineConfig,
        identity: TaIdentity,
        store: Arc<dyn EntityStore>,
        registry: Arc<dyn DidRegistry>,
        issuer: Arc<dyn IssuerGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let transactions = TransactionManager::new(Arc::clone(&store), config.transaction_ttl_secs);
        let tokens = TokenService::new(Arc::clone(&store), config.token_ttl_hours);
        Self {
            config,
            identity,
            store,
            registry,
            issuer,
            notifier,
            transactions,
            tokens,
        }
    }

    /// Engine settings.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The Trusted Agent's identity.
    pub fn identity(&self) -> &TaIdentity {
        &self.identity
    }

    /// Transaction operations.
    pub fn transactions(&self) -> &TransactionManager {
        &self.transactions
    }

    /// Token operations.
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Register the TA's DID document unless the registry already has one.
    pub fn publish_identity(&self) -> Result<bool, TasError> {
        let did = self.identity.did();
        if self.registry.get_did_document(did)?.is_some() {
            tracing::debug!(did = %did, "TA DID document already registered");
            return Ok(false);
        }
        self.registry.register_did_document(&self.identity.did_document())?;
        tracing::info!(did = %did, "TA DID document registered");
        Ok(true)
    }

    /// Insert or replace partner entities (startup seeding).
    pub fn seed_entities(&self, entities: impl IntoIterator<Item = EntityRecord>) -> Result<usize, TasError> {
        let mut count = 0;
        for entity in entities {
            self.store.upsert_entity(entity)?;
            count += 1;
        }
        Ok(count)
    }

    /// Status view of a Transaction. An expired run is reported as EXPIRED
    /// rather than as an error.
    pub fn transaction_status(&self, tx_id: &TxId) -> Result<TransactionView, TasError> {
        match self.transactions.lookup(tx_id) {
            Ok(tx) => Ok(TransactionView::from(&tx)),
            Err(TasError::TransactionExpired(_)) => self
                .store
                .get_transaction(tx_id)?
                .map(|tx| TransactionView::from(&tx))
                .ok_or_else(|| TasError::TransactionNotFound(tx_id.to_string())),
            Err(err) => Err(err),
        }
    }

    /// Whether the store answers.
    pub fn check_ready(&self) -> Result<(), TasError> {
        self.store.list_entities()?;
        Ok(())
    }

    pub(crate) fn establish_ecdh(
        &self,
        tx_id: TxId,
        req: &ReqEcdh,
        client_purposes: &[ProofPurpose],
    ) -> Result<(AccEcdh, EcdhSession), TasError> {
        EcdhEstablisher {
            registry: self.registry.as_ref(),
            identity: &self.identity,
            store: self.store.as_ref(),
            supported: &self.config.supported_suites,
        }
        .establish(tx_id, req, client_purposes)
    }

    /// Encrypt `body` as JSON under the Transaction's session key. For
    /// NOPAD suites the JSON is right-padded with spaces to a block
    /// boundary, which leaves the document unchanged for any JSON parser.
    pub(crate) fn seal(&self, tx_id: &TxId, body: &impl Serialize) -> Result<EncryptedPayload, TasError> {
        let session = self
            .store
            .get_ecdh(tx_id)?
            .ok_or_else(|| TasError::EcdhNotFound(tx_id.to_string()))?;
        let mut plain = serde_json::to_vec(body).map_err(|e| TasError::Unknown(e.to_string()))?;
        if session.suite.padding == SymmetricPadding::NoPad {
            let rem = plain.len() % BLOCK_LEN;
            if rem != 0 {
                plain.resize(plain.len() + BLOCK_LEN - rem, b' ');
            }
        }
        let sealed = encrypt(&session.session_key, session.suite, &plain)?;
        plain.fill(0);
        Ok(sealed)
    }

    /// Validation that runs before a step is claimed. The caller's own
    /// mistakes (bad token, bad proof) leave the Transaction open for a
    /// retry of the step; a collaborator failure fails it.
    pub(crate) fn prechecked<T>(&self, tx_id: &TxId, f: impl FnOnce() -> Result<T, TasError>) -> Result<T, TasError> {
        f().map_err(|err| {
            if err.category() == ErrorCategory::External {
                self.abandon(tx_id, &err);
            }
            err
        })
    }

    /// Mark the Transaction FAILED because of `err`. A Transaction that is
    /// already terminal keeps its status.
    pub(crate) fn abandon(&self, tx_id: &TxId, err: &TasError) {
        let reason = format!("{}: {err}", err.code());
        if let Err(fail_err) = self.transactions.fail(tx_id, &reason) {
            tracing::warn!(tx_id = %tx_id, code = err.code(), error = %fail_err, "could not record failure");
        }
    }

    /// Run `f` after step `step` was claimed PENDING. Any error fails the
    /// Transaction (the pending step becomes FAIL) and is returned as is.
    pub(crate) fn guarded<T>(&self, tx_id: &TxId, step: u32, f: impl FnOnce() -> Result<T, TasError>) -> Result<T, TasError> {
        match f() {
            Ok(value) => Ok(value),
            Err(err) => {
                let reason = format!("{}: {err}", err.code());
                if let Err(fail_err) = self.transactions.fail(tx_id, &reason) {
                    // Already terminal (typically EXPIRED): still close out the step.
                    if let Err(resolve_err) = self.transactions.resolve_step(tx_id, step, SubTransactionStatus::Fail) {
                        tracing::warn!(
                            tx_id = %tx_id,
                            step,
                            error = %fail_err,
                            resolve_error = %resolve_err,
                            "could not record failure"
                        );
                    }
                }
                tracing::warn!(tx_id = %tx_id, step, code = err.code(), "step failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tas_client::{LoggingNotifier, MemoryDidRegistry, MemoryIssuer};
    use tas_core::Did;
    use tas_crypto::EccCurve;
    use tas_state::{MemoryStore, SubTransactionType, TransactionStatus, TransactionType};

    fn engine(registry: Arc<MemoryDidRegistry>) -> TasEngine {
        TasEngine::new(
            EngineConfig::default(),
            TaIdentity::generate(Did::new("did:omn:ta").unwrap(), EccCurve::Secp256r1),
            Arc::new(MemoryStore::new()),
            registry,
            Arc::new(MemoryIssuer::new()),
            Arc::new(LoggingNotifier::new()),
        )
    }

    #[test]
    fn identity_is_published_once() {
        let registry = Arc::new(MemoryDidRegistry::new());
        let engine = engine(Arc::clone(&registry));
        assert!(engine.publish_identity().unwrap());
        assert!(!engine.publish_identity().unwrap());
        let doc = registry.get_did_document(engine.identity().did()).unwrap().unwrap();
        assert_eq!(doc.purpose_list(ProofPurpose::KeyAgreement).len(), 1);
    }

    #[test]
    fn guarded_error_fails_the_pending_step() {
        let engine = engine(Arc::new(MemoryDidRegistry::new()));
        let tx = engine.transactions.begin(TransactionType::RevokeVc).unwrap();
        let id = tx.tx_id;
        engine
            .transactions
            .advance(&id, 1, SubTransactionType::ProposeRevokeVc, SubTransactionStatus::Success)
            .unwrap();
        engine
            .transactions
            .advance(&id, 2, SubTransactionType::RequestRevokeVc, SubTransactionStatus::Pending)
            .unwrap();

        let err = engine
            .guarded::<()>(&id, 2, || Err(TasError::IssuerCommunicationError("down".into())))
            .unwrap_err();
        assert_eq!(err.code(), "ISSUER_COMMUNICATION_ERROR");

        let view = engine.transaction_status(&id).unwrap();
        assert_eq!(view.status, TransactionStatus::Failed);
        assert_eq!(view.sub_transactions[1].status, SubTransactionStatus::Fail);
        assert!(view.failure_reason.unwrap().starts_with("ISSUER_COMMUNICATION_ERROR"));
    }

    #[test]
    fn outage_before_a_claim_closes_the_run() {
        let engine = engine(Arc::new(MemoryDidRegistry::new()));
        let id = engine.transactions.begin(TransactionType::RevokeVc).unwrap().tx_id;

        let err = engine
            .prechecked::<()>(&id, || Err(TasError::SignatureVerificationFailed("bad signature".into())))
            .unwrap_err();
        assert_eq!(err.code(), "SIGNATURE_VERIFICATION_FAILED");
        assert_eq!(engine.transaction_status(&id).unwrap().status, TransactionStatus::InProgress);

        let err = engine
            .prechecked::<()>(&id, || Err(TasError::BlockchainGetDidDocumentFailed("timeout".into())))
            .unwrap_err();
        assert_eq!(err.code(), "BLOCKCHAIN_GET_DID_DOCUMENT_FAILED");
        let view = engine.transaction_status(&id).unwrap();
        assert_eq!(view.status, TransactionStatus::Failed);
        assert!(view.failure_reason.unwrap().starts_with("BLOCKCHAIN_GET_DID_DOCUMENT_FAILED"));
    }

    #[test]
    fn seal_requires_a_session() {
        let engine = engine(Arc::new(MemoryDidRegistry::new()));
        let err = engine.seal(&TxId::new(), &serde_json::json!({})).unwrap_err();
        assert_eq!(err.code(), "ECDH_NOT_FOUND");
    }
}
