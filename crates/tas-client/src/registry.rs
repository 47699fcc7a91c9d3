//! # DID Registry
//!
//! The ledger holding DID documents and VC metadata. The engine reads
//! documents to resolve keys, registers VC metadata after issuance, and
//! flips status on revocation.
//!
//! Two implementations:
//!
//! - [`MemoryDidRegistry`]: hash maps, with per-operation failure
//!   injection for tests.
//! - [`HttpDidRegistry`]: JSON over HTTP.
//!
//! | Operation              | Method | Path                          |
//! |------------------------|--------|-------------------------------|
//! | get_did_document       | GET    | `/did-documents/{did}`        |
//! | register_did_document  | POST   | `/did-documents`              |
//! | update_did_document    | PUT    | `/did-documents/{did}`        |
//! | register_vc_meta       | POST   | `/vc-metas`                   |
//! | get_vc_meta            | GET    | `/vc-metas/{vcId}`            |
//! | update_vc_status       | PUT    | `/vc-metas/{vcId}/status`     |

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use serde::Serialize;

use tas_core::Did;
use tas_vc::{DidDocument, VcMeta, VcStatus};

use crate::error::{RegistryError, RegistryOp};
use crate::http::HttpClient;

/// DID Registry operations.
///
/// Reads return `Ok(None)` when the record does not exist.
pub trait DidRegistry: Send + Sync {
    /// DID document for `did`.
    fn get_did_document(&self, did: &Did) -> Result<Option<DidDocument>, RegistryError>;

    /// Register a new DID document.
    fn register_did_document(&self, doc: &DidDocument) -> Result<(), RegistryError>;

    /// Replace an existing DID document.
    fn update_did_document(&self, doc: &DidDocument) -> Result<(), RegistryError>;

    /// Register metadata of a newly issued VC.
    fn register_vc_meta(&self, meta: &VcMeta) -> Result<(), RegistryError>;

    /// Metadata of a VC.
    fn get_vc_meta(&self, vc_id: &str) -> Result<Option<VcMeta>, RegistryError>;

    /// Change the status of a VC.
    fn update_vc_status(&self, vc_id: &str, status: VcStatus) -> Result<(), RegistryError>;
}

// ─── In-memory registry ──────────────────────────────────────────────

#[derive(Default)]
struct Ledger {
    documents: HashMap<Did, DidDocument>,
    vc_metas: HashMap<String, VcMeta>,
}

/// [`DidRegistry`] kept in memory.
#[derive(Default)]
pub struct MemoryDidRegistry {
    ledger: RwLock<Ledger>,
    failing: RwLock<HashSet<RegistryOp>>,
}

impl MemoryDidRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` fail until [`heal`](Self::heal) is called.
    pub fn fail_on(&self, op: RegistryOp) {
        self.failing.write().insert(op);
    }

    /// Clear all injected failures.
    pub fn heal(&self) {
        self.failing.write().clear();
    }

    /// Insert or replace a document without going through the trait.
    pub fn seed_document(&self, doc: DidDocument) {
        self.ledger.write().documents.insert(doc.id.clone(), doc);
    }

    fn check(&self, op: RegistryOp) -> Result<(), RegistryError> {
        if self.failing.read().contains(&op) {
            return Err(RegistryError::Rejected {
                op,
                reason: "injected failure".into(),
            });
        }
        Ok(())
    }
}

impl DidRegistry for MemoryDidRegistry {
    fn get_did_document(&self, did: &Did) -> Result<Option<DidDocument>, RegistryError> {
        self.check(RegistryOp::GetDidDocument)?;
        Ok(self.ledger.read().documents.get(did).cloned())
    }

    fn register_did_document(&self, doc: &DidDocument) -> Result<(), RegistryError> {
        let op = RegistryOp::RegisterDidDocument;
        self.check(op)?;
        let mut ledger = self.ledger.write();
        if ledger.documents.contains_key(&doc.id) {
            return Err(RegistryError::Rejected {
                op,
                reason: format!("{} already registered", doc.id),
            });
        }
        ledger.documents.insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    fn update_did_document(&self, doc: &DidDocument) -> Result<(), RegistryError> {
        let op = RegistryOp::UpdateDidDocument;
        self.check(op)?;
        let mut ledger = self.ledger.write();
        match ledger.documents.get_mut(&doc.id) {
            Some(existing) => {
                *existing = doc.clone();
                Ok(())
            }
            None => Err(RegistryError::Rejected {
                op,
                reason: format!("{} not registered", doc.id),
            }),
        }
    }

    fn register_vc_meta(&self, meta: &VcMeta) -> Result<(), RegistryError> {
        let op = RegistryOp::RegisterVcMeta;
        self.check(op)?;
        let mut ledger = self.ledger.write();
        if ledger.vc_metas.contains_key(&meta.id) {
            return Err(RegistryError::Rejected {
                op,
                reason: format!("VC meta {} already registered", meta.id),
            });
        }
        ledger.vc_metas.insert(meta.id.clone(), meta.clone());
        Ok(())
    }

    fn get_vc_meta(&self, vc_id: &str) -> Result<Option<VcMeta>, RegistryError> {
        self.check(RegistryOp::GetVcMeta)?;
        Ok(self.ledger.read().vc_metas.get(vc_id).cloned())
    }

    fn update_vc_status(&self, vc_id: &str, status: VcStatus) -> Result<(), RegistryError> {
        let op = RegistryOp::UpdateVcStatus;
        self.check(op)?;
        let mut ledger = self.ledger.write();
        match ledger.vc_metas.get_mut(vc_id) {
            Some(meta) => {
                meta.status = status;
                Ok(())
            }
            None => Err(RegistryError::Rejected {
                op,
                reason: format!("VC meta {vc_id} not registered"),
            }),
        }
    }
}

// ─── HTTP registry ───────────────────────────────────────────────────

/// [`DidRegistry`] over HTTP.
///
/// Must be called from a blocking-pool thread inside a Tokio runtime.
#[derive(Debug, Clone)]
pub struct HttpDidRegistry {
    http: HttpClient,
}

#[derive(Serialize)]
struct StatusBody {
    status: VcStatus,
}

impl HttpDidRegistry {
    /// Registry at `base_url`.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, RegistryError> {
        let http = HttpClient::new(base_url, timeout_secs).map_err(|source| RegistryError::Http {
            op: RegistryOp::GetDidDocument,
            source,
        })?;
        Ok(Self { http })
    }

    fn run<T>(
        &self,
        op: RegistryOp,
        fut: impl std::future::Future<Output = Result<T, crate::http::HttpError>>,
    ) -> Result<T, RegistryError> {
        self.http
            .block_on(op.as_str(), fut)
            .and_then(|r| r)
            .map_err(|source| RegistryError::Http { op, source })
    }

    fn endpoint(&self, op: RegistryOp, segments: &[&str]) -> Result<url::Url, RegistryError> {
        self.http
            .endpoint(segments)
            .map_err(|source| RegistryError::Http { op, source })
    }
}

impl DidRegistry for HttpDidRegistry {
    fn get_did_document(&self, did: &Did) -> Result<Option<DidDocument>, RegistryError> {
        let op = RegistryOp::GetDidDocument;
        let url = self.endpoint(op, &["did-documents", did.as_str()])?;
        self.run(op, self.http.get_optional(url, op.as_str()))
    }

    fn register_did_document(&self, doc: &DidDocument) -> Result<(), RegistryError> {
        let op = RegistryOp::RegisterDidDocument;
        let url = self.endpoint(op, &["did-documents"])?;
        self.run(op, self.http.post_unit(url, doc, op.as_str()))
    }

    fn update_did_document(&self, doc: &DidDocument) -> Result<(), RegistryError> {
        let op = RegistryOp::UpdateDidDocument;
        let url = self.endpoint(op, &["did-documents", doc.id.as_str()])?;
        self.run(op, self.http.put_unit(url, doc, op.as_str()))
    }

    fn register_vc_meta(&self, meta: &VcMeta) -> Result<(), RegistryError> {
        let op = RegistryOp::RegisterVcMeta;
        let url = self.endpoint(op, &["vc-metas"])?;
        self.run(op, self.http.post_unit(url, meta, op.as_str()))
    }

    fn get_vc_meta(&self, vc_id: &str) -> Result<Option<VcMeta>, RegistryError> {
        let op = RegistryOp::GetVcMeta;
        let url = self.endpoint(op, &["vc-metas", vc_id])?;
        self.run(op, self.http.get_optional(url, op.as_str()))
    }

    fn update_vc_status(&self, vc_id: &str, status: VcStatus) -> Result<(), RegistryError> {
        let op = RegistryOp::UpdateVcStatus;
        let url = self.endpoint(op, &["vc-metas", vc_id, "status"])?;
        self.run(op, self.http.put_unit(url, &StatusBody { status }, op.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tas_core::{TasError, Timestamp};

    fn meta(id: &str) -> VcMeta {
        let now = Timestamp::now();
        VcMeta {
            id: id.into(),
            issuer: Did::new("did:omn:issuer").unwrap(),
            subject: Did::new("did:omn:holder").unwrap(),
            vc_plan_id: "plan".into(),
            credential_schema: "schema".into(),
            status: VcStatus::Active,
            issuance_date: now,
            valid_from: now,
            valid_until: now.plus_hours(24),
        }
    }

    #[test]
    fn vc_status_updates_in_place() {
        let reg = MemoryDidRegistry::new();
        reg.register_vc_meta(&meta("vc-1")).unwrap();
        reg.update_vc_status("vc-1", VcStatus::Revoked).unwrap();
        assert_eq!(reg.get_vc_meta("vc-1").unwrap().unwrap().status, VcStatus::Revoked);
        assert!(reg.get_vc_meta("vc-2").unwrap().is_none());
    }

    #[test]
    fn duplicate_vc_meta_is_rejected() {
        let reg = MemoryDidRegistry::new();
        reg.register_vc_meta(&meta("vc-1")).unwrap();
        let err = reg.register_vc_meta(&meta("vc-1")).unwrap_err();
        assert_eq!(TasError::from(err).code(), "BLOCKCHAIN_REGISTER_VC_META_FAILED");
    }

    #[test]
    fn injected_failure_uses_the_operation_code() {
        let reg = MemoryDidRegistry::new();
        reg.fail_on(RegistryOp::GetDidDocument);
        let err = reg.get_did_document(&Did::new("did:omn:x").unwrap()).unwrap_err();
        assert_eq!(TasError::from(err).code(), "BLOCKCHAIN_GET_DID_DOCUMENT_FAILED");
        reg.heal();
        assert!(reg.get_did_document(&Did::new("did:omn:x").unwrap()).unwrap().is_none());
    }

    #[test]
    fn update_requires_existing_document() {
        let reg = MemoryDidRegistry::new();
        let doc = DidDocument::new(Did::new("did:omn:a").unwrap());
        assert!(reg.update_did_document(&doc).is_err());
        reg.register_did_document(&doc).unwrap();
        reg.update_did_document(&doc).unwrap();
        assert!(reg.register_did_document(&doc).is_err());
    }
}
