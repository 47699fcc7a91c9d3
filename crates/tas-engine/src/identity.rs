//! # Trusted Agent Identity
//!
//! The TA's own DID and its signing keys, one per proof purpose. Every
//! server-signed message (AccEcdh, issue profiles, certificate VCs) goes
//! through [`TaIdentity::sign()`], which picks the key registered for the
//! purpose and stamps the matching `verificationMethod`.

use std::collections::HashMap;
use std::sync::Arc;

use tas_core::{Did, DidKeyUrl, TasError};
use tas_crypto::{EccCurve, SigningKeyPair};
use tas_vc::proof::sign;
use tas_vc::{DidDocument, ProofPurpose, Signed};

struct TaKey {
    key_id: String,
    key: SigningKeyPair,
}

/// The Trusted Agent's DID and purpose-scoped keys.
#[derive(Clone)]
pub struct TaIdentity {
    did: Did,
    keys: HashMap<ProofPurpose, Arc<TaKey>>,
}

impl std::fmt::Debug for TaIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut purposes: Vec<_> = self.keys.keys().map(|p| p.as_str()).collect();
        purposes.sort_unstable();
        f.debug_struct("TaIdentity")
            .field("did", &self.did)
            .field("purposes", &purposes)
            .finish_non_exhaustive()
    }
}

const ALL_PURPOSES: [ProofPurpose; 4] = [
    ProofPurpose::AssertionMethod,
    ProofPurpose::Authentication,
    ProofPurpose::KeyAgreement,
    ProofPurpose::CapabilityInvocation,
];

impl TaIdentity {
    /// Identity without keys.
    pub fn new(did: Did) -> Self {
        Self {
            did,
            keys: HashMap::new(),
        }
    }

    /// Fresh random keys on `curve`, one per purpose.
    pub fn generate(did: Did, curve: EccCurve) -> Self {
        let mut identity = Self::new(did);
        for purpose in ALL_PURPOSES {
            let key_id = format!("{}-1", purpose.as_str());
            identity = identity.with_key(key_id, SigningKeyPair::generate(curve), &[purpose]);
        }
        identity
    }

    /// Register `key` under `key_id` for each of `purposes`.
    pub fn with_key(mut self, key_id: impl Into<String>, key: SigningKeyPair, purposes: &[ProofPurpose]) -> Self {
        let entry = Arc::new(TaKey {
            key_id: key_id.into(),
            key,
        });
        for purpose in purposes {
            self.keys.insert(*purpose, Arc::clone(&entry));
        }
        self
    }

    /// TA DID.
    pub fn did(&self) -> &Did {
        &self.did
    }

    fn key(&self, purpose: ProofPurpose) -> Result<&TaKey, TasError> {
        self.keys
            .get(&purpose)
            .map(Arc::as_ref)
            .ok_or_else(|| TasError::Unknown(format!("no TA key configured for {purpose}")))
    }

    /// Verification method URL of the key used for `purpose`.
    pub fn verification_method(&self, purpose: ProofPurpose) -> Result<DidKeyUrl, TasError> {
        let key = self.key(purpose)?;
        Ok(DidKeyUrl::from_parts(&self.did, &key.key_id)?)
    }

    /// Sign `message` with the key registered for `purpose`.
    pub fn sign<T: Signed>(&self, message: &mut T, purpose: ProofPurpose) -> Result<(), TasError> {
        let key = self.key(purpose)?;
        let vm = DidKeyUrl::from_parts(&self.did, &key.key_id)?;
        sign(message, &key.key, vm, purpose)?;
        Ok(())
    }

    /// DID document publishing every TA key under its purposes.
    pub fn did_document(&self) -> DidDocument {
        let mut by_key: Vec<(&str, &SigningKeyPair, Vec<ProofPurpose>)> = Vec::new();
        for purpose in ALL_PURPOSES {
            let Some(entry) = self.keys.get(&purpose) else {
                continue;
            };
            match by_key.iter_mut().find(|(id, _, _)| *id == entry.key_id) {
                Some((_, _, purposes)) => purposes.push(purpose),
                None => by_key.push((&entry.key_id, &entry.key, vec![purpose])),
            }
        }
        by_key
            .into_iter()
            .fold(DidDocument::new(self.did.clone()), |doc, (id, key, purposes)| {
                doc.with_key(id, &key.public_key(), &purposes)
            })
    }
}
