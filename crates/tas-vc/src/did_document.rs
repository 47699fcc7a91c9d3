//! # DID Documents
//!
//! The subset of a DID document the Trusted Agent reads: verification
//! methods and the per-purpose key lists. Purpose lists hold key ids either
//! as a bare fragment (`pin`, `#pin`) or as a full DID-key-URL.

use serde::{Deserialize, Serialize};

use tas_core::{Did, Timestamp};
use tas_crypto::{CryptoError, EcPublicKey};

use crate::proof::{ProofPurpose, VerificationKeyType};

/// A public key entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// Key id (fragment without `#`).
    pub id: String,
    /// Key type; fixes the curve.
    #[serde(rename = "type")]
    pub key_type: VerificationKeyType,
    /// Controller DID.
    pub controller: Did,
    /// Multibase SEC1 public key.
    pub public_key_multibase: String,
}

impl VerificationMethod {
    /// Decode the public key on the curve named by `key_type`.
    pub fn public_key(&self) -> Result<EcPublicKey, CryptoError> {
        EcPublicKey::from_multibase(self.key_type.curve(), &self.public_key_multibase)
    }
}

/// A DID document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    /// Subject DID.
    pub id: Did,
    /// Controller DID.
    pub controller: Did,
    /// Document version; bumped by every update.
    pub version_id: String,
    /// Creation time.
    pub created: Timestamp,
    /// Last update time.
    pub updated: Timestamp,
    /// Deactivated documents cannot authenticate anything.
    #[serde(default)]
    pub deactivated: bool,
    /// Key material.
    #[serde(default)]
    pub verification_method: Vec<VerificationMethod>,
    /// Keys usable for [`ProofPurpose::AssertionMethod`].
    #[serde(default)]
    pub assertion_method: Vec<String>,
    /// Keys usable for [`ProofPurpose::Authentication`].
    #[serde(default)]
    pub authentication: Vec<String>,
    /// Keys usable for [`ProofPurpose::KeyAgreement`].
    #[serde(default)]
    pub key_agreement: Vec<String>,
    /// Keys usable for [`ProofPurpose::CapabilityInvocation`].
    #[serde(default)]
    pub capability_invocation: Vec<String>,
}

impl DidDocument {
    /// An empty version-1 document controlled by its subject.
    pub fn new(id: Did) -> Self {
        let now = Timestamp::now();
        Self {
            controller: id.clone(),
            id,
            version_id: "1".into(),
            created: now,
            updated: now,
            deactivated: false,
            verification_method: Vec::new(),
            assertion_method: Vec::new(),
            authentication: Vec::new(),
            key_agreement: Vec::new(),
            capability_invocation: Vec::new(),
        }
    }

    /// Add a key and list it under each of `purposes`.
    pub fn with_key(mut self, key_id: &str, public_key: &EcPublicKey, purposes: &[ProofPurpose]) -> Self {
        self.verification_method.push(VerificationMethod {
            id: key_id.to_string(),
            key_type: VerificationKeyType::for_curve(public_key.curve()),
            controller: self.id.clone(),
            public_key_multibase: public_key.to_multibase(),
        });
        for purpose in purposes {
            self.purpose_list_mut(*purpose).push(key_id.to_string());
        }
        self
    }

    /// Key ids listed for `purpose`.
    pub fn purpose_list(&self, purpose: ProofPurpose) -> &[String] {
        match purpose {
            ProofPurpose::AssertionMethod => &self.assertion_method,
            ProofPurpose::Authentication => &self.authentication,
            ProofPurpose::KeyAgreement => &self.key_agreement,
            ProofPurpose::CapabilityInvocation => &self.capability_invocation,
        }
    }

    fn purpose_list_mut(&mut self, purpose: ProofPurpose) -> &mut Vec<String> {
        match purpose {
            ProofPurpose::AssertionMethod => &mut self.assertion_method,
            ProofPurpose::Authentication => &mut self.authentication,
            ProofPurpose::KeyAgreement => &mut self.key_agreement,
            ProofPurpose::CapabilityInvocation => &mut self.capability_invocation,
        }
    }

    /// The verification method `key_id`, only if it is listed for `purpose`.
    pub fn key_for(&self, key_id: &str, purpose: ProofPurpose) -> Option<&VerificationMethod> {
        let listed = self
            .purpose_list(purpose)
            .iter()
            .any(|entry| self.fragment(entry) == key_id);
        if !listed {
            return None;
        }
        self.verification_method
            .iter()
            .find(|vm| self.fragment(&vm.id) == key_id)
    }

    fn fragment<'a>(&self, reference: &'a str) -> &'a str {
        match reference.rsplit_once('#') {
            Some((_, fragment)) => fragment,
            None => reference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tas_crypto::{EccCurve, SigningKeyPair};

    fn did() -> Did {
        Did::new("did:omn:holder").unwrap()
    }

    #[test]
    fn key_is_found_only_under_its_purposes() {
        let key = SigningKeyPair::generate(EccCurve::Secp256r1).public_key();
        let doc = DidDocument::new(did()).with_key("pin", &key, &[ProofPurpose::Authentication]);

        let vm = doc.key_for("pin", ProofPurpose::Authentication).unwrap();
        assert_eq!(vm.public_key().unwrap(), key);
        assert!(doc.key_for("pin", ProofPurpose::AssertionMethod).is_none());
        assert!(doc.key_for("bio", ProofPurpose::Authentication).is_none());
    }

    #[test]
    fn purpose_entries_may_be_full_urls() {
        let key = SigningKeyPair::generate(EccCurve::Secp256k1).public_key();
        let mut doc = DidDocument::new(did()).with_key("assert", &key, &[]);
        doc.assertion_method.push("did:omn:holder#assert".into());
        assert!(doc.key_for("assert", ProofPurpose::AssertionMethod).is_some());
    }

    #[test]
    fn wire_shape() {
        let key = SigningKeyPair::generate(EccCurve::Secp256k1).public_key();
        let doc = DidDocument::new(did()).with_key("keyagree", &key, &[ProofPurpose::KeyAgreement]);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["verificationMethod"][0]["type"], "Secp256k1VerificationKey2018");
        assert_eq!(json["keyAgreement"][0], "keyagree");
        let back: DidDocument = serde_json::from_value(json).unwrap();
        assert_eq!(back, doc);
    }
}
