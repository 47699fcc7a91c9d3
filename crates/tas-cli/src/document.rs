//! # JSON Documents
//!
//! Any JSON object can carry a proof under its `proof` key. Canonical form
//! and signing input match what the server computes for its own messages.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};

use tas_core::{CanonicalBytes, DidKeyUrl};
use tas_crypto::{EcPublicKey, SigningKeyPair};
use tas_vc::proof::{sign, verify};
use tas_vc::{Proof, ProofPurpose, Signed};

/// A JSON object with an optional attached proof.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDocument {
    #[serde(flatten)]
    body: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    proof: Option<Proof>,
}

impl Signed for JsonDocument {
    fn proof(&self) -> Option<&Proof> {
        self.proof.as_ref()
    }

    fn set_proof(&mut self, proof: Proof) {
        self.proof = Some(proof);
    }
}

impl JsonDocument {
    /// Split `value` into body and proof. Only objects can be signed.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut body) = value else {
            bail!("document must be a JSON object");
        };
        let proof = body
            .remove("proof")
            .map(serde_json::from_value)
            .transpose()
            .context("document has a malformed proof")?;
        Ok(Self { body, proof })
    }

    /// Read and parse a file.
    pub fn read(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).with_context(|| format!("failed to read document: {}", path.display()))?;
        let value: Value =
            serde_json::from_str(&text).with_context(|| format!("failed to parse JSON: {}", path.display()))?;
        Self::from_value(value)
    }

    /// Pretty JSON including the proof.
    pub fn to_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to render document")
    }
}

/// Canonical JSON of a whole file, proof included.
pub fn canonicalize(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read document: {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&text).with_context(|| format!("failed to parse JSON: {}", path.display()))?;
    let canonical = CanonicalBytes::new(&value).context("failed to canonicalize document")?;
    String::from_utf8(canonical.as_bytes().to_vec()).context("canonical form is not UTF-8")
}

/// Replace any existing proof with a fresh one.
pub fn sign_document(
    doc: &mut JsonDocument,
    key: &SigningKeyPair,
    verification_method: &str,
    purpose: ProofPurpose,
) -> Result<()> {
    let vm = DidKeyUrl::parse(verification_method).context("invalid verification method")?;
    doc.proof = None;
    sign(doc, key, vm, purpose).context("signing failed")?;
    Ok(())
}

/// Verify the attached proof. Returns the proof on success.
pub fn verify_document<'a>(doc: &'a JsonDocument, public_key: &EcPublicKey) -> Result<&'a Proof> {
    verify(doc, public_key).context("proof verification failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tas_crypto::EccCurve;

    fn doc() -> JsonDocument {
        JsonDocument::from_value(json!({"b": 2, "a": {"z": true, "y": "text"}})).unwrap()
    }

    #[test]
    fn signed_document_verifies_after_round_trip() {
        let key = SigningKeyPair::generate(EccCurve::Secp256k1);
        let mut signed = doc();
        sign_document(&mut signed, &key, "did:omn:alice#assert", ProofPurpose::AssertionMethod).unwrap();

        let reparsed = JsonDocument::from_value(serde_json::to_value(&signed).unwrap()).unwrap();
        let proof = verify_document(&reparsed, &key.public_key()).unwrap();
        assert_eq!(proof.proof_purpose, ProofPurpose::AssertionMethod);
    }

    #[test]
    fn edited_body_fails() {
        let key = SigningKeyPair::generate(EccCurve::Secp256r1);
        let mut signed = doc();
        sign_document(&mut signed, &key, "did:omn:alice#assert", ProofPurpose::AssertionMethod).unwrap();
        signed.body.insert("b".into(), json!(3));
        assert!(verify_document(&signed, &key.public_key()).is_err());
    }

    #[test]
    fn unsigned_document_fails() {
        let key = SigningKeyPair::generate(EccCurve::Secp256k1);
        assert!(verify_document(&doc(), &key.public_key()).is_err());
    }

    #[test]
    fn only_objects_are_documents() {
        assert!(JsonDocument::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn canonical_form_sorts_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, r#"{ "b": 2, "a": { "z": true, "y": "text" } }"#).unwrap();
        assert_eq!(canonicalize(&path).unwrap(), r#"{"a":{"y":"text","z":true},"b":2}"#);
    }

    #[test]
    fn bad_verification_method_is_reported() {
        let key = SigningKeyPair::generate(EccCurve::Secp256k1);
        let mut d = doc();
        let err = sign_document(&mut d, &key, "no-fragment", ProofPurpose::AssertionMethod).unwrap_err();
        assert!(err.to_string().contains("verification method"));
    }
}
