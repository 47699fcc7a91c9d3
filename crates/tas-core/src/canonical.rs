//! # Canonical Serialization — JCS Byte Production
//!
//! `CanonicalBytes` is the sole construction path for bytes that are
//! signed, verified or digested anywhere in the Trusted Agent Server.
//!
//! ## Security Invariant
//!
//! The inner `Vec<u8>` is private. The only constructors are
//! [`CanonicalBytes::new()`] and [`CanonicalBytes::signing_input()`], both of
//! which run the coercion pipeline before RFC 8785 serialization:
//!
//! 1. **Reject floats.** JCS number formatting for non-integers differs
//!    between implementations; claims and amounts travel as strings.
//! 2. **Sort keys, compact separators** via `serde_jcs`.
//!
//! `signing_input()` additionally removes `proofValue` from the top-level
//! `proof` object and from every entry of a top-level `proofs` array, so the
//! bytes a signer hashes are identical to the bytes a verifier rebuilds from
//! the signed message.
//!
//! Transport encodings (encrypted payloads, HTTP bodies) must NOT use this
//! type: a signed message re-serialized through `signing_input()` would lose
//! its signature.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Name of the field that carries a signature inside a proof envelope.
pub const PROOF_VALUE_FIELD: &str = "proofValue";

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - Object keys are sorted (RFC 8785 ordering).
/// - No insignificant whitespace.
/// - No float numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value as-is.
    ///
    /// # Errors
    ///
    /// `FloatRejected` if the value contains a float, `SerializationFailed`
    /// if serde cannot render it.
    pub fn new<T: Serialize + ?Sized>(obj: &T) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(value)
    }

    /// Canonicalize a signed message with its signature values cleared.
    ///
    /// This is the input to both proof creation and proof verification.
    pub fn signing_input<T: Serialize + ?Sized>(obj: &T) -> Result<Self, CanonicalizationError> {
        let mut value = serde_json::to_value(obj)?;
        strip_proof_values(&mut value);
        Self::from_value(value)
    }

    fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        let coerced = coerce_json_value(value)?;
        let bytes = serialize_canonical(&coerced)?;
        Ok(Self(bytes))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Remove `proofValue` from `proof` and from each element of `proofs`.
///
/// Only the top level is touched: a VC embedded in a request keeps its own
/// signature, which is part of what the outer proof covers.
fn strip_proof_values(value: &mut Value) {
    let Value::Object(map) = value else {
        return;
    };
    if let Some(Value::Object(proof)) = map.get_mut("proof") {
        proof.remove(PROOF_VALUE_FIELD);
    }
    if let Some(Value::Array(proofs)) = map.get_mut("proofs") {
        for entry in proofs.iter_mut() {
            if let Value::Object(proof) = entry {
                proof.remove(PROOF_VALUE_FIELD);
            }
        }
    }
}

fn coerce_json_value(value: Value) -> Result<Value, CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(value),
        Value::Number(ref n) => {
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(value)
        }
        Value::Object(map) => {
            let mut coerced = serde_json::Map::new();
            for (k, v) in map {
                coerced.insert(k, coerce_json_value(v)?);
            }
            Ok(Value::Object(coerced))
        }
        Value::Array(arr) => {
            let coerced: Result<Vec<_>, _> = arr.into_iter().map(coerce_json_value).collect();
            Ok(Value::Array(coerced?))
        }
    }
}

fn serialize_canonical(value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
    let s = serde_jcs::to_string(value)?;
    Ok(s.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_str(cb: &CanonicalBytes) -> &str {
        std::str::from_utf8(cb.as_bytes()).unwrap()
    }

    #[test]
    fn sorted_keys_compact_separators() {
        let data = json!({"b": 2, "a": 1, "c": "hello"});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(as_str(&cb), r#"{"a":1,"b":2,"c":"hello"}"#);
    }

    #[test]
    fn nested_objects_sorted() {
        let data = json!({"outer": {"b": 2, "a": 1}, "list": [3, 2, 1]});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(as_str(&cb), r#"{"list":[3,2,1],"outer":{"a":1,"b":2}}"#);
    }

    #[test]
    fn float_rejected() {
        let data = json!({"amount": 1.5});
        match CanonicalBytes::new(&data) {
            Err(CanonicalizationError::FloatRejected(f)) => assert_eq!(f, 1.5),
            other => panic!("expected FloatRejected, got {other:?}"),
        }
    }

    #[test]
    fn deeply_nested_float_rejected() {
        let data = json!({"a": {"b": [{"c": 3.25}]}});
        assert!(CanonicalBytes::signing_input(&data).is_err());
    }

    #[test]
    fn new_keeps_proof_value() {
        let data = json!({"did": "did:ex:1", "proof": {"type": "T", "proofValue": "zabc"}});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert!(as_str(&cb).contains("proofValue"));
    }

    #[test]
    fn signing_input_strips_proof_value() {
        let data = json!({"did": "did:ex:1", "proof": {"type": "T", "proofValue": "zabc"}});
        let cb = CanonicalBytes::signing_input(&data).unwrap();
        assert_eq!(as_str(&cb), r#"{"did":"did:ex:1","proof":{"type":"T"}}"#);
    }

    #[test]
    fn signing_input_strips_every_entry_of_proofs() {
        let data = json!({
            "proofs": [
                {"type": "T", "proofValue": "z1"},
                {"type": "U", "proofValue": "z2"}
            ]
        });
        let cb = CanonicalBytes::signing_input(&data).unwrap();
        assert_eq!(as_str(&cb), r#"{"proofs":[{"type":"T"},{"type":"U"}]}"#);
    }

    #[test]
    fn signing_input_leaves_nested_proofs_alone() {
        let data = json!({
            "vc": {"proof": {"proofValue": "zinner"}},
            "proof": {"proofValue": "zouter"}
        });
        let s = as_str(&CanonicalBytes::signing_input(&data).unwrap()).to_string();
        assert!(s.contains("zinner"));
        assert!(!s.contains("zouter"));
    }

    #[test]
    fn populated_and_cleared_proof_value_canonicalize_identically() {
        let signed = json!({"n": 1, "proof": {"type": "T", "proofValue": "zsig"}});
        let cleared = json!({"n": 1, "proof": {"type": "T"}});
        assert_eq!(
            CanonicalBytes::signing_input(&signed).unwrap(),
            CanonicalBytes::signing_input(&cleared).unwrap()
        );
    }

    #[test]
    fn non_object_payloads_pass_through() {
        let cb = CanonicalBytes::signing_input(&"hello world").unwrap();
        assert_eq!(cb.as_bytes(), b"\"hello world\"");
        let cb = CanonicalBytes::new(&json!([])).unwrap();
        assert_eq!(cb.as_bytes(), b"[]");
        assert!(!cb.is_empty());
    }

    #[test]
    fn unsized_values_canonicalize() {
        let items: &[i64] = &[3, 1, 2];
        assert_eq!(CanonicalBytes::new(items).unwrap().as_bytes(), b"[3,1,2]");
        assert_eq!(CanonicalBytes::signing_input("text").unwrap().as_bytes(), b"\"text\"");
    }

    #[test]
    fn unicode_passthrough() {
        let data = json!({"name": "\u{00e9}\u{00e8}"});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert!(as_str(&cb).contains('\u{00e9}'));
    }
}
