//! # Proof Envelopes
//!
//! Every message the Trusted Agent signs or verifies carries a [`Proof`]:
//! type, creation time, the DID-key-URL of the signing key, the purpose the
//! key is used for, and the multibase signature.
//!
//! ## Security Invariant
//!
//! The signing input is `SHA-256(JCS(message))` with `proofValue` removed,
//! built only through [`CanonicalBytes::signing_input()`]. Signing and
//! verification therefore hash the same bytes whether or not the signature
//! is present.
//!
//! ## Type Mapping
//!
//! | Proof type               | Curve     | Verification key type          |
//! |--------------------------|-----------|--------------------------------|
//! | `Secp256k1Signature2018` | secp256k1 | `Secp256k1VerificationKey2018` |
//! | `Secp256r1Signature2018` | secp256r1 | `Secp256r1VerificationKey2018` |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tas_core::{sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest, DidKeyUrl, TasError, Timestamp};
use tas_crypto::{verify_digest, CryptoError, EccCurve, EcPublicKey, SigningKeyPair};

// ─── Types ───────────────────────────────────────────────────────────

/// Signature suite of a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProofType {
    /// ECDSA over secp256k1.
    Secp256k1Signature2018,
    /// ECDSA over secp256r1 (P-256).
    Secp256r1Signature2018,
}

impl ProofType {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Secp256k1Signature2018 => "Secp256k1Signature2018",
            Self::Secp256r1Signature2018 => "Secp256r1Signature2018",
        }
    }

    /// Curve the signature is computed on.
    pub fn curve(&self) -> EccCurve {
        match self {
            Self::Secp256k1Signature2018 => EccCurve::Secp256k1,
            Self::Secp256r1Signature2018 => EccCurve::Secp256r1,
        }
    }

    /// Proof type for keys on `curve`.
    pub fn for_curve(curve: EccCurve) -> Self {
        match curve {
            EccCurve::Secp256k1 => Self::Secp256k1Signature2018,
            EccCurve::Secp256r1 => Self::Secp256r1Signature2018,
        }
    }

    /// Verification-method type of keys that produce this proof.
    pub fn verification_key_type(&self) -> VerificationKeyType {
        match self {
            Self::Secp256k1Signature2018 => VerificationKeyType::Secp256k1VerificationKey2018,
            Self::Secp256r1Signature2018 => VerificationKeyType::Secp256r1VerificationKey2018,
        }
    }
}

impl std::fmt::Display for ProofType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProofType {
    type Err = ProofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Secp256k1Signature2018" => Ok(Self::Secp256k1Signature2018),
            "Secp256r1Signature2018" => Ok(Self::Secp256r1Signature2018),
            other => Err(ProofError::UnsupportedProofType(other.to_string())),
        }
    }
}

/// Type of a DID document verification method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationKeyType {
    /// secp256k1 public key.
    Secp256k1VerificationKey2018,
    /// secp256r1 public key.
    Secp256r1VerificationKey2018,
}

impl VerificationKeyType {
    /// Curve of keys of this type.
    pub fn curve(&self) -> EccCurve {
        match self {
            Self::Secp256k1VerificationKey2018 => EccCurve::Secp256k1,
            Self::Secp256r1VerificationKey2018 => EccCurve::Secp256r1,
        }
    }

    /// Key type for `curve`.
    pub fn for_curve(curve: EccCurve) -> Self {
        ProofType::for_curve(curve).verification_key_type()
    }

    /// Proof type produced by keys of this type.
    pub fn proof_type(&self) -> ProofType {
        ProofType::for_curve(self.curve())
    }
}

/// What a key is being used for.
///
/// Each purpose corresponds to a key list in the DID document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProofPurpose {
    /// Signing statements (VCs, TA responses, client requests).
    AssertionMethod,
    /// Proving control of a DID (DID-Auth).
    Authentication,
    /// ECDH handshakes.
    KeyAgreement,
    /// Invoking capabilities (DID document updates).
    CapabilityInvocation,
}

impl ProofPurpose {
    /// Wire name, also the DID document key-list name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AssertionMethod => "assertionMethod",
            Self::Authentication => "authentication",
            Self::KeyAgreement => "keyAgreement",
            Self::CapabilityInvocation => "capabilityInvocation",
        }
    }
}

impl std::fmt::Display for ProofPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A signature envelope.
///
/// `proof_value` is `None` while the signing input is being built and is
/// never serialized in that state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    /// Signature suite.
    #[serde(rename = "type")]
    pub proof_type: ProofType,

    /// When the proof was created (UTC, whole seconds).
    pub created: Timestamp,

    /// DID-key-URL of the signing key.
    pub verification_method: DidKeyUrl,

    /// Key purpose the verifier must check.
    pub proof_purpose: ProofPurpose,

    /// Multibase signature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_value: Option<String>,
}

impl Proof {
    /// An unsigned proof stamped with the current time.
    pub fn unsigned(proof_type: ProofType, verification_method: DidKeyUrl, purpose: ProofPurpose) -> Self {
        Self {
            proof_type,
            created: Timestamp::now(),
            verification_method,
            proof_purpose: purpose,
            proof_value: None,
        }
    }
}

/// A message that carries one proof.
pub trait Signed: Serialize {
    /// The attached proof, if any.
    fn proof(&self) -> Option<&Proof>;

    /// Replace the attached proof.
    fn set_proof(&mut self, proof: Proof);
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from building or checking proofs.
#[derive(Error, Debug)]
pub enum ProofError {
    /// The message has no proof.
    #[error("message carries no proof")]
    MissingProof,

    /// The proof has no `proofValue`.
    #[error("proof has no proofValue")]
    MissingProofValue,

    /// Proof type name is not supported.
    #[error("unsupported proof type: {0}")]
    UnsupportedProofType(String),

    /// Proof type and key curve disagree.
    #[error("proof type {proof_type} cannot be verified with a {key_curve} key")]
    CurveMismatch {
        /// Declared proof type.
        proof_type: ProofType,
        /// Curve of the resolved key.
        key_curve: EccCurve,
    },

    /// Message could not be canonicalized.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// Key, signature or encoding problem.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Signature does not verify.
    #[error("signature does not verify against {0}")]
    VerificationFailed(String),
}

impl From<ProofError> for TasError {
    fn from(err: ProofError) -> Self {
        match err {
            ProofError::MissingProof | ProofError::MissingProofValue => {
                TasError::SignatureVerificationFailed(err.to_string())
            }
            ProofError::UnsupportedProofType(_) | ProofError::CurveMismatch { .. } => {
                TasError::InvalidProofType(err.to_string())
            }
            ProofError::Canonicalization(e) => e.into(),
            ProofError::Crypto(e) => e.into(),
            ProofError::VerificationFailed(_) => TasError::SignatureVerificationFailed(err.to_string()),
        }
    }
}

// ─── Sign / verify ───────────────────────────────────────────────────

/// SHA-256 of the message's signing input.
pub fn signing_digest<T: Serialize + ?Sized>(message: &T) -> Result<ContentDigest, ProofError> {
    let canonical = CanonicalBytes::signing_input(message)?;
    Ok(sha256_digest(&canonical))
}

/// Attach a proof to `message`, signed by `key`.
///
/// The proof type follows the key's curve.
pub fn sign<T: Signed>(
    message: &mut T,
    key: &SigningKeyPair,
    verification_method: DidKeyUrl,
    purpose: ProofPurpose,
) -> Result<(), ProofError> {
    let proof = Proof::unsigned(ProofType::for_curve(key.curve()), verification_method, purpose);
    message.set_proof(proof.clone());
    let digest = signing_digest(message)?;
    let signature = key.sign_digest(&digest)?;
    message.set_proof(Proof {
        proof_value: Some(signature.to_multibase()),
        ..proof
    });
    Ok(())
}

/// Verify `message`'s proof against `public_key`. Returns the proof.
///
/// Key resolution and purpose checks are the caller's job; this checks
/// only the type/curve pairing and the signature.
pub fn verify<'a, T: Signed>(message: &'a T, public_key: &EcPublicKey) -> Result<&'a Proof, ProofError> {
    let proof = message.proof().ok_or(ProofError::MissingProof)?;
    if proof.proof_type.curve() != public_key.curve() {
        return Err(ProofError::CurveMismatch {
            proof_type: proof.proof_type,
            key_curve: public_key.curve(),
        });
    }
    let value = proof.proof_value.as_deref().ok_or(ProofError::MissingProofValue)?;
    let signature = tas_core::multibase::decode(value).map_err(CryptoError::from)?;
    let digest = signing_digest(message)?;
    if !verify_digest(public_key, &signature, &digest) {
        return Err(ProofError::VerificationFailed(proof.verification_method.to_string()));
    }
    Ok(proof)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    struct Note {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        proof: Option<Proof>,
    }

    impl Signed for Note {
        fn proof(&self) -> Option<&Proof> {
            self.proof.as_ref()
        }
        fn set_proof(&mut self, proof: Proof) {
            self.proof = Some(proof);
        }
    }

    fn vm() -> DidKeyUrl {
        DidKeyUrl::parse("did:omn:tas?versionId=1#assert").unwrap()
    }

    fn note() -> Note {
        Note {
            text: "hello".into(),
            proof: None,
        }
    }

    #[test]
    fn type_mapping_is_consistent() {
        for curve in [EccCurve::Secp256k1, EccCurve::Secp256r1] {
            let pt = ProofType::for_curve(curve);
            assert_eq!(pt.curve(), curve);
            assert_eq!(pt.verification_key_type().curve(), curve);
            assert_eq!(VerificationKeyType::for_curve(curve).proof_type(), pt);
            assert_eq!(pt.as_str().parse::<ProofType>().unwrap(), pt);
        }
        assert!(matches!(
            "Ed25519Signature2020".parse::<ProofType>(),
            Err(ProofError::UnsupportedProofType(_))
        ));
    }

    #[test]
    fn digest_accepts_unsized_messages() {
        let from_str = signing_digest("hello").unwrap();
        let from_string = signing_digest(&String::from("hello")).unwrap();
        assert_eq!(from_str, from_string);
    }

    #[test]
    fn purpose_wire_names() {
        let json = serde_json::to_string(&ProofPurpose::KeyAgreement).unwrap();
        assert_eq!(json, "\"keyAgreement\"");
        assert_eq!(ProofPurpose::CapabilityInvocation.to_string(), "capabilityInvocation");
    }

    #[test]
    fn sign_then_verify_on_both_curves() {
        for curve in [EccCurve::Secp256k1, EccCurve::Secp256r1] {
            let key = SigningKeyPair::generate(curve);
            let mut msg = note();
            sign(&mut msg, &key, vm(), ProofPurpose::AssertionMethod).unwrap();
            let proof = verify(&msg, &key.public_key()).unwrap();
            assert_eq!(proof.proof_type, ProofType::for_curve(curve));
            assert!(proof.proof_value.as_deref().unwrap().starts_with('z'));
        }
    }

    #[test]
    fn tampered_message_fails() {
        let key = SigningKeyPair::generate(EccCurve::Secp256r1);
        let mut msg = note();
        sign(&mut msg, &key, vm(), ProofPurpose::AssertionMethod).unwrap();
        msg.text = "hellO".into();
        assert!(matches!(
            verify(&msg, &key.public_key()),
            Err(ProofError::VerificationFailed(_))
        ));
    }

    #[test]
    fn tampered_proof_metadata_fails() {
        let key = SigningKeyPair::generate(EccCurve::Secp256k1);
        let mut msg = note();
        sign(&mut msg, &key, vm(), ProofPurpose::AssertionMethod).unwrap();
        if let Some(p) = msg.proof.as_mut() {
            p.proof_purpose = ProofPurpose::Authentication;
        }
        assert!(verify(&msg, &key.public_key()).is_err());
    }

    #[test]
    fn wrong_curve_key_is_a_type_error() {
        let key = SigningKeyPair::generate(EccCurve::Secp256k1);
        let other = SigningKeyPair::generate(EccCurve::Secp256r1);
        let mut msg = note();
        sign(&mut msg, &key, vm(), ProofPurpose::AssertionMethod).unwrap();
        let err = verify(&msg, &other.public_key()).unwrap_err();
        assert_eq!(TasError::from(err).code(), "INVALID_PROOF_TYPE");
    }

    #[test]
    fn missing_proof_and_bad_encoding() {
        let key = SigningKeyPair::generate(EccCurve::Secp256r1);
        assert!(matches!(verify(&note(), &key.public_key()), Err(ProofError::MissingProof)));

        let mut msg = note();
        sign(&mut msg, &key, vm(), ProofPurpose::AssertionMethod).unwrap();
        if let Some(p) = msg.proof.as_mut() {
            p.proof_value = Some("not-multibase".into());
        }
        let err = TasError::from(verify(&msg, &key.public_key()).unwrap_err());
        assert_eq!(err.code(), "DECODING_FAILED");
    }

    #[test]
    fn digest_ignores_proof_value() {
        let key = SigningKeyPair::generate(EccCurve::Secp256r1);
        let mut msg = note();
        msg.set_proof(Proof::unsigned(ProofType::Secp256r1Signature2018, vm(), ProofPurpose::AssertionMethod));
        let before = signing_digest(&msg).unwrap();
        if let Some(p) = msg.proof.as_mut() {
            p.proof_value = Some(key.sign_digest(&before).unwrap().to_multibase());
        }
        assert_eq!(signing_digest(&msg).unwrap(), before);
    }
}
