//! # ECDSA Signing and Verification
//!
//! Proof signatures over secp256k1 (`k256`) and secp256r1 (`p256`).
//!
//! ## Security Invariant
//!
//! - The signing input is a [`ContentDigest`], i.e. SHA-256 over
//!   `CanonicalBytes`. Signing is prehashed; the digest is never re-hashed.
//! - Nonces are RFC 6979 deterministic. secp256k1 signatures are low-S
//!   normalized; high-S signatures on that curve do not verify.
//! - Signatures are compact `r ‖ s` (64 bytes), multibase on the wire.
//! - [`verify_digest()`] returns `bool` and never panics: a malformed key or
//!   signature is a failed verification.
//! - Private keys are not `Serialize` and never appear in `Debug`.

use rand::rngs::OsRng;
use tas_core::{multibase, ContentDigest};
use zeroize::Zeroizing;

use crate::curve::EccCurve;
use crate::error::CryptoError;

// ---------------------------------------------------------------------------
// Public keys
// ---------------------------------------------------------------------------

/// A validated SEC1 public key (compressed or uncompressed) with its curve.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EcPublicKey {
    curve: EccCurve,
    bytes: Vec<u8>,
}

impl EcPublicKey {
    /// Parse SEC1 bytes, rejecting points that are not on the curve.
    pub fn from_sec1(curve: EccCurve, bytes: &[u8]) -> Result<Self, CryptoError> {
        let invalid = |e: String| CryptoError::InvalidKey { curve, reason: e };
        match curve {
            EccCurve::Secp256k1 => {
                k256::PublicKey::from_sec1_bytes(bytes).map_err(|e| invalid(e.to_string()))?;
            }
            EccCurve::Secp256r1 => {
                p256::PublicKey::from_sec1_bytes(bytes).map_err(|e| invalid(e.to_string()))?;
            }
        }
        Ok(Self {
            curve,
            bytes: bytes.to_vec(),
        })
    }

    /// Wrap bytes computed from a secret scalar we hold; no re-validation.
    pub(crate) fn from_derived(curve: EccCurve, bytes: Vec<u8>) -> Self {
        Self { curve, bytes }
    }

    /// Parse a multibase-encoded SEC1 key.
    pub fn from_multibase(curve: EccCurve, s: &str) -> Result<Self, CryptoError> {
        let bytes = multibase::decode(s)?;
        Self::from_sec1(curve, &bytes)
    }

    /// Curve of this key.
    pub fn curve(&self) -> EccCurve {
        self.curve
    }

    /// SEC1 bytes as supplied.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Multibase (base58btc) form.
    pub fn to_multibase(&self) -> String {
        multibase::encode(&self.bytes)
    }
}

impl std::fmt::Debug for EcPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EcPublicKey({}, {})", self.curve, self.to_multibase())
    }
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

/// A compact 64-byte ECDSA signature.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EcSignature(Vec<u8>);

impl EcSignature {
    /// Raw `r ‖ s` bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Multibase (base58btc) form, as carried in `proofValue`.
    pub fn to_multibase(&self) -> String {
        multibase::encode(&self.0)
    }
}

impl std::fmt::Debug for EcSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EcSignature({})", self.to_multibase())
    }
}

// ---------------------------------------------------------------------------
// Key pairs
// ---------------------------------------------------------------------------

enum SigningInner {
    K256(k256::ecdsa::SigningKey),
    P256(p256::ecdsa::SigningKey),
}

/// An ECDSA signing key.
pub struct SigningKeyPair {
    inner: SigningInner,
}

impl SigningKeyPair {
    /// Generate a fresh random key on `curve`.
    pub fn generate(curve: EccCurve) -> Self {
        let inner = match curve {
            EccCurve::Secp256k1 => SigningInner::K256(k256::ecdsa::SigningKey::random(&mut OsRng)),
            EccCurve::Secp256r1 => SigningInner::P256(p256::ecdsa::SigningKey::random(&mut OsRng)),
        };
        Self { inner }
    }

    /// Load a key from its 32-byte secret scalar.
    pub fn from_secret_bytes(curve: EccCurve, secret: &[u8]) -> Result<Self, CryptoError> {
        let invalid = |e: String| CryptoError::InvalidKey { curve, reason: e };
        let inner = match curve {
            EccCurve::Secp256k1 => SigningInner::K256(
                k256::ecdsa::SigningKey::from_slice(secret).map_err(|e| invalid(e.to_string()))?,
            ),
            EccCurve::Secp256r1 => SigningInner::P256(
                p256::ecdsa::SigningKey::from_slice(secret).map_err(|e| invalid(e.to_string()))?,
            ),
        };
        Ok(Self { inner })
    }

    /// Load a key from a multibase-encoded secret scalar.
    pub fn from_multibase(curve: EccCurve, s: &str) -> Result<Self, CryptoError> {
        let secret = Zeroizing::new(multibase::decode(s)?);
        Self::from_secret_bytes(curve, &secret)
    }

    /// Curve of this key.
    pub fn curve(&self) -> EccCurve {
        match self.inner {
            SigningInner::K256(_) => EccCurve::Secp256k1,
            SigningInner::P256(_) => EccCurve::Secp256r1,
        }
    }

    /// Compressed SEC1 public key.
    pub fn public_key(&self) -> EcPublicKey {
        let bytes = match &self.inner {
            SigningInner::K256(sk) => sk.verifying_key().to_encoded_point(true).as_bytes().to_vec(),
            SigningInner::P256(sk) => sk.verifying_key().to_encoded_point(true).as_bytes().to_vec(),
        };
        EcPublicKey::from_derived(self.curve(), bytes)
    }

    /// Secret scalar bytes, for key export only.
    pub fn secret_bytes(&self) -> Zeroizing<Vec<u8>> {
        match &self.inner {
            SigningInner::K256(sk) => Zeroizing::new(sk.to_bytes().to_vec()),
            SigningInner::P256(sk) => Zeroizing::new(sk.to_bytes().to_vec()),
        }
    }

    /// Sign a SHA-256 digest.
    pub fn sign_digest(&self, digest: &ContentDigest) -> Result<EcSignature, CryptoError> {
        use k256::ecdsa::signature::hazmat::PrehashSigner;

        let failed = |e: String| CryptoError::SigningFailed(e);
        let bytes = match &self.inner {
            SigningInner::K256(sk) => {
                let sig: k256::ecdsa::Signature =
                    sk.sign_prehash(digest.as_bytes()).map_err(|e| failed(e.to_string()))?;
                sig.to_bytes().to_vec()
            }
            SigningInner::P256(sk) => {
                let sig: p256::ecdsa::Signature =
                    sk.sign_prehash(digest.as_bytes()).map_err(|e| failed(e.to_string()))?;
                sig.to_bytes().to_vec()
            }
        };
        Ok(EcSignature(bytes))
    }
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningKeyPair({}, <private>)", self.curve())
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verify a compact signature over a digest. Fails closed.
pub fn verify_digest(public_key: &EcPublicKey, signature: &[u8], digest: &ContentDigest) -> bool {
    use k256::ecdsa::signature::hazmat::PrehashVerifier;

    let prehash = digest.as_bytes();
    match public_key.curve {
        EccCurve::Secp256k1 => {
            let Ok(vk) = k256::ecdsa::VerifyingKey::from_sec1_bytes(&public_key.bytes) else {
                return false;
            };
            let Ok(sig) = k256::ecdsa::Signature::from_slice(signature) else {
                return false;
            };
            vk.verify_prehash(prehash, &sig).is_ok()
        }
        EccCurve::Secp256r1 => {
            let Ok(vk) = p256::ecdsa::VerifyingKey::from_sec1_bytes(&public_key.bytes) else {
                return false;
            };
            let Ok(sig) = p256::ecdsa::Signature::from_slice(signature) else {
                return false;
            };
            vk.verify_prehash(prehash, &sig).is_ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tas_core::{sha256_digest, CanonicalBytes};

    const CURVES: [EccCurve; 2] = [EccCurve::Secp256k1, EccCurve::Secp256r1];

    fn digest_of(v: serde_json::Value) -> ContentDigest {
        sha256_digest(&CanonicalBytes::signing_input(&v).unwrap())
    }

    #[test]
    fn sign_and_verify_on_every_curve() {
        for curve in CURVES {
            let kp = SigningKeyPair::generate(curve);
            let digest = digest_of(serde_json::json!({"message": "hello", "n": 1}));
            let sig = kp.sign_digest(&digest).unwrap();
            assert_eq!(sig.as_bytes().len(), 64);
            assert!(verify_digest(&kp.public_key(), sig.as_bytes(), &digest), "{curve}");
        }
    }

    #[test]
    fn signatures_are_deterministic() {
        for curve in CURVES {
            let kp = SigningKeyPair::generate(curve);
            let digest = digest_of(serde_json::json!({"a": 1}));
            assert_eq!(kp.sign_digest(&digest).unwrap(), kp.sign_digest(&digest).unwrap());
        }
    }

    #[test]
    fn wrong_key_fails() {
        for curve in CURVES {
            let signer = SigningKeyPair::generate(curve);
            let other = SigningKeyPair::generate(curve);
            let digest = digest_of(serde_json::json!({"test": true}));
            let sig = signer.sign_digest(&digest).unwrap();
            assert!(!verify_digest(&other.public_key(), sig.as_bytes(), &digest));
        }
    }

    #[test]
    fn wrong_message_fails() {
        let kp = SigningKeyPair::generate(EccCurve::Secp256r1);
        let sig = kp
            .sign_digest(&digest_of(serde_json::json!({"msg": "original"})))
            .unwrap();
        let tampered = digest_of(serde_json::json!({"msg": "tampered"}));
        assert!(!verify_digest(&kp.public_key(), sig.as_bytes(), &tampered));
    }

    #[test]
    fn key_from_other_curve_fails_closed() {
        let k1 = SigningKeyPair::generate(EccCurve::Secp256k1);
        let digest = digest_of(serde_json::json!({}));
        let sig = k1.sign_digest(&digest).unwrap();
        let relabeled = EcPublicKey {
            curve: EccCurve::Secp256r1,
            bytes: k1.public_key().as_bytes().to_vec(),
        };
        assert!(!verify_digest(&relabeled, sig.as_bytes(), &digest));
    }

    #[test]
    fn malformed_signature_fails_closed() {
        let kp = SigningKeyPair::generate(EccCurve::Secp256k1);
        let digest = digest_of(serde_json::json!({}));
        assert!(!verify_digest(&kp.public_key(), &[], &digest));
        assert!(!verify_digest(&kp.public_key(), &[0u8; 63], &digest));
        assert!(!verify_digest(&kp.public_key(), &[0u8; 64], &digest));
        assert!(!verify_digest(&kp.public_key(), &[0xffu8; 64], &digest));
    }

    #[test]
    fn secret_export_round_trips() {
        for curve in CURVES {
            let kp = SigningKeyPair::generate(curve);
            let secret = multibase::encode(&kp.secret_bytes());
            let loaded = SigningKeyPair::from_multibase(curve, &secret).unwrap();
            assert_eq!(loaded.public_key(), kp.public_key());
        }
    }

    #[test]
    fn public_key_parsing_rejects_garbage() {
        assert!(EcPublicKey::from_sec1(EccCurve::Secp256k1, &[2u8; 10]).is_err());
        assert!(EcPublicKey::from_multibase(EccCurve::Secp256r1, "zzzz").is_err());
        let kp = SigningKeyPair::generate(EccCurve::Secp256r1);
        let pk = EcPublicKey::from_multibase(EccCurve::Secp256r1, &kp.public_key().to_multibase())
            .unwrap();
        assert_eq!(pk.as_bytes().len(), EccCurve::Secp256r1.compressed_key_len());
    }

    #[test]
    fn debug_does_not_leak_private_key() {
        let kp = SigningKeyPair::generate(EccCurve::Secp256k1);
        let dbg = format!("{kp:?}");
        assert!(dbg.contains("<private>"));
        assert!(!dbg.contains(&multibase::encode(&kp.secret_bytes())));
    }
}
