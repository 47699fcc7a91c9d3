//! # ECDH Key Agreement
//!
//! Ephemeral key pairs on secp256k1 / secp256r1 and the raw shared secret
//! (affine x-coordinate of `a·B`). Both sides of a handshake compute the same
//! 32 bytes; [`crate::session`] turns them into a symmetric key.

use rand::rngs::OsRng;
use tas_core::multibase;
use zeroize::Zeroizing;

use crate::curve::EccCurve;
use crate::ecdsa::EcPublicKey;
use crate::error::CryptoError;

enum EcdhSecret {
    K256(k256::SecretKey),
    P256(p256::SecretKey),
}

/// An ephemeral ECDH key pair. Dropped after the handshake.
pub struct EphemeralKeyPair {
    secret: EcdhSecret,
}

/// Raw ECDH output. Never leaves the process.
pub struct SharedSecret(Zeroizing<Vec<u8>>);

impl SharedSecret {
    /// Secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

impl EphemeralKeyPair {
    /// Generate a fresh key pair on `curve`.
    pub fn generate(curve: EccCurve) -> Self {
        let secret = match curve {
            EccCurve::Secp256k1 => EcdhSecret::K256(k256::SecretKey::random(&mut OsRng)),
            EccCurve::Secp256r1 => EcdhSecret::P256(p256::SecretKey::random(&mut OsRng)),
        };
        Self { secret }
    }

    /// Load a key pair from a 32-byte secret scalar.
    pub fn from_secret_bytes(curve: EccCurve, bytes: &[u8]) -> Result<Self, CryptoError> {
        let invalid = |e: String| CryptoError::InvalidKey { curve, reason: e };
        let secret = match curve {
            EccCurve::Secp256k1 => EcdhSecret::K256(
                k256::SecretKey::from_slice(bytes).map_err(|e| invalid(e.to_string()))?,
            ),
            EccCurve::Secp256r1 => EcdhSecret::P256(
                p256::SecretKey::from_slice(bytes).map_err(|e| invalid(e.to_string()))?,
            ),
        };
        Ok(Self { secret })
    }

    /// Curve of this key pair.
    pub fn curve(&self) -> EccCurve {
        match self.secret {
            EcdhSecret::K256(_) => EccCurve::Secp256k1,
            EcdhSecret::P256(_) => EccCurve::Secp256r1,
        }
    }

    /// Compressed SEC1 public key.
    pub fn public_key(&self) -> EcPublicKey {
        use k256::elliptic_curve::sec1::ToEncodedPoint;

        let bytes = match &self.secret {
            EcdhSecret::K256(sk) => sk.public_key().to_encoded_point(true).as_bytes().to_vec(),
            EcdhSecret::P256(sk) => sk.public_key().to_encoded_point(true).as_bytes().to_vec(),
        };
        EcPublicKey::from_derived(self.curve(), bytes)
    }

    /// Compute the shared secret with a peer public key on the same curve.
    pub fn agree(&self, peer: &EcPublicKey) -> Result<SharedSecret, CryptoError> {
        if peer.curve() != self.curve() {
            return Err(CryptoError::CurveMismatch {
                local: self.curve(),
                peer: peer.curve(),
            });
        }
        let invalid = |e: String| CryptoError::InvalidKey {
            curve: peer.curve(),
            reason: e,
        };
        let raw = match &self.secret {
            EcdhSecret::K256(sk) => {
                let pk = k256::PublicKey::from_sec1_bytes(peer.as_bytes())
                    .map_err(|e| invalid(e.to_string()))?;
                let shared = k256::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine());
                shared.raw_secret_bytes().to_vec()
            }
            EcdhSecret::P256(sk) => {
                let pk = p256::PublicKey::from_sec1_bytes(peer.as_bytes())
                    .map_err(|e| invalid(e.to_string()))?;
                let shared = p256::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine());
                shared.raw_secret_bytes().to_vec()
            }
        };
        Ok(SharedSecret(Zeroizing::new(raw)))
    }

    /// Secret scalar, multibase-encoded. Used by clients and tests that
    /// need to replay a handshake.
    pub fn secret_multibase(&self) -> Zeroizing<String> {
        let bytes = match &self.secret {
            EcdhSecret::K256(sk) => Zeroizing::new(sk.to_bytes().to_vec()),
            EcdhSecret::P256(sk) => Zeroizing::new(sk.to_bytes().to_vec()),
        };
        Zeroizing::new(multibase::encode(&bytes))
    }
}

impl std::fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EphemeralKeyPair({}, <private>)", self.curve())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_secret_is_symmetric_on_both_curves() {
        for curve in [EccCurve::Secp256k1, EccCurve::Secp256r1] {
            let client = EphemeralKeyPair::generate(curve);
            let server = EphemeralKeyPair::generate(curve);
            let a = client.agree(&server.public_key()).unwrap();
            let b = server.agree(&client.public_key()).unwrap();
            assert_eq!(a.as_bytes(), b.as_bytes(), "{curve}");
            assert_eq!(a.as_bytes().len(), 32);
        }
    }

    #[test]
    fn different_peers_give_different_secrets() {
        let server = EphemeralKeyPair::generate(EccCurve::Secp256r1);
        let c1 = EphemeralKeyPair::generate(EccCurve::Secp256r1);
        let c2 = EphemeralKeyPair::generate(EccCurve::Secp256r1);
        assert_ne!(
            server.agree(&c1.public_key()).unwrap().as_bytes(),
            server.agree(&c2.public_key()).unwrap().as_bytes()
        );
    }

    #[test]
    fn curve_mismatch_is_rejected() {
        let k1 = EphemeralKeyPair::generate(EccCurve::Secp256k1);
        let r1 = EphemeralKeyPair::generate(EccCurve::Secp256r1);
        assert!(matches!(
            k1.agree(&r1.public_key()),
            Err(CryptoError::CurveMismatch { .. })
        ));
    }

    #[test]
    fn reloaded_secret_agrees_identically() {
        let a = EphemeralKeyPair::generate(EccCurve::Secp256k1);
        let b = EphemeralKeyPair::generate(EccCurve::Secp256k1);
        let bytes = multibase::decode(&a.secret_multibase()).unwrap();
        let a2 = EphemeralKeyPair::from_secret_bytes(EccCurve::Secp256k1, &bytes).unwrap();
        assert_eq!(
            a.agree(&b.public_key()).unwrap().as_bytes(),
            a2.agree(&b.public_key()).unwrap().as_bytes()
        );
    }

    #[test]
    fn debug_hides_secrets() {
        let kp = EphemeralKeyPair::generate(EccCurve::Secp256r1);
        let peer = EphemeralKeyPair::generate(EccCurve::Secp256r1);
        assert!(format!("{kp:?}").contains("<private>"));
        assert_eq!(
            format!("{:?}", kp.agree(&peer.public_key()).unwrap()),
            "SharedSecret(<redacted>)"
        );
    }
}
