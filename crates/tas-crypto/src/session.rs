//! # Session Key Derivation
//!
//! `sessionKey = SHA-256(clientNonce ‖ serverNonce ‖ sharedSecret)[..keyLen]`
//! where `keyLen` is the negotiated cipher's key size (16 or 32 bytes).
//! Client and server run the same function on the same inputs, so the
//! session key itself is never transmitted.

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::cipher::SymmetricCipher;
use crate::ecdh::SharedSecret;

/// Symmetric key for one ECDH session.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey(Zeroizing<Vec<u8>>);

impl SessionKey {
    /// Wrap key bytes (e.g. loaded from the store).
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Key length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a zero-length key.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionKey(<redacted>, {} bytes)", self.0.len())
    }
}

/// Derive the session key for `cipher` from both nonces and the shared secret.
pub fn derive_session_key(
    client_nonce: &[u8],
    server_nonce: &[u8],
    shared: &SharedSecret,
    cipher: SymmetricCipher,
) -> SessionKey {
    let mut hasher = Sha256::new();
    hasher.update(client_nonce);
    hasher.update(server_nonce);
    hasher.update(shared.as_bytes());
    let digest = hasher.finalize();
    SessionKey(Zeroizing::new(digest[..cipher.key_len()].to_vec()))
}

/// SHA-256 of `clientNonce ‖ serverNonce`, stored in place of the raw nonces.
pub fn merged_nonce_digest(client_nonce: &[u8], server_nonce: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(client_nonce);
    hasher.update(server_nonce);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::EccCurve;
    use crate::ecdh::EphemeralKeyPair;

    #[test]
    fn both_sides_derive_the_same_key() {
        for curve in [EccCurve::Secp256k1, EccCurve::Secp256r1] {
            let client = EphemeralKeyPair::generate(curve);
            let server = EphemeralKeyPair::generate(curve);
            let (cn, sn) = ([1u8; 16], [2u8; 16]);

            let client_side = derive_session_key(
                &cn,
                &sn,
                &client.agree(&server.public_key()).unwrap(),
                SymmetricCipher::Aes256Cbc,
            );
            let server_side = derive_session_key(
                &cn,
                &sn,
                &server.agree(&client.public_key()).unwrap(),
                SymmetricCipher::Aes256Cbc,
            );
            assert_eq!(client_side, server_side);
        }
    }

    #[test]
    fn key_length_follows_cipher() {
        let a = EphemeralKeyPair::generate(EccCurve::Secp256r1);
        let b = EphemeralKeyPair::generate(EccCurve::Secp256r1);
        let shared = a.agree(&b.public_key()).unwrap();
        assert_eq!(derive_session_key(&[0], &[1], &shared, SymmetricCipher::Aes128Cbc).len(), 16);
        assert_eq!(derive_session_key(&[0], &[1], &shared, SymmetricCipher::Aes256Cbc).len(), 32);
    }

    #[test]
    fn nonce_order_matters() {
        let a = EphemeralKeyPair::generate(EccCurve::Secp256k1);
        let b = EphemeralKeyPair::generate(EccCurve::Secp256k1);
        let shared = a.agree(&b.public_key()).unwrap();
        let k1 = derive_session_key(&[1; 16], &[2; 16], &shared, SymmetricCipher::Aes256Cbc);
        let k2 = derive_session_key(&[2; 16], &[1; 16], &shared, SymmetricCipher::Aes256Cbc);
        assert_ne!(k1, k2);
    }

    #[test]
    fn debug_redacts() {
        let key = SessionKey::from_bytes(vec![7; 32]);
        assert_eq!(format!("{key:?}"), "SessionKey(<redacted>, 32 bytes)");
    }
}
