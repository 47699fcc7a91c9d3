//! # Symmetric Ciphers and Negotiation
//!
//! The ECDH handshake ends with a cipher/padding pair both sides use for the
//! rest of the Transaction. The client sends an ordered candidate list; the
//! server picks the first candidate it supports. Client order is the
//! protocol's tie-break and must not be replaced by server preference.
//!
//! Payloads are AES-CBC with a random 16-byte IV per message. `NOPAD`
//! requires block-aligned plaintext; unaligned input is rejected before the
//! cipher runs.

use aes::{Aes128, Aes256};
use cbc::cipher::block_padding::{NoPadding, Pkcs7};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use serde::{Deserialize, Serialize};
use tas_core::multibase;

use crate::error::CryptoError;
use crate::random::random_bytes;
use crate::session::SessionKey;

/// AES block size.
pub const BLOCK_LEN: usize = 16;

/// Symmetric cipher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymmetricCipher {
    /// AES-128 in CBC mode.
    #[serde(rename = "AES-128-CBC")]
    Aes128Cbc,
    /// AES-256 in CBC mode.
    #[serde(rename = "AES-256-CBC")]
    Aes256Cbc,
}

impl SymmetricCipher {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aes128Cbc => "AES-128-CBC",
            Self::Aes256Cbc => "AES-256-CBC",
        }
    }

    /// Key length in bytes.
    pub fn key_len(&self) -> usize {
        match self {
            Self::Aes128Cbc => 16,
            Self::Aes256Cbc => 32,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "AES-128-CBC" => Some(Self::Aes128Cbc),
            "AES-256-CBC" => Some(Self::Aes256Cbc),
            _ => None,
        }
    }
}

/// Block padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymmetricPadding {
    /// No padding; plaintext must be block aligned.
    #[serde(rename = "NOPAD")]
    NoPad,
    /// PKCS#5/PKCS#7 padding.
    #[serde(rename = "PKCS5")]
    Pkcs5,
}

impl SymmetricPadding {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoPad => "NOPAD",
            Self::Pkcs5 => "PKCS5",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "NOPAD" => Some(Self::NoPad),
            "PKCS5" => Some(Self::Pkcs5),
            _ => None,
        }
    }
}

/// A negotiated cipher/padding pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CipherSuite {
    /// Cipher.
    pub cipher: SymmetricCipher,
    /// Padding.
    pub padding: SymmetricPadding,
}

impl CipherSuite {
    /// Build a suite.
    pub fn new(cipher: SymmetricCipher, padding: SymmetricPadding) -> Self {
        Self { cipher, padding }
    }
}

impl std::fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.cipher.as_str(), self.padding.as_str())
    }
}

/// A client-offered candidate. Kept as strings so one unknown entry does not
/// reject the whole list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherCandidate {
    /// Cipher name, e.g. `AES-256-CBC`.
    pub cipher: String,
    /// Padding name, e.g. `PKCS5`.
    pub padding: String,
}

impl CipherCandidate {
    /// Parse into a suite if both names are recognized.
    pub fn to_suite(&self) -> Option<CipherSuite> {
        Some(CipherSuite::new(
            SymmetricCipher::parse(&self.cipher)?,
            SymmetricPadding::parse(&self.padding)?,
        ))
    }
}

impl From<CipherSuite> for CipherCandidate {
    fn from(suite: CipherSuite) -> Self {
        Self {
            cipher: suite.cipher.as_str().to_string(),
            padding: suite.padding.as_str().to_string(),
        }
    }
}

/// Pick the first client candidate the server supports, in client order.
pub fn negotiate(
    candidates: &[CipherCandidate],
    supported: &[CipherSuite],
) -> Result<CipherSuite, CryptoError> {
    candidates
        .iter()
        .filter_map(CipherCandidate::to_suite)
        .find(|suite| supported.contains(suite))
        .ok_or(CryptoError::NoMatchingCipher {
            offered: candidates.len(),
        })
}

/// Ciphertext plus the IV it was produced with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// Initialization vector.
    pub iv: [u8; BLOCK_LEN],
    /// Ciphertext.
    pub data: Vec<u8>,
}

impl EncryptedPayload {
    /// Multibase form of the IV.
    pub fn iv_multibase(&self) -> String {
        multibase::encode(&self.iv)
    }

    /// Multibase form of the ciphertext.
    pub fn data_multibase(&self) -> String {
        multibase::encode(&self.data)
    }

    /// Rebuild from multibase IV and ciphertext.
    pub fn from_multibase(iv: &str, data: &str) -> Result<Self, CryptoError> {
        let iv_bytes = multibase::decode(iv)?;
        let iv: [u8; BLOCK_LEN] = iv_bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::Decryption(format!("IV must be {BLOCK_LEN} bytes")))?;
        Ok(Self {
            iv,
            data: multibase::decode(data)?,
        })
    }
}

fn check_key(key: &SessionKey, suite: CipherSuite) -> Result<(), CryptoError> {
    if key.len() != suite.cipher.key_len() {
        return Err(CryptoError::Encryption(format!(
            "{} needs a {}-byte key, session key has {}",
            suite.cipher.as_str(),
            suite.cipher.key_len(),
            key.len()
        )));
    }
    Ok(())
}

/// Encrypt with a fresh random IV.
pub fn encrypt(
    key: &SessionKey,
    suite: CipherSuite,
    plaintext: &[u8],
) -> Result<EncryptedPayload, CryptoError> {
    encrypt_with_iv(key, suite, random_bytes::<BLOCK_LEN>(), plaintext)
}

/// Encrypt with a caller-chosen IV.
pub fn encrypt_with_iv(
    key: &SessionKey,
    suite: CipherSuite,
    iv: [u8; BLOCK_LEN],
    plaintext: &[u8],
) -> Result<EncryptedPayload, CryptoError> {
    check_key(key, suite)?;
    if suite.padding == SymmetricPadding::NoPad && plaintext.len() % BLOCK_LEN != 0 {
        return Err(CryptoError::Encryption(format!(
            "NOPAD requires a multiple of {BLOCK_LEN} bytes, got {}",
            plaintext.len()
        )));
    }
    let k = key.as_bytes();
    let bad_key = |e: aes::cipher::InvalidLength| CryptoError::Encryption(e.to_string());
    let data = match (suite.cipher, suite.padding) {
        (SymmetricCipher::Aes128Cbc, SymmetricPadding::Pkcs5) => {
            cbc::Encryptor::<Aes128>::new_from_slices(k, &iv)
                .map_err(bad_key)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext)
        }
        (SymmetricCipher::Aes128Cbc, SymmetricPadding::NoPad) => {
            cbc::Encryptor::<Aes128>::new_from_slices(k, &iv)
                .map_err(bad_key)?
                .encrypt_padded_vec_mut::<NoPadding>(plaintext)
        }
        (SymmetricCipher::Aes256Cbc, SymmetricPadding::Pkcs5) => {
            cbc::Encryptor::<Aes256>::new_from_slices(k, &iv)
                .map_err(bad_key)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext)
        }
        (SymmetricCipher::Aes256Cbc, SymmetricPadding::NoPad) => {
            cbc::Encryptor::<Aes256>::new_from_slices(k, &iv)
                .map_err(bad_key)?
                .encrypt_padded_vec_mut::<NoPadding>(plaintext)
        }
    };
    Ok(EncryptedPayload { iv, data })
}

/// Decrypt a payload produced by [`encrypt()`].
pub fn decrypt(
    key: &SessionKey,
    suite: CipherSuite,
    payload: &EncryptedPayload,
) -> Result<Vec<u8>, CryptoError> {
    check_key(key, suite).map_err(|e| CryptoError::Decryption(e.to_string()))?;
    if payload.data.len() % BLOCK_LEN != 0 {
        return Err(CryptoError::Decryption("ciphertext is not block aligned".into()));
    }
    let k = key.as_bytes();
    let iv = &payload.iv;
    let bad_key = |e: aes::cipher::InvalidLength| CryptoError::Decryption(e.to_string());
    let unpad = |e: cbc::cipher::block_padding::UnpadError| CryptoError::Decryption(e.to_string());
    let plain = match (suite.cipher, suite.padding) {
        (SymmetricCipher::Aes128Cbc, SymmetricPadding::Pkcs5) => {
            cbc::Decryptor::<Aes128>::new_from_slices(k, iv)
                .map_err(bad_key)?
                .decrypt_padded_vec_mut::<Pkcs7>(&payload.data)
                .map_err(unpad)?
        }
        (SymmetricCipher::Aes128Cbc, SymmetricPadding::NoPad) => {
            cbc::Decryptor::<Aes128>::new_from_slices(k, iv)
                .map_err(bad_key)?
                .decrypt_padded_vec_mut::<NoPadding>(&payload.data)
                .map_err(unpad)?
        }
        (SymmetricCipher::Aes256Cbc, SymmetricPadding::Pkcs5) => {
            cbc::Decryptor::<Aes256>::new_from_slices(k, iv)
                .map_err(bad_key)?
                .decrypt_padded_vec_mut::<Pkcs7>(&payload.data)
                .map_err(unpad)?
        }
        (SymmetricCipher::Aes256Cbc, SymmetricPadding::NoPad) => {
            cbc::Decryptor::<Aes256>::new_from_slices(k, iv)
                .map_err(bad_key)?
                .decrypt_padded_vec_mut::<NoPadding>(&payload.data)
                .map_err(unpad)?
        }
    };
    Ok(plain)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(c: &str, p: &str) -> CipherCandidate {
        CipherCandidate {
            cipher: c.into(),
            padding: p.into(),
        }
    }

    fn server_supports() -> Vec<CipherSuite> {
        vec![
            CipherSuite::new(SymmetricCipher::Aes256Cbc, SymmetricPadding::Pkcs5),
            CipherSuite::new(SymmetricCipher::Aes128Cbc, SymmetricPadding::Pkcs5),
        ]
    }

    #[test]
    fn negotiation_follows_client_order() {
        let chosen = negotiate(
            &[cand("AES-128-CBC", "PKCS5"), cand("AES-256-CBC", "PKCS5")],
            &server_supports(),
        )
        .unwrap();
        assert_eq!(chosen.cipher, SymmetricCipher::Aes128Cbc);

        let chosen = negotiate(
            &[cand("AES-256-CBC", "PKCS5"), cand("AES-128-CBC", "PKCS5")],
            &server_supports(),
        )
        .unwrap();
        assert_eq!(chosen.cipher, SymmetricCipher::Aes256Cbc);
    }

    #[test]
    fn negotiation_skips_unknown_and_unsupported_entries() {
        let chosen = negotiate(
            &[
                cand("CHACHA20", "NONE"),
                cand("AES-256-CBC", "NOPAD"),
                cand("AES-128-CBC", "PKCS5"),
            ],
            &server_supports(),
        )
        .unwrap();
        assert_eq!(chosen.to_string(), "AES-128-CBC/PKCS5");
    }

    #[test]
    fn negotiation_without_overlap_fails() {
        let err = negotiate(&[cand("AES-256-CBC", "NOPAD")], &server_supports()).unwrap_err();
        assert_eq!(err, CryptoError::NoMatchingCipher { offered: 1 });
        assert!(negotiate(&[], &server_supports()).is_err());
    }

    #[test]
    fn encrypt_decrypt_every_suite() {
        for cipher in [SymmetricCipher::Aes128Cbc, SymmetricCipher::Aes256Cbc] {
            for padding in [SymmetricPadding::Pkcs5, SymmetricPadding::NoPad] {
                let suite = CipherSuite::new(cipher, padding);
                let key = SessionKey::from_bytes(vec![0x42; cipher.key_len()]);
                let msg = [7u8; 48];
                let enc = encrypt(&key, suite, &msg).unwrap();
                assert_ne!(enc.data.as_slice(), &msg[..]);
                assert_eq!(decrypt(&key, suite, &enc).unwrap(), msg, "{suite}");
            }
        }
    }

    #[test]
    fn nopad_rejects_unaligned_plaintext() {
        let suite = CipherSuite::new(SymmetricCipher::Aes128Cbc, SymmetricPadding::NoPad);
        let key = SessionKey::from_bytes(vec![1; 16]);
        assert!(matches!(encrypt(&key, suite, b"short"), Err(CryptoError::Encryption(_))));
    }

    #[test]
    fn wrong_key_length_is_rejected() {
        let suite = CipherSuite::new(SymmetricCipher::Aes256Cbc, SymmetricPadding::Pkcs5);
        let key = SessionKey::from_bytes(vec![1; 16]);
        assert!(encrypt(&key, suite, b"data").is_err());
    }

    #[test]
    fn wrong_key_does_not_decrypt_to_plaintext() {
        let suite = CipherSuite::new(SymmetricCipher::Aes256Cbc, SymmetricPadding::Pkcs5);
        let enc = encrypt(&SessionKey::from_bytes(vec![1; 32]), suite, b"{\"vc\":1}").unwrap();
        let other = decrypt(&SessionKey::from_bytes(vec![2; 32]), suite, &enc);
        assert_ne!(other.ok().as_deref(), Some(&b"{\"vc\":1}"[..]));
    }

    #[test]
    fn payload_multibase_round_trip() {
        let suite = CipherSuite::new(SymmetricCipher::Aes128Cbc, SymmetricPadding::Pkcs5);
        let key = SessionKey::from_bytes(vec![9; 16]);
        let enc = encrypt(&key, suite, b"profile").unwrap();
        let back = EncryptedPayload::from_multibase(&enc.iv_multibase(), &enc.data_multibase()).unwrap();
        assert_eq!(decrypt(&key, suite, &back).unwrap(), b"profile");
        assert!(EncryptedPayload::from_multibase("z2", &enc.data_multibase()).is_err());
    }

    #[test]
    fn wire_names() {
        let suite = CipherSuite::new(SymmetricCipher::Aes256Cbc, SymmetricPadding::Pkcs5);
        let json = serde_json::to_value(suite).unwrap();
        assert_eq!(json, serde_json::json!({"cipher": "AES-256-CBC", "padding": "PKCS5"}));
        assert_eq!(CipherCandidate::from(suite).to_suite(), Some(suite));
    }
}
