//! # Multibase
//!
//! Self-describing binary-to-text encoding for keys, signatures, nonces,
//! tokens and encrypted payloads. The first character names the alphabet:
//!
//! | Prefix | Encoding |
//! |---|---|
//! | `z` | base58btc |
//! | `f` | base16, lowercase |
//! | `m` | base64, no padding |
//! | `u` | base64url, no padding |
//!
//! Encoding defaults to `z`. Decoding accepts any of the above; anything else
//! is a [`MultibaseError`], which the protocol reports as `DECODING_FAILED`.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use thiserror::Error;

use crate::error::TasError;

/// Supported multibase alphabets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultibaseKind {
    /// `z`: base58 (bitcoin alphabet).
    Base58Btc,
    /// `f`: lowercase hex.
    Base16Lower,
    /// `m`: RFC 4648 base64 without padding.
    Base64,
    /// `u`: RFC 4648 base64url without padding.
    Base64Url,
}

impl MultibaseKind {
    /// Prefix character.
    pub fn prefix(&self) -> char {
        match self {
            Self::Base58Btc => 'z',
            Self::Base16Lower => 'f',
            Self::Base64 => 'm',
            Self::Base64Url => 'u',
        }
    }

    fn from_prefix(c: char) -> Option<Self> {
        match c {
            'z' => Some(Self::Base58Btc),
            'f' => Some(Self::Base16Lower),
            'm' => Some(Self::Base64),
            'u' => Some(Self::Base64Url),
            _ => None,
        }
    }
}

/// Multibase decoding failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultibaseError {
    /// Empty input.
    #[error("empty multibase string")]
    Empty,

    /// Prefix is not a supported alphabet.
    #[error("unsupported multibase prefix {0:?}")]
    UnsupportedPrefix(char),

    /// Payload is not valid for the named alphabet.
    #[error("invalid {kind:?} payload: {reason}")]
    InvalidPayload {
        /// Alphabet named by the prefix.
        kind: MultibaseKind,
        /// Decoder message.
        reason: String,
    },
}

impl From<MultibaseError> for TasError {
    fn from(err: MultibaseError) -> Self {
        TasError::DecodingFailed(err.to_string())
    }
}

/// Encode with base58btc (`z`).
pub fn encode(bytes: &[u8]) -> String {
    encode_as(MultibaseKind::Base58Btc, bytes)
}

/// Encode with an explicit alphabet.
pub fn encode_as(kind: MultibaseKind, bytes: &[u8]) -> String {
    let body = match kind {
        MultibaseKind::Base58Btc => bs58::encode(bytes).into_string(),
        MultibaseKind::Base16Lower => hex::encode(bytes),
        MultibaseKind::Base64 => STANDARD_NO_PAD.encode(bytes),
        MultibaseKind::Base64Url => URL_SAFE_NO_PAD.encode(bytes),
    };
    let mut out = String::with_capacity(body.len() + 1);
    out.push(kind.prefix());
    out.push_str(&body);
    out
}

/// Decode any supported multibase string.
pub fn decode(s: &str) -> Result<Vec<u8>, MultibaseError> {
    decode_with_kind(s).map(|(_, bytes)| bytes)
}

/// Decode and report which alphabet was used.
pub fn decode_with_kind(s: &str) -> Result<(MultibaseKind, Vec<u8>), MultibaseError> {
    let mut chars = s.chars();
    let prefix = chars.next().ok_or(MultibaseError::Empty)?;
    let kind = MultibaseKind::from_prefix(prefix).ok_or(MultibaseError::UnsupportedPrefix(prefix))?;
    let body = chars.as_str();
    let invalid = |reason: String| MultibaseError::InvalidPayload { kind, reason };
    let bytes = match kind {
        MultibaseKind::Base58Btc => bs58::decode(body)
            .into_vec()
            .map_err(|e| invalid(e.to_string()))?,
        MultibaseKind::Base16Lower => {
            if body.chars().any(|c| c.is_ascii_uppercase()) {
                return Err(invalid("uppercase digits in base16 lower".into()));
            }
            hex::decode(body).map_err(|e| invalid(e.to_string()))?
        }
        MultibaseKind::Base64 => STANDARD_NO_PAD
            .decode(body)
            .map_err(|e| invalid(e.to_string()))?,
        MultibaseKind::Base64Url => URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|e| invalid(e.to_string()))?,
    };
    Ok((kind, bytes))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn base58_decode_inverts_encode(bytes in prop::collection::vec(any::<u8>(), 0..96)) {
            prop_assert_eq!(decode(&encode(&bytes)).unwrap(), bytes);
        }

        #[test]
        fn decode_never_panics(s in "\\PC{0,64}") {
            let _ = decode(&s);
        }
    }
}
