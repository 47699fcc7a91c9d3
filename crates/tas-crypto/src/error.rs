//! Errors raised by cryptographic operations, and their mapping into the
//! protocol error taxonomy.

use tas_core::{MultibaseError, TasError};
use thiserror::Error;

use crate::curve::EccCurve;

/// Error in a cryptographic operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Curve name is not supported.
    #[error("unsupported curve: {0}")]
    UnsupportedCurve(String),

    /// Key bytes are not a valid key on the curve.
    #[error("invalid {curve} key: {reason}")]
    InvalidKey {
        /// Curve the key was parsed for.
        curve: EccCurve,
        /// Parser message.
        reason: String,
    },

    /// Signature bytes are not a well-formed compact signature.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// Signature does not verify.
    #[error("signature verification failed")]
    VerificationFailed,

    /// Signing failed.
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// Peer key is on a different curve than the local ephemeral key.
    #[error("curve mismatch: local {local}, peer {peer}")]
    CurveMismatch {
        /// Curve of the local key.
        local: EccCurve,
        /// Curve of the peer key.
        peer: EccCurve,
    },

    /// No client cipher candidate is supported.
    #[error("no matching cipher among {offered} candidate(s)")]
    NoMatchingCipher {
        /// Number of candidates offered.
        offered: usize,
    },

    /// Symmetric encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Symmetric decryption failed.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Multibase decoding failed.
    #[error(transparent)]
    Decoding(#[from] MultibaseError),
}

impl From<CryptoError> for TasError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::UnsupportedCurve(c) => TasError::InvalidProofType(c),
            CryptoError::InvalidKey { .. } => TasError::InvalidSignature(err.to_string()),
            CryptoError::MalformedSignature(_) | CryptoError::VerificationFailed => {
                TasError::SignatureVerificationFailed(err.to_string())
            }
            CryptoError::CurveMismatch { .. } => TasError::KeyAgreementFailed(err.to_string()),
            CryptoError::NoMatchingCipher { offered } => TasError::NoMatchingCipherType { offered },
            CryptoError::SigningFailed(_) => TasError::Unknown(err.to_string()),
            CryptoError::Encryption(_) | CryptoError::Decryption(_) => {
                TasError::EncryptionFailed(err.to_string())
            }
            CryptoError::Decoding(e) => TasError::from(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_preserves_crypto_category() {
        let cases = [
            CryptoError::UnsupportedCurve("ed448".into()),
            CryptoError::VerificationFailed,
            CryptoError::MalformedSignature("short".into()),
            CryptoError::CurveMismatch {
                local: EccCurve::Secp256k1,
                peer: EccCurve::Secp256r1,
            },
            CryptoError::NoMatchingCipher { offered: 2 },
            CryptoError::Decoding(MultibaseError::Empty),
        ];
        for err in cases {
            let tas: TasError = err.into();
            assert_eq!(tas.category(), tas_core::ErrorCategory::Crypto, "{tas}");
        }
    }

    #[test]
    fn specific_codes() {
        let e: TasError = CryptoError::UnsupportedCurve("x".into()).into();
        assert_eq!(e.code(), "INVALID_PROOF_TYPE");
        let e: TasError = CryptoError::VerificationFailed.into();
        assert_eq!(e.code(), "SIGNATURE_VERIFICATION_FAILED");
        let e: TasError = CryptoError::Decoding(MultibaseError::UnsupportedPrefix('x')).into();
        assert_eq!(e.code(), "DECODING_FAILED");
    }
}
