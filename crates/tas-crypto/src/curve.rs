//! Elliptic curves supported for signatures and key agreement.

use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// Curve of a signing or key-agreement key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EccCurve {
    /// SEC 2 secp256k1.
    Secp256k1,
    /// NIST P-256.
    Secp256r1,
}

impl EccCurve {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Secp256k1 => "Secp256k1",
            Self::Secp256r1 => "Secp256r1",
        }
    }

    /// Length of a compressed SEC1 public key on this curve.
    pub fn compressed_key_len(&self) -> usize {
        match self {
            Self::Secp256k1 | Self::Secp256r1 => 33,
        }
    }
}

impl std::fmt::Display for EccCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EccCurve {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Secp256k1" => Ok(Self::Secp256k1),
            "Secp256r1" => Ok(Self::Secp256r1),
            other => Err(CryptoError::UnsupportedCurve(other.to_string())),
        }
    }
}
