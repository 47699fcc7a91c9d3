//! # Nonces
//!
//! Challenge and handshake nonces are raw bytes that travel as multibase
//! strings. Random generation lives in `tas-crypto`; this crate only
//! defines the wire type and its comparison.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use subtle::ConstantTimeEq;

use crate::multibase::{self, MultibaseError};

/// A nonce, serialized as multibase (base58btc on output).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Nonce(Vec<u8>);

impl Nonce {
    /// Wrap raw nonce bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Decode a multibase nonce.
    pub fn decode(s: &str) -> Result<Self, MultibaseError> {
        multibase::decode(s).map(Self)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Multibase (base58btc) form.
    pub fn encode(&self) -> String {
        multibase::encode(&self.0)
    }

    /// Constant-time byte equality. Differing lengths compare unequal.
    pub fn ct_matches(&self, other: &Nonce) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl std::fmt::Debug for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Nonce({})", self.encode())
    }
}

impl Serialize for Nonce {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Nonce {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Nonce::decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_multibase() {
        let n = Nonce::from_bytes(vec![1, 2, 3, 4]);
        let json = serde_json::to_string(&n).unwrap();
        assert!(json.starts_with("\"z"));
        let back: Nonce = serde_json::from_str(&json).unwrap();
        assert_eq!(back, n);
    }

    #[test]
    fn accepts_other_multibase_alphabets() {
        let n: Nonce = serde_json::from_str("\"f01020304\"").unwrap();
        assert_eq!(n.as_bytes(), &[1, 2, 3, 4]);
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_str::<Nonce>("\"!!\"").is_err());
    }

    #[test]
    fn ct_matches_checks_length_and_content() {
        let a = Nonce::from_bytes(vec![9; 16]);
        assert!(a.ct_matches(&Nonce::from_bytes(vec![9; 16])));
        assert!(!a.ct_matches(&Nonce::from_bytes(vec![9; 15])));
        let mut flipped = vec![9; 16];
        flipped[15] ^= 1;
        assert!(!a.ct_matches(&Nonce::from_bytes(flipped)));
    }
}
