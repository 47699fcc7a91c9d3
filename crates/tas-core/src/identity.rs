//! # Identity Newtypes
//!
//! `Did`, `DidKeyUrl` and `TxId` are validated at construction and on
//! deserialization (`serde(try_from = "String")`), so a handler can never
//! observe a syntactically invalid identifier.
//!
//! ## Security Invariant
//!
//! `DidKeyUrl::did()` returns the DID component of a verification method.
//! DID-Auth compares it to the authenticating DID before resolving any key;
//! a proof signed with another subject's key is rejected without touching
//! the registry.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Did
// ---------------------------------------------------------------------------

/// W3C Decentralized Identifier, `did:<method>:<method-specific-id>`.
///
/// - method: one or more lowercase ASCII letters or digits;
/// - method-specific-id: non-empty, `[A-Za-z0-9._:%-]`, not ending in `:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Create a DID, validating its syntax.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if split_did(&s).is_none() {
            return Err(ValidationError::InvalidDid(s));
        }
        Ok(Self(s))
    }

    /// The DID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// DID method (`omn` in `did:omn:abc`).
    pub fn method(&self) -> &str {
        split_did(&self.0).map(|(m, _)| m).unwrap_or_default()
    }

    /// Method-specific identifier (`abc` in `did:omn:abc`).
    pub fn method_specific_id(&self) -> &str {
        split_did(&self.0).map(|(_, id)| id).unwrap_or_default()
    }
}

fn split_did(s: &str) -> Option<(&str, &str)> {
    let rest = s.strip_prefix("did:")?;
    let (method, id) = rest.split_once(':')?;
    let method_ok = !method.is_empty()
        && method
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    let id_ok = !id.is_empty()
        && !id.ends_with(':')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '%' | '-'));
    (method_ok && id_ok).then_some((method, id))
}

impl TryFrom<String> for Did {
    type Error = ValidationError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// DidKeyUrl
// ---------------------------------------------------------------------------

/// Reference to one key of a DID document:
/// `did:<method>:<id>[?versionId=<n>]#<keyId>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DidKeyUrl {
    raw: String,
    did: Did,
    version_id: Option<String>,
    key_id: String,
}

impl DidKeyUrl {
    /// Parse a DID-key-URL.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let invalid = || ValidationError::InvalidDidKeyUrl(raw.clone());

        let (before_fragment, key_id) = raw.split_once('#').ok_or_else(invalid)?;
        if key_id.is_empty() || key_id.contains('#') {
            return Err(invalid());
        }
        let (did_part, query) = match before_fragment.split_once('?') {
            Some((d, q)) => (d, Some(q)),
            None => (before_fragment, None),
        };
        let version_id = match query {
            None => None,
            Some(q) => {
                let v = q.strip_prefix("versionId=").ok_or_else(invalid)?;
                if v.is_empty() || !v.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }
                Some(v.to_string())
            }
        };
        let did = Did::new(did_part).map_err(|_| invalid())?;
        let key_id = key_id.to_string();
        Ok(Self {
            raw,
            did,
            version_id,
            key_id,
        })
    }

    /// Compose a key URL from a DID and key id.
    pub fn from_parts(did: &Did, key_id: &str) -> Result<Self, ValidationError> {
        Self::parse(format!("{did}#{key_id}"))
    }

    /// DID component.
    pub fn did(&self) -> &Did {
        &self.did
    }

    /// Fragment naming the key inside the DID document.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Document version pinned by the URL, if any.
    pub fn version_id(&self) -> Option<&str> {
        self.version_id.as_deref()
    }

    /// The URL as presented.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl TryFrom<String> for DidKeyUrl {
    type Error = ValidationError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<DidKeyUrl> for String {
    fn from(url: DidKeyUrl) -> Self {
        url.raw
    }
}

impl std::fmt::Display for DidKeyUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

// ---------------------------------------------------------------------------
// TxId
// ---------------------------------------------------------------------------

/// Opaque public identifier of a Transaction (UUID v4).
///
/// Ecdh, Token and DidOffer rows reference their Transaction by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxId(Uuid);

impl TxId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an id presented by a client.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ValidationError::InvalidTxId(s.to_string()))
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TxId {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<String> for TxId {
    type Error = ValidationError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TxId> for String {
    fn from(id: TxId) -> Self {
        id.0.to_string()
    }
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
