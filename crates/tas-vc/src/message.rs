//! # Protocol Messages
//!
//! Signed bodies exchanged during a Transaction: the ECDH request/accept
//! pair and the issue profile handed to the holder before issuance.

use serde::{Deserialize, Serialize};

use tas_core::{Did, Nonce, Timestamp};
use tas_crypto::{CipherCandidate, EccCurve, SymmetricCipher, SymmetricPadding};

use crate::proof::{Proof, Signed};

/// Client side of the ECDH handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReqEcdh {
    /// Client DID; must own the proof key.
    pub client: Did,
    /// Client nonce.
    pub client_nonce: Nonce,
    /// Curve of `public_key`.
    pub curve: EccCurve,
    /// Multibase SEC1 ephemeral public key.
    pub public_key: String,
    /// Cipher candidates in client preference order.
    pub candidate: Vec<CipherCandidate>,
    /// Client proof.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
}

impl Signed for ReqEcdh {
    fn proof(&self) -> Option<&Proof> {
        self.proof.as_ref()
    }

    fn set_proof(&mut self, proof: Proof) {
        self.proof = Some(proof);
    }
}

/// Server side of the ECDH handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccEcdh {
    /// Trusted Agent DID.
    pub server: Did,
    /// Server nonce.
    pub server_nonce: Nonce,
    /// Multibase SEC1 server ephemeral public key.
    pub public_key: String,
    /// Negotiated cipher.
    pub cipher: SymmetricCipher,
    /// Negotiated padding.
    pub padding: SymmetricPadding,
    /// Trusted Agent proof (keyAgreement).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
}

impl Signed for AccEcdh {
    fn proof(&self) -> Option<&Proof> {
        self.proof.as_ref()
    }

    fn set_proof(&mut self, proof: Proof) {
        self.proof = Some(proof);
    }
}

/// Issuer details shown to the holder before issuance, countersigned by
/// the Trusted Agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueProfile {
    /// Profile id.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Plan the profile belongs to.
    pub vc_plan_id: String,
    /// Issuer DID.
    pub issuer: Did,
    /// Issuer display name.
    pub issuer_name: String,
    /// Schema URL of the credential to be issued.
    pub credential_schema: String,
    /// Profile expiry.
    pub valid_until: Timestamp,
    /// Trusted Agent proof (assertionMethod).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
}

impl Signed for IssueProfile {
    fn proof(&self) -> Option<&Proof> {
        self.proof.as_ref()
    }

    fn set_proof(&mut self, proof: Proof) {
        self.proof = Some(proof);
    }
}
