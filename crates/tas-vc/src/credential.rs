//! # Verifiable Credentials
//!
//! The credential envelope the Trusted Agent relays between issuer and
//! holder, the `IssueVcParam` request it sends to the issuer, and the
//! `VcMeta` record written to the DID Registry.
//!
//! Claims are opaque to the Trusted Agent. It checks the issuer's proof and
//! the holder/issuer binding, nothing more.

use serde::{Deserialize, Serialize};

use tas_core::{Did, Timestamp};

use crate::proof::{Proof, Signed};

/// Base JSON-LD context of every credential.
pub const VC_CONTEXT: &str = "https://www.w3.org/ns/credentials/v2";

/// Base credential type.
pub const VC_BASE_TYPE: &str = "VerifiableCredential";

/// One attested attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    /// Stable claim code, e.g. `org.iso.18013.5.family_name`.
    pub code: String,
    /// Display caption.
    pub caption: String,
    /// Claim value (text or multibase for binary).
    pub value: String,
    /// Value format hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// How the issuer verified the claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    /// Evidence kind, e.g. `DocumentVerification`.
    #[serde(rename = "type")]
    pub evidence_type: String,
    /// Who performed the verification.
    pub verifier: String,
    /// Which document was checked.
    pub evidence_document: String,
}

/// Subject block: the holder and the claims about them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSubject {
    /// Holder DID.
    pub id: Did,
    /// Claims.
    pub claims: Vec<Claim>,
}

/// Schema reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSchema {
    /// Schema URL.
    pub id: String,
    /// Schema kind.
    #[serde(rename = "type")]
    pub schema_type: String,
}

/// A signed credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiableCredential {
    /// JSON-LD contexts.
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// Credential id.
    pub id: String,
    /// Credential types; always starts with `VerifiableCredential`.
    #[serde(rename = "type")]
    pub types: Vec<String>,
    /// Issuer DID.
    pub issuer: Did,
    /// When the credential was signed.
    pub issuance_date: Timestamp,
    /// Start of validity.
    pub valid_from: Timestamp,
    /// End of validity.
    pub valid_until: Timestamp,
    /// Schema reference.
    pub credential_schema: CredentialSchema,
    /// Holder and claims.
    pub credential_subject: CredentialSubject,
    /// Issuer's verification evidence.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Evidence>,
    /// Issuer proof.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
}

impl VerifiableCredential {
    /// Unsigned credential for `param`, stamped now.
    pub fn from_param(param: &IssueVcParam) -> Self {
        let mut types = vec![VC_BASE_TYPE.to_string()];
        types.extend(param.types.iter().filter(|t| *t != VC_BASE_TYPE).cloned());
        Self {
            context: vec![VC_CONTEXT.to_string()],
            id: param.vc_id.clone(),
            types,
            issuer: param.issuer.clone(),
            issuance_date: Timestamp::now(),
            valid_from: param.valid_from,
            valid_until: param.valid_until,
            credential_schema: CredentialSchema {
                id: param.schema_id.clone(),
                schema_type: "JsonSchema".into(),
            },
            credential_subject: CredentialSubject {
                id: param.holder.clone(),
                claims: param.claims.clone(),
            },
            evidence: param.evidence.clone(),
            proof: None,
        }
    }

    /// Holder DID.
    pub fn holder(&self) -> &Did {
        &self.credential_subject.id
    }

    /// Registry record for this credential, status ACTIVE.
    pub fn to_meta(&self, vc_plan_id: &str) -> VcMeta {
        VcMeta {
            id: self.id.clone(),
            issuer: self.issuer.clone(),
            subject: self.credential_subject.id.clone(),
            vc_plan_id: vc_plan_id.to_string(),
            credential_schema: self.credential_schema.id.clone(),
            status: VcStatus::Active,
            issuance_date: self.issuance_date,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
        }
    }
}

impl Signed for VerifiableCredential {
    fn proof(&self) -> Option<&Proof> {
        self.proof.as_ref()
    }

    fn set_proof(&mut self, proof: Proof) {
        self.proof = Some(proof);
    }
}

/// What the Trusted Agent asks an issuer to sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueVcParam {
    /// Credential id chosen by the Trusted Agent.
    pub vc_id: String,
    /// Plan the credential is issued under.
    pub vc_plan_id: String,
    /// Holder DID (authenticated by DID-Auth).
    pub holder: Did,
    /// Issuer DID.
    pub issuer: Did,
    /// Additional credential types.
    pub types: Vec<String>,
    /// Schema URL.
    pub schema_id: String,
    /// Claims from the issuer's claim source.
    pub claims: Vec<Claim>,
    /// Verification evidence.
    pub evidence: Vec<Evidence>,
    /// Start of validity.
    pub valid_from: Timestamp,
    /// End of validity.
    pub valid_until: Timestamp,
}

/// Credential status in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VcStatus {
    /// Valid.
    Active,
    /// Suspended by the issuer; may return to ACTIVE.
    Inactive,
    /// Permanently revoked.
    Revoked,
}

impl VcStatus {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Revoked => "REVOKED",
        }
    }
}

impl std::fmt::Display for VcStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry record of an issued credential. Never contains claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VcMeta {
    /// Credential id.
    pub id: String,
    /// Issuer DID.
    pub issuer: Did,
    /// Holder DID.
    pub subject: Did,
    /// Plan the credential was issued under.
    pub vc_plan_id: String,
    /// Schema URL.
    pub credential_schema: String,
    /// Current status.
    pub status: VcStatus,
    /// When the credential was signed.
    pub issuance_date: Timestamp,
    /// Start of validity.
    pub valid_from: Timestamp,
    /// End of validity.
    pub valid_until: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param() -> IssueVcParam {
        let now = Timestamp::now();
        IssueVcParam {
            vc_id: "vc-1".into(),
            vc_plan_id: "plan-id".into(),
            holder: Did::new("did:omn:holder").unwrap(),
            issuer: Did::new("did:omn:issuer").unwrap(),
            types: vec!["VerifiableCredential".into(), "IdentityCredential".into()],
            schema_id: "https://schema.example/id.json".into(),
            claims: vec![Claim {
                code: "name".into(),
                caption: "Name".into(),
                value: "Ada".into(),
                format: None,
            }],
            evidence: vec![],
            valid_from: now,
            valid_until: now.plus_hours(24 * 365),
        }
    }

    #[test]
    fn base_type_is_first_and_not_duplicated() {
        let vc = VerifiableCredential::from_param(&param());
        assert_eq!(vc.types, vec!["VerifiableCredential", "IdentityCredential"]);
        assert_eq!(vc.holder().as_str(), "did:omn:holder");
    }

    #[test]
    fn meta_mirrors_credential() {
        let vc = VerifiableCredential::from_param(&param());
        let meta = vc.to_meta("plan-id");
        assert_eq!(meta.id, "vc-1");
        assert_eq!(meta.status, VcStatus::Active);
        assert_eq!(meta.subject, *vc.holder());
        assert_eq!(serde_json::to_value(meta.status).unwrap(), "ACTIVE");
    }

    #[test]
    fn wire_field_names() {
        let json = serde_json::to_value(VerifiableCredential::from_param(&param())).unwrap();
        assert!(json.get("@context").is_some());
        assert!(json.get("credentialSubject").is_some());
        assert!(json.get("proof").is_none());
        assert!(json.get("evidence").is_none());
    }
}
