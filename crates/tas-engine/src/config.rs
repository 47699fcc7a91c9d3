//! Engine settings and the VC plan catalog.

use serde::{Deserialize, Serialize};

use tas_core::{Did, TasError};
use tas_crypto::{CipherSuite, SymmetricCipher, SymmetricPadding};

/// A credential plan: which issuer issues which credential type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VcPlan {
    /// Plan id.
    pub vc_plan_id: String,
    /// Display name.
    pub name: String,
    /// The only issuer allowed to issue under this plan.
    pub issuer: Did,
    /// Credential types added after `VerifiableCredential`.
    #[serde(default)]
    pub types: Vec<String>,
    /// Credential schema id.
    pub schema_id: String,
    /// Lifetime of issued credentials.
    #[serde(default = "default_vc_validity_hours")]
    pub validity_hours: i64,
}

fn default_vc_validity_hours() -> i64 {
    24 * 365
}

/// Certificate VCs issued by the Trusted Agent at entity enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSettings {
    /// Credential type of the certificate.
    pub credential_type: String,
    /// Schema id of the certificate.
    pub schema_id: String,
    /// Certificate lifetime.
    pub validity_hours: i64,
}

impl Default for CertificateSettings {
    fn default() -> Self {
        Self {
            credential_type: "EntityCertificateCredential".into(),
            schema_id: "tas:schema:entity-certificate".into(),
            validity_hours: 24 * 365,
        }
    }
}

/// Tunables for the protocol engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Lifetime of a Transaction from `begin`.
    pub transaction_ttl_secs: i64,
    /// Lifetime of a server token.
    pub token_ttl_hours: i64,
    /// Lifetime of an issue offer.
    pub offer_validity_secs: i64,
    /// Cipher suites the server accepts, any order.
    pub supported_suites: Vec<CipherSuite>,
    /// VC plan catalog.
    pub vc_plans: Vec<VcPlan>,
    /// Enrollment certificate settings.
    pub certificate: CertificateSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transaction_ttl_secs: 600,
            token_ttl_hours: 1,
            offer_validity_secs: 86_400,
            supported_suites: all_suites(),
            vc_plans: Vec::new(),
            certificate: CertificateSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Plan by id.
    pub fn plan(&self, vc_plan_id: &str) -> Result<&VcPlan, TasError> {
        self.vc_plans
            .iter()
            .find(|p| p.vc_plan_id == vc_plan_id)
            .ok_or_else(|| TasError::VcPlanNotFound(vc_plan_id.to_string()))
    }
}

/// Every cipher/padding combination the crypto layer implements.
pub fn all_suites() -> Vec<CipherSuite> {
    let mut suites = Vec::with_capacity(4);
    for cipher in [SymmetricCipher::Aes256Cbc, SymmetricCipher::Aes128Cbc] {
        for padding in [SymmetricPadding::Pkcs5, SymmetricPadding::NoPad] {
            suites.push(CipherSuite::new(cipher, padding));
        }
    }
    suites
}
