//! # Server Configuration
//!
//! [`TasConfig`] is read from the YAML file named by `TAS_CONFIG`, then
//! overridden from the environment:
//!
//! | Variable           | Field                |
//! |--------------------|----------------------|
//! | `TAS_PORT`, `PORT` | `server.port`        |
//! | `TAS_REGISTRY_URL` | `registry.url`       |
//! | `TAS_NOTIFIER_URL` | `notifier.pushUrl`   |
//!
//! Without `TAS_CONFIG` the defaults apply: port 8080, an ephemeral TA
//! identity and in-memory collaborators.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use tas_core::Did;
use tas_crypto::{CipherSuite, EccCurve, SigningKeyPair};
use tas_engine::{all_suites, CertificateSettings, EngineConfig, TaIdentity, VcPlan};
use tas_state::EntityRecord;
use tas_vc::ProofPurpose;

/// Errors while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for [`TasConfig`].
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A field holds an unusable value.
    #[error("invalid {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    fn invalid(field: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}

/// Root of the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TasConfig {
    pub server: ServerSection,
    pub ta: TaSection,
    pub transaction: TransactionSection,
    pub token: TokenSection,
    pub ecdh: EcdhSection,
    pub offer: OfferSection,
    pub certificate: CertificateSettings,
    pub vc_plans: Vec<VcPlan>,
    pub entities: Vec<EntityRecord>,
    pub registry: RegistrySection,
    pub notifier: NotifierSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSection {
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Trusted Agent identity. An empty key list means ephemeral keys.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaSection {
    pub did: String,
    pub keys: Vec<TaKeyConfig>,
}

impl Default for TaSection {
    fn default() -> Self {
        Self {
            did: "did:omn:tas".into(),
            keys: Vec::new(),
        }
    }
}

/// One TA signing key.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaKeyConfig {
    pub id: String,
    pub purposes: Vec<ProofPurpose>,
    pub curve: EccCurve,
    pub secret_multibase: String,
}

impl std::fmt::Debug for TaKeyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaKeyConfig")
            .field("id", &self.id)
            .field("purposes", &self.purposes)
            .field("curve", &self.curve)
            .field("secret_multibase", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionSection {
    pub ttl_seconds: i64,
}

impl Default for TransactionSection {
    fn default() -> Self {
        Self { ttl_seconds: 600 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenSection {
    pub ttl_hours: i64,
}

impl Default for TokenSection {
    fn default() -> Self {
        Self { ttl_hours: 1 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EcdhSection {
    pub supported: Vec<CipherSuite>,
}

impl Default for EcdhSection {
    fn default() -> Self {
        Self {
            supported: all_suites(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OfferSection {
    pub validity_seconds: i64,
}

impl Default for OfferSection {
    fn default() -> Self {
        Self {
            validity_seconds: 86_400,
        }
    }
}

/// DID registry endpoint. Without a URL an in-memory registry is used.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrySection {
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 10,
        }
    }
}

/// Notification gateways. Without either URL deliveries are only logged.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotifierSection {
    pub push_url: Option<String>,
    pub email_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for NotifierSection {
    fn default() -> Self {
        Self {
            push_url: None,
            email_url: None,
            timeout_secs: 10,
        }
    }
}

impl TasConfig {
    /// Load from `TAS_CONFIG` (if set) and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os("TAS_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from `lookup`, which maps a variable name to its
    /// value.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(port) = lookup("TAS_PORT").or_else(|| lookup("PORT")) {
            self.server.port = port
                .parse()
                .map_err(|e| ConfigError::invalid("server.port", format!("{port:?}: {e}")))?;
        }
        if let Some(url) = lookup("TAS_REGISTRY_URL") {
            self.registry.url = Some(url);
        }
        if let Some(url) = lookup("TAS_NOTIFIER_URL") {
            self.notifier.push_url = Some(url);
        }
        Ok(())
    }

    /// Engine tunables from the file sections.
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        if self.transaction.ttl_seconds <= 0 {
            return Err(ConfigError::invalid("transaction.ttlSeconds", "must be positive"));
        }
        if self.token.ttl_hours <= 0 {
            return Err(ConfigError::invalid("token.ttlHours", "must be positive"));
        }
        if self.ecdh.supported.is_empty() {
            return Err(ConfigError::invalid("ecdh.supported", "no cipher suites"));
        }
        Ok(EngineConfig {
            transaction_ttl_secs: self.transaction.ttl_seconds,
            token_ttl_hours: self.token.ttl_hours,
            offer_validity_secs: self.offer.validity_seconds,
            supported_suites: self.ecdh.supported.clone(),
            vc_plans: self.vc_plans.clone(),
            certificate: self.certificate.clone(),
        })
    }

    /// Build the TA identity. Returns whether the keys are ephemeral.
    pub fn identity(&self) -> Result<(TaIdentity, bool), ConfigError> {
        let did = Did::new(self.ta.did.clone()).map_err(|e| ConfigError::invalid("ta.did", e))?;
        if self.ta.keys.is_empty() {
            return Ok((TaIdentity::generate(did, EccCurve::Secp256r1), true));
        }
        let mut identity = TaIdentity::new(did);
        for key in &self.ta.keys {
            let field = format!("ta.keys[{}]", key.id);
            if key.purposes.is_empty() {
                return Err(ConfigError::invalid(field, "no purposes"));
            }
            let pair = SigningKeyPair::from_multibase(key.curve, &key.secret_multibase)
                .map_err(|e| ConfigError::invalid(field, e))?;
            identity = identity.with_key(key.id.clone(), pair, &key.purposes);
        }
        Ok((identity, false))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;
    use tas_crypto::{SymmetricCipher, SymmetricPadding};

    fn write_yaml(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_a_full_file() {
        let secret = tas_core::multibase::encode(&[7u8; 32]);
        let file = write_yaml(&format!(
            r#"
server:
  port: 9090
ta:
  did: did:omn:tas
  keys:
    - id: assert-1
      purposes: [assertionMethod, keyAgreement]
      curve: Secp256r1
      secretMultibase: {secret}
transaction:
  ttlSeconds: 300
ecdh:
  supported:
    - cipher: AES-128-CBC
      padding: NOPAD
vcPlans:
  - vcPlanId: plan-1
    name: Identity
    issuer: did:omn:issuer
    schemaId: https://schema.example/identity
entities:
  - did: did:omn:issuer
    name: Acme
    role: ISSUER
    serverUrl: http://issuer.local
registry:
  url: http://registry.local
"#
        ));
        let config = TasConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.token.ttl_hours, 1);
        assert_eq!(config.entities.len(), 1);

        let engine = config.engine_config().unwrap();
        assert_eq!(engine.transaction_ttl_secs, 300);
        assert_eq!(
            engine.supported_suites,
            vec![CipherSuite::new(SymmetricCipher::Aes128Cbc, SymmetricPadding::NoPad)]
        );

        let (identity, ephemeral) = config.identity().unwrap();
        assert!(!ephemeral);
        assert_eq!(
            identity.verification_method(ProofPurpose::KeyAgreement).unwrap().key_id(),
            "assert-1"
        );
        assert!(identity.verification_method(ProofPurpose::Authentication).is_err());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = TasConfig::from_file(Path::new("/nonexistent/tas.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn bad_yaml_is_a_parse_error() {
        let file = write_yaml("server: [not, a, map]\n");
        let err = TasConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn env_overrides_win() {
        let vars: HashMap<&str, &str> = [
            ("PORT", "7000"),
            ("TAS_REGISTRY_URL", "http://registry:9000"),
            ("TAS_NOTIFIER_URL", "http://push:9100"),
        ]
        .into_iter()
        .collect();
        let mut config = TasConfig::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.registry.url.as_deref(), Some("http://registry:9000"));
        assert_eq!(config.notifier.push_url.as_deref(), Some("http://push:9100"));

        let err = config
            .apply_overrides(|k| (k == "TAS_PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("server.port"));
    }

    #[test]
    fn defaults_use_ephemeral_keys() {
        let config = TasConfig::default();
        let (identity, ephemeral) = config.identity().unwrap();
        assert!(ephemeral);
        assert!(identity.verification_method(ProofPurpose::AssertionMethod).is_ok());
        assert_eq!(config.engine_config().unwrap().supported_suites.len(), 4);
    }

    #[test]
    fn debug_redacts_secrets() {
        let key = TaKeyConfig {
            id: "k".into(),
            purposes: vec![ProofPurpose::AssertionMethod],
            curve: EccCurve::Secp256k1,
            secret_multibase: "zSuperSecret".into(),
        };
        let rendered = format!("{key:?}");
        assert!(!rendered.contains("zSuperSecret"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let mut config = TasConfig::default();
        config.transaction.ttl_seconds = 0;
        assert!(matches!(
            config.engine_config().unwrap_err(),
            ConfigError::Invalid { .. }
        ));
    }
}
