//! # Key Generation
//!
//! Writes `<prefix>.key` (multibase secret scalar) and `<prefix>.pub`
//! (multibase compressed public key). The secret file is the format
//! `ta.keys[].secretMultibase` expects.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use tas_core::multibase;
use tas_crypto::{EccCurve, EcPublicKey, SigningKeyPair};

/// Paths and public key of a generated pair.
#[derive(Debug)]
pub struct GeneratedKey {
    pub secret_path: PathBuf,
    pub public_path: PathBuf,
    pub public_multibase: String,
}

/// Generate a key pair on `curve` into `output_dir`.
pub fn keygen(curve: EccCurve, output_dir: &Path, prefix: &str) -> Result<GeneratedKey> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output directory: {}", output_dir.display()))?;

    let key = SigningKeyPair::generate(curve);
    let secret = multibase::encode(&key.secret_bytes());
    let public_multibase = key.public_key().to_multibase();

    let secret_path = output_dir.join(format!("{prefix}.key"));
    let public_path = output_dir.join(format!("{prefix}.pub"));
    std::fs::write(&secret_path, &secret)
        .with_context(|| format!("failed to write private key: {}", secret_path.display()))?;
    std::fs::write(&public_path, &public_multibase)
        .with_context(|| format!("failed to write public key: {}", public_path.display()))?;

    tracing::debug!(curve = curve.as_str(), path = %public_path.display(), "key pair written");
    Ok(GeneratedKey {
        secret_path,
        public_path,
        public_multibase,
    })
}

/// Load a secret key file written by [`keygen`].
pub fn load_secret(path: &Path, curve: EccCurve) -> Result<SigningKeyPair> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read private key: {}", path.display()))?;
    SigningKeyPair::from_multibase(curve, text.trim()).context("invalid private key")
}

/// Parse a public key given inline or as a path to a `.pub` file.
pub fn load_public(value: &str, curve: EccCurve) -> Result<EcPublicKey> {
    let path = Path::new(value);
    let text = if path.is_file() {
        std::fs::read_to_string(path).with_context(|| format!("failed to read public key: {}", path.display()))?
    } else {
        value.to_string()
    };
    EcPublicKey::from_multibase(curve, text.trim()).context("invalid public key")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_files_load_back() {
        let dir = tempfile::tempdir().unwrap();
        for curve in [EccCurve::Secp256k1, EccCurve::Secp256r1] {
            let generated = keygen(curve, dir.path(), curve.as_str()).unwrap();
            let secret = load_secret(&generated.secret_path, curve).unwrap();
            assert_eq!(secret.public_key().to_multibase(), generated.public_multibase);

            let from_file = load_public(generated.public_path.to_str().unwrap(), curve).unwrap();
            let inline = load_public(&generated.public_multibase, curve).unwrap();
            assert_eq!(from_file.to_multibase(), inline.to_multibase());
        }
    }

    #[test]
    fn malformed_secret_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.key");
        std::fs::write(&path, "not-multibase").unwrap();
        assert!(load_secret(&path, EccCurve::Secp256k1).is_err());
    }
}
