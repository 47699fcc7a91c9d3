//! # DID Resolver Facade
//!
//! Turns a DID or a DID-key-URL into a document or a public key via the
//! DID Registry. Nothing is cached: every request sees the registry's
//! current state, so a key removed from a document stops verifying
//! immediately.

use tas_client::DidRegistry;
use tas_core::{Did, DidKeyUrl, TasError};
use tas_crypto::EcPublicKey;
use tas_vc::{DidDocument, ProofPurpose};

/// Current, non-deactivated document for `did`.
pub fn resolve_document(registry: &dyn DidRegistry, did: &Did) -> Result<DidDocument, TasError> {
    let doc = registry
        .get_did_document(did)?
        .ok_or_else(|| TasError::DidDocumentNotFound(did.to_string()))?;
    if doc.deactivated {
        return Err(TasError::DidDocumentDeactivated(did.to_string()));
    }
    Ok(doc)
}

/// Public key named by `url`, provided it is listed for `purpose`.
///
/// A `versionId` in the URL must name the document's current version.
pub fn resolve_public_key(
    registry: &dyn DidRegistry,
    url: &DidKeyUrl,
    purpose: ProofPurpose,
) -> Result<EcPublicKey, TasError> {
    let doc = resolve_document(registry, url.did())?;
    if let Some(version) = url.version_id() {
        if version != doc.version_id {
            return Err(TasError::InvalidSignature(format!(
                "{url} names version {version}, current version is {}",
                doc.version_id
            )));
        }
    }
    let vm = doc
        .key_for(url.key_id(), purpose)
        .ok_or_else(|| TasError::InvalidSignature(format!("{url} is not listed for {purpose}")))?;
    Ok(vm.public_key()?)
}

/// [`resolve_public_key`] for an unparsed URL. Malformed URLs are
/// `InvalidSignature`.
pub fn resolve_public_key_str(
    registry: &dyn DidRegistry,
    url: &str,
    purpose: ProofPurpose,
) -> Result<EcPublicKey, TasError> {
    let url = DidKeyUrl::parse(url).map_err(|e| TasError::InvalidSignature(e.to_string()))?;
    resolve_public_key(registry, &url, purpose)
}
