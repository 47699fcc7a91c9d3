//! Verification of third-party proofs against the DID Registry.
//!
//! The checks run cheapest first: proof present, purpose allowed,
//! verification method controlled by the expected DID. Only then is the
//! registry consulted and the signature checked.

use tas_client::DidRegistry;
use tas_core::{Did, DidKeyUrl, TasError};
use tas_vc::proof::verify;
use tas_vc::{Proof, ProofPurpose, Signed};

use crate::resolver::resolve_public_key;

/// `verificationMethod` must be a key of `did`.
pub fn ensure_controller(verification_method: &DidKeyUrl, did: &Did) -> Result<(), TasError> {
    if verification_method.did() != did {
        return Err(TasError::InvalidDidKeyUrl(format!(
            "{verification_method} is not a key of {did}"
        )));
    }
    Ok(())
}

/// `proof.proofPurpose` must be one of `allowed`.
pub fn ensure_purpose(proof: &Proof, allowed: &[ProofPurpose]) -> Result<(), TasError> {
    if allowed.contains(&proof.proof_purpose) {
        return Ok(());
    }
    let expected = allowed
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join("|");
    Err(TasError::InvalidProofPurpose {
        expected,
        actual: proof.proof_purpose.as_str().to_string(),
    })
}

/// Verify `message`'s proof: purpose in `allowed`, signed by a key of
/// `signer` listed for that purpose.
pub fn verify_proof<'a, T: Signed>(
    registry: &dyn DidRegistry,
    message: &'a T,
    allowed: &[ProofPurpose],
    signer: &Did,
) -> Result<&'a Proof, TasError> {
    let proof = message
        .proof()
        .ok_or_else(|| TasError::SignatureVerificationFailed("message carries no proof".into()))?;
    ensure_purpose(proof, allowed)?;
    ensure_controller(&proof.verification_method, signer)?;
    let key = resolve_public_key(registry, &proof.verification_method, proof.proof_purpose)?;
    verify(message, &key)?;
    tracing::debug!(signer = %signer, purpose = %proof.proof_purpose, "proof verified");
    Ok(proof)
}
