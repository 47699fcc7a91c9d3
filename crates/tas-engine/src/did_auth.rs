//! # DID-Auth Verification
//!
//! A holder proves control of a DID by signing the Transaction's
//! challenge nonce with an `authentication` key.
//!
//! Order of checks:
//!
//! 1. `verificationMethod` belongs to `did`.
//! 2. `proofPurpose` is `authentication`.
//! 3. `authNonce` equals the Transaction's challenge (constant time).
//! 4. Key resolution and signature verification.
//!
//! The nonce check runs before any registry or signature work so a
//! replayed or foreign answer costs nothing. Verification never mutates
//! the Transaction.

use tas_client::DidRegistry;
use tas_core::TasError;
use tas_state::Transaction;
use tas_vc::{DidAuth, ProofPurpose};

use crate::proof::{ensure_controller, ensure_purpose, verify_proof};

/// Verify `auth` as the answer to `tx`'s challenge.
pub fn verify_did_auth(registry: &dyn DidRegistry, auth: &DidAuth, tx: &Transaction) -> Result<(), TasError> {
    ensure_controller(&auth.proof.verification_method, &auth.did)?;
    ensure_purpose(&auth.proof, &[ProofPurpose::Authentication])?;

    let matches = tx
        .auth_nonce
        .as_ref()
        .is_some_and(|challenge| challenge.ct_matches(&auth.auth_nonce));
    if !matches {
        tracing::warn!(tx_id = %tx.tx_id, did = %auth.did, "DID-Auth nonce mismatch");
        return Err(TasError::AuthNonceMismatch {
            tx_id: tx.tx_id.to_string(),
        });
    }

    verify_proof(registry, auth, &[ProofPurpose::Authentication], &auth.did)?;
    tracing::info!(tx_id = %tx.tx_id, did = %auth.did, "DID-Auth verified");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tas_client::MemoryDidRegistry;
    use tas_core::{Did, DidKeyUrl, Nonce, Timestamp};
    use tas_crypto::{EccCurve, SigningKeyPair};
    use tas_state::TransactionType;
    use tas_vc::proof::sign;
    use tas_vc::{DidDocument, Proof, ProofType};

    struct Holder {
        did: Did,
        key: SigningKeyPair,
    }

    impl Holder {
        fn new(reg: &MemoryDidRegistry) -> Self {
            let did = Did::new("did:omn:holder").unwrap();
            let key = SigningKeyPair::generate(EccCurve::Secp256k1);
            reg.seed_document(DidDocument::new(did.clone()).with_key(
                "auth",
                &key.public_key(),
                &[ProofPurpose::Authentication],
            ));
            Self { did, key }
        }

        fn answer(&self, nonce: &Nonce, purpose: ProofPurpose) -> DidAuth {
            let vm = DidKeyUrl::from_parts(&self.did, "auth").unwrap();
            let mut auth = DidAuth {
                did: self.did.clone(),
                auth_nonce: nonce.clone(),
                proof: Proof::unsigned(ProofType::Secp256k1Signature2018, vm.clone(), purpose),
            };
            sign(&mut auth, &self.key, vm, purpose).unwrap();
            auth
        }
    }

    fn challenged_tx() -> (Transaction, Nonce) {
        let mut tx = Transaction::new(TransactionType::RevokeVc, Timestamp::now(), 600);
        let nonce = Nonce::from_bytes(vec![9u8; 16]);
        tx.set_auth_nonce(nonce.clone()).unwrap();
        (tx, nonce)
    }

    #[test]
    fn valid_answer_verifies() {
        let reg = MemoryDidRegistry::new();
        let holder = Holder::new(&reg);
        let (tx, nonce) = challenged_tx();
        verify_did_auth(&reg, &holder.answer(&nonce, ProofPurpose::Authentication), &tx).unwrap();
    }

    #[test]
    fn nonce_mismatch_precedes_signature_checks() {
        let reg = MemoryDidRegistry::new();
        let holder = Holder::new(&reg);
        let (tx, _) = challenged_tx();
        let mut auth = holder.answer(&Nonce::from_bytes(vec![1u8; 16]), ProofPurpose::Authentication);
        // Corrupt the signature too: the nonce check must still win.
        auth.proof.proof_value = Some("zinvalid".into());
        assert_eq!(verify_did_auth(&reg, &auth, &tx).unwrap_err().code(), "AUTH_NONCE_MISMATCH");
    }

    #[test]
    fn missing_challenge_is_a_mismatch() {
        let reg = MemoryDidRegistry::new();
        let holder = Holder::new(&reg);
        let tx = Transaction::new(TransactionType::RevokeVc, Timestamp::now(), 600);
        let auth = holder.answer(&Nonce::from_bytes(vec![9u8; 16]), ProofPurpose::Authentication);
        assert_eq!(verify_did_auth(&reg, &auth, &tx).unwrap_err().code(), "AUTH_NONCE_MISMATCH");
    }

    #[test]
    fn assertion_purpose_is_rejected() {
        let reg = MemoryDidRegistry::new();
        let holder = Holder::new(&reg);
        let (tx, nonce) = challenged_tx();
        let auth = holder.answer(&nonce, ProofPurpose::AssertionMethod);
        assert_eq!(verify_did_auth(&reg, &auth, &tx).unwrap_err().code(), "INVALID_PROOF_PURPOSE");
    }

    #[test]
    fn did_must_control_the_key() {
        let reg = MemoryDidRegistry::new();
        let holder = Holder::new(&reg);
        let (tx, nonce) = challenged_tx();
        let mut auth = holder.answer(&nonce, ProofPurpose::Authentication);
        auth.did = Did::new("did:omn:impostor").unwrap();
        assert_eq!(verify_did_auth(&reg, &auth, &tx).unwrap_err().code(), "INVALID_DID_KEY_URL");
    }
}
