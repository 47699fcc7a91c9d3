//! # ECDH Session Establishment
//!
//! ```text
//! client                                   TA
//!   │  ReqEcdh{client, clientNonce, curve,   │
//!   │          publicKey, candidate, proof}  │
//!   │ ─────────────────────────────────────▶ │ verify proof (client's DID)
//!   │                                        │ negotiate cipher (client order)
//!   │                                        │ ephemeral key + shared secret
//!   │                                        │ sessionKey = SHA-256(cN ‖ sN ‖ Z)[..keyLen]
//!   │                                        │ sign AccEcdh
//!   │                                        │ insert Ecdh row (once per Transaction)
//!   │  AccEcdh{server, serverNonce,          │
//!   │          publicKey, cipher, padding,   │
//!   │          proof(keyAgreement)}          │
//!   │ ◀───────────────────────────────────── │
//! ```
//!
//! The raw nonces are not stored; the row keeps `SHA-256(cN ‖ sN)` so the
//! session can be correlated without retaining key material inputs.

use tas_client::DidRegistry;
use tas_core::{multibase, TasError, TxId};
use tas_crypto::cipher::negotiate;
use tas_crypto::random::random_nonce;
use tas_crypto::session::merged_nonce_digest;
use tas_crypto::{derive_session_key, CipherSuite, EcPublicKey, EphemeralKeyPair};
use tas_state::{EcdhSession, EntityStore};
use tas_vc::{AccEcdh, ProofPurpose, ReqEcdh};

use crate::identity::TaIdentity;
use crate::proof::verify_proof;

/// Everything the handshake reads or writes.
pub struct EcdhEstablisher<'a> {
    /// Resolves the client's proof key.
    pub registry: &'a dyn DidRegistry,
    /// Signs the answer.
    pub identity: &'a TaIdentity,
    /// Receives the session row.
    pub store: &'a dyn EntityStore,
    /// Suites the server accepts.
    pub supported: &'a [CipherSuite],
}

impl EcdhEstablisher<'_> {
    /// Run the handshake for `tx_id`. The client proof must carry one of
    /// `client_purposes`.
    pub fn establish(
        &self,
        tx_id: TxId,
        req: &ReqEcdh,
        client_purposes: &[ProofPurpose],
    ) -> Result<(AccEcdh, EcdhSession), TasError> {
        verify_proof(self.registry, req, client_purposes, &req.client)?;

        if req.client_nonce.as_bytes().is_empty() {
            return Err(TasError::InvalidRequest("clientNonce is empty".into()));
        }
        let client_key = EcPublicKey::from_multibase(req.curve, &req.public_key)
            .map_err(|e| TasError::KeyAgreementFailed(e.to_string()))?;
        let suite = negotiate(&req.candidate, self.supported)?;

        let ephemeral = EphemeralKeyPair::generate(req.curve);
        let shared = ephemeral.agree(&client_key)?;
        let server_nonce = random_nonce();
        let session_key = derive_session_key(
            req.client_nonce.as_bytes(),
            server_nonce.as_bytes(),
            &shared,
            suite.cipher,
        );

        let session = EcdhSession {
            tx_id,
            client_did: req.client.clone(),
            nonce: multibase::encode(&merged_nonce_digest(
                req.client_nonce.as_bytes(),
                server_nonce.as_bytes(),
            )),
            session_key,
            suite,
        };
        let mut acc = AccEcdh {
            server: self.identity.did().clone(),
            server_nonce,
            public_key: ephemeral.public_key().to_multibase(),
            cipher: suite.cipher,
            padding: suite.padding,
            proof: None,
        };
        self.identity.sign(&mut acc, ProofPurpose::KeyAgreement)?;

        // Last fallible step: the row is written once per Transaction.
        self.store.insert_ecdh(session.clone())?;
        tracing::info!(tx_id = %tx_id, client = %req.client, suite = %suite, "ECDH session established");
        Ok((acc, session))
    }
}
