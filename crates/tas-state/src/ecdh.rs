//! Persisted outcome of an ECDH handshake.

use tas_core::{Did, TxId};
use tas_crypto::{CipherSuite, SessionKey};

/// Session established for one Transaction. At most one per Transaction;
/// read-only after insertion.
#[derive(Clone)]
pub struct EcdhSession {
    /// Owning Transaction.
    pub tx_id: TxId,
    /// Client that ran the handshake.
    pub client_did: Did,
    /// Multibase `SHA-256(clientNonce ‖ serverNonce)`.
    pub nonce: String,
    /// Derived symmetric key; its length matches `suite.cipher`.
    pub session_key: SessionKey,
    /// Negotiated cipher and padding.
    pub suite: CipherSuite,
}

impl std::fmt::Debug for EcdhSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcdhSession")
            .field("tx_id", &self.tx_id)
            .field("client_did", &self.client_did)
            .field("nonce", &self.nonce)
            .field("suite", &self.suite)
            .finish_non_exhaustive()
    }
}
