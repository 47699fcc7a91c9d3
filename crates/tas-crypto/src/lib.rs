//! # tas-crypto — Cryptographic Primitives
//!
//! Building blocks for the Trusted Agent protocol:
//!
//! - **ECDSA** over secp256k1 and secp256r1 for proof signatures
//!   ([`ecdsa`]). Signing input is a SHA-256 digest of canonical bytes.
//! - **ECDH** ephemeral key agreement ([`ecdh`]) and the session key
//!   derivation that turns a shared secret plus both nonces into a symmetric
//!   key ([`session`]).
//! - **AES-CBC** payload encryption with negotiated cipher and padding
//!   ([`cipher`]).
//! - CSPRNG helpers for nonces and tokens ([`random`]).
//!
//! ## Crate Policy
//!
//! - Depends only on `tas-core` internally.
//! - Secret material (signing keys, shared secrets, session keys) is wrapped
//!   in `Zeroizing` and never appears in `Debug` output.
//! - Verification fails closed: malformed keys or signatures return `false`,
//!   never panic.
//! - No mocking of cryptographic operations in tests.

pub mod cipher;
pub mod curve;
pub mod ecdh;
pub mod ecdsa;
pub mod error;
pub mod random;
pub mod session;

pub use cipher::{CipherCandidate, CipherSuite, EncryptedPayload, SymmetricCipher, SymmetricPadding};
pub use curve::EccCurve;
pub use ecdh::{EphemeralKeyPair, SharedSecret};
pub use ecdsa::{verify_digest, EcPublicKey, EcSignature, SigningKeyPair};
pub use error::CryptoError;
pub use session::{derive_session_key, SessionKey};
