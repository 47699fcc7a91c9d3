//! # tas-core — Foundational Types for the Trusted Agent Server
//!
//! Leaf crate of the workspace. Every other `tas-*` crate depends on it;
//! it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** Every signing input and every digest
//!    flows through `CanonicalBytes::new()` (RFC 8785 JCS, floats rejected,
//!    `proofValue` stripped). There is no other way to obtain bytes to sign.
//!
//! 2. **Validated identifier newtypes.** `Did`, `DidKeyUrl` and `TxId` are
//!    checked at construction. No bare strings cross a component boundary.
//!
//! 3. **Self-describing binary.** Keys, signatures, nonces and tokens travel
//!    as multibase strings ([`multibase`]).
//!
//! 4. **One error taxonomy.** [`TasError`] carries a stable code, a message
//!    and a category that fixes the HTTP status class.
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod multibase;
pub mod nonce;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, ErrorCategory, TasError, ValidationError};
pub use identity::{Did, DidKeyUrl, TxId};
pub use multibase::{MultibaseError, MultibaseKind};
pub use nonce::Nonce;
pub use temporal::Timestamp;
