//! # tas-cli — Trusted Agent Command-Line Interface
//!
//! Offline tooling for operators and wallet developers.
//!
//! ## Subcommands
//!
//! - `keygen`: ECDSA key pair on secp256k1 or P-256
//! - `canonicalize`: canonical JSON of a document
//! - `sign`: attach a proof to a JSON document
//! - `verify`: check a document's proof against a public key
//!
//! ## Crate Policy
//!
//! - Argument parsing lives in `main.rs`; handlers here take plain values.
//! - Signing input is always the canonical form with `proofValue` cleared,
//!   exactly as the server computes it.

pub mod document;
pub mod keys;
