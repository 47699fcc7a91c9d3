//! # tas-vc — Signed Message Types
//!
//! Data model for everything the Trusted Agent signs or verifies:
//!
//! - **Proof envelopes** ([`Proof`]) with the exhaustive proof-type ↔
//!   curve ↔ key-type mapping, plus [`sign()`](proof::sign) and
//!   [`verify()`](proof::verify) over any [`Signed`] message.
//! - **DID documents** ([`DidDocument`]) and purpose-scoped key lookup.
//! - **DID-Auth** ([`DidAuth`]) challenge responses.
//! - **Verifiable credentials** ([`VerifiableCredential`]), the issuer
//!   request ([`IssueVcParam`]) and registry record ([`VcMeta`]).
//! - **Protocol messages** ([`ReqEcdh`], [`AccEcdh`], [`IssueProfile`]) and
//!   **offers** ([`OfferData`]).
//!
//! ## Security Invariants
//!
//! - All proof computation goes through
//!   [`CanonicalBytes::signing_input()`](tas_core::CanonicalBytes::signing_input).
//! - Key lookup honours purpose lists: a key listed only under
//!   `authentication` never verifies an `assertionMethod` proof.

pub mod credential;
pub mod did_auth;
pub mod did_document;
pub mod message;
pub mod offer;
pub mod proof;

pub use credential::{
    Claim, CredentialSchema, CredentialSubject, Evidence, IssueVcParam, VcMeta, VcStatus,
    VerifiableCredential,
};
pub use did_auth::DidAuth;
pub use did_document::{DidDocument, VerificationMethod};
pub use message::{AccEcdh, IssueProfile, ReqEcdh};
pub use offer::{IssueOfferPayload, OfferData, OfferType, PayloadType};
pub use proof::{Proof, ProofError, ProofPurpose, ProofType, Signed, VerificationKeyType};
