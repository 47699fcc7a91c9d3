//! # tas-client — Collaborator Adapters
//!
//! The Trusted Agent talks to three outside systems. Each is a synchronous
//! trait with an in-memory implementation (tests, single-node demos) and an
//! HTTP implementation built on `reqwest`:
//!
//! - **DID Registry** ([`DidRegistry`]): DID documents and VC metadata.
//! - **Issuer gateway** ([`IssuerGateway`]): issue profiles, claims,
//!   credential signing and revocation.
//! - **Notifier** ([`Notifier`]): offer delivery by push or email.
//!
//! ## Crate Policy
//!
//! - Traits are synchronous. HTTP adapters bridge to async `reqwest` with
//!   `Handle::block_on` and must run on the blocking pool.
//! - Every failure converts into an External-category
//!   [`TasError`](tas_core::TasError); nothing is retried here.

pub mod error;
pub mod http;
pub mod issuer;
pub mod notifier;
pub mod registry;

// ─── Error re-exports ───────────────────────────────────────────────

pub use error::{IssuerError, NotifyError, RegistryError, RegistryOp};
pub use http::{HttpClient, HttpError};

// ─── Collaborator re-exports ────────────────────────────────────────

pub use issuer::{ClaimSet, HttpIssuerGateway, IssuerGateway, MemoryIssuer, PlanProfile};
pub use notifier::{Delivery, HttpNotifier, LoggingNotifier, Notifier, NotifierContext};
pub use registry::{DidRegistry, HttpDidRegistry, MemoryDidRegistry};
