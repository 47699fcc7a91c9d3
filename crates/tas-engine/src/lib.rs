//! # tas-engine — Protocol Engine
//!
//! Everything between an HTTP request and the collaborators: proof and
//! DID-Auth verification against the DID Registry, the ECDH handshake,
//! server tokens, Transaction bookkeeping and the VC workflows.
//!
//! ## Components
//!
//! - **Proof verification** (`proof.rs`, `resolver.rs`): purpose and
//!   controller checks, then key resolution and signature verification.
//! - **DID-Auth** (`did_auth.rs`): challenge-nonce answer verification.
//! - **ECDH** (`ecdh.rs`): session establishment and key derivation.
//! - **Transactions** (`transaction.rs`): begin/advance/complete with lazy
//!   expiry over the store's atomic modify.
//! - **Tokens** (`token.rs`): purpose-scoped server tokens.
//! - **Workflows** (`workflow/`): issue, revoke, enrollment, offers.
//!
//! ## Security Invariants
//!
//! - No step is recorded before the caller's token, proof or DID-Auth has
//!   been verified.
//! - A nonce mismatch is reported before any signature work.
//! - An error after a PENDING claim always leaves the Transaction FAILED.
//! - Session keys, tokens and private keys never appear in logs.

pub mod config;
pub mod did_auth;
pub mod ecdh;
pub mod engine;
pub mod identity;
pub mod proof;
pub mod resolver;
pub mod token;
pub mod transaction;
pub mod workflow;

// ─── Engine re-exports ──────────────────────────────────────────────

pub use config::{all_suites, CertificateSettings, EngineConfig, VcPlan};
pub use engine::TasEngine;
pub use identity::TaIdentity;
pub use token::TokenService;
pub use transaction::{TransactionManager, TransactionView};

// ─── Workflow re-exports ────────────────────────────────────────────

pub use workflow::enroll::{
    ConfirmEnrollEntityRequest, ProposeEnrollEntityReply, ProposeEnrollEntityRequest, RequestEcdhReply,
    RequestEcdhRequest, RequestEnrollEntityRequest, CERTIFICATE_PLAN_ID,
};
pub use workflow::issue::{
    ConfirmIssueVcRequest, IssueProfileReply, ProfileEnvelope, ProposeIssueVcRequest, RequestIssueProfileRequest,
    RequestIssueVcRequest,
};
pub use workflow::offer::{IssueOfferReply, OfferTarget, RegisterPushTokenRequest, RequestIssueOfferRequest};
pub use workflow::revoke::{
    ConfirmRevokeVcRequest, ProposeRevokeVcReply, ProposeRevokeVcRequest, RequestRevokeVcRequest,
};
pub use workflow::{SealedVcReply, TxReply};
