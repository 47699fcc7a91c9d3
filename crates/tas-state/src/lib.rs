//! # tas-state — Protocol State
//!
//! Records the Trusted Agent persists for every protocol run and the store
//! interface that holds them.
//!
//! ## Records
//!
//! - **Transaction** (`transaction.rs`): one protocol run with its ordered
//!   SubTransaction steps. Enforces gapless in-order steps, lazy expiry,
//!   write-once challenge nonce and monotonic status.
//!
//! - **ECDH session** (`ecdh.rs`): negotiated cipher and derived session
//!   key, one per Transaction.
//!
//! - **Token** (`token.rs`): purpose-scoped bearer token, one per
//!   (Transaction, purpose), compared in constant time.
//!
//! - **Offer** (`offer.rs`): redeemable issue/restore offer.
//!
//! - **Entity** (`entity.rs`): partner entity and its enrollment status.
//!
//! ## Store
//!
//! [`EntityStore`] is the persistence seam. [`MemoryStore`] implements it
//! with a single `parking_lot` lock, which is what makes step advancement
//! for one Transaction serializable.

pub mod ecdh;
pub mod entity;
pub mod offer;
pub mod store;
pub mod token;
pub mod transaction;

pub use ecdh::EcdhSession;
pub use entity::{EntityError, EntityRecord, EntityRole, EntityStatus};
pub use offer::{DidOffer, OfferError};
pub use store::{EntityMutation, EntityStore, MemoryStore, StoreError, TransactionMutation};
pub use token::{TokenPurpose, TokenRecord};
pub use transaction::{
    SubTransaction, SubTransactionStatus, SubTransactionType, Transaction, TransactionError,
    TransactionStatus, TransactionType,
};
