//! # Partner Entities
//!
//! Issuers, verifiers and providers known to the Trusted Agent. An entity
//! must be ENROLLED (hold a certificate VC) before it can issue.
//!
//! ```text
//! NEEDS_ENROLLMENT ──▶ ENROLLED ──▶ DEACTIVATED
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tas_core::{Did, TasError};

/// Role of a partner entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityRole {
    /// Issues credentials.
    Issuer,
    /// Verifies presentations.
    Verifier,
    /// Runs wallets.
    WalletProvider,
    /// Runs holder apps.
    AppProvider,
    /// Anything else.
    Etc,
}

impl EntityRole {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issuer => "ISSUER",
            Self::Verifier => "VERIFIER",
            Self::WalletProvider => "WALLET_PROVIDER",
            Self::AppProvider => "APP_PROVIDER",
            Self::Etc => "ETC",
        }
    }
}

/// Enrollment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityStatus {
    /// Registered but not yet certified.
    NeedsEnrollment,
    /// Holds a certificate VC.
    Enrolled,
    /// Removed from service.
    Deactivated,
}

/// A partner entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    /// Entity DID.
    pub did: Did,
    /// Display name.
    pub name: String,
    /// Role.
    pub role: EntityRole,
    /// Base URL of the entity's server.
    #[serde(default)]
    pub server_url: Option<String>,
    /// Enrollment status.
    #[serde(default = "default_status")]
    pub status: EntityStatus,
    /// Certificate VC issued at enrollment.
    #[serde(default)]
    pub certificate_vc_id: Option<String>,
}

fn default_status() -> EntityStatus {
    EntityStatus::NeedsEnrollment
}

/// Rejected entity transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntityError {
    /// Enrollment attempted on an already-enrolled entity.
    #[error("entity {did} already enrolled")]
    AlreadyEnrolled {
        /// Entity DID.
        did: Did,
    },

    /// Entity is deactivated.
    #[error("entity {did} is deactivated")]
    Deactivated {
        /// Entity DID.
        did: Did,
    },
}

impl From<EntityError> for TasError {
    fn from(err: EntityError) -> Self {
        match err {
            EntityError::AlreadyEnrolled { did } => TasError::EntityAlreadyEnrolled(did.to_string()),
            EntityError::Deactivated { did } => TasError::EntityNotEnrolled(did.to_string()),
        }
    }
}

impl EntityRecord {
    /// Whether the entity may act (issue, verify).
    pub fn is_enrolled(&self) -> bool {
        self.status == EntityStatus::Enrolled
    }

    /// Check that enrollment may start.
    pub fn ensure_enrollable(&self) -> Result<(), EntityError> {
        match self.status {
            EntityStatus::NeedsEnrollment => Ok(()),
            EntityStatus::Enrolled => Err(EntityError::AlreadyEnrolled { did: self.did.clone() }),
            EntityStatus::Deactivated => Err(EntityError::Deactivated { did: self.did.clone() }),
        }
    }

    /// NEEDS_ENROLLMENT → ENROLLED with the certificate VC id.
    pub fn mark_enrolled(&mut self, certificate_vc_id: String) -> Result<(), EntityError> {
        self.ensure_enrollable()?;
        self.status = EntityStatus::Enrolled;
        self.certificate_vc_id = Some(certificate_vc_id);
        Ok(())
    }
}
