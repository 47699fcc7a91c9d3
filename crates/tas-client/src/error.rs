//! Error types for the collaborator adapters.
//!
//! Each collaborator has its own error enum. All of them convert into
//! [`TasError`] with an External-category code, so the engine can `?`
//! them straight through.

use thiserror::Error;

use tas_core::TasError;

use crate::http::HttpError;

/// DID Registry operation, used to pick the failure code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryOp {
    /// Read a DID document.
    GetDidDocument,
    /// Register a DID document.
    RegisterDidDocument,
    /// Update a DID document.
    UpdateDidDocument,
    /// Register VC metadata.
    RegisterVcMeta,
    /// Read VC metadata.
    GetVcMeta,
    /// Change a VC's status.
    UpdateVcStatus,
}

impl RegistryOp {
    /// Operation name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetDidDocument => "get_did_document",
            Self::RegisterDidDocument => "register_did_document",
            Self::UpdateDidDocument => "update_did_document",
            Self::RegisterVcMeta => "register_vc_meta",
            Self::GetVcMeta => "get_vc_meta",
            Self::UpdateVcStatus => "update_vc_status",
        }
    }
}

impl std::fmt::Display for RegistryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// DID Registry failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Transport or status failure talking to the registry.
    #[error("registry {op} failed: {source}")]
    Http {
        /// Operation.
        op: RegistryOp,
        /// Underlying failure.
        #[source]
        source: HttpError,
    },

    /// The registry rejected the request.
    #[error("registry {op} rejected: {reason}")]
    Rejected {
        /// Operation.
        op: RegistryOp,
        /// Reason given.
        reason: String,
    },
}

impl RegistryError {
    /// Operation that failed.
    pub fn op(&self) -> RegistryOp {
        match self {
            Self::Http { op, .. } | Self::Rejected { op, .. } => *op,
        }
    }
}

impl From<RegistryError> for TasError {
    fn from(err: RegistryError) -> Self {
        let msg = err.to_string();
        match err.op() {
            RegistryOp::GetDidDocument => TasError::BlockchainGetDidDocumentFailed(msg),
            RegistryOp::RegisterDidDocument => TasError::BlockchainRegisterDidDocumentFailed(msg),
            RegistryOp::UpdateDidDocument => TasError::BlockchainUpdateDidDocumentFailed(msg),
            RegistryOp::RegisterVcMeta => TasError::BlockchainRegisterVcMetaFailed(msg),
            RegistryOp::GetVcMeta => TasError::BlockchainGetVcMetaFailed(msg),
            RegistryOp::UpdateVcStatus => TasError::BlockchainUpdateVcStatusFailed(msg),
        }
    }
}

/// Issuer gateway failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IssuerError {
    /// The issuer could not be reached or timed out.
    #[error("issuer {operation} unreachable: {reason}")]
    Communication {
        /// Operation.
        operation: &'static str,
        /// Underlying failure.
        reason: String,
    },

    /// The issuer answered with something unusable.
    #[error("issuer {operation} returned an unexpected response: {reason}")]
    UnknownResponse {
        /// Operation.
        operation: &'static str,
        /// What was wrong.
        reason: String,
    },

    /// No route configured for this issuer.
    #[error("no issuer endpoint configured for {0}")]
    UnknownIssuer(String),
}

impl IssuerError {
    /// Classify a transport failure.
    pub fn from_http(operation: &'static str, err: HttpError) -> Self {
        if err.is_unreachable() {
            Self::Communication {
                operation,
                reason: err.to_string(),
            }
        } else {
            Self::UnknownResponse {
                operation,
                reason: err.to_string(),
            }
        }
    }
}

impl From<IssuerError> for TasError {
    fn from(err: IssuerError) -> Self {
        match err {
            IssuerError::Communication { .. } | IssuerError::UnknownIssuer(_) => {
                TasError::IssuerCommunicationError(err.to_string())
            }
            IssuerError::UnknownResponse { .. } => TasError::IssuerUnknownResponse(err.to_string()),
        }
    }
}

/// Notification failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// Channel not configured.
    #[error("{0} notifications are not configured")]
    NotConfigured(&'static str),

    /// The notifier has been shut down.
    #[error("notifier is shut down")]
    ShutDown,

    /// Delivery failed.
    #[error("notification delivery failed: {0}")]
    Delivery(#[from] HttpError),
}

impl From<NotifyError> for TasError {
    fn from(err: NotifyError) -> Self {
        TasError::NotificationFailed(err.to_string())
    }
}
