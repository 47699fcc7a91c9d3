//! # Error Types — Tagged Error Taxonomy
//!
//! [`TasError`] is the single error every protocol operation returns. Each
//! variant carries:
//!
//! - a stable machine-readable code ([`TasError::code()`]), sent on the wire;
//! - a human-readable message (`Display`);
//! - a category ([`TasError::category()`]) that fixes the HTTP status class.
//!
//! Lower layers keep their own `thiserror` enums (`CryptoError`,
//! `TransactionError`, `RegistryError`, ...) and convert into `TasError` at
//! their component boundary. Conversions pick the most specific code and
//! never move an error into a different category.
//!
//! ## Security Invariant
//!
//! `Unknown` messages are for operators only. The API layer replaces them
//! with a generic description before anything reaches the wire.

use thiserror::Error;

/// Coarse classification of a [`TasError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed request, missing field, invalid enum value.
    Validation,
    /// Bad signature, bad proof purpose, nonce mismatch, decoding failure.
    Crypto,
    /// Not found, already exists, expired, wrong lifecycle state.
    State,
    /// Registry, issuer, notifier or store unreachable or misbehaving.
    External,
    /// Anything not classified above.
    Unknown,
}

impl ErrorCategory {
    /// Returns the category name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Crypto => "crypto",
            Self::State => "state",
            Self::External => "external",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain error for every Trusted Agent operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TasError {
    // ── Validation ──────────────────────────────────────────────────
    /// Request body is missing a field or carries an invalid value.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A DID failed syntax validation.
    #[error("invalid DID: {0}")]
    InvalidDid(String),

    /// A DID-key-URL failed syntax validation.
    #[error("invalid DID key URL: {0}")]
    InvalidDidKeyUrl(String),

    /// An enumerated value is not recognized.
    #[error("invalid value {value:?} for {field}")]
    InvalidEnum {
        /// Field that carried the value.
        field: String,
        /// The rejected value.
        value: String,
    },

    // ── Crypto ──────────────────────────────────────────────────────
    /// Proof type or curve is not supported.
    #[error("unsupported proof type: {0}")]
    InvalidProofType(String),

    /// Proof purpose is not the one the operation requires.
    #[error("invalid proof purpose: expected {expected}, got {actual}")]
    InvalidProofPurpose {
        /// Accepted purpose(s).
        expected: String,
        /// Presented purpose.
        actual: String,
    },

    /// A multibase or binary field could not be decoded.
    #[error("decoding failed: {0}")]
    DecodingFailed(String),

    /// The signature does not verify against the resolved key.
    #[error("signature verification failed: {0}")]
    SignatureVerificationFailed(String),

    /// The signer or key reference is unacceptable (malformed
    /// verificationMethod, key absent from the purpose list, DID mismatch).
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Presented authNonce differs from the Transaction's.
    #[error("auth nonce mismatch for transaction {tx_id}")]
    AuthNonceMismatch {
        /// Transaction the challenge belongs to.
        tx_id: String,
    },

    /// None of the client's cipher candidates is supported.
    #[error("no matching cipher type among {offered} client candidate(s)")]
    NoMatchingCipherType {
        /// Number of candidates the client offered.
        offered: usize,
    },

    /// ECDH key agreement could not be computed.
    #[error("key agreement failed: {0}")]
    KeyAgreementFailed(String),

    /// Symmetric encryption or decryption failed.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    // ── State / not found ───────────────────────────────────────────
    /// No Transaction with this txId.
    #[error("transaction not found: {0}")]
    TransactionNotFound(String),

    /// The step is not permitted in the Transaction's current state.
    #[error("transaction {tx_id} invalid: {reason}")]
    TransactionInvalid {
        /// Transaction the step was attempted on.
        tx_id: String,
        /// Why the step was rejected.
        reason: String,
    },

    /// The Transaction passed its expiry.
    #[error("transaction expired: {0}")]
    TransactionExpired(String),

    /// An ECDH session already exists for this Transaction.
    #[error("ECDH session already exists for transaction {0}")]
    EcdhAlreadyExists(String),

    /// The Transaction has no ECDH session yet.
    #[error("no ECDH session for transaction {0}")]
    EcdhNotFound(String),

    /// The Transaction's authNonce was already assigned.
    #[error("auth nonce already set for transaction {0}")]
    AuthNonceAlreadySet(String),

    /// No token row exists for the Transaction.
    #[error("token info not found for transaction {0}")]
    TokenInfoNotFound(String),

    /// Token bytes absent or different from the stored token.
    #[error("invalid token")]
    InvalidToken,

    /// Token is past its expiry.
    #[error("token expired at {0}")]
    TokenExpired(String),

    /// Token exists but not for an allowed purpose.
    #[error("unsupported token purpose: {0}")]
    UnsupportedPurpose(String),

    /// DID Registry has no document for this DID.
    #[error("DID document not found: {0}")]
    DidDocumentNotFound(String),

    /// DID document exists but is deactivated.
    #[error("DID document deactivated: {0}")]
    DidDocumentDeactivated(String),

    /// No entity record for this DID.
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    /// Entity exists but has not completed enrollment.
    #[error("entity not enrolled: {0}")]
    EntityNotEnrolled(String),

    /// Entity already completed enrollment.
    #[error("entity already enrolled: {0}")]
    EntityAlreadyEnrolled(String),

    /// Unknown VC plan id.
    #[error("VC plan not found: {0}")]
    VcPlanNotFound(String),

    /// No VC meta registered for this VC id.
    #[error("VC meta not found: {0}")]
    VcMetaNotFound(String),

    /// The VC is already revoked.
    #[error("VC already revoked: {0}")]
    VcAlreadyRevoked(String),

    /// Unknown offer id.
    #[error("offer not found: {0}")]
    OfferNotFound(String),

    /// Offer is past its validUntil.
    #[error("offer expired: {0}")]
    OfferExpired(String),

    /// Offer was already linked to a Transaction.
    #[error("offer already redeemed: {0}")]
    OfferAlreadyRedeemed(String),

    /// Issuer named in the request does not match the plan/offer.
    #[error("issuer mismatch: {0}")]
    IssuerMismatch(String),

    /// Authenticated DID is not the credential's holder.
    #[error("holder mismatch: {0}")]
    HolderMismatch(String),

    // ── External ────────────────────────────────────────────────────
    /// Registry lookup of a DID document failed.
    #[error("blockchain get DID document failed: {0}")]
    BlockchainGetDidDocumentFailed(String),

    /// Registry write of a new DID document failed.
    #[error("blockchain register DID document failed: {0}")]
    BlockchainRegisterDidDocumentFailed(String),

    /// Registry update of a DID document failed.
    #[error("blockchain update DID document failed: {0}")]
    BlockchainUpdateDidDocumentFailed(String),

    /// Registry write of VC meta failed.
    #[error("blockchain register VC meta failed: {0}")]
    BlockchainRegisterVcMetaFailed(String),

    /// Registry lookup of VC meta failed.
    #[error("blockchain get VC meta failed: {0}")]
    BlockchainGetVcMetaFailed(String),

    /// Registry update of VC status failed.
    #[error("blockchain update VC status failed: {0}")]
    BlockchainUpdateVcStatusFailed(String),

    /// Issuer unreachable or timed out.
    #[error("issuer communication error: {0}")]
    IssuerCommunicationError(String),

    /// Issuer answered with something unusable.
    #[error("issuer unknown response: {0}")]
    IssuerUnknownResponse(String),

    /// Push or email delivery failed.
    #[error("notification failed: {0}")]
    NotificationFailed(String),

    /// Entity store unavailable.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    // ── Unknown ─────────────────────────────────────────────────────
    /// Uncaught failure. The message is never sent to clients.
    #[error("unknown server error: {0}")]
    Unknown(String),
}

impl TasError {
    /// Stable wire code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::InvalidDid(_) => "INVALID_DID",
            Self::InvalidDidKeyUrl(_) => "INVALID_DID_KEY_URL",
            Self::InvalidEnum { .. } => "INVALID_ENUM",
            Self::InvalidProofType(_) => "INVALID_PROOF_TYPE",
            Self::InvalidProofPurpose { .. } => "INVALID_PROOF_PURPOSE",
            Self::DecodingFailed(_) => "DECODING_FAILED",
            Self::SignatureVerificationFailed(_) => "SIGNATURE_VERIFICATION_FAILED",
            Self::InvalidSignature(_) => "INVALID_SIGNATURE",
            Self::AuthNonceMismatch { .. } => "AUTH_NONCE_MISMATCH",
            Self::NoMatchingCipherType { .. } => "NO_MATCHING_CIPHER_TYPE",
            Self::KeyAgreementFailed(_) => "KEY_AGREEMENT_FAILED",
            Self::EncryptionFailed(_) => "ENCRYPTION_FAILED",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::TransactionInvalid { .. } => "TRANSACTION_INVALID",
            Self::TransactionExpired(_) => "TRANSACTION_EXPIRED",
            Self::EcdhAlreadyExists(_) => "ECDH_ALREADY_EXISTS",
            Self::EcdhNotFound(_) => "ECDH_NOT_FOUND",
            Self::AuthNonceAlreadySet(_) => "AUTH_NONCE_ALREADY_SET",
            Self::TokenInfoNotFound(_) => "TOKEN_INFO_NOT_FOUND",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::TokenExpired(_) => "TOKEN_EXPIRED",
            Self::UnsupportedPurpose(_) => "UNSUPPORTED_PURPOSE",
            Self::DidDocumentNotFound(_) => "DID_DOCUMENT_NOT_FOUND",
            Self::DidDocumentDeactivated(_) => "DID_DOCUMENT_DEACTIVATED",
            Self::EntityNotFound(_) => "ENTITY_NOT_FOUND",
            Self::EntityNotEnrolled(_) => "ENTITY_NOT_ENROLLED",
            Self::EntityAlreadyEnrolled(_) => "ENTITY_ALREADY_ENROLLED",
            Self::VcPlanNotFound(_) => "VC_PLAN_NOT_FOUND",
            Self::VcMetaNotFound(_) => "VC_META_NOT_FOUND",
            Self::VcAlreadyRevoked(_) => "VC_ALREADY_REVOKED",
            Self::OfferNotFound(_) => "OFFER_NOT_FOUND",
            Self::OfferExpired(_) => "OFFER_EXPIRED",
            Self::OfferAlreadyRedeemed(_) => "OFFER_ALREADY_REDEEMED",
            Self::IssuerMismatch(_) => "ISSUER_MISMATCH",
            Self::HolderMismatch(_) => "HOLDER_MISMATCH",
            Self::BlockchainGetDidDocumentFailed(_) => "BLOCKCHAIN_GET_DID_DOCUMENT_FAILED",
            Self::BlockchainRegisterDidDocumentFailed(_) => {
                "BLOCKCHAIN_REGISTER_DID_DOCUMENT_FAILED"
            }
            Self::BlockchainUpdateDidDocumentFailed(_) => "BLOCKCHAIN_UPDATE_DID_DOCUMENT_FAILED",
            Self::BlockchainRegisterVcMetaFailed(_) => "BLOCKCHAIN_REGISTER_VC_META_FAILED",
            Self::BlockchainGetVcMetaFailed(_) => "BLOCKCHAIN_GET_VC_META_FAILED",
            Self::BlockchainUpdateVcStatusFailed(_) => "BLOCKCHAIN_UPDATE_VC_STATUS_FAILED",
            Self::IssuerCommunicationError(_) => "ISSUER_COMMUNICATION_ERROR",
            Self::IssuerUnknownResponse(_) => "ISSUER_UNKNOWN_RESPONSE",
            Self::NotificationFailed(_) => "NOTIFICATION_FAILED",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Unknown(_) => "UNKNOWN_SERVER_ERROR",
        }
    }

    /// Category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidDid(_)
            | Self::InvalidDidKeyUrl(_)
            | Self::InvalidEnum { .. } => ErrorCategory::Validation,

            Self::InvalidProofType(_)
            | Self::InvalidProofPurpose { .. }
            | Self::DecodingFailed(_)
            | Self::SignatureVerificationFailed(_)
            | Self::InvalidSignature(_)
            | Self::AuthNonceMismatch { .. }
            | Self::NoMatchingCipherType { .. }
            | Self::KeyAgreementFailed(_)
            | Self::EncryptionFailed(_) => ErrorCategory::Crypto,

            Self::TransactionNotFound(_)
            | Self::TransactionInvalid { .. }
            | Self::TransactionExpired(_)
            | Self::EcdhAlreadyExists(_)
            | Self::EcdhNotFound(_)
            | Self::AuthNonceAlreadySet(_)
            | Self::TokenInfoNotFound(_)
            | Self::InvalidToken
            | Self::TokenExpired(_)
            | Self::UnsupportedPurpose(_)
            | Self::DidDocumentNotFound(_)
            | Self::DidDocumentDeactivated(_)
            | Self::EntityNotFound(_)
            | Self::EntityNotEnrolled(_)
            | Self::EntityAlreadyEnrolled(_)
            | Self::VcPlanNotFound(_)
            | Self::VcMetaNotFound(_)
            | Self::VcAlreadyRevoked(_)
            | Self::OfferNotFound(_)
            | Self::OfferExpired(_)
            | Self::OfferAlreadyRedeemed(_)
            | Self::IssuerMismatch(_)
            | Self::HolderMismatch(_) => ErrorCategory::State,

            Self::BlockchainGetDidDocumentFailed(_)
            | Self::BlockchainRegisterDidDocumentFailed(_)
            | Self::BlockchainUpdateDidDocumentFailed(_)
            | Self::BlockchainRegisterVcMetaFailed(_)
            | Self::BlockchainGetVcMetaFailed(_)
            | Self::BlockchainUpdateVcStatusFailed(_)
            | Self::IssuerCommunicationError(_)
            | Self::IssuerUnknownResponse(_)
            | Self::NotificationFailed(_)
            | Self::StoreUnavailable(_) => ErrorCategory::External,

            Self::Unknown(_) => ErrorCategory::Unknown,
        }
    }

    /// HTTP status code paired with this error on the wire.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::DecodingFailed(_) | Self::NoMatchingCipherType { .. } => 400,
            Self::InvalidToken | Self::TokenExpired(_) | Self::UnsupportedPurpose(_) => 401,
            Self::TransactionNotFound(_)
            | Self::EcdhNotFound(_)
            | Self::TokenInfoNotFound(_)
            | Self::DidDocumentNotFound(_)
            | Self::EntityNotFound(_)
            | Self::VcPlanNotFound(_)
            | Self::VcMetaNotFound(_)
            | Self::OfferNotFound(_) => 404,
            Self::StoreUnavailable(_) => 503,
            other => match other.category() {
                ErrorCategory::Validation => 400,
                ErrorCategory::Crypto => 401,
                ErrorCategory::State => 409,
                ErrorCategory::External => 502,
                ErrorCategory::Unknown => 500,
            },
        }
    }

    /// Convenience constructor for `TransactionInvalid`.
    pub fn transaction_invalid(tx_id: impl ToString, reason: impl Into<String>) -> Self {
        Self::TransactionInvalid {
            tx_id: tx_id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Constructor-level validation failures for core newtypes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// DID does not match `did:<method>:<identifier>`.
    #[error("invalid DID {0:?}")]
    InvalidDid(String),

    /// DID-key-URL does not match `did:<method>:<identifier>[?query]#<keyId>`.
    #[error("invalid DID key URL {0:?}")]
    InvalidDidKeyUrl(String),

    /// Transaction id is not a UUID.
    #[error("invalid transaction id {0:?}")]
    InvalidTxId(String),

    /// Timestamp is malformed or not UTC.
    #[error("{0}")]
    InvalidTimestamp(String),
}

impl From<ValidationError> for TasError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidDid(s) => Self::InvalidDid(s),
            ValidationError::InvalidDidKeyUrl(s) => Self::InvalidDidKeyUrl(s),
            other => Self::InvalidRequest(other.to_string()),
        }
    }
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values have no portable canonical form.
    #[error("float values are not permitted in signed payloads; use a string or integer: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

impl From<CanonicalizationError> for TasError {
    fn from(err: CanonicalizationError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crypto_codes_are_distinct() {
        let sig = TasError::SignatureVerificationFailed("x".into());
        let nonce = TasError::AuthNonceMismatch { tx_id: "t".into() };
        let purpose = TasError::InvalidProofPurpose {
            expected: "authentication".into(),
            actual: "assertionMethod".into(),
        };
        assert_ne!(sig.code(), nonce.code());
        assert_ne!(nonce.code(), purpose.code());
        for e in [&sig, &nonce, &purpose] {
            assert_eq!(e.category(), ErrorCategory::Crypto);
            assert_eq!(e.http_status(), 401);
        }
    }

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(TasError::TransactionNotFound("t".into()).http_status(), 404);
        assert_eq!(TasError::TokenInfoNotFound("t".into()).http_status(), 404);
    }

    #[test]
    fn state_conflicts_map_to_409() {
        let e = TasError::transaction_invalid("t", "step 3 already recorded");
        assert_eq!(e.code(), "TRANSACTION_INVALID");
        assert_eq!(e.http_status(), 409);
        assert_eq!(TasError::VcAlreadyRevoked("vc".into()).http_status(), 409);
    }

    #[test]
    fn external_failures_are_5xx() {
        let e = TasError::BlockchainRegisterVcMetaFailed("down".into());
        assert_eq!(e.category(), ErrorCategory::External);
        assert_eq!(e.http_status(), 502);
        assert_eq!(TasError::StoreUnavailable("x".into()).http_status(), 503);
    }

    #[test]
    fn unknown_is_500() {
        let e = TasError::Unknown("boom".into());
        assert_eq!(e.code(), "UNKNOWN_SERVER_ERROR");
        assert_eq!(e.http_status(), 500);
    }

    #[test]
    fn validation_error_keeps_did_code() {
        let e: TasError = ValidationError::InvalidDid("nope".into()).into();
        assert_eq!(e.code(), "INVALID_DID");
        let e: TasError = ValidationError::InvalidTxId("x".into()).into();
        assert_eq!(e.code(), "INVALID_REQUEST");
    }

    #[test]
    fn float_rejection_is_validation() {
        let e: TasError = CanonicalizationError::FloatRejected(0.5).into();
        assert_eq!(e.category(), ErrorCategory::Validation);
    }
}
