//! Error types for the travel cost service.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Why a lifecycle intent was turned down.
///
/// The code is the identity of a reason. Human readable text lives in the
/// [`TextCatalog`](crate::text::TextCatalog).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    /// The main party has no family relations on record.
    NoFamilyRelations,
    /// The counterparty is not one of the main party's co-parents.
    NoRelationToCounterparty,
    /// At least one named child is not the main party's child.
    NoRelationToChild,
    /// At least one named child is already covered by an active request.
    ChildAlreadyInActiveRequest,
    /// No active request awaiting this party's consent.
    NoMatchingActiveRequest,
    /// The acting party may not deactivate the request, or it is already inactive.
    NotAuthorizedOrAlreadyInactive,
    /// The request is not in effect for the acting party.
    RequestNotInEffect,
}

impl RejectionReason {
    /// Returns the stable code for this reason.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NoFamilyRelations => "NO_FAMILY_RELATIONS",
            Self::NoRelationToCounterparty => "NO_RELATION_TO_COUNTERPARTY",
            Self::NoRelationToChild => "NO_RELATION_TO_CHILD",
            Self::ChildAlreadyInActiveRequest => "CHILD_ALREADY_IN_ACTIVE_REQUEST",
            Self::NoMatchingActiveRequest => "NO_MATCHING_ACTIVE_REQUEST",
            Self::NotAuthorizedOrAlreadyInactive => "NOT_AUTHORIZED_OR_ALREADY_INACTIVE",
            Self::RequestNotInEffect => "REQUEST_NOT_IN_EFFECT",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("Subject not found in person directory: {0}")]
    SubjectNotFound(String),

    #[error("Validation rejected: {0}")]
    ValidationRejected(RejectionReason),

    #[error("Not authorized: {0}")]
    NotAuthorized(RejectionReason),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // === Server Errors ===
    #[error(
        "Person directory unavailable{}",
        .status.map_or_else(String::new, |s| format!(" (status {s})"))
    )]
    UpstreamUnavailable { status: Option<u16> },

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the error code for callers that need a machine readable kind.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::SubjectNotFound(_) => "SUBJECT_NOT_FOUND",
            Self::ValidationRejected(_) => "VALIDATION_REJECTED",
            Self::NotAuthorized(_) => "NOT_AUTHORIZED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::UpstreamUnavailable { .. } => "UPSTREAM_UNAVAILABLE",
            Self::Persistence(_) => "PERSISTENCE_FAILURE",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the rejection reason carried by this error, if any.
    #[must_use]
    pub const fn rejection_reason(&self) -> Option<RejectionReason> {
        match self {
            Self::ValidationRejected(reason) | Self::NotAuthorized(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Returns whether the failure is attributable to the system rather than the caller.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable { .. }
                | Self::Persistence(_)
                | Self::Config(_)
                | Self::Internal(_)
        )
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_display_includes_status() {
        let err = AppError::UpstreamUnavailable { status: Some(500) };
        assert_eq!(err.to_string(), "Person directory unavailable (status 500)");

        let err = AppError::UpstreamUnavailable { status: None };
        assert_eq!(err.to_string(), "Person directory unavailable");
    }

    #[test]
    fn test_server_errors_are_classified() {
        assert!(AppError::UpstreamUnavailable { status: Some(503) }.is_server_error());
        assert!(AppError::Persistence("boom".to_string()).is_server_error());
        assert!(!AppError::SubjectNotFound("main party".to_string()).is_server_error());
        assert!(
            !AppError::ValidationRejected(RejectionReason::NoRelationToChild).is_server_error()
        );
    }

    #[test]
    fn test_rejection_reason_identity_is_its_code() {
        let err = AppError::NotAuthorized(RejectionReason::NoMatchingActiveRequest);
        assert_eq!(err.error_code(), "NOT_AUTHORIZED");
        assert_eq!(
            err.rejection_reason().map(RejectionReason::code),
            Some("NO_MATCHING_ACTIVE_REQUEST")
        );
        assert_eq!(err.to_string(), "Not authorized: NO_MATCHING_ACTIVE_REQUEST");
    }
}
