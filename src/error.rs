use thiserror::Error;

use crate::eta::EtaError;
use crate::lifecycle::{InvalidField, InvalidStatus};
use crate::store::StoreError;

/// Every failure the job service can report. Each maps onto one [`ErrorKind`].
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid status: {0:?}")]
    InvalidStatus(String),

    #[error("Invalid field specified for editing: {0:?}")]
    InvalidField(String),

    #[error("This Reference Number already exists: {0}")]
    DuplicateReference(String),

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Could not calculate route: {0}")]
    RouteUnresolvable(#[source] EtaError),

    #[error("Routing provider unavailable: {0}")]
    ProviderUnavailable(#[source] EtaError),

    #[error("Upload was empty or did not contain valid rows")]
    EmptyOrInvalidUpload,

    #[error("Storage error: {0}")]
    Storage(#[source] StoreError),
}

/// Coarse classification callers use to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Missing or malformed input; fix and resubmit.
    Validation,
    DuplicateReference,
    NotFound,
    RouteUnresolvable,
    /// The routing provider could not be reached; try later.
    ProviderUnavailable,
    EmptyOrInvalidUpload,
    Storage,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::DuplicateReference => "DuplicateReference",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::RouteUnresolvable => "RouteUnresolvable",
            ErrorKind::ProviderUnavailable => "ProviderUnavailable",
            ErrorKind::EmptyOrInvalidUpload => "EmptyOrInvalidUpload",
            ErrorKind::Storage => "StorageError",
        };
        f.write_str(name)
    }
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::Validation(_)
            | DispatchError::InvalidStatus(_)
            | DispatchError::InvalidField(_) => ErrorKind::Validation,
            DispatchError::DuplicateReference(_) => ErrorKind::DuplicateReference,
            DispatchError::NotFound(_) => ErrorKind::NotFound,
            DispatchError::RouteUnresolvable(_) => ErrorKind::RouteUnresolvable,
            DispatchError::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            DispatchError::EmptyOrInvalidUpload => ErrorKind::EmptyOrInvalidUpload,
            DispatchError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether retrying the same request later could succeed without the
    /// caller changing anything.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ProviderUnavailable | ErrorKind::Storage
        )
    }
}

impl From<StoreError> for DispatchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey { reference } => DispatchError::DuplicateReference(reference),
            other => DispatchError::Storage(other),
        }
    }
}

impl From<EtaError> for DispatchError {
    fn from(err: EtaError) -> Self {
        if err.is_route_unresolvable() {
            DispatchError::RouteUnresolvable(err)
        } else {
            DispatchError::ProviderUnavailable(err)
        }
    }
}

impl From<InvalidStatus> for DispatchError {
    fn from(err: InvalidStatus) -> Self {
        DispatchError::InvalidStatus(err.0)
    }
}

impl From<InvalidField> for DispatchError {
    fn from(err: InvalidField) -> Self {
        DispatchError::InvalidField(err.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_is_translated() {
        let err: DispatchError = StoreError::DuplicateKey {
            reference: "R-1".into(),
        }
        .into();
        assert!(matches!(err, DispatchError::DuplicateReference(ref r) if r == "R-1"));
        assert_eq!(err.kind(), ErrorKind::DuplicateReference);
        assert!(!err.is_transient());
    }

    #[test]
    fn eta_errors_are_classified() {
        let route: DispatchError = EtaError::RouteUnresolvable {
            status: "NOT_FOUND".into(),
        }
        .into();
        assert_eq!(route.kind(), ErrorKind::RouteUnresolvable);

        let down: DispatchError = EtaError::ApiError {
            status: 500,
            message: "boom".into(),
        }
        .into();
        assert_eq!(down.kind(), ErrorKind::ProviderUnavailable);
        assert!(down.is_transient());

        let no_key: DispatchError = EtaError::MissingApiKey.into();
        assert_eq!(no_key.kind(), ErrorKind::ProviderUnavailable);
    }

    #[test]
    fn status_and_field_errors_are_validation() {
        let status: DispatchError = InvalidStatus("Lost".into()).into();
        let field: DispatchError = InvalidField("status".into()).into();
        assert_eq!(status.kind(), ErrorKind::Validation);
        assert_eq!(field.kind(), ErrorKind::Validation);
        assert_eq!(
            field.to_string(),
            r#"Invalid field specified for editing: "status""#
        );
    }

    #[test]
    fn kind_display() {
        assert_eq!(ErrorKind::Validation.to_string(), "ValidationError");
        assert_eq!(
            ErrorKind::EmptyOrInvalidUpload.to_string(),
            "EmptyOrInvalidUpload"
        );
    }
}
