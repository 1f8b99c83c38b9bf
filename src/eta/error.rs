//! Error types for the routing provider.
//!
//! [`EtaError`] separates the one outcome the caller can act on (the provider
//! answered but could not route between the two addresses) from every flavor
//! of the provider being unreachable or misbehaving.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EtaError {
    /// The provider answered, but the origin/destination pair had a
    /// non-`OK` element status (e.g. `NOT_FOUND`, `ZERO_RESULTS`).
    #[error("no route between addresses (status {status})")]
    RouteUnresolvable { status: String },

    /// The provider rejected the whole request (e.g. `REQUEST_DENIED`).
    #[error("provider rejected request (status {status}): {message}")]
    Rejected { status: String, message: String },

    /// HTTP-level error status from the provider.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The response did not carry a usable duration.
    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("no routing API key configured")]
    MissingApiKey,

    /// Underlying network failure, including timeouts.
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl EtaError {
    /// True only for a per-pair routing failure; everything else means the
    /// provider is unavailable.
    pub fn is_route_unresolvable(&self) -> bool {
        matches!(self, EtaError::RouteUnresolvable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_unresolvable_display() {
        let err = EtaError::RouteUnresolvable {
            status: "ZERO_RESULTS".into(),
        };
        assert_eq!(
            err.to_string(),
            "no route between addresses (status ZERO_RESULTS)"
        );
        assert!(err.is_route_unresolvable());
    }

    #[test]
    fn api_error_is_not_route_failure() {
        let err = EtaError::ApiError {
            status: 503,
            message: "unavailable".into(),
        };
        assert_eq!(err.to_string(), "API error (status 503): unavailable");
        assert!(!err.is_route_unresolvable());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EtaError>();
    }
}
