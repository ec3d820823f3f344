use thiserror::Error;

/// Errors from [`crate::distance::DistanceResolver::distance_km`].
///
/// URLs carried by the variants never include the API key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistanceError {
    /// Origin or destination was blank.
    #[error("origin and destination must both be non-empty")]
    EmptyInput,

    /// The request could not reach the service.
    #[error("network error contacting {url}: {message}")]
    Network {
        /// Request URL without credentials.
        url: String,
        /// Underlying transport message.
        message: String,
    },

    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Request URL without credentials.
        url: String,
        /// Configured timeout.
        timeout_secs: u64,
    },

    /// The service answered with a non-success HTTP status.
    #[error("HTTP {status} from {url}: {message}")]
    Http {
        /// Request URL without credentials.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Status description.
        message: String,
    },

    /// The top-level response status was not `OK`.
    #[error("distance service returned status {status}: {message}")]
    ServiceStatus {
        /// Top-level status, e.g. `REQUEST_DENIED`.
        status: String,
        /// Optional `error_message` from the service.
        message: String,
    },

    /// The origin/destination element status was not `OK`.
    #[error("distance element status {status}")]
    ElementStatus {
        /// Element status, e.g. `NOT_FOUND` or `ZERO_RESULTS`.
        status: String,
    },

    /// The response body could not be interpreted.
    #[error("failed to parse distance response: {message}")]
    Parse {
        /// Parser message.
        message: String,
    },
}
