//! Error types for discogs-dl
//!
//! Two layers:
//! - [`FetchError`] describes why a single HTTP request to the catalog failed. Inside a
//!   collection fetch these are caught at the page boundary and turned into failed-page
//!   bookkeeping; only [`FetchError::Unauthenticated`] escapes.
//! - [`Error`] is what public operations return.

use thiserror::Error;

/// Result type alias for discogs-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for discogs-dl
#[derive(Debug, Error)]
pub enum Error {
    /// No usable access credential; nothing can be fetched
    #[error("not authenticated: no access credential available")]
    Unauthenticated,

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "base_url")
        key: Option<String>,
    },

    /// A standalone request (identity, folder metadata) failed
    #[error("request failed: {0}")]
    Fetch(FetchError),

    /// The identity endpoint answered without a username
    #[error("could not determine username (HTTP {status})")]
    InvalidIdentity {
        /// HTTP status of the identity response
        status: u16,
        /// Raw response body, if it was valid UTF-8
        body: Option<String>,
    },

    /// The collection has more pages than a page index can address
    #[error("collection of {item_count} items needs too many pages of {page_size}")]
    CollectionTooLarge {
        /// Item count the plan was asked for
        item_count: u64,
        /// Page size after clamping
        page_size: u32,
    },

    /// The operation was cancelled through its cancellation token
    #[error("operation cancelled")]
    Cancelled,

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl From<FetchError> for Error {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Unauthenticated => Error::Unauthenticated,
            other => Error::Fetch(other),
        }
    }
}

/// Failure of one request against the catalog service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// No valid credential; fatal for the whole operation
    #[error("not authenticated")]
    Unauthenticated,

    /// Server answered with a non-2xx status
    #[error("HTTP {status}{}", body_suffix(.body))]
    Transport {
        /// HTTP status code
        status: u16,
        /// Response body, if any and valid UTF-8
        body: Option<String>,
    },

    /// Response body did not have the expected shape
    #[error("failed to decode response: {0}")]
    Decoding(String),

    /// Connection failure, timeout or other transport-level problem
    #[error("network error: {0}")]
    Network(String),
}

fn body_suffix(body: &Option<String>) -> String {
    body.as_deref()
        .map(|b| format!(": {b}"))
        .unwrap_or_default()
}

impl FetchError {
    /// Whether this failure must abort the whole operation rather than one page
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::Unauthenticated)
    }

    /// Short machine-readable label, used in events and logs
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Unauthenticated => "unauthenticated",
            FetchError::Transport { .. } => "transport",
            FetchError::Decoding(_) => "decoding",
            FetchError::Network(_) => "network",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            FetchError::Decoding(error.to_string())
        } else {
            FetchError::Network(error.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(error: serde_json::Error) -> Self {
        FetchError::Decoding(error.to_string())
    }
}
