//! Error handling types

use std::time::Duration;
use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error used as the `source` of wrapped failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for revalid
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed composite key
    ///
    /// Carries every validation message, not only the first one, so that
    /// callers can fix all offending segments at once.
    #[error("Invalid cache key: {message}")]
    InvalidKey {
        /// Summary of the failure
        message: String,
        /// The segments that were submitted
        key_parts: Vec<String>,
        /// All validation messages
        validation_errors: Vec<String>,
    },

    /// Cache backend read or write failure
    #[error("Cache provider error: {message}")]
    CacheProvider {
        /// Description of the cache provider error
        message: String,
        /// Optional source error
        #[source]
        source: Option<BoxError>,
    },

    /// Event transport failed to publish
    #[error("Event publish error: {message}")]
    EventPublish {
        /// Description of the publish error
        message: String,
        /// Optional source error
        #[source]
        source: Option<BoxError>,
    },

    /// Event transport failed to register a subscription
    #[error("Event subscription error: {message}")]
    EventSubscription {
        /// Description of the subscription error
        message: String,
        /// Optional source error
        #[source]
        source: Option<BoxError>,
    },

    /// Event transport could not connect
    #[error("Event connection error: {message}")]
    EventConnection {
        /// Description of the connection error
        message: String,
        /// Optional source error
        #[source]
        source: Option<BoxError>,
    },

    /// Optimistic mutation failed; the original failure is the source
    #[error("Mutation error: {message}")]
    Mutation {
        /// Description of the mutation error
        message: String,
        /// The failure raised by the mutation or the optimistic step
        #[source]
        source: BoxError,
    },

    /// Operation is not valid in the current state
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// Description of the invalid operation
        message: String,
    },

    /// Invalid argument provided to a function
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument
        message: String,
    },

    /// Operation attempted after shutdown
    #[error("Object disposed: {object}")]
    ObjectDisposed {
        /// Name of the disposed component
        object: String,
    },

    /// Caller-side cancellation was observed
    #[error("Operation cancelled: {operation}")]
    Cancelled {
        /// The operation that was cancelled
        operation: String,
    },

    /// An attempt exceeded its configured timeout
    #[error("Operation timed out after {timeout:?}: {operation}")]
    Timeout {
        /// The operation that timed out
        operation: String,
        /// The configured timeout
        timeout: Duration,
    },

    /// Failure raised by a caller-supplied fetch or mutation function
    #[error("Fetch error: {message}")]
    Fetch {
        /// Description of the fetch failure
        message: String,
        /// Optional source error
        #[source]
        source: Option<BoxError>,
    },

    /// JSON parsing or serialization error
    #[error("JSON parsing error: {source}")]
    Json {
        /// The underlying JSON error
        #[from]
        source: serde_json::Error,
    },

    /// Configuration-related error
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error
        message: String,
        /// Optional source error
        #[source]
        source: Option<BoxError>,
    },

    /// Generic error from external sources
    #[error("Generic error: {0}")]
    Generic(#[from] BoxError),

    /// Generic string-based error
    #[error("String error: {0}")]
    String(String),
}

// Key error creation methods
impl Error {
    /// Create an invalid key error from the submitted parts and all validation messages
    pub fn invalid_key(key_parts: &[String], validation_errors: Vec<String>) -> Self {
        Self::InvalidKey {
            message: format!("Invalid cache key parts: {}", validation_errors.join("; ")),
            key_parts: key_parts.to_vec(),
            validation_errors,
        }
    }
}

// Cache provider error creation methods
impl Error {
    /// Create a cache provider error
    pub fn cache_provider<S: Into<String>>(message: S) -> Self {
        Self::CacheProvider {
            message: message.into(),
            source: None,
        }
    }

    /// Create a cache provider error with source
    pub fn cache_provider_with_source<
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        message: S,
        source: E,
    ) -> Self {
        Self::CacheProvider {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Event transport error creation methods
impl Error {
    /// Create an event publish error
    pub fn event_publish<S: Into<String>>(message: S) -> Self {
        Self::EventPublish {
            message: message.into(),
            source: None,
        }
    }

    /// Create an event publish error wrapping the transport failure
    pub fn event_publish_with_source<S: Into<String>, E: Into<BoxError>>(
        message: S,
        source: E,
    ) -> Self {
        Self::EventPublish {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create an event subscription error
    pub fn event_subscription<S: Into<String>>(message: S) -> Self {
        Self::EventSubscription {
            message: message.into(),
            source: None,
        }
    }

    /// Create an event subscription error wrapping the transport failure
    pub fn event_subscription_with_source<S: Into<String>, E: Into<BoxError>>(
        message: S,
        source: E,
    ) -> Self {
        Self::EventSubscription {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create an event connection error
    pub fn event_connection<S: Into<String>>(message: S) -> Self {
        Self::EventConnection {
            message: message.into(),
            source: None,
        }
    }

    /// Create an event connection error wrapping the transport failure
    pub fn event_connection_with_source<S: Into<String>, E: Into<BoxError>>(
        message: S,
        source: E,
    ) -> Self {
        Self::EventConnection {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

// Orchestration error creation methods
impl Error {
    /// Wrap a failed optimistic mutation, preserving the original cause
    pub fn mutation<S: Into<String>>(message: S, source: Error) -> Self {
        Self::Mutation {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// Create an invalid operation error
    pub fn invalid_operation<S: Into<String>>(message: S) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an object disposed error
    pub fn object_disposed<S: Into<String>>(object: S) -> Self {
        Self::ObjectDisposed {
            object: object.into(),
        }
    }

    /// Create a cancellation error
    pub fn cancelled<S: Into<String>>(operation: S) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout,
        }
    }

    /// Create a fetch error
    pub fn fetch<S: Into<String>>(message: S) -> Self {
        Self::Fetch {
            message: message.into(),
            source: None,
        }
    }

    /// Create a fetch error with source
    pub fn fetch_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::Fetch {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Configuration error creation methods
impl Error {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with source
    pub fn configuration_with_source<
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        message: S,
        source: E,
    ) -> Self {
        Self::Configuration {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Classification helpers
impl Error {
    /// Whether this error represents caller-side cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Whether this error is an invalid key error
    pub fn is_invalid_key(&self) -> bool {
        matches!(self, Self::InvalidKey { .. })
    }

    /// Whether this error reports use after shutdown
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::ObjectDisposed { .. })
    }

    /// Whether this error belongs to the event transport family
    pub fn is_event_error(&self) -> bool {
        matches!(
            self,
            Self::EventPublish { .. } | Self::EventSubscription { .. } | Self::EventConnection { .. }
        )
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}
