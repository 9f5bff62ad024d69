//! Error taxonomy surfaced by device twins to their host

use std::fmt;
use thiserror::Error;

/// Boxed error used as the cause of wrapped failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used across twin operations
pub type TwinResult<T> = Result<T, TwinError>;

/// Coarse error category, as seen by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown id or malformed input
    BadRequest,
    /// Operation unsupported by the twin
    MethodNotAllowed,
    /// External dependency failed
    Internal,
    /// Configuration, lifecycle or simulated device fault
    DeviceTwin,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest => write!(f, "BadRequest"),
            Self::MethodNotAllowed => write!(f, "MethodNotAllowed"),
            Self::Internal => write!(f, "Internal"),
            Self::DeviceTwin => write!(f, "DeviceTwin"),
        }
    }
}

/// Errors returned by twin operations
#[derive(Debug, Error)]
pub enum TwinError {
    /// Unknown identifier or malformed input; caller must correct the request
    #[error("bad request: {message}")]
    BadRequest {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Operation not supported by this twin
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    /// External dependency failure (fetch, decode)
    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Twin configuration, lifecycle or simulated fault
    #[error("device twin error: {message}")]
    DeviceTwin {
        message: String,
        /// Set for simulated faults, which may clear on the next attempt
        transient: bool,
        #[source]
        source: Option<BoxError>,
    },
}

impl TwinError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            source: None,
        }
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::MethodNotAllowed(message.into())
    }

    pub fn internal(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Internal failure without an underlying cause (e.g. a feed-reported error)
    pub fn internal_msg(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Configuration or lifecycle error; retrying unchanged fails again
    pub fn device_twin(message: impl Into<String>) -> Self {
        Self::DeviceTwin {
            message: message.into(),
            transient: false,
            source: None,
        }
    }

    /// Simulated device fault that may not recur
    pub fn device_fault(message: impl Into<String>) -> Self {
        Self::DeviceTwin {
            message: message.into(),
            transient: true,
            source: None,
        }
    }

    /// Attach a cause to the error, keeping its category
    #[must_use]
    pub fn caused_by(self, cause: impl Into<BoxError>) -> Self {
        let cause = Some(cause.into());
        match self {
            Self::BadRequest { message, .. } => Self::BadRequest {
                message,
                source: cause,
            },
            Self::Internal { message, .. } => Self::Internal {
                message,
                source: cause,
            },
            Self::DeviceTwin {
                message, transient, ..
            } => Self::DeviceTwin {
                message,
                transient,
                source: cause,
            },
            other @ Self::MethodNotAllowed(_) => other,
        }
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest { .. } => ErrorKind::BadRequest,
            Self::MethodNotAllowed(_) => ErrorKind::MethodNotAllowed,
            Self::Internal { .. } => ErrorKind::Internal,
            Self::DeviceTwin { .. } => ErrorKind::DeviceTwin,
        }
    }

    /// Whether the host may retry the same request unchanged.
    ///
    /// True for external failures and simulated device faults. Catalog and
    /// lifecycle errors such as an unsupported method are fatal.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Internal { .. }
                | Self::DeviceTwin {
                    transient: true,
                    ..
                }
        )
    }
}
