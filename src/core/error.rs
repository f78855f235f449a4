//! Error types.
//!
//! An oracle query that cannot be answered fails only the notification it
//! was issued for. A watch subscription that terminates is not an error
//! value at all: the notification stream ends and the adapter logs the
//! [`TerminationReason`].

use thiserror::Error;

/// Common leasewatch error conditions.
#[derive(Debug, Error)]
pub enum ExpiryError {
    /// The lease oracle could not answer a time-to-live query.
    #[error("lease oracle unavailable for lease {lease_id}: {message}")]
    OracleUnavailable { lease_id: i64, message: String },

    /// The lease oracle did not answer within the configured timeout.
    #[error("lease oracle timed out after {timeout_ms}ms for lease {lease_id}")]
    OracleTimeout { lease_id: i64, timeout_ms: u64 },

    /// The watch subscription could not be established.
    #[error("watch subscribe failed: {message}")]
    Subscribe { message: String },

    /// Connection-level failure talking to the store.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Lease not found.
    #[error("lease {lease_id} not found")]
    LeaseNotFound { lease_id: i64 },

    /// Invalid request.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Internal error.
    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Why a watch subscription stopped producing notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The store closed the stream.
    Closed,
    /// The subscriber cancelled the watch.
    Cancelled,
    /// Store history was compacted past the watch position.
    Compacted { revision: i64 },
    /// The connection to the store failed.
    Transport,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Cancelled => write!(f, "Cancelled"),
            Self::Compacted { revision } => write!(f, "Compacted(revision={})", revision),
            Self::Transport => write!(f, "Transport"),
        }
    }
}

impl ExpiryError {
    /// Create an OracleUnavailable error.
    pub fn oracle_unavailable(lease_id: i64, message: impl Into<String>) -> Self {
        Self::OracleUnavailable {
            lease_id,
            message: message.into(),
        }
    }

    /// Create an Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Result type using ExpiryError.
pub type ExpiryResult<T> = Result<T, ExpiryError>;

#[cfg(feature = "grpc")]
impl From<tonic::Status> for ExpiryError {
    fn from(status: tonic::Status) -> Self {
        use tonic::Code;

        let message = status.message().to_string();
        match status.code() {
            Code::InvalidArgument | Code::OutOfRange => Self::InvalidRequest { message },
            Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled | Code::Aborted => {
                Self::Transport { message }
            }
            _ => Self::Internal {
                message: format!("{}: {}", status.code(), message),
            },
        }
    }
}

#[cfg(feature = "grpc")]
impl From<tonic::transport::Error> for ExpiryError {
    fn from(error: tonic::transport::Error) -> Self {
        Self::Transport {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn termination_reason_display() {
        assert_eq!(
            TerminationReason::Compacted { revision: 42 }.to_string(),
            "Compacted(revision=42)"
        );
        assert_eq!(TerminationReason::Transport.to_string(), "Transport");
    }

    #[test]
    fn oracle_errors_name_the_lease() {
        let err = ExpiryError::oracle_unavailable(7, "down");
        assert_eq!(
            err.to_string(),
            "lease oracle unavailable for lease 7: down"
        );
    }

    #[cfg(feature = "grpc")]
    #[test]
    fn grpc_unavailable_maps_to_transport() {
        let err: ExpiryError = tonic::Status::unavailable("no leader").into();
        assert!(matches!(err, ExpiryError::Transport { .. }));
    }
}
