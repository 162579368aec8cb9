//! Error types for the chunkwise engine.
//!
//! Every fatal condition in a run maps to one variant here. Conditions that
//! have a defined result (a singular matrix, a short final chunk) are encoded
//! as normal results and never surface as errors.

use thiserror::Error;

use crate::types::WorkerId;

/// Specialized Result type for chunkwise operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for chunkwise operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The run cannot start with the given settings (pool too small, bad chunk size).
    #[error("Configuration error: {message}")]
    Configuration {
        /// Detailed error message
        message: String,
    },

    /// An input could not be opened or read from the start.
    #[error("Cannot access input {path}: {source}")]
    InputAccess {
        /// Input path as given by the caller
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// An input is readable but its contents are malformed.
    #[error("Invalid input {input}: {message}")]
    InvalidInput {
        /// Detailed error message
        message: String,
        /// Input name
        input: String,
    },

    /// A worker replied with something it was not asked for.
    #[error("Protocol violation by {worker}: {message}")]
    ProtocolViolation {
        /// Offending worker
        worker: WorkerId,
        /// What was wrong with the reply
        message: String,
    },

    /// A worker's channel disconnected before the run finished.
    #[error("Lost contact with {worker}")]
    WorkerLost {
        /// Worker whose channel closed
        worker: WorkerId,
    },

    /// IO errors on an already-opened input
    #[error("IO error: {message}")]
    Io {
        /// Detailed error message
        message: String,
        /// Source error
        #[source]
        source: Option<std::io::Error>,
    },

    /// Internal errors (bugs, invariant violations)
    #[error("Internal error: {message}")]
    Internal {
        /// Detailed error message
        message: String,
    },
}

impl Error {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an input access error
    pub fn input_access(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::InputAccess {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            input: input.into(),
        }
    }

    /// Create a protocol violation error
    pub fn protocol(worker: WorkerId, message: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            worker,
            message: message.into(),
        }
    }

    /// Create a worker-lost error
    pub fn worker_lost(worker: WorkerId) -> Self {
        Self::WorkerLost { worker }
    }

    /// Create an IO error
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the error is attributable to a misbehaving or missing worker.
    pub fn is_worker_fault(&self) -> bool {
        matches!(
            self,
            Error::ProtocolViolation { .. } | Error::WorkerLost { .. }
        )
    }

    /// Get the error code used in diagnostics and JSON output
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Configuration { .. } => "CONFIGURATION_ERROR",
            Error::InputAccess { .. } => "INPUT_ACCESS_ERROR",
            Error::InvalidInput { .. } => "INVALID_INPUT",
            Error::ProtocolViolation { .. } => "PROTOCOL_VIOLATION",
            Error::WorkerLost { .. } => "WORKER_LOST",
            Error::Io { .. } => "IO_ERROR",
            Error::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::configuration("requires at least two processes");
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
        assert!(!err.is_worker_fault());
    }

    #[test]
    fn test_worker_faults() {
        assert!(Error::worker_lost(WorkerId::new(1)).is_worker_fault());
        assert!(Error::protocol(WorkerId::new(2), "duplicate index 3").is_worker_fault());
        assert!(!Error::internal("bug").is_worker_fault());
    }

    #[test]
    fn test_display() {
        let err = Error::input_access(
            "missing.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(err.to_string(), "Cannot access input missing.txt: no such file");

        let err = Error::protocol(WorkerId::new(3), "unexpected index 7");
        assert_eq!(err.to_string(), "Protocol violation by worker_3: unexpected index 7");
    }
}
