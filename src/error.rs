//! Error types for the concurrency substrate.
//!
//! Error categories:
//! - Lock: the underlying OS primitive refused an operation
//! - State: an internal invariant of a primitive was violated
//! - Config: malformed environment or affinity configuration
//! - Resource: thread creation or allocation failed
//!
//! Lock and state failures are fatal at the point of detection: the
//! primitives panic with the corresponding diagnostic because callers hold
//! no recovery path. Config and resource failures are returned as values
//! from the initialization paths that produce them.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PoolError {
    /// The underlying OS primitive refused an operation.
    #[error("{op} failed with errno {errno}")]
    Lock { op: &'static str, errno: i32 },

    /// An internal invariant was violated.
    #[error("{context}: {detail}")]
    State {
        context: &'static str,
        detail: String,
    },

    /// Malformed configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The OS refused a resource request.
    #[error("resource unavailable: {0}")]
    Resource(String),
}

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, PoolError>;
