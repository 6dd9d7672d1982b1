//! Error types for the Classbox system.
//!
//! Uses `thiserror` for ergonomic error definition. Every stage of an
//! execution (parsing, rewriting, loading, entry-point lookup, invocation)
//! fails with its own [`ErrorKind`], so callers can match on the stage that
//! went wrong.

use thiserror::Error;

/// Result alias used across the Classbox workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Classbox operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }

    /// Creates a malformed-class error at a byte offset.
    #[must_use]
    pub fn malformed(message: impl Into<String>, offset: usize) -> Self {
        Self::new(ErrorKind::MalformedClass {
            message: message.into(),
            offset,
        })
    }

    /// Creates a redirection (rewrite consistency) error.
    #[must_use]
    pub fn redirection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Redirection {
            message: message.into(),
        })
    }

    /// Creates a load error.
    #[must_use]
    pub fn load(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Load {
            message: message.into(),
        })
    }

    /// Creates an entry-point error for a class.
    #[must_use]
    pub fn entry_point(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::EntryPoint {
            class: class.into(),
            message: message.into(),
        })
    }

    /// Creates an invocation error with the captured output so far.
    #[must_use]
    pub fn invocation(message: impl Into<String>, output: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invocation {
            message: message.into(),
            output: output.into(),
        })
    }

    /// Creates a limit-exceeded error.
    #[must_use]
    pub fn limit_exceeded(limit: ExecutionLimit) -> Self {
        Self::new(ErrorKind::LimitExceeded(limit))
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }

    /// Returns the captured output carried by an invocation error, if any.
    #[must_use]
    pub fn captured_output(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::Invocation { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// The input byte sequence is not a valid, parseable class file.
    #[error("malformed class file at offset {offset}: {message}")]
    MalformedClass {
        /// Description of the structural problem.
        message: String,
        /// Byte offset where parsing failed.
        offset: usize,
    },

    /// A constant rewrite would violate container structural consistency.
    #[error("redirection failed: {message}")]
    Redirection {
        /// Description of the consistency violation.
        message: String,
    },

    /// The loader cannot admit the class into an execution context.
    #[error("load failed: {message}")]
    Load {
        /// Description of the load failure.
        message: String,
    },

    /// No accessible `main`-shaped entry point was found.
    #[error("no entry point in {class}: {message}")]
    EntryPoint {
        /// Internal name of the class that was searched.
        class: String,
        /// What was wrong with the candidate (missing, wrong signature, ...).
        message: String,
    },

    /// The entry point itself raised an error during execution.
    ///
    /// Carries everything captured up to and including the failure
    /// diagnostic, so callers can still inspect partial output.
    #[error("invocation failed: {message}")]
    Invocation {
        /// Description of the runtime failure.
        message: String,
        /// The drained capture buffer, diagnostic trace included.
        output: String,
    },

    /// An execution limit (kill switch) was exceeded.
    #[error("limit exceeded: {0}")]
    LimitExceeded(ExecutionLimit),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Execution limits (kill switches) that can be exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionLimit {
    /// Maximum interpreter call depth exceeded.
    MaxCallDepth {
        /// The configured limit.
        limit: usize,
    },
    /// Opt-in instruction budget exhausted.
    MaxInstructions {
        /// The configured limit.
        limit: u64,
    },
}

impl std::fmt::Display for ExecutionLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MaxCallDepth { limit } => {
                write!(f, "max call depth ({limit}) exceeded")
            }
            Self::MaxInstructions { limit } => {
                write!(f, "max instructions ({limit}) exceeded")
            }
        }
    }
}
