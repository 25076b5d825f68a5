//! Error types for the Stratum system.
//!
//! Errors are `thiserror` derives with optional free-text context.

use thiserror::Error;

use crate::id::Id;

/// The main error type for Stratum operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Optional description of the operation that failed.
    pub context: Option<String>,
}

impl Error {
    /// Wraps a kind with no context.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Attaches a note describing where the error happened.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Creates a dead-entity error.
    #[must_use]
    pub fn not_alive(id: Id) -> Self {
        Self::new(ErrorKind::NotAlive(id))
    }

    /// Creates an argument-count error.
    #[must_use]
    pub fn too_many_arguments(max: usize, actual: usize) -> Self {
        Self::new(ErrorKind::TooManyArguments { max, actual })
    }

    /// Creates a malformed-query error.
    #[must_use]
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidQuery(message.into()))
    }

    /// Creates an invalid-id error.
    #[must_use]
    pub fn invalid_id(id: Id) -> Self {
        Self::new(ErrorKind::InvalidId(id))
    }

    /// Creates an internal invariant error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }

    /// Returns true if this error reports a dead id.
    #[must_use]
    pub fn is_not_alive(&self) -> bool {
        matches!(self.kind, ErrorKind::NotAlive(_))
    }
}

/// What went wrong.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The id is dead, stale, or was never created.
    #[error("entity is not alive: {0:?}")]
    NotAlive(Id),

    /// More ids were passed than a multi-id operation supports.
    #[error("too many arguments: at most {max} supported, got {actual}")]
    TooManyArguments {
        /// The supported maximum.
        max: usize,
        /// The number of ids passed.
        actual: usize,
    },

    /// A query filter is malformed.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A wildcard or null id was used where a concrete id is required.
    #[error("invalid id: {0:?}")]
    InvalidId(Id),

    /// The low component id range is exhausted.
    #[error("component limit reached: {limit}")]
    ComponentLimit {
        /// The configured component range size.
        limit: u32,
    },

    /// The entity index space is exhausted.
    #[error("entity capacity exceeded: {limit}")]
    CapacityExceeded {
        /// The largest index an id can carry.
        limit: u32,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A broken internal invariant.
    #[error("internal error: {0}")]
    Internal(String),
}
