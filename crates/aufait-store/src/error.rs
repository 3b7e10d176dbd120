//! Store error taxonomy.

use std::fmt;

use crate::jsonl::JsonlError;

/// Which record family an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Job,
    Repository,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Job => f.write_str("job"),
            RecordKind::Repository => f.write_str("repository"),
        }
    }
}

/// Errors raised by `JobStore` / `RepositoryStore` implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} not found: {key}")]
    NotFound { kind: RecordKind, key: String },

    #[error("{kind} already exists: {key}")]
    AlreadyExists { kind: RecordKind, key: String },

    /// The caller's copy is stale: someone else updated the record first.
    #[error("{kind} {key} was modified concurrently (expected revision {expected}, found {actual})")]
    Conflict {
        kind: RecordKind,
        key: String,
        expected: u64,
        actual: u64,
    },

    #[error(transparent)]
    Jsonl(#[from] JsonlError),

    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(kind: RecordKind, key: impl ToString) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub fn already_exists(kind: RecordKind, key: impl ToString) -> Self {
        Self::AlreadyExists {
            kind,
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
