use std::fmt;

use thiserror::Error;

/// Failure reported by a storage backend.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("No row in {table} with id {id}")]
    MissingRow { table: &'static str, id: i32 },

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Association,
    Counter,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Association => f.write_str("association"),
            Stage::Counter => f.write_str("counter"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPhase {
    Begin,
    Commit,
    Rollback,
}

impl fmt::Display for TxPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxPhase::Begin => f.write_str("begin"),
            TxPhase::Commit => f.write_str("commit"),
            TxPhase::Rollback => f.write_str("rollback"),
        }
    }
}

#[derive(Error, Debug)]
pub enum RelationError {
    #[error("{association}: association mutation failed: {source}")]
    Association {
        association: &'static str,
        #[source]
        source: StorageError,
    },

    #[error("{association}: counter update failed: {source}")]
    Counter {
        association: &'static str,
        #[source]
        source: StorageError,
    },

    #[error("Transaction {phase} failed: {source}")]
    Transaction {
        phase: TxPhase,
        #[source]
        source: StorageError,
    },

    #[error("Relation read failed: {0}")]
    Read(#[source] StorageError),

    #[error("{0} has no counter column")]
    Uncounted(&'static str),

    #[error("User {0} cannot follow themself")]
    SelfFollow(i32),
}

impl RelationError {
    /// The mutation stage that failed, for errors raised inside a change.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RelationError::Association { .. } => Some(Stage::Association),
            RelationError::Counter { .. } => Some(Stage::Counter),
            _ => None,
        }
    }

    /// Short label used as a metric attribute.
    pub fn kind(&self) -> &'static str {
        match self {
            RelationError::Association { .. } => "association",
            RelationError::Counter { .. } => "counter",
            RelationError::Transaction { .. } => "transaction",
            RelationError::Read(_) => "read",
            RelationError::Uncounted(_) => "uncounted",
            RelationError::SelfFollow(_) => "self_follow",
        }
    }
}
