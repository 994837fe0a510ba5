use async_trait::async_trait;

use super::{association::Association, error::StorageError};

/// Stored counter value next to the cardinality recomputed from the join table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterReport {
    pub owner: i32,
    pub stored: i64,
    pub actual: i64,
}

impl CounterReport {
    pub fn is_consistent(&self) -> bool {
        self.stored == self.actual
    }
}

/// A relational backend able to run relation changes transactionally.
///
/// Reads issued through `Storage` never observe the effects of a transaction
/// that has not committed.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    type Tx: StorageTx;

    async fn begin(&self) -> Result<Self::Tx, StorageError>;

    async fn contains(
        &self,
        association: &'static Association,
        owner: i32,
        member: i32,
    ) -> Result<bool, StorageError>;

    /// Number of rows for `owner`.
    async fn count_by_owner(
        &self,
        association: &'static Association,
        owner: i32,
    ) -> Result<i64, StorageError>;

    /// Number of rows pointing at `member`.
    async fn count_by_member(
        &self,
        association: &'static Association,
        member: i32,
    ) -> Result<i64, StorageError>;

    /// Subset of `owners` related to `member`.
    async fn owners_with_member(
        &self,
        association: &'static Association,
        member: i32,
        owners: &[i32],
    ) -> Result<Vec<i32>, StorageError>;

    /// Current counter value, `None` when the owner row does not exist.
    async fn read_counter(
        &self,
        association: &'static Association,
        owner: i32,
    ) -> Result<Option<i64>, StorageError>;

    /// Every owner whose stored counter differs from its row count.
    async fn counter_drift(
        &self,
        association: &'static Association,
    ) -> Result<Vec<CounterReport>, StorageError>;
}

/// An open transaction. Dropping it without `commit` rolls it back.
#[async_trait]
pub trait StorageTx: Send + Sized {
    /// Inserts the link unless present. Returns whether a row was inserted.
    async fn insert_link(
        &mut self,
        association: &'static Association,
        owner: i32,
        member: i32,
    ) -> Result<bool, StorageError>;

    /// Deletes the link if present. Returns whether a row was deleted.
    async fn delete_link(
        &mut self,
        association: &'static Association,
        owner: i32,
        member: i32,
    ) -> Result<bool, StorageError>;

    /// Adds `delta` to the owner's counter inside the storage engine and
    /// returns the value it now holds.
    async fn adjust_counter(
        &mut self,
        association: &'static Association,
        owner: i32,
        delta: i32,
    ) -> Result<i64, StorageError>;

    async fn commit(self) -> Result<(), StorageError>;

    async fn rollback(self) -> Result<(), StorageError>;
}
