//! Single-process storage backend.
//!
//! Transactions are serialized: an open [`MemoryTx`] holds the table lock
//! until it commits or is dropped, and every mutation is recorded in an undo
//! log that is replayed on rollback. Faults can be injected at each step to
//! exercise the failure paths of the relation store.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    association::Association,
    error::StorageError,
    storage::{CounterReport, Storage, StorageTx},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Begin,
    InsertLink,
    DeleteLink,
    AdjustCounter,
    Commit,
    Rollback,
}

#[derive(Default)]
struct Tables {
    // table -> id -> counter column -> value
    rows: HashMap<&'static str, BTreeMap<i32, HashMap<&'static str, i64>>>,
    links: HashMap<&'static str, BTreeSet<(i32, i32)>>,
}

impl Tables {
    fn row_exists(&self, table: &str, id: i32) -> bool {
        self.rows.get(table).is_some_and(|rows| rows.contains_key(&id))
    }

    fn links(&self, association: &Association) -> impl Iterator<Item = &(i32, i32)> {
        self.links.get(association.table).into_iter().flatten()
    }
}

#[derive(Clone, Default)]
pub struct MemoryStorage {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Mutex<Vec<Fault>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an entity row with all counters at zero.
    pub async fn insert_row(&self, table: &'static str, id: i32) {
        self.tables
            .lock()
            .await
            .rows
            .entry(table)
            .or_default()
            .entry(id)
            .or_default();
    }

    /// Writes a counter directly, bypassing the relation store. Only useful
    /// to simulate drift.
    pub async fn overwrite_counter(
        &self,
        association: &'static Association,
        owner: i32,
        value: i64,
    ) -> Result<(), StorageError> {
        let column = counter_column(association)?;
        let mut tables = self.tables.lock().await;
        let row = tables
            .rows
            .get_mut(association.owner_table)
            .and_then(|rows| rows.get_mut(&owner))
            .ok_or(StorageError::MissingRow {
                table: association.owner_table,
                id: owner,
            })?;
        row.insert(column, value);
        Ok(())
    }

    /// Arms a one-shot failure at the given step.
    pub async fn inject_fault(&self, fault: Fault) {
        self.faults.lock().await.push(fault);
    }

    async fn take_fault(faults: &Mutex<Vec<Fault>>, fault: Fault) -> Result<(), StorageError> {
        let mut armed = faults.lock().await;
        match armed.iter().position(|f| *f == fault) {
            Some(index) => {
                armed.remove(index);
                Err(StorageError::Unavailable(format!("injected {fault:?} fault")))
            }
            None => Ok(()),
        }
    }
}

fn counter_column(association: &'static Association) -> Result<&'static str, StorageError> {
    association.counter_column.ok_or_else(|| {
        StorageError::Constraint(format!("{} has no counter column", association.name))
    })
}

#[async_trait]
impl Storage for MemoryStorage {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StorageError> {
        Self::take_fault(&self.faults, Fault::Begin).await?;

        let tables = self.tables.clone().lock_owned().await;

        Ok(MemoryTx {
            tables,
            undo: Vec::new(),
            faults: self.faults.clone(),
            finished: false,
        })
    }

    async fn contains(
        &self,
        association: &'static Association,
        owner: i32,
        member: i32,
    ) -> Result<bool, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .links
            .get(association.table)
            .is_some_and(|links| links.contains(&(owner, member))))
    }

    async fn count_by_owner(
        &self,
        association: &'static Association,
        owner: i32,
    ) -> Result<i64, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables.links(association).filter(|(o, _)| *o == owner).count() as i64)
    }

    async fn count_by_member(
        &self,
        association: &'static Association,
        member: i32,
    ) -> Result<i64, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables.links(association).filter(|(_, m)| *m == member).count() as i64)
    }

    async fn owners_with_member(
        &self,
        association: &'static Association,
        member: i32,
        owners: &[i32],
    ) -> Result<Vec<i32>, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .links(association)
            .filter(|(o, m)| *m == member && owners.contains(o))
            .map(|(o, _)| *o)
            .collect())
    }

    async fn read_counter(
        &self,
        association: &'static Association,
        owner: i32,
    ) -> Result<Option<i64>, StorageError> {
        let column = counter_column(association)?;
        let tables = self.tables.lock().await;
        Ok(tables
            .rows
            .get(association.owner_table)
            .and_then(|rows| rows.get(&owner))
            .map(|counters| counters.get(column).copied().unwrap_or(0)))
    }

    async fn counter_drift(
        &self,
        association: &'static Association,
    ) -> Result<Vec<CounterReport>, StorageError> {
        let column = counter_column(association)?;
        let tables = self.tables.lock().await;

        let mut actual: HashMap<i32, i64> = HashMap::new();
        for (owner, _) in tables.links(association) {
            *actual.entry(*owner).or_default() += 1;
        }

        Ok(tables
            .rows
            .get(association.owner_table)
            .into_iter()
            .flatten()
            .map(|(owner, counters)| CounterReport {
                owner: *owner,
                stored: counters.get(column).copied().unwrap_or(0),
                actual: actual.get(owner).copied().unwrap_or(0),
            })
            .filter(|report| !report.is_consistent())
            .collect())
    }
}

enum Undo {
    Inserted {
        table: &'static str,
        link: (i32, i32),
    },
    Deleted {
        table: &'static str,
        link: (i32, i32),
    },
    Adjusted {
        table: &'static str,
        column: &'static str,
        id: i32,
        delta: i64,
    },
}

pub struct MemoryTx {
    tables: OwnedMutexGuard<Tables>,
    undo: Vec<Undo>,
    faults: Arc<Mutex<Vec<Fault>>>,
    finished: bool,
}

impl MemoryTx {
    fn undo_all(&mut self) {
        while let Some(entry) = self.undo.pop() {
            match entry {
                Undo::Inserted { table, link } => {
                    if let Some(links) = self.tables.links.get_mut(table) {
                        links.remove(&link);
                    }
                }
                Undo::Deleted { table, link } => {
                    self.tables.links.entry(table).or_default().insert(link);
                }
                Undo::Adjusted {
                    table,
                    column,
                    id,
                    delta,
                } => {
                    if let Some(value) = self
                        .tables
                        .rows
                        .get_mut(table)
                        .and_then(|rows| rows.get_mut(&id))
                        .and_then(|counters| counters.get_mut(column))
                    {
                        *value -= delta;
                    }
                }
            }
        }
        self.finished = true;
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if !self.finished {
            self.undo_all();
        }
    }
}

#[async_trait]
impl StorageTx for MemoryTx {
    async fn insert_link(
        &mut self,
        association: &'static Association,
        owner: i32,
        member: i32,
    ) -> Result<bool, StorageError> {
        MemoryStorage::take_fault(&self.faults, Fault::InsertLink).await?;

        if !self.tables.row_exists(association.owner_table, owner) {
            return Err(StorageError::Constraint(format!(
                "{}.{} references missing {} row {}",
                association.table, association.owner_column, association.owner_table, owner
            )));
        }
        if !self.tables.row_exists(association.member_table, member) {
            return Err(StorageError::Constraint(format!(
                "{}.{} references missing {} row {}",
                association.table, association.member_column, association.member_table, member
            )));
        }

        let inserted = self
            .tables
            .links
            .entry(association.table)
            .or_default()
            .insert((owner, member));
        if inserted {
            self.undo.push(Undo::Inserted {
                table: association.table,
                link: (owner, member),
            });
        }

        Ok(inserted)
    }

    async fn delete_link(
        &mut self,
        association: &'static Association,
        owner: i32,
        member: i32,
    ) -> Result<bool, StorageError> {
        MemoryStorage::take_fault(&self.faults, Fault::DeleteLink).await?;

        let deleted = self
            .tables
            .links
            .get_mut(association.table)
            .is_some_and(|links| links.remove(&(owner, member)));
        if deleted {
            self.undo.push(Undo::Deleted {
                table: association.table,
                link: (owner, member),
            });
        }

        Ok(deleted)
    }

    async fn adjust_counter(
        &mut self,
        association: &'static Association,
        owner: i32,
        delta: i32,
    ) -> Result<i64, StorageError> {
        MemoryStorage::take_fault(&self.faults, Fault::AdjustCounter).await?;

        let column = counter_column(association)?;
        let counters = self
            .tables
            .rows
            .get_mut(association.owner_table)
            .and_then(|rows| rows.get_mut(&owner))
            .ok_or(StorageError::MissingRow {
                table: association.owner_table,
                id: owner,
            })?;

        let value = counters.entry(column).or_insert(0);
        let next = *value + i64::from(delta);
        if next < 0 || next > i64::from(i32::MAX) {
            return Err(StorageError::Constraint(format!(
                "{}.{column} out of range: {next}",
                association.owner_table
            )));
        }
        *value = next;

        self.undo.push(Undo::Adjusted {
            table: association.owner_table,
            column,
            id: owner,
            delta: i64::from(delta),
        });

        Ok(next)
    }

    async fn commit(mut self) -> Result<(), StorageError> {
        // a failed commit falls through to Drop, which rolls back
        MemoryStorage::take_fault(&self.faults, Fault::Commit).await?;

        self.undo.clear();
        self.finished = true;
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), StorageError> {
        // a failed rollback leaves the undo log to Drop, like a dropped connection
        MemoryStorage::take_fault(&self.faults, Fault::Rollback).await?;

        self.undo_all();
        Ok(())
    }
}
