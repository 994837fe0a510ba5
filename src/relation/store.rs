use std::time::Instant;

use opentelemetry::KeyValue;
use tracing::instrument;

use super::{
    association::Association,
    error::{RelationError, StorageError, TxPhase},
    storage::{CounterReport, Storage, StorageTx},
};
use crate::telemetry::{RELATION_CHANGES, RELATION_FAILURES, RELATION_TX_DURATION};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Attach,
    Detach,
}

impl Mode {
    pub fn delta(self) -> i32 {
        match self {
            Mode::Attach => 1,
            Mode::Detach => -1,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Mode::Attach => "attach",
            Mode::Detach => "detach",
        }
    }
}

/// One link to add or remove, and the delta its owner's counter receives
/// when the link actually changes.
#[derive(Debug, Clone, Copy)]
pub struct RelationChange {
    pub association: &'static Association,
    pub owner: i32,
    pub member: i32,
    pub delta: i32,
    pub mode: Mode,
}

impl RelationChange {
    pub fn attach(association: &'static Association, owner: i32, member: i32) -> Self {
        Self {
            association,
            owner,
            member,
            delta: Mode::Attach.delta(),
            mode: Mode::Attach,
        }
    }

    pub fn detach(association: &'static Association, owner: i32, member: i32) -> Self {
        Self {
            association,
            owner,
            member,
            delta: Mode::Detach.delta(),
            mode: Mode::Detach,
        }
    }
}

/// Result of a committed change. `counter` is the owner's counter as the
/// transaction left it, `None` for uncounted associations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Changed { counter: Option<i64> },
    Unchanged,
}

impl Outcome {
    pub fn is_changed(self) -> bool {
        matches!(self, Outcome::Changed { .. })
    }

    pub fn counter(self) -> Option<i64> {
        match self {
            Outcome::Changed { counter } => counter,
            Outcome::Unchanged => None,
        }
    }
}

/// Applies relation changes so that the join row and the owner's counter
/// move together or not at all.
///
/// The store takes no locks of its own. Isolation comes from the storage
/// transaction, and counters are adjusted by the storage engine rather than
/// read and written back, so concurrent changes on one owner cannot lose
/// updates. Nothing is retried.
pub struct RelationStore<S> {
    storage: S,
}

impl<S: Storage> RelationStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    #[instrument(
        name = "relation.apply",
        skip(self, change),
        fields(
            association = change.association.name,
            owner = change.owner,
            member = change.member,
            mode = change.mode.as_str(),
            changed = tracing::field::Empty,
        )
    )]
    pub(crate) async fn apply(&self, change: RelationChange) -> Result<Outcome, RelationError> {
        let start = Instant::now();
        let result = self.run(change).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let association_kv = KeyValue::new("relation.association", change.association.name);
        let mode_kv = KeyValue::new("relation.mode", change.mode.as_str());

        RELATION_TX_DURATION.record(elapsed_ms, &[association_kv.clone(), mode_kv.clone()]);

        match &result {
            Ok(outcome) => {
                tracing::Span::current().record("changed", outcome.is_changed());
                if outcome.is_changed() {
                    RELATION_CHANGES.add(1, &[association_kv, mode_kv]);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Relation change failed");
                RELATION_FAILURES.add(
                    1,
                    &[association_kv, mode_kv, KeyValue::new("relation.error", e.kind())],
                );
            }
        }

        result
    }

    async fn run(&self, change: RelationChange) -> Result<Outcome, RelationError> {
        let association = change.association;

        let mut tx = self
            .storage
            .begin()
            .await
            .map_err(|source| RelationError::Transaction {
                phase: TxPhase::Begin,
                source,
            })?;

        let linked = match change.mode {
            Mode::Attach => tx.insert_link(association, change.owner, change.member).await,
            Mode::Detach => tx.delete_link(association, change.owner, change.member).await,
        };
        let changed = match linked {
            Ok(changed) => changed,
            Err(source) => {
                rollback(tx).await;
                return Err(RelationError::Association {
                    association: association.name,
                    source,
                });
            }
        };

        let mut counter = None;
        if changed && association.is_counted() {
            match tx
                .adjust_counter(association, change.owner, change.delta)
                .await
            {
                Ok(value) => counter = Some(value),
                Err(source) => {
                    rollback(tx).await;
                    return Err(RelationError::Counter {
                        association: association.name,
                        source,
                    });
                }
            }
        }

        tx.commit()
            .await
            .map_err(|source| RelationError::Transaction {
                phase: TxPhase::Commit,
                source,
            })?;

        Ok(if changed {
            Outcome::Changed { counter }
        } else {
            Outcome::Unchanged
        })
    }

    pub async fn is_related(
        &self,
        association: &'static Association,
        owner: i32,
        member: i32,
    ) -> Result<bool, RelationError> {
        self.storage
            .contains(association, owner, member)
            .await
            .map_err(RelationError::Read)
    }

    pub async fn count_members(
        &self,
        association: &'static Association,
        owner: i32,
    ) -> Result<i64, RelationError> {
        self.storage
            .count_by_owner(association, owner)
            .await
            .map_err(RelationError::Read)
    }

    pub async fn count_owners(
        &self,
        association: &'static Association,
        member: i32,
    ) -> Result<i64, RelationError> {
        self.storage
            .count_by_member(association, member)
            .await
            .map_err(RelationError::Read)
    }

    pub async fn owners_with_member(
        &self,
        association: &'static Association,
        member: i32,
        owners: &[i32],
    ) -> Result<Vec<i32>, RelationError> {
        if owners.is_empty() {
            return Ok(Vec::new());
        }
        self.storage
            .owners_with_member(association, member, owners)
            .await
            .map_err(RelationError::Read)
    }

    pub async fn stored_counter(
        &self,
        association: &'static Association,
        owner: i32,
    ) -> Result<i64, RelationError> {
        if !association.is_counted() {
            return Err(RelationError::Uncounted(association.name));
        }
        self.storage
            .read_counter(association, owner)
            .await
            .map_err(RelationError::Read)?
            .ok_or(RelationError::Read(StorageError::MissingRow {
                table: association.owner_table,
                id: owner,
            }))
    }

    pub async fn drift(
        &self,
        association: &'static Association,
    ) -> Result<Vec<CounterReport>, RelationError> {
        if !association.is_counted() {
            return Err(RelationError::Uncounted(association.name));
        }
        self.storage
            .counter_drift(association)
            .await
            .map_err(RelationError::Read)
    }
}

async fn rollback<T: StorageTx>(tx: T) {
    if let Err(e) = tx.rollback().await {
        tracing::error!(
            error = %e,
            phase = %TxPhase::Rollback,
            "Rollback failed; the transaction is discarded with its connection"
        );
    }
}
