use std::sync::Arc;

use tracing::instrument;

use super::{
    association::Association,
    error::RelationError,
    storage::{CounterReport, Storage},
    store::RelationStore,
};

/// Relation state as a response should render it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationSnapshot {
    pub related: bool,
    pub count: i64,
}

/// Read-side view over a relation store: recomputes membership and
/// cardinality and compares them with stored counters.
///
/// Stored counters are trusted when rendering. A mismatch is reported,
/// never repaired.
pub struct ConsistencyChecker<S> {
    store: Arc<RelationStore<S>>,
}

impl<S> Clone for ConsistencyChecker<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Storage> ConsistencyChecker<S> {
    pub fn new(store: Arc<RelationStore<S>>) -> Self {
        Self { store }
    }

    #[instrument(name = "relation.check", skip(self, association), fields(association = association.name))]
    pub async fn check(
        &self,
        association: &'static Association,
        owner: i32,
    ) -> Result<CounterReport, RelationError> {
        let stored = self.store.stored_counter(association, owner).await?;
        let actual = self.store.count_members(association, owner).await?;

        let report = CounterReport {
            owner,
            stored,
            actual,
        };

        if !report.is_consistent() {
            tracing::warn!(owner, stored, actual, "Counter drift detected");
        }

        Ok(report)
    }

    /// Every owner of `association` whose counter has drifted.
    #[instrument(name = "relation.scan", skip(self, association), fields(association = association.name))]
    pub async fn scan(
        &self,
        association: &'static Association,
    ) -> Result<Vec<CounterReport>, RelationError> {
        self.store.drift(association).await
    }

    /// Whether the link `owner -> viewer` exists, and how many members
    /// `owner` has. For [`FOLLOWS`](super::FOLLOWS) this asks whether `owner`
    /// follows `viewer`; for [`FAVORITED_USERS`](super::FAVORITED_USERS),
    /// whether `viewer` has favorited article `owner`. Anonymous viewers are
    /// never related.
    pub async fn snapshot(
        &self,
        association: &'static Association,
        owner: i32,
        viewer: Option<i32>,
    ) -> Result<RelationSnapshot, RelationError> {
        let related = match viewer {
            Some(member) => self.store.is_related(association, owner, member).await?,
            None => false,
        };

        let count = if association.is_counted() {
            self.store.stored_counter(association, owner).await?
        } else {
            self.store.count_members(association, owner).await?
        };

        Ok(RelationSnapshot { related, count })
    }
}
