//! Transactional many-to-many relations with optional denormalized counters.
//!
//! [`RelationStore`] applies one link change and its counter delta in a
//! single storage transaction. [`FavoriteEngine`] and [`FollowEngine`] are the
//! only callers allowed to mutate relations, and [`ConsistencyChecker`]
//! reads them back.

pub mod association;
mod checker;
mod error;
mod favorite;
mod follow;
pub mod memory;
pub mod postgres;
mod storage;
mod store;

use std::sync::Arc;

pub use association::{Association, FAVORITED_USERS, FOLLOWS};
pub use checker::{ConsistencyChecker, RelationSnapshot};
pub use error::{RelationError, Stage, StorageError, TxPhase};
pub use favorite::FavoriteEngine;
pub use follow::FollowEngine;
pub use memory::{Fault, MemoryStorage};
pub use postgres::PgStorage;
pub use storage::{CounterReport, Storage, StorageTx};
pub use store::{Mode, Outcome, RelationStore};

/// The engines and checker sharing one store.
pub struct Relations<S> {
    pub favorites: FavoriteEngine<S>,
    pub follows: FollowEngine<S>,
    pub checker: ConsistencyChecker<S>,
}

impl<S> Clone for Relations<S> {
    fn clone(&self) -> Self {
        Self {
            favorites: self.favorites.clone(),
            follows: self.follows.clone(),
            checker: self.checker.clone(),
        }
    }
}

impl<S: Storage> Relations<S> {
    pub fn new(storage: S) -> Self {
        let store = Arc::new(RelationStore::new(storage));
        Self {
            favorites: FavoriteEngine::new(store.clone()),
            follows: FollowEngine::new(store.clone()),
            checker: ConsistencyChecker::new(store),
        }
    }
}
