use std::sync::Arc;

use tracing::instrument;

use super::{
    association::FOLLOWS,
    error::RelationError,
    storage::Storage,
    store::{RelationChange, RelationStore},
};
use crate::models::User;

/// Directed follows between users. Follower and following totals are
/// counted from the join table when asked for; nothing is stored.
pub struct FollowEngine<S> {
    store: Arc<RelationStore<S>>,
}

impl<S> Clone for FollowEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Storage> FollowEngine<S> {
    pub fn new(store: Arc<RelationStore<S>>) -> Self {
        Self { store }
    }

    #[instrument(name = "follow.add", skip_all, fields(follower_id = follower.id, followed_id = followed.id))]
    pub async fn follow(&self, follower: &User, followed: &User) -> Result<(), RelationError> {
        if follower.id == followed.id {
            return Err(RelationError::SelfFollow(follower.id));
        }

        let outcome = self
            .store
            .apply(RelationChange::attach(&FOLLOWS, follower.id, followed.id))
            .await?;

        if outcome.is_changed() {
            tracing::info!(follower_id = follower.id, followed_id = followed.id, "User followed");
        }

        Ok(())
    }

    #[instrument(name = "follow.remove", skip_all, fields(follower_id = follower.id, followed_id = followed.id))]
    pub async fn unfollow(&self, follower: &User, followed: &User) -> Result<(), RelationError> {
        let outcome = self
            .store
            .apply(RelationChange::detach(&FOLLOWS, follower.id, followed.id))
            .await?;

        if outcome.is_changed() {
            tracing::info!(follower_id = follower.id, followed_id = followed.id, "User unfollowed");
        }

        Ok(())
    }

    pub async fn is_following(&self, follower: &User, followed: &User) -> Result<bool, RelationError> {
        self.is_following_id(follower.id, followed.id).await
    }

    /// Same as [`is_following`](Self::is_following) for callers that only
    /// hold ids, such as a viewer id taken from a token.
    #[instrument(name = "follow.is_following", skip(self))]
    pub async fn is_following_id(
        &self,
        follower_id: i32,
        followed_id: i32,
    ) -> Result<bool, RelationError> {
        self.store.is_related(&FOLLOWS, follower_id, followed_id).await
    }

    pub async fn follower_count(&self, user: &User) -> Result<i64, RelationError> {
        self.store.count_owners(&FOLLOWS, user.id).await
    }

    pub async fn following_count(&self, user: &User) -> Result<i64, RelationError> {
        self.store.count_members(&FOLLOWS, user.id).await
    }
}
