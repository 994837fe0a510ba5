use std::sync::Arc;

use tracing::instrument;

use super::{
    association::FAVORITED_USERS,
    error::RelationError,
    storage::Storage,
    store::{RelationChange, RelationStore},
};
use crate::models::{Article, User};

/// Article favorites. The only writer of `articles.favorites_count`.
pub struct FavoriteEngine<S> {
    store: Arc<RelationStore<S>>,
}

impl<S> Clone for FavoriteEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Storage> FavoriteEngine<S> {
    pub fn new(store: Arc<RelationStore<S>>) -> Self {
        Self { store }
    }

    /// Favorites `article` for `user`. Repeating the call is a no-op.
    ///
    /// Once the change has committed and actually inserted a row,
    /// `article.favorites_count` is set to the counter the transaction wrote.
    #[instrument(name = "favorite.add", skip_all, fields(article_id = article.id, user_id = user.id))]
    pub async fn add_favorite(&self, article: &mut Article, user: &User) -> Result<(), RelationError> {
        let outcome = self
            .store
            .apply(RelationChange::attach(&FAVORITED_USERS, article.id, user.id))
            .await?;

        if outcome.is_changed() {
            sync_count(article, outcome.counter());
            tracing::info!(article_id = article.id, user_id = user.id, "Article favorited");
        }

        Ok(())
    }

    /// Removes the favorite if present. Removing a missing favorite is a no-op.
    #[instrument(name = "favorite.remove", skip_all, fields(article_id = article.id, user_id = user.id))]
    pub async fn remove_favorite(
        &self,
        article: &mut Article,
        user: &User,
    ) -> Result<(), RelationError> {
        let outcome = self
            .store
            .apply(RelationChange::detach(&FAVORITED_USERS, article.id, user.id))
            .await?;

        if outcome.is_changed() {
            sync_count(article, outcome.counter());
            tracing::info!(article_id = article.id, user_id = user.id, "Article unfavorited");
        }

        Ok(())
    }

    #[instrument(name = "favorite.is_favorited", skip_all, fields(article_id = article.id, user_id = user.id))]
    pub async fn is_favorited(&self, article: &Article, user: &User) -> Result<bool, RelationError> {
        self.store
            .is_related(&FAVORITED_USERS, article.id, user.id)
            .await
    }

    /// Which of `article_ids` the user has favorited.
    #[instrument(name = "favorite.favorited_among", skip(self, article_ids))]
    pub async fn favorited_among(
        &self,
        user_id: i32,
        article_ids: &[i32],
    ) -> Result<Vec<i32>, RelationError> {
        self.store
            .owners_with_member(&FAVORITED_USERS, user_id, article_ids)
            .await
    }
}

// The stored counter is range-checked to 0..=i32::MAX by the storage engine.
fn sync_count(article: &mut Article, counter: Option<i64>) {
    if let Some(value) = counter.and_then(|c| i32::try_from(c).ok()) {
        article.favorites_count = value;
    }
}
