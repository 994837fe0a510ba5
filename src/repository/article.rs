use sqlx::PgPool;
use tracing::instrument;

use crate::models::Article;

/// Read-only article lookups. `favorites_count` is written by the favorite
/// engine alone.
#[derive(Clone)]
pub struct ArticleRepository {
    pool: PgPool,
}

impl ArticleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(name = "db.article.find_by_slug", skip(self))]
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Article>, sqlx::Error> {
        sqlx::query_as::<_, Article>(
            r#"
            SELECT id, slug, title, description, body, author_id, favorites_count, created_at, updated_at
            FROM articles
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
    }

    #[instrument(name = "db.article.find_by_id", skip(self))]
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Article>, sqlx::Error> {
        sqlx::query_as::<_, Article>(
            r#"
            SELECT id, slug, title, description, body, author_id, favorites_count, created_at, updated_at
            FROM articles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}
