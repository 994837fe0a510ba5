use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use super::ProfileDto;

#[derive(Debug, Clone, FromRow)]
pub struct Article {
    pub id: i32,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub author_id: i32,
    pub favorites_count: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    pub article: ArticleDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDto {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub favorited: bool,
    pub favorites_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub author: ProfileDto,
}

impl ArticleDto {
    pub fn new(article: Article, favorited: bool, favorites_count: i64, author: ProfileDto) -> Self {
        Self {
            slug: article.slug,
            title: article.title,
            description: article.description,
            body: article.body,
            favorited,
            favorites_count,
            created_at: article.created_at,
            updated_at: article.updated_at,
            author,
        }
    }
}
