use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    models::{Article, ArticleDto, ArticleResponse, ProfileDto, User},
    relation::{FAVORITED_USERS, PgStorage, Relations},
    repository::{ArticleRepository, UserRepository},
};

#[derive(Clone)]
pub struct ArticleService {
    article_repo: ArticleRepository,
    user_repo: UserRepository,
    relations: Relations<PgStorage>,
}

impl ArticleService {
    pub fn new(
        article_repo: ArticleRepository,
        user_repo: UserRepository,
        relations: Relations<PgStorage>,
    ) -> Self {
        Self {
            article_repo,
            user_repo,
            relations,
        }
    }

    #[instrument(name = "article.get", skip(self))]
    pub async fn get(&self, slug: &str, viewer: Option<i32>) -> AppResult<ArticleResponse> {
        let article = self.load_article(slug).await?;

        self.render(article, viewer).await
    }

    #[instrument(name = "article.favorite", skip(self))]
    pub async fn favorite(&self, slug: &str, user_id: i32) -> AppResult<ArticleResponse> {
        let mut article = self.load_article(slug).await?;
        let user = self.load_user(user_id).await?;

        self.relations
            .favorites
            .add_favorite(&mut article, &user)
            .await?;

        self.render(article, Some(user_id)).await
    }

    #[instrument(name = "article.unfavorite", skip(self))]
    pub async fn unfavorite(&self, slug: &str, user_id: i32) -> AppResult<ArticleResponse> {
        let mut article = self.load_article(slug).await?;
        let user = self.load_user(user_id).await?;

        self.relations
            .favorites
            .remove_favorite(&mut article, &user)
            .await?;

        self.render(article, Some(user_id)).await
    }

    async fn load_article(&self, slug: &str) -> AppResult<Article> {
        self.article_repo
            .find_by_slug(slug)
            .await?
            .ok_or(AppError::NotFound("Article not found".to_string()))
    }

    async fn load_user(&self, user_id: i32) -> AppResult<User> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound("User not found".to_string()))
    }

    /// Re-reads the favorite state and the author's follow state for `viewer`.
    async fn render(&self, article: Article, viewer: Option<i32>) -> AppResult<ArticleResponse> {
        let favorites = self
            .relations
            .checker
            .snapshot(&FAVORITED_USERS, article.id, viewer)
            .await?;

        let author = self
            .user_repo
            .find_by_id(article.author_id)
            .await?
            .ok_or(AppError::NotFound("Author not found".to_string()))?;

        let following = match viewer {
            Some(viewer_id) => {
                self.relations
                    .follows
                    .is_following_id(viewer_id, author.id)
                    .await?
            }
            None => false,
        };

        Ok(ArticleResponse {
            article: ArticleDto::new(
                article,
                favorites.related,
                favorites.count,
                ProfileDto::from_user(&author, following),
            ),
        })
    }
}
