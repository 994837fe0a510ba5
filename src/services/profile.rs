use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    models::{ProfileDto, ProfileResponse, User},
    relation::{PgStorage, Relations},
    repository::UserRepository,
};

#[derive(Clone)]
pub struct ProfileService {
    user_repo: UserRepository,
    relations: Relations<PgStorage>,
}

impl ProfileService {
    pub fn new(user_repo: UserRepository, relations: Relations<PgStorage>) -> Self {
        Self {
            user_repo,
            relations,
        }
    }

    #[instrument(name = "profile.get", skip(self))]
    pub async fn get(&self, username: &str, viewer: Option<i32>) -> AppResult<ProfileResponse> {
        let user = self.load_by_username(username).await?;

        self.render(&user, viewer).await
    }

    #[instrument(name = "profile.follow", skip(self))]
    pub async fn follow(&self, username: &str, follower_id: i32) -> AppResult<ProfileResponse> {
        let followed = self.load_by_username(username).await?;
        let follower = self.load_by_id(follower_id).await?;

        self.relations.follows.follow(&follower, &followed).await?;

        self.render(&followed, Some(follower_id)).await
    }

    #[instrument(name = "profile.unfollow", skip(self))]
    pub async fn unfollow(&self, username: &str, follower_id: i32) -> AppResult<ProfileResponse> {
        let followed = self.load_by_username(username).await?;
        let follower = self.load_by_id(follower_id).await?;

        self.relations.follows.unfollow(&follower, &followed).await?;

        self.render(&followed, Some(follower_id)).await
    }

    async fn load_by_username(&self, username: &str) -> AppResult<User> {
        self.user_repo
            .find_by_username(username)
            .await?
            .ok_or(AppError::NotFound("Profile not found".to_string()))
    }

    async fn load_by_id(&self, user_id: i32) -> AppResult<User> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound("User not found".to_string()))
    }

    async fn render(&self, user: &User, viewer: Option<i32>) -> AppResult<ProfileResponse> {
        let following = match viewer {
            Some(viewer_id) => {
                self.relations
                    .follows
                    .is_following_id(viewer_id, user.id)
                    .await?
            }
            None => false,
        };
        let followers = self.relations.follows.follower_count(user).await?;

        Ok(ProfileResponse {
            profile: ProfileDto::from_user(user, following).with_followers_count(followers),
        })
    }
}
