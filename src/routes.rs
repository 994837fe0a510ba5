use axum::{
    Router,
    routing::{get, post},
};

use crate::{AppState, handlers};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/articles/{slug}", get(handlers::get_article))
        .route(
            "/api/articles/{slug}/favorite",
            post(handlers::favorite_article).delete(handlers::unfavorite_article),
        )
        .route("/api/profiles/{username}", get(handlers::get_profile))
        .route(
            "/api/profiles/{username}/follow",
            post(handlers::follow_user).delete(handlers::unfollow_user),
        )
        .with_state(state)
}
