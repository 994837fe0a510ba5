use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    AppState,
    error::AppResult,
    middleware::{AuthUser, OptionalAuthUser},
    models::ArticleResponse,
};

pub async fn get_article(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Path(slug): Path<String>,
) -> AppResult<Json<ArticleResponse>> {
    let response = state.article_service.get(&slug, viewer).await?;

    Ok(Json(response))
}

pub async fn favorite_article(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(slug): Path<String>,
) -> AppResult<Json<ArticleResponse>> {
    let response = state.article_service.favorite(&slug, user_id).await?;

    Ok(Json(response))
}

pub async fn unfavorite_article(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(slug): Path<String>,
) -> AppResult<Json<ArticleResponse>> {
    let response = state.article_service.unfavorite(&slug, user_id).await?;

    Ok(Json(response))
}
