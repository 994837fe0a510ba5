use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    AppState,
    error::AppResult,
    middleware::{AuthUser, OptionalAuthUser},
    models::ProfileResponse,
};

pub async fn get_profile(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Path(username): Path<String>,
) -> AppResult<Json<ProfileResponse>> {
    let response = state.profile_service.get(&username, viewer).await?;

    Ok(Json(response))
}

pub async fn follow_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(username): Path<String>,
) -> AppResult<Json<ProfileResponse>> {
    let response = state.profile_service.follow(&username, user_id).await?;

    Ok(Json(response))
}

pub async fn unfollow_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(username): Path<String>,
) -> AppResult<Json<ProfileResponse>> {
    let response = state.profile_service.unfollow(&username, user_id).await?;

    Ok(Json(response))
}
