use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::{AppState, error::AppError};

/// The authenticated caller. Rejects the request when no valid token is sent.
pub struct AuthUser(pub i32);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts)?;
        let user_id = state.auth_service.validate_token(token)?;
        Ok(AuthUser(user_id))
    }
}

/// The caller if a valid token was sent, anonymous otherwise.
pub struct OptionalAuthUser(pub Option<i32>);

impl FromRequestParts<AppState> for OptionalAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = extract_token(parts)
            .ok()
            .and_then(|token| state.auth_service.validate_token(token).ok());
        Ok(OptionalAuthUser(user_id))
    }
}

fn extract_token(parts: &Parts) -> Result<&str, AppError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    parse_authorization(auth_header).ok_or(AppError::Unauthorized)
}

fn parse_authorization(header: &str) -> Option<&str> {
    header
        .strip_prefix("Token ")
        .or_else(|| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
