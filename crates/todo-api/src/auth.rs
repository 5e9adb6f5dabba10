use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use shared::auth::AuthError;

use crate::error::ApiError;
use crate::AppState;

/// The authenticated caller, resolved from the bearer token before any
/// handler logic or store access runs.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthenticated("Missing authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthenticated("Invalid authorization header"))?;

        let claims = state.tokens.verify(token).map_err(|e| match e {
            AuthError::TokenExpired => ApiError::Unauthenticated("Token has expired"),
            _ => ApiError::Unauthenticated("Invalid token"),
        })?;

        let user_id = claims
            .sub
            .parse()
            .map_err(|_| ApiError::Unauthenticated("Invalid token"))?;

        Ok(AuthUser { user_id, username: claims.username })
    }
}
