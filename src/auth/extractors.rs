use axum::{async_trait, extract::FromRef, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use super::{claims::Claims, jwt::JwtKeys};
use crate::{error::ApiError, state::AppState, users::repo::UserRole};

/// Extracts and validates the bearer token, yielding the caller's claims.
pub struct AuthUser(pub Claims);

/// As [`AuthUser`], but additionally requires the admin role.
pub struct AdminUser(pub Claims);

fn claims_from_parts(parts: &Parts, state: &AppState) -> Result<Claims, ApiError> {
    let auth = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("auth token not present".into()))?;

    let token = auth
        .strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .ok_or_else(|| ApiError::Unauthorized("invalid auth scheme".into()))?;

    let keys = JwtKeys::from_ref(state);
    keys.verify(token).map_err(|_| {
        warn!("invalid or expired token");
        ApiError::Unauthorized("invalid or expired token".into())
    })
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        claims_from_parts(parts, state).map(AuthUser)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = claims_from_parts(parts, state)?;
        if claims.role != UserRole::Admin {
            return Err(ApiError::Forbidden(
                "Access denied. Only admins are allowed.".into(),
            ));
        }
        Ok(AdminUser(claims))
    }
}
