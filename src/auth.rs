//! Bearer token gate for the administrative routes.
//!
//! | Condition | Status |
//! |-----------|--------|
//! | no `Authorization: Bearer <token>` header | 401 |
//! | bad signature, malformed or expired token | 403 |
//!
//! On success the decoded claims are stored in the request extensions as a
//! [`CurrentUser`] and the request proceeds.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use common::{Claims, TokenService};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::schemas::AppState;

/// Caller identity decoded from a validated bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
    pub is_admin: bool,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub.parse().unwrap_or_default(),
            username: claims.username,
            is_admin: claims.is_admin,
        }
    }
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(TokenService::extract_from_header)
        .ok_or_else(|| {
            warn!(uri = %req.uri(), "Missing bearer token");
            AppError::Unauthorized("Missing bearer token".to_string())
        })?;

    let claims = state.tokens.validate(token).map_err(|e| {
        warn!(uri = %req.uri(), "Rejected bearer token: {}", e);
        AppError::Forbidden(e.to_string())
    })?;

    let current = CurrentUser::from(claims);
    debug!(
        user_id = current.id,
        username = %current.username,
        is_admin = current.is_admin,
        "Bearer token accepted"
    );
    req.extensions_mut().insert(current);
    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))
    }
}
