use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    models::{ROLE_ADMIN, User},
    repository::RepositoryState,
    session::SESSION_COOKIE,
};

/// Claims
///
/// Payload of the session JWT issued at signin/signup and carried either as a
/// Bearer token or in the `token` cookie. Signed with `JWT_SECRET` (HS256).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's id, shared with the identity provider.
    pub sub: Uuid,
    /// Copied into the token so page views can show the navbar without a lookup.
    pub username: String,
    /// Role at issue time. Authorization re-reads the role from the database.
    pub role: String,
    /// Expiration time (exp): `iat` plus `SESSION_TTL_HOURS`.
    pub exp: usize,
    /// Issued at (iat).
    pub iat: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// Signs a session token for `user` valid for the configured TTL.
pub fn issue_token(user: &User, config: &AppConfig) -> Result<String, AppError> {
    let now = Utc::now();
    let expires = now + Duration::hours(config.session_ttl_hours);
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        role: user.role.clone(),
        iat: usize::try_from(now.timestamp()).unwrap_or_default(),
        exp: usize::try_from(expires.timestamp()).unwrap_or_default(),
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?)
}

/// Validates signature and expiry. Any failure yields `None`.
pub fn decode_token(token: &str, secret: &str) -> Option<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|err| tracing::debug!(error = %err, "rejected session token"))
    .ok()
}

/// AuthUser
///
/// The resolved identity of an authenticated request, produced by the
/// `authenticateUserToken` guard.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

/// Looks for the token in `Authorization: Bearer ...` first, then in the session cookie.
fn token_from_parts(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string);

    bearer.or_else(|| {
        CookieJar::from_headers(&parts.headers)
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
    })
}

/// AuthUser Extractor Implementation
///
/// Usable directly as a handler argument, and run by the `authenticateUserToken`
/// guard through `extract_parts_with_state`.
///
/// 1. Dependency resolution: repository and config from the application state.
/// 2. Local bypass: in `Env::Local` an `x-user-id` header naming an existing user is accepted.
/// 3. Token: Bearer header or session cookie, decoded with the configured secret.
/// 4. DB lookup: the user must still exist and must not be blocked.
///
/// Rejection: 401 for a missing, invalid or orphaned token; 403 for a blocked account.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    // The repository resolves the token's subject to a live account.
    RepositoryState: FromRef<S>,
    // The config carries the JWT secret and the environment for the bypass check.
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 1. Dependency Resolution
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // 2. Local Development Bypass: never honoured outside `Env::Local`.
        let bypass_id = (config.env == Env::Local)
            .then(|| parts.headers.get("x-user-id"))
            .flatten()
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| Uuid::parse_str(raw).ok());

        // 3. Token Validation: Bearer header first, then the session cookie.
        let user_id = match bypass_id {
            Some(id) => id,
            None => {
                let token = token_from_parts(parts).ok_or_else(|| {
                    AppError::Unauthorized("Authentication token is missing".into())
                })?;
                decode_token(&token, &config.jwt_secret)
                    .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".into()))?
                    .sub
            }
        };

        // 4. DB Lookup: the token alone is not enough; the account must still
        // exist and may have been blocked since the token was issued.
        let user = repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".into()))?;

        if user.is_blocked {
            return Err(AppError::Forbidden("This account has been blocked".into()));
        }

        Ok(user.into())
    }
}
