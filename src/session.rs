//! Cookie/session pre-pass applied to every request before routing.
//!
//! Layer order (outermost first): `validate_cookies`, `sign_user_in`,
//! `sign_user_out`. The layers wrap the fallback as well, so unmatched
//! requests see them too.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{Method, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    auth::{Claims, decode_token},
    config::{AppConfig, Env},
};

/// Name of the cookie holding the session JWT.
pub const SESSION_COOKIE: &str = "token";

pub const SIGN_OUT_PATH: &str = "/logout";

/// Session
///
/// What the page handlers know about the visitor, decoded from the session
/// cookie by `validate_cookies`. Anonymous when the cookie is absent or invalid.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub is_auth: bool,
    pub is_admin: bool,
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
}

impl From<Claims> for Session {
    fn from(claims: Claims) -> Self {
        Self {
            is_auth: true,
            is_admin: claims.is_admin(),
            user_id: Some(claims.sub),
            username: Some(claims.username),
        }
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Session>().cloned().unwrap_or_default())
    }
}

/// IssuedSession
///
/// Response extension a handler attaches after authenticating a user.
/// `sign_user_in` turns it into the session cookie.
#[derive(Debug, Clone)]
pub struct IssuedSession(pub String);

/// Builds the session cookie for `token`.
pub fn session_cookie(token: String, config: &AppConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.env == Env::Production)
        .build()
}

fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// True if an inner layer already wrote the session cookie.
fn sets_session_cookie(response: &Response) -> bool {
    let prefix = format!("{SESSION_COOKIE}=");
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with(&prefix))
}

/// validate_cookies
///
/// Decodes the session cookie into a `Session` request extension. A cookie that
/// fails validation is removed from the browser.
pub async fn validate_cookies(
    State(config): State<AppConfig>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let (session, stale) = match jar.get(SESSION_COOKIE) {
        None => (Session::default(), false),
        Some(cookie) => match decode_token(cookie.value(), &config.jwt_secret) {
            Some(claims) => (Session::from(claims), false),
            None => (Session::default(), true),
        },
    };

    request.extensions_mut().insert(session);
    let response = next.run(request).await;

    if stale && !sets_session_cookie(&response) {
        tracing::debug!("clearing invalid session cookie");
        return (jar.remove(removal_cookie()), response).into_response();
    }
    response
}

/// sign_user_in
///
/// Sets the session cookie when the handler issued a new session.
pub async fn sign_user_in(
    State(config): State<AppConfig>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    match response.extensions().get::<IssuedSession>().cloned() {
        Some(IssuedSession(token)) => {
            (jar.add(session_cookie(token, &config)), response).into_response()
        }
        None => response,
    }
}

/// sign_user_out
///
/// `GET /logout` clears the session cookie and sends the browser home.
pub async fn sign_user_out(jar: CookieJar, request: Request, next: Next) -> Response {
    if request.method() == Method::GET && request.uri().path() == SIGN_OUT_PATH {
        return (jar.remove(removal_cookie()), Redirect::to("/")).into_response();
    }
    next.run(request).await
}
