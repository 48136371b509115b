//! Twitter sign-in through the identity provider's OAuth PKCE flow.
//!
//! `passport_authenticate` stores the PKCE verifier in a short-lived HttpOnly
//! cookie scoped to `/auth/twitter` and sends the browser to the provider.
//! `passport_auth_callback` trades the returned code for the provider account,
//! links or creates the local profile and starts a session.

use axum::{
    Extension,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    auth::issue_token,
    config::Env,
    error::AppResult,
    guards::is_valid_username,
    identity::{ExternalIdentity, pkce_challenge, pkce_verifier},
    models::{NewUser, ROLE_USER, User},
    session::IssuedSession,
};

pub const VERIFIER_COOKIE: &str = "oauth_verifier";
const COOKIE_PATH: &str = "/auth/twitter";
const PROVIDER: &str = "twitter";
const NO_EMAIL_DOMAIN: &str = "twitter.invalid";

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

fn verifier_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((VERIFIER_COOKIE, value))
        .path(COOKIE_PATH)
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// passport_authenticate
///
/// Starts the Twitter OAuth flow.
#[utoipa::path(
    get,
    path = "/auth/twitter",
    responses((status = 303, description = "Redirect to the identity provider"))
)]
pub async fn passport_authenticate(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<Response> {
    let verifier = pkce_verifier();
    let redirect_to = format!(
        "{}/auth/twitter/callback",
        state.config.site_url.trim_end_matches('/')
    );
    let url = state
        .identity
        .authorize_url(PROVIDER, &redirect_to, &pkce_challenge(&verifier))?;

    let secure = state.config.env == Env::Production;
    Ok((jar.add(verifier_cookie(verifier, secure)), Redirect::to(&url)).into_response())
}

/// passport_auth_callback
///
/// Completes the Twitter OAuth flow. Any failure lands on `/login`.
#[utoipa::path(
    get,
    path = "/auth/twitter/callback",
    params(CallbackQuery),
    responses(
        (status = 303, description = "Signed in and sent to /posts, or sent back to /login")
    )
)]
pub async fn passport_auth_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let verifier = jar.get(VERIFIER_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(Cookie::build(VERIFIER_COOKIE).path(COOKIE_PATH).build());

    let (Some(code), Some(verifier)) = (query.code, verifier) else {
        if let Some(error) = query.error {
            tracing::info!(%error, "twitter sign-in cancelled by provider");
        }
        return (jar, Redirect::to("/login")).into_response();
    };

    match complete_sign_in(&state, &code, &verifier).await {
        Ok(Some(token)) => (
            jar,
            Extension(IssuedSession(token)),
            Redirect::to("/posts"),
        )
            .into_response(),
        Ok(None) => (jar, Redirect::to("/login")).into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "twitter sign-in failed");
            (jar, Redirect::to("/login")).into_response()
        }
    }
}

/// Returns the session token, or `None` when the linked account is blocked.
async fn complete_sign_in(
    state: &AppState,
    code: &str,
    verifier: &str,
) -> AppResult<Option<String>> {
    let identity = state.identity.exchange_code(code, verifier).await?;
    let user = link_or_create(state, identity).await?;

    if user.is_blocked {
        tracing::info!(user_id = %user.id, "blocked user attempted twitter sign-in");
        return Ok(None);
    }
    Ok(Some(issue_token(&user, &state.config)?))
}

/// Resolves the local profile for a provider account.
///
/// Linking by e-mail only happens when the provider vouches for an address;
/// accounts without one are matched by provider id alone.
async fn link_or_create(state: &AppState, identity: ExternalIdentity) -> AppResult<User> {
    // 1. Returning user: the provider id is the profile id.
    if let Some(user) = state.repo.get_user(identity.id).await? {
        return Ok(user);
    }

    // 2. Existing password account with the same verified address.
    if let Some(email) = identity.email.as_deref() {
        if let Some(user) = state.repo.find_user_by_email(email).await? {
            return Ok(user);
        }
    }

    // 3. New profile. Address-less accounts get a unique, undeliverable placeholder.
    let username = available_username(state, &identity).await?;
    let email = identity
        .email
        .clone()
        .unwrap_or_else(|| placeholder_email(identity.id));
    let user = state
        .repo
        .create_user(NewUser {
            id: identity.id,
            username,
            email,
            role: ROLE_USER.to_string(),
        })
        .await?;
    tracing::info!(user_id = %user.id, "created profile from twitter account");
    Ok(user)
}

/// Stand-in address for provider accounts that have none. `.invalid` is a
/// reserved TLD, so it can never match a real signup.
pub fn placeholder_email(id: Uuid) -> String {
    format!("{}@{NO_EMAIL_DOMAIN}", id.simple())
}

/// Derives a valid username from the provider handle (or the e-mail local
/// part) and appends a numeric suffix until it is free.
async fn available_username(
    state: &AppState,
    identity: &ExternalIdentity,
) -> AppResult<String> {
    let source = identity
        .username
        .clone()
        .or_else(|| {
            let email = identity.email.as_deref()?;
            email.split('@').next().map(str::to_string)
        })
        .unwrap_or_else(|| "user".to_string());
    let mut base: String = source
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .take(24)
        .collect();
    while base.len() < 3 {
        base.push('_');
    }

    for suffix in 0..20u32 {
        let candidate = if suffix == 0 {
            base.clone()
        } else {
            format!("{base}{suffix}")
        };
        if is_valid_username(&candidate)
            && state.repo.find_user_by_username(&candidate).await?.is_none()
        {
            return Ok(candidate);
        }
    }

    Ok(format!("user_{}", &Uuid::new_v4().simple().to_string()[..12]))
}
