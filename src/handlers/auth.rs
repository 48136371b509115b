use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    auth::issue_token,
    error::{AppError, AppResult},
    identity::IdentityError,
    models::{AuthResponse, NewUser, ROLE_USER, SigninForm, SignupForm, User},
    session::IssuedSession,
};
use uuid::Uuid;

/// signin
///
/// Checks the password with the identity provider and starts a session for the
/// account loaded by `validUser`.
#[utoipa::path(
    post,
    path = "/api/v1/auth/signin",
    request_body = SigninForm,
    responses(
        (status = 200, description = "Signed in; the session cookie is set", body = AuthResponse),
        (status = 400, description = "Malformed form"),
        (status = 401, description = "Unknown email or wrong password"),
        (status = 403, description = "Account blocked")
    )
)]
pub async fn signin(
    State(state): State<AppState>,
    Extension(form): Extension<SigninForm>,
    Extension(user): Extension<User>,
) -> AppResult<impl IntoResponse> {
    let provider_id = state.identity.sign_in(&form.email, &form.password).await?;
    if provider_id != user.id {
        tracing::warn!(
            user_id = %user.id,
            %provider_id,
            "identity provider id does not match profile"
        );
        return Err(IdentityError::InvalidCredentials.into());
    }

    let token = issue_token(&user, &state.config)?;
    tracing::info!(user_id = %user.id, "user signed in");

    Ok((
        Extension(IssuedSession(token.clone())),
        Json(AuthResponse {
            message: "Signed in successfully".into(),
            token,
            user,
        }),
    ))
}

/// signup
///
/// Registers the credentials with the identity provider, then creates the local
/// profile under the provider's user id with the `user` role.
///
/// If the provider already holds these exact credentials but no profile exists
/// (an earlier signup failed after the provider step), the account is adopted
/// instead of being rejected.
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignupForm,
    responses(
        (
            status = 201,
            description = "Account created; the session cookie is set",
            body = AuthResponse
        ),
        (status = 400, description = "Malformed form or rejected by the identity provider"),
        (status = 409, description = "Email or username already taken")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Extension(form): Extension<SignupForm>,
) -> AppResult<impl IntoResponse> {
    let id = register_credentials(&state, &form).await?;

    let user = state
        .repo
        .create_user(NewUser {
            id,
            username: form.username,
            email: form.email,
            role: ROLE_USER.to_string(),
        })
        .await?;

    let token = issue_token(&user, &state.config)?;
    tracing::info!(user_id = %user.id, username = %user.username, "user signed up");

    Ok((
        StatusCode::CREATED,
        Extension(IssuedSession(token.clone())),
        Json(AuthResponse {
            message: "Account created successfully".into(),
            token,
            user,
        }),
    ))
}

/// Provider user id for the signup form.
///
/// 1. Fresh registration with the provider.
/// 2. On rejection, a password check proves the caller owns an existing provider
///    account; its id is reused when no local profile claims it yet.
async fn register_credentials(state: &AppState, form: &SignupForm) -> AppResult<Uuid> {
    let rejection = match state.identity.sign_up(&form.email, &form.password).await {
        Ok(id) => return Ok(id),
        Err(IdentityError::Rejected(reason)) => reason,
        Err(err) => return Err(err.into()),
    };

    let Ok(id) = state.identity.sign_in(&form.email, &form.password).await else {
        return Err(IdentityError::Rejected(rejection).into());
    };
    if state.repo.get_user(id).await?.is_some() {
        return Err(AppError::Conflict("Email is already in use".into()));
    }

    tracing::warn!(user_id = %id, "adopting provider account that has no profile");
    Ok(id)
}
