use axum::{
    RequestExt,
    extract::Request,
    response::{IntoResponse, Redirect},
};

use super::{GuardResult, reject, uuid_param};
use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    models::{SigninForm, SignupForm, User},
    session::Session,
};

/// The signin form must name an existing, unblocked account.
pub(super) async fn valid_user(state: &AppState, mut request: Request) -> GuardResult {
    let Some(form) = request.extensions().get::<SigninForm>() else {
        return Err(reject(AppError::bad_request("Email is required")));
    };

    let user = state
        .repo
        .find_user_by_email(&form.email)
        .await
        .map_err(|err| reject(err.into()))?
        .ok_or_else(|| reject(AppError::Unauthorized("Invalid email or password".into())))?;

    if user.is_blocked {
        return Err(reject(AppError::Forbidden(
            "This account has been blocked".into(),
        )));
    }

    request.extensions_mut().insert(user);
    Ok(request)
}

pub(super) async fn verify_unique_user_email(state: &AppState, request: Request) -> GuardResult {
    let Some(form) = request.extensions().get::<SignupForm>() else {
        return Err(reject(AppError::bad_request("Email is required")));
    };

    match state.repo.find_user_by_email(&form.email).await {
        Ok(None) => Ok(request),
        Ok(Some(_)) => Err(reject(AppError::Conflict("Email is already in use".into()))),
        Err(err) => Err(reject(err.into())),
    }
}

pub(super) async fn verify_unique_user_username(state: &AppState, request: Request) -> GuardResult {
    let Some(form) = request.extensions().get::<SignupForm>() else {
        return Err(reject(AppError::bad_request("Username is required")));
    };

    match state.repo.find_user_by_username(&form.username).await {
        Ok(None) => Ok(request),
        Ok(Some(_)) => Err(reject(AppError::Conflict(
            "Username is already taken".into(),
        ))),
        Err(err) => Err(reject(err.into())),
    }
}

/// Resolves the caller through the `AuthUser` extractor and stores it.
pub(super) async fn authenticate_user_token(state: &AppState, mut request: Request) -> GuardResult {
    let user = request
        .extract_parts_with_state::<AuthUser, _>(state)
        .await
        .map_err(reject)?;

    tracing::debug!(user_id = %user.id, "authenticated request");
    request.extensions_mut().insert(user);
    Ok(request)
}

pub(super) fn validate_admin(request: Request) -> GuardResult {
    match request.extensions().get::<AuthUser>() {
        Some(user) if user.is_admin() => Ok(request),
        Some(_) => Err(reject(AppError::Forbidden(
            "Admin access required".into(),
        ))),
        None => Err(reject(AppError::Unauthorized(
            "Authentication token is missing".into(),
        ))),
    }
}

pub(super) async fn validate_user_id(mut request: Request) -> GuardResult {
    uuid_param(&mut request, "userId", "Invalid user id")
        .await
        .map_err(reject)?;
    Ok(request)
}

pub(super) async fn validate_user_by_id(state: &AppState, mut request: Request) -> GuardResult {
    let id = uuid_param(&mut request, "userId", "Invalid user id")
        .await
        .map_err(reject)?;

    let user = state
        .repo
        .get_user(id)
        .await
        .map_err(|err| reject(err.into()))?
        .ok_or_else(|| reject(AppError::not_found("User not found")))?;

    request.extensions_mut().insert(user);
    Ok(request)
}

/// Page guard: loads the signed-in visitor's profile, or sends them to `/login`.
pub(super) async fn get_user_by_user_id(state: &AppState, mut request: Request) -> GuardResult {
    let session = request
        .extensions()
        .get::<Session>()
        .cloned()
        .unwrap_or_default();

    let Some(user_id) = session.user_id.filter(|_| session.is_auth) else {
        return Err(Redirect::to("/login").into_response());
    };

    let user: User = match state.repo.get_user(user_id).await {
        Ok(Some(user)) if !user.is_blocked => user,
        Ok(_) => return Err(Redirect::to("/login").into_response()),
        Err(err) => return Err(reject(err.into())),
    };

    request.extensions_mut().insert(user);
    Ok(request)
}
