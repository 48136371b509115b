use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{PublicUser, User},
    session::Session,
    views::Page,
};

/// get_users
///
/// [Admin] Lists every account, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_users(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.repo.list_users().await?))
}

/// get_user
///
/// Looks a profile up by username (case-insensitive). Only the public fields are returned.
#[utoipa::path(
    get,
    path = "/api/v1/users/json/{username}",
    responses(
        (status = 200, description = "Public profile", body = PublicUser),
        (status = 404, description = "Unknown username")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<PublicUser>> {
    state
        .repo
        .find_user_by_username(&username)
        .await?
        .map(|user| Json(PublicUser::from(user)))
        .ok_or_else(|| AppError::not_found("User not found"))
}

/// block_user
///
/// [Admin] Toggles the blocked flag of the user loaded by `validateUserById`.
/// Administrators cannot be blocked.
#[utoipa::path(
    patch,
    path = "/api/v1/users/block/{userId}",
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 400, description = "Malformed user id"),
        (status = 403, description = "Not an admin, or target is an admin"),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn block_user(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Extension(target): Extension<User>,
) -> AppResult<Json<User>> {
    if target.is_admin() {
        return Err(AppError::Forbidden("Administrators cannot be blocked".into()));
    }

    let user = state
        .repo
        .set_user_blocked(target.id, !target.is_blocked)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    tracing::info!(
        admin_id = %admin.id,
        user_id = %user.id,
        blocked = user.is_blocked,
        "user block state changed"
    );
    Ok(Json(user))
}

/// render_user_profile
///
/// Public profile page with the user's invites; the 404 view for unknown usernames.
pub async fn render_user_profile(
    State(state): State<AppState>,
    session: Session,
    Path(username): Path<String>,
) -> AppResult<Page> {
    let Some(user) = state.repo.find_user_by_username(&username).await? else {
        return Ok(Page::not_found(&session));
    };
    let invites = state.repo.list_invites_by_user(user.id).await?;

    Ok(Page::new("profile", &session)
        .with("profile", PublicUser::from(user))
        .with("invites", invites))
}

/// render_admin_users_page
///
/// The user list is only embedded for admin sessions.
pub async fn render_admin_users_page(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Page> {
    let users = if session.is_admin {
        state.repo.list_users().await?
    } else {
        Vec::new()
    };
    Ok(Page::new("admin/users", &session).with("users", users))
}
