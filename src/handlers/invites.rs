use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    guards::InviteSubmission,
    models::{Invite, InviteForm, InviteUpdate, ListQuery, SearchQuery, User, VoteType},
    session::Session,
    views::Page,
};

/// save_new_invite
///
/// [Authenticated] Creates an invite owned by the caller. An attached image is
/// stored first and its URL saved on the invite.
#[utoipa::path(
    post,
    path = "/api/v1/invites",
    request_body(
        content = InviteForm,
        description = "JSON, or multipart/form-data with an optional `image` file"
    ),
    responses(
        (status = 201, description = "Invite created", body = Invite),
        (status = 400, description = "Missing or invalid fields"),
        (status = 401, description = "Not authenticated"),
        (status = 413, description = "Image too large")
    )
)]
pub async fn save_new_invite(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(submission): Extension<InviteSubmission>,
) -> AppResult<(StatusCode, Json<Invite>)> {
    // 1. Store the image first so its URL can be saved on the row.
    let (image_key, image_url) = match submission.image {
        Some(image) => {
            let key = format!("invites/{}.{}", Uuid::new_v4(), image.extension());
            let url = state
                .storage
                .upload_image(&key, &image.content_type, image.bytes)
                .await?;
            (Some(key), Some(url))
        }
        None => (None, None),
    };

    // 2. Insert the row. A failed insert must not leave the image behind.
    let invite = match state
        .repo
        .create_invite(user.id, submission.invite, image_url)
        .await
    {
        Ok(invite) => invite,
        Err(err) => {
            if let Some(key) = image_key {
                discard_image(&state, &key).await;
            }
            return Err(err.into());
        }
    };

    tracing::info!(invite_id = %invite.id, user_id = %user.id, "invite created");
    Ok((StatusCode::CREATED, Json(invite)))
}

/// Best-effort removal of an uploaded image whose invite was never saved.
async fn discard_image(state: &AppState, key: &str) {
    match state.storage.delete_image(key).await {
        Ok(()) => tracing::info!(%key, "removed image of unsaved invite"),
        Err(err) => tracing::warn!(%key, error = %err, "orphaned invite image left in storage"),
    }
}

/// get_all_invites
///
/// Newest first, paged with `limit` (default 20, at most 100) and `offset`.
#[utoipa::path(
    get,
    path = "/api/v1/invites",
    params(ListQuery),
    responses((status = 200, description = "Invites", body = [Invite]))
)]
pub async fn get_all_invites(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Invite>>> {
    let (limit, offset) = query.window();
    Ok(Json(state.repo.list_invites(limit, offset).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/invites/search/json",
    params(SearchQuery),
    responses((status = 200, description = "Matching invites", body = [Invite]))
)]
pub async fn search_invites_api(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<Invite>>> {
    Ok(Json(state.repo.search_invites(&query).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/invites/{inviteId}",
    responses(
        (status = 200, description = "Invite", body = Invite),
        (status = 400, description = "Malformed invite id"),
        (status = 404, description = "Unknown invite")
    )
)]
pub async fn get_one_invite(
    State(state): State<AppState>,
    Path(invite_id): Path<Uuid>,
) -> AppResult<Json<Invite>> {
    state
        .repo
        .get_invite(invite_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Invite not found"))
}

/// update_invite
///
/// [Owner] Applies the fields checked by `validateInviteUpdateData`.
#[utoipa::path(
    put,
    path = "/api/v1/invites/{inviteId}",
    request_body = InviteUpdate,
    responses(
        (status = 200, description = "Updated invite", body = Invite),
        (status = 400, description = "Invalid update"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Unknown invite")
    )
)]
pub async fn update_invite(
    State(state): State<AppState>,
    Extension(invite): Extension<Invite>,
    Extension(update): Extension<InviteUpdate>,
) -> AppResult<Json<Invite>> {
    state
        .repo
        .update_invite(invite.id, update)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Invite not found"))
}

/// delete_invite
///
/// [Admin] Removes the invite and its comments.
#[utoipa::path(
    delete,
    path = "/api/v1/invites/{inviteId}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Unknown invite")
    )
)]
pub async fn delete_invite(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Extension(invite): Extension<Invite>,
) -> AppResult<StatusCode> {
    if !state.repo.delete_invite(invite.id).await? {
        return Err(AppError::not_found("Invite not found"));
    }
    tracing::info!(invite_id = %invite.id, admin_id = %admin.id, "invite deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// upvote_invite
///
/// Adds one to the counter named by `:voteType`.
#[utoipa::path(
    patch,
    path = "/api/v1/invites/upvote/{inviteId}/{voteType}",
    responses(
        (status = 200, description = "Invite with updated counters", body = Invite),
        (status = 400, description = "Malformed invite id or vote type"),
        (status = 404, description = "Unknown invite")
    )
)]
pub async fn upvote_invite(
    State(state): State<AppState>,
    Extension(invite): Extension<Invite>,
    Extension(vote): Extension<VoteType>,
) -> AppResult<Json<Invite>> {
    state
        .repo
        .vote_invite(invite.id, vote)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Invite not found"))
}

// --- Pages ---

pub async fn render_job_invites_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ListQuery>,
) -> AppResult<Page> {
    let (limit, offset) = query.window();
    let invites = state.repo.list_invites(limit, offset).await?;
    Ok(Page::new("posts", &session)
        .with("invites", invites)
        .with("limit", limit)
        .with("offset", offset))
}

/// render_single_post_page
///
/// Unknown or malformed ids render the 404 view rather than an error body.
pub async fn render_single_post_page(
    State(state): State<AppState>,
    session: Session,
    Path(invite_id): Path<String>,
) -> AppResult<Page> {
    let Ok(id) = Uuid::parse_str(&invite_id) else {
        return Ok(Page::not_found(&session));
    };
    let Some(invite) = state.repo.get_invite(id).await? else {
        return Ok(Page::not_found(&session));
    };
    let comments = state.repo.list_comments(id).await?;
    let is_owner = session.user_id == Some(invite.user_id);

    Ok(Page::new("post", &session)
        .with("invite", invite)
        .with("comments", comments)
        .with("isOwner", is_owner))
}

pub async fn render_search_results(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<SearchQuery>,
) -> AppResult<Page> {
    let invites = state.repo.search_invites(&query).await?;
    Ok(Page::new("search", &session)
        .with("q", query.q)
        .with("location", query.location)
        .with("invites", invites))
}

/// render_edit_invite_page
///
/// Owners get the edit form; anyone else is sent back to the invite.
pub async fn render_edit_invite_page(
    session: Session,
    Extension(invite): Extension<Invite>,
    Extension(user): Extension<User>,
) -> Response {
    if invite.user_id != user.id {
        return Redirect::to(&format!("/post/{}", invite.id)).into_response();
    }
    Page::new("editPost", &session)
        .with("invite", invite)
        .into_response()
}

pub async fn render_admin_job_invites_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ListQuery>,
) -> AppResult<Page> {
    let invites = if session.is_admin {
        let (limit, offset) = query.window();
        state.repo.list_invites(limit, offset).await?
    } else {
        Vec::new()
    };
    Ok(Page::new("admin/posts", &session).with("invites", invites))
}

/// render_user_post_page
///
/// The "post an invite" form for the profile loaded by `getUserByUserId`.
pub async fn render_user_post_page(session: Session, Extension(user): Extension<User>) -> Page {
    Page::new("userPost", &session).with("user", user)
}
