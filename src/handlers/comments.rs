use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::AppResult,
    models::{Comment, CommentForm, Invite, NewNotification},
};

/// get_comments
///
/// Comments on an invite, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/comments/{inviteId}",
    responses(
        (status = 200, description = "Comments", body = [Comment]),
        (status = 400, description = "Malformed invite id")
    )
)]
pub async fn get_comments(
    State(state): State<AppState>,
    Path(invite_id): Path<Uuid>,
) -> AppResult<Json<Vec<Comment>>> {
    Ok(Json(state.repo.list_comments(invite_id).await?))
}

/// create_comment
///
/// [Authenticated] Posts a comment. The invite's owner is notified unless they
/// wrote the comment themselves.
#[utoipa::path(
    post,
    path = "/api/v1/comments/{inviteId}",
    request_body = CommentForm,
    responses(
        (status = 201, description = "Comment created", body = Comment),
        (status = 400, description = "Invalid comment or invite id"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Unknown invite")
    )
)]
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(invite): Extension<Invite>,
    Extension(form): Extension<CommentForm>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let comment = state
        .repo
        .create_comment(invite.id, user.id, form.comment)
        .await?;

    if invite.user_id != user.id {
        let notification = NewNotification {
            user_id: invite.user_id,
            invite_id: Some(invite.id),
            message: format!("{} commented on your invite \"{}\"", user.username, invite.title),
        };
        // Notification failures are logged, not returned.
        if let Err(err) = state.repo.create_notification(notification).await {
            tracing::warn!(error = %err, invite_id = %invite.id, "failed to notify invite owner");
        }
    }

    Ok((StatusCode::CREATED, Json(comment)))
}
