use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, AppResult},
    models::{NewNotification, Notification, NotificationForm},
};

#[utoipa::path(
    get,
    path = "/api/v1/notifications/{userId}",
    responses(
        (status = 200, description = "Notifications, newest first", body = [Notification]),
        (status = 400, description = "Malformed user id")
    )
)]
pub async fn get_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<Notification>>> {
    Ok(Json(state.repo.list_notifications(user_id).await?))
}

/// create_notification
///
/// The recipient must exist.
#[utoipa::path(
    post,
    path = "/api/v1/notifications",
    request_body = NotificationForm,
    responses(
        (status = 201, description = "Notification created", body = Notification),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Unknown recipient")
    )
)]
pub async fn create_notification(
    State(state): State<AppState>,
    Extension(form): Extension<NotificationForm>,
) -> AppResult<(StatusCode, Json<Notification>)> {
    if state.repo.get_user(form.user_id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let notification = state
        .repo
        .create_notification(NewNotification {
            user_id: form.user_id,
            invite_id: form.invite_id,
            message: form.message,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(notification)))
}
