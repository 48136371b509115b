use axum::extract::Request;

use super::{GuardResult, path_param, reject, uuid_param};
use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    models::{Invite, VoteType},
};

const INVALID_INVITE_ID: &str = "Invalid invite id";

pub(super) async fn validate_invite_id(mut request: Request) -> GuardResult {
    uuid_param(&mut request, "inviteId", INVALID_INVITE_ID)
        .await
        .map_err(reject)?;
    Ok(request)
}

/// Loads `:inviteId` and stores the `Invite` for the guards and handler after it.
pub(super) async fn validate_invite(state: &AppState, mut request: Request) -> GuardResult {
    let id = uuid_param(&mut request, "inviteId", INVALID_INVITE_ID)
        .await
        .map_err(reject)?;

    let invite = state
        .repo
        .get_invite(id)
        .await
        .map_err(|err| reject(err.into()))?
        .ok_or_else(|| reject(AppError::not_found("Invite not found")))?;

    request.extensions_mut().insert(invite);
    Ok(request)
}

pub(super) fn validate_invite_owner(request: Request) -> GuardResult {
    let extensions = request.extensions();
    let (Some(user), Some(invite)) = (extensions.get::<AuthUser>(), extensions.get::<Invite>())
    else {
        return Err(reject(AppError::Unauthorized(
            "Authentication token is missing".into(),
        )));
    };

    if invite.user_id != user.id {
        return Err(reject(AppError::Forbidden(
            "You can only modify your own invites".into(),
        )));
    }
    Ok(request)
}

pub(super) async fn validate_upvote_input(mut request: Request) -> GuardResult {
    uuid_param(&mut request, "inviteId", INVALID_INVITE_ID)
        .await
        .map_err(reject)?;

    let vote = path_param(&mut request, "voteType")
        .await
        .and_then(|raw| raw.parse::<VoteType>().ok())
        .ok_or_else(|| {
            reject(AppError::bad_request(
                "voteType must be either upvote or downvote",
            ))
        })?;

    request.extensions_mut().insert(vote);
    Ok(request)
}
