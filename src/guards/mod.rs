//! Guards are the named request validators that run, in declared order, in
//! front of a route's handler. A guard either hands the request on (usually
//! with typed data added to its extensions) or answers it.

use std::collections::HashMap;

use axum::{
    RequestExt,
    body::Body,
    extract::{Path, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{AppState, error::AppError};

mod accounts;
mod forms;
mod invites;
mod uploads;

pub use forms::{InviteSubmission, is_valid_email, is_valid_username};
pub use uploads::{MAX_IMAGE_BYTES, UploadedForm, UploadedImage};

/// Largest JSON body a guard will buffer.
pub const JSON_BODY_LIMIT: usize = 64 * 1024;

pub type GuardResult = Result<Request, Response>;

/// Guard
///
/// One variant per named middleware of the route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Guard {
    ValidateSigninFormData,
    ValidUser,
    ValidateSignupFormData,
    VerifyUniqueUserEmail,
    VerifyUniqueUserUsername,
    AuthenticateUserToken,
    ValidateAdmin,
    ValidateUserId,
    ValidateUserById,
    MulterUploads,
    ValidateInviteData,
    ValidateInviteId,
    ValidateInvite,
    ValidateInviteUpdateData,
    ValidateInviteOwner,
    ValidateCommentData,
    ValidateUpvoteInput,
    ValidateNotificationData,
    GetUserByUserId,
}

impl Guard {
    pub const fn name(self) -> &'static str {
        match self {
            Self::ValidateSigninFormData => "validateSigninFormData",
            Self::ValidUser => "validUser",
            Self::ValidateSignupFormData => "validateSignupFormData",
            Self::VerifyUniqueUserEmail => "verifyUniqueUserEmail",
            Self::VerifyUniqueUserUsername => "verifyUniqueUserUsername",
            Self::AuthenticateUserToken => "authenticateUserToken",
            Self::ValidateAdmin => "validateAdmin",
            Self::ValidateUserId => "validateUserId",
            Self::ValidateUserById => "validateUserById",
            Self::MulterUploads => "multerUploads",
            Self::ValidateInviteData => "validateInviteData",
            Self::ValidateInviteId => "validateInviteId",
            Self::ValidateInvite => "validateInvite",
            Self::ValidateInviteUpdateData => "validateInviteUpdateData",
            Self::ValidateInviteOwner => "validateInviteOwner",
            Self::ValidateCommentData => "validateCommentData",
            Self::ValidateUpvoteInput => "validateUpvoteInput",
            Self::ValidateNotificationData => "validateNotificationData",
            Self::GetUserByUserId => "getUserByUserId",
        }
    }

    /// Runs this guard against `request`.
    pub async fn check(self, state: &AppState, request: Request) -> GuardResult {
        match self {
            Self::ValidateSigninFormData => forms::validate_signin_form_data(request).await,
            Self::ValidUser => accounts::valid_user(state, request).await,
            Self::ValidateSignupFormData => forms::validate_signup_form_data(request).await,
            Self::VerifyUniqueUserEmail => accounts::verify_unique_user_email(state, request).await,
            Self::VerifyUniqueUserUsername => {
                accounts::verify_unique_user_username(state, request).await
            }
            Self::AuthenticateUserToken => accounts::authenticate_user_token(state, request).await,
            Self::ValidateAdmin => accounts::validate_admin(request),
            Self::ValidateUserId => accounts::validate_user_id(request).await,
            Self::ValidateUserById => accounts::validate_user_by_id(state, request).await,
            Self::MulterUploads => uploads::multer_uploads(request).await,
            Self::ValidateInviteData => forms::validate_invite_data(request).await,
            Self::ValidateInviteId => invites::validate_invite_id(request).await,
            Self::ValidateInvite => invites::validate_invite(state, request).await,
            Self::ValidateInviteUpdateData => forms::validate_invite_update_data(request).await,
            Self::ValidateInviteOwner => invites::validate_invite_owner(request),
            Self::ValidateCommentData => forms::validate_comment_data(request).await,
            Self::ValidateUpvoteInput => invites::validate_upvote_input(request).await,
            Self::ValidateNotificationData => forms::validate_notification_data(request).await,
            Self::GetUserByUserId => accounts::get_user_by_user_id(state, request).await,
        }
    }
}

/// GuardChain
///
/// State of the per-route middleware: the ordered guards and the name of the
/// handler they protect.
#[derive(Clone)]
pub struct GuardChain {
    pub state: AppState,
    pub guards: &'static [Guard],
    pub handler: &'static str,
}

/// GuardTrace
///
/// Attached to every routed response: the guards that ran, in order, and the
/// handler if the request got that far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardTrace {
    pub guards: Vec<&'static str>,
    pub handler: Option<&'static str>,
}

/// run_chain
///
/// Applies the route's guards in order and stops at the first one that answers.
pub async fn run_chain(
    State(chain): State<GuardChain>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut trace = GuardTrace {
        guards: Vec::with_capacity(chain.guards.len()),
        handler: None,
    };

    for guard in chain.guards {
        trace.guards.push(guard.name());
        request = match guard.check(&chain.state, request).await {
            Ok(request) => request,
            Err(mut response) => {
                tracing::debug!(
                    guard = guard.name(),
                    status = %response.status(),
                    "request stopped by guard"
                );
                response.extensions_mut().insert(trace);
                return response;
            }
        };
    }

    trace.handler = Some(chain.handler);
    let mut response = next.run(request).await;
    response.extensions_mut().insert(trace);
    response
}

// --- Shared helpers ---

pub(crate) fn reject(err: AppError) -> Response {
    err.into_response()
}

/// Reads a named path parameter of the matched route.
pub(crate) async fn path_param(request: &mut Request, name: &str) -> Option<String> {
    request
        .extract_parts::<Path<HashMap<String, String>>>()
        .await
        .ok()
        .and_then(|Path(mut params)| params.remove(name))
}

/// Parses the named path parameter as a UUID or fails with `400 <message>`.
pub(crate) async fn uuid_param(
    request: &mut Request,
    name: &str,
    message: &str,
) -> Result<Uuid, AppError> {
    path_param(request, name)
        .await
        .and_then(|raw| Uuid::parse_str(&raw).ok())
        .ok_or_else(|| AppError::bad_request(message))
}

/// Buffers the body as a JSON object and puts the bytes back on the request.
pub(crate) async fn buffer_json(
    request: Request,
) -> Result<(Request, Map<String, Value>), Response> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, JSON_BODY_LIMIT)
        .await
        .map_err(|_| reject(AppError::PayloadTooLarge("Request body is too large".into())))?;

    let object = match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(object)) => object,
        _ => {
            return Err(reject(AppError::bad_request(
                "Request body must be a JSON object",
            )));
        }
    };

    Ok((Request::from_parts(parts, Body::from(bytes)), object))
}

/// A trimmed string field; `None` if absent, not a string, or blank.
pub(crate) fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
