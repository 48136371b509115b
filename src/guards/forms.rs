use axum::extract::Request;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{GuardResult, UploadedForm, buffer_json, reject, text_field};
use crate::{
    error::AppError,
    models::{CommentForm, InviteUpdate, NewInvite, NotificationForm, SigninForm, SignupForm},
};

const MAX_SHORT_FIELD: usize = 120;
const MAX_DESCRIPTION: usize = 5_000;
const MAX_COMMENT: usize = 1_000;
const MAX_NOTIFICATION: usize = 500;
const MIN_PASSWORD: usize = 8;

/// Minimal structural e-mail check: `local@domain.tld`, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// 3 to 30 characters from `[A-Za-z0-9_]`.
pub fn is_valid_username(username: &str) -> bool {
    (3..=30).contains(&username.chars().count())
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn too_long(value: &str, max: usize) -> bool {
    value.chars().count() > max
}

pub(super) async fn validate_signin_form_data(request: Request) -> GuardResult {
    let (mut request, body) = buffer_json(request).await?;

    let email = text_field(&body, "email")
        .ok_or_else(|| reject(AppError::bad_request("Email is required")))?;
    if !email.contains('@') {
        return Err(reject(AppError::bad_request("Email is invalid")));
    }
    // Passwords are not trimmed.
    let password = body
        .get("password")
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| reject(AppError::bad_request("Password is required")))?
        .to_string();

    request
        .extensions_mut()
        .insert(SigninForm { email, password });
    Ok(request)
}

pub(super) async fn validate_signup_form_data(request: Request) -> GuardResult {
    let (mut request, body) = buffer_json(request).await?;

    let username = text_field(&body, "username")
        .ok_or_else(|| reject(AppError::bad_request("Username is required")))?;
    if !is_valid_username(&username) {
        return Err(reject(AppError::bad_request(
            "Username must be 3-30 characters of letters, digits or underscores",
        )));
    }

    let email = text_field(&body, "email")
        .ok_or_else(|| reject(AppError::bad_request("Email is required")))?;
    if !is_valid_email(&email) {
        return Err(reject(AppError::bad_request("Email is invalid")));
    }

    let password = body
        .get("password")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if password.chars().count() < MIN_PASSWORD {
        return Err(reject(AppError::bad_request(
            "Password must be at least 8 characters",
        )));
    }

    request.extensions_mut().insert(SignupForm {
        username,
        email,
        password,
    });
    Ok(request)
}

/// InviteSubmission
///
/// Output of `validateInviteData`: the checked fields plus the image collected
/// by `multerUploads`, if any.
#[derive(Debug, Clone)]
pub struct InviteSubmission {
    pub invite: NewInvite,
    pub image: Option<super::UploadedImage>,
}

fn required(
    fields: &Map<String, Value>,
    key: &str,
    label: &str,
    max: usize,
) -> Result<String, AppError> {
    let value = text_field(fields, key)
        .ok_or_else(|| AppError::bad_request(format!("{label} is required")))?;
    if too_long(&value, max) {
        return Err(AppError::bad_request(format!(
            "{label} must be at most {max} characters"
        )));
    }
    Ok(value)
}

fn invite_fields(fields: &Map<String, Value>) -> Result<NewInvite, AppError> {
    Ok(NewInvite {
        title: required(fields, "title", "Title", MAX_SHORT_FIELD)?,
        company: required(fields, "company", "Company", MAX_SHORT_FIELD)?,
        location: required(fields, "location", "Location", MAX_SHORT_FIELD)?,
        description: required(fields, "description", "Description", MAX_DESCRIPTION)?,
    })
}

pub(super) async fn validate_invite_data(mut request: Request) -> GuardResult {
    let uploaded = request.extensions_mut().remove::<UploadedForm>();
    let (mut request, fields, image) = match uploaded {
        Some(form) => {
            let fields = form
                .fields
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect::<Map<_, _>>();
            (request, fields, form.image)
        }
        None => {
            let (request, body) = buffer_json(request).await?;
            (request, body, None)
        }
    };

    let invite = invite_fields(&fields).map_err(reject)?;

    request
        .extensions_mut()
        .insert(InviteSubmission { invite, image });
    Ok(request)
}

pub(super) async fn validate_invite_update_data(request: Request) -> GuardResult {
    let (mut request, body) = buffer_json(request).await?;

    let mut update = InviteUpdate::default();
    for (key, max) in [
        ("title", MAX_SHORT_FIELD),
        ("company", MAX_SHORT_FIELD),
        ("location", MAX_SHORT_FIELD),
        ("description", MAX_DESCRIPTION),
    ] {
        if !body.contains_key(key) {
            continue;
        }
        let value = text_field(&body, key)
            .ok_or_else(|| reject(AppError::bad_request(format!("{key} cannot be empty"))))?;
        if too_long(&value, max) {
            return Err(reject(AppError::bad_request(format!(
                "{key} must be at most {max} characters"
            ))));
        }
        match key {
            "title" => update.title = Some(value),
            "company" => update.company = Some(value),
            "location" => update.location = Some(value),
            _ => update.description = Some(value),
        }
    }

    if update.is_empty() {
        return Err(reject(AppError::bad_request(
            "Provide at least one of title, company, location or description",
        )));
    }

    request.extensions_mut().insert(update);
    Ok(request)
}

pub(super) async fn validate_comment_data(request: Request) -> GuardResult {
    let (mut request, body) = buffer_json(request).await?;

    let comment = text_field(&body, "comment")
        .ok_or_else(|| reject(AppError::bad_request("Comment is required")))?;
    if too_long(&comment, MAX_COMMENT) {
        return Err(reject(AppError::bad_request(
            "Comment must be at most 1000 characters",
        )));
    }

    request.extensions_mut().insert(CommentForm { comment });
    Ok(request)
}

pub(super) async fn validate_notification_data(request: Request) -> GuardResult {
    let (mut request, body) = buffer_json(request).await?;

    let user_id = text_field(&body, "userId")
        .and_then(|raw| Uuid::parse_str(&raw).ok())
        .ok_or_else(|| reject(AppError::bad_request("A valid userId is required")))?;

    let invite_id = match body.get("inviteId") {
        None | Some(Value::Null) => None,
        Some(_) => Some(
            text_field(&body, "inviteId")
                .and_then(|raw| Uuid::parse_str(&raw).ok())
                .ok_or_else(|| reject(AppError::bad_request("inviteId is invalid")))?,
        ),
    };

    let message = text_field(&body, "message")
        .ok_or_else(|| reject(AppError::bad_request("Message is required")))?;
    if too_long(&message, MAX_NOTIFICATION) {
        return Err(reject(AppError::bad_request(
            "Message must be at most 500 characters",
        )));
    }

    request.extensions_mut().insert(NotificationForm {
        user_id,
        invite_id,
        message,
    });
    Ok(request)
}
