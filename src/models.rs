use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

// --- Core Entities (Mapped to Database) ---

/// User
///
/// A registered account. Credentials live with the identity provider; this row
/// mirrors the provider's user id and carries the local moderation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    // RBAC field: 'user' or 'admin'.
    pub role: String,
    pub is_blocked: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// PublicUser
///
/// What anonymous callers may see of an account. The e-mail address stays private.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub role: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Invite
///
/// A job listing posted by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Invite {
    pub id: Uuid,
    // Owner.
    pub user_id: Uuid,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub image_url: Option<String>,
    pub upvotes: i64,
    pub downvotes: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Comment
///
/// A comment on an invite, joined with the author's username.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Comment {
    pub id: Uuid,
    pub invite_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub comment: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Notification
///
/// A message addressed to a single user, optionally about an invite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Notification {
    pub id: Uuid,
    // Recipient.
    pub user_id: Uuid,
    pub invite_id: Option<Uuid>,
    pub message: String,
    pub is_read: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Metrics
///
/// Row counts shown on the landing page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Metrics {
    pub users: i64,
    pub invites: i64,
    pub comments: i64,
}

/// VoteType
///
/// The `:voteType` path segment of the upvote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum VoteType {
    Upvote,
    Downvote,
}

impl FromStr for VoteType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "upvote" => Ok(Self::Upvote),
            "downvote" => Ok(Self::Downvote),
            other => Err(format!("unknown vote type '{other}'")),
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upvote => f.write_str("upvote"),
            Self::Downvote => f.write_str("downvote"),
        }
    }
}

// --- Persistence Inputs ---

/// NewUser
///
/// Profile row created after the identity provider accepted a signup.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
}

/// NewInvite
///
/// A validated invite submission, produced by the `validateInviteData` guard.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvite {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub invite_id: Option<Uuid>,
    pub message: String,
}

// --- Request Payloads (Input Schemas) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SigninForm {
    #[schema(example = "ada@example.com")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignupForm {
    #[schema(example = "ada_l")]
    pub username: String,
    pub email: String,
    pub password: String,
}

/// InviteForm
///
/// Body of `POST /api/v1/invites`, either multipart text fields or JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct InviteForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
}

/// InviteUpdate
///
/// Partial update payload for `PUT /api/v1/invites/{inviteId}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct InviteUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl InviteUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.company.is_none()
            && self.location.is_none()
            && self.description.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CommentForm {
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NotificationForm {
    pub user_id: Uuid,
    #[serde(default)]
    pub invite_id: Option<Uuid>,
    pub message: String,
}

/// SearchQuery
///
/// Query string for both search endpoints (`?q=rust&location=dublin`).
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct SearchQuery {
    /// Case-insensitive text matched against title, company and description.
    pub q: Option<String>,
    /// Case-insensitive location filter.
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, utoipa::IntoParams)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListQuery {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    /// Clamped `(limit, offset)` pair.
    pub fn window(&self) -> (i64, i64) {
        let limit = self
            .limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

// --- Response Payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// AuthResponse
///
/// Returned by signin and signup. The same token is also set as the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_type_parses_only_known_segments() {
        assert_eq!("upvote".parse::<VoteType>(), Ok(VoteType::Upvote));
        assert_eq!("downvote".parse::<VoteType>(), Ok(VoteType::Downvote));
        assert!("Upvote".parse::<VoteType>().is_err());
        assert!("sideways".parse::<VoteType>().is_err());
    }

    #[test]
    fn list_window_is_clamped() {
        let query = ListQuery {
            limit: Some(1_000),
            offset: Some(-5),
        };
        assert_eq!(query.window(), (ListQuery::MAX_LIMIT, 0));
        assert_eq!(ListQuery::default().window(), (ListQuery::DEFAULT_LIMIT, 0));
    }

    #[test]
    fn invite_serializes_camel_case() {
        let invite = Invite {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            title: "Rust dev".into(),
            company: "Acme".into(),
            location: "Lagos".into(),
            description: "Build things".into(),
            image_url: None,
            upvotes: 1,
            downvotes: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&invite).unwrap();
        assert!(json.get("userId").is_some());
        assert!(json.get("imageUrl").is_some());
        assert!(json.get("user_id").is_none());
    }
}
