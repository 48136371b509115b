use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Comment, Invite, InviteUpdate, Metrics, NewInvite, NewNotification, NewUser, Notification,
    SearchQuery, User, VoteType,
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A unique constraint (username or email) was violated.
    #[error("{0} is already taken")]
    Duplicate(&'static str),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The persistence contract used by guards and handlers. Implemented by
/// `PostgresRepository` in production and `InMemoryRepository` for tests and
/// database-less local runs.
///
/// Lookups by email and username are case-insensitive.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn set_user_blocked(&self, id: Uuid, blocked: bool) -> RepoResult<Option<User>>;

    // --- Invites ---
    async fn create_invite(
        &self,
        user_id: Uuid,
        invite: NewInvite,
        image_url: Option<String>,
    ) -> RepoResult<Invite>;
    // Newest first.
    async fn list_invites(&self, limit: i64, offset: i64) -> RepoResult<Vec<Invite>>;
    async fn search_invites(&self, query: &SearchQuery) -> RepoResult<Vec<Invite>>;
    async fn get_invite(&self, id: Uuid) -> RepoResult<Option<Invite>>;
    async fn list_invites_by_user(&self, user_id: Uuid) -> RepoResult<Vec<Invite>>;
    // Only the provided fields change; `updated_at` is refreshed.
    async fn update_invite(&self, id: Uuid, update: InviteUpdate) -> RepoResult<Option<Invite>>;
    // Removes the invite together with its comments.
    async fn delete_invite(&self, id: Uuid) -> RepoResult<bool>;
    async fn vote_invite(&self, id: Uuid, vote: VoteType) -> RepoResult<Option<Invite>>;

    // --- Comments ---
    // Oldest first.
    async fn list_comments(&self, invite_id: Uuid) -> RepoResult<Vec<Comment>>;
    async fn create_comment(
        &self,
        invite_id: Uuid,
        user_id: Uuid,
        comment: String,
    ) -> RepoResult<Comment>;

    // --- Notifications ---
    // Newest first.
    async fn list_notifications(&self, user_id: Uuid) -> RepoResult<Vec<Notification>>;
    async fn create_notification(&self, notification: NewNotification)
    -> RepoResult<Notification>;

    async fn get_metrics(&self) -> RepoResult<Metrics>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Case-insensitive substring match used by the search endpoints.
pub(crate) fn matches_search(invite: &Invite, query: &SearchQuery) -> bool {
    let contains = |haystack: &str, needle: &str| {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    };

    let text_ok = match query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => {
            contains(&invite.title, q)
                || contains(&invite.company, q)
                || contains(&invite.description, q)
        }
        None => true,
    };
    let location_ok = match query
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
    {
        Some(location) => contains(&invite.location, location),
        None => true,
    };

    text_ok && location_ok
}
