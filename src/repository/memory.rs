use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RepoResult, Repository, RepositoryError, matches_search};
use crate::models::{
    Comment, Invite, InviteUpdate, Metrics, NewInvite, NewNotification, NewUser, Notification,
    SearchQuery, User, VoteType,
};

#[derive(Default)]
struct Store {
    // Each vector is kept in insertion (chronological) order.
    users: Vec<User>,
    invites: Vec<Invite>,
    comments: Vec<Comment>,
    notifications: Vec<Notification>,
}

/// InMemoryRepository
///
/// A process-local `Repository` used by the test-suite and by local runs
/// without `DATABASE_URL`. Data is lost on restart.
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut store = self.store.write().await;
        if store.users.iter().any(|u| eq_ignore_case(&u.email, &user.email)) {
            return Err(RepositoryError::Duplicate("email"));
        }
        if store
            .users
            .iter()
            .any(|u| eq_ignore_case(&u.username, &user.username))
        {
            return Err(RepositoryError::Duplicate("username"));
        }
        let created = User {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            is_blocked: false,
            created_at: Utc::now(),
        };
        store.users.push(created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store
            .users
            .iter()
            .find(|u| eq_ignore_case(&u.email, email))
            .cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store
            .users
            .iter()
            .find(|u| eq_ignore_case(&u.username, username))
            .cloned())
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let store = self.store.read().await;
        Ok(store.users.iter().rev().cloned().collect())
    }

    async fn set_user_blocked(&self, id: Uuid, blocked: bool) -> RepoResult<Option<User>> {
        let mut store = self.store.write().await;
        Ok(store.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.is_blocked = blocked;
            user.clone()
        }))
    }

    async fn create_invite(
        &self,
        user_id: Uuid,
        invite: NewInvite,
        image_url: Option<String>,
    ) -> RepoResult<Invite> {
        let now = Utc::now();
        let created = Invite {
            id: Uuid::new_v4(),
            user_id,
            title: invite.title,
            company: invite.company,
            location: invite.location,
            description: invite.description,
            image_url,
            upvotes: 0,
            downvotes: 0,
            created_at: now,
            updated_at: now,
        };
        self.store.write().await.invites.push(created.clone());
        Ok(created)
    }

    async fn list_invites(&self, limit: i64, offset: i64) -> RepoResult<Vec<Invite>> {
        let store = self.store.read().await;
        let skip = usize::try_from(offset).unwrap_or(0);
        let take = usize::try_from(limit).unwrap_or(0);
        Ok(store
            .invites
            .iter()
            .rev()
            .skip(skip)
            .take(take)
            .cloned()
            .collect())
    }

    async fn search_invites(&self, query: &SearchQuery) -> RepoResult<Vec<Invite>> {
        let store = self.store.read().await;
        Ok(store
            .invites
            .iter()
            .rev()
            .filter(|invite| matches_search(invite, query))
            .cloned()
            .collect())
    }

    async fn get_invite(&self, id: Uuid) -> RepoResult<Option<Invite>> {
        let store = self.store.read().await;
        Ok(store.invites.iter().find(|i| i.id == id).cloned())
    }

    async fn list_invites_by_user(&self, user_id: Uuid) -> RepoResult<Vec<Invite>> {
        let store = self.store.read().await;
        Ok(store
            .invites
            .iter()
            .rev()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_invite(&self, id: Uuid, update: InviteUpdate) -> RepoResult<Option<Invite>> {
        let mut store = self.store.write().await;
        Ok(store.invites.iter_mut().find(|i| i.id == id).map(|invite| {
            if let Some(title) = update.title {
                invite.title = title;
            }
            if let Some(company) = update.company {
                invite.company = company;
            }
            if let Some(location) = update.location {
                invite.location = location;
            }
            if let Some(description) = update.description {
                invite.description = description;
            }
            invite.updated_at = Utc::now();
            invite.clone()
        }))
    }

    async fn delete_invite(&self, id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let before = store.invites.len();
        store.invites.retain(|i| i.id != id);
        let removed = store.invites.len() < before;
        if removed {
            store.comments.retain(|c| c.invite_id != id);
            for notification in store.notifications.iter_mut() {
                if notification.invite_id == Some(id) {
                    notification.invite_id = None;
                }
            }
        }
        Ok(removed)
    }

    async fn vote_invite(&self, id: Uuid, vote: VoteType) -> RepoResult<Option<Invite>> {
        let mut store = self.store.write().await;
        Ok(store.invites.iter_mut().find(|i| i.id == id).map(|invite| {
            match vote {
                VoteType::Upvote => invite.upvotes += 1,
                VoteType::Downvote => invite.downvotes += 1,
            }
            invite.clone()
        }))
    }

    async fn list_comments(&self, invite_id: Uuid) -> RepoResult<Vec<Comment>> {
        let store = self.store.read().await;
        Ok(store
            .comments
            .iter()
            .filter(|c| c.invite_id == invite_id)
            .cloned()
            .collect())
    }

    async fn create_comment(
        &self,
        invite_id: Uuid,
        user_id: Uuid,
        comment: String,
    ) -> RepoResult<Comment> {
        let mut store = self.store.write().await;
        let username = store
            .users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.username.clone())
            .unwrap_or_default();
        let created = Comment {
            id: Uuid::new_v4(),
            invite_id,
            user_id,
            username,
            comment,
            created_at: Utc::now(),
        };
        store.comments.push(created.clone());
        Ok(created)
    }

    async fn list_notifications(&self, user_id: Uuid) -> RepoResult<Vec<Notification>> {
        let store = self.store.read().await;
        Ok(store
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> RepoResult<Notification> {
        let created = Notification {
            id: Uuid::new_v4(),
            user_id: notification.user_id,
            invite_id: notification.invite_id,
            message: notification.message,
            is_read: false,
            created_at: Utc::now(),
        };
        self.store.write().await.notifications.push(created.clone());
        Ok(created)
    }

    async fn get_metrics(&self) -> RepoResult<Metrics> {
        let store = self.store.read().await;
        let count = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
        Ok(Metrics {
            users: count(store.users.len()),
            invites: count(store.invites.len()),
            comments: count(store.comments.len()),
        })
    }
}
