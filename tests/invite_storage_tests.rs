mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{StatusCode, header};
use common::{body_json, multipart_request, with_header};
use invite_board::{
    AppConfig, AppState, InMemoryRepository, MockIdentityService, MockStorageService,
    auth::issue_token,
    create_router,
    models::{
        Comment, Invite, InviteUpdate, Metrics, NewInvite, NewNotification, NewUser,
        Notification, ROLE_USER, SearchQuery, User, VoteType,
    },
    repository::{RepoResult, Repository, RepositoryError},
};
use tower::ServiceExt;
use uuid::Uuid;

/// In-memory repository whose invite inserts always fail.
struct RejectingInvites(InMemoryRepository);

#[async_trait]
impl Repository for RejectingInvites {
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        self.0.create_user(user).await
    }
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        self.0.get_user(id).await
    }
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.0.find_user_by_email(email).await
    }
    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        self.0.find_user_by_username(username).await
    }
    async fn list_users(&self) -> RepoResult<Vec<User>> {
        self.0.list_users().await
    }
    async fn set_user_blocked(&self, id: Uuid, blocked: bool) -> RepoResult<Option<User>> {
        self.0.set_user_blocked(id, blocked).await
    }
    async fn create_invite(
        &self,
        _user_id: Uuid,
        _invite: NewInvite,
        _image_url: Option<String>,
    ) -> RepoResult<Invite> {
        Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
    }
    async fn list_invites(&self, limit: i64, offset: i64) -> RepoResult<Vec<Invite>> {
        self.0.list_invites(limit, offset).await
    }
    async fn search_invites(&self, query: &SearchQuery) -> RepoResult<Vec<Invite>> {
        self.0.search_invites(query).await
    }
    async fn get_invite(&self, id: Uuid) -> RepoResult<Option<Invite>> {
        self.0.get_invite(id).await
    }
    async fn list_invites_by_user(&self, user_id: Uuid) -> RepoResult<Vec<Invite>> {
        self.0.list_invites_by_user(user_id).await
    }
    async fn update_invite(&self, id: Uuid, update: InviteUpdate) -> RepoResult<Option<Invite>> {
        self.0.update_invite(id, update).await
    }
    async fn delete_invite(&self, id: Uuid) -> RepoResult<bool> {
        self.0.delete_invite(id).await
    }
    async fn vote_invite(&self, id: Uuid, vote: VoteType) -> RepoResult<Option<Invite>> {
        self.0.vote_invite(id, vote).await
    }
    async fn list_comments(&self, invite_id: Uuid) -> RepoResult<Vec<Comment>> {
        self.0.list_comments(invite_id).await
    }
    async fn create_comment(
        &self,
        invite_id: Uuid,
        user_id: Uuid,
        comment: String,
    ) -> RepoResult<Comment> {
        self.0.create_comment(invite_id, user_id, comment).await
    }
    async fn list_notifications(&self, user_id: Uuid) -> RepoResult<Vec<Notification>> {
        self.0.list_notifications(user_id).await
    }
    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> RepoResult<Notification> {
        self.0.create_notification(notification).await
    }
    async fn get_metrics(&self) -> RepoResult<Metrics> {
        self.0.get_metrics().await
    }
}

#[tokio::test]
async fn image_is_removed_when_the_invite_cannot_be_saved() {
    let inner = InMemoryRepository::new();
    let owner = inner
        .create_user(NewUser {
            id: Uuid::new_v4(),
            username: "unlucky".into(),
            email: "unlucky@example.com".into(),
            role: ROLE_USER.into(),
        })
        .await
        .unwrap();

    let storage = MockStorageService::new();
    let config = AppConfig::default();
    let token = issue_token(&owner, &config).unwrap();
    let router = create_router(AppState {
        repo: Arc::new(RejectingInvites(inner)),
        storage: Arc::new(storage.clone()),
        identity: Arc::new(MockIdentityService::new()),
        config,
    });

    let png = [0x89u8, b'P', b'N', b'G'];
    let req = with_header(
        multipart_request(
            "/api/v1/invites",
            &[
                ("title", "Printer"),
                ("company", "Press"),
                ("location", "Limerick"),
                ("description", "Print things"),
            ],
            Some(("flyer.png", "image/png", png.as_slice())),
        ),
        header::AUTHORIZATION,
        &format!("Bearer {token}"),
    );

    let response = router.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["message"], "Internal Server Error");
    assert!(
        storage.stored_keys().is_empty(),
        "image left behind: {:?}",
        storage.stored_keys()
    );
}
