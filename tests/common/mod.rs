//! Shared harness: the full router over in-memory services, driven with
//! `tower::ServiceExt::oneshot`.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response, header},
};
use invite_board::{
    AppConfig, AppState, InMemoryRepository, MockIdentityService, MockStorageService,
    auth::issue_token,
    create_router,
    models::{Invite, NewInvite, NewUser, ROLE_ADMIN, ROLE_USER, User},
    repository::Repository,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<InMemoryRepository>,
    pub identity: Arc<MockIdentityService>,
    pub config: AppConfig,
}

pub fn test_app() -> TestApp {
    test_app_with_storage(MockStorageService::new())
}

pub fn test_app_with_storage(storage: MockStorageService) -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());
    let identity = Arc::new(MockIdentityService::new());
    let config = AppConfig::default();

    let router = create_router(AppState {
        repo: repo.clone(),
        storage: Arc::new(storage),
        identity: identity.clone(),
        config: config.clone(),
    });

    TestApp {
        router,
        repo,
        identity,
        config,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn seed_user(&self, username: &str, role: &str) -> User {
        self.repo
            .create_user(NewUser {
                id: Uuid::new_v4(),
                username: username.to_string(),
                email: format!("{username}@example.com"),
                role: role.to_string(),
            })
            .await
            .expect("seed user")
    }

    pub async fn seed_member(&self, username: &str) -> User {
        self.seed_user(username, ROLE_USER).await
    }

    pub async fn seed_admin(&self, username: &str) -> User {
        self.seed_user(username, ROLE_ADMIN).await
    }

    pub async fn seed_invite(&self, owner: &User, title: &str) -> Invite {
        self.repo
            .create_invite(
                owner.id,
                NewInvite {
                    title: title.to_string(),
                    company: "Acme".to_string(),
                    location: "Dublin".to_string(),
                    description: format!("{title} role at Acme"),
                },
                None,
            )
            .await
            .expect("seed invite")
    }

    pub fn token_for(&self, user: &User) -> String {
        issue_token(user, &self.config).expect("token")
    }

    pub fn bearer(&self, user: &User) -> String {
        format!("Bearer {}", self.token_for(user))
    }
}

pub fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn with_header(
    mut request: Request<Body>,
    name: header::HeaderName,
    value: &str,
) -> Request<Body> {
    request
        .headers_mut()
        .insert(name, value.parse().expect("header value"));
    request
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

/// All `Set-Cookie` values of a response.
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok().map(str::to_string))
        .collect()
}

/// The `token` value set by a response, if any.
pub fn session_token(response: &Response<Body>) -> Option<String> {
    set_cookies(response).into_iter().find_map(|cookie| {
        cookie
            .strip_prefix("token=")
            .and_then(|rest| rest.split(';').next())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    })
}

/// Builds a `multipart/form-data` body with text fields and an optional file.
pub fn multipart_request(
    uri: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> Request<Body> {
    const BOUNDARY: &str = "invite-board-test-boundary";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}
