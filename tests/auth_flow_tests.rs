mod common;

use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, header},
};
use common::{
    body_json, json_request, request, session_token, set_cookies, test_app, with_header,
};
use invite_board::{
    auth::{AuthUser, Claims, decode_token},
    config::{AppConfig, Env},
    handlers::twitter::{VERIFIER_COOKIE, placeholder_email},
    identity::{ExternalIdentity, IdentityService},
    repository::Repository,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use uuid::Uuid;

fn signup_body(username: &str) -> serde_json::Value {
    json!({
        "username": username,
        "email": format!("{username}@example.com"),
        "password": "password123"
    })
}

#[tokio::test]
async fn signup_creates_a_profile_and_sets_the_session_cookie() {
    let app = test_app();

    let response = app
        .send(json_request(Method::POST, "/api/v1/auth/signup", signup_body("ada_l")))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let cookie = session_token(&response).expect("session cookie");
    let set_cookie = set_cookies(&response).join("; ");
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));

    let body = body_json(response).await;
    assert_eq!(body["user"]["username"], "ada_l");
    assert_eq!(body["user"]["role"], "user");
    assert_eq!(body["token"], cookie.as_str());

    let claims = decode_token(&cookie, &app.config.jwt_secret).expect("valid token");
    assert_eq!(claims.username, "ada_l");
}

#[tokio::test]
async fn signup_rejects_duplicates_with_conflict() {
    let app = test_app();
    app.seed_member("taken").await;

    let response = app
        .send(json_request(Method::POST, "/api/v1/auth/signup", signup_body("TAKEN")))
        .await;
    // Same email (case-insensitive) trips the e-mail check first.
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["message"], "Email is already in use");

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/signup",
            json!({ "username": "Taken", "email": "other@example.com", "password": "password123" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["message"], "Username is already taken");
}

#[tokio::test]
async fn signup_form_is_validated() {
    let app = test_app();
    for body in [
        json!({ "username": "ab", "email": "ab@example.com", "password": "password123" }),
        json!({ "username": "abc", "email": "not-an-email", "password": "password123" }),
        json!({ "username": "abc", "email": "abc@example.com", "password": "short" }),
        json!("just a string"),
    ] {
        let response = app
            .send(json_request(Method::POST, "/api/v1/auth/signup", body.clone()))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
    }
}

#[tokio::test]
async fn signup_recovers_a_provider_account_left_without_a_profile() {
    let app = test_app();
    // Registered with the provider, but the profile insert never happened.
    let orphan_id = app
        .identity
        .sign_up("orphan@example.com", "password123")
        .await
        .unwrap();

    let wrong_password = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/signup",
            json!({
                "username": "orphan",
                "email": "orphan@example.com",
                "password": "not-the-one"
            }),
        ))
        .await;
    assert_eq!(wrong_password.status(), StatusCode::BAD_REQUEST);
    assert!(app.repo.get_user(orphan_id).await.unwrap().is_none());

    let response = app
        .send(json_request(Method::POST, "/api/v1/auth/signup", signup_body("orphan")))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["user"]["id"], orphan_id.to_string());

    let signin = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/signin",
            json!({ "email": "orphan@example.com", "password": "password123" }),
        ))
        .await;
    assert_eq!(signin.status(), StatusCode::OK);
}

#[tokio::test]
async fn signin_checks_credentials_and_sets_the_cookie() {
    let app = test_app();
    app.send(json_request(Method::POST, "/api/v1/auth/signup", signup_body("grace")))
        .await;

    let wrong = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/signin",
            json!({ "email": "grace@example.com", "password": "nope-nope" }),
        ))
        .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert!(session_token(&wrong).is_none());

    let unknown = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/signin",
            json!({ "email": "nobody@example.com", "password": "password123" }),
        ))
        .await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);

    let ok = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/signin",
            json!({ "email": "GRACE@example.com", "password": "password123" }),
        ))
        .await;
    assert_eq!(ok.status(), StatusCode::OK);
    assert!(session_token(&ok).is_some());
    assert_eq!(body_json(ok).await["user"]["username"], "grace");
}

#[tokio::test]
async fn blocked_users_cannot_sign_in_or_authenticate() {
    let app = test_app();
    let response = app
        .send(json_request(Method::POST, "/api/v1/auth/signup", signup_body("mallory")))
        .await;
    let token = session_token(&response).expect("token");
    let user = app
        .repo
        .find_user_by_username("mallory")
        .await
        .unwrap()
        .unwrap();
    app.repo.set_user_blocked(user.id, true).await.unwrap();

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/signin",
            json!({ "email": "mallory@example.com", "password": "password123" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let req = with_header(
        json_request(
            Method::POST,
            "/api/v1/invites",
            json!({ "title": "t", "company": "c", "location": "l", "description": "d" }),
        ),
        header::AUTHORIZATION,
        &format!("Bearer {token}"),
    );
    assert_eq!(app.send(req).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn logout_clears_the_cookie_and_redirects_home() {
    let app = test_app();
    let user = app.seed_member("leaver").await;
    let req = with_header(
        request(Method::GET, "/logout"),
        header::COOKIE,
        &format!("token={}", app.token_for(&user)),
    );

    let response = app.send(req).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");
    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("token=;") || c == "token="));
    assert!(session_token(&response).is_none());
}

#[tokio::test]
async fn a_valid_cookie_is_left_alone() {
    let app = test_app();
    let user = app.seed_member("stayer").await;
    let req = with_header(
        request(Method::GET, "/about"),
        header::COOKIE,
        &format!("token={}", app.token_for(&user)),
    );
    let response = app.send(req).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn twitter_sign_in_round_trip() {
    let app = test_app();

    let start = app.send(request(Method::GET, "/auth/twitter")).await;
    assert_eq!(start.status(), StatusCode::SEE_OTHER);
    let location = start.headers()[header::LOCATION].to_str().unwrap().to_string();
    assert!(location.contains("provider=twitter"));
    assert!(location.contains("code_challenge="));

    let verifier_cookie = set_cookies(&start)
        .into_iter()
        .find(|c| c.starts_with(&format!("{VERIFIER_COOKIE}=")))
        .expect("verifier cookie");
    assert!(verifier_cookie.contains("HttpOnly"));
    let verifier_pair = verifier_cookie.split(';').next().unwrap().to_string();

    let external = ExternalIdentity {
        id: Uuid::new_v4(),
        email: Some("bird@example.com".into()),
        username: Some("bird-watcher".into()),
    };
    app.identity.register_oauth_code("code-123", external.clone());

    let req = with_header(
        request(Method::GET, "/auth/twitter/callback?code=code-123"),
        header::COOKIE,
        &verifier_pair,
    );
    let response = app.send(req).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/posts");
    assert!(session_token(&response).is_some());

    let user = app.repo.get_user(external.id).await.unwrap().expect("profile");
    assert_eq!(user.username, "birdwatcher");
    assert_eq!(user.email, "bird@example.com");
}

/// Runs the callback for `external` and returns the session token it issued.
async fn twitter_callback(
    app: &common::TestApp,
    code: &str,
    external: ExternalIdentity,
) -> String {
    app.identity.register_oauth_code(code, external);
    let req = with_header(
        request(Method::GET, &format!("/auth/twitter/callback?code={code}")),
        header::COOKIE,
        &format!("{VERIFIER_COOKIE}=verifier"),
    );
    let response = app.send(req).await;
    assert_eq!(response.headers()[header::LOCATION], "/posts");
    session_token(&response).expect("session cookie")
}

#[tokio::test]
async fn twitter_accounts_without_email_each_get_their_own_profile() {
    let app = test_app();
    let alice = ExternalIdentity {
        id: Uuid::new_v4(),
        email: None,
        username: Some("alice".into()),
    };
    let bob = ExternalIdentity {
        id: Uuid::new_v4(),
        email: None,
        username: Some("bob".into()),
    };

    let alice_token = twitter_callback(&app, "code-alice", alice.clone()).await;
    let bob_token = twitter_callback(&app, "code-bob", bob.clone()).await;

    let secret = &app.config.jwt_secret;
    assert_eq!(decode_token(&alice_token, secret).unwrap().sub, alice.id);
    assert_eq!(decode_token(&bob_token, secret).unwrap().sub, bob.id);

    let bob_profile = app.repo.get_user(bob.id).await.unwrap().expect("profile");
    assert_eq!(bob_profile.username, "bob");
    assert_eq!(bob_profile.email, placeholder_email(bob.id));

    // Signing in again resolves to the same profile.
    let again = twitter_callback(&app, "code-bob-2", bob.clone()).await;
    assert_eq!(decode_token(&again, secret).unwrap().sub, bob.id);
}

#[tokio::test]
async fn twitter_account_with_email_links_to_the_existing_profile() {
    let app = test_app();
    let existing = app.seed_member("linked").await;
    let external = ExternalIdentity {
        id: Uuid::new_v4(),
        email: Some(existing.email.to_uppercase()),
        username: Some("linked_on_twitter".into()),
    };

    let token = twitter_callback(&app, "code-linked", external.clone()).await;
    assert_eq!(decode_token(&token, &app.config.jwt_secret).unwrap().sub, existing.id);
    assert!(app.repo.get_user(external.id).await.unwrap().is_none());
}

#[tokio::test]
async fn twitter_callback_without_code_or_verifier_goes_to_login() {
    let app = test_app();

    let response = app
        .send(request(Method::GET, "/auth/twitter/callback?code=abc"))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");

    let req = with_header(
        request(Method::GET, "/auth/twitter/callback?error=access_denied"),
        header::COOKIE,
        "oauth_verifier=v",
    );
    let response = app.send(req).await;
    assert_eq!(response.headers()[header::LOCATION], "/login");
    assert!(session_token(&response).is_none());
}

// --- AuthUser extractor ---

fn parts_with(headers: &[(header::HeaderName, String)]) -> axum::http::request::Parts {
    let mut builder = Request::builder().method(Method::GET).uri("/");
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    builder.body(()).unwrap().into_parts().0
}

fn state_with(app: &common::TestApp, config: AppConfig) -> invite_board::AppState {
    invite_board::AppState {
        repo: app.repo.clone(),
        storage: std::sync::Arc::new(invite_board::MockStorageService::new()),
        identity: app.identity.clone(),
        config,
    }
}

#[tokio::test]
async fn extractor_accepts_bearer_and_cookie_tokens() {
    let app = test_app();
    let user = app.seed_member("extracted").await;
    let state = state_with(&app, app.config.clone());

    let mut parts = parts_with(&[(header::AUTHORIZATION, app.bearer(&user))]);
    let auth = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
    assert_eq!(auth.id, user.id);

    let mut parts = parts_with(&[(header::COOKIE, format!("token={}", app.token_for(&user)))]);
    let auth = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
    assert_eq!(auth.username, "extracted");
}

#[tokio::test]
async fn extractor_rejects_expired_and_foreign_tokens() {
    let app = test_app();
    let user = app.seed_member("expired").await;
    let state = state_with(&app, app.config.clone());

    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        role: user.role.clone(),
        iat: now - 7200,
        exp: now - 3600,
    };
    let expired = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(app.config.jwt_secret.as_bytes()),
    )
    .unwrap();
    let mut parts = parts_with(&[(header::AUTHORIZATION, format!("Bearer {expired}"))]);
    let err = AuthUser::from_request_parts(&mut parts, &state).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

    let foreign = encode(
        &Header::default(),
        &Claims { exp: now + 3600, ..claims },
        &EncodingKey::from_secret(b"someone-elses-secret"),
    )
    .unwrap();
    let mut parts = parts_with(&[(header::AUTHORIZATION, format!("Bearer {foreign}"))]);
    let err = AuthUser::from_request_parts(&mut parts, &state).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn local_bypass_header_is_ignored_in_production() {
    let app = test_app();
    let user = app.seed_member("bypass").await;
    let header_value = user.id.to_string();

    let local = state_with(&app, app.config.clone());
    let bypass = header::HeaderName::from_static("x-user-id");
    let mut parts = parts_with(&[(bypass.clone(), header_value.clone())]);
    assert!(AuthUser::from_request_parts(&mut parts, &local).await.is_ok());

    let production = state_with(
        &app,
        AppConfig {
            env: Env::Production,
            ..app.config.clone()
        },
    );
    let mut parts = parts_with(&[(bypass, header_value)]);
    let err = AuthUser::from_request_parts(&mut parts, &production)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}
