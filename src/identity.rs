use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    /// The provider refused the request (weak password, unknown OAuth code, ...).
    #[error("{0}")]
    Rejected(String),
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// ExternalIdentity
///
/// The account resolved by the provider after an OAuth code exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalIdentity {
    pub id: Uuid,
    /// `None` when the provider has no address on file (common for Twitter).
    pub email: Option<String>,
    pub username: Option<String>,
}

/// IdentityService
///
/// Credential checks are delegated to an external identity provider; the
/// application never stores passwords. The provider's user id becomes the
/// local `users.id`.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Uuid, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Uuid, IdentityError>;

    /// URL the browser is sent to in order to start an OAuth PKCE flow.
    fn authorize_url(
        &self,
        provider: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<String, IdentityError>;

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<ExternalIdentity, IdentityError>;
}

pub type IdentityState = Arc<dyn IdentityService>;

/// Generates a fresh PKCE code verifier (64 characters from the unreserved set).
pub fn pkce_verifier() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// S256 code challenge for `verifier`.
pub fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

// --- Supabase GoTrue ---

#[derive(Deserialize)]
struct SupabaseUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: HashMap<String, serde_json::Value>,
}

/// Signup answers with the bare user when e-mail confirmation is on, or with a
/// session wrapping the user when it is off.
#[derive(Deserialize)]
struct SignupResponse {
    #[serde(default)]
    id: Option<Uuid>,
    #[serde(default)]
    user: Option<SupabaseUser>,
}

#[derive(Deserialize)]
struct TokenResponse {
    user: SupabaseUser,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default, alias = "msg", alias = "error_description")]
    message: Option<String>,
}

/// SupabaseIdentity
///
/// `IdentityService` talking to the Supabase Auth (GoTrue) REST API.
#[derive(Clone)]
pub struct SupabaseIdentity {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseIdentity {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, IdentityError> {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))
    }
}

async fn rejection(response: reqwest::Response) -> IdentityError {
    let status = response.status();
    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| format!("identity provider answered {status}"));
    if status.is_server_error() {
        IdentityError::Unavailable(message)
    } else {
        IdentityError::Rejected(message)
    }
}

#[async_trait]
impl IdentityService for SupabaseIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Uuid, IdentityError> {
        let response = self
            .post(
                "/auth/v1/signup",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        let body = response
            .json::<SignupResponse>()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
        body.id
            .or(body.user.map(|u| u.id))
            .ok_or_else(|| IdentityError::Unavailable("signup response without user id".into()))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Uuid, IdentityError> {
        let response = self
            .post(
                "/auth/v1/token?grant_type=password",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await?;
        match response.status() {
            status if status.is_success() => response
                .json::<TokenResponse>()
                .await
                .map(|token| token.user.id)
                .map_err(|e| IdentityError::Unavailable(e.to_string())),
            reqwest::StatusCode::BAD_REQUEST | reqwest::StatusCode::UNAUTHORIZED => {
                Err(IdentityError::InvalidCredentials)
            }
            _ => Err(rejection(response).await),
        }
    }

    fn authorize_url(
        &self,
        provider: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<String, IdentityError> {
        reqwest::Url::parse_with_params(
            &format!("{}/auth/v1/authorize", self.base_url),
            &[
                ("provider", provider),
                ("redirect_to", redirect_to),
                ("code_challenge", code_challenge),
                ("code_challenge_method", "s256"),
            ],
        )
        .map(String::from)
        .map_err(|e| IdentityError::Unavailable(e.to_string()))
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<ExternalIdentity, IdentityError> {
        let response = self
            .post(
                "/auth/v1/token?grant_type=pkce",
                serde_json::json!({ "auth_code": code, "code_verifier": code_verifier }),
            )
            .await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        let username = ["user_name", "preferred_username", "name"]
            .iter()
            .find_map(|key| token.user.user_metadata.get(*key))
            .and_then(|value| value.as_str())
            .map(str::to_string);

        Ok(ExternalIdentity {
            id: token.user.id,
            email: token
                .user
                .email
                .map(|email| email.trim().to_string())
                .filter(|email| !email.is_empty()),
            username,
        })
    }
}

// --- In-memory provider ---

#[derive(Default)]
struct MockAccounts {
    // Keyed by lower-cased email.
    passwords: HashMap<String, (String, Uuid)>,
    oauth_codes: HashMap<String, ExternalIdentity>,
}

/// MockIdentityService
///
/// In-memory provider for tests and local runs without Supabase credentials.
#[derive(Default)]
pub struct MockIdentityService {
    accounts: Mutex<MockAccounts>,
}

impl MockIdentityService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `code` exchangeable for `identity` once.
    pub fn register_oauth_code(&self, code: &str, identity: ExternalIdentity) {
        if let Ok(mut accounts) = self.accounts.lock() {
            accounts.oauth_codes.insert(code.to_string(), identity);
        }
    }

    fn with_accounts<T>(
        &self,
        f: impl FnOnce(&mut MockAccounts) -> Result<T, IdentityError>,
    ) -> Result<T, IdentityError> {
        let mut accounts = self
            .accounts
            .lock()
            .map_err(|_| IdentityError::Unavailable("mock identity store poisoned".into()))?;
        f(&mut accounts)
    }
}

#[async_trait]
impl IdentityService for MockIdentityService {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Uuid, IdentityError> {
        self.with_accounts(|accounts| {
            let key = email.to_lowercase();
            if accounts.passwords.contains_key(&key) {
                return Err(IdentityError::Rejected("User already registered".into()));
            }
            let id = Uuid::new_v4();
            accounts.passwords.insert(key, (password.to_string(), id));
            Ok(id)
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Uuid, IdentityError> {
        self.with_accounts(|accounts| match accounts.passwords.get(&email.to_lowercase()) {
            Some((stored, id)) if stored == password => Ok(*id),
            _ => Err(IdentityError::InvalidCredentials),
        })
    }

    fn authorize_url(
        &self,
        provider: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<String, IdentityError> {
        Ok(format!(
            "http://identity.local/authorize?provider={provider}\
             &redirect_to={redirect_to}&code_challenge={code_challenge}"
        ))
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<ExternalIdentity, IdentityError> {
        if code_verifier.is_empty() {
            return Err(IdentityError::Rejected("missing code verifier".into()));
        }
        self.with_accounts(|accounts| {
            accounts
                .oauth_codes
                .remove(code)
                .ok_or_else(|| IdentityError::Rejected("invalid authorization code".into()))
        })
    }
}
