use std::env;

use thiserror::Error;

/// Fallback signing secret for local development only.
pub const LOCAL_JWT_SECRET: &str = "invite-board-local-development-secret";

/// AppConfig
///
/// Holds the application's entire configuration state. Immutable once loaded and
/// pulled into handlers and guards through `FromRef<AppState>`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the local fallbacks and the `x-user-id` bypass.
    pub env: Env,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Public origin of the site, used to build OAuth redirect URLs.
    pub site_url: String,
    // Postgres connection string. Optional in local mode (in-memory repository).
    pub db_url: Option<String>,
    // Secret used to sign and validate session JWTs.
    pub jwt_secret: String,
    // Lifetime of an issued session token.
    pub session_ttl_hours: i64,
    // Supabase project URL and anon key for the identity provider.
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    // S3-compatible storage for invite images (MinIO locally).
    pub s3_endpoint: String,
    pub s3_region: String,
    pub s3_key: String,
    pub s3_secret: String,
    pub s3_bucket: String,
}

/// Env
///
/// Runtime context: local development utilities vs. production infrastructure.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

impl Default for AppConfig {
    /// Safe, non-panicking configuration used to scaffold test state.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: "127.0.0.1:3000".to_string(),
            site_url: "http://localhost:3000".to_string(),
            db_url: None,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            session_ttl_hours: 24,
            supabase_url: None,
            supabase_key: None,
            s3_endpoint: "http://localhost:9000".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_key: "admin".to_string(),
            s3_secret: "password".to_string(),
            s3_bucket: "invites-test".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Errors
    /// In production every infrastructure secret is mandatory; a missing one yields
    /// `ConfigError::Missing` so `main` can refuse to start.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok().filter(|v| !v.trim().is_empty()))
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let env = match lookup("APP_ENV").as_deref() {
            Some("production") => Env::Production,
            _ => Env::Local,
        };

        let session_ttl_hours = match lookup("SESSION_TTL_HOURS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|hours| *hours > 0)
                .ok_or(ConfigError::Invalid {
                    name: "SESSION_TTL_HOURS",
                    value: raw,
                })?,
            None => 24,
        };

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let site_url = lookup("SITE_URL").unwrap_or_else(|| "http://localhost:3000".to_string());

        match env {
            Env::Local => Ok(Self {
                env,
                bind_addr,
                site_url,
                db_url: lookup("DATABASE_URL"),
                jwt_secret: lookup("JWT_SECRET").unwrap_or_else(|| LOCAL_JWT_SECRET.to_string()),
                session_ttl_hours,
                supabase_url: lookup("SUPABASE_URL"),
                supabase_key: lookup("SUPABASE_KEY"),
                // Dockerized MinIO defaults.
                s3_endpoint: lookup("S3_ENDPOINT")
                    .unwrap_or_else(|| "http://localhost:9000".to_string()),
                s3_region: "us-east-1".to_string(),
                s3_key: lookup("S3_ACCESS_KEY").unwrap_or_else(|| "admin".to_string()),
                s3_secret: lookup("S3_SECRET_KEY").unwrap_or_else(|| "password".to_string()),
                s3_bucket: lookup("S3_BUCKET_NAME").unwrap_or_else(|| "invite-uploads".to_string()),
            }),
            Env::Production => {
                let require = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));
                Ok(Self {
                    env,
                    bind_addr,
                    site_url,
                    db_url: Some(require("DATABASE_URL")?),
                    jwt_secret: require("JWT_SECRET")?,
                    session_ttl_hours,
                    supabase_url: Some(require("SUPABASE_URL")?),
                    supabase_key: Some(require("SUPABASE_KEY")?),
                    s3_endpoint: require("S3_ENDPOINT")?,
                    s3_region: lookup("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                    s3_key: require("S3_ACCESS_KEY")?,
                    s3_secret: require("S3_SECRET_KEY")?,
                    s3_bucket: lookup("S3_BUCKET_NAME")
                        .unwrap_or_else(|| "invite-uploads".to_string()),
                })
            }
        }
    }
}
