use invite_board::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    identity::{IdentityState, MockIdentityService, SupabaseIdentity},
    repository::{InMemoryRepository, PostgresRepository, RepositoryState},
    storage::{S3StorageClient, StorageService, StorageState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initializes logging, wires the services into `AppState`
/// and serves the router. Any startup failure aborts with an error.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Configuration (fail fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load()?;

    // 2. Logging: RUST_LOG wins, otherwise verbose defaults for this crate.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "invite_board=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Persistence: Postgres when configured, otherwise the in-memory store (local only).
    let repo: RepositoryState = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("connected to Postgres, migrations applied");
            Arc::new(PostgresRepository::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory repository");
            Arc::new(InMemoryRepository::new())
        }
    };

    // 4. Identity provider
    let identity: IdentityState = match (&config.supabase_url, &config.supabase_key) {
        (Some(url), Some(key)) => Arc::new(SupabaseIdentity::new(url, key)),
        _ => {
            tracing::warn!("Supabase not configured; using the in-memory identity provider");
            Arc::new(MockIdentityService::new())
        }
    };

    // 5. Object storage (MinIO locally)
    let s3_client = S3StorageClient::new(
        &config.s3_endpoint,
        &config.s3_region,
        &config.s3_key,
        &config.s3_secret,
        &config.s3_bucket,
    );
    if config.env == Env::Local {
        s3_client.ensure_bucket_exists().await;
    }
    let storage: StorageState = Arc::new(s3_client);

    // 6. Router and server
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState {
        repo,
        storage,
        identity,
        config,
    });

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API documentation available at http://{bind_addr}/swagger-ui");

    axum::serve(listener, app).await?;
    Ok(())
}
