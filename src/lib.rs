use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core services: persistence, object storage, identity provider.
pub mod identity;
pub mod repository;
pub mod storage;

// Request pipeline: cookie pre-pass, guards, handlers, views.
pub mod auth;
pub mod guards;
pub mod handlers;
pub mod session;
pub mod views;

pub mod config;
pub mod error;
pub mod models;

// Declarative route table.
pub mod routes;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use identity::{IdentityState, MockIdentityService, SupabaseIdentity};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document for the JSON API, served at `/api-docs/openapi.json`.
/// Page routes are not part of it.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::signin, handlers::auth::signup,
        handlers::twitter::passport_authenticate, handlers::twitter::passport_auth_callback,
        handlers::users::get_users, handlers::users::get_user, handlers::users::block_user,
        handlers::invites::save_new_invite, handlers::invites::get_all_invites,
        handlers::invites::search_invites_api, handlers::invites::get_one_invite,
        handlers::invites::update_invite, handlers::invites::delete_invite,
        handlers::invites::upvote_invite,
        handlers::comments::get_comments, handlers::comments::create_comment,
        handlers::notifications::get_notifications, handlers::notifications::create_notification,
        handlers::metrics::get_metrics,
    ),
    components(
        schemas(
            models::User, models::PublicUser, models::Invite, models::Comment,
            models::Notification, models::Metrics, models::VoteType, models::SigninForm,
            models::SignupForm, models::InviteForm, models::InviteUpdate, models::CommentForm,
            models::NotificationForm, models::MessageResponse, models::AuthResponse,
        )
    ),
    tags(
        (name = "invite-board", description = "Job invite board API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container of shared services and configuration,
/// cloned into every request.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    /// Object store for invite images.
    pub storage: StorageState,
    /// External identity provider (password checks and OAuth).
    pub identity: IdentityState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Builds the route table, then wraps it (fallback included) in the cookie
/// pre-pass and the observability layers.
///
/// Request flow, outermost first: CORS, request id, tracing, `validate_cookies`,
/// `sign_user_in`, `sign_user_out`, routing, guard chain, handler.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");
    let config = state.config.clone();

    let app = routes::build_router(&state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        // Cookie pre-pass. Added innermost first, so `validate_cookies` runs first.
        .layer(middleware::from_fn(session::sign_user_out))
        .layer(middleware::from_fn_with_state(
            config.clone(),
            session::sign_user_in,
        ))
        .layer(middleware::from_fn_with_state(
            config,
            session::validate_cookies,
        ));

    app.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
    .layer(cors)
}

/// trace_span_logger
///
/// Span for `TraceLayer` carrying the `x-request-id` set by `SetRequestIdLayer`,
/// so every log line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
