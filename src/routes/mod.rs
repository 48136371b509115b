/// Route Table
///
/// Every endpoint is declared as data: verb, path, the ordered guards that run
/// in front of it, the handler's name and the handler itself. `build_router`
/// turns the table into an axum `Router`, wrapping each entry in one
/// `run_chain` middleware that executes its guards in declared order.
///
/// Page routes (HTML views) and the JSON API live in separate tables.
pub mod api;
pub mod pages;

use axum::{
    Json, Router,
    http::{Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{MethodFilter, MethodRouter, get},
};

use crate::{
    AppState,
    guards::{Guard, GuardChain, run_chain},
    views::route_not_found,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    pub fn filter(self) -> MethodFilter {
        match self {
            Self::Get => MethodFilter::GET,
            Self::Post => MethodFilter::POST,
            Self::Put => MethodFilter::PUT,
            Self::Patch => MethodFilter::PATCH,
            Self::Delete => MethodFilter::DELETE,
        }
    }

    pub fn method(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Post => Method::POST,
            Self::Put => Method::PUT,
            Self::Patch => Method::PATCH,
            Self::Delete => Method::DELETE,
        }
    }
}

/// Builds the terminal handler of a route for the given method filter.
pub type Endpoint = fn(MethodFilter) -> MethodRouter<AppState>;

/// RouteSpec
///
/// One row of the route table.
#[derive(Clone, Copy)]
pub struct RouteSpec {
    pub verb: Verb,
    /// axum path syntax (`/post/{inviteId}`).
    pub path: &'static str,
    /// Run in this order; the first guard that answers ends the request.
    pub guards: &'static [Guard],
    pub handler: &'static str,
    pub endpoint: Endpoint,
}

impl RouteSpec {
    pub const fn new(
        verb: Verb,
        path: &'static str,
        guards: &'static [Guard],
        handler: &'static str,
        endpoint: Endpoint,
    ) -> Self {
        Self {
            verb,
            path,
            guards,
            handler,
            endpoint,
        }
    }
}

impl std::fmt::Debug for RouteSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteSpec")
            .field("verb", &self.verb)
            .field("path", &self.path)
            .field("guards", &self.guards)
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

/// The complete table: pages first, then the API.
pub fn route_table() -> Vec<RouteSpec> {
    let mut table = pages::routes();
    table.extend(api::routes());
    table
}

/// Catch-all for unmatched paths and for unregistered methods on known paths.
pub async fn route_not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(route_not_found()))
}

/// build_router
///
/// Registers every table entry behind its guard chain. Entries sharing a path
/// are merged into one method router; each keeps its own chain.
pub fn build_router(state: &AppState) -> Router<AppState> {
    let mut router = Router::new();

    for spec in route_table() {
        let chain = GuardChain {
            state: state.clone(),
            guards: spec.guards,
            handler: spec.handler,
        };
        let endpoint = (spec.endpoint)(spec.verb.filter())
            .route_layer(middleware::from_fn_with_state(chain, run_chain));
        router = router.route(spec.path, endpoint);
    }

    router
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        .fallback(route_not_found_handler)
        .method_not_allowed_fallback(route_not_found_handler)
}
