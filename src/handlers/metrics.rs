use axum::{Json, extract::State};

use crate::{AppState, error::AppResult, models::Metrics};

/// get_metrics
///
/// Site-wide counts of users, invites and comments.
#[utoipa::path(
    get,
    path = "/api/v1/metrics",
    responses((status = 200, description = "Counts", body = Metrics))
)]
pub async fn get_metrics(State(state): State<AppState>) -> AppResult<Json<Metrics>> {
    Ok(Json(state.repo.get_metrics().await?))
}
