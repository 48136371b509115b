use std::future::{Ready, ready};

use axum::extract::State;

use crate::{AppState, error::AppResult, session::Session, views::Page};

/// A handler rendering `view` with nothing but the session in its context.
pub fn render(
    view: &'static str,
) -> impl Fn(Session) -> Ready<Page> + Clone + Send + Sync + 'static {
    move |session: Session| ready(Page::new(view, &session))
}

/// Like `render`, but the navbar is always the signed-out one.
pub fn render_anonymous(
    view: &'static str,
) -> impl Fn() -> Ready<Page> + Clone + Send + Sync + 'static {
    move || ready(Page::anonymous(view))
}

/// render_index
///
/// Landing page with the site counters.
pub async fn render_index(State(state): State<AppState>, session: Session) -> AppResult<Page> {
    let metrics = state.repo.get_metrics().await?;
    Ok(Page::new("index", &session).with("metrics", metrics))
}
