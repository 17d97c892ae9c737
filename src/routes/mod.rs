//! Route modules for the media uploader

pub mod health;
pub mod upload;

use axum::Router;

use crate::state::AppState;

/// All routes, with state applied
pub fn app(state: AppState) -> Router {
    let body_limit = state.config().upload.body_limit;

    Router::new()
        .merge(health::router())
        .merge(upload::router(body_limit))
        .with_state(state)
}
