use axum::{routing::post, Router};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/add-experience", post(handlers::add_experience))
        .route("/api/update-experience", post(handlers::update_experience))
        .route("/api/delete-experience", post(handlers::delete_experience))
}
