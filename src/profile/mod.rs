use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user-dashboard", get(handlers::user_dashboard))
        .route("/api/update-profile", post(handlers::update_profile))
        .route("/api/cv-content", post(handlers::cv_content))
}
