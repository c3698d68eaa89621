use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod password;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(handlers::login_page).post(handlers::login_submit))
        .route("/register", get(handlers::register_page).post(handlers::register_submit))
        .route("/logout", get(handlers::logout))
        .route("/api/login", post(handlers::api_login))
        .route("/api/register", post(handlers::api_register))
}
