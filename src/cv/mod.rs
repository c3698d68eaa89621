use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub mod handlers;
pub mod pdf;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/upload-cv", post(handlers::upload_cv))
        .route("/api/download-cv", get(handlers::download_cv))
        .route(
            "/api/delete-cv",
            get(handlers::delete_cv).post(handlers::delete_cv),
        )
        .route(
            "/api/generate-cv",
            get(handlers::generate_cv).post(handlers::generate_cv),
        )
        // Uploads are capped at 5MB by the handler; leave headroom for the
        // multipart framing around the file.
        .layer(DefaultBodyLimit::max(6 * 1024 * 1024))
}
