use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin-dashboard", get(handlers::admin_dashboard))
        .route("/admin-view-student", get(handlers::admin_view_student))
        .route("/api/admin/delete-user", post(handlers::delete_user))
}
