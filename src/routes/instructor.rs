use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Instructor Router Module
///
/// Class authoring. The owning instructor is always the caller; edits to someone
/// else's listing find nothing and return 404.
pub fn instructor_routes() -> Router<AppState> {
    Router::new()
        .route("/users/instructor/{email}", get(handlers::check_instructor))
        .route(
            "/classes/instructor/{email}",
            get(handlers::get_instructor_classes),
        )
        // POST /classes/instructor
        // New listings enter moderation as `pending`.
        .route("/classes/instructor", post(handlers::create_class))
        .route("/classes/{id}", put(handlers::update_class))
}
