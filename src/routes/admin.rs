use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch},
};

/// Admin Router Module
///
/// User administration and class moderation.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::list_users))
        .route("/users/admin/{email}", get(handlers::check_admin))
        // PATCH /users/{id}
        // Role change; promotion to instructor resets the students counter.
        .route("/users/{id}", patch(handlers::set_user_role))
        .route("/allClasses/admin", get(handlers::get_all_classes_admin))
        // PATCH /classes/{id}
        // Moderation: pending -> approved | rejected.
        .route("/classes/{id}", patch(handlers::set_class_status))
        .route("/classes/admin/{id}", patch(handlers::set_class_feedback))
}
