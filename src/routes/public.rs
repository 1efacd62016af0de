use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Unauthenticated endpoints. Catalog reads here only ever expose approved
/// classes and instructor profiles.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::root))
        // GET /health
        // Load balancer probe.
        .route("/health", get(|| async { "ok" }))
        // POST /jwt
        // Issues a one-hour identity token for the posted email.
        .route("/jwt", post(handlers::issue_jwt))
        // PUT/GET /users/{email}
        // First sign-in creates the profile as a student; later calls merge fields.
        .route(
            "/users/{id}",
            get(handlers::get_user).put(handlers::upsert_user),
        )
        // GET /classes
        // Landing page: top six approved classes by enrollment.
        .route("/classes", get(handlers::get_popular_classes))
        .route("/allClasses", get(handlers::get_approved_classes))
        // GET /instructors
        // Landing page: top six instructors by students taught.
        .route("/instructors", get(handlers::get_popular_instructors))
        .route("/allInstructors", get(handlers::get_all_instructors))
        .route("/studentFeedback", get(handlers::get_student_feedback))
}
