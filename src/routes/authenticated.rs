use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Student-facing flows: staging classes, paying, enrolling, and reading one's
/// own history. Handlers receive the caller's `AuthUser`; self-scoped reads
/// additionally require the path email to be the caller's.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /classes
        // Stages a class (snapshot of the listing) for the caller.
        .route("/classes", post(handlers::select_class))
        // GET /classes/{email}, DELETE /classes/{id}
        .route(
            "/classes/{id}",
            get(handlers::get_selected_classes).delete(handlers::delete_selected_class),
        )
        .route(
            "/create-payment-intent",
            post(handlers::create_payment_intent),
        )
        // POST /enroll/{id}
        // Enrollment transition for a paid class.
        .route("/enroll/{id}", post(handlers::enroll))
        .route(
            "/enrolledClasses/{email}",
            get(handlers::get_enrolled_classes),
        )
        .route("/paymentHistory/{email}", get(handlers::get_payment_history))
}
