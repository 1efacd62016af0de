use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod enrollment;
pub mod error;
pub mod extract;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod payment;
pub mod repository;

// Routers segregated by gate (public, authenticated, instructor, admin).
pub mod routes;
use routes::{admin, authenticated, instructor, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use payment::{MockPaymentService, PaymentState, StripePaymentClient};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document aggregated from every `#[utoipa::path]` handler, served at
/// `/api-docs/openapi.json` and browsable through Swagger UI.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::issue_jwt, handlers::upsert_user, handlers::get_user,
        handlers::get_popular_classes, handlers::get_approved_classes,
        handlers::get_popular_instructors, handlers::get_all_instructors,
        handlers::get_student_feedback, handlers::select_class, handlers::get_selected_classes,
        handlers::delete_selected_class, handlers::create_payment_intent, handlers::enroll,
        handlers::get_enrolled_classes, handlers::get_payment_history,
        handlers::check_instructor, handlers::get_instructor_classes, handlers::create_class,
        handlers::update_class, handlers::list_users, handlers::check_admin,
        handlers::set_user_role, handlers::get_all_classes_admin, handlers::set_class_status,
        handlers::set_class_feedback
    ),
    components(
        schemas(
            models::Role, models::ClassStatus, models::User, models::ClassListing,
            models::SelectedClass, models::EnrolledClass, models::StudentFeedback,
            models::TokenRequest, models::ProfilePatch, models::SetRoleRequest,
            models::CreateClassRequest, models::UpdateClassRequest, models::SetStatusRequest,
            models::SetFeedbackRequest, models::SelectClassRequest, models::PaymentIntentRequest,
            models::EnrollRequest, models::PaymentIntentResponse, models::AdminCheck,
            models::InstructorCheck,
        )
    ),
    tags(
        (name = "talktrove", description = "TalkTrove course enrollment API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container for every request: persistence, payment adapter
/// and configuration. Cloning is cheap (two `Arc`s and a config struct).
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// Payment processor adapter.
    pub payments: PaymentState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for PaymentState {
    fn from_ref(app_state: &AppState) -> PaymentState {
        app_state.payments.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the route groups, each behind its gate, and wraps the whole app in
/// request-id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                gate::require_authenticated,
            )),
        )
        .merge(
            instructor::instructor_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                gate::require_instructor,
            )),
        )
        .merge(
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                gate::require_admin,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for each request, correlated by the generated `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
