use crate::{
    AppState,
    auth::{AuthUser, issue_token},
    enrollment::{EnrollmentOutcome, EnrollmentService},
    error::AppError,
    extract::{AppJson, AppPath},
    gate::ensure_self,
    models::{
        AdminCheck, ClassListing, ClassStatus, CreateClassRequest, EnrollRequest, EnrolledClass,
        InstructorCheck, PaymentIntentRequest, PaymentIntentResponse, ProfilePatch, Role,
        SelectClassRequest, SelectedClass, SetFeedbackRequest, SetRoleRequest, SetStatusRequest,
        StudentFeedback, TokenRequest, UpdateClassRequest, User,
    },
    payment::to_minor_units,
    repository::{ProfileQuery, TOP_N},
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

// --- Public Handlers ---

/// root
///
/// [Public Route] Liveness banner.
pub async fn root() -> &'static str {
    "TalkTrove server is running"
}

/// issue_jwt
///
/// [Public Route] Signs an identity token for `email`. The token is the raw body.
#[utoipa::path(
    post,
    path = "/jwt",
    request_body = TokenRequest,
    responses((status = 200, description = "Signed identity token", body = String))
)]
pub async fn issue_jwt(
    State(state): State<AppState>,
    AppJson(payload): AppJson<TokenRequest>,
) -> Result<String, AppError> {
    if payload.email.trim().is_empty() {
        return Err(AppError::BadRequest("email is required".to_string()));
    }
    issue_token(
        &payload.email,
        &state.config.jwt_secret,
        state.config.token_ttl_secs,
    )
}

/// upsert_user
///
/// [Public Route] Creates the profile on first sign-in (always as `student`) or
/// merges the provided profile fields into the existing one.
#[utoipa::path(
    put,
    path = "/users/{email}",
    params(("email" = String, Path, description = "Profile email")),
    request_body = ProfilePatch,
    responses((status = 200, description = "Stored profile", body = User))
)]
pub async fn upsert_user(
    State(state): State<AppState>,
    AppPath(email): AppPath<String>,
    AppJson(patch): AppJson<ProfilePatch>,
) -> Result<Json<User>, AppError> {
    let user = state.repo.upsert_profile(&email, patch).await?;
    Ok(Json(user))
}

/// get_user
///
/// [Public Route] Fetches a profile by email. An unknown email yields a `null` body.
#[utoipa::path(
    get,
    path = "/users/{email}",
    params(("email" = String, Path, description = "Profile email")),
    responses((status = 200, description = "Profile or null", body = User))
)]
pub async fn get_user(
    State(state): State<AppState>,
    AppPath(email): AppPath<String>,
) -> Result<Json<Option<User>>, AppError> {
    Ok(Json(state.repo.get_profile(&email).await?))
}

/// get_popular_classes
///
/// [Public Route] The six approved classes with the most enrolled students.
#[utoipa::path(
    get,
    path = "/classes",
    responses((status = 200, description = "Top approved classes", body = [ClassListing]))
)]
pub async fn get_popular_classes(
    State(state): State<AppState>,
) -> Result<Json<Vec<ClassListing>>, AppError> {
    let classes = state.repo.list_approved_classes(true, Some(TOP_N)).await?;
    Ok(Json(classes))
}

/// get_approved_classes
///
/// [Public Route] Every approved class.
#[utoipa::path(
    get,
    path = "/allClasses",
    responses((status = 200, description = "Approved classes", body = [ClassListing]))
)]
pub async fn get_approved_classes(
    State(state): State<AppState>,
) -> Result<Json<Vec<ClassListing>>, AppError> {
    let classes = state.repo.list_approved_classes(false, None).await?;
    Ok(Json(classes))
}

/// get_popular_instructors
///
/// [Public Route] The six instructors with the most students.
#[utoipa::path(
    get,
    path = "/instructors",
    responses((status = 200, description = "Top instructors", body = [User]))
)]
pub async fn get_popular_instructors(
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, AppError> {
    let instructors = state
        .repo
        .list_profiles(ProfileQuery::top_instructors())
        .await?;
    Ok(Json(instructors))
}

#[utoipa::path(
    get,
    path = "/allInstructors",
    responses((status = 200, description = "All instructors", body = [User]))
)]
pub async fn get_all_instructors(
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, AppError> {
    let instructors = state.repo.list_profiles(ProfileQuery::instructors()).await?;
    Ok(Json(instructors))
}

#[utoipa::path(
    get,
    path = "/studentFeedback",
    responses((status = 200, description = "Student testimonials", body = [StudentFeedback]))
)]
pub async fn get_student_feedback(
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentFeedback>>, AppError> {
    Ok(Json(state.repo.list_student_feedback().await?))
}

// --- Authenticated Handlers ---

/// select_class
///
/// [Authenticated Route] Stages a class for the caller. The staging record
/// snapshots the listing so the cart renders without another lookup. Only
/// approved listings can be staged; anything else is a 404.
#[utoipa::path(
    post,
    path = "/classes",
    request_body = SelectClassRequest,
    responses(
        (status = 200, description = "Staged", body = SelectedClass),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Unknown or unapproved class")
    )
)]
pub async fn select_class(
    AuthUser { email }: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SelectClassRequest>,
) -> Result<Json<SelectedClass>, AppError> {
    let listing = state
        .repo
        .get_class(payload.class_id)
        .await?
        .filter(|class| class.status == ClassStatus::Approved)
        .ok_or(AppError::NotFound("class"))?;

    let selection = SelectedClass {
        id: Uuid::new_v4(),
        user_email: email,
        class_id: listing.id,
        class_name: listing.class_name,
        instructor_email: listing.instructor_email,
        instructor_name: listing.instructor_name,
        image: listing.image,
        price: listing.price,
        created_at: Utc::now(),
    };

    Ok(Json(state.repo.select_class(selection).await?))
}

/// get_selected_classes
///
/// [Authenticated Route] The caller's staged classes.
#[utoipa::path(
    get,
    path = "/classes/{email}",
    params(("email" = String, Path, description = "Caller's email")),
    responses(
        (status = 200, description = "Staged classes", body = [SelectedClass]),
        (status = 403, description = "Not the caller's email")
    )
)]
pub async fn get_selected_classes(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(email): AppPath<String>,
) -> Result<Json<Vec<SelectedClass>>, AppError> {
    ensure_self(&user, &email)?;
    Ok(Json(state.repo.list_selected_classes(&email).await?))
}

/// delete_selected_class
///
/// [Authenticated Route] Removes one of the caller's staging records.
#[utoipa::path(
    delete,
    path = "/classes/{id}",
    params(("id" = Uuid, Path, description = "Staging record ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found or not the caller's")
    )
)]
pub async fn delete_selected_class(
    AuthUser { email }: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.repo.delete_selected_class(id, &email).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("selected class"))
    }
}

/// create_payment_intent
///
/// [Authenticated Route] Asks the payment processor for an intent covering `price`.
#[utoipa::path(
    post,
    path = "/create-payment-intent",
    request_body = PaymentIntentRequest,
    responses(
        (status = 200, description = "Intent created", body = PaymentIntentResponse),
        (status = 400, description = "Invalid price"),
        (status = 502, description = "Processor failure")
    )
)]
pub async fn create_payment_intent(
    AuthUser { email }: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<PaymentIntentRequest>,
) -> Result<Json<PaymentIntentResponse>, AppError> {
    let amount = to_minor_units(payload.price)?;
    tracing::debug!(email = %email, amount, "creating payment intent");

    let client_secret = state.payments.create_payment_intent(amount).await?;
    Ok(Json(PaymentIntentResponse { client_secret }))
}

/// enroll
///
/// [Authenticated Route] Runs the enrollment transition for the caller once the
/// payment has been confirmed client-side. `409` when nothing changed.
#[utoipa::path(
    post,
    path = "/enroll/{id}",
    params(("id" = Uuid, Path, description = "Class ID")),
    request_body = EnrollRequest,
    responses(
        (status = 200, description = "Enrolled", body = EnrolledClass),
        (status = 409, description = "Unknown class, no seats left, or already enrolled")
    )
)]
pub async fn enroll(
    AuthUser { email }: AuthUser,
    State(state): State<AppState>,
    AppPath(class_id): AppPath<Uuid>,
    AppJson(payload): AppJson<EnrollRequest>,
) -> Result<Json<EnrolledClass>, AppError> {
    let service = EnrollmentService::new(state.repo.clone());

    match service.enroll(class_id, &email, payload).await? {
        EnrollmentOutcome::Enrolled(record) => Ok(Json(record)),
        EnrollmentOutcome::Unchanged => Err(AppError::Conflict(
            "enrollment not applied: class unavailable, full, or already enrolled".to_string(),
        )),
    }
}

#[utoipa::path(
    get,
    path = "/enrolledClasses/{email}",
    params(("email" = String, Path, description = "Caller's email")),
    responses((status = 200, description = "Enrolled classes", body = [EnrolledClass]))
)]
pub async fn get_enrolled_classes(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(email): AppPath<String>,
) -> Result<Json<Vec<EnrolledClass>>, AppError> {
    ensure_self(&user, &email)?;
    Ok(Json(state.repo.list_enrolled_classes(&email).await?))
}

/// get_payment_history
///
/// [Authenticated Route] The caller's enrollment records, oldest first.
#[utoipa::path(
    get,
    path = "/paymentHistory/{email}",
    params(("email" = String, Path, description = "Caller's email")),
    responses((status = 200, description = "Payment history", body = [EnrolledClass]))
)]
pub async fn get_payment_history(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(email): AppPath<String>,
) -> Result<Json<Vec<EnrolledClass>>, AppError> {
    ensure_self(&user, &email)?;
    Ok(Json(state.repo.payment_history(&email).await?))
}

// --- Instructor Handlers ---

/// check_instructor
///
/// [Instructor Route] Whether `email` currently holds the instructor role.
#[utoipa::path(
    get,
    path = "/users/instructor/{email}",
    params(("email" = String, Path, description = "Profile email")),
    responses((status = 200, description = "Role check", body = InstructorCheck))
)]
pub async fn check_instructor(
    State(state): State<AppState>,
    AppPath(email): AppPath<String>,
) -> Result<Json<InstructorCheck>, AppError> {
    let profile = state.repo.get_profile(&email).await?;
    Ok(Json(InstructorCheck {
        instructor: profile.is_some_and(|u| u.role == Role::Instructor),
    }))
}

#[utoipa::path(
    get,
    path = "/classes/instructor/{email}",
    params(("email" = String, Path, description = "Instructor email")),
    responses((status = 200, description = "Instructor's classes", body = [ClassListing]))
)]
pub async fn get_instructor_classes(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(email): AppPath<String>,
) -> Result<Json<Vec<ClassListing>>, AppError> {
    ensure_self(&user, &email)?;
    Ok(Json(state.repo.list_classes_by_instructor(&email).await?))
}

/// create_class
///
/// [Instructor Route] Adds a listing owned by the caller, pending moderation.
#[utoipa::path(
    post,
    path = "/classes/instructor",
    request_body = CreateClassRequest,
    responses(
        (status = 200, description = "Created", body = ClassListing),
        (status = 400, description = "Invalid fields")
    )
)]
pub async fn create_class(
    AuthUser { email }: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateClassRequest>,
) -> Result<Json<ClassListing>, AppError> {
    payload.validate().map_err(AppError::BadRequest)?;
    let class = state.repo.create_class(&email, payload).await?;
    tracing::info!(class_id = %class.id, instructor = %email, "class created");
    Ok(Json(class))
}

/// update_class
///
/// [Instructor Route] Partial edit of the caller's own listing.
#[utoipa::path(
    put,
    path = "/classes/{id}",
    params(("id" = Uuid, Path, description = "Class ID")),
    request_body = UpdateClassRequest,
    responses(
        (status = 200, description = "Updated", body = ClassListing),
        (status = 404, description = "Not found or not the caller's")
    )
)]
pub async fn update_class(
    AuthUser { email }: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateClassRequest>,
) -> Result<Json<ClassListing>, AppError> {
    payload.validate().map_err(AppError::BadRequest)?;
    state
        .repo
        .update_class(id, &email, payload)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("class"))
}

// --- Admin Handlers ---

#[utoipa::path(
    get,
    path = "/users",
    responses((status = 200, description = "All profiles", body = [User]))
)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.repo.list_profiles(ProfileQuery::default()).await?))
}

/// check_admin
///
/// [Admin Route] Whether `email` currently holds the admin role.
#[utoipa::path(
    get,
    path = "/users/admin/{email}",
    params(("email" = String, Path, description = "Profile email")),
    responses((status = 200, description = "Role check", body = AdminCheck))
)]
pub async fn check_admin(
    State(state): State<AppState>,
    AppPath(email): AppPath<String>,
) -> Result<Json<AdminCheck>, AppError> {
    let profile = state.repo.get_profile(&email).await?;
    Ok(Json(AdminCheck {
        admin: profile.is_some_and(|u| u.role == Role::Admin),
    }))
}

/// set_user_role
///
/// [Admin Route] Changes a profile's role. Promotion to instructor resets the
/// `students` counter to zero.
#[utoipa::path(
    patch,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "Profile ID")),
    request_body = SetRoleRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 404, description = "Unknown profile")
    )
)]
pub async fn set_user_role(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<SetRoleRequest>,
) -> Result<Json<User>, AppError> {
    let user = state
        .repo
        .set_role(id, payload.role)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    tracing::info!(user_id = %id, role = %user.role, "role changed");
    Ok(Json(user))
}

#[utoipa::path(
    get,
    path = "/allClasses/admin",
    responses((status = 200, description = "Every class", body = [ClassListing]))
)]
pub async fn get_all_classes_admin(
    State(state): State<AppState>,
) -> Result<Json<Vec<ClassListing>>, AppError> {
    Ok(Json(state.repo.list_all_classes().await?))
}

/// set_class_status
///
/// [Admin Route] Moderation: approve or reject a listing.
#[utoipa::path(
    patch,
    path = "/classes/{id}",
    params(("id" = Uuid, Path, description = "Class ID")),
    request_body = SetStatusRequest,
    responses(
        (status = 200, description = "Updated", body = ClassListing),
        (status = 404, description = "Unknown class")
    )
)]
pub async fn set_class_status(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<SetStatusRequest>,
) -> Result<Json<ClassListing>, AppError> {
    if payload.status == ClassStatus::Pending {
        return Err(AppError::BadRequest(
            "status must be approved or rejected".to_string(),
        ));
    }
    state
        .repo
        .set_class_status(id, payload.status)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("class"))
}

#[utoipa::path(
    patch,
    path = "/classes/admin/{id}",
    params(("id" = Uuid, Path, description = "Class ID")),
    request_body = SetFeedbackRequest,
    responses(
        (status = 200, description = "Updated", body = ClassListing),
        (status = 404, description = "Unknown class")
    )
)]
pub async fn set_class_feedback(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<SetFeedbackRequest>,
) -> Result<Json<ClassListing>, AppError> {
    state
        .repo
        .set_class_feedback(id, &payload.feedback)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("class"))
}
