use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use talktrove_api::{
    AppError, AppState, InMemoryRepository, MockPaymentService,
    auth::{AuthUser, verify_token},
    config::AppConfig,
    extract::{AppJson, AppPath},
    handlers,
    models::{
        ClassListing, ClassStatus, CreateClassRequest, EnrollRequest, PaymentIntentRequest,
        ProfilePatch, Role, SelectClassRequest, SetRoleRequest, SetStatusRequest,
        StudentFeedback, TokenRequest, UpdateClassRequest, User,
    },
    repository::Repository,
};
use uuid::Uuid;

const INSTRUCTOR: &str = "ines@talktrove.test";
const STUDENT: &str = "stu@talktrove.test";

// --- Helper Functions ---

fn create_state(repo: Arc<InMemoryRepository>, payments: MockPaymentService) -> AppState {
    AppState {
        repo,
        payments: Arc::new(payments),
        config: AppConfig::default(),
    }
}

fn caller(email: &str) -> AuthUser {
    AuthUser {
        email: email.to_string(),
    }
}

async fn seeded_repo() -> (Arc<InMemoryRepository>, Uuid) {
    let repo = Arc::new(InMemoryRepository::new());
    let class_id = Uuid::new_v4();

    repo.seed_profile(User {
        id: Uuid::new_v4(),
        email: INSTRUCTOR.to_string(),
        name: Some("Ines".to_string()),
        role: Role::Instructor,
        students: Some(0),
        ..User::default()
    })
    .await;

    repo.seed_class(ClassListing {
        id: class_id,
        instructor_email: INSTRUCTOR.to_string(),
        instructor_name: Some("Ines".to_string()),
        class_name: "Portuguese Basics".to_string(),
        image: Some("https://img.test/pt.png".to_string()),
        price: 19.99,
        seats: 2,
        status: ClassStatus::Approved,
        ..ClassListing::default()
    })
    .await;

    (repo, class_id)
}

// --- Public Handlers ---

#[tokio::test]
async fn test_issue_jwt_signs_posted_email() {
    let (repo, _) = seeded_repo().await;
    let state = create_state(repo, MockPaymentService::new());
    let secret = state.config.jwt_secret.clone();

    let token = handlers::issue_jwt(
        State(state),
        AppJson(TokenRequest {
            email: STUDENT.to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(verify_token(&token, &secret).unwrap(), STUDENT);
}

#[tokio::test]
async fn test_issue_jwt_rejects_blank_email() {
    let (repo, _) = seeded_repo().await;
    let state = create_state(repo, MockPaymentService::new());

    let result = handlers::issue_jwt(
        State(state),
        AppJson(TokenRequest {
            email: "  ".to_string(),
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn test_upsert_then_get_user() {
    let (repo, _) = seeded_repo().await;
    let state = create_state(repo, MockPaymentService::new());

    let missing = handlers::get_user(State(state.clone()), AppPath(STUDENT.to_string()))
        .await
        .unwrap();
    assert!(missing.0.is_none());

    let Json(created) = handlers::upsert_user(
        State(state.clone()),
        AppPath(STUDENT.to_string()),
        AppJson(ProfilePatch {
            name: Some("Stu".to_string()),
            photo_url: None,
        }),
    )
    .await
    .unwrap();
    assert_eq!(created.role, Role::Student);

    let Json(found) = handlers::get_user(State(state), AppPath(STUDENT.to_string()))
        .await
        .unwrap();
    assert_eq!(found.map(|u| u.id), Some(created.id));
}

#[tokio::test]
async fn test_public_catalog_hides_unapproved_classes() {
    let (repo, _) = seeded_repo().await;
    repo.seed_class(ClassListing {
        id: Uuid::new_v4(),
        instructor_email: INSTRUCTOR.to_string(),
        class_name: "Draft".to_string(),
        status: ClassStatus::Pending,
        ..ClassListing::default()
    })
    .await;
    let state = create_state(repo, MockPaymentService::new());

    let Json(popular) = handlers::get_popular_classes(State(state.clone()))
        .await
        .unwrap();
    let Json(all) = handlers::get_approved_classes(State(state)).await.unwrap();

    assert_eq!(popular.len(), 1);
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].class_name, "Portuguese Basics");
}

#[tokio::test]
async fn test_instructor_and_feedback_listings() {
    let (repo, _) = seeded_repo().await;
    repo.seed_feedback(StudentFeedback {
        id: Uuid::new_v4(),
        name: "Ana".to_string(),
        feedback: "Loved it".to_string(),
        ..StudentFeedback::default()
    })
    .await;
    let state = create_state(repo, MockPaymentService::new());

    let Json(top) = handlers::get_popular_instructors(State(state.clone()))
        .await
        .unwrap();
    let Json(all) = handlers::get_all_instructors(State(state.clone()))
        .await
        .unwrap();
    let Json(feedback) = handlers::get_student_feedback(State(state)).await.unwrap();

    assert_eq!(top.len(), 1);
    assert_eq!(all[0].email, INSTRUCTOR);
    assert_eq!(feedback[0].feedback, "Loved it");
}

// --- Authenticated Handlers ---

#[tokio::test]
async fn test_select_class_snapshots_listing() {
    let (repo, class_id) = seeded_repo().await;
    let state = create_state(repo.clone(), MockPaymentService::new());

    let Json(selection) = handlers::select_class(
        caller(STUDENT),
        State(state),
        AppJson(SelectClassRequest { class_id }),
    )
    .await
    .unwrap();

    assert_eq!(selection.user_email, STUDENT);
    assert_eq!(selection.class_name, "Portuguese Basics");
    assert_eq!(selection.instructor_email, INSTRUCTOR);
    assert_eq!(selection.price, 19.99);
    assert_eq!(repo.list_selected_classes(STUDENT).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_select_unknown_class_is_not_found() {
    let (repo, _) = seeded_repo().await;
    let state = create_state(repo.clone(), MockPaymentService::new());

    let result = handlers::select_class(
        caller(STUDENT),
        State(state),
        AppJson(SelectClassRequest {
            class_id: Uuid::new_v4(),
        }),
    )
    .await;

    let err = result.unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    assert!(repo.selected_snapshot().await.is_empty());
}

#[tokio::test]
async fn test_unapproved_class_cannot_be_staged_or_enrolled() {
    let (repo, _) = seeded_repo().await;
    let draft_id = Uuid::new_v4();
    repo.seed_class(ClassListing {
        id: draft_id,
        instructor_email: INSTRUCTOR.to_string(),
        class_name: "Draft".to_string(),
        seats: 5,
        status: ClassStatus::Pending,
        ..ClassListing::default()
    })
    .await;
    let state = create_state(repo.clone(), MockPaymentService::new());

    let staged = handlers::select_class(
        caller(STUDENT),
        State(state.clone()),
        AppJson(SelectClassRequest { class_id: draft_id }),
    )
    .await;
    assert!(matches!(staged, Err(AppError::NotFound(_))));
    assert!(repo.selected_snapshot().await.is_empty());

    let enrolled = handlers::enroll(
        caller(STUDENT),
        State(state),
        AppPath(draft_id),
        AppJson(EnrollRequest {
            price: 0.0,
            transaction_id: "pi_draft".to_string(),
        }),
    )
    .await;
    assert!(matches!(enrolled, Err(AppError::Conflict(_))));
    assert!(repo.enrolled_snapshot().await.is_empty());

    let draft = repo.get_class(draft_id).await.unwrap().unwrap();
    assert_eq!(draft.seats, 5);
    assert_eq!(draft.enrolled_students, 0);
}

#[tokio::test]
async fn test_delete_selected_class_of_someone_else_is_not_found() {
    let (repo, class_id) = seeded_repo().await;
    let state = create_state(repo.clone(), MockPaymentService::new());

    let Json(selection) = handlers::select_class(
        caller(STUDENT),
        State(state.clone()),
        AppJson(SelectClassRequest { class_id }),
    )
    .await
    .unwrap();

    let stranger = handlers::delete_selected_class(
        caller("other@talktrove.test"),
        State(state.clone()),
        AppPath(selection.id),
    )
    .await;
    assert!(matches!(stranger, Err(AppError::NotFound(_))));

    let owner =
        handlers::delete_selected_class(caller(STUDENT), State(state), AppPath(selection.id))
            .await
            .unwrap();
    assert_eq!(owner, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_payment_intent_uses_minor_units() {
    let (repo, _) = seeded_repo().await;
    let state = create_state(repo, MockPaymentService::new());

    let Json(intent) = handlers::create_payment_intent(
        caller(STUDENT),
        State(state),
        AppJson(PaymentIntentRequest { price: 19.99 }),
    )
    .await
    .unwrap();

    assert_eq!(intent.client_secret, "pi_mock_1999_secret_test");
}

#[tokio::test]
async fn test_payment_processor_failure_is_bad_gateway() {
    let (repo, _) = seeded_repo().await;
    let state = create_state(repo, MockPaymentService::new_failing());

    let result = handlers::create_payment_intent(
        caller(STUDENT),
        State(state),
        AppJson(PaymentIntentRequest { price: 10.0 }),
    )
    .await;

    let err = result.unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_enroll_twice_is_conflict() {
    let (repo, class_id) = seeded_repo().await;
    let state = create_state(repo.clone(), MockPaymentService::new());
    let payment = EnrollRequest {
        price: 19.99,
        transaction_id: "pi_handler".to_string(),
    };

    let Json(record) = handlers::enroll(
        caller(STUDENT),
        State(state.clone()),
        AppPath(class_id),
        AppJson(payment.clone()),
    )
    .await
    .unwrap();
    assert_eq!(record.class_name, "Portuguese Basics");

    let again = handlers::enroll(
        caller(STUDENT),
        State(state.clone()),
        AppPath(class_id),
        AppJson(payment),
    )
    .await;
    assert!(matches!(again, Err(AppError::Conflict(_))));

    let Json(enrolled) = handlers::get_enrolled_classes(
        caller(STUDENT),
        State(state.clone()),
        AppPath(STUDENT.to_string()),
    )
    .await
    .unwrap();
    assert_eq!(enrolled.len(), 1);

    let Json(history) =
        handlers::get_payment_history(caller(STUDENT), State(state), AppPath(STUDENT.to_string()))
            .await
            .unwrap();
    assert_eq!(history[0].transaction_id, "pi_handler");
}

// --- Instructor Handlers ---

#[tokio::test]
async fn test_create_class_enters_moderation() {
    let (repo, _) = seeded_repo().await;
    let state = create_state(repo, MockPaymentService::new());

    let Json(class) = handlers::create_class(
        caller(INSTRUCTOR),
        State(state.clone()),
        AppJson(CreateClassRequest {
            class_name: "Advanced Portuguese".to_string(),
            instructor_name: Some("Ines".to_string()),
            image: None,
            price: 45.0,
            seats: 12,
            date: None,
        }),
    )
    .await
    .unwrap();

    assert_eq!(class.status, ClassStatus::Pending);
    assert_eq!(class.enrolled_students, 0);
    assert_eq!(class.instructor_email, INSTRUCTOR);

    let Json(mine) = handlers::get_instructor_classes(
        caller(INSTRUCTOR),
        State(state),
        AppPath(INSTRUCTOR.to_string()),
    )
    .await
    .unwrap();
    assert_eq!(mine.len(), 2);
}

#[tokio::test]
async fn test_create_class_validates_fields() {
    let (repo, _) = seeded_repo().await;
    let state = create_state(repo, MockPaymentService::new());

    let result = handlers::create_class(
        caller(INSTRUCTOR),
        State(state),
        AppJson(CreateClassRequest {
            class_name: "".to_string(),
            instructor_name: None,
            image: None,
            price: 10.0,
            seats: 3,
            date: None,
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn test_update_class_by_other_instructor_is_not_found() {
    let (repo, class_id) = seeded_repo().await;
    let state = create_state(repo, MockPaymentService::new());

    let result = handlers::update_class(
        caller("rival@talktrove.test"),
        State(state),
        AppPath(class_id),
        AppJson(UpdateClassRequest {
            price: Some(1.0),
            ..UpdateClassRequest::default()
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_check_instructor() {
    let (repo, _) = seeded_repo().await;
    let state = create_state(repo, MockPaymentService::new());

    let Json(yes) = handlers::check_instructor(State(state.clone()), AppPath(INSTRUCTOR.to_string()))
        .await
        .unwrap();
    let Json(no) = handlers::check_instructor(State(state), AppPath(STUDENT.to_string()))
        .await
        .unwrap();

    assert!(yes.instructor);
    assert!(!no.instructor);
}

// --- Admin Handlers ---

#[tokio::test]
async fn test_set_class_status_rejects_pending_target() {
    let (repo, class_id) = seeded_repo().await;
    let state = create_state(repo, MockPaymentService::new());

    let result = handlers::set_class_status(
        State(state),
        AppPath(class_id),
        AppJson(SetStatusRequest {
            status: ClassStatus::Pending,
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn test_set_user_role_unknown_id_is_not_found() {
    let (repo, _) = seeded_repo().await;
    let state = create_state(repo, MockPaymentService::new());

    let result = handlers::set_user_role(
        State(state),
        AppPath(Uuid::new_v4()),
        AppJson(SetRoleRequest { role: Role::Admin }),
    )
    .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_check_admin_and_list_users() {
    let (repo, _) = seeded_repo().await;
    let state = create_state(repo, MockPaymentService::new());

    let Json(check) = handlers::check_admin(State(state.clone()), AppPath(INSTRUCTOR.to_string()))
        .await
        .unwrap();
    assert!(!check.admin);

    let Json(users) = handlers::list_users(State(state)).await.unwrap();
    assert_eq!(users.len(), 1);
}

#[tokio::test]
async fn test_repository_failure_is_internal_error() {
    let (repo, _) = seeded_repo().await;
    repo.fail_operation("list_all_classes").await;
    let state = create_state(repo, MockPaymentService::new());

    let err = handlers::get_all_classes_admin(State(state))
        .await
        .unwrap_err();
    assert_eq!(
        err.into_response().status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}
