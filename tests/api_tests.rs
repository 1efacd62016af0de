use reqwest::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;
use talktrove_api::{
    AppConfig, AppState, InMemoryRepository, MockPaymentService, create_router,
    models::{Role, User},
    repository::RepositoryState,
};
use tokio::net::TcpListener;
use uuid::Uuid;

const ADMIN: &str = "admin@talktrove.test";

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

/// Serves the full router on a random port, backed by the in-memory store with a
/// pre-seeded admin.
async fn spawn_app() -> TestApp {
    let repo = InMemoryRepository::new();
    repo.seed_profile(User {
        id: Uuid::new_v4(),
        email: ADMIN.to_string(),
        role: Role::Admin,
        ..User::default()
    })
    .await;

    let state = AppState {
        repo: Arc::new(repo) as RepositoryState,
        payments: Arc::new(MockPaymentService::new()),
        config: AppConfig::default(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn token(&self, email: &str) -> String {
        let response = self
            .client
            .post(self.url("/jwt"))
            .json(&json!({ "email": email }))
            .send()
            .await
            .expect("req fail");
        assert_eq!(response.status(), StatusCode::OK);
        response.text().await.unwrap()
    }

    async fn sign_in(&self, email: &str) -> (String, Value) {
        let token = self.token(email).await;
        let profile: Value = self
            .client
            .put(self.url(&format!("/users/{email}")))
            .json(&json!({ "name": email.split('@').next() }))
            .send()
            .await
            .expect("req fail")
            .json()
            .await
            .unwrap();
        (token, profile)
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());

    let root = app.client.get(app.url("/")).send().await.expect("req fail");
    assert_eq!(root.text().await.unwrap(), "TalkTrove server is running");
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/allClasses"))
        .send()
        .await
        .expect("req fail");

    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_error_body_shape() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/users"))
        .send()
        .await
        .expect("req fail");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!(true));
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_malformed_input_gets_error_body() {
    let app = spawn_app().await;
    let (token, _) = app.sign_in("sol@talktrove.test").await;

    let bad_json = app
        .client
        .post(app.url("/jwt"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .expect("req fail");
    let no_content_type = app
        .client
        .post(app.url("/jwt"))
        .body(r#"{ "email": "sol@talktrove.test" }"#)
        .send()
        .await
        .expect("req fail");
    let bad_uuid = app
        .client
        .post(app.url("/enroll/not-a-uuid"))
        .bearer_auth(&token)
        .json(&json!({ "price": 1.0, "transactionId": "pi_x" }))
        .send()
        .await
        .expect("req fail");
    let wrong_type = app
        .client
        .post(app.url(&format!("/enroll/{}", Uuid::new_v4())))
        .bearer_auth(&token)
        .json(&json!({ "price": "free", "transactionId": "pi_x" }))
        .send()
        .await
        .expect("req fail");

    for response in [bad_json, no_content_type, bad_uuid, wrong_type] {
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], json!(true));
        assert!(body["message"].is_string());
    }
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;

    let doc: Value = app
        .client
        .get(app.url("/api-docs/openapi.json"))
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();

    assert!(doc["paths"]["/enroll/{id}"].is_object());
}

/// Sign-in, promotion, authoring, moderation, staging, payment and enrollment,
/// end to end over HTTP.
#[tokio::test]
async fn test_class_lifecycle() {
    let app = spawn_app().await;
    let instructor_email = "ivy@talktrove.test";
    let student_email = "sol@talktrove.test";

    let (admin_token, _) = app.sign_in(ADMIN).await;
    let (instructor_token, instructor) = app.sign_in(instructor_email).await;
    let (student_token, student) = app.sign_in(student_email).await;
    assert_eq!(instructor["role"], json!("student"));
    assert_eq!(student["role"], json!("student"));

    // 1. Admin promotes the instructor.
    let promoted: Value = app
        .client
        .patch(app.url(&format!("/users/{}", instructor["id"].as_str().unwrap())))
        .bearer_auth(&admin_token)
        .json(&json!({ "role": "instructor" }))
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert_eq!(promoted["role"], json!("instructor"));
    assert_eq!(promoted["students"], json!(0));

    // 2. Instructor creates a listing; it enters moderation.
    let class: Value = app
        .client
        .post(app.url("/classes/instructor"))
        .bearer_auth(&instructor_token)
        .json(&json!({
            "className": "Korean for Travellers",
            "instructorName": "Ivy",
            "price": 25.5,
            "seats": 2,
            "date": "2025-01-15"
        }))
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert_eq!(class["status"], json!("pending"));
    let class_id = class["id"].as_str().unwrap().to_string();

    let public: Value = app
        .client
        .get(app.url("/allClasses"))
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert_eq!(public, json!([]));

    // 3. Admin approves it.
    let response = app
        .client
        .patch(app.url(&format!("/classes/{class_id}")))
        .bearer_auth(&admin_token)
        .json(&json!({ "status": "approved" }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::OK);

    // 4. Student stages it.
    let response = app
        .client
        .post(app.url("/classes"))
        .bearer_auth(&student_token)
        .json(&json!({ "classId": class_id }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::OK);

    let cart: Value = app
        .client
        .get(app.url(&format!("/classes/{student_email}")))
        .bearer_auth(&student_token)
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert_eq!(cart[0]["className"], json!("Korean for Travellers"));

    // 5. Payment intent.
    let intent: Value = app
        .client
        .post(app.url("/create-payment-intent"))
        .bearer_auth(&student_token)
        .json(&json!({ "price": 25.5 }))
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert_eq!(intent["clientSecret"], json!("pi_mock_2550_secret_test"));

    // 6. Enrollment.
    let enroll = |token: String| {
        let request = app
            .client
            .post(app.url(&format!("/enroll/{class_id}")))
            .bearer_auth(token)
            .json(&json!({ "price": 25.5, "transactionId": "pi_mock_2550" }));
        async move { request.send().await.expect("req fail") }
    };

    let response = enroll(student_token.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let record: Value = response.json().await.unwrap();
    assert_eq!(record["instructorEmail"], json!(instructor_email));

    let response = enroll(student_token.clone()).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // 7. Aftermath.
    let cart: Value = app
        .client
        .get(app.url(&format!("/classes/{student_email}")))
        .bearer_auth(&student_token)
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert_eq!(cart, json!([]));

    let history: Value = app
        .client
        .get(app.url(&format!("/paymentHistory/{student_email}")))
        .bearer_auth(&student_token)
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert_eq!(history.as_array().map(Vec::len), Some(1));

    let popular: Value = app
        .client
        .get(app.url("/classes"))
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert_eq!(popular[0]["seats"], json!(1));
    assert_eq!(popular[0]["enrolledStudents"], json!(1));

    let instructors: Value = app
        .client
        .get(app.url("/instructors"))
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert_eq!(instructors[0]["email"], json!(instructor_email));
    assert_eq!(instructors[0]["students"], json!(1));
}
