use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Closed Enumerations ---

/// Role
///
/// The RBAC field of a profile. Stored as constrained TEXT and decoded through
/// `TryFrom<String>` so an unknown value in the table surfaces as a decode error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    Student,
    Instructor,
    Admin,
}

/// ClassStatus
///
/// Moderation lifecycle of a class listing: created `pending`, then moved by an
/// admin to `approved` or `rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ClassStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Instructor => "instructor",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "instructor" => Ok(Role::Instructor),
            "admin" => Ok(Role::Admin),
            other => Err(ParseEnumError {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl ClassStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassStatus::Pending => "pending",
            ClassStatus::Approved => "approved",
            ClassStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ClassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ClassStatus::Pending),
            "approved" => Ok(ClassStatus::Approved),
            "rejected" => Ok(ClassStatus::Rejected),
            other => Err(ParseEnumError {
                kind: "class status",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for ClassStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A profile row from the `profiles` table, keyed by the unique email.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub photo_url: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    // Number of students taught. Only initialised once a profile becomes an instructor.
    pub students: Option<i32>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// ClassListing
///
/// A class offered by an instructor (`classes` table).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ClassListing {
    pub id: Uuid,
    pub instructor_email: String,
    pub instructor_name: Option<String>,
    pub class_name: String,
    pub image: Option<String>,
    pub price: f64,
    // Remaining capacity. Never negative (CHECK constraint + conditional decrement).
    pub seats: i32,
    pub enrolled_students: i32,
    #[sqlx(try_from = "String")]
    pub status: ClassStatus,
    // Admin moderation note.
    pub feedback: Option<String>,
    pub date: Option<NaiveDate>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// SelectedClass
///
/// A student's staging record: intent to enroll, awaiting payment. The listing
/// fields are a snapshot taken when the class was selected.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SelectedClass {
    pub id: Uuid,
    pub user_email: String,
    pub class_id: Uuid,
    pub class_name: String,
    pub instructor_email: String,
    pub instructor_name: Option<String>,
    pub image: Option<String>,
    pub price: f64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// EnrolledClass
///
/// Append-only enrollment event; together these rows form the payment history.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EnrolledClass {
    pub id: Uuid,
    pub user_email: String,
    pub class_id: Uuid,
    pub class_name: String,
    pub instructor_email: String,
    pub amount_paid: f64,
    // Payment processor reference that confirmed this enrollment.
    pub transaction_id: String,
    #[ts(type = "string")]
    pub date: DateTime<Utc>,
}

/// StudentFeedback
///
/// Testimonials shown on the landing page (`student_feedback` table).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StudentFeedback {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub feedback: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// TokenRequest
///
/// Body of `POST /jwt`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TokenRequest {
    pub email: String,
}

/// ProfilePatch
///
/// Body of `PUT /users/{email}`. Only profile fields are accepted; a `role` sent by
/// the client is dropped during deserialization, so new profiles always start as
/// `student` and existing roles only change through the admin endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// SetRoleRequest
///
/// Body of `PATCH /users/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SetRoleRequest {
    pub role: Role,
}

/// CreateClassRequest
///
/// Body of `POST /classes/instructor`. The owning instructor is the caller.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateClassRequest {
    pub class_name: String,
    pub instructor_name: Option<String>,
    pub image: Option<String>,
    pub price: f64,
    pub seats: i32,
    pub date: Option<NaiveDate>,
}

impl CreateClassRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.class_name.trim().is_empty() {
            return Err("className must not be empty".to_string());
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err("price must be a non-negative number".to_string());
        }
        if self.seats < 0 {
            return Err("seats must not be negative".to_string());
        }
        Ok(())
    }
}

/// UpdateClassRequest
///
/// Partial update of the instructor-editable fields (`PUT /classes/{id}`).
/// Absent fields keep their stored value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateClassRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seats: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl UpdateClassRequest {
    pub fn validate(&self) -> Result<(), String> {
        if matches!(&self.class_name, Some(name) if name.trim().is_empty()) {
            return Err("className must not be empty".to_string());
        }
        if matches!(self.price, Some(price) if !price.is_finite() || price < 0.0) {
            return Err("price must be a non-negative number".to_string());
        }
        if matches!(self.seats, Some(seats) if seats < 0) {
            return Err("seats must not be negative".to_string());
        }
        Ok(())
    }
}

/// SetStatusRequest
///
/// Body of `PATCH /classes/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SetStatusRequest {
    pub status: ClassStatus,
}

/// SetFeedbackRequest
///
/// Body of `PATCH /classes/admin/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SetFeedbackRequest {
    pub feedback: String,
}

/// SelectClassRequest
///
/// Body of `POST /classes`: the listing a student wants to stage for enrollment.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SelectClassRequest {
    pub class_id: Uuid,
}

/// PaymentIntentRequest
///
/// Body of `POST /create-payment-intent`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PaymentIntentRequest {
    pub price: f64,
}

/// EnrollRequest
///
/// Body of `POST /enroll/{id}`: the externally confirmed payment for the class.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EnrollRequest {
    pub price: f64,
    pub transaction_id: String,
}

// --- Response Schemas (Output) ---

/// PaymentIntentResponse
///
/// The client secret the browser uses to confirm the card payment.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

/// AdminCheck
///
/// Response of `GET /users/admin/{email}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminCheck {
    pub admin: bool,
}

/// InstructorCheck
///
/// Response of `GET /users/instructor/{email}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct InstructorCheck {
    pub instructor: bool,
}
