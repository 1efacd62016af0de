use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::RepositoryError,
    models::{
        ClassListing, ClassStatus, CreateClassRequest, EnrollRequest, EnrolledClass, ProfilePatch,
        Role, SelectedClass, StudentFeedback, UpdateClassRequest, User,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Number of entries on the landing page's "popular" sections.
pub const TOP_N: i64 = 6;

pub type RepoResult<T> = Result<T, RepositoryError>;

/// ProfileQuery
///
/// Listing options for profiles. `by_students_desc` orders by the number of
/// students taught, highest first; `limit` caps the result.
#[derive(Debug, Clone, Default)]
pub struct ProfileQuery {
    pub role: Option<Role>,
    pub by_students_desc: bool,
    pub limit: Option<i64>,
}

impl ProfileQuery {
    /// All instructors, unordered.
    pub fn instructors() -> Self {
        Self {
            role: Some(Role::Instructor),
            ..Self::default()
        }
    }

    /// The `TOP_N` instructors by students taught.
    pub fn top_instructors() -> Self {
        Self {
            role: Some(Role::Instructor),
            by_students_desc: true,
            limit: Some(TOP_N),
        }
    }
}

/// SeatClaim
///
/// Result of a successful `claim_seat`: the listing after the decrement and the
/// enrollment record appended with it.
#[derive(Debug, Clone)]
pub struct SeatClaim {
    pub listing: ClassListing,
    pub record: EnrolledClass,
}

/// Repository Trait
///
/// The persistence contract behind every route: the role/profile store, the class
/// catalog, students' staging records, the enrollment history and feedback.
///
/// Every operation is a single statement against the store, except `claim_seat`:
/// a conditional update plus an insert, applied together or not at all.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Role/Profile Store ---

    /// Create-if-absent (role forced to `student`), else merge the provided fields.
    /// The role of an existing profile is never touched.
    async fn upsert_profile(&self, email: &str, patch: ProfilePatch) -> RepoResult<User>;
    async fn get_profile(&self, email: &str) -> RepoResult<Option<User>>;
    async fn list_profiles(&self, query: ProfileQuery) -> RepoResult<Vec<User>>;
    /// Admin mutation. Promotion to `instructor` also sets `students = 0`.
    async fn set_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>>;
    /// Adds one to the instructor's `students` counter. Returns false if no profile matched.
    async fn increment_instructor_students(&self, email: &str) -> RepoResult<bool>;

    // --- Class Catalog ---

    /// Approved listings only, optionally ordered by enrollment (highest first) and capped.
    async fn list_approved_classes(
        &self,
        by_enrolled_desc: bool,
        limit: Option<i64>,
    ) -> RepoResult<Vec<ClassListing>>;
    async fn list_all_classes(&self) -> RepoResult<Vec<ClassListing>>;
    async fn list_classes_by_instructor(&self, email: &str) -> RepoResult<Vec<ClassListing>>;
    async fn get_class(&self, id: Uuid) -> RepoResult<Option<ClassListing>>;
    /// New listings start `pending` with zero enrolled students.
    async fn create_class(
        &self,
        instructor_email: &str,
        req: CreateClassRequest,
    ) -> RepoResult<ClassListing>;
    /// Owner-only partial update: affects nothing unless `instructor_email` owns the listing.
    async fn update_class(
        &self,
        id: Uuid,
        instructor_email: &str,
        req: UpdateClassRequest,
    ) -> RepoResult<Option<ClassListing>>;
    async fn set_class_status(
        &self,
        id: Uuid,
        status: ClassStatus,
    ) -> RepoResult<Option<ClassListing>>;
    async fn set_class_feedback(
        &self,
        id: Uuid,
        feedback: &str,
    ) -> RepoResult<Option<ClassListing>>;

    // --- Staging Records ---

    async fn select_class(&self, selection: SelectedClass) -> RepoResult<SelectedClass>;
    async fn list_selected_classes(&self, user_email: &str) -> RepoResult<Vec<SelectedClass>>;
    /// Owner-only delete of one staging record by its id.
    async fn delete_selected_class(&self, id: Uuid, user_email: &str) -> RepoResult<bool>;
    /// Removes every staging record of `user_email` for `class_id`.
    async fn clear_selection(&self, class_id: Uuid, user_email: &str) -> RepoResult<bool>;

    // --- Enrollment History ---

    /// The atomic part of an enrollment. In one unit of work: `seats -= 1,
    /// enrolled_students += 1` on the listing, and the enrollment record is appended.
    /// Applies only when the listing is approved, has a free seat, and `user_email`
    /// holds no enrollment for it yet; at most one record per (class, student).
    /// Returns `None` when nothing was modified.
    async fn claim_seat(
        &self,
        class_id: Uuid,
        user_email: &str,
        payment: &EnrollRequest,
    ) -> RepoResult<Option<SeatClaim>>;
    async fn list_enrolled_classes(&self, user_email: &str) -> RepoResult<Vec<EnrolledClass>>;
    /// Enrollment records ordered by date, oldest first.
    async fn payment_history(&self, user_email: &str) -> RepoResult<Vec<EnrolledClass>>;

    // --- Feedback ---

    async fn list_student_feedback(&self) -> RepoResult<Vec<StudentFeedback>>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer held in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;
