use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{ProfileQuery, RepoResult, Repository, SeatClaim};
use crate::{
    error::RepositoryError,
    models::{
        ClassListing, ClassStatus, CreateClassRequest, EnrollRequest, EnrolledClass,
        ProfilePatch, Role, SelectedClass, StudentFeedback, UpdateClassRequest, User,
    },
};

#[derive(Default)]
struct Tables {
    profiles: Vec<User>,
    classes: Vec<ClassListing>,
    selected: Vec<SelectedClass>,
    enrolled: Vec<EnrolledClass>,
    feedback: Vec<StudentFeedback>,
}

/// InMemoryRepository
///
/// A `Repository` over plain vectors, with the same semantics as the Postgres
/// implementation. Used by tests and local experiments in place of a database.
///
/// Individual operations can be made to fail with `fail_operation` to exercise
/// error paths (the name is the trait method name, e.g. `"claim_seat"`).
#[derive(Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
    failing: Mutex<HashSet<&'static str>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of `operation` return `RepositoryError::Unavailable`.
    pub async fn fail_operation(&self, operation: &'static str) {
        self.failing.lock().await.insert(operation);
    }

    /// Inserts a profile as-is, bypassing upsert rules. Test seeding only.
    pub async fn seed_profile(&self, user: User) {
        self.tables.lock().await.profiles.push(user);
    }

    /// Inserts a listing as-is. Test seeding only.
    pub async fn seed_class(&self, class: ClassListing) {
        self.tables.lock().await.classes.push(class);
    }

    /// Appends an enrollment record without touching any listing. Test seeding only.
    pub async fn seed_enrollment(&self, record: EnrolledClass) {
        self.tables.lock().await.enrolled.push(record);
    }

    pub async fn seed_feedback(&self, feedback: StudentFeedback) {
        self.tables.lock().await.feedback.push(feedback);
    }

    /// Every staging record, regardless of owner.
    pub async fn selected_snapshot(&self) -> Vec<SelectedClass> {
        self.tables.lock().await.selected.clone()
    }

    /// Every enrollment record, regardless of owner.
    pub async fn enrolled_snapshot(&self) -> Vec<EnrolledClass> {
        self.tables.lock().await.enrolled.clone()
    }

    async fn check(&self, operation: &'static str) -> RepoResult<()> {
        if self.failing.lock().await.contains(operation) {
            return Err(RepositoryError::Unavailable(format!(
                "{operation} failure injected"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn upsert_profile(&self, email: &str, patch: ProfilePatch) -> RepoResult<User> {
        self.check("upsert_profile").await?;
        let mut tables = self.tables.lock().await;

        if let Some(user) = tables.profiles.iter_mut().find(|u| u.email == email) {
            if let Some(name) = patch.name {
                user.name = Some(name);
            }
            if let Some(photo_url) = patch.photo_url {
                user.photo_url = Some(photo_url);
            }
            return Ok(user.clone());
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: patch.name,
            photo_url: patch.photo_url,
            role: Role::Student,
            students: None,
            created_at: Utc::now(),
        };
        tables.profiles.push(user.clone());
        Ok(user)
    }

    async fn get_profile(&self, email: &str) -> RepoResult<Option<User>> {
        self.check("get_profile").await?;
        let tables = self.tables.lock().await;
        Ok(tables.profiles.iter().find(|u| u.email == email).cloned())
    }

    async fn list_profiles(&self, query: ProfileQuery) -> RepoResult<Vec<User>> {
        self.check("list_profiles").await?;
        let tables = self.tables.lock().await;

        let mut users: Vec<User> = tables
            .profiles
            .iter()
            .filter(|u| query.role.is_none_or(|role| u.role == role))
            .cloned()
            .collect();

        if query.by_students_desc {
            // Profiles without a counter go last.
            users.sort_by(|a, b| {
                b.students
                    .unwrap_or(-1)
                    .cmp(&a.students.unwrap_or(-1))
                    .then(a.created_at.cmp(&b.created_at))
            });
        } else {
            users.sort_by_key(|u| u.created_at);
        }
        if let Some(limit) = query.limit {
            users.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(users)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>> {
        self.check("set_role").await?;
        let mut tables = self.tables.lock().await;

        Ok(tables.profiles.iter_mut().find(|u| u.id == id).map(|user| {
            user.role = role;
            if role == Role::Instructor {
                user.students = Some(0);
            }
            user.clone()
        }))
    }

    async fn increment_instructor_students(&self, email: &str) -> RepoResult<bool> {
        self.check("increment_instructor_students").await?;
        let mut tables = self.tables.lock().await;

        match tables.profiles.iter_mut().find(|u| u.email == email) {
            Some(user) => {
                user.students = Some(user.students.unwrap_or(0) + 1);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_approved_classes(
        &self,
        by_enrolled_desc: bool,
        limit: Option<i64>,
    ) -> RepoResult<Vec<ClassListing>> {
        self.check("list_approved_classes").await?;
        let tables = self.tables.lock().await;

        let mut classes: Vec<ClassListing> = tables
            .classes
            .iter()
            .filter(|c| c.status == ClassStatus::Approved)
            .cloned()
            .collect();

        if by_enrolled_desc {
            classes.sort_by(|a, b| {
                b.enrolled_students
                    .cmp(&a.enrolled_students)
                    .then(a.created_at.cmp(&b.created_at))
            });
        } else {
            classes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
        if let Some(limit) = limit {
            classes.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(classes)
    }

    async fn list_all_classes(&self) -> RepoResult<Vec<ClassListing>> {
        self.check("list_all_classes").await?;
        let tables = self.tables.lock().await;

        let mut classes = tables.classes.clone();
        classes.sort_by(|a, b| {
            (a.status != ClassStatus::Pending)
                .cmp(&(b.status != ClassStatus::Pending))
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(classes)
    }

    async fn list_classes_by_instructor(&self, email: &str) -> RepoResult<Vec<ClassListing>> {
        self.check("list_classes_by_instructor").await?;
        let tables = self.tables.lock().await;
        let mut classes: Vec<ClassListing> = tables
            .classes
            .iter()
            .filter(|c| c.instructor_email == email)
            .cloned()
            .collect();
        classes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(classes)
    }

    async fn get_class(&self, id: Uuid) -> RepoResult<Option<ClassListing>> {
        self.check("get_class").await?;
        let tables = self.tables.lock().await;
        Ok(tables.classes.iter().find(|c| c.id == id).cloned())
    }

    async fn create_class(
        &self,
        instructor_email: &str,
        req: CreateClassRequest,
    ) -> RepoResult<ClassListing> {
        self.check("create_class").await?;
        let class = ClassListing {
            id: Uuid::new_v4(),
            instructor_email: instructor_email.to_string(),
            instructor_name: req.instructor_name,
            class_name: req.class_name,
            image: req.image,
            price: req.price,
            seats: req.seats,
            enrolled_students: 0,
            status: ClassStatus::Pending,
            feedback: None,
            date: req.date,
            created_at: Utc::now(),
        };
        self.tables.lock().await.classes.push(class.clone());
        Ok(class)
    }

    async fn update_class(
        &self,
        id: Uuid,
        instructor_email: &str,
        req: UpdateClassRequest,
    ) -> RepoResult<Option<ClassListing>> {
        self.check("update_class").await?;
        let mut tables = self.tables.lock().await;

        Ok(tables
            .classes
            .iter_mut()
            .find(|c| c.id == id && c.instructor_email == instructor_email)
            .map(|class| {
                if let Some(image) = req.image {
                    class.image = Some(image);
                }
                if let Some(class_name) = req.class_name {
                    class.class_name = class_name;
                }
                if let Some(price) = req.price {
                    class.price = price;
                }
                if let Some(seats) = req.seats {
                    class.seats = seats;
                }
                if let Some(date) = req.date {
                    class.date = Some(date);
                }
                class.clone()
            }))
    }

    async fn set_class_status(
        &self,
        id: Uuid,
        status: ClassStatus,
    ) -> RepoResult<Option<ClassListing>> {
        self.check("set_class_status").await?;
        let mut tables = self.tables.lock().await;
        Ok(tables.classes.iter_mut().find(|c| c.id == id).map(|class| {
            class.status = status;
            class.clone()
        }))
    }

    async fn set_class_feedback(
        &self,
        id: Uuid,
        feedback: &str,
    ) -> RepoResult<Option<ClassListing>> {
        self.check("set_class_feedback").await?;
        let mut tables = self.tables.lock().await;
        Ok(tables.classes.iter_mut().find(|c| c.id == id).map(|class| {
            class.feedback = Some(feedback.to_string());
            class.clone()
        }))
    }

    async fn select_class(&self, selection: SelectedClass) -> RepoResult<SelectedClass> {
        self.check("select_class").await?;
        self.tables.lock().await.selected.push(selection.clone());
        Ok(selection)
    }

    async fn list_selected_classes(&self, user_email: &str) -> RepoResult<Vec<SelectedClass>> {
        self.check("list_selected_classes").await?;
        let tables = self.tables.lock().await;
        let mut selected: Vec<SelectedClass> = tables
            .selected
            .iter()
            .filter(|s| s.user_email == user_email)
            .cloned()
            .collect();
        selected.sort_by_key(|s| s.created_at);
        Ok(selected)
    }

    async fn delete_selected_class(&self, id: Uuid, user_email: &str) -> RepoResult<bool> {
        self.check("delete_selected_class").await?;
        let mut tables = self.tables.lock().await;
        let before = tables.selected.len();
        tables
            .selected
            .retain(|s| !(s.id == id && s.user_email == user_email));
        Ok(tables.selected.len() < before)
    }

    async fn clear_selection(&self, class_id: Uuid, user_email: &str) -> RepoResult<bool> {
        self.check("clear_selection").await?;
        let mut tables = self.tables.lock().await;
        let before = tables.selected.len();
        tables
            .selected
            .retain(|s| !(s.class_id == class_id && s.user_email == user_email));
        Ok(tables.selected.len() < before)
    }

    async fn claim_seat(
        &self,
        class_id: Uuid,
        user_email: &str,
        payment: &EnrollRequest,
    ) -> RepoResult<Option<SeatClaim>> {
        self.check("claim_seat").await?;
        // Guard, decrement and insert all happen under one lock.
        let mut tables = self.tables.lock().await;

        let already_enrolled = tables
            .enrolled
            .iter()
            .any(|e| e.class_id == class_id && e.user_email == user_email);
        if already_enrolled {
            return Ok(None);
        }

        let Some(class) = tables.classes.iter_mut().find(|c| {
            c.id == class_id && c.status == ClassStatus::Approved && c.seats > 0
        }) else {
            return Ok(None);
        };
        class.seats -= 1;
        class.enrolled_students += 1;
        let listing = class.clone();

        let record = EnrolledClass {
            id: Uuid::new_v4(),
            user_email: user_email.to_string(),
            class_id,
            class_name: listing.class_name.clone(),
            instructor_email: listing.instructor_email.clone(),
            amount_paid: payment.price,
            transaction_id: payment.transaction_id.clone(),
            date: Utc::now(),
        };
        tables.enrolled.push(record.clone());

        Ok(Some(SeatClaim { listing, record }))
    }

    async fn list_enrolled_classes(&self, user_email: &str) -> RepoResult<Vec<EnrolledClass>> {
        self.check("list_enrolled_classes").await?;
        let tables = self.tables.lock().await;
        let mut enrolled: Vec<EnrolledClass> = tables
            .enrolled
            .iter()
            .filter(|e| e.user_email == user_email)
            .cloned()
            .collect();
        enrolled.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(enrolled)
    }

    async fn payment_history(&self, user_email: &str) -> RepoResult<Vec<EnrolledClass>> {
        self.check("payment_history").await?;
        let tables = self.tables.lock().await;
        let mut history: Vec<EnrolledClass> = tables
            .enrolled
            .iter()
            .filter(|e| e.user_email == user_email)
            .cloned()
            .collect();
        history.sort_by_key(|e| e.date);
        Ok(history)
    }

    async fn list_student_feedback(&self) -> RepoResult<Vec<StudentFeedback>> {
        self.check("list_student_feedback").await?;
        let mut feedback = self.tables.lock().await.feedback.clone();
        feedback.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(feedback)
    }
}
