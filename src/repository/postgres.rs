use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use uuid::Uuid;

use super::{ProfileQuery, RepoResult, Repository, SeatClaim};
use crate::models::{
    ClassListing, ClassStatus, CreateClassRequest, EnrollRequest, EnrolledClass, ProfilePatch,
    Role, SelectedClass, StudentFeedback, UpdateClassRequest, User,
};

const PROFILE_COLUMNS: &str = "id, email, name, photo_url, role, students, created_at";

const CLASS_COLUMNS: &str = "id, instructor_email, instructor_name, class_name, image, price, \
     seats, enrolled_students, status, feedback, date, created_at";

const SELECTED_COLUMNS: &str = "id, user_email, class_id, class_name, instructor_email, \
     instructor_name, image, price, created_at";

const ENROLLED_COLUMNS: &str =
    "id, user_email, class_id, class_name, instructor_email, amount_paid, transaction_id, date";

/// PostgresRepository
///
/// The production implementation of `Repository`, backed by a shared `PgPool`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// upsert_profile
    ///
    /// One statement: the literal `'student'` applies only on insert, and the
    /// conflict branch merges profile fields without touching `role`.
    async fn upsert_profile(&self, email: &str, patch: ProfilePatch) -> RepoResult<User> {
        let sql = format!(
            r#"
            INSERT INTO profiles (id, email, name, photo_url, role, created_at)
            VALUES ($1, $2, $3, $4, 'student', NOW())
            ON CONFLICT (email) DO UPDATE
            SET name = COALESCE(EXCLUDED.name, profiles.name),
                photo_url = COALESCE(EXCLUDED.photo_url, profiles.photo_url)
            RETURNING {PROFILE_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(email)
            .bind(patch.name)
            .bind(patch.photo_url)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_profile(&self, email: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_profiles(&self, query: ProfileQuery) -> RepoResult<Vec<User>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE TRUE"));

        if let Some(role) = query.role {
            builder.push(" AND role = ");
            builder.push_bind(role.as_str());
        }

        if query.by_students_desc {
            builder.push(" ORDER BY students DESC NULLS LAST, created_at ASC");
        } else {
            builder.push(" ORDER BY created_at ASC");
        }

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }

        let users = builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE profiles
            SET role = $2,
                students = CASE WHEN $2 = 'instructor' THEN 0 ELSE students END
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn increment_instructor_students(&self, email: &str) -> RepoResult<bool> {
        let result =
            sqlx::query("UPDATE profiles SET students = COALESCE(students, 0) + 1 WHERE email = $1")
                .bind(email)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_approved_classes(
        &self,
        by_enrolled_desc: bool,
        limit: Option<i64>,
    ) -> RepoResult<Vec<ClassListing>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {CLASS_COLUMNS} FROM classes WHERE status = "));
        builder.push_bind(ClassStatus::Approved.as_str());

        if by_enrolled_desc {
            builder.push(" ORDER BY enrolled_students DESC, created_at ASC");
        } else {
            builder.push(" ORDER BY created_at DESC");
        }

        if let Some(limit) = limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }

        let classes = builder
            .build_query_as::<ClassListing>()
            .fetch_all(&self.pool)
            .await?;
        Ok(classes)
    }

    /// list_all_classes
    ///
    /// Moderation view: every listing, pending ones first.
    async fn list_all_classes(&self) -> RepoResult<Vec<ClassListing>> {
        let sql = format!(
            "SELECT {CLASS_COLUMNS} FROM classes \
             ORDER BY (status = 'pending') DESC, created_at DESC"
        );
        let classes = sqlx::query_as::<_, ClassListing>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(classes)
    }

    async fn list_classes_by_instructor(&self, email: &str) -> RepoResult<Vec<ClassListing>> {
        let sql = format!(
            "SELECT {CLASS_COLUMNS} FROM classes WHERE instructor_email = $1 ORDER BY created_at DESC"
        );
        let classes = sqlx::query_as::<_, ClassListing>(&sql)
            .bind(email)
            .fetch_all(&self.pool)
            .await?;
        Ok(classes)
    }

    async fn get_class(&self, id: Uuid) -> RepoResult<Option<ClassListing>> {
        let sql = format!("SELECT {CLASS_COLUMNS} FROM classes WHERE id = $1");
        let class = sqlx::query_as::<_, ClassListing>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(class)
    }

    async fn create_class(
        &self,
        instructor_email: &str,
        req: CreateClassRequest,
    ) -> RepoResult<ClassListing> {
        let sql = format!(
            r#"
            INSERT INTO classes (
                id, instructor_email, instructor_name, class_name, image, price,
                seats, enrolled_students, status, date, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, 'pending', $8, NOW())
            RETURNING {CLASS_COLUMNS}
            "#
        );
        let class = sqlx::query_as::<_, ClassListing>(&sql)
            .bind(Uuid::new_v4())
            .bind(instructor_email)
            .bind(req.instructor_name)
            .bind(req.class_name)
            .bind(req.image)
            .bind(req.price)
            .bind(req.seats)
            .bind(req.date)
            .fetch_one(&self.pool)
            .await?;
        Ok(class)
    }

    /// update_class
    ///
    /// `COALESCE` keeps the stored value for every field the request left out.
    async fn update_class(
        &self,
        id: Uuid,
        instructor_email: &str,
        req: UpdateClassRequest,
    ) -> RepoResult<Option<ClassListing>> {
        let sql = format!(
            r#"
            UPDATE classes
            SET image = COALESCE($3, image),
                class_name = COALESCE($4, class_name),
                price = COALESCE($5, price),
                seats = COALESCE($6, seats),
                date = COALESCE($7, date)
            WHERE id = $1 AND instructor_email = $2
            RETURNING {CLASS_COLUMNS}
            "#
        );
        let class = sqlx::query_as::<_, ClassListing>(&sql)
            .bind(id)
            .bind(instructor_email)
            .bind(req.image)
            .bind(req.class_name)
            .bind(req.price)
            .bind(req.seats)
            .bind(req.date)
            .fetch_optional(&self.pool)
            .await?;
        Ok(class)
    }

    async fn set_class_status(
        &self,
        id: Uuid,
        status: ClassStatus,
    ) -> RepoResult<Option<ClassListing>> {
        let sql = format!("UPDATE classes SET status = $2 WHERE id = $1 RETURNING {CLASS_COLUMNS}");
        let class = sqlx::query_as::<_, ClassListing>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(class)
    }

    async fn set_class_feedback(
        &self,
        id: Uuid,
        feedback: &str,
    ) -> RepoResult<Option<ClassListing>> {
        let sql =
            format!("UPDATE classes SET feedback = $2 WHERE id = $1 RETURNING {CLASS_COLUMNS}");
        let class = sqlx::query_as::<_, ClassListing>(&sql)
            .bind(id)
            .bind(feedback)
            .fetch_optional(&self.pool)
            .await?;
        Ok(class)
    }

    async fn select_class(&self, selection: SelectedClass) -> RepoResult<SelectedClass> {
        let sql = format!(
            r#"
            INSERT INTO selected_classes (
                id, user_email, class_id, class_name, instructor_email,
                instructor_name, image, price, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {SELECTED_COLUMNS}
            "#
        );
        let selected = sqlx::query_as::<_, SelectedClass>(&sql)
            .bind(selection.id)
            .bind(selection.user_email)
            .bind(selection.class_id)
            .bind(selection.class_name)
            .bind(selection.instructor_email)
            .bind(selection.instructor_name)
            .bind(selection.image)
            .bind(selection.price)
            .bind(selection.created_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(selected)
    }

    async fn list_selected_classes(&self, user_email: &str) -> RepoResult<Vec<SelectedClass>> {
        let sql = format!(
            "SELECT {SELECTED_COLUMNS} FROM selected_classes WHERE user_email = $1 ORDER BY created_at ASC"
        );
        let selected = sqlx::query_as::<_, SelectedClass>(&sql)
            .bind(user_email)
            .fetch_all(&self.pool)
            .await?;
        Ok(selected)
    }

    async fn delete_selected_class(&self, id: Uuid, user_email: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM selected_classes WHERE id = $1 AND user_email = $2")
            .bind(id)
            .bind(user_email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_selection(&self, class_id: Uuid, user_email: &str) -> RepoResult<bool> {
        let result =
            sqlx::query("DELETE FROM selected_classes WHERE class_id = $1 AND user_email = $2")
                .bind(class_id)
                .bind(user_email)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// claim_seat
    ///
    /// The seat decrement and the history insert share one transaction. The UPDATE
    /// guard (approved, seats left, not yet enrolled) makes concurrent claims on the
    /// last seat serialize on the row lock; the `(class_id, user_email)` unique key
    /// turns a same-student race into `ON CONFLICT DO NOTHING`, which rolls the
    /// decrement back.
    async fn claim_seat(
        &self,
        class_id: Uuid,
        user_email: &str,
        payment: &EnrollRequest,
    ) -> RepoResult<Option<SeatClaim>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE classes
            SET seats = seats - 1,
                enrolled_students = enrolled_students + 1
            WHERE id = $1
              AND status = 'approved'
              AND seats > 0
              AND NOT EXISTS (
                  SELECT 1 FROM enrolled_classes e
                  WHERE e.class_id = $1 AND e.user_email = $2
              )
            RETURNING {CLASS_COLUMNS}
            "#
        );
        let Some(listing) = sqlx::query_as::<_, ClassListing>(&sql)
            .bind(class_id)
            .bind(user_email)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        let sql = format!(
            r#"
            INSERT INTO enrolled_classes (
                id, user_email, class_id, class_name, instructor_email,
                amount_paid, transaction_id, date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, now())
            ON CONFLICT (class_id, user_email) DO NOTHING
            RETURNING {ENROLLED_COLUMNS}
            "#
        );
        let Some(record) = sqlx::query_as::<_, EnrolledClass>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_email)
            .bind(class_id)
            .bind(&listing.class_name)
            .bind(&listing.instructor_email)
            .bind(payment.price)
            .bind(&payment.transaction_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        tx.commit().await?;
        Ok(Some(SeatClaim { listing, record }))
    }

    async fn list_enrolled_classes(&self, user_email: &str) -> RepoResult<Vec<EnrolledClass>> {
        let sql = format!(
            "SELECT {ENROLLED_COLUMNS} FROM enrolled_classes WHERE user_email = $1 ORDER BY date DESC"
        );
        let enrolled = sqlx::query_as::<_, EnrolledClass>(&sql)
            .bind(user_email)
            .fetch_all(&self.pool)
            .await?;
        Ok(enrolled)
    }

    async fn payment_history(&self, user_email: &str) -> RepoResult<Vec<EnrolledClass>> {
        let sql = format!(
            "SELECT {ENROLLED_COLUMNS} FROM enrolled_classes WHERE user_email = $1 ORDER BY date ASC"
        );
        let history = sqlx::query_as::<_, EnrolledClass>(&sql)
            .bind(user_email)
            .fetch_all(&self.pool)
            .await?;
        Ok(history)
    }

    async fn list_student_feedback(&self) -> RepoResult<Vec<StudentFeedback>> {
        let feedback = sqlx::query_as::<_, StudentFeedback>(
            "SELECT id, name, image, feedback, created_at FROM student_feedback ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(feedback)
    }
}

