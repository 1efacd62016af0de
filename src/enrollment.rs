use uuid::Uuid;

use crate::{
    error::AppError,
    models::{ClassListing, EnrollRequest, EnrolledClass},
    repository::{RepositoryState, SeatClaim},
};

/// EnrollmentOutcome
#[derive(Debug, Clone)]
pub enum EnrollmentOutcome {
    /// Every step ran; the appended history record is returned.
    Enrolled(EnrolledClass),
    /// The seat claim modified nothing (unknown or unapproved listing, no seats
    /// left, or already enrolled). No later step ran.
    Unchanged,
}

/// EnrollmentService
///
/// Converts a paid-for selection into an enrollment:
///
/// 1. claim a seat on an approved listing (`seats - 1`, `enrolledStudents + 1`)
///    and append the enrollment/payment record, atomically;
/// 2. remove the student's staging records for the class (absence is fine);
/// 3. add one to the instructor's `students` counter.
///
/// Steps 2 and 3 are separate writes. A failure there leaves the enrollment in
/// place and is reported to the caller with the failing step logged; nothing is
/// rolled back.
pub struct EnrollmentService {
    repo: RepositoryState,
}

impl EnrollmentService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    pub async fn enroll(
        &self,
        class_id: Uuid,
        user_email: &str,
        payment: EnrollRequest,
    ) -> Result<EnrollmentOutcome, AppError> {
        if payment.transaction_id.trim().is_empty() {
            return Err(AppError::BadRequest(
                "transactionId is required".to_string(),
            ));
        }
        if !payment.price.is_finite() || payment.price < 0.0 {
            return Err(AppError::BadRequest(
                "price must be a non-negative number".to_string(),
            ));
        }

        let Some(SeatClaim { listing, record }) =
            self.repo.claim_seat(class_id, user_email, &payment).await?
        else {
            tracing::info!(%class_id, user_email, "enrollment left unchanged");
            return Ok(EnrollmentOutcome::Unchanged);
        };

        self.repo
            .clear_selection(class_id, user_email)
            .await
            .map_err(|e| partial_failure("clear_selection", &listing, user_email, e.into()))?;

        let counted = self
            .repo
            .increment_instructor_students(&listing.instructor_email)
            .await
            .map_err(|e| {
                partial_failure("increment_instructor_students", &listing, user_email, e.into())
            })?;
        if !counted {
            tracing::warn!(
                instructor = %listing.instructor_email,
                "enrollment recorded but instructor profile is missing"
            );
        }

        tracing::info!(
            %class_id,
            user_email,
            seats_left = listing.seats,
            transaction_id = %record.transaction_id,
            "student enrolled"
        );
        Ok(EnrollmentOutcome::Enrolled(record))
    }
}

fn partial_failure(
    step: &'static str,
    listing: &ClassListing,
    user_email: &str,
    error: AppError,
) -> AppError {
    tracing::error!(
        step,
        class_id = %listing.id,
        user_email,
        error = %error,
        "enrollment recorded but a follow-up step failed"
    );
    error
}
