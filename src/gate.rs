//! Authorization gate.
//!
//! Route-level middleware that authenticates the request (`AuthUser`) and then
//! checks the caller's *current* role in the profile store. Role is never read
//! from the token, so a demotion takes effect on the next request.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{AppState, auth::AuthUser, error::AppError, models::Role, repository::Repository};

/// ensure_role
///
/// Resolves `email`'s role and fails with `Forbidden` unless it equals `role`.
/// A missing profile is treated as lacking every role.
pub async fn ensure_role(repo: &dyn Repository, email: &str, role: Role) -> Result<(), AppError> {
    let profile = repo.get_profile(email).await?;

    match profile {
        Some(user) if user.role == role => Ok(()),
        Some(user) => {
            tracing::warn!(email, required = %role, actual = %user.role, "role check failed");
            Err(AppError::Forbidden)
        }
        None => {
            tracing::warn!(email, required = %role, "role check failed: no profile");
            Err(AppError::Forbidden)
        }
    }
}

/// ensure_self
///
/// Self-scoped resources: the path email must be the caller's own.
pub fn ensure_self(user: &AuthUser, email: &str) -> Result<(), AppError> {
    if user.email == email {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// require_authenticated
///
/// Rejects with 401 unless the request carries a valid identity. The `AuthUser`
/// extractor attaches the identity to the request extensions on success.
pub async fn require_authenticated(_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// require_role
///
/// Runs authentication first (the extractor argument), then the role check.
/// Nothing downstream runs, and nothing is written, when either fails.
pub async fn require_role(
    state: &AppState,
    user: AuthUser,
    request: Request,
    next: Next,
    role: Role,
) -> Result<Response, AppError> {
    ensure_role(state.repo.as_ref(), &user.email, role).await?;
    Ok(next.run(request).await)
}

/// Gate for admin-only routers.
pub async fn require_admin(
    State(state): State<AppState>,
    user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_role(&state, user, request, next, Role::Admin).await
}

/// Gate for instructor-only routers.
pub async fn require_instructor(
    State(state): State<AppState>,
    user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_role(&state, user, request, next, Role::Instructor).await
}
