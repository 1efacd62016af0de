use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    repository::RepositoryState,
};

/// Header accepted in `Env::Local` only, naming an existing profile by email.
pub const LOCAL_BYPASS_HEADER: &str = "x-user-email";

/// Claims
///
/// Payload of an identity token. The subject claim is the user's email; the
/// frontend reads it under the `email` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject claim: the email of the user the token was issued to.
    pub email: String,
    /// Issued At (iat), seconds since the Unix epoch.
    pub iat: usize,
    /// Expiration Time (exp), seconds since the Unix epoch.
    pub exp: usize,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// issue_token
///
/// Signs `email` with the server secret (HS256). The token expires `ttl_secs`
/// after issuance (one hour with the default configuration).
pub fn issue_token(email: &str, secret: &str, ttl_secs: u64) -> Result<String, AppError> {
    let now = now_secs();
    let claims = Claims {
        email: email.to_string(),
        iat: now as usize,
        exp: (now + ttl_secs) as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("failed to sign token: {e}")))
}

/// verify_token
///
/// Returns the subject claim of a well-formed, correctly signed, unexpired token.
/// Every failure kind collapses into `Unauthenticated`.
pub fn verify_token(token: &str, secret: &str) -> Result<String, AppError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims.email)
        .map_err(|e| {
            tracing::debug!(error = %e, "identity token rejected");
            AppError::Unauthenticated
        })
}

/// AuthUser
///
/// The resolved identity of an authenticated request: the decoded subject claim.
/// Role membership is resolved separately by the authorization gate, against the
/// current profile rather than the token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub email: String,
}

/// AuthUser Extractor Implementation
///
/// 1. Reuse an identity already attached by the gate middleware, if any.
/// 2. Local bypass: in `Env::Local`, `x-user-email` naming an existing profile.
/// 3. `Authorization: Bearer <token>` verification.
///
/// Rejection: `AppError::Unauthenticated` (401).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            if let Some(email) = parts
                .headers
                .get(LOCAL_BYPASS_HEADER)
                .and_then(|value| value.to_str().ok())
            {
                let repo = RepositoryState::from_ref(state);
                if repo.get_profile(email).await?.is_some() {
                    let user = AuthUser {
                        email: email.to_string(),
                    };
                    parts.extensions.insert(user.clone());
                    return Ok(user);
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AppError::Unauthenticated)?;

        let email = verify_token(token, &config.jwt_secret)?;

        let user = AuthUser { email };
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}
