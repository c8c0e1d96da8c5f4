//! Caller identity extractor for Axum handlers.
//!
//! Authentication happens upstream; the gateway forwards the verified user id
//! in the [`USER_ID_HEADER`] header and this service trusts it as-is.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use pictura_core::error::CoreError;
use pictura_core::types::DbId;

use crate::error::AppError;

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated user extracted from the [`USER_ID_HEADER`] header.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: DbId,
}

impl AuthUser {
    /// Fail with `Forbidden` unless the caller is `owner_id`.
    pub fn ensure_owns(&self, owner_id: DbId, what: &str) -> Result<(), AppError> {
        if self.user_id != owner_id {
            return Err(AppError::Core(CoreError::Forbidden(format!(
                "Only the owner may modify this {what}"
            ))));
        }
        Ok(())
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(format!(
                    "Missing {USER_ID_HEADER} header"
                )))
            })?;

        let user_id = raw
            .trim()
            .parse::<DbId>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(format!(
                    "Invalid {USER_ID_HEADER} header"
                )))
            })?;

        Ok(AuthUser { user_id })
    }
}
