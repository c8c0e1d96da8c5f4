//! Handlers for comments on images.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use pictura_core::comments::validate_comment_text;
use pictura_core::error::CoreError;
use pictura_core::types::DbId;
use pictura_db::models::comment::CreateComment;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 5000))]
    pub text: String,
}

/// POST /api/v1/images/{id}/comments
pub async fn create_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(image_id): Path<DbId>,
    Json(input): Json<CreateCommentRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    validate_comment_text(&input.text)?;

    let comment = state
        .store
        .create_comment(&CreateComment {
            image_id,
            author_id: auth.user_id,
            body: input.text,
        })
        .await?;

    tracing::info!(
        image_id,
        comment_id = comment.id,
        user_id = auth.user_id,
        "Comment added",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: comment })))
}

/// DELETE /api/v1/images/{id}/comments/{comment_id}
///
/// Only the comment's author may delete it.
pub async fn delete_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((image_id, comment_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let comment = state
        .store
        .find_comment(comment_id)
        .await?
        .filter(|c| c.image_id == image_id)
        .ok_or_else(|| comment_not_found(comment_id))?;
    auth.ensure_owns(comment.author_id, "comment")?;

    if !state.store.delete_comment(comment_id).await? {
        return Err(comment_not_found(comment_id));
    }

    tracing::info!(image_id, comment_id, user_id = auth.user_id, "Comment deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn comment_not_found(comment_id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Comment",
        id: comment_id,
    })
}
