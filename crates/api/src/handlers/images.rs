//! Handlers for image upload, listing, detail, and owner actions.
//!
//! All endpoints require authentication via [`AuthUser`]. Uploads return as
//! soon as the image is stored; labeling happens in the background pipeline.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use pictura_core::error::CoreError;
use pictura_core::types::DbId;
use pictura_db::models::comment::Comment;
use pictura_db::models::image::{CreateImage, Image};
use pictura_events::PipelineEvent;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Multipart field carrying the image bytes.
const IMAGE_FIELD: &str = "image";

/// Image plus its annotation names and comment statistics.
#[derive(Debug, Serialize)]
pub struct ImageDetail {
    #[serde(flatten)]
    pub image: Image,
    pub annotations: Vec<String>,
    pub comments: Vec<Comment>,
    pub num_users_comment: usize,
    pub avg_comment_length: Option<f64>,
    pub sentiment: Option<f64>,
}

// ---------------------------------------------------------------------------
// Listing and detail
// ---------------------------------------------------------------------------

/// GET /api/v1/images
pub async fn list_images(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let images = state.store.list_images(None).await?;
    Ok(Json(DataResponse { data: images }))
}

/// GET /api/v1/my-images
///
/// Images uploaded by the caller.
pub async fn list_my_images(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let images = state.store.list_images(Some(auth.user_id)).await?;
    Ok(Json(DataResponse { data: images }))
}

/// GET /api/v1/images/{id}
///
/// Statistics are computed from the same comment snapshot that is returned.
pub async fn get_image(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(image_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let image = find_image(&state, image_id).await?;

    let annotations = state
        .store
        .image_labels(image_id)
        .await?
        .into_iter()
        .map(|label| label.name)
        .collect();
    let comments = state.store.list_comments(image_id).await?;
    let summary = state.aggregator.summarize_snapshot(&comments);

    Ok(Json(DataResponse {
        data: ImageDetail {
            image,
            annotations,
            comments,
            num_users_comment: summary.distinct_commenter_count,
            avg_comment_length: summary.average_comment_length,
            sentiment: summary.average_sentiment,
        },
    }))
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

/// POST /api/v1/images
///
/// Accepts a multipart form with a required `image` field. The payload must
/// be a PNG, JPEG, or WebP image. The new image starts `queued` and an
/// image-created event is published for the labeling pipeline.
pub async fn upload_image(
    auth: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut payload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some(IMAGE_FIELD) {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            payload = Some(data);
        }
    }

    let data = payload
        .ok_or_else(|| AppError::BadRequest(format!("Missing required '{IMAGE_FIELD}' field")))?;
    if data.is_empty() {
        return Err(AppError::BadRequest("Uploaded image is empty".into()));
    }
    if data.len() > state.config.max_upload_bytes {
        return Err(AppError::BadRequest(format!(
            "Uploaded image exceeds {} bytes",
            state.config.max_upload_bytes
        )));
    }

    let image_ref = state.storage.store(&data).await?;
    let image = state
        .store
        .create_image(&CreateImage {
            image_ref,
            owner_id: auth.user_id,
        })
        .await?;

    state
        .event_bus
        .publish(PipelineEvent::image_created(image.id, image.owner_id));

    tracing::info!(
        image_id = image.id,
        user_id = auth.user_id,
        size = data.len(),
        "Image uploaded",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: image })))
}

// ---------------------------------------------------------------------------
// Owner actions
// ---------------------------------------------------------------------------

/// DELETE /api/v1/images/{id}
///
/// Removes the image with its annotation set and comments. Owner only.
pub async fn delete_image(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(image_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let image = find_image(&state, image_id).await?;
    auth.ensure_owns(image.owner_id, "image")?;

    if !state.store.delete_image(image_id).await? {
        return Err(not_found(image_id));
    }

    tracing::info!(image_id, user_id = auth.user_id, "Image deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/images/{id}/reannotate
///
/// Queue another labeling run, e.g. after a run was abandoned on a store
/// error. Owner only.
pub async fn reannotate_image(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(image_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let image = find_image(&state, image_id).await?;
    auth.ensure_owns(image.owner_id, "image")?;

    state
        .event_bus
        .publish(PipelineEvent::image_created(image.id, image.owner_id));

    tracing::info!(image_id, user_id = auth.user_id, "Re-annotation requested");
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: image })))
}

/// POST /api/v1/images/{id}/fail
///
/// Report that labeling failed outside the pipeline. The image moves to
/// `fail` and stays there. Owner only.
pub async fn fail_image(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(image_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let image = find_image(&state, image_id).await?;
    auth.ensure_owns(image.owner_id, "image")?;

    let image = state
        .state_machine
        .mark_failed(image_id, "reported by owner")
        .await?;

    Ok(Json(DataResponse { data: image }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_image(state: &AppState, image_id: DbId) -> AppResult<Image> {
    state
        .store
        .find_image(image_id)
        .await?
        .ok_or_else(|| not_found(image_id))
}

fn not_found(image_id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Image",
        id: image_id,
    })
}
