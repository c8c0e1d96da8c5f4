//! Route definitions for images and their comments.

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{comments, images};
use crate::state::AppState;

/// Image routes mounted at `/images`.
///
/// ```text
/// GET    /                              -> list_images
/// POST   /                              -> upload_image
/// GET    /{id}                          -> get_image
/// DELETE /{id}                          -> delete_image (owner only)
/// POST   /{id}/reannotate               -> reannotate_image (owner only)
/// POST   /{id}/fail                     -> fail_image (owner only)
/// POST   /{id}/comments                 -> create_comment
/// DELETE /{id}/comments/{comment_id}    -> delete_comment (author only)
/// ```
///
/// `max_upload_bytes` bounds the multipart body of an upload.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(images::list_images)
                .post(images::upload_image)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/{id}", get(images::get_image).delete(images::delete_image))
        .route("/{id}/reannotate", post(images::reannotate_image))
        .route("/{id}/fail", post(images::fail_image))
        .route("/{id}/comments", post(comments::create_comment))
        .route(
            "/{id}/comments/{comment_id}",
            delete(comments::delete_comment),
        )
}
