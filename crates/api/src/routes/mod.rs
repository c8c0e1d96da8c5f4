pub mod health;
pub mod images;

use axum::routing::get;
use axum::Router;

use crate::config::ServerConfig;
use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /labels                                   catalog listing
///
/// /images                                   list, upload
/// /images/{id}                              detail, delete
/// /images/{id}/reannotate                   queue another labeling run
/// /images/{id}/fail                         external failure report
/// /images/{id}/comments                     add comment
/// /images/{id}/comments/{comment_id}        delete comment
///
/// /my-images                                caller's images
/// ```
pub fn api_routes(config: &ServerConfig) -> Router<AppState> {
    Router::new()
        .route("/labels", get(handlers::labels::list_labels))
        .nest("/images", images::router(config.max_upload_bytes))
        .route("/my-images", get(handlers::images::list_my_images))
}
