//! Handlers for the annotation label catalog.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/labels
///
/// Every label in the catalog, ordered by id.
pub async fn list_labels(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let labels = state.catalog.labels().await?;
    Ok(Json(DataResponse { data: labels }))
}
