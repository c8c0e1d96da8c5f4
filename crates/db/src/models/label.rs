//! Annotation label model.

use pictura_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `annotation_labels` table. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct AnnotationLabel {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
}
