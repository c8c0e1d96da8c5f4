//! Image model, DTOs, and the annotation-set mutation result.

use pictura_core::status::{ImageStatus, StatusChange};
use pictura_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An uploaded image and its lifecycle status.
///
/// The annotation set is stored separately in `image_annotations`; see
/// [`AnnotationStore::image_labels`](crate::AnnotationStore::image_labels).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Image {
    pub id: DbId,
    /// Opaque reference returned by the image storage collaborator.
    pub image_ref: String,
    pub owner_id: DbId,
    pub status: ImageStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Raw `images` row; `status` is decoded into [`ImageStatus`] on conversion.
#[derive(Debug, Clone, FromRow)]
pub struct ImageRow {
    pub id: DbId,
    pub image_ref: String,
    pub owner_id: DbId,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<ImageRow> for Image {
    type Error = sqlx::Error;

    fn try_from(row: ImageRow) -> Result<Self, Self::Error> {
        let status =
            ImageStatus::parse(&row.status).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        Ok(Image {
            id: row.id,
            image_ref: row.image_ref,
            owner_id: row.owner_id,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// DTO for inserting an image. New images always start `queued`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateImage {
    pub image_ref: String,
    pub owner_id: DbId,
}

/// Result of adding one label to an image's annotation set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LabelAttachment {
    /// `false` when the label was already in the set.
    pub inserted: bool,
    /// Size of the annotation set after the add.
    pub cardinality: i64,
}

/// A label addition and the status recomputation made in the same critical
/// section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationUpdate {
    pub attachment: LabelAttachment,
    pub change: StatusChange,
}
