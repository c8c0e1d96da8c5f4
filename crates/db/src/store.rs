//! The storage contract shared by the pipeline and the HTTP layer.

use async_trait::async_trait;
use pictura_core::status::{ImageStatus, StatusChange};
use pictura_core::types::DbId;

use crate::models::comment::{Comment, CreateComment};
use crate::models::image::{AnnotationUpdate, CreateImage, Image, LabelAttachment};
use crate::models::label::AnnotationLabel;
use crate::StoreError;

/// Persistence operations for labels, images, annotation sets, and comments.
///
/// Implementations must guarantee:
///
/// - [`resolve_label`](Self::resolve_label) is a compare-and-create: concurrent
///   calls with the same name all return the same row.
/// - [`add_image_label`](Self::add_image_label),
///   [`recompute_status`](Self::recompute_status), and
///   [`attach_label_and_recompute`](Self::attach_label_and_recompute) run
///   under a lock scoped to the one image, never a lock across all images.
/// - [`list_comments`](Self::list_comments) returns a single consistent
///   snapshot.
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    // -- Labels -------------------------------------------------------------

    /// Return the label named `name`, creating it if it does not exist yet.
    async fn resolve_label(&self, name: &str) -> Result<AnnotationLabel, StoreError>;

    /// Number of distinct labels ever created.
    async fn label_count(&self) -> Result<i64, StoreError>;

    /// All labels, ordered by id.
    async fn list_labels(&self) -> Result<Vec<AnnotationLabel>, StoreError>;

    // -- Images -------------------------------------------------------------

    /// Insert a new image in the `queued` state with an empty annotation set.
    async fn create_image(&self, input: &CreateImage) -> Result<Image, StoreError>;

    async fn find_image(&self, id: DbId) -> Result<Option<Image>, StoreError>;

    /// List images ordered by id, optionally restricted to one owner.
    async fn list_images(&self, owner_id: Option<DbId>) -> Result<Vec<Image>, StoreError>;

    /// The image's annotation set, ordered by label id.
    ///
    /// Fails with `NotFound` if the image does not exist.
    async fn image_labels(&self, image_id: DbId) -> Result<Vec<AnnotationLabel>, StoreError>;

    /// Add `label_id` to the image's annotation set and report the resulting
    /// cardinality. Adding a label already present leaves the set unchanged.
    ///
    /// Fails with `NotFound` if the image does not exist.
    async fn add_image_label(
        &self,
        image_id: DbId,
        label_id: DbId,
    ) -> Result<LabelAttachment, StoreError>;

    /// Re-derive and persist the image's status from its current annotation
    /// set cardinality (see [`pictura_core::status::recompute_status`]).
    ///
    /// Fails with `NotFound` if the image does not exist.
    async fn recompute_status(
        &self,
        image_id: DbId,
        catalog_size: i64,
    ) -> Result<StatusChange, StoreError>;

    /// Add `label_id` to the image's annotation set and recompute its status
    /// without releasing the image's lock in between, so no reader ever sees
    /// the new set paired with a stale status.
    ///
    /// Fails with `NotFound` if the image does not exist.
    async fn attach_label_and_recompute(
        &self,
        image_id: DbId,
        label_id: DbId,
        catalog_size: i64,
    ) -> Result<AnnotationUpdate, StoreError>;

    /// Overwrite the image's status. Used for external failure reports.
    ///
    /// Fails with `NotFound` if the image does not exist.
    async fn set_status(&self, image_id: DbId, status: ImageStatus) -> Result<Image, StoreError>;

    /// Delete an image together with its annotation set and comments.
    ///
    /// Returns `true` if an image was deleted.
    async fn delete_image(&self, id: DbId) -> Result<bool, StoreError>;

    // -- Comments -----------------------------------------------------------

    /// Fails with `NotFound` if the target image does not exist.
    async fn create_comment(&self, input: &CreateComment) -> Result<Comment, StoreError>;

    async fn find_comment(&self, id: DbId) -> Result<Option<Comment>, StoreError>;

    /// All comments on an image ordered by id, read as one snapshot.
    async fn list_comments(&self, image_id: DbId) -> Result<Vec<Comment>, StoreError>;

    /// Returns `true` if a comment was deleted.
    async fn delete_comment(&self, id: DbId) -> Result<bool, StoreError>;

    // -- Health -------------------------------------------------------------

    /// Check that the backing storage answers. Always succeeds for stores
    /// without an external dependency.
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
