//! [`AnnotationStore`] backed by PostgreSQL.

use async_trait::async_trait;
use pictura_core::status::{ImageStatus, StatusChange};
use pictura_core::types::DbId;

use crate::models::comment::{Comment, CreateComment};
use crate::models::image::{AnnotationUpdate, CreateImage, Image, LabelAttachment};
use crate::models::label::AnnotationLabel;
use crate::repositories::{CommentRepo, ImageRepo, LabelRepo};
use crate::{AnnotationStore, DbPool, StoreError};

/// PostgreSQL store. Cheap to clone (the pool is reference-counted).
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl AnnotationStore for PgStore {
    async fn resolve_label(&self, name: &str) -> Result<AnnotationLabel, StoreError> {
        Ok(LabelRepo::create_or_get(&self.pool, name).await?)
    }

    async fn label_count(&self) -> Result<i64, StoreError> {
        Ok(LabelRepo::count(&self.pool).await?)
    }

    async fn list_labels(&self) -> Result<Vec<AnnotationLabel>, StoreError> {
        Ok(LabelRepo::list_all(&self.pool).await?)
    }

    async fn create_image(&self, input: &CreateImage) -> Result<Image, StoreError> {
        Ok(ImageRepo::create(&self.pool, input).await?)
    }

    async fn find_image(&self, id: DbId) -> Result<Option<Image>, StoreError> {
        Ok(ImageRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_images(&self, owner_id: Option<DbId>) -> Result<Vec<Image>, StoreError> {
        Ok(ImageRepo::list(&self.pool, owner_id).await?)
    }

    async fn image_labels(&self, image_id: DbId) -> Result<Vec<AnnotationLabel>, StoreError> {
        if ImageRepo::find_by_id(&self.pool, image_id).await?.is_none() {
            return Err(StoreError::not_found("Image", image_id));
        }
        Ok(ImageRepo::labels_for(&self.pool, image_id).await?)
    }

    async fn add_image_label(
        &self,
        image_id: DbId,
        label_id: DbId,
    ) -> Result<LabelAttachment, StoreError> {
        ImageRepo::attach_label(&self.pool, image_id, label_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Image", image_id))
    }

    async fn recompute_status(
        &self,
        image_id: DbId,
        catalog_size: i64,
    ) -> Result<StatusChange, StoreError> {
        ImageRepo::recompute_status(&self.pool, image_id, catalog_size)
            .await?
            .ok_or_else(|| StoreError::not_found("Image", image_id))
    }

    async fn attach_label_and_recompute(
        &self,
        image_id: DbId,
        label_id: DbId,
        catalog_size: i64,
    ) -> Result<AnnotationUpdate, StoreError> {
        ImageRepo::attach_label_and_recompute(&self.pool, image_id, label_id, catalog_size)
            .await?
            .ok_or_else(|| StoreError::not_found("Image", image_id))
    }

    async fn set_status(&self, image_id: DbId, status: ImageStatus) -> Result<Image, StoreError> {
        ImageRepo::set_status(&self.pool, image_id, status)
            .await?
            .ok_or_else(|| StoreError::not_found("Image", image_id))
    }

    async fn delete_image(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(ImageRepo::delete(&self.pool, id).await?)
    }

    async fn create_comment(&self, input: &CreateComment) -> Result<Comment, StoreError> {
        CommentRepo::create(&self.pool, input)
            .await?
            .ok_or_else(|| StoreError::not_found("Image", input.image_id))
    }

    async fn find_comment(&self, id: DbId) -> Result<Option<Comment>, StoreError> {
        Ok(CommentRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_comments(&self, image_id: DbId) -> Result<Vec<Comment>, StoreError> {
        Ok(CommentRepo::list_for_image(&self.pool, image_id).await?)
    }

    async fn delete_comment(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(CommentRepo::delete(&self.pool, id).await?)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }
}
