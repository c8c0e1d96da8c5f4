//! In-process [`AnnotationStore`].
//!
//! Each image lives behind its own `Mutex`, so annotation-set mutation and
//! status recomputation are serialized per image only. The outer `RwLock` on
//! the image map is held just long enough to look up or insert an entry.
//!
//! Lock order is `images` before `comments`; the label map is never held
//! together with another lock.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pictura_core::status::{recompute_status, ImageStatus, StatusChange};
use pictura_core::types::DbId;
use tokio::sync::{Mutex, RwLock};

use crate::models::comment::{Comment, CreateComment};
use crate::models::image::{AnnotationUpdate, CreateImage, Image, LabelAttachment};
use crate::models::label::AnnotationLabel;
use crate::{AnnotationStore, StoreError};

struct ImageRecord {
    image: Image,
    labels: BTreeSet<DbId>,
}

impl ImageRecord {
    fn recompute(&mut self, catalog_size: i64) -> StatusChange {
        let previous = self.image.status;
        let cardinality = self.labels.len() as i64;
        let current = recompute_status(previous, cardinality, catalog_size);
        if current != previous {
            self.image.status = current;
            self.image.updated_at = Utc::now();
        }
        StatusChange {
            previous,
            current,
            cardinality,
        }
    }
}

/// Process-local store. All data is lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    labels: Mutex<HashMap<String, AnnotationLabel>>,
    images: RwLock<HashMap<DbId, Arc<Mutex<ImageRecord>>>>,
    comments: RwLock<BTreeMap<DbId, Comment>>,
    label_seq: AtomicI64,
    image_seq: AtomicI64,
    comment_seq: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn record(&self, image_id: DbId) -> Result<Arc<Mutex<ImageRecord>>, StoreError> {
        self.images
            .read()
            .await
            .get(&image_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Image", image_id))
    }
}

fn next_id(seq: &AtomicI64) -> DbId {
    seq.fetch_add(1, Ordering::Relaxed) + 1
}

#[async_trait]
impl AnnotationStore for MemoryStore {
    async fn resolve_label(&self, name: &str) -> Result<AnnotationLabel, StoreError> {
        let mut labels = self.labels.lock().await;
        let label = labels
            .entry(name.to_string())
            .or_insert_with(|| AnnotationLabel {
                id: next_id(&self.label_seq),
                name: name.to_string(),
                created_at: Utc::now(),
            });
        Ok(label.clone())
    }

    async fn label_count(&self) -> Result<i64, StoreError> {
        Ok(self.labels.lock().await.len() as i64)
    }

    async fn list_labels(&self) -> Result<Vec<AnnotationLabel>, StoreError> {
        let mut labels: Vec<_> = self.labels.lock().await.values().cloned().collect();
        labels.sort_by_key(|l| l.id);
        Ok(labels)
    }

    async fn create_image(&self, input: &CreateImage) -> Result<Image, StoreError> {
        let now = Utc::now();
        let image = Image {
            id: next_id(&self.image_seq),
            image_ref: input.image_ref.clone(),
            owner_id: input.owner_id,
            status: ImageStatus::Queued,
            created_at: now,
            updated_at: now,
        };
        let record = ImageRecord {
            image: image.clone(),
            labels: BTreeSet::new(),
        };
        self.images
            .write()
            .await
            .insert(image.id, Arc::new(Mutex::new(record)));
        Ok(image)
    }

    async fn find_image(&self, id: DbId) -> Result<Option<Image>, StoreError> {
        let record = self.images.read().await.get(&id).cloned();
        match record {
            Some(record) => Ok(Some(record.lock().await.image.clone())),
            None => Ok(None),
        }
    }

    async fn list_images(&self, owner_id: Option<DbId>) -> Result<Vec<Image>, StoreError> {
        let records: Vec<_> = self.images.read().await.values().cloned().collect();
        let mut images = Vec::with_capacity(records.len());
        for record in records {
            let image = record.lock().await.image.clone();
            if owner_id.is_none_or(|owner| owner == image.owner_id) {
                images.push(image);
            }
        }
        images.sort_by_key(|i| i.id);
        Ok(images)
    }

    async fn image_labels(&self, image_id: DbId) -> Result<Vec<AnnotationLabel>, StoreError> {
        let ids = self.record(image_id).await?.lock().await.labels.clone();
        let mut labels: Vec<_> = self
            .labels
            .lock()
            .await
            .values()
            .filter(|l| ids.contains(&l.id))
            .cloned()
            .collect();
        labels.sort_by_key(|l| l.id);
        Ok(labels)
    }

    async fn add_image_label(
        &self,
        image_id: DbId,
        label_id: DbId,
    ) -> Result<LabelAttachment, StoreError> {
        let record = self.record(image_id).await?;
        let mut record = record.lock().await;
        let inserted = record.labels.insert(label_id);
        Ok(LabelAttachment {
            inserted,
            cardinality: record.labels.len() as i64,
        })
    }

    async fn recompute_status(
        &self,
        image_id: DbId,
        catalog_size: i64,
    ) -> Result<StatusChange, StoreError> {
        let record = self.record(image_id).await?;
        let mut record = record.lock().await;
        Ok(record.recompute(catalog_size))
    }

    async fn attach_label_and_recompute(
        &self,
        image_id: DbId,
        label_id: DbId,
        catalog_size: i64,
    ) -> Result<AnnotationUpdate, StoreError> {
        let record = self.record(image_id).await?;
        let mut record = record.lock().await;
        let inserted = record.labels.insert(label_id);
        let attachment = LabelAttachment {
            inserted,
            cardinality: record.labels.len() as i64,
        };
        let change = record.recompute(catalog_size);
        tracing::trace!(
            image_id,
            label_id,
            inserted,
            status = %change.current,
            "Label attached",
        );
        Ok(AnnotationUpdate { attachment, change })
    }

    async fn set_status(&self, image_id: DbId, status: ImageStatus) -> Result<Image, StoreError> {
        let record = self.record(image_id).await?;
        let mut record = record.lock().await;
        record.image.status = status;
        record.image.updated_at = Utc::now();
        Ok(record.image.clone())
    }

    async fn delete_image(&self, id: DbId) -> Result<bool, StoreError> {
        let mut images = self.images.write().await;
        if images.remove(&id).is_none() {
            return Ok(false);
        }
        let mut comments = self.comments.write().await;
        let before = comments.len();
        comments.retain(|_, c| c.image_id != id);
        tracing::debug!(
            image_id = id,
            comments_removed = before - comments.len(),
            "Image deleted",
        );
        Ok(true)
    }

    async fn create_comment(&self, input: &CreateComment) -> Result<Comment, StoreError> {
        let images = self.images.read().await;
        if !images.contains_key(&input.image_id) {
            return Err(StoreError::not_found("Image", input.image_id));
        }
        let comment = Comment {
            id: next_id(&self.comment_seq),
            image_id: input.image_id,
            author_id: input.author_id,
            body: input.body.clone(),
            created_at: Utc::now(),
        };
        self.comments.write().await.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn find_comment(&self, id: DbId) -> Result<Option<Comment>, StoreError> {
        Ok(self.comments.read().await.get(&id).cloned())
    }

    async fn list_comments(&self, image_id: DbId) -> Result<Vec<Comment>, StoreError> {
        Ok(self
            .comments
            .read()
            .await
            .values()
            .filter(|c| c.image_id == image_id)
            .cloned()
            .collect())
    }

    async fn delete_comment(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(self.comments.write().await.remove(&id).is_some())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
