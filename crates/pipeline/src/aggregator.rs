//! Read-time comment statistics for an image.

use std::sync::Arc;

use pictura_core::comments::{summarize, ImageSummary};
use pictura_core::sentiment::SentimentAnalyzer;
use pictura_core::types::DbId;
use pictura_db::models::comment::Comment;
use pictura_db::{AnnotationStore, StoreError};

/// Computes [`ImageSummary`] values from the store's comment snapshot.
///
/// Nothing is cached: every call reflects the comments committed at the
/// moment the snapshot was read.
#[derive(Clone)]
pub struct CommentAggregator {
    store: Arc<dyn AnnotationStore>,
    analyzer: Arc<dyn SentimentAnalyzer>,
}

impl CommentAggregator {
    pub fn new(store: Arc<dyn AnnotationStore>, analyzer: Arc<dyn SentimentAnalyzer>) -> Self {
        Self { store, analyzer }
    }

    /// Summarize all comments on `image_id`.
    pub async fn summarize(&self, image_id: DbId) -> Result<ImageSummary, StoreError> {
        if self.store.find_image(image_id).await?.is_none() {
            return Err(StoreError::not_found("Image", image_id));
        }
        let comments = self.store.list_comments(image_id).await?;
        Ok(self.summarize_snapshot(&comments))
    }

    /// Summarize comments the caller already holds.
    pub fn summarize_snapshot(&self, comments: &[Comment]) -> ImageSummary {
        summarize(
            comments.iter().map(|c| (c.author_id, c.body.as_str())),
            self.analyzer.as_ref(),
        )
    }
}
