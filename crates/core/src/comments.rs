//! Comment text rules and the per-image summary computed on read.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::CoreError;
use crate::sentiment::SentimentAnalyzer;
use crate::types::DbId;

/// Maximum length of a comment body, in characters.
pub const MAX_COMMENT_LEN: usize = 5000;

/// Number of whitespace-delimited words in a comment body.
pub fn token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Reject blank bodies and bodies over [`MAX_COMMENT_LEN`] characters.
pub fn validate_comment_text(text: &str) -> Result<(), CoreError> {
    if text.trim().is_empty() {
        return Err(CoreError::Validation(
            "Comment text must not be blank".to_string(),
        ));
    }
    let len = text.chars().count();
    if len > MAX_COMMENT_LEN {
        return Err(CoreError::Validation(format!(
            "Comment text must not exceed {MAX_COMMENT_LEN} characters, got {len}"
        )));
    }
    Ok(())
}

/// Read-time statistics over one image's comments. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageSummary {
    pub distinct_commenter_count: usize,
    /// Mean token count; `None` when the image has no comments.
    pub average_comment_length: Option<f64>,
    /// Mean polarity; `None` when the image has no comments.
    pub average_sentiment: Option<f64>,
}

impl ImageSummary {
    pub fn empty() -> Self {
        Self {
            distinct_commenter_count: 0,
            average_comment_length: None,
            average_sentiment: None,
        }
    }
}

/// Aggregate a snapshot of `(author_id, body)` pairs.
pub fn summarize<'a, I>(comments: I, analyzer: &dyn SentimentAnalyzer) -> ImageSummary
where
    I: IntoIterator<Item = (DbId, &'a str)>,
{
    let mut authors = HashSet::new();
    let mut count = 0usize;
    let mut total_tokens = 0usize;
    let mut total_polarity = 0.0;

    for (author_id, body) in comments {
        authors.insert(author_id);
        count += 1;
        total_tokens += token_count(body);
        total_polarity += analyzer.polarity(body);
    }

    if count == 0 {
        return ImageSummary::empty();
    }

    ImageSummary {
        distinct_commenter_count: authors.len(),
        average_comment_length: Some(total_tokens as f64 / count as f64),
        average_sentiment: Some(total_polarity / count as f64),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
