//! Comment model and DTOs.

use pictura_core::comments::token_count;
use pictura_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `comments` table. Immutable once created.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Comment {
    pub id: DbId,
    pub image_id: DbId,
    pub author_id: DbId,
    pub body: String,
    pub created_at: Timestamp,
}

impl Comment {
    /// Length of the body in whitespace-delimited words.
    pub fn token_count(&self) -> usize {
        token_count(&self.body)
    }
}

/// DTO for inserting a comment.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateComment {
    pub image_id: DbId,
    pub author_id: DbId,
    pub body: String,
}
