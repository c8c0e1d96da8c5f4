//! Repository for the `comments` table.

use pictura_core::types::DbId;
use sqlx::PgPool;

use crate::models::comment::{Comment, CreateComment};

/// Column list for `comments` queries.
const COMMENT_COLUMNS: &str = "id, image_id, author_id, body, created_at";

/// Provides create, read, and delete for comments. Comments are never updated.
pub struct CommentRepo;

impl CommentRepo {
    /// Insert a comment if its image exists.
    ///
    /// Returns `None` when the image does not exist, instead of surfacing the
    /// foreign-key violation.
    pub async fn create(
        pool: &PgPool,
        input: &CreateComment,
    ) -> Result<Option<Comment>, sqlx::Error> {
        let query = format!(
            "INSERT INTO comments (image_id, author_id, body) \
             SELECT $1, $2, $3 WHERE EXISTS (SELECT 1 FROM images WHERE id = $1) \
             RETURNING {COMMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(input.image_id)
            .bind(input.author_id)
            .bind(&input.body)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Comment>, sqlx::Error> {
        let query = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1");
        sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All comments on an image in insertion order. A single statement, so the
    /// result is one consistent snapshot.
    pub async fn list_for_image(
        pool: &PgPool,
        image_id: DbId,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        let query = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE image_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(image_id)
            .fetch_all(pool)
            .await
    }

    /// Returns `true` if a comment was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
