//! Repository for the `annotation_labels` table.

use sqlx::PgPool;

use crate::models::label::AnnotationLabel;

/// Column list for `annotation_labels` queries.
const LABEL_COLUMNS: &str = "id, name, created_at";

/// Provides get-or-create and listing for annotation labels.
pub struct LabelRepo;

impl LabelRepo {
    /// Create a label or return the existing one with the same name.
    ///
    /// A single `INSERT ... ON CONFLICT` statement, so concurrent callers
    /// racing on the same name all receive the same row. The no-op
    /// `DO UPDATE` makes `RETURNING` yield the existing row on conflict.
    pub async fn create_or_get(pool: &PgPool, name: &str) -> Result<AnnotationLabel, sqlx::Error> {
        let query = format!(
            "INSERT INTO annotation_labels (name) VALUES ($1) \
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
             RETURNING {LABEL_COLUMNS}"
        );
        sqlx::query_as::<_, AnnotationLabel>(&query)
            .bind(name)
            .fetch_one(pool)
            .await
    }

    /// Total number of labels in the catalog.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM annotation_labels")
            .fetch_one(pool)
            .await
    }

    /// All labels, oldest first.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<AnnotationLabel>, sqlx::Error> {
        let query = format!("SELECT {LABEL_COLUMNS} FROM annotation_labels ORDER BY id");
        sqlx::query_as::<_, AnnotationLabel>(&query)
            .fetch_all(pool)
            .await
    }
}
