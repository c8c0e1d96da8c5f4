//! Repository for the `images` and `image_annotations` tables.
//!
//! Annotation-set mutation and status recomputation run in a transaction
//! that first takes `SELECT ... FOR UPDATE` on the image row, so they are
//! serialized per image while different images proceed in parallel.

use pictura_core::status::{recompute_status, ImageStatus, StatusChange};
use pictura_core::types::DbId;
use sqlx::PgPool;

use crate::models::image::{AnnotationUpdate, CreateImage, Image, ImageRow, LabelAttachment};
use crate::models::label::AnnotationLabel;

/// Column list for `images` queries.
const IMAGE_COLUMNS: &str = "id, image_ref, owner_id, status, created_at, updated_at";

/// Provides CRUD for images and mutation of their annotation sets.
pub struct ImageRepo;

impl ImageRepo {
    // -----------------------------------------------------------------------
    // Image CRUD
    // -----------------------------------------------------------------------

    /// Insert a new image. The status column defaults to `queued`.
    pub async fn create(pool: &PgPool, input: &CreateImage) -> Result<Image, sqlx::Error> {
        let query = format!(
            "INSERT INTO images (image_ref, owner_id) VALUES ($1, $2) \
             RETURNING {IMAGE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ImageRow>(&query)
            .bind(&input.image_ref)
            .bind(input.owner_id)
            .fetch_one(pool)
            .await?;
        Image::try_from(row)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Image>, sqlx::Error> {
        let query = format!("SELECT {IMAGE_COLUMNS} FROM images WHERE id = $1");
        sqlx::query_as::<_, ImageRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(Image::try_from)
            .transpose()
    }

    /// List images ordered by id, optionally restricted to one owner.
    pub async fn list(pool: &PgPool, owner_id: Option<DbId>) -> Result<Vec<Image>, sqlx::Error> {
        let rows = match owner_id {
            Some(owner_id) => {
                let query = format!(
                    "SELECT {IMAGE_COLUMNS} FROM images WHERE owner_id = $1 ORDER BY id"
                );
                sqlx::query_as::<_, ImageRow>(&query)
                    .bind(owner_id)
                    .fetch_all(pool)
                    .await?
            }
            None => {
                let query = format!("SELECT {IMAGE_COLUMNS} FROM images ORDER BY id");
                sqlx::query_as::<_, ImageRow>(&query)
                    .fetch_all(pool)
                    .await?
            }
        };
        rows.into_iter().map(Image::try_from).collect()
    }

    /// Overwrite an image's status. Returns `None` if the image does not exist.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: ImageStatus,
    ) -> Result<Option<Image>, sqlx::Error> {
        let query = format!(
            "UPDATE images SET status = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {IMAGE_COLUMNS}"
        );
        sqlx::query_as::<_, ImageRow>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(pool)
            .await?
            .map(Image::try_from)
            .transpose()
    }

    /// Delete an image. Its annotation set and comments cascade.
    ///
    /// Returns `true` if an image was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Annotation set
    // -----------------------------------------------------------------------

    /// Labels attached to an image, ordered by label id.
    pub async fn labels_for(
        pool: &PgPool,
        image_id: DbId,
    ) -> Result<Vec<AnnotationLabel>, sqlx::Error> {
        sqlx::query_as::<_, AnnotationLabel>(
            "SELECT l.id, l.name, l.created_at \
             FROM image_annotations ia \
             JOIN annotation_labels l ON l.id = ia.label_id \
             WHERE ia.image_id = $1 \
             ORDER BY l.id",
        )
        .bind(image_id)
        .fetch_all(pool)
        .await
    }

    /// Add a label to an image's annotation set.
    ///
    /// Returns `None` if the image does not exist. A label already in the
    /// set is left alone and reported with `inserted = false`.
    pub async fn attach_label(
        pool: &PgPool,
        image_id: DbId,
        label_id: DbId,
    ) -> Result<Option<LabelAttachment>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if lock_image(&mut tx, image_id).await?.is_none() {
            return Ok(None);
        }
        let attachment = insert_label(&mut tx, image_id, label_id).await?;
        tx.commit().await?;

        Ok(Some(attachment))
    }

    /// Add a label and recompute the image's status in one transaction, with
    /// the image row locked throughout.
    ///
    /// Returns `None` if the image does not exist.
    pub async fn attach_label_and_recompute(
        pool: &PgPool,
        image_id: DbId,
        label_id: DbId,
        catalog_size: i64,
    ) -> Result<Option<AnnotationUpdate>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(previous) = lock_image(&mut tx, image_id).await? else {
            return Ok(None);
        };
        let attachment = insert_label(&mut tx, image_id, label_id).await?;
        let change = apply_status(&mut tx, image_id, previous, catalog_size).await?;
        tx.commit().await?;

        tracing::debug!(
            image_id,
            label_id,
            inserted = attachment.inserted,
            status = %change.current,
            "Label attached",
        );
        Ok(Some(AnnotationUpdate { attachment, change }))
    }

    /// Re-derive the image's status from its annotation-set cardinality and
    /// persist it if it changed.
    ///
    /// Returns `None` if the image does not exist.
    pub async fn recompute_status(
        pool: &PgPool,
        image_id: DbId,
        catalog_size: i64,
    ) -> Result<Option<StatusChange>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(previous) = lock_image(&mut tx, image_id).await? else {
            return Ok(None);
        };
        let change = apply_status(&mut tx, image_id, previous, catalog_size).await?;
        tx.commit().await?;

        Ok(Some(change))
    }
}

type PgTransaction<'c> = sqlx::Transaction<'c, sqlx::Postgres>;

/// Take the row lock on an image and return its current status, or `None`
/// if the image does not exist.
async fn lock_image(
    tx: &mut PgTransaction<'_>,
    image_id: DbId,
) -> Result<Option<ImageStatus>, sqlx::Error> {
    let status: Option<String> =
        sqlx::query_scalar("SELECT status FROM images WHERE id = $1 FOR UPDATE")
            .bind(image_id)
            .fetch_optional(&mut **tx)
            .await?;
    status
        .map(|s| ImageStatus::parse(&s).map_err(|e| sqlx::Error::Decode(Box::new(e))))
        .transpose()
}

async fn insert_label(
    tx: &mut PgTransaction<'_>,
    image_id: DbId,
    label_id: DbId,
) -> Result<LabelAttachment, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO image_annotations (image_id, label_id) VALUES ($1, $2) \
         ON CONFLICT (image_id, label_id) DO NOTHING",
    )
    .bind(image_id)
    .bind(label_id)
    .execute(&mut **tx)
    .await?;

    Ok(LabelAttachment {
        inserted: result.rows_affected() > 0,
        cardinality: count_labels(tx, image_id).await?,
    })
}

/// Recompute the status of a locked image and write it back if it moved.
async fn apply_status(
    tx: &mut PgTransaction<'_>,
    image_id: DbId,
    previous: ImageStatus,
    catalog_size: i64,
) -> Result<StatusChange, sqlx::Error> {
    let cardinality = count_labels(tx, image_id).await?;
    let current = recompute_status(previous, cardinality, catalog_size);

    if current != previous {
        sqlx::query("UPDATE images SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(image_id)
            .bind(current.as_str())
            .execute(&mut **tx)
            .await?;
    }

    Ok(StatusChange {
        previous,
        current,
        cardinality,
    })
}

async fn count_labels(
    tx: &mut PgTransaction<'_>,
    image_id: DbId,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM image_annotations WHERE image_id = $1")
        .bind(image_id)
        .fetch_one(&mut **tx)
        .await
}
