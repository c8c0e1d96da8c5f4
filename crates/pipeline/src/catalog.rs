//! The annotation catalog: the shared set of labels images can carry.

use std::sync::Arc;

use pictura_core::labels::AnnotationKind;
use pictura_db::models::label::AnnotationLabel;
use pictura_db::{AnnotationStore, StoreError};

/// Owned handle to the label catalog. Cheap to clone.
///
/// Names are validated against [`AnnotationKind`] before they reach the
/// store; the store's compare-and-create makes [`resolve`](Self::resolve)
/// idempotent under concurrent callers.
#[derive(Clone)]
pub struct AnnotationCatalog {
    store: Arc<dyn AnnotationStore>,
}

impl AnnotationCatalog {
    pub fn new(store: Arc<dyn AnnotationStore>) -> Self {
        Self { store }
    }

    /// Resolve every label in the enumeration so the catalog size equals the
    /// enumeration size from the first image on. Returns the resulting size.
    pub async fn seed(&self) -> Result<i64, StoreError> {
        for kind in AnnotationKind::ALL {
            self.resolve_kind(kind).await?;
        }
        self.size().await
    }

    /// Get or create the label called `name`.
    ///
    /// Fails with `InvalidLabel` for names outside the enumeration.
    pub async fn resolve(&self, name: &str) -> Result<AnnotationLabel, StoreError> {
        let kind = AnnotationKind::parse(name)?;
        self.resolve_kind(kind).await
    }

    pub async fn resolve_kind(&self, kind: AnnotationKind) -> Result<AnnotationLabel, StoreError> {
        self.store.resolve_label(kind.as_str()).await
    }

    /// Number of distinct labels created so far.
    pub async fn size(&self) -> Result<i64, StoreError> {
        self.store.label_count().await
    }

    pub async fn labels(&self) -> Result<Vec<AnnotationLabel>, StoreError> {
        self.store.list_labels().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pictura_core::error::CoreError;
    use pictura_db::MemoryStore;

    fn catalog() -> AnnotationCatalog {
        AnnotationCatalog::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn resolve_mountain_twice_returns_same_id() {
        let catalog = catalog();
        let first = catalog.resolve("mountain").await.unwrap();
        let second = catalog.resolve("mountain").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.name, "mountain");
    }

    #[tokio::test]
    async fn resolve_normalizes_name() {
        let catalog = catalog();
        let a = catalog.resolve("Forest").await.unwrap();
        let b = catalog.resolve(" forest ").await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(catalog.size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_name_is_invalid_label() {
        let catalog = catalog();
        assert_matches!(
            catalog.resolve("volcano").await,
            Err(StoreError::Core(CoreError::InvalidLabel(_)))
        );
        assert_eq!(catalog.size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn seed_creates_every_label_once() {
        let catalog = catalog();
        let size = catalog.seed().await.unwrap();
        assert_eq!(size, AnnotationKind::ALL.len() as i64);

        // Seeding again only resolves existing rows.
        assert_eq!(catalog.seed().await.unwrap(), size);
        assert_eq!(catalog.labels().await.unwrap().len(), AnnotationKind::ALL.len());
    }
}
