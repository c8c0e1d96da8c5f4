//! Image state machine: keeps each image's status in line with its
//! annotation set.
//!
//! Consumes [`PipelineEvent::AnnotationSetChanged`] and recomputes the
//! status from the set's current cardinality (see
//! [`pictura_core::status::recompute_status`]). Recomputation is pure and
//! runs under the store's per-image lock, so duplicate, replayed, or
//! concurrent events all converge on the same status.
//!
//! The assignment worker already recomputes inside the same critical section
//! as each label addition. This consumer covers every other writer of the
//! annotation set, and re-sweeps non-terminal images whenever its receiver
//! lags so no dropped event leaves a stale status behind.

use std::sync::Arc;

use pictura_core::error::CoreError;
use pictura_core::status::{ImageStatus, StatusChange};
use pictura_core::types::DbId;
use pictura_db::models::image::Image;
use pictura_db::{AnnotationStore, StoreError};
use pictura_events::PipelineEvent;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::catalog::AnnotationCatalog;

pub struct ImageStateMachine {
    store: Arc<dyn AnnotationStore>,
    catalog: AnnotationCatalog,
}

impl ImageStateMachine {
    pub fn new(store: Arc<dyn AnnotationStore>, catalog: AnnotationCatalog) -> Self {
        Self { store, catalog }
    }

    /// Recompute and persist the image's status after its annotation set
    /// changed. Safe to call any number of times for the same change.
    pub async fn on_annotation_set_changed(
        &self,
        image_id: DbId,
    ) -> Result<StatusChange, StoreError> {
        let catalog_size = self.catalog.size().await?;
        let change = self.store.recompute_status(image_id, catalog_size).await?;
        log_status_change(image_id, &change, catalog_size);
        Ok(change)
    }

    /// Recompute every image that is not yet terminal. Returns how many
    /// images changed status.
    pub async fn sweep(&self) -> Result<usize, StoreError> {
        let images = self.store.list_images(None).await?;
        let mut changed = 0;
        for image in images.iter().filter(|i| !i.status.is_terminal()) {
            match self.on_annotation_set_changed(image.id).await {
                Ok(change) if change.changed() => changed += 1,
                Ok(_) => {}
                // Deleted since the listing.
                Err(StoreError::Core(CoreError::NotFound { .. })) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(changed)
    }

    /// Record an out-of-band labeling failure. The image moves to `fail`,
    /// which later recomputations never leave.
    pub async fn mark_failed(&self, image_id: DbId, reason: &str) -> Result<Image, StoreError> {
        let image = self.store.set_status(image_id, ImageStatus::Fail).await?;
        tracing::warn!(image_id, reason, "Image marked as failed");
        Ok(image)
    }

    /// Consume annotation-set changes until cancelled or the bus closes.
    ///
    /// On cancellation, events already buffered in the receiver are still
    /// applied so no finished label addition is left without a status.
    pub async fn run(
        self: Arc<Self>,
        mut receiver: broadcast::Receiver<PipelineEvent>,
        cancel: CancellationToken,
    ) {
        tracing::info!("Image state machine started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.drain(&mut receiver).await;
                    tracing::info!("Image state machine stopping");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(event) => self.handle(&event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "State machine lagged, sweeping open images");
                        self.sweep_logged().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, state machine shutting down");
                        break;
                    }
                },
            }
        }
    }

    async fn drain(&self, receiver: &mut broadcast::Receiver<PipelineEvent>) {
        let mut lagged = false;
        loop {
            match receiver.try_recv() {
                Ok(event) => self.handle(&event).await,
                Err(broadcast::error::TryRecvError::Lagged(_)) => lagged = true,
                Err(_) => break,
            }
        }
        if lagged {
            self.sweep_logged().await;
        }
    }

    async fn sweep_logged(&self) {
        match self.sweep().await {
            Ok(changed) => tracing::info!(changed, "Open-image sweep finished"),
            Err(e) => tracing::error!(error = %e, "Open-image sweep failed"),
        }
    }

    async fn handle(&self, event: &PipelineEvent) {
        let PipelineEvent::AnnotationSetChanged { image_id, .. } = event else {
            return;
        };
        if let Err(e) = self.on_annotation_set_changed(*image_id).await {
            tracing::error!(image_id, error = %e, "Status recomputation failed");
        }
    }
}

pub(crate) fn log_status_change(image_id: DbId, change: &StatusChange, catalog_size: i64) {
    if change.changed() {
        tracing::info!(
            image_id,
            from = %change.previous,
            to = %change.current,
            cardinality = change.cardinality,
            catalog_size,
            "Image status changed",
        );
    } else {
        tracing::debug!(
            image_id,
            status = %change.current,
            cardinality = change.cardinality,
            "Image status unchanged",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pictura_core::labels::AnnotationKind;
    use pictura_db::models::image::CreateImage;
    use pictura_db::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        catalog: AnnotationCatalog,
        machine: ImageStateMachine,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let catalog = AnnotationCatalog::new(store.clone());
        catalog.seed().await.unwrap();
        let machine = ImageStateMachine::new(store.clone(), catalog.clone());
        Fixture {
            store,
            catalog,
            machine,
        }
    }

    async fn new_image(store: &MemoryStore) -> DbId {
        store
            .create_image(&CreateImage {
                image_ref: "images/a.jpg".into(),
                owner_id: 1,
            })
            .await
            .unwrap()
            .id
    }

    async fn add(f: &Fixture, image_id: DbId, kind: AnnotationKind) {
        let label = f.catalog.resolve_kind(kind).await.unwrap();
        f.store.add_image_label(image_id, label.id).await.unwrap();
    }

    #[tokio::test]
    async fn first_label_moves_to_processing() {
        let f = fixture().await;
        let id = new_image(&f.store).await;
        add(&f, id, AnnotationKind::Sea).await;

        let change = f.machine.on_annotation_set_changed(id).await.unwrap();
        assert_eq!(change.previous, ImageStatus::Queued);
        assert_eq!(change.current, ImageStatus::Processing);
    }

    #[tokio::test]
    async fn recomputation_is_idempotent() {
        let f = fixture().await;
        let id = new_image(&f.store).await;
        add(&f, id, AnnotationKind::Car).await;

        let first = f.machine.on_annotation_set_changed(id).await.unwrap();
        let second = f.machine.on_annotation_set_changed(id).await.unwrap();
        assert_eq!(first.current, second.current);
        assert!(!second.changed());
    }

    #[tokio::test]
    async fn intermediate_labels_keep_processing() {
        let f = fixture().await;
        let id = new_image(&f.store).await;
        for kind in &AnnotationKind::ALL[..4] {
            add(&f, id, *kind).await;
            f.machine.on_annotation_set_changed(id).await.unwrap();
        }
        let image = f.store.find_image(id).await.unwrap().unwrap();
        assert_eq!(image.status, ImageStatus::Processing);
    }

    #[tokio::test]
    async fn all_labels_in_any_order_reach_success() {
        let f = fixture().await;
        let id = new_image(&f.store).await;
        for kind in AnnotationKind::ALL.iter().rev() {
            add(&f, id, *kind).await;
            f.machine.on_annotation_set_changed(id).await.unwrap();
        }
        let image = f.store.find_image(id).await.unwrap().unwrap();
        assert_eq!(image.status, ImageStatus::Success);
    }

    #[tokio::test]
    async fn missed_events_still_converge() {
        // Only the final event is observed; recomputation reads the full set.
        let f = fixture().await;
        let id = new_image(&f.store).await;
        for kind in AnnotationKind::ALL {
            add(&f, id, kind).await;
        }
        let change = f.machine.on_annotation_set_changed(id).await.unwrap();
        assert_eq!(change.current, ImageStatus::Success);
    }

    #[tokio::test]
    async fn sweep_repairs_every_open_image() {
        let f = fixture().await;
        let complete = new_image(&f.store).await;
        let partial = new_image(&f.store).await;
        let untouched = new_image(&f.store).await;
        let failed = new_image(&f.store).await;
        for kind in AnnotationKind::ALL {
            add(&f, complete, kind).await;
            add(&f, failed, kind).await;
        }
        add(&f, partial, AnnotationKind::Sea).await;
        f.machine.mark_failed(failed, "rejected").await.unwrap();

        assert_eq!(f.machine.sweep().await.unwrap(), 2);

        for (id, expected) in [
            (complete, ImageStatus::Success),
            (partial, ImageStatus::Processing),
            (untouched, ImageStatus::Queued),
            (failed, ImageStatus::Fail),
        ] {
            let image = f.store.find_image(id).await.unwrap().unwrap();
            assert_eq!(image.status, expected);
        }
    }

    #[tokio::test]
    async fn lagged_receiver_still_settles_every_image() {
        let f = fixture().await;
        let bus = pictura_events::EventBus::new(4);
        let rx = bus.subscribe();

        let mut ids = Vec::new();
        for _ in 0..6 {
            let id = new_image(&f.store).await;
            for kind in AnnotationKind::ALL {
                let label = f.catalog.resolve_kind(kind).await.unwrap();
                f.store.add_image_label(id, label.id).await.unwrap();
                bus.publish(PipelineEvent::annotation_set_changed(id, label.id, true, 0));
            }
            ids.push(id);
        }

        let machine = Arc::new(f.machine);
        let cancel = CancellationToken::new();
        cancel.cancel();
        Arc::clone(&machine).run(rx, cancel).await;

        for id in ids {
            let image = f.store.find_image(id).await.unwrap().unwrap();
            assert_eq!(image.status, ImageStatus::Success);
        }
    }

    #[tokio::test]
    async fn unknown_image_is_not_found() {
        let f = fixture().await;
        assert_matches!(
            f.machine.on_annotation_set_changed(404).await,
            Err(StoreError::Core(CoreError::NotFound { entity: "Image", id: 404 }))
        );
    }

    #[tokio::test]
    async fn failed_image_stays_failed() {
        let f = fixture().await;
        let id = new_image(&f.store).await;
        f.machine.mark_failed(id, "upstream labeler unavailable").await.unwrap();

        add(&f, id, AnnotationKind::Flower).await;
        let change = f.machine.on_annotation_set_changed(id).await.unwrap();
        assert_eq!(change.current, ImageStatus::Fail);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_recomputations_agree() {
        let f = fixture().await;
        let id = new_image(&f.store).await;
        for kind in AnnotationKind::ALL {
            add(&f, id, kind).await;
        }

        let machine = Arc::new(f.machine);
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let machine = Arc::clone(&machine);
                tokio::spawn(async move { machine.on_annotation_set_changed(id).await.unwrap() })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().current, ImageStatus::Success);
        }
    }
}
