//! Assignment worker: attaches randomly chosen labels to new images.
//!
//! Every [`PipelineEvent::ImageCreated`] starts one labeling run on its own
//! task. A run repeatedly waits a random delay, picks a label uniformly from
//! the catalog, attaches it, and publishes
//! [`PipelineEvent::AnnotationSetChanged`]. It stops once the image carries
//! every catalog label, after `max_rounds` additions, or on cancellation.
//!
//! Each addition recomputes the image's status in the same store critical
//! section, so the published event is a notification rather than the only
//! path to a correct status. If the worker's receiver lags, queued images
//! are swept from the store so a dropped image-created event never leaves an
//! image unlabeled.

use std::collections::HashSet;
use std::sync::Arc;

use pictura_core::assignment::DelayRange;
use pictura_core::labels::AnnotationKind;
use pictura_core::status::ImageStatus;
use pictura_core::types::DbId;
use pictura_db::{AnnotationStore, StoreError};
use pictura_events::{EventBus, PipelineEvent};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::catalog::AnnotationCatalog;
use crate::config::PipelineConfig;
use crate::state_machine::log_status_change;

/// How a labeling run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOutcome {
    /// The annotation set reached the catalog size.
    Completed { rounds: u32 },
    /// `max_rounds` additions were made without covering the catalog.
    Exhausted { rounds: u32 },
    /// Shutdown interrupted the run between rounds.
    Cancelled { rounds: u32 },
}

impl AssignmentOutcome {
    pub fn rounds(&self) -> u32 {
        match self {
            Self::Completed { rounds }
            | Self::Exhausted { rounds }
            | Self::Cancelled { rounds } => *rounds,
        }
    }
}

pub struct AssignmentWorker {
    store: Arc<dyn AnnotationStore>,
    catalog: AnnotationCatalog,
    bus: Arc<EventBus>,
    delay: DelayRange,
    max_rounds: u32,
    rng_seed: Option<u64>,
    /// Images with a labeling run in flight.
    active: Mutex<HashSet<DbId>>,
}

impl AssignmentWorker {
    pub fn new(
        store: Arc<dyn AnnotationStore>,
        catalog: AnnotationCatalog,
        bus: Arc<EventBus>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            bus,
            delay: config.delay,
            max_rounds: config.max_rounds,
            rng_seed: config.rng_seed,
            active: Mutex::new(HashSet::new()),
        }
    }

    /// Run one labeling pass over `image_id`.
    ///
    /// Adds of a label the image already has still count as a round and still
    /// publish an event. Label resolution or store failures end the run with
    /// an error; no retry is attempted.
    pub async fn annotate(
        &self,
        image_id: DbId,
        cancel: &CancellationToken,
    ) -> Result<AssignmentOutcome, StoreError> {
        if self.store.find_image(image_id).await?.is_none() {
            return Err(StoreError::not_found("Image", image_id));
        }

        let catalog_size = self.catalog.size().await?;
        let mut rng = self.rng_for(image_id);
        let mut rounds = 0;

        while rounds < self.max_rounds {
            let delay = self.delay.sample(&mut rng);
            tokio::select! {
                _ = cancel.cancelled() => return Ok(AssignmentOutcome::Cancelled { rounds }),
                _ = tokio::time::sleep(delay) => {}
            }

            let kind = AnnotationKind::random(&mut rng);
            let label = self.catalog.resolve(kind.as_str()).await?;
            let update = self
                .store
                .attach_label_and_recompute(image_id, label.id, catalog_size)
                .await?;
            let attachment = update.attachment;
            rounds += 1;

            tracing::debug!(
                image_id,
                label = %kind,
                inserted = attachment.inserted,
                cardinality = attachment.cardinality,
                "Label attached",
            );
            log_status_change(image_id, &update.change, catalog_size);
            self.bus.publish(PipelineEvent::annotation_set_changed(
                image_id,
                label.id,
                attachment.inserted,
                attachment.cardinality,
            ));

            if attachment.cardinality >= catalog_size {
                return Ok(AssignmentOutcome::Completed { rounds });
            }
        }

        Ok(AssignmentOutcome::Exhausted { rounds })
    }

    /// Spawn a labeling run for every image-created event until cancelled.
    ///
    /// Runs are spawned on `tracker` so shutdown can wait for in-flight
    /// label additions to finish.
    pub async fn run(
        self: Arc<Self>,
        mut receiver: broadcast::Receiver<PipelineEvent>,
        cancel: CancellationToken,
        tracker: TaskTracker,
    ) {
        tracing::info!(
            min_delay_ms = self.delay.min_ms(),
            max_delay_ms = self.delay.max_ms(),
            max_rounds = self.max_rounds,
            "Assignment worker started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Assignment worker stopping");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(PipelineEvent::ImageCreated { image_id, .. }) => {
                        self.spawn_run(image_id, &cancel, &tracker).await;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            skipped = n,
                            "Assignment worker lagged, sweeping queued images"
                        );
                        self.sweep_queued(&cancel, &tracker).await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, assignment worker shutting down");
                        break;
                    }
                },
            }
        }
    }

    /// Start a labeling run unless one is already in flight for the image.
    async fn spawn_run(
        self: &Arc<Self>,
        image_id: DbId,
        cancel: &CancellationToken,
        tracker: &TaskTracker,
    ) -> bool {
        if !self.active.lock().await.insert(image_id) {
            tracing::debug!(image_id, "Labeling run already in flight");
            return false;
        }
        let worker = Arc::clone(self);
        let cancel = cancel.clone();
        tracker.spawn(async move {
            worker.process(image_id, cancel).await;
            worker.active.lock().await.remove(&image_id);
        });
        true
    }

    /// Start runs for every image still `queued`. A queued image has an
    /// empty annotation set, so these are exactly the images whose
    /// image-created event may have been dropped.
    async fn sweep_queued(self: &Arc<Self>, cancel: &CancellationToken, tracker: &TaskTracker) {
        let images = match self.store.list_images(None).await {
            Ok(images) => images,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list images for sweep");
                return;
            }
        };

        let mut started = 0;
        for image in images.iter().filter(|i| i.status == ImageStatus::Queued) {
            if self.spawn_run(image.id, cancel, tracker).await {
                started += 1;
            }
        }
        tracing::info!(started, "Queued-image sweep finished");
    }

    async fn process(&self, image_id: DbId, cancel: CancellationToken) {
        match self.annotate(image_id, &cancel).await {
            Ok(AssignmentOutcome::Completed { rounds }) => {
                tracing::info!(image_id, rounds, "Annotation set complete");
            }
            Ok(AssignmentOutcome::Exhausted { rounds }) => {
                tracing::warn!(image_id, rounds, "Labeling stopped before covering the catalog");
            }
            Ok(AssignmentOutcome::Cancelled { rounds }) => {
                tracing::info!(image_id, rounds, "Labeling cancelled");
            }
            Err(e) => {
                tracing::error!(image_id, error = %e, "Labeling run abandoned");
            }
        }
    }

    fn rng_for(&self, image_id: DbId) -> StdRng {
        match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ image_id as u64),
            None => StdRng::from_rng(&mut rand::rng()),
        }
    }
}
