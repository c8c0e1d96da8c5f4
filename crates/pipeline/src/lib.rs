//! Background annotation pipeline.
//!
//! Two long-lived consumers share one [`EventBus`]:
//!
//! - [`AssignmentWorker`] turns each image-created event into a labeling run
//!   that attaches random catalog labels.
//! - [`ImageStateMachine`] recomputes the image's status after every
//!   annotation-set change.
//!
//! [`CommentAggregator`] is request-driven and only lives here because it
//! shares the store and analyzer handles. [`Pipeline`] wires the pieces
//! together and owns their shutdown.

use std::sync::Arc;
use std::time::Duration;

use pictura_core::sentiment::SentimentAnalyzer;
use pictura_db::{AnnotationStore, StoreError};
use pictura_events::EventBus;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub mod aggregator;
pub mod assignment;
pub mod catalog;
pub mod config;
pub mod state_machine;

pub use aggregator::CommentAggregator;
pub use assignment::{AssignmentOutcome, AssignmentWorker};
pub use catalog::AnnotationCatalog;
pub use config::{ConfigError, PipelineConfig};
pub use state_machine::ImageStateMachine;

/// Running pipeline: the assignment worker and the state machine, each on
/// its own task.
pub struct Pipeline {
    bus: Arc<EventBus>,
    catalog: AnnotationCatalog,
    state_machine: Arc<ImageStateMachine>,
    aggregator: CommentAggregator,
    worker_cancel: CancellationToken,
    machine_cancel: CancellationToken,
    tracker: TaskTracker,
    worker_handle: JoinHandle<()>,
    machine_handle: JoinHandle<()>,
}

impl Pipeline {
    /// Seed the label catalog and start both consumers.
    ///
    /// Both receivers are subscribed before anything is spawned, so an event
    /// published as soon as this returns is seen by both.
    pub async fn start(
        store: Arc<dyn AnnotationStore>,
        bus: Arc<EventBus>,
        analyzer: Arc<dyn SentimentAnalyzer>,
        config: &PipelineConfig,
    ) -> Result<Self, StoreError> {
        let catalog = AnnotationCatalog::new(Arc::clone(&store));
        let catalog_size = catalog.seed().await?;
        tracing::info!(catalog_size, "Annotation catalog seeded");

        let worker = Arc::new(AssignmentWorker::new(
            Arc::clone(&store),
            catalog.clone(),
            Arc::clone(&bus),
            config,
        ));
        let state_machine = Arc::new(ImageStateMachine::new(Arc::clone(&store), catalog.clone()));
        let aggregator = CommentAggregator::new(store, analyzer);

        let worker_rx = bus.subscribe();
        let machine_rx = bus.subscribe();

        let worker_cancel = CancellationToken::new();
        let machine_cancel = CancellationToken::new();
        let tracker = TaskTracker::new();

        let worker_handle = tokio::spawn(worker.run(
            worker_rx,
            worker_cancel.clone(),
            tracker.clone(),
        ));
        let machine_handle = tokio::spawn(
            Arc::clone(&state_machine).run(machine_rx, machine_cancel.clone()),
        );

        Ok(Self {
            bus,
            catalog,
            state_machine,
            aggregator,
            worker_cancel,
            machine_cancel,
            tracker,
            worker_handle,
            machine_handle,
        })
    }

    pub fn bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    pub fn catalog(&self) -> AnnotationCatalog {
        self.catalog.clone()
    }

    pub fn state_machine(&self) -> Arc<ImageStateMachine> {
        Arc::clone(&self.state_machine)
    }

    pub fn aggregator(&self) -> CommentAggregator {
        self.aggregator.clone()
    }

    /// Stop accepting new work and wait up to `timeout` for the pipeline to
    /// settle.
    ///
    /// The worker stops first and its labeling runs finish their current
    /// round; the state machine is stopped only afterwards so it can apply
    /// the last annotation changes. Returns `false` if the timeout elapsed.
    pub async fn shutdown(self, timeout: Duration) -> bool {
        self.worker_cancel.cancel();
        self.tracker.close();

        let machine_cancel = self.machine_cancel.clone();
        let tracker = self.tracker;
        let worker_handle = self.worker_handle;
        let machine_handle = self.machine_handle;

        let settled = tokio::time::timeout(timeout, async move {
            let _ = worker_handle.await;
            tracker.wait().await;
            machine_cancel.cancel();
            let _ = machine_handle.await;
        })
        .await
        .is_ok();

        if settled {
            tracing::info!("Pipeline stopped");
        } else {
            self.machine_cancel.cancel();
            tracing::warn!(
                timeout_secs = timeout.as_secs(),
                "Pipeline did not stop within the shutdown timeout"
            );
        }
        settled
    }
}
