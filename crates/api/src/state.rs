use std::sync::Arc;

use pictura_db::AnnotationStore;
use pictura_events::EventBus;
use pictura_pipeline::{AnnotationCatalog, CommentAggregator, ImageStateMachine};

use crate::config::ServerConfig;
use crate::storage::ImageStorage;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: every field is an `Arc` or a handle around one.
#[derive(Clone)]
pub struct AppState {
    /// Label, image, and comment persistence.
    pub store: Arc<dyn AnnotationStore>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Where uploaded payloads are written.
    pub storage: Arc<dyn ImageStorage>,
    /// Bus the pipeline consumes; handlers publish image-created events here.
    pub event_bus: Arc<EventBus>,
    pub catalog: AnnotationCatalog,
    pub state_machine: Arc<ImageStateMachine>,
    pub aggregator: CommentAggregator,
}
