//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the central publish/subscribe hub for [`PipelineEvent`]s.
//! It is designed to be shared via `Arc<EventBus>` across the application.

use chrono::Utc;
use pictura_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// PipelineEvent
// ---------------------------------------------------------------------------

/// Something that happened to an image that a background handler reacts to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// An image was uploaded (or an operator asked for it to be re-annotated).
    ImageCreated {
        image_id: DbId,
        owner_id: DbId,
        occurred_at: Timestamp,
    },

    /// A label was added to an image's annotation set.
    ///
    /// Published for every add, including adds of a label the image already
    /// had (`inserted == false`).
    AnnotationSetChanged {
        image_id: DbId,
        label_id: DbId,
        inserted: bool,
        cardinality: i64,
        occurred_at: Timestamp,
    },
}

impl PipelineEvent {
    pub fn image_created(image_id: DbId, owner_id: DbId) -> Self {
        Self::ImageCreated {
            image_id,
            owner_id,
            occurred_at: Utc::now(),
        }
    }

    pub fn annotation_set_changed(
        image_id: DbId,
        label_id: DbId,
        inserted: bool,
        cardinality: i64,
    ) -> Self {
        Self::AnnotationSetChanged {
            image_id,
            label_id,
            inserted,
            cardinality,
            occurred_at: Utc::now(),
        }
    }

    /// Dot-separated event name for logs, e.g. `"image.created"`.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ImageCreated { .. } => "image.created",
            Self::AnnotationSetChanged { .. } => "annotation_set.changed",
        }
    }

    /// The image the event is about.
    pub fn image_id(&self) -> DbId {
        match self {
            Self::ImageCreated { image_id, .. } | Self::AnnotationSetChanged { image_id, .. } => {
                *image_id
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
pub const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`PipelineEvent`].
///
/// # Usage
///
/// ```rust
/// use pictura_events::bus::{EventBus, PipelineEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(PipelineEvent::image_created(1, 7));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is dropped.
    pub fn publish(&self, event: PipelineEvent) {
        if self.sender.send(event).is_err() {
            tracing::debug!("Event published with no subscribers");
        }
    }

    /// Subscribe to all events published on this bus from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
