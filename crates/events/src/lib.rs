//! Pictura pipeline events.
//!
//! - [`PipelineEvent`]: typed events that drive annotation. Image creation
//!   feeds the assignment worker; annotation-set changes feed the state
//!   machine.
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.

pub mod bus;

pub use bus::{EventBus, PipelineEvent, DEFAULT_CAPACITY};
