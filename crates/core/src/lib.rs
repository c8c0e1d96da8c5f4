//! Pictura domain core.
//!
//! Pure types and rules shared by the store, pipeline, and API crates. This
//! crate has no internal dependencies and performs no I/O.

pub mod assignment;
pub mod comments;
pub mod error;
pub mod labels;
pub mod sentiment;
pub mod status;
pub mod types;
