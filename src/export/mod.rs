//! # Background Export
//!
//! Renders a whole video through the effect pipeline on a worker thread, with progress
//! polling and cooperative, per-frame cancellation.

pub mod job;
pub mod manager;

pub use job::{CancellationToken, ExportJob, ExportSnapshot, ExportStatus};
pub use manager::{ExportManager, ExportRequest, PANIC_CATEGORY};
