//! Video reader/writer contracts consumed by the export job.
//!
//! The core never decodes containers itself; a [`MediaBackend`] opens readers and
//! writers for it. [`FfmpegBackend`](crate::video::ffmpeg::FfmpegBackend) is the
//! production implementation.

use std::path::Path;

use crate::{error::Result, video::types::Frame};

/// Sequential or random-access source of decoded RGBA frames
pub trait VideoReader: Send {
    /// Total number of frames the export will iterate
    fn frame_count(&self) -> u64;

    /// `(width, height)` of decoded frames
    fn resolution(&self) -> (u32, u32);

    /// Frames per second, used to configure the matching writer
    fn fps(&self) -> f64;

    /// Decode frame `index` (0-based)
    fn decode_frame(&mut self, index: u64) -> Result<Frame>;

    /// Release decoder resources. Called exactly once, on every exit path.
    fn close(&mut self) -> Result<()>;
}

/// Sink for processed frames
pub trait VideoWriter: Send {
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Flush and finalize the output file. Called exactly once, on every exit path.
    fn close(&mut self) -> Result<()>;
}

/// Opens readers and writers for the export job
pub trait MediaBackend: Send + Sync {
    fn open_reader(&self, path: &Path) -> Result<Box<dyn VideoReader>>;

    fn open_writer(&self, path: &Path, resolution: (u32, u32), fps: f64) -> Result<Box<dyn VideoWriter>>;
}
