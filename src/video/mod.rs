//! # Video Module
//!
//! Frame and mask types, the JPEG frame encoder, and the reader/writer contracts the
//! export job drives.

pub mod encoder;
pub mod ffmpeg;
pub mod io;
pub mod types;

pub use ffmpeg::FfmpegBackend;
pub use io::{MediaBackend, VideoReader, VideoWriter};
pub use types::{Frame, Mask};
