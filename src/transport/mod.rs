//! # Frame Transport
//!
//! A memory-mapped ring of JPEG frames shared with a preview process. See
//! [`layout`] for the byte format.

pub mod layout;
pub mod reader;
pub mod writer;

use std::path::PathBuf;

pub use layout::{RingHeader, DEFAULT_SLOT_COUNT, DEFAULT_SLOT_SIZE, HEADER_SIZE};
pub use reader::RingBufferReader;
pub use writer::RingBufferWriter;

/// Environment variable that overrides the ring buffer location
pub const SHM_PATH_ENV: &str = "GLITCHFRAME_SHM_PATH";

/// Ring buffer path when none is configured: `$GLITCHFRAME_SHM_PATH`, then
/// `$HOME/.cache/glitchframe/frames`, then a file in the system temp directory
pub fn default_shm_path() -> PathBuf {
    if let Some(path) = std::env::var_os(SHM_PATH_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    match std::env::var_os("HOME").filter(|h| !h.is_empty()) {
        Some(home) => PathBuf::from(home).join(".cache").join("glitchframe").join("frames"),
        None => std::env::temp_dir().join("glitchframe-frames"),
    }
}
