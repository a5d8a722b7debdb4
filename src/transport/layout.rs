//! Shared-memory layout of the frame ring buffer.
//!
//! ```text
//! offset 0                    : RingHeader (64 bytes, little-endian u32 fields)
//! offset 64 + i * slot_size   : slot i = u32 LE payload length, then payload bytes
//! ```
//!
//! The reader lives in another process and only ever looks at these bytes, so the
//! layout is a fixed `#[repr(C)]` record with a compile-time size check.

use bytemuck::{Pod, Zeroable};

use crate::error::{RingBufferError, Result};

/// Size of [`RingHeader`] in bytes
pub const HEADER_SIZE: usize = 64;

/// Size of the payload length prefix at the start of each slot
pub const LENGTH_PREFIX_SIZE: usize = 4;

pub const DEFAULT_SLOT_COUNT: u32 = 4;

pub const DEFAULT_SLOT_SIZE: u32 = 4 * 1024 * 1024;

/// Ring buffer header as stored at offset 0.
///
/// Fields are kept in host order in memory; [`RingHeader::to_bytes`] and
/// [`RingHeader::from_bytes`] convert to and from the little-endian file format.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct RingHeader {
    /// Number of frames written so far; the next write goes to `write_index % slot_count`
    pub write_index: u32,
    /// Total frames written
    pub frame_count: u32,
    pub slot_size: u32,
    pub slot_count: u32,
    /// Dimensions of the most recently written frame
    pub width: u32,
    pub height: u32,
    pub reserved: [u32; 10],
}

const _: () = assert!(core::mem::size_of::<RingHeader>() == HEADER_SIZE);

impl RingHeader {
    /// Fresh header for the given geometry with all counters zeroed
    pub fn new(slot_count: u32, slot_size: u32) -> Self {
        Self {
            slot_size,
            slot_count,
            ..Self::zeroed()
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        bytemuck::cast(self.swap_le())
    }

    /// Read a header from the first [`HEADER_SIZE`] bytes of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let raw = bytes.get(..HEADER_SIZE)?;
        Some(bytemuck::pod_read_unaligned::<RingHeader>(raw).swap_le())
    }

    /// Slot that the most recent write went to, `None` before the first write
    pub fn latest_slot(&self) -> Option<u32> {
        if self.write_index == 0 || self.slot_count == 0 {
            return None;
        }
        Some((self.write_index - 1) % self.slot_count)
    }

    /// Byte offset of slot `index` from the start of the mapping
    pub fn slot_offset(&self, index: u32) -> usize {
        HEADER_SIZE + index as usize * self.slot_size as usize
    }

    /// Total mapping size implied by this header's geometry
    pub fn total_size(&self) -> usize {
        total_size(self.slot_count, self.slot_size)
    }

    // to_le and from_le are the same byte swap (a no-op on little-endian hosts)
    fn swap_le(mut self) -> Self {
        self.write_index = self.write_index.to_le();
        self.frame_count = self.frame_count.to_le();
        self.slot_size = self.slot_size.to_le();
        self.slot_count = self.slot_count.to_le();
        self.width = self.width.to_le();
        self.height = self.height.to_le();
        for word in &mut self.reserved {
            *word = word.to_le();
        }
        self
    }
}

/// `HEADER_SIZE + slot_count * slot_size`
pub fn total_size(slot_count: u32, slot_size: u32) -> usize {
    HEADER_SIZE + slot_count as usize * slot_size as usize
}

/// A usable ring has at least one slot, and each slot fits a length prefix plus payload
pub fn validate_geometry(slot_count: u32, slot_size: u32) -> Result<()> {
    if slot_count == 0 {
        return Err(RingBufferError::InvalidGeometry {
            details: "slot_count must be at least 1".to_string(),
        }
        .into());
    }
    if (slot_size as usize) <= LENGTH_PREFIX_SIZE {
        return Err(RingBufferError::InvalidGeometry {
            details: format!("slot_size must exceed {} bytes", LENGTH_PREFIX_SIZE),
        }
        .into());
    }
    Ok(())
}
