use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::{
    error::{RingBufferError, Result},
    transport::layout::{RingHeader, HEADER_SIZE, LENGTH_PREFIX_SIZE},
    video::{encoder, types::Frame},
};

/// Consumer side of the frame ring buffer
///
/// The header is re-read on every call since the writer may be in another process.
pub struct RingBufferReader {
    mmap: Mmap,
}

impl RingBufferReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;

        // SAFETY: the mapping is only read. The writer never shrinks the file while it
        // is running; a recreated file is picked up by reopening.
        let mmap = unsafe { Mmap::map(&file)? };

        let reader = Self { mmap };
        let header = reader.header()?;
        if header.slot_count == 0 || reader.mmap.len() < header.total_size() {
            return Err(RingBufferError::Corrupt {
                details: format!(
                    "mapping is {} bytes, header describes {} slots of {} bytes",
                    reader.mmap.len(),
                    header.slot_count,
                    header.slot_size
                ),
            }
            .into());
        }
        Ok(reader)
    }

    pub fn header(&self) -> Result<RingHeader> {
        RingHeader::from_bytes(&self.mmap).ok_or_else(|| {
            RingBufferError::Corrupt {
                details: format!("file shorter than the {}-byte header", HEADER_SIZE),
            }
            .into()
        })
    }

    /// Payload bytes stored in slot `index`
    pub fn read_slot(&self, index: u32) -> Result<Vec<u8>> {
        let header = self.header()?;
        if index >= header.slot_count {
            return Err(RingBufferError::Corrupt {
                details: format!("slot {} out of range ({} slots)", index, header.slot_count),
            }
            .into());
        }

        let offset = header.slot_offset(index);
        let data_start = offset + LENGTH_PREFIX_SIZE;
        let prefix = self
            .mmap
            .get(offset..data_start)
            .ok_or_else(|| RingBufferError::Corrupt {
                details: format!("slot {} lies outside the mapping", index),
            })?;

        let mut len = [0u8; LENGTH_PREFIX_SIZE];
        len.copy_from_slice(prefix);
        let len = u32::from_le_bytes(len) as usize;
        if len + LENGTH_PREFIX_SIZE > header.slot_size as usize {
            return Err(RingBufferError::Corrupt {
                details: format!("slot {} length {} exceeds slot size {}", index, len, header.slot_size),
            }
            .into());
        }

        self.mmap
            .get(data_start..data_start + len)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                RingBufferError::Corrupt {
                    details: format!("slot {} payload lies outside the mapping", index),
                }
                .into()
            })
    }

    /// Payload of the most recently written frame, `None` before the first write
    pub fn read_latest_frame(&self) -> Result<Option<Vec<u8>>> {
        match self.header()?.latest_slot() {
            Some(slot) => self.read_slot(slot).map(Some),
            None => Ok(None),
        }
    }

    /// Decode the most recently written frame
    pub fn read_latest_decoded(&self) -> Result<Option<Frame>> {
        self.read_latest_frame()?
            .map(|bytes| encoder::decode(&bytes))
            .transpose()
    }
}
