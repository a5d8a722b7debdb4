use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::MmapMut;
use tracing::{debug, info};

use crate::{
    error::{RingBufferError, Result},
    transport::layout::{total_size, validate_geometry, RingHeader, HEADER_SIZE, LENGTH_PREFIX_SIZE},
    video::{encoder, types::Frame},
};

/// Single-writer producer side of the frame ring buffer
///
/// Each write encodes the frame, copies it into the next slot and then rewrites the header.
/// Readers in other processes are not synchronized with; a reader that falls more than
/// `slot_count` frames behind sees overwritten slots.
pub struct RingBufferWriter {
    path: PathBuf,
    mmap: MmapMut,
    header: RingHeader,
}

impl RingBufferWriter {
    /// Create (or truncate and recreate) the backing file and map it
    pub fn create<P: AsRef<Path>>(path: P, slot_count: u32, slot_size: u32) -> Result<Self> {
        let path = path.as_ref();
        validate_geometry(slot_count, slot_size)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let size = total_size(slot_count, slot_size);
        file.set_len(size as u64)?;

        // SAFETY: the file was just created with the full mapping length. Other
        // processes may read it concurrently but only this writer mutates it.
        let mut mmap = unsafe { MmapMut::map_mut(&file)? };

        let header = RingHeader::new(slot_count, slot_size);
        mmap[..HEADER_SIZE].copy_from_slice(&header.to_bytes());

        info!(
            "Created frame ring buffer at {} ({} slots x {} bytes)",
            path.display(),
            slot_count,
            slot_size
        );

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            header,
        })
    }

    /// Encode `frame` at a fixed `quality` and write it to the next slot
    ///
    /// Returns the slot index used.
    pub fn write_frame(&mut self, frame: &Frame, quality: u8) -> Result<u32> {
        let bytes = encoder::encode(frame, quality)?;
        self.write_encoded(&bytes, frame.dimensions())
    }

    /// Write an already-encoded payload for a frame of the given dimensions
    pub fn write_encoded(&mut self, payload: &[u8], dimensions: (u32, u32)) -> Result<u32> {
        let slot_size = self.header.slot_size;
        if payload.len() + LENGTH_PREFIX_SIZE > slot_size as usize {
            return Err(RingBufferError::FrameTooLarge {
                size: payload.len(),
                slot_size,
            }
            .into());
        }

        let slot = self.header.write_index % self.header.slot_count;
        let offset = self.header.slot_offset(slot);
        let data_start = offset + LENGTH_PREFIX_SIZE;

        self.mmap[offset..data_start].copy_from_slice(&(payload.len() as u32).to_le_bytes());
        self.mmap[data_start..data_start + payload.len()].copy_from_slice(payload);

        self.header.write_index = self.header.write_index.wrapping_add(1);
        self.header.frame_count = self.header.frame_count.wrapping_add(1);
        self.header.width = dimensions.0;
        self.header.height = dimensions.1;
        self.mmap[..HEADER_SIZE].copy_from_slice(&self.header.to_bytes());

        debug!(slot, size = payload.len(), write_index = self.header.write_index, "frame written to ring buffer");
        Ok(slot)
    }

    /// Current header, as last written
    pub fn header(&self) -> RingHeader {
        self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush the mapping to the backing file
    pub fn flush(&self) -> Result<()> {
        self.mmap.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GlitchError;
    use tempfile::tempdir;

    fn slot_payload(bytes: &[u8], header: &RingHeader, slot: u32) -> Vec<u8> {
        let offset = header.slot_offset(slot);
        let mut len = [0u8; 4];
        len.copy_from_slice(&bytes[offset..offset + 4]);
        let len = u32::from_le_bytes(len) as usize;
        bytes[offset + 4..offset + 4 + len].to_vec()
    }

    #[test]
    fn test_create_sizes_file_and_writes_geometry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("frames");
        let writer = RingBufferWriter::create(&path, 3, 8192).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + 3 * 8192);

        let header = RingHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header, RingHeader::new(3, 8192));
        assert_eq!(writer.header(), header);
    }

    #[test]
    fn test_writes_advance_header_and_fill_slots() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frames");
        let mut writer = RingBufferWriter::create(&path, 4, 64 * 1024).unwrap();

        for i in 0..3u8 {
            let slot = writer.write_frame(&Frame::new_filled(32, 16, [i * 40, 80, 120, 255]), 90).unwrap();
            assert_eq!(slot, u32::from(i));
        }
        writer.flush().unwrap();

        let bytes = fs::read(&path).unwrap();
        let header = RingHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header.write_index, 3);
        assert_eq!(header.frame_count, 3);
        assert_eq!((header.width, header.height), (32, 16));

        for slot in 0..3 {
            let payload = slot_payload(&bytes, &header, slot);
            assert_eq!(&payload[..2], &[0xFF, 0xD8]);
            assert_eq!(&payload[payload.len() - 2..], &[0xFF, 0xD9]);
        }
    }

    #[test]
    fn test_writes_wrap_around() {
        let dir = tempdir().unwrap();
        let mut writer = RingBufferWriter::create(dir.path().join("frames"), 2, 64 * 1024).unwrap();
        let frame = Frame::new_filled(8, 8, [1, 2, 3, 255]);

        let slots: Vec<u32> = (0..5).map(|_| writer.write_frame(&frame, 80).unwrap()).collect();
        assert_eq!(slots, vec![0, 1, 0, 1, 0]);
        assert_eq!(writer.header().write_index, 5);
    }

    #[test]
    fn test_oversized_frame_is_rejected() {
        let dir = tempdir().unwrap();
        let mut writer = RingBufferWriter::create(dir.path().join("frames"), 2, 64).unwrap();

        let err = writer.write_frame(&Frame::new_filled(64, 64, [9, 9, 9, 255]), 95).unwrap_err();
        assert!(matches!(err, GlitchError::RingBuffer(RingBufferError::FrameTooLarge { slot_size: 64, .. })));
        assert_eq!(writer.header().write_index, 0);
    }

    #[test]
    fn test_payload_exactly_filling_slot_is_accepted() {
        let dir = tempdir().unwrap();
        let mut writer = RingBufferWriter::create(dir.path().join("frames"), 1, 16).unwrap();

        assert_eq!(writer.write_encoded(&[7u8; 12], (1, 1)).unwrap(), 0);
        assert!(writer.write_encoded(&[7u8; 13], (1, 1)).is_err());
    }

    #[test]
    fn test_recreate_truncates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frames");
        {
            let mut writer = RingBufferWriter::create(&path, 2, 64 * 1024).unwrap();
            writer.write_frame(&Frame::new_filled(4, 4, [0, 0, 0, 255]), 90).unwrap();
        }

        let writer = RingBufferWriter::create(&path, 1, 1024).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len() as usize, HEADER_SIZE + 1024);
        assert_eq!(writer.header().write_index, 0);
    }

    #[test]
    fn test_invalid_geometry_is_rejected() {
        let dir = tempdir().unwrap();
        assert!(RingBufferWriter::create(dir.path().join("a"), 0, 1024).is_err());
        assert!(RingBufferWriter::create(dir.path().join("b"), 2, 4).is_err());
    }
}
