//! # Frame Encoder
//!
//! JPEG compression for preview transport. The codec has no alpha channel, so alpha is
//! dropped on encode and comes back fully opaque on decode.

use image::{codecs::jpeg::JpegEncoder, ColorType, ImageFormat};
use tracing::debug;

use crate::{
    error::{EncodeError, Result},
    video::types::Frame,
};

/// Qualities tried by [`encode_fit`] when the caller does not supply a ladder
pub const DEFAULT_QUALITY_LADDER: [u8; 5] = [95, 85, 75, 65, 50];

/// Default quality for single-shot encodes
pub const DEFAULT_QUALITY: u8 = 95;

/// Encode `frame` as a baseline JPEG at `quality` (1-100)
pub fn encode(frame: &Frame, quality: u8) -> Result<Vec<u8>> {
    if !(1..=100).contains(&quality) {
        return Err(EncodeError::InvalidQuality { quality }.into());
    }

    let rgb: Vec<u8> = frame
        .pixels()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode(&rgb, frame.width(), frame.height(), ColorType::Rgb8)
        .map_err(|e| EncodeError::Codec { reason: e.to_string() })?;

    Ok(buffer)
}

/// Encode at the highest ladder quality whose output fits in `max_bytes`.
///
/// The ladder is tried from highest to lowest quality regardless of the order given.
/// Returns the bytes and the quality that produced them.
pub fn encode_fit(frame: &Frame, max_bytes: usize, ladder: &[u8]) -> Result<(Vec<u8>, u8)> {
    let mut qualities = ladder.to_vec();
    qualities.sort_unstable_by(|a, b| b.cmp(a));
    qualities.dedup();

    let mut smallest: Option<(usize, u8)> = None;
    for quality in qualities {
        let bytes = encode(frame, quality)?;
        if bytes.len() <= max_bytes {
            debug!(quality, size = bytes.len(), max_bytes, "frame encoded");
            return Ok((bytes, quality));
        }
        if smallest.map_or(true, |(size, _)| bytes.len() < size) {
            smallest = Some((bytes.len(), quality));
        }
    }

    match smallest {
        Some((size, quality)) => Err(EncodeError::Overflow {
            smallest: size,
            quality,
            max_bytes,
        }
        .into()),
        None => Err(EncodeError::EmptyLadder.into()),
    }
}

/// Decode JPEG bytes back into an opaque RGBA frame
pub fn decode(bytes: &[u8]) -> Result<Frame> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
        .map_err(|e| EncodeError::Codec { reason: e.to_string() })?;
    Ok(Frame::new(image.to_rgba8()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::determinism::make_rng;
    use crate::error::GlitchError;
    use rand::Rng;

    fn noisy_frame(width: u32, height: u32) -> Frame {
        let mut rng = make_rng(99);
        let data = (0..width * height * 4).map(|_| rng.gen::<u8>()).collect();
        Frame::from_rgba_bytes(width, height, data).unwrap()
    }

    #[test]
    fn test_encode_produces_jpeg_markers() {
        let frame = Frame::new_filled(16, 8, [200, 40, 90, 10]);
        let bytes = encode(&frame, DEFAULT_QUALITY).unwrap();

        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_decode_restores_size_and_opaque_alpha() {
        let frame = Frame::new_filled(16, 8, [200, 40, 90, 10]);
        let decoded = decode(&encode(&frame, 90).unwrap()).unwrap();

        assert_eq!(decoded.dimensions(), (16, 8));
        assert!(decoded.pixels().chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn test_invalid_quality_is_rejected() {
        let frame = Frame::new_filled(2, 2, [0, 0, 0, 255]);
        assert!(matches!(
            encode(&frame, 0),
            Err(GlitchError::Encode(EncodeError::InvalidQuality { quality: 0 }))
        ));
        assert!(encode(&frame, 101).is_err());
    }

    #[test]
    fn test_encode_fit_falls_back_to_lower_quality() {
        let frame = noisy_frame(64, 64);
        let top = encode(&frame, 95).unwrap().len();
        let budget = encode(&frame, 50).unwrap().len();
        assert!(top > budget);

        let (bytes, quality) = encode_fit(&frame, budget, &DEFAULT_QUALITY_LADDER).unwrap();
        assert!(quality < 95);
        assert!(bytes.len() <= budget);
    }

    #[test]
    fn test_encode_fit_uses_top_quality_when_it_fits() {
        let frame = Frame::new_filled(8, 8, [1, 2, 3, 255]);
        let (_, quality) = encode_fit(&frame, usize::MAX, &[50, 95, 75]).unwrap();
        assert_eq!(quality, 95);
    }

    #[test]
    fn test_encode_fit_overflow_names_smallest_attempt() {
        let frame = noisy_frame(32, 32);
        let lowest = encode(&frame, 50).unwrap().len();

        match encode_fit(&frame, 16, &DEFAULT_QUALITY_LADDER) {
            Err(GlitchError::Encode(EncodeError::Overflow { smallest, max_bytes, .. })) => {
                assert_eq!(max_bytes, 16);
                assert!(smallest > 16);
                assert!(smallest <= lowest);
            }
            other => panic!("expected overflow, got {:?}", other.map(|(_, q)| q)),
        }
    }

    #[test]
    fn test_empty_ladder_is_an_error() {
        let frame = Frame::new_filled(2, 2, [0, 0, 0, 255]);
        assert!(matches!(
            encode_fit(&frame, 1024, &[]),
            Err(GlitchError::Encode(EncodeError::EmptyLadder))
        ));
    }
}
