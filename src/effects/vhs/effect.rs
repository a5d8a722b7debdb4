use rand::{rngs::StdRng, Rng};

use crate::{
    determinism::make_rng,
    effects::traits::{Effect, EffectContext, EffectState, ParamKind, ParamSpec, ParamValue, Params},
    error::Result,
    video::types::Frame,
};

use super::{CHROMA_SHIFT, COLOR_BLEEDING, INTENSITY, NOISE_LEVEL, SCANLINE_INTENSITY, TRACKING_ERROR};

/// VHS tape look built from several passes over the frame
pub struct VhsEffect;

impl VhsEffect {
    pub fn new() -> Self {
        Self
    }

    /// Darken alternating rows, with a heavier line every eighth row
    fn apply_scanlines(&self, frame: &mut Frame, intensity: f32) {
        if intensity <= 0.0 {
            return;
        }
        let (width, height) = frame.dimensions();

        for y in 0..height {
            let mut factor = if y % 2 == 0 {
                1.0 - intensity * 0.4
            } else {
                1.0 - intensity * 0.2
            };
            if y % 8 == 0 && intensity > 0.5 {
                factor *= 0.7;
            }

            for x in 0..width {
                let pixel = frame.get_pixel_mut(x, y);
                for channel in pixel.iter_mut().take(3) {
                    *channel = (f32::from(*channel) * factor) as u8;
                }
            }
        }
    }

    /// Red smears to the right, blue to the left, green picks up a little of both
    fn apply_color_bleeding(&self, frame: &mut Frame, intensity: f32) {
        let (width, height) = frame.dimensions();
        if intensity <= 0.0 || width < 5 {
            return;
        }

        let original = frame.clone();
        let blend = intensity * 0.4;

        for y in 0..height {
            for x in 2..width - 2 {
                let current = original.get_pixel(x, y);
                let left1 = original.get_pixel(x - 1, y);
                let left2 = original.get_pixel(x - 2, y);
                let right1 = original.get_pixel(x + 1, y);
                let right2 = original.get_pixel(x + 2, y);

                let red_bleed = (f32::from(right1[0]) * 0.7 + f32::from(right2[0]) * 0.3) * blend;
                let blue_bleed = (f32::from(left1[2]) * 0.7 + f32::from(left2[2]) * 0.3) * blend;
                let green_bleed = (f32::from(left1[1]) + f32::from(right1[1])) * 0.5 * blend * 0.3;

                let pixel = frame.get_pixel_mut(x, y);
                pixel[0] = (f32::from(current[0]) * (1.0 - blend) + red_bleed) as u8;
                pixel[1] = (f32::from(current[1]) * (1.0 - blend * 0.3) + green_bleed) as u8;
                pixel[2] = (f32::from(current[2]) * (1.0 - blend) + blue_bleed) as u8;
            }
        }
    }

    /// Offset red and blue in opposite directions, clamped at the frame edge
    fn apply_chroma_shift(&self, frame: &mut Frame, intensity: f32) {
        let (width, height) = frame.dimensions();
        let shift = (intensity * 4.0) as i64;
        if shift == 0 || width == 0 {
            return;
        }

        let original = frame.clone();
        let max_x = i64::from(width) - 1;

        for y in 0..height {
            for x in 0..width {
                let red_x = (i64::from(x) + shift).clamp(0, max_x) as u32;
                let blue_x = (i64::from(x) - shift).clamp(0, max_x) as u32;
                let red = original.get_pixel(red_x, y)[0];
                let blue = original.get_pixel(blue_x, y)[2];

                let pixel = frame.get_pixel_mut(x, y);
                pixel[0] = red;
                pixel[2] = blue;
            }
        }
    }

    /// Randomly displaced rows, sometimes dragging the next row along
    fn apply_tracking_error(&self, frame: &mut Frame, intensity: f32, rng: &mut StdRng) {
        let height = frame.height();
        if intensity <= 0.0 {
            return;
        }
        let probability = intensity * 0.15;

        for y in 0..height {
            if rng.gen::<f32>() >= probability {
                continue;
            }
            let displacement = if rng.gen::<f32>() < 0.7 {
                rng.gen_range(-2..=2)
            } else {
                rng.gen_range(-8..=8)
            };
            self.displace_row(frame, y, displacement, rng);

            if rng.gen::<f32>() < 0.3 && y + 1 < height {
                self.displace_row(frame, y + 1, displacement / 2, rng);
            }
        }
    }

    /// Shift one row horizontally; pixels scrolled in from outside become dim snow
    fn displace_row(&self, frame: &mut Frame, y: u32, displacement: i64, rng: &mut StdRng) {
        if displacement == 0 {
            return;
        }
        let width = i64::from(frame.width());
        let row: Vec<[u8; 4]> = (0..frame.width()).map(|x| frame.get_pixel(x, y)).collect();

        for x in 0..width {
            let source_x = x - displacement;
            let pixel = frame.get_pixel_mut(x as u32, y);
            if (0..width).contains(&source_x) {
                pixel[..3].copy_from_slice(&row[source_x as usize][..3]);
            } else {
                let snow = rng.gen_range(0..=64);
                pixel[..3].fill(snow);
            }
        }
    }

    /// Sparse grain, bright snow dots and dark dropouts
    fn apply_noise(&self, frame: &mut Frame, intensity: f32, rng: &mut StdRng) {
        if intensity <= 0.0 {
            return;
        }
        let probability = intensity * 0.08;

        for px in frame.pixels_mut().chunks_exact_mut(4) {
            if rng.gen::<f32>() >= probability {
                continue;
            }
            let kind = rng.gen::<f32>();
            if kind < 0.6 {
                let grain: i16 = rng.gen_range(-30..=30);
                for channel in px.iter_mut().take(3) {
                    *channel = (i16::from(*channel) + grain).clamp(0, 255) as u8;
                }
            } else if kind < 0.8 {
                let snow = rng.gen_range(200..=255);
                px[..3].fill(snow);
            } else {
                let dropout = rng.gen_range(0..=40);
                px[..3].fill(dropout);
            }
        }
    }
}

impl Default for VhsEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for VhsEffect {
    fn id(&self) -> &str {
        "fx.vhs"
    }

    fn name(&self) -> &str {
        "VHS"
    }

    fn category(&self) -> &str {
        "retro"
    }

    fn description(&self) -> &str {
        "VHS tape aesthetic with scan lines, color bleeding, tracking errors and noise"
    }

    fn params(&self) -> Vec<ParamSpec> {
        let unit = |name: &str, label: &str, default: f32| {
            ParamSpec::range(name, label, ParamKind::Float, 0.0, 1.0, ParamValue::Float(default))
        };
        vec![
            unit(INTENSITY, "Intensity", 1.0),
            unit(SCANLINE_INTENSITY, "Scan Lines", 0.9),
            unit(COLOR_BLEEDING, "Color Bleeding", 0.8),
            unit(CHROMA_SHIFT, "Chroma Shift", 0.7),
            unit(TRACKING_ERROR, "Tracking Error", 0.5),
            unit(NOISE_LEVEL, "Noise", 0.6),
        ]
    }

    fn apply(
        &self,
        frame: &Frame,
        params: &Params,
        _state: Option<&EffectState>,
        ctx: &EffectContext,
    ) -> Result<(Frame, Option<EffectState>)> {
        let level = |key: &str, default: f32| params.get_f32_or(key, default).clamp(0.0, 1.0);
        let intensity = level(INTENSITY, 1.0);

        let mut output = frame.clone();
        let mut rng = make_rng(ctx.seed);

        self.apply_scanlines(&mut output, level(SCANLINE_INTENSITY, 0.9) * intensity);
        self.apply_color_bleeding(&mut output, level(COLOR_BLEEDING, 0.8) * intensity);
        self.apply_chroma_shift(&mut output, level(CHROMA_SHIFT, 0.7) * intensity);
        self.apply_tracking_error(&mut output, level(TRACKING_ERROR, 0.5) * intensity, &mut rng);
        self.apply_noise(&mut output, level(NOISE_LEVEL, 0.6) * intensity, &mut rng);

        Ok((output, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(seed: u64, frame: &Frame) -> EffectContext {
        EffectContext {
            frame_index: 0,
            seed,
            resolution: frame.dimensions(),
        }
    }

    fn test_frame() -> Frame {
        Frame::new_filled(64, 48, [120, 160, 200, 255])
    }

    #[test]
    fn test_vhs_is_deterministic_per_seed() {
        let frame = test_frame();
        let (a, _) = VhsEffect::new().apply(&frame, &Params::new(), None, &ctx(5, &frame)).unwrap();
        let (b, _) = VhsEffect::new().apply(&frame, &Params::new(), None, &ctx(5, &frame)).unwrap();
        let (c, _) = VhsEffect::new().apply(&frame, &Params::new(), None, &ctx(6, &frame)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, frame);
    }

    #[test]
    fn test_zero_intensity_is_identity() {
        let frame = test_frame();
        let params = Params::new().set(INTENSITY, 0.0f32);
        let (out, _) = VhsEffect::new().apply(&frame, &params, None, &ctx(1, &frame)).unwrap();
        assert_eq!(out, frame);
    }

    #[test]
    fn test_tiny_frames_keep_shape_and_alpha() {
        for (w, h) in [(1, 1), (3, 2), (1, 9)] {
            let frame = Frame::new_filled(w, h, [50, 60, 70, 99]);
            let (out, _) = VhsEffect::new().apply(&frame, &Params::new(), None, &ctx(3, &frame)).unwrap();
            assert_eq!(out.dimensions(), (w, h));
            assert!(out.pixels().chunks_exact(4).all(|px| px[3] == 99));
        }
    }
}
