use rayon::prelude::*;

use crate::{
    effects::traits::{Effect, EffectContext, EffectState, ParamKind, ParamSpec, ParamValue, Params},
    error::Result,
    video::types::Frame,
};

pub const LEVELS: &str = "levels";

const MIN_LEVELS: i64 = 2;
const MAX_LEVELS: i64 = 32;
const DEFAULT_LEVELS: i64 = 4;

/// Reduces each color channel to a fixed number of levels, snapping to the band centre
pub struct Posterize;

impl Effect for Posterize {
    fn id(&self) -> &str {
        "fx.posterize"
    }

    fn name(&self) -> &str {
        "Posterize"
    }

    fn category(&self) -> &str {
        "enhance"
    }

    fn description(&self) -> &str {
        "Reduce color levels per channel"
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::range(
            LEVELS,
            "Color Levels",
            ParamKind::Int,
            MIN_LEVELS as f32,
            MAX_LEVELS as f32,
            ParamValue::Integer(DEFAULT_LEVELS),
        )]
    }

    fn apply(
        &self,
        frame: &Frame,
        params: &Params,
        _state: Option<&EffectState>,
        _ctx: &EffectContext,
    ) -> Result<(Frame, Option<EffectState>)> {
        let levels = params
            .get_i64_or(LEVELS, DEFAULT_LEVELS)
            .clamp(MIN_LEVELS, MAX_LEVELS);
        let step = 256.0 / levels as f32;

        let mut lut = [0u8; 256];
        for (v, slot) in lut.iter_mut().enumerate() {
            let banded = (v as f32 / step).floor() * step + step / 2.0;
            *slot = banded.clamp(0.0, 255.0) as u8;
        }

        let mut output = frame.clone();
        output.pixels_mut().par_chunks_exact_mut(4).for_each(|px| {
            px[0] = lut[px[0] as usize];
            px[1] = lut[px[1] as usize];
            px[2] = lut[px[2] as usize];
        });
        Ok((output, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::builtin::test_support::ctx;

    #[test]
    fn test_four_levels_snap_to_band_centres() {
        let mut frame = Frame::new_transparent(4, 1);
        for (x, v) in [0u8, 70, 130, 255].into_iter().enumerate() {
            frame.set_pixel(x as u32, 0, [v, v, v, 9]);
        }
        let (out, _) = Posterize.apply(&frame, &Params::new(), None, &ctx(&frame)).unwrap();

        let reds: Vec<u8> = (0..4).map(|x| out.get_pixel(x, 0)[0]).collect();
        assert_eq!(reds, vec![32, 96, 160, 224]);
        assert_eq!(out.get_pixel(0, 0)[3], 9);
    }

    #[test]
    fn test_levels_are_clamped() {
        let frame = Frame::new_filled(1, 1, [200, 200, 200, 255]);
        let params = Params::new().set(LEVELS, 1000i64);
        let (out, _) = Posterize.apply(&frame, &params, None, &ctx(&frame)).unwrap();

        // 32 levels: step 8, 200 sits in band 25 -> 204
        assert_eq!(out.get_pixel(0, 0)[0], 204);
    }
}
