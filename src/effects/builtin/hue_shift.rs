use rayon::prelude::*;

use crate::{
    effects::traits::{Effect, EffectContext, EffectState, ParamKind, ParamSpec, ParamValue, Params},
    error::Result,
    video::types::Frame,
};

pub const AMOUNT: &str = "amount";

const DEFAULT_AMOUNT: f32 = 180.0;

/// Rotates hue around the color wheel, leaving saturation, value and alpha alone
pub struct HueShift;

impl Effect for HueShift {
    fn id(&self) -> &str {
        "fx.hue_shift"
    }

    fn name(&self) -> &str {
        "Hue Shift"
    }

    fn category(&self) -> &str {
        "color"
    }

    fn description(&self) -> &str {
        "Rotate hue in HSV space"
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::range(
            AMOUNT,
            "Amount",
            ParamKind::Float,
            0.0,
            360.0,
            ParamValue::Float(DEFAULT_AMOUNT),
        )
        .with_unit("deg")]
    }

    fn apply(
        &self,
        frame: &Frame,
        params: &Params,
        _state: Option<&EffectState>,
        _ctx: &EffectContext,
    ) -> Result<(Frame, Option<EffectState>)> {
        let amount = params.get_f32_or(AMOUNT, DEFAULT_AMOUNT).rem_euclid(360.0);
        let mut output = frame.clone();
        if amount == 0.0 {
            return Ok((output, None));
        }

        output.pixels_mut().par_chunks_exact_mut(4).for_each(|px| {
            let (h, s, v) = rgb_to_hsv(px[0], px[1], px[2]);
            let (r, g, b) = hsv_to_rgb((h + amount).rem_euclid(360.0), s, v);
            px[0] = r;
            px[1] = g;
            px[2] = b;
        });
        Ok((output, None))
    }
}

/// Hue in degrees, saturation and value in `[0, 1]`
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = f32::from(r) / 255.0;
    let g = f32::from(g) / 255.0;
    let b = f32::from(b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let s = if max == 0.0 { 0.0 } else { delta / max };

    (h, s, max)
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match (h / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let to_u8 = |channel: f32| ((channel + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (to_u8(r), to_u8(g), to_u8(b))
}
