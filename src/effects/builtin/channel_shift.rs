use crate::{
    effects::traits::{Effect, EffectContext, EffectState, ParamKind, ParamSpec, ParamValue, Params},
    error::Result,
    video::types::Frame,
};

pub const RED_OFFSET: &str = "r_offset";
pub const GREEN_OFFSET: &str = "g_offset";
pub const BLUE_OFFSET: &str = "b_offset";

const MAX_OFFSET: i64 = 50;

/// Rolls each color channel horizontally by its own offset, wrapping at the edges
pub struct ChannelShift;

impl ChannelShift {
    fn offsets(params: &Params) -> [i64; 3] {
        [(RED_OFFSET, 10), (GREEN_OFFSET, 0), (BLUE_OFFSET, -10)]
            .map(|(key, default)| params.get_i64_or(key, default).clamp(-MAX_OFFSET, MAX_OFFSET))
    }
}

impl Effect for ChannelShift {
    fn id(&self) -> &str {
        "fx.channelshift"
    }

    fn name(&self) -> &str {
        "Channel Shift"
    }

    fn category(&self) -> &str {
        "distortion"
    }

    fn description(&self) -> &str {
        "Offset the R, G and B channels horizontally"
    }

    fn params(&self) -> Vec<ParamSpec> {
        let offset = |name: &str, label: &str, default: i64| {
            ParamSpec::range(
                name,
                label,
                ParamKind::Int,
                -MAX_OFFSET as f32,
                MAX_OFFSET as f32,
                ParamValue::Integer(default),
            )
            .with_unit("px")
        };
        vec![
            offset(RED_OFFSET, "Red Offset", 10),
            offset(GREEN_OFFSET, "Green Offset", 0),
            offset(BLUE_OFFSET, "Blue Offset", -10),
        ]
    }

    fn apply(
        &self,
        frame: &Frame,
        params: &Params,
        _state: Option<&EffectState>,
        _ctx: &EffectContext,
    ) -> Result<(Frame, Option<EffectState>)> {
        let offsets = Self::offsets(params);
        let (width, height) = frame.dimensions();
        let mut output = frame.clone();
        if width == 0 || offsets.iter().all(|&o| o == 0) {
            return Ok((output, None));
        }

        let w = i64::from(width);
        for y in 0..height {
            for x in 0..width {
                let mut px = frame.get_pixel(x, y);
                for (channel, offset) in offsets.iter().enumerate() {
                    let src_x = (i64::from(x) - offset).rem_euclid(w) as u32;
                    px[channel] = frame.get_pixel(src_x, y)[channel];
                }
                output.set_pixel(x, y, px);
            }
        }
        Ok((output, None))
    }
}
