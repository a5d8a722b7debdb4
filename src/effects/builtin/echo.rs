use crate::{
    effects::traits::{Effect, EffectContext, EffectState, ParamKind, ParamSpec, ParamValue, Params},
    error::Result,
    video::types::Frame,
};

pub const DECAY: &str = "decay";

const DEFAULT_DECAY: f32 = 0.6;
const MAX_DECAY: f32 = 0.95;

/// Feedback trail: blends each frame with this effect's previous output
///
/// The previous output travels as [`EffectState::Buffer`]. A missing state or one with
/// different dimensions (resolution change) restarts the trail from the current frame.
pub struct Echo;

impl Effect for Echo {
    fn id(&self) -> &str {
        "fx.echo"
    }

    fn name(&self) -> &str {
        "Echo"
    }

    fn category(&self) -> &str {
        "time"
    }

    fn description(&self) -> &str {
        "Ghosting trail built from previous frames"
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::range(
            DECAY,
            "Decay",
            ParamKind::Float,
            0.0,
            MAX_DECAY,
            ParamValue::Float(DEFAULT_DECAY),
        )]
    }

    fn apply(
        &self,
        frame: &Frame,
        params: &Params,
        state: Option<&EffectState>,
        _ctx: &EffectContext,
    ) -> Result<(Frame, Option<EffectState>)> {
        let decay = params.get_f32_or(DECAY, DEFAULT_DECAY).clamp(0.0, MAX_DECAY);

        let previous = state
            .and_then(EffectState::to_frame)
            .filter(|prev| prev.dimensions() == frame.dimensions());

        let output = match previous {
            Some(prev) => {
                let mut out = frame.clone();
                for (o, p) in out.pixels_mut().chunks_exact_mut(4).zip(prev.pixels().chunks_exact(4)) {
                    for c in 0..3 {
                        let v = f32::from(o[c]) * (1.0 - decay) + f32::from(p[c]) * decay;
                        o[c] = v.round().clamp(0.0, 255.0) as u8;
                    }
                }
                out
            }
            None => frame.clone(),
        };

        let next_state = EffectState::from_frame(&output);
        Ok((output, Some(next_state)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::builtin::test_support::ctx;

    #[test]
    fn test_first_frame_passes_through() {
        let frame = Frame::new_filled(3, 3, [200, 100, 50, 255]);
        let (out, state) = Echo.apply(&frame, &Params::new(), None, &ctx(&frame)).unwrap();

        assert_eq!(out, frame);
        assert_eq!(state, Some(EffectState::from_frame(&frame)));
    }

    #[test]
    fn test_trail_blends_previous_output() {
        let white = Frame::new_filled(2, 2, [200, 200, 200, 255]);
        let black = Frame::new_filled(2, 2, [0, 0, 0, 255]);
        let params = Params::new().set(DECAY, 0.5f32);

        let (_, state) = Echo.apply(&white, &params, None, &ctx(&white)).unwrap();
        let (out, state) = Echo.apply(&black, &params, state.as_ref(), &ctx(&black)).unwrap();
        assert_eq!(out.get_pixel(0, 0), [100, 100, 100, 255]);

        let (out, _) = Echo.apply(&black, &params, state.as_ref(), &ctx(&black)).unwrap();
        assert_eq!(out.get_pixel(0, 0), [50, 50, 50, 255]);
    }

    #[test]
    fn test_resolution_change_resets_trail() {
        let small = Frame::new_filled(2, 2, [255, 255, 255, 255]);
        let large = Frame::new_filled(4, 4, [0, 0, 0, 255]);

        let (_, state) = Echo.apply(&small, &Params::new(), None, &ctx(&small)).unwrap();
        let (out, _) = Echo.apply(&large, &Params::new(), state.as_ref(), &ctx(&large)).unwrap();
        assert_eq!(out, large);
    }
}
