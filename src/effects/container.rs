use tracing::debug;

use crate::{
    determinism::derive_seed,
    effects::traits::{Effect, EffectContext, EffectState, ParamValue, Params, MASK_KEY, MIX_KEY, SEED_KEY},
    error::{EffectError, Result},
    video::types::{Frame, Mask},
};

/// Wraps one effect invocation: seed derivation, dry/wet mix and mask blending.
///
/// Effect authors only write the wet transform; everything the user can do to any
/// effect (mix it back, mask it) happens here. Effect failures are not caught.
pub struct EffectContainer<'a> {
    effect: &'a dyn Effect,
}

impl<'a> EffectContainer<'a> {
    pub fn new(effect: &'a dyn Effect) -> Self {
        Self { effect }
    }

    pub fn effect_id(&self) -> &str {
        self.effect.id()
    }

    /// Run the wrapped effect on `frame`.
    ///
    /// `params` may carry the reserved `_mix` and `_mask` keys; they are removed before
    /// the effect sees the map. Returns the output frame and the effect's new state.
    pub fn process(
        &self,
        frame: &Frame,
        mut params: Params,
        state_in: Option<&EffectState>,
        frame_index: u64,
        project_seed: u64,
        resolution: (u32, u32),
    ) -> Result<(Frame, Option<EffectState>)> {
        let effect_id = self.effect.id();

        // NaN/Inf floats are dropped so the effect falls back to its default
        params.retain_finite();

        let user_seed = params.get_i64(SEED_KEY).unwrap_or(0);
        let seed = derive_seed(project_seed, effect_id, frame_index, user_seed);

        let mask = match params.remove(MASK_KEY) {
            Some(ParamValue::Mask(mask)) => Some(mask),
            _ => None,
        };
        let mix = params
            .remove(MIX_KEY)
            .and_then(|v| v.as_f32())
            .unwrap_or(1.0)
            .clamp(0.0, 1.0);

        if let Some(mask) = &mask {
            if mask.dimensions() != frame.dimensions() {
                return Err(EffectError::MaskShape {
                    effect: effect_id.to_string(),
                    expected: frame.dimensions(),
                    actual: mask.dimensions(),
                }
                .into());
            }
        }

        let ctx = EffectContext {
            frame_index,
            seed,
            resolution,
        };
        let (wet, state_out) = self.effect.apply(frame, &params, state_in, &ctx)?;

        if wet.dimensions() != frame.dimensions() {
            return Err(EffectError::OutputShape {
                effect: effect_id.to_string(),
                expected: frame.dimensions(),
                actual: wet.dimensions(),
            }
            .into());
        }

        debug!(effect = effect_id, frame_index, mix, masked = mask.is_some(), "effect applied");

        let mixed = if mix <= 0.0 {
            frame.clone()
        } else if mix < 1.0 {
            mix_frames(frame, &wet, mix)
        } else {
            wet
        };

        let output = match mask {
            Some(mask) => apply_mask(frame, &mixed, &mask),
            None => mixed,
        };

        Ok((output, state_out))
    }
}

/// `dry * (1 - mix) + wet * mix`, computed in f32 and truncated back to u8
fn mix_frames(dry: &Frame, wet: &Frame, mix: f32) -> Frame {
    let mut out = dry.clone();
    for (o, &w) in out.pixels_mut().iter_mut().zip(wet.pixels()) {
        *o = lerp_u8(*o, w, mix);
    }
    out
}

/// Blend `wet` back toward `dry` using the mask as the per-pixel weight
fn apply_mask(dry: &Frame, wet: &Frame, mask: &Mask) -> Frame {
    let mut out = dry.clone();
    let weights = mask.weights();
    for ((o, w), &m) in out
        .pixels_mut()
        .chunks_exact_mut(4)
        .zip(wet.pixels().chunks_exact(4))
        .zip(weights)
    {
        for c in 0..4 {
            o[c] = lerp_u8(o[c], w[c], m);
        }
    }
    out
}

fn lerp_u8(dry: u8, wet: u8, t: f32) -> u8 {
    let v = f32::from(dry) * (1.0 - t) + f32::from(wet) * t;
    v.clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::builtin::{Invert, Noise};
    use crate::effects::EffectRegistry;
    use crate::error::GlitchError;

    fn gradient(width: u32, height: u32) -> Frame {
        let mut frame = Frame::new_transparent(width, height);
        for y in 0..height {
            for x in 0..width {
                frame.set_pixel(x, y, [(x * 37 % 256) as u8, (y * 59 % 256) as u8, ((x + y) * 11 % 256) as u8, 200]);
            }
        }
        frame
    }

    struct Shrink;

    impl Effect for Shrink {
        fn id(&self) -> &str {
            "test.shrink"
        }
        fn name(&self) -> &str {
            "Shrink"
        }
        fn category(&self) -> &str {
            "test"
        }
        fn apply(&self, _: &Frame, _: &Params, _: Option<&EffectState>, _: &EffectContext) -> Result<(Frame, Option<EffectState>)> {
            Ok((Frame::new_transparent(1, 1), None))
        }
    }

    struct Failing;

    impl Effect for Failing {
        fn id(&self) -> &str {
            "test.failing"
        }
        fn name(&self) -> &str {
            "Failing"
        }
        fn category(&self) -> &str {
            "test"
        }
        fn apply(&self, _: &Frame, _: &Params, _: Option<&EffectState>, _: &EffectContext) -> Result<(Frame, Option<EffectState>)> {
            Err(EffectError::Failed {
                effect: "test.failing".into(),
                reason: "boom".into(),
            }
            .into())
        }
    }

    #[test]
    fn test_mix_zero_returns_input_unchanged() {
        let registry = EffectRegistry::new();
        let frame = gradient(16, 9);
        // a non-empty incoming state, so echo has a trail to blend
        let state = EffectState::from_frame(&Frame::new_filled(16, 9, [255, 0, 255, 255]));

        for id in registry.available_effects() {
            let effect = registry.get(&id).unwrap();
            let params = Params::new().set(MIX_KEY, 0.0f32).set("intensity", 1.0f32);
            let (out, _) = EffectContainer::new(effect)
                .process(&frame, params, Some(&state), 3, 42, (16, 9))
                .unwrap();
            assert_eq!(out, frame, "{} changed the frame at mix=0", id);
        }
    }

    #[test]
    fn test_full_mix_and_full_mask_return_wet() {
        let frame = gradient(8, 8);
        let params = Params::new().set(MASK_KEY, Mask::filled(8, 8, 1.0));
        let (out, _) = EffectContainer::new(&Invert)
            .process(&frame, params, None, 0, 0, (8, 8))
            .unwrap();

        let (wet, _) = Invert
            .apply(&frame, &Params::new(), None, &EffectContext { frame_index: 0, seed: 0, resolution: (8, 8) })
            .unwrap();
        assert_eq!(out, wet);
    }

    #[test]
    fn test_zero_mask_returns_input_unchanged() {
        let frame = gradient(8, 4);
        let params = Params::new().set(MASK_KEY, Mask::filled(8, 4, 0.0));
        let (out, _) = EffectContainer::new(&Invert)
            .process(&frame, params, None, 0, 0, (8, 4))
            .unwrap();
        assert_eq!(out, frame);
    }

    #[test]
    fn test_half_mix_blends() {
        let frame = Frame::new_filled(2, 2, [100, 0, 255, 255]);
        let params = Params::new().set(MIX_KEY, 0.5f32);
        let (out, _) = EffectContainer::new(&Invert)
            .process(&frame, params, None, 0, 0, (2, 2))
            .unwrap();

        // invert keeps alpha; (100 + 155) / 2 = 127.5 truncates
        assert_eq!(out.get_pixel(0, 0), [127, 127, 127, 255]);
    }

    #[test]
    fn test_mask_selects_region() {
        let frame = Frame::new_filled(2, 1, [10, 10, 10, 255]);
        let mask = Mask::new(2, 1, vec![1.0, 0.0]).unwrap();
        let (out, _) = EffectContainer::new(&Invert)
            .process(&frame, Params::new().set(MASK_KEY, mask), None, 0, 0, (2, 1))
            .unwrap();

        assert_eq!(out.get_pixel(0, 0), [245, 245, 245, 255]);
        assert_eq!(out.get_pixel(1, 0), [10, 10, 10, 255]);
    }

    #[test]
    fn test_mask_shape_mismatch_is_rejected() {
        let frame = gradient(4, 4);
        let params = Params::new().set(MASK_KEY, Mask::filled(2, 2, 1.0));
        let err = EffectContainer::new(&Invert)
            .process(&frame, params, None, 0, 0, (4, 4))
            .unwrap_err();
        assert!(matches!(err, GlitchError::Effect(EffectError::MaskShape { .. })));
    }

    #[test]
    fn test_wrong_output_shape_is_rejected() {
        let frame = gradient(4, 4);
        let err = EffectContainer::new(&Shrink)
            .process(&frame, Params::new(), None, 0, 0, (4, 4))
            .unwrap_err();
        assert!(matches!(err, GlitchError::Effect(EffectError::OutputShape { .. })));
    }

    #[test]
    fn test_effect_failure_propagates() {
        let frame = gradient(4, 4);
        let err = EffectContainer::new(&Failing)
            .process(&frame, Params::new(), None, 0, 0, (4, 4))
            .unwrap_err();
        assert!(matches!(err, GlitchError::Effect(EffectError::Failed { .. })));
    }

    #[test]
    fn test_user_seed_changes_output() {
        let frame = gradient(32, 32);
        let run = |seed: i64| {
            let params = Params::new().set("intensity", 0.5f32).set(SEED_KEY, seed);
            EffectContainer::new(&Noise)
                .process(&frame, params, None, 0, 1, (32, 32))
                .unwrap()
                .0
        };

        assert_eq!(run(1), run(1));
        assert_ne!(run(1), run(2));
    }

    #[test]
    fn test_nan_mix_falls_back_to_full_wet() {
        let frame = gradient(4, 4);
        let params = Params::new().set(MIX_KEY, f32::NAN);
        let (out, _) = EffectContainer::new(&Invert)
            .process(&frame, params, None, 0, 0, (4, 4))
            .unwrap();
        assert_ne!(out, frame);
    }
}
