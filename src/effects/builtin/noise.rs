use rand::Rng;

use crate::{
    determinism::make_rng,
    effects::traits::{Effect, EffectContext, EffectState, ParamCurve, ParamKind, ParamSpec, ParamValue, Params},
    error::Result,
    video::types::Frame,
};

pub const INTENSITY: &str = "intensity";

const DEFAULT_INTENSITY: f32 = 0.3;
/// Standard deviation of the noise at full intensity, in 8-bit levels
const MAX_SIGMA: f32 = 50.0;

/// Seeded gaussian noise over the color channels
pub struct Noise;

impl Effect for Noise {
    fn id(&self) -> &str {
        "fx.noise"
    }

    fn name(&self) -> &str {
        "Noise"
    }

    fn category(&self) -> &str {
        "texture"
    }

    fn description(&self) -> &str {
        "Random noise overlay; the same seed always gives the same grain"
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::range(
            INTENSITY,
            "Intensity",
            ParamKind::Float,
            0.0,
            1.0,
            ParamValue::Float(DEFAULT_INTENSITY),
        )
        .with_curve(ParamCurve::Exponential)
        .with_unit("%")]
    }

    fn apply(
        &self,
        frame: &Frame,
        params: &Params,
        _state: Option<&EffectState>,
        ctx: &EffectContext,
    ) -> Result<(Frame, Option<EffectState>)> {
        let intensity = params.get_f32_or(INTENSITY, DEFAULT_INTENSITY).clamp(0.0, 1.0);
        if intensity == 0.0 {
            return Ok((frame.clone(), None));
        }

        let sigma = MAX_SIGMA * intensity;
        let mut rng = make_rng(ctx.seed);
        let mut output = frame.clone();

        for px in output.pixels_mut().chunks_exact_mut(4) {
            for channel in px.iter_mut().take(3) {
                let noisy = f32::from(*channel) + gaussian(&mut rng) * sigma;
                *channel = noisy.round().clamp(0.0, 255.0) as u8;
            }
        }
        Ok((output, None))
    }
}

/// Standard normal sample via Box-Muller
fn gaussian<R: Rng>(rng: &mut R) -> f32 {
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::builtin::test_support::{ctx, pattern};

    #[test]
    fn test_same_seed_same_noise() {
        let frame = pattern(24, 16);
        let params = Params::new().set(INTENSITY, 0.8f32);
        let (a, _) = Noise.apply(&frame, &params, None, &ctx(&frame)).unwrap();
        let (b, _) = Noise.apply(&frame, &params, None, &ctx(&frame)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, frame);
    }

    #[test]
    fn test_different_seed_different_noise() {
        let frame = pattern(24, 16);
        let params = Params::new().set(INTENSITY, 0.8f32);
        let mut other = ctx(&frame);
        other.seed += 1;

        let (a, _) = Noise.apply(&frame, &params, None, &ctx(&frame)).unwrap();
        let (b, _) = Noise.apply(&frame, &params, None, &other).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_zero_intensity_is_identity_and_alpha_kept() {
        let frame = pattern(8, 8);
        let (out, _) = Noise
            .apply(&frame, &Params::new().set(INTENSITY, 0.0f32), None, &ctx(&frame))
            .unwrap();
        assert_eq!(out, frame);

        let (noisy, _) = Noise
            .apply(&frame, &Params::new().set(INTENSITY, 1.0f32), None, &ctx(&frame))
            .unwrap();
        assert!(noisy.pixels().chunks_exact(4).all(|px| px[3] == 180));
    }
}
