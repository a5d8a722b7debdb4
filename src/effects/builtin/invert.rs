use rayon::prelude::*;

use crate::{
    effects::traits::{Effect, EffectContext, EffectState, Params},
    error::Result,
    video::types::Frame,
};

/// Inverts the RGB channels and keeps alpha. Applying it twice is the identity.
pub struct Invert;

impl Effect for Invert {
    fn id(&self) -> &str {
        "fx.invert"
    }

    fn name(&self) -> &str {
        "Invert"
    }

    fn category(&self) -> &str {
        "fx"
    }

    fn description(&self) -> &str {
        "Photographic negative of the color channels"
    }

    fn apply(
        &self,
        frame: &Frame,
        _params: &Params,
        _state: Option<&EffectState>,
        _ctx: &EffectContext,
    ) -> Result<(Frame, Option<EffectState>)> {
        let mut output = frame.clone();
        output.pixels_mut().par_chunks_exact_mut(4).for_each(|px| {
            px[0] = 255 - px[0];
            px[1] = 255 - px[1];
            px[2] = 255 - px[2];
        });
        Ok((output, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::builtin::test_support::{ctx, pattern};

    #[test]
    fn test_invert_is_self_inverse() {
        let frame = pattern(13, 7);
        let (once, _) = Invert.apply(&frame, &Params::new(), None, &ctx(&frame)).unwrap();
        let (twice, _) = Invert.apply(&once, &Params::new(), None, &ctx(&frame)).unwrap();

        assert_ne!(once, frame);
        assert_eq!(twice, frame);
    }

    #[test]
    fn test_invert_keeps_alpha() {
        let frame = Frame::new_filled(1, 1, [0, 100, 255, 42]);
        let (out, _) = Invert.apply(&frame, &Params::new(), None, &ctx(&frame)).unwrap();
        assert_eq!(out.get_pixel(0, 0), [255, 155, 0, 42]);
    }
}
