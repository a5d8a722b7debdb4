//! # VHS Effect
//!
//! Tape-deck degradation: scan lines, chroma bleed, tracking errors and snow.
//! Every random decision is drawn from the seeded generator in the effect context,
//! so a given frame always glitches the same way.

mod effect;

pub use effect::VhsEffect;

// VHS-specific parameter names
pub const INTENSITY: &str = "intensity";
pub const SCANLINE_INTENSITY: &str = "scanline_intensity";
pub const COLOR_BLEEDING: &str = "color_bleeding";
pub const TRACKING_ERROR: &str = "tracking_error";
pub const NOISE_LEVEL: &str = "noise_level";
pub const CHROMA_SHIFT: &str = "chroma_shift";
