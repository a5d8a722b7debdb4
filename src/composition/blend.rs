use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::error::{CompositionError, GlitchError};

/// Per-pixel combination function used when layering one image over another
///
/// All functions operate on unclamped `f32` channel values in the 0..=255 scale; only the
/// final canvas is clamped. Deserializing an unknown name yields [`BlendMode::Normal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    #[default]
    Normal,
    Add,
    Multiply,
    Screen,
    Overlay,
    Difference,
    Exclusion,
    Darken,
    Lighten,
}

impl BlendMode {
    pub const ALL: [BlendMode; 9] = [
        BlendMode::Normal,
        BlendMode::Add,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Overlay,
        BlendMode::Difference,
        BlendMode::Exclusion,
        BlendMode::Darken,
        BlendMode::Lighten,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Add => "add",
            BlendMode::Multiply => "multiply",
            BlendMode::Screen => "screen",
            BlendMode::Overlay => "overlay",
            BlendMode::Difference => "difference",
            BlendMode::Exclusion => "exclusion",
            BlendMode::Darken => "darken",
            BlendMode::Lighten => "lighten",
        }
    }

    /// Look up a mode by name, falling back to `Normal` for names that are not in the table
    pub fn from_name_or_normal(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            warn!("Unknown blend mode '{}', using normal", name);
            BlendMode::Normal
        })
    }

    /// Blend one channel value before opacity is applied
    #[inline]
    pub fn blend(self, base: f32, layer: f32) -> f32 {
        match self {
            BlendMode::Normal => layer,
            BlendMode::Add => base + layer,
            BlendMode::Multiply => base * layer / 255.0,
            BlendMode::Screen => 255.0 - (255.0 - base) * (255.0 - layer) / 255.0,
            BlendMode::Overlay => {
                if base < 128.0 {
                    2.0 * base * layer / 255.0
                } else {
                    255.0 - 2.0 * (255.0 - base) * (255.0 - layer) / 255.0
                }
            }
            BlendMode::Difference => (base - layer).abs(),
            BlendMode::Exclusion => base + layer - 2.0 * base * layer / 255.0,
            BlendMode::Darken => base.min(layer),
            BlendMode::Lighten => base.max(layer),
        }
    }

    /// Blend and interpolate toward the result by `opacity`
    #[inline]
    pub fn composite(self, base: f32, layer: f32, opacity: f32) -> f32 {
        base * (1.0 - opacity) + self.blend(base, layer) * opacity
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlendMode {
    type Err = GlitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        BlendMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == lower)
            .ok_or_else(|| CompositionError::UnknownBlendMode { name: s.to_string() }.into())
    }
}

impl<'de> Deserialize<'de> for BlendMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(BlendMode::from_name_or_normal(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_table() {
        assert_eq!(BlendMode::Normal.blend(10.0, 200.0), 200.0);
        assert_eq!(BlendMode::Add.blend(200.0, 200.0), 400.0);
        assert_eq!(BlendMode::Multiply.blend(255.0, 100.0), 100.0);
        assert_eq!(BlendMode::Screen.blend(0.0, 100.0), 100.0);
        assert_eq!(BlendMode::Difference.blend(50.0, 200.0), 150.0);
        assert_eq!(BlendMode::Exclusion.blend(0.0, 90.0), 90.0);
        assert_eq!(BlendMode::Darken.blend(50.0, 200.0), 50.0);
        assert_eq!(BlendMode::Lighten.blend(50.0, 200.0), 200.0);
    }

    #[test]
    fn test_overlay_splits_at_midpoint() {
        // dark base multiplies, light base screens
        assert_eq!(BlendMode::Overlay.blend(0.0, 200.0), 0.0);
        assert_eq!(BlendMode::Overlay.blend(255.0, 10.0), 255.0);
    }

    #[test]
    fn test_zero_opacity_keeps_base() {
        for mode in BlendMode::ALL {
            assert_eq!(mode.composite(77.0, 240.0, 0.0), 77.0, "{}", mode);
        }
    }

    #[test]
    fn test_parse_blend_mode() {
        assert_eq!("screen".parse::<BlendMode>().unwrap(), BlendMode::Screen);
        assert_eq!("Lighten".parse::<BlendMode>().unwrap(), BlendMode::Lighten);
        assert!("dodge".parse::<BlendMode>().is_err());

        let mode: BlendMode = serde_json::from_str("\"difference\"").unwrap();
        assert_eq!(mode, BlendMode::Difference);
    }

    #[test]
    fn test_unknown_name_falls_back_to_normal() {
        assert_eq!(BlendMode::from_name_or_normal("dodge"), BlendMode::Normal);
        assert_eq!(BlendMode::from_name_or_normal("MULTIPLY"), BlendMode::Multiply);

        let mode: BlendMode = serde_json::from_str("\"burn\"").unwrap();
        assert_eq!(mode, BlendMode::Normal);
        assert!(serde_json::from_str::<BlendMode>("3").is_err());
    }
}
