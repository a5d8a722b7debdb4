use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    composition::BlendMode,
    error::{CompositionError, Result},
    pipeline::{EffectInstance, EffectStates, Pipeline},
    video::types::Frame,
};

/// One layer of a composite, bottom layers first
#[derive(Debug, Clone)]
pub struct Layer {
    pub frame: Frame,
    pub chain: Vec<EffectInstance>,
    pub opacity: f32,
    pub blend_mode: BlendMode,
    pub frame_index: u64,
}

impl Layer {
    /// A fully opaque, normal-blended layer with no effects
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            chain: Vec::new(),
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            frame_index: 0,
        }
    }

    pub fn with_chain(mut self, chain: Vec<EffectInstance>) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn with_frame_index(mut self, frame_index: u64) -> Self {
        self.frame_index = frame_index;
        self
    }
}

/// Layer settings without pixel data, as read from a layer-stack description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSettings {
    #[serde(default)]
    pub chain: Vec<EffectInstance>,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default)]
    pub blend_mode: BlendMode,
    #[serde(default)]
    pub frame_index: u64,
}

fn default_opacity() -> f32 {
    1.0
}

impl LayerSettings {
    pub fn into_layer(self, frame: Frame) -> Layer {
        Layer {
            frame,
            chain: self.chain,
            opacity: self.opacity,
            blend_mode: self.blend_mode,
            frame_index: self.frame_index,
        }
    }
}

/// Runs each layer's chain and blends the results bottom-to-top
///
/// The canvas is accumulated in `f32` so intermediate sums such as `add` never wrap;
/// it is clamped to 8 bits only once, at the end.
pub struct Compositor<'r> {
    pipeline: Pipeline<'r>,
}

impl<'r> Compositor<'r> {
    pub fn new(pipeline: Pipeline<'r>) -> Self {
        Self { pipeline }
    }

    pub fn render_composite(&self, layers: &[Layer], resolution: (u32, u32), project_seed: u64) -> Result<Frame> {
        let (width, height) = resolution;
        if layers.is_empty() {
            return Ok(Frame::new_transparent(width, height));
        }

        let mut canvas = vec![0.0f32; width as usize * height as usize * 4];

        for (index, layer) in layers.iter().enumerate() {
            if layer.frame.dimensions() != resolution {
                return Err(CompositionError::LayerSize {
                    index,
                    expected: resolution,
                    actual: layer.frame.dimensions(),
                }
                .into());
            }

            let processed = if layer.chain.is_empty() {
                None
            } else {
                let (frame, _) = self.pipeline.apply_chain(
                    &layer.frame,
                    &layer.chain,
                    project_seed,
                    layer.frame_index,
                    resolution,
                    &EffectStates::new(),
                )?;
                Some(frame)
            };
            let pixels = processed.as_ref().unwrap_or(&layer.frame).pixels();

            let opacity = if layer.opacity.is_finite() {
                layer.opacity.clamp(0.0, 1.0)
            } else {
                1.0
            };
            let mode = layer.blend_mode;
            for (base, &value) in canvas.iter_mut().zip(pixels) {
                *base = mode.composite(*base, f32::from(value), opacity);
            }

            debug!(layer = index, blend_mode = %mode, opacity, effects = layer.chain.len(), "layer composited");
        }

        let bytes = canvas
            .into_iter()
            .map(|v| v.clamp(0.0, 255.0) as u8)
            .collect();
        Frame::from_rgba_bytes(width, height, bytes)
            .ok_or_else(|| crate::error::GlitchError::generic("canvas size mismatch"))
    }
}
