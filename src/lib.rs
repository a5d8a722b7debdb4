//! # glitchframe
//!
//! Deterministic glitch-effect rendering core: effect chains, multi-layer compositing,
//! shared-memory preview delivery and background export.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use glitchframe::{
//!     effects::{EffectRegistry, Params},
//!     pipeline::{EffectInstance, EffectStates, Pipeline},
//!     video::Frame,
//! };
//!
//! # fn main() -> glitchframe::Result<()> {
//! let registry = EffectRegistry::new();
//! let pipeline = Pipeline::new(&registry);
//!
//! let chain = vec![
//!     EffectInstance::new("fx.noise").with_params(Params::new().set("intensity", 0.4f32)),
//!     EffectInstance::new("fx.vhs").with_mix(0.7),
//! ];
//!
//! let frame = Frame::open("input.png").map_err(|e| glitchframe::GlitchError::generic(e.to_string()))?;
//! let (output, _states) = pipeline.apply_chain(&frame, &chain, 42, 0, frame.dimensions(), &EffectStates::new())?;
//! output.save_png("output.png").map_err(|e| glitchframe::GlitchError::generic(e.to_string()))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`determinism`] - Seed derivation; the only source of randomness for effects
//! - [`effects`] - Effect contract, registry, container and built-in kernels
//! - [`pipeline`] - Ordered chain application with per-effect state
//! - [`composition`] - Layer blending
//! - [`video`] - Frames, JPEG encoder, reader/writer contracts and the ffmpeg backend
//! - [`transport`] - Memory-mapped frame ring buffer
//! - [`export`] - Cancellable background export
//! - [`config`] - Configuration management
//!
//! ## Writing Effects
//!
//! Implement the [`Effect`](effects::Effect) trait and register it:
//!
//! ```rust,no_run
//! use glitchframe::effects::{Effect, EffectContext, EffectRegistry, EffectState, Params};
//! use glitchframe::video::Frame;
//! use glitchframe::Result;
//!
//! struct Darken;
//!
//! impl Effect for Darken {
//!     fn id(&self) -> &str { "user.darken" }
//!     fn name(&self) -> &str { "Darken" }
//!     fn category(&self) -> &str { "color" }
//!
//!     fn apply(&self, frame: &Frame, _params: &Params, _state: Option<&EffectState>, _ctx: &EffectContext)
//!         -> Result<(Frame, Option<EffectState>)>
//!     {
//!         let mut out = frame.clone();
//!         for px in out.pixels_mut().chunks_exact_mut(4) {
//!             px[0] /= 2;
//!             px[1] /= 2;
//!             px[2] /= 2;
//!         }
//!         Ok((out, None))
//!     }
//! }
//!
//! let mut registry = EffectRegistry::new();
//! registry.register(Box::new(Darken));
//! ```

pub mod composition;
pub mod config;
pub mod determinism;
pub mod effects;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod transport;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    composition::{BlendMode, Compositor, Layer},
    config::Config,
    determinism::derive_seed,
    effects::{Effect, EffectRegistry},
    error::{GlitchError, Result},
    export::{ExportManager, ExportStatus},
    pipeline::{EffectInstance, EffectStates, Pipeline},
    transport::{RingBufferReader, RingBufferWriter},
    video::Frame,
};
