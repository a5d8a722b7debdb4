//! # Composition
//!
//! Multi-layer compositing: each layer runs its own effect chain, then layers are folded
//! onto a wide-precision canvas with a blend mode and opacity.

pub mod blend;
pub mod compositor;

pub use blend::BlendMode;
pub use compositor::{Compositor, Layer, LayerSettings};
