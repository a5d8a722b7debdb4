//! # Built-in Effects
//!
//! A small set of kernels that ship with the registry. Each one is a unit struct
//! implementing [`Effect`](crate::effects::Effect); parameter names are exported as
//! constants next to the effect.

mod channel_shift;
mod echo;
mod hue_shift;
mod invert;
mod noise;
mod posterize;

pub use channel_shift::ChannelShift;
pub use echo::Echo;
pub use hue_shift::HueShift;
pub use invert::Invert;
pub use noise::Noise;
pub use posterize::Posterize;
