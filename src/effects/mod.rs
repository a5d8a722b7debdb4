//! # Effects Module
//!
//! The effect contract, the registry that maps ids to kernels, and the container
//! that wraps every invocation with seeding, mix and mask handling.

pub mod builtin;
pub mod container;
pub mod registry;
pub mod traits;
pub mod vhs;

pub use container::EffectContainer;
pub use registry::EffectRegistry;
pub use traits::{
    Effect, EffectContext, EffectInfo, EffectState, ParamCurve, ParamKind, ParamSpec, ParamValue, Params,
    MASK_KEY, MIX_KEY, SEED_KEY,
};
pub use vhs::VhsEffect;
