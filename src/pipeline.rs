//! # Effect Pipeline
//!
//! Applies an ordered chain of effect instances to one frame, threading each effect's
//! opaque state from the previous frame into this one.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::{
    effects::{EffectContainer, EffectRegistry, EffectState, Params, MIX_KEY},
    error::{PipelineError, Result},
    video::types::Frame,
};

/// Hard cap on the number of instances in one chain
pub const MAX_CHAIN_DEPTH: usize = 10;

/// Default threshold above which a single effect invocation is logged as slow
pub const DEFAULT_SLOW_EFFECT_WARN: Duration = Duration::from_millis(100);

/// Per-effect state carried between frames, keyed by effect id
///
/// A `None` value records that the effect ran but returned no state.
pub type EffectStates = HashMap<String, Option<EffectState>>;

/// One entry of an effect chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectInstance {
    pub effect_id: String,

    #[serde(default)]
    pub params: Params,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Dry/wet mix; `None` means fully wet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mix: Option<f32>,
}

fn default_enabled() -> bool {
    true
}

impl EffectInstance {
    pub fn new<S: Into<String>>(effect_id: S) -> Self {
        Self {
            effect_id: effect_id.into(),
            params: Params::new(),
            enabled: true,
            mix: None,
        }
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn with_mix(mut self, mix: f32) -> Self {
        self.mix = Some(mix);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Runs effect chains against a caller-owned registry
///
/// The pipeline holds no per-frame state; the caller threads [`EffectStates`] from one
/// `apply_chain` call to the next.
pub struct Pipeline<'r> {
    registry: &'r EffectRegistry,
    slow_effect_warn: Duration,
}

impl<'r> Pipeline<'r> {
    pub fn new(registry: &'r EffectRegistry) -> Self {
        Self {
            registry,
            slow_effect_warn: DEFAULT_SLOW_EFFECT_WARN,
        }
    }

    /// Create a pipeline using the thresholds from a [`PipelineConfig`](crate::config::PipelineConfig)
    pub fn with_config(registry: &'r EffectRegistry, config: &crate::config::PipelineConfig) -> Self {
        Self {
            registry,
            slow_effect_warn: Duration::from_millis(config.slow_effect_warn_ms),
        }
    }

    pub fn registry(&self) -> &EffectRegistry {
        self.registry
    }

    /// Check chain depth and that every enabled instance names a registered effect
    pub fn validate_chain(&self, chain: &[EffectInstance]) -> Result<()> {
        check_depth(chain)?;
        for instance in chain.iter().filter(|i| i.enabled) {
            if !self.registry.has_effect(&instance.effect_id) {
                return Err(PipelineError::UnknownEffect {
                    id: instance.effect_id.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Apply `chain` to `frame` in order.
    ///
    /// Disabled instances are skipped and get no entry in the returned state map.
    /// An unknown effect id aborts the whole chain; no partial frame is returned.
    pub fn apply_chain(
        &self,
        frame: &Frame,
        chain: &[EffectInstance],
        project_seed: u64,
        frame_index: u64,
        resolution: (u32, u32),
        states: &EffectStates,
    ) -> Result<(Frame, EffectStates)> {
        check_depth(chain)?;

        let mut current = frame.clone();
        let mut new_states = EffectStates::new();

        for instance in chain {
            if !instance.enabled {
                continue;
            }

            let effect = self.registry.get(&instance.effect_id).ok_or_else(|| {
                PipelineError::UnknownEffect {
                    id: instance.effect_id.clone(),
                }
            })?;

            let mut params = instance.params.clone();
            if let Some(mix) = instance.mix {
                params.insert(MIX_KEY, mix);
            }

            let state_in = states.get(&instance.effect_id).and_then(Option::as_ref);

            let started = Instant::now();
            let (output, state_out) = EffectContainer::new(effect).process(
                &current,
                params,
                state_in,
                frame_index,
                project_seed,
                resolution,
            )?;
            let elapsed = started.elapsed();

            if elapsed > self.slow_effect_warn {
                warn!(
                    effect = %instance.effect_id,
                    frame_index,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "slow effect"
                );
            }

            current = output;
            new_states.insert(instance.effect_id.clone(), state_out);
        }

        debug!(frame_index, effects = new_states.len(), "chain applied");
        Ok((current, new_states))
    }
}

fn check_depth(chain: &[EffectInstance]) -> Result<()> {
    if chain.len() > MAX_CHAIN_DEPTH {
        return Err(PipelineError::ChainTooDeep {
            depth: chain.len(),
            max: MAX_CHAIN_DEPTH,
        }
        .into());
    }
    Ok(())
}
