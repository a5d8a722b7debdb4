use std::collections::HashMap;

use crate::effects::{
    builtin::{ChannelShift, Echo, HueShift, Invert, Noise, Posterize},
    traits::{Effect, EffectInfo},
    VhsEffect,
};

/// Registry of available effects, keyed by effect id
///
/// The registry is an ordinary value owned by the caller and passed to the pipeline,
/// so tests and embedders can run with any effect set they like.
pub struct EffectRegistry {
    effects: HashMap<String, Box<dyn Effect>>,
}

impl EffectRegistry {
    /// Create a new registry with all built-in effects
    pub fn new() -> Self {
        let mut registry = Self::empty();

        // Register all built-in effects
        registry.register_builtin_effects();
        registry
    }

    /// Create a registry with no effects registered
    pub fn empty() -> Self {
        Self {
            effects: HashMap::new(),
        }
    }

    fn register_builtin_effects(&mut self) {
        self.register(Box::new(Invert));
        self.register(Box::new(Posterize));
        self.register(Box::new(Noise));
        self.register(Box::new(HueShift));
        self.register(Box::new(ChannelShift));
        self.register(Box::new(Echo));
        self.register(Box::new(VhsEffect::new()));
    }

    /// Register an effect under its own id, replacing any effect with the same id
    pub fn register(&mut self, effect: Box<dyn Effect>) {
        self.effects.insert(effect.id().to_string(), effect);
    }

    /// Get an effect by id
    pub fn get(&self, id: &str) -> Option<&dyn Effect> {
        self.effects.get(id).map(|effect| effect.as_ref())
    }

    /// Get all available effect ids, sorted
    pub fn available_effects(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.effects.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Describe every registered effect, sorted by id
    pub fn list_all(&self) -> Vec<EffectInfo> {
        self.available_effects()
            .into_iter()
            .filter_map(|id| self.get(&id))
            .map(|effect| EffectInfo {
                id: effect.id().to_string(),
                name: effect.name().to_string(),
                category: effect.category().to_string(),
                description: effect.description().to_string(),
                params: effect.params(),
            })
            .collect()
    }

    pub fn has_effect(&self, id: &str) -> bool {
        self.effects.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_effects_available() {
        let registry = EffectRegistry::new();

        for id in ["fx.invert", "fx.posterize", "fx.noise", "fx.hue_shift", "fx.channelshift", "fx.echo", "fx.vhs"] {
            assert!(registry.has_effect(id), "missing {}", id);
        }
        assert_eq!(registry.len(), 7);
    }

    #[test]
    fn test_get_effect() {
        let registry = EffectRegistry::new();

        assert_eq!(registry.get("fx.invert").map(|e| e.name()), Some("Invert"));
        assert!(registry.get("fx.unknown").is_none());
    }

    #[test]
    fn test_list_all_includes_schema() {
        let registry = EffectRegistry::new();
        let infos = registry.list_all();

        let posterize = infos.iter().find(|info| info.id == "fx.posterize").unwrap();
        assert_eq!(posterize.params.len(), 1);
        assert_eq!(posterize.params[0].name, "levels");

        let ids: Vec<&str> = infos.iter().map(|info| info.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_custom_registry() {
        let mut registry = EffectRegistry::empty();
        assert!(registry.is_empty());

        registry.register(Box::new(Invert));
        assert!(registry.has_effect("fx.invert"));
        assert_eq!(registry.len(), 1);
    }
}
