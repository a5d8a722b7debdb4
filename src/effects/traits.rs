use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    error::Result,
    video::types::{Frame, Mask},
};

/// Param key the container reads the dry/wet mix from. Never reaches the effect.
pub const MIX_KEY: &str = "_mix";

/// Param key the container reads the per-pixel mask from. Never reaches the effect.
pub const MASK_KEY: &str = "_mask";

/// Param key holding the optional user sub-seed folded into the derived seed.
pub const SEED_KEY: &str = "seed";

/// Core trait that every effect kernel implements
///
/// An effect is a pure function of its inputs: the frame, its parameters, the state it
/// returned on the previous frame, and the [`EffectContext`]. Any randomness must come
/// from `ctx.seed`.
pub trait Effect: Send + Sync {
    /// Returns the unique registry id of this effect (e.g. `fx.invert`)
    fn id(&self) -> &str;

    /// Returns a human-readable name
    fn name(&self) -> &str;

    /// Category used by UIs to group effects
    fn category(&self) -> &str;

    /// Returns a short description of this effect
    fn description(&self) -> &str {
        ""
    }

    /// Parameter schema. Only callers and UIs read this; the core never does.
    fn params(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    /// Apply the effect
    ///
    /// # Arguments
    ///
    /// * `frame` - The dry input frame
    /// * `params` - Effect parameters, with the container's reserved keys removed
    /// * `state` - State this effect returned for the previous frame, if any
    /// * `ctx` - Frame index, derived seed and output resolution
    ///
    /// # Returns
    ///
    /// The wet frame (same dimensions as `frame`) and the state to carry into the next frame.
    fn apply(
        &self,
        frame: &Frame,
        params: &Params,
        state: Option<&EffectState>,
        ctx: &EffectContext,
    ) -> Result<(Frame, Option<EffectState>)>;
}

/// Per-invocation context handed to an effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectContext {
    pub frame_index: u64,
    /// Seed derived from project seed, effect id, frame index and user seed
    pub seed: u64,
    /// Output `(width, height)`
    pub resolution: (u32, u32),
}

/// Opaque state an effect carries from frame N to frame N+1
///
/// The pipeline never looks inside; it only stores whatever the effect returned under
/// the effect's id and hands it back on the next frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectState {
    /// A retained RGBA buffer, typically the previous output frame
    Buffer {
        width: u32,
        height: u32,
        data: Vec<u8>,
    },
}

impl EffectState {
    /// Snapshot a frame as buffer state
    pub fn from_frame(frame: &Frame) -> Self {
        Self::Buffer {
            width: frame.width(),
            height: frame.height(),
            data: frame.pixels().to_vec(),
        }
    }

    /// Rebuild the frame held by a `Buffer` state
    ///
    /// `None` when the stored bytes do not match the stored dimensions.
    pub fn to_frame(&self) -> Option<Frame> {
        match self {
            Self::Buffer { width, height, data } => {
                Frame::from_rgba_bytes(*width, *height, data.clone())
            }
        }
    }
}

/// Effect parameters
///
/// A string-keyed map of small scalar values. Effects read what they understand and
/// fall back to their defaults for anything missing or malformed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params {
    values: HashMap<String, ParamValue>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter value
    pub fn set<K: Into<String>, V: Into<ParamValue>>(mut self, key: K, value: V) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert<K: Into<String>, V: Into<ParamValue>>(&mut self, key: K, value: V) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.values.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Drop float values that are NaN or infinite
    pub fn retain_finite(&mut self) {
        self.values.retain(|_, v| match v {
            ParamValue::Float(f) => f.is_finite(),
            _ => true,
        });
    }

    /// Get a parameter value as a float
    pub fn get_f32(&self, key: &str) -> Option<f32> {
        self.values.get(key).and_then(|v| v.as_f32())
    }

    /// Get a parameter value as an integer
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(|v| v.as_i64())
    }

    /// Get a parameter value as a boolean
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(|v| v.as_bool())
    }

    /// Get a parameter value as a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }

    /// Get a parameter value with a default
    pub fn get_f32_or(&self, key: &str, default: f32) -> f32 {
        self.get_f32(key).unwrap_or(default)
    }

    /// Get a parameter value with a default
    pub fn get_i64_or(&self, key: &str, default: i64) -> i64 {
        self.get_i64(key).unwrap_or(default)
    }

    /// Get a parameter value with a default
    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }
}

/// Flexible parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f32),
    String(String),
    Mask(Arc<Mask>),
}

impl ParamValue {
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            ParamValue::Float(f) => Some(*f),
            ParamValue::Integer(i) => Some(*i as f32),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Integer(i) => Some(*i),
            ParamValue::Float(f) if f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    /// Booleans, plus the `"true"`/`"false"` strings choice params use
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            ParamValue::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
            ParamValue::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mask(&self) -> Option<&Arc<Mask>> {
        match self {
            ParamValue::Mask(m) => Some(m),
            _ => None,
        }
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Integer(i64::from(value))
    }
}

impl From<Mask> for ParamValue {
    fn from(value: Mask) -> Self {
        ParamValue::Mask(Arc::new(value))
    }
}

/// Value type of a user-facing parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Float,
    Int,
    Bool,
    Choice,
}

/// How a UI slider maps onto the parameter range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamCurve {
    #[default]
    Linear,
    Exponential,
    Logarithmic,
}

/// Schema entry for one user-facing parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub choices: Vec<String>,
    pub default: ParamValue,
    #[serde(default)]
    pub curve: ParamCurve,
    #[serde(default)]
    pub unit: String,
}

impl ParamSpec {
    /// A numeric parameter with a range
    pub fn range(name: &str, label: &str, kind: ParamKind, min: f32, max: f32, default: ParamValue) -> Self {
        Self {
            name: name.to_string(),
            kind,
            label: label.to_string(),
            min: Some(min),
            max: Some(max),
            choices: Vec::new(),
            default,
            curve: ParamCurve::Linear,
            unit: String::new(),
        }
    }

    /// A parameter picked from a fixed list of strings
    pub fn choice(name: &str, label: &str, choices: &[&str], default: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ParamKind::Choice,
            label: label.to_string(),
            min: None,
            max: None,
            choices: choices.iter().map(|c| c.to_string()).collect(),
            default: ParamValue::from(default),
            curve: ParamCurve::Linear,
            unit: String::new(),
        }
    }

    pub fn with_curve(mut self, curve: ParamCurve) -> Self {
        self.curve = curve;
        self
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = unit.to_string();
        self
    }
}

/// Registry listing entry for one effect
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectInfo {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}
