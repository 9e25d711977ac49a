//! Parameter definitions and the lock-free parameter store
//!
//! Every parameter is a `ParamId` with a static `ParamInfo` row. Values live
//! in `Params` as f32 bit patterns inside `AtomicU32`s: the control thread
//! writes, the audio thread reads a `ParamSnapshot` once per block.

use crate::error::EngineError;
use std::sync::atomic::{AtomicU32, Ordering};

/// Number of LFOs
pub const NUM_LFOS: usize = 4;

/// Number of modulation matrix slots
pub const NUM_MOD_SLOTS: usize = 4;

/// LFO shape choice labels (index order matches `LfoShape`)
pub const LFO_SHAPE_NAMES: &[&str] = &[
    "Sine", "Triangle", "Square", "Saw Up", "Saw Down", "Random",
];

/// Modulation source labels (0 = none, 1..=4 = LFO 1..4)
pub const MOD_SOURCE_NAMES: &[&str] = &["None", "LFO 1", "LFO 2", "LFO 3", "LFO 4"];

/// Modulation target labels (index order matches `ModTarget`)
pub const MOD_TARGET_NAMES: &[&str] = &[
    "None",
    "Ripple Rate",
    "Ripple Multiply",
    "Ripple Amount",
    "Ripple Width",
    "Ripple Low Bypass",
    "Ripple High Bypass",
    "Ripple Mix",
    "Reverb Size",
    "Reverb Damping",
    "Reverb Mix",
    "Freeze",
    "Smear",
    "Scatter",
    "Shift",
    "Tilt",
    "Feedback",
];

/// Processing core selection labels (index order matches `CoreMode`)
pub const CORE_MODE_NAMES: &[&str] = &["Spectral", "Ripple", "Both"];

/// How a parameter value is interpreted
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    /// Continuous float
    Float,
    /// 0.0 = off, 1.0 = on
    Toggle,
    /// Index into a label list
    Choice(&'static [&'static str]),
    /// Whole number
    Int,
}

/// Static description of one parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: ParamKind,
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ParamInfo {
    const fn float(id: &'static str, name: &'static str, min: f32, max: f32, default: f32) -> Self {
        Self {
            id,
            name,
            kind: ParamKind::Float,
            min,
            max,
            default,
        }
    }

    const fn toggle(id: &'static str, name: &'static str, default: bool) -> Self {
        Self {
            id,
            name,
            kind: ParamKind::Toggle,
            min: 0.0,
            max: 1.0,
            default: if default { 1.0 } else { 0.0 },
        }
    }

    const fn choice(
        id: &'static str,
        name: &'static str,
        labels: &'static [&'static str],
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            id,
            name,
            kind: ParamKind::Choice(labels),
            min: 0.0,
            max,
            default,
        }
    }

    const fn int(id: &'static str, name: &'static str, min: f32, max: f32, default: f32) -> Self {
        Self {
            id,
            name,
            kind: ParamKind::Int,
            min,
            max,
            default,
        }
    }

    /// Clamp (and for discrete kinds, round) a raw value into range
    pub fn sanitize(&self, value: f32) -> f32 {
        if !value.is_finite() {
            return self.default;
        }
        let clamped = value.clamp(self.min, self.max);
        match self.kind {
            ParamKind::Float => clamped,
            ParamKind::Toggle => {
                if clamped >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            ParamKind::Choice(_) | ParamKind::Int => clamped.round(),
        }
    }

    /// Render a value for display
    pub fn format(&self, value: f32) -> String {
        match self.kind {
            ParamKind::Float => format!("{:.3}", value),
            ParamKind::Toggle => if value >= 0.5 { "on" } else { "off" }.to_string(),
            ParamKind::Choice(labels) => labels
                .get(value.max(0.0) as usize)
                .copied()
                .unwrap_or("?")
                .to_string(),
            ParamKind::Int => format!("{}", value as i64),
        }
    }
}

/// Every parameter the engine exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum ParamId {
    // Spectral core
    Freeze,
    Smear,
    Scatter,
    Shift,
    Tilt,
    Feedback,
    // Ripple filter bank
    RippleRate,
    RippleMultiply,
    RippleAmount,
    RippleWidth,
    RippleLowBypass,
    RippleHighBypass,
    RippleMix,
    // Reverb
    ReverbEnabled,
    ReverbSize,
    ReverbDamping,
    ReverbMix,
    // LFOs
    Lfo1Rate,
    Lfo1Shape,
    Lfo1Phase,
    Lfo2Rate,
    Lfo2Shape,
    Lfo2Phase,
    Lfo3Rate,
    Lfo3Shape,
    Lfo3Phase,
    Lfo4Rate,
    Lfo4Shape,
    Lfo4Phase,
    // Modulation matrix
    Mod1Source,
    Mod1Target,
    Mod1Depth,
    Mod2Source,
    Mod2Target,
    Mod2Depth,
    Mod3Source,
    Mod3Target,
    Mod3Depth,
    Mod4Source,
    Mod4Target,
    Mod4Depth,
    // Global
    Core,
    Bypass,
    InputGain,
    OutputGain,
    RandomSeed,
}

/// Total number of parameters
pub const PARAM_COUNT: usize = 46;

/// Parameter table, in `ParamId` order
static PARAM_INFOS: [ParamInfo; PARAM_COUNT] = [
    ParamInfo::float("freeze", "Freeze", 0.0, 1.0, 0.0),
    ParamInfo::float("smear", "Sustain", 0.0, 1.0, 0.0),
    ParamInfo::float("scatter", "Diffuse", 0.0, 1.0, 0.0),
    ParamInfo::float("shift", "Shift", -1.0, 1.0, 0.0),
    ParamInfo::float("tilt", "Tilt", -1.0, 1.0, 0.0),
    ParamInfo::float("feedback", "Feedback", 0.0, 1.0, 0.0),
    ParamInfo::float("ripple_rate", "Ripple Rate", 0.01, 20.0, 0.5),
    ParamInfo::float("ripple_multiply", "Ripple Multiply", 0.1, 8.0, 1.0),
    ParamInfo::float("ripple_amount", "Ripple Amount", 0.0, 1.0, 0.5),
    ParamInfo::float("ripple_width", "Ripple Width", 0.0, 2.0, 1.0),
    ParamInfo::float("ripple_low_bypass", "Ripple Low Bypass", 20.0, 20000.0, 20.0),
    ParamInfo::float("ripple_high_bypass", "Ripple High Bypass", 20.0, 20000.0, 20000.0),
    ParamInfo::float("ripple_mix", "Ripple Mix", 0.0, 1.0, 1.0),
    ParamInfo::toggle("reverb_enabled", "Reverb", false),
    ParamInfo::float("reverb_size", "Reverb Size", 0.0, 1.0, 0.5),
    ParamInfo::float("reverb_damping", "Reverb Damping", 0.0, 1.0, 0.5),
    ParamInfo::float("reverb_mix", "Reverb Mix", 0.0, 1.0, 0.3),
    ParamInfo::float("lfo1_rate", "LFO 1 Rate", 0.01, 20.0, 1.0),
    ParamInfo::choice("lfo1_shape", "LFO 1 Shape", LFO_SHAPE_NAMES, 5.0, 0.0),
    ParamInfo::float("lfo1_phase", "LFO 1 Phase", 0.0, 1.0, 0.0),
    ParamInfo::float("lfo2_rate", "LFO 2 Rate", 0.01, 20.0, 1.0),
    ParamInfo::choice("lfo2_shape", "LFO 2 Shape", LFO_SHAPE_NAMES, 5.0, 0.0),
    ParamInfo::float("lfo2_phase", "LFO 2 Phase", 0.0, 1.0, 0.0),
    ParamInfo::float("lfo3_rate", "LFO 3 Rate", 0.01, 20.0, 1.0),
    ParamInfo::choice("lfo3_shape", "LFO 3 Shape", LFO_SHAPE_NAMES, 5.0, 0.0),
    ParamInfo::float("lfo3_phase", "LFO 3 Phase", 0.0, 1.0, 0.0),
    ParamInfo::float("lfo4_rate", "LFO 4 Rate", 0.01, 20.0, 1.0),
    ParamInfo::choice("lfo4_shape", "LFO 4 Shape", LFO_SHAPE_NAMES, 5.0, 0.0),
    ParamInfo::float("lfo4_phase", "LFO 4 Phase", 0.0, 1.0, 0.0),
    ParamInfo::choice("mod1_source", "Mod 1 Source", MOD_SOURCE_NAMES, 4.0, 0.0),
    ParamInfo::choice("mod1_target", "Mod 1 Target", MOD_TARGET_NAMES, 16.0, 0.0),
    ParamInfo::float("mod1_depth", "Mod 1 Depth", -1.0, 1.0, 0.0),
    ParamInfo::choice("mod2_source", "Mod 2 Source", MOD_SOURCE_NAMES, 4.0, 0.0),
    ParamInfo::choice("mod2_target", "Mod 2 Target", MOD_TARGET_NAMES, 16.0, 0.0),
    ParamInfo::float("mod2_depth", "Mod 2 Depth", -1.0, 1.0, 0.0),
    ParamInfo::choice("mod3_source", "Mod 3 Source", MOD_SOURCE_NAMES, 4.0, 0.0),
    ParamInfo::choice("mod3_target", "Mod 3 Target", MOD_TARGET_NAMES, 16.0, 0.0),
    ParamInfo::float("mod3_depth", "Mod 3 Depth", -1.0, 1.0, 0.0),
    ParamInfo::choice("mod4_source", "Mod 4 Source", MOD_SOURCE_NAMES, 4.0, 0.0),
    ParamInfo::choice("mod4_target", "Mod 4 Target", MOD_TARGET_NAMES, 16.0, 0.0),
    ParamInfo::float("mod4_depth", "Mod 4 Depth", -1.0, 1.0, 0.0),
    ParamInfo::choice("core", "Core", CORE_MODE_NAMES, 2.0, 1.0),
    ParamInfo::toggle("bypass", "Bypass", false),
    ParamInfo::float("input_gain", "Input Gain", -24.0, 24.0, 0.0),
    ParamInfo::float("output_gain", "Output Gain", -24.0, 24.0, 0.0),
    ParamInfo::int("random_seed", "Random Seed", 0.0, 65535.0, 0.0),
];

impl ParamId {
    /// All parameters in declaration order
    pub const ALL: [ParamId; PARAM_COUNT] = [
        ParamId::Freeze,
        ParamId::Smear,
        ParamId::Scatter,
        ParamId::Shift,
        ParamId::Tilt,
        ParamId::Feedback,
        ParamId::RippleRate,
        ParamId::RippleMultiply,
        ParamId::RippleAmount,
        ParamId::RippleWidth,
        ParamId::RippleLowBypass,
        ParamId::RippleHighBypass,
        ParamId::RippleMix,
        ParamId::ReverbEnabled,
        ParamId::ReverbSize,
        ParamId::ReverbDamping,
        ParamId::ReverbMix,
        ParamId::Lfo1Rate,
        ParamId::Lfo1Shape,
        ParamId::Lfo1Phase,
        ParamId::Lfo2Rate,
        ParamId::Lfo2Shape,
        ParamId::Lfo2Phase,
        ParamId::Lfo3Rate,
        ParamId::Lfo3Shape,
        ParamId::Lfo3Phase,
        ParamId::Lfo4Rate,
        ParamId::Lfo4Shape,
        ParamId::Lfo4Phase,
        ParamId::Mod1Source,
        ParamId::Mod1Target,
        ParamId::Mod1Depth,
        ParamId::Mod2Source,
        ParamId::Mod2Target,
        ParamId::Mod2Depth,
        ParamId::Mod3Source,
        ParamId::Mod3Target,
        ParamId::Mod3Depth,
        ParamId::Mod4Source,
        ParamId::Mod4Target,
        ParamId::Mod4Depth,
        ParamId::Core,
        ParamId::Bypass,
        ParamId::InputGain,
        ParamId::OutputGain,
        ParamId::RandomSeed,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn info(self) -> &'static ParamInfo {
        &PARAM_INFOS[self.index()]
    }

    #[inline]
    pub fn id(self) -> &'static str {
        self.info().id
    }

    /// Look up a parameter by its string id
    pub fn from_id(id: &str) -> Result<Self, EngineError> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.id() == id)
            .ok_or_else(|| EngineError::UnknownParameter(id.to_string()))
    }
}

/// Parameter handles for one LFO
#[derive(Debug, Clone, Copy)]
pub struct LfoParamIds {
    pub rate: ParamId,
    pub shape: ParamId,
    pub phase: ParamId,
}

/// Parameter handles for one modulation slot
#[derive(Debug, Clone, Copy)]
pub struct ModSlotParamIds {
    pub source: ParamId,
    pub target: ParamId,
    pub depth: ParamId,
}

/// LFO index -> parameter handles
pub const LFO_PARAMS: [LfoParamIds; NUM_LFOS] = [
    LfoParamIds {
        rate: ParamId::Lfo1Rate,
        shape: ParamId::Lfo1Shape,
        phase: ParamId::Lfo1Phase,
    },
    LfoParamIds {
        rate: ParamId::Lfo2Rate,
        shape: ParamId::Lfo2Shape,
        phase: ParamId::Lfo2Phase,
    },
    LfoParamIds {
        rate: ParamId::Lfo3Rate,
        shape: ParamId::Lfo3Shape,
        phase: ParamId::Lfo3Phase,
    },
    LfoParamIds {
        rate: ParamId::Lfo4Rate,
        shape: ParamId::Lfo4Shape,
        phase: ParamId::Lfo4Phase,
    },
];

/// Modulation slot index -> parameter handles
pub const MOD_SLOT_PARAMS: [ModSlotParamIds; NUM_MOD_SLOTS] = [
    ModSlotParamIds {
        source: ParamId::Mod1Source,
        target: ParamId::Mod1Target,
        depth: ParamId::Mod1Depth,
    },
    ModSlotParamIds {
        source: ParamId::Mod2Source,
        target: ParamId::Mod2Target,
        depth: ParamId::Mod2Depth,
    },
    ModSlotParamIds {
        source: ParamId::Mod3Source,
        target: ParamId::Mod3Target,
        depth: ParamId::Mod3Depth,
    },
    ModSlotParamIds {
        source: ParamId::Mod4Source,
        target: ParamId::Mod4Target,
        depth: ParamId::Mod4Depth,
    },
];

/// Which processing core(s) run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoreMode {
    /// FFT freeze/smear/scatter/shift/tilt/feedback
    Spectral,
    /// Ripple filter bank followed by the FDN reverb
    #[default]
    Ripple,
    /// Spectral core feeding the ripple bank and reverb
    Both,
}

impl CoreMode {
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => CoreMode::Spectral,
            2 => CoreMode::Both,
            _ => CoreMode::Ripple,
        }
    }

    #[inline]
    pub fn runs_spectral(self) -> bool {
        matches!(self, CoreMode::Spectral | CoreMode::Both)
    }

    #[inline]
    pub fn runs_ripple(self) -> bool {
        matches!(self, CoreMode::Ripple | CoreMode::Both)
    }
}

/// Plain copy of every parameter value, taken once per block
#[derive(Debug, Clone, Copy)]
pub struct ParamSnapshot {
    values: [f32; PARAM_COUNT],
}

impl ParamSnapshot {
    /// Snapshot holding every default value
    pub fn defaults() -> Self {
        Self {
            values: std::array::from_fn(|i| PARAM_INFOS[i].default),
        }
    }

    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        self.values[id.index()]
    }

    /// Overwrite a value, clamped into the parameter's range
    #[inline]
    pub fn set(&mut self, id: ParamId, value: f32) {
        self.values[id.index()] = id.info().sanitize(value);
    }

    #[inline]
    pub fn get_bool(&self, id: ParamId) -> bool {
        self.get(id) >= 0.5
    }

    #[inline]
    pub fn get_index(&self, id: ParamId) -> usize {
        self.get(id).max(0.0).round() as usize
    }

    pub fn core_mode(&self) -> CoreMode {
        CoreMode::from_index(self.get_index(ParamId::Core))
    }
}

impl Default for ParamSnapshot {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Shared parameter store
///
/// Single writer (control thread), many readers. Loads and stores are
/// `Relaxed`: each value is independent and the audio thread only needs a
/// tear-free read of the latest write.
pub struct Params {
    values: [AtomicU32; PARAM_COUNT],
}

impl Params {
    pub fn new() -> Self {
        Self {
            values: std::array::from_fn(|i| AtomicU32::new(PARAM_INFOS[i].default.to_bits())),
        }
    }

    /// Store a value, clamped into range
    pub fn set(&self, id: ParamId, value: f32) {
        let value = id.info().sanitize(value);
        self.values[id.index()].store(value.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        f32::from_bits(self.values[id.index()].load(Ordering::Relaxed))
    }

    /// Set a parameter by string id
    pub fn set_by_id(&self, id: &str, value: f32) -> Result<ParamId, EngineError> {
        let param = ParamId::from_id(id)?;
        self.set(param, value);
        Ok(param)
    }

    /// Restore every parameter to its default
    pub fn reset_to_defaults(&self) {
        for id in ParamId::ALL {
            self.set(id, id.info().default);
        }
    }

    /// Read every value once
    pub fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            values: std::array::from_fn(|i| f32::from_bits(self.values[i].load(Ordering::Relaxed))),
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_table_order_matches_enum() {
        for (i, id) in ParamId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i, "{:?} out of order", id);
        }
    }

    #[test]
    fn test_param_ids_unique() {
        for (i, a) in ParamId::ALL.iter().enumerate() {
            for b in &ParamId::ALL[i + 1..] {
                assert_ne!(a.id(), b.id());
            }
        }
    }

    #[test]
    fn test_defaults_within_range() {
        for id in ParamId::ALL {
            let info = id.info();
            assert!(info.min <= info.default && info.default <= info.max, "{}", info.id);
        }
    }

    #[test]
    fn test_choice_ranges_match_labels() {
        for id in ParamId::ALL {
            let info = id.info();
            if let ParamKind::Choice(labels) = info.kind {
                assert_eq!(info.max as usize, labels.len() - 1, "{}", info.id);
            }
        }
    }

    #[test]
    fn test_from_id_lookup() {
        assert_eq!(ParamId::from_id("ripple_mix").unwrap(), ParamId::RippleMix);
        assert_eq!(ParamId::from_id("lfo3_shape").unwrap(), ParamId::Lfo3Shape);
        assert!(matches!(
            ParamId::from_id("nope"),
            Err(EngineError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_set_clamps_and_rounds() {
        let params = Params::new();
        params.set(ParamId::Freeze, 3.0);
        assert_eq!(params.get(ParamId::Freeze), 1.0);

        params.set(ParamId::Shift, -5.0);
        assert_eq!(params.get(ParamId::Shift), -1.0);

        params.set(ParamId::Lfo1Shape, 2.6);
        assert_eq!(params.get(ParamId::Lfo1Shape), 3.0);

        params.set(ParamId::Bypass, 0.7);
        assert_eq!(params.get(ParamId::Bypass), 1.0);

        params.set(ParamId::RippleMix, f32::NAN);
        assert_eq!(params.get(ParamId::RippleMix), 1.0);
    }

    #[test]
    fn test_snapshot_reflects_writes() {
        let params = Params::new();
        params.set(ParamId::ReverbSize, 0.8);
        params.set(ParamId::Core, 2.0);
        let snap = params.snapshot();
        assert_eq!(snap.get(ParamId::ReverbSize), 0.8);
        assert_eq!(snap.core_mode(), CoreMode::Both);

        params.reset_to_defaults();
        assert_eq!(params.snapshot().core_mode(), CoreMode::Ripple);
    }

    #[test]
    fn test_slot_tables_point_at_matching_params() {
        for (i, lfo) in LFO_PARAMS.iter().enumerate() {
            assert_eq!(lfo.rate.id(), format!("lfo{}_rate", i + 1));
            assert_eq!(lfo.shape.id(), format!("lfo{}_shape", i + 1));
            assert_eq!(lfo.phase.id(), format!("lfo{}_phase", i + 1));
        }
        for (i, slot) in MOD_SLOT_PARAMS.iter().enumerate() {
            assert_eq!(slot.source.id(), format!("mod{}_source", i + 1));
            assert_eq!(slot.target.id(), format!("mod{}_target", i + 1));
            assert_eq!(slot.depth.id(), format!("mod{}_depth", i + 1));
        }
    }
}
