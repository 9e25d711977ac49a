//! Four-slot modulation matrix
//!
//! Each slot routes one LFO (bipolar) scaled by a depth to one target.
//! A target's resolved value is `base + Σ depth · lfo · base` over every slot
//! aimed at it, clamped to the target's range. A base of zero therefore
//! stays at zero.

use crate::params::{
    ParamId, ParamSnapshot, MOD_SLOT_PARAMS, MOD_TARGET_NAMES, NUM_LFOS, NUM_MOD_SLOTS,
};

/// Modulation destinations, in label order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModTarget {
    #[default]
    None,
    RippleRate,
    RippleMultiply,
    RippleAmount,
    RippleWidth,
    RippleLowBypass,
    RippleHighBypass,
    RippleMix,
    ReverbSize,
    ReverbDamping,
    ReverbMix,
    Freeze,
    Smear,
    Scatter,
    Shift,
    Tilt,
    Feedback,
}

impl ModTarget {
    /// Every real target (excludes `None`)
    pub const ALL: [ModTarget; 16] = [
        ModTarget::RippleRate,
        ModTarget::RippleMultiply,
        ModTarget::RippleAmount,
        ModTarget::RippleWidth,
        ModTarget::RippleLowBypass,
        ModTarget::RippleHighBypass,
        ModTarget::RippleMix,
        ModTarget::ReverbSize,
        ModTarget::ReverbDamping,
        ModTarget::ReverbMix,
        ModTarget::Freeze,
        ModTarget::Smear,
        ModTarget::Scatter,
        ModTarget::Shift,
        ModTarget::Tilt,
        ModTarget::Feedback,
    ];

    pub fn from_index(index: usize) -> Self {
        if index == 0 {
            return ModTarget::None;
        }
        Self::ALL.get(index - 1).copied().unwrap_or(ModTarget::None)
    }

    pub fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|&t| t == self)
            .map_or(0, |i| i + 1)
    }

    pub fn label(self) -> &'static str {
        MOD_TARGET_NAMES.get(self.index()).copied().unwrap_or("None")
    }

    /// Parameter this target modulates
    pub fn param(self) -> Option<ParamId> {
        let id = match self {
            ModTarget::None => return None,
            ModTarget::RippleRate => ParamId::RippleRate,
            ModTarget::RippleMultiply => ParamId::RippleMultiply,
            ModTarget::RippleAmount => ParamId::RippleAmount,
            ModTarget::RippleWidth => ParamId::RippleWidth,
            ModTarget::RippleLowBypass => ParamId::RippleLowBypass,
            ModTarget::RippleHighBypass => ParamId::RippleHighBypass,
            ModTarget::RippleMix => ParamId::RippleMix,
            ModTarget::ReverbSize => ParamId::ReverbSize,
            ModTarget::ReverbDamping => ParamId::ReverbDamping,
            ModTarget::ReverbMix => ParamId::ReverbMix,
            ModTarget::Freeze => ParamId::Freeze,
            ModTarget::Smear => ParamId::Smear,
            ModTarget::Scatter => ParamId::Scatter,
            ModTarget::Shift => ParamId::Shift,
            ModTarget::Tilt => ParamId::Tilt,
            ModTarget::Feedback => ParamId::Feedback,
        };
        Some(id)
    }
}

/// One routing: LFO `source` → `target` at `depth`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModSlot {
    /// LFO index, `None` when the slot is off
    pub source: Option<usize>,
    pub target: ModTarget,
    /// -1..1
    pub depth: f32,
}

impl ModSlot {
    #[inline]
    fn is_active(&self) -> bool {
        self.source.is_some() && self.target != ModTarget::None && self.depth != 0.0
    }
}

/// The slot table, refreshed once per block
#[derive(Debug, Clone, Default)]
pub struct ModMatrix {
    slots: [ModSlot; NUM_MOD_SLOTS],
}

impl ModMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read slot routings from the snapshot
    pub fn update(&mut self, snapshot: &ParamSnapshot) {
        for (slot, ids) in self.slots.iter_mut().zip(MOD_SLOT_PARAMS.iter()) {
            let source = snapshot.get_index(ids.source);
            slot.source = (1..=NUM_LFOS).contains(&source).then(|| source - 1);
            slot.target = ModTarget::from_index(snapshot.get_index(ids.target));
            slot.depth = snapshot.get(ids.depth).clamp(-1.0, 1.0);
        }
    }

    pub fn set_slot(&mut self, index: usize, slot: ModSlot) {
        if let Some(s) = self.slots.get_mut(index) {
            *s = slot;
        }
    }

    pub fn slots(&self) -> &[ModSlot; NUM_MOD_SLOTS] {
        &self.slots
    }

    /// Sum of `depth · lfo` over every slot aimed at `target`
    pub fn modulation_for(&self, target: ModTarget, lfo_bipolar: &[f32; NUM_LFOS]) -> f32 {
        self.slots
            .iter()
            .filter(|s| s.is_active() && s.target == target)
            .filter_map(|s| s.source.and_then(|i| lfo_bipolar.get(i)).map(|v| s.depth * v))
            .sum()
    }

    /// Modulated value of `target` around `base`, clamped to the parameter range
    pub fn resolve(&self, target: ModTarget, base: f32, lfo_bipolar: &[f32; NUM_LFOS]) -> f32 {
        let Some(param) = target.param() else {
            return base;
        };
        let amount = self.modulation_for(target, lfo_bipolar);
        let info = param.info();
        (base + amount * base).clamp(info.min, info.max)
    }

    /// Copy of `base` with every modulated target resolved
    pub fn apply(&self, base: &ParamSnapshot, lfo_bipolar: &[f32; NUM_LFOS]) -> ParamSnapshot {
        let mut resolved = *base;
        for slot in self.slots.iter().filter(|s| s.is_active()) {
            if let Some(param) = slot.target.param() {
                let value = self.resolve(slot.target, base.get(param), lfo_bipolar);
                resolved.set(param, value);
            }
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_indices_match_labels() {
        assert_eq!(MOD_TARGET_NAMES.len(), ModTarget::ALL.len() + 1);
        assert_eq!(ModTarget::from_index(0), ModTarget::None);
        for (i, t) in ModTarget::ALL.iter().enumerate() {
            assert_eq!(ModTarget::from_index(i + 1), *t);
            assert_eq!(t.index(), i + 1);
            assert!(t.param().is_some());
        }
        assert_eq!(ModTarget::Shift.label(), "Shift");
        assert_eq!(ModTarget::from_index(500), ModTarget::None);
    }

    #[test]
    fn test_two_slots_add() {
        let mut matrix = ModMatrix::new();
        let lfo = [0.5, -0.25, 0.0, 1.0];
        let a = ModSlot {
            source: Some(0),
            target: ModTarget::ReverbSize,
            depth: 0.4,
        };
        let b = ModSlot {
            source: Some(1),
            target: ModTarget::ReverbSize,
            depth: 0.8,
        };

        matrix.set_slot(0, a);
        let only_a = matrix.modulation_for(ModTarget::ReverbSize, &lfo);
        matrix.set_slot(0, ModSlot::default());
        matrix.set_slot(1, b);
        let only_b = matrix.modulation_for(ModTarget::ReverbSize, &lfo);
        matrix.set_slot(0, a);
        let both = matrix.modulation_for(ModTarget::ReverbSize, &lfo);

        assert!((both - (only_a + only_b)).abs() < 1e-6);
        assert!((only_a - 0.2).abs() < 1e-6);
        assert!((only_b + 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_resolve_scales_with_base_and_clamps() {
        let mut matrix = ModMatrix::new();
        matrix.set_slot(
            2,
            ModSlot {
                source: Some(3),
                target: ModTarget::RippleMix,
                depth: 1.0,
            },
        );
        let lfo = [0.0, 0.0, 0.0, 0.5];
        // 0.4 + 0.5 * 0.4
        assert!((matrix.resolve(ModTarget::RippleMix, 0.4, &lfo) - 0.6).abs() < 1e-6);
        // 0.9 * 1.5 clamps to 1
        assert_eq!(matrix.resolve(ModTarget::RippleMix, 0.9, &lfo), 1.0);
        // Zero base is unaffected
        assert_eq!(matrix.resolve(ModTarget::RippleMix, 0.0, &lfo), 0.0);
        // Unrouted targets pass through
        assert_eq!(matrix.resolve(ModTarget::ReverbMix, 0.3, &lfo), 0.3);
    }

    #[test]
    fn test_update_reads_slot_params() {
        let mut snap = ParamSnapshot::defaults();
        snap.set(ParamId::Mod2Source, 3.0);
        snap.set(ParamId::Mod2Target, ModTarget::Tilt.index() as f32);
        snap.set(ParamId::Mod2Depth, -0.5);

        let mut matrix = ModMatrix::new();
        matrix.update(&snap);
        let slot = matrix.slots()[1];
        assert_eq!(slot.source, Some(2));
        assert_eq!(slot.target, ModTarget::Tilt);
        assert_eq!(slot.depth, -0.5);
        assert_eq!(matrix.slots()[0].source, None);
    }

    #[test]
    fn test_apply_only_touches_targets() {
        let mut base = ParamSnapshot::defaults();
        base.set(ParamId::Shift, 0.5);
        let mut matrix = ModMatrix::new();
        matrix.set_slot(
            0,
            ModSlot {
                source: Some(0),
                target: ModTarget::Shift,
                depth: 1.0,
            },
        );
        let resolved = matrix.apply(&base, &[-0.5, 0.0, 0.0, 0.0]);
        assert!((resolved.get(ParamId::Shift) - 0.25).abs() < 1e-6);
        assert_eq!(resolved.get(ParamId::ReverbSize), base.get(ParamId::ReverbSize));
    }
}
