//! Versioned parameter snapshot in plain `key=value` text
//!
//! ```text
//! # Ripple state
//! version=3
//! freeze=0.000
//! lfo1_shape=2
//! ```
//!
//! Loading never fails: unknown keys are skipped, missing keys keep their
//! defaults, unparseable values fall back to the default, and any version
//! number is accepted.

use crate::error::EngineError;
use crate::params::{ParamId, ParamKind, ParamSnapshot, Params};
use tracing::{debug, warn};

/// Version written by `serialize_state`
pub const STATE_VERSION: u32 = 3;

/// Outcome of a load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    /// Version found in the text, if any
    pub version: Option<u32>,
    /// Parameters set from the text
    pub applied: usize,
    /// Unknown keys and non `key=value` lines
    pub skipped: usize,
    /// Parameters left at their default (missing or malformed)
    pub defaulted: usize,
}

impl LoadReport {
    pub fn is_current_version(&self) -> bool {
        self.version == Some(STATE_VERSION)
    }
}

/// Parse a user-supplied value for `id`
///
/// Numbers are accepted for every kind. Toggles also take `on`/`off`,
/// `true`/`false`, `yes`/`no`; choices take their label, case-insensitively.
pub fn parse_value(id: ParamId, text: &str) -> Result<f32, EngineError> {
    let info = id.info();
    let text = text.trim();
    let invalid = || EngineError::InvalidValue {
        id: info.id,
        value: text.to_string(),
    };

    if let Ok(v) = text.parse::<f32>() {
        if !v.is_finite() {
            return Err(invalid());
        }
        return Ok(info.sanitize(v));
    }

    match info.kind {
        ParamKind::Toggle => match text.to_ascii_lowercase().as_str() {
            "on" | "true" | "yes" => Ok(1.0),
            "off" | "false" | "no" => Ok(0.0),
            _ => Err(invalid()),
        },
        ParamKind::Choice(labels) => labels
            .iter()
            .position(|l| l.eq_ignore_ascii_case(text))
            .map(|i| i as f32)
            .ok_or_else(invalid),
        ParamKind::Float | ParamKind::Int => Err(invalid()),
    }
}

/// Render every parameter, preceded by the version line
pub fn serialize_state(snapshot: &ParamSnapshot) -> String {
    let mut lines = Vec::with_capacity(ParamId::ALL.len() + 2);
    lines.push("# Ripple state".to_string());
    lines.push(format!("version={}", STATE_VERSION));

    for id in ParamId::ALL {
        let value = snapshot.get(id);
        let line = match id.info().kind {
            ParamKind::Float => format!("{}={:.6}", id.id(), value),
            ParamKind::Toggle | ParamKind::Choice(_) | ParamKind::Int => {
                format!("{}={}", id.id(), value.round() as i64)
            }
        };
        lines.push(line);
    }

    lines.join("\n")
}

/// Parse a snapshot; everything not present stays at its default
pub fn parse_state(content: &str) -> (ParamSnapshot, LoadReport) {
    let mut snapshot = ParamSnapshot::defaults();
    let mut report = LoadReport::default();
    let mut seen = [false; ParamId::ALL.len()];

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            report.skipped += 1;
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        if key == "version" {
            match value.parse::<u32>() {
                Ok(v) => report.version = Some(v),
                Err(_) => warn!(value, "Unreadable state version"),
            }
            continue;
        }

        let Ok(id) = ParamId::from_id(key) else {
            debug!(key, "Skipping unknown state key");
            report.skipped += 1;
            continue;
        };

        match parse_value(id, value) {
            Ok(v) => {
                snapshot.set(id, v);
                if !seen[id.index()] {
                    seen[id.index()] = true;
                    report.applied += 1;
                }
            }
            Err(e) => warn!("{}; keeping default", e),
        }
    }

    report.defaulted = seen.iter().filter(|&&s| !s).count();

    if !report.is_current_version() {
        warn!(
            found = ?report.version,
            expected = STATE_VERSION,
            "State version differs; unknown fields use defaults"
        );
    }

    (snapshot, report)
}

/// Parse `content` and store every value (defaults included) into `params`
pub fn load_into(params: &Params, content: &str) -> LoadReport {
    let (snapshot, report) = parse_state(content);
    for id in ParamId::ALL {
        params.set(id, snapshot.get(id));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        let (snap, report) = parse_state("");
        assert_eq!(report.version, None);
        assert_eq!(report.applied, 0);
        assert_eq!(report.defaulted, ParamId::ALL.len());
        assert_eq!(snap.get(ParamId::ReverbMix), 0.3);
    }

    #[test]
    fn test_serialize_then_parse_restores_values() {
        let mut snap = ParamSnapshot::defaults();
        snap.set(ParamId::Freeze, 0.75);
        snap.set(ParamId::Lfo3Shape, 4.0);
        snap.set(ParamId::ReverbEnabled, 1.0);
        snap.set(ParamId::RandomSeed, 1234.0);

        let text = serialize_state(&snap);
        let (restored, report) = parse_state(&text);

        assert!(report.is_current_version());
        assert_eq!(report.applied, ParamId::ALL.len());
        assert_eq!(report.skipped, 0);
        assert_eq!(report.defaulted, 0);
        for id in ParamId::ALL {
            assert!((restored.get(id) - snap.get(id)).abs() < 1e-5, "{:?}", id);
        }
    }

    #[test]
    fn test_other_version_is_tolerated() {
        let text = "version=1\nfreeze=0.5\nspectral_blur=0.9\nnot a pair\n";
        let (snap, report) = parse_state(text);
        assert_eq!(report.version, Some(1));
        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.defaulted, ParamId::ALL.len() - 1);
        assert_eq!(snap.get(ParamId::Freeze), 0.5);
    }

    #[test]
    fn test_malformed_value_uses_default() {
        let text = "version=3\nripple_rate=fast\nreverb_size=0.9";
        let (snap, report) = parse_state(text);
        assert_eq!(snap.get(ParamId::RippleRate), 0.5);
        assert_eq!(snap.get(ParamId::ReverbSize), 0.9);
        assert_eq!(report.applied, 1);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let (snap, _) = parse_state("ripple_mix=7\nshift=-3\nlfo1_shape=99");
        assert_eq!(snap.get(ParamId::RippleMix), 1.0);
        assert_eq!(snap.get(ParamId::Shift), -1.0);
        assert_eq!(snap.get(ParamId::Lfo1Shape), 5.0);
    }

    #[test]
    fn test_parse_value_words() {
        assert_eq!(parse_value(ParamId::Bypass, "on"), Ok(1.0));
        assert_eq!(parse_value(ParamId::ReverbEnabled, "OFF"), Ok(0.0));
        assert_eq!(parse_value(ParamId::Lfo2Shape, "saw down"), Ok(4.0));
        assert_eq!(parse_value(ParamId::Core, "both"), Ok(2.0));
        assert_eq!(parse_value(ParamId::Mod1Target, "Shift"), Ok(14.0));
        assert!(matches!(
            parse_value(ParamId::Freeze, "lots"),
            Err(EngineError::InvalidValue { id: "freeze", .. })
        ));
        assert!(parse_value(ParamId::Freeze, "NaN").is_err());
    }

    #[test]
    fn test_load_into_resets_missing_params() {
        let params = Params::new();
        params.set(ParamId::Smear, 0.8);
        let report = load_into(&params, "version=3\nfreeze=0.2");
        assert_eq!(report.applied, 1);
        assert_eq!(params.get(ParamId::Freeze), 0.2);
        assert_eq!(params.get(ParamId::Smear), 0.0);
    }
}
