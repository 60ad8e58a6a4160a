//! Engine configuration.
//!
//! Read from an s-expression plist file, for example:
//!
//! ```text
//! (:pinch-threshold 0.35 :tap-cooldown-ms 260 :min-scale 0.3 :max-scale 3.0)
//! ```
//!
//! Unknown keys are ignored.  The same keys are accepted at runtime by the
//! replay `:config` message.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use lexpr::Value;
use tracing::warn;

use crate::hand::classifier::GestureConfig;
use crate::ipc::sexp::{get_bool, get_float, get_int, sexp_bool};
use crate::manipulation::ManipulationConfig;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    pub gesture: GestureConfig,
    pub manipulation: ManipulationConfig,
}

impl EngineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let value = lexpr::from_str(text).context("malformed s-expression")?;
        let mut config = Self::default();
        config.apply_plist(&value);
        Ok(config)
    }

    /// Apply recognized keys from a plist.  Returns how many were applied;
    /// out-of-range values are skipped with a warning.
    pub fn apply_plist(&mut self, value: &Value) -> usize {
        let mut applied = 0;
        let g = &mut self.gesture;
        let m = &mut self.manipulation;

        if let Some(b) = get_bool(value, "enabled") {
            g.enabled = b;
            applied += 1;
        }

        let mut float = |key: &str, min: f64, slot: &mut dyn FnMut(f64)| {
            if let Some(v) = get_float(value, key) {
                if v.is_finite() && v >= min {
                    slot(v);
                    applied += 1;
                } else {
                    warn!("Ignoring {} = {}: below {}", key, v, min);
                }
            }
        };

        float("pinch-threshold", 0.0, &mut |v| g.pinch_threshold = v as f32);
        float("pinch-strength-range", 1e-6, &mut |v| g.pinch_strength_range = v as f32);
        float("two-finger-threshold", 0.0, &mut |v| g.two_finger_threshold = v as f32);
        float("hand-scale-epsilon", 1e-9, &mut |v| g.hand_scale_epsilon = v as f32);
        float("tap-max-interval-ms", 0.0, &mut |v| g.tap_max_interval_ms = v);
        float("tap-cooldown-ms", 0.0, &mut |v| g.tap_cooldown_ms = v);
        float("move-lerp", 0.0, &mut |v| m.move_lerp = (v as f32).min(1.0));
        float("rotate-slerp", 0.0, &mut |v| m.rotate_slerp = (v as f32).min(1.0));
        float("min-scale", 1e-6, &mut |v| m.min_scale = v as f32);
        float("max-scale", 1e-6, &mut |v| m.max_scale = v as f32);

        if let Some(n) = get_int(value, "history-capacity") {
            // Tap detection needs the last two samples.
            if n >= 2 {
                g.history_capacity = n as usize;
                applied += 1;
            } else {
                warn!("Ignoring history-capacity = {}: below 2", n);
            }
        }

        if m.min_scale > m.max_scale {
            warn!(
                "min-scale {} exceeds max-scale {}; swapping",
                m.min_scale, m.max_scale
            );
            std::mem::swap(&mut m.min_scale, &mut m.max_scale);
        }

        applied
    }

    /// Generate s-expression for IPC config.
    pub fn config_sexp(&self) -> String {
        let g = &self.gesture;
        let m = &self.manipulation;
        format!(
            "(:enabled {} :pinch-threshold {:.3} :pinch-strength-range {:.3} :two-finger-threshold {:.3} :hand-scale-epsilon {:.4} :tap-max-interval-ms {:.0} :tap-cooldown-ms {:.0} :history-capacity {} :move-lerp {:.3} :rotate-slerp {:.3} :min-scale {:.3} :max-scale {:.3})",
            sexp_bool(g.enabled),
            g.pinch_threshold,
            g.pinch_strength_range,
            g.two_finger_threshold,
            g.hand_scale_epsilon,
            g.tap_max_interval_ms,
            g.tap_cooldown_ms,
            g.history_capacity,
            m.move_lerp,
            m.rotate_slerp,
            m.min_scale,
            m.max_scale,
        )
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_overrides() {
        let config = EngineConfig::parse(
            "(:pinch-threshold 0.3 :tap-cooldown-ms 400 :history-capacity 20 :max-scale 5)",
        )
        .unwrap();
        assert_eq!(config.gesture.pinch_threshold, 0.3);
        assert_eq!(config.gesture.tap_cooldown_ms, 400.0);
        assert_eq!(config.gesture.history_capacity, 20);
        assert_eq!(config.manipulation.max_scale, 5.0);
        // Untouched keys keep defaults.
        assert_eq!(config.gesture.two_finger_threshold, 0.3);
        assert_eq!(config.manipulation.min_scale, 0.3);
    }

    #[test]
    fn test_unknown_and_invalid_keys() {
        let mut config = EngineConfig::default();
        let value = lexpr::from_str(
            "(:unknown 1 :pinch-strength-range 0 :history-capacity 1 :tap-cooldown-ms -5 :enabled nil)",
        )
        .unwrap();
        assert_eq!(config.apply_plist(&value), 1);
        assert!(!config.gesture.enabled);
        assert_eq!(config.gesture.pinch_strength_range, 0.4);
        assert_eq!(config.gesture.history_capacity, 12);
        assert_eq!(config.gesture.tap_cooldown_ms, 260.0);
    }

    #[test]
    fn test_scale_bounds_swapped() {
        let config = EngineConfig::parse("(:min-scale 4 :max-scale 2)").unwrap();
        assert_eq!(config.manipulation.min_scale, 2.0);
        assert_eq!(config.manipulation.max_scale, 4.0);
    }

    #[test]
    fn test_malformed() {
        assert!(EngineConfig::parse("(:pinch-threshold").is_err());
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join(format!("handblocks-config-{}.el", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "(:two-finger-threshold 0.25 :move-lerp 0.5)").unwrap();
        drop(file);

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.gesture.two_finger_threshold, 0.25);
        assert_eq!(config.manipulation.move_lerp, 0.5);
        fs::remove_file(&path).unwrap();

        let err = EngineConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("reading config"));
    }

    #[test]
    fn test_config_sexp_parses() {
        let config = EngineConfig::default();
        let s = config.config_sexp();
        assert!(s.contains(":pinch-threshold 0.350"));
        assert!(s.contains(":max-scale 3.000"));
        let round = EngineConfig::parse(&s).unwrap();
        assert_eq!(round, config);
    }
}
