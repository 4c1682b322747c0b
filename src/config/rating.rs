// src/config/rating.rs
//! Rating configuration: built-in defaults, an optional TOML/JSON file, then
//! the plugin settings saved in Stash. Every layer is a flat key/value map
//! applied onto the previous one.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const ENV_CONFIG_PATH: &str = "ADVANCED_RATING_CONFIG";
/// Plugin id under which Stash stores our settings.
pub const PLUGIN_ID: &str = "advanced_rating";

const DEFAULT_CATEGORIES: &str = "video_quality,acting,camera,story,intensity,chemistry";
const DEFAULT_MIN_REQUIRED: usize = 5;
const DEFAULT_LEVELS: u8 = 5;
/// Highest rating tag digit the scoring formula maps onto the full scale.
pub const MAX_LEVELS: u8 = 5;

/// Output scale of the computed rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum RatingScale {
    /// 0..=5, one point per level.
    Five,
    /// 0..=100, 20 points per level.
    #[default]
    Hundred,
}

impl RatingScale {
    /// Multiplier applied to the rounded average.
    pub fn factor(self) -> i64 {
        match self {
            RatingScale::Five => 1,
            RatingScale::Hundred => 20,
        }
    }

    /// Highest rating the scale can express.
    pub fn max(self) -> i64 {
        i64::from(MAX_LEVELS) * self.factor()
    }

    /// Accepts the setting values `1`/`5` and `100`.
    pub fn from_setting(v: i64) -> Option<Self> {
        match v {
            1 | 5 => Some(RatingScale::Five),
            100 => Some(RatingScale::Hundred),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatingConfig {
    /// Normalized, deduplicated, order-preserving.
    pub categories: Vec<String>,
    pub minimum_required_tags: usize,
    pub allow_destructive_actions: bool,
    pub rating_scale: RatingScale,
    pub levels_per_category: u8,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            categories: parse_categories(DEFAULT_CATEGORIES),
            minimum_required_tags: DEFAULT_MIN_REQUIRED,
            allow_destructive_actions: false,
            rating_scale: RatingScale::default(),
            levels_per_category: DEFAULT_LEVELS,
        }
    }
}

impl RatingConfig {
    pub fn with_categories<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            categories: normalize_categories(categories),
            ..Self::default()
        }
    }

    /// Overlay a settings map. Unknown keys are ignored; values that do not
    /// parse keep the current value and log a warning.
    pub fn apply_settings(&mut self, settings: &Map<String, Value>) {
        if let Some(v) = settings.get("categories") {
            match v {
                Value::String(s) => self.categories = parse_categories(s),
                Value::Array(items) => {
                    self.categories =
                        normalize_categories(items.iter().filter_map(Value::as_str))
                }
                Value::Null => {}
                other => warn!(value = %other, "categories: expected string or list"),
            }
        }

        if let Some(v) = settings.get("minimum_required_tags") {
            match as_i64(v) {
                Some(n) if n >= 0 => self.minimum_required_tags = n as usize,
                _ if v.is_null() => {}
                _ => warn!(value = %v, "minimum_required_tags: expected a non-negative integer"),
            }
        }

        if let Some(v) = settings.get("allow_destructive_actions") {
            match as_bool(v) {
                Some(b) => self.allow_destructive_actions = b,
                None if v.is_null() => {}
                None => warn!(value = %v, "allow_destructive_actions: expected a boolean"),
            }
        }

        if let Some(v) = settings.get("rating_scale") {
            match as_i64(v).and_then(RatingScale::from_setting) {
                Some(s) => self.rating_scale = s,
                None if v.is_null() => {}
                None => warn!(value = %v, "rating_scale: expected 1 or 100"),
            }
        }

        if let Some(v) = settings.get("levels_per_category") {
            match as_i64(v) {
                Some(n) if (1..=i64::from(MAX_LEVELS)).contains(&n) => {
                    self.levels_per_category = n as u8
                }
                _ if v.is_null() => {}
                _ => warn!(value = %v, max = MAX_LEVELS, "levels_per_category: out of range"),
            }
        }
    }

    /// Human-readable problems that do not prevent running.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.categories.is_empty() {
            out.push("no categories configured; nothing can be rated".to_string());
        }
        if self.minimum_required_tags > self.categories.len() {
            out.push(format!(
                "minimum_required_tags ({}) exceeds the number of categories ({}); no scene will be rated",
                self.minimum_required_tags,
                self.categories.len()
            ));
        }
        if !(1..=MAX_LEVELS).contains(&self.levels_per_category) {
            out.push(format!(
                "levels_per_category ({}) must be between 1 and {MAX_LEVELS}",
                self.levels_per_category
            ));
        }
        for c in self.categories.iter().filter(|c| !is_label_category(c)) {
            out.push(format!(
                "category {c:?} may only contain a-z and '_'; its rating tags will never be read"
            ));
        }
        out
    }
}

fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Whether `{category}_{digit}` tags for this name can be parsed back.
fn is_label_category(c: &str) -> bool {
    !c.is_empty() && c.bytes().all(|b| b.is_ascii_lowercase() || b == b'_')
}

/// Split a comma-separated category list.
pub fn parse_categories(s: &str) -> Vec<String> {
    normalize_categories(s.split(','))
}

/// Trim, lowercase, drop empties, keep the first of each duplicate.
pub fn normalize_categories<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for it in items {
        let c = it.as_ref().trim().to_ascii_lowercase();
        if !c.is_empty() && !out.contains(&c) {
            out.push(c);
        }
    }
    out
}

/// Load a settings file (TOML or JSON) and overlay it on the defaults.
pub fn load_config_from(path: &Path) -> Result<RatingConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading rating config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let settings = parse_settings(&content, ext.as_str())?;
    let mut cfg = RatingConfig::default();
    cfg.apply_settings(&settings);
    Ok(cfg)
}

/// Load config using env var + fallbacks:
/// 1) $ADVANCED_RATING_CONFIG
/// 2) config/advanced_rating.toml
/// 3) config/advanced_rating.json
/// 4) built-in defaults
pub fn load_config_default() -> Result<RatingConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/advanced_rating.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/advanced_rating.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(RatingConfig::default())
}

fn parse_settings(s: &str, hint_ext: &str) -> Result<Map<String, Value>> {
    if hint_ext == "json" {
        return parse_json(s);
    }
    if let Ok(m) = parse_toml(s) {
        return Ok(m);
    }
    parse_json(s).map_err(|_| anyhow!("unsupported rating config format"))
}

fn parse_toml(s: &str) -> Result<Map<String, Value>> {
    let m: Map<String, Value> = toml::from_str(s)?;
    Ok(m)
}

fn parse_json(s: &str) -> Result<Map<String, Value>> {
    let m: Map<String, Value> = serde_json::from_str(s)?;
    Ok(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn categories_are_trimmed_lowercased_and_deduplicated() {
        let c = parse_categories(" Acting, camera,,ACTING ,story ");
        assert_eq!(c, vec!["acting", "camera", "story"]);
    }

    #[test]
    fn defaults_match_the_stock_plugin() {
        let cfg = RatingConfig::default();
        assert_eq!(cfg.categories.len(), 6);
        assert_eq!(cfg.categories[0], "video_quality");
        assert_eq!(cfg.minimum_required_tags, 5);
        assert!(!cfg.allow_destructive_actions);
        assert_eq!(cfg.rating_scale, RatingScale::Hundred);
        assert_eq!(cfg.levels_per_category, 5);
    }

    #[test]
    fn settings_accept_numbers_and_numeric_strings() {
        let mut cfg = RatingConfig::default();
        cfg.apply_settings(&map(json!({
            "categories": "acting,story",
            "minimum_required_tags": "2",
            "allow_destructive_actions": true,
            "rating_scale": 1,
        })));
        assert_eq!(cfg.categories, vec!["acting", "story"]);
        assert_eq!(cfg.minimum_required_tags, 2);
        assert!(cfg.allow_destructive_actions);
        assert_eq!(cfg.rating_scale, RatingScale::Five);
    }

    #[test]
    fn bad_values_keep_previous_layer() {
        let mut cfg = RatingConfig::default();
        cfg.apply_settings(&map(json!({
            "minimum_required_tags": "lots",
            "rating_scale": 7,
            "levels_per_category": 12,
            "allow_destructive_actions": "maybe",
        })));
        assert_eq!(cfg, RatingConfig::default());
    }

    #[test]
    fn too_high_threshold_is_reported() {
        let mut cfg = RatingConfig::with_categories(["acting", "story"]);
        cfg.minimum_required_tags = 3;
        assert_eq!(cfg.warnings().len(), 1);
    }

    #[test]
    fn levels_above_the_scale_are_rejected() {
        let mut cfg = RatingConfig::default();
        cfg.apply_settings(&map(json!({ "levels_per_category": 9 })));
        assert_eq!(cfg.levels_per_category, 5);
        cfg.apply_settings(&map(json!({ "levels_per_category": "3" })));
        assert_eq!(cfg.levels_per_category, 3);
        assert!(cfg.warnings().is_empty());

        cfg.levels_per_category = 7;
        let w = cfg.warnings();
        assert_eq!(w.len(), 1);
        assert!(w[0].contains("levels_per_category"));
    }

    #[test]
    fn unparseable_category_names_are_reported() {
        let cfg = RatingConfig::with_categories(["video-quality", "4k", "acting", "video_quality"]);
        let w = cfg.warnings();
        assert_eq!(w.len(), 2);
        assert!(w[0].contains("video-quality"));
        assert!(w[1].contains("4k"));
    }
}
