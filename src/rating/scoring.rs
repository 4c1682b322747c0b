//! Label parsing and the rating formula.
//!
//! A rating label is `<category>_<digit>`, e.g. `acting_4` or
//! `video_quality_2`. The rating of a scene is the rounded mean of its
//! category scores over *all* configured categories, scaled to the output
//! scale:
//!
//! rating = round_half_up(Σ score(c) / |categories|) * factor
//!
//! Missing categories count as 0 but still take part in the divisor.

use crate::config::RatingScale;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

/// Category → score.
pub type ScoreMap = BTreeMap<String, u8>;

fn label_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"^([a-z_]+)_(\d)$").unwrap())
}

/// Split a label into `(category prefix, digit)`. Case and surrounding
/// whitespace are ignored.
pub fn parse_label(label: &str) -> Option<(String, u8)> {
    let norm = label.trim().to_ascii_lowercase();
    let caps = label_re().captures(&norm)?;
    let prefix = caps.get(1)?.as_str().to_string();
    let digit = caps.get(2)?.as_str().parse().ok()?;
    Some((prefix, digit))
}

/// Result of scanning one record's labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedScores {
    pub scores: ScoreMap,
    /// Categories carrying conflicting scores; left out of `scores`.
    pub ambiguous: Vec<String>,
}

impl ParsedScores {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

pub fn parse_scores<S: AsRef<str>>(labels: &[S], categories: &[String]) -> ParsedScores {
    let mut seen: BTreeMap<&str, BTreeSet<u8>> = BTreeMap::new();
    for label in labels {
        let Some((prefix, digit)) = parse_label(label.as_ref()) else {
            continue;
        };
        if let Some(cat) = categories.iter().find(|c| c.eq_ignore_ascii_case(&prefix)) {
            seen.entry(cat.as_str()).or_default().insert(digit);
        }
    }

    let mut out = ParsedScores::default();
    // Walk in configured order so `ambiguous` is stable.
    for cat in categories {
        match seen.get(cat.as_str()) {
            Some(digits) if digits.len() == 1 => {
                if let Some(&d) = digits.iter().next() {
                    out.scores.insert(cat.clone(), d);
                }
            }
            Some(_) => out.ambiguous.push(cat.clone()),
            None => {}
        }
    }
    out
}

/// `None` means "skip": no categories configured, or fewer scored
/// categories than `min_required`.
pub fn compute_rating(
    scores: &ScoreMap,
    categories: &[String],
    min_required: usize,
    scale: RatingScale,
) -> Option<i64> {
    if categories.is_empty() || scores.len() < min_required {
        return None;
    }
    let sum: u32 = categories
        .iter()
        .map(|c| scores.get(c).copied().unwrap_or(0) as u32)
        .sum();
    let average = sum as f64 / categories.len() as f64;
    // Non-negative, so `round` is half-up.
    let rounded = average.round() as i64;
    Some((rounded * scale.factor()).min(scale.max()))
}
