//! Heuristic extraction of a 1-10 rating from free-form analyst text.
//!
//! The analyst prompts ask for a trailing 評分, but model output drifts, so
//! three patterns are tried in priority order and anything unmatchable
//! falls back to a neutral default. This is a heuristic, not a parser.

use std::sync::OnceLock;

use regex::Regex;

use crate::constants::score::{DEFAULT_SCORE, MAX_SCORE, MIN_SCORE};

fn patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // labeled: 評分: 8 / 評分：8.5
            Regex::new(r"評分[：:]\s*(\d+(?:\.\d+)?)").expect("score label pattern is valid"),
            // fraction: 7/10
            Regex::new(r"(\d+(?:\.\d+)?)\s*/10").expect("score fraction pattern is valid"),
            // points: 8 分
            Regex::new(r"(\d+(?:\.\d+)?)\s*分").expect("score points pattern is valid"),
        ]
    })
}

/// Pull the first in-range score out of `text`. Each pattern contributes
/// only its first match; an out-of-range hit falls through to the next
/// pattern. Empty or unmatched input yields the default of 5.
pub fn extract_score(text: &str) -> f64 {
    for pattern in patterns() {
        if let Some(caps) = pattern.captures(text) {
            if let Ok(score) = caps[1].parse::<f64>() {
                if (MIN_SCORE..=MAX_SCORE).contains(&score) {
                    return score;
                }
            }
        }
    }
    DEFAULT_SCORE
}
