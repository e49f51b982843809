// Token and noise metrics computed from raw markup vs. cleaned text

use regex::Regex;
use std::sync::LazyLock;

static WORD_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("static regex"));

/// Count maximal runs of word characters in `text`.
pub fn token_count(text: &str) -> usize {
    WORD_RUN.find_iter(text).count()
}

/// Fraction of `raw` discarded to produce `clean`, clamped to `[0, 1]`.
///
/// Lengths are measured in characters. `clean` is expected to be derived
/// from `raw`; a longer `clean` clamps to 0.
pub fn noise_ratio(raw: &str, clean: &str) -> f64 {
    noise_ratio_from_lengths(raw.chars().count(), clean.chars().count())
}

/// Same as [`noise_ratio`] when only the lengths are known.
pub fn noise_ratio_from_lengths(raw_len: usize, clean_len: usize) -> f64 {
    let discarded = raw_len as f64 - clean_len as f64;
    (discarded / raw_len.max(1) as f64).clamp(0.0, 1.0)
}

/// Round to three decimal places for reporting.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Round to two decimal places (throughput figures).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
