//! Date numerology, gematria ciphers, and the numerology layer score.
//!
//! Pure computation — no store access. The daily producer assembles inputs
//! (cycle alignments, prior composite trend, daily close) and persists the
//! result.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::domain::clamp_score;

pub const MASTER_NUMBERS: [u32; 3] = [11, 22, 33];

/// Default watched numbers for price significance checks.
pub const DEFAULT_WATCHED_NUMBERS: [u32; 7] = [47, 11, 22, 33, 7, 9, 13];

// ---------------------------------------------------------------------------
// Date numerology
// ---------------------------------------------------------------------------

fn digit_sum(mut n: u32) -> u32 {
    let mut sum = 0;
    while n > 0 {
        sum += n % 10;
        n /= 10;
    }
    sum
}

/// Raw digit sum of the date's `YYYYMMDD` digits.
pub fn date_digit_sum(d: NaiveDate) -> u32 {
    let packed = d.year() as u32 * 10_000 + d.month() * 100 + d.day();
    digit_sum(packed)
}

/// Reduce a number to a single digit, stopping at a master number (11, 22,
/// 33) reached at any step of the iterated digit sum.
pub fn reduce_preserving_masters(mut n: u32) -> u32 {
    loop {
        if MASTER_NUMBERS.contains(&n) || n <= 9 {
            return n;
        }
        n = digit_sum(n);
    }
}

/// Universal day number: iterated digit-sum of `YYYYMMDD` with master-number
/// preservation.
pub fn universal_day_number(d: NaiveDate) -> u32 {
    reduce_preserving_masters(date_digit_sum(d))
}

pub fn is_master_number_date(d: NaiveDate) -> bool {
    MASTER_NUMBERS.contains(&universal_day_number(d))
}

pub fn master_number_value(d: NaiveDate) -> Option<u32> {
    let n = universal_day_number(d);
    MASTER_NUMBERS.contains(&n).then_some(n)
}

// ---------------------------------------------------------------------------
// Gematria
// ---------------------------------------------------------------------------

/// Traditional Jewish gematria values for English letters.
const JEWISH_VALUES: [u32; 26] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 600, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 200, 700, 900, 300,
    400, 500,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GematriaValues {
    pub english_ordinal: u32,
    pub full_reduction: u32,
    pub reverse_ordinal: u32,
    pub reverse_reduction: u32,
    pub jewish: u32,
    pub english: u32,
}

fn letter_values(text: &str) -> impl Iterator<Item = u32> + '_ {
    text.chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase() as u32 - 'a' as u32 + 1)
}

pub fn gematria_all_ciphers(text: &str) -> GematriaValues {
    let mut english_ordinal = 0;
    let mut full_reduction = 0;
    let mut reverse_ordinal = 0;
    let mut reverse_reduction = 0;
    let mut jewish = 0;
    for v in letter_values(text) {
        english_ordinal += v;
        full_reduction += reduce_preserving_masters(v);
        reverse_ordinal += 27 - v;
        reverse_reduction += reduce_preserving_masters(27 - v);
        jewish += JEWISH_VALUES[(v - 1) as usize];
    }
    GematriaValues {
        english_ordinal,
        full_reduction,
        reverse_ordinal,
        reverse_reduction,
        jewish,
        english: english_ordinal * 6,
    }
}

// ---------------------------------------------------------------------------
// Price significance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSignificance {
    pub digit_sum: u32,
    pub reduced: u32,
    pub contains: Vec<u32>,
    pub reduces_to_watched: bool,
    pub is_significant: bool,
}

pub fn analyze_price(price: f64, watched: &[u32]) -> PriceSignificance {
    let rounded = price.round().max(0.0) as u64;
    let text = rounded.to_string();
    let sum: u32 = text.bytes().map(|b| (b - b'0') as u32).sum();
    let reduced = reduce_preserving_masters(sum);
    let contains: Vec<u32> = watched
        .iter()
        .copied()
        .filter(|n| text.contains(&n.to_string()))
        .collect();
    let reduces_to_watched = watched.contains(&reduced);
    PriceSignificance {
        digit_sum: sum,
        reduced,
        is_significant: !contains.is_empty() || reduces_to_watched,
        contains,
        reduces_to_watched,
    }
}

// ---------------------------------------------------------------------------
// Layer score
// ---------------------------------------------------------------------------

/// A cycle alignment as reported by the tracker for the scoring date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleAlignment {
    pub cycle_id: i32,
    pub name: String,
    pub period_days: i32,
    pub day_offset: i64,
    /// +1 bullish, -1 bearish.
    pub direction: f64,
}

#[derive(Debug, Clone)]
pub struct NumerologyInputs {
    pub date: NaiveDate,
    /// Sign of the mean composite over the prior 30 days; 0 when unknown.
    pub prior_trend: f64,
    pub alignments: Vec<CycleAlignment>,
    /// Daily close, when a candle is available for the date.
    pub daily_close: Option<f64>,
    pub watched_numbers: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumerologyResult {
    pub date_digit_sum: u32,
    pub universal_day_number: u32,
    pub is_master_number: bool,
    pub master_number_value: Option<u32>,
    pub cycle_confluence_count: usize,
    pub close_digit_match: Option<bool>,
    pub score: f64,
}

/// Score rules: master date ±0.2 (sign = prior trend, bullish default),
/// cycle alignments contribute their signed base 0.4 amplified by the
/// concurrent alignment count (capped at 3), close digit-sum watched-number
/// match ±0.1 with the same trend convention.
pub fn compute_numerology(inputs: &NumerologyInputs) -> NumerologyResult {
    let raw = date_digit_sum(inputs.date);
    let udn = reduce_preserving_masters(raw);
    let is_master = MASTER_NUMBERS.contains(&udn);
    let trend_sign = if inputs.prior_trend < 0.0 { -1.0 } else { 1.0 };

    let mut score = 0.0;
    if is_master {
        score += 0.2 * trend_sign;
    }

    let count = inputs.alignments.len();
    if count > 0 {
        let base: f64 =
            inputs.alignments.iter().map(|a| a.direction * 0.4).sum::<f64>() / count as f64;
        score += base * count.min(3) as f64;
    }

    let close_digit_match = inputs.daily_close.map(|close| {
        let sig = analyze_price(close, &inputs.watched_numbers);
        sig.reduces_to_watched
    });
    if close_digit_match == Some(true) {
        score += 0.1 * trend_sign;
    }

    NumerologyResult {
        date_digit_sum: raw,
        universal_day_number: udn,
        is_master_number: is_master,
        master_number_value: MASTER_NUMBERS.contains(&udn).then_some(udn),
        cycle_confluence_count: count,
        close_digit_match,
        score: clamp_score(score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_universal_day_number_locked_samples() {
        // 20291111 -> 17 -> 8, never a master.
        assert_eq!(date_digit_sum(d(2029, 11, 11)), 17);
        assert_eq!(universal_day_number(d(2029, 11, 11)), 8);
        assert!(!is_master_number_date(d(2029, 11, 11)));

        // 20270202 -> 15 -> 6.
        assert_eq!(universal_day_number(d(2027, 2, 2)), 6);

        // 20281122 -> 18 -> 9.
        assert_eq!(universal_day_number(d(2028, 11, 22)), 9);

        // 20250929 -> 29 -> 11: master reached at an intermediate step.
        assert_eq!(date_digit_sum(d(2025, 9, 29)), 29);
        assert_eq!(universal_day_number(d(2025, 9, 29)), 11);
        assert!(is_master_number_date(d(2025, 9, 29)));
        assert_eq!(master_number_value(d(2025, 9, 29)), Some(11));
    }

    #[test]
    fn test_universal_day_number_json_round_trip() {
        let result = compute_numerology(&NumerologyInputs {
            date: d(2025, 9, 29),
            prior_trend: 1.0,
            alignments: vec![],
            daily_close: None,
            watched_numbers: DEFAULT_WATCHED_NUMBERS.to_vec(),
        });
        let json = serde_json::to_string(&result).unwrap();
        let back: NumerologyResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
        assert_eq!(back.universal_day_number, 11);
        assert!(back.is_master_number);
    }

    #[test]
    fn test_master_date_contribution_follows_trend() {
        let base = NumerologyInputs {
            date: d(2025, 9, 29),
            prior_trend: 1.0,
            alignments: vec![],
            daily_close: None,
            watched_numbers: DEFAULT_WATCHED_NUMBERS.to_vec(),
        };
        assert!((compute_numerology(&base).score - 0.2).abs() < 1e-9);

        let bearish = NumerologyInputs {
            prior_trend: -0.5,
            ..base
        };
        assert!((compute_numerology(&bearish).score + 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_cycle_alignment_scoring() {
        let aligned = CycleAlignment {
            cycle_id: 1,
            name: "47-day".into(),
            period_days: 47,
            day_offset: 0,
            direction: -1.0,
        };
        let one = compute_numerology(&NumerologyInputs {
            date: d(2029, 11, 11), // not a master date
            prior_trend: 0.0,
            alignments: vec![aligned.clone()],
            daily_close: None,
            watched_numbers: vec![],
        });
        assert!((one.score + 0.4).abs() < 1e-9);

        // Three concurrent bearish alignments: base -0.4 amplified x3, clamped.
        let three = compute_numerology(&NumerologyInputs {
            date: d(2029, 11, 11),
            prior_trend: 0.0,
            alignments: vec![aligned.clone(), aligned.clone(), aligned.clone()],
            daily_close: None,
            watched_numbers: vec![],
        });
        assert_eq!(three.cycle_confluence_count, 3);
        assert!((three.score + 1.0).abs() < 1e-9, "clamped at -1, got {}", three.score);

        // Five alignments amplify no further than three.
        let five = compute_numerology(&NumerologyInputs {
            date: d(2029, 11, 11),
            prior_trend: 0.0,
            alignments: vec![aligned.clone(); 5],
            daily_close: None,
            watched_numbers: vec![],
        });
        assert_eq!(five.score, three.score);
    }

    #[test]
    fn test_close_digit_match() {
        // 43_000 -> 4+3 = 7, watched.
        let r = compute_numerology(&NumerologyInputs {
            date: d(2029, 11, 11),
            prior_trend: 1.0,
            alignments: vec![],
            daily_close: Some(43_000.0),
            watched_numbers: DEFAULT_WATCHED_NUMBERS.to_vec(),
        });
        assert_eq!(r.close_digit_match, Some(true));
        assert!((r.score - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_gematria_ciphers() {
        let v = gematria_all_ciphers("abc");
        assert_eq!(v.english_ordinal, 6);
        assert_eq!(v.reverse_ordinal, 26 + 25 + 24);
        assert_eq!(v.english, 36);
        assert_eq!(v.jewish, 1 + 2 + 3);

        // Non-alpha characters are ignored.
        let v2 = gematria_all_ciphers("a-b c!");
        assert_eq!(v2.english_ordinal, 6);

        // Full reduction reduces each letter to 1-9: z = 26 -> 8.
        let z = gematria_all_ciphers("z");
        assert_eq!(z.full_reduction, 8);
    }

    #[test]
    fn test_price_significance() {
        let sig = analyze_price(47_000.0, &DEFAULT_WATCHED_NUMBERS);
        assert!(sig.contains.contains(&47));
        assert!(sig.is_significant);

        let plain = analyze_price(10_000.0, &DEFAULT_WATCHED_NUMBERS);
        assert_eq!(plain.digit_sum, 1);
        assert!(!plain.reduces_to_watched);
    }
}
