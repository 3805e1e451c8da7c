//! Keyword-based news classification.
//!
//! Classifies headlines for crypto-market impact: category, relevance,
//! sentiment, urgency. The LLM-backed classifier is an external collaborator;
//! this keyword path is the always-available fallback and the one exercised
//! in tests.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref POLITICAL_KEYWORDS: Regex = Regex::new(concat!(
        r"(?i)\b(regulation|regulatory|sec|cftc|congress|senate|legislation|bill|law",
        r"|ban|sanction|tax|treasury|fed|fomc|interest rate|inflation|cpi",
        r"|white house|executive order|policy|tariff",
        r"|central bank|cbdc|stablecoin|crypto bill|enforcement|crackdown",
        r"|etf|spot etf|approval|reject|compliance|aml|kyc",
        r"|election|vote|debate|campaign|political|geopolitic)\b"
    ))
    .unwrap();
    static ref CATEGORY_PATTERNS: Vec<(&'static str, Regex)> = vec![
        (
            "monetary_policy",
            Regex::new(concat!(
                r"(?i)\b(fed|fomc|interest rate|inflation|cpi|gdp|central bank",
                r"|rate hike|rate cut|quantitative|treasury|yields?|bonds?)\b"
            ))
            .unwrap(),
        ),
        (
            "crypto_regulation",
            Regex::new(concat!(
                r"(?i)\b(sec|cftc|regulation|regulatory|compliance|enforcement",
                r"|crypto bill|stablecoin|cbdc|etf|spot etf|aml|kyc|mica)\b"
            ))
            .unwrap(),
        ),
        (
            "fiscal_policy",
            Regex::new(concat!(
                r"(?i)\b(tax|tariff|spending|deficit|debt ceiling|budget",
                r"|stimulus|bailout|infrastructure)\b"
            ))
            .unwrap(),
        ),
        (
            "geopolitical",
            Regex::new(
                r"(?i)\b(sanction|war|conflict|trade war|geopolitic|nato|opec|oil|embargo)\b"
            )
            .unwrap(),
        ),
        (
            "election",
            Regex::new(concat!(
                r"(?i)\b(election|vote|debate|campaign|midterm|primary",
                r"|democrat|republican|poll|ballot)\b"
            ))
            .unwrap(),
        ),
    ];
    static ref POSITIVE_WORDS: Regex = Regex::new(concat!(
        r"(?i)\b(approve|approval|bullish|adopt|embrace|support|positive",
        r"|rally|surge|gain|growth|optimis|favorable|clarity)\b"
    ))
    .unwrap();
    static ref NEGATIVE_WORDS: Regex = Regex::new(concat!(
        r"(?i)\b(ban|reject|crash|bearish|crack ?down|enforce|sue|lawsuit",
        r"|fine|penalty|risk|fear|concern|warn|drop|fall|negative|uncertainty)\b"
    ))
    .unwrap();
    static ref URGENCY_WORDS: Regex =
        Regex::new(r"(?i)\b(breaking|urgent|emergency|immediately|crisis|crash|alert)\b").unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: String,
    pub subcategory: Option<String>,
    pub crypto_relevance: f64,
    pub sentiment: f64,
    pub urgency: f64,
}

pub fn is_political(text: &str) -> bool {
    POLITICAL_KEYWORDS.is_match(text)
}

pub fn classify(headline: &str, summary: Option<&str>) -> Classification {
    let text = match summary {
        Some(s) => format!("{headline} {s}"),
        None => headline.to_string(),
    };

    let mut category = "general".to_string();
    let mut subcategory = None;
    for (cat, pattern) in CATEGORY_PATTERNS.iter() {
        if let Some(m) = pattern.find(&text) {
            category = (*cat).to_string();
            subcategory = Some(m.as_str().to_lowercase());
            break;
        }
    }

    let keyword_matches = POLITICAL_KEYWORDS.find_iter(&text).count();
    let crypto_relevance = (keyword_matches as f64 * 0.15).min(1.0);

    let pos = POSITIVE_WORDS.find_iter(&text).count() as f64;
    let neg = NEGATIVE_WORDS.find_iter(&text).count() as f64;
    let sentiment = if pos + neg > 0.0 {
        (pos - neg) / (pos + neg)
    } else {
        0.0
    };

    let urgency = (URGENCY_WORDS.find_iter(&text).count() as f64 * 0.3).min(1.0);

    Classification {
        category,
        subcategory,
        crypto_relevance,
        sentiment,
        urgency,
    }
}

/// Stable dedup key for an article headline.
pub fn headline_hash(headline: &str) -> String {
    // FNV-1a over the lowercased headline; 16 hex chars is ample for the
    // per-(timestamp, source) key space.
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in headline.to_lowercase().bytes() {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    format!("{hash:016x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_detection() {
        let c = classify("Fed signals rate cut as inflation cools", None);
        assert_eq!(c.category, "monetary_policy");
        assert!(c.crypto_relevance > 0.0);

        let c = classify("SEC approves spot ETF applications", None);
        assert_eq!(c.category, "crypto_regulation");
    }

    #[test]
    fn test_sentiment_direction() {
        let bullish = classify("Regulator approves crypto ETF, markets rally", None);
        assert!(bullish.sentiment > 0.0);

        let bearish = classify("SEC lawsuit and crackdown spark fear of crypto ban", None);
        assert!(bearish.sentiment < 0.0);
    }

    #[test]
    fn test_urgency_scoring() {
        let calm = classify("Senate schedules stablecoin bill hearing", None);
        assert_eq!(calm.urgency, 0.0);

        let urgent = classify("BREAKING: emergency crisis alert as markets crash", None);
        assert!(urgent.urgency > 0.9);
    }

    #[test]
    fn test_headline_hash_stable() {
        let a = headline_hash("Fed cuts rates");
        let b = headline_hash("FED CUTS RATES");
        assert_eq!(a, b);
        assert_ne!(a, headline_hash("Fed holds rates"));
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_non_political_filter() {
        assert!(!is_political("Team wins championship game"));
        assert!(is_political("Congress debates crypto bill"));
    }
}
