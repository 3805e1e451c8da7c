//! Political layer scoring: calendar proximity, news flow, narrative
//! clustering, and the black-swan override.
//!
//! `political = 0.30 * calendar + 0.35 * news + 0.35 * narrative`, clamped,
//! unless a black-swan article forces `0.8 * sign(sentiment)`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::domain::clamp_score;

pub const CALENDAR_WEIGHT: f64 = 0.30;
pub const NEWS_WEIGHT: f64 = 0.35;
pub const NARRATIVE_WEIGHT: f64 = 0.35;

/// News articles below this relevance are ignored by the flow score.
pub const NEWS_RELEVANCE_FLOOR: f64 = 0.3;

/// News weight half-life in hours.
pub const NEWS_HALF_LIFE_HOURS: f64 = 6.0;

/// Mention-velocity threshold that triggers the 1.5x amplifier.
pub const VELOCITY_THRESHOLD: i32 = 10;

/// Minimum same-sign cluster size to count as a narrative.
pub const NARRATIVE_MIN_ARTICLES: usize = 5;

pub const BLACK_SWAN_URGENCY: f64 = 0.9;
pub const BLACK_SWAN_RELEVANCE: f64 = 0.9;

/// A scheduled calendar event as the scorer sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEventInput {
    pub event_at: DateTime<Utc>,
    pub expected_volatility: String,
    /// None when the market direction is unknown.
    pub expected_direction: Option<f64>,
    pub crypto_relevance: f64,
}

/// A classified article as the scorer sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleInput {
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub subcategory: Option<String>,
    pub relevance: f64,
    pub sentiment: f64,
    pub urgency: f64,
    pub mention_velocity: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    pub key: String,
    pub article_count: usize,
    pub direction: f64,
    pub avg_sentiment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoliticalResult {
    pub calendar_score: f64,
    pub news_score: f64,
    pub narrative_score: f64,
    pub high_vol_zone: bool,
    pub black_swan_override: bool,
    pub dominant_narrative: Option<Narrative>,
    pub score: f64,
}

/// Linear proximity decay over one week: 1 at the event, 0 at 168h out.
pub fn proximity_decay(hours_until: f64) -> f64 {
    (1.0 - hours_until / 168.0).max(0.0)
}

/// Sum of direction * relevance * decay over events in the next 7 days.
/// An extreme-volatility event inside 24h with unknown direction zeroes the
/// score and raises the high-volatility flag instead.
pub fn calendar_proximity(events: &[CalendarEventInput], now: DateTime<Utc>) -> (f64, bool) {
    let horizon = now + Duration::days(7);
    let mut sum = 0.0;
    let mut high_vol_zone = false;

    for ev in events {
        if ev.event_at < now || ev.event_at > horizon {
            continue;
        }
        let hours = (ev.event_at - now).num_seconds() as f64 / 3600.0;
        if hours <= 24.0 && ev.expected_volatility == "extreme" && ev.expected_direction.is_none() {
            high_vol_zone = true;
        }
        if let Some(direction) = ev.expected_direction {
            sum += direction * ev.crypto_relevance * proximity_decay(hours);
        }
    }

    if high_vol_zone {
        (0.0, true)
    } else {
        (clamp_score(sum), false)
    }
}

/// Mean of sentiment * relevance * urgency * exp(-ln2 * age/6h) over relevant
/// articles in the last 24h, amplified 1.5x when any article runs hot on
/// mention velocity.
pub fn news_flow(articles: &[ArticleInput], now: DateTime<Utc>) -> f64 {
    let cutoff = now - Duration::hours(24);
    let mut values = Vec::new();
    let mut velocity_spike = false;

    for a in articles {
        if a.timestamp < cutoff || a.timestamp > now || a.relevance <= NEWS_RELEVANCE_FLOOR {
            continue;
        }
        let age_hours = (now - a.timestamp).num_seconds() as f64 / 3600.0;
        let decay = (-std::f64::consts::LN_2 * age_hours / NEWS_HALF_LIFE_HOURS).exp();
        values.push(a.sentiment * a.relevance * a.urgency * decay);
        if a.mention_velocity.unwrap_or(0) > VELOCITY_THRESHOLD {
            velocity_spike = true;
        }
    }

    if values.is_empty() {
        return 0.0;
    }
    let mut mean = values.iter().sum::<f64>() / values.len() as f64;
    if velocity_spike {
        mean *= 1.5;
    }
    clamp_score(mean)
}

/// Cluster last-72h articles by category/subcategory and sentiment sign; the
/// dominant cluster of at least five articles contributes
/// `min(1, count/20) * sign`.
pub fn detect_dominant_narrative(
    articles: &[ArticleInput],
    now: DateTime<Utc>,
) -> Option<Narrative> {
    let cutoff = now - Duration::hours(72);
    let mut clusters: HashMap<(String, i8), Vec<f64>> = HashMap::new();

    for a in articles {
        if a.timestamp < cutoff || a.timestamp > now || a.sentiment == 0.0 {
            continue;
        }
        let key = match &a.subcategory {
            Some(sub) => format!("{}/{}", a.category, sub),
            None => a.category.clone(),
        };
        let sign = if a.sentiment > 0.0 { 1 } else { -1 };
        clusters.entry((key, sign)).or_default().push(a.sentiment);
    }

    clusters
        .into_iter()
        .filter(|(_, sentiments)| sentiments.len() >= NARRATIVE_MIN_ARTICLES)
        .max_by(|a, b| a.1.len().cmp(&b.1.len()))
        .map(|((key, sign), sentiments)| Narrative {
            key,
            article_count: sentiments.len(),
            direction: sign as f64,
            avg_sentiment: sentiments.iter().sum::<f64>() / sentiments.len() as f64,
        })
}

pub fn narrative_score(narrative: Option<&Narrative>) -> f64 {
    match narrative {
        Some(n) => (n.article_count as f64 / 20.0).min(1.0) * n.direction,
        None => 0.0,
    }
}

/// An article in the last hour with urgency and relevance both above 0.9.
pub fn black_swan(articles: &[ArticleInput], now: DateTime<Utc>) -> Option<&ArticleInput> {
    let cutoff = now - Duration::hours(1);
    articles
        .iter()
        .filter(|a| {
            a.timestamp >= cutoff
                && a.timestamp <= now
                && a.urgency > BLACK_SWAN_URGENCY
                && a.relevance > BLACK_SWAN_RELEVANCE
        })
        .max_by(|a, b| a.urgency.partial_cmp(&b.urgency).unwrap_or(std::cmp::Ordering::Equal))
}

pub fn compute_political_score(
    events: &[CalendarEventInput],
    articles: &[ArticleInput],
    now: DateTime<Utc>,
) -> PoliticalResult {
    let (calendar_score, high_vol_zone) = calendar_proximity(events, now);
    let news_score = news_flow(articles, now);
    let dominant = detect_dominant_narrative(articles, now);
    let narr_score = narrative_score(dominant.as_ref());

    // Override scales with the article's sentiment: a fully negative black
    // swan pins the layer at -0.8, a -0.9 sentiment lands at -0.72.
    let (score, black_swan_override) = match black_swan(articles, now) {
        Some(article) => (clamp_score(0.8 * article.sentiment), true),
        None => (
            clamp_score(
                CALENDAR_WEIGHT * calendar_score
                    + NEWS_WEIGHT * news_score
                    + NARRATIVE_WEIGHT * narr_score,
            ),
            false,
        ),
    };

    PoliticalResult {
        calendar_score,
        news_score,
        narrative_score: narr_score,
        high_vol_zone,
        black_swan_override,
        dominant_narrative: dominant,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn article(hours_ago: i64, sentiment: f64, relevance: f64, urgency: f64) -> ArticleInput {
        ArticleInput {
            timestamp: now() - Duration::hours(hours_ago),
            category: "crypto_regulation".into(),
            subcategory: Some("sec".into()),
            relevance,
            sentiment,
            urgency,
            mention_velocity: None,
        }
    }

    #[test]
    fn test_proximity_decay() {
        assert_eq!(proximity_decay(0.0), 1.0);
        assert!((proximity_decay(84.0) - 0.5).abs() < 1e-9);
        assert_eq!(proximity_decay(168.0), 0.0);
        assert_eq!(proximity_decay(200.0), 0.0);
    }

    #[test]
    fn test_calendar_proximity_sums_events() {
        let events = vec![
            CalendarEventInput {
                event_at: now() + Duration::hours(24),
                expected_volatility: "high".into(),
                expected_direction: Some(-1.0),
                crypto_relevance: 0.8,
            },
            CalendarEventInput {
                event_at: now() + Duration::days(10), // outside horizon
                expected_volatility: "extreme".into(),
                expected_direction: Some(-1.0),
                crypto_relevance: 1.0,
            },
        ];
        let (score, high_vol) = calendar_proximity(&events, now());
        assert!(!high_vol);
        let expected = -1.0 * 0.8 * proximity_decay(24.0);
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_extreme_unknown_direction_raises_high_vol_zone() {
        let events = vec![CalendarEventInput {
            event_at: now() + Duration::hours(12),
            expected_volatility: "extreme".into(),
            expected_direction: None,
            crypto_relevance: 1.0,
        }];
        let (score, high_vol) = calendar_proximity(&events, now());
        assert_eq!(score, 0.0);
        assert!(high_vol);
    }

    #[test]
    fn test_news_flow_half_life() {
        // One fresh article vs the same article six hours old: half weight.
        let fresh = news_flow(&[article(0, 0.8, 0.9, 0.5)], now());
        let aged = news_flow(&[article(6, 0.8, 0.9, 0.5)], now());
        assert!((aged - fresh / 2.0).abs() < 1e-9);

        // Irrelevant articles are filtered.
        assert_eq!(news_flow(&[article(1, 0.9, 0.2, 0.9)], now()), 0.0);
    }

    #[test]
    fn test_news_flow_velocity_amplifier() {
        let mut a = article(0, 0.5, 0.8, 0.5);
        let base = news_flow(std::slice::from_ref(&a), now());
        a.mention_velocity = Some(VELOCITY_THRESHOLD + 1);
        let amped = news_flow(&[a], now());
        assert!((amped - base * 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_narrative_needs_five_articles() {
        let four: Vec<ArticleInput> = (0..4).map(|i| article(i, 0.6, 0.8, 0.2)).collect();
        assert!(detect_dominant_narrative(&four, now()).is_none());

        let five: Vec<ArticleInput> = (0..5).map(|i| article(i, 0.6, 0.8, 0.2)).collect();
        let n = detect_dominant_narrative(&five, now()).unwrap();
        assert_eq!(n.article_count, 5);
        assert_eq!(n.direction, 1.0);
        assert!((narrative_score(Some(&n)) - 0.25).abs() < 1e-9); // 5/20
    }

    #[test]
    fn test_narrative_count_saturates_at_twenty() {
        let many: Vec<ArticleInput> = (0..30).map(|i| article(i % 24, -0.5, 0.8, 0.2)).collect();
        let n = detect_dominant_narrative(&many, now()).unwrap();
        assert_eq!(narrative_score(Some(&n)), -1.0);
    }

    #[test]
    fn test_black_swan_override() {
        // Scenario: bearish black-swan article forces -0.72-style override.
        let articles = vec![article(0, -0.9, 0.95, 0.95)];
        let result = compute_political_score(&[], &articles, now());
        assert!(result.black_swan_override);
        assert!((result.score + 0.72).abs() < 1e-9);

        // One hour and one minute old: no longer a black swan.
        let stale = vec![ArticleInput {
            timestamp: now() - Duration::minutes(61),
            ..articles[0].clone()
        }];
        let result = compute_political_score(&[], &stale, now());
        assert!(!result.black_swan_override);
    }

    #[test]
    fn test_composite_blend_weights() {
        let events = vec![CalendarEventInput {
            event_at: now(),
            expected_volatility: "high".into(),
            expected_direction: Some(1.0),
            crypto_relevance: 1.0,
        }];
        let result = compute_political_score(&events, &[], now());
        assert!((result.calendar_score - 1.0).abs() < 1e-9);
        assert!((result.score - 0.30).abs() < 1e-9);
    }
}
