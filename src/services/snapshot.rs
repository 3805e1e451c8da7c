//! Read-only snapshot view for the interpretation/chat boundary: the latest
//! composite, per-layer scores, recent alerts, macro regime, celestial state,
//! and dominant narrative, cached briefly to keep chat traffic off the hot
//! tables.

use moka::future::Cache;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde_json::{json, Value};
use std::time::Duration;

use crate::entities::prelude::{Alerts, CelestialState, ConfluenceScores, MacroSignal, PoliticalSignal};
use crate::entities::{alerts, celestial_state, confluence_scores, macro_signal, political_signal};
use crate::models::domain::Timeframe;

const SNAPSHOT_TTL_SECS: u64 = 60;
const SNAPSHOT_CAPACITY: u64 = 256;

#[derive(Clone)]
pub struct SnapshotService {
    cache: Cache<(String, String), Value>,
}

impl Default for SnapshotService {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotService {
    pub fn new() -> Self {
        SnapshotService {
            cache: Cache::builder()
                .max_capacity(SNAPSHOT_CAPACITY)
                .time_to_live(Duration::from_secs(SNAPSHOT_TTL_SECS))
                .build(),
        }
    }

    pub async fn snapshot(
        &self,
        db: &DatabaseConnection,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Value, DbErr> {
        let key = (symbol.to_string(), timeframe.as_str().to_string());
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }
        let value = build_snapshot(db, symbol, timeframe).await?;
        self.cache.insert(key, value.clone()).await;
        Ok(value)
    }
}

fn dec_str(d: Option<rust_decimal::Decimal>) -> Value {
    match d {
        Some(v) => json!(v.to_string()),
        None => Value::Null,
    }
}

async fn build_snapshot(
    db: &DatabaseConnection,
    symbol: &str,
    timeframe: Timeframe,
) -> Result<Value, DbErr> {
    let composite = ConfluenceScores::find()
        .filter(confluence_scores::Column::Symbol.eq(symbol))
        .filter(confluence_scores::Column::Timeframe.eq(timeframe.as_str()))
        .order_by_desc(confluence_scores::Column::Timestamp)
        .one(db)
        .await?;

    let recent_alerts = Alerts::find()
        .filter(alerts::Column::Symbol.eq(symbol))
        .filter(alerts::Column::Status.eq("active"))
        .order_by_desc(alerts::Column::TriggeredAt)
        .limit(10)
        .all(db)
        .await?;

    let macro_row = MacroSignal::find()
        .order_by_desc(macro_signal::Column::Timestamp)
        .one(db)
        .await?;

    let celestial_row = CelestialState::find()
        .order_by_desc(celestial_state::Column::Date)
        .one(db)
        .await?;

    let political_row = PoliticalSignal::find()
        .order_by_desc(political_signal::Column::Timestamp)
        .one(db)
        .await?;

    Ok(json!({
        "symbol": symbol,
        "timeframe": timeframe.as_str(),
        "composite": composite.as_ref().map(|c| json!({
            "timestamp": c.timestamp.to_rfc3339(),
            "composite_score": dec_str(c.composite_score),
            "signal_strength": c.signal_strength,
            "alignment_count": c.alignment_count,
            "scores": {
                "ta": dec_str(c.ta_score),
                "onchain": dec_str(c.onchain_score),
                "celestial": dec_str(c.celestial_score),
                "numerology": dec_str(c.numerology_score),
                "sentiment": dec_str(c.sentiment_score),
                "political": dec_str(c.political_score),
                "macro": dec_str(c.macro_score),
            },
        })),
        "recent_alerts": recent_alerts.iter().map(|a| json!({
            "kind": a.kind,
            "severity": a.severity,
            "title": a.title,
            "triggered_at": a.triggered_at.to_rfc3339(),
        })).collect::<Vec<_>>(),
        "macro_regime": macro_row.map(|m| json!({
            "regime": m.regime,
            "regime_confidence": dec_str(m.regime_confidence),
            "carry_stress": dec_str(m.carry_stress),
        })),
        "celestial": celestial_row.map(|c| json!({
            "date": c.date.to_string(),
            "lunar_phase": c.lunar_phase_name,
            "mercury_retrograde": c.mercury_retrograde,
            "retrograde_count": c.retrograde_count,
        })),
        "narrative": political_row.and_then(|p| p.dominant_narrative),
    }))
}
