//! Macro series ingestion (FRED-style JSON API, key gated) and snapshot
//! assembly from the `macro_series` table.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::Client;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use serde::Deserialize;
use std::time::Duration as StdDuration;

use crate::entities::{macro_series, prelude::MacroSeries};
use crate::services::bounded_store;
use crate::services::macro_signal::MacroSnapshot;
use crate::services::retry::retry_with_backoff;

const REQUEST_TIMEOUT_SECS: u64 = 10;
const FRED_BASE: &str = "https://api.stlouisfed.org/fred/series/observations";

/// Series keys stored in `macro_series`, with their FRED ids.
pub const TRACKED_SERIES: [(&str, &str); 10] = [
    ("wti", "DCOILWTICO"),
    ("dxy", "DTWEXBGS"),
    ("dgs2", "DGS2"),
    ("dgs10", "DGS10"),
    ("dfii10", "DFII10"),
    ("m2", "M2SL"),
    ("fed_balance_sheet", "WALCL"),
    ("net_liquidity", "RRPONTSYD"),
    ("usdjpy", "DEXJPUS"),
    ("vix", "VIXCLS"),
];

#[derive(Debug, Deserialize)]
struct FredResponse {
    #[serde(default)]
    observations: Vec<FredObservation>,
}

#[derive(Debug, Deserialize)]
struct FredObservation {
    date: String,
    value: String,
}

#[derive(Clone)]
pub struct MacroService {
    client: Client,
    fred_api_key: String,
}

impl MacroService {
    pub fn new(fred_api_key: String) -> Self {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");
        MacroService {
            client,
            fred_api_key,
        }
    }

    pub fn is_available(&self) -> bool {
        !self.fred_api_key.is_empty()
    }

    /// Fetch the most recent observations for one FRED series.
    pub async fn fetch_series(
        &self,
        series_id: &str,
        limit: u32,
    ) -> Result<Vec<(NaiveDate, f64)>, reqwest::Error> {
        let limit = limit.to_string();
        let body: FredResponse = retry_with_backoff("fred", || async {
            self.client
                .get(FRED_BASE)
                .query(&[
                    ("series_id", series_id),
                    ("api_key", self.fred_api_key.as_str()),
                    ("file_type", "json"),
                    ("sort_order", "desc"),
                    ("limit", limit.as_str()),
                ])
                .send()
                .await?
                .error_for_status()?
                .json::<FredResponse>()
                .await
        })
        .await?;

        Ok(body
            .observations
            .iter()
            .filter_map(|o| {
                let date = NaiveDate::parse_from_str(&o.date, "%Y-%m-%d").ok()?;
                // FRED uses "." for missing observations.
                let value: f64 = o.value.parse().ok()?;
                Some((date, value))
            })
            .collect())
    }
}

pub async fn store_points(
    db: &DatabaseConnection,
    series_key: &str,
    points: &[(NaiveDate, f64)],
) -> Result<usize, DbErr> {
    let mut stored = 0;
    for (date, value) in points {
        let Some(value) = Decimal::from_f64(*value) else {
            continue;
        };
        let row = macro_series::ActiveModel {
            timestamp: Set(date.and_hms_opt(0, 0, 0).unwrap().and_utc()),
            series_key: Set(series_key.to_string()),
            value: Set(value),
        };
        MacroSeries::insert(row)
            .on_conflict(
                OnConflict::columns([
                    macro_series::Column::Timestamp,
                    macro_series::Column::SeriesKey,
                ])
                .update_column(macro_series::Column::Value)
                .to_owned(),
            )
            .exec(db)
            .await?;
        stored += 1;
    }
    Ok(stored)
}

async fn value_at(
    db: &DatabaseConnection,
    key: &str,
    at: DateTime<Utc>,
) -> Result<Option<f64>, DbErr> {
    Ok(bounded_store::newest_at_or_before(
        db,
        MacroSeries::find().filter(macro_series::Column::SeriesKey.eq(key)),
        macro_series::Column::Timestamp,
        at,
    )
    .await?
    .and_then(|r| r.value.to_f64()))
}

async fn recent_values(
    db: &DatabaseConnection,
    key: &str,
    at: DateTime<Utc>,
    count: u64,
) -> Result<Vec<f64>, DbErr> {
    Ok(bounded_store::recent_at_or_before(
        db,
        MacroSeries::find().filter(macro_series::Column::SeriesKey.eq(key)),
        macro_series::Column::Timestamp,
        at,
        count,
    )
    .await?
    .iter()
    .filter_map(|r| r.value.to_f64())
    .collect())
}

/// Assemble the scorer's snapshot from stored series, reading nothing past
/// `at` (the same path serves live compute and backtest replay).
pub async fn load_snapshot(
    db: &DatabaseConnection,
    at: DateTime<Utc>,
) -> Result<MacroSnapshot, DbErr> {
    let ago = |days: i64| at - Duration::days(days);

    // USD/JPY smoothing from the stored daily closes: 20-day mean and the
    // 14-day mean absolute change standing in for ATR on a close-only series.
    let jpy_closes = recent_values(db, "usdjpy", at, 21).await?;
    let usdjpy_sma_20 = if jpy_closes.len() >= 20 {
        Some(jpy_closes[..20].iter().sum::<f64>() / 20.0)
    } else {
        None
    };
    let usdjpy_atr_14 = if jpy_closes.len() >= 15 {
        let diffs: Vec<f64> = jpy_closes[..15]
            .windows(2)
            .map(|w| (w[0] - w[1]).abs())
            .collect();
        Some(diffs.iter().sum::<f64>() / diffs.len() as f64)
    } else {
        None
    };

    Ok(MacroSnapshot {
        wti: value_at(db, "wti", at).await?,
        wti_30d_ago: value_at(db, "wti", ago(30)).await?,
        oil_inventory_change: value_at(db, "oil_inventory_change", at).await?,
        dxy: value_at(db, "dxy", at).await?,
        dxy_20d_ago: value_at(db, "dxy", ago(20)).await?,
        dgs10: value_at(db, "dgs10", at).await?,
        dgs10_20d_ago: value_at(db, "dgs10", ago(20)).await?,
        yield_curve_2s10s: match (
            value_at(db, "dgs10", at).await?,
            value_at(db, "dgs2", at).await?,
        ) {
            (Some(ten), Some(two)) => Some(ten - two),
            _ => None,
        },
        real_yield_10y: value_at(db, "dfii10", at).await?,
        m2: value_at(db, "m2", at).await?,
        m2_1y_ago: value_at(db, "m2", ago(365)).await?,
        net_liquidity: value_at(db, "net_liquidity", at).await?,
        net_liquidity_90d_ago: value_at(db, "net_liquidity", ago(90)).await?,
        usdjpy: value_at(db, "usdjpy", at).await?,
        usdjpy_7d_ago: value_at(db, "usdjpy", ago(7)).await?,
        usdjpy_sma_20,
        usdjpy_atr_14,
        vix: value_at(db, "vix", at).await?,
        jpy_positioning_z: value_at(db, "jpy_positioning_z", at).await?,
    })
}
