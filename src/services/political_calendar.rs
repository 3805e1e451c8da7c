//! Scheduled political/economic event calendar: idempotent seeding of known
//! recurring events and the queries the political producer reads.

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::entities::{political_calendar, prelude::PoliticalCalendar};
use crate::services::political_score::CalendarEventInput;

struct SeedEvent {
    date: (u32, u32),
    event_type: &'static str,
    category: &'static str,
    title: &'static str,
    country: &'static str,
    volatility: &'static str,
    /// None = direction unknown (pure uncertainty).
    direction: Option<f64>,
    relevance: f64,
    recurrence: &'static str,
}

/// Known 2026 schedule. Dates are (month, day); decision day for multi-day
/// meetings.
fn seed_events() -> Vec<SeedEvent> {
    let mut events = Vec::new();

    for (m, d) in [(1, 29), (3, 18), (5, 6), (6, 17), (7, 29), (9, 16), (10, 28), (12, 9)] {
        events.push(SeedEvent {
            date: (m, d),
            event_type: "fomc_meeting",
            category: "monetary_policy",
            title: "FOMC rate decision",
            country: "US",
            volatility: "high",
            direction: Some(-0.3),
            relevance: 0.8,
            recurrence: "8x/year",
        });
    }
    for (m, d) in [
        (1, 14), (2, 12), (3, 11), (4, 14), (5, 13), (6, 10),
        (7, 14), (8, 12), (9, 10), (10, 14), (11, 12), (12, 10),
    ] {
        events.push(SeedEvent {
            date: (m, d),
            event_type: "cpi_release",
            category: "monetary_policy",
            title: "CPI release",
            country: "US",
            volatility: "high",
            direction: Some(-0.3),
            relevance: 0.7,
            recurrence: "monthly",
        });
    }
    for (m, d) in [
        (1, 2), (2, 6), (3, 6), (4, 3), (5, 1), (6, 5),
        (7, 3), (8, 7), (9, 4), (10, 2), (11, 6), (12, 4),
    ] {
        events.push(SeedEvent {
            date: (m, d),
            event_type: "jobs_report",
            category: "fiscal_policy",
            title: "Non-farm payrolls",
            country: "US",
            volatility: "medium",
            direction: Some(-0.2),
            relevance: 0.5,
            recurrence: "monthly",
        });
    }
    for (m, d) in [(1, 29), (4, 29), (7, 29), (10, 28)] {
        events.push(SeedEvent {
            date: (m, d),
            event_type: "gdp_release",
            category: "fiscal_policy",
            title: "GDP estimate",
            country: "US",
            volatility: "medium",
            direction: Some(-0.2),
            relevance: 0.5,
            recurrence: "quarterly",
        });
    }
    for (m, d) in [(1, 24), (3, 14), (4, 30), (6, 18), (7, 31), (9, 17), (10, 30), (12, 18)] {
        events.push(SeedEvent {
            date: (m, d),
            event_type: "boj_meeting",
            category: "monetary_policy",
            title: "BOJ rate decision",
            country: "JP",
            volatility: "high",
            direction: Some(-0.3),
            relevance: 0.7,
            recurrence: "8x/year",
        });
    }
    for (m, d) in [(1, 30), (3, 12), (4, 16), (6, 4), (7, 16), (9, 10), (10, 29), (12, 10)] {
        events.push(SeedEvent {
            date: (m, d),
            event_type: "ecb_meeting",
            category: "monetary_policy",
            title: "ECB rate decision",
            country: "EU",
            volatility: "medium",
            direction: Some(-0.2),
            relevance: 0.5,
            recurrence: "8x/year",
        });
    }
    for (m, d) in [(2, 1), (4, 3), (6, 5), (8, 7), (10, 2), (12, 4)] {
        events.push(SeedEvent {
            date: (m, d),
            event_type: "opec_meeting",
            category: "geopolitical",
            title: "OPEC+ ministerial meeting",
            country: "INTL",
            volatility: "medium",
            direction: Some(-0.2),
            relevance: 0.5,
            recurrence: "6x/year",
        });
    }
    for (m, d) in [(2, 4), (5, 6), (8, 5), (11, 4)] {
        events.push(SeedEvent {
            date: (m, d),
            event_type: "treasury_refunding",
            category: "monetary_policy",
            title: "Treasury quarterly refunding",
            country: "US",
            volatility: "medium",
            direction: Some(-0.1),
            relevance: 0.4,
            recurrence: "quarterly",
        });
    }
    // Midterm elections: extreme volatility, direction genuinely unknown.
    events.push(SeedEvent {
        date: (11, 3),
        event_type: "us_election",
        category: "election",
        title: "US midterm elections",
        country: "US",
        volatility: "extreme",
        direction: None,
        relevance: 0.7,
        recurrence: "2yr",
    });

    events
}

/// Upsert the recurring calendar for a year. Safe to re-run.
pub async fn seed_recurring_events(db: &DatabaseConnection, year: i32) -> Result<usize, DbErr> {
    let mut count = 0;
    for ev in seed_events() {
        let Some(date) = NaiveDate::from_ymd_opt(year, ev.date.0, ev.date.1) else {
            continue;
        };
        let row = political_calendar::ActiveModel {
            event_date: Set(date),
            event_type: Set(ev.event_type.to_string()),
            category: Set(Some(ev.category.to_string())),
            title: Set(format!("{} ({})", ev.title, date.format("%b %d, %Y"))),
            description: Set(None),
            country: Set(Some(ev.country.to_string())),
            expected_volatility: Set(ev.volatility.to_string()),
            expected_direction: Set(ev.direction.and_then(Decimal::from_f64)),
            crypto_relevance: Set(Decimal::from_f64(ev.relevance)),
            is_recurring: Set(true),
            recurrence_rule: Set(Some(ev.recurrence.to_string())),
            actual_impact_pct: Set(None),
            outcome_notes: Set(None),
            ..Default::default()
        };
        PoliticalCalendar::insert(row)
            .on_conflict(
                OnConflict::columns([
                    political_calendar::Column::EventDate,
                    political_calendar::Column::EventType,
                ])
                .update_columns([
                    political_calendar::Column::Title,
                    political_calendar::Column::ExpectedVolatility,
                    political_calendar::Column::ExpectedDirection,
                    political_calendar::Column::CryptoRelevance,
                ])
                .to_owned(),
            )
            .exec(db)
            .await?;
        count += 1;
    }
    tracing::info!(year = year, count = count, "Calendar events seeded");
    Ok(count)
}

/// Events dated within `days_ahead` of `from`, ordered soonest first.
pub async fn upcoming_events(
    db: &DatabaseConnection,
    from: NaiveDate,
    days_ahead: i64,
) -> Result<Vec<political_calendar::Model>, DbErr> {
    PoliticalCalendar::find()
        .filter(political_calendar::Column::EventDate.gte(from))
        .filter(political_calendar::Column::EventDate.lte(from + chrono::Duration::days(days_ahead)))
        .order_by_asc(political_calendar::Column::EventDate)
        .all(db)
        .await
}

/// Project calendar rows into scorer inputs. Events are treated as occurring
/// at 14:00 UTC, the typical release hour for US data.
pub fn to_scorer_inputs(rows: &[political_calendar::Model]) -> Vec<CalendarEventInput> {
    rows.iter()
        .filter_map(|r| {
            let event_at = r.event_date.and_hms_opt(14, 0, 0)?.and_utc();
            Some(CalendarEventInput {
                event_at,
                expected_volatility: r.expected_volatility.clone(),
                expected_direction: r.expected_direction.and_then(|d| d.to_f64()),
                crypto_relevance: r.crypto_relevance.and_then(|d| d.to_f64()).unwrap_or(0.0),
            })
        })
        .collect()
}

/// Seed both the current and next calendar year so the 7-day horizon never
/// runs off the end in December.
pub async fn seed_current_years(db: &DatabaseConnection) -> Result<usize, DbErr> {
    let year = Utc::now().year();
    let mut count = seed_recurring_events(db, year).await?;
    count += seed_recurring_events(db, year + 1).await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_catalog_shape() {
        let events = seed_events();
        assert!(events.len() > 50);
        assert!(events.iter().any(|e| e.event_type == "fomc_meeting"));
        assert!(events.iter().any(|e| e.event_type == "us_election"));
        // Every extreme event in the seed has unknown direction.
        for e in events.iter().filter(|e| e.volatility == "extreme") {
            assert!(e.direction.is_none());
        }
    }

    #[test]
    fn test_to_scorer_inputs() {
        let row = political_calendar::Model {
            id: 1,
            event_date: NaiveDate::from_ymd_opt(2026, 3, 18).unwrap(),
            event_type: "fomc_meeting".into(),
            category: Some("monetary_policy".into()),
            title: "FOMC".into(),
            description: None,
            country: Some("US".into()),
            expected_volatility: "high".into(),
            expected_direction: Decimal::from_f64(-0.3),
            crypto_relevance: Decimal::from_f64(0.8),
            is_recurring: true,
            recurrence_rule: None,
            actual_impact_pct: None,
            outcome_notes: None,
        };
        let inputs = to_scorer_inputs(&[row]);
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].expected_volatility, "high");
        assert!((inputs[0].crypto_relevance - 0.8).abs() < 1e-9);
    }
}
