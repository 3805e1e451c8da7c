//! Custom cycle tracking: N-day cycles anchored at reference events, with
//! alignment checks and monotonic hit/miss accounting.

use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};

use crate::entities::{custom_cycles, prelude::CustomCycles};
use crate::services::numerology::CycleAlignment;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleStatus {
    pub id: i32,
    pub name: String,
    pub period_days: i32,
    pub anchor_date: NaiveDate,
    pub tolerance_days: i32,
    pub days_since_anchor: i64,
    pub cycle_number: i64,
    pub day_in_cycle: i64,
    pub days_to_next: i64,
    pub is_aligned: bool,
    pub hit_count: i32,
    pub miss_count: i32,
    pub hit_rate: Option<f64>,
}

/// Alignment arithmetic for one cycle on one date. A date aligns when its
/// position in the cycle is within tolerance of either boundary.
pub fn check_cycle(cycle: &custom_cycles::Model, date: NaiveDate) -> Option<CycleStatus> {
    let days_since = (date - cycle.anchor_date).num_days();
    if days_since < 0 || cycle.period_days <= 0 {
        return None;
    }
    let period = cycle.period_days as i64;
    let day_in_cycle = days_since % period;
    let days_remaining = period - day_in_cycle;
    let tolerance = cycle.tolerance_days as i64;
    let is_aligned = day_in_cycle <= tolerance || days_remaining <= tolerance;

    Some(CycleStatus {
        id: cycle.id,
        name: cycle.name.clone(),
        period_days: cycle.period_days,
        anchor_date: cycle.anchor_date,
        tolerance_days: cycle.tolerance_days,
        days_since_anchor: days_since,
        cycle_number: days_since / period + 1,
        day_in_cycle,
        days_to_next: if day_in_cycle <= tolerance { 0 } else { days_remaining },
        is_aligned,
        hit_count: cycle.hit_count,
        miss_count: cycle.miss_count,
        hit_rate: cycle
            .hit_rate
            .and_then(|r| r.to_string().parse::<f64>().ok()),
    })
}

pub fn direction_sign(cycle: &custom_cycles::Model) -> f64 {
    if cycle.direction == "bullish" {
        1.0
    } else {
        -1.0
    }
}

/// Which active cycles align with `date`, for the numerology producer.
pub async fn alignments_for_date(
    db: &DatabaseConnection,
    date: NaiveDate,
) -> Result<Vec<CycleAlignment>, DbErr> {
    let cycles = CustomCycles::find()
        .filter(custom_cycles::Column::IsActive.eq(true))
        .all(db)
        .await?;

    Ok(cycles
        .iter()
        .filter_map(|c| {
            let status = check_cycle(c, date)?;
            status.is_aligned.then(|| CycleAlignment {
                cycle_id: c.id,
                name: c.name.clone(),
                period_days: c.period_days,
                day_offset: status.day_in_cycle.min(c.period_days as i64 - status.day_in_cycle),
                direction: direction_sign(c),
            })
        })
        .collect())
}

pub async fn all_statuses(
    db: &DatabaseConnection,
    date: NaiveDate,
) -> Result<Vec<CycleStatus>, DbErr> {
    let cycles = CustomCycles::find()
        .filter(custom_cycles::Column::IsActive.eq(true))
        .all(db)
        .await?;
    Ok(cycles.iter().filter_map(|c| check_cycle(c, date)).collect())
}

/// Record a hit or miss; counters only grow and the rate is recomputed.
pub async fn record_outcome(
    db: &DatabaseConnection,
    cycle_id: i32,
    hit: bool,
) -> Result<(), DbErr> {
    let Some(cycle) = CustomCycles::find_by_id(cycle_id).one(db).await? else {
        return Ok(());
    };
    let hits = cycle.hit_count + if hit { 1 } else { 0 };
    let misses = cycle.miss_count + if hit { 0 } else { 1 };
    let total = hits + misses;

    let mut model: custom_cycles::ActiveModel = cycle.into();
    model.hit_count = Set(hits);
    model.miss_count = Set(misses);
    if total > 0 {
        model.hit_rate = Set(Decimal::from_f64(hits as f64 / total as f64));
    }
    model.update(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn cycle_47() -> custom_cycles::Model {
        custom_cycles::Model {
            id: 1,
            name: "47-day".into(),
            period_days: 47,
            anchor_date: d(2025, 10, 10),
            reference_event: None,
            tolerance_days: 2,
            direction: "bearish".into(),
            is_active: true,
            hit_count: 0,
            miss_count: 0,
            hit_rate: None,
            notes: None,
            created_at: None,
        }
    }

    #[test]
    fn test_47_day_alignment_window() {
        let cycle = cycle_47();

        // Day 47 exactly: aligned at offset 0.
        let s = check_cycle(&cycle, d(2025, 11, 26)).unwrap();
        assert!(s.is_aligned);
        assert_eq!(s.day_in_cycle, 0);
        assert_eq!(s.cycle_number, 2);

        // Day 49: within tolerance 2.
        let s = check_cycle(&cycle, d(2025, 11, 28)).unwrap();
        assert!(s.is_aligned);
        assert_eq!(s.day_in_cycle, 2);

        // Day 50: outside tolerance.
        let s = check_cycle(&cycle, d(2025, 11, 29)).unwrap();
        assert!(!s.is_aligned);
        assert_eq!(s.day_in_cycle, 3);

        // Day 45: within tolerance of the upper boundary.
        let s = check_cycle(&cycle, d(2025, 11, 24)).unwrap();
        assert!(s.is_aligned);
    }

    #[test]
    fn test_anchor_day_aligns() {
        let cycle = cycle_47();
        let s = check_cycle(&cycle, d(2025, 10, 10)).unwrap();
        assert!(s.is_aligned);
        assert_eq!(s.days_since_anchor, 0);
        assert_eq!(s.cycle_number, 1);
    }

    #[test]
    fn test_dates_before_anchor_ignored() {
        let cycle = cycle_47();
        assert!(check_cycle(&cycle, d(2025, 10, 9)).is_none());
    }

    #[test]
    fn test_direction_sign() {
        let mut cycle = cycle_47();
        assert_eq!(direction_sign(&cycle), -1.0);
        cycle.direction = "bullish".into();
        assert_eq!(direction_sign(&cycle), 1.0);
    }
}
