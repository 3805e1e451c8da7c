//! Celestial layer: daily state persistence and scoring.

use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::entities::{celestial_state, prelude::CelestialState};
use crate::models::domain::clamp_score;
use crate::services::ephemeris::{self, DailyEphemeris};

/// Eclipse proximity window for scoring, in days either direction.
pub const ECLIPSE_WINDOW_DAYS: i64 = 3;

/// Orb for the named aspect rules, degrees.
pub const NAMED_ASPECT_ORB: f64 = 8.0;

/// True when any day within +/- `days` of `date` carries an eclipse flag.
pub fn eclipse_within_days(date: NaiveDate, days: i64) -> bool {
    (-days..=days).any(|offset| {
        let state = ephemeris::daily_state(date + Duration::days(offset));
        state.is_lunar_eclipse || state.is_solar_eclipse
    })
}

fn has_aspect(state: &DailyEphemeris, p1: &str, p2: &str, aspect: &str, orb: f64) -> bool {
    state.active_aspects.iter().any(|a| {
        a.aspect == aspect
            && a.orb_distance <= orb
            && ((a.planet1 == p1 && a.planet2 == p2) || (a.planet1 == p2 && a.planet2 == p1))
    })
}

/// Deterministic score from the day's state. `prior_trend` is the sign of
/// the prior 30-day composite, used only for the Saturn-Jupiter conjunction.
pub fn compute_celestial_score(
    state: &DailyEphemeris,
    eclipse_nearby: bool,
    prior_trend: f64,
) -> f64 {
    let mut score = 0.0;

    match state.lunar_phase_name {
        "new_moon" => score += 0.2,
        "full_moon" => score -= 0.2,
        _ => {}
    }

    if state.mercury_retrograde {
        score -= 0.3;
    }
    if state.retrograde_count >= 3 {
        score -= 0.2;
    }
    if eclipse_nearby {
        score -= 0.4;
    }
    if has_aspect(state, "mars", "saturn", "square", NAMED_ASPECT_ORB) {
        score -= 0.3;
    }
    if has_aspect(state, "jupiter", "saturn", "conjunction", NAMED_ASPECT_ORB) {
        let sign = if prior_trend < 0.0 { -1.0 } else { 1.0 };
        score += 0.4 * sign;
    }

    clamp_score(score)
}

fn dec(v: f64) -> Option<Decimal> {
    Decimal::from_f64(round4(v))
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Compute and upsert the celestial row for a date. Returns the score.
pub async fn compute_and_store(
    db: &DatabaseConnection,
    date: NaiveDate,
    prior_trend: f64,
) -> Result<f64, DbErr> {
    let state = ephemeris::daily_state(date);
    let eclipse_nearby = eclipse_within_days(date, ECLIPSE_WINDOW_DAYS);
    let score = compute_celestial_score(&state, eclipse_nearby, prior_trend);

    let row = celestial_state::ActiveModel {
        date: Set(date),
        lunar_phase_angle: Set(dec(state.lunar_phase_angle)),
        lunar_phase_name: Set(Some(state.lunar_phase_name.to_string())),
        lunar_illumination: Set(dec(state.lunar_illumination)),
        is_lunar_eclipse: Set(state.is_lunar_eclipse),
        is_solar_eclipse: Set(state.is_solar_eclipse),
        mercury_retrograde: Set(state.mercury_retrograde),
        venus_retrograde: Set(state.venus_retrograde),
        mars_retrograde: Set(state.mars_retrograde),
        jupiter_retrograde: Set(state.jupiter_retrograde),
        saturn_retrograde: Set(state.saturn_retrograde),
        retrograde_count: Set(state.retrograde_count),
        sun_longitude: Set(dec(state.sun_longitude)),
        moon_longitude: Set(dec(state.moon_longitude)),
        mercury_longitude: Set(dec(state.mercury_longitude)),
        venus_longitude: Set(dec(state.venus_longitude)),
        mars_longitude: Set(dec(state.mars_longitude)),
        jupiter_longitude: Set(dec(state.jupiter_longitude)),
        saturn_longitude: Set(dec(state.saturn_longitude)),
        active_aspects: Set(serde_json::to_value(&state.active_aspects).ok()),
        ingresses: Set(serde_json::to_value(&state.ingresses).ok()),
        score: Set(dec(score)),
        degraded: Set(false),
    };

    CelestialState::insert(row)
        .on_conflict(
            OnConflict::column(celestial_state::Column::Date)
                .update_columns([
                    celestial_state::Column::LunarPhaseAngle,
                    celestial_state::Column::LunarPhaseName,
                    celestial_state::Column::LunarIllumination,
                    celestial_state::Column::IsLunarEclipse,
                    celestial_state::Column::IsSolarEclipse,
                    celestial_state::Column::MercuryRetrograde,
                    celestial_state::Column::VenusRetrograde,
                    celestial_state::Column::MarsRetrograde,
                    celestial_state::Column::JupiterRetrograde,
                    celestial_state::Column::SaturnRetrograde,
                    celestial_state::Column::RetrogradeCount,
                    celestial_state::Column::SunLongitude,
                    celestial_state::Column::MoonLongitude,
                    celestial_state::Column::MercuryLongitude,
                    celestial_state::Column::VenusLongitude,
                    celestial_state::Column::MarsLongitude,
                    celestial_state::Column::JupiterLongitude,
                    celestial_state::Column::SaturnLongitude,
                    celestial_state::Column::ActiveAspects,
                    celestial_state::Column::Ingresses,
                    celestial_state::Column::Score,
                    celestial_state::Column::Degraded,
                ])
                .to_owned(),
        )
        .exec(db)
        .await?;

    tracing::info!(
        date = %date,
        score = score,
        phase = state.lunar_phase_name,
        retrogrades = state.retrograde_count,
        "Celestial state computed"
    );
    Ok(score)
}

/// Latest row with date <= the given date.
pub async fn latest_row(
    db: &DatabaseConnection,
    on_or_before: NaiveDate,
) -> Result<Option<celestial_state::Model>, DbErr> {
    CelestialState::find()
        .filter(celestial_state::Column::Date.lte(on_or_before))
        .order_by_desc(celestial_state::Column::Date)
        .one(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ephemeris::daily_state;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_score_rules_additive() {
        let mut state = daily_state(d(2025, 6, 15));
        state.lunar_phase_name = "new_moon";
        state.mercury_retrograde = false;
        state.retrograde_count = 0;
        state.active_aspects.clear();
        assert!((compute_celestial_score(&state, false, 1.0) - 0.2).abs() < 1e-9);

        state.mercury_retrograde = true;
        assert!((compute_celestial_score(&state, false, 1.0) + 0.1).abs() < 1e-9);

        state.retrograde_count = 3;
        assert!((compute_celestial_score(&state, false, 1.0) + 0.3).abs() < 1e-9);

        // Eclipse proximity stacks on top.
        assert!((compute_celestial_score(&state, true, 1.0) + 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_saturn_jupiter_sign_follows_trend() {
        let mut state = daily_state(d(2025, 6, 15));
        state.lunar_phase_name = "first_quarter";
        state.mercury_retrograde = false;
        state.retrograde_count = 0;
        state.active_aspects = vec![crate::services::ephemeris::Aspect {
            planet1: "jupiter",
            planet2: "saturn",
            aspect: "conjunction",
            exact_angle: 0.0,
            orb_distance: 2.0,
        }];
        assert!((compute_celestial_score(&state, false, 1.0) - 0.4).abs() < 1e-9);
        assert!((compute_celestial_score(&state, false, -1.0) + 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_score_clamped() {
        let mut state = daily_state(d(2025, 6, 15));
        state.lunar_phase_name = "full_moon";
        state.mercury_retrograde = true;
        state.retrograde_count = 4;
        state.active_aspects = vec![crate::services::ephemeris::Aspect {
            planet1: "mars",
            planet2: "saturn",
            aspect: "square",
            exact_angle: 90.0,
            orb_distance: 1.0,
        }];
        let score = compute_celestial_score(&state, true, -1.0);
        assert!(score >= -1.0);
        assert!((score + 1.0).abs() < 1e-6, "sum -1.4 clamps to -1, got {score}");
    }
}
