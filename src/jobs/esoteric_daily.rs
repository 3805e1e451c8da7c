//! Daily esoteric compute: celestial state and numerology for the current
//! UTC date. Fires on a 24h cadence (first tick at startup covers restarts
//! mid-day).

use chrono::Utc;
use std::time::Duration;

use crate::services::producers;
use crate::services::scheduler::{JobSpec, Scheduler};

const CADENCE: Duration = Duration::from_secs(24 * 3600);
const LEASE_TTL: Duration = Duration::from_secs(600);

pub fn start_esoteric_daily_job(scheduler: &Scheduler) {
    let spec = JobSpec::new("esoteric_daily", CADENCE, LEASE_TTL);
    scheduler.spawn(spec, move |db| async move {
        let now = Utc::now();
        let today = now.date_naive();

        let celestial = producers::produce_celestial(&db, today, now, true).await?;
        tracing::info!(score = celestial.score, "Daily celestial computed");

        let numerology = producers::produce_numerology(&db, today, now, true).await?;
        tracing::info!(score = numerology.score, "Daily numerology computed");

        Ok(())
    });
}
