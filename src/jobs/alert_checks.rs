//! Hourly event-proximity alert sweep: cycles, celestial transitions,
//! extreme sentiment, numerology dates, black swans, scheduled events,
//! narrative shifts. All conditions are idempotent per window bucket.

use chrono::Utc;
use std::time::Duration;

use crate::services::alert_engine;
use crate::services::scheduler::{JobSpec, Scheduler};

const CADENCE: Duration = Duration::from_secs(3600);
const LEASE_TTL: Duration = Duration::from_secs(300);

pub fn start_alert_check_job(scheduler: &Scheduler) {
    let spec = JobSpec::new("alert_periodic_checks", CADENCE, LEASE_TTL);
    scheduler.spawn(spec, move |db| async move {
        let now = Utc::now();
        let universe = super::active_universe(&db).await?;
        for (symbol, _) in universe {
            let created = alert_engine::run_periodic_checks(&db, &symbol, now).await?;
            if created > 0 {
                tracing::info!(symbol = %symbol, created = created, "Periodic alerts created");
            }
        }
        Ok(())
    });
}
