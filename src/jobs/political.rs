//! Political layer jobs: news classification every 15 minutes (batched),
//! the composite political signal hourly, and a daily calendar reseed.

use chrono::{Datelike, Utc};
use std::time::Duration;

use crate::services::news_fetch::{self, NewsService};
use crate::services::scheduler::{JobSpec, Scheduler};
use crate::services::{political_calendar, producers};

const NEWS_CADENCE: Duration = Duration::from_secs(15 * 60);
const SIGNAL_CADENCE: Duration = Duration::from_secs(3600);
const CALENDAR_CADENCE: Duration = Duration::from_secs(24 * 3600);
const LEASE_TTL: Duration = Duration::from_secs(300);

pub fn start_political_jobs(scheduler: &Scheduler, news: NewsService) {
    if news.is_available() {
        let spec = JobSpec::new("political_news_sync", NEWS_CADENCE, LEASE_TTL);
        scheduler.spawn(spec, move |db| {
            let news = news.clone();
            async move {
                let articles = news.fetch_all().await;
                if articles.is_empty() {
                    return Ok(());
                }
                let stored = news_fetch::classify_and_store(&db, &articles).await?;
                tracing::info!(fetched = articles.len(), stored = stored, "News batch processed");
                Ok(())
            }
        });
    } else {
        tracing::warn!("No news API keys configured (NEWSAPI_KEY / GNEWS_API_KEY) - news sync disabled");
    }

    // Calendar reseed keeps the rolling two-year horizon populated.
    let spec = JobSpec::new("political_calendar_seed", CALENDAR_CADENCE, LEASE_TTL);
    scheduler.spawn(spec, move |db| async move {
        let count = political_calendar::seed_current_years(&db).await?;
        tracing::debug!(count = count, year = Utc::now().year(), "Calendar reseeded");
        Ok(())
    });

    // Hourly composite political score (calendar proximity + news flow +
    // narrative detection, with the black-swan override inside).
    let spec = JobSpec::new("political_signal", SIGNAL_CADENCE, LEASE_TTL);
    scheduler.spawn(spec, move |db| async move {
        let outcome = producers::produce_political(&db, Utc::now(), true).await?;
        if outcome.degraded {
            tracing::warn!(reason = outcome.reason.as_deref().unwrap_or(""), "Political signal degraded");
        }
        Ok(())
    });
}
