//! Cooperative job scheduler.
//!
//! Each logical job runs on its own tokio task with a fixed cadence. Across
//! worker processes, at-most-one firing per tick is enforced by a lease row
//! in `job_leases` won through a conditional write. Within a process,
//! overlapping triggers coalesce (a slow handler skips missed ticks rather
//! than queueing them). Shutdown propagates through a watch channel; handlers
//! get a bounded drain window, after which the task is abandoned and its
//! lease expires on its own.

use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::entities::{job_leases, prelude::JobLeases};

/// Drain window granted to handlers on shutdown.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct JobSpec {
    pub name: &'static str,
    pub cadence: Duration,
    pub lease_ttl: Duration,
    /// Fixed offset after each tick, used to sequence consumers after
    /// producers that share a cadence (confluence runs <= 30s after TA).
    pub post_delay: Duration,
}

impl JobSpec {
    pub fn new(name: &'static str, cadence: Duration, lease_ttl: Duration) -> Self {
        JobSpec {
            name,
            cadence,
            lease_ttl,
            post_delay: Duration::ZERO,
        }
    }

    pub fn with_post_delay(mut self, delay: Duration) -> Self {
        self.post_delay = delay;
        self
    }

    /// Hard deadline for one firing.
    pub fn deadline(&self) -> Duration {
        self.lease_ttl.min(self.cadence * 2)
    }
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct JobHealth {
    pub last_success: Option<chrono::DateTime<Utc>>,
    pub last_failure: Option<chrono::DateTime<Utc>>,
    /// Positive: consecutive successes. Negative: consecutive failures.
    pub streak: i64,
}

pub type HealthRegistry = Arc<RwLock<HashMap<&'static str, JobHealth>>>;

#[derive(Clone)]
pub struct Scheduler {
    db: DatabaseConnection,
    owner_id: String,
    health: HealthRegistry,
    shutdown: watch::Receiver<bool>,
}

/// Deterministic per-job start offset so a fleet of workers does not
/// stampede: a hash of the job name spread over a tenth of the cadence.
pub fn jitter_for(name: &str, cadence: Duration) -> Duration {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in name.bytes() {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    let window_ms = (cadence.as_millis() as u64 / 10).max(1);
    Duration::from_millis(hash % window_ms)
}

impl Scheduler {
    pub fn new(
        db: DatabaseConnection,
        owner_id: String,
    ) -> (Self, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        (
            Scheduler {
                db,
                owner_id,
                health: Arc::new(RwLock::new(HashMap::new())),
                shutdown: rx,
            },
            tx,
        )
    }

    pub fn health(&self) -> HealthRegistry {
        self.health.clone()
    }

    pub fn health_snapshot(&self) -> Vec<(String, JobHealth)> {
        self.health
            .read()
            .iter()
            .map(|(name, h)| (name.to_string(), *h))
            .collect()
    }

    /// Spawn a job loop. The handler receives the shared connection; it must
    /// be idempotent, because a lease that outlives a crashed firing lets the
    /// next owner re-run the tick.
    pub fn spawn<F, Fut>(&self, spec: JobSpec, handler: F)
    where
        F: Fn(DatabaseConnection) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Box<dyn std::error::Error + Send + Sync>>> + Send,
    {
        let db = self.db.clone();
        let owner_id = self.owner_id.clone();
        let health = self.health.clone();
        let mut shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let start_delay = jitter_for(spec.name, spec.cadence) + spec.post_delay;
            tokio::select! {
                _ = tokio::time::sleep(start_delay) => {}
                _ = shutdown.changed() => return,
            }

            let mut ticker = tokio::time::interval(spec.cadence);
            // Coalesce: a handler running past its cadence drops the missed
            // ticks instead of queueing a burst.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.changed() => {
                        tracing::info!(job = spec.name, "Scheduler job stopping");
                        return;
                    }
                }

                match try_acquire_lease(&db, spec.name, &owner_id, spec.lease_ttl).await {
                    Ok(true) => {}
                    Ok(false) => continue, // another worker owns this tick
                    Err(e) => {
                        tracing::warn!(job = spec.name, error = %e, "Lease acquisition failed");
                        continue;
                    }
                }

                let started = std::time::Instant::now();
                let run = tokio::time::timeout(spec.deadline(), handler(db.clone()));
                tokio::pin!(run);

                let outcome = tokio::select! {
                    result = &mut run => flatten_outcome(result, spec.deadline()),
                    _ = shutdown.changed() => {
                        // Drain: the in-flight firing gets a bounded window,
                        // then is abandoned. Its lease expires naturally and
                        // idempotent writes make any re-run safe.
                        tracing::info!(job = spec.name, "Draining in-flight firing");
                        match tokio::time::timeout(DRAIN_TIMEOUT, &mut run).await {
                            Ok(result) => {
                                let _ = flatten_outcome(result, spec.deadline());
                            }
                            Err(_) => {
                                tracing::warn!(job = spec.name, "Drain timeout, abandoning firing");
                            }
                        }
                        return;
                    }
                };

                match outcome {
                    Ok(()) => {
                        record_success(&health, spec.name);
                        tracing::debug!(
                            job = spec.name,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Job tick complete"
                        );
                        if let Err(e) = release_lease(&db, spec.name, &owner_id).await {
                            tracing::warn!(job = spec.name, error = %e, "Lease release failed");
                        }
                    }
                    Err(reason) => {
                        record_failure(&health, spec.name);
                        tracing::error!(job = spec.name, reason = reason, "Job tick failed");
                        // Keep the lease until TTL: the failure may be
                        // environmental and shared by all workers.
                    }
                }
            }
        });
    }
}

fn flatten_outcome(
    result: Result<Result<(), Box<dyn std::error::Error + Send + Sync>>, tokio::time::error::Elapsed>,
    deadline: Duration,
) -> Result<(), String> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("deadline exceeded ({}s)", deadline.as_secs())),
    }
}

fn record_success(health: &HealthRegistry, name: &'static str) {
    let mut map = health.write();
    let entry = map.entry(name).or_default();
    entry.last_success = Some(Utc::now());
    entry.streak = if entry.streak >= 0 { entry.streak + 1 } else { 1 };
}

fn record_failure(health: &HealthRegistry, name: &'static str) {
    let mut map = health.write();
    let entry = map.entry(name).or_default();
    entry.last_failure = Some(Utc::now());
    entry.streak = if entry.streak <= 0 { entry.streak - 1 } else { -1 };
}

/// Win the lease row: insert it fresh, or take over one that expired.
pub async fn try_acquire_lease(
    db: &DatabaseConnection,
    job_name: &str,
    owner_id: &str,
    ttl: Duration,
) -> Result<bool, DbErr> {
    let now = Utc::now();
    let expires = now + ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::seconds(60));

    let insert = JobLeases::insert(job_leases::ActiveModel {
        job_name: Set(job_name.to_string()),
        owner_id: Set(owner_id.to_string()),
        expires_at: Set(expires),
    })
    .on_conflict(
        OnConflict::column(job_leases::Column::JobName)
            .do_nothing()
            .to_owned(),
    )
    .exec(db)
    .await;

    match insert {
        Ok(_) => return Ok(true),
        Err(DbErr::RecordNotInserted) => {}
        Err(e) => return Err(e),
    }

    // Row exists: take it over only if it expired.
    let result = JobLeases::update_many()
        .col_expr(job_leases::Column::OwnerId, Expr::value(owner_id))
        .col_expr(job_leases::Column::ExpiresAt, Expr::value(expires))
        .filter(job_leases::Column::JobName.eq(job_name))
        .filter(job_leases::Column::ExpiresAt.lt(now))
        .exec(db)
        .await?;

    Ok(result.rows_affected > 0)
}

/// Release only a lease this owner still holds.
pub async fn release_lease(
    db: &DatabaseConnection,
    job_name: &str,
    owner_id: &str,
) -> Result<(), DbErr> {
    JobLeases::delete_many()
        .filter(job_leases::Column::JobName.eq(job_name))
        .filter(job_leases::Column::OwnerId.eq(owner_id))
        .exec(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_is_deterministic_and_bounded() {
        let cadence = Duration::from_secs(3600);
        let a = jitter_for("confluence_compute", cadence);
        let b = jitter_for("confluence_compute", cadence);
        assert_eq!(a, b);
        assert!(a < cadence / 10 + Duration::from_millis(1));

        // Different jobs land at different offsets.
        let c = jitter_for("ta_compute", cadence);
        assert_ne!(a, c);
    }

    #[test]
    fn test_deadline_is_min_of_ttl_and_double_cadence() {
        let spec = JobSpec::new("x", Duration::from_secs(60), Duration::from_secs(300));
        assert_eq!(spec.deadline(), Duration::from_secs(120));

        let spec = JobSpec::new("x", Duration::from_secs(600), Duration::from_secs(300));
        assert_eq!(spec.deadline(), Duration::from_secs(300));
    }

    #[test]
    fn test_health_streak_transitions() {
        let health: HealthRegistry = Arc::new(RwLock::new(HashMap::new()));
        record_success(&health, "job");
        record_success(&health, "job");
        assert_eq!(health.read()["job"].streak, 2);

        record_failure(&health, "job");
        assert_eq!(health.read()["job"].streak, -1);
        record_failure(&health, "job");
        assert_eq!(health.read()["job"].streak, -2);

        record_success(&health, "job");
        assert_eq!(health.read()["job"].streak, 1);
        assert!(health.read()["job"].last_failure.is_some());
    }

    #[test]
    fn test_post_delay_builder() {
        let spec = JobSpec::new("confluence", Duration::from_secs(3600), Duration::from_secs(120))
            .with_post_delay(Duration::from_secs(20));
        assert_eq!(spec.post_delay, Duration::from_secs(20));
        assert!(spec.post_delay <= Duration::from_secs(30));
    }
}
