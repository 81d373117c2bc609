//! Reward expiry
//!
//! Instances expire at the last millisecond of the year after they were
//! created. The sweeper moves stale `locked`/`available` instances to
//! `expired` and never touches `redeemed`.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sqlx::SqlitePool;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::error::LedgerResult;
use crate::db::repository::reward_instance;
use crate::utils::logger::LEDGER_TARGET;
use shared::models::SweepOutcome;

/// Dec 31 23:59:59.999 UTC of the year after `created_at` (Unix millis)
pub fn expires_at_for(created_at: i64) -> i64 {
    let Some(created) = DateTime::<Utc>::from_timestamp_millis(created_at) else {
        return i64::MAX;
    };
    NaiveDate::from_ymd_opt(created.year() + 1, 12, 31)
        .and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999))
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or(i64::MAX)
}

/// Expire every stale non-terminal instance as of `now`
pub async fn sweep(pool: &SqlitePool, now: i64) -> LedgerResult<SweepOutcome> {
    let expired_count = reward_instance::sweep_expired(pool, now).await?;
    if expired_count > 0 {
        tracing::info!(target: LEDGER_TARGET, expired_count, now, "Reward instances expired");
    }
    Ok(SweepOutcome { expired_count })
}

/// Periodic expiry sweep
///
/// Registered as `TaskKind::Periodic`: sweeps once on start to catch up on
/// anything that went stale while the process was down, then on every tick
/// until the shutdown token fires.
pub struct ExpirySweeper {
    pool: SqlitePool,
    interval: Duration,
    shutdown: CancellationToken,
}

impl ExpirySweeper {
    pub fn new(pool: SqlitePool, interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            pool,
            interval,
            shutdown,
        }
    }

    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Expiry sweeper started");

        self.sweep_once().await;

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately; the catch-up sweep already ran
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => self.sweep_once().await,
            }
        }

        tracing::info!("Expiry sweeper stopped");
    }

    async fn sweep_once(&self) {
        match sweep(&self.pool, shared::util::now_millis()).await {
            Ok(outcome) => {
                tracing::debug!(expired_count = outcome.expired_count, "Expiry sweep completed")
            }
            Err(e) => tracing::error!(error = %e, "Expiry sweep failed"),
        }
    }
}
