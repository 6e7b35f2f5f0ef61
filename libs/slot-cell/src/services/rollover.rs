use std::sync::Arc;

use anyhow::Result;
use chrono::{Days, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::Duration;
use tracing::{debug, error, info, instrument};

use shared_config::AppConfig;

use crate::services::store::SlotStore;

#[derive(Debug, Clone)]
pub struct RolloverConfig {
    /// Local time of day the daily tick fires.
    pub run_at: NaiveTime,
    /// How far an elapsed slot is moved forward.
    pub advance_days: u64,
}

impl Default for RolloverConfig {
    fn default() -> Self {
        Self {
            run_at: shared_config::default_rollover_run_at(),
            advance_days: 7,
        }
    }
}

impl From<&AppConfig> for RolloverConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            run_at: config.rollover_run_at,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RolloverReport {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub slots_reopened: usize,
}

/// Daily job that moves yesterday's slots a week forward and reopens them, so
/// a weekly schedule always has upcoming slots.
pub struct RolloverScheduler {
    slots: SlotStore,
    config: RolloverConfig,
    shutdown: Notify,
}

impl RolloverScheduler {
    pub fn new(slots: SlotStore, config: RolloverConfig) -> Self {
        Self {
            slots,
            config,
            shutdown: Notify::new(),
        }
    }

    /// One rollover pass for a run happening on `today`.
    #[instrument(skip(self))]
    pub async fn run_for(&self, today: NaiveDate) -> Result<RolloverReport> {
        let from_date = today - Days::new(1);
        let to_date = from_date + Days::new(self.config.advance_days);

        let slots_reopened = self.slots.reopen_on_date(from_date, to_date).await?;
        info!("Rolled {} slots from {} to {}", slots_reopened, from_date, to_date);

        Ok(RolloverReport { from_date, to_date, slots_reopened })
    }

    pub async fn tick(&self) -> Result<RolloverReport> {
        self.run_for(Local::now().date_naive()).await
    }

    /// Runs until `shutdown` is called. A failed tick is logged and the loop
    /// carries on to the next day.
    pub async fn start(self: Arc<Self>) {
        info!("Rollover scheduler started, running daily at {}", self.config.run_at.format("%H:%M"));

        loop {
            let wait = duration_until_next_run(Local::now().naive_local(), self.config.run_at);
            debug!("Next rollover in {}s", wait.as_secs());

            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("Rollover scheduler stopping");
                    break;
                }
                _ = tokio::time::sleep(wait) => {
                    if let Err(e) = self.tick().await {
                        error!("Rollover tick failed: {}", e);
                    }
                }
            }
        }
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

/// Time from `now` to the next occurrence of `run_at`, strictly in the future.
pub fn duration_until_next_run(now: NaiveDateTime, run_at: NaiveTime) -> Duration {
    let today_run = now.date().and_time(run_at);
    let next_run = if today_run > now {
        today_run
    } else {
        today_run + Days::new(1)
    };

    (next_run - now).to_std().unwrap_or(Duration::from_secs(1))
}
