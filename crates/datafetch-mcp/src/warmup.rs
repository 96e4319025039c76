//! Scheduled cache warm-up
//!
//! Runs a configured list of requests through the normal request pipeline so
//! their tabular results land in the cache ahead of real traffic, then sweeps
//! entries older than the cleanup age. Daily entries run on every pass; weekly
//! entries only on Sundays unless forced.

use std::time::{Duration, Instant};

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Deserialize;

use crate::constants::SYSTEM_CALLER;
use crate::error::Result;
use crate::service::DataService;
use crate::types::{FetchRequest, PageRequest, Params};

/// Pause between consecutive warm-up requests
pub const DEFAULT_WARMUP_PAUSE_MS: u64 = 2_000;

/// Day on which weekly entries are due
const WEEKLY_DAY: Weekday = Weekday::Sun;

/// How often an entry is refreshed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarmupSchedule {
    #[default]
    Daily,
    Weekly,
}

/// One `[[warmup]]` entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WarmupEntry {
    pub operation: String,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub schedule: WarmupSchedule,
}

impl WarmupEntry {
    #[must_use]
    pub fn new(operation: impl Into<String>, params: Params) -> Self {
        Self {
            operation: operation.into(),
            params,
            description: String::new(),
            schedule: WarmupSchedule::Daily,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub const fn weekly(mut self) -> Self {
        self.schedule = WarmupSchedule::Weekly;
        self
    }

    /// Description, or the operation name when none was given
    #[must_use]
    pub fn label(&self) -> &str {
        if self.description.is_empty() {
            &self.operation
        } else {
            &self.description
        }
    }
}

/// Whether weekly entries are due on `today`
#[must_use]
pub fn weekly_due(today: NaiveDate) -> bool {
    today.weekday() == WEEKLY_DAY
}

#[derive(Debug, Clone, Copy)]
pub struct WarmupOptions {
    /// Run weekly entries in this pass
    pub include_weekly: bool,
    pub pause: Duration,
    /// Entries older than this are purged after warming
    pub cleanup_age: Duration,
}

/// Successes out of entries attempted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub succeeded: usize,
    pub attempted: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmupReport {
    pub daily: Tally,
    pub weekly: Tally,
    pub purged: u64,
}

/// Warm every due entry, then purge old cache entries.
///
/// A failed entry is logged and counted; it never stops the pass.
///
/// # Errors
///
/// Returns `Error::Cache` if the cleanup sweep cannot list the cache.
pub async fn run_warmup(
    service: &DataService,
    entries: &[WarmupEntry],
    options: &WarmupOptions,
) -> Result<WarmupReport> {
    let started = Instant::now();
    let mut report = WarmupReport::default();

    let due = entries.iter().filter(|entry| match entry.schedule {
        WarmupSchedule::Daily => true,
        WarmupSchedule::Weekly => options.include_weekly,
    });

    for (index, entry) in due.enumerate() {
        if index > 0 && !options.pause.is_zero() {
            tokio::time::sleep(options.pause).await;
        }

        let ok = warm_one(service, entry, index).await;
        let tally = match entry.schedule {
            WarmupSchedule::Daily => &mut report.daily,
            WarmupSchedule::Weekly => &mut report.weekly,
        };
        tally.attempted += 1;
        if ok {
            tally.succeeded += 1;
        }
    }

    if !options.include_weekly {
        tracing::info!("Weekly warm-up entries not due, skipped");
    }

    report.purged = service.purge_cache(options.cleanup_age).await?;

    tracing::info!(
        daily_ok = report.daily.succeeded,
        daily_total = report.daily.attempted,
        weekly_ok = report.weekly.succeeded,
        weekly_total = report.weekly.attempted,
        purged = report.purged,
        elapsed_ms = started.elapsed().as_millis(),
        "Cache warm-up complete"
    );

    Ok(report)
}

async fn warm_one(service: &DataService, entry: &WarmupEntry, index: usize) -> bool {
    let request = FetchRequest::new(entry.operation.clone(), entry.params.clone())
        .with_request_id(format!("warmup-{index}"));

    tracing::info!(operation = %entry.operation, entry = entry.label(), "Warming cache entry");

    match service
        .handle_mcp_data_request(request, PageRequest::default(), SYSTEM_CALLER)
        .await
    {
        Ok(result) => {
            if let Some(error) = result.error {
                tracing::error!(entry = entry.label(), error = %error, "Warm-up fetch failed");
                false
            } else if result.total_records == 0 {
                tracing::warn!(entry = entry.label(), "Warm-up returned no data");
                false
            } else {
                tracing::info!(
                    entry = entry.label(),
                    rows = result.total_records,
                    "Warm-up entry refreshed"
                );
                true
            }
        }
        Err(e) => {
            tracing::error!(entry = entry.label(), error = %e, "Warm-up request rejected");
            false
        }
    }
}
