//! Content-aware TTL policy
//!
//! Financial time series with a closed historical end date cannot change after
//! the fact; anything undated or touching the last day may still be updating.

use std::time::Duration;

use chrono::{Days, Local, NaiveDate};
use serde_json::Value;

use super::config::CacheTtlConfig;
use crate::types::Params;

/// Keys inspected for the query's date, in priority order
const DATE_KEYS: [&str; 2] = ["end_date", "date"];

/// Date format accepted in params
const PARAM_DATE_FORMAT: &str = "%Y%m%d";

/// How long a cached result may be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Date range closed strictly before yesterday
    Historical,
    /// Undated, unparseable, or recent
    Volatile,
}

impl Freshness {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Historical => "historical",
            Self::Volatile => "volatile",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    historical: Duration,
    volatile: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::from_config(&CacheTtlConfig::default())
    }
}

impl TtlPolicy {
    #[must_use]
    pub const fn new(historical: Duration, volatile: Duration) -> Self {
        Self {
            historical,
            volatile,
        }
    }

    #[must_use]
    pub const fn from_config(config: &CacheTtlConfig) -> Self {
        Self::new(config.historical, config.volatile)
    }

    /// TTL for `params` relative to the local calendar date
    #[must_use]
    pub fn ttl_for(&self, params: &Params) -> Duration {
        self.ttl_for_date(params, Local::now().date_naive())
    }

    /// TTL for `params` relative to `today`
    #[must_use]
    pub fn ttl_for_date(&self, params: &Params, today: NaiveDate) -> Duration {
        match classify(params, today) {
            Freshness::Historical => self.historical,
            Freshness::Volatile => self.volatile,
        }
    }
}

/// Classify params as historical or volatile. Never fails: anything that
/// cannot be read as a `YYYYMMDD` date is volatile.
#[must_use]
pub fn classify(params: &Params, today: NaiveDate) -> Freshness {
    let Some(date) = query_date(params) else {
        return Freshness::Volatile;
    };

    match today.checked_sub_days(Days::new(1)) {
        Some(yesterday) if date < yesterday => Freshness::Historical,
        _ => Freshness::Volatile,
    }
}

fn query_date(params: &Params) -> Option<NaiveDate> {
    let value = DATE_KEYS.iter().find_map(|key| params.get(*key))?;
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    NaiveDate::parse_from_str(&text, PARAM_DATE_FORMAT).ok()
}
