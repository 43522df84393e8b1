//! Submission-date filtering.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::NormalizedResponse;

/// Parses a persisted timestamp.
///
/// Accepts RFC 3339 (`2024-05-01T10:00:00Z`, `...+09:00`), SQLite-style
/// `2024-05-01 10:00:00` and bare dates. Offset-less values are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Inclusive submission window. A `None` bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn all_time() -> Self {
        Self::default()
    }

    pub fn between(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    /// Builds a range from user-supplied bounds. Unparsable bounds are
    /// dropped with a warning rather than rejected.
    pub fn from_inputs(from: Option<&str>, to: Option<&str>) -> Self {
        let parse_bound = |name: &str, raw: Option<&str>| {
            let raw = raw?;
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                warn!(bound = name, value = raw, "Ignoring unparsable date bound");
            }
            parsed
        };
        Self {
            from: parse_bound("from", from),
            to: parse_bound("to", to),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| at >= from) && self.to.is_none_or(|to| at <= to)
    }
}

/// Named trailing windows offered to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum DatePreset {
    #[value(name = "7d")]
    #[serde(rename = "7d")]
    Last7Days,
    #[value(name = "1m")]
    #[serde(rename = "1m")]
    LastMonth,
    #[value(name = "6m")]
    #[serde(rename = "6m")]
    Last6Months,
    #[value(name = "1y")]
    #[serde(rename = "1y")]
    LastYear,
    #[value(name = "all")]
    #[serde(rename = "all")]
    AllTime,
}

impl DatePreset {
    /// Resolves the preset against `now`.
    ///
    /// The 7-day window covers today plus the six days before it, so it
    /// starts six days back from `now`.
    pub fn range_at(&self, now: DateTime<Utc>) -> DateRange {
        let from = match self {
            DatePreset::Last7Days => now.checked_sub_signed(Duration::days(6)),
            DatePreset::LastMonth => now.checked_sub_months(Months::new(1)),
            DatePreset::Last6Months => now.checked_sub_months(Months::new(6)),
            DatePreset::LastYear => now.checked_sub_months(Months::new(12)),
            DatePreset::AllTime => return DateRange::all_time(),
        };
        DateRange::between(from, Some(now))
    }

    pub fn range(&self) -> DateRange {
        self.range_at(Utc::now())
    }

    pub fn code(&self) -> &'static str {
        match self {
            DatePreset::Last7Days => "7d",
            DatePreset::LastMonth => "1m",
            DatePreset::Last6Months => "6m",
            DatePreset::LastYear => "1y",
            DatePreset::AllTime => "all",
        }
    }
}

impl fmt::Display for DatePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for DatePreset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "7d" => Ok(DatePreset::Last7Days),
            "1m" => Ok(DatePreset::LastMonth),
            "6m" => Ok(DatePreset::Last6Months),
            "1y" => Ok(DatePreset::LastYear),
            "all" => Ok(DatePreset::AllTime),
            other => Err(anyhow::anyhow!("Unknown date preset '{other}'")),
        }
    }
}

/// Keeps the responses submitted inside `range`.
///
/// With no bounds the input passes through whole. With any bound active,
/// responses whose timestamp is missing or unparsable are dropped.
pub fn filter_by_date_range(responses: &[NormalizedResponse], range: &DateRange) -> Vec<NormalizedResponse> {
    if range.is_unbounded() {
        return responses.to_vec();
    }

    responses
        .iter()
        .filter(|r| r.submitted_at().is_some_and(|at| range.contains(at)))
        .cloned()
        .collect()
}
