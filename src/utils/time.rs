//! Timestamp normalization.
//!
//! Dates reach the engine as native instants, ISO-like strings, epoch
//! milliseconds or stored `{seconds, nanoseconds}` objects written by older
//! clients. They are classified once into [`RawInstant`] and normalized into a
//! `DateTime<Utc>`; anything absent or unparseable falls back to "now".

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub fn now() -> DateTime<Utc> {
    truncate_to_millis(Utc::now())
}

/// Drops sub-millisecond precision; ledger timestamps advance in whole milliseconds.
pub fn truncate_to_millis(dt: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(dt.timestamp_millis())
        .single()
        .unwrap_or(dt)
}

/// A stored instant that is only materialized on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredInstant {
    #[serde(alias = "_seconds")]
    pub seconds: i64,
    #[serde(alias = "_nanoseconds", default)]
    pub nanoseconds: u32,
}

impl StoredInstant {
    pub fn materialize(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.seconds, self.nanoseconds).single()
    }
}

/// Any of the shapes a date may take at the ingestion boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawInstant {
    #[default]
    Absent,
    EpochMillis(f64),
    Instant(DateTime<Utc>),
    Text(String),
    Stored(StoredInstant),
}

impl RawInstant {
    pub fn is_absent(&self) -> bool {
        match self {
            RawInstant::Absent => true,
            RawInstant::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<DateTime<Utc>> for RawInstant {
    fn from(dt: DateTime<Utc>) -> Self {
        RawInstant::Instant(dt)
    }
}

impl From<&str> for RawInstant {
    fn from(s: &str) -> Self {
        RawInstant::Text(s.to_string())
    }
}

impl<T: Into<RawInstant>> From<Option<T>> for RawInstant {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(RawInstant::Absent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstantSource {
    Parsed,
    Absent,
    Unparseable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalized {
    pub instant: DateTime<Utc>,
    pub source: InstantSource,
}

/// Total: every input yields a valid instant.
pub fn normalize_at(raw: &RawInstant, fallback: DateTime<Utc>) -> Normalized {
    if raw.is_absent() {
        return Normalized {
            instant: fallback,
            source: InstantSource::Absent,
        };
    }

    let parsed = match raw {
        RawInstant::Absent => None,
        RawInstant::Instant(dt) => Some(*dt),
        RawInstant::EpochMillis(ms) => from_epoch_millis(*ms),
        RawInstant::Text(s) => parse_text(s),
        RawInstant::Stored(stored) => stored.materialize(),
    };

    match parsed {
        Some(instant) => Normalized {
            instant,
            source: InstantSource::Parsed,
        },
        None => Normalized {
            instant: fallback,
            source: InstantSource::Unparseable,
        },
    }
}

pub fn normalize(raw: &RawInstant) -> DateTime<Utc> {
    let normalized = normalize_at(raw, now());
    match normalized.source {
        InstantSource::Parsed => {}
        InstantSource::Absent => tracing::debug!("absent instant, using current time"),
        InstantSource::Unparseable => {
            tracing::warn!(raw = ?raw, "unparseable instant, falling back to current time")
        }
    }
    normalized.instant
}

/// Normalizes only when a value was supplied.
pub fn normalize_opt(raw: &RawInstant) -> Option<DateTime<Utc>> {
    if raw.is_absent() {
        None
    } else {
        Some(normalize(raw))
    }
}

fn from_epoch_millis(ms: f64) -> Option<DateTime<Utc>> {
    if !ms.is_finite() || ms.abs() > i64::MAX as f64 {
        return None;
    }
    Utc.timestamp_millis_opt(ms.trunc() as i64).single()
}

fn parse_text(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// `deserialize_with` helper for required instants in persisted records.
pub fn deserialize_instant<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = RawInstant::deserialize(deserializer)?;
    Ok(normalize(&raw))
}

/// `deserialize_with` helper for optional instants; absent stays `None`.
pub fn deserialize_optional_instant<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = RawInstant::deserialize(deserializer)?;
    Ok(normalize_opt(&raw))
}
