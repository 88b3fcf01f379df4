use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::match_status::MatchStatus;
use crate::utils::time::{deserialize_instant, deserialize_optional_instant, now};

pub const DEFAULT_DEDUP_WINDOW_SECS: i64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub id: String,
    pub status: MatchStatus,
    #[serde(deserialize_with = "deserialize_instant", default = "now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: Option<String>,
    /// Business date of the stage (interview slot, offer start), distinct from `timestamp`.
    #[serde(default, deserialize_with = "deserialize_optional_instant")]
    pub event_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: String,
}

impl TimelineEntry {
    pub fn id_for(timestamp: DateTime<Utc>) -> String {
        format!("timeline_{}", timestamp.timestamp_millis())
    }
}

/// Ordering key: timestamp first, id as tie-breaker for legacy entries.
fn chronological_key(entry: &TimelineEntry) -> (DateTime<Utc>, &str) {
    (entry.timestamp, entry.id.as_str())
}

/// Ordered history of status transitions for one match.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Timeline(Vec<TimelineEntry>);

impl<'de> Deserialize<'de> for Timeline {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Vec::<TimelineEntry>::deserialize(deserializer).map(Timeline::new)
    }
}

impl Timeline {
    pub fn new(entries: Vec<TimelineEntry>) -> Self {
        let mut timeline = Self(entries);
        timeline.sort();
        timeline
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sort(&mut self) {
        self.0
            .sort_by(|a, b| chronological_key(a).cmp(&chronological_key(b)));
    }

    pub fn latest(&self) -> Option<&TimelineEntry> {
        self.0.iter().max_by(|a, b| chronological_key(a).cmp(&chronological_key(b)))
    }

    pub fn find(&self, entry_id: &str) -> Option<&TimelineEntry> {
        self.0.iter().find(|entry| entry.id == entry_id)
    }

    /// `max(now, latest + 1ms)`: strictly after every existing entry.
    pub fn next_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.latest() {
            Some(latest) => {
                let floor = latest.timestamp + Duration::milliseconds(1);
                if now >= floor {
                    now
                } else {
                    floor
                }
            }
            None => now,
        }
    }

    /// True when the latest entry records the same `(status, actor, notes)`
    /// within `window` of `now`.
    pub fn is_duplicate(
        &self,
        status: MatchStatus,
        created_by: &str,
        notes: Option<&str>,
        now: DateTime<Utc>,
        window: Duration,
    ) -> bool {
        let Some(latest) = self.latest() else {
            return false;
        };
        latest.status == status
            && latest.created_by == created_by
            && latest.notes.as_deref() == notes
            && (now - latest.timestamp).abs() < window
    }

    /// Appends `entry` unless it duplicates the latest one. Returns whether it was recorded.
    pub fn append(&mut self, entry: TimelineEntry, window: Duration) -> bool {
        if self.is_duplicate(
            entry.status,
            &entry.created_by,
            entry.notes.as_deref(),
            entry.timestamp,
            window,
        ) {
            return false;
        }
        self.0.push(entry);
        self.sort();
        true
    }

    /// Removes `entry_id` only if it is the chronological maximum.
    pub fn retract_latest(&mut self, entry_id: &str) -> Result<TimelineEntry> {
        self.sort();
        let Some(position) = self.0.iter().position(|entry| entry.id == entry_id) else {
            return Err(Error::NotFound(format!("Timeline entry {} not found", entry_id)));
        };
        let latest_index = self.0.len() - 1;
        if position != latest_index {
            return Err(Error::NotLatest {
                entry_id: entry_id.to_string(),
                latest_id: self.0[latest_index].id.clone(),
            });
        }
        Ok(self.0.remove(position))
    }

    /// Status the match is in according to the ledger, or `initial` when empty.
    pub fn current_status(&self, initial: MatchStatus) -> MatchStatus {
        self.latest().map(|entry| entry.status).unwrap_or(initial)
    }

    pub fn interview_count(&self) -> u32 {
        self.0
            .iter()
            .filter(|entry| entry.status == MatchStatus::Interview)
            .count() as u32
    }
}
