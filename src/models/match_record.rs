use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::match_status::MatchStatus;
use crate::models::timeline::Timeline;
use crate::utils::time::{deserialize_instant, deserialize_optional_instant, now};

fn default_initial_status() -> MatchStatus {
    MatchStatus::Suggested
}

/// One candidate's candidacy for one job opening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub candidate_id: String,
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub company_id: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default = "default_initial_status")]
    pub status: MatchStatus,
    /// Status restored when the timeline is rolled back to empty.
    #[serde(default = "default_initial_status")]
    pub initial_status: MatchStatus,
    #[serde(default)]
    pub match_reasons: Vec<MatchReason>,
    #[serde(default)]
    pub timeline: Timeline,
    #[serde(default)]
    pub current_interview_round: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_optional_instant")]
    pub applied_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_instant")]
    pub offer_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_instant")]
    pub rejected_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_instant")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_instant")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(deserialize_with = "deserialize_instant", default = "now")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_instant", default = "now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: String,
    /// Store-managed write version used for conditional writes.
    #[serde(default)]
    pub version: i64,
}

impl Match {
    pub fn latest_entry_id(&self) -> Option<&str> {
        self.timeline.latest().map(|entry| entry.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReason {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub weight: f64,
}

/// Input for creating a match; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewMatch {
    pub candidate_id: String,
    pub job_id: String,
    pub company_id: String,
    pub score: f64,
    pub status: MatchStatus,
    pub match_reasons: Vec<MatchReason>,
    pub notes: Option<String>,
    pub created_by: String,
}

#[derive(Debug, Clone, Default)]
pub struct MatchFilter {
    pub status: Option<MatchStatus>,
    pub candidate_id: Option<String>,
    pub job_id: Option<String>,
    pub company_id: Option<String>,
    pub limit: Option<usize>,
}

impl MatchFilter {
    pub fn matches(&self, record: &Match) -> bool {
        self.status.map_or(true, |s| record.status == s)
            && self
                .candidate_id
                .as_deref()
                .map_or(true, |id| record.candidate_id == id)
            && self.job_id.as_deref().map_or(true, |id| record.job_id == id)
            && self
                .company_id
                .as_deref()
                .map_or(true, |id| record.company_id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStats {
    pub total: usize,
    pub by_status: BTreeMap<MatchStatus, usize>,
    pub average_score: i64,
    pub this_month: usize,
}

impl MatchStats {
    pub fn collect(matches: &[Match], now: DateTime<Utc>) -> Self {
        let mut by_status: BTreeMap<MatchStatus, usize> =
            MatchStatus::ALL.into_iter().map(|s| (s, 0)).collect();
        for record in matches {
            *by_status.entry(record.status).or_insert(0) += 1;
        }

        let average_score = if matches.is_empty() {
            0
        } else {
            (matches.iter().map(|m| m.score).sum::<f64>() / matches.len() as f64).round() as i64
        };

        let month_ago = now
            .checked_sub_months(chrono::Months::new(1))
            .unwrap_or(now);
        let this_month = matches.iter().filter(|m| m.created_at > month_ago).count();

        Self {
            total: matches.len(),
            by_status,
            average_score,
            this_month,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn legacy_record_shapes_are_normalized_on_read() {
        let record: Match = serde_json::from_value(json!({
            "candidateId": "cand-1",
            "jobId": "job-1",
            "companyId": "co-1",
            "status": "interview",
            "timeline": [
                {
                    "id": "timeline_2",
                    "status": "interview",
                    "timestamp": { "seconds": 1_735_693_200, "nanoseconds": 0 },
                    "eventDate": "2025-01-10T10:00",
                    "createdBy": "u1"
                },
                {
                    "id": "timeline_1",
                    "status": "applied",
                    "timestamp": 1_735_689_600_000u64,
                    "createdBy": "u1"
                }
            ],
            "appliedDate": "not-a-date",
            "createdAt": "2025-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(record.timeline.entries()[0].id, "timeline_1");
        assert_eq!(record.latest_entry_id(), Some("timeline_2"));
        assert_eq!(
            record.timeline.entries()[1].event_date,
            Some(Utc.with_ymd_and_hms(2025, 1, 10, 10, 0, 0).unwrap())
        );
        assert!(record.applied_date.is_some());
        assert_eq!(record.initial_status, MatchStatus::Suggested);
        assert_eq!(record.score, 0.0);
    }

    #[test]
    fn stats_count_every_status() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap();
        let mut a: Match = serde_json::from_value(json!({
            "status": "offer", "score": 80, "createdAt": "2025-06-01T00:00:00Z"
        }))
        .unwrap();
        a.id = "a".into();
        let b: Match = serde_json::from_value(json!({
            "status": "rejected", "score": 71, "createdAt": "2025-01-01T00:00:00Z"
        }))
        .unwrap();

        let stats = MatchStats::collect(&[a, b], now);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_status[&MatchStatus::Offer], 1);
        assert_eq!(stats.by_status[&MatchStatus::Withdrawn], 0);
        assert_eq!(stats.average_score, 76);
        assert_eq!(stats.this_month, 1);
    }
}
