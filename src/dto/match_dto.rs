use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::match_record::{Match, MatchFilter, MatchReason, NewMatch};
use crate::models::match_status::MatchStatus;
use crate::models::timeline::TimelineEntry;
use crate::services::match_service::{AdvanceOutcome, AdvanceRequest};
use crate::utils::time::RawInstant;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchPayload {
    #[validate(length(min = 1))]
    pub candidate_id: String,
    #[validate(length(min = 1))]
    pub job_id: String,
    #[validate(length(min = 1))]
    pub company_id: String,
    #[validate(range(min = 0.0, max = 100.0))]
    pub score: Option<f64>,
    pub status: Option<MatchStatus>,
    #[serde(default)]
    pub match_reasons: Vec<MatchReason>,
    pub notes: Option<String>,
    #[validate(length(min = 1))]
    pub created_by: String,
}

impl From<CreateMatchPayload> for NewMatch {
    fn from(payload: CreateMatchPayload) -> Self {
        Self {
            candidate_id: payload.candidate_id,
            job_id: payload.job_id,
            company_id: payload.company_id,
            score: payload.score.unwrap_or(0.0),
            status: payload.status.unwrap_or(MatchStatus::Suggested),
            match_reasons: payload.match_reasons,
            notes: payload.notes,
            created_by: payload.created_by,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceStatusPayload {
    pub status: MatchStatus,
    #[validate(length(min = 1))]
    pub description: String,
    #[serde(alias = "createdBy")]
    #[validate(length(min = 1))]
    pub actor: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub event_date: RawInstant,
    #[validate(range(min = 1))]
    pub interview_round: Option<u32>,
    #[serde(default)]
    pub start_date: RawInstant,
    #[serde(default)]
    pub end_date: RawInstant,
    pub expected_latest_entry_id: Option<String>,
}

impl AdvanceStatusPayload {
    pub fn into_request(self, match_id: String) -> AdvanceRequest {
        AdvanceRequest {
            match_id,
            new_status: self.status,
            description: self.description,
            actor: self.actor,
            notes: self.notes,
            event_date: self.event_date,
            interview_round: self.interview_round,
            start_date: self.start_date,
            end_date: self.end_date,
            expected_latest_entry_id: self.expected_latest_entry_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceStatusResponse {
    #[serde(rename = "match")]
    pub record: Match,
    pub entry: Option<TimelineEntry>,
    pub deduplicated: bool,
}

impl From<AdvanceOutcome> for AdvanceStatusResponse {
    fn from(outcome: AdvanceOutcome) -> Self {
        Self {
            record: outcome.record,
            entry: outcome.entry,
            deduplicated: outcome.deduplicated,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct RollbackQuery {
    pub expected_latest_entry_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MatchListQuery {
    pub status: Option<MatchStatus>,
    pub candidate_id: Option<String>,
    pub job_id: Option<String>,
    pub company_id: Option<String>,
    pub limit: Option<usize>,
}

impl From<MatchListQuery> for MatchFilter {
    fn from(query: MatchListQuery) -> Self {
        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        Self {
            status: query.status,
            candidate_id: non_blank(query.candidate_id),
            job_id: non_blank(query.job_id),
            company_id: non_blank(query.company_id),
            limit: query.limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchListResponse {
    pub items: Vec<Match>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusDictionaryEntry {
    pub value: MatchStatus,
    pub label: String,
    pub order: usize,
    pub terminal: bool,
    pub next: Vec<MatchStatus>,
}

impl StatusDictionaryEntry {
    pub fn all() -> Vec<Self> {
        MatchStatus::ALL
            .into_iter()
            .enumerate()
            .map(|(order, status)| Self {
                value: status,
                label: status.label().to_string(),
                order,
                terminal: status.is_terminal(),
                next: status.allowed_next().to_vec(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextStatusesResponse {
    pub current: MatchStatus,
    pub next: Vec<MatchStatus>,
}
