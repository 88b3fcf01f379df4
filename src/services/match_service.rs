use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::database::match_store::MatchStore;
use crate::error::{Error, Result};
use crate::models::match_record::{Match, MatchFilter, MatchStats, NewMatch};
use crate::models::match_status::MatchStatus;
use crate::models::timeline::{Timeline, TimelineEntry, DEFAULT_DEDUP_WINDOW_SECS};
use crate::services::side_effects::{plan_side_effects, DispatchReport, SideEffectDispatcher};
use crate::utils::time::{self, RawInstant};

/// A requested stage transition for one match.
#[derive(Debug, Clone)]
pub struct AdvanceRequest {
    pub match_id: String,
    pub new_status: MatchStatus,
    pub description: String,
    pub actor: String,
    pub notes: Option<String>,
    pub event_date: RawInstant,
    pub interview_round: Option<u32>,
    pub start_date: RawInstant,
    pub end_date: RawInstant,
    /// Latest timeline entry id the caller last saw; empty string for an empty timeline.
    pub expected_latest_entry_id: Option<String>,
}

impl AdvanceRequest {
    pub fn new(
        match_id: impl Into<String>,
        new_status: MatchStatus,
        description: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            match_id: match_id.into(),
            new_status,
            description: description.into(),
            actor: actor.into(),
            notes: None,
            event_date: RawInstant::Absent,
            interview_round: None,
            start_date: RawInstant::Absent,
            end_date: RawInstant::Absent,
            expected_latest_entry_id: None,
        }
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn event_date(mut self, raw: impl Into<RawInstant>) -> Self {
        self.event_date = raw.into();
        self
    }

    pub fn interview_round(mut self, round: u32) -> Self {
        self.interview_round = Some(round);
        self
    }

    pub fn start_date(mut self, raw: impl Into<RawInstant>) -> Self {
        self.start_date = raw.into();
        self
    }

    pub fn end_date(mut self, raw: impl Into<RawInstant>) -> Self {
        self.end_date = raw.into();
        self
    }

    pub fn expect_latest(mut self, entry_id: impl Into<String>) -> Self {
        self.expected_latest_entry_id = Some(entry_id.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct AdvanceOutcome {
    pub record: Match,
    /// The recorded entry; `None` when the request duplicated the latest entry.
    pub entry: Option<TimelineEntry>,
    pub deduplicated: bool,
    pub dispatched: DispatchReport,
}

/// Single entry point for match status changes.
#[derive(Clone)]
pub struct MatchService {
    store: Arc<dyn MatchStore>,
    dispatcher: SideEffectDispatcher,
    dedup_window: Duration,
}

impl MatchService {
    pub fn new(store: Arc<dyn MatchStore>, dispatcher: SideEffectDispatcher) -> Self {
        Self {
            store,
            dispatcher,
            dedup_window: Duration::seconds(DEFAULT_DEDUP_WINDOW_SECS),
        }
    }

    pub fn with_dedup_window(mut self, window: Duration) -> Self {
        self.dedup_window = window;
        self
    }

    pub async fn create(&self, new: NewMatch) -> Result<Match> {
        require_id(&new.candidate_id, "candidate id")?;
        require_id(&new.job_id, "job id")?;
        require_id(&new.company_id, "company id")?;
        if !new.status.is_entry_point() {
            return Err(Error::InvalidArgument(format!(
                "A match cannot be created with status {}",
                new.status
            )));
        }

        let now = time::now();
        let record = Match {
            id: String::new(),
            candidate_id: new.candidate_id,
            job_id: new.job_id,
            company_id: new.company_id,
            score: new.score,
            status: new.status,
            initial_status: new.status,
            match_reasons: new.match_reasons,
            timeline: Timeline::default(),
            current_interview_round: None,
            applied_date: None,
            offer_date: None,
            rejected_date: None,
            start_date: None,
            end_date: None,
            notes: clean_notes(new.notes),
            created_at: now,
            updated_at: now,
            created_by: new.created_by,
            version: 0,
        };

        let created = self.store.create(record).await?;
        info!(match_id = %created.id, status = %created.status, "match created");
        Ok(created)
    }

    pub async fn get(&self, match_id: &str) -> Result<Match> {
        require_id(match_id, "match id")?;
        self.store
            .get(match_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Match {} not found", match_id)))
    }

    pub async fn list(&self, filter: &MatchFilter) -> Result<Vec<Match>> {
        self.store.list(filter).await
    }

    pub async fn by_candidate(&self, candidate_id: &str) -> Result<Vec<Match>> {
        if candidate_id.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.list(&MatchFilter {
            candidate_id: Some(candidate_id.to_string()),
            ..MatchFilter::default()
        })
        .await
    }

    pub async fn by_job(&self, job_id: &str) -> Result<Vec<Match>> {
        if job_id.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.list(&MatchFilter {
            job_id: Some(job_id.to_string()),
            ..MatchFilter::default()
        })
        .await
    }

    pub async fn by_company(&self, company_id: &str) -> Result<Vec<Match>> {
        if company_id.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.list(&MatchFilter {
            company_id: Some(company_id.to_string()),
            ..MatchFilter::default()
        })
        .await
    }

    pub async fn stats(&self) -> Result<MatchStats> {
        let matches = self.list(&MatchFilter::default()).await?;
        Ok(MatchStats::collect(&matches, time::now()))
    }

    /// Current status and the statuses legally reachable from it.
    pub async fn next_statuses(&self, match_id: &str) -> Result<(MatchStatus, Vec<MatchStatus>)> {
        let record = self.get(match_id).await?;
        Ok((record.status, record.status.allowed_next().to_vec()))
    }

    pub async fn advance(&self, request: AdvanceRequest) -> Result<AdvanceOutcome> {
        require_id(&request.match_id, "match id")?;
        let mut record = self.get(&request.match_id).await?;

        let status = request.new_status;
        let notes = clean_notes(request.notes);
        let timestamp = record.timeline.next_timestamp(time::now());

        if record.timeline.is_duplicate(
            status,
            &request.actor,
            notes.as_deref(),
            timestamp,
            self.dedup_window,
        ) {
            info!(match_id = %record.id, status = %status, actor = %request.actor, "duplicate status update suppressed");
            return Ok(AdvanceOutcome {
                record,
                entry: None,
                deduplicated: true,
                dispatched: DispatchReport::default(),
            });
        }

        ensure_latest(&record, request.expected_latest_entry_id.as_deref())?;
        if !record.status.can_transition_to(status) {
            return Err(Error::IllegalTransition {
                from: record.status,
                to: status,
            });
        }

        let event_date = if status.records_event_date() {
            time::normalize_opt(&request.event_date)
        } else {
            if !request.event_date.is_absent() {
                debug!(match_id = %record.id, status = %status, "event date dropped for arrival-only stage");
            }
            None
        };

        let entry = TimelineEntry {
            id: TimelineEntry::id_for(timestamp),
            status,
            timestamp,
            description: request.description,
            notes,
            event_date,
            created_by: request.actor,
        };
        record.timeline.append(entry.clone(), self.dedup_window);

        record.status = status;
        record.current_interview_round =
            interview_round(&record, status, request.interview_round);
        apply_stage_date(&mut record, status, event_date.unwrap_or(timestamp));
        if let Some(start) = time::normalize_opt(&request.start_date) {
            record.start_date = Some(start);
        }
        if let Some(end) = time::normalize_opt(&request.end_date) {
            record.end_date = Some(end);
        }
        record.updated_at = time::now();

        record.version = self.store.put(&record, record.version).await?;
        info!(
            match_id = %record.id,
            status = %status,
            entry_id = %entry.id,
            "match status updated"
        );

        let effects = plan_side_effects(&record, &entry);
        let dispatched = if effects.is_empty() {
            DispatchReport::default()
        } else {
            self.dispatcher.dispatch(&record.id, effects).await
        };

        Ok(AdvanceOutcome {
            record,
            entry: Some(entry),
            deduplicated: false,
            dispatched,
        })
    }

    /// Deletes the latest timeline entry and recomputes the match status.
    pub async fn rollback(
        &self,
        match_id: &str,
        entry_id: &str,
        expected_latest_entry_id: Option<&str>,
    ) -> Result<Match> {
        require_id(match_id, "match id")?;
        require_id(entry_id, "timeline entry id")?;
        let mut record = self.get(match_id).await?;
        ensure_latest(&record, expected_latest_entry_id)?;

        let removed = record.timeline.retract_latest(entry_id)?;
        record.status = record.timeline.current_status(record.initial_status);
        restore_stage_date(&mut record, removed.status);
        record.current_interview_round = if record.status.is_interview_stage() {
            Some(record.timeline.interview_count().max(1))
        } else {
            None
        };
        record.updated_at = time::now();

        record.version = self.store.put(&record, record.version).await?;
        info!(
            match_id = %record.id,
            entry_id = %removed.id,
            removed_status = %removed.status,
            status = %record.status,
            "timeline entry rolled back"
        );
        Ok(record)
    }
}

fn require_id(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{} must not be blank", what)));
    }
    Ok(())
}

fn clean_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

fn ensure_latest(record: &Match, expected: Option<&str>) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let current = record.latest_entry_id().unwrap_or("");
    if current != expected {
        return Err(Error::Conflict(format!(
            "Match {} has changed: latest timeline entry is {:?}, expected {:?}",
            record.id, current, expected
        )));
    }
    Ok(())
}

fn interview_round(record: &Match, status: MatchStatus, requested: Option<u32>) -> Option<u32> {
    match status {
        MatchStatus::Interview => {
            Some(requested.unwrap_or_else(|| record.timeline.interview_count().max(1)))
        }
        MatchStatus::InterviewPassed => Some(
            requested
                .or(record.current_interview_round)
                .unwrap_or_else(|| record.timeline.interview_count().max(1)),
        ),
        _ => None,
    }
}

// interview and offer_accepted dates live only on the timeline entry
fn apply_stage_date(record: &mut Match, status: MatchStatus, date: DateTime<Utc>) {
    set_stage_date(record, status, Some(date));
}

fn set_stage_date(record: &mut Match, status: MatchStatus, date: Option<DateTime<Utc>>) {
    match status {
        MatchStatus::Applied => record.applied_date = date,
        MatchStatus::Offer => record.offer_date = date,
        MatchStatus::Rejected => record.rejected_date = date,
        _ => {}
    }
}

/// After a rollback, a stage date falls back to the latest remaining entry of
/// that stage, or is cleared when none is left.
fn restore_stage_date(record: &mut Match, removed: MatchStatus) {
    let previous = record
        .timeline
        .entries()
        .iter()
        .rev()
        .find(|entry| entry.status == removed)
        .map(|entry| entry.event_date.unwrap_or(entry.timestamp));
    set_stage_date(record, removed, previous);
}
