//! Post-transition side effects.
//!
//! The orchestrator only *plans* side effects as a list of [`SideEffect`]
//! commands; [`SideEffectDispatcher`] executes them after the match write has
//! committed. Every effect is best-effort: failures are logged, never returned
//! to the caller of the transition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::candidate::CandidateStatus;
use crate::models::job::JobFlags;
use crate::models::match_record::Match;
use crate::models::match_status::MatchStatus;
use crate::models::timeline::TimelineEntry;

#[async_trait]
pub trait CandidateDirectory: Send + Sync {
    async fn set_status(&self, candidate_id: &str, status: CandidateStatus) -> anyhow::Result<()>;
}

#[async_trait]
pub trait JobDirectory: Send + Sync {
    /// Merges `flags` into the job's existing flags.
    async fn merge_flags(&self, job_id: &str, flags: &JobFlags) -> anyhow::Result<()>;
}

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn post(&self, payload: &ProgressNotification) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressNotification {
    pub match_id: String,
    pub candidate_id: String,
    pub job_id: String,
    pub company_id: String,
    pub status: MatchStatus,
    pub event_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    SyncCandidateStatus {
        candidate_id: String,
        status: CandidateStatus,
    },
    MergeJobFlags {
        job_id: String,
        flags: JobFlags,
    },
    NotifyProgress(ProgressNotification),
}

impl SideEffect {
    pub fn kind(&self) -> &'static str {
        match self {
            SideEffect::SyncCandidateStatus { .. } => "candidate_status_sync",
            SideEffect::MergeJobFlags { .. } => "job_flag_sync",
            SideEffect::NotifyProgress(_) => "progress_notification",
        }
    }
}

/// Side effects triggered by recording `entry` on `record`.
pub fn plan_side_effects(record: &Match, entry: &TimelineEntry) -> Vec<SideEffect> {
    if entry.status != MatchStatus::OfferAccepted {
        return Vec::new();
    }

    vec![
        SideEffect::SyncCandidateStatus {
            candidate_id: record.candidate_id.clone(),
            status: CandidateStatus::Hired,
        },
        SideEffect::MergeJobFlags {
            job_id: record.job_id.clone(),
            flags: JobFlags::proven_track(),
        },
        SideEffect::NotifyProgress(ProgressNotification {
            match_id: record.id.clone(),
            candidate_id: record.candidate_id.clone(),
            job_id: record.job_id.clone(),
            company_id: record.company_id.clone(),
            status: entry.status,
            event_date: entry.event_date,
            notes: entry.notes.clone(),
        }),
    ]
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub completed: Vec<&'static str>,
    pub failed: Vec<&'static str>,
    /// Fire-and-forget effects whose outcome is never observed.
    pub detached: Vec<&'static str>,
}

#[derive(Clone)]
pub struct SideEffectDispatcher {
    candidates: Arc<dyn CandidateDirectory>,
    jobs: Arc<dyn JobDirectory>,
    notifier: Arc<dyn NotificationChannel>,
}

impl SideEffectDispatcher {
    pub fn new(
        candidates: Arc<dyn CandidateDirectory>,
        jobs: Arc<dyn JobDirectory>,
        notifier: Arc<dyn NotificationChannel>,
    ) -> Self {
        Self {
            candidates,
            jobs,
            notifier,
        }
    }

    pub async fn execute(&self, effect: &SideEffect) -> anyhow::Result<()> {
        match effect {
            SideEffect::SyncCandidateStatus {
                candidate_id,
                status,
            } => self.candidates.set_status(candidate_id, *status).await,
            SideEffect::MergeJobFlags { job_id, flags } => {
                self.jobs.merge_flags(job_id, flags).await
            }
            SideEffect::NotifyProgress(payload) => self.notifier.post(payload).await,
        }
    }

    /// Runs collaborator updates in order and detaches notifications.
    pub async fn dispatch(&self, match_id: &str, effects: Vec<SideEffect>) -> DispatchReport {
        let mut report = DispatchReport::default();

        for effect in effects {
            let kind = effect.kind();
            match effect {
                SideEffect::NotifyProgress(payload) => {
                    let notifier = self.notifier.clone();
                    let match_id = match_id.to_string();
                    tokio::spawn(async move {
                        if let Err(e) = notifier.post(&payload).await {
                            warn!(match_id = %match_id, error = ?e, "progress notification failed");
                        }
                    });
                    report.detached.push(kind);
                }
                other => match self.execute(&other).await {
                    Ok(()) => {
                        info!(match_id = %match_id, effect = kind, "side effect applied");
                        report.completed.push(kind);
                    }
                    Err(e) => {
                        warn!(match_id = %match_id, effect = kind, error = ?e, "side effect failed");
                        report.failed.push(kind);
                    }
                },
            }
        }

        report
    }
}
