#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use mockall::mock;
use recruitment_matching::database::memory_store::MemoryMatchStore;
use recruitment_matching::models::candidate::CandidateStatus;
use recruitment_matching::models::job::JobFlags;
use recruitment_matching::models::match_record::{Match, NewMatch};
use recruitment_matching::models::match_status::MatchStatus;
use recruitment_matching::services::match_service::{AdvanceRequest, MatchService};
use recruitment_matching::services::side_effects::{
    CandidateDirectory, JobDirectory, NotificationChannel, ProgressNotification,
    SideEffectDispatcher,
};
use tokio::sync::mpsc;

mock! {
    pub Candidates {}

    #[async_trait]
    impl CandidateDirectory for Candidates {
        async fn set_status(&self, candidate_id: &str, status: CandidateStatus) -> anyhow::Result<()>;
    }
}

mock! {
    pub Jobs {}

    #[async_trait]
    impl JobDirectory for Jobs {
        async fn merge_flags(&self, job_id: &str, flags: &JobFlags) -> anyhow::Result<()>;
    }
}

/// Forwards every posted notification to a channel so tests can await delivery.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<ProgressNotification>,
}

#[async_trait]
impl NotificationChannel for ChannelNotifier {
    async fn post(&self, payload: &ProgressNotification) -> anyhow::Result<()> {
        self.tx.send(payload.clone())?;
        Ok(())
    }
}

pub struct Harness {
    pub service: MatchService,
    pub store: MemoryMatchStore,
    pub notifications: mpsc::UnboundedReceiver<ProgressNotification>,
}

/// Mocks without expectations panic if called, so this asserts no side effects run.
pub fn harness() -> Harness {
    harness_with(MockCandidates::new(), MockJobs::new())
}

pub fn harness_with(candidates: MockCandidates, jobs: MockJobs) -> Harness {
    let (tx, notifications) = mpsc::unbounded_channel();
    let store = MemoryMatchStore::new();
    let dispatcher = SideEffectDispatcher::new(
        Arc::new(candidates),
        Arc::new(jobs),
        Arc::new(ChannelNotifier { tx }),
    );
    let service = MatchService::new(Arc::new(store.clone()), dispatcher);
    Harness {
        service,
        store,
        notifications,
    }
}

pub fn new_match(status: MatchStatus) -> NewMatch {
    NewMatch {
        candidate_id: "cand-1".into(),
        job_id: "job-1".into(),
        company_id: "co-1".into(),
        score: 72.0,
        status,
        match_reasons: Vec::new(),
        notes: None,
        created_by: "recruiter-1".into(),
    }
}

/// Creates a suggested match and walks it through `path`.
pub async fn seed(service: &MatchService, path: &[MatchStatus]) -> Match {
    let mut record = service
        .create(new_match(MatchStatus::Suggested))
        .await
        .expect("create match");
    for status in path {
        let outcome = service
            .advance(AdvanceRequest::new(
                record.id.clone(),
                *status,
                format!("moved to {}", status),
                "seed-user",
            ))
            .await
            .expect("seed transition");
        assert!(!outcome.deduplicated);
        record = outcome.record;
    }
    record
}

pub fn contains_null(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Array(items) => items.iter().any(contains_null),
        serde_json::Value::Object(map) => map.values().any(contains_null),
        _ => false,
    }
}
