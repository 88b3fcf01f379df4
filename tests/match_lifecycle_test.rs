mod common;

use chrono::{TimeZone, Utc};
use common::{contains_null, harness, harness_with, new_match, seed, MockCandidates, MockJobs};
use recruitment_matching::error::Error;
use recruitment_matching::models::candidate::CandidateStatus;
use recruitment_matching::models::match_status::MatchStatus;
use recruitment_matching::services::match_service::AdvanceRequest;
use recruitment_matching::utils::time::{RawInstant, StoredInstant};

use MatchStatus::*;

#[tokio::test]
async fn applying_records_entry_and_event_date() {
    let h = harness();
    let record = seed(&h.service, &[]).await;
    assert_eq!(record.status, Suggested);
    assert!(record.timeline.is_empty());

    let outcome = h
        .service
        .advance(
            AdvanceRequest::new(&record.id, Applied, "Candidate applied", "recruiter-1")
                .event_date("2024-03-01T00:00:00.000Z"),
        )
        .await
        .unwrap();

    let applied_on = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let entry = outcome.entry.expect("entry recorded");
    assert!(!outcome.deduplicated);
    assert_eq!(outcome.record.status, Applied);
    assert_eq!(outcome.record.timeline.len(), 1);
    assert_eq!(entry.status, Applied);
    assert_eq!(entry.event_date, Some(applied_on));
    assert_eq!(entry.id, format!("timeline_{}", entry.timestamp.timestamp_millis()));
    assert_eq!(outcome.record.applied_date, Some(applied_on));
    assert!(outcome.dispatched.completed.is_empty());

    let reloaded = h.service.get(&record.id).await.unwrap();
    assert_eq!(reloaded.status, Applied);
    assert_eq!(reloaded.timeline.find(&entry.id), Some(&entry));
}

#[tokio::test]
async fn moving_to_screening_extends_the_ledger() {
    let h = harness();
    let record = seed(&h.service, &[Applied]).await;

    let outcome = h
        .service
        .advance(AdvanceRequest::new(
            &record.id,
            DocumentScreening,
            "moved to screening",
            "user1",
        ))
        .await
        .unwrap();

    assert_eq!(outcome.record.timeline.len(), 2);
    assert_eq!(outcome.record.status, DocumentScreening);
    assert_eq!(
        outcome.record.timeline.latest().map(|e| e.description.as_str()),
        Some("moved to screening")
    );
}

#[tokio::test]
async fn rapid_duplicate_rejection_is_recorded_once() {
    let h = harness();
    let record = seed(&h.service, &[Applied]).await;
    let reject = || AdvanceRequest::new(&record.id, Rejected, "no fit", "user1");

    let first = h.service.advance(reject()).await.unwrap();
    let second = h.service.advance(reject()).await.unwrap();

    assert!(first.entry.is_some());
    assert!(second.deduplicated);
    let stored = h.service.get(&record.id).await.unwrap();
    let rejections = stored
        .timeline
        .entries()
        .iter()
        .filter(|e| e.status == Rejected)
        .count();
    assert_eq!(rejections, 1);
    assert_eq!(stored.status, Rejected);
    assert!(stored.rejected_date.is_some());
}

#[tokio::test]
async fn offer_acceptance_syncs_candidate_job_and_notifies() {
    let mut candidates = MockCandidates::new();
    candidates
        .expect_set_status()
        .withf(|candidate_id, status| {
            candidate_id.to_string() == "cand-1" && *status == CandidateStatus::Hired
        })
        .times(1)
        .returning(|_, _| Ok(()));
    let mut jobs = MockJobs::new();
    jobs.expect_merge_flags()
        .withf(|job_id, flags| job_id.to_string() == "job-1" && flags.proven_track == Some(true))
        .times(1)
        .returning(|_, _| Ok(()));

    let mut h = harness_with(candidates, jobs);
    let record = seed(&h.service, &[Applied, Offer]).await;

    let outcome = h
        .service
        .advance(
            AdvanceRequest::new(&record.id, OfferAccepted, "Offer signed", "recruiter-1")
                .notes("joins in April")
                .start_date("2025-04-01"),
        )
        .await
        .unwrap();

    assert_eq!(outcome.record.status, OfferAccepted);
    assert_eq!(
        outcome.record.start_date,
        Some(Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap())
    );
    assert_eq!(
        outcome.dispatched.completed,
        vec!["candidate_status_sync", "job_flag_sync"]
    );
    assert_eq!(outcome.dispatched.detached, vec!["progress_notification"]);

    let notification = h.notifications.recv().await.expect("notification posted");
    assert_eq!(notification.match_id, record.id);
    assert_eq!(notification.status, OfferAccepted);
    assert_eq!(notification.company_id, "co-1");
    assert_eq!(notification.notes.as_deref(), Some("joins in April"));
}

#[tokio::test]
async fn failed_collaborator_does_not_fail_the_transition() {
    let mut candidates = MockCandidates::new();
    candidates
        .expect_set_status()
        .times(1)
        .returning(|_, _| Err(anyhow::anyhow!("candidate store offline")));
    let mut jobs = MockJobs::new();
    jobs.expect_merge_flags().times(1).returning(|_, _| Ok(()));

    let h = harness_with(candidates, jobs);
    let record = seed(&h.service, &[Offer]).await;

    let outcome = h
        .service
        .advance(AdvanceRequest::new(&record.id, OfferAccepted, "Offer signed", "recruiter-1"))
        .await
        .unwrap();

    assert_eq!(outcome.record.status, OfferAccepted);
    assert_eq!(outcome.dispatched.failed, vec!["candidate_status_sync"]);
    assert_eq!(outcome.dispatched.completed, vec!["job_flag_sync"]);
    assert_eq!(h.service.get(&record.id).await.unwrap().status, OfferAccepted);
}

#[tokio::test]
async fn resubmitting_the_same_update_is_ignored() {
    let h = harness();
    let record = seed(&h.service, &[]).await;
    let request = AdvanceRequest::new(&record.id, Applied, "Candidate applied", "u1").notes("n");

    let first = h.service.advance(request.clone()).await.unwrap();
    let second = h.service.advance(request).await.unwrap();

    assert!(!first.deduplicated);
    assert!(second.deduplicated);
    assert!(second.entry.is_none());
    assert_eq!(second.record.timeline.len(), 1);
    assert_eq!(h.service.get(&record.id).await.unwrap().timeline.len(), 1);
}

#[tokio::test]
async fn different_notes_are_not_duplicates() {
    let h = harness();
    let record = seed(&h.service, &[Applied, DocumentScreening, DocumentPassed]).await;

    h.service
        .advance(AdvanceRequest::new(&record.id, Interview, "Round 1", "u1").notes("first"))
        .await
        .unwrap();
    h.service
        .advance(AdvanceRequest::new(&record.id, InterviewPassed, "Passed", "u1"))
        .await
        .unwrap();
    let outcome = h
        .service
        .advance(AdvanceRequest::new(&record.id, Interview, "Round 2", "u1").notes("second"))
        .await
        .unwrap();

    assert!(!outcome.deduplicated);
    assert_eq!(outcome.record.current_interview_round, Some(2));
    assert_eq!(outcome.record.timeline.interview_count(), 2);
}

#[tokio::test]
async fn timestamps_strictly_increase_along_the_pipeline() {
    let h = harness();
    let record = seed(
        &h.service,
        &[
            Applied,
            DocumentScreening,
            DocumentPassed,
            Interview,
            InterviewPassed,
            Interview,
            InterviewPassed,
            Offer,
        ],
    )
    .await;

    let entries = record.timeline.entries();
    assert_eq!(entries.len(), 8);
    for pair in entries.windows(2) {
        assert!(pair[0].timestamp < pair[1].timestamp);
        assert_ne!(pair[0].id, pair[1].id);
    }
    assert_eq!(record.status, Offer);
    assert_eq!(record.timeline.latest().map(|e| e.status), Some(Offer));
}

#[tokio::test]
async fn interview_passed_never_carries_an_event_date() {
    let h = harness();
    let record = seed(&h.service, &[Applied, DocumentScreening, DocumentPassed, Interview]).await;

    let outcome = h
        .service
        .advance(
            AdvanceRequest::new(&record.id, InterviewPassed, "Passed round 1", "u1")
                .event_date("2024-05-10T09:00:00Z"),
        )
        .await
        .unwrap();

    let entry = outcome.entry.unwrap();
    assert_eq!(entry.event_date, None);

    let raw = h.store.raw_document(&record.id).await.unwrap();
    let stored = raw["timeline"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["id"] == entry.id.as_str())
        .unwrap();
    assert!(stored.get("eventDate").is_none());
}

#[tokio::test]
async fn event_dates_accept_stored_and_unparseable_shapes() {
    let h = harness();
    let record = seed(&h.service, &[]).await;

    let stored = StoredInstant {
        seconds: 1_709_251_200,
        nanoseconds: 0,
    };
    let applied = h
        .service
        .advance(
            AdvanceRequest::new(&record.id, Applied, "Applied", "u1")
                .event_date(RawInstant::Stored(stored)),
        )
        .await
        .unwrap();
    assert_eq!(
        applied.entry.unwrap().event_date,
        Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
    );

    let before = Utc::now() - chrono::Duration::seconds(1);
    let screened = h
        .service
        .advance(
            AdvanceRequest::new(&record.id, DocumentScreening, "Screening", "u1")
                .event_date("next tuesday-ish"),
        )
        .await
        .unwrap();
    let fallback = screened.entry.unwrap().event_date.expect("falls back to now");
    assert!(fallback >= before);
}

#[tokio::test]
async fn illegal_transitions_are_rejected_without_writing() {
    let h = harness();
    let record = seed(&h.service, &[]).await;

    let err = h
        .service
        .advance(AdvanceRequest::new(&record.id, OfferAccepted, "Skip ahead", "u1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::IllegalTransition {
            from: Suggested,
            to: OfferAccepted
        }
    ));

    let rejected = seed(&h.service, &[Rejected]).await;
    let err = h
        .service
        .advance(AdvanceRequest::new(&rejected.id, Applied, "Reopen", "u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::IllegalTransition { from: Rejected, .. }));

    let untouched = h.service.get(&record.id).await.unwrap();
    assert!(untouched.timeline.is_empty());
    assert_eq!(untouched.status, Suggested);
}

#[tokio::test]
async fn blank_and_unknown_ids_fail_fast() {
    let h = harness();

    let err = h
        .service
        .advance(AdvanceRequest::new("  ", Applied, "Applied", "u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let err = h
        .service
        .advance(AdvanceRequest::new("missing", Applied, "Applied", "u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let err = h.service.rollback("", "timeline_1", None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[tokio::test]
async fn stale_latest_entry_token_is_a_conflict() {
    let h = harness();
    let record = seed(&h.service, &[]).await;

    let applied = h
        .service
        .advance(AdvanceRequest::new(&record.id, Applied, "Applied", "u1").expect_latest(""))
        .await
        .unwrap();
    let seen = applied.entry.unwrap().id;

    h.service
        .advance(
            AdvanceRequest::new(&record.id, DocumentScreening, "Screening", "u2")
                .expect_latest(seen.clone()),
        )
        .await
        .unwrap();

    let err = h
        .service
        .advance(AdvanceRequest::new(&record.id, Rejected, "Rejected", "u3").expect_latest(seen))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
    assert_eq!(h.service.get(&record.id).await.unwrap().status, DocumentScreening);
}

#[tokio::test]
async fn rolling_back_the_only_entry_restores_the_initial_status() {
    let h = harness();
    let record = h.service.create(new_match(PendingProposal)).await.unwrap();

    let outcome = h
        .service
        .advance(AdvanceRequest::new(&record.id, Suggested, "Proposal approved", "u1"))
        .await
        .unwrap();
    let entry_id = outcome.entry.unwrap().id;

    let rolled_back = h.service.rollback(&record.id, &entry_id, None).await.unwrap();
    assert!(rolled_back.timeline.is_empty());
    assert_eq!(rolled_back.status, PendingProposal);
    assert_eq!(h.service.get(&record.id).await.unwrap().status, PendingProposal);
}

#[tokio::test]
async fn only_the_latest_entry_can_be_rolled_back() {
    let h = harness();
    let record = seed(&h.service, &[Applied, DocumentScreening, DocumentPassed]).await;
    let middle = record.timeline.entries()[1].id.clone();

    let err = h.service.rollback(&record.id, &middle, None).await.unwrap_err();
    match err {
        Error::NotLatest { entry_id, latest_id } => {
            assert_eq!(entry_id, middle);
            assert_eq!(Some(latest_id.as_str()), record.latest_entry_id());
        }
        other => panic!("unexpected error {other:?}"),
    }

    let err = h
        .service
        .rollback(&record.id, "timeline_0", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let latest = record.latest_entry_id().unwrap().to_string();
    let rolled_back = h
        .service
        .rollback(&record.id, &latest, Some(&latest))
        .await
        .unwrap();
    assert_eq!(rolled_back.timeline.len(), 2);
    assert_eq!(rolled_back.status, DocumentScreening);
}

#[tokio::test]
async fn rolling_back_an_interview_recomputes_the_round() {
    let h = harness();
    let record = seed(
        &h.service,
        &[Applied, DocumentScreening, DocumentPassed, Interview, InterviewPassed],
    )
    .await;
    let round_two = h
        .service
        .advance(AdvanceRequest::new(&record.id, Interview, "Round 2", "u9"))
        .await
        .unwrap();
    assert_eq!(round_two.record.current_interview_round, Some(2));

    let entry_id = round_two.entry.unwrap().id;
    let rolled_back = h.service.rollback(&record.id, &entry_id, None).await.unwrap();
    assert_eq!(rolled_back.status, InterviewPassed);
    assert_eq!(rolled_back.current_interview_round, Some(1));
}

#[tokio::test]
async fn persisted_documents_never_contain_nulls() {
    let h = harness();
    let record = seed(&h.service, &[Applied]).await;

    let raw = h.store.raw_document(&record.id).await.unwrap();
    assert!(!contains_null(&raw));
    assert!(raw.get("offerDate").is_none());
    assert!(raw.get("notes").is_none());
    assert_eq!(raw["status"], "applied");
    assert_eq!(raw["initialStatus"], "suggested");
}

#[tokio::test]
async fn queries_and_stats_reflect_the_pipeline() {
    let h = harness();
    seed(&h.service, &[Applied]).await;
    seed(&h.service, &[Rejected]).await;
    let mut other = new_match(Suggested);
    other.candidate_id = "cand-2".into();
    other.score = 90.0;
    h.service.create(other).await.unwrap();

    assert_eq!(h.service.by_candidate("cand-1").await.unwrap().len(), 2);
    assert_eq!(h.service.by_candidate("cand-2").await.unwrap().len(), 1);
    assert!(h.service.by_job(" ").await.unwrap().is_empty());
    assert_eq!(h.service.by_company("co-1").await.unwrap().len(), 3);

    let stats = h.service.stats().await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.by_status[&Applied], 1);
    assert_eq!(stats.by_status[&Rejected], 1);
    assert_eq!(stats.by_status[&Suggested], 1);
    assert_eq!(stats.by_status[&Offer], 0);
    assert_eq!(stats.average_score, 78);
    assert_eq!(stats.this_month, 3);
}

#[tokio::test]
async fn next_statuses_follow_the_transition_table() {
    let h = harness();
    let record = seed(&h.service, &[Offer]).await;

    let (current, next) = h.service.next_statuses(&record.id).await.unwrap();
    assert_eq!(current, Offer);
    assert_eq!(next, vec![OfferAccepted, Rejected, Withdrawn]);
}

#[tokio::test]
async fn creation_requires_an_entry_point_status() {
    let h = harness();

    let err = h.service.create(new_match(Interview)).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let mut blank = new_match(Suggested);
    blank.job_id = "".into();
    let err = h.service.create(blank).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[tokio::test]
async fn interview_round_is_cleared_after_leaving_interviews() {
    let h = harness();
    for next in [Offer, Rejected] {
        let record = seed(
            &h.service,
            &[Applied, DocumentScreening, DocumentPassed, Interview],
        )
        .await;
        assert_eq!(record.current_interview_round, Some(1));

        let outcome = h
            .service
            .advance(AdvanceRequest::new(&record.id, next, "left interviews", "u1"))
            .await
            .unwrap();
        assert_eq!(outcome.record.current_interview_round, None, "{next}");

        let stored = h.service.get(&record.id).await.unwrap();
        assert_eq!(stored.current_interview_round, None, "{next}");
    }
}

#[tokio::test]
async fn offer_records_its_date() {
    let h = harness();
    let record = seed(&h.service, &[Applied]).await;

    let outcome = h
        .service
        .advance(
            AdvanceRequest::new(&record.id, Offer, "Offer sent", "u1").event_date("2025-03-15"),
        )
        .await
        .unwrap();
    assert_eq!(
        outcome.record.offer_date,
        Some(Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap())
    );

    let without_date = seed(&h.service, &[]).await;
    let outcome = h
        .service
        .advance(AdvanceRequest::new(&without_date.id, Offer, "Offer sent", "u1"))
        .await
        .unwrap();
    let entry = outcome.entry.unwrap();
    assert_eq!(entry.event_date, None);
    assert_eq!(outcome.record.offer_date, Some(entry.timestamp));
}

#[tokio::test]
async fn end_date_is_kept_whatever_the_status() {
    let h = harness();
    let record = seed(&h.service, &[Applied]).await;

    let outcome = h
        .service
        .advance(
            AdvanceRequest::new(&record.id, Withdrawn, "Candidate withdrew", "u1")
                .end_date("2025-06-30T12:00:00Z"),
        )
        .await
        .unwrap();

    let ends = Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap();
    assert_eq!(outcome.record.end_date, Some(ends));
    assert_eq!(outcome.record.start_date, None);
    assert_eq!(h.service.get(&record.id).await.unwrap().end_date, Some(ends));

    let raw = h.store.raw_document(&record.id).await.unwrap();
    assert!(raw["endDate"].as_str().unwrap().starts_with("2025-06-30T12:00:00"));
}

#[tokio::test]
async fn repeats_outside_the_dedup_window_are_not_suppressed() {
    let h = harness();
    let service = h.service.clone().with_dedup_window(chrono::Duration::zero());
    let record = seed(&service, &[Applied]).await;
    let reject = || AdvanceRequest::new(&record.id, Rejected, "no fit", "user1");

    service.advance(reject()).await.unwrap();
    let err = service.advance(reject()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::IllegalTransition {
            from: Rejected,
            to: Rejected
        }
    ));

    let retried = h.service.advance(reject()).await.unwrap();
    assert!(retried.deduplicated);
    assert_eq!(h.service.get(&record.id).await.unwrap().timeline.len(), 2);
}

#[tokio::test]
async fn rollback_clears_the_removed_stage_date() {
    let h = harness();
    let record = seed(&h.service, &[Applied, Rejected]).await;
    assert!(record.rejected_date.is_some());

    let latest = record.latest_entry_id().unwrap().to_string();
    let rolled_back = h.service.rollback(&record.id, &latest, None).await.unwrap();
    assert_eq!(rolled_back.status, Applied);
    assert_eq!(rolled_back.rejected_date, None);
    assert_eq!(rolled_back.applied_date, record.applied_date);

    let offered = seed(&h.service, &[Offer]).await;
    let latest = offered.latest_entry_id().unwrap().to_string();
    let rolled_back = h.service.rollback(&offered.id, &latest, None).await.unwrap();
    assert_eq!(rolled_back.status, Suggested);
    assert_eq!(rolled_back.offer_date, None);

    let raw = h.store.raw_document(&offered.id).await.unwrap();
    assert!(raw.get("offerDate").is_none());
}
