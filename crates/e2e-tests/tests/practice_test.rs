//! Adaptive practice E2E tests.
//!
//! Practice outcomes flow through the background worker into performance
//! and review rows; gap detection and session planning read them back.

use std::sync::Arc;

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

use e2e_tests::{maths_graph, record_results};
use tutor_curriculum::DifficultyBand;
use tutor_scheduler::{
    GapSeverity, InMemoryPracticeStore, OutcomeWorker, PracticeOutcome, PracticeScheduler,
    PracticeStore, PracticeStrategy, SpacedRepetitionSchedule, WorkerStats, MIN_EASE_FACTOR,
};

fn scheduler() -> PracticeScheduler {
    PracticeScheduler::new(Arc::new(InMemoryPracticeStore::new())).with_graph(maths_graph())
}

/// 10 attempts with 2 correct is a critical gap.
#[tokio::test]
async fn test_low_accuracy_student_has_critical_gap() {
    let scheduler = scheduler();
    let results = [true, false, false, true, false, false, false, false, false, false];
    record_results(&scheduler, "student-c", "linear_equations", &results).await;

    let gaps = scheduler.detect_gaps("student-c").await.unwrap();
    assert_eq!(gaps.len(), 1);

    let gap = &gaps[0];
    assert_eq!(gap.topic_id, "linear_equations");
    assert!((gap.accuracy - 0.2).abs() < 1e-6);
    assert!(gap.severity >= 0.7, "severity was {}", gap.severity);
    assert_eq!(gap.label, GapSeverity::Critical);

    // Struggling learners get the easiest problems
    let plan = scheduler
        .generate_session("student-c", PracticeStrategy::Focused, 5)
        .await
        .unwrap();
    assert!(plan.items.iter().all(|i| i.difficulty == DifficultyBand::easiest()));
}

#[tokio::test]
async fn test_prerequisite_gaps_come_first() {
    let scheduler = scheduler();
    // Same results on a topic others build on and on a leaf topic
    record_results(&scheduler, "student-p", "pythagoras", &[false, false, false, true]).await;
    record_results(&scheduler, "student-p", "fractions", &[false, false, false, true]).await;

    let gaps = scheduler.detect_gaps("student-p").await.unwrap();
    let order: Vec<&str> = gaps.iter().map(|g| g.topic_id.as_str()).collect();
    assert_eq!(order, vec!["fractions", "pythagoras"]);
    assert_eq!(gaps[0].severity, gaps[1].severity);
    assert!(gaps[0].priority > gaps[1].priority);
}

/// Outcomes queued on the worker are all applied before shutdown completes.
#[tokio::test]
async fn test_worker_pipeline_to_interleaved_session() {
    let store = Arc::new(InMemoryPracticeStore::new());
    let scheduler = Arc::new(PracticeScheduler::new(store.clone()).with_graph(maths_graph()));
    let shutdown = CancellationToken::new();
    let (sender, handle) = OutcomeWorker::spawn(scheduler.clone(), shutdown.clone());

    let plan: &[(&str, &[bool])] = &[
        ("ratio", &[false, false, false, false, true]),
        ("fractions", &[true, false, false, false]),
        ("angles", &[false, true, false, true, false]),
        ("averages", &[false, false, false]),
        ("place_value", &[true, true, true, true]),
    ];
    for (topic, results) in plan {
        for correct in *results {
            sender
                .submit(PracticeOutcome::new("student-w", *topic, *correct))
                .await
                .unwrap();
        }
    }
    // Another student's outcomes stay separate
    sender
        .submit(PracticeOutcome::new("student-x", "ratio", true))
        .await
        .unwrap();

    shutdown.cancel();
    let stats = handle.await.unwrap();
    assert_eq!(stats, WorkerStats { applied: 22, failed: 0 });

    assert_eq!(store.list_performance("student-w").await.unwrap().len(), 5);
    assert_eq!(store.list_performance("student-x").await.unwrap().len(), 1);

    let gaps = scheduler.detect_gaps("student-w").await.unwrap();
    assert_eq!(gaps.len(), 4);
    assert!(gaps.iter().all(|g| g.topic_id != "place_value"));

    let mut rng = StdRng::seed_from_u64(2026);
    let session = scheduler
        .generate_session_with_rng("student-w", PracticeStrategy::Interleaved, 10, &mut rng)
        .await
        .unwrap();
    assert_eq!(session.items.len(), 10);
    assert_eq!(session.targeted.len(), 3);

    // Even split over the top three gaps, remainder to the highest priority
    let mut expected: Vec<(String, usize)> = session
        .targeted
        .iter()
        .zip([4, 3, 3])
        .map(|(g, n)| (g.topic_id.clone(), n))
        .collect();
    expected.sort();
    let mut counts = session.topic_counts();
    counts.sort();
    assert_eq!(counts, expected);
}

#[tokio::test]
async fn test_reviews_come_due() {
    let scheduler = scheduler();
    let start = Utc::now();

    scheduler
        .record_outcome(&PracticeOutcome::new("student-r", "ratio", true).with_quality(5).at(start))
        .await
        .unwrap();
    scheduler
        .record_outcome(&PracticeOutcome::new("student-r", "angles", false).at(start))
        .await
        .unwrap();

    assert!(scheduler.due_reviews("student-r", start).await.unwrap().is_empty());

    let due = scheduler
        .due_reviews("student-r", start + Duration::days(1))
        .await
        .unwrap();
    let topics: Vec<&str> = due.iter().map(|s| s.topic_id.as_str()).collect();
    assert_eq!(topics, vec!["angles", "ratio"]);

    let recorded = scheduler
        .record_outcome(
            &PracticeOutcome::new("student-r", "ratio", true)
                .with_quality(5)
                .at(start + Duration::days(1)),
        )
        .await
        .unwrap();
    assert_eq!(recorded.schedule.interval_days, 6);
    assert_eq!(recorded.schedule.next_review_at, start + Duration::days(7));
}

/// Ease never drops below the floor and a zero rating always resets.
#[test]
fn test_sm2_invariants_over_random_reviews() {
    let mut rng = StdRng::seed_from_u64(7);
    let now = Utc::now();

    for _ in 0..50 {
        let mut schedule = SpacedRepetitionSchedule::new("s", "t", now);
        for _ in 0..30 {
            let quality: u8 = rng.random_range(0..=5);
            let before = schedule.ease_factor;
            schedule.review(quality, now).unwrap();

            assert!(schedule.ease_factor >= MIN_EASE_FACTOR);
            assert!((schedule.ease_factor - before).abs() <= 0.81);
            if quality == 0 {
                assert_eq!(schedule.interval_days, 1);
                assert_eq!(schedule.success_count, 0);
            }
        }
    }
}
