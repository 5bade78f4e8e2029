mod common;

use std::sync::Arc;
use std::time::Duration;

use exam_core::time::fixed_now;
use remote::InMemoryExamService;
use remote::memory::Operation;
use services::{AttemptPhase, ErrorSource, ResumeOutcome, SubmitOutcome, SubmitTrigger, TimeSource};
use tokio::time::Instant;

use common::{TokioClock, attempt, controller, opt, q, request};

#[tokio::test(start_paused = true)]
async fn timer_submits_once_at_expiry() {
    let clock = Arc::new(TokioClock::new(fixed_now()));
    let expiry = clock.now() + chrono::Duration::seconds(5);
    let remote = InMemoryExamService::new().with_queued_attempt(attempt("t1", Some(expiry)));
    let controller = controller(&remote, clock);
    controller.resume().await.unwrap();

    let started = Instant::now();
    controller.start(request(Some(1))).await.unwrap();
    assert_eq!(controller.remaining_seconds(), Some(5));
    controller.select_option(q(1), opt(2));

    let mut snapshots = controller.subscribe();
    let terminal = snapshots
        .wait_for(|s| s.phase.is_terminal())
        .await
        .unwrap()
        .clone();
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(5));
    assert!(elapsed < Duration::from_secs(6));
    assert!(terminal.result.is_some());
    assert_eq!(terminal.remaining_seconds, None);

    let (_, sent) = &remote.submissions()[0];
    assert_eq!(sent[0].selected_option_ids, vec![opt(2)]);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(remote.submit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn remaining_time_counts_down() {
    let clock = Arc::new(TokioClock::new(fixed_now()));
    let expiry = clock.now() + chrono::Duration::seconds(90);
    let remote = InMemoryExamService::new().with_queued_attempt(attempt("t1", Some(expiry)));
    let controller = controller(&remote, clock);
    controller.resume().await.unwrap();
    controller.start(request(Some(2))).await.unwrap();

    tokio::time::sleep(Duration::from_millis(30_500)).await;
    assert_eq!(controller.remaining_seconds(), Some(60));
    assert!(controller.snapshot().is_timed());
    assert_eq!(controller.phase(), AttemptPhase::Active);
}

#[tokio::test(start_paused = true)]
async fn untimed_attempt_never_counts_down() {
    let clock = Arc::new(TokioClock::new(fixed_now()));
    let remote = InMemoryExamService::new().with_queued_attempt(attempt("u1", None));
    let controller = controller(&remote, clock);
    controller.resume().await.unwrap();
    controller.start(request(None)).await.unwrap();

    assert_eq!(controller.remaining_seconds(), None);
    tokio::time::sleep(Duration::from_secs(3_600)).await;
    assert_eq!(controller.remaining_seconds(), None);
    assert!(!controller.snapshot().is_timed());
    assert_eq!(controller.phase(), AttemptPhase::Active);
    assert_eq!(remote.submit_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn expired_attempt_is_submitted_on_resume() {
    let clock = Arc::new(TokioClock::new(fixed_now()));
    let expiry = clock.now() - chrono::Duration::seconds(10);
    let remote = InMemoryExamService::new().with_active_attempt(attempt("late", Some(expiry)));
    let controller = controller(&remote, clock);

    let outcome = controller.resume().await.unwrap();
    let ResumeOutcome::AutoSubmitted(SubmitOutcome::Submitted(result)) = outcome else {
        panic!("expected an automatic submission, got {outcome:?}");
    };
    assert_eq!(result.attempt_id.as_str(), "late");
    assert_eq!(controller.phase(), AttemptPhase::Terminal);
    assert_eq!(controller.remaining_seconds(), None);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(remote.submit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_manual_and_timeout_submit_once() {
    let clock = Arc::new(TokioClock::new(fixed_now()));
    let remote = InMemoryExamService::new()
        .with_queued_attempt(attempt("r1", None))
        .with_submit_delay(Duration::from_millis(500));
    let controller = controller(&remote, clock);
    controller.resume().await.unwrap();
    controller.start(request(None)).await.unwrap();

    let (manual, timeout) = tokio::join!(
        controller.submit(SubmitTrigger::Manual),
        controller.submit(SubmitTrigger::Timeout),
    );
    let outcomes = [manual.unwrap(), timeout.unwrap()];
    let submitted = outcomes
        .iter()
        .filter(|o| matches!(o, SubmitOutcome::Submitted(_)))
        .count();
    assert_eq!(submitted, 1);
    assert!(outcomes.contains(&SubmitOutcome::Ignored));
    assert_eq!(remote.submit_count(), 1);
    assert_eq!(controller.phase(), AttemptPhase::Terminal);
}

#[tokio::test(start_paused = true)]
async fn expiry_during_manual_submit_sends_nothing_more() {
    let clock = Arc::new(TokioClock::new(fixed_now()));
    let expiry = clock.now() + chrono::Duration::seconds(3);
    let remote = InMemoryExamService::new()
        .with_queued_attempt(attempt("r2", Some(expiry)))
        .with_submit_delay(Duration::from_secs(10));
    let controller = controller(&remote, clock);
    controller.resume().await.unwrap();
    controller.start(request(Some(1))).await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    let outcome = controller.submit(SubmitTrigger::Manual).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Submitted(_)));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(remote.submit_count(), 1);
    assert_eq!(controller.phase(), AttemptPhase::Terminal);
}

#[tokio::test(start_paused = true)]
async fn failed_auto_submit_waits_for_manual_retry() {
    let clock = Arc::new(TokioClock::new(fixed_now()));
    let expiry = clock.now() + chrono::Duration::seconds(2);
    let remote = InMemoryExamService::new().with_queued_attempt(attempt("f1", Some(expiry)));
    remote.fail_next(Operation::Submit, 1);
    let controller = controller(&remote, clock);
    controller.resume().await.unwrap();
    controller.start(request(Some(1))).await.unwrap();
    controller.select_option(q(2), opt(3));

    let mut snapshots = controller.subscribe();
    snapshots
        .wait_for(|s| s.phase == AttemptPhase::Errored(ErrorSource::Submit))
        .await
        .unwrap();
    assert!(controller.answers().is_selected(q(2), opt(3)));

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(remote.submit_count(), 1, "timer must not fire again");

    let retried = controller.submit(SubmitTrigger::Manual).await.unwrap();
    assert!(matches!(retried, SubmitOutcome::Submitted(_)));
    assert_eq!(remote.submit_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancelled_attempt_timer_never_fires() {
    let clock = Arc::new(TokioClock::new(fixed_now()));
    let expiry = clock.now() + chrono::Duration::seconds(5);
    let remote = InMemoryExamService::new().with_queued_attempt(attempt("c1", Some(expiry)));
    let controller = controller(&remote, clock);
    controller.resume().await.unwrap();
    controller.start(request(Some(1))).await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    controller.cancel().await.unwrap();
    assert_eq!(controller.remaining_seconds(), None);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(remote.submit_count(), 0);
    assert_eq!(controller.phase(), AttemptPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn failed_submit_stops_reporting_time_left() {
    let clock = Arc::new(TokioClock::new(fixed_now()));
    let expiry = clock.now() + chrono::Duration::seconds(60);
    let remote = InMemoryExamService::new().with_queued_attempt(attempt("s1", Some(expiry)));
    let controller = controller(&remote, clock);
    controller.resume().await.unwrap();
    controller.start(request(Some(1))).await.unwrap();

    tokio::time::sleep(Duration::from_millis(4_500)).await;
    assert_eq!(controller.remaining_seconds(), Some(56));

    remote.fail_next(Operation::Submit, 1);
    assert!(controller.submit(SubmitTrigger::Manual).await.is_err());
    assert_eq!(controller.phase(), AttemptPhase::Errored(ErrorSource::Submit));
    assert_eq!(controller.remaining_seconds(), None);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(controller.remaining_seconds(), None);
    assert!(!controller.snapshot().is_timed());
    assert_eq!(remote.submit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_cancel_restores_time_left() {
    let clock = Arc::new(TokioClock::new(fixed_now()));
    let expiry = clock.now() + chrono::Duration::seconds(30);
    let remote = InMemoryExamService::new().with_queued_attempt(attempt("s2", Some(expiry)));
    let controller = controller(&remote, clock);
    controller.resume().await.unwrap();
    controller.start(request(Some(1))).await.unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;
    remote.fail_next(Operation::Cancel, 1);
    assert!(controller.cancel().await.is_err());
    assert_eq!(controller.phase(), AttemptPhase::Active);
    assert_eq!(controller.remaining_seconds(), Some(20));

    let mut snapshots = controller.subscribe();
    snapshots
        .wait_for(|s| s.phase.is_terminal())
        .await
        .unwrap();
    assert_eq!(remote.submit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_controller_stops_the_timer() {
    let clock = Arc::new(TokioClock::new(fixed_now()));
    let expiry = clock.now() + chrono::Duration::seconds(5);
    let remote = InMemoryExamService::new().with_queued_attempt(attempt("d1", Some(expiry)));
    let controller = controller(&remote, clock);
    controller.resume().await.unwrap();
    controller.start(request(Some(1))).await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    drop(controller);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(remote.submit_count(), 0);
    assert!(remote.active().is_some());
}

#[tokio::test(start_paused = true)]
async fn failed_submit_on_resume_keeps_attempt_for_manual_retry() {
    let clock = Arc::new(TokioClock::new(fixed_now()));
    let expiry = clock.now() - chrono::Duration::seconds(10);
    let remote = InMemoryExamService::new().with_active_attempt(attempt("late", Some(expiry)));
    remote.fail_next(Operation::Submit, 1);
    let controller = controller(&remote, clock);

    assert!(controller.resume().await.is_err());
    assert_eq!(controller.phase(), AttemptPhase::Errored(ErrorSource::Submit));
    assert_eq!(controller.remaining_seconds(), None);
    assert_eq!(controller.question_count(), 3);

    let retried = controller.submit(SubmitTrigger::Manual).await.unwrap();
    assert!(matches!(retried, SubmitOutcome::Submitted(_)));
    assert_eq!(remote.submit_count(), 2);
}
