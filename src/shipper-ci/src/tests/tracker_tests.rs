//! Tests for job state tracking and display transitions.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;

use crate::display::Outcome;
use crate::job::{Conclusion, Job, JobStatus};
use crate::test_support::{RecordingSink, SinkEvent};
use crate::tracker::{IndicatorKind, StateTracker, TrackerOptions};

fn tracker() -> (StateTracker, RecordingSink) {
    tracker_with(TrackerOptions::default())
}

fn tracker_with(options: TrackerOptions) -> (StateTracker, RecordingSink) {
    let sink = RecordingSink::default();
    let tracker = StateTracker::with_options(Arc::new(sink.clone()), options);
    (tracker, sink)
}

fn running(id: u64, name: &str) -> Job {
    Job::new(id, name, JobStatus::Running)
}

fn queued(id: u64, name: &str) -> Job {
    Job::new(id, name, JobStatus::Queued)
}

fn completed(id: u64, name: &str, conclusion: Conclusion) -> Job {
    Job::new(id, name, JobStatus::Completed).with_conclusion(conclusion)
}

/// Every tracked id has at most one indicator and the sink agrees on the count.
fn assert_exclusive(tracker: &StateTracker, sink: &RecordingSink, ids: &[u64]) {
    let bound = ids
        .iter()
        .filter(|id| tracker.indicator_kind(**id).is_some())
        .count();
    assert_eq!(sink.live_count(), bound);
    assert_eq!(sink.live_animated(), tracker.animated_ids().len());
}

#[test]
fn test_new_jobs_get_matching_indicators() {
    let (tracker, sink) = tracker();

    let transitions = tracker.update(&[running(1, "build"), queued(2, "deploy")]);

    assert_eq!(transitions, vec!["1 started: build", "2 started: deploy"]);
    assert_eq!(tracker.indicator_kind(1), Some(IndicatorKind::Animated));
    assert_eq!(tracker.indicator_kind(2), Some(IndicatorKind::Static));
    assert_eq!(
        sink.events(),
        vec![
            SinkEvent::AnimatedCreated {
                handle: 1,
                text: "build (running)".into()
            },
            SinkEvent::StaticCreated {
                handle: 2,
                text: "deploy (queued)".into()
            },
        ]
    );
}

#[test]
fn test_unchanged_batch_is_a_noop() {
    let (tracker, _sink) = tracker();
    let batch = vec![
        running(1, "build"),
        queued(2, "deploy"),
        completed(3, "lint", Conclusion::Success),
    ];

    assert_eq!(tracker.update(&batch).len(), 3);
    assert!(tracker.update(&batch).is_empty());
}

#[test]
fn test_invalid_ids_are_discarded() {
    let (tracker, sink) = tracker();

    let transitions = tracker.update(&[queued(0, "ghost"), queued(4, "real")]);

    assert_eq!(transitions, vec!["4 started: real"]);
    assert!(tracker.job(0).is_none());
    assert_eq!(tracker.len(), 1);
    assert_eq!(sink.live_count(), 1);
}

#[test]
fn test_duplicate_ids_keep_first_occurrence() {
    let (tracker, _sink) = tracker();

    let transitions = tracker.update(&[running(5, "first"), queued(5, "second")]);

    assert_eq!(transitions, vec!["5 started: first"]);
    assert_eq!(tracker.len(), 1);
    let job = tracker.job(5).unwrap();
    assert_eq!(job.name, "first");
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(tracker.indicator_kind(5), Some(IndicatorKind::Animated));
}

#[test]
fn test_completion_stops_animated_indicator() {
    let (tracker, sink) = tracker();
    tracker.update(&[running(1, "build")]);

    let transitions = tracker.update(&[completed(1, "build", Conclusion::Success)]);

    assert_eq!(transitions, vec!["1: running -> success"]);
    assert!(tracker.animated_ids().is_empty());
    assert_eq!(tracker.indicator_kind(1), None);
    let events = sink.events();
    assert!(events.contains(&SinkEvent::Finalized {
        handle: 1,
        outcome: Outcome::Positive,
        text: "build (success)".into(),
    }));
    assert_eq!(events.last(), Some(&SinkEvent::Stopped { handle: 1 }));
    assert_eq!(sink.live_count(), 0);
}

#[test]
fn test_completion_keeps_static_line_in_place() {
    let (tracker, sink) = tracker();
    tracker.update(&[queued(1, "deploy")]);

    tracker.update(&[completed(1, "deploy", Conclusion::Skipped)]);

    assert_eq!(tracker.indicator_kind(1), Some(IndicatorKind::Static));
    assert_eq!(
        sink.events().last(),
        Some(&SinkEvent::Finalized {
            handle: 1,
            outcome: Outcome::Neutral,
            text: "deploy (skipped)".into(),
        })
    );
}

#[test]
fn test_non_clean_conclusions_finalize_negative() {
    let (tracker, sink) = tracker();
    tracker.update(&[running(1, "a"), running(2, "b")]);

    tracker.update(&[
        completed(1, "a", Conclusion::Failure),
        completed(2, "b", Conclusion::Other("stale".into())),
    ]);

    let negatives = sink
        .events()
        .into_iter()
        .filter(|event| {
            matches!(
                event,
                SinkEvent::Finalized {
                    outcome: Outcome::Negative,
                    ..
                }
            )
        })
        .count();
    assert_eq!(negatives, 2);
}

#[test]
fn test_job_seen_completed_is_finalized_immediately() {
    let (tracker, sink) = tracker();

    tracker.update(&[completed(9, "docs", Conclusion::Neutral)]);

    assert_eq!(tracker.indicator_kind(9), Some(IndicatorKind::Static));
    assert_eq!(
        sink.events(),
        vec![
            SinkEvent::StaticCreated {
                handle: 1,
                text: "docs (neutral)".into()
            },
            SinkEvent::Finalized {
                handle: 1,
                outcome: Outcome::Neutral,
                text: "docs (neutral)".into()
            },
        ]
    );
}

#[test]
fn test_static_line_replaced_when_job_starts_running() {
    let (tracker, sink) = tracker();
    tracker.update(&[queued(1, "build")]);

    let transitions = tracker.update(&[running(1, "build")]);

    assert_eq!(transitions, vec!["1: queued -> running"]);
    assert_eq!(tracker.indicator_kind(1), Some(IndicatorKind::Animated));
    let events = sink.events();
    assert_eq!(
        &events[1..],
        &[
            SinkEvent::Cleared { handle: 1 },
            SinkEvent::AnimatedCreated {
                handle: 2,
                text: "build (running)".into()
            },
        ]
    );
    assert_exclusive(&tracker, &sink, &[1]);
}

#[test]
fn test_spinner_turns_static_in_place_when_job_stops_running() {
    let (tracker, sink) = tracker();
    tracker.update(&[running(1, "build")]);

    tracker.update(&[queued(1, "build")]);

    assert_eq!(tracker.indicator_kind(1), Some(IndicatorKind::Static));
    assert_eq!(
        sink.events().last(),
        Some(&SinkEvent::ConvertedToStatic {
            from: 1,
            to: 2,
            text: "build (queued)".into(),
        })
    );
    assert_exclusive(&tracker, &sink, &[1]);
}

#[test]
fn test_indicator_exclusivity_through_lifecycle() {
    let (tracker, sink) = tracker();
    let ids = [1, 2];
    let steps = vec![
        vec![queued(1, "build"), running(2, "test")],
        vec![running(1, "build"), running(2, "test")],
        vec![queued(1, "build"), queued(2, "test")],
        vec![running(1, "build"), running(2, "test")],
        vec![running(1, "build"), completed(2, "test", Conclusion::Failure)],
        vec![
            completed(1, "build", Conclusion::Success),
            completed(2, "test", Conclusion::Failure),
        ],
    ];

    for batch in steps {
        tracker.update(&batch);
        assert_exclusive(&tracker, &sink, &ids);
    }
    assert!(tracker.animated_ids().is_empty());
}

#[test]
fn test_unchanged_static_line_is_refreshed() {
    let (tracker, sink) = tracker();
    let started = Utc::now() - chrono::Duration::seconds(30);
    let job = queued(1, "deploy").with_started_at(started);
    tracker.update(std::slice::from_ref(&job));

    assert!(tracker.update(std::slice::from_ref(&job)).is_empty());

    assert_eq!(
        sink.events().last(),
        Some(&SinkEvent::Updated {
            handle: 1,
            text: "deploy (queued)".into(),
        })
    );
}

#[test]
fn test_missing_job_is_reported_but_kept() {
    let (tracker, sink) = tracker();
    tracker.update(&[running(1, "build"), running(2, "test")]);

    let transitions = tracker.update(&[running(1, "build")]);

    assert_eq!(transitions, vec!["2 removed"]);
    assert_eq!(tracker.len(), 2);
    assert!(tracker.job(2).is_some());
    assert_eq!(tracker.indicator_kind(2), Some(IndicatorKind::Animated));
    assert_eq!(sink.live_count(), 2);
}

#[test]
fn test_missing_job_finalized_as_lost_when_enabled() {
    let (tracker, sink) = tracker_with(TrackerOptions {
        lost_after: Some(2),
        ..TrackerOptions::default()
    });
    tracker.update(&[running(1, "build"), running(2, "test").with_group("CI")]);

    tracker.update(&[running(1, "build")]);
    assert_eq!(tracker.indicator_kind(2), Some(IndicatorKind::Animated));

    tracker.update(&[running(1, "build")]);
    assert_eq!(tracker.indicator_kind(2), None);
    assert!(tracker.job(2).is_some());
    let events = sink.events();
    assert!(events.contains(&SinkEvent::Finalized {
        handle: 2,
        outcome: Outcome::Neutral,
        text: "CI/test (lost)".into(),
    }));
    assert_eq!(events.last(), Some(&SinkEvent::Stopped { handle: 2 }));
}

#[test]
fn test_reappearing_job_resets_missed_count() {
    let (tracker, _sink) = tracker_with(TrackerOptions {
        lost_after: Some(2),
        ..TrackerOptions::default()
    });
    tracker.update(&[running(1, "build"), running(2, "test")]);
    tracker.update(&[running(1, "build")]);
    tracker.update(&[running(1, "build"), running(2, "test")]);
    tracker.update(&[running(1, "build")]);

    assert_eq!(tracker.indicator_kind(2), Some(IndicatorKind::Animated));
}

#[test]
fn test_running_job_back_after_lost_gets_a_new_spinner() {
    let (tracker, sink) = tracker_with(TrackerOptions {
        lost_after: Some(1),
        ..TrackerOptions::default()
    });
    tracker.update(&[running(1, "build"), running(2, "test")]);
    tracker.update(&[running(1, "build")]);
    assert_eq!(tracker.indicator_kind(2), None);

    let transitions = tracker.update(&[running(1, "build"), running(2, "test")]);

    assert_eq!(transitions, vec!["2 reappeared"]);
    assert_eq!(tracker.indicator_kind(2), Some(IndicatorKind::Animated));
    assert_eq!(tracker.animated_ids(), vec![1, 2]);
    assert_eq!(
        sink.events().last(),
        Some(&SinkEvent::AnimatedCreated {
            handle: 3,
            text: "test (running)".into(),
        })
    );
    assert_exclusive(&tracker, &sink, &[1, 2]);

    // Back to normal tracking afterwards.
    assert!(tracker.update(&[running(1, "build"), running(2, "test")]).is_empty());
}

#[test]
fn test_queued_job_back_after_lost_replaces_lost_line() {
    let (tracker, sink) = tracker_with(TrackerOptions {
        lost_after: Some(1),
        ..TrackerOptions::default()
    });
    tracker.update(&[queued(1, "deploy")]);
    tracker.update(&[]);

    let transitions = tracker.update(&[queued(1, "deploy")]);

    assert_eq!(transitions, vec!["1 reappeared"]);
    assert_eq!(tracker.indicator_kind(1), Some(IndicatorKind::Static));
    assert_eq!(
        &sink.events()[2..],
        &[
            SinkEvent::Cleared { handle: 1 },
            SinkEvent::StaticCreated {
                handle: 2,
                text: "deploy (queued)".into()
            },
        ]
    );
    assert_exclusive(&tracker, &sink, &[1]);
}

#[test]
fn test_completed_static_line_is_finalized_once() {
    let (tracker, sink) = tracker();
    let batch = vec![
        completed(1, "lint", Conclusion::Success),
        queued(2, "deploy"),
    ];
    tracker.update(&batch);
    tracker.update(&[
        completed(1, "lint", Conclusion::Success),
        completed(2, "deploy", Conclusion::Failure),
    ]);

    for _ in 0..3 {
        tracker.update(&[
            completed(1, "lint", Conclusion::Success),
            completed(2, "deploy", Conclusion::Failure),
        ]);
    }

    let finalized = |handle: usize| {
        sink.events()
            .into_iter()
            .filter(|event| matches!(event, SinkEvent::Finalized { handle: h, .. } if *h == handle))
            .count()
    };
    assert_eq!(finalized(1), 1);
    assert_eq!(finalized(2), 1);
    assert!(
        !sink
            .events()
            .iter()
            .any(|event| matches!(event, SinkEvent::Updated { .. }))
    );
}

#[test]
fn test_spinner_refreshed_when_running_job_changes_in_place() {
    let (tracker, sink) = tracker();
    tracker.update(&[running(1, "build")]);

    let transitions =
        tracker.update(&[running(1, "build").with_conclusion(Conclusion::Failure)]);

    assert_eq!(transitions, vec!["1: running -> running"]);
    assert_eq!(tracker.indicator_kind(1), Some(IndicatorKind::Animated));
    assert_eq!(
        sink.events(),
        vec![
            SinkEvent::AnimatedCreated {
                handle: 1,
                text: "build (running)".into()
            },
            SinkEvent::Updated {
                handle: 1,
                text: "build (running)".into()
            },
        ]
    );
    assert_exclusive(&tracker, &sink, &[1]);
}

#[tokio::test]
async fn test_running_label_refreshes_until_completion() {
    let (tracker, sink) = tracker_with(TrackerOptions {
        refresh_interval: Duration::from_millis(10),
        lost_after: None,
    });
    let started = Utc::now() - chrono::Duration::seconds(5);
    tracker.update(&[running(1, "build").with_started_at(started)]);

    tokio::time::sleep(Duration::from_millis(80)).await;

    let refreshes = |sink: &RecordingSink| {
        sink.events()
            .into_iter()
            .filter(|event| matches!(event, SinkEvent::Updated { handle: 1, .. }))
            .count()
    };
    assert!(refreshes(&sink) > 0);

    tracker.update(&[completed(1, "build", Conclusion::Success)
        .with_started_at(started)
        .with_completed_at(started + chrono::Duration::seconds(65))]);
    let after_completion = refreshes(&sink);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(refreshes(&sink), after_completion);
    assert!(sink.events().contains(&SinkEvent::Finalized {
        handle: 1,
        outcome: Outcome::Positive,
        text: "build (success, 1m 5s)".into(),
    }));
}
