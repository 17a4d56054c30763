/*!
 * Integration tests for dispatcher runs over mock backends
 */

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use polysub::app_config::{BackendDescriptor, DispatchConfig, ProviderType, TranslationSettings};
use polysub::providers::mock::{MockBehavior, MockProvider};
use polysub::subtitle_processor::{generate_srt, UnitState};
use polysub::translation::{BackendStatus, Dispatcher, RunContext, Severity};
use polysub::DispatchError;

use crate::common;

fn settings(batch_size: usize) -> TranslationSettings {
    TranslationSettings {
        batch_size,
        ..TranslationSettings::default()
    }
}

fn dispatcher(context: &Arc<RunContext>) -> Dispatcher {
    Dispatcher::new(Arc::clone(context)).with_cooldown(Duration::from_millis(1))
}

/// 25 units, batch size 10, two lanes: three batches and every unit translated
#[tokio::test(flavor = "multi_thread")]
async fn test_run_with_two_working_lanes_should_translate_everything() {
    common::init_logging();
    let context = Arc::new(RunContext::new(common::units(25), Vec::new()));
    let (a, b) = (MockProvider::slow(5), MockProvider::slow(5));

    let report = dispatcher(&context)
        .run_with_backends(&settings(10), vec![common::mock_lane("a", &a), common::mock_lane("b", &b)])
        .await
        .unwrap();

    assert_eq!(report.batches, 3);
    assert!(!report.cancelled);
    assert_eq!(report.stats.total_units, 25);
    assert_eq!(report.stats.completed, 25);
    assert_eq!(report.stats.failed, 0);
    assert!(report.stats.ended_at.is_some());
    assert_eq!(a.call_count() + b.call_count(), 3);

    let units = context.units_snapshot();
    for unit in &units {
        assert_eq!(unit.state(), UnitState::Completed);
        assert_eq!(unit.translated_text, MockProvider::translated(&unit.source_text, "Vietnamese"));
        assert!(matches!(unit.assigned_lane(), Some("Mock a") | Some("Mock b")));
    }
    assert!(context.events().issues().is_empty());
}

/// Every batch goes to exactly one lane, no matter how many lanes compete
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_run_with_many_lanes_should_claim_each_batch_once() {
    let context = Arc::new(RunContext::new(common::units(111), Vec::new()));
    let backends: Vec<MockProvider> = (0..5).map(|_| MockProvider::slow(1)).collect();
    let lanes = backends
        .iter()
        .enumerate()
        .map(|(i, backend)| common::mock_lane(&format!("lane{}", i), backend))
        .collect();

    let report = dispatcher(&context).run_with_backends(&settings(3), lanes).await.unwrap();

    assert_eq!(report.batches, 37);
    let mut claimed = HashSet::new();
    for lane in &report.lanes {
        for index in &lane.claimed {
            assert!(claimed.insert(*index), "batch {} claimed twice", index);
        }
    }
    assert_eq!(claimed, (0..37).collect::<HashSet<_>>());

    // Each source text reached a backend exactly once
    let sent: Vec<String> = backends.iter().flat_map(|b| b.received()).flatten().collect();
    assert_eq!(sent.len(), 111);
    assert_eq!(sent.iter().collect::<HashSet<_>>().len(), 111);
}

/// An always-failing backend fails every unit; export falls back to the source
#[tokio::test(flavor = "multi_thread")]
async fn test_run_with_failing_backend_should_fail_all_units_and_keep_source() {
    let units = common::units(12);
    let original = generate_srt(&units);
    let descriptor = BackendDescriptor::new("bad", ProviderType::DeepL, "Broken");
    let context = Arc::new(RunContext::new(units, vec![descriptor.clone()]));
    let backend = MockProvider::failing();

    let report = dispatcher(&context)
        .run_with_backends(&settings(5), vec![(descriptor, Arc::new(backend.clone()))])
        .await
        .unwrap();

    assert_eq!(report.stats.failed, 12);
    assert_eq!(report.stats.completed, 0);
    assert_eq!(backend.call_count(), 3);
    assert!(context.units_snapshot().iter().all(|u| u.state() == UnitState::Failed));
    assert_eq!(generate_srt(&context.units_snapshot()), original);
    assert_eq!(context.backend_status("bad"), Some(BackendStatus::Idle));

    let failures: Vec<_> = context
        .events()
        .snapshot()
        .into_iter()
        .filter(|e| e.severity == Severity::Error)
        .collect();
    assert_eq!(failures.len(), 3);
    assert!(failures[0].message.starts_with("Batch "));
    assert_eq!(failures[0].source.as_deref(), Some("Broken"));
}

/// A working lane picks up what a failing lane leaves behind
#[tokio::test(flavor = "multi_thread")]
async fn test_run_with_one_failing_lane_should_still_finish_every_unit() {
    let context = Arc::new(RunContext::new(common::units(40), Vec::new()));
    let (bad, good) = (MockProvider::failing(), MockProvider::slow(2));
    let dispatcher = Dispatcher::new(Arc::clone(&context)).with_cooldown(Duration::from_millis(30));

    let report = dispatcher
        .run_with_backends(&settings(2), vec![common::mock_lane("bad", &bad), common::mock_lane("good", &good)])
        .await
        .unwrap();

    assert_eq!(report.stats.processed(), 40);
    assert_eq!(report.stats.failed, bad.call_count() * 2);
    assert!(good.call_count() > bad.call_count());
    assert!(context.units_snapshot().iter().all(|u| u.state().is_finished()));
}

/// Missing answers leave the unit completed with an empty translation
#[tokio::test(flavor = "multi_thread")]
async fn test_run_with_short_answers_should_warn_and_export_source() {
    let context = Arc::new(RunContext::new(common::units(10), Vec::new()));
    let backend = MockProvider::short_by_one();

    let report = dispatcher(&context)
        .run_with_backends(&settings(10), vec![common::mock_lane("short", &backend)])
        .await
        .unwrap();

    assert_eq!(report.stats.completed, 10);
    let units = context.units_snapshot();
    assert_eq!(units[9].state(), UnitState::Completed);
    assert_eq!(units[9].translated_text, "");
    assert_eq!(units[9].export_text(), "Line number 10");
    assert_eq!(units[8].translated_text, MockProvider::translated("Line number 9", "Vietnamese"));

    let issues = context.events().issues();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::Warning);
}

/// Surplus answers are ignored
#[tokio::test(flavor = "multi_thread")]
async fn test_run_with_surplus_answers_should_ignore_extra_entries() {
    let context = Arc::new(RunContext::new(common::units(4), Vec::new()));
    let backend = MockProvider::new(MockBehavior::Surplus);

    dispatcher(&context)
        .run_with_backends(&settings(4), vec![common::mock_lane("extra", &backend)])
        .await
        .unwrap();

    let srt = generate_srt(&context.units_snapshot());
    assert!(!srt.contains("[EXTRA]"));
    assert!(context.events().issues().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_with_rate_limited_backend_should_fail_units_with_reason() {
    let context = Arc::new(RunContext::new(common::units(3), Vec::new()));
    let backend = MockProvider::new(MockBehavior::RateLimited);

    let report = dispatcher(&context)
        .run_with_backends(&settings(3), vec![common::mock_lane("quota", &backend)])
        .await
        .unwrap();

    assert_eq!(report.stats.failed, 3);
    assert!(context
        .events()
        .issues()
        .iter()
        .any(|e| e.message.contains("Rate limit exceeded")));
}

/// Cancelling stops claims; in-flight batches still finish
#[tokio::test(flavor = "multi_thread")]
async fn test_cancel_during_run_should_stop_claiming_and_finalize_stats() {
    let context = Arc::new(RunContext::new(common::units(40), Vec::new()));
    let (a, b) = (MockProvider::slow(40), MockProvider::slow(40));
    let dispatcher = dispatcher(&context);
    let settings = settings(1);

    let (result, _) = tokio::join!(
        dispatcher.run_with_backends(&settings, vec![common::mock_lane("a", &a), common::mock_lane("b", &b)]),
        async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            dispatcher.cancel();
        }
    );
    let report = result.unwrap();

    assert!(report.cancelled);
    let claimed: usize = report.lanes.iter().map(|l| l.claimed.len()).sum();
    let completed: usize = report.lanes.iter().map(|l| l.batches_completed).sum();
    assert!(claimed < 40);
    assert_eq!(claimed, completed);
    assert_eq!(claimed, a.call_count() + b.call_count());

    let units = context.units_snapshot();
    assert_eq!(units.iter().filter(|u| u.state() == UnitState::Completed).count(), claimed);
    assert_eq!(units.iter().filter(|u| u.state() == UnitState::Pending).count(), 40 - claimed);
    assert!(units.iter().all(|u| u.state() != UnitState::Claimed));

    // End time is stamped after the last lane event
    let ended_at = report.stats.ended_at.unwrap();
    let last_success = context
        .events()
        .snapshot()
        .into_iter()
        .filter(|e| e.severity == Severity::Success)
        .map(|e| e.timestamp)
        .max()
        .unwrap();
    assert!(ended_at >= last_success);
    assert!(context.events().snapshot().iter().any(|e| e.message == "Stopping process..."));
    assert!(!context.is_running());
}

/// A second run while one is active is refused
#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_run_should_be_refused() {
    let context = Arc::new(RunContext::new(common::units(6), Vec::new()));
    let backend = MockProvider::slow(30);
    let dispatcher = dispatcher(&context);
    let settings = settings(2);

    let (first, second) = tokio::join!(
        dispatcher.run_with_backends(&settings, vec![common::mock_lane("a", &backend)]),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            dispatcher
                .run_with_backends(&settings, vec![common::mock_lane("b", &backend)])
                .await
        }
    );

    assert_eq!(first.unwrap().stats.completed, 6);
    assert_eq!(second.unwrap_err(), DispatchError::AlreadyRunning);
}

/// Subscribers see events as they happen
#[tokio::test(flavor = "multi_thread")]
async fn test_subscriber_should_receive_start_event_first() {
    let context = Arc::new(RunContext::new(common::units(2), Vec::new()));
    let mut events = context.events().subscribe();
    let backend = MockProvider::working();

    dispatcher(&context)
        .run_with_backends(&settings(2), vec![common::mock_lane("a", &backend)])
        .await
        .unwrap();

    let first = events.recv().await.unwrap();
    assert_eq!(first.message, "Starting translation process...");
    let second = events.recv().await.unwrap();
    assert_eq!(second.message, "Created 1 batches. Using 1 worker threads.");
}

/// `run` builds adapters from the descriptors and skips ineligible ones
#[tokio::test(flavor = "multi_thread")]
async fn test_run_from_descriptors_should_use_simulated_backends() {
    let descriptors = vec![
        BackendDescriptor::new("g", ProviderType::Gemini, "Keyless Gemini"),
        BackendDescriptor::new("d", ProviderType::DeepL, "DeepL"),
        BackendDescriptor::new("m", ProviderType::Microsoft, "Azure").disabled(),
    ];
    let context = Arc::new(RunContext::new(common::units(5), descriptors));
    let config = DispatchConfig {
        simulated_delay_ms: 0,
        ..DispatchConfig::default()
    };

    let report = Dispatcher::from_config(Arc::clone(&context), &config)
        .run(&settings(2))
        .await
        .unwrap();

    assert_eq!(report.lanes.len(), 1);
    assert_eq!(report.lanes[0].descriptor_id, "d");
    let units = context.units_snapshot();
    assert!(units.iter().all(|u| u.translated_text.starts_with("[MOCK DEEPL] ")));
    assert!(units.iter().all(|u| u.assigned_lane() == Some("DeepL")));
}

/// With nothing eligible the run is refused and nothing changes
#[tokio::test(flavor = "multi_thread")]
async fn test_run_without_eligible_descriptors_should_report_error() {
    let descriptors = vec![BackendDescriptor::new("d", ProviderType::DeepL, "DeepL").disabled()];
    let context = Arc::new(RunContext::new(common::units(5), descriptors));

    let err = Dispatcher::new(Arc::clone(&context)).run(&settings(2)).await.unwrap_err();

    assert_eq!(err, DispatchError::NoEligibleBackend);
    assert_eq!(context.pending_positions().len(), 5);
    let events = context.events().snapshot();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].message, "No active APIs configured or missing keys!");
}
