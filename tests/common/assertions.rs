//! Custom test assertions for integration tests

use report_dl::{Event, PipelineState};
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast;

/// Collect events until `predicate` matches one (inclusive) or `timeout` passes
pub async fn collect_events_until<F>(
    events: &mut broadcast::Receiver<Event>,
    timeout: Duration,
    mut predicate: F,
) -> Vec<Event>
where
    F: FnMut(&Event) -> bool,
{
    let mut collected = Vec::new();

    let _ = tokio::time::timeout(timeout, async {
        while let Ok(event) = events.recv().await {
            let done = predicate(&event);
            collected.push(event);
            if done {
                break;
            }
        }
    })
    .await;

    collected
}

/// Collect every event of a run, up to and including its terminal state
pub async fn collect_run_events(events: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    collect_events_until(events, Duration::from_secs(10), |event| {
        matches!(event, Event::Failed { .. })
            || matches!(
                event,
                Event::StateChanged {
                    state: PipelineState::Done,
                    ..
                }
            )
    })
    .await
}

/// State transitions in the order they were emitted
pub fn state_sequence(events: &[Event]) -> Vec<PipelineState> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::StateChanged { state, .. } => Some(*state),
            _ => None,
        })
        .collect()
}

/// Number of user-facing failure alerts in `events`
pub fn failure_count(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, Event::Failed { .. }))
        .count()
}

/// Assert a file exists with exactly the given contents
pub fn assert_file_contents(path: &Path, expected: &[u8]) {
    let actual = std::fs::read(path)
        .unwrap_or_else(|e| panic!("expected {} to exist: {}", path.display(), e));
    assert_eq!(
        actual.len(),
        expected.len(),
        "size mismatch for {}",
        path.display()
    );
    assert!(actual == expected, "content mismatch for {}", path.display());
}
