//! Assertion helpers for run event sequences.

use vs_protocol::{Event, Stage};

/// Drain every event currently buffered in `rx`.
pub fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Percentages of all progress events, in order.
pub fn progress_values(events: &[Event]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect()
}

/// Stages entered, in order.
#[allow(dead_code)]
pub fn stages_entered(events: &[Event]) -> Vec<Stage> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::StageStarted { stage, .. } => Some(*stage),
            _ => None,
        })
        .collect()
}

/// Check the envelope every run must produce: it starts with `RunStarted`,
/// ends with exactly one terminal event and progress never decreases.
pub fn assert_event_sequence(events: &[Event]) {
    assert!(!events.is_empty(), "Event sequence is empty");

    assert!(
        matches!(events[0], Event::RunStarted { .. }),
        "First event should be RunStarted, got: {:?}",
        events[0]
    );

    let terminal: Vec<_> = events.iter().filter(|e| e.is_terminal()).collect();
    assert_eq!(terminal.len(), 1, "Expected exactly one terminal event");
    assert!(
        events.last().is_some_and(Event::is_terminal),
        "Last event should be terminal, got: {:?}",
        events.last()
    );

    let progress = progress_values(events);
    assert!(
        progress.windows(2).all(|w| w[0] <= w[1]),
        "Progress went backwards: {progress:?}"
    );
}

/// Error message of the terminal `RunError` event.
#[allow(dead_code)]
pub fn run_error(events: &[Event]) -> Option<&str> {
    events.iter().find_map(|e| match e {
        Event::RunError { error, .. } => Some(error.as_str()),
        _ => None,
    })
}
