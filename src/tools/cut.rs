//! Cutting a time window out of an event log.
//!
//! The result is again a valid log: it starts with an init burst synthesized
//! from the controller state at the start of the window, followed by the
//! window's events verbatim. Lines that are not events are kept.

use crate::events::{
    Bound, Dispatch, Event, Handler, HandlerError, HandlerId, LineSource, StateStore, Timeline,
    TimelineError,
};
use std::io::{self, Write};
use tracing::info;

pub const HEADER: &str = "jsevents modified with jsoverlay cut";

#[derive(Debug, thiserror::Error)]
pub enum CutError {
    #[error("Replay failed: {0}")]
    Timeline(#[from] TimelineError),

    #[error("Failed to write output: {0}")]
    Io(#[from] io::Error),

    #[error("The log contains no events")]
    NoEvents,
}

/// End of the cut window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CutEnd {
    /// Up to the end of the log.
    #[default]
    Open,
    /// Relative to the first event, like the start, shifted by the delay.
    Until(i64),
    /// Length of the window.
    Duration(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CutOptions {
    /// Window start relative to the first event.
    pub start_ms: i64,
    /// Moves the window earlier by this much.
    pub delay_ms: i64,
    pub end: CutEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutSummary {
    pub first_ms: i64,
    pub start_ms: i64,
    pub end_ms: Option<i64>,
    pub events_written: usize,
}

/// Collects output lines in input order.
#[derive(Debug, Default)]
struct Printer {
    lines: Vec<String>,
    in_window: bool,
    events: usize,
}

impl Handler for Printer {
    fn handle_event(&mut self, event: &Event, _dispatch: &mut Dispatch<'_>) -> Result<(), HandlerError> {
        if !self.in_window {
            return Ok(());
        }
        if event.init {
            return Err(HandlerError::Invariant(format!(
                "init event inside the cut window at {}ms",
                event.timestamp_ms
            )));
        }
        self.lines.push(event.text.clone());
        self.events += 1;
        Ok(())
    }

    fn handle_unknown(&mut self, line: &str, _dispatch: &mut Dispatch<'_>) -> Result<(), HandlerError> {
        self.lines.push(line.to_string());
        Ok(())
    }
}

fn drain(timeline: &mut Timeline, printer: HandlerId, out: &mut dyn Write) -> io::Result<()> {
    if let Some(p) = timeline.handler_mut::<Printer>(printer) {
        for line in p.lines.drain(..) {
            writeln!(out, "{line}")?;
        }
    }
    Ok(())
}

pub fn cut(source: impl LineSource + 'static, out: &mut dyn Write, options: CutOptions) -> Result<CutSummary, CutError> {
    let mut timeline = Timeline::new(source);
    let states = timeline.add(StateStore::new())?;
    let printer = timeline.add(Printer::default())?;

    writeln!(out, "{HEADER}")?;

    // peek at the first event without dispatching it
    timeline.advance_until(Bound::Until(i64::MIN))?;
    let first = timeline
        .pending_event()
        .map(|e| e.timestamp_ms)
        .ok_or(CutError::NoEvents)?;
    timeline.advance_until(Bound::Until(first))?;

    let start = first + options.start_ms - options.delay_ms;
    timeline.advance_until(Bound::Until(start))?;
    drain(&mut timeline, printer, out)?;

    if let Some(store) = timeline.handler::<StateStore>(states) {
        for (channel, value) in store.snapshot() {
            writeln!(out, "{}", Event::new(channel.kind, true, channel.number, start, *value).to_line())?;
        }
    }
    timeline.detach(states)?;

    let end = match options.end {
        CutEnd::Open => None,
        CutEnd::Until(until) => Some(first + until - options.delay_ms),
        CutEnd::Duration(duration) => Some(start + duration),
    };
    if let Some(p) = timeline.handler_mut::<Printer>(printer) {
        p.in_window = true;
    }
    let result = timeline.advance_until(end.map_or(Bound::Unbounded, Bound::Until));
    drain(&mut timeline, printer, out)?;
    result?;

    let events_written = timeline.handler::<Printer>(printer).map_or(0, |p| p.events);
    info!(
        "Cut window {}..{:?} from log starting at {}: {} events",
        start, end, first, events_written
    );
    Ok(CutSummary {
        first_ms: first,
        start_ms: start,
        end_ms: end,
        events_written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const LOG: &str = "\
Driver version is 2.1.0.
Event: type 129, time 100, number 0, value 0
Event: type 130, time 100, number 1, value 0
Event: type 1, time 1100, number 0, value 1
Event: type 2, time 1600, number 1, value 500
Event: type 1, time 2100, number 0, value 0
Event: type 2, time 3100, number 1, value 0
";

    fn run(log: &'static str, options: CutOptions) -> (Result<CutSummary, CutError>, String) {
        let mut out = Vec::new();
        let result = cut(Cursor::new(log), &mut out, options);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn window_starts_with_synthesized_snapshot() {
        let (summary, out) = run(
            LOG,
            CutOptions {
                start_ms: 1000,
                delay_ms: 0,
                end: CutEnd::Duration(1000),
            },
        );
        let summary = summary.unwrap();
        assert_eq!(summary.first_ms, 100);
        assert_eq!(summary.start_ms, 1100);
        assert_eq!(summary.end_ms, Some(2100));
        assert_eq!(summary.events_written, 2);
        assert_eq!(
            out,
            "\
jsevents modified with jsoverlay cut
Driver version is 2.1.0.
Event: type 129, time 1100, number 0, value 1
Event: type 130, time 1100, number 1, value 0
Event: type 2, time 1600, number 1, value 500
Event: type 1, time 2100, number 0, value 0
"
        );
    }

    #[test]
    fn delay_moves_window_earlier() {
        let (summary, out) = run(
            LOG,
            CutOptions {
                start_ms: 1000,
                delay_ms: 500,
                end: CutEnd::Until(2000),
            },
        );
        let summary = summary.unwrap();
        assert_eq!(summary.start_ms, 600);
        assert_eq!(summary.end_ms, Some(1600));
        assert!(out.contains("Event: type 129, time 600, number 0, value 0"));
        assert!(out.ends_with("Event: type 2, time 1600, number 1, value 500\n"));
    }

    #[test]
    fn open_end_runs_to_end_of_log() {
        let (summary, out) = run(LOG, CutOptions::default());
        assert_eq!(summary.unwrap().events_written, 4);
        assert!(out.ends_with("Event: type 2, time 3100, number 1, value 0\n"));
    }

    #[test]
    fn init_event_inside_window_fails() {
        let log = "\
Event: type 129, time 0, number 0, value 0
Event: type 1, time 500, number 0, value 1
Event: type 129, time 900, number 0, value 0
";
        let (result, _) = run(log, CutOptions::default());
        assert!(matches!(
            result,
            Err(CutError::Timeline(TimelineError::Handler { .. }))
        ));
    }

    #[test]
    fn empty_log_is_an_error() {
        let (result, out) = run("Driver version is 2.1.0.\n", CutOptions::default());
        assert!(matches!(result, Err(CutError::NoEvents)));
        assert!(out.starts_with(HEADER));
    }
}
