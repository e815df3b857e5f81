//! Sequential replay of an event stream.
//!
//! A [`Timeline`] pulls lines from a [`LineSource`], parses them, and hands each
//! event to the active handlers of its [`Registry`]. Replay can be bounded by a
//! timestamp or by the end of the device's initial state burst; the first event
//! outside the window is kept as the *pending* event and delivered by the next
//! call, so windows can be advanced piece by piece.
//!
//! ```text
//!            step / advance_until / feed
//!   RUNNING ─────────────────────────────► RUNNING
//!      │ end of input, exit(), handler failure
//!      ▼
//!   STOPPED  (absorbing)
//! ```

use crate::events::error::TimelineError;
use crate::events::event::{self, Event};
use crate::events::registry::{Handler, HandlerId, Registry};
use std::io::BufRead;
use tracing::{debug, error, info, trace};

/// Supplier of input lines, one at a time. `None` marks the end of input.
pub trait LineSource {
    fn next_line(&mut self) -> std::io::Result<Option<String>>;
}

impl<R: BufRead> LineSource for R {
    fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        if self.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }
}

/// Replay window for [`Timeline::advance_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Everything until the input is exhausted.
    Unbounded,
    /// Events with `timestamp_ms <= t`.
    Until(i64),
    /// Events of the initial state burst only.
    Initialized,
}

impl Bound {
    fn admits(self, event: &Event) -> bool {
        match self {
            Bound::Unbounded => true,
            Bound::Until(t) => event.timestamp_ms <= t,
            Bound::Initialized => event.init,
        }
    }
}

pub struct Timeline {
    source: Box<dyn LineSource>,
    registry: Registry,
    running: bool,
    pending_event: Option<Event>,
    previous_event: Option<Event>,
    exit_status: i32,
}

impl Timeline {
    pub fn new(source: impl LineSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            registry: Registry::new(),
            running: true,
            pending_event: None,
            previous_event: None,
            exit_status: 0,
        }
    }

    /// A timeline without a line source, driven only through [`Timeline::feed`].
    pub fn detached() -> Self {
        Self::new(std::io::empty())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn exit_status(&self) -> i32 {
        self.exit_status
    }

    /// Stops the timeline. Any later replay call returns immediately.
    pub fn exit(&mut self) {
        if self.running {
            info!("Timeline stopped by request");
        }
        self.running = false;
    }

    /// Last event that was dispatched.
    pub fn previous_event(&self) -> Option<&Event> {
        self.previous_event.as_ref()
    }

    /// Event read ahead of the current window, if any.
    pub fn pending_event(&self) -> Option<&Event> {
        self.pending_event.as_ref()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Registers a handler without activating it.
    pub fn register(&mut self, handler: impl Handler + 'static) -> HandlerId {
        self.registry.register(Box::new(handler))
    }

    /// Registers and activates a handler.
    pub fn add(&mut self, handler: impl Handler + 'static) -> Result<HandlerId, TimelineError> {
        let id = self.register(handler);
        self.attach(id)?;
        Ok(id)
    }

    pub fn attach(&mut self, id: HandlerId) -> Result<(), TimelineError> {
        self.ensure_idle()?;
        self.registry.attach(id)?;
        Ok(())
    }

    pub fn detach(&mut self, id: HandlerId) -> Result<(), TimelineError> {
        self.ensure_idle()?;
        self.registry.detach(id)?;
        Ok(())
    }

    pub fn handler<T: Handler + 'static>(&self, id: HandlerId) -> Option<&T> {
        self.registry.get(id)
    }

    pub fn handler_mut<T: Handler + 'static>(&mut self, id: HandlerId) -> Option<&mut T> {
        self.registry.get_mut(id)
    }

    /// Dispatches the next event. Returns `false` once the timeline has stopped.
    pub fn step(&mut self) -> Result<bool, TimelineError> {
        self.ensure_idle()?;
        if !self.running {
            return Ok(false);
        }
        let event = match self.pending_event.take() {
            Some(event) => event,
            None => match self.next_event()? {
                Some(event) => event,
                None => {
                    self.stop_at_end();
                    return Ok(false);
                }
            },
        };
        if !self.running {
            return Ok(false);
        }
        self.dispatch_event(event)?;
        Ok(self.running)
    }

    /// Dispatches events while they fall inside `bound`.
    ///
    /// Returns `true` when replay halted at the window edge (the first event
    /// outside the window is now pending) and `false` when the timeline stopped.
    pub fn advance_until(&mut self, bound: Bound) -> Result<bool, TimelineError> {
        self.ensure_idle()?;
        if !self.running {
            return Ok(false);
        }
        loop {
            let event = match self.pending_event.take() {
                Some(event) => event,
                None => match self.next_event()? {
                    Some(event) => event,
                    None => {
                        self.stop_at_end();
                        return Ok(false);
                    }
                },
            };
            if !self.running {
                return Ok(false);
            }
            if !bound.admits(&event) {
                trace!("Holding event at {} for {:?}", event.timestamp_ms, bound);
                self.pending_event = Some(event);
                return Ok(true);
            }
            self.dispatch_event(event)?;
            if !self.running {
                return Ok(false);
            }
        }
    }

    /// Parses and dispatches one externally supplied line immediately.
    ///
    /// Returns the event when the line was one.
    pub fn feed(&mut self, line: &str) -> Result<Option<Event>, TimelineError> {
        self.ensure_idle()?;
        if !self.running {
            return Ok(None);
        }
        let line = line.trim_end_matches(['\n', '\r']);
        match event::parse(line) {
            Some(event) => {
                self.dispatch_event(event.clone())?;
                Ok(Some(event))
            }
            None => {
                self.dispatch_unknown(line)?;
                Ok(None)
            }
        }
    }

    fn ensure_idle(&self) -> Result<(), TimelineError> {
        if self.registry.is_dispatching() {
            error!("Timeline invoked while dispatching");
            return Err(TimelineError::DispatchInProgress);
        }
        Ok(())
    }

    fn stop_at_end(&mut self) {
        if self.running {
            info!("End of input, timeline stopped");
        }
        self.running = false;
    }

    // Reads lines until one parses as an event; the rest go to the unknown-line channel.
    // Yields nothing once a handler has stopped the timeline.
    fn next_event(&mut self) -> Result<Option<Event>, TimelineError> {
        while let Some(line) = self.source.next_line()? {
            if let Some(event) = event::parse(&line) {
                return Ok(Some(event));
            }
            self.dispatch_unknown(&line)?;
            if !self.running {
                debug!("Stopped while reading unknown lines");
                return Ok(None);
            }
        }
        Ok(None)
    }

    fn dispatch_event(&mut self, event: Event) -> Result<(), TimelineError> {
        let result = self
            .registry
            .dispatch(&mut self.running, |h, d| h.handle_event(&event, d));
        self.previous_event = Some(event);
        result.map_err(|e| self.fail(e))
    }

    fn dispatch_unknown(&mut self, line: &str) -> Result<(), TimelineError> {
        debug!("Unknown line: {:?}", line);
        self.registry
            .dispatch(&mut self.running, |h, d| h.handle_unknown(line, d))
            .map_err(|e| self.fail(e))
    }

    fn fail(&mut self, e: TimelineError) -> TimelineError {
        if !matches!(e, TimelineError::DispatchInProgress) {
            error!("Dispatch failed, stopping timeline: {}", e);
            self.running = false;
            self.exit_status = 1;
        }
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::error::{HandlerError, RegistryError};
    use crate::events::event::{Channel, EventKind};
    use crate::events::registry::Dispatch;
    use crate::events::state_store::StateStore;
    use std::io::Cursor;

    fn lines(events: &[(bool, i64, i64)]) -> String {
        events
            .iter()
            .map(|&(init, time, value)| Event::new(EventKind::Button, init, 0, time, value).to_line())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn timeline(text: &str) -> Timeline {
        Timeline::new(Cursor::new(text.to_string()))
    }

    #[derive(Default)]
    struct Recorder {
        times: Vec<i64>,
        inits: Vec<bool>,
        unknown: Vec<String>,
    }

    impl Handler for Recorder {
        fn handle_event(&mut self, event: &Event, _d: &mut Dispatch<'_>) -> Result<(), HandlerError> {
            self.times.push(event.timestamp_ms);
            self.inits.push(event.init);
            Ok(())
        }

        fn handle_unknown(&mut self, line: &str, _d: &mut Dispatch<'_>) -> Result<(), HandlerError> {
            self.unknown.push(line.to_string());
            Ok(())
        }
    }

    #[test]
    fn bounded_replay_is_resumable_and_idempotent() {
        let mut tl = timeline(&lines(&[(false, 0, 1), (false, 10, 0), (false, 20, 1), (false, 30, 0)]));
        let rec = tl.add(Recorder::default()).unwrap();

        assert!(tl.advance_until(Bound::Until(15)).unwrap());
        assert_eq!(tl.handler::<Recorder>(rec).unwrap().times, vec![0, 10]);
        assert_eq!(tl.pending_event().unwrap().timestamp_ms, 20);
        assert_eq!(tl.previous_event().unwrap().timestamp_ms, 10);

        assert!(tl.advance_until(Bound::Until(15)).unwrap());
        assert_eq!(tl.handler::<Recorder>(rec).unwrap().times, vec![0, 10]);
        assert_eq!(tl.pending_event().unwrap().timestamp_ms, 20);

        assert!(tl.advance_until(Bound::Until(20)).unwrap());
        assert_eq!(tl.handler::<Recorder>(rec).unwrap().times, vec![0, 10, 20]);

        assert!(!tl.advance_until(Bound::Unbounded).unwrap());
        assert_eq!(tl.handler::<Recorder>(rec).unwrap().times, vec![0, 10, 20, 30]);
        assert!(!tl.is_running());
        assert!(!tl.step().unwrap());
    }

    #[test]
    fn initialized_bound_stops_at_first_live_event() {
        let mut tl = timeline(&lines(&[(true, 0, 1), (true, 0, 0), (false, 5, 1), (true, 6, 0)]));
        let rec = tl.add(Recorder::default()).unwrap();

        assert!(tl.advance_until(Bound::Initialized).unwrap());
        let recorder = tl.handler::<Recorder>(rec).unwrap();
        assert_eq!(recorder.inits, vec![true, true]);
        let pending = tl.pending_event().unwrap();
        assert!(!pending.init);
        assert_eq!(pending.timestamp_ms, 5);
    }

    #[test]
    fn step_consumes_pending_event_first() {
        let mut tl = timeline(&lines(&[(false, 0, 1), (false, 10, 0)]));
        let rec = tl.add(Recorder::default()).unwrap();
        tl.advance_until(Bound::Until(-1)).unwrap();
        assert_eq!(tl.pending_event().unwrap().timestamp_ms, 0);

        assert!(tl.step().unwrap());
        assert!(tl.pending_event().is_none());
        assert!(tl.step().unwrap());
        assert!(!tl.step().unwrap());
        assert_eq!(tl.handler::<Recorder>(rec).unwrap().times, vec![0, 10]);
    }

    #[test]
    fn unknown_lines_reach_handlers() {
        let text = format!(
            "Driver version is 2.1.0.\n{}\nTesting ... (interrupt to exit)\n",
            lines(&[(false, 0, 1)])
        );
        let mut tl = timeline(&text);
        let rec = tl.add(Recorder::default()).unwrap();
        tl.advance_until(Bound::Unbounded).unwrap();
        let recorder = tl.handler::<Recorder>(rec).unwrap();
        assert_eq!(recorder.times, vec![0]);
        assert_eq!(
            recorder.unknown,
            vec!["Driver version is 2.1.0.", "Testing ... (interrupt to exit)"]
        );
    }

    /// Exercises membership changes from inside its own dispatch pass.
    #[derive(Default)]
    struct Mutator {
        me: Option<HandlerId>,
        other: Option<HandlerId>,
        errors: Vec<RegistryError>,
        calls: usize,
    }

    impl Handler for Mutator {
        fn handle_event(&mut self, _event: &Event, d: &mut Dispatch<'_>) -> Result<(), HandlerError> {
            self.calls += 1;
            if self.calls > 1 {
                return Ok(());
            }
            let (me, other) = (self.me.unwrap(), self.other.unwrap());
            if let Err(e) = d.attach(me) {
                self.errors.push(e);
            }
            d.detach(me)?;
            if let Err(e) = d.detach(me) {
                self.errors.push(e);
            }
            if let Err(e) = d.attach(me) {
                self.errors.push(e);
            }
            d.attach(other)?;
            if let Err(e) = d.attach(other) {
                self.errors.push(e);
            }
            if let Err(e) = d.detach(other) {
                self.errors.push(e);
            }
            Ok(())
        }
    }

    #[test]
    fn membership_changes_apply_after_the_pass() {
        let mut tl = timeline(&lines(&[(false, 0, 1), (false, 10, 0)]));
        let mutator = tl.add(Mutator::default()).unwrap();
        let late = tl.register(Recorder::default());
        {
            let m = tl.handler_mut::<Mutator>(mutator).unwrap();
            m.me = Some(mutator);
            m.other = Some(late);
        }

        assert!(tl.step().unwrap());
        // the late recorder was queued during the pass and must not see its event
        assert!(tl.handler::<Recorder>(late).unwrap().times.is_empty());
        assert_eq!(tl.registry().active(), &[late]);
        assert_eq!(
            tl.handler::<Mutator>(mutator).unwrap().errors,
            vec![
                RegistryError::AlreadyActive(mutator),
                RegistryError::AlreadyRemoving(mutator),
                RegistryError::Removing(mutator),
                RegistryError::AlreadyAdding(late),
                RegistryError::Adding(late),
            ]
        );

        assert!(tl.step().unwrap());
        assert_eq!(tl.handler::<Recorder>(late).unwrap().times, vec![10]);
        assert_eq!(tl.handler::<Mutator>(mutator).unwrap().calls, 1);
    }

    struct Strict;

    impl Handler for Strict {
        fn handle_event(&mut self, _event: &Event, d: &mut Dispatch<'_>) -> Result<(), HandlerError> {
            let ghost = d.active()[0];
            d.detach(ghost)?;
            d.detach(ghost)?;
            Ok(())
        }
    }

    #[test]
    fn registry_misuse_in_handler_stops_timeline() {
        let mut tl = timeline(&lines(&[(false, 0, 1), (false, 10, 0)]));
        let strict = tl.add(Strict).unwrap();
        let err = tl.step().unwrap_err();
        assert!(matches!(
            err,
            TimelineError::Handler {
                handler,
                source: HandlerError::Registry(RegistryError::AlreadyRemoving(_)),
            } if handler == strict
        ));
        assert!(!tl.is_running());
        assert_eq!(tl.exit_status(), 1);
        // queued removal was discarded
        assert_eq!(tl.registry().active(), &[strict]);
    }

    struct ExitAt(i64);

    impl Handler for ExitAt {
        fn handle_event(&mut self, event: &Event, d: &mut Dispatch<'_>) -> Result<(), HandlerError> {
            if event.timestamp_ms >= self.0 {
                d.exit();
            }
            Ok(())
        }
    }

    #[test]
    fn exit_from_handler_ends_replay_early() {
        let mut tl = timeline(&lines(&[(false, 0, 1), (false, 10, 0), (false, 20, 1)]));
        let rec = tl.add(Recorder::default()).unwrap();
        tl.add(ExitAt(10)).unwrap();
        assert!(!tl.advance_until(Bound::Unbounded).unwrap());
        assert_eq!(tl.handler::<Recorder>(rec).unwrap().times, vec![0, 10]);
        assert_eq!(tl.exit_status(), 0);
        assert!(!tl.advance_until(Bound::Unbounded).unwrap());
        assert_eq!(tl.handler::<Recorder>(rec).unwrap().times, vec![0, 10]);
    }

    #[test]
    fn exit_mid_pass_still_reaches_later_handlers() {
        let mut tl = timeline(&lines(&[(false, 0, 1), (false, 10, 0), (false, 20, 1)]));
        tl.add(ExitAt(0)).unwrap();
        let rec = tl.add(Recorder::default()).unwrap();
        assert!(!tl.advance_until(Bound::Unbounded).unwrap());
        // the event in flight completes its pass, nothing after it is read
        assert_eq!(tl.handler::<Recorder>(rec).unwrap().times, vec![0]);
        assert!(tl.pending_event().is_none());
        assert!(!tl.step().unwrap());
        assert_eq!(tl.handler::<Recorder>(rec).unwrap().times, vec![0]);
    }

    struct ExitOnUnknown;

    impl Handler for ExitOnUnknown {
        fn handle_unknown(&mut self, _line: &str, d: &mut Dispatch<'_>) -> Result<(), HandlerError> {
            d.exit();
            Ok(())
        }
    }

    #[test]
    fn exit_from_unknown_line_stops_before_next_event() {
        let text = format!(
            "{}\nstop here\n{}\n",
            lines(&[(false, 0, 1)]),
            lines(&[(false, 10, 0)])
        );
        let mut tl = timeline(&text);
        let rec = tl.add(Recorder::default()).unwrap();
        tl.add(ExitOnUnknown).unwrap();
        assert!(!tl.advance_until(Bound::Unbounded).unwrap());
        assert!(!tl.is_running());
        assert_eq!(tl.exit_status(), 0);
        let recorder = tl.handler::<Recorder>(rec).unwrap();
        assert_eq!(recorder.times, vec![0]);
        assert_eq!(recorder.unknown, vec!["stop here"]);
        assert_eq!(tl.previous_event().unwrap().timestamp_ms, 0);

        let mut tl = timeline(&format!("stop here\n{}\n", lines(&[(false, 10, 0)])));
        let rec = tl.add(Recorder::default()).unwrap();
        tl.add(ExitOnUnknown).unwrap();
        assert!(!tl.step().unwrap());
        assert!(tl.handler::<Recorder>(rec).unwrap().times.is_empty());
        assert!(tl.previous_event().is_none());
    }

    struct Panicky;

    impl Handler for Panicky {
        fn handle_event(&mut self, _event: &Event, _d: &mut Dispatch<'_>) -> Result<(), HandlerError> {
            panic!("handler blew up");
        }
    }

    #[test]
    fn interrupted_pass_poisons_the_timeline() {
        let mut tl = timeline(&lines(&[(false, 0, 1), (false, 10, 0)]));
        tl.add(Panicky).unwrap();
        let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| tl.step()));
        assert!(unwound.is_err());
        assert!(matches!(tl.step(), Err(TimelineError::DispatchInProgress)));
        assert!(matches!(
            tl.advance_until(Bound::Unbounded),
            Err(TimelineError::DispatchInProgress)
        ));
        assert!(matches!(tl.feed("x"), Err(TimelineError::DispatchInProgress)));
    }

    #[test]
    fn feed_dispatches_immediately() {
        let mut tl = Timeline::detached();
        let store = tl.add(StateStore::new()).unwrap();
        let event = tl
            .feed("Event: type 129, time 3, number 2, value 7\n")
            .unwrap()
            .unwrap();
        assert!(event.init);
        assert_eq!(tl.feed("Joystick (Pad) has 8 axes").unwrap(), None);
        assert_eq!(
            tl.handler::<StateStore>(store).unwrap().get(Channel::button(2)),
            Some(7)
        );
        assert_eq!(tl.previous_event().unwrap().timestamp_ms, 3);
    }
}
