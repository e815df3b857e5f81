//! Live presentation of a device that is still producing events.
//!
//! Lines arrive from an external reader (for example a `jstest --event`
//! process) and are pushed in with [`LiveFeed::feed`]. The feed recognises the
//! end of the device's init burst so the presentation can start with a full
//! state snapshot. [`LiveAnimation`] then updates looks against a [`Clock`]
//! instead of replayed timestamps.

use crate::events::{HandlerId, StateStore, Timeline, TimelineError};
use crate::overlay::adapter::Value;
use crate::overlay::canvas::Canvas;
use crate::overlay::context::{AnimationContext, Clock};
use crate::overlay::control::Control;
use crate::overlay::error::AnimationError;
use crate::presets::Theme;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

static CAPABILITIES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"has (\d+) axes and (\d+) buttons\.").expect("valid capability pattern"));

/// What a fed line meant for the live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    /// Still inside the device's init burst.
    Initializing,
    /// This line completed the init burst; drawing may start.
    Initialized,
    /// A line after initialization.
    Live,
}

/// Pushes externally read lines into a detached timeline and tracks initialization.
pub struct LiveFeed {
    timeline: Timeline,
    expected_init: Option<u64>,
    events_seen: u64,
    initialized: bool,
}

impl LiveFeed {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            expected_init: None,
            events_seen: 0,
            initialized: false,
        }
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of init events announced by the device, once known.
    pub fn expected_init(&self) -> Option<u64> {
        self.expected_init
    }

    pub fn feed(&mut self, line: &str) -> Result<FeedOutcome, TimelineError> {
        if self.initialized {
            self.timeline.feed(line)?;
            return Ok(FeedOutcome::Live);
        }

        if let Some(caps) = CAPABILITIES.captures(line) {
            let axes: u64 = caps[1].parse().unwrap_or(0);
            let buttons: u64 = caps[2].parse().unwrap_or(0);
            info!("Device reports {} axes and {} buttons", axes, buttons);
            self.expected_init = Some(axes + buttons);
        }

        let event = self.timeline.feed(line)?;
        if event.is_some() {
            self.events_seen += 1;
        }
        let burst_done = self
            .expected_init
            .is_some_and(|n| n > 0 && self.events_seen >= n);
        let live_event = event.as_ref().is_some_and(|e| !e.init);
        if burst_done || live_event {
            info!("Init burst complete after {} events", self.events_seen);
            self.initialized = true;
            return Ok(FeedOutcome::Initialized);
        }
        Ok(FeedOutcome::Initializing)
    }
}

/// Looks driven by a live feed and a clock.
pub struct LiveAnimation<C: Clock> {
    feed: LiveFeed,
    states: HandlerId,
    controls: Vec<Control>,
    context: AnimationContext,
    clock: C,
}

impl<C: Clock> LiveAnimation<C> {
    pub fn new(mut controls: Vec<Control>, theme: &Theme, clock: C) -> Result<Self, AnimationError> {
        let mut timeline = Timeline::detached();
        let states = timeline.add(StateStore::new())?;
        for control in &mut controls {
            control.init_theme(theme);
        }
        debug!("Live animation with {} controls", controls.len());
        Ok(Self {
            feed: LiveFeed::new(timeline),
            states,
            controls,
            context: AnimationContext::default(),
            clock,
        })
    }

    pub fn feed_line(&mut self, line: &str) -> Result<FeedOutcome, AnimationError> {
        Ok(self.feed.feed(line)?)
    }

    /// Drawing is only meaningful once the init burst is in.
    pub fn is_ready(&self) -> bool {
        self.feed.is_initialized()
    }

    pub fn states(&self) -> Result<&StateStore, AnimationError> {
        self.feed
            .timeline()
            .handler::<StateStore>(self.states)
            .ok_or(AnimationError::MissingStateStore)
    }

    /// Updates every control at the clock's current time.
    pub fn update(&mut self) -> Result<(), AnimationError> {
        self.context.set_time(self.clock.now_ms());
        let states = self
            .feed
            .timeline()
            .handler::<StateStore>(self.states)
            .ok_or(AnimationError::MissingStateStore)?;
        for control in &mut self.controls {
            control.update(&mut self.context, states)?;
        }
        Ok(())
    }

    pub fn draw(&self, canvas: &mut dyn Canvas) {
        if !self.is_ready() {
            return;
        }
        for control in &self.controls {
            control.draw(canvas);
        }
    }

    pub fn values(&self) -> Vec<(&str, Option<&Value>)> {
        self.controls.iter().map(|c| (c.name(), c.value())).collect()
    }

    /// Reads and clears the redraw-needed flag; a set flag means another paint is due.
    pub fn take_redraw(&mut self) -> bool {
        self.context.take_redraw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::canvas::RecordingCanvas;
    use crate::overlay::context::ManualClock;
    use crate::overlay::look::{CircleLook, LookOptions};
    use crate::presets::themes;
    use std::rc::Rc;

    const HEADER: &str = "Joystick (Xbox Gamepad (userspace driver)) has 2 axes and 1 buttons.";

    #[test]
    fn init_completes_after_announced_count() {
        let mut feed = LiveFeed::new(Timeline::detached());
        assert_eq!(feed.feed("Driver version is 2.1.0.").unwrap(), FeedOutcome::Initializing);
        assert_eq!(feed.feed(HEADER).unwrap(), FeedOutcome::Initializing);
        assert_eq!(feed.expected_init(), Some(3));
        assert_eq!(
            feed.feed("Event: type 129, time 10, number 0, value 0").unwrap(),
            FeedOutcome::Initializing
        );
        assert_eq!(
            feed.feed("Event: type 130, time 10, number 0, value 0").unwrap(),
            FeedOutcome::Initializing
        );
        assert_eq!(
            feed.feed("Event: type 130, time 10, number 1, value 0").unwrap(),
            FeedOutcome::Initialized
        );
        assert_eq!(
            feed.feed("Event: type 1, time 50, number 0, value 1").unwrap(),
            FeedOutcome::Live
        );
    }

    #[test]
    fn live_event_ends_init_early() {
        let mut feed = LiveFeed::new(Timeline::detached());
        feed.feed(HEADER).unwrap();
        feed.feed("Event: type 129, time 10, number 0, value 0").unwrap();
        assert_eq!(
            feed.feed("Event: type 2, time 30, number 0, value 100").unwrap(),
            FeedOutcome::Initialized
        );
        assert!(feed.is_initialized());
    }

    #[test]
    fn live_animation_fades_on_clock_time() {
        let clock = Rc::new(ManualClock::default());
        let controls = vec![Control::new(
            "A",
            (1i64, 0i64),
            CircleLook::new((1.0, 1.0), 1.0, LookOptions::default().hide_after(1000)),
        )
        .unwrap()];
        let mut anim = LiveAnimation::new(controls, &themes::default_theme(), Rc::clone(&clock)).unwrap();

        let mut canvas = RecordingCanvas::new(12.0);
        anim.feed_line("Event: type 1, time 5, number 0, value 1").unwrap();
        assert!(anim.is_ready());

        clock.set(100);
        anim.update().unwrap();
        anim.draw(&mut canvas);
        assert_eq!(canvas.ops().len(), 2);
        assert!(!anim.take_redraw());

        anim.feed_line("Event: type 1, time 200, number 0, value 0").unwrap();
        clock.set(600);
        anim.update().unwrap();
        assert!(anim.take_redraw());
        assert_eq!(anim.values(), vec![("A", Some(&Value::Scalar(0.0)))]);
        assert_eq!(anim.states().unwrap().len(), 1);
    }

    #[test]
    fn nothing_is_drawn_before_init() {
        let controls = vec![Control::new("A", (1i64, 0i64), CircleLook::new((1.0, 1.0), 1.0, LookOptions::default())).unwrap()];
        let mut anim = LiveAnimation::new(controls, &themes::default_theme(), ManualClock::default()).unwrap();
        anim.feed_line(HEADER).unwrap();
        anim.update().unwrap();
        let mut canvas = RecordingCanvas::new(12.0);
        anim.draw(&mut canvas);
        assert!(canvas.ops().is_empty());
    }
}
