use chrono::{DateTime, Local};
use std::cell::Cell;

/// Presentation-time state shared by all looks during a frame.
#[derive(Debug, Clone, Default)]
pub struct AnimationContext {
    anchor_ms: i64,
    time_ms: i64,
    redraw_needed: bool,
}

impl AnimationContext {
    pub fn new(anchor_ms: i64) -> Self {
        Self {
            anchor_ms,
            ..Self::default()
        }
    }

    /// Event timestamp that corresponds to presentation time zero.
    pub fn anchor_ms(&self) -> i64 {
        self.anchor_ms
    }

    pub fn set_anchor(&mut self, anchor_ms: i64) {
        self.anchor_ms = anchor_ms;
    }

    /// Current presentation time in milliseconds.
    pub fn time_ms(&self) -> i64 {
        self.time_ms
    }

    pub fn set_time(&mut self, time_ms: i64) {
        self.time_ms = time_ms;
    }

    /// Event timestamp matching the current presentation time.
    pub fn event_time_ms(&self) -> i64 {
        self.anchor_ms + self.time_ms
    }

    /// Signals that something changes with time alone and needs another paint.
    pub fn request_redraw(&mut self) {
        self.redraw_needed = true;
    }

    pub fn redraw_needed(&self) -> bool {
        self.redraw_needed
    }

    /// Reads and clears the redraw flag. Meant for the single drawing consumer.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw_needed)
    }
}

/// Millisecond clock for live presentation.
pub trait Clock {
    fn now_ms(&self) -> i64;
}

/// Wall clock measuring time since construction.
#[derive(Debug, Clone)]
pub struct WallClock {
    started: DateTime<Local>,
}

impl WallClock {
    pub fn start() -> Self {
        Self {
            started: Local::now(),
        }
    }
}

impl Clock for WallClock {
    fn now_ms(&self) -> i64 {
        (Local::now() - self.started).num_milliseconds()
    }
}

/// Clock advanced by hand.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<i64>,
}

impl ManualClock {
    pub fn set(&self, ms: i64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for std::rc::Rc<C> {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}
