//! Frame-by-frame orchestration of a replayed timeline.
//!
//! # State Machine
//!
//! ```text
//! Uncalibrated ──(calibrate)──► Calibrated ──(update/draw/render)──┐
//!                                   ▲                              │
//!                                   └──────────────────────────────┘
//! ```
//!
//! Calibration consumes the device's init burst, optionally skips to an
//! absolute start time and fixes the anchor that maps presentation time onto
//! event timestamps. Frames can only be produced once that anchor exists.

use crate::events::{Bound, HandlerId, StateStore, Timeline};
use crate::overlay::adapter::Value;
use crate::overlay::canvas::{Canvas, RecordingCanvas};
use crate::overlay::context::AnimationContext;
use crate::overlay::control::Control;
use crate::overlay::error::AnimationError;
use crate::presets::Theme;
use statum::{machine, state};
use std::io;
use tracing::{debug, info};

#[state]
#[derive(Debug, Clone)]
pub enum AnimationState {
    Uncalibrated,
    Calibrated,
}

/// Where presentation time zero lands on the event timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Calibration {
    /// Absolute event time to skip to before anchoring.
    pub start_ms: Option<i64>,
    /// Added to the anchor; positive values delay the overlay.
    pub offset_ms: i64,
}

/// Receives finished frames, e.g. a video encoder pipe.
pub trait FrameSink {
    fn finish_frame(&mut self, frame: u64, canvas: &RecordingCanvas) -> io::Result<()>;
}

#[machine]
pub struct ControlsAnimation<S: AnimationState> {
    timeline: Timeline,
    states: HandlerId,
    controls: Vec<Control>,
    theme: Theme,
    context: AnimationContext,
    fps: u32,
}

impl<S: AnimationState> ControlsAnimation<S> {
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn context(&self) -> &AnimationContext {
        &self.context
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Current channel snapshot.
    pub fn states(&self) -> Result<&StateStore, AnimationError> {
        self.timeline
            .handler::<StateStore>(self.states)
            .ok_or(AnimationError::MissingStateStore)
    }
}

impl ControlsAnimation<Uncalibrated> {
    /// Attaches a fresh state store to `timeline` and themes every control.
    pub fn create(
        mut timeline: Timeline,
        mut controls: Vec<Control>,
        theme: Theme,
        fps: u32,
    ) -> Result<Self, AnimationError> {
        let states = timeline.add(StateStore::new())?;
        for control in &mut controls {
            control.init_theme(&theme);
        }
        info!(
            "Animation created with {} controls at {} fps, theme {}",
            controls.len(),
            fps,
            theme.name
        );
        Ok(Self::new(timeline, states, controls, theme, AnimationContext::default(), fps.max(1)))
    }

    pub fn calibrate(mut self, calibration: Calibration) -> Result<ControlsAnimation<Calibrated>, AnimationError> {
        self.timeline.advance_until(Bound::Initialized)?;
        if let Some(start) = calibration.start_ms {
            self.timeline.advance_until(Bound::Until(start))?;
        }
        let base = self
            .timeline
            .previous_event()
            .map(|e| e.timestamp_ms)
            .or(calibration.start_ms)
            .or_else(|| self.timeline.pending_event().map(|e| e.timestamp_ms))
            .unwrap_or(0);
        let anchor = base + calibration.offset_ms;
        self.context.set_anchor(anchor);
        info!(
            "Calibrated anchor at {}ms ({} channels known)",
            anchor,
            self.states()?.len()
        );
        Ok(self.transition())
    }
}

impl ControlsAnimation<Calibrated> {
    /// Advances to frame `frame` and updates every control in declaration order.
    ///
    /// Returns whether the timeline still has input.
    pub fn update(&mut self, frame: u64) -> Result<bool, AnimationError> {
        let time_ms = (frame * 1000 / u64::from(self.fps)) as i64;
        self.timeline
            .advance_until(Bound::Until(self.context.anchor_ms() + time_ms))?;
        self.context.set_time(time_ms);

        let states = self
            .timeline
            .handler::<StateStore>(self.states)
            .ok_or(AnimationError::MissingStateStore)?;
        for control in &mut self.controls {
            control.update(&mut self.context, states)?;
        }
        Ok(self.timeline.is_running())
    }

    /// Draws controls back to front.
    pub fn draw(&self, canvas: &mut dyn Canvas) {
        for control in &self.controls {
            control.draw(canvas);
        }
    }

    /// Resolved value per named control, in declaration order.
    pub fn values(&self) -> Vec<(&str, Option<&Value>)> {
        self.controls.iter().map(|c| (c.name(), c.value())).collect()
    }

    /// Reads and clears the redraw-needed flag.
    pub fn take_redraw(&mut self) -> bool {
        self.context.take_redraw()
    }

    /// Produces frames until the timeline runs dry, including the frame at which it did.
    ///
    /// Returns the number of frames handed to `sink`.
    pub fn render(&mut self, canvas: &mut RecordingCanvas, sink: &mut dyn FrameSink) -> Result<u64, AnimationError> {
        let mut frame = 0;
        loop {
            let running = self.update(frame)?;
            canvas.clear();
            self.draw(canvas);
            sink.finish_frame(frame, canvas)?;
            debug!("Frame {} done with {} draw ops", frame, canvas.ops().len());
            frame += 1;
            if !running {
                break;
            }
        }
        info!("Rendered {} frames", frame);
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::adapter::Adapter;
    use crate::overlay::look::{CircleLook, LookOptions};
    use crate::presets::themes;
    use std::io::Cursor;

    const LOG: &str = "\
Event: type 129, time 100, number 0, value 0
Event: type 130, time 100, number 0, value 0
Event: type 1, time 500, number 0, value 1
Event: type 2, time 700, number 0, value 16384
Event: type 1, time 900, number 0, value 0
";

    fn animation(log: &str) -> ControlsAnimation<Uncalibrated> {
        let timeline = Timeline::new(Cursor::new(log.to_string()));
        let controls = vec![
            Control::new("A", (1i64, 0i64), CircleLook::new((1.0, 1.0), 1.0, LookOptions::default())).unwrap(),
            Control::new(
                "X",
                Adapter::stick_axis(Adapter::leaf(crate::events::EventKind::Axis, 0)),
                CircleLook::new((3.0, 1.0), 1.0, LookOptions::default()),
            )
            .unwrap(),
        ];
        ControlsAnimation::create(timeline, controls, themes::default_theme(), 10).unwrap()
    }

    fn scalar(anim: &ControlsAnimation<Calibrated>, name: &str) -> f64 {
        anim.values()
            .into_iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, v)| v.and_then(Value::as_scalar))
            .unwrap()
    }

    #[test]
    fn calibration_anchors_after_init_burst() {
        let anim = animation(LOG).calibrate(Calibration::default()).unwrap();
        assert_eq!(anim.context().anchor_ms(), 100);
        assert_eq!(anim.states().unwrap().len(), 2);
        assert_eq!(anim.timeline().pending_event().map(|e| e.timestamp_ms), Some(500));
    }

    #[test]
    fn calibration_honours_start_and_offset() {
        let anim = animation(LOG)
            .calibrate(Calibration {
                start_ms: Some(600),
                offset_ms: -50,
            })
            .unwrap();
        assert_eq!(anim.context().anchor_ms(), 450);
    }

    #[test]
    fn frames_follow_presentation_time() {
        let mut anim = animation(LOG).calibrate(Calibration::default()).unwrap();
        // 10 fps: frame 3 is 300ms, event time 400
        assert!(anim.update(3).unwrap());
        assert_eq!(scalar(&anim, "A"), 0.0);
        assert_eq!(anim.context().time_ms(), 300);

        assert!(anim.update(4).unwrap());
        assert_eq!(scalar(&anim, "A"), 1.0);

        anim.update(6).unwrap();
        assert_eq!(scalar(&anim, "X"), 0.5);

        assert!(!anim.update(9).unwrap());
        assert_eq!(scalar(&anim, "A"), 0.0);
    }

    #[derive(Default)]
    struct CountingSink {
        frames: Vec<(u64, usize)>,
    }

    impl FrameSink for CountingSink {
        fn finish_frame(&mut self, frame: u64, canvas: &RecordingCanvas) -> io::Result<()> {
            self.frames.push((frame, canvas.ops().len()));
            Ok(())
        }
    }

    #[test]
    fn render_stops_with_the_timeline() {
        let mut anim = animation(LOG).calibrate(Calibration::default()).unwrap();
        let mut canvas = RecordingCanvas::new(12.0);
        let mut sink = CountingSink::default();
        let frames = anim.render(&mut canvas, &mut sink).unwrap();
        assert_eq!(frames, 9);
        assert_eq!(sink.frames.len(), 9);
        assert!(sink.frames.iter().all(|(_, ops)| *ops == 4));
    }

    #[test]
    fn empty_log_anchors_at_zero() {
        let anim = animation("").calibrate(Calibration { start_ms: None, offset_ms: 250 }).unwrap();
        assert_eq!(anim.context().anchor_ms(), 250);
        assert!(!anim.timeline().is_running());
    }
}
