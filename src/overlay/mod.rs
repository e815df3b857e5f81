//! Controller overlay animation
//!
//! Derives values from the replayed controller state and animates visual
//! elements with them, one frame at a time:
//!
//! 1. [`adapter`] - Pure value derivation from channel state or time
//! 2. [`look`] - Per-element visual state (fades, maxed styling) and drawing
//! 3. [`control`] - Named adapter + look pairs
//! 4. [`animation`] - Replay orchestrator mapping frames onto the timeline
//! 5. [`live`] - Live-device orchestration against a wall clock
//!
//! # Architecture
//!
//! ```text
//! Timeline ──► StateStore ──► Adapter ──► Look::update ──► Look::draw ──► Canvas
//!    ▲                                        │
//!    └── advance_until(anchor + t)            └──► AnimationContext (redraw flag)
//! ```

pub mod adapter;
pub mod animation;
pub mod canvas;
pub mod context;
pub mod control;
pub mod error;
pub mod live;
pub mod look;
pub mod snap;

pub use adapter::{to_adapter, Adapter, AdapterSpec, Sample, Value};
pub use animation::{Calibrated, Calibration, ControlsAnimation, FrameSink, Uncalibrated};
pub use canvas::{Affine, Canvas, DrawOp, RecordingCanvas, Rgb, Rgba, Shape};
pub use context::{AnimationContext, Clock, ManualClock, WallClock};
pub use control::Control;
pub use error::{AdapterError, AnimationError, LookError};
pub use live::{FeedOutcome, LiveAnimation, LiveFeed};
pub use look::{
    CircleLook, DpadButtonLook, DpadGroupLook, Look, LookOptions, MaxoutStyle, RectLook, StickLook,
};
