//! Controller input overlays from `jstest --event` logs.
//!
//! Recorded (or live) joystick events are replayed on a [`events::Timeline`],
//! folded into the current controller state and turned into animated overlay
//! elements frame by frame.

pub mod config;
pub mod events;
pub mod overlay;
pub mod presets;
pub mod tools;
