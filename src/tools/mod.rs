//! Utilities around recorded event logs
//!
//! - [`cut`] - Cuts a time window out of a log, keeping it replayable
//! - [`series`] - Records derived values over time for plotting
//! - [`detect`] - Detects the controller type from the device name line

pub mod cut;
pub mod detect;
pub mod series;

pub use cut::{cut, CutEnd, CutError, CutOptions, CutSummary};
pub use detect::{detect_controller, Detector};
pub use series::{record_series, Series, SeriesOptions, SeriesRecorder};
