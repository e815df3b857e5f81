//! Recording derived values over time, e.g. for plotting an input session.
//!
//! Each event is routed only to the adapters whose origin contains the
//! event's channel, so a recorder with many series stays cheap per event.

use crate::events::{
    Bound, Channel, Dispatch, Event, Handler, HandlerError, LineSource, StateStore, Timeline,
    TimelineError,
};
use crate::overlay::adapter::{Adapter, Sample, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Gap before a change at which the previous value is repeated, giving step plots.
const HOLD_MS: i64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<(i64, Value)>,
}

impl Series {
    /// Whether the series holds vectors (stick directions) instead of scalars.
    pub fn is_directional(&self) -> bool {
        self.points.first().is_some_and(|(_, v)| v.is_vector())
    }
}

#[derive(Debug, Clone)]
pub struct SeriesRecorder {
    states: StateStore,
    adapters: Vec<Adapter>,
    series: Vec<Series>,
    routes: BTreeMap<Channel, Vec<usize>>,
    recording: bool,
    last_time_ms: Option<i64>,
}

impl SeriesRecorder {
    pub fn new(inputs: impl IntoIterator<Item = (String, Adapter)>) -> Self {
        let mut adapters = Vec::new();
        let mut series = Vec::new();
        let mut routes: BTreeMap<Channel, Vec<usize>> = BTreeMap::new();
        for (index, (name, adapter)) in inputs.into_iter().enumerate() {
            for channel in adapter.origin() {
                let route = routes.entry(channel).or_default();
                if !route.contains(&index) {
                    route.push(index);
                }
            }
            adapters.push(adapter);
            series.push(Series {
                name,
                points: Vec::new(),
            });
        }
        Self {
            states: StateStore::new(),
            adapters,
            series,
            routes,
            recording: false,
            last_time_ms: None,
        }
    }

    /// Records the current value of every series at `time_ms` and starts recording changes.
    pub fn seed(&mut self, time_ms: i64) {
        let sample = Sample::new(&self.states, time_ms);
        for (adapter, series) in self.adapters.iter().zip(&mut self.series) {
            series.points.push((time_ms, adapter.evaluate(&sample)));
        }
        self.recording = true;
        debug!("Seeded {} series at {}ms", self.series.len(), time_ms);
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    pub fn into_series(self) -> Vec<Series> {
        self.series
    }

    /// Time of the last recorded event.
    pub fn last_time_ms(&self) -> Option<i64> {
        self.last_time_ms
    }

    pub fn states(&self) -> &StateStore {
        &self.states
    }
}

impl Handler for SeriesRecorder {
    fn handle_event(&mut self, event: &Event, _dispatch: &mut Dispatch<'_>) -> Result<(), HandlerError> {
        self.states.apply(event);
        if !self.recording {
            return Ok(());
        }
        let time = event.timestamp_ms;
        self.last_time_ms = Some(time);
        let Some(route) = self.routes.get(&event.key()) else {
            return Ok(());
        };
        let sample = Sample::new(&self.states, time);
        for &index in route {
            let points = &mut self.series[index].points;
            if let Some((prev_time, prev_value)) = points.last().cloned() {
                if prev_time < time - HOLD_MS {
                    points.push((time - HOLD_MS, prev_value));
                }
            }
            points.push((time, self.adapters[index].evaluate(&sample)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeriesOptions {
    /// Absolute event time to skip to after the init burst.
    pub absolute_start_ms: i64,
    /// Start relative to the anchor event.
    pub start_ms: i64,
    pub delay_ms: i64,
}

/// Replays `source` and records each input from the chosen start to the end.
///
/// Returns the recorder and the start time its series are relative to.
pub fn record_series(
    source: impl LineSource + 'static,
    inputs: impl IntoIterator<Item = (String, Adapter)>,
    options: SeriesOptions,
) -> Result<(SeriesRecorder, i64), TimelineError> {
    let mut timeline = Timeline::new(source);
    let id = timeline.add(SeriesRecorder::new(inputs))?;

    timeline.advance_until(Bound::Initialized)?;
    timeline.advance_until(Bound::Until(options.absolute_start_ms))?;
    let first = timeline.previous_event().map_or(options.absolute_start_ms, |e| e.timestamp_ms);
    let start = first + options.start_ms - options.delay_ms;
    timeline.advance_until(Bound::Until(start))?;

    if let Some(recorder) = timeline.handler_mut::<SeriesRecorder>(id) {
        recorder.seed(start);
    }
    timeline.advance_until(Bound::Unbounded)?;

    let recorder = timeline
        .handler::<SeriesRecorder>(id)
        .cloned()
        .unwrap_or_else(|| SeriesRecorder::new(Vec::new()));
    info!(
        "Recorded {} series from {}ms, last event at {:?}",
        recorder.series.len(),
        start,
        recorder.last_time_ms
    );
    Ok((recorder, start))
}
