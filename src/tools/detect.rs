//! Controller detection from the device name `jstest` prints before any event.

use crate::events::{Dispatch, Event, Handler, HandlerError, LineSource, Timeline, TimelineError};
use crate::presets::{ControllerKind, Registry};
use tracing::{debug, info};

/// Watches unknown lines for a controller name marker.
///
/// With [`Detector::stop_at_first_event`] the timeline is stopped as soon as
/// events start, since the name line always precedes them.
#[derive(Debug, Clone)]
pub struct Detector {
    markers: Vec<(ControllerKind, &'static str)>,
    detected: Option<ControllerKind>,
    stop_at_first_event: bool,
}

impl Detector {
    pub fn new(registry: &Registry) -> Self {
        let markers = ControllerKind::ALL
            .into_iter()
            .filter_map(|kind| registry.controller_type(kind).ok().map(|c| (kind, c.marker)))
            .collect();
        Self {
            markers,
            detected: None,
            stop_at_first_event: false,
        }
    }

    pub fn stop_at_first_event(mut self) -> Self {
        self.stop_at_first_event = true;
        self
    }

    pub fn detected(&self) -> Option<ControllerKind> {
        self.detected
    }
}

impl Handler for Detector {
    fn handle_event(&mut self, _event: &Event, dispatch: &mut Dispatch<'_>) -> Result<(), HandlerError> {
        if self.stop_at_first_event {
            dispatch.exit();
        }
        Ok(())
    }

    fn handle_unknown(&mut self, line: &str, _dispatch: &mut Dispatch<'_>) -> Result<(), HandlerError> {
        if self.detected.is_some() {
            return Ok(());
        }
        if let Some((kind, _)) = self.markers.iter().find(|(_, marker)| line.contains(marker)) {
            info!("Detected controller type {} from {:?}", kind, line);
            self.detected = Some(*kind);
        } else {
            debug!("No controller name in {:?}", line);
        }
        Ok(())
    }
}

/// Reads `source` up to its first event and reports the controller it names.
pub fn detect_controller(source: impl LineSource + 'static, registry: &Registry) -> Result<Option<ControllerKind>, TimelineError> {
    let mut timeline = Timeline::new(source);
    let id = timeline.add(Detector::new(registry).stop_at_first_event())?;
    timeline.step()?;
    Ok(timeline.handler::<Detector>(id).and_then(Detector::detected))
}
