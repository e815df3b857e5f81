use crate::events::error::HandlerError;
use crate::events::event::{Channel, Event, EVENT_CATEGORY};
use crate::events::registry::{Dispatch, Handler};
use std::collections::BTreeMap;
use std::fmt;
use tracing::trace;

/// Latest observed value per channel.
///
/// Every dispatched `Event:` record, initial or live, overwrites the entry for
/// its channel. Records of other categories are ignored. Entries never expire;
/// channels that were never seen are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateStore {
    states: BTreeMap<Channel, i64>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &Event) {
        if event.category != EVENT_CATEGORY {
            trace!("Ignoring {} record on {}", event.category, event.key());
            return;
        }
        self.states.insert(event.key(), event.value);
    }

    pub fn get(&self, channel: Channel) -> Option<i64> {
        self.states.get(&channel).copied()
    }

    /// Read-only view of the whole map.
    pub fn snapshot(&self) -> &BTreeMap<Channel, i64> {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl Handler for StateStore {
    fn handle_event(&mut self, event: &Event, _dispatch: &mut Dispatch<'_>) -> Result<(), HandlerError> {
        self.apply(event);
        Ok(())
    }
}

// Same shape as the state dump of the old jstest tooling: "(1,0):1 (2,3):-200"
impl fmt::Display for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (channel, value) in &self.states {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{channel}:{value}")?;
        }
        Ok(())
    }
}
