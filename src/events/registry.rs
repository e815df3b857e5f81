//! Handler registry with dispatch-safe membership changes.
//!
//! Handlers are registered once and then attached (made active) or detached.
//! While a dispatch pass is in flight the set of handlers being called is frozen:
//! attach/detach requests coming from handlers are checked against the current
//! membership, queued, and applied only after every active handler has seen the
//! event.
//!
//! ```text
//!   register ──► [inactive] ──attach──► [active] ──detach──► [inactive]
//!                                 │                    │
//!                       (in pass: pending-add)  (in pass: pending-remove)
//! ```

use crate::events::error::{HandlerError, RegistryError, TimelineError};
use crate::events::event::Event;
use std::any::Any;
use std::fmt;
use tracing::debug;

/// Stable identity of a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(usize);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[doc(hidden)]
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Subscriber to a [`Timeline`](crate::events::timeline::Timeline).
///
/// Both callbacks receive a [`Dispatch`] handle through which the handler may
/// change registry membership or stop the timeline. Returning an error aborts
/// the current pass and stops the timeline.
pub trait Handler: AsAny {
    fn handle_event(&mut self, _event: &Event, _dispatch: &mut Dispatch<'_>) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Called for every input line that is not an event.
    fn handle_unknown(&mut self, _line: &str, _dispatch: &mut Dispatch<'_>) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// Control handle given to handlers during a dispatch pass.
pub struct Dispatch<'a> {
    registered: usize,
    active: &'a [HandlerId],
    pending_add: &'a mut Vec<HandlerId>,
    pending_remove: &'a mut Vec<HandlerId>,
    running: &'a mut bool,
}

impl Dispatch<'_> {
    /// Queues `id` for activation at the end of this pass.
    pub fn attach(&mut self, id: HandlerId) -> Result<(), RegistryError> {
        if id.0 >= self.registered {
            return Err(RegistryError::Unknown(id));
        }
        if self.pending_add.contains(&id) {
            return Err(RegistryError::AlreadyAdding(id));
        }
        if self.pending_remove.contains(&id) {
            return Err(RegistryError::Removing(id));
        }
        if self.active.contains(&id) {
            return Err(RegistryError::AlreadyActive(id));
        }
        self.pending_add.push(id);
        Ok(())
    }

    /// Queues `id` for deactivation at the end of this pass.
    pub fn detach(&mut self, id: HandlerId) -> Result<(), RegistryError> {
        if self.pending_add.contains(&id) {
            return Err(RegistryError::Adding(id));
        }
        if self.pending_remove.contains(&id) {
            return Err(RegistryError::AlreadyRemoving(id));
        }
        if !self.active.contains(&id) {
            return Err(RegistryError::NotActive(id));
        }
        self.pending_remove.push(id);
        Ok(())
    }

    /// Stops the timeline once the current pass completes.
    pub fn exit(&mut self) {
        *self.running = false;
    }

    pub fn is_running(&self) -> bool {
        *self.running
    }

    /// Handlers active for this pass, in dispatch order.
    pub fn active(&self) -> &[HandlerId] {
        self.active
    }
}

#[derive(Default)]
pub struct Registry {
    slots: Vec<Option<Box<dyn Handler>>>,
    active: Vec<HandlerId>,
    pending_add: Vec<HandlerId>,
    pending_remove: Vec<HandlerId>,
    dispatching: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Box<dyn Handler>) -> HandlerId {
        let id = HandlerId(self.slots.len());
        self.slots.push(Some(handler));
        id
    }

    pub fn attach(&mut self, id: HandlerId) -> Result<(), RegistryError> {
        self.check_known(id)?;
        if self.active.contains(&id) {
            return Err(RegistryError::AlreadyActive(id));
        }
        self.active.push(id);
        Ok(())
    }

    pub fn detach(&mut self, id: HandlerId) -> Result<(), RegistryError> {
        let pos = self
            .active
            .iter()
            .position(|h| *h == id)
            .ok_or(RegistryError::NotActive(id))?;
        self.active.remove(pos);
        Ok(())
    }

    pub fn is_active(&self, id: HandlerId) -> bool {
        self.active.contains(&id)
    }

    /// Active handlers in dispatch order.
    pub fn active(&self) -> &[HandlerId] {
        &self.active
    }

    pub fn is_dispatching(&self) -> bool {
        self.dispatching
    }

    pub fn get<T: Handler + 'static>(&self, id: HandlerId) -> Option<&T> {
        self.slots
            .get(id.0)?
            .as_deref()
            .and_then(|h| h.as_any().downcast_ref())
    }

    pub fn get_mut<T: Handler + 'static>(&mut self, id: HandlerId) -> Option<&mut T> {
        self.slots
            .get_mut(id.0)?
            .as_deref_mut()
            .and_then(|h| h.as_any_mut().downcast_mut())
    }

    fn check_known(&self, id: HandlerId) -> Result<(), RegistryError> {
        match self.slots.get(id.0) {
            Some(Some(_)) => Ok(()),
            _ => Err(RegistryError::Unknown(id)),
        }
    }

    /// Runs one pass of `call` over the handlers active when the pass starts.
    ///
    /// Queued membership changes are applied after the last handler returns.
    /// A failing handler ends the pass early and discards the queues. If a
    /// handler panics the registry stays marked as dispatching, and every later
    /// pass is refused.
    pub(crate) fn dispatch<F>(&mut self, running: &mut bool, mut call: F) -> Result<(), TimelineError>
    where
        F: FnMut(&mut dyn Handler, &mut Dispatch<'_>) -> Result<(), HandlerError>,
    {
        if self.dispatching {
            return Err(TimelineError::DispatchInProgress);
        }
        self.dispatching = true;

        let pass = self.active.clone();
        for id in pass {
            let Some(mut handler) = self.slots[id.0].take() else {
                return Err(TimelineError::DispatchInProgress);
            };
            let result = {
                let mut dispatch = Dispatch {
                    registered: self.slots.len(),
                    active: &self.active,
                    pending_add: &mut self.pending_add,
                    pending_remove: &mut self.pending_remove,
                    running: &mut *running,
                };
                call(handler.as_mut(), &mut dispatch)
            };
            self.slots[id.0] = Some(handler);

            if let Err(source) = result {
                self.pending_add.clear();
                self.pending_remove.clear();
                self.dispatching = false;
                return Err(TimelineError::Handler {
                    handler: id,
                    source,
                });
            }
        }

        self.apply_pending();
        self.dispatching = false;
        Ok(())
    }

    fn apply_pending(&mut self) {
        if self.pending_add.is_empty() && self.pending_remove.is_empty() {
            return;
        }
        debug!(
            "Applying registry changes: +{:?} -{:?}",
            self.pending_add, self.pending_remove
        );
        let removed = std::mem::take(&mut self.pending_remove);
        self.active.retain(|id| !removed.contains(id));
        self.active.append(&mut self.pending_add);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;
    impl Handler for Noop {}

    #[test]
    fn attach_and_detach_outside_dispatch_apply_immediately() {
        let mut registry = Registry::new();
        let a = registry.register(Box::new(Noop));
        let b = registry.register(Box::new(Noop));
        registry.attach(b).unwrap();
        registry.attach(a).unwrap();
        assert_eq!(registry.active(), &[b, a]);
        assert_eq!(registry.attach(a), Err(RegistryError::AlreadyActive(a)));
        registry.detach(b).unwrap();
        assert_eq!(registry.detach(b), Err(RegistryError::NotActive(b)));
        assert_eq!(registry.active(), &[a]);
    }

    #[test]
    fn downcasts_to_concrete_handler() {
        let mut registry = Registry::new();
        let id = registry.register(Box::new(Noop));
        assert!(registry.get::<Noop>(id).is_some());
        assert!(registry.get::<crate::events::state_store::StateStore>(id).is_none());
    }

    #[test]
    fn unknown_id_is_rejected() {
        let mut registry = Registry::new();
        let mut other = Registry::new();
        other.register(Box::new(Noop));
        let foreign = other.register(Box::new(Noop));
        assert_eq!(registry.attach(foreign), Err(RegistryError::Unknown(foreign)));
    }
}
