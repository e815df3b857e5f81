use crate::events::StateStore;
use crate::overlay::adapter::{to_adapter, Adapter, AdapterSpec, Sample, Value};
use crate::overlay::canvas::Canvas;
use crate::overlay::context::AnimationContext;
use crate::overlay::error::{AdapterError, AnimationError};
use crate::overlay::look::Look;
use crate::presets::Theme;

/// A named pairing of a value source with the look that shows it.
#[derive(Debug)]
pub struct Control {
    name: String,
    source: Adapter,
    look: Box<dyn Look>,
    last_value: Option<Value>,
}

impl Control {
    pub fn new(name: impl Into<String>, spec: impl Into<AdapterSpec>, look: impl Look + 'static) -> Result<Self, AdapterError> {
        Ok(Self {
            name: name.into(),
            source: to_adapter(spec.into(), None)?,
            look: Box::new(look),
            last_value: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &Adapter {
        &self.source
    }

    pub fn look(&self) -> &dyn Look {
        self.look.as_ref()
    }

    /// Value seen by the last update, if any.
    pub fn value(&self) -> Option<&Value> {
        self.last_value.as_ref()
    }

    pub fn init_theme(&mut self, theme: &Theme) {
        self.look.init_theme(theme);
    }

    pub fn update(&mut self, ctx: &mut AnimationContext, states: &StateStore) -> Result<(), AnimationError> {
        let value = self.source.evaluate(&Sample::new(states, ctx.time_ms()));
        self.look.update(ctx, &value).map_err(|source| AnimationError::Look {
            control: self.name.clone(),
            source,
        })?;
        self.last_value = Some(value);
        Ok(())
    }

    pub fn draw(&self, canvas: &mut dyn Canvas) {
        self.look.draw(canvas);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, EventKind};
    use crate::overlay::look::{CircleLook, LookOptions, StickLook};

    #[test]
    fn update_reads_adapter_and_feeds_look() {
        let mut states = StateStore::new();
        states.apply(&Event::new(EventKind::Button, false, 0, 0, 1));
        let mut control = Control::new("A", (1i64, 0i64), CircleLook::new((0.0, 0.0), 1.0, LookOptions::default())).unwrap();

        assert!(control.value().is_none());
        let mut ctx = AnimationContext::new(0);
        control.update(&mut ctx, &states).unwrap();
        assert_eq!(control.value(), Some(&Value::Scalar(1.0)));
        assert_eq!(control.look().value(), 1.0);
    }

    #[test]
    fn look_errors_name_the_control() {
        let states = StateStore::new();
        let mut control = Control::new("STL", (1i64, 0i64), StickLook::new((0.0, 0.0), 1.0, LookOptions::default())).unwrap();
        let err = control.update(&mut AnimationContext::new(0), &states).unwrap_err();
        assert!(matches!(err, AnimationError::Look { ref control, .. } if control == "STL"));
    }

    #[test]
    fn invalid_spec_fails_at_construction() {
        let look = CircleLook::new((0.0, 0.0), 1.0, LookOptions::default());
        assert!(Control::new("bad", 3i64, look).is_err());
    }
}
