//! Value derivation from controller state.
//!
//! An [`Adapter`] is a pure function from the current [`StateStore`] (and the
//! presentation time) to a scalar or a vector. Adapters compose: leaves read one
//! channel, conversions rescale a child, groups bundle children into a vector,
//! and time ramps ignore input entirely.
//!
//! Each adapter also reports its *origin*, the channels its output depends on,
//! so event-driven consumers can re-evaluate only the adapters an event touches.

use crate::events::{Channel, EventKind, StateStore};
use crate::overlay::error::AdapterError;
use std::fmt;
use tracing::trace;

/// Output of an adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl Value {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::Vector(_) => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Value::Scalar(_) => None,
            Value::Vector(v) => Some(v),
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Value::Vector(_))
    }

    fn map(self, f: impl Fn(f64) -> f64) -> Value {
        match self {
            Value::Scalar(v) => Value::Scalar(f(v)),
            Value::Vector(vs) => Value::Vector(vs.into_iter().map(f).collect()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(v) => write!(f, "{v:.3}"),
            Value::Vector(vs) => {
                f.write_str("(")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v:.3}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// What an adapter reads from.
#[derive(Debug, Clone, Copy)]
pub struct Sample<'a> {
    pub states: &'a StateStore,
    pub time_ms: i64,
}

impl<'a> Sample<'a> {
    pub fn new(states: &'a StateStore, time_ms: i64) -> Self {
        Self { states, time_ms }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Adapter {
    /// Raw value of one channel.
    Leaf(Channel),
    /// `source * factor + offset`, element-wise for vectors.
    Convert {
        source: Box<Adapter>,
        factor: f64,
        offset: f64,
    },
    /// Ordered tuple of the children's outputs.
    Group(Vec<Adapter>),
    /// `clamp(time / duration, 0, 1)`.
    Time { duration_ms: i64 },
}

impl Adapter {
    pub fn leaf(kind: EventKind, number: u32) -> Self {
        Adapter::Leaf(Channel::new(kind, number))
    }

    pub fn convert(source: Adapter, factor: f64, offset: f64) -> Self {
        Adapter::Convert {
            source: Box::new(source),
            factor,
            offset,
        }
    }

    /// Stick axis, raw `[-32768, 32767]` to `[-1, 1)`.
    pub fn stick_axis(source: Adapter) -> Self {
        Self::convert(source, 1.0 / 32768.0, 0.0)
    }

    /// Trigger axis, raw `[0, 65535]` shifted by one half.
    pub fn trigger_axis(source: Adapter) -> Self {
        Self::convert(source, 1.0 / 65535.0, 0.5)
    }

    pub fn invert_axis(source: Adapter) -> Self {
        Self::convert(source, -1.0, 0.0)
    }

    pub fn invert_button(source: Adapter) -> Self {
        Self::convert(source, -1.0, 1.0)
    }

    pub fn group(children: Vec<Adapter>) -> Self {
        Adapter::Group(children)
    }

    /// Ramp from 0 to 1 over `duration_ms` of presentation time.
    pub fn time(duration_ms: i64) -> Self {
        Adapter::Time { duration_ms }
    }

    pub fn evaluate(&self, sample: &Sample<'_>) -> Value {
        match self {
            Adapter::Leaf(channel) => {
                let raw = sample.states.get(*channel).unwrap_or_else(|| {
                    trace!("Channel {} not observed yet, reading 0", channel);
                    0
                });
                Value::Scalar(raw as f64)
            }
            Adapter::Convert {
                source,
                factor,
                offset,
            } => source.evaluate(sample).map(|v| v * factor + offset),
            Adapter::Group(children) => {
                // nested groups are spliced in, component by component
                let mut components = Vec::with_capacity(children.len());
                for child in children {
                    match child.evaluate(sample) {
                        Value::Scalar(v) => components.push(v),
                        Value::Vector(vs) => components.extend(vs),
                    }
                }
                Value::Vector(components)
            }
            Adapter::Time { duration_ms } => {
                if *duration_ms <= 0 {
                    return Value::Scalar(1.0);
                }
                Value::Scalar((sample.time_ms as f64 / *duration_ms as f64).clamp(0.0, 1.0))
            }
        }
    }

    /// Channels the output depends on. Order is unspecified; duplicates are kept.
    pub fn origin(&self) -> Vec<Channel> {
        let mut out = Vec::new();
        self.collect_origin(&mut out);
        out
    }

    fn collect_origin(&self, out: &mut Vec<Channel>) {
        match self {
            Adapter::Leaf(channel) => out.push(*channel),
            Adapter::Convert { source, .. } => source.collect_origin(out),
            Adapter::Group(children) => children.iter().for_each(|c| c.collect_origin(out)),
            Adapter::Time { .. } => {}
        }
    }
}

/// Loosely shaped control description, resolved by [`to_adapter`].
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterSpec {
    /// An adapter that is already built.
    Adapter(Adapter),
    Tuple(Vec<AdapterSpec>),
    Int(i64),
}

impl From<Adapter> for AdapterSpec {
    fn from(a: Adapter) -> Self {
        AdapterSpec::Adapter(a)
    }
}

impl From<i64> for AdapterSpec {
    fn from(v: i64) -> Self {
        AdapterSpec::Int(v)
    }
}

impl From<(i64, i64)> for AdapterSpec {
    fn from((kind, number): (i64, i64)) -> Self {
        AdapterSpec::Tuple(vec![AdapterSpec::Int(kind), AdapterSpec::Int(number)])
    }
}

impl From<Vec<Adapter>> for AdapterSpec {
    fn from(children: Vec<Adapter>) -> Self {
        AdapterSpec::Tuple(children.into_iter().map(AdapterSpec::Adapter).collect())
    }
}

/// Resolves a spec into an adapter.
///
/// - an adapter resolves to itself
/// - a tuple starting with an adapter becomes a group of its resolved items
/// - a `(kind, number)` pair becomes a leaf
/// - a bare kind becomes a leaf when `number` is given
pub fn to_adapter(spec: AdapterSpec, number: Option<i64>) -> Result<Adapter, AdapterError> {
    match spec {
        AdapterSpec::Adapter(adapter) => Ok(adapter),
        AdapterSpec::Tuple(items) if matches!(items.first(), Some(AdapterSpec::Adapter(_))) => items
            .into_iter()
            .map(|item| to_adapter(item, None))
            .collect::<Result<Vec<_>, _>>()
            .map(Adapter::Group),
        AdapterSpec::Tuple(items) => match items.as_slice() {
            [AdapterSpec::Int(kind), AdapterSpec::Int(number)] => leaf_from_ints(*kind, *number)
                .ok_or_else(|| AdapterError::InvalidSpec(format!("{items:?}"))),
            _ => Err(AdapterError::InvalidSpec(format!("{items:?}"))),
        },
        AdapterSpec::Int(kind) => number
            .and_then(|n| leaf_from_ints(kind, n))
            .ok_or_else(|| AdapterError::InvalidSpec(format!("{kind:?}"))),
    }
}

fn leaf_from_ints(kind: i64, number: i64) -> Option<Adapter> {
    let kind = EventKind::from_code(kind)?;
    let number = u32::try_from(number).ok()?;
    Some(Adapter::leaf(kind, number))
}
