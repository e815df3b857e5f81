//! Channel tables for supported controller drivers.

use crate::config::ConfigError;
use crate::events::EventKind;
use crate::overlay::adapter::{Adapter, AdapterSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerKind {
    /// Kernel `xpad` driver.
    Xpad,
    /// Userspace `xboxdrv` driver.
    Xboxdrv,
}

impl ControllerKind {
    pub const ALL: [ControllerKind; 2] = [ControllerKind::Xpad, ControllerKind::Xboxdrv];

    pub fn name(&self) -> &'static str {
        match self {
            ControllerKind::Xpad => "xpad",
            ControllerKind::Xboxdrv => "xboxdrv",
        }
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ControllerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ConfigError::UnknownControllerType(s.to_string()))
    }
}

/// Primitive controller inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Input {
    A,
    B,
    X,
    Y,
    StlX,
    StlY,
    StlB,
    StrX,
    StrY,
    StrB,
    DpadX,
    DpadY,
    Lb,
    Rb,
    Lt,
    Rt,
    Back,
    Start,
    Guide,
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Input::A => "A",
            Input::B => "B",
            Input::X => "X",
            Input::Y => "Y",
            Input::StlX => "STL_X",
            Input::StlY => "STL_Y",
            Input::StlB => "STL_B",
            Input::StrX => "STR_X",
            Input::StrY => "STR_Y",
            Input::StrB => "STR_B",
            Input::DpadX => "DPAD_X",
            Input::DpadY => "DPAD_Y",
            Input::Lb => "LB",
            Input::Rb => "RB",
            Input::Lt => "LT",
            Input::Rt => "RT",
            Input::Back => "BACK",
            Input::Start => "START",
            Input::Guide => "GUIDE",
        };
        f.write_str(name)
    }
}

/// Inputs made of several primitive ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Composite {
    /// Left stick: x, y and the stick button.
    Stl,
    /// Right stick: x, y and the stick button.
    Str,
    /// Directional pad as an x/y pair.
    Dpad,
}

impl Composite {
    pub fn parts(&self) -> &'static [Input] {
        match self {
            Composite::Stl => &[Input::StlX, Input::StlY, Input::StlB],
            Composite::Str => &[Input::StrX, Input::StrY, Input::StrB],
            Composite::Dpad => &[Input::DpadX, Input::DpadY],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerType {
    pub kind: ControllerKind,
    /// Substring of the device name line identifying this driver.
    pub marker: &'static str,
    inputs: BTreeMap<Input, Adapter>,
}

impl ControllerType {
    pub fn of(kind: ControllerKind) -> Self {
        match kind {
            ControllerKind::Xpad => xpad(),
            ControllerKind::Xboxdrv => xboxdrv(),
        }
    }

    pub fn matches_name(&self, line: &str) -> bool {
        line.contains(self.marker)
    }

    pub fn input(&self, input: Input) -> Result<&Adapter, ConfigError> {
        self.inputs.get(&input).ok_or_else(|| ConfigError::MissingInput {
            controller: self.kind.to_string(),
            input: input.to_string(),
        })
    }

    /// Group adapter over the parts of `composite`.
    pub fn composite(&self, composite: Composite) -> Result<Adapter, ConfigError> {
        let parts = composite
            .parts()
            .iter()
            .map(|&input| self.input(input).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Adapter::group(parts))
    }

    /// Spec for a single input, ready for [`crate::overlay::Control::new`].
    pub fn spec(&self, input: Input) -> Result<AdapterSpec, ConfigError> {
        Ok(self.input(input)?.clone().into())
    }
}

fn button(number: u32) -> Adapter {
    Adapter::leaf(EventKind::Button, number)
}

fn stick(number: u32) -> Adapter {
    Adapter::stick_axis(Adapter::leaf(EventKind::Axis, number))
}

fn trigger(number: u32) -> Adapter {
    Adapter::trigger_axis(Adapter::leaf(EventKind::Axis, number))
}

/// Inputs both drivers map the same way.
fn common_inputs() -> BTreeMap<Input, Adapter> {
    BTreeMap::from([
        (Input::A, button(0)),
        (Input::B, button(1)),
        (Input::X, button(2)),
        (Input::Y, button(3)),
        (Input::StlX, stick(0)),
        (Input::StlY, stick(1)),
        (Input::StlB, button(9)),
        (Input::StrB, button(10)),
        (Input::DpadX, stick(6)),
        (Input::DpadY, stick(7)),
        (Input::Lb, button(4)),
        (Input::Rb, button(5)),
        (Input::Back, button(6)),
        (Input::Start, button(7)),
        (Input::Guide, button(8)),
    ])
}

fn xpad() -> ControllerType {
    let mut inputs = common_inputs();
    inputs.extend([
        (Input::StrX, stick(3)),
        (Input::StrY, stick(4)),
        (Input::Lt, trigger(2)),
        (Input::Rt, trigger(5)),
    ]);
    ControllerType {
        kind: ControllerKind::Xpad,
        marker: "X-Box One pad",
        inputs,
    }
}

fn xboxdrv() -> ControllerType {
    let mut inputs = common_inputs();
    inputs.extend([
        (Input::StrX, stick(2)),
        (Input::StrY, stick(3)),
        (Input::Lt, trigger(5)),
        (Input::Rt, trigger(4)),
    ]);
    ControllerType {
        kind: ControllerKind::Xboxdrv,
        marker: "Xbox Gamepad (userspace driver)",
        inputs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Channel;

    #[test]
    fn drivers_differ_in_right_stick_and_triggers() {
        let xpad = ControllerType::of(ControllerKind::Xpad);
        let drv = ControllerType::of(ControllerKind::Xboxdrv);
        assert_eq!(xpad.input(Input::A).unwrap(), drv.input(Input::A).unwrap());
        assert_eq!(xpad.input(Input::StrX).unwrap().origin(), vec![Channel::axis(3)]);
        assert_eq!(drv.input(Input::StrX).unwrap().origin(), vec![Channel::axis(2)]);
        assert_eq!(drv.input(Input::Lt).unwrap().origin(), vec![Channel::axis(5)]);
    }

    #[test]
    fn composites_resolve_through_table() {
        let drv = ControllerType::of(ControllerKind::Xboxdrv);
        let stl = drv.composite(Composite::Stl).unwrap();
        assert_eq!(
            stl.origin(),
            vec![Channel::axis(0), Channel::axis(1), Channel::button(9)]
        );
        assert_eq!(drv.composite(Composite::Dpad).unwrap().origin().len(), 2);
    }

    #[test]
    fn every_input_is_mapped() {
        for kind in ControllerKind::ALL {
            let ctype = ControllerType::of(kind);
            assert_eq!(ctype.inputs.len(), 19, "{kind}");
        }
    }

    #[test]
    fn kinds_parse_by_name() {
        assert_eq!("xpad".parse::<ControllerKind>().unwrap(), ControllerKind::Xpad);
        assert!("auto".parse::<ControllerKind>().is_err());
    }
}
