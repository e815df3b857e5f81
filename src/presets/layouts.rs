use crate::config::ConfigError;
use crate::overlay::control::Control;
use crate::overlay::look::{CircleLook, DpadGroupLook, LookOptions, RectLook, StickLook};
use crate::presets::controller_types::{Composite, ControllerType, Input};

/// Placement of controls on a `width` x `height` grid of layout units.
#[derive(Debug, Clone)]
pub struct Layout {
    pub name: &'static str,
    pub width: f64,
    pub height: f64,
    /// Pixels per layout unit.
    pub scale: f64,
    build: fn(&ControllerType) -> Result<Vec<Control>, ConfigError>,
}

impl Layout {
    /// Controls for `ctype`, in drawing order.
    pub fn controls(&self, ctype: &ControllerType) -> Result<Vec<Control>, ConfigError> {
        (self.build)(ctype)
    }

    /// Frame size in pixels at `scale` times the layout's own scale.
    pub fn frame_size(&self, scale: f64) -> (u32, u32) {
        let s = self.scale * scale;
        ((self.width * s).round() as u32, (self.height * s).round() as u32)
    }
}

pub fn builtin() -> Vec<Layout> {
    vec![Layout {
        name: "distance",
        width: 35.0,
        height: 8.0,
        scale: 12.0,
        build: distance,
    }]
}

/// Driving game layout: sticks in the middle, face buttons on the right,
/// shoulder buttons labelled with their in-game actions.
fn distance(c: &ControllerType) -> Result<Vec<Control>, ConfigError> {
    const HIDE_MS: i64 = 3000;
    let fading = || LookOptions::default().hide_after(HIDE_MS);
    let small = |label: &str| fading().label(label).label_size(0.7);

    Ok(vec![
        Control::new(
            "DPAD",
            c.composite(Composite::Dpad)?,
            DpadGroupLook::new((4.0, 4.0), 4.0 * 0.8, fading()),
        )?,
        Control::new(
            "STL",
            c.composite(Composite::Stl)?,
            StickLook::new((16.2, 4.0), 4.0, LookOptions::default()),
        )?,
        Control::new(
            "STR",
            c.composite(Composite::Str)?,
            StickLook::new((23.8, 4.0), 4.0, LookOptions::default()),
        )?,
        Control::new("A", c.spec(Input::A)?, CircleLook::new((33.0, 7.0), 1.0, fading().label("A")))?,
        Control::new("B", c.spec(Input::B)?, CircleLook::new((33.0, 5.0), 1.0, fading().label("B")))?,
        Control::new("X", c.spec(Input::X)?, CircleLook::new((33.0, 3.0), 1.0, fading().label("X")))?,
        Control::new("Y", c.spec(Input::Y)?, CircleLook::new((33.0, 1.0), 1.0, fading().label("Y")))?,
        Control::new(
            "LB",
            c.spec(Input::Lb)?,
            RectLook::new((10.0, 2.0), (4.0, 2.0), LookOptions::default().label("JMP")),
        )?,
        Control::new(
            "LT",
            c.spec(Input::Lt)?,
            RectLook::new((10.0, 6.0), (4.0, 2.0), LookOptions::default().label("BRK")),
        )?,
        Control::new(
            "RB",
            c.spec(Input::Rb)?,
            RectLook::new((30.0, 6.0), (4.0, 2.0), LookOptions::default().label("BST")),
        )?,
        Control::new(
            "RT",
            c.spec(Input::Rt)?,
            RectLook::new((30.0, 2.0), (4.0, 2.0), LookOptions::default().label("FWD")),
        )?,
        Control::new("BACK", c.spec(Input::Back)?, RectLook::new((10.0, 4.0), (3.0, 1.5), small("RST")))?,
        Control::new("START", c.spec(Input::Start)?, RectLook::new((30.0, 4.0), (3.0, 1.5), small("MNU")))?,
    ])
}
