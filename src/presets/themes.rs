use crate::overlay::canvas::Rgb;
use serde::{Deserialize, Serialize};

/// Colour set applied to every look of a layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub bg_color: Rgb,
    pub fg_color: Rgb,
    /// Foreground of controls at their maximum.
    pub maxed_color: Rgb,
    pub text_color: Rgb,
}

fn grey(v: f64) -> Rgb {
    Rgb(v, v, v)
}

pub fn default_theme() -> Theme {
    Theme {
        name: "default".to_string(),
        bg_color: grey(0.28),
        fg_color: grey(0.5),
        maxed_color: grey(0.94),
        text_color: grey(0.75),
    }
}

pub fn builtin() -> Vec<Theme> {
    vec![
        default_theme(),
        Theme {
            name: "light".to_string(),
            bg_color: grey(0.28),
            fg_color: grey(0.94),
            maxed_color: Rgb(0.88, 0.88, 1.0),
            text_color: grey(0.5),
        },
        Theme {
            name: "dark".to_string(),
            bg_color: grey(0.06),
            fg_color: grey(0.12),
            maxed_color: grey(0.25),
            text_color: grey(0.75),
        },
        Theme {
            name: "contrast".to_string(),
            bg_color: grey(0.06),
            fg_color: grey(0.0),
            maxed_color: grey(0.25),
            text_color: grey(0.75),
        },
    ]
}
