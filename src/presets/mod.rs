//! Built-in controller types, layouts and themes
//!
//! Everything is collected into one [`Registry`] value that is handed to
//! whatever builds an overlay. Configuration can add themes to it.

pub mod controller_types;
pub mod layouts;
pub mod themes;

pub use controller_types::{Composite, ControllerKind, ControllerType, Input};
pub use layouts::Layout;
pub use themes::Theme;

use crate::config::ConfigError;
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct Registry {
    controller_types: BTreeMap<ControllerKind, ControllerType>,
    layouts: BTreeMap<&'static str, Layout>,
    themes: BTreeMap<String, Theme>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Registry {
    pub fn builtin() -> Self {
        Self {
            controller_types: ControllerKind::ALL
                .into_iter()
                .map(|kind| (kind, ControllerType::of(kind)))
                .collect(),
            layouts: layouts::builtin().into_iter().map(|l| (l.name, l)).collect(),
            themes: themes::builtin()
                .into_iter()
                .map(|t| (t.name.clone(), t))
                .collect(),
        }
    }

    pub fn controller_type(&self, kind: ControllerKind) -> Result<&ControllerType, ConfigError> {
        self.controller_types
            .get(&kind)
            .ok_or_else(|| ConfigError::UnknownControllerType(kind.to_string()))
    }

    pub fn layout(&self, name: &str) -> Result<&Layout, ConfigError> {
        self.layouts
            .get(name)
            .ok_or_else(|| ConfigError::UnknownLayout(name.to_string()))
    }

    pub fn theme(&self, name: &str) -> Result<&Theme, ConfigError> {
        self.themes
            .get(name)
            .ok_or_else(|| ConfigError::UnknownTheme(name.to_string()))
    }

    /// Adds a theme, replacing any theme of the same name.
    pub fn add_theme(&mut self, theme: Theme) {
        if self.themes.contains_key(&theme.name) {
            info!("Theme {} overridden by configuration", theme.name);
        } else {
            debug!("Theme {} added", theme.name);
        }
        self.themes.insert(theme.name.clone(), theme);
    }

    pub fn theme_names(&self) -> impl Iterator<Item = &str> {
        self.themes.keys().map(String::as_str)
    }

    /// Controller kind whose name marker occurs in `line`.
    pub fn detect(&self, line: &str) -> Option<ControllerKind> {
        self.controller_types
            .values()
            .find(|ctype| ctype.matches_name(line))
            .map(|ctype| ctype.kind)
    }
}
