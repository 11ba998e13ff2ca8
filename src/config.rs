//! Front end configuration

use std::path::PathBuf;

/// Settings for one [`Frontend`](crate::driver::Frontend).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontendConfig {
    /// Extra directories searched by `include`
    pub include_dirs: Vec<PathBuf>,
    /// Values registered before the root file is read
    pub predefined: Vec<(String, String)>,
    /// Colour diagnostics when rendering
    pub color: bool,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            include_dirs: Vec::new(),
            predefined: Vec::new(),
            color: true,
        }
    }
}

impl FrontendConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    pub fn with_define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.predefined.push((name.into(), value.into()));
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}
