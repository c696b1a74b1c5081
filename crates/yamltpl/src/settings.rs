use std::path::PathBuf;

use yamltpl_render::RenderOptions;

/// Resolved configuration for one invocation.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub input_dir: Option<PathBuf>,
    pub stdin: bool,
    pub values_files: Vec<PathBuf>,
    /// Raw `key.path=value` entries.
    pub overrides: Vec<String>,
    pub output_dir: Option<PathBuf>,
    pub options: RenderOptions,
    pub debug: bool,
}

impl Settings {
    /// The default log filter when `RUST_LOG` is unset.
    ///
    /// Lint mode reports through info-level events, so it raises the level
    /// enough to show them.
    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.options.lint_mode {
            "info"
        } else {
            "warn"
        }
    }
}
