//! The `yamltpl` command-line front end.
//!
//! Reads a directory of templates (or one template from stdin), merges the
//! values files and `--set` overrides into one store, renders everything with
//! [`yamltpl_render`], and either prints the documents or writes them below an
//! output directory.
//!
//! ```text
//! yamltpl -i templates/ -v values.yaml,prod.yaml --set image.tag=1.27 -o out/
//! ```
//!
//! The binary is a thin wrapper around [`run`], which takes its input and
//! output streams as arguments so it can be driven from tests.

pub mod cli;
pub mod loader;
pub mod output;
mod settings;

use std::io::{Read, Write};

use anyhow::{anyhow, Context, Result};
use tracing::info;
use yamltpl_render::{Renderer, TemplateFile};

pub use cli::{Cli, Command};
pub use loader::{load_templates, load_values, LoadError};
pub use settings::Settings;

/// Name given to a template read from standard input.
pub const STDIN_TEMPLATE: &str = "stdin";

/// `version: <version> build time: <time>`.
pub fn version_line() -> String {
    format!(
        "version: {} build time: {}",
        env!("CARGO_PKG_VERSION"),
        option_env!("YAMLTPL_BUILD_TIME").unwrap_or("unknown")
    )
}

/// Runs one invocation.
pub fn run<R: Read, W: Write>(cli: &Cli, input: R, mut out: W) -> Result<()> {
    let settings = cli.settings();
    match cli.command {
        Some(Command::Version) => {
            writeln!(out, "{}", version_line())?;
            Ok(())
        }
        Some(Command::Values) => {
            let values = load_values(&settings.values_files, &settings.overrides)?;
            values.encode(&mut out).context("failed to encode values")?;
            Ok(())
        }
        None => render(&settings, input, out),
    }
}

/// Renders the templates `settings` points at.
pub fn render<R: Read, W: Write>(settings: &Settings, mut input: R, out: W) -> Result<()> {
    let values = load_values(&settings.values_files, &settings.overrides)?;

    let files = if settings.stdin {
        let mut data = Vec::new();
        input
            .read_to_end(&mut data)
            .context("failed to read template from stdin")?;
        vec![TemplateFile::new(STDIN_TEMPLATE, data)]
    } else {
        let dir = settings
            .input_dir
            .as_deref()
            .ok_or_else(|| anyhow!("input dir is not specified"))?;
        load_templates(dir)?
    };

    info!(count = files.len(), strict = settings.options.strict, "rendering templates");
    let rendered = Renderer::new(settings.options).render_files(files, &values)?;

    match &settings.output_dir {
        Some(dir) => output::write_dir(dir, &rendered),
        None => output::write_stream(out, &rendered).context("failed to write output"),
    }
}
