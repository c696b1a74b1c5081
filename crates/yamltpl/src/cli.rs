//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use yamltpl_render::RenderOptions;

use crate::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "yamltpl")]
#[command(about = "The YAML template renderer")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Template directory; every .yaml/.yml file below it is rendered
    #[arg(short = 'i', long = "in", global = true)]
    pub input_dir: Option<PathBuf>,

    /// Read a single template named "stdin" from standard input
    #[arg(short, long, global = true)]
    pub stdin: bool,

    /// Values files, merged in order
    #[arg(short, long = "values", value_delimiter = ',', global = true)]
    pub values: Vec<PathBuf>,

    /// Override a value (key.path=value); applied after all values files
    #[arg(long = "set", value_delimiter = ',', global = true)]
    pub set: Vec<String>,

    /// Write each rendered template below this directory instead of stdout
    #[arg(short, long = "out", global = true)]
    pub out: Option<PathBuf>,

    /// Fail on references to missing values
    #[arg(long, global = true)]
    pub strict: bool,

    /// Report required and fail calls without failing
    #[arg(long, global = true)]
    pub lint: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Print version and build time
    Version,
    /// Print the merged values as YAML
    Values,
}

impl Cli {
    pub fn settings(&self) -> Settings {
        Settings {
            input_dir: self.input_dir.clone(),
            stdin: self.stdin,
            values_files: self.values.clone(),
            overrides: self.set.clone(),
            output_dir: self.out.clone(),
            options: RenderOptions::new().strict(self.strict).lint_mode(self.lint),
            debug: self.debug,
        }
    }
}
