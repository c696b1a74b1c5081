//! Reading templates and values from disk.
//!
//! Templates are collected by walking the input directory recursively. Each
//! file with a `.yaml` or `.yml` extension becomes a [`TemplateFile`] named by
//! its path relative to the directory, with `/` separators on every platform.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use yamltpl_render::TemplateFile;
use yamltpl_values::{parse_overrides, Values, ValuesError};

/// Extensions recognized as templates.
pub const TEMPLATE_EXTENSIONS: &[&str] = &["yaml", "yml"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid values file {}: {source}", path.display())]
    Values {
        path: PathBuf,
        #[source]
        source: ValuesError,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> LoadError + '_ {
    move |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Collects every template below `root`, sorted by name.
pub fn load_templates(root: &Path) -> Result<Vec<TemplateFile>, LoadError> {
    let mut files = Vec::new();
    walk_dir_recursive(root, root, &mut files)?;
    files.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(root = %root.display(), count = files.len(), "loaded templates");
    Ok(files)
}

fn walk_dir_recursive(current: &Path, root: &Path, files: &mut Vec<TemplateFile>) -> Result<(), LoadError> {
    let entries = fs::read_dir(current).map_err(io_error(current))?;

    for entry in entries {
        let entry = entry.map_err(io_error(current))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(io_error(&path))?;

        if file_type.is_dir() {
            walk_dir_recursive(&path, root, files)?;
        } else if file_type.is_symlink() && path.is_dir() {
            debug!(path = %path.display(), "skipping symlinked directory");
        } else if path.is_file() && has_template_extension(&path) {
            let data = fs::read(&path).map_err(io_error(&path))?;
            files.push(TemplateFile::new(template_name(&path, root), data));
        }
    }

    Ok(())
}

fn has_template_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext))
}

fn template_name(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Merges the values files in order, then applies the overrides.
pub fn load_values(files: &[PathBuf], overrides: &[String]) -> Result<Values, LoadError> {
    let mut values = Values::new();
    for path in files {
        let data = fs::read(path).map_err(io_error(path))?;
        let document = Values::from_yaml(&data).map_err(|source| LoadError::Values {
            path: path.clone(),
            source,
        })?;
        values.override_with(&document);
        debug!(path = %path.display(), "merged values file");
    }
    values.override_with(&parse_overrides(overrides));
    Ok(values)
}
