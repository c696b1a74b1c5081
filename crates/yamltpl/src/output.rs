//! Emitting rendered documents.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

/// Prints every document as a `# Source:` block, in name order.
pub fn write_stream<W: Write>(mut out: W, rendered: &BTreeMap<String, String>) -> io::Result<()> {
    for (name, text) in rendered {
        write!(out, "# Source: {}\n{}\n---\n", name, text)?;
    }
    out.flush()
}

/// Writes every document to `dir/<name>`, creating parent directories.
pub fn write_dir(dir: &Path, rendered: &BTreeMap<String, String>) -> Result<()> {
    for (name, text) in rendered {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
        debug!(path = %path.display(), "wrote rendered template");
    }
    Ok(())
}
