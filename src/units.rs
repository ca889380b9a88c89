//! Locating source units on disk.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use snafu::ResultExt;

use crate::error::{IoSnafu, NoSourceUnitsSnafu, Result};

const SOURCE_EXTENSION: &str = "vm";
const OUTPUT_EXTENSION: &str = "asm";

fn is_source(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == SOURCE_EXTENSION)
}

fn collect(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).context(IoSnafu { path: dir })?;
    for entry in entries {
        let path = entry.context(IoSnafu { path: dir })?.path();
        if path.is_dir() {
            collect(&path, found)?;
        } else if is_source(&path) {
            found.push(path);
        }
    }
    Ok(())
}

/// All `.vm` files under `root` (or `root` itself when it is a file), in
/// lexicographic path order. A directory without any is an error.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = vec![];
    if root.is_dir() {
        collect(root, &mut found)?;
        if found.is_empty() {
            return NoSourceUnitsSnafu { path: root }.fail();
        }
    } else {
        // Surface a missing or unreadable input here rather than at read time.
        fs::metadata(root).context(IoSnafu { path: root })?;
        found.push(root.to_path_buf());
    }
    found.sort();
    for path in &found {
        info!("source unit {}", path.display());
    }
    Ok(found)
}

/// Unit name used for diagnostics and label scopes: the file stem.
pub fn unit_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `Foo.vm` -> `Foo.asm`; directory `Dir` -> `Dir/Dir.asm`.
pub fn output_path(root: &Path) -> PathBuf {
    if root.is_dir() {
        let name = root
            .canonicalize()
            .ok()
            .and_then(|abs| abs.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "out".to_string());
        root.join(format!("{}.{}", name, OUTPUT_EXTENSION))
    } else {
        root.with_extension(OUTPUT_EXTENSION)
    }
}

pub fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).context(IoSnafu { path })
}

pub fn write(path: &Path, instructions: &[String]) -> Result<()> {
    let mut text = instructions.join("\n");
    text.push('\n');
    fs::write(path, text).context(IoSnafu { path })?;
    info!("wrote {} lines to {}", instructions.len(), path.display());
    Ok(())
}
