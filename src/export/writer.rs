//! Write collected files to disk.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;

use super::files::ConvertedFile;

/// Write every file into `output_dir`, creating it if needed.
///
/// Existing files are never overwritten: a counter is appended to the
/// stem instead, and the file is opened with `create_new` so a name taken
/// concurrently fails the write. Returns the paths actually written, in
/// input order.
pub fn write_files(files: &[ConvertedFile], output_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut paths = Vec::with_capacity(files.len());
    for file in files {
        let path = unique_path(&output_dir.join(&file.name));
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .and_then(|mut f| f.write_all(&file.data))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!(path = %path.display(), size = file.size(), "Wrote file");
        paths.push(path);
    }
    Ok(paths)
}

/// If `path` already exists, append the lowest counter that gives a free name.
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    let candidate = |suffix: &str| {
        if ext.is_empty() {
            parent.join(format!("{stem}_{suffix}"))
        } else {
            parent.join(format!("{stem}_{suffix}.{ext}"))
        }
    };

    let mut counter: u64 = 1;
    loop {
        let next = candidate(&counter.to_string());
        if !next.exists() {
            return next;
        }
        counter += 1;
    }
}
