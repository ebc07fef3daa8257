//! Writing downloaded lot files to disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::api::LotFile;

/// Write `file` into `dir` and return the path used.
///
/// An existing file is never overwritten: `name.csv` becomes `name (1).csv`,
/// `name (2).csv`, and so on.
pub fn save_lot_file(dir: &Path, file: &LotFile) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = unique_path(dir, &file.filename);
    fs::write(&path, &file.bytes)?;
    Ok(path)
}

fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (filename, None),
    };
    (1u32..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{stem} ({n}).{ext}")),
            None => dir.join(format!("{stem} ({n})")),
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}
