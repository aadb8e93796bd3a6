//! Finding the input files of a batch.
//!
//! Files are returned in lexicographic path order, which callers rely on as
//! temporal order. Names must therefore sort chronologically
//! (`..._2020_01_09.nc` before `..._2020_01_10.nc`); nothing here checks it.

use std::{
    fs,
    path::{Path, PathBuf},
};

use glob::{glob, Pattern};

use crate::error::Result;

/// Expands `pattern` inside `source_dir`. No match is an empty list, not an
/// error.
pub fn resolve_glob(source_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let dir = Pattern::escape(&source_dir.to_string_lossy());
    let full_pattern = Path::new(&dir).join(pattern);

    let mut files: Vec<PathBuf> = glob(&full_pattern.to_string_lossy())?
        .filter_map(std::result::Result::ok)
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    Ok(files)
}

/// Lists the files directly inside `dir` whose name ends with `extension`
/// (case-sensitive).
pub fn resolve_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(extension));

        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

// -- Tests -------------------------------------------------------------------
