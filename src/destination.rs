/// Collision-free destination naming.
///
/// A file is never moved onto an existing entry. When `dir/name` is taken,
/// the resolver probes `name (1)`, `name (2)`, ... keeping the final extension
/// after the counter, e.g. `report.pdf` becomes `report (1).pdf`.
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Returns the first unused path for `file_name` inside `directory`.
///
/// The result is only a snapshot: nothing is reserved, so two callers racing
/// on the same directory can receive the same answer. The engine processes
/// files sequentially for that reason.
///
/// # Examples
///
/// ```no_run
/// use dirsort::destination::resolve;
/// use std::path::Path;
///
/// let target = resolve(Path::new("/tmp/sorted/documents"), "a.txt");
/// println!("would move to {}", target.display());
/// ```
pub fn resolve(directory: &Path, file_name: &str) -> PathBuf {
    resolve_os(directory, Path::new(file_name))
}

/// Like [`resolve`], for names that may not be valid UTF-8.
pub fn resolve_os(directory: &Path, file_name: &Path) -> PathBuf {
    let target = directory.join(file_name);
    if !is_taken(&target) {
        return target;
    }

    let stem = file_name
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| file_name.as_os_str().to_os_string());
    let extension = file_name.extension();

    (1u64..)
        .map(|counter| {
            let mut candidate = OsString::from(&stem);
            candidate.push(format!(" ({})", counter));
            if let Some(ext) = extension {
                candidate.push(".");
                candidate.push(ext);
            }
            directory.join(candidate)
        })
        .find(|candidate| !is_taken(candidate))
        .unwrap_or(target)
}

/// Any directory entry counts as taken, including a dangling symlink.
fn is_taken(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}
