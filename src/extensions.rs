//! Extension normalization.
//!
//! Every extension that enters a [`CategoryTable`](crate::file_category::CategoryTable)
//! passes through [`normalize`], so matching only ever compares lowercase,
//! dot-less, non-empty tokens.

use std::collections::HashSet;

/// Normalizes raw extension tokens into a deduplicated list.
///
/// Each token is trimmed, stripped of a single leading `.` and lowercased.
/// Empty results and repeats are dropped; the first occurrence keeps its
/// position.
///
/// # Examples
///
/// ```
/// use dirsort::extensions::normalize;
///
/// assert_eq!(normalize(["JPG", "jpg", ".png"]), vec!["jpg", "png"]);
/// assert_eq!(normalize(["  ", "."]), Vec::<String>::new());
/// ```
pub fn normalize<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut cleaned = Vec::new();

    for token in raw {
        let trimmed = token.as_ref().trim();
        let stripped = trimmed.strip_prefix('.').unwrap_or(trimmed);
        let ext = stripped.to_lowercase();
        if ext.is_empty() || !seen.insert(ext.clone()) {
            continue;
        }
        cleaned.push(ext);
    }

    cleaned
}

/// Splits a comma-separated list such as `"jpg, .PNG ,gif"` and normalizes it.
pub fn parse_extension_list(input: &str) -> Vec<String> {
    normalize(input.split(','))
}

/// Returns the lowercase extension of a file name, without the dot.
///
/// Names without an extension (including dotfiles like `.bashrc`) yield an
/// empty string, which no category can contain.
pub fn extension_of(path: &std::path::Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
