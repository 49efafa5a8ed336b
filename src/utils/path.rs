use crate::constants::PATH_SEPARATOR;

/// Join path segments with `/`, trimming stray separators between them.
///
/// Empty segments are skipped, so an absent optional segment (like a config
/// tag) simply disappears from the result.
pub fn join_path<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    let mut path = String::new();
    for segment in segments {
        let trimmed = segment.trim_matches(PATH_SEPARATOR);
        if trimmed.is_empty() {
            continue;
        }
        path.push(PATH_SEPARATOR);
        path.push_str(trimmed);
    }
    if path.is_empty() {
        path.push(PATH_SEPARATOR);
    }
    path
}

/// True when `path` equals `prefix` or lives somewhere below it
pub fn is_at_or_below(
    path: &str,
    prefix: &str,
) -> bool {
    let prefix = prefix.trim_end_matches(PATH_SEPARATOR);
    if prefix.is_empty() {
        return path.starts_with(PATH_SEPARATOR);
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with(PATH_SEPARATOR),
        None => false,
    }
}

/// True when `path` lives strictly below `prefix`
pub fn is_below(
    path: &str,
    prefix: &str,
) -> bool {
    is_at_or_below(path, prefix) && path.trim_end_matches(PATH_SEPARATOR) != prefix.trim_end_matches(PATH_SEPARATOR)
}
