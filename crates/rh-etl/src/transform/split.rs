//! Multi-valued field splitting

/// Split a comma-separated field into trimmed, non-empty elements.
///
/// An absent field yields nothing.
pub fn split_list(field: Option<&str>) -> impl Iterator<Item = &str> {
    field
        .into_iter()
        .flat_map(|s| s.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
