//! Small shared helpers: the size-threshold policy and extension parsing.

/// Whether `current_size` is close enough to `max_size` to leave the object
/// untouched.
///
/// True iff `current_size >= max_size - max_size * fraction`. The comparison
/// is one-sided, so oversized objects always pass. `fraction` must be within
/// `0.0..=1.0`; violating this is a programming error.
pub fn close_enough(current_size: u64, max_size: u64, fraction: f64) -> bool {
    assert!(
        (0.0..=1.0).contains(&fraction),
        "threshold fraction must be within 0.0..=1.0"
    );
    let low = max_size as f64 - max_size as f64 * fraction;
    current_size as f64 >= low
}

/// The dot-separated suffix segments of a name's file component.
///
/// `"dir/foo.csv.gz"` yields `["csv", "gz"]`; a name without dots yields
/// nothing. The leading component before the first dot is the base name,
/// never an extension.
pub fn file_extensions(name: &str) -> Vec<&str> {
    let file = name.rsplit('/').next().unwrap_or(name);
    file.split('.').skip(1).collect()
}

/// Path-prefix segments of an object name: everything between the leading
/// folder/bucket token and the filename.
///
/// `"data/a/b/x.csv"` yields `["a", "b"]`; names with fewer than three
/// segments have no prefix.
pub(crate) fn prefix_segments(name: &str) -> Vec<&str> {
    let segments: Vec<&str> = name.split('/').collect();
    if segments.len() <= 2 {
        return Vec::new();
    }
    segments[1..segments.len() - 1].to_vec()
}

/// Join non-empty key segments with `/`.
pub(crate) fn join_path(segments: &[&str]) -> String {
    segments
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}
