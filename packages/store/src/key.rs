//! Namespacing keys by caller path.
//!
//! Several callers may share one variables file. Each prefixes its keys with
//! its own dot-separated path (for example `tool.github`), so `token` set by
//! one does not collide with `token` set by another.

/// Separates segments of a caller path.
pub const SEPARATOR: char = '.';

/// Join a caller path and a raw key: `qualify("tool.github", "token")` is
/// `"tool.github.token"`.
///
/// Empty segments are dropped, so a path of `""` or `"."` leaves the key
/// unchanged.
pub fn qualify(path: &str, key: &str) -> String {
    let mut qualified = String::with_capacity(path.len() + key.len() + 1);
    for segment in path.split(SEPARATOR).filter(|s| !s.is_empty()) {
        qualified.push_str(segment);
        qualified.push(SEPARATOR);
    }
    qualified.push_str(key);
    qualified
}
