//! SQL utility functions

/// Escape SQL LIKE metacharacters (%, _, \) in a literal
///
/// The result matches itself under `LIKE ... ESCAPE '\'`, so it can be
/// wrapped in `%...%` for a substring match.
///
/// # Example
///
/// ```
/// use tagquery::utils::sql::escape_like_pattern;
///
/// let pattern = format!("%{}%", escape_like_pattern("100% match_test"));
/// assert_eq!(pattern, "%100\\% match\\_test%");
/// ```
pub fn escape_like_pattern(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
