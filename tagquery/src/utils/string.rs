//! String helpers

/// Parse a field list given as a JSON array or comma-separated values
///
/// Handles:
/// - JSON arrays: `["name", "habit"]`
/// - Comma-separated: `name, habit`
/// - Malformed arrays: falls back to comma splitting
///
/// Empty entries are dropped and duplicates keep their first position.
pub fn parse_field_list(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    let items: Vec<String> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).unwrap_or_else(|_| {
            trimmed
                .trim_matches(|c| c == '[' || c == ']')
                .split(',')
                .map(|s| s.trim().trim_matches('"').to_string())
                .collect()
        })
    } else {
        trimmed.split(',').map(|s| s.trim().to_string()).collect()
    };

    let mut fields: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !item.is_empty() && !fields.contains(&item) {
            fields.push(item);
        }
    }
    fields
}
