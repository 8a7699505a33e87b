//! Shared CLI helpers

/// Split a comma-separated flag value, trimming entries and dropping empties.
pub fn parse_csv(value: &Option<String>) -> Option<Vec<String>> {
    value.as_ref().map(|raw| {
        raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(ToString::to_string).collect()
    })
}
