use std::time::Duration;

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Parses a comma-separated list of whole seconds, e.g. `"1, 3, 5"`. An empty string is an empty list.
///
/// Returns the first entry that is not a valid number of seconds as the error.
pub fn parse_seconds_list(value: &str) -> Result<Vec<Duration>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u64>().map(Duration::from_secs).map_err(|_| s.to_string()))
        .collect()
}
