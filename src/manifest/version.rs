// Manifest version bumping
// "1.0" -> "1.1", "1.5.9" -> "1.5.10", "1.0-beta" -> "1.0-beta.1"

/// Increment the last dotted segment, or append `.1` if it is not numeric.
pub fn increment_version(version: &str) -> String {
    if version.is_empty() {
        return "1.0".to_string();
    }

    let mut parts: Vec<String> = version.split('.').map(str::to_string).collect();
    let last = parts.len() - 1;

    match parts[last].parse::<u64>().ok().and_then(|n| n.checked_add(1)) {
        Some(next) => {
            parts[last] = next.to_string();
            parts.join(".")
        }
        None => format!("{}.1", version),
    }
}
