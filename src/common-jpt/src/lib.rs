/// True if the environment variable is set and not empty. False otherwise.
pub fn is_env_set(env_var: &str) -> bool {
    match std::env::var(env_var) {
        Ok(val) => !val.trim().is_empty(),
        Err(_) => false,
    }
}

/// Splits a comma-separated value into its trimmed, non-empty entries, preserving order.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Interprets common truthy spellings ("true", "1", "yes", "on"). Anything else is false.
pub fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
