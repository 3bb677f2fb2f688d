use thiserror::Error;

/// An environment variable required by the application is not set.
#[derive(Debug, Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVarError(pub String);

/// Reads a required environment variable, returning a structured error if it
/// is missing or empty.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn require_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    env_var(name).ok_or_else(|| MissingEnvVarError(name.to_string()))
}

/// Reads an optional environment variable.
///
/// An empty value is treated the same as an unset variable, so shell lines
/// like `NSE_DATA_CONFIG= cmd` do not smuggle in an empty path.
pub fn env_var(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}
