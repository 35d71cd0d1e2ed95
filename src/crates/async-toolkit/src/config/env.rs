//! Environment variable loading
//!
//! Typed access to the variables that override combinator defaults.
//! A missing variable is never an error; a present but malformed one is.

use crate::{Result, ToolkitError};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Load an environment variable as a string
///
/// Returns `Ok(None)` when the variable is unset and an error when it holds
/// invalid UTF-8.
pub fn get_env(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(val) => Ok(Some(val)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ToolkitError::Config(format!(
            "Environment variable {} contains invalid UTF-8",
            key
        ))),
    }
}

/// Load and parse an environment variable
///
/// # Example
///
/// ```rust,ignore
/// let retries: Option<usize> = get_env_parse("ASYNC_TOOLKIT_RETRY_MAX_RETRIES")?;
/// let factor: Option<f64> = get_env_parse("ASYNC_TOOLKIT_RETRY_BACKOFF_MULTIPLIER")?;
/// ```
pub fn get_env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key)?
        .map(|val| {
            val.trim().parse::<T>().map_err(|e| {
                ToolkitError::Config(format!(
                    "Failed to parse environment variable {}: {}",
                    key, e
                ))
            })
        })
        .transpose()
}

/// Load and parse an environment variable, falling back to `default` when unset
pub fn get_env_parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(get_env_parse(key)?.unwrap_or(default))
}

/// Load a boolean environment variable
///
/// Accepts `true/1/yes/on` and `false/0/no/off`, case-insensitively.
pub fn get_env_bool(key: &str) -> Result<Option<bool>> {
    let Some(val) = get_env(key)? else {
        return Ok(None);
    };

    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(Some(true)),
        "false" | "0" | "no" | "off" => Ok(Some(false)),
        _ => Err(ToolkitError::Config(format!(
            "Invalid boolean value for {}: {}",
            key, val
        ))),
    }
}

/// Load an environment variable holding a whole number of milliseconds
pub fn get_env_duration_ms(key: &str) -> Result<Option<Duration>> {
    Ok(get_env_parse::<u64>(key)?.map(Duration::from_millis))
}

/// Build a prefixed environment variable name; `name` is uppercased
///
/// ```rust
/// use async_toolkit::config::build_env_key;
///
/// assert_eq!(
///     build_env_key("ASYNC_TOOLKIT_", "poll_interval_ms"),
///     "ASYNC_TOOLKIT_POLL_INTERVAL_MS"
/// );
/// ```
pub fn build_env_key(prefix: &str, name: &str) -> String {
    format!("{}{}", prefix, name.to_uppercase())
}
