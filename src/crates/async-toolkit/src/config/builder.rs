//! Configuration builder trait
//!
//! Gives every combinator configuration the same shape: defaults,
//! validation, environment loading and merging.

use crate::Result;

/// Common lifecycle for combinator settings
///
/// An implementor supplies its defaults through `Default`, reads overrides
/// with [`from_env`](ConfigBuilder::from_env) and layers one source over
/// another with [`merge`](ConfigBuilder::merge). The provided methods
/// combine those steps and always finish with validation.
///
/// # Example
///
/// ```rust
/// use async_toolkit::config::ConfigBuilder;
/// use async_toolkit::RetryPolicy;
///
/// let policy = RetryPolicy::from_env_with_defaults("MYAPP_RETRY_").unwrap();
/// assert!(policy.validate().is_ok());
/// ```
pub trait ConfigBuilder: Default + Clone {
    /// Validate the configuration
    ///
    /// Returns an error if a value is out of range or two values contradict
    /// each other.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Load configuration from environment variables
    ///
    /// Variables follow the pattern `{PREFIX}{FIELD_NAME}`; missing
    /// variables fall back to the field's default.
    fn from_env(prefix: &str) -> Result<Self>;

    /// Merge another configuration into this one
    ///
    /// Fields of `other` that differ from their defaults overwrite the
    /// fields of `self`. Returns self for chaining.
    fn merge(&mut self, other: Self) -> &mut Self;

    /// Create, validate, and return the default configuration
    fn build() -> Result<Self> {
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Layer the environment over the defaults and validate the result
    fn from_env_with_defaults(prefix: &str) -> Result<Self> {
        let mut config = Self::default();
        config.merge(Self::from_env(prefix)?);
        config.validate()?;
        Ok(config)
    }
}
