//! Configuration management
//!
//! Each configurable combinator (`RetryPolicy`, `PollConfig`,
//! `BatchConfig`) and the aggregate `ToolkitConfig` implement
//! [`ConfigBuilder`], so they can be validated, merged and overridden from
//! environment variables in the same way.
//!
//! # Example
//!
//! ```rust,ignore
//! use async_toolkit::config::ConfigBuilder;
//! use async_toolkit::{ToolkitConfig, ENV_PREFIX};
//!
//! // ASYNC_TOOLKIT_RETRY_MAX_RETRIES=5 ASYNC_TOOLKIT_POOL_CONCURRENCY=8
//! let config = ToolkitConfig::from_env_with_defaults(ENV_PREFIX)?;
//! ```

mod builder;
mod env;

pub use builder::ConfigBuilder;
pub use env::{
    build_env_key, get_env, get_env_bool, get_env_duration_ms, get_env_parse, get_env_parse_or,
};
