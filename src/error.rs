//! Error types - failures crossing the stack boundary
//!
//! Pushing never fails; these come from reading slots back, calling into the
//! runtime and loading configuration.

use thiserror::Error;

use crate::runtime::Type;

/// Errors raised by stack reads and runtime calls
#[derive(Debug, Error)]
pub enum StackError {
    #[error("bad value at index {index}: expected {expected}, found {found}")]
    TypeMismatch {
        index: i32,
        expected: &'static str,
        found: Type,
    },

    #[error("integer {value} at index {index} does not fit in {target}")]
    IntegerOverflow {
        index: i32,
        value: i128,
        target: &'static str,
    },

    #[error("string at index {index} is not valid UTF-8")]
    InvalidUtf8 {
        index: i32,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("index {index} does not refer to a valid slot")]
    InvalidIndex { index: i32 },

    #[error("attempt to call a {found} value")]
    NotCallable { found: Type },

    #[error("stack overflow: {requested} slots requested, limit is {limit}")]
    StackOverflow { requested: usize, limit: usize },

    #[error("userdata at index {index} does not hold a {expected}")]
    InvalidHandle { index: i32, expected: &'static str },

    #[error("table index is {found}")]
    InvalidKey { found: &'static str },
}

/// Errors raised while loading or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub type StackResult<T> = Result<T, StackError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
