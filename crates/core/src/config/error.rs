//! Error types for configuration loading.
//!
//! This module defines all errors that can occur while reading, overriding
//! and validating [`Settings`](mg_protocol::Settings). Any of them aborts
//! the process before a run starts.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read a configuration file from disk.
    #[error("Failed to read config file at {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML file at {path}: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// An environment override could not be parsed.
    #[error("Invalid value for environment variable {var}: {reason}")]
    EnvParse { var: String, reason: String },

    /// A setting is outside its accepted range or format.
    #[error("Invalid setting `{key}`: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    /// A credential does not have the expected format.
    #[error("Invalid credential `{key}`: {reason}")]
    InvalidCredential { key: &'static str, reason: String },

    /// No generation-service credential was supplied at all.
    #[error("At least one LLM API key must be provided: GROQ_API_KEY or OPENROUTER_API_KEY")]
    MissingCredentials,
}

/// Type alias for Result with ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;
