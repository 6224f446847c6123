//! Settings loader for the `.mermaid-gif/` directory and the environment.
//!
//! Settings are assembled in three layers, later layers winning:
//! 1. Built-in defaults ([`Settings::default`])
//! 2. `config.toml` (either `<root>/.mermaid-gif/config.toml` or an explicit path)
//! 3. Environment variables (`GROQ_API_KEY`, `MERMAID_GIF_FPS`, ...)
//!
//! The result is validated once; an invalid value aborts startup.

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use mg_protocol::config_models::Settings;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

/// Directory searched under the project root when no explicit file is given.
pub const CONFIG_DIR: &str = ".mermaid-gif";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Loads, overrides and validates the settings for this process.
///
/// # Arguments
///
/// * `root` - Directory that may contain `.mermaid-gif/config.toml`
/// * `explicit` - A config file path given on the command line; must exist
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - The explicit file is missing, or any file cannot be read or parsed
/// - An environment override is malformed
/// - The merged settings fail [`validate_settings`]
///
/// # Example
///
/// ```rust,no_run
/// use mg_core::config::loader::load_settings;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = load_settings(Path::new("."), None)?;
/// println!("Using model {}", settings.model);
/// # Ok(())
/// # }
/// ```
pub fn load_settings(root: &Path, explicit: Option<&Path>) -> ConfigResult<Settings> {
    load_settings_with(root, explicit, |name| std::env::var(name).ok(), |s| s)
}

/// [`load_settings`] with an explicit environment lookup and a final
/// override layer (command-line flags) applied before validation.
pub fn load_settings_with<F, O>(
    root: &Path,
    explicit: Option<&Path>,
    lookup: F,
    overrides: O,
) -> ConfigResult<Settings>
where
    F: Fn(&str) -> Option<String>,
    O: FnOnce(Settings) -> Settings,
{
    let settings = load_file_layer(root, explicit)?;
    let settings = apply_env_overrides(settings, lookup)?;
    let settings = overrides(settings);
    validate_settings(&settings)?;
    Ok(settings)
}

/// Reads the TOML layer, falling back to defaults when no file exists.
pub fn load_file_layer(root: &Path, explicit: Option<&Path>) -> ConfigResult<Settings> {
    let config_path: PathBuf = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            path.to_path_buf()
        }
        None => root.join(CONFIG_DIR).join("config.toml"),
    };

    // If config.toml doesn't exist, return default
    if !config_path.exists() {
        return Ok(Settings::default());
    }

    let content =
        std::fs::read_to_string(&config_path).map_err(|source| ConfigError::FileRead {
            path: config_path.clone(),
            source,
        })?;

    let settings: Settings =
        toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: config_path,
            source,
        })?;

    Ok(settings)
}

/// Applies environment overrides using `lookup` to read variables.
///
/// Taking the lookup as a closure keeps tests away from the process
/// environment.
pub fn apply_env_overrides<F>(mut settings: Settings, lookup: F) -> ConfigResult<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = non_empty("GROQ_API_KEY") {
        settings.groq_api_key = Some(v.trim().to_string());
    }
    if let Some(v) = non_empty("OPENROUTER_API_KEY") {
        settings.openrouter_api_key = Some(v.trim().to_string());
    }
    if let Some(v) = non_empty("MERMAID_GIF_MODEL") {
        settings.model = v.trim().to_string();
    }
    if let Some(v) = non_empty("MERMAID_GIF_DURATION") {
        settings.default_animation_duration = parse_env("MERMAID_GIF_DURATION", &v)?;
    }
    if let Some(v) = non_empty("MERMAID_GIF_STYLE") {
        settings.default_animation_style = v.parse().unwrap_or_default();
    }
    if let Some(v) = non_empty("MERMAID_GIF_FPS") {
        settings.default_fps = parse_env("MERMAID_GIF_FPS", &v)?;
    }
    if let Some(v) = non_empty("MERMAID_GIF_MAX_REPAIRS") {
        settings.max_repair_attempts = parse_env("MERMAID_GIF_MAX_REPAIRS", &v)?;
    }
    if let Some(v) = non_empty("MERMAID_GIF_VIEWPORT_WIDTH") {
        settings.viewport_width = parse_env("MERMAID_GIF_VIEWPORT_WIDTH", &v)?;
    }
    if let Some(v) = non_empty("MERMAID_GIF_VIEWPORT_HEIGHT") {
        settings.viewport_height = parse_env("MERMAID_GIF_VIEWPORT_HEIGHT", &v)?;
    }
    if let Some(v) = non_empty("MERMAID_GIF_OUTPUT_DIR") {
        settings.output_dir = PathBuf::from(v);
    }
    if let Some(v) = non_empty("CHROMIUM_EXECUTABLE_PATH") {
        settings.chromium_path = Some(PathBuf::from(v));
    }
    if let Some(v) = non_empty("FFMPEG_PATH") {
        settings.ffmpeg_path = PathBuf::from(v);
    }
    if let Some(v) = non_empty("MERMAID_GIF_LOG_LEVEL") {
        settings.log_level = v.trim().to_ascii_lowercase();
    }

    Ok(settings)
}

fn parse_env<T>(var: &str, raw: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::EnvParse {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

/// Checks credentials and numeric ranges.
///
/// # Errors
///
/// The first violated rule, as a `ConfigError`.
pub fn validate_settings(settings: &Settings) -> ConfigResult<()> {
    if let Some(key) = &settings.groq_api_key {
        if !key.starts_with("gsk_") {
            return Err(ConfigError::InvalidCredential {
                key: "GROQ_API_KEY",
                reason: "must start with 'gsk_'".to_string(),
            });
        }
    }

    if let Some(key) = &settings.openrouter_api_key {
        if !key.starts_with("sk-or-") {
            return Err(ConfigError::InvalidCredential {
                key: "OPENROUTER_API_KEY",
                reason: "must start with 'sk-or-'".to_string(),
            });
        }
        if key.len() < 20 {
            return Err(ConfigError::InvalidCredential {
                key: "OPENROUTER_API_KEY",
                reason: "appears to be invalid (too short)".to_string(),
            });
        }
    }

    if settings.groq_api_key.is_none() && settings.openrouter_api_key.is_none() {
        return Err(ConfigError::MissingCredentials);
    }

    for (key, value) in [
        ("default_animation_duration", settings.default_animation_duration),
        ("capture_buffer_secs", settings.capture_buffer_secs),
        ("trim_start_secs", settings.trim_start_secs),
    ] {
        if !value.is_finite() {
            return Err(invalid(key, format!("{value} is not a finite number")));
        }
    }

    if settings.model.trim().is_empty() {
        return Err(invalid("model", "must not be empty"));
    }
    if !(1.0..=60.0).contains(&settings.default_animation_duration) {
        return Err(invalid(
            "default_animation_duration",
            format!("{} is outside 1.0..=60.0", settings.default_animation_duration),
        ));
    }
    if !(10..=60).contains(&settings.default_fps) {
        return Err(invalid(
            "default_fps",
            format!("{} is outside 10..=60", settings.default_fps),
        ));
    }
    if !(1..=10).contains(&settings.max_repair_attempts) {
        return Err(invalid(
            "max_repair_attempts",
            format!("{} is outside 1..=10", settings.max_repair_attempts),
        ));
    }
    if !(800..=8000).contains(&settings.viewport_width) {
        return Err(invalid(
            "viewport_width",
            format!("{} is outside 800..=8000", settings.viewport_width),
        ));
    }
    if !(600..=8000).contains(&settings.viewport_height) {
        return Err(invalid(
            "viewport_height",
            format!("{} is outside 600..=8000", settings.viewport_height),
        ));
    }
    if settings.request_timeout_secs == 0 {
        return Err(invalid("request_timeout_secs", "must be positive"));
    }
    if settings.capture_buffer_secs < 0.0 || settings.trim_start_secs < 0.0 {
        return Err(invalid(
            "capture_buffer_secs",
            "buffer and trim start must not be negative",
        ));
    }
    if settings.trim_start_secs > settings.capture_buffer_secs {
        return Err(invalid(
            "trim_start_secs",
            format!(
                "trim start {} exceeds capture buffer {}",
                settings.trim_start_secs, settings.capture_buffer_secs
            ),
        ));
    }
    if let Some(width) = settings.max_output_width {
        if width < 2 {
            return Err(invalid("max_output_width", "must be at least 2"));
        }
    }
    if !LOG_LEVELS.contains(&settings.log_level.as_str()) {
        return Err(invalid(
            "log_level",
            format!("must be one of {}", LOG_LEVELS.join(", ")),
        ));
    }

    Ok(())
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        reason: reason.into(),
    }
}
