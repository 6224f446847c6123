//! Settings models for `.mermaid-gif/config.toml`.
//!
//! This module defines the single configuration value built at process
//! start. Every field has a default so that a missing file, or a file that
//! sets only a few keys, still yields a complete value. Credentials usually
//! arrive through the environment rather than the file.

use serde::Deserialize;
use serde::Serialize;
use std::path::PathBuf;

use crate::run_models::{AnimationManifest, AnimationStyle};

/// Represents all settings recognized by mermaid-gif.
///
/// # Example
///
/// ```toml
/// # .mermaid-gif/config.toml
/// model = "groq/llama-3.3-70b-versatile"
/// default_animation_duration = 4.0
/// default_fps = 24
/// max_repair_attempts = 2
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Groq API key (must start with `gsk_`).
    pub groq_api_key: Option<String>,

    /// OpenRouter API key (must start with `sk-or-`).
    pub openrouter_api_key: Option<String>,

    /// Model identifier, optionally prefixed with the provider
    /// (`groq/...` or `openrouter/...`).
    pub model: String,

    /// Timeout for a single generation or repair request.
    pub request_timeout_secs: u64,

    /// Upper bound on repair attempts per run.
    pub max_repair_attempts: u32,

    /// Animation cycle length used when the input does not carry one.
    pub default_animation_duration: f64,

    /// Motion preset used when the input does not carry one.
    pub default_animation_style: AnimationStyle,

    /// Frame rate of the final GIF.
    pub default_fps: u32,

    /// Width of the oversized measurement surface.
    pub viewport_width: u32,

    /// Height of the oversized measurement surface.
    pub viewport_height: u32,

    /// Padding added on each side of the measured content.
    pub capture_padding: u32,

    /// Extra recording time on top of the animation duration.
    pub capture_buffer_secs: f64,

    /// Leading part of the recording discarded by the transcoder.
    pub trim_start_secs: f64,

    /// Downscale wider outputs to this width. `None` keeps native width.
    pub max_output_width: Option<u32>,

    /// Directory for intermediate and final artifacts.
    pub output_dir: PathBuf,

    /// Chromium executable; auto-detected when unset.
    pub chromium_path: Option<PathBuf>,

    /// Script URL (or `file://` path) of the Mermaid bundle loaded in the
    /// rendering sandbox.
    pub mermaid_script_url: String,

    /// `ffmpeg` executable.
    pub ffmpeg_path: PathBuf,

    /// Log filter level: trace, debug, info, warn or error.
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            groq_api_key: None,
            openrouter_api_key: None,
            model: "groq/llama-3.3-70b-versatile".to_string(),
            request_timeout_secs: 30,
            max_repair_attempts: 3,
            default_animation_duration: 5.0,
            default_animation_style: AnimationStyle::Default,
            default_fps: 30,
            viewport_width: 4000,
            viewport_height: 3000,
            capture_padding: 20,
            capture_buffer_secs: 2.0,
            trim_start_secs: 1.0,
            max_output_width: None,
            output_dir: PathBuf::from("./output"),
            chromium_path: None,
            mermaid_script_url: "https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.min.js"
                .to_string(),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Manifest applied to diagram-source input and offered to the
    /// generator as a fallback.
    pub fn default_manifest(&self) -> AnimationManifest {
        AnimationManifest {
            duration: self.default_animation_duration,
            style: self.default_animation_style,
        }
    }
}
