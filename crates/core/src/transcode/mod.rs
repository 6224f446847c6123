//! Video to looping GIF transcoding.
//!
//! The encoder runs ffmpeg twice over the same trimmed window of the
//! recording. The first pass derives a 256-colour palette from the frames
//! that actually change (`stats_mode=diff`); the second maps the frames
//! onto it with error-diffusion dithering and writes an infinitely looping
//! GIF. Trimming skips the renderer's warm-up so the first and last frames
//! of the window line up and the loop is seamless.

use crate::media::{self, FfmpegError};
use async_trait::async_trait;
use mg_protocol::config_models::Settings;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("input video '{0}' does not exist")]
    MissingInput(PathBuf),

    #[error("invalid encode window: {0}")]
    InvalidWindow(String),

    #[error(transparent)]
    Ffmpeg(#[from] FfmpegError),

    #[error("failed to create scratch directory: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("encoder produced no output at '{0}'")]
    EmptyOutput(PathBuf),
}

/// One encode request.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeJob {
    pub video: PathBuf,
    pub output: PathBuf,
    /// Seconds skipped at the start of the recording.
    pub trim_start: f64,
    /// Length of the loop in seconds.
    pub duration: f64,
}

/// Turns a recorded video into the final animated image.
#[async_trait]
pub trait Encoder: Send + Sync {
    async fn encode(&self, job: &EncodeJob) -> Result<PathBuf, EncodeError>;
}

/// Two-pass palette encoder backed by the ffmpeg executable.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
    fps: u32,
    max_width: Option<u32>,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>, fps: u32, max_width: Option<u32>) -> Self {
        Self {
            program: program.into(),
            fps,
            max_width,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.ffmpeg_path.clone(),
            settings.default_fps,
            settings.max_output_width,
        )
    }

    /// `fps=N` plus an optional Lanczos downscale that never enlarges.
    fn base_filter(&self) -> String {
        match self.max_width {
            Some(width) => format!(
                "fps={},scale='min({width},iw)':-1:flags=lanczos",
                self.fps
            ),
            None => format!("fps={}", self.fps),
        }
    }

    fn window_args(job: &EncodeJob) -> Vec<String> {
        vec![
            "-ss".to_string(),
            format!("{:.3}", job.trim_start),
            "-t".to_string(),
            format!("{:.3}", job.duration),
            "-i".to_string(),
            job.video.display().to_string(),
        ]
    }

    /// Arguments for the palette pass.
    pub fn palette_args(&self, job: &EncodeJob, palette: &Path) -> Vec<String> {
        let mut args = Self::window_args(job);
        args.extend([
            "-vf".to_string(),
            format!(
                "{},palettegen=max_colors=256:stats_mode=diff",
                self.base_filter()
            ),
            "-frames:v".to_string(),
            "1".to_string(),
            palette.display().to_string(),
        ]);
        args
    }

    /// Arguments for the palette-apply pass.
    pub fn gif_args(&self, job: &EncodeJob, palette: &Path) -> Vec<String> {
        let mut args = Self::window_args(job);
        args.extend([
            "-i".to_string(),
            palette.display().to_string(),
            "-lavfi".to_string(),
            format!(
                "{} [x]; [x][1:v] paletteuse=dither=sierra2_4a:diff_mode=rectangle",
                self.base_filter()
            ),
            "-loop".to_string(),
            "0".to_string(),
            job.output.display().to_string(),
        ]);
        args
    }
}

fn check_job(job: &EncodeJob) -> Result<(), EncodeError> {
    if !job.duration.is_finite() || job.duration <= 0.0 {
        return Err(EncodeError::InvalidWindow(format!(
            "duration must be positive, got {}",
            job.duration
        )));
    }
    if !job.trim_start.is_finite() || job.trim_start < 0.0 {
        return Err(EncodeError::InvalidWindow(format!(
            "trim start must be non-negative, got {}",
            job.trim_start
        )));
    }
    if !job.video.is_file() {
        return Err(EncodeError::MissingInput(job.video.clone()));
    }
    Ok(())
}

#[async_trait]
impl Encoder for FfmpegTranscoder {
    async fn encode(&self, job: &EncodeJob) -> Result<PathBuf, EncodeError> {
        check_job(job)?;
        let program = media::locate_ffmpeg(&self.program)?;
        media::ensure_parent_dir(&job.output)?;

        let scratch = tempfile::Builder::new()
            .prefix("mermaid-gif-palette")
            .tempdir()
            .map_err(EncodeError::Scratch)?;
        let palette = scratch.path().join("palette.png");

        debug!(video = %job.video.display(), "generating palette");
        media::run_ffmpeg(&program, self.palette_args(job, &palette)).await?;

        debug!(output = %job.output.display(), "applying palette");
        media::run_ffmpeg(&program, self.gif_args(job, &palette)).await?;

        if !media::is_non_empty_file(&job.output) {
            return Err(EncodeError::EmptyOutput(job.output.clone()));
        }

        info!(
            output = %job.output.display(),
            fps = self.fps,
            duration = job.duration,
            "gif encoded"
        );
        Ok(job.output.clone())
    }
}
