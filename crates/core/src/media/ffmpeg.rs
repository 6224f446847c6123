//! Subprocess helpers for the `ffmpeg` executable.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Error, Debug)]
pub enum FfmpegError {
    #[error("ffmpeg executable '{0}' was not found (install ffmpeg or set FFMPEG_PATH)")]
    NotFound(String),

    #[error("failed to spawn ffmpeg: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("ffmpeg exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolves the configured ffmpeg program to an executable path.
///
/// Bare names are looked up on `PATH`; anything containing a separator
/// must exist as given.
pub fn locate_ffmpeg(program: &Path) -> Result<PathBuf, FfmpegError> {
    let not_found = || FfmpegError::NotFound(program.display().to_string());
    if program.components().count() > 1 {
        return program
            .is_file()
            .then(|| program.to_path_buf())
            .ok_or_else(not_found);
    }
    which::which(program).map_err(|_| not_found())
}

pub fn ensure_parent_dir(path: &Path) -> Result<(), FfmpegError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|source| FfmpegError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

/// Runs ffmpeg to completion with `-y -loglevel error` prepended.
///
/// Standard output is discarded; standard error is returned in the error
/// when the process exits unsuccessfully.
pub async fn run_ffmpeg<I, S>(program: &Path, args: I) -> Result<(), FfmpegError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(["-y", "-hide_banner", "-loglevel", "error"])
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(command = ?cmd.as_std(), "running ffmpeg");

    let output = cmd.output().await.map_err(FfmpegError::Spawn)?;
    if output.status.success() {
        return Ok(());
    }

    Err(FfmpegError::Failed {
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// True when `path` exists and holds at least one byte.
pub fn is_non_empty_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}
