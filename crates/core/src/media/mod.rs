//! Media tooling shared by the capture and transcode stages.

pub mod ffmpeg;

pub use ffmpeg::{ensure_parent_dir, is_non_empty_file, locate_ffmpeg, run_ffmpeg, FfmpegError};
