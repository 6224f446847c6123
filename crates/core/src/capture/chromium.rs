//! Chromium recording surface.
//!
//! Recording takes PNG screenshots over the DevTools protocol at the target
//! frame rate and stamps each with its offset from the start of the
//! window. The frames are then stitched into a constant-frame-rate H.264
//! MP4 by ffmpeg's concat demuxer, each frame held for the time until the
//! next one was taken, so slow screenshots do not speed up the motion.

use super::{BoundingBox, CaptureError, Dimensions, RecordingRequest, RecordingSurface};
use crate::media;
use crate::render::assets;
use crate::render::chromium::{evaluate, set_content, BrowserError, ChromiumOptions, ChromiumSession};
use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::page::Page;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

const FRAME_LIST_NAME: &str = "frames.ffconcat";

/// Resolves to `{ width, height }` of the first SVG, or `null`.
const BOUNDING_BOX_SCRIPT: &str = r#"(() => {
  const svg = document.querySelector('svg');
  if (!svg) return null;
  const rect = svg.getBoundingClientRect();
  return { width: rect.width, height: rect.height };
})()"#;

impl From<BrowserError> for CaptureError {
    fn from(err: BrowserError) -> Self {
        CaptureError::Surface(err.to_string())
    }
}

/// A frame written to disk and its offset into the recording.
#[derive(Debug, Clone, PartialEq)]
struct Frame {
    file_name: String,
    at: f64,
}

#[derive(Debug, Clone)]
pub struct ChromiumSurface {
    options: ChromiumOptions,
    ffmpeg: PathBuf,
}

impl ChromiumSurface {
    pub fn new(options: ChromiumOptions, ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            options,
            ffmpeg: ffmpeg.into(),
        }
    }

    async fn measure_in(
        session: &ChromiumSession,
        document: &str,
        viewport: Dimensions,
    ) -> Result<BoundingBox, CaptureError> {
        let page = session.open_page(viewport.width, viewport.height).await?;
        set_content(&page, &assets::capture_host_html(document, 0)).await?;

        let bbox: Option<BoundingBox> = evaluate(&page, BOUNDING_BOX_SCRIPT.to_string()).await?;
        bbox.ok_or_else(|| CaptureError::Surface("document has no <svg> element".to_string()))
    }

    async fn record_in(
        session: &ChromiumSession,
        request: &RecordingRequest,
        frames_dir: &Path,
    ) -> Result<Vec<Frame>, CaptureError> {
        let page = session
            .open_page(request.size.width, request.size.height)
            .await?;
        set_content(
            &page,
            &assets::capture_host_html(&request.document, request.padding),
        )
        .await?;

        let window = Duration::from_secs_f64(request.seconds);
        let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / f64::from(request.fps)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let started = Instant::now();
        let mut frames = Vec::new();
        loop {
            ticker.tick().await;
            let at = started.elapsed();
            if at >= window {
                break;
            }

            let png = screenshot(&page).await?;
            let file_name = format!("frame_{:05}.png", frames.len());
            tokio::fs::write(frames_dir.join(&file_name), png).await?;
            frames.push(Frame {
                file_name,
                at: at.as_secs_f64(),
            });
        }

        debug!(frames = frames.len(), seconds = request.seconds, "frames captured");
        Ok(frames)
    }
}

async fn screenshot(page: &Page) -> Result<Vec<u8>, CaptureError> {
    let params = CaptureScreenshotParams::builder()
        .format(CaptureScreenshotFormat::Png)
        .build();

    let shot = page
        .execute(params)
        .await
        .map_err(|e| CaptureError::Surface(e.to_string()))?;

    base64::engine::general_purpose::STANDARD
        .decode(&shot.data)
        .map_err(|e| CaptureError::Surface(e.to_string()))
}

/// Seconds each frame stays on screen. The last frame runs to the end of
/// the window.
fn frame_durations(frames: &[Frame], total: f64, min: f64) -> Vec<f64> {
    frames
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            let end = frames.get(i + 1).map_or(total, |next| next.at);
            (end - frame.at).max(min)
        })
        .collect()
}

/// Builds an ffconcat list. The last file is repeated because the concat
/// demuxer ignores the duration of the final entry.
fn concat_list(frames: &[Frame], total: f64, min: f64) -> String {
    let mut list = String::from("ffconcat version 1.0\n");
    for (frame, duration) in frames.iter().zip(frame_durations(frames, total, min)) {
        let _ = writeln!(list, "file '{}'", frame.file_name);
        let _ = writeln!(list, "duration {duration:.6}");
    }
    if let Some(last) = frames.last() {
        let _ = writeln!(list, "file '{}'", last.file_name);
    }
    list
}

fn encode_args(list: &Path, fps: u32, output: &Path) -> Vec<String> {
    vec![
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list.display().to_string(),
        "-vf".to_string(),
        format!("fps={fps},format=yuv420p"),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        output.display().to_string(),
    ]
}

#[async_trait]
impl RecordingSurface for ChromiumSurface {
    async fn measure(
        &self,
        document: &str,
        viewport: Dimensions,
    ) -> Result<BoundingBox, CaptureError> {
        let session = ChromiumSession::launch(&self.options).await?;
        let result = Self::measure_in(&session, document, viewport).await;
        session.close().await;
        result
    }

    async fn record(&self, request: &RecordingRequest) -> Result<PathBuf, CaptureError> {
        if request.fps == 0 || !request.seconds.is_finite() || request.seconds <= 0.0 {
            return Err(CaptureError::InvalidRequest(format!(
                "cannot record {}s at {} fps",
                request.seconds, request.fps
            )));
        }
        let program = media::locate_ffmpeg(&self.ffmpeg)?;

        let frames_dir = tempfile::Builder::new()
            .prefix("mermaid-gif-frames")
            .tempdir()?;

        let session = ChromiumSession::launch(&self.options).await?;
        let frames = Self::record_in(&session, request, frames_dir.path()).await;
        session.close().await;
        let frames = frames?;

        if frames.is_empty() {
            return Err(CaptureError::Surface("no frames were captured".to_string()));
        }
        if frames.len() < (request.seconds * f64::from(request.fps) / 2.0) as usize {
            warn!(
                frames = frames.len(),
                fps = request.fps,
                "screenshots fell behind the target frame rate"
            );
        }

        let list_path = frames_dir.path().join(FRAME_LIST_NAME);
        let min = 1.0 / f64::from(request.fps);
        tokio::fs::write(&list_path, concat_list(&frames, request.seconds, min)).await?;

        media::ensure_parent_dir(&request.output)?;
        media::run_ffmpeg(&program, encode_args(&list_path, request.fps, &request.output))
            .await?;

        Ok(request.output.clone())
    }
}
