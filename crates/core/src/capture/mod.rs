//! Two-phase video capture of an animated document.
//!
//! The coordinator first loads the document on an oversized surface and
//! measures the diagram's bounding box, then records it on a fresh surface
//! sized to the content plus padding. Frame dimensions are rounded up to
//! even numbers because the H.264 4:2:0 encoder rejects odd sizes.
//!
//! ```text
//! measuring -> sizing -> recording -> done
//! ```

#[cfg(feature = "browser")]
pub mod chromium;

use crate::media::{self, FfmpegError};
use async_trait::async_trait;
use mg_protocol::config_models::Settings;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[cfg(feature = "browser")]
pub use chromium::ChromiumSurface;

/// File name of the recording inside the capture directory.
pub const RECORDING_FILE_NAME: &str = "recording.mp4";

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("recording surface failed: {0}")]
    Surface(String),

    #[error("document has no measurable content ({width}x{height})")]
    EmptyContent { width: f64, height: f64 },

    #[error("invalid capture request: {0}")]
    InvalidRequest(String),

    #[error("failed to write capture frames: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Ffmpeg(#[from] FfmpegError),

    #[error("recording produced no video at '{0}'")]
    EmptyVideo(PathBuf),
}

/// Raw bounding box reported by a surface, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoundingBox {
    pub width: f64,
    pub height: f64,
}

/// Whole-pixel width and height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Measuring,
    Sizing,
    Recording,
    Done,
}

impl fmt::Display for CapturePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CapturePhase::Measuring => "measuring",
            CapturePhase::Sizing => "sizing",
            CapturePhase::Recording => "recording",
            CapturePhase::Done => "done",
        };
        f.write_str(label)
    }
}

pub fn round_up_even(n: u32) -> u32 {
    n + (n % 2)
}

/// Converts a raw bounding box to whole pixels, rounding up.
pub fn measured_dimensions(bbox: BoundingBox) -> Result<Dimensions, CaptureError> {
    let valid = |v: f64| v.is_finite() && v > 0.0 && v <= f64::from(u32::MAX);
    if !valid(bbox.width) || !valid(bbox.height) {
        return Err(CaptureError::EmptyContent {
            width: bbox.width,
            height: bbox.height,
        });
    }
    Ok(Dimensions::new(
        bbox.width.ceil() as u32,
        bbox.height.ceil() as u32,
    ))
}

/// `roundUpEven(W + 2P) x roundUpEven(H + 2P)`.
pub fn frame_size(content: Dimensions, padding: u32) -> Dimensions {
    Dimensions::new(
        round_up_even(content.width.saturating_add(padding.saturating_mul(2))),
        round_up_even(content.height.saturating_add(padding.saturating_mul(2))),
    )
}

/// Everything a surface needs to record one video.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingRequest {
    pub document: String,
    pub size: Dimensions,
    /// Padding on each side of the centered document.
    pub padding: u32,
    pub seconds: f64,
    pub fps: u32,
    pub output: PathBuf,
}

/// A surface that can show a document, measure it and record it.
#[async_trait]
pub trait RecordingSurface: Send + Sync {
    /// Loads `document` on a `viewport`-sized surface and reports the
    /// diagram's bounding box.
    async fn measure(&self, document: &str, viewport: Dimensions)
        -> Result<BoundingBox, CaptureError>;

    /// Records the request to `request.output` and returns that path.
    async fn record(&self, request: &RecordingRequest) -> Result<PathBuf, CaptureError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOptions {
    /// Oversized surface used for measuring.
    pub viewport: Dimensions,
    pub padding: u32,
    /// Extra seconds recorded on top of the animation duration.
    pub buffer_secs: f64,
    pub fps: u32,
}

impl CaptureOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            viewport: Dimensions::new(settings.viewport_width, settings.viewport_height),
            padding: settings.capture_padding,
            buffer_secs: settings.capture_buffer_secs,
            fps: settings.default_fps,
        }
    }
}

/// Result of a capture.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOutput {
    pub video: PathBuf,
    pub size: Dimensions,
}

#[derive(Clone)]
pub struct CaptureCoordinator {
    surface: Arc<dyn RecordingSurface>,
    options: CaptureOptions,
}

impl CaptureCoordinator {
    pub fn new(surface: Arc<dyn RecordingSurface>, options: CaptureOptions) -> Self {
        Self { surface, options }
    }

    pub fn options(&self) -> &CaptureOptions {
        &self.options
    }

    /// Measures `document`, sizes the frame and records `duration` plus the
    /// buffer into `output_dir`.
    pub async fn capture(
        &self,
        document: &str,
        duration: f64,
        output_dir: &Path,
    ) -> Result<CaptureOutput, CaptureError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(CaptureError::InvalidRequest(format!(
                "duration must be positive, got {duration}"
            )));
        }

        debug!(phase = %CapturePhase::Measuring, viewport = %self.options.viewport);
        let bbox = self.surface.measure(document, self.options.viewport).await?;
        let content = measured_dimensions(bbox)?;

        let size = frame_size(content, self.options.padding);
        debug!(phase = %CapturePhase::Sizing, content = %content, frame = %size);

        std::fs::create_dir_all(output_dir)?;
        let request = RecordingRequest {
            document: document.to_string(),
            size,
            padding: self.options.padding,
            seconds: duration + self.options.buffer_secs,
            fps: self.options.fps,
            output: output_dir.join(RECORDING_FILE_NAME),
        };
        debug!(
            phase = %CapturePhase::Recording,
            seconds = request.seconds,
            fps = request.fps
        );
        let video = self.surface.record(&request).await?;

        if !media::is_non_empty_file(&video) {
            return Err(CaptureError::EmptyVideo(video));
        }

        info!(phase = %CapturePhase::Done, video = %video.display(), frame = %size, "capture finished");
        Ok(CaptureOutput { video, size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FakeSurface {
        bbox: BoundingBox,
        requests: Mutex<Vec<RecordingRequest>>,
        write_video: bool,
    }

    impl FakeSurface {
        fn new(width: f64, height: f64) -> Self {
            Self {
                bbox: BoundingBox { width, height },
                requests: Mutex::new(Vec::new()),
                write_video: true,
            }
        }
    }

    #[async_trait]
    impl RecordingSurface for FakeSurface {
        async fn measure(
            &self,
            _document: &str,
            _viewport: Dimensions,
        ) -> Result<BoundingBox, CaptureError> {
            Ok(self.bbox)
        }

        async fn record(&self, request: &RecordingRequest) -> Result<PathBuf, CaptureError> {
            self.requests.lock().unwrap().push(request.clone());
            if self.write_video {
                std::fs::write(&request.output, b"fake mp4")?;
            }
            Ok(request.output.clone())
        }
    }

    fn options() -> CaptureOptions {
        CaptureOptions {
            viewport: Dimensions::new(4000, 3000),
            padding: 20,
            buffer_secs: 2.0,
            fps: 30,
        }
    }

    #[test]
    fn test_round_up_even() {
        assert_eq!(round_up_even(0), 0);
        assert_eq!(round_up_even(7), 8);
        assert_eq!(round_up_even(8), 8);
    }

    #[test]
    fn test_frame_size_pads_each_side_and_rounds_up() {
        assert_eq!(
            frame_size(Dimensions::new(301, 150), 20),
            Dimensions::new(342, 190)
        );
        assert_eq!(
            frame_size(Dimensions::new(1, 1), 0),
            Dimensions::new(2, 2)
        );
    }

    #[test]
    fn test_measured_dimensions_ceil_fractional_pixels() {
        let dims = measured_dimensions(BoundingBox {
            width: 300.2,
            height: 149.0,
        })
        .unwrap();
        assert_eq!(dims, Dimensions::new(301, 149));
    }

    #[test]
    fn test_non_positive_box_is_capture_error() {
        for (w, h) in [(0.0, 10.0), (10.0, -1.0), (f64::NAN, 5.0)] {
            let result = measured_dimensions(BoundingBox {
                width: w,
                height: h,
            });
            assert!(matches!(result, Err(CaptureError::EmptyContent { .. })));
        }
    }

    #[tokio::test]
    async fn test_capture_sizes_frame_and_records_duration_plus_buffer() {
        let dir = TempDir::new().unwrap();
        let surface = Arc::new(FakeSurface::new(300.4, 151.0));
        let coordinator = CaptureCoordinator::new(surface.clone(), options());

        let output = coordinator
            .capture("<svg></svg>", 4.0, dir.path())
            .await
            .unwrap();

        assert_eq!(output.size, Dimensions::new(342, 192));
        assert_eq!(output.video, dir.path().join(RECORDING_FILE_NAME));

        let requests = surface.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!((requests[0].seconds - 6.0).abs() < 1e-9);
        assert_eq!(requests[0].padding, 20);
        assert_eq!(requests[0].fps, 30);
    }

    #[tokio::test]
    async fn test_empty_content_never_records() {
        let dir = TempDir::new().unwrap();
        let surface = Arc::new(FakeSurface::new(0.0, 0.0));
        let coordinator = CaptureCoordinator::new(surface.clone(), options());

        let result = coordinator.capture("<svg></svg>", 4.0, dir.path()).await;
        assert!(matches!(result, Err(CaptureError::EmptyContent { .. })));
        assert!(surface.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_video_is_capture_error() {
        let dir = TempDir::new().unwrap();
        let surface = Arc::new(FakeSurface {
            write_video: false,
            ..FakeSurface::new(100.0, 100.0)
        });
        let coordinator = CaptureCoordinator::new(surface, options());

        let result = coordinator.capture("<svg></svg>", 4.0, dir.path()).await;
        assert!(matches!(result, Err(CaptureError::EmptyVideo(_))));
    }

    #[tokio::test]
    async fn test_invalid_duration_is_rejected() {
        let dir = TempDir::new().unwrap();
        let coordinator =
            CaptureCoordinator::new(Arc::new(FakeSurface::new(10.0, 10.0)), options());
        let result = coordinator.capture("<svg></svg>", 0.0, dir.path()).await;
        assert!(matches!(result, Err(CaptureError::InvalidRequest(_))));
    }
}
