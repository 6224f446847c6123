//! Run state models.
//!
//! This module defines the record threaded through one pipeline invocation,
//! together with the enums that describe where a run is and how it ended.
//! Transitions over these types live in `mg-core::state`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use crate::finding_models::Finding;

/// What the raw input is.
///
/// Set once by the router stage and never changed afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Free text describing the diagram; goes through generation first.
    NaturalLanguage,
    /// Already diagram source; generation is skipped.
    DiagramSource,
}

/// Motion preset applied by the motion injector.
///
/// Any unrecognized name (the generation model is free to invent one)
/// falls back to [`AnimationStyle::Default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationStyle {
    /// Flowing edges plus a gentle node pulse.
    #[default]
    Default,
    /// Flowing edges only.
    Minimal,
    /// Flowing edges plus a pronounced node pulse.
    Presentation,
}

impl AnimationStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            AnimationStyle::Default => "default",
            AnimationStyle::Minimal => "minimal",
            AnimationStyle::Presentation => "presentation",
        }
    }
}

impl FromStr for AnimationStyle {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => AnimationStyle::Minimal,
            "presentation" => AnimationStyle::Presentation,
            _ => AnimationStyle::Default,
        })
    }
}

impl fmt::Display for AnimationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AnimationStyle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse::<AnimationStyle>().unwrap_or_default())
    }
}

impl Serialize for AnimationStyle {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Normalized animation manifest: cycle length plus motion preset.
///
/// Generation responses use `preset` for the style key; both spellings are
/// accepted.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct AnimationManifest {
    /// Length of one animation cycle in seconds. Also the length of the
    /// final loop.
    pub duration: f64,

    #[serde(default, alias = "preset")]
    pub style: AnimationStyle,
}

/// Named stage outputs stored in [`RunState::artifacts`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKey {
    /// SVG markup produced by the render stage.
    VectorDocument,
    /// SVG markup with motion rules, produced by the animating stage.
    AnnotatedDocument,
    /// Path of the recorded video, produced by the capture stage.
    VideoPath,
    /// Path of the final GIF, produced by the transcode stage.
    OutputPath,
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ArtifactKey::VectorDocument => "vector_document",
            ArtifactKey::AnnotatedDocument => "annotated_document",
            ArtifactKey::VideoPath => "video_path",
            ArtifactKey::OutputPath => "output_path",
        };
        f.write_str(label)
    }
}

/// Named states of the orchestrator's state machine.
///
/// The graph is:
///
/// ```text
/// routing -> (generating) -> validating -> [repairing -> validating]*
///   -> rendering -> animating -> capturing -> transcoding -> succeeded
/// ```
///
/// with `failed` reachable from every non-terminal stage.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Routing,
    Generating,
    Validating,
    Repairing,
    Rendering,
    Animating,
    Capturing,
    Transcoding,
    Succeeded,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Succeeded | Stage::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Routing => "routing",
            Stage::Generating => "generating",
            Stage::Validating => "validating",
            Stage::Repairing => "repairing",
            Stage::Rendering => "rendering",
            Stage::Animating => "animating",
            Stage::Capturing => "capturing",
            Stage::Transcoding => "transcoding",
            Stage::Succeeded => "succeeded",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the current `diagram_source` has been validated.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// Not validated since it was last written.
    #[default]
    Pending,
    /// Most recent validation returned no findings.
    Clean,
    /// Most recent validation returned findings.
    Invalid,
}

/// Lifecycle marker of one entry in the audit trail.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Entered,
    Exited,
    Failed,
}

/// One entry in the run's audit trail.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StageRecord {
    pub stage: Stage,
    pub status: StageStatus,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Failure classes reported in a terminal outcome.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    GenerationError,
    RepairExhausted,
    RepairError,
    RenderError,
    AnimationMissing,
    CaptureError,
    EncodeError,
    ConfigurationError,
    PipelineFailure,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::GenerationError => "GenerationError",
            FailureKind::RepairExhausted => "RepairExhausted",
            FailureKind::RepairError => "RepairError",
            FailureKind::RenderError => "RenderError",
            FailureKind::AnimationMissing => "AnimationMissing",
            FailureKind::CaptureError => "CaptureError",
            FailureKind::EncodeError => "EncodeError",
            FailureKind::ConfigurationError => "ConfigurationError",
            FailureKind::PipelineFailure => "PipelineFailure",
        };
        f.write_str(label)
    }
}

/// How a run ended. Once set on a [`RunState`] it never changes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TerminalOutcome {
    Succeeded {
        output_path: PathBuf,
    },
    Failed {
        /// Stage that raised the failure.
        stage: Stage,
        kind: FailureKind,
        reason: String,
        /// Findings still open when the repair budget ran out.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        unresolved_findings: Vec<Finding>,
    },
}

impl TerminalOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TerminalOutcome::Succeeded { .. })
    }
}

/// The record threaded through one pipeline invocation.
///
/// Stages never edit a run state in place: each consumes the previous value
/// and returns a new one carrying its deltas. Write-once fields
/// (`input_kind`, `animation_spec`, each artifact key, `terminal_outcome`)
/// are guarded by the transition functions in `mg-core::state::run`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunState {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,

    /// Original user input. Never modified.
    pub raw_input: String,

    /// Caller-supplied classification, e.g. input read from a diagram file.
    #[serde(default)]
    pub kind_hint: Option<InputKind>,

    /// Classification written by the router stage.
    #[serde(default)]
    pub input_kind: Option<InputKind>,

    /// Current candidate diagram source.
    #[serde(default)]
    pub diagram_source: Option<String>,

    #[serde(default)]
    pub validation: ValidationStatus,

    /// Findings from the most recent validation of `diagram_source`.
    #[serde(default)]
    pub validation_errors: Vec<Finding>,

    /// Every non-empty findings list, oldest first.
    #[serde(default)]
    pub finding_history: Vec<Vec<Finding>>,

    pub repair_attempts: u32,
    pub animation_attempts: u32,

    #[serde(default)]
    pub animation_spec: Option<AnimationManifest>,

    #[serde(default)]
    pub artifacts: BTreeMap<ArtifactKey, String>,

    /// Audit trail of stage entry/exit/failure.
    #[serde(default)]
    pub history: Vec<StageRecord>,

    #[serde(default)]
    pub terminal_outcome: Option<TerminalOutcome>,
}

impl RunState {
    pub fn artifact(&self, key: ArtifactKey) -> Option<&str> {
        self.artifacts.get(&key).map(String::as_str)
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal_outcome.is_some()
    }

    /// Number of times `stage` was entered during this run.
    pub fn entries_of(&self, stage: Stage) -> usize {
        self.history
            .iter()
            .filter(|r| r.stage == stage && r.status == StageStatus::Entered)
            .count()
    }
}
