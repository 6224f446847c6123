//! Stage bodies.
//!
//! Each stage has the shape `(RunState) -> Result<RunState, PipelineError>`
//! and returns a note for the audit trail alongside the new state.

use super::error::PipelineError;
use super::PipelineEngine;
use crate::motion::inject_motion;
use crate::state::run::{
    put_artifact, record_validation, require_artifact, set_animation_spec, set_diagram_source,
    set_input_kind, StateError,
};
use crate::transcode::EncodeJob;
use crate::validator::{self, classify_input};
use mg_protocol::run_models::{
    AnimationManifest, ArtifactKey, InputKind, RunState, ValidationStatus,
};
use std::path::{Path, PathBuf};
use tracing::debug;

pub(super) type StageOutput = Result<(RunState, Option<String>), PipelineError>;

fn manifest_of(state: &RunState) -> Result<AnimationManifest, StateError> {
    state
        .animation_spec
        .ok_or(StateError::Missing("animation manifest"))
}

impl PipelineEngine {
    /// Classifies the input. Diagram source is installed as the candidate
    /// together with the default manifest; generation is skipped.
    pub(super) fn route(&self, state: RunState) -> StageOutput {
        let kind = state
            .kind_hint
            .unwrap_or_else(|| classify_input(&state.raw_input));
        let mut state = set_input_kind(state, kind)?;

        if kind == InputKind::DiagramSource {
            let source = state.raw_input.trim().to_string();
            state = set_diagram_source(state, source);
            state = set_animation_spec(state, self.settings.default_manifest())?;
        }

        let note = match kind {
            InputKind::NaturalLanguage => "natural language",
            InputKind::DiagramSource => "diagram source",
        };
        Ok((state, Some(note.to_string())))
    }

    pub(super) async fn generate(&self, state: RunState) -> StageOutput {
        let generated = self
            .generator
            .generate(&state.raw_input, self.settings.default_manifest())
            .await
            .map_err(PipelineError::Generation)?;

        let note = format!(
            "{:.1}s {} loop",
            generated.manifest.duration, generated.manifest.style
        );
        let state = set_diagram_source(state, generated.source);
        let state = set_animation_spec(state, generated.manifest)?;
        Ok((state, Some(note)))
    }

    pub(super) fn validate(&self, state: RunState) -> StageOutput {
        let source = state
            .diagram_source
            .as_deref()
            .ok_or(StateError::Missing("diagram source"))?;
        let findings = validator::validate(source);

        let note = if findings.is_empty() {
            "clean".to_string()
        } else {
            format!("{} finding(s)", findings.len())
        };
        debug!(findings = findings.len(), "validation pass");
        Ok((record_validation(state, findings), Some(note)))
    }

    pub(super) async fn repair(&self, state: RunState) -> StageOutput {
        let state = self.repairs.repair(state).await?;
        let note = format!(
            "attempt {}/{}",
            state.repair_attempts,
            self.repairs.max_attempts()
        );
        Ok((state, Some(note)))
    }

    pub(super) async fn render(&self, state: RunState) -> StageOutput {
        if state.validation != ValidationStatus::Clean {
            return Err(PipelineError::Validation(state.validation_errors));
        }
        let source = state
            .diagram_source
            .as_deref()
            .ok_or(StateError::Missing("diagram source"))?;

        let document = self.renderer.render(source).await?;
        let note = format!("{} bytes", document.len());
        let state = put_artifact(state, ArtifactKey::VectorDocument, document)?;
        Ok((state, Some(note)))
    }

    /// Injects motion into the rendered document. A retry reuses the same
    /// document; nothing upstream is re-run.
    pub(super) fn animate(&self, state: RunState) -> StageOutput {
        let manifest = manifest_of(&state)?;
        let document = require_artifact(&state, ArtifactKey::VectorDocument)?;
        let annotated = inject_motion(document, &manifest)?;

        let note = format!("{} connector(s)", annotated.connectors.len());
        let state = put_artifact(state, ArtifactKey::AnnotatedDocument, annotated.markup)?;
        Ok((state, Some(note)))
    }

    pub(super) async fn capture(&self, state: RunState) -> StageOutput {
        let manifest = manifest_of(&state)?;
        let document = require_artifact(&state, ArtifactKey::AnnotatedDocument)?;
        let run_dir = self.settings.output_dir.join(state.id.to_string());

        let captured = self
            .capture
            .capture(document, manifest.duration, &run_dir)
            .await?;

        let note = format!("{} frame", captured.size);
        let state = put_artifact(
            state,
            ArtifactKey::VideoPath,
            captured.video.display().to_string(),
        )?;
        Ok((state, Some(note)))
    }

    pub(super) async fn transcode(&self, state: RunState, output: &Path) -> StageOutput {
        let manifest = manifest_of(&state)?;
        let video = require_artifact(&state, ArtifactKey::VideoPath)?;

        let job = EncodeJob {
            video: PathBuf::from(video),
            output: output.to_path_buf(),
            trim_start: self.settings.trim_start_secs,
            duration: manifest.duration,
        };
        let encoded = self.encoder.encode(&job).await?;

        let state = put_artifact(
            state,
            ArtifactKey::OutputPath,
            encoded.display().to_string(),
        )?;
        Ok((state, None))
    }
}
