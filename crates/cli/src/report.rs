//! Terminal rendering of pipeline progress and the final outcome.

use colored::Colorize;
use mg_protocol::ipc::PipelineEvent;
use mg_protocol::run_models::{FailureKind, RunState, TerminalOutcome};
use std::process::ExitCode;
use tokio::sync::mpsc::Receiver;

/// Prints one line per stage event to stderr until the channel closes.
pub async fn print_progress(mut rx: Receiver<PipelineEvent>) {
    while let Some(event) = rx.recv().await {
        if let Some(line) = progress_line(&event) {
            eprintln!("{line}");
        }
    }
}

fn progress_line(event: &PipelineEvent) -> Option<String> {
    match event {
        PipelineEvent::RunStarted { run_id, .. } => {
            Some(format!("{} run {run_id}", "::".bold()))
        }
        PipelineEvent::StageEntered { stage, attempt, .. } if *attempt > 1 => Some(format!(
            "  {} {stage} (attempt {attempt})",
            "->".cyan()
        )),
        PipelineEvent::StageEntered { stage, .. } => Some(format!("  {} {stage}", "->".cyan())),
        PipelineEvent::StageExited { stage, note, .. } => Some(match note {
            Some(note) => format!("  {} {stage} {}", "ok".green(), note.dimmed()),
            None => format!("  {} {stage}", "ok".green()),
        }),
        PipelineEvent::StageFailed {
            stage,
            message,
            recoverable: true,
            ..
        } => Some(format!("  {} {stage}: {message}", "retry".yellow())),
        PipelineEvent::StageFailed { stage, kind, .. } => {
            Some(format!("  {} {stage} ({kind})", "fail".red()))
        }
        PipelineEvent::RunFinished { .. } => None,
    }
}

/// Reports the terminal outcome and maps it to the process exit code.
///
/// The output path goes to stdout so scripts can capture it; everything
/// else goes to stderr.
pub fn print_outcome(state: &RunState, print_path: bool) -> ExitCode {
    match &state.terminal_outcome {
        Some(TerminalOutcome::Succeeded { output_path }) => {
            eprintln!("{} {}", "done:".green().bold(), output_path.display());
            if print_path {
                println!("{}", output_path.display());
            }
            ExitCode::SUCCESS
        }
        Some(TerminalOutcome::Failed {
            stage,
            kind,
            reason,
            unresolved_findings,
        }) => {
            eprintln!(
                "{} {kind} during {stage}: {reason}",
                "error:".red().bold()
            );
            if *kind == FailureKind::RepairExhausted {
                eprintln!("unresolved findings:");
                for finding in unresolved_findings {
                    eprintln!("  {finding}");
                }
            }
            ExitCode::FAILURE
        }
        None => {
            eprintln!("{} run ended without an outcome", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
