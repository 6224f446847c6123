//! `mermaid-gif`: turn a diagram description or diagram source into an
//! animated GIF.

mod report;

use clap::{ArgGroup, Parser};
use color_eyre::eyre::WrapErr;
use colored::Colorize;
use mg_core::config::error::ConfigError;
use mg_core::config::loader::load_settings_with;
use mg_core::engine::{PipelineEngine, PipelineError, Services};
use mg_protocol::config_models::Settings;
use mg_protocol::run_models::{AnimationStyle, InputKind};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Exit status for configuration and wiring errors.
const EXIT_CONFIG: u8 = 2;

/// Exit status after Ctrl-C (128 + SIGINT).
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(name = "mermaid-gif", version, about)]
#[command(group(ArgGroup::new("source").required(true).args(["text", "input_file"])))]
struct Cli {
    /// Natural-language description or inline diagram source.
    text: Option<String>,

    /// Read diagram source from a file (skips generation).
    #[arg(short, long, value_name = "PATH")]
    input_file: Option<PathBuf>,

    /// Output GIF path. Defaults to a file in the configured output directory.
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Animation cycle length in seconds.
    #[arg(long)]
    duration: Option<f64>,

    /// Motion preset: default, minimal or presentation.
    #[arg(long)]
    style: Option<AnimationStyle>,

    /// Config file used instead of `.mermaid-gif/config.toml`.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,

    /// Print the final run state as JSON on stdout.
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn apply_overrides(&self, mut settings: Settings) -> Settings {
        if let Some(duration) = self.duration {
            settings.default_animation_duration = duration;
        }
        if let Some(style) = self.style {
            settings.default_animation_style = style;
        }
        if self.verbose {
            settings.log_level = "debug".to_string();
        }
        settings
    }
}

fn load_settings(cli: &Cli, root: &Path) -> Result<Settings, ConfigError> {
    load_settings_with(
        root,
        cli.config.as_deref(),
        |name| std::env::var(name).ok(),
        |settings| cli.apply_overrides(settings),
    )
}

/// Runs `run` to completion unless `interrupt` resolves first, in which
/// case the run future is dropped and `None` is returned.
async fn until_interrupted<R, I>(run: R, interrupt: I) -> Option<R::Output>
where
    R: Future,
    I: Future,
{
    tokio::select! {
        output = run => Some(output),
        _ = interrupt => None,
    }
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn config_failure(message: impl std::fmt::Display) -> ExitCode {
    eprintln!("{} {message}", "configuration error:".red().bold());
    ExitCode::from(EXIT_CONFIG)
}

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let root = std::env::current_dir().wrap_err("cannot determine working directory")?;
    let settings = match load_settings(&cli, &root) {
        Ok(settings) => settings,
        Err(err) => return Ok(config_failure(err)),
    };
    init_tracing(&settings.log_level, cli.log_json);

    let (raw_input, kind_hint) = match &cli.input_file {
        Some(path) => {
            let source = tokio::fs::read_to_string(path)
                .await
                .wrap_err_with(|| format!("cannot read input file {}", path.display()))?;
            (source, Some(InputKind::DiagramSource))
        }
        None => (cli.text.clone().unwrap_or_default(), None),
    };

    let services = match Services::from_settings(&settings) {
        Ok(services) => services,
        Err(PipelineError::Configuration(reason)) => return Ok(config_failure(reason)),
        Err(err) => return Err(err.into()),
    };

    let (tx, rx) = mpsc::channel(64);
    let printer = tokio::spawn(report::print_progress(rx));
    let engine = PipelineEngine::new(Arc::new(settings), services).with_events(tx);

    let finished = until_interrupted(
        engine.run(raw_input, kind_hint, cli.output.as_deref()),
        tokio::signal::ctrl_c(),
    )
    .await;
    // Dropping the engine closes the event channel.
    drop(engine);
    printer.await?;

    let Some(state) = finished else {
        eprintln!("{}", "interrupted".yellow().bold());
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    }
    Ok(report::print_outcome(&state, !cli.json))
}
