// crates/mcp-conformance-cli/src/main.rs
// ============================================================================
// Module: MCP Conformance CLI Entry Point
// Description: Command dispatcher for conformance runs and offline checks.
// Purpose: Run scenarios, validate manifests, and check configuration.
// Dependencies: clap, mcp-conformance-config, mcp-conformance-harness, tokio
// ============================================================================

//! ## Overview
//! `mcp-conformance run` starts the planned backends, runs the enabled
//! scenarios, writes the report into the run root, and exits non-zero when
//! any scenario fails or a backend cannot start. `validate` checks manifest
//! structure without starting anything. `config check` loads and validates
//! the effective configuration and prints it as TOML.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use mcp_conformance_config::ConformanceConfig;
use mcp_conformance_config::ScenarioId;
use mcp_conformance_harness::ConformanceReport;
use mcp_conformance_harness::NoopEventSink;
use mcp_conformance_harness::RunArtifacts;
use mcp_conformance_harness::run_conformance;
use mcp_conformance_harness::sink_from_config;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Definitions
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "mcp-conformance", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run conformance scenarios against the configured backends.
    Run(RunCommand),
    /// Check manifest structure without starting any backend.
    Validate(ValidateCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `run`.
#[derive(Args, Debug, Default)]
struct RunCommand {
    /// Config file (defaults to `MCP_CONFORMANCE_CONFIG` or `mcp-conformance.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Manifest under test (overrides `[manifest].path`).
    #[arg(long, value_name = "PATH")]
    manifest: Option<PathBuf>,
    /// Inference model (overrides `[inference].model` and `OLLAMA_MODEL`).
    #[arg(long, value_name = "MODEL")]
    model: Option<String>,
    /// Run only these scenarios (repeatable or comma-separated).
    #[arg(long = "only", value_name = "SCENARIO", value_delimiter = ',')]
    only: Vec<ScenarioId>,
    /// Run artifact directory (overrides `[artifacts].root`).
    #[arg(long, value_name = "DIR")]
    run_root: Option<PathBuf>,
    /// Attach to an inference backend that is already serving.
    #[arg(long, action = ArgAction::SetTrue)]
    reuse_running: bool,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
struct ValidateCommand {
    /// Manifest JSON file.
    #[arg(value_name = "MANIFEST")]
    manifest: PathBuf,
    /// Transport literal the manifest must declare.
    #[arg(long, value_name = "TYPE", default_value = "stdio")]
    expected_transport: String,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load, validate, and print the effective configuration.
    Check(ConfigCheckCommand),
}

/// Arguments for `config check`.
#[derive(Args, Debug)]
struct ConfigCheckCommand {
    /// Config file (defaults to `MCP_CONFORMANCE_CONFIG` or `mcp-conformance.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a printable message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(command) => command_run(command).await,
        Commands::Validate(command) => command_validate(command).await,
        Commands::Config {
            command: ConfigCommand::Check(command),
        } => command_config_check(&command),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes `run`.
async fn command_run(command: RunCommand) -> CliResult<ExitCode> {
    let mut config = ConformanceConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    apply_run_overrides(&mut config, &command);
    config.validate().map_err(|err| CliError::new(format!("invalid run options: {err}")))?;
    let events = sink_from_config(&config.logging)
        .map_err(|err| CliError::new(format!("failed to open log sink: {err}")))?;
    let artifacts = RunArtifacts::create(config.artifacts.root.as_deref())
        .map_err(|err| CliError::new(err.to_string()))?;
    let report = run_conformance(&config, Some(&artifacts), events)
        .await
        .map_err(|err| CliError::new(format!("conformance run aborted: {err}")))?;
    write_stdout_line(&report.to_markdown())?;
    write_stdout_line(&format!("Artifacts: {}", artifacts.root().display()))?;
    Ok(verdict_code(&report))
}

/// Executes `validate` with the structural scenarios only.
async fn command_validate(command: ValidateCommand) -> CliResult<ExitCode> {
    let config = validate_config(command);
    config.validate().map_err(|err| CliError::new(format!("invalid manifest options: {err}")))?;
    let report = run_conformance(&config, None, Arc::new(NoopEventSink))
        .await
        .map_err(|err| CliError::new(format!("manifest rejected: {err}")))?;
    write_stdout_line(&report.to_markdown())?;
    Ok(verdict_code(&report))
}

/// Executes `config check`.
fn command_config_check(command: &ConfigCheckCommand) -> CliResult<ExitCode> {
    let config = ConformanceConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let rendered = config.to_toml_string().map_err(|err| CliError::new(err.to_string()))?;
    write_stdout_line(&rendered)?;
    write_stdout_line("config ok")?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Applies `run` flags on top of file and environment values.
fn apply_run_overrides(config: &mut ConformanceConfig, command: &RunCommand) {
    if let Some(manifest) = &command.manifest {
        config.manifest.path.clone_from(manifest);
    }
    if let Some(model) = &command.model {
        config.inference.model.clone_from(model);
    }
    if !command.only.is_empty() {
        config.scenarios.enabled.clone_from(&command.only);
    }
    if let Some(root) = &command.run_root {
        config.artifacts.root = Some(root.clone());
    }
    if command.reuse_running {
        config.inference.reuse_running = true;
    }
}

/// Builds a structural-only configuration for `validate`.
fn validate_config(command: ValidateCommand) -> ConformanceConfig {
    let mut config = ConformanceConfig::default();
    config.manifest.path = command.manifest;
    config.manifest.expected_transport = command.expected_transport;
    config.scenarios.enabled =
        ScenarioId::ALL.into_iter().filter(|id| !id.needs_inference() && !id.needs_tool_server()).collect();
    config
}

/// Maps the report verdict to an exit code.
fn verdict_code(report: &ConformanceReport) -> ExitCode {
    if report.passed() { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
