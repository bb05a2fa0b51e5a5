// crates/twain-direct-cli/src/main.rs
// ============================================================================
// Module: TWAIN Direct CLI Entry Point
// Description: Command dispatcher for task negotiation and config workflows.
// Purpose: Negotiate task files against a configured simulated scanner.
// Dependencies: clap, twain-direct-core, twain-direct-config, serde_json, thiserror.
// ============================================================================

//! ## Overview
//! The TWAIN Direct CLI negotiates task documents read from disk against the
//! simulated scanner described by the session config. Reply documents go to
//! stdout; diagnostics and localized status messages go to stderr. Task files
//! are untrusted and read under the configured size limit.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use thiserror::Error;
use twain_direct_cli::i18n::Locale;
use twain_direct_cli::i18n::set_locale;
use twain_direct_cli::t;
use twain_direct_cli::telemetry;
use twain_direct_config::CONFIG_ENV_VAR;
use twain_direct_config::DEFAULT_CONFIG_NAME;
use twain_direct_config::TwainDirectConfig;
use twain_direct_config::config_toml_example;
use twain_direct_core::CancellationFlag;
use twain_direct_core::NodeStatusEntry;
use twain_direct_core::SimulatedDevice;
use twain_direct_core::StaticCertificateStore;
use twain_direct_core::StaticProfileCatalog;
use twain_direct_core::TaskEngine;
use twain_direct_core::TaskFailure;
use twain_direct_core::node_statuses;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable for CLI locale selection.
const LANG_ENV: &str = "TWAIN_DIRECT_LANG";

/// Engine wired to the configured simulated scanner.
type Engine = TaskEngine<SimulatedDevice, StaticProfileCatalog, StaticCertificateStore>;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "twain-direct", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Preferred output language (overrides `TWAIN_DIRECT_LANG`).
    #[arg(long, value_enum, value_name = "LANG", global = true)]
    lang: Option<LangArg>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Negotiate a task against the configured scanner and print the reply.
    Negotiate(NegotiateCommand),
    /// Classify a task without negotiating it and list node statuses.
    Check(CheckCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments shared by commands that open a scanner session.
#[derive(Args, Debug)]
struct SessionArgs {
    /// Path to the task document.
    #[arg(long, value_name = "PATH")]
    task: PathBuf,
    /// Optional config file path (defaults to twain-direct.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for task negotiation.
#[derive(Args, Debug)]
struct NegotiateCommand {
    /// Session inputs.
    #[command(flatten)]
    session: SessionArgs,
    /// Pretty-print the reply document.
    #[arg(long, action = ArgAction::SetTrue)]
    pretty: bool,
    /// Report the canonical reply digest on stderr.
    #[arg(long, action = ArgAction::SetTrue)]
    digest: bool,
}

/// Arguments for task classification.
#[derive(Args, Debug)]
struct CheckCommand {
    /// Session inputs.
    #[command(flatten)]
    session: SessionArgs,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a config file.
    Validate(ConfigValidateCommand),
    /// Print an example config file.
    Example,
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to twain-direct.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Supported CLI language selections.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum LangArg {
    /// English.
    En,
    /// Catalan.
    Ca,
}

impl From<LangArg> for Locale {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::En => Self::En,
            LangArg::Ca => Self::Ca,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a localized message.
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
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let env_lang = std::env::var(LANG_ENV).ok();
    let locale = resolve_locale(cli.lang, env_lang.as_deref())?;
    set_locale(locale);
    if locale != Locale::En {
        write_stderr_line(&t!("i18n.disclaimer.machine_translated"))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Negotiate(command) => command_negotiate(&command),
        Commands::Check(command) => command_check(&command),
        Commands::Config {
            command,
        } => command_config(command),
    }
}

/// Prints top-level help to stdout.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Task Commands
// ============================================================================

/// Executes the `negotiate` command.
fn command_negotiate(command: &NegotiateCommand) -> CliResult<ExitCode> {
    let config = load_session_config(command.session.config.as_deref())?;
    install_telemetry(&config)?;
    let mut engine = build_engine(&config)?;
    let text = read_task(&command.session.task, config.limits.max_task_bytes)?;

    let outcome = engine.negotiate(&text, &CancellationFlag::new());
    let rendered = if command.pretty {
        serde_json::to_string_pretty(&outcome.reply)
    } else {
        outcome.reply_json()
    }
    .map_err(|err| CliError::new(t!("negotiate.serialize_failed", error = err)))?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))?;

    if command.digest {
        let digest = engine
            .digest(&outcome.reply)
            .map_err(|err| CliError::new(t!("negotiate.digest_failed", error = err)))?;
        write_stderr_line(&t!(
            "negotiate.digest",
            algorithm = digest.algorithm.as_str(),
            digest = digest.value
        ))
        .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }

    let Some(failure) = &outcome.failure else {
        return Ok(ExitCode::SUCCESS);
    };
    write_stderr_line(&t!(
        "negotiate.failed",
        action = failure.action,
        code = failure.error.code(),
        error = failure.error
    ))
    .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    Ok(ExitCode::FAILURE)
}

/// Executes the `check` command.
fn command_check(command: &CheckCommand) -> CliResult<ExitCode> {
    let config = load_session_config(command.session.config.as_deref())?;
    install_telemetry(&config)?;
    let engine = build_engine(&config)?;
    let text = read_task(&command.session.task, config.limits.max_task_bytes)?;

    let evaluation = engine.evaluate(&text);
    let lines = evaluation
        .task
        .as_ref()
        .map(|task| render_node_statuses(&node_statuses(task)))
        .unwrap_or_default();
    for line in &lines {
        write_stdout_line(line).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }

    if let Some(failure) = &evaluation.failure {
        write_stderr_line(&check_failure_message(failure))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
        return Ok(ExitCode::FAILURE);
    }
    write_stdout_line(&t!("check.ok", count = lines.len()))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Renders one line per task node in document order.
fn render_node_statuses(entries: &[NodeStatusEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| t!("check.node", json_key = entry.json_key, status = entry.status))
        .collect()
}

/// Formats the classification failure for stderr.
fn check_failure_message(failure: &TaskFailure) -> String {
    t!(
        "check.failed",
        action = failure.action,
        code = failure.error.code(),
        error = failure.error
    )
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
        ConfigCommand::Example => command_config_example(),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = TwainDirectConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    write_stdout_line(&t!("config.validate.ok"))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Prints the example config file.
fn command_config_example() -> CliResult<ExitCode> {
    write_stdout_bytes(config_toml_example().as_bytes())
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Session Helpers
// ============================================================================

/// Loads the session config.
///
/// Without an explicit path, environment override, or default file on disk,
/// the built-in defaults describe a standard simulated scanner.
fn load_session_config(path: Option<&Path>) -> CliResult<TwainDirectConfig> {
    let implicit = path.is_none()
        && std::env::var_os(CONFIG_ENV_VAR).is_none()
        && !Path::new(DEFAULT_CONFIG_NAME).exists();
    if implicit {
        return Ok(TwainDirectConfig::default());
    }
    TwainDirectConfig::load(path)
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))
}

/// Installs the tracing subscriber described by the config.
fn install_telemetry(config: &TwainDirectConfig) -> CliResult<()> {
    telemetry::install(&config.logging)
        .map_err(|err| CliError::new(t!("telemetry.install_failed", error = err)))
}

/// Builds a task engine for the configured scanner.
///
/// The inquiry cache is discovered from the device when the config omits it.
fn build_engine(config: &TwainDirectConfig) -> CliResult<Engine> {
    let engine_config = config
        .engine_config()
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    let mut engine = TaskEngine::new(
        engine_config,
        config.simulated_device(),
        config.profile_catalog(),
        config.certificate_store(),
    );
    if config.needs_discovery() {
        engine.discover_inquiry();
    }
    Ok(engine)
}

/// Reads a task document as UTF-8 text under the size limit.
fn read_task(path: &Path, max_bytes: usize) -> CliResult<String> {
    let bytes = read_bytes_with_limit(path, max_bytes).map_err(|err| match err {
        ReadLimitError::Io(err) => {
            CliError::new(t!("task.read_failed", path = path.display(), error = err))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(t!("task.too_large", path = path.display(), size = size, limit = limit)),
    })?;
    String::from_utf8(bytes)
        .map_err(|_| CliError::new(t!("task.not_utf8", path = path.display())))
}

/// Errors returned by bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let metadata = file.metadata().map_err(ReadLimitError::Io)?;
    let size = metadata.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Resolves the CLI locale from flags or environment.
fn resolve_locale(lang: Option<LangArg>, env_lang: Option<&str>) -> CliResult<Locale> {
    if let Some(lang) = lang {
        return Ok(lang.into());
    }
    if let Some(value) = env_lang {
        return Locale::parse(value).ok_or_else(|| {
            CliError::new(t!("i18n.lang.invalid_env", env = LANG_ENV, value = value))
        });
    }
    Ok(Locale::En)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
