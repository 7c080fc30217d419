//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::{Value, json};
use thiserror::Error;

use sql_repro_harness::core::config::Config;
use sql_repro_harness::core::errors::SrhError;
use sql_repro_harness::logger::jsonl::{EventSink, EventType, JsonlWriter, LogEntry, Severity};
use sql_repro_harness::pairwise::sampler::WeightedPairSampler;
use sql_repro_harness::pairwise::table::{WeightTable, format_record, run_generate};
use sql_repro_harness::replay::harness::{ReplayReport, ReplayStatus, run_replay};

/// SQL Repro Harness: replays captured failure logs and builds pairwise option weights.
#[derive(Debug, Parser)]
#[command(
    name = "srh",
    author,
    version,
    about = "SQL Repro Harness - failure replay and pairwise option weights",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true)]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Replay a captured log against a freshly reset database.
    Replay(ReplayArgs),
    /// Generate or inspect pairwise option weight tables.
    Weights(WeightsArgs),
    /// View configuration state.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct ReplayArgs {
    /// Log file to replay (defaults to replay.log_path).
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,
    /// Target database name (defaults to target.database).
    #[arg(long, value_name = "NAME")]
    database: Option<String>,
    /// Directory holding target database files.
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct WeightsArgs {
    #[command(subcommand)]
    command: WeightsCommand,
}

#[derive(Debug, Clone, Subcommand)]
enum WeightsCommand {
    /// Enumerate all option pairs and write a fresh weight table.
    Generate(GenerateArgs),
    /// List the heaviest pairs of an existing table.
    Show(ShowArgs),
    /// Draw pairs from a table in proportion to their weights.
    Sample(SampleArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct GenerateArgs {
    /// Output file (defaults to weights.output_path).
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Fixed RNG seed for reproducible weights.
    #[arg(long, value_name = "N")]
    seed: Option<u64>,
    /// Smallest weight (inclusive).
    #[arg(long, value_name = "N")]
    min: Option<u32>,
    /// Largest weight (inclusive).
    #[arg(long, value_name = "N")]
    max: Option<u32>,
}

#[derive(Debug, Clone, Args)]
struct ShowArgs {
    /// Table to read (defaults to weights.output_path).
    #[arg(long, value_name = "PATH")]
    path: Option<PathBuf>,
    /// Number of pairs to list.
    #[arg(long, default_value_t = 10, value_name = "N")]
    top: usize,
}

#[derive(Debug, Clone, Args)]
struct SampleArgs {
    /// Table to read (defaults to weights.output_path).
    #[arg(long, value_name = "PATH")]
    path: Option<PathBuf>,
    /// Number of draws.
    #[arg(long, default_value_t = 10, value_name = "N")]
    count: usize,
    /// Fixed RNG seed.
    #[arg(long, value_name = "N")]
    seed: Option<u64>,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print the config file path.
    Path,
    /// Print the effective configuration.
    Show,
    /// Validate the configuration.
    Validate,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Replay finished but some statements failed.
    #[error("{0}")]
    Partial(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
            Self::Partial(_) => 4,
        }
    }
}

impl From<SrhError> for CliError {
    fn from(err: SrhError) -> Self {
        match err {
            SrhError::InvalidConfig { .. }
            | SrhError::MissingConfig { .. }
            | SrhError::ConfigParse { .. }
            | SrhError::NotFound { .. }
            | SrhError::WeightTableParse { .. } => Self::User(err.to_string()),
            _ => Self::Runtime(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Replay(args) => run_replay_cmd(cli, args),
        Command::Weights(args) => match &args.command {
            WeightsCommand::Generate(a) => run_weights_generate(cli, a),
            WeightsCommand::Show(a) => run_weights_show(cli, a),
            WeightsCommand::Sample(a) => run_weights_sample(cli, a),
        },
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    Ok(Config::load(cli.config.as_deref())?)
}

fn open_event_log(config: &Config) -> JsonlWriter {
    let mut writer = JsonlWriter::open(&config.paths.event_log);
    if let Ok(hash) = config.stable_hash() {
        writer.record(
            &LogEntry::new(EventType::ConfigLoaded, Severity::Info)
                .with_path(&config.paths.config_file)
                .with_details(format!("config_hash={hash}")),
        );
    }
    writer
}

// ---------------------------------------------------------------------------
// replay
// ---------------------------------------------------------------------------

fn run_replay_cmd(cli: &Cli, args: &ReplayArgs) -> Result<(), CliError> {
    let mut config = load_config(cli)?;
    if let Some(log) = &args.log {
        config.replay.log_path.clone_from(log);
    }
    if let Some(db) = &args.database {
        config.target.database = db.trim().to_string();
    }
    if let Some(dir) = &args.data_dir {
        config.target.data_dir.clone_from(dir);
    }
    config.validate()?;

    let mode = output_mode(cli);
    if mode == OutputMode::Human && !cli.quiet {
        println!(
            "Replaying {} into database '{}'...",
            config.replay.log_path.display(),
            config.target.database
        );
    }

    let mut events = open_event_log(&config);
    let report = run_replay(&config, &mut events)?;

    match mode {
        OutputMode::Human => print_replay_human(cli, &report),
        OutputMode::Json => {
            let payload = json!({
                "command": "replay",
                "log": config.replay.log_path.to_string_lossy(),
                "report": serde_json::to_value(&report)?,
            });
            write_json_line(&payload)?;
        }
    }

    if report.is_clean() {
        Ok(())
    } else {
        Err(CliError::Partial(format!(
            "{} of {} statements failed",
            report.failed(),
            report.attempted
        )))
    }
}

fn print_replay_human(cli: &Cli, report: &ReplayReport) {
    if report.status == ReplayStatus::NothingToRun {
        println!("{}", "No executable SQL statements found in the log.".yellow());
        return;
    }

    for failure in &report.failures {
        println!(
            "{} statement {} (line {})",
            "FAILED".red().bold(),
            failure.position,
            failure.line
        );
        println!("   SQL:   {}", failure.sql);
        println!("   Error: {}", failure.message);
    }

    if cli.quiet {
        return;
    }
    let summary = format!(
        "{} attempted, {} succeeded, {} failed ({} ms)",
        report.attempted,
        report.succeeded(),
        report.failed(),
        report.elapsed.as_millis()
    );
    if report.is_clean() {
        println!("{} {summary}", "OK".green().bold());
    } else {
        println!("{} {summary}", "DONE".yellow().bold());
    }
}

// ---------------------------------------------------------------------------
// weights
// ---------------------------------------------------------------------------

fn run_weights_generate(cli: &Cli, args: &GenerateArgs) -> Result<(), CliError> {
    let mut config = load_config(cli)?;
    if let Some(out) = &args.output {
        config.weights.output_path.clone_from(out);
    }
    if args.seed.is_some() {
        config.weights.seed = args.seed;
    }
    if let Some(min) = args.min {
        config.weights.min_weight = min;
    }
    if let Some(max) = args.max {
        config.weights.max_weight = max;
    }
    config.validate()?;

    let mut events = open_event_log(&config);
    let summary = run_generate(&config, &mut events)?;

    match output_mode(cli) {
        OutputMode::Human => {
            if !cli.quiet {
                println!(
                    "{} generated {} pairs from {} options, saved to {}",
                    "OK".green().bold(),
                    summary.pairs,
                    summary.options,
                    summary.path.display()
                );
                println!(
                    "   weights in [{}, {}], total {}",
                    summary.min_weight, summary.max_weight, summary.total_weight
                );
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "weights generate",
                "summary": serde_json::to_value(&summary)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn table_path(cli: &Cli, explicit: Option<&PathBuf>) -> Result<PathBuf, CliError> {
    match explicit {
        Some(p) => Ok(p.clone()),
        None => Ok(load_config(cli)?.weights.output_path),
    }
}

fn run_weights_show(cli: &Cli, args: &ShowArgs) -> Result<(), CliError> {
    let path = table_path(cli, args.path.as_ref())?;
    let table = WeightTable::load(&path)?;
    let top = table.heaviest(args.top);

    match output_mode(cli) {
        OutputMode::Human => {
            println!(
                "{} pairs, total weight {} ({})",
                table.len(),
                table.total_weight(),
                path.display()
            );
            for entry in top {
                println!("  {}", format_record(entry));
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "weights show",
                "path": path.to_string_lossy(),
                "pairs": table.len(),
                "total_weight": table.total_weight(),
                "top": serde_json::to_value(&top)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_weights_sample(cli: &Cli, args: &SampleArgs) -> Result<(), CliError> {
    let path = table_path(cli, args.path.as_ref())?;
    let table = WeightTable::load(&path)?;
    let sampler = WeightedPairSampler::new(&table)?;
    let draws = match args.seed {
        Some(seed) => sampler.sample_n(&mut StdRng::seed_from_u64(seed), args.count),
        None => sampler.sample_n(&mut rand::rng(), args.count),
    };

    match output_mode(cli) {
        OutputMode::Human => {
            for entry in &draws {
                println!("{}", format_record(entry));
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "weights sample",
                "path": path.to_string_lossy(),
                "draws": serde_json::to_value(&draws)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = load_config(cli)?;

            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Runtime(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => {
            let config = load_config(cli)?;
            let hash = config.stable_hash()?;

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("Configuration is valid.");
                    println!("  Source: {}", config.paths.config_file.display());
                    println!("  Hash: {hash}");
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config validate",
                        "valid": true,
                        "source": config.paths.config_file.to_string_lossy(),
                        "hash": hash,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// output helpers
// ---------------------------------------------------------------------------

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("SRH_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
