use anyhow::{bail, Context, Result};
use clap::Parser;
use runcap::{Executor, Outcome, RunConfig, Verbatim};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit status when the watchdog terminated the program
const EXIT_TIMED_OUT: u8 = 124;
/// Exit status when the program produced too much output
const EXIT_OUTPUT_TOO_LONG: u8 = 125;
/// Exit status when the program could not be run at all
const EXIT_USAGE: u8 = 2;

#[derive(Parser)]
#[command(name = "runcap")]
#[command(about = "Run a program under a wall-clock timeout and an output cap", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML file providing the command and limits
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Wall-clock limit in milliseconds (overrides the config file)
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Maximum bytes of escaped stdout (overrides the config file)
    #[arg(short, long)]
    max_output: Option<usize>,

    /// How long to wait for output readers after the program ends, in milliseconds
    #[arg(long)]
    grace_ms: Option<u64>,

    /// Capture output verbatim instead of HTML-escaping it
    #[arg(long)]
    raw: bool,

    /// Print the result as JSON instead of passing output through
    #[arg(long)]
    json: bool,

    /// Program and arguments (overrides `command` in the config file)
    #[arg(last = true)]
    command: Vec<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("runcap: {e:#}");
            ExitCode::from(EXIT_USAGE)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let run_config = resolve_config(&cli)?;
    if run_config.command.is_empty() {
        bail!("No command given: pass one after `--` or set `command` in the config file");
    }

    let config = run_config.executor_config()?;
    let executor = if cli.raw {
        Executor::new(config).with_escaper(Verbatim)
    } else {
        Executor::new(config)
    };

    let outcome = executor
        .execute(&run_config.command)
        .with_context(|| format!("Failed to run {}", run_config.command[0]))?;
    let code = exit_code(&outcome);

    if cli.json {
        let output = outcome.into_program_output(&executor.config().messages, executor.escaper());
        let json = serde_json::to_string_pretty(&output).context("Failed to serialize result")?;
        println!("{json}");
        return Ok(code);
    }

    let messages = &executor.config().messages;
    match outcome {
        Outcome::Completed { stdout, stderr, .. } => {
            std::io::stdout()
                .write_all(stdout.as_bytes())
                .context("Failed to write stdout")?;
            std::io::stderr()
                .write_all(stderr.as_bytes())
                .context("Failed to write stderr")?;
        }
        Outcome::TimedOut => eprintln!("runcap: {}", messages.timeout),
        Outcome::OutputTooLong => eprintln!("runcap: {}", messages.long_output),
    }
    Ok(code)
}

/// Merge the config file (if any) with command-line overrides
fn resolve_config(cli: &Cli) -> Result<RunConfig> {
    let mut config = match &cli.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };

    if !cli.command.is_empty() {
        config.command = cli.command.clone();
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    if let Some(max_output) = cli.max_output {
        config.max_output_size = max_output;
    }
    if let Some(grace_ms) = cli.grace_ms {
        config.join_grace_ms = grace_ms;
    }
    Ok(config)
}

fn exit_code(outcome: &Outcome) -> ExitCode {
    match outcome {
        Outcome::Completed { exit_code, .. } => {
            // Signal deaths report as plain failure
            let code = exit_code
                .and_then(|c| u8::try_from(c).ok())
                .unwrap_or(1);
            ExitCode::from(code)
        }
        Outcome::TimedOut => ExitCode::from(EXIT_TIMED_OUT),
        Outcome::OutputTooLong => ExitCode::from(EXIT_OUTPUT_TOO_LONG),
    }
}
