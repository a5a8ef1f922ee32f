//! Crucible CLI
//!
//! A command-line tool for running code snippets and judging them against
//! test cases.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crucible::{
    Config, EXAMPLE_CONFIG, ExecutionOutcome, ExecutionRequest, Executor, LanguageRegistry,
    TestCase, TestHarness, TestRun,
};
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "crucible")]
#[command(about = "A tool for running untrusted code against test cases")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: crucible.toml)
        #[arg(short, long, default_value = "crucible.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Run a program once (compile if needed, then execute)
    Run {
        /// Source file to run, or "-" to read it from stdin
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language ID (e.g., cpp, py)
        #[arg(short, long)]
        language: String,

        /// File fed to the program's stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Judge a program against test cases
    Test {
        /// Source file to judge
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language ID (e.g., cpp, py)
        #[arg(short, long)]
        language: String,

        /// JSON array of {"input", "expectedOutput"} objects
        #[arg(long, value_name = "FILE")]
        cases: PathBuf,

        /// Print the results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available languages
    Languages {
        /// Print the list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
        Config::from_file(path).context("failed to load configuration")?
    } else {
        debug!("using default configuration");
        Config::default()
    };

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Run {
            source,
            language,
            input,
            json,
        } => run_execute(config, &source, language, input.as_deref(), json).await,
        Commands::Test {
            source,
            language,
            cases,
            json,
        } => run_tests(config, &source, &language, &cases, json).await,
        Commands::Languages { json } => list_languages(json),
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
    }
}

async fn read_source(source: &Path) -> Result<String> {
    if source == Path::new("-") {
        let mut code = String::new();
        tokio::io::stdin()
            .read_to_string(&mut code)
            .await
            .context("failed to read source from stdin")?;
        return Ok(code);
    }

    tokio::fs::read_to_string(source)
        .await
        .with_context(|| format!("failed to read source file '{}'", source.display()))
}

async fn run_execute(
    config: Config,
    source: &Path,
    language: String,
    input: Option<&Path>,
    json: bool,
) -> Result<()> {
    let code = read_source(source).await?;
    let mut request = ExecutionRequest::new(code, language);
    if let Some(input_path) = input {
        let stdin = tokio::fs::read_to_string(input_path)
            .await
            .context("failed to read input file")?;
        request = request.with_stdin(stdin);
    }

    info!(language = %request.language, "running program");
    let executor = Executor::new(config);
    let outcome = executor
        .execute(&request)
        .await
        .context("execution failed")?;

    if json {
        print_json(&outcome)?;
    } else {
        print_outcome(&outcome);
    }

    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}

fn print_outcome(outcome: &ExecutionOutcome) {
    print!("{}", outcome.stdout);
    if !outcome.stderr.is_empty() {
        eprintln!("{}", outcome.stderr);
    }

    // Execution info goes to stderr so stdout stays clean for piping
    info!(
        status = ?outcome.status,
        time = format_args!("{} ms", outcome.execution_time_ms),
        memory = format_args!("{} KB", outcome.memory_kb),
        exit_code = outcome.exit_code,
        "{}",
        outcome.message
    );
}

async fn run_tests(
    config: Config,
    source: &Path,
    language: &str,
    cases_path: &Path,
    json: bool,
) -> Result<()> {
    let code = read_source(source).await?;
    let raw = tokio::fs::read_to_string(cases_path)
        .await
        .context("failed to read test cases file")?;
    let cases: Vec<TestCase> =
        serde_json::from_str(&raw).context("test cases must be a JSON array")?;

    info!(language, cases = cases.len(), "running test cases");
    let harness = TestHarness::new(Executor::new(config));
    let run = harness
        .run_all(&code, language, &cases)
        .await
        .context("test run failed")?;

    if json {
        print_json(&run)?;
    } else {
        print_test_run(&run);
    }

    if !run.summary.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_test_run(run: &TestRun) {
    for (index, result) in run.results.iter().enumerate() {
        let verdict = if result.passed {
            "PASS"
        } else if result.error {
            "ERROR"
        } else {
            "FAIL"
        };
        println!(
            "Case {:>3}: {:<5} {:>6} ms {:>8} KB",
            index + 1,
            verdict,
            result.execution_time_ms,
            result.memory_kb
        );
        if !result.passed {
            println!("  expected: {:?}", result.expected_output.trim());
            println!("  actual:   {:?}", result.actual_output);
            if result.error {
                println!("  {}", result.message);
            }
        }
    }

    let summary = &run.summary;
    println!();
    println!("Passed: {}/{}", summary.passed, summary.total);
    println!("Total time: {} ms", summary.total_time_ms);
    println!("Max memory: {} KB", summary.max_memory_kb);
}

fn list_languages(json: bool) -> Result<()> {
    let registry = LanguageRegistry::builtin();
    if json {
        return print_json(&registry.languages());
    }

    println!("Available languages:\n");
    for profile in registry.iter() {
        let kind = if profile.is_compiled() {
            "compiled"
        } else {
            "interpreted"
        };
        println!("  {:<6} {} ({}, .{})", profile.id, profile.name, kind, profile.extension);
    }
    Ok(())
}

fn show_config(config: &Config) {
    println!("Execution limits:");
    println!("  Timeout: {} s", config.limits.timeout_secs);
    println!("  Max output: {} bytes per stream", config.limits.max_output_bytes);
    println!();
    println!("Workspace root: {}", config.workspace_root.display());
    println!("Parallel test cases: {}", config.max_parallel_cases);
    println!();
    println!("Languages available: {}", LanguageRegistry::builtin().len());
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{text}");
    Ok(())
}

async fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
