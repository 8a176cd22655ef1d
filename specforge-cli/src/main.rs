//! Interactive shell around the design session
//!
//! Glue only: argument parsing, stdin/stdout, and wiring the client, session,
//! and run store together. All protocol logic lives in the library crates.

use clap::{Parser, Subcommand, ValueEnum};
use specforge_core::{SpecForgeResult, StoreError};
use specforge_llm::{
    analyze_system, extract_spec, propose_spec, AnalysisReport, AnthropicClient, SpecMode,
    DEFAULT_MODEL,
};
use specforge_session::{DesignSession, TurnOutcome};
use specforge_store::RunStore;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "specforge", about = "Iteratively build a SystemSpec with a model collaborator")]
struct Cli {
    /// Anthropic API key
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Model to use
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Requests-per-minute cap
    #[arg(long, default_value_t = 50)]
    rpm: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an interactive design session
    Design {
        /// Directory for run artifacts
        #[arg(long, default_value = "runs")]
        runs_dir: PathBuf,
    },
    /// Extract a SystemSpec from an existing system description
    Extract {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = Mode::Short)]
        mode: Mode,
    },
    /// Propose a SystemSpec from a goals/constraints description
    Propose {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = Mode::Short)]
        mode: Mode,
    },
    /// Review a system description and print an architecture report
    Analyze {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = Mode::Short)]
        mode: Mode,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Short,
    Full,
}

impl From<Mode> for SpecMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Short => SpecMode::Short,
            Mode::Full => SpecMode::Full,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        eprintln!("error: {}", error);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> SpecForgeResult<()> {
    let client = AnthropicClient::with_model(cli.api_key, cli.rpm, cli.model)?;
    match cli.command {
        Command::Design { runs_dir } => design(&client, runs_dir).await,
        Command::Extract { file, mode } => {
            let description = read_input(&file)?;
            let result = extract_spec(&client, &description, mode.into()).await?;
            print_spec(&result.spec)
        }
        Command::Propose { file, mode } => {
            let description = read_input(&file)?;
            let result = propose_spec(&client, &description, mode.into()).await?;
            print_spec(&result.spec)
        }
        Command::Analyze { file, mode } => {
            let description = read_input(&file)?;
            let result = analyze_system(&client, &description, mode.into()).await?;
            print_report(&result.report);
            Ok(())
        }
    }
}

async fn design(client: &AnthropicClient, runs_dir: PathBuf) -> SpecForgeResult<()> {
    let store = RunStore::create(&runs_dir)?;
    let mut session = DesignSession::new();
    println!("design session started (run {}), type 'exit' to stop", store.run_id());

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush().ok();

        let mut input = String::new();
        let read = stdin
            .lock()
            .read_line(&mut input)
            .map_err(|e| StoreError::Io {
                path: "<stdin>".to_string(),
                reason: e.to_string(),
            })?;
        let input = input.trim();
        if read == 0 || input == "exit" || input == "quit" {
            println!("session stopped by operator");
            break;
        }

        let (outcome, record) = session.step(input, client).await?;
        store.record_turn(&record)?;

        match outcome {
            TurnOutcome::Asked(ask) => {
                println!("question: {}", ask.question);
                for item in &ask.needed_for {
                    println!("  needed for: {}", item);
                }
            }
            TurnOutcome::Applied { warnings } => {
                println!("patch applied");
                for warning in &warnings {
                    println!("  warning: {}", warning);
                }
            }
            TurnOutcome::Rejected(error) => {
                println!("turn rejected ({:?}): {}", error.code, error.message);
                if error.code.is_parse_failure() {
                    let path = store.save_json_error(&record.raw, &error.message)?;
                    println!("  raw output saved to {}", path.display());
                }
            }
            TurnOutcome::Completed(complete) => {
                println!("session complete: {}", complete.reason);
                for unknown in &complete.remaining_unknowns {
                    println!("  remaining unknown: {}", unknown);
                }
                print_spec(session.spec())?;
                break;
            }
        }
    }
    Ok(())
}

fn read_input(path: &PathBuf) -> SpecForgeResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        StoreError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn print_report(report: &AnalysisReport) {
    println!("Architecture Summary");
    println!("{}", report.architecture_summary());
    println!();
    println!("Top Concrete Fixes");
    for (i, fix) in report.concrete_fixes().iter().take(5).enumerate() {
        println!("{}. {}", i + 1, fix);
    }
}

fn print_spec(spec: &specforge_core::SystemSpec) -> SpecForgeResult<()> {
    let rendered = serde_json::to_string_pretty(spec).map_err(|e| StoreError::Serialize {
        reason: e.to_string(),
    })?;
    println!("{}", rendered);
    Ok(())
}
