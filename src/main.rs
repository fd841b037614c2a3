use clap::{Parser, Subcommand};
use grammar_hive::{Grammar, GrammarConfig};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Random text generator for block-based context-free grammars
#[derive(Parser)]
#[command(author, version, about, long_about = None, args_conflicts_with_subcommands = true)]
struct Cli {
    /// Path to the grammar file
    #[arg(help = "Path to the grammar file")]
    grammar_file: Option<PathBuf>,

    /// Number of texts to generate
    #[arg(help = "Number of texts to generate", default_value_t = 1)]
    count: usize,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Depth ceiling for a single expansion
    #[arg(long)]
    max_depth: Option<usize>,

    /// Maximum number of concurrent workers
    #[arg(long)]
    workers: Option<usize>,

    /// Fail on references to missing rules instead of copying them through
    #[arg(long)]
    strict: bool,

    /// Print the result as a JSON object
    #[arg(long)]
    json: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a grammar file and report its rules without generating
    Check {
        /// Path to the grammar file
        grammar_file: PathBuf,
    },
}

#[derive(Serialize)]
struct BatchResponse<'a> {
    messages: &'a [String],
    count: usize,
    status: &'static str,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(Commands::Check { grammar_file }) = cli.command {
        let grammar = Grammar::from_file(&grammar_file)?;
        println!(
            "{}: {} rules, start symbol <{}>",
            grammar_file.display(),
            grammar.rules().len(),
            grammar.start_symbol()
        );
        return Ok(());
    }

    let grammar_file = cli.grammar_file.ok_or("Grammar file path required")?;

    let mut config = match &cli.config {
        Some(path) => GrammarConfig::from_json_file(path)?,
        None => GrammarConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if let Some(max_depth) = cli.max_depth {
        config.max_depth = max_depth;
    }
    if let Some(workers) = cli.workers {
        config.max_workers = Some(workers);
    }
    config.strict_references |= cli.strict;

    info!(path = %grammar_file.display(), "loading grammar");
    let grammar = Grammar::from_file(&grammar_file)?.with_config(config);
    info!(rules = grammar.rules().len(), count = cli.count, "generating");

    let messages = grammar.generate_multiple(cli.count)?;

    if cli.json {
        let response = BatchResponse {
            messages: &messages,
            count: messages.len(),
            status: "success",
        };
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        for (i, message) in messages.iter().enumerate() {
            println!("{}. {}", i + 1, message);
        }
    }

    Ok(())
}
