//! Command-line front end for Helios: compile a rule set and report
//! stats, or compile-then-match a single event against it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use helios::{compile, engine::MatchOptions, Event, HeliosConfig, SelectionStrategy, TraceLevel};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "helios-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile and evaluate Helios rule sets from the command line")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "helios.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a rule source file and print compilation stats.
    Compile {
        /// Path to a JSON or JSONL rule source file.
        rules: PathBuf,
    },
    /// Compile a rule source file, then match one JSON event against it.
    Match {
        /// Path to a JSON or JSONL rule source file.
        rules: PathBuf,
        /// Path to a JSON object of event attributes.
        event: PathBuf,
        /// Stop at the first (highest-priority) matching rule.
        #[arg(long)]
        first_match: bool,
        /// Attach a full predicate-level trace to the result.
        #[arg(long)]
        trace: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "helios=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = HeliosConfig::from_file(&cli.config).unwrap_or_default();

    match cli.command {
        Command::Compile { rules } => run_compile(&rules, &config),
        Command::Match { rules, event, first_match, trace } => {
            run_match(&rules, &event, first_match, trace, &config)
        }
    }
}

fn run_compile(rules_path: &PathBuf, config: &HeliosConfig) -> Result<()> {
    let source = fs::read_to_string(rules_path)
        .with_context(|| format!("reading rule source at {}", rules_path.display()))?;
    let report = compile(&source, config).context("compiling rule set")?;

    println!("logical rules:       {}", report.model.stats().logical_rules);
    println!("unique combinations: {}", report.model.stats().unique_combinations);
    println!("total predicates:    {}", report.model.stats().total_predicates);
    println!("deduplication rate:  {:.2}%", report.model.stats().deduplication_rate * 100.0);
    println!("compile time:        {} ns", report.trace.total().as_nanos());

    if !report.contradictions.is_empty() {
        println!("\ncontradictions ({}):", report.contradictions.len());
        for c in &report.contradictions {
            println!("  {c}");
        }
    }
    Ok(())
}

fn run_match(
    rules_path: &PathBuf,
    event_path: &PathBuf,
    first_match: bool,
    trace: bool,
    config: &HeliosConfig,
) -> Result<()> {
    let source = fs::read_to_string(rules_path)
        .with_context(|| format!("reading rule source at {}", rules_path.display()))?;
    let report = compile(&source, config).context("compiling rule set")?;
    let engine = helios::MatchingEngine::new(report.model);

    let event_json = fs::read_to_string(event_path)
        .with_context(|| format!("reading event at {}", event_path.display()))?;
    let attributes: std::collections::HashMap<String, helios::value::ConditionValue> =
        serde_json::from_str(&event_json).context("parsing event attributes as JSON")?;

    let mut event = Event::new("cli-event");
    for (field, value) in attributes {
        event = event.with_attribute(field, value);
    }

    let options = MatchOptions {
        eligibility: None,
        trace_level: if trace { TraceLevel::Full } else { TraceLevel::None },
        strategy: if first_match { SelectionStrategy::FirstMatch } else { SelectionStrategy::AllMatches },
    };

    let result = engine.match_event(&event, &options);
    let output = serde_json::to_string_pretty(&result).context("serializing match result")?;
    println!("{output}");
    Ok(())
}
