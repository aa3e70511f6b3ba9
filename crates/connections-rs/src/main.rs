//! Solve a Connections puzzle with an LLM and report how it went.
//!
//! Reads the API key from the `OPENROUTER_KEY` environment variable.
//! Responses are cached on disk (under the system temp dir by default), so
//! re-running the same puzzle with the same model and seed is free.
//!
//! # Examples
//!
//! ```sh
//! connections openai/gpt-4o \
//!   "bass, flounder, salmon, trout" \
//!   "ant, drill, island, opal" \
//!   "jack, queen, king, ace" \
//!   "red, green, blue, yellow"
//!
//! # Fresh answers every time, with debug logging
//! connections anthropic/claude-sonnet-4 ... --no-cache --verbose
//! ```

use std::path::PathBuf;
use std::process;

use clap::Parser;
use connections_rs::cache::{DiskCache, NoCache, ResponseCache};
use connections_rs::config::{DEFAULT_SEED, SolverConfig};
use connections_rs::logging::ConsoleLayer;
use connections_rs::oracle::LlmOracle;
use connections_rs::puzzle::AnswerKey;
use connections_rs::solver::{EventHandler, LoggingHandler, SolveEvent, Solver, Verdict};
use connections_rs::OpenRouterClient;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Solve a Connections puzzle with an LLM.
///
/// Reads the API key from the OPENROUTER_KEY environment variable.
#[derive(Parser)]
#[command(name = "connections")]
struct Cli {
    /// Model to guess with (OpenRouter identifier)
    model: String,

    /// First answer group: 4 comma-separated items
    group1: String,
    /// Second answer group: 4 comma-separated items
    group2: String,
    /// Third answer group: 4 comma-separated items
    group3: String,
    /// Fourth answer group: 4 comma-separated items
    group4: String,

    /// Seed for the item shuffle
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Sampling temperature
    #[arg(long, default_value_t = 1.0)]
    temperature: f32,

    /// Maximum tokens in each response
    #[arg(long, default_value_t = 4096)]
    max_tokens: u32,

    /// Retries for transient API failures
    #[arg(long, default_value_t = 2)]
    retries: u32,

    /// Directory for cached responses (default: system temp dir)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Always call the model; never read or write the cache
    #[arg(long)]
    no_cache: bool,

    /// Log prompts, replies and HTTP details to stderr
    #[arg(long, short)]
    verbose: bool,
}

/// Prints round-by-round progress to stdout and forwards every event to
/// [`LoggingHandler`] for `--verbose` runs.
struct ConsoleReporter {
    log: LoggingHandler,
}

impl EventHandler for ConsoleReporter {
    fn on_event(&self, event: &SolveEvent<'_>) {
        self.log.on_event(event);
        match event {
            SolveEvent::RoundStart {
                round,
                remaining,
                mistakes_left,
            } => {
                println!("\n*********");
                println!(
                    "Round {round}: {remaining} items left, {mistakes_left} mistake(s) allowed"
                );
            }
            SolveEvent::CacheHit { .. } => println!("(cached response)"),
            SolveEvent::Judged { candidate, verdict } => {
                let label = match verdict {
                    Verdict::Correct => "Correct!",
                    Verdict::AlreadySolved => "Already found:",
                    Verdict::Incorrect => "Incorrect!",
                };
                println!("{label} {} ({})", candidate.items.join(", "), candidate.reason);
            }
            SolveEvent::Discarded { count } => {
                println!("Skipping {count} later guess(es) in this response");
            }
            SolveEvent::Finished(outcome) => println!("\n{outcome}"),
            SolveEvent::Prompt(_) | SolveEvent::Response(_) => {}
        }
    }
}

fn open_cache(cli: &Cli) -> Result<Box<dyn ResponseCache>, String> {
    if cli.no_cache {
        return Ok(Box::new(NoCache));
    }
    let cache = match &cli.cache_dir {
        Some(dir) => DiskCache::new(dir)?,
        None => DiskCache::in_temp_dir()?,
    };
    tracing::debug!("response cache at {}", cache.dir().display());
    Ok(Box::new(cache))
}

async fn run(cli: &Cli) -> Result<(), String> {
    let key = AnswerKey::parse(&[&cli.group1, &cli.group2, &cli.group3, &cli.group4])?;

    let api_key = std::env::var("OPENROUTER_KEY")
        .map_err(|_| "OPENROUTER_KEY environment variable is not set".to_string())?;
    let client = OpenRouterClient::new(api_key)?;

    let config = SolverConfig::new(&cli.model)
        .with_seed(cli.seed)
        .with_temperature(cli.temperature)
        .with_max_tokens(cli.max_tokens)
        .with_retries(cli.retries);

    let oracle = LlmOracle::new(&client, &config);
    let mut cache = open_cache(cli)?;
    let reporter = ConsoleReporter {
        log: LoggingHandler,
    };

    Solver::new(&oracle, cache.as_mut(), config)
        .with_event_handler(&reporter)
        .run(&key)
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(ConsoleLayer::for_verbosity(cli.verbose))
        .init();

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
