mod config;
mod evaluate;
mod features;
mod github;
mod llm;
mod pipeline;
mod pr;
mod rag;
mod report;
mod server;
mod store;

use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, info_span, instrument, Instrument};
use tracing_subscriber::EnvFilter;

use config::Config;
use pipeline::{Pipeline, Retrieval};
use pr::PrState;

/// SmartMerge: predicts whether open GitHub pull requests will merge cleanly,
/// judged against the repository's closed PR history.
#[derive(Parser, Debug)]
#[command(name = "smartmerge", version, about)]
struct Cli {
    /// Config file (defaults to .smartmerge.toml in the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Without a subcommand an interactive menu is shown.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch, index and evaluate the PRs of a repository
    Run {
        owner: String,
        repo: String,

        /// Optional output file path for markdown report
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start the HTTP API
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Embed stored PR data and persist one index per state
    Index { repo: String },

    /// Query a persisted index, or list its chunks when no query is given
    Search {
        query: Option<String>,

        #[arg(long, default_value = "closed", value_parser = parse_state)]
        state: PrState,

        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Export per-PR features of stored data as CSV
    Features {
        repo: String,

        #[arg(long, default_value = "closed", value_parser = parse_state)]
        state: PrState,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_state(value: &str) -> Result<PrState, String> {
    match value {
        "open" => Ok(PrState::Open),
        "closed" => Ok(PrState::Closed),
        other => Err(format!("unknown PR state '{other}' (expected open or closed)")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Some(Command::Run { owner, repo, output }) => {
            run_pipeline(&config, &owner, &repo, output.as_deref()).await?
        }
        Some(Command::Serve { port }) => serve(&config, port).await?,
        Some(Command::Index { repo }) => {
            config.validate_retrieval()?;
            let retrieval = Retrieval::from_config(&config)?;
            let paths = pipeline::persist_indexes(&retrieval, &config.storage.data_dir, &repo)
                .instrument(info_span!("index", %repo))
                .await?;
            for path in paths {
                println!("Index saved to {}", path.display());
            }
        }
        Some(Command::Search { query, state, top_k }) => {
            search(&config, query.as_deref(), state, top_k).await?
        }
        Some(Command::Features { repo, state, output }) => {
            let store = store::RawStore::new(&config.storage.data_dir);
            let path = pipeline::export_features(
                &store,
                &config.storage.data_dir,
                &repo,
                state,
                output.as_deref(),
            )?;
            println!("Features saved to {}", path.display());
        }
        None => interactive(&config).await?,
    }

    Ok(())
}

#[instrument(name = "smartmerge", skip(config, output))]
async fn run_pipeline(
    config: &Config,
    owner: &str,
    repo: &str,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    let pipeline = Pipeline::from_config(config)?;
    info!("processing repository");
    let outcome = pipeline.process_repository(owner, repo).await?;
    info!(
        predictions = outcome.predictions.len(),
        fetch_errors = outcome.fetch_errors.len(),
        "pipeline complete"
    );

    let built_report = report::build(owner, repo, outcome);
    report::output(&built_report, output)?;
    Ok(())
}

async fn serve(config: &Config, port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    let pipeline = Pipeline::from_config(config)?;
    let port = port.unwrap_or(config.server.port);
    debug!(host = %config.server.host, port, "starting server");
    server::start(pipeline, &config.server.host, port).await?;
    Ok(())
}

async fn search(
    config: &Config,
    query: Option<&str>,
    state: PrState,
    top_k: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = rag::index::index_path(&config.storage.data_dir, state);
    let index = rag::VectorIndex::load(&path)?;
    info!(path = %path.display(), model = index.model_id(), chunks = index.len(), "loaded index");
    if index.is_empty() {
        println!("Index at {} has no chunks", path.display());
        return Ok(());
    }

    match query {
        None => {
            for (position, entry) in index.entries().iter().enumerate() {
                println!("[{position}] {}", rag::truncate_text(&entry.text, 120));
            }
        }
        Some(query) => {
            let embedder = rag::embed::from_config(&config.llm)?;
            let k = top_k.unwrap_or(config.retrieval.top_k);
            for hit in index.query(query, k, embedder.as_ref()).await? {
                println!("{:.3}  {}", hit.score, rag::truncate_text(&hit.text, 120));
            }
        }
    }
    Ok(())
}

async fn interactive(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== SmartMerge: AI-powered PR merge predictions ===");
    println!("1) Run CLI pipeline");
    println!("2) Start HTTP server");

    match prompt("Choose an option (1 or 2): ")?.as_str() {
        "1" => {
            let owner = prompt("Enter the GitHub repository owner: ")?;
            let repo = prompt("Enter the GitHub repository name: ")?;
            run_pipeline(config, &owner, &repo, None).await
        }
        "2" => serve(config, None).await,
        other => {
            eprintln!("Invalid choice '{other}'. Please enter 1 or 2.");
            std::process::exit(1);
        }
    }
}

fn prompt(message: &str) -> io::Result<String> {
    print!("{message}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::parse_from(["smartmerge", "run", "octo", "widgets", "-o", "report.md"]);
        match cli.command {
            Some(Command::Run { owner, repo, output }) => {
                assert_eq!(owner, "octo");
                assert_eq!(repo, "widgets");
                assert_eq!(output, Some(PathBuf::from("report.md")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_no_subcommand_means_interactive() {
        let cli = Cli::parse_from(["smartmerge", "--config", "custom.toml"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn test_features_state_parsing() {
        let cli = Cli::parse_from(["smartmerge", "features", "widgets", "--state", "open"]);
        assert!(matches!(
            cli.command,
            Some(Command::Features { state: PrState::Open, .. })
        ));
        assert!(Cli::try_parse_from(["smartmerge", "features", "widgets", "--state", "merged"]).is_err());
    }

    #[test]
    fn test_search_without_query_lists_entries() {
        let cli = Cli::parse_from(["smartmerge", "search", "--state", "open", "-k", "2"]);
        assert!(matches!(
            cli.command,
            Some(Command::Search { query: None, state: PrState::Open, top_k: Some(2) })
        ));
    }

    #[test]
    fn test_serve_port_override() {
        let cli = Cli::parse_from(["smartmerge", "serve", "--port", "9000"]);
        assert!(matches!(cli.command, Some(Command::Serve { port: Some(9000) })));
    }
}
