use anyhow::{anyhow, Result};
use clap::Parser;
use rcollect::{init_tracing_once, CollectError, CollectOptions, Collector, Credentials, FetchError, RedditClient};
use std::path::PathBuf;
use std::process::ExitCode;

const DEFAULT_CONFIG: &str = "rcollect.json";

#[derive(Debug, Parser)]
#[command(name = "rcollect")]
#[command(about = "Collect keyword-matching Reddit posts into a CSV table")]
struct Cli {
    /// JSON config file. Defaults to ./rcollect.json when present, built-in settings otherwise.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Override the output CSV path.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Disable the progress spinner.
    #[arg(long)]
    no_progress: bool,
}

/// Fatal outcomes, each with its own exit code.
enum Abort {
    Auth(String),
    Schema(String),
    Other(anyhow::Error),
}

impl From<anyhow::Error> for Abort {
    fn from(e: anyhow::Error) -> Self {
        Abort::Other(e)
    }
}

fn main() -> ExitCode {
    init_tracing_once();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Abort::Auth(msg)) => {
            tracing::error!("Aborting: {msg}");
            tracing::error!("Check REDDIT_CLIENT_ID / REDDIT_CLIENT_SECRET and your internet connection");
            ExitCode::from(2)
        }
        Err(Abort::Schema(msg)) => {
            tracing::error!("Aborting before any write: {msg}");
            ExitCode::from(3)
        }
        Err(Abort::Other(e)) => {
            tracing::error!("Aborting: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<(), Abort> {
    let mut opts = match cli.config {
        Some(path) => CollectOptions::from_json_file(&path)?,
        None if PathBuf::from(DEFAULT_CONFIG).exists() => CollectOptions::from_json_file(&PathBuf::from(DEFAULT_CONFIG))?,
        None => CollectOptions::default(),
    };
    if let Some(out) = cli.output {
        opts = opts.with_output_file(out);
    }
    if cli.no_progress {
        opts = opts.with_progress(false);
    }
    opts.validate()?;

    let creds = Credentials::from_env()
        .ok_or_else(|| Abort::Auth("REDDIT_CLIENT_ID and REDDIT_CLIENT_SECRET must be set".into()))?;

    tracing::info!("Initializing Reddit API client...");
    let mut client = RedditClient::connect(creds, opts.page_size, opts.request_delay).map_err(|e| match e {
        FetchError::Auth(m) => Abort::Auth(m),
        other => Abort::Other(anyhow!("failed to reach the Reddit API: {other}")),
    })?;

    let summary = Collector::from_options(opts).run(&mut client).map_err(|e| match e {
        CollectError::Auth(m) => Abort::Auth(m),
        e @ CollectError::Schema { .. } => Abort::Schema(e.to_string()),
        e => Abort::Other(e.into()),
    })?;

    println!("{summary}");
    if summary.rows_written == 0 {
        tracing::warn!("No new posts found matching the criteria");
    }
    Ok(())
}
