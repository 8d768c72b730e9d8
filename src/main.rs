use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use env_logger::Env;

use sender_stats::cache::{DiskMessageCache, MessageCache};
use sender_stats::config::{GmailConfig, PipelineConfig};
use sender_stats::gmail::{Credentials, GmailClient};
use sender_stats::pipeline::{self, RunOutcome};
use sender_stats::report::SenderReport;
use sender_stats::PipelineError;

#[derive(Parser, Debug)]
#[command(
    name = "sender-stats",
    about = "Count who sends you the most mail matching a Gmail query"
)]
struct Args {
    /// JSON credentials file holding an OAuth access token.
    #[arg(short = 'c', long = "client-id")]
    client_id: PathBuf,

    /// Gmail search query, e.g. `in:inbox newer_than:1y`.
    #[arg(short = 'q', long = "gmail-query")]
    query: String,

    /// Erase the message cache and fetch everything again.
    #[arg(short = 'e', long = "erase-cache")]
    erase_cache: bool,

    /// Number of senders to print.
    #[arg(long)]
    top: Option<usize>,

    /// Maximum concurrent detail requests.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Cache file location.
    #[arg(long)]
    cache_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(
        Env::default().default_filter_or("info,reqwest=warn,hyper=warn,hyper_util=warn"),
    )
    .init();

    let args = Args::parse();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            log::error!("run failed: {}", e);
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
    }
}

/// A run is clean when every listed message was resolved and counted.
fn completed_cleanly(outcome: &RunOutcome, report: &SenderReport) -> bool {
    !outcome.has_failures() && report.is_complete()
}

/// Returns whether the run was clean; per-message problems are reported on
/// stderr rather than as an error.
async fn run(args: Args) -> Result<bool, PipelineError> {
    let mut config = PipelineConfig::from_env();
    if let Some(concurrency) = args.concurrency {
        config = config.with_concurrency(concurrency);
    }
    if let Some(top) = args.top {
        config.top_n = top;
    }
    if let Some(path) = args.cache_path {
        config.cache_path = path;
    }

    let credentials = Credentials::load(&args.client_id)
        .map_err(|e| PipelineError::Config(e.to_string()))?;
    let gmail = Arc::new(
        GmailClient::new(GmailConfig::from_env(), credentials)
            .map_err(|e| PipelineError::Config(e.to_string()))?,
    );

    let cache = Arc::new(DiskMessageCache::open(&config.cache_path)?);
    if args.erase_cache {
        cache.erase_all()?;
    }
    log::info!(
        "cache {} holds {} messages",
        config.cache_path.display(),
        cache.len()
    );

    let outcome = pipeline::run(gmail.clone(), gmail, cache, &args.query, &config).await?;

    for failure in &outcome.failures {
        eprintln!("skipped {}: {}", failure.id, failure.error);
    }

    let report = SenderReport::build(&outcome.resolved, config.top_n);
    for (id, error) in &report.skipped {
        eprintln!("skipped {}: {}", id, error);
    }

    println!("Result");
    print!("{report}");
    log::info!(
        "{} messages counted across {} senders",
        report.counted,
        report.distinct
    );

    Ok(completed_cleanly(&outcome, &report))
}
