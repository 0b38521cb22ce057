//! # LCTT Collector
//!
//! Collects long-form articles from a fixed set of sites, converts their HTML
//! into LCTT-flavoured Markdown and submits each one as a pull request for
//! volunteer translators.
//!
//! ## Usage
//!
//! ```sh
//! GITHUB_TOKEN=... lctt_collector collect --url https://news.itsfoss.com/gnome-46/
//! ```
//!
//! ## Architecture
//!
//! 1. **Variant selection**: the URL's host picks a site variant and its rule
//! 2. **Rendering**: the page is fetched and walked into Markdown blocks
//! 3. **Submission**: branch, file and pull request on GitHub, then the
//!    day's counter and the collected-URL store are updated
//! 4. **Feeds**: every site's feed is polled to suggest what to collect next

use clap::Parser;
use serde::Serialize;
use std::error::Error;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod collector;
mod config;
mod counter;
mod error;
mod feed;
mod fetch;
mod hosting;
mod models;
mod parsers;
mod rules;
mod store;
mod utils;

use cli::{Cli, Command};
use collector::{CollectRequest, Collector};
use config::load_config;
use fetch::{HttpSource, PageSource, RetryFetch};
use hosting::{GitHubClient, Hosting};
use models::Envelope;
use rules::RuleBook;
use store::{SqliteUrlStore, UrlStore};

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

fn envelope<T: Serialize>(data: T) -> error::Result<String> {
    Ok(serde_json::to_string_pretty(&Envelope::success(data))?)
}

/// Run one command and return what goes to stdout.
async fn run<S, H, D>(collector: &Collector<S, H, D>, command: Command) -> error::Result<String>
where
    S: PageSource,
    H: Hosting,
    D: UrlStore,
{
    match command {
        Command::Preview { url, json } => {
            let markdown = collector.preview(&url).await?;
            if json { envelope(markdown) } else { Ok(markdown) }
        }
        Command::Collect {
            url,
            difficulty,
            category,
            content_file,
        } => {
            let content = match content_file {
                Some(path) => Some(tokio::fs::read_to_string(path).await?),
                None => None,
            };
            let submission = collector
                .collect(CollectRequest {
                    url,
                    difficulty,
                    category,
                    content,
                })
                .await?;
            envelope(submission)
        }
        Command::Feed {
            start_date,
            end_date,
            group_by,
        } => {
            let listing = collector
                .feed(&start_date, end_date.as_deref(), group_by)
                .await?;
            info!(count = listing.len(), "Feed listing ready");
            envelope(listing)
        }
        Command::Clean => envelope(collector.clean().await?),
        Command::Search { url } => envelope(collector.search(&url).await?),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    let args = Cli::parse();
    debug!(config = %args.config.display(), command = ?args.command, "Parsed CLI arguments");

    let config = load_config(&args.config).await?;
    if args.github_token.is_empty()
        && matches!(args.command, Command::Collect { .. } | Command::Clean | Command::Search { .. })
    {
        warn!("GITHUB_TOKEN is not set; GitHub calls will be rejected");
    }

    let source = RetryFetch::new(
        HttpSource::new(&config.user_agent)?,
        config.fetch_retries,
        RETRY_BASE_DELAY,
    );
    let hosting = GitHubClient::new(config.github.clone(), args.github_token, &config.user_agent)?;
    let store = SqliteUrlStore::connect(&config.database_url).await?;
    let collector = Collector::new(
        RuleBook::new(&config.configs_dir),
        source,
        hosting,
        store,
        config.feed_timeout(),
    )?;

    let outcome = run(&collector, args.command).await;
    let elapsed = start_time.elapsed();
    match outcome {
        Ok(output) => {
            println!("{output}");
            info!(elapsed_ms = elapsed.as_millis() as u64, "Execution complete");
            Ok(())
        }
        Err(e) => {
            error!(kind = ?e.kind(), error = %e, elapsed_ms = elapsed.as_millis() as u64, "Command failed");
            println!(
                "{}",
                serde_json::to_string_pretty(&Envelope::<()>::error(e.to_string()))?
            );
            Err(e.into())
        }
    }
}
