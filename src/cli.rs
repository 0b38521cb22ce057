//! Command-line interface definitions for the collector.
//!
//! Secrets and the config path can come from the environment so the binary
//! can run unattended from a scheduler.

use crate::models::Difficulty;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Collect articles from known sites as LCTT Markdown pull requests.
///
/// # Examples
///
/// ```sh
/// lctt_collector preview --url https://news.itsfoss.com/gnome-46/
/// lctt_collector collect --url https://news.itsfoss.com/gnome-46/ --difficulty medium
/// lctt_collector feed --start-date 20240101 --group-by
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to config.yaml
    #[arg(short, long, env = "LCTT_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    /// GitHub token used to push branches and open pull requests
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, default_value = "")]
    pub github_token: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Render an article to Markdown without submitting it
    Preview {
        #[arg(long)]
        url: String,
        /// Wrap the Markdown in the JSON envelope
        #[arg(long)]
        json: bool,
    },
    /// Convert an article and open a pull request for it
    Collect {
        #[arg(long)]
        url: String,
        #[arg(long, default_value = "easy")]
        difficulty: Difficulty,
        #[arg(long, default_value = "tech")]
        category: String,
        /// Submit this file instead of the rendered Markdown
        #[arg(long)]
        content_file: Option<PathBuf>,
    },
    /// List feed items published in a date window that are not collected yet
    Feed {
        /// First day, yyyyMMdd
        #[arg(long)]
        start_date: String,
        /// Last day, yyyyMMdd (default: today)
        #[arg(long)]
        end_date: Option<String>,
        /// Group items by publication day
        #[arg(long)]
        group_by: bool,
    },
    /// Delete and re-fork the working repository when nothing is pending
    Clean,
    /// Find where upstream already cites an article
    Search {
        #[arg(long)]
        url: String,
    },
}
