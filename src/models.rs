//! Data models for collected articles, extraction rules and feed items.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Article`]: The extraction result for one page, plus the names derived from it
//! - [`Rule`]: Per-host selector recipe loaded from the rule files
//! - [`FeedItem`]: One recently published entry discovered through a site's feed
//! - [`Envelope`]: The `{status, message, data}` wrapper used for JSON output

use crate::error::CollectorError;
use crate::utils::{branch_safe, path_safe};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How hard an article is expected to be to translate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// The star rating that prefixes the article title in the filename.
    pub fn stars(self) -> &'static str {
        match self {
            Difficulty::Easy => "⭐️",
            Difficulty::Medium => "⭐️⭐️",
            Difficulty::Hard => "⭐️⭐️⭐️",
        }
    }
}

impl FromStr for Difficulty {
    type Err = CollectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(CollectorError::InvalidDifficulty(s.to_string())),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        f.write_str(name)
    }
}

/// The person credited for an article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub url: String,
}

/// A converted article.
///
/// `texts` holds the rendered Markdown blocks in document order and `urls`
/// the referenced links, images and embeds. The block at position `n` may
/// refer to `urls[i]` through the reference token `[i + 1]`.
#[derive(Debug, Clone)]
pub struct Article {
    pub title: String,
    pub author: Author,
    pub url: String,
    /// Publication time, local.
    pub date: NaiveDateTime,
    pub difficulty: Difficulty,
    pub category: String,
    pub texts: Vec<String>,
    pub urls: Vec<String>,
}

impl Default for Article {
    fn default() -> Self {
        Self {
            title: String::new(),
            author: Author::default(),
            url: String::new(),
            date: Local::now().naive_local(),
            difficulty: Difficulty::default(),
            category: "tech".to_string(),
            texts: Vec::new(),
            urls: Vec::new(),
        }
    }
}

impl Article {
    /// Title with characters that are illegal in file paths removed.
    pub fn path_safe_title(&self) -> String {
        path_safe(&self.title)
    }

    /// Title usable as part of a git ref.
    pub fn branch_safe_title(&self) -> String {
        branch_safe(&self.path_safe_title())
    }

    /// Publication date as `yyyyMMdd`; the key of the per-day counter.
    pub fn formatted_date(&self) -> String {
        self.date.format("%Y%m%d").to_string()
    }

    /// `{date}.{seq} {stars} {title}.md`.
    ///
    /// `seq` is the counter value for [`Article::formatted_date`] at the time
    /// the article is submitted, so the caller must hold the counter.
    pub fn filename(&self, seq: u32) -> String {
        format!(
            "{}.{} {} {}.md",
            self.formatted_date(),
            seq,
            self.difficulty.stars(),
            self.path_safe_title()
        )
    }

    /// `{date}-{seq}-{slug}`, see [`Article::filename`] for `seq`.
    pub fn branch(&self, seq: u32) -> String {
        format!(
            "{}-{}-{}",
            self.formatted_date(),
            seq,
            self.branch_safe_title()
        )
    }
}

/// Per-host extraction recipe.
///
/// Every field except `feed` and `exclusions` is a CSS selector; an empty
/// string means the site does not provide that field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Rule {
    /// Feed path relative to the host root, e.g. `feed/`.
    pub feed: String,
    pub title: String,
    pub summary: String,
    pub cover: String,
    /// A selector, or for some variants a literal author string.
    pub author: String,
    pub date: String,
    pub content: String,
    /// Nodes removed from the document before anything is extracted.
    pub exclusions: Vec<String>,
}

/// A recently published item found in a site's feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    pub url: String,
    pub summary: String,
    /// Publication time, local.
    pub pub_date: NaiveDateTime,
}

/// Outcome of a successful collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub branch: String,
    pub filename: String,
    pub pr_url: String,
}

/// JSON wrapper for command output.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub status: &'static str,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success",
            message: None,
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: Some(message.into()),
            data: None,
        }
    }
}
