//! Syndication feed polling.
//!
//! Every configured site's feed is fetched concurrently. A
//! feed that fails to load, fails to parse or exceeds its time budget simply
//! contributes no items. What is left is filtered to the requested date
//! window and sorted oldest first; the caller removes already-collected URLs.

use crate::error::{CollectorError, Result};
use crate::fetch::PageSource;
use crate::models::FeedItem;
use crate::utils::html_decode;
use chrono::{Days, Local, NaiveDate, NaiveDateTime};
use feed_rs::model::Entry;
use feed_rs::parser;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// Inline tags stripped from summaries, keeping their text.
const UNWANTED_TAGS: [&str; 6] = ["a", "i", "em", "b", "strong", "code"];

/// Publication window `[start, end]`, both local days inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDateTime,
    /// Midnight of the day after the last requested day.
    end: NaiveDateTime,
}

impl DateWindow {
    /// Validate `yyyyMMdd` bounds; `end` defaults to today.
    pub fn parse(start: &str, end: Option<&str>) -> Result<Self> {
        let start_day = parse_day(start)?;
        let end_day = match end {
            Some(end) => parse_day(end)?,
            None => Local::now().date_naive(),
        };
        if start_day > end_day {
            return Err(CollectorError::DateRange {
                start: start.to_string(),
                end: end.map(String::from).unwrap_or_else(|| end_day.format("%Y%m%d").to_string()),
            });
        }
        let next_day = end_day
            .checked_add_days(Days::new(1))
            .ok_or_else(|| CollectorError::InvalidDate(end_day.format("%Y%m%d").to_string()))?;
        Ok(Self {
            start: start_day.and_time(chrono::NaiveTime::MIN),
            end: next_day.and_time(chrono::NaiveTime::MIN),
        })
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        at >= self.start && at <= self.end
    }
}

fn parse_day(raw: &str) -> Result<NaiveDate> {
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CollectorError::InvalidDate(raw.to_string()));
    }
    NaiveDate::parse_from_str(raw, "%Y%m%d").map_err(|_| CollectorError::InvalidDate(raw.to_string()))
}

/// Feed listing, flat or keyed by `yyyy-MM-dd`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FeedListing {
    Items(Vec<FeedItem>),
    ByDay(BTreeMap<String, Vec<FeedItem>>),
}

impl FeedListing {
    pub fn len(&self) -> usize {
        match self {
            FeedListing::Items(items) => items.len(),
            FeedListing::ByDay(days) => days.values().map(Vec::len).sum(),
        }
    }
}

/// Partition chronologically sorted items by calendar day.
pub fn group_by_day(items: Vec<FeedItem>) -> BTreeMap<String, Vec<FeedItem>> {
    let mut days: BTreeMap<String, Vec<FeedItem>> = BTreeMap::new();
    for item in items {
        days.entry(item.pub_date.format("%Y-%m-%d").to_string())
            .or_default()
            .push(item);
    }
    days
}

/// Reduce an HTML feed summary to one line of plain text.
pub fn clean_summary(raw: &str) -> String {
    let mut text = first_paragraph(raw).unwrap_or(raw).to_string();
    for tag in UNWANTED_TAGS {
        while let Some(start) = find_opening_tag(&text, tag) {
            match text[start..].find('>') {
                Some(len) => text.replace_range(start..=start + len, ""),
                None => text.truncate(start),
            }
        }
        text = text.replace(&format!("</{tag}>"), "");
    }
    html_decode(&text).replace(['\r', '\n'], "").trim().to_string()
}

/// Content of the first `<p>` when the summary has paragraphs.
fn first_paragraph(raw: &str) -> Option<&str> {
    let close = raw.find("</p>")?;
    let open = find_opening_tag(&raw[..close], "p")?;
    let body = open + raw[open..close].find('>')? + 1;
    Some(&raw[body..close])
}

/// Byte offset of the first `<tag>` / `<tag attr…>` (not `<tagname…>`).
fn find_opening_tag(text: &str, tag: &str) -> Option<usize> {
    let needle = format!("<{tag}");
    let mut from = 0;
    while let Some(offset) = text[from..].find(&needle) {
        let at = from + offset;
        match text[at + needle.len()..].chars().next() {
            Some(c) if c == '>' || c == '/' || c.is_whitespace() => return Some(at),
            None => return Some(at),
            _ => from = at + needle.len(),
        }
    }
    None
}

/// The reader-facing link of an entry: `rel="alternate"` when present, else the first.
fn pick_entry_link(entry: &Entry) -> Option<&str> {
    entry
        .links
        .iter()
        .find(|link| link.rel.as_deref() == Some("alternate"))
        .or_else(|| entry.links.first())
        .map(|link| link.href.trim())
        .filter(|href| !href.is_empty())
}

fn into_item(entry: Entry) -> Option<FeedItem> {
    let url = pick_entry_link(&entry)?.to_string();
    let pub_date = entry
        .published
        .or(entry.updated)?
        .with_timezone(&Local)
        .naive_local();
    let summary = entry
        .summary
        .map(|text| text.content)
        .filter(|text| !text.trim().is_empty())
        .or_else(|| entry.content.and_then(|content| content.body))
        .unwrap_or_default();
    let title = entry.title.map(|text| text.content).unwrap_or_default();
    Some(FeedItem {
        title: html_decode(title.trim()).into_owned(),
        url,
        summary: clean_summary(&summary),
        pub_date,
    })
}

/// Parse an RSS, Atom or JSON feed.
///
/// Entries without a link or a publication date are skipped.
pub fn parse_feed(body: &str) -> Result<Vec<FeedItem>> {
    let feed = parser::parse(body.as_bytes()).map_err(|e| CollectorError::Feed(e.to_string()))?;
    Ok(feed.entries.into_iter().filter_map(into_item).collect())
}

/// Fetch and parse every feed at once, each bounded by `per_feed`.
///
/// Failures are logged and contribute nothing; the result is unordered.
#[instrument(level = "info", skip_all, fields(feeds = urls.len()))]
pub async fn poll_feeds<S: PageSource>(source: &S, urls: &[String], per_feed: Duration) -> Vec<FeedItem> {
    let t0 = Instant::now();
    let batches: Vec<Vec<FeedItem>> = stream::iter(urls)
        .map(|url| async move {
            match timeout(per_feed, source.fetch(url)).await {
                Ok(Ok(body)) => match parse_feed(&body) {
                    Ok(items) => {
                        debug!(%url, count = items.len(), "Parsed feed");
                        items
                    }
                    Err(e) => {
                        warn!(%url, error = %e, "Malformed feed; skipping");
                        Vec::new()
                    }
                },
                Ok(Err(e)) => {
                    warn!(%url, error = %e, "Feed fetch failed; skipping");
                    Vec::new()
                }
                Err(_) => {
                    warn!(%url, timeout_ms = per_feed.as_millis() as u64, "Feed timed out; skipping");
                    Vec::new()
                }
            }
        })
        .buffer_unordered(urls.len().max(1))
        .collect()
        .await;

    let items: Vec<FeedItem> = batches.into_iter().flatten().collect();
    info!(
        count = items.len(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Polled feeds"
    );
    items
}

/// Keep items inside `window`, oldest first.
pub fn select_window(items: Vec<FeedItem>, window: &DateWindow) -> Vec<FeedItem> {
    let mut items: Vec<FeedItem> = items
        .into_iter()
        .filter(|item| window.contains(item.pub_date))
        .collect();
    items.sort_by_key(|item| item.pub_date);
    items
}
