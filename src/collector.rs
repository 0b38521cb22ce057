//! Collection orchestration.
//!
//! [`Collector`] owns the process-wide state (rule book, variant cache,
//! per-family counters) and drives the three collaborators: the page source,
//! the hosting service and the collected-URL store.
//!
//! # Collecting an article
//!
//! 1. Reject URLs already in the store (no side effects)
//! 2. Fetch and convert the page
//! 3. Lock the family's counter and read today's sequence number
//! 4. Create the branch, render Markdown unless supplied, commit it, open the PR
//! 5. Advance and persist the counter, record the URL
//!
//! Hosting steps are best effort. When any of them comes back empty the
//! counter and store are still updated (the submission may be half made) and
//! the caller gets [`CollectorError::PartialSubmission`].

use crate::counter::CounterStore;
use crate::error::{CollectorError, Result};
use crate::feed::{DateWindow, FeedListing, group_by_day, poll_feeds, select_window};
use crate::fetch::PageSource;
use crate::hosting::{Hosting, submission_path, submission_title};
use crate::models::{Article, Difficulty, Submission};
use crate::parsers::render::parse_article;
use crate::parsers::{Family, Registry};
use crate::rules::RuleBook;
use crate::utils::html_decode;
use itertools::Itertools;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Input of [`Collector::collect`].
#[derive(Debug, Clone)]
pub struct CollectRequest {
    pub url: String,
    pub difficulty: Difficulty,
    pub category: String,
    /// Markdown to submit instead of the rendered article.
    pub content: Option<String>,
}

pub struct Collector<S, H, D> {
    rules: RuleBook,
    registry: Registry,
    counters: HashMap<Family, CounterStore>,
    source: S,
    hosting: H,
    store: D,
    feed_timeout: Duration,
}

impl<S, H, D> Collector<S, H, D>
where
    S: PageSource,
    H: Hosting,
    D: crate::store::UrlStore,
{
    /// Build a collector, loading every rule family up front.
    pub fn new(rules: RuleBook, source: S, hosting: H, store: D, feed_timeout: Duration) -> Result<Self> {
        rules.preload()?;
        let counters = Family::ALL
            .into_iter()
            .map(|family| (family, CounterStore::new(rules.counter_path(family))))
            .collect();
        Ok(Self {
            rules,
            registry: Registry::new(),
            counters,
            source,
            hosting,
            store,
            feed_timeout,
        })
    }

    /// Fetch `url` and convert it with its host's rule.
    #[instrument(level = "info", skip(self))]
    pub async fn parse(&self, url: &str) -> Result<(Family, Article)> {
        let (variant, page) = self.registry.resolve(url, &self.rules)?;
        let family = variant.family();
        self.rules.ensure_loaded(family)?;
        let rule = self.rules.rule(&page.host)?;
        let html = self.source.fetch(url).await?;
        let article = parse_article(&html, variant, &rule, &page)?;
        Ok((family, article))
    }

    /// Fill the family template with `article`.
    pub fn render_markdown(&self, family: Family, article: &Article) -> Result<String> {
        let template = self.rules.template(family)?;
        let references = article
            .urls
            .iter()
            .enumerate()
            .map(|(i, url)| format!("[{}]: {}", i + 1, url))
            .join("\n");
        let markdown = template
            .replace("{Title}", &article.title)
            .replace("{URL}", &article.url)
            .replace("{Author.Name}", &article.author.name)
            .replace("{Author.URL}", &article.author.url)
            .replace("{Content}", &article.texts.join("\n\n"))
            .replace("{URL.List}", &references);
        Ok(html_decode(&markdown).into_owned())
    }

    /// Markdown for `url` without submitting anything.
    pub async fn preview(&self, url: &str) -> Result<String> {
        let (family, article) = self.parse(url).await?;
        self.render_markdown(family, &article)
    }

    #[instrument(level = "info", skip_all, fields(url = %request.url, difficulty = %request.difficulty, category = %request.category))]
    pub async fn collect(&self, request: CollectRequest) -> Result<Submission> {
        if self.store.exists(&request.url).await? {
            info!("Article already collected");
            return Err(CollectorError::AlreadyCollected(request.url));
        }

        let (family, mut article) = self.parse(&request.url).await?;
        article.difficulty = request.difficulty;
        article.category = request.category.clone();

        let mut counter = self.counters[&family].begin().await?;
        // A concurrent collect of the same URL may have finished while this one was parsing.
        if self.store.exists(&request.url).await? {
            info!("Article collected concurrently");
            return Err(CollectorError::AlreadyCollected(request.url));
        }
        let date = article.formatted_date();
        let seq = counter.current(&date);
        let branch = article.branch(seq);
        let filename = article.filename(seq);
        debug!(%branch, %filename, seq, "Allocated sequence number");

        let branch_url = self.hosting.create_branch(&branch).await;
        let content = match request.content {
            Some(content) => content,
            None => self.render_markdown(family, &article)?,
        };
        let title = submission_title(&article.category, &filename);
        let file_url = self
            .hosting
            .create_file(
                &branch,
                &submission_path(&article.category, &filename),
                &content,
                &title,
            )
            .await;
        let pr_url = self.hosting.create_pull_request(&branch, &title).await;

        counter.increase_and_persist(&date).await?;
        self.store.add(&request.url).await?;
        drop(counter);

        match (branch_url, file_url, pr_url) {
            (Some(_), Some(_), Some(pr_url)) => {
                info!(%branch, %pr_url, "Article submitted");
                Ok(Submission {
                    branch,
                    filename,
                    pr_url,
                })
            }
            (branch_url, file_url, pr_url) => {
                warn!(
                    %branch,
                    branch_ok = branch_url.is_some(),
                    file_ok = file_url.is_some(),
                    pr_ok = pr_url.is_some(),
                    "Submission incomplete"
                );
                Err(CollectorError::PartialSubmission {
                    branch,
                    branch_url,
                    file_url,
                    pr_url,
                })
            }
        }
    }

    /// Recently published, not yet collected feed items in `[start, end]`.
    #[instrument(level = "info", skip(self))]
    pub async fn feed(&self, start: &str, end: Option<&str>, group: bool) -> Result<FeedListing> {
        let window = DateWindow::parse(start, end)?;
        let urls = self.rules.feed_urls();
        let items = select_window(poll_feeds(&self.source, &urls, self.feed_timeout).await, &window);

        let mut fresh = Vec::with_capacity(items.len());
        for item in items {
            if !self.store.exists(&item.url).await? {
                fresh.push(item);
            }
        }
        info!(count = fresh.len(), "Feed items not yet collected");
        Ok(if group {
            FeedListing::ByDay(group_by_day(fresh))
        } else {
            FeedListing::Items(fresh)
        })
    }

    /// Delete and re-fork the working repository once no submission is pending.
    #[instrument(level = "info", skip_all)]
    pub async fn clean(&self) -> Result<String> {
        let open = self.hosting.list_open_pull_requests().await?;
        if !open.is_empty() {
            warn!(count = open.len(), "Open submissions block clean");
            return Err(CollectorError::OpenSubmissions(open));
        }
        self.hosting.delete_repository().await?;
        self.hosting.fork_repository().await
    }

    /// Where upstream already cites `url`, if anywhere.
    pub async fn search(&self, url: &str) -> Result<Option<String>> {
        self.hosting.search_first_match(url).await
    }
}
