//! Rule-driven HTML to Markdown conversion.
//!
//! [`parse_article`] strips the host's excluded nodes, then renders the
//! summary, the cover image and the main content, in that order, into a list
//! of Markdown blocks. Links, images and embeds are written as reference
//! tokens (`[text][N]`, `![alt][N]`) whose targets are collected in a single
//! list shared by the whole article, so the three regions must be rendered in
//! document order for the numbering to come out right.
//!
//! Every handler writes through a [`Sink`]: either straight into the block
//! list, or into an inline buffer owned by an enclosing element (a paragraph,
//! an emphasis, a table cell, ...). The enclosing element decides what to do
//! with the buffered text once its children are done.

use super::{Page, Variant, blog_centos_org, debugpointnews_com, news_itsfoss_com};
use crate::error::{CollectorError, Result};
use crate::models::{Article, Author, Rule};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use ego_tree::NodeRef;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

static IMAGE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[.*\]\[\d+\]").expect("static regex"));

/// Substrings identifying embeddable video players.
const VIDEO_HOSTS: [&str; 2] = ["youtube.com", "youtube-nocookie.com"];

/// Where a handler's output goes.
pub enum Sink<'b> {
    /// Each emitted piece becomes a new top-level block.
    Blocks,
    /// Emitted pieces are appended to the enclosing element's buffer.
    Inline(&'b mut String),
}

/// Fetch-independent part of article extraction: turn one page into an [`Article`].
#[instrument(level = "debug", skip_all, fields(url = %page.url, ?variant))]
pub fn parse_article(html: &str, variant: Variant, rule: &Rule, page: &Page) -> Result<Article> {
    let mut document = Html::parse_document(html);
    exclude_nodes(&mut document, rule)?;

    let mut renderer = Renderer::new(variant, page);
    // Summary is the head of the content and the cover its second element.
    renderer.render_region(&document, &rule.summary)?;
    renderer.render_cover(&document, &rule.cover)?;
    renderer.render_region(&document, &rule.content)?;

    let article = Article {
        title: parse_title(&document, rule)?,
        author: renderer.parse_author(&document, rule)?,
        url: page.url.to_string(),
        date: parse_date(&document, rule)?,
        texts: renderer.texts,
        urls: renderer.urls,
        ..Article::default()
    };
    debug!(
        blocks = article.texts.len(),
        references = article.urls.len(),
        title = %article.title,
        "Rendered article"
    );
    Ok(article)
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| CollectorError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// First element matching `selector`; `None` for an empty selector.
fn select_first<'d>(document: &'d Html, selector: &str) -> Result<Option<ElementRef<'d>>> {
    if selector.trim().is_empty() {
        return Ok(None);
    }
    let selector = parse_selector(selector)?;
    Ok(document.select(&selector).next())
}

fn exclude_nodes(document: &mut Html, rule: &Rule) -> Result<()> {
    for exclusion in &rule.exclusions {
        let selector = parse_selector(exclusion)?;
        let ids: Vec<_> = document.select(&selector).map(|element| element.id()).collect();
        for id in ids {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }
    }
    Ok(())
}

pub(crate) fn inner_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn parse_title(document: &Html, rule: &Rule) -> Result<String> {
    Ok(select_first(document, &rule.title)?
        .map(|node| inner_text(node).trim().to_string())
        .unwrap_or_default())
}

fn parse_date(document: &Html, rule: &Rule) -> Result<NaiveDateTime> {
    let Some(node) = select_first(document, &rule.date)? else {
        return Ok(Local::now().naive_local());
    };
    let raw = if node.value().name() == "time" {
        node.value().attr("datetime").unwrap_or_default().to_string()
    } else {
        inner_text(node).trim().to_string()
    };
    Ok(parse_date_text(&raw).unwrap_or_else(|| {
        warn!(date = %raw, "Unrecognised publication date; using now");
        Local::now().naive_local()
    }))
}

/// Parse the date formats found on supported sites, converted to local time.
pub fn parse_date_text(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    ["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// `url` without the query parameter `name`; other parameters are kept byte for byte.
fn without_query_param(url: &str, name: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let Some(query) = parsed.query() else {
        return url.to_string();
    };
    let kept = query
        .split('&')
        .filter(|segment| segment.split_once('=').map_or(*segment, |(key, _)| key) != name)
        .join("&");
    parsed.set_query((!kept.is_empty()).then_some(kept.as_str()));
    parsed.to_string()
}

/// Pick the widest candidate of a `srcset` attribute.
fn widest_candidate(srcset: &str) -> Option<String> {
    let mut best: Option<(u32, &str)> = None;
    for candidate in srcset.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        let parts: Vec<&str> = candidate.split_whitespace().collect();
        let [url, width] = parts.as_slice() else {
            continue;
        };
        let Ok(width) = width.trim_end_matches('w').parse::<u32>() else {
            continue;
        };
        if best.is_none_or(|(max, _)| width > max) {
            best = Some((width, *url));
        }
    }
    best.map(|(_, url)| url.to_string())
}

fn image_source(element: ElementRef<'_>) -> Option<String> {
    let attr = |name: &str| {
        element
            .value()
            .attr(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };
    attr("data-lazy-srcset")
        .or_else(|| attr("data-srcset"))
        .or_else(|| attr("srcset"))
        .and_then(widest_candidate)
        .or_else(|| attr("data-orig-file").map(String::from))
        .or_else(|| attr("data-src").map(String::from))
        .or_else(|| attr("src").map(String::from))
}

/// Recursive renderer state for one article.
pub struct Renderer<'p> {
    variant: Variant,
    page: &'p Page,
    heading: &'static str,
    /// Number of the last item emitted by the innermost `<ol>`.
    item_index: usize,
    list_depth: usize,
    pub(crate) texts: Vec<String>,
    pub(crate) urls: Vec<String>,
}

impl<'p> Renderer<'p> {
    pub fn new(variant: Variant, page: &'p Page) -> Self {
        Self {
            variant,
            page,
            heading: variant.family().top_level_heading(),
            item_index: 0,
            list_depth: 0,
            texts: Vec::new(),
            urls: Vec::new(),
        }
    }

    fn render_region(&mut self, document: &Html, selector: &str) -> Result<()> {
        if let Some(node) = select_first(document, selector)? {
            self.render_node(*node, &mut Sink::Blocks, false);
        }
        Ok(())
    }

    fn render_cover(&mut self, document: &Html, selector: &str) -> Result<()> {
        let Some(node) = select_first(document, selector)? else {
            return Ok(());
        };
        let image = if matches!(node.value().name(), "img" | "amp-img") {
            Some(node)
        } else {
            node.descendants()
                .filter_map(ElementRef::wrap)
                .find(|e| matches!(e.value().name(), "img" | "amp-img"))
        };
        if let Some(image) = image {
            self.render_img(image, &mut Sink::Blocks);
        }
        Ok(())
    }

    fn parse_author(&self, document: &Html, rule: &Rule) -> Result<Author> {
        match self.variant {
            Variant::DebugpointnewsCom => return Ok(debugpointnews_com::author()),
            Variant::BlogCentosOrg => return Ok(blog_centos_org::author(rule)),
            _ => {}
        }
        Ok(select_first(document, &rule.author)?
            .map(|node| Author {
                url: self.absolutize(node.value().attr("href").unwrap_or_default()),
                name: inner_text(node).trim().to_string(),
            })
            .unwrap_or_default())
    }

    /// Resolve `link` against the page it appears on.
    pub(crate) fn absolutize(&self, link: &str) -> String {
        if link.starts_with("http") {
            return link.to_string();
        }
        self.page
            .url
            .join(link)
            .map(String::from)
            .unwrap_or_else(|_| format!("{}{}", self.page.base_url, link))
    }

    /// Reference index of `url`, adding it to the list if it is new.
    pub(crate) fn register(&mut self, url: String) -> usize {
        if let Some(position) = self.urls.iter().position(|known| *known == url) {
            return position + 1;
        }
        self.urls.push(url);
        self.urls.len()
    }

    pub(crate) fn emit(&mut self, sink: &mut Sink<'_>, text: String) {
        match sink {
            Sink::Blocks => self.texts.push(text),
            Sink::Inline(buffer) => buffer.push_str(&text),
        }
    }

    /// Render the children of `node` into a fresh inline buffer.
    pub(crate) fn render_inline(&mut self, node: NodeRef<'_, Node>, ordered: bool) -> String {
        let mut buffer = String::new();
        self.render_children(node, &mut Sink::Inline(&mut buffer), ordered);
        buffer
    }

    pub fn render_node(&mut self, node: NodeRef<'_, Node>, sink: &mut Sink<'_>, ordered: bool) {
        match node.value() {
            Node::Text(text) => self.render_text(text, sink),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(node) {
                    self.render_element(element, sink, ordered);
                }
            }
            _ => self.render_children(node, sink, ordered),
        }
    }

    pub(crate) fn render_children(&mut self, node: NodeRef<'_, Node>, sink: &mut Sink<'_>, ordered: bool) {
        for child in node.children() {
            self.render_node(child, sink, ordered);
        }
    }

    fn render_element(&mut self, element: ElementRef<'_>, sink: &mut Sink<'_>, ordered: bool) {
        match element.value().name() {
            "h1" => self.render_heading(element, 0),
            "h2" => self.render_heading(element, 1),
            "h3" => self.render_heading(element, 2),
            "h4" => self.render_heading(element, 3),
            "h5" => self.render_heading(element, 4),
            "h6" => self.render_heading(element, 5),
            "img" | "amp-img" => self.render_img(element, sink),
            "video" | "br" => {}
            "a" => self.render_anchor(element, sink, ordered),
            "pre" | "code" => self.render_code(element, sink),
            "blockquote" => self.render_blockquote(element, sink, ordered),
            "span" => self.render_span(element, sink),
            "p" => self.render_paragraph(element, sink, ordered),
            "b" | "strong" => self.render_emphasis(element, sink, ordered, "**"),
            "i" | "em" => self.render_emphasis(element, sink, ordered, "_"),
            "ul" => self.render_list(element, sink, false),
            "ol" => self.render_list(element, sink, true),
            "li" => self.render_list_item(element, sink, ordered),
            "div" => self.render_div(element, sink, ordered),
            "table" => self.render_table(element, ordered),
            "tr" => self.render_row(element, sink, ordered),
            "td" | "th" => self.render_cell(element, sink, ordered),
            "iframe" => self.render_iframe(element, sink),
            "script" | "style" | "noscript" | "figcaption" | "interaction" => {}
            _ => self.render_children(*element, sink, ordered),
        }
    }

    fn render_text(&mut self, text: &str, sink: &mut Sink<'_>) {
        match sink {
            Sink::Blocks if !text.trim().is_empty() => self.texts.push(text.trim().to_string()),
            Sink::Blocks => {}
            Sink::Inline(buffer) if !text.trim().is_empty() => buffer.push_str(text),
            // Whitespace between two inline elements collapses to one space.
            Sink::Inline(buffer) => {
                if buffer.chars().last().is_some_and(|c| !c.is_whitespace()) {
                    buffer.push(' ');
                }
            }
        }
    }

    fn render_heading(&mut self, element: ElementRef<'_>, depth: usize) {
        let text = inner_text(element);
        let text = text.trim();
        if !text.is_empty() {
            self.texts
                .push(format!("{}{} {}", self.heading, "#".repeat(depth), text));
        }
    }

    pub(crate) fn render_img(&mut self, element: ElementRef<'_>, sink: &mut Sink<'_>) {
        let Some(source) = image_source(element) else {
            return;
        };
        if source.starts_with("data:") {
            return;
        }
        let index = self.register(self.absolutize(&source));
        let title = element
            .value()
            .attr("title")
            .filter(|title| !title.is_empty())
            .or_else(|| element.value().attr("alt").map(str::trim))
            .unwrap_or_default();
        self.emit(sink, format!("![{title}][{index}]"));
    }

    fn render_anchor(&mut self, element: ElementRef<'_>, sink: &mut Sink<'_>, ordered: bool) {
        let href = element.value().attr("href").unwrap_or_default().trim();
        let url = self.absolutize(href);

        let title = self.render_inline(*element, ordered);
        let title = title.trim();
        if title.is_empty() {
            return;
        }
        let text = if IMAGE_TOKEN.is_match(title) {
            title.to_string()
        } else {
            let index = match self.urls.iter().position(|known| *known == url) {
                Some(position) => position + 1,
                None => self.register(without_query_param(&url, "ref")),
            };
            format!("[{title}][{index}]")
        };
        self.emit(sink, text);
    }

    fn render_code(&mut self, element: ElementRef<'_>, sink: &mut Sink<'_>) {
        let code = inner_text(element);
        let code = code.trim();
        if code.is_empty() {
            return;
        }
        match sink {
            Sink::Blocks => self.texts.push(format!("```\n{code}\n```")),
            Sink::Inline(buffer) => buffer.push_str(&format!("`{code}`")),
        }
    }

    pub(crate) fn render_blockquote(&mut self, element: ElementRef<'_>, sink: &mut Sink<'_>, ordered: bool) {
        let quote = self.render_inline(*element, ordered);
        if quote.trim().is_empty() {
            return;
        }
        let mut quote = quote.replace('\n', "\n> ");
        if let Some(stripped) = quote.strip_suffix("\n> ") {
            quote = stripped.to_string();
        }
        self.emit(sink, format!("> {quote}"));
    }

    fn render_span(&mut self, element: ElementRef<'_>, sink: &mut Sink<'_>) {
        let text = inner_text(element);
        let text = text.trim();
        if !text.is_empty() {
            self.emit(sink, text.to_string());
        }
    }

    fn render_paragraph(&mut self, element: ElementRef<'_>, sink: &mut Sink<'_>, ordered: bool) {
        let text = self.render_inline(*element, ordered);
        if text.trim().is_empty() {
            return;
        }
        match sink {
            Sink::Blocks => self.texts.push(text.trim().to_string()),
            Sink::Inline(buffer) => {
                // Consecutive paragraphs inside a quote or list item stay on separate lines.
                let keep = buffer.trim_end().len();
                buffer.truncate(keep);
                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(&text);
            }
        }
    }

    fn render_emphasis(&mut self, element: ElementRef<'_>, sink: &mut Sink<'_>, ordered: bool, marker: &str) {
        let raw = self.render_inline(*element, ordered);
        if raw.trim().is_empty() {
            return;
        }
        let mut text = format!("{marker}{}{marker}", raw.trim());
        if raw.starts_with(' ') {
            text.insert(0, ' ');
        }
        if raw.ends_with(' ') {
            text.push(' ');
        }
        self.emit(sink, text);
    }

    fn render_list(&mut self, element: ElementRef<'_>, sink: &mut Sink<'_>, ordered: bool) {
        if !element.has_children() {
            return;
        }
        let outer_index = std::mem::replace(&mut self.item_index, 0);
        self.list_depth += 1;
        let body = self.render_inline(*element, ordered);
        self.list_depth -= 1;
        self.item_index = outer_index;

        let body = body.trim();
        if body.is_empty() {
            return;
        }
        match sink {
            Sink::Blocks => self.texts.push(body.to_string()),
            Sink::Inline(buffer) if self.list_depth > 0 => {
                let keep = buffer.trim_end().len();
                buffer.truncate(keep);
                buffer.push('\n');
                let indented: Vec<String> = body.lines().map(|line| format!("  {line}")).collect();
                buffer.push_str(&indented.join("\n"));
            }
            Sink::Inline(buffer) => {
                let keep = buffer.trim_end().len();
                buffer.truncate(keep);
                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(body);
                buffer.push('\n');
            }
        }
    }

    fn render_list_item(&mut self, element: ElementRef<'_>, sink: &mut Sink<'_>, ordered: bool) {
        if !element.has_children() {
            return;
        }
        let body = self.render_inline(*element, ordered);
        let body = body.trim();
        if body.is_empty() {
            return;
        }
        // A stray <li> outside any list has nowhere to go.
        if let Sink::Inline(buffer) = sink {
            if ordered {
                self.item_index += 1;
                buffer.push_str(&format!("{}. {body}\n", self.item_index));
            } else {
                buffer.push_str(&format!("- {body}\n"));
            }
        }
    }

    fn render_div(&mut self, element: ElementRef<'_>, sink: &mut Sink<'_>, ordered: bool) {
        if self.variant == Variant::NewsItsfossCom
            && news_itsfoss_com::render_div(self, element, sink, ordered)
        {
            return;
        }
        self.render_children(*element, sink, ordered);
    }

    fn render_table(&mut self, element: ElementRef<'_>, ordered: bool) {
        let table = self.render_inline(*element, ordered);
        let table = table.trim();
        if !table.is_empty() {
            self.texts.push(table.to_string());
        }
    }

    fn render_row(&mut self, element: ElementRef<'_>, sink: &mut Sink<'_>, ordered: bool) {
        let row = self.render_inline(*element, ordered);
        let row = row.trim();
        if !row.is_empty() {
            self.emit(sink, format!("{row} |\n"));
        }
    }

    fn render_cell(&mut self, element: ElementRef<'_>, sink: &mut Sink<'_>, ordered: bool) {
        let cell = self.render_inline(*element, ordered);
        // A row stays on one line.
        let cell = cell.lines().map(str::trim).filter(|line| !line.is_empty()).join(" ");
        if !cell.is_empty() {
            self.emit(sink, format!("| {cell} "));
        }
    }

    fn render_iframe(&mut self, element: ElementRef<'_>, sink: &mut Sink<'_>) {
        if self.variant == Variant::NewsItsfossCom {
            news_itsfoss_com::render_iframe(self, element, sink);
            return;
        }
        let src = element.value().attr("src").unwrap_or_default().trim();
        if VIDEO_HOSTS.iter().any(|host| src.contains(host)) {
            let index = self.register(self.absolutize(src));
            self.emit(sink, format!("![YouTube Video][{index}]"));
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn page(url: &str) -> Page {
        Page::parse(url).unwrap()
    }

    fn content_rule() -> Rule {
        Rule {
            content: "article".to_string(),
            ..Rule::default()
        }
    }

    fn render(variant: Variant, body: &str) -> Article {
        let html = format!("<html><body><article>{body}</article></body></html>");
        parse_article(&html, variant, &content_rule(), &page("https://example.com/post/1")).unwrap()
    }

    #[test]
    fn test_headings_are_relative_to_family_marker() {
        let article = render(Variant::Lctt, "<h1>Top</h1><h2>Foo</h2><h6>Deep</h6><h3>   </h3>");
        assert_eq!(article.texts, vec!["## Top", "### Foo", "####### Deep"]);

        let article = render(Variant::Cossig, "<h1>Top</h1><h2>Foo</h2>");
        assert_eq!(article.texts, vec!["# Top", "## Foo"]);
    }

    #[test]
    fn test_emphasis_keeps_outer_spaces() {
        let article = render(Variant::Lctt, "<p>Say<b> hello </b>to<em> everyone </em>now</p>");
        assert_eq!(article.texts, vec!["Say **hello** to _everyone_ now"]);
    }

    #[test]
    fn test_emphasis_at_block_level() {
        let article = render(Variant::Lctt, "<strong> word </strong>");
        assert_eq!(article.texts, vec![" **word** "]);
    }

    #[test]
    fn test_image_prefers_widest_srcset_candidate() {
        let article = render(
            Variant::Lctt,
            r#"<img srcset="/a-300.png 300w, /a-1024.png 1024w, /a-768.png 768w" src="/a.png" alt=" diagram ">"#,
        );
        assert_eq!(article.texts, vec!["![diagram][1]"]);
        assert_eq!(article.urls, vec!["https://example.com/a-1024.png"]);
    }

    #[test]
    fn test_image_attribute_fallbacks() {
        let article = render(
            Variant::Lctt,
            r#"<img data-src="https://cdn.example.com/lazy.png" src="/placeholder.gif" title="Lazy">
               <img data-orig-file="/orig.jpg" src="/small.jpg" alt="orig">
               <img src="images/relative.png">"#,
        );
        assert_eq!(article.texts, vec!["![Lazy][1]", "![orig][2]", "![][3]"]);
        assert_eq!(
            article.urls,
            vec![
                "https://cdn.example.com/lazy.png",
                "https://example.com/orig.jpg",
                "https://example.com/post/images/relative.png",
            ]
        );
    }

    #[test]
    fn test_data_uri_images_are_dropped() {
        let article = render(
            Variant::Lctt,
            r#"<img src="data:image/gif;base64,R0lGOD"><p>after</p>"#,
        );
        assert_eq!(article.texts, vec!["after"]);
        assert!(article.urls.is_empty());
    }

    #[test]
    fn test_anchor_reuses_index_and_strips_ref() {
        let article = render(
            Variant::Lctt,
            r#"<p><a href="https://x.org/docs?ref=itsfoss">X</a> and <a href="https://x.org/docs?ref=itsfoss">again</a>
               then <a href="/local?a=1&amp;ref=home">local</a></p>"#,
        );
        assert_eq!(article.texts, vec!["[X][1] and [again][1]\n               then [local][2]"]);
        assert_eq!(
            article.urls,
            vec!["https://x.org/docs", "https://example.com/local?a=1"]
        );
    }

    #[test]
    fn test_anchor_around_image_is_not_wrapped_twice() {
        let article = render(
            Variant::Lctt,
            r#"<a href="/full.png"><img src="/thumb.png" alt="t"></a><a href="/empty">  </a>"#,
        );
        assert_eq!(article.texts, vec!["![t][1]"]);
        assert_eq!(article.urls, vec!["https://example.com/thumb.png"]);
    }

    #[test]
    fn test_reference_indices_follow_document_order() {
        let article = render(
            Variant::Lctt,
            r#"<p><a href="/a">a</a></p><img src="/i.png"><p><a href="/b">b</a> <a href="/a">a again</a></p>
               <iframe src="https://www.youtube.com/embed/xyz"></iframe>"#,
        );
        assert_eq!(
            article.texts,
            vec!["[a][1]", "![][2]", "[b][3] [a again][1]", "![YouTube Video][4]"]
        );
        assert_eq!(article.urls.len(), 4);
        assert_eq!(article.urls[3], "https://www.youtube.com/embed/xyz");
    }

    #[test]
    fn test_code_inline_and_block() {
        let article = render(
            Variant::Lctt,
            "<p>Run <code>ls -l</code> now</p><pre><code>fn main() {}\n</code></pre>",
        );
        assert_eq!(article.texts, vec!["Run `ls -l` now", "```\nfn main() {}\n```"]);
    }

    #[test]
    fn test_blockquote_quotes_every_line() {
        let article = render(
            Variant::Lctt,
            "<blockquote><p>line one</p><p>line two</p></blockquote>",
        );
        assert_eq!(article.texts, vec!["> line one\n> line two"]);
    }

    #[test]
    fn test_list_after_text_in_a_quote_starts_on_its_own_line() {
        let article = render(
            Variant::Lctt,
            "<blockquote><p>intro</p><ul><li>x</li><li>y</li></ul></blockquote>",
        );
        assert_eq!(article.texts, vec!["> intro\n> - x\n> - y"]);
    }

    #[test]
    fn test_unordered_and_ordered_lists() {
        let article = render(
            Variant::Lctt,
            "<ul><li>apple</li><li>pear</li></ul><ol><li>one</li><li>two</li><li> </li><li>three</li></ol>",
        );
        assert_eq!(article.texts, vec!["- apple\n- pear", "1. one\n2. two\n3. three"]);
    }

    #[test]
    fn test_ordered_counter_is_scoped_to_its_list() {
        let article = render(
            Variant::Lctt,
            "<ol><li>a<ol><li>x</li><li>y</li></ol></li><li>b</li></ol><ol><li>again</li></ol>",
        );
        assert_eq!(
            article.texts,
            vec!["1. a\n  1. x\n  2. y\n2. b", "1. again"]
        );
    }

    #[test]
    fn test_table_rows_and_cells() {
        let article = render(
            Variant::Lctt,
            "<table><tr><th>A</th><th>B</th></tr><tr><td>1</td><td><b>2</b></td></tr></table>",
        );
        assert_eq!(article.texts, vec!["| A | B |\n| 1 | **2** |"]);
    }

    #[test]
    fn test_paragraphs_in_a_cell_keep_the_row_on_one_line() {
        let article = render(
            Variant::Lctt,
            "<table><tr><td><p>a</p><p>b</p></td><td>c</td></tr></table>",
        );
        assert_eq!(article.texts, vec!["| a b | c |"]);
    }

    #[test]
    fn test_skipped_tags_and_unknown_tags() {
        let article = render(
            Variant::Lctt,
            "<script>var x = 1;</script><style>p{}</style><noscript>js</noscript>\
             <figure><img src='/f.png' alt='f'><figcaption>caption</figcaption></figure>\
             <section><custom-tag>kept</custom-tag></section><video src='/v.mp4'></video>",
        );
        assert_eq!(article.texts, vec!["![f][1]", "kept"]);
    }

    #[test]
    fn test_span_uses_plain_text() {
        let article = render(Variant::Lctt, r#"<p>a <span> <a href="/x">b</a> </span> c</p>"#);
        assert_eq!(article.texts, vec!["a b c"]);
        assert!(article.urls.is_empty());
    }

    #[test]
    fn test_iframe_without_video_host_is_ignored() {
        let article = render(Variant::Lctt, r#"<iframe src="https://maps.example.com/embed"></iframe>"#);
        assert!(article.texts.is_empty());
    }

    #[test]
    fn test_summary_cover_content_order() {
        let rule = Rule {
            summary: "p.excerpt".to_string(),
            cover: "figure.cover".to_string(),
            content: "article".to_string(),
            ..Rule::default()
        };
        let html = r#"<html><body>
            <p class="excerpt">Intro <a href="/a">link</a></p>
            <figure class="cover"><img src="/cover.png" alt="c"></figure>
            <article><p>Body <a href="/b">b</a></p></article>
        </body></html>"#;
        let article =
            parse_article(html, Variant::Lctt, &rule, &page("https://example.com/post")).unwrap();
        assert_eq!(article.texts, vec!["Intro [link][1]", "![c][2]", "Body [b][3]"]);
        assert_eq!(
            article.urls,
            vec![
                "https://example.com/a",
                "https://example.com/cover.png",
                "https://example.com/b",
            ]
        );
    }

    #[test]
    fn test_exclusions_are_removed_before_rendering() {
        let rule = Rule {
            title: "h1".to_string(),
            content: "article".to_string(),
            exclusions: vec![".share".to_string(), "aside".to_string()],
            ..Rule::default()
        };
        let html = r#"<h1>Title <span class="share">Share!</span></h1>
            <article><p>keep</p><div class="share"><a href="/s">Share</a></div><aside>ad</aside></article>"#;
        let article =
            parse_article(html, Variant::Lctt, &rule, &page("https://example.com/post")).unwrap();
        assert_eq!(article.title, "Title");
        assert_eq!(article.texts, vec!["keep"]);
        assert!(article.urls.is_empty());
    }

    #[test]
    fn test_metadata_from_rules() {
        let rule = Rule {
            title: "h1.entry-title".to_string(),
            author: "a[rel=author]".to_string(),
            date: "time.published".to_string(),
            content: "article".to_string(),
            ..Rule::default()
        };
        let html = r#"<h1 class="entry-title"> Tom &amp; Jerry </h1>
            <a rel="author" href="/author/jane/"> Jane Doe </a>
            <time class="published" datetime="2024-01-02T10:00:00+00:00">Jan 2</time>
            <article><p>x</p></article>"#;
        let article =
            parse_article(html, Variant::Lctt, &rule, &page("https://example.com/post")).unwrap();
        assert_eq!(article.title, "Tom & Jerry");
        assert_eq!(article.author.name, "Jane Doe");
        assert_eq!(article.author.url, "https://example.com/author/jane/");
        let expected = DateTime::parse_from_rfc3339("2024-01-02T10:00:00+00:00")
            .unwrap()
            .with_timezone(&Local)
            .naive_local();
        assert_eq!(article.date, expected);
        assert_eq!(article.url, "https://example.com/post");
    }

    #[test]
    fn test_missing_or_unmatched_selectors_give_defaults() {
        let rule = Rule {
            title: "h1.nope".to_string(),
            content: "main".to_string(),
            ..Rule::default()
        };
        let article = parse_article(
            "<article><p>x</p></article>",
            Variant::Lctt,
            &rule,
            &page("https://example.com/post"),
        )
        .unwrap();
        assert_eq!(article.title, "");
        assert_eq!(article.author, Author::default());
        assert!(article.texts.is_empty());
        assert_eq!(article.date.date(), Local::now().date_naive());
    }

    #[test]
    fn test_invalid_selector_is_reported() {
        let rule = Rule {
            content: "div[[".to_string(),
            ..Rule::default()
        };
        let err = parse_article("<p>x</p>", Variant::Lctt, &rule, &page("https://example.com/"))
            .unwrap_err();
        assert!(matches!(err, CollectorError::Selector { .. }));
    }

    #[test]
    fn test_parse_date_text_formats() {
        let midnight = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(parse_date_text("2024-03-05"), Some(midnight(2024, 3, 5)));
        assert_eq!(parse_date_text("March 5, 2024"), Some(midnight(2024, 3, 5)));
        assert_eq!(parse_date_text("Mar 5, 2024"), Some(midnight(2024, 3, 5)));
        assert_eq!(
            parse_date_text("2024-03-05 08:15:00"),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(8, 15, 0)
        );
        assert!(parse_date_text("Tue, 05 Mar 2024 08:15:00 +0000").is_some());
        assert_eq!(parse_date_text("yesterday"), None);
    }

    #[test]
    fn test_without_query_param() {
        assert_eq!(without_query_param("https://a.com/?ref=x", "ref"), "https://a.com/");
        assert_eq!(
            without_query_param("https://a.com/p?a=1&ref=x&b=2", "ref"),
            "https://a.com/p?a=1&b=2"
        );
        assert_eq!(without_query_param("https://a.com/p", "ref"), "https://a.com/p");
        assert_eq!(
            without_query_param("https://a.com/p?q=a%2Fb&flag&ref", "ref"),
            "https://a.com/p?q=a%2Fb&flag"
        );
    }

    #[test]
    fn test_widest_candidate() {
        assert_eq!(
            widest_candidate("a.png 100w, b.png 400w, c.png 400w"),
            Some("b.png".to_string())
        );
        assert_eq!(widest_candidate("a.png 2x, b.png"), None);
    }
}
