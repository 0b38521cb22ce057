//! news.itsfoss.com renders tips as Ghost callout cards and embeds YouTube
//! through the privacy player, both of which need their own handling.

use super::render::{Renderer, Sink, inner_text};
use scraper::ElementRef;

const YOUTUBE_EMBED: &str = "https://www.youtube.com/embed/";

/// Returns `true` when the `<div>` was handled here.
pub(crate) fn render_div(
    renderer: &mut Renderer<'_>,
    element: ElementRef<'_>,
    sink: &mut Sink<'_>,
    ordered: bool,
) -> bool {
    let class = element.value().attr("class").unwrap_or_default();
    if class.contains("kg-card kg-callout-card") {
        renderer.render_blockquote(element, sink, ordered);
        return true;
    }
    if class == "kg-callout-emoji" {
        renderer.emit(sink, format!("{} ", inner_text(element).trim()));
        return true;
    }
    false
}

/// YouTube embeds become short `youtu.be` links; any other iframe is dropped.
pub(crate) fn render_iframe(renderer: &mut Renderer<'_>, element: ElementRef<'_>, sink: &mut Sink<'_>) {
    let src = element.value().attr("src").unwrap_or_default().trim();
    let Some(rest) = src.strip_prefix(YOUTUBE_EMBED) else {
        return;
    };
    let id = rest.split(['?', '#']).next().unwrap_or(rest);
    if id.is_empty() {
        return;
    }
    let title = element
        .value()
        .attr("title")
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or("YouTube Video");
    let index = renderer.register(format!("https://youtu.be/{id}"));
    renderer.emit(sink, format!("![{title}][{index}]"));
}
