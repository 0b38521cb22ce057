//! Small string helpers shared by the parsers, the collector and the feed reader.
//!
//! - Title sanitising for file paths and branch names
//! - Host name to variant type name conversion
//! - HTML entity decoding and URL normalisation
//! - String truncation for log fields

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static PATH_UNSAFE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*#\p{Cc}]"#).expect("static regex"));
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W").expect("static regex"));

/// Remove characters that cannot appear in a file name on common platforms.
pub fn path_safe(title: &str) -> String {
    PATH_UNSAFE.replace_all(title, "").into_owned()
}

/// Replace every non-word character with `-`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(branch_safe("Hello World!"), "Hello-World-");
/// ```
pub fn branch_safe(title: &str) -> String {
    NON_WORD.replace_all(title, "-").into_owned()
}

/// Capitalize the first character of a string.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(upcase("itsfoss"), "Itsfoss");
/// assert_eq!(upcase(""), "");
/// ```
pub fn upcase(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
    }
}

/// Decode HTML entities (`&amp;`, `&#8217;`, ...). Unknown entities are kept verbatim.
pub fn html_decode(s: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(s)
}

/// Key under which an article URL is stored for duplicate detection.
pub fn normalize_url(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at `max` bytes (on a character boundary) and an
/// ellipsis with the number of dropped bytes is appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}
