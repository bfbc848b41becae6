//! Anchor extraction from directory-listing HTML.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;
use url::Url;

/// Matches the `href` attribute of an `<a>` tag, quoted or bare.
#[allow(clippy::expect_used)]
static ANCHOR_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("anchor regex is valid") // Static pattern, safe to panic
});

/// A byte count closing the text that precedes an anchor, as IIS-style
/// listings print it: `5/26/2023  9:16 AM   123456 <A HREF=...>`.
#[allow(clippy::expect_used)]
static LEADING_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)(\d+)\s*$").expect("size regex is valid") // Static pattern, safe to panic
});

/// One link found on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Resolved link target.
    pub url: Url,
    /// Byte count the listing printed next to the link, if any.
    pub size_hint: Option<u64>,
}

/// Extracts every anchor `href` in `body`, resolved against `page_url`.
///
/// Fragments are dropped, and links that resolve to anything other than
/// `http`/`https` (e.g. `mailto:`) or fail to resolve are skipped. Order
/// follows the document; duplicates are kept.
///
/// # Examples
///
/// ```
/// use specfetch_core::discovery::extract_links;
/// use url::Url;
///
/// let page = Url::parse("https://example.com/Rel-18/21_series/").unwrap();
/// let links = extract_links(r#"<a href="21101-i00.zip">21101</a>"#, &page);
/// assert_eq!(links[0].as_str(), "https://example.com/Rel-18/21_series/21101-i00.zip");
/// ```
#[must_use]
pub fn extract_links(body: &str, page_url: &Url) -> Vec<Url> {
    extract_entries(body, page_url)
        .into_iter()
        .map(|entry| entry.url)
        .collect()
}

/// Like [`extract_links`], also picking up the size a listing prints in
/// front of each link.
///
/// Only a bare integer between the previous tag and the anchor counts;
/// human-readable sizes (`1.2M`) and sizes printed after the link are
/// ignored.
#[must_use]
pub fn extract_entries(body: &str, page_url: &Url) -> Vec<ListingEntry> {
    ANCHOR_HREF
        .captures_iter(body)
        .filter_map(|caps| {
            let anchor_start = caps.get(0)?.start();
            let href = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
            let url = resolve_href(href.as_str(), page_url)?;
            Some(ListingEntry {
                url,
                size_hint: leading_size(&body[..anchor_start]),
            })
        })
        .collect()
}

fn leading_size(before_anchor: &str) -> Option<u64> {
    let text = before_anchor
        .rfind('>')
        .map_or(before_anchor, |tag_end| &before_anchor[tag_end + 1..]);
    let text = text.rsplit('\n').next().unwrap_or(text);
    LEADING_SIZE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
}

fn resolve_href(raw: &str, page_url: &Url) -> Option<Url> {
    let href = decode_entities(raw.trim());
    if href.is_empty() {
        return None;
    }
    let mut url = match page_url.join(&href) {
        Ok(url) => url,
        Err(e) => {
            trace!(href = %href, error = %e, "skipping unresolvable href");
            return None;
        }
    };
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Listing servers escape `&` in query strings; nothing else shows up in hrefs.
fn decode_entities(href: &str) -> String {
    href.replace("&amp;", "&")
}

/// True when the URL path (query ignored) ends with `suffix`, case-sensitively.
#[must_use]
pub fn has_suffix(url: &Url, suffix: &str) -> bool {
    url.path().ends_with(suffix)
}
