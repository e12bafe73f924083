// ABOUTME: Next-link resolution: locate the outbound "next" anchor, absolutize and repair it.
// ABOUTME: Applies the profile's link overrides and terminal links after resolution.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::page::ParsedPage;
use crate::profile::compiled::CompiledProfile;

static REL_NEXT: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"a[rel~="next"][href]"#).unwrap());
static ANCHORS: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// Outcome of next-link resolution for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextLink {
    /// A link to fetch next.
    Follow(String),
    /// A link was found but is configured to end the chain.
    Terminal(String),
    /// No next link on the page.
    None,
}

impl NextLink {
    /// The link to fetch, if any.
    pub fn follow(&self) -> Option<&str> {
        match self {
            NextLink::Follow(link) => Some(link),
            _ => None,
        }
    }
}

/// Returns the next link to fetch, or an empty string when the chain ends here.
pub fn find_next(page: &ParsedPage, profile: &CompiledProfile) -> String {
    resolve_next(page, profile)
        .follow()
        .map(str::to_string)
        .unwrap_or_default()
}

/// Locates, resolves and classifies the page's next link.
pub fn resolve_next(page: &ParsedPage, profile: &CompiledProfile) -> NextLink {
    let Some(href) = locate_href(page, profile) else {
        debug!(page = %page.url(), "no next link");
        return NextLink::None;
    };

    let quoted = quote_url(href.trim());
    let resolved = match absolutize(&quoted, profile.base_url(), page.url()) {
        Ok(url) => url.to_string(),
        Err(err) => {
            warn!(page = %page.url(), href = %href, error = %err, "unusable next link");
            return NextLink::None;
        }
    };

    let link = match profile
        .link_override(&quoted)
        .or_else(|| profile.link_override(&resolved))
    {
        Some(fixed) => {
            debug!(from = %resolved, to = fixed, "link override applied");
            fixed.to_string()
        }
        None => resolved,
    };

    if profile.is_terminal(&link) || profile.is_terminal(&quoted) {
        debug!(link = %link, "terminal link reached");
        return NextLink::Terminal(link);
    }

    debug!(page = %page.url(), next = %link, "next link resolved");
    NextLink::Follow(link)
}

/// Resolves `href` against the page. A root-relative href under a profile
/// base URL gets the base as a literal prefix, so the base path is kept.
fn absolutize(href: &str, base: Option<&Url>, page: &Url) -> Result<Url, url::ParseError> {
    match base {
        Some(base) if href.starts_with('/') && !href.starts_with("//") => {
            Url::parse(&format!("{}{}", base.as_str().trim_end_matches('/'), href))
        }
        Some(base) => base.join(href),
        None => page.join(href),
    }
}

fn locate_href(page: &ParsedPage, profile: &CompiledProfile) -> Option<String> {
    let doc = page.document();
    let locator = profile.next_locator();

    if let Some(ref selector) = locator.selector {
        if let Some(href) = doc.select(selector).find_map(|a| href_of(&a)) {
            return Some(href);
        }
    }

    if locator.rel_next {
        if let Some(href) = doc.select(&REL_NEXT).find_map(|a| href_of(&a)) {
            return Some(href);
        }
    }

    if let Some(ref pattern) = locator.text {
        for anchor in doc.select(&ANCHORS) {
            let text: String = anchor.text().collect();
            if pattern.is_match(text.trim()) {
                if let Some(href) = href_of(&anchor) {
                    return Some(href);
                }
            }
        }
    }

    None
}

fn href_of(anchor: &ElementRef) -> Option<String> {
    anchor
        .value()
        .attr("href")
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
}

/// Percent-encodes characters that may not appear in a URL, leaving
/// reserved characters, `%` escapes and path separators as they are.
pub fn quote_url(link: &str) -> String {
    let mut out = String::with_capacity(link.len());
    for c in link.chars() {
        if c.is_ascii_alphanumeric() || "-._~:/?#[]@!$&'()*+,;=%".contains(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    out
}
