// ABOUTME: Locates the title and content nodes of a page and derives the plain chapter title.
// ABOUTME: Missing nodes are tolerated: the title falls back to a sentinel, content to nothing.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use tracing::warn;

use crate::page::ParsedPage;
use crate::profile::compiled::CompiledProfile;
use crate::profile::NO_HEADLINE;

static TITLE_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:\s|&nbsp;)+").unwrap());

/// Title and content nodes located on a page.
#[derive(Debug, Clone, Copy)]
pub struct Extracted<'a> {
    pub title: Option<ElementRef<'a>>,
    pub content: Option<ElementRef<'a>>,
}

/// Finds the first node matching each of the profile's selector lists.
pub fn extract<'a>(page: &'a ParsedPage, profile: &CompiledProfile) -> Extracted<'a> {
    let title = first_match(page, profile.title_selectors());
    let content = first_match(page, profile.content_selectors());

    if title.is_none() {
        warn!(page = %page.url(), "no title node found");
    }
    if content.is_none() {
        warn!(page = %page.url(), "no content node found");
    }

    Extracted { title, content }
}

/// The first selector with a match wins; later selectors are fallbacks.
fn first_match<'a>(page: &'a ParsedPage, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors
        .iter()
        .find_map(|sel| page.document().select(sel).next())
}

/// Plain-text chapter title: all text under the node with whitespace
/// runs collapsed and trimmed, or the no-headline sentinel.
pub fn title_text(title: Option<&ElementRef>) -> String {
    match title {
        Some(el) => {
            let raw: String = el.text().collect();
            TITLE_SPACE_RE.replace_all(&raw, " ").trim().to_string()
        }
        None => NO_HEADLINE.to_string(),
    }
}
