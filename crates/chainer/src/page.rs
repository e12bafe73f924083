// ABOUTME: ParsedPage, the tree-queryable form of one fetched page.
// ABOUTME: Lives for a single chain iteration and is never held across an await point.

use scraper::Html;
use url::Url;

/// A parsed page together with the URL it was fetched from.
#[derive(Debug)]
pub struct ParsedPage {
    url: Url,
    document: Html,
}

impl ParsedPage {
    /// Parses `markup` as a full HTML document.
    pub fn parse(url: Url, markup: &str) -> Self {
        Self {
            url,
            document: Html::parse_document(markup),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn document(&self) -> &Html {
        &self.document
    }
}
