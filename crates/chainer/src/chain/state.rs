// ABOUTME: Chain walk state: the pending link, the visited set and the page counter.
// ABOUTME: Decides after each page whether the chain advances or terminates, and why.

use std::collections::HashSet;
use std::fmt;

use crate::extractors::NextLink;

/// Why a chain ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The last page had no next link.
    NoNextLink,
    /// The next link is configured as the end of the serial.
    TerminalLink(String),
    /// The next link points at a page already fetched in this run.
    Revisited(String),
    /// The configured page limit was reached.
    PageLimit(u64),
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::NoNextLink => write!(f, "no next link found"),
            Termination::TerminalLink(link) => write!(f, "reached the final link {}", link),
            Termination::Revisited(link) => write!(f, "next link {} was already downloaded", link),
            Termination::PageLimit(n) => write!(f, "page limit of {} reached", n),
        }
    }
}

/// What happens after the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Advance(String),
    Stop(Termination),
}

impl Step {
    /// True when the current page is the final one.
    pub fn is_last(&self) -> bool {
        matches!(self, Step::Stop(_))
    }
}

/// Mutable state of one chain walk.
#[derive(Debug)]
pub struct ChainState {
    next: String,
    visited: HashSet<String>,
    seq: u64,
}

impl ChainState {
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            next: start.into(),
            visited: HashSet::new(),
            seq: 0,
        }
    }

    /// Claims the pending link for a new page. Returns its sequence number
    /// and URL, or `None` when nothing is pending.
    pub fn begin_page(&mut self) -> Option<(u64, String)> {
        if self.next.is_empty() {
            return None;
        }
        let link = std::mem::take(&mut self.next);
        self.visited.insert(link.clone());
        self.seq += 1;
        Some((self.seq, link))
    }

    /// Records an additional URL for the current page, such as a redirect target.
    pub fn mark_visited(&mut self, url: &str) {
        self.visited.insert(url.to_string());
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Number of pages begun so far.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Decides what follows the current page.
    pub fn classify(&self, next: &NextLink, page_limit: Option<u64>) -> Step {
        match next {
            NextLink::None => Step::Stop(Termination::NoNextLink),
            NextLink::Terminal(link) => Step::Stop(Termination::TerminalLink(link.clone())),
            NextLink::Follow(link) if self.is_visited(link) => {
                Step::Stop(Termination::Revisited(link.clone()))
            }
            NextLink::Follow(_) if page_limit.is_some_and(|limit| self.seq >= limit) => {
                Step::Stop(Termination::PageLimit(self.seq))
            }
            NextLink::Follow(link) => Step::Advance(link.clone()),
        }
    }

    /// Makes `link` the pending link.
    pub fn advance(&mut self, link: String) {
        self.next = link;
    }
}
