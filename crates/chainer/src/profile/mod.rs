// ABOUTME: Source profile data models and the profile registry.
// ABOUTME: A profile describes how to walk and clean one serial; profiles are plain serde data.

//! Source profiles.
//!
//! A [`SourceProfile`] is static configuration for one publication: where the
//! chain starts, how to find the "next" link, which nodes hold the title and
//! the chapter body, and the ordered cleanup rules for that source's markup.
//! Profiles are data (JSON), so a new source is added by writing a profile,
//! not by adding code paths. [`compiled::CompiledProfile`] is the validated,
//! ready-to-run form.

pub mod compiled;
pub mod loader;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cleanup::rules::CleanupRule;

/// Anchor text accepted as a "next" link when no `rel="next"` anchor exists.
pub const DEFAULT_NEXT_TEXT: &str = r"Next(?:(?:\s|&nbsp;)+Chapter)?";

/// Title used when a page has no locatable headline.
pub const NO_HEADLINE: &str = "<No Page Headline>";

/// What to do with pages classified as notes (author commentary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotesMode {
    /// Drop notes pages entirely.
    Omit,
    /// Collect notes pages and put them after the story.
    Append,
    /// Keep notes pages between chapters in publication order.
    #[default]
    #[serde(alias = "chrono", alias = "chronological")]
    Interleave,
}

impl NotesMode {
    /// Suffix used in default output file names.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            NotesMode::Omit => "omitted",
            NotesMode::Append => "appended",
            NotesMode::Interleave => "chronological",
        }
    }
}

impl fmt::Display for NotesMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotesMode::Omit => "omit",
            NotesMode::Append => "append",
            NotesMode::Interleave => "chrono",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for NotesMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "omit" => Ok(NotesMode::Omit),
            "append" => Ok(NotesMode::Append),
            "chrono" | "chronological" | "interleave" => Ok(NotesMode::Interleave),
            other => Err(format!(
                "unknown notes mode '{}' (expected omit, append or chrono)",
                other
            )),
        }
    }
}

/// How to locate the outbound "next page" link.
///
/// Locators are tried in order: `selector`, then an anchor carrying
/// `rel="next"`, then an anchor whose text matches `text`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextLinkSpec {
    /// CSS selector for the anchor, tried first.
    #[serde(default)]
    pub selector: Option<String>,
    /// Whether to look for `<a rel="next">`.
    #[serde(default = "default_true")]
    pub rel_next: bool,
    /// Regex matched (case sensitive) against anchor text.
    #[serde(default)]
    pub text: Option<String>,
}

impl Default for NextLinkSpec {
    fn default() -> Self {
        Self {
            selector: None,
            rel_next: true,
            text: Some(DEFAULT_NEXT_TEXT.to_string()),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Notes classification for sources that publish author commentary pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesSpec {
    /// Regex searched in the cleaned page title.
    pub pattern: String,
    /// Mode used when the run does not override it.
    #[serde(default)]
    pub default_mode: NotesMode,
}

/// A complete profile for one serial.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourceProfile {
    /// Identifier used to select the profile (case sensitive).
    pub id: String,
    /// Human readable serial name, used in the output envelope.
    pub name: String,
    /// URL of the serial's first page.
    pub start_url: String,
    /// Prefix for resolving relative links; the page URL is used when absent.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Next link locator.
    #[serde(default)]
    pub next_link: NextLinkSpec,
    /// Title selectors, tried in order.
    #[serde(default)]
    pub title: Vec<String>,
    /// Content selectors, tried in order.
    #[serde(default)]
    pub content: Vec<String>,
    /// Ordered cleanup rules.
    #[serde(default)]
    pub cleanup: Vec<CleanupRule>,
    /// Optional notes classification.
    #[serde(default)]
    pub notes: Option<NotesSpec>,
    /// Seconds to wait between fetches.
    #[serde(default)]
    pub delay_secs: f64,
    /// Output file name; derived from `name` when absent.
    #[serde(default)]
    pub output_file: Option<String>,
    /// Write the title fragment ahead of the content fragment.
    #[serde(default)]
    pub title_separate: bool,
    /// Known-broken link corrections (exact match).
    #[serde(default)]
    pub link_overrides: BTreeMap<String, String>,
    /// Links that end the chain when reached.
    #[serde(default)]
    pub terminal_links: Vec<String>,
}

impl SourceProfile {
    /// The generic profile used for ad-hoc URL runs: default link rules,
    /// positional headline, whole body, no cleanup.
    pub fn generic(start_url: impl Into<String>, output_file: impl Into<String>) -> Self {
        Self {
            id: "Serial".to_string(),
            name: "Serial".to_string(),
            start_url: start_url.into(),
            title: vec!["h1".to_string(), "h2".to_string()],
            content: vec!["body".to_string()],
            output_file: Some(output_file.into()),
            ..Default::default()
        }
    }

    /// Output file name for the given notes mode.
    pub fn output_file_for(&self, mode: Option<NotesMode>) -> String {
        if let Some(ref file) = self.output_file {
            return file.clone();
        }
        match (self.notes.as_ref(), mode) {
            (Some(_), Some(mode)) => format!("{}-Notes_{}.html", self.name, mode.file_suffix()),
            _ => format!("{}.html", self.name),
        }
    }
}

/// Registry for looking up profiles by id.
#[derive(Debug, Default, Clone)]
pub struct ProfileRegistry {
    map: BTreeMap<String, SourceProfile>,
}

impl ProfileRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a profile, replacing any profile with the same id.
    pub fn register(&mut self, profile: SourceProfile) {
        self.map.insert(profile.id.clone(), profile);
    }

    /// Looks up a profile by id.
    pub fn get(&self, id: &str) -> Option<&SourceProfile> {
        self.map.get(id)
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    /// Iterates over registered profiles in id order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceProfile> {
        self.map.values()
    }

    /// Returns the number of registered profiles.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if no profiles are registered.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
