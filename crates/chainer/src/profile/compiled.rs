// ABOUTME: Validated, ready-to-run form of a SourceProfile with selectors and patterns compiled.
// ABOUTME: Compilation fails with a Profile error before any network activity.

use regex::Regex;
use scraper::Selector;
use url::Url;

use crate::cleanup::rules::{compile_pattern, parse_selector, CompiledRule};
use crate::error::ChainError;
use crate::profile::{NotesMode, SourceProfile};

/// Compiled next-link locators, tried in field order.
#[derive(Debug, Clone)]
pub struct NextLocator {
    pub selector: Option<Selector>,
    pub rel_next: bool,
    pub text: Option<Regex>,
}

/// A profile whose selectors, patterns and rules have been compiled.
#[derive(Debug, Clone)]
pub struct CompiledProfile {
    source: SourceProfile,
    start_url: Url,
    base_url: Option<Url>,
    next: NextLocator,
    title: Vec<Selector>,
    content: Vec<Selector>,
    rules: Vec<CompiledRule>,
    notes: Option<Regex>,
}

impl CompiledProfile {
    /// Compiles and validates `source`.
    pub fn compile(source: SourceProfile) -> Result<Self, ChainError> {
        let id = source.id.clone();
        let fail = |what: String, err: anyhow::Error| {
            ChainError::profile(id.clone(), "compile profile", Some(err.context(what)))
        };

        let start_url =
            Url::parse(&source.start_url).map_err(|e| fail("start_url".into(), e.into()))?;
        let base_url = source
            .base_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| fail("base_url".into(), e.into()))?;

        let next = NextLocator {
            selector: source
                .next_link
                .selector
                .as_deref()
                .map(parse_selector)
                .transpose()
                .map_err(|e| fail("next_link.selector".into(), e))?,
            rel_next: source.next_link.rel_next,
            text: source
                .next_link
                .text
                .as_deref()
                .map(compile_pattern)
                .transpose()
                .map_err(|e| fail("next_link.text".into(), e))?,
        };

        let title = compile_selectors(&source.title).map_err(|e| fail("title".into(), e))?;
        let content = compile_selectors(&source.content).map_err(|e| fail("content".into(), e))?;

        let mut rules = Vec::with_capacity(source.cleanup.len());
        let mut seen_markup = false;
        for (i, rule) in source.cleanup.iter().enumerate() {
            let compiled = rule
                .compile()
                .map_err(|e| fail(format!("cleanup[{}] ({})", i, rule.kind()), e))?;
            if compiled.is_tree() && seen_markup {
                return Err(fail(
                    format!("cleanup[{}] ({})", i, rule.kind()),
                    anyhow::anyhow!("tree rules must come before markup rules"),
                ));
            }
            seen_markup |= !compiled.is_tree();
            rules.push(compiled);
        }

        let notes = source
            .notes
            .as_ref()
            .map(|n| compile_pattern(&n.pattern))
            .transpose()
            .map_err(|e| fail("notes.pattern".into(), e))?;

        if !source.delay_secs.is_finite() || source.delay_secs < 0.0 {
            return Err(fail(
                "delay_secs".into(),
                anyhow::anyhow!("delay must be a non-negative number of seconds"),
            ));
        }

        Ok(Self {
            source,
            start_url,
            base_url,
            next,
            title,
            content,
            rules,
            notes,
        })
    }

    pub fn id(&self) -> &str {
        &self.source.id
    }

    pub fn name(&self) -> &str {
        &self.source.name
    }

    /// The profile this was compiled from.
    pub fn source(&self) -> &SourceProfile {
        &self.source
    }

    pub fn start_url(&self) -> &Url {
        &self.start_url
    }

    /// Prefix for relative links, if the profile declares one.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn next_locator(&self) -> &NextLocator {
        &self.next
    }

    pub fn title_selectors(&self) -> &[Selector] {
        &self.title
    }

    pub fn content_selectors(&self) -> &[Selector] {
        &self.content
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Whether the profile classifies notes pages at all.
    pub fn has_notes(&self) -> bool {
        self.notes.is_some()
    }

    /// Notes mode used when a run does not choose one.
    pub fn default_notes_mode(&self) -> Option<NotesMode> {
        self.source.notes.as_ref().map(|n| n.default_mode)
    }

    /// True if `title` marks a notes page under this profile.
    pub fn is_notes(&self, title: &str) -> bool {
        self.notes.as_ref().is_some_and(|re| re.is_match(title))
    }

    /// Corrected URL for a known-broken link.
    pub fn link_override(&self, link: &str) -> Option<&str> {
        self.source.link_overrides.get(link).map(String::as_str)
    }

    /// True if `link` ends the chain.
    pub fn is_terminal(&self, link: &str) -> bool {
        self.source.terminal_links.iter().any(|t| t == link)
    }

    pub fn title_separate(&self) -> bool {
        self.source.title_separate
    }

    pub fn delay_secs(&self) -> f64 {
        self.source.delay_secs
    }
}

fn compile_selectors(css: &[String]) -> anyhow::Result<Vec<Selector>> {
    css.iter().map(|s| parse_selector(s)).collect()
}
