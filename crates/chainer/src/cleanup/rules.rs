// ABOUTME: Cleanup rule data models (serde) and their compiled, validated form.
// ABOUTME: Tree rules edit the parsed nodes; markup rules rewrite the serialized strings.

use aho_corasick::{AhoCorasick, MatchKind};
use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::cleanup::whitespace::WhitespaceStep;

/// Which extracted fragment a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Title,
    #[default]
    Content,
    Both,
}

impl Target {
    pub fn title(&self) -> bool {
        matches!(self, Target::Title | Target::Both)
    }

    pub fn content(&self) -> bool {
        matches!(self, Target::Content | Target::Both)
    }
}

/// Tags checked by `remove_empty` when the rule lists none.
pub const DEFAULT_EMPTY_TAGS: &[&str] = &[
    "p", "div", "span", "b", "i", "em", "strong", "font", "center", "small",
];

/// One cleanup step, as written in profile data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CleanupRule {
    /// Remove elements matching `selector` (and, if set, whose rendered text
    /// matches the `text` regex), including descendants.
    Remove {
        selector: String,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        target: Target,
    },
    /// Remove listed elements whose rendered text is empty or all whitespace.
    RemoveEmpty {
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        target: Target,
    },
    /// Point relative `href="page.html#frag"` links at `#frag`.
    RewriteFragmentLinks {
        #[serde(default)]
        target: Target,
    },
    /// Resolve relative `img src` against the base URL.
    AbsolutizeImages {
        #[serde(default)]
        target: Target,
    },
    /// Delete every match of a multi-line pattern.
    Excise {
        pattern: String,
        #[serde(default)]
        target: Target,
    },
    /// Replace every match of a multi-line pattern (`${1}` style references).
    Replace {
        pattern: String,
        replacement: String,
        #[serde(default)]
        target: Target,
    },
    /// Exact string substitutions, applied in one pass.
    ReplaceLiteral {
        pairs: Vec<(String, String)>,
        #[serde(default)]
        target: Target,
    },
    /// Turn character references into characters, keeping markup escapes.
    UnescapeEntities {
        #[serde(default)]
        target: Target,
    },
    /// Whitespace normalization; all steps when `steps` is empty.
    NormalizeWhitespace {
        #[serde(default)]
        steps: Vec<WhitespaceStep>,
        #[serde(default)]
        target: Target,
    },
    /// Drop the wrapper's opening tag except on the first page and its
    /// closing tag except on the last page.
    TrimPageBoundaries {
        tag: String,
        #[serde(default)]
        target: Target,
    },
}

impl CleanupRule {
    pub fn target(&self) -> Target {
        match self {
            CleanupRule::Remove { target, .. }
            | CleanupRule::RemoveEmpty { target, .. }
            | CleanupRule::RewriteFragmentLinks { target }
            | CleanupRule::AbsolutizeImages { target }
            | CleanupRule::Excise { target, .. }
            | CleanupRule::Replace { target, .. }
            | CleanupRule::ReplaceLiteral { target, .. }
            | CleanupRule::UnescapeEntities { target }
            | CleanupRule::NormalizeWhitespace { target, .. }
            | CleanupRule::TrimPageBoundaries { target, .. } => *target,
        }
    }

    /// Short rule name used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            CleanupRule::Remove { .. } => "remove",
            CleanupRule::RemoveEmpty { .. } => "remove_empty",
            CleanupRule::RewriteFragmentLinks { .. } => "rewrite_fragment_links",
            CleanupRule::AbsolutizeImages { .. } => "absolutize_images",
            CleanupRule::Excise { .. } => "excise",
            CleanupRule::Replace { .. } => "replace",
            CleanupRule::ReplaceLiteral { .. } => "replace_literal",
            CleanupRule::UnescapeEntities { .. } => "unescape_entities",
            CleanupRule::NormalizeWhitespace { .. } => "normalize_whitespace",
            CleanupRule::TrimPageBoundaries { .. } => "trim_page_boundaries",
        }
    }

    /// Compiles the rule's selectors and patterns.
    pub fn compile(&self) -> anyhow::Result<CompiledRule> {
        let target = self.target();
        let compiled = match self {
            CleanupRule::Remove { selector, text, .. } => CompiledRule::Tree {
                target,
                rule: TreeRule::Remove {
                    selector: parse_selector(selector)?,
                    text: text.as_deref().map(compile_pattern).transpose()?,
                },
            },
            CleanupRule::RemoveEmpty { tags, .. } => {
                let tags = if tags.is_empty() {
                    DEFAULT_EMPTY_TAGS.iter().map(|t| t.to_string()).collect()
                } else {
                    tags.iter().map(|t| t.to_ascii_lowercase()).collect()
                };
                CompiledRule::Tree {
                    target,
                    rule: TreeRule::RemoveEmpty { tags },
                }
            }
            CleanupRule::RewriteFragmentLinks { .. } => CompiledRule::Tree {
                target,
                rule: TreeRule::RewriteFragmentLinks,
            },
            CleanupRule::AbsolutizeImages { .. } => CompiledRule::Tree {
                target,
                rule: TreeRule::AbsolutizeImages,
            },
            CleanupRule::Excise { pattern, .. } => CompiledRule::Markup {
                target,
                rule: MarkupRule::Replace {
                    pattern: compile_region(pattern)?,
                    replacement: String::new(),
                },
            },
            CleanupRule::Replace {
                pattern,
                replacement,
                ..
            } => CompiledRule::Markup {
                target,
                rule: MarkupRule::Replace {
                    pattern: compile_region(pattern)?,
                    replacement: replacement.clone(),
                },
            },
            CleanupRule::ReplaceLiteral { pairs, .. } => {
                if pairs.iter().any(|(from, _)| from.is_empty()) {
                    anyhow::bail!("replace_literal: empty search string");
                }
                let automaton = AhoCorasick::builder()
                    .match_kind(MatchKind::LeftmostFirst)
                    .build(pairs.iter().map(|(from, _)| from.as_str()))?;
                CompiledRule::Markup {
                    target,
                    rule: MarkupRule::ReplaceLiteral {
                        automaton,
                        replacements: pairs.iter().map(|(_, to)| to.clone()).collect(),
                    },
                }
            }
            CleanupRule::UnescapeEntities { .. } => CompiledRule::Markup {
                target,
                rule: MarkupRule::UnescapeEntities,
            },
            CleanupRule::NormalizeWhitespace { steps, .. } => CompiledRule::Markup {
                target,
                rule: MarkupRule::NormalizeWhitespace {
                    steps: if steps.is_empty() {
                        WhitespaceStep::ALL.to_vec()
                    } else {
                        steps.clone()
                    },
                },
            },
            CleanupRule::TrimPageBoundaries { tag, .. } => {
                if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric()) {
                    anyhow::bail!("trim_page_boundaries: invalid tag name {:?}", tag);
                }
                let tag = regex::escape(tag);
                CompiledRule::Markup {
                    target,
                    rule: MarkupRule::TrimPageBoundaries {
                        open: Regex::new(&format!(r"(?i)<{}\b[^>]*>", tag))?,
                        close: Regex::new(&format!(r"(?i)</{}\s*>", tag))?,
                    },
                }
            }
        };
        Ok(compiled)
    }
}

/// A rule ready to run.
#[derive(Debug, Clone)]
pub enum CompiledRule {
    Tree { target: Target, rule: TreeRule },
    Markup { target: Target, rule: MarkupRule },
}

impl CompiledRule {
    pub fn is_tree(&self) -> bool {
        matches!(self, CompiledRule::Tree { .. })
    }
}

/// Rules applied to the parsed nodes before serialization.
#[derive(Debug, Clone)]
pub enum TreeRule {
    Remove {
        selector: Selector,
        text: Option<Regex>,
    },
    RemoveEmpty {
        tags: Vec<String>,
    },
    RewriteFragmentLinks,
    AbsolutizeImages,
}

/// Rules applied to the serialized markup strings.
#[derive(Debug, Clone)]
pub enum MarkupRule {
    Replace {
        pattern: Regex,
        replacement: String,
    },
    ReplaceLiteral {
        automaton: AhoCorasick,
        replacements: Vec<String>,
    },
    UnescapeEntities,
    NormalizeWhitespace {
        steps: Vec<WhitespaceStep>,
    },
    TrimPageBoundaries {
        open: Regex,
        close: Regex,
    },
}

/// Parses a CSS selector, turning the borrowed parse error into an owned one.
pub fn parse_selector(css: &str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|err| anyhow::anyhow!("invalid selector {:?}: {}", css, err))
}

/// Compiles a single-line pattern.
pub fn compile_pattern(pattern: &str) -> anyhow::Result<Regex> {
    Regex::new(pattern).map_err(|err| anyhow::anyhow!("invalid pattern {:?}: {}", pattern, err))
}

/// Compiles a region pattern: `.` also matches line breaks.
fn compile_region(pattern: &str) -> anyhow::Result<Regex> {
    compile_pattern(&format!("(?s){}", pattern))
}
