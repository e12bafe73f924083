// ABOUTME: Whitespace normalization for serialized chapter markup.
// ABOUTME: Steps are applied in order and repeated until the text stops changing.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// One whitespace normalization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhitespaceStep {
    /// 2-4 spaces after punctuation, an entity or an inline tag become one.
    CollapseAfterPunctuation,
    /// ` <i> ` becomes `<i> `.
    TrimAroundInlineTags,
    /// A non-breaking space right after punctuation or an entity is dropped.
    DropNbspAfterPunctuation,
    /// Runs of line breaks become one.
    CollapseLineBreaks,
    /// No space directly after an opening quote.
    NoSpaceAfterOpeningQuote,
}

impl WhitespaceStep {
    pub const ALL: [WhitespaceStep; 5] = [
        WhitespaceStep::CollapseAfterPunctuation,
        WhitespaceStep::TrimAroundInlineTags,
        WhitespaceStep::DropNbspAfterPunctuation,
        WhitespaceStep::CollapseLineBreaks,
        WhitespaceStep::NoSpaceAfterOpeningQuote,
    ];

    fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match self {
            WhitespaceStep::CollapseAfterPunctuation => collapse_after_punctuation(text),
            WhitespaceStep::TrimAroundInlineTags => trim_around_inline_tags(text),
            WhitespaceStep::DropNbspAfterPunctuation => drop_nbsp_after_punctuation(text),
            WhitespaceStep::CollapseLineBreaks => LINE_BREAKS_RE.replace_all(text, "\n"),
            WhitespaceStep::NoSpaceAfterOpeningQuote => OPENING_QUOTE_RE.replace_all(text, "$q"),
        }
    }
}

// Every step only ever shortens the text, so the loop in `normalize` ends.
const MAX_PASSES: usize = 32;

// A whitespace unit: any Unicode space (incl. U+00A0) or the &nbsp; entity.
const WS: &str = r"(?:\s|&nbsp;)";

// Character references other than the whitespace ones are treated like punctuation.
const ENTITY: &str = r"&(?:[a-zA-Z][a-zA-Z0-9]{1,9}|#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6});";

// Inline formatting tags, opening or closing.
const INLINE_TAG: &str = r"</?(?:b|i|em|del|strong|span)>";

static COLLAPSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?P<lead>{ENTITY}|{INLINE_TAG}|[,.;:!?…’”a-zA-Z0-9])(?P<run>{WS}{{2,}})"
    ))
    .unwrap()
});

static WS_UNIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(WS).unwrap());

static AROUND_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?P<extra_before>{WS})?{WS}(?P<tag>{INLINE_TAG}){WS}(?P<extra_after>{WS})?"
    ))
    .unwrap()
});

static NBSP_AFTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?P<lead>{ENTITY}|[,.;:!?…’”])(?:\u{{a0}}|&nbsp;)"
    ))
    .unwrap()
});

static LINE_BREAKS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:\r?\n[ \t]*){2,}").unwrap());

static OPENING_QUOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?P<q>‘|“|&lsquo;|&ldquo;){WS}+")).unwrap());

/// Entities that stand for a space themselves and must not act as a lead.
fn is_space_entity(lead: &str) -> bool {
    lead.starts_with('&') && lead.ends_with("sp;")
}

fn collapse_after_punctuation(text: &str) -> Cow<'_, str> {
    COLLAPSE_RE.replace_all(text, |caps: &Captures| {
        let lead = &caps["lead"];
        let run = &caps["run"];
        let units = WS_UNIT_RE.find_iter(run).count();
        if is_space_entity(lead) || units > 4 {
            format!("{}{}", lead, run)
        } else {
            format!("{} ", lead)
        }
    })
}

fn trim_around_inline_tags(text: &str) -> Cow<'_, str> {
    AROUND_TAG_RE.replace_all(text, |caps: &Captures| {
        let whole = &caps[0];
        if caps.name("extra_before").is_some() || caps.name("extra_after").is_some() {
            whole.to_string()
        } else {
            format!("{} ", &caps["tag"])
        }
    })
}

fn drop_nbsp_after_punctuation(text: &str) -> Cow<'_, str> {
    NBSP_AFTER_RE.replace_all(text, |caps: &Captures| {
        let lead = &caps["lead"];
        if is_space_entity(lead) {
            caps[0].to_string()
        } else {
            lead.to_string()
        }
    })
}

/// Applies `steps` in order, repeating the sequence until nothing changes.
///
/// The result is a fixed point: normalizing it again returns it unchanged.
pub fn normalize(text: &str, steps: &[WhitespaceStep]) -> String {
    let mut current = text.to_string();
    for _ in 0..MAX_PASSES {
        let mut next = current.clone();
        for step in steps {
            if let Cow::Owned(changed) = step.apply(&next) {
                next = changed;
            }
        }
        if next == current {
            break;
        }
        current = next;
    }
    current
}
