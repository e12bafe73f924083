// ABOUTME: Markup-stage cleanup: pattern and literal substitutions on serialized fragments.
// ABOUTME: Also handles entity unescaping and page-boundary wrapper trimming.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::cleanup::rules::MarkupRule;
use crate::cleanup::whitespace;

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(?:[a-zA-Z][a-zA-Z0-9]{1,31}|#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6});").unwrap()
});

/// Position of the page within the chain, for boundary-sensitive rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundaries {
    pub is_first: bool,
    pub is_last: bool,
}

/// Applies one markup rule to `text`.
pub fn apply(rule: &MarkupRule, text: &str, bounds: Boundaries) -> String {
    match rule {
        MarkupRule::Replace {
            pattern,
            replacement,
        } => pattern.replace_all(text, replacement.as_str()).into_owned(),
        MarkupRule::ReplaceLiteral {
            automaton,
            replacements,
        } => automaton.replace_all(text, replacements.as_slice()),
        MarkupRule::UnescapeEntities => unescape_entities(text).into_owned(),
        MarkupRule::NormalizeWhitespace { steps } => whitespace::normalize(text, steps),
        MarkupRule::TrimPageBoundaries { open, close } => {
            let mut out = Cow::Borrowed(text);
            if !bounds.is_first {
                out = Cow::Owned(open.replace_all(&out, "").into_owned());
            }
            if !bounds.is_last {
                out = Cow::Owned(close.replace_all(&out, "").into_owned());
            }
            out.into_owned()
        }
    }
}

/// Decodes character references into characters, except the ones that
/// would turn back into markup (`&lt;`, `&gt;`, `&amp;`, `&quot;`).
pub fn unescape_entities(text: &str) -> Cow<'_, str> {
    ENTITY_RE.replace_all(text, |caps: &Captures| {
        let entity = &caps[0];
        let decoded = html_escape::decode_html_entities(entity);
        match &*decoded {
            "<" | ">" | "&" | "\"" => entity.to_string(),
            _ => decoded.into_owned(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::rules::{CleanupRule, CompiledRule};
    use pretty_assertions::assert_eq;

    const MIDDLE: Boundaries = Boundaries {
        is_first: false,
        is_last: false,
    };

    fn markup(json: &str) -> MarkupRule {
        let rule: CleanupRule = serde_json::from_str(json).expect("deserialize");
        match rule.compile().expect("compile") {
            CompiledRule::Markup { rule, .. } => rule,
            other => panic!("not a markup rule: {:?}", other),
        }
    }

    #[test]
    fn excise_spans_lines() {
        let rule = markup(
            r#"{"type": "excise", "pattern": "<p><i>\\[If you like this story.+?update\\.\\]</i></p>"}"#,
        );
        let text = "<p>keep</p><p><i>[If you like this story,\nplease vote every update.]</i></p><p>end</p>";
        assert_eq!(apply(&rule, text, MIDDLE), "<p>keep</p><p>end</p>");
    }

    #[test]
    fn replace_keeps_captured_groups() {
        let rule = markup(
            r#"{"type": "replace", "pattern": "(<center><b>End of Book [^<]+)<.+(</b></center>)", "replacement": "${1}${2}"}"#,
        );
        let text = "<center><b>End of Book II<br />Happy holidays</b></center>";
        assert_eq!(
            apply(&rule, text, MIDDLE),
            "<center><b>End of Book II</b></center>"
        );
    }

    #[test]
    fn literal_pairs_apply_in_one_pass() {
        let rule = markup(
            r#"{"type": "replace_literal", "pairs": [["<grin>", "&lt;grin&gt;"], ["&lt;", "<"]]}"#,
        );
        assert_eq!(apply(&rule, "a <grin> b", MIDDLE), "a &lt;grin&gt; b");
    }

    #[test]
    fn unescape_keeps_markup_escapes() {
        assert_eq!(
            unescape_entities("caf&eacute; &amp; &lt;b&gt; &#8217;s&nbsp;x &bogus;"),
            "café &amp; &lt;b&gt; ’s\u{a0}x &bogus;"
        );
    }

    #[test]
    fn boundary_trimming_by_position() {
        let rule = markup(r#"{"type": "trim_page_boundaries", "tag": "body"}"#);
        let page = "<body><p>x</p></body>";
        let first = Boundaries {
            is_first: true,
            is_last: false,
        };
        let last = Boundaries {
            is_first: false,
            is_last: true,
        };
        assert_eq!(apply(&rule, page, first), "<body><p>x</p>");
        assert_eq!(apply(&rule, page, MIDDLE), "<p>x</p>");
        assert_eq!(apply(&rule, page, last), "<p>x</p></body>");

        let attributed = r#"<BODY bgcolor="white"><p>y</p></BODY >"#;
        assert_eq!(apply(&rule, attributed, MIDDLE), "<p>y</p>");
    }
}
