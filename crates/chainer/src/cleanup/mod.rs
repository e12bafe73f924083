// ABOUTME: Cleanup pipeline turning extracted title/content nodes into final markup fragments.
// ABOUTME: Runs a profile's tree rules, serializes the survivors, then runs its markup rules.

//! Cleanup pipeline.
//!
//! A profile's rules run in two stages. Tree rules (removals, link and
//! image rewrites) edit the parsed nodes; their edits are recorded and
//! honoured when the fragment is serialized. Markup rules (region excision,
//! substitutions, entity unescaping, whitespace normalization, boundary
//! trimming) then rewrite the serialized strings in profile order.
//! Rules that match nothing are no-ops.

pub mod markup;
pub mod rules;
pub mod serialize;
pub mod tree;
pub mod whitespace;

use scraper::ElementRef;
use tracing::debug;
use url::Url;

use crate::cleanup::markup::Boundaries;
use crate::cleanup::rules::{CompiledRule, Target};
use crate::cleanup::tree::{TreeContext, TreeEdits};
use crate::profile::compiled::CompiledProfile;

/// Where the page sits in the chain.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    /// URL the page was fetched from.
    pub url: &'a Url,
    /// True for the first page of the run.
    pub is_first: bool,
    /// True when no further page will be fetched after this one.
    pub is_last: bool,
}

/// Cleaned fragments of one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanedChapter {
    /// Serialized title element; empty when the page had none.
    pub title_html: String,
    /// Serialized content element; empty when the page had none.
    pub content_html: String,
}

/// Runs the profile's cleanup rules over the extracted nodes.
pub fn clean(
    title: Option<ElementRef>,
    content: Option<ElementRef>,
    profile: &CompiledProfile,
    ctx: &PageContext,
) -> CleanedChapter {
    let base = profile.base_url().unwrap_or(ctx.url);
    let bounds = Boundaries {
        is_first: ctx.is_first,
        is_last: ctx.is_last,
    };

    CleanedChapter {
        title_html: title
            .map(|el| clean_fragment(&el, Target::title, profile.rules(), base, bounds))
            .unwrap_or_default(),
        content_html: content
            .map(|el| clean_fragment(&el, Target::content, profile.rules(), base, bounds))
            .unwrap_or_default(),
    }
}

fn clean_fragment(
    root: &ElementRef,
    applies: fn(&Target) -> bool,
    rules: &[CompiledRule],
    base: &Url,
    bounds: Boundaries,
) -> String {
    let mut edits = TreeEdits::new();
    let ctx = TreeContext { base: Some(base) };

    for rule in rules {
        if let CompiledRule::Tree { target, rule } = rule {
            if applies(target) {
                let touched = tree::apply(rule, root, &mut edits, ctx);
                debug!(rule = rule_name(rule), touched, "tree rule applied");
            }
        }
    }

    debug!(removed = edits.removed_count(), "tree stage done");
    let mut html = serialize::outer_html(root, &edits);

    for rule in rules {
        if let CompiledRule::Markup { target, rule } = rule {
            if applies(target) {
                html = markup::apply(rule, &html, bounds);
            }
        }
    }

    html
}

fn rule_name(rule: &rules::TreeRule) -> &'static str {
    match rule {
        rules::TreeRule::Remove { .. } => "remove",
        rules::TreeRule::RemoveEmpty { .. } => "remove_empty",
        rules::TreeRule::RewriteFragmentLinks => "rewrite_fragment_links",
        rules::TreeRule::AbsolutizeImages => "absolutize_images",
    }
}
