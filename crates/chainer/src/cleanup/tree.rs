// ABOUTME: Tree-stage cleanup: structural removals and attribute rewrites on parsed nodes.
// ABOUTME: Edits are recorded as a skip set and attribute overrides, applied at serialization.

use std::collections::{HashMap, HashSet};

use ego_tree::NodeId;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Node, Selector};
use url::Url;

use crate::cleanup::rules::TreeRule;

static FRAGMENT_HREF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^#]*)#(.+)$").unwrap());

/// Element names that never render text but are content in their own right.
const CONTENT_VOIDS: &[&str] = &["img", "br", "hr", "iframe", "video", "audio", "object", "embed"];

/// Pending edits for one extracted subtree.
#[derive(Debug, Default)]
pub struct TreeEdits {
    removed: HashSet<NodeId>,
    attrs: HashMap<NodeId, Vec<(String, String)>>,
}

impl TreeEdits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the node was removed directly.
    pub fn is_removed(&self, id: NodeId) -> bool {
        self.removed.contains(&id)
    }

    /// Number of removed subtrees.
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    /// Attribute value after edits, falling back to the parsed value.
    pub fn attr<'a>(&'a self, element: &'a ElementRef, name: &str) -> Option<&'a str> {
        if let Some(overrides) = self.attrs.get(&element.id()) {
            if let Some((_, value)) = overrides.iter().find(|(n, _)| n == name) {
                return Some(value.as_str());
            }
        }
        element.value().attr(name)
    }

    /// Overridden attributes for a node, if any.
    pub fn overrides(&self, id: NodeId) -> Option<&[(String, String)]> {
        self.attrs.get(&id).map(Vec::as_slice)
    }

    fn remove(&mut self, id: NodeId) {
        self.removed.insert(id);
    }

    fn set_attr(&mut self, id: NodeId, name: &str, value: String) {
        let entry = self.attrs.entry(id).or_default();
        match entry.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => entry.push((name.to_string(), value)),
        }
    }

    /// True if the element or any ancestor up to `root` was removed.
    fn is_gone(&self, element: &ElementRef, root: &ElementRef) -> bool {
        if self.removed.contains(&element.id()) {
            return true;
        }
        for ancestor in element.ancestors() {
            if ancestor.id() == root.id() {
                break;
            }
            if self.removed.contains(&ancestor.id()) {
                return true;
            }
        }
        false
    }
}

/// Rendered text of an element, ignoring removed subtrees.
pub fn visible_text(element: &ElementRef, edits: &TreeEdits) -> String {
    let mut out = String::new();
    collect_text(**element, edits, &mut out);
    out
}

fn collect_text(node: ego_tree::NodeRef<Node>, edits: &TreeEdits, out: &mut String) {
    for child in node.children() {
        if edits.is_removed(child.id()) {
            continue;
        }
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => collect_text(child, edits, out),
            _ => {}
        }
    }
}

/// True if the element still holds an image or other non-text content.
fn has_visible_void(element: &ElementRef, edits: &TreeEdits) -> bool {
    element.descendants().skip(1).any(|node| {
        if edits.is_removed(node.id()) {
            return false;
        }
        match node.value() {
            Node::Element(el) => {
                CONTENT_VOIDS.contains(&el.name())
                    && !node.ancestors().any(|a| edits.is_removed(a.id()))
            }
            _ => false,
        }
    })
}

/// Context a tree rule may need.
#[derive(Debug, Clone, Copy)]
pub struct TreeContext<'a> {
    /// Base for resolving relative image sources.
    pub base: Option<&'a Url>,
}

/// Applies one tree rule to the descendants of `root`, returning how many
/// nodes it touched.
pub fn apply(rule: &TreeRule, root: &ElementRef, edits: &mut TreeEdits, ctx: TreeContext) -> usize {
    match rule {
        TreeRule::Remove { selector, text } => remove_matching(root, selector, text.as_ref(), edits),
        TreeRule::RemoveEmpty { tags } => remove_empty(root, tags, edits),
        TreeRule::RewriteFragmentLinks => rewrite_fragment_links(root, edits),
        TreeRule::AbsolutizeImages => absolutize_images(root, ctx.base, edits),
    }
}

fn remove_matching(
    root: &ElementRef,
    selector: &Selector,
    text: Option<&Regex>,
    edits: &mut TreeEdits,
) -> usize {
    let mut hits = Vec::new();
    for element in root.select(selector) {
        if edits.is_gone(&element, root) {
            continue;
        }
        if let Some(pattern) = text {
            if !pattern.is_match(&visible_text(&element, edits)) {
                continue;
            }
        }
        hits.push(element.id());
    }
    let count = hits.len();
    for id in hits {
        edits.remove(id);
    }
    count
}

fn remove_empty(root: &ElementRef, tags: &[String], edits: &mut TreeEdits) -> usize {
    let mut hits = Vec::new();
    for node in root.descendants().skip(1) {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        let name = element.value().name();
        if CONTENT_VOIDS.contains(&name) || !tags.iter().any(|t| t == name) {
            continue;
        }
        if edits.is_gone(&element, root) {
            continue;
        }
        if visible_text(&element, edits).trim().is_empty() && !has_visible_void(&element, edits) {
            hits.push(element.id());
        }
    }
    let count = hits.len();
    for id in hits {
        edits.remove(id);
    }
    count
}

fn rewrite_fragment_links(root: &ElementRef, edits: &mut TreeEdits) -> usize {
    let mut rewrites = Vec::new();
    for node in root.descendants().skip(1) {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        if element.value().name() != "a" || edits.is_gone(&element, root) {
            continue;
        }
        let Some(href) = edits.attr(&element, "href") else {
            continue;
        };
        if href.starts_with("http") {
            continue;
        }
        if let Some(caps) = FRAGMENT_HREF_RE.captures(href) {
            let rewritten = format!("#{}", &caps[2]);
            if rewritten != href {
                rewrites.push((element.id(), rewritten));
            }
        }
    }
    let count = rewrites.len();
    for (id, href) in rewrites {
        edits.set_attr(id, "href", href);
    }
    count
}

fn absolutize_images(root: &ElementRef, base: Option<&Url>, edits: &mut TreeEdits) -> usize {
    let Some(base) = base else {
        return 0;
    };
    let mut rewrites = Vec::new();
    for node in root.descendants().skip(1) {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        if element.value().name() != "img" || edits.is_gone(&element, root) {
            continue;
        }
        let Some(src) = edits.attr(&element, "src") else {
            continue;
        };
        if src.starts_with("http") {
            continue;
        }
        let absolute = match base.join(src) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}{}", base, src),
        };
        rewrites.push((element.id(), absolute));
    }
    let count = rewrites.len();
    for (id, src) in rewrites {
        edits.set_attr(id, "src", src);
    }
    count
}
