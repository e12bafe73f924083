// ABOUTME: Serializes an extracted element back to markup, honoring pending tree edits.
// ABOUTME: Removed subtrees are skipped and attribute overrides replace the parsed values.

use scraper::{ElementRef, Node};

use crate::cleanup::tree::TreeEdits;

/// Serializes `element` (including its own tag) with `edits` applied.
pub fn outer_html(element: &ElementRef, edits: &TreeEdits) -> String {
    let mut output = String::new();
    serialize_node(**element, edits, &mut output);
    output
}

fn serialize_node(node: ego_tree::NodeRef<Node>, edits: &TreeEdits, output: &mut String) {
    if edits.is_removed(node.id()) {
        return;
    }

    match node.value() {
        Node::Text(text) => {
            let raw_parent = node
                .parent()
                .and_then(|p| p.value().as_element().map(|el| is_raw_text_element(el.name())))
                .unwrap_or(false);
            if raw_parent {
                output.push_str(&**text);
            } else {
                output.push_str(&escape_text(text));
            }
        }
        Node::Element(el) => {
            let tag_name = el.name();

            output.push('<');
            output.push_str(tag_name);

            let overrides = edits.overrides(node.id()).unwrap_or(&[]);
            for (name, value) in el.attrs() {
                let value = overrides
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, v)| v.as_str())
                    .unwrap_or(value);
                push_attr(output, name, value);
            }
            for (name, value) in overrides {
                if el.attr(name).is_none() {
                    push_attr(output, name, value);
                }
            }

            if is_void_element(tag_name) {
                output.push_str(" />");
            } else {
                output.push('>');
                for child in node.children() {
                    serialize_node(child, edits, output);
                }
                output.push_str("</");
                output.push_str(tag_name);
                output.push('>');
            }
        }
        Node::Comment(comment) => {
            output.push_str("<!--");
            output.push_str(&**comment);
            output.push_str("-->");
        }
        _ => {}
    }
}

fn push_attr(output: &mut String, name: &str, value: &str) {
    output.push(' ');
    output.push_str(name);
    output.push_str("=\"");
    output.push_str(&html_escape::encode_double_quoted_attribute(value));
    output.push('"');
}

/// Escapes `&`, `<` and `>` in text. Non-breaking spaces stay literal characters.
fn escape_text(text: &str) -> std::borrow::Cow<'_, str> {
    html_escape::encode_text(text)
}

fn is_raw_text_element(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

/// Checks if a tag is a void element (self-closing in HTML5).
fn is_void_element(tag: &str) -> bool {
    matches!(
        tag.to_ascii_lowercase().as_str(),
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}
