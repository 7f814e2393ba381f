//! Canonical form of editor markup.
//!
//! The editor decorates tables for its own resizing UI: a `colgroup` of
//! sized columns, inline widths, explicit spans, and a paragraph around the
//! text of every cell. None of that means anything once the markup leaves
//! the editor, and the cell paragraphs turn into blank lines downstream.
//! [`canonicalize`] removes it and leaves everything else alone.

use richmark_markup::{Element, Fragment, Node};

const TABLE_ELEMENTS: &[&str] = &["table", "thead", "tbody", "tfoot", "tr", "td", "th"];

const PRESENTATION_ATTRIBUTES: &[&str] = &[
    "style",
    "class",
    "colspan",
    "rowspan",
    "colwidth",
    "data-colwidth",
];

const SIZING_ELEMENTS: &[&str] = &["colgroup", "col"];

/// Strip editor-only table decoration from `markup`.
///
/// Idempotent: canonical markup canonicalizes to itself.
pub fn canonicalize(markup: &str) -> String {
    let mut fragment = Fragment::parse(markup);
    clean_nodes(&mut fragment.nodes);
    fragment.render()
}

fn clean_nodes(nodes: &mut Vec<Node>) {
    nodes.retain(|node| {
        !matches!(node, Node::Element(element) if SIZING_ELEMENTS.contains(&element.name.as_str()))
    });
    for node in nodes.iter_mut() {
        if let Node::Element(element) = node {
            clean_element(element);
        }
    }
}

fn clean_element(element: &mut Element) {
    if TABLE_ELEMENTS.contains(&element.name.as_str()) {
        element
            .attributes
            .retain(|attribute| !PRESENTATION_ATTRIBUTES.contains(&attribute.name.as_str()));
    }
    if matches!(element.name.as_str(), "td" | "th") {
        while let Some(inner) = take_sole_paragraph(&mut element.children) {
            element.children = inner;
        }
    }
    clean_nodes(&mut element.children);
}

/// Children of the only paragraph in `children`, ignoring whitespace
/// between tags. `None` when there is anything else next to it.
fn take_sole_paragraph(children: &mut Vec<Node>) -> Option<Vec<Node>> {
    let mut significant = children
        .iter()
        .enumerate()
        .filter(|(_, child)| !child.is_whitespace());
    let (index, only) = significant.next()?;
    if significant.next().is_some() || !only.is_element("p") {
        return None;
    }
    match children.swap_remove(index) {
        Node::Element(paragraph) => Some(paragraph.children),
        _ => None,
    }
}
