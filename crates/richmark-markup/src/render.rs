//! Rendering a tree back to markup text.

use crate::tree::{Element, Node};

/// Render a sequence of nodes to markup.
///
/// Attributes keep their order, values are double-quoted, and void elements
/// are written without an end tag. Rendering a parsed tree and parsing the
/// result again yields the same tree.
pub fn render(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

pub fn render_element(element: &Element) -> String {
    let mut out = String::new();
    write_element(&mut out, element);
    out
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Element(element) => write_element(out, element),
        Node::Text(text) => out.push_str(&html_escape::encode_text(text)),
        Node::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
    }
}

fn write_element(out: &mut String, element: &Element) {
    out.push('<');
    out.push_str(&element.name);
    for attr in &element.attributes {
        out.push(' ');
        out.push_str(&attr.name);
        if let Some(value) = &attr.value {
            out.push_str("=\"");
            out.push_str(&html_escape::encode_double_quoted_attribute(value));
            out.push('"');
        }
    }
    out.push('>');

    if element.is_void() {
        return;
    }

    for child in &element.children {
        write_node(out, child);
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Fragment;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_attributes_in_order() {
        let element = Element::new("a")
            .with_attr("target", "_blank")
            .with_attr("href", "https://example.com/?q=\"x\"")
            .with_child(Node::text("a & b"));
        assert_eq!(
            render_element(&element),
            r#"<a target="_blank" href="https://example.com/?q=&quot;x&quot;">a &amp; b</a>"#
        );
    }

    #[test]
    fn void_elements_have_no_end_tag() {
        let element = Element::new("p")
            .with_child(Node::text("one"))
            .with_child(Element::new("br"))
            .with_child(Node::text("two"));
        assert_eq!(render_element(&element), "<p>one<br>two</p>");
    }

    #[test]
    fn render_parse_render_is_stable() {
        let inputs = [
            "<p>Hello <strong>world</strong></p>",
            "<table><tbody><tr><td>1 &lt; 2</td></tr></tbody></table>",
            "<p>a<br>b</p><hr><!-- note -->",
            "<ul><li><p>unclosed",
        ];
        for input in inputs {
            let once = Fragment::parse(input).render();
            let twice = Fragment::parse(&once).render();
            assert_eq!(once, twice, "unstable render for {input:?}");
        }
    }
}
