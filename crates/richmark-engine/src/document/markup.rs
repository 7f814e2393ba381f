//! Conversion between the document model and structural markup.
//!
//! Output follows the conventions of the browser editor the product was
//! built on: tables carry a `colgroup` and explicit spans, cells wrap their
//! content in paragraphs, links open in a new browsing context. Input is
//! forgiving and accepts both that raw form and the canonical form produced
//! by the export pipeline.

use richmark_markup::{Element, Fragment, Node, render};

use super::model::{
    Align, Block, Cell, HeadingLevel, ListItem, MAX_COLSPAN, MAX_ROWSPAN, Marks, Row, Table,
    TextBlock, TextRun,
};

/// Minimum rendered width of a table column, in pixels.
const CELL_MIN_WIDTH: usize = 25;

const LINK_TARGET: &str = "_blank";
const LINK_REL: &str = "noopener noreferrer nofollow";

/// Render blocks as structural markup.
pub fn to_markup(blocks: &[Block]) -> String {
    render(&block_nodes(blocks))
}

/// Read structural markup into blocks. Never empty: markup with no content
/// yields a single empty paragraph.
pub fn from_markup(markup: &str) -> Vec<Block> {
    let fragment = Fragment::parse(markup);
    let blocks = blocks_from_nodes(&fragment.nodes);
    if blocks.is_empty() {
        vec![Block::empty_paragraph()]
    } else {
        blocks
    }
}

fn block_nodes(blocks: &[Block]) -> Vec<Node> {
    blocks.iter().map(|block| block_node(block).into()).collect()
}

fn block_node(block: &Block) -> Element {
    match block {
        Block::Paragraph(text) => aligned(Element::new("p"), text.align).with_children(inline_nodes(text)),
        Block::Heading(level, text) => {
            aligned(Element::new(level.tag()), text.align).with_children(inline_nodes(text))
        }
        Block::CodeBlock { language, text } => {
            let mut code = Element::new("code");
            if let Some(language) = language {
                code.set_attr("class", format!("language-{language}"));
            }
            let content = text.text();
            if !content.is_empty() {
                code = code.with_child(Node::text(content));
            }
            Element::new("pre").with_child(code)
        }
        Block::Blockquote(children) => Element::new("blockquote").with_children(block_nodes(children)),
        Block::BulletList(items) => list_element("ul", items),
        Block::OrderedList(items) => list_element("ol", items),
        Block::HorizontalRule => Element::new("hr"),
        Block::Table(table) => table_element(table),
    }
}

fn aligned(element: Element, align: Align) -> Element {
    if align == Align::Left {
        element
    } else {
        element.with_attr("style", format!("text-align: {}", align.as_str()))
    }
}

fn list_element(name: &str, items: &[ListItem]) -> Element {
    Element::new(name).with_children(
        items
            .iter()
            .map(|item| Element::new("li").with_children(block_nodes(&item.blocks)).into()),
    )
}

fn table_element(table: &Table) -> Element {
    let width = table.map().width;
    let colgroup = Element::new("colgroup").with_children((0..width).map(|_| {
        Element::new("col")
            .with_attr("style", format!("min-width: {CELL_MIN_WIDTH}px"))
            .into()
    }));
    let body = Element::new("tbody").with_children(table.rows.iter().map(|row| {
        Element::new("tr")
            .with_children(row.cells.iter().map(|cell| cell_element(cell).into()))
            .into()
    }));
    Element::new("table")
        .with_attr("style", format!("min-width: {}px", width * CELL_MIN_WIDTH))
        .with_child(colgroup)
        .with_child(body)
}

fn cell_element(cell: &Cell) -> Element {
    Element::new(if cell.header { "th" } else { "td" })
        .with_attr("colspan", cell.colspan.to_string())
        .with_attr("rowspan", cell.rowspan.to_string())
        .with_children(block_nodes(&cell.blocks))
}

/// Marks in nesting order, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
enum InlineMark {
    Link(String),
    Bold,
    Code,
    Italic,
    Strike,
    Underline,
}

impl InlineMark {
    fn ordered(marks: &Marks) -> Vec<InlineMark> {
        let mut ordered = Vec::new();
        if let Some(href) = &marks.link {
            ordered.push(InlineMark::Link(href.clone()));
        }
        let flags = [
            (marks.bold, InlineMark::Bold),
            (marks.code, InlineMark::Code),
            (marks.italic, InlineMark::Italic),
            (marks.strike, InlineMark::Strike),
            (marks.underline, InlineMark::Underline),
        ];
        ordered.extend(flags.into_iter().filter_map(|(on, mark)| on.then_some(mark)));
        ordered
    }

    fn element(&self) -> Element {
        match self {
            InlineMark::Link(href) => Element::new("a")
                .with_attr("target", LINK_TARGET)
                .with_attr("rel", LINK_REL)
                .with_attr("href", href.as_str()),
            InlineMark::Bold => Element::new("strong"),
            InlineMark::Code => Element::new("code"),
            InlineMark::Italic => Element::new("em"),
            InlineMark::Strike => Element::new("s"),
            InlineMark::Underline => Element::new("u"),
        }
    }
}

/// Inline content of a text block. A mark shared by neighbouring runs stays
/// open across them instead of being closed and reopened.
fn inline_nodes(text: &TextBlock) -> Vec<Node> {
    let mut root: Vec<Node> = Vec::new();
    let mut open: Vec<(InlineMark, Element)> = Vec::new();

    for run in &text.runs {
        let marks = InlineMark::ordered(&run.marks);
        let keep = open
            .iter()
            .zip(&marks)
            .take_while(|((open_mark, _), mark)| open_mark == *mark)
            .count();
        while open.len() > keep {
            close_mark(&mut open, &mut root);
        }
        for mark in &marks[keep..] {
            open.push((mark.clone(), mark.element()));
        }

        for (index, line) in run.text.split('\n').enumerate() {
            if index > 0 {
                push_inline(&mut open, &mut root, Element::new("br").into());
            }
            if !line.is_empty() {
                push_inline(&mut open, &mut root, Node::text(line));
            }
        }
    }
    while !open.is_empty() {
        close_mark(&mut open, &mut root);
    }
    root
}

fn push_inline(open: &mut [(InlineMark, Element)], root: &mut Vec<Node>, node: Node) {
    match open.last_mut() {
        Some((_, parent)) => parent.children.push(node),
        None => root.push(node),
    }
}

fn close_mark(open: &mut Vec<(InlineMark, Element)>, root: &mut Vec<Node>) {
    if let Some((_, element)) = open.pop() {
        push_inline(open, root, element.into());
    }
}

const CONTAINER_ELEMENTS: &[&str] = &[
    "div", "section", "article", "main", "header", "footer", "nav", "aside", "figure", "body",
    "html", "li", "td", "th",
];

fn is_block_element(name: &str) -> bool {
    matches!(
        name,
        "p" | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "pre"
            | "blockquote"
            | "ul"
            | "ol"
            | "hr"
            | "table"
    ) || CONTAINER_ELEMENTS.contains(&name)
}

fn blocks_from_nodes(nodes: &[Node]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut loose: Vec<&Node> = Vec::new();
    for node in nodes {
        match node {
            Node::Element(element) if is_block_element(&element.name) => {
                flush_loose(&mut loose, &mut blocks);
                read_block(element, &mut blocks);
            }
            Node::Comment(_) => {}
            other => loose.push(other),
        }
    }
    flush_loose(&mut loose, &mut blocks);
    blocks
}

/// Inline content found between blocks becomes its own paragraph.
fn flush_loose(loose: &mut Vec<&Node>, blocks: &mut Vec<Block>) {
    if loose.is_empty() {
        return;
    }
    let text = text_block(loose.drain(..), Align::Left);
    if !text.is_empty() {
        blocks.push(Block::Paragraph(text));
    }
}

fn read_block(element: &Element, blocks: &mut Vec<Block>) {
    let name = element.name.as_str();
    match name {
        "p" => blocks.push(Block::Paragraph(text_block(&element.children, alignment(element)))),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name[1..]
                .parse()
                .ok()
                .and_then(HeadingLevel::new)
                .unwrap_or(HeadingLevel::H1);
            blocks.push(Block::Heading(
                level,
                text_block(&element.children, alignment(element)),
            ));
        }
        "pre" => blocks.push(Block::CodeBlock {
            language: code_language(element),
            text: TextBlock::plain(&element.text_content()),
        }),
        "blockquote" => blocks.push(Block::Blockquote(non_empty(blocks_from_nodes(
            &element.children,
        )))),
        "ul" => blocks.push(Block::BulletList(list_items(element))),
        "ol" => blocks.push(Block::OrderedList(list_items(element))),
        "hr" => blocks.push(Block::HorizontalRule),
        "table" => {
            if let Some(table) = read_table(element) {
                blocks.push(Block::Table(table));
            }
        }
        _ => blocks.extend(blocks_from_nodes(&element.children)),
    }
}

fn non_empty(blocks: Vec<Block>) -> Vec<Block> {
    if blocks.is_empty() {
        vec![Block::empty_paragraph()]
    } else {
        blocks
    }
}

fn alignment(element: &Element) -> Align {
    element
        .attr("style")
        .into_iter()
        .flat_map(|style| style.split(';'))
        .filter_map(|declaration| declaration.split_once(':'))
        .find(|(property, _)| property.trim().eq_ignore_ascii_case("text-align"))
        .and_then(|(_, value)| Align::parse(value))
        .unwrap_or_default()
}

fn code_language(pre: &Element) -> Option<String> {
    pre.child_elements()
        .filter(|child| child.name == "code")
        .chain(std::iter::once(pre))
        .filter_map(|element| element.attr("class"))
        .flat_map(str::split_whitespace)
        .find_map(|class| class.strip_prefix("language-"))
        .map(str::to_string)
}

fn list_items(list: &Element) -> Vec<ListItem> {
    let mut items = Vec::new();
    for node in &list.children {
        match node {
            Node::Element(item) if item.name == "li" => {
                items.push(ListItem::new(non_empty(blocks_from_nodes(&item.children))));
            }
            Node::Comment(_) => {}
            other if other.is_whitespace() => {}
            other => {
                let blocks = blocks_from_nodes(std::slice::from_ref(other));
                if !blocks.is_empty() {
                    items.push(ListItem::new(blocks));
                }
            }
        }
    }
    if items.is_empty() {
        items.push(ListItem::new(vec![Block::empty_paragraph()]));
    }
    items
}

fn read_table(element: &Element) -> Option<Table> {
    let mut table = Table::default();
    for child in element.child_elements() {
        match child.name.as_str() {
            "tr" => table.rows.push(read_row(child)),
            "thead" | "tbody" | "tfoot" => table.rows.extend(
                child
                    .child_elements()
                    .filter(|row| row.name == "tr")
                    .map(read_row),
            ),
            _ => {}
        }
    }
    table.normalize();
    (!table.rows.is_empty()).then_some(table)
}

fn read_row(row: &Element) -> Row {
    Row {
        cells: row
            .child_elements()
            .filter(|cell| cell.name == "td" || cell.name == "th")
            .map(|cell| Cell {
                header: cell.name == "th",
                colspan: span(cell, "colspan", MAX_COLSPAN),
                rowspan: span(cell, "rowspan", MAX_ROWSPAN),
                blocks: non_empty(blocks_from_nodes(&cell.children)),
            })
            .collect(),
    }
}

fn span(cell: &Element, name: &str, max: usize) -> usize {
    cell.attr(name)
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, max)
}

/// Collect inline content into a text block, collapsing whitespace the way
/// a browser lays it out.
fn text_block<'a>(nodes: impl IntoIterator<Item = &'a Node>, align: Align) -> TextBlock {
    let mut runs = Vec::new();
    let mut after_space = true;
    for node in nodes {
        collect_runs(node, &Marks::default(), &mut after_space, &mut runs);
    }
    // Trailing whitespace is not rendered
    while let Some(last) = runs.last_mut() {
        let trimmed = last.text.trim_end_matches(' ').len();
        last.text.truncate(trimmed);
        if !last.text.is_empty() {
            break;
        }
        runs.pop();
    }
    TextBlock::from_runs(runs).aligned(align)
}

fn collect_runs(node: &Node, marks: &Marks, after_space: &mut bool, runs: &mut Vec<TextRun>) {
    match node {
        Node::Text(text) => {
            let mut collapsed = String::with_capacity(text.len());
            for c in text.chars() {
                if matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0C') {
                    if !*after_space {
                        collapsed.push(' ');
                        *after_space = true;
                    }
                } else {
                    collapsed.push(c);
                    *after_space = false;
                }
            }
            runs.push(TextRun::new(collapsed, marks.clone()));
        }
        Node::Element(element) if element.name == "br" => {
            if let Some(last) = runs.last_mut() {
                let trimmed = last.text.trim_end_matches(' ').len();
                last.text.truncate(trimmed);
            }
            runs.push(TextRun::new("\n", marks.clone()));
            *after_space = true;
        }
        Node::Element(element) => {
            let mut marks = marks.clone();
            match element.name.as_str() {
                "strong" | "b" => marks.bold = true,
                "em" | "i" => marks.italic = true,
                "u" => marks.underline = true,
                "s" | "del" | "strike" => marks.strike = true,
                "code" => marks.code = true,
                "a" => {
                    if let Some(href) = element.attr("href") {
                        marks.link = Some(href.to_string());
                    }
                }
                _ => {}
            }
            for child in &element.children {
                collect_runs(child, &marks, after_space, runs);
            }
        }
        Node::Comment(_) => {}
    }
}
