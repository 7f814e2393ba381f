//! Portable text from canonical markup.
//!
//! The output is Markdown with GitHub table syntax, written with a fixed
//! rule set:
//!
//! | Markup                    | Output                          |
//! |---------------------------|---------------------------------|
//! | `h1`..`h6`                | `#`..`######` (ATX)             |
//! | `hr`                      | `---`                           |
//! | `ul` / `ol`               | `- item` / `1. item`            |
//! | `pre`                     | fenced code block with language |
//! | `blockquote`              | `> ` prefixed lines             |
//! | `strong` / `em` / `s`     | `**` / `_` / `~~`               |
//! | `code`                    | code span                       |
//! | `a`                       | `[text](href)`                  |
//! | `table`                   | grid table, header row first    |
//!
//! Whitespace is collapsed the way a browser would lay it out before any
//! rule runs, and text is escaped so it does not turn into Markdown syntax
//! by accident. Serialization is a pure function of its input.

use std::sync::OnceLock;

use regex::Regex;
use richmark_markup::{Element, Fragment, Node, is_void};

const BLOCK_ELEMENTS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "body",
    "center",
    "dd",
    "dir",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hgroup",
    "hr",
    "html",
    "li",
    "main",
    "menu",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "tbody",
    "td",
    "tfoot",
    "th",
    "thead",
    "tr",
    "ul",
];

fn is_block(name: &str) -> bool {
    BLOCK_ELEMENTS.contains(&name)
}

/// Serialize canonical markup to portable text.
pub fn serialize(canonical: &str) -> String {
    let mut fragment = Fragment::parse(canonical);
    collapse_whitespace(&mut fragment.nodes);
    join(&blocks(&fragment.nodes), false)
}

/// One rendered block and whether it is a list.
struct Rendered {
    text: String,
    list: bool,
}

fn push(out: &mut Vec<Rendered>, text: String, list: bool) {
    if !text.is_empty() {
        out.push(Rendered { text, list });
    }
}

/// Join blocks with blank lines. Inside a list item a nested list follows
/// its paragraph directly.
fn join(blocks: &[Rendered], in_list_item: bool) -> String {
    let mut out = String::new();
    for (index, block) in blocks.iter().enumerate() {
        if index > 0 {
            out.push_str(if in_list_item && block.list { "\n" } else { "\n\n" });
        }
        out.push_str(&block.text);
    }
    out
}

fn blocks(nodes: &[Node]) -> Vec<Rendered> {
    let mut out = Vec::new();
    let mut inline: Vec<&Node> = Vec::new();
    for node in nodes {
        match node {
            Node::Element(element) if is_block(&element.name) => {
                flush_inline(&mut inline, &mut out);
                block(element, &mut out);
            }
            Node::Comment(_) => {}
            other => inline.push(other),
        }
    }
    flush_inline(&mut inline, &mut out);
    out
}

fn flush_inline(inline: &mut Vec<&Node>, out: &mut Vec<Rendered>) {
    if inline.is_empty() {
        return;
    }
    let text = render_inline(inline.drain(..));
    push(out, trim_block(&text).to_string(), false);
}

fn trim_block(text: &str) -> &str {
    text.trim_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
}

fn block(element: &Element, out: &mut Vec<Rendered>) {
    let name = element.name.as_str();
    match name {
        "p" => {
            let text = render_inline(&element.children);
            push(out, trim_block(&text).to_string(), false);
        }
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name[1..].parse().unwrap_or(1);
            let text = render_inline(&element.children);
            let content = single_line(trim_block(&text));
            if !content.is_empty() {
                push(out, format!("{} {content}", "#".repeat(level)), false);
            }
        }
        "hr" => push(out, "---".to_string(), false),
        "blockquote" => push(out, quote(&join(&blocks(&element.children), false)), false),
        "ul" | "ol" => push(out, list(element), true),
        "pre" => push(out, fenced(element), false),
        "table" => push(out, table(element), false),
        _ => out.extend(blocks(&element.children)),
    }
}

fn single_line(text: &str) -> String {
    text.split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote(content: &str) -> String {
    content
        .lines()
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn list(element: &Element) -> String {
    let ordered = element.name == "ol";
    let start = element
        .attr("start")
        .and_then(|start| start.trim().parse::<usize>().ok())
        .unwrap_or(1);
    element
        .child_elements()
        .filter(|child| child.name == "li")
        .enumerate()
        .map(|(index, item)| {
            let marker = if ordered {
                format!("{}. ", start + index)
            } else {
                "- ".to_string()
            };
            list_item(&marker, &join(&blocks(&item.children), true))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Continuation lines line up with the text after the marker.
fn list_item(marker: &str, content: &str) -> String {
    if content.is_empty() {
        return marker.trim_end().to_string();
    }
    let indent = " ".repeat(marker.len());
    let mut out = marker.to_string();
    for (index, line) in content.lines().enumerate() {
        if index > 0 {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(&indent);
            }
        }
        out.push_str(line);
    }
    out
}

fn fenced(pre: &Element) -> String {
    static LANGUAGE_REGEX: OnceLock<Regex> = OnceLock::new();
    let language_regex = LANGUAGE_REGEX
        .get_or_init(|| Regex::new(r"language-(\S+)").expect("Invalid language regex"));

    let code = pre.child_elements().find(|child| child.name == "code");
    let language = code
        .and_then(|code| code.attr("class"))
        .and_then(|class| language_regex.captures(class))
        .and_then(|captures| captures.get(1))
        .map_or("", |language| language.as_str());
    let text = code.map_or_else(|| pre.text_content(), Element::text_content);

    // A fence must be longer than any fence-like run inside the code
    let longest = text
        .lines()
        .map(|line| line.chars().take_while(|&c| c == '`').count())
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(if longest >= 3 { longest + 1 } else { 3 });
    let body = text.strip_suffix('\n').unwrap_or(&text);
    format!("{fence}{language}\n{body}\n{fence}")
}

fn table(element: &Element) -> String {
    let mut rows: Vec<(&Element, bool)> = Vec::new();
    for child in element.child_elements() {
        match child.name.as_str() {
            "tr" => rows.push((child, false)),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .child_elements()
                    .filter(|row| row.name == "tr")
                    .map(|row| (row, child.name == "thead")),
            ),
            _ => {}
        }
    }

    let width = rows
        .iter()
        .map(|(row, _)| cells(row).count())
        .max()
        .unwrap_or(0);
    let Some(&(first, in_head)) = rows.first() else {
        return String::new();
    };
    if width == 0 {
        return String::new();
    }

    let header_row = in_head || is_heading_row(first);
    let mut lines = Vec::with_capacity(rows.len() + 2);
    let body = if header_row {
        lines.push(row_line(cells(first).map(cell_text).collect(), width));
        &rows[1..]
    } else {
        // Without a header row there is no table; give it an empty one
        lines.push(row_line(Vec::new(), width));
        &rows[..]
    };
    let aligns: Vec<Option<&str>> = if header_row {
        cells(first).map(|cell| cell.attr("align")).collect()
    } else {
        Vec::new()
    };
    lines.push(separator(&aligns, width));
    lines.extend(
        body.iter()
            .map(|(row, _)| row_line(cells(row).map(cell_text).collect(), width)),
    );
    lines.join("\n")
}

fn cells(row: &Element) -> impl Iterator<Item = &Element> {
    row.child_elements()
        .filter(|cell| cell.name == "td" || cell.name == "th")
}

fn is_heading_row(row: &Element) -> bool {
    let mut cells = cells(row).peekable();
    cells.peek().is_some() && cells.all(|cell| cell.name == "th")
}

fn row_line(mut cells: Vec<String>, width: usize) -> String {
    cells.resize(width, String::new());
    format!("| {} |", cells.join(" | "))
}

fn separator(aligns: &[Option<&str>], width: usize) -> String {
    let borders: Vec<&str> = (0..width)
        .map(|index| match aligns.get(index).copied().flatten() {
            Some(align) if align.eq_ignore_ascii_case("left") => ":--",
            Some(align) if align.eq_ignore_ascii_case("right") => "--:",
            Some(align) if align.eq_ignore_ascii_case("center") => ":-:",
            _ => "---",
        })
        .collect();
    format!("| {} |", borders.join(" | "))
}

/// Cell content on one line: breaks become `<br>` and pipes are escaped.
fn cell_text(cell: &Element) -> String {
    static BREAK_REGEX: OnceLock<Regex> = OnceLock::new();
    let break_regex =
        BREAK_REGEX.get_or_init(|| Regex::new(r" *\n+ *").expect("Invalid line break regex"));

    let content = join(&blocks(&cell.children), false);
    break_regex
        .replace_all(trim_block(&content), "<br>")
        .replace('|', r"\|")
}

fn render_inline<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> String {
    let mut out = String::new();
    for node in nodes {
        inline(node, &mut out);
    }
    out
}

fn inline(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(&escape(text)),
        Node::Comment(_) => {}
        Node::Element(element) => match element.name.as_str() {
            "br" => {
                let kept = out.trim_end_matches(' ').len();
                out.truncate(kept);
                out.push_str("  \n");
            }
            "strong" | "b" => flanked(&render_inline(&element.children), "**", "**", out),
            "em" | "i" => flanked(&render_inline(&element.children), "_", "_", out),
            "s" | "del" | "strike" => flanked(&render_inline(&element.children), "~~", "~~", out),
            "code" => code_span(element, out),
            "a" => link(element, out),
            "img" => image(element, out),
            _ => {
                for child in &element.children {
                    inline(child, out);
                }
            }
        },
    }
}

/// Wrap `content` in delimiters, keeping its edge spaces outside them.
fn flanked(content: &str, open: &str, close: &str, out: &mut String) {
    let trimmed = content.trim_matches(' ');
    if trimmed.is_empty() {
        out.push_str(content);
        return;
    }
    let leading = content.len() - content.trim_start_matches(' ').len();
    let trailing = content.trim_end_matches(' ').len();
    out.push_str(&content[..leading]);
    out.push_str(open);
    out.push_str(trimmed);
    out.push_str(close);
    out.push_str(&content[trailing..]);
}

fn code_span(element: &Element, out: &mut String) {
    let content = element
        .text_content()
        .replace("\r\n", " ")
        .replace(['\r', '\n'], " ");
    if content.is_empty() {
        return;
    }

    let runs = backtick_runs(&content);
    let mut length = 1;
    while runs.contains(&length) {
        length += 1;
    }
    let delimiter = "`".repeat(length);
    let padded = content.starts_with('`')
        || content.ends_with('`')
        || (content.starts_with(' ')
            && content.ends_with(' ')
            && content.chars().any(|c| c != ' '));
    let space = if padded { " " } else { "" };
    out.push_str(&format!("{delimiter}{space}{content}{space}{delimiter}"));
}

fn backtick_runs(text: &str) -> Vec<usize> {
    let mut runs = Vec::new();
    let mut current = 0;
    for c in text.chars() {
        if c == '`' {
            current += 1;
        } else if current > 0 {
            runs.push(current);
            current = 0;
        }
    }
    if current > 0 {
        runs.push(current);
    }
    runs
}

fn link(element: &Element, out: &mut String) {
    let content = render_inline(&element.children);
    let Some(href) = element.attr("href").filter(|href| !href.is_empty()) else {
        out.push_str(&content);
        return;
    };
    let href = href.replace('(', r"\(").replace(')', r"\)");
    let title = element
        .attr("title")
        .map(|title| format!(" \"{}\"", title.replace('"', "\\\"")))
        .unwrap_or_default();
    flanked(&content, "[", &format!("]({href}{title})"), out);
}

fn image(element: &Element, out: &mut String) {
    let Some(src) = element.attr("src").filter(|src| !src.is_empty()) else {
        return;
    };
    let alt = element.attr("alt").unwrap_or_default();
    let title = element
        .attr("title")
        .map(|title| format!(" \"{title}\""))
        .unwrap_or_default();
    out.push_str(&format!("![{alt}]({src}{title})"));
}

/// Backslash-escape text that would otherwise read as Markdown syntax.
fn escape(text: &str) -> String {
    static ESCAPES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    let escapes = ESCAPES.get_or_init(|| {
        [
            (r"\\", r"\\"),
            (r"\*", r"\*"),
            (r"^-", r"\-"),
            (r"^\+ ", r"\+ "),
            (r"^(=+)", r"\${1}"),
            (r"^(#{1,6}) ", r"\${1} "),
            (r"`", r"\`"),
            (r"^~~~", r"\~~~"),
            (r"\[", r"\["),
            (r"\]", r"\]"),
            (r"^>", r"\>"),
            (r"_", r"\_"),
            (r"^(\d+)\. ", r"${1}\. "),
        ]
        .into_iter()
        .map(|(pattern, replacement)| {
            (
                Regex::new(pattern).expect("Invalid escape regex"),
                replacement,
            )
        })
        .collect()
    });

    escapes
        .iter()
        .fold(text.to_string(), |text, (pattern, replacement)| {
            pattern.replace_all(&text, *replacement).into_owned()
        })
}

/// Collapse whitespace in place the way a browser lays text out.
///
/// Runs of spaces, tabs and newlines become one space. A space is dropped
/// at the start and end of a block, after another space and around line
/// breaks. Preformatted blocks are left alone.
fn collapse_whitespace(nodes: &mut [Node]) {
    Collapse::default().forward(nodes);
    trim_trailing(nodes, &mut true);
}

#[derive(Default)]
struct Collapse {
    /// Whether the last kept text ended in a space. `None` at the start of
    /// a block.
    previous: Option<bool>,
    /// Keep a leading space after inline content that is not text.
    keep_leading: bool,
}

impl Collapse {
    fn forward(&mut self, nodes: &mut [Node]) {
        for node in nodes {
            match node {
                Node::Text(text) => {
                    let mut collapsed = collapse_runs(text);
                    if collapsed.starts_with(' ')
                        && self.previous.is_none_or(|space| space)
                        && !self.keep_leading
                    {
                        collapsed.remove(0);
                    }
                    if !collapsed.is_empty() {
                        self.previous = Some(collapsed.ends_with(' '));
                    }
                    *text = collapsed;
                }
                Node::Element(element) => {
                    self.visit(&element.name);
                    if element.name != "pre" && !element.children.is_empty() {
                        self.forward(&mut element.children);
                        self.visit(&element.name);
                    }
                }
                Node::Comment(_) => {}
            }
        }
    }

    fn visit(&mut self, name: &str) {
        if is_block(name) || name == "br" {
            self.previous = None;
            self.keep_leading = false;
        } else if is_void(name) {
            self.previous = None;
            self.keep_leading = true;
        } else if self.previous.is_some() {
            self.keep_leading = false;
        }
    }
}

fn collapse_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if matches!(c, ' ' | '\t' | '\r' | '\n') {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// Drop the space that ends a text right before a block edge or a line
/// break. Walks backwards; `boundary` says whether one follows.
fn trim_trailing(nodes: &mut [Node], boundary: &mut bool) {
    for node in nodes.iter_mut().rev() {
        match node {
            Node::Text(text) => {
                if *boundary && text.ends_with(' ') {
                    text.pop();
                }
                if !text.is_empty() {
                    *boundary = false;
                }
            }
            Node::Element(element) => {
                let name = element.name.as_str();
                if is_block(name) || name == "br" {
                    *boundary = true;
                    if name != "pre" {
                        trim_trailing(&mut element.children, boundary);
                        *boundary = true;
                    }
                } else if is_void(name) {
                    *boundary = false;
                } else {
                    trim_trailing(&mut element.children, boundary);
                }
            }
            Node::Comment(_) => {}
        }
    }
}
