//! Block and inline model of a rich-text document.
//!
//! A document is a list of [`Block`]s. Text lives in [`TextBlock`]s made of
//! [`TextRun`]s, each carrying a set of [`Marks`]. Offsets inside a text
//! block count `char`s, not bytes. A hard line break is a `'\n'` inside a
//! run.
//!
//! Blocks are addressed by paths of indices. Each container consumes a fixed
//! number of path steps before its children:
//!
//! | Container      | Steps | Meaning              |
//! |----------------|-------|----------------------|
//! | document root  | 1     | block index          |
//! | block quote    | 1     | child index          |
//! | list           | 2     | item, child index    |
//! | table          | 3     | row, cell, child     |

use std::ops::Range;

use serde::Serialize;

/// Inline formatting that is either on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkKind {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
}

impl MarkKind {
    pub const ALL: [MarkKind; 5] = [
        MarkKind::Bold,
        MarkKind::Italic,
        MarkKind::Underline,
        MarkKind::Strike,
        MarkKind::Code,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
}

impl HeadingLevel {
    pub const ALL: [HeadingLevel; 6] = [
        HeadingLevel::H1,
        HeadingLevel::H2,
        HeadingLevel::H3,
        HeadingLevel::H4,
        HeadingLevel::H5,
        HeadingLevel::H6,
    ];

    pub fn new(level: u8) -> Option<Self> {
        Self::ALL.get(usize::from(level).checked_sub(1)?).copied()
    }

    /// 1 for `H1` through 6 for `H6`.
    pub fn level(self) -> u8 {
        self as u8 + 1
    }

    pub fn tag(self) -> &'static str {
        ["h1", "h2", "h3", "h4", "h5", "h6"][self as usize]
    }
}

/// Horizontal alignment of a paragraph or heading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Align {
    pub const ALL: [Align; 4] = [Align::Left, Align::Center, Align::Right, Align::Justify];

    pub fn as_str(self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
            Align::Justify => "justify",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|align| align.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

/// The marks carried by a run of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Marks {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub code: bool,
    pub link: Option<String>,
}

impl Marks {
    pub fn has(&self, kind: MarkKind) -> bool {
        match kind {
            MarkKind::Bold => self.bold,
            MarkKind::Italic => self.italic,
            MarkKind::Underline => self.underline,
            MarkKind::Strike => self.strike,
            MarkKind::Code => self.code,
        }
    }

    pub fn set(&mut self, kind: MarkKind, on: bool) {
        match kind {
            MarkKind::Bold => self.bold = on,
            MarkKind::Italic => self.italic = on,
            MarkKind::Underline => self.underline = on,
            MarkKind::Strike => self.strike = on,
            MarkKind::Code => self.code = on,
        }
    }

    pub fn with(mut self, kind: MarkKind) -> Self {
        self.set(kind, true);
        self
    }

    pub fn with_link(mut self, href: impl Into<String>) -> Self {
        self.link = Some(href.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub marks: Marks,
}

impl TextRun {
    pub fn new(text: impl Into<String>, marks: Marks) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Marks::default())
    }

    fn len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Text content of a paragraph, heading or code block.
///
/// Runs are kept normalized: no empty runs and no two neighbouring runs with
/// equal marks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBlock {
    pub align: Align,
    pub runs: Vec<TextRun>,
}

impl TextBlock {
    pub fn plain(text: &str) -> Self {
        Self::from_runs(vec![TextRun::plain(text)])
    }

    pub fn from_runs(runs: Vec<TextRun>) -> Self {
        let mut block = Self {
            align: Align::Left,
            runs,
        };
        block.normalize();
        block
    }

    pub fn aligned(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.runs.iter().map(TextRun::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Drop empty runs and merge neighbours with equal marks.
    pub fn normalize(&mut self) {
        let mut merged: Vec<TextRun> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            if run.text.is_empty() {
                continue;
            }
            match merged.last_mut() {
                Some(last) if last.marks == run.marks => last.text.push_str(&run.text),
                _ => merged.push(run),
            }
        }
        self.runs = merged;
    }

    /// Runs overlapping `range`, with their absolute char spans.
    pub fn spans(&self, range: Range<usize>) -> impl Iterator<Item = (Range<usize>, &TextRun)> {
        let mut pos = 0;
        self.runs.iter().filter_map(move |run| {
            let span = pos..pos + run.len();
            pos = span.end;
            (span.start < range.end && span.end > range.start).then_some((span, run))
        })
    }

    /// Marks a caret at `offset` picks up: those of the char before it, or
    /// of the first char at the start of the block.
    pub fn marks_at(&self, offset: usize) -> Marks {
        let probe = offset.saturating_sub(1);
        self.spans(probe..probe + 1)
            .next()
            .map(|(_, run)| run.marks.clone())
            .unwrap_or_default()
    }

    /// Whether every char in `range` satisfies `predicate`. False for an
    /// empty range.
    pub fn all_marks(&self, range: Range<usize>, predicate: impl Fn(&Marks) -> bool) -> bool {
        let mut spans = self.spans(range).peekable();
        spans.peek().is_some() && spans.all(|(_, run)| predicate(&run.marks))
    }

    /// Apply `update` to the marks of every char in `range`. Returns whether
    /// anything changed.
    pub fn update_marks(&mut self, range: Range<usize>, mut update: impl FnMut(&mut Marks)) -> bool {
        if range.is_empty() {
            return false;
        }
        let start = self.split_at(range.start);
        let end = self.split_at(range.end);
        let mut changed = false;
        for run in &mut self.runs[start..end] {
            let before = run.marks.clone();
            update(&mut run.marks);
            changed |= before != run.marks;
        }
        self.normalize();
        changed
    }

    pub fn insert(&mut self, offset: usize, text: &str, marks: Marks) {
        if text.is_empty() {
            return;
        }
        let index = self.split_at(offset);
        self.runs.insert(index, TextRun::new(text, marks));
        self.normalize();
    }

    pub fn delete(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        let start = self.split_at(range.start);
        let end = self.split_at(range.end);
        self.runs.drain(start..end);
        self.normalize();
    }

    /// The contiguous range around `offset` carrying the same link.
    ///
    /// The char after the caret wins over the char before it.
    pub fn link_range(&self, offset: usize) -> Option<Range<usize>> {
        let spans: Vec<(Range<usize>, &TextRun)> = self.spans(0..usize::MAX).collect();
        let linked = |index: usize| spans[index].1.marks.link.is_some();
        let hit = spans
            .iter()
            .position(|(span, _)| span.contains(&offset))
            .filter(|&i| linked(i))
            .or_else(|| {
                let before = offset.checked_sub(1)?;
                spans
                    .iter()
                    .position(|(span, _)| span.contains(&before))
                    .filter(|&i| linked(i))
            })?;

        let href = &spans[hit].1.marks.link;
        let mut first = hit;
        while first > 0 && &spans[first - 1].1.marks.link == href {
            first -= 1;
        }
        let mut last = hit;
        while last + 1 < spans.len() && &spans[last + 1].1.marks.link == href {
            last += 1;
        }
        Some(spans[first].0.start..spans[last].0.end)
    }

    /// Plain copy of the text with every mark removed.
    pub fn stripped(&self) -> TextBlock {
        TextBlock::plain(&self.text())
    }

    /// Split runs so one starts at `offset`; returns its index.
    fn split_at(&mut self, offset: usize) -> usize {
        let mut pos = 0;
        for index in 0..self.runs.len() {
            if offset == pos {
                return index;
            }
            let len = self.runs[index].len();
            if offset < pos + len {
                let run = &mut self.runs[index];
                let byte = run
                    .text
                    .char_indices()
                    .nth(offset - pos)
                    .map_or(run.text.len(), |(byte, _)| byte);
                let tail = run.text.split_off(byte);
                let marks = run.marks.clone();
                self.runs.insert(index + 1, TextRun::new(tail, marks));
                return index + 1;
            }
            pos += len;
        }
        self.runs.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(TextBlock),
    Heading(HeadingLevel, TextBlock),
    CodeBlock {
        language: Option<String>,
        text: TextBlock,
    },
    Blockquote(Vec<Block>),
    BulletList(Vec<ListItem>),
    OrderedList(Vec<ListItem>),
    HorizontalRule,
    Table(Table),
}

impl Block {
    pub fn paragraph(text: &str) -> Self {
        Block::Paragraph(TextBlock::plain(text))
    }

    pub fn empty_paragraph() -> Self {
        Block::Paragraph(TextBlock::default())
    }

    pub fn heading(level: HeadingLevel, text: &str) -> Self {
        Block::Heading(level, TextBlock::plain(text))
    }

    pub fn text_block(&self) -> Option<&TextBlock> {
        match self {
            Block::Paragraph(text) | Block::Heading(_, text) | Block::CodeBlock { text, .. } => {
                Some(text)
            }
            _ => None,
        }
    }

    pub fn text_block_mut(&mut self) -> Option<&mut TextBlock> {
        match self {
            Block::Paragraph(text) | Block::Heading(_, text) | Block::CodeBlock { text, .. } => {
                Some(text)
            }
            _ => None,
        }
    }

    /// Paragraph with no text.
    pub fn is_blank(&self) -> bool {
        matches!(self, Block::Paragraph(text) if text.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub blocks: Vec<Block>,
}

impl ListItem {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn paragraph(text: &str) -> Self {
        Self::new(vec![Block::paragraph(text)])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

/// Widest column span a cell can take, as browsers cap `colspan`.
pub const MAX_COLSPAN: usize = 1000;
/// Tallest row span a cell can take, as browsers cap `rowspan`.
pub const MAX_ROWSPAN: usize = 65534;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub header: bool,
    pub colspan: usize,
    pub rowspan: usize,
    pub blocks: Vec<Block>,
}

impl Cell {
    pub fn empty(header: bool) -> Self {
        Self::with_blocks(header, vec![Block::empty_paragraph()])
    }

    pub fn with_blocks(header: bool, blocks: Vec<Block>) -> Self {
        Self {
            header,
            colspan: 1,
            rowspan: 1,
            blocks,
        }
    }

    /// A cell holding nothing but one empty paragraph.
    pub fn is_blank(&self) -> bool {
        matches!(self.blocks.as_slice(), [only] if only.is_blank())
    }
}

/// The list of blocks a container path points into.
///
/// `prefix` is a block path with its final index removed.
pub fn container<'a>(blocks: &'a [Block], prefix: &[usize]) -> Option<&'a [Block]> {
    let Some((&first, rest)) = prefix.split_first() else {
        return Some(blocks);
    };
    match blocks.get(first)? {
        Block::Blockquote(children) => container(children, rest),
        Block::BulletList(items) | Block::OrderedList(items) => {
            let (&item, rest) = rest.split_first()?;
            container(&items.get(item)?.blocks, rest)
        }
        Block::Table(table) => {
            let (&row, rest) = rest.split_first()?;
            let (&cell, rest) = rest.split_first()?;
            container(&table.rows.get(row)?.cells.get(cell)?.blocks, rest)
        }
        _ => None,
    }
}

pub fn container_mut<'a>(blocks: &'a mut Vec<Block>, prefix: &[usize]) -> Option<&'a mut Vec<Block>> {
    let Some((&first, rest)) = prefix.split_first() else {
        return Some(blocks);
    };
    match blocks.get_mut(first)? {
        Block::Blockquote(children) => container_mut(children, rest),
        Block::BulletList(items) | Block::OrderedList(items) => {
            let (&item, rest) = rest.split_first()?;
            container_mut(&mut items.get_mut(item)?.blocks, rest)
        }
        Block::Table(table) => {
            let (&row, rest) = rest.split_first()?;
            let (&cell, rest) = rest.split_first()?;
            container_mut(&mut table.rows.get_mut(row)?.cells.get_mut(cell)?.blocks, rest)
        }
        _ => None,
    }
}

pub fn block_at<'a>(blocks: &'a [Block], path: &[usize]) -> Option<&'a Block> {
    let (&last, prefix) = path.split_last()?;
    container(blocks, prefix)?.get(last)
}

pub fn block_at_mut<'a>(blocks: &'a mut Vec<Block>, path: &[usize]) -> Option<&'a mut Block> {
    let (&last, prefix) = path.split_last()?;
    container_mut(blocks, prefix)?.get_mut(last)
}

/// Blocks enclosing `path`, outermost first, each with the length of its
/// own path (so `&path[..len]` addresses it).
pub fn ancestors<'a>(blocks: &'a [Block], path: &[usize]) -> Vec<(usize, &'a Block)> {
    let mut found = Vec::new();
    let mut current = blocks;
    let mut consumed = 0;
    while let Some(block) = path.get(consumed).and_then(|&i| current.get(i)) {
        consumed += 1;
        if consumed >= path.len() {
            break;
        }
        found.push((consumed, block));
        let children = match block {
            Block::Blockquote(children) => Some(children.as_slice()),
            Block::BulletList(items) | Block::OrderedList(items) => {
                let item = items.get(path[consumed]);
                consumed += 1;
                item.map(|item| item.blocks.as_slice())
            }
            Block::Table(table) => {
                let cell = path
                    .get(consumed + 1)
                    .and_then(|&c| table.rows.get(path[consumed])?.cells.get(c));
                consumed += 2;
                cell.map(|cell| cell.blocks.as_slice())
            }
            _ => None,
        };
        match children {
            Some(children) => current = children,
            None => break,
        }
    }
    found
}

/// Paths of every text block under `blocks`, in document order. `prefix`
/// is prepended to each path.
pub fn text_block_paths(blocks: &[Block], prefix: &[usize]) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    let mut path = prefix.to_vec();
    collect_text_paths(blocks, &mut path, &mut out);
    out
}

fn collect_text_paths(blocks: &[Block], path: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
    for (index, block) in blocks.iter().enumerate() {
        path.push(index);
        match block {
            Block::Paragraph(_) | Block::Heading(..) | Block::CodeBlock { .. } => {
                out.push(path.clone())
            }
            Block::Blockquote(children) => collect_text_paths(children, path, out),
            Block::BulletList(items) | Block::OrderedList(items) => {
                for (item_index, item) in items.iter().enumerate() {
                    path.push(item_index);
                    collect_text_paths(&item.blocks, path, out);
                    path.pop();
                }
            }
            Block::Table(table) => {
                for (row_index, row) in table.rows.iter().enumerate() {
                    for (cell_index, cell) in row.cells.iter().enumerate() {
                        path.push(row_index);
                        path.push(cell_index);
                        collect_text_paths(&cell.blocks, path, out);
                        path.pop();
                        path.pop();
                    }
                }
            }
            Block::HorizontalRule => {}
        }
        path.pop();
    }
}
