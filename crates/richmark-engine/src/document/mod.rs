//! In-memory rich-text document engine.
//!
//! [`Document`] is the engine behind the toolbar: it owns the block tree,
//! the selection and the stored marks, answers capability queries and
//! applies [`EngineCommand`]s. Hosts with their own engine implement
//! [`DocumentEngine`] instead and never touch this module.

pub mod markup;
pub mod model;
pub mod selection;
pub mod table;

use std::ops::Range;

use crate::editing::engine::{Capability, Change, DocumentEngine, EngineCommand, TableOp};
use model::{
    Align, Block, ListItem, MarkKind, Marks, Table, TextBlock, ancestors, block_at,
    block_at_mut, container_mut, text_block_paths,
};
use selection::{Selection, SelectionError};
use table::CellRect;

/// A rich-text document with a selection.
///
/// The block list is never empty and always holds at least one text block,
/// so there is always somewhere to put the caret. An empty document is a
/// single empty paragraph.
///
/// # Selection
///
/// A text selection lives inside one text block; a cell selection spans a
/// rectangle of one table. Commands that only make sense for text (links,
/// text insertion, wrapping in a quote or list) do nothing on a cell
/// selection. Formatting commands apply to every text block of every
/// selected cell.
///
/// # Stored marks
///
/// Toggling a mark at a caret changes nothing in the text; the marks are
/// stored and picked up by the next [`EngineCommand::InsertText`]. Moving
/// the selection drops them.
///
/// # Versioning
///
/// Every command that changes anything bumps [`DocumentEngine::version`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub(crate) blocks: Vec<Block>,
    pub(crate) selection: Selection,
    pub(crate) stored_marks: Option<Marks>,
    pub(crate) version: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::from_blocks(vec![Block::empty_paragraph()])
    }

    /// Load structural markup, raw or canonical. The caret starts in the
    /// first text block.
    pub fn from_markup(markup: &str) -> Self {
        Self::from_blocks(markup::from_markup(markup))
    }

    pub fn from_blocks(mut blocks: Vec<Block>) -> Self {
        let caret = first_text_block(&mut blocks);
        Self {
            blocks,
            selection: Selection::caret(caret, 0),
            stored_marks: None,
            version: 0,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn stored_marks(&self) -> Option<&Marks> {
        self.stored_marks.as_ref()
    }

    pub fn to_markup(&self) -> String {
        markup::to_markup(&self.blocks)
    }

    /// Move the selection, reporting why an invalid one was refused.
    pub fn set_selection(&mut self, selection: Selection) -> Result<Change, SelectionError> {
        self.validate(&selection)?;
        Ok(self.apply(EngineCommand::Select(selection)))
    }

    fn validate(&self, selection: &Selection) -> Result<(), SelectionError> {
        match selection {
            Selection::Text {
                block,
                anchor,
                head,
            } => {
                let len = self
                    .text_at(block)
                    .ok_or_else(|| SelectionError::NotATextBlock(block.clone()))?
                    .len();
                let offset = *anchor.max(head);
                if offset > len {
                    return Err(SelectionError::OffsetOutOfRange { offset, len });
                }
                Ok(())
            }
            Selection::Cells {
                table,
                anchor,
                head,
            } => {
                let map = self
                    .table_at(table)
                    .ok_or_else(|| SelectionError::NotATable(table.clone()))?
                    .map();
                for coord in [anchor, head] {
                    if map.cell_at(coord.row, coord.col).is_none() {
                        return Err(SelectionError::CellOutOfRange {
                            row: coord.row,
                            col: coord.col,
                        });
                    }
                }
                Ok(())
            }
        }
    }

    fn execute(&mut self, command: EngineCommand) -> Change {
        match command {
            EngineCommand::ToggleMark(kind) => self.toggle_mark(kind),
            EngineCommand::SetParagraph => {
                if self.all_selected(|block| matches!(block, Block::Paragraph(_))) {
                    return Change::None;
                }
                self.convert_blocks(|block| block.text_block().cloned().map(Block::Paragraph))
            }
            EngineCommand::SetHeading(level) => {
                if self.all_selected(|block| matches!(block, Block::Heading(l, _) if *l == level)) {
                    return Change::None;
                }
                self.convert_blocks(|block| {
                    block
                        .text_block()
                        .map(|text| Block::Heading(level, text.clone()))
                })
            }
            EngineCommand::ToggleCodeBlock => self.toggle_code_block(),
            EngineCommand::ToggleBlockquote => self.toggle_blockquote(),
            EngineCommand::ToggleBulletList => self.toggle_list(false),
            EngineCommand::ToggleOrderedList => self.toggle_list(true),
            EngineCommand::SetTextAlign(align) => self.convert_blocks(|block| match block {
                Block::Paragraph(text) => Some(Block::Paragraph(text.clone().aligned(align))),
                Block::Heading(level, text) => {
                    Some(Block::Heading(*level, text.clone().aligned(align)))
                }
                _ => None,
            }),
            EngineCommand::SetLink { href } if href.is_empty() => self.update_link(None),
            EngineCommand::SetLink { href } => self.update_link(Some(href)),
            EngineCommand::UnsetLink => self.update_link(None),
            EngineCommand::InsertTable {
                rows,
                cols,
                header_row,
            } => self.insert_table(rows, cols, header_row),
            EngineCommand::Table(op) => self.table_op(op),
            EngineCommand::InsertText(text) => self.insert_text(&text),
            EngineCommand::Select(selection) => {
                if selection == self.selection || self.validate(&selection).is_err() {
                    return Change::None;
                }
                self.selection = selection;
                self.stored_marks = None;
                Change::Selection
            }
            EngineCommand::SetContent(content) => {
                let mut blocks = markup::from_markup(&content);
                let caret = first_text_block(&mut blocks);
                self.blocks = blocks;
                self.selection = Selection::caret(caret, 0);
                self.stored_marks = None;
                Change::Content
            }
        }
    }

    // Lookups

    fn text_at(&self, path: &[usize]) -> Option<&TextBlock> {
        block_at(&self.blocks, path).and_then(Block::text_block)
    }

    fn text_at_mut(&mut self, path: &[usize]) -> Option<&mut TextBlock> {
        block_at_mut(&mut self.blocks, path).and_then(Block::text_block_mut)
    }

    fn table_at(&self, path: &[usize]) -> Option<&Table> {
        match block_at(&self.blocks, path) {
            Some(Block::Table(table)) => Some(table),
            _ => None,
        }
    }

    fn in_code_block(&self, path: &[usize]) -> bool {
        matches!(block_at(&self.blocks, path), Some(Block::CodeBlock { .. }))
    }

    /// Path length of the innermost block enclosing `path` that matches.
    fn nearest(&self, path: &[usize], matches: impl Fn(&Block) -> bool) -> Option<usize> {
        ancestors(&self.blocks, path)
            .into_iter()
            .rev()
            .find(|(_, block)| matches(block))
            .map(|(len, _)| len)
    }

    /// Blocks enclosing the selection. A cell selection counts its table.
    fn enclosing(&self) -> Vec<&Block> {
        let mut blocks: Vec<&Block> = ancestors(&self.blocks, self.selection.path())
            .into_iter()
            .map(|(_, block)| block)
            .collect();
        if let Selection::Cells { table, .. } = &self.selection
            && let Some(block) = block_at(&self.blocks, table)
        {
            blocks.push(block);
        }
        blocks
    }

    /// Every selected text block with the selected char range inside it.
    fn selected_ranges(&self) -> Vec<(Vec<usize>, Range<usize>)> {
        match &self.selection {
            Selection::Text { block, .. } => self
                .selection
                .range()
                .map(|range| vec![(block.clone(), range)])
                .unwrap_or_default(),
            Selection::Cells { .. } => {
                let Some((path, rect)) = self.table_target() else {
                    return Vec::new();
                };
                let Some(table) = self.table_at(&path) else {
                    return Vec::new();
                };
                table
                    .map()
                    .cells_in(rect)
                    .into_iter()
                    .filter_map(|cell| {
                        let blocks = &table.cell(cell)?.blocks;
                        let mut prefix = path.clone();
                        prefix.extend([cell.0, cell.1]);
                        Some(text_block_paths(blocks, &prefix))
                    })
                    .flatten()
                    .filter_map(|text_path| {
                        let len = self.text_at(&text_path)?.len();
                        Some((text_path, 0..len))
                    })
                    .collect()
            }
        }
    }

    fn selected_blocks(&self) -> Vec<Vec<usize>> {
        self.selected_ranges()
            .into_iter()
            .map(|(path, _)| path)
            .collect()
    }

    fn all_selected(&self, matches: impl Fn(&Block) -> bool) -> bool {
        let paths = self.selected_blocks();
        !paths.is_empty()
            && paths
                .iter()
                .all(|path| block_at(&self.blocks, path).is_some_and(|block| matches(block)))
    }

    /// The table holding the selection and the grid rectangle it covers.
    fn table_target(&self) -> Option<(Vec<usize>, CellRect)> {
        match &self.selection {
            Selection::Text { block, .. } => {
                let len = self.nearest(block, |b| matches!(b, Block::Table(_)))?;
                let table_path = block[..len].to_vec();
                let cell = (*block.get(len)?, *block.get(len + 1)?);
                let table = self.table_at(&table_path)?;
                table.cell(cell)?;
                Some((table_path, table.map().rect(cell)))
            }
            Selection::Cells {
                table,
                anchor,
                head,
            } => {
                let map = self.table_at(table)?.map();
                let rect = map.rect_between((anchor.row, anchor.col), (head.row, head.col))?;
                Some((table.clone(), rect))
            }
        }
    }

    // Marks

    /// Marks the next typed text would carry. `None` unless the selection is
    /// a caret outside a code block.
    fn caret_marks(&self) -> Option<Marks> {
        let Selection::Text { block, head, .. } = &self.selection else {
            return None;
        };
        if !self.selection.is_caret() || self.in_code_block(block) {
            return None;
        }
        let marks = match &self.stored_marks {
            Some(stored) => stored.clone(),
            None => self.text_at(block)?.marks_at(*head),
        };
        Some(marks)
    }

    /// Non-empty selected ranges outside code blocks.
    fn markable_ranges(&self) -> Vec<(Vec<usize>, Range<usize>)> {
        self.selected_ranges()
            .into_iter()
            .filter(|(path, range)| !range.is_empty() && !self.in_code_block(path))
            .collect()
    }

    fn ranges_all(
        &self,
        ranges: &[(Vec<usize>, Range<usize>)],
        predicate: impl Fn(&Marks) -> bool,
    ) -> bool {
        !ranges.is_empty()
            && ranges.iter().all(|(path, range)| {
                self.text_at(path)
                    .is_some_and(|text| text.all_marks(range.clone(), &predicate))
            })
    }

    fn toggle_mark(&mut self, kind: MarkKind) -> Change {
        if self.selection.is_caret() {
            let Some(mut marks) = self.caret_marks() else {
                return Change::None;
            };
            marks.set(kind, !marks.has(kind));
            self.stored_marks = Some(marks);
            return Change::Selection;
        }

        let ranges = self.markable_ranges();
        let on = !self.ranges_all(&ranges, |marks| marks.has(kind));
        let mut changed = false;
        for (path, range) in ranges {
            if let Some(text) = self.text_at_mut(&path) {
                changed |= text.update_marks(range, |marks| marks.set(kind, on));
            }
        }
        content_if(changed)
    }

    /// Link at the selection: the first one inside a range, or the one a
    /// caret would type with.
    fn current_link(&self) -> Option<String> {
        let Selection::Text { block, .. } = &self.selection else {
            return None;
        };
        let range = self.selection.range()?;
        if range.is_empty() {
            return self.caret_marks()?.link;
        }
        self.text_at(block)?
            .spans(range)
            .find_map(|(_, run)| run.marks.link.clone())
    }

    /// Set or clear the link over the selection, first extending it to the
    /// whole link found at its start. The selection becomes that range.
    fn update_link(&mut self, link: Option<String>) -> Change {
        let Selection::Text { block, .. } = &self.selection else {
            return Change::None;
        };
        let block = block.clone();
        if self.in_code_block(&block) {
            return Change::None;
        }
        let (Some(range), Some(text)) = (self.selection.range(), self.text_at(&block)) else {
            return Change::None;
        };
        let extended = match text.link_range(range.start) {
            Some(found) => found.start.min(range.start)..found.end.max(range.end),
            None => range,
        };

        if extended.is_empty() {
            // Nothing to mark yet: the link applies to the next typed text
            let mut marks = self.caret_marks().unwrap_or_default();
            if marks.link == link {
                return Change::None;
            }
            marks.link = link;
            self.stored_marks = Some(marks);
            return Change::Selection;
        }

        let changed = self
            .text_at_mut(&block)
            .is_some_and(|text| text.update_marks(extended.clone(), |marks| marks.link = link.clone()));
        let selection = Selection::text(block, extended.start, extended.end);
        let moved = selection != self.selection;
        self.selection = selection;
        if changed {
            Change::Content
        } else if moved {
            Change::Selection
        } else {
            Change::None
        }
    }

    // Block structure

    /// Replace every selected text block by what `convert` returns for it.
    fn convert_blocks(&mut self, convert: impl Fn(&Block) -> Option<Block>) -> Change {
        let mut changed = false;
        for path in self.selected_blocks() {
            if let Some(block) = block_at_mut(&mut self.blocks, &path)
                && let Some(converted) = convert(block)
                && converted != *block
            {
                *block = converted;
                changed = true;
            }
        }
        content_if(changed)
    }

    fn toggle_code_block(&mut self) -> Change {
        if self.all_selected(|block| matches!(block, Block::CodeBlock { .. })) {
            return self.convert_blocks(|block| block.text_block().cloned().map(Block::Paragraph));
        }
        self.convert_blocks(|block| match block {
            Block::CodeBlock { .. } => None,
            other => other.text_block().map(|text| Block::CodeBlock {
                language: None,
                text: text.stripped(),
            }),
        })
    }

    fn toggle_blockquote(&mut self) -> Change {
        let Selection::Text {
            block: path,
            anchor,
            head,
        } = self.selection.clone()
        else {
            return Change::None;
        };
        let moved = match self.nearest(&path, |block| matches!(block, Block::Blockquote(_))) {
            Some(len) => self.lift_blockquote(&path, len),
            None => self.wrap(&path, |block| Block::Blockquote(vec![block]), &[0]),
        };
        self.reselect(moved, anchor, head)
    }

    fn toggle_list(&mut self, ordered: bool) -> Change {
        let Selection::Text {
            block: path,
            anchor,
            head,
        } = self.selection.clone()
        else {
            return Change::None;
        };
        let moved = match self.nearest(&path, |block| {
            matches!(block, Block::BulletList(_) | Block::OrderedList(_))
        }) {
            Some(len) => {
                let same_kind = matches!(
                    (block_at(&self.blocks, &path[..len]), ordered),
                    (Some(Block::OrderedList(_)), true) | (Some(Block::BulletList(_)), false)
                );
                if same_kind {
                    self.lift_list_item(&path, len)
                } else {
                    self.switch_list_kind(&path[..len], ordered)
                        .then(|| path.clone())
                }
            }
            None => self.wrap(
                &path,
                |block| list(ordered, vec![ListItem::new(vec![block])]),
                &[0, 0],
            ),
        };
        self.reselect(moved, anchor, head)
    }

    fn reselect(&mut self, path: Option<Vec<usize>>, anchor: usize, head: usize) -> Change {
        match path {
            Some(path) => {
                self.selection = Selection::text(path, anchor, head);
                Change::Content
            }
            None => Change::None,
        }
    }

    /// Replace the block at `path` by `wrap(block)`. Returns the block's
    /// new path, `path` followed by `inner`.
    fn wrap(
        &mut self,
        path: &[usize],
        wrap: impl FnOnce(Block) -> Block,
        inner: &[usize],
    ) -> Option<Vec<usize>> {
        let (&index, parent) = path.split_last()?;
        let slot = container_mut(&mut self.blocks, parent)?.get_mut(index)?;
        let block = std::mem::replace(slot, Block::HorizontalRule);
        *slot = wrap(block);
        let mut moved = path.to_vec();
        moved.extend_from_slice(inner);
        Some(moved)
    }

    /// Unwrap the quote at `path[..len]`, splicing its children into the
    /// parent.
    fn lift_blockquote(&mut self, path: &[usize], len: usize) -> Option<Vec<usize>> {
        let (&index, parent) = path[..len].split_last()?;
        let child = *path.get(len)?;
        let container = container_mut(&mut self.blocks, parent)?;
        let Some(Block::Blockquote(children)) = container.get_mut(index) else {
            return None;
        };
        let children = std::mem::take(children);
        container.splice(index..=index, children);

        let mut moved = parent.to_vec();
        moved.push(index + child);
        moved.extend_from_slice(&path[len + 1..]);
        Some(moved)
    }

    /// Move the item holding `path` out of the list at `path[..len]`,
    /// splitting the list around it.
    fn lift_list_item(&mut self, path: &[usize], len: usize) -> Option<Vec<usize>> {
        let (&index, parent) = path[..len].split_last()?;
        let item = *path.get(len)?;
        let child = *path.get(len + 1)?;
        let container = container_mut(&mut self.blocks, parent)?;
        let (ordered, mut items) = match container.get_mut(index) {
            Some(Block::BulletList(items)) if item < items.len() => (false, std::mem::take(items)),
            Some(Block::OrderedList(items)) if item < items.len() => (true, std::mem::take(items)),
            _ => return None,
        };

        let after = items.split_off(item + 1);
        let lifted = items.pop().map(|item| item.blocks).unwrap_or_default();
        let before = items;
        let shift = usize::from(!before.is_empty());

        let mut replacement = Vec::new();
        if !before.is_empty() {
            replacement.push(list(ordered, before));
        }
        replacement.extend(lifted);
        if !after.is_empty() {
            replacement.push(list(ordered, after));
        }
        container.splice(index..=index, replacement);

        let mut moved = parent.to_vec();
        moved.push(index + shift + child);
        moved.extend_from_slice(&path[len + 2..]);
        Some(moved)
    }

    fn switch_list_kind(&mut self, list_path: &[usize], ordered: bool) -> bool {
        let Some(block) = block_at_mut(&mut self.blocks, list_path) else {
            return false;
        };
        let items = match block {
            Block::BulletList(items) | Block::OrderedList(items) => std::mem::take(items),
            _ => return false,
        };
        *block = list(ordered, items);
        true
    }

    // Tables

    fn insert_table(&mut self, rows: usize, cols: usize, header_row: bool) -> Change {
        if rows == 0 || cols == 0 {
            return Change::None;
        }
        let path = self.selection.path().to_vec();
        let Some((&index, parent)) = path.split_last() else {
            return Change::None;
        };
        let Some(container) = container_mut(&mut self.blocks, parent) else {
            return Change::None;
        };
        let table = Block::Table(Table::grid(rows, cols, header_row));
        let at = if container.get(index).is_some_and(Block::is_blank) {
            container[index] = table;
            index
        } else {
            let at = (index + 1).min(container.len());
            container.insert(at, table);
            at
        };

        let mut caret = parent.to_vec();
        caret.extend([at, 0, 0, 0]);
        self.selection = Selection::caret(caret, 0);
        self.stored_marks = None;
        Change::Content
    }

    fn table_op(&mut self, op: TableOp) -> Change {
        let Some((table_path, rect)) = self.table_target() else {
            return Change::None;
        };
        if op == TableOp::DeleteTable {
            return self.delete_table(&table_path);
        }
        let Some(Block::Table(table)) = block_at_mut(&mut self.blocks, &table_path) else {
            return Change::None;
        };

        let map = table.map();
        let origin = (rect.top, rect.left);
        let (done, focus) = match op {
            TableOp::AddRowBefore => {
                table.add_row(rect.top);
                (true, (rect.top + 1, rect.left))
            }
            TableOp::AddRowAfter => {
                table.add_row(rect.bottom);
                (true, origin)
            }
            TableOp::AddColumnBefore => {
                table.add_column(rect.left);
                (true, (rect.top, rect.left + 1))
            }
            TableOp::AddColumnAfter => {
                table.add_column(rect.right);
                (true, origin)
            }
            TableOp::DeleteRow => (table.delete_rows(rect), origin),
            TableOp::DeleteColumn => (table.delete_columns(rect), origin),
            TableOp::MergeCells => (table.merge(rect), origin),
            TableOp::SplitCell => (table.split(rect), origin),
            TableOp::ToggleHeaderRow => {
                // A header column keeps its corner cell
                let left = usize::from(table.has_header_column());
                let header = !table.has_header_row();
                (table.set_header(CellRect::new(0, left, 1, map.width), header), origin)
            }
            TableOp::ToggleHeaderColumn => {
                let top = usize::from(table.has_header_row());
                let header = !table.has_header_column();
                (table.set_header(CellRect::new(top, 0, map.height, 1), header), origin)
            }
            TableOp::ToggleHeaderCell => (table.toggle_header(rect), origin),
            TableOp::DeleteTable => (false, origin),
        };
        if !done {
            return Change::None;
        }

        let caret = focus_cell(table, focus).or_else(|| {
            text_block_paths(&[Block::Table(table.clone())], &[])
                .into_iter()
                .next()
                .map(|path| path[1..].to_vec())
        });
        let mut path = table_path;
        path.extend(caret.unwrap_or_default());
        self.selection = Selection::caret(path, 0);
        self.stored_marks = None;
        Change::Content
    }

    fn delete_table(&mut self, table_path: &[usize]) -> Change {
        let Some((&index, parent)) = table_path.split_last() else {
            return Change::None;
        };
        let Some(container) = container_mut(&mut self.blocks, parent) else {
            return Change::None;
        };
        if !matches!(container.get(index), Some(Block::Table(_))) {
            return Change::None;
        }
        container.remove(index);

        let caret = if container.is_empty() {
            container.push(Block::empty_paragraph());
            let mut caret = parent.to_vec();
            caret.push(0);
            caret
        } else {
            let paths = text_block_paths(&self.blocks, &[]);
            match paths
                .iter()
                .find(|path| path.as_slice() >= table_path)
                .or(paths.last())
            {
                Some(path) => path.clone(),
                None => first_text_block(&mut self.blocks),
            }
        };
        self.selection = Selection::caret(caret, 0);
        self.stored_marks = None;
        Change::Content
    }

    fn insert_text(&mut self, text: &str) -> Change {
        let Selection::Text { block, .. } = &self.selection else {
            return Change::None;
        };
        let block = block.clone();
        let Some(range) = self.selection.range() else {
            return Change::None;
        };
        if text.is_empty() && range.is_empty() {
            return Change::None;
        }
        let code = self.in_code_block(&block);
        let stored = self.stored_marks.take();
        let Some(target) = self.text_at_mut(&block) else {
            return Change::None;
        };
        let marks = match stored {
            _ if code => Marks::default(),
            Some(stored) => stored,
            // Replacing a range types with the marks of its first char
            None if range.is_empty() => target.marks_at(range.start),
            None => target.marks_at(range.start + 1),
        };
        target.delete(range.clone());
        target.insert(range.start, text, marks);
        self.selection = Selection::caret(block, range.start + text.chars().count());
        Change::Content
    }
}

impl DocumentEngine for Document {
    fn structural_markup(&self) -> String {
        self.to_markup()
    }

    fn is_active(&self, capability: Capability) -> bool {
        match capability {
            Capability::Mark(kind) => match self.caret_marks() {
                Some(marks) => marks.has(kind),
                None => self.ranges_all(&self.markable_ranges(), |marks| marks.has(kind)),
            },
            Capability::Link => self.current_link().is_some(),
            Capability::Paragraph => self.all_selected(|block| matches!(block, Block::Paragraph(_))),
            Capability::Heading(level) => {
                self.all_selected(|block| matches!(block, Block::Heading(l, _) if *l == level))
            }
            Capability::CodeBlock => {
                self.all_selected(|block| matches!(block, Block::CodeBlock { .. }))
            }
            Capability::Blockquote => self
                .enclosing()
                .into_iter()
                .any(|block| matches!(block, Block::Blockquote(_))),
            Capability::BulletList => self
                .enclosing()
                .into_iter()
                .any(|block| matches!(block, Block::BulletList(_))),
            Capability::OrderedList => self
                .enclosing()
                .into_iter()
                .any(|block| matches!(block, Block::OrderedList(_))),
            Capability::Align(align) => {
                let alignments: Vec<Align> = self
                    .selected_blocks()
                    .iter()
                    .filter_map(|path| match block_at(&self.blocks, path) {
                        Some(Block::Paragraph(text) | Block::Heading(_, text)) => Some(text.align),
                        _ => None,
                    })
                    .collect();
                !alignments.is_empty() && alignments.iter().all(|a| *a == align)
            }
            Capability::Table => self.table_target().is_some(),
            Capability::HeaderRow => self
                .table_target()
                .and_then(|(path, _)| self.table_at(&path).map(Table::has_header_row))
                .unwrap_or(false),
            Capability::HeaderColumn => self
                .table_target()
                .and_then(|(path, _)| self.table_at(&path).map(Table::has_header_column))
                .unwrap_or(false),
            Capability::HeaderCell => self
                .table_target()
                .and_then(|(path, rect)| Some(self.table_at(&path)?.all_headers(rect)))
                .unwrap_or(false),
        }
    }

    fn can_perform(&self, op: TableOp) -> bool {
        let mut probe = self.clone();
        !probe.table_op(op).is_none()
    }

    fn link_href(&self) -> Option<String> {
        self.current_link()
    }

    fn apply(&mut self, command: EngineCommand) -> Change {
        let change = self.execute(command);
        if !change.is_none() {
            self.version += 1;
        }
        change
    }

    fn version(&self) -> u64 {
        self.version
    }
}

fn content_if(changed: bool) -> Change {
    if changed {
        Change::Content
    } else {
        Change::None
    }
}

fn list(ordered: bool, items: Vec<ListItem>) -> Block {
    if ordered {
        Block::OrderedList(items)
    } else {
        Block::BulletList(items)
    }
}

/// Path of the first text block, adding an empty paragraph when there is
/// none.
fn first_text_block(blocks: &mut Vec<Block>) -> Vec<usize> {
    if let Some(path) = text_block_paths(blocks, &[]).into_iter().next() {
        return path;
    }
    blocks.push(Block::empty_paragraph());
    vec![blocks.len() - 1]
}

/// Path, relative to the table, of the first text block in the cell at a
/// grid slot. The slot is clamped into the grid.
fn focus_cell(table: &Table, (row, col): (usize, usize)) -> Option<Vec<usize>> {
    let map = table.map();
    let row = row.min(map.height.checked_sub(1)?);
    let col = col.min(map.width.checked_sub(1)?);
    let cell = map.cell_at(row, col)?;
    let blocks = &table.cell(cell)?.blocks;
    text_block_paths(blocks, &[cell.0, cell.1]).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::model::HeadingLevel;
    use super::selection::CellCoord;
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn select(doc: &mut Document, selection: Selection) {
        assert_eq!(doc.set_selection(selection), Ok(Change::Selection));
    }

    #[test]
    fn empty_document_is_one_paragraph() {
        let doc = Document::new();
        assert_eq!(doc.to_markup(), "<p></p>");
        assert_eq!(doc.selection(), &Selection::caret(vec![0], 0));
        assert!(doc.is_active(Capability::Paragraph));
        assert!(doc.is_active(Capability::Align(Align::Left)));
    }

    #[test]
    fn document_without_text_gets_a_paragraph() {
        let doc = Document::from_markup("<hr>");
        assert_eq!(doc.to_markup(), "<hr><p></p>");
        assert_eq!(doc.selection().path(), &[1]);
    }

    #[test]
    fn toggle_mark_on_range() {
        let mut doc = Document::from_markup("<p>hello world</p>");
        select(&mut doc, Selection::text(vec![0], 0, 5));

        assert_eq!(doc.apply(EngineCommand::ToggleMark(MarkKind::Bold)), Change::Content);
        assert_eq!(doc.to_markup(), "<p><strong>hello</strong> world</p>");
        assert!(doc.is_active(Capability::Mark(MarkKind::Bold)));
        assert!(!doc.is_active(Capability::Mark(MarkKind::Italic)));

        assert_eq!(doc.apply(EngineCommand::ToggleMark(MarkKind::Bold)), Change::Content);
        assert_eq!(doc.to_markup(), "<p>hello world</p>");
    }

    #[test]
    fn partially_marked_range_gets_the_mark_everywhere() {
        let mut doc = Document::from_markup("<p><em>ab</em>cd</p>");
        select(&mut doc, Selection::text(vec![0], 0, 4));
        assert!(!doc.is_active(Capability::Mark(MarkKind::Italic)));
        doc.apply(EngineCommand::ToggleMark(MarkKind::Italic));
        assert_eq!(doc.to_markup(), "<p><em>abcd</em></p>");
    }

    #[test]
    fn mark_at_caret_is_stored_for_typing() {
        let mut doc = Document::from_markup("<p>ab</p>");
        select(&mut doc, Selection::caret(vec![0], 2));

        assert_eq!(doc.apply(EngineCommand::ToggleMark(MarkKind::Italic)), Change::Selection);
        assert!(doc.is_active(Capability::Mark(MarkKind::Italic)));
        assert_eq!(doc.to_markup(), "<p>ab</p>");

        assert_eq!(doc.apply(EngineCommand::InsertText("c".into())), Change::Content);
        assert_eq!(doc.to_markup(), "<p>ab<em>c</em></p>");
        assert_eq!(doc.selection(), &Selection::caret(vec![0], 3));
        assert!(doc.stored_marks().is_none());
    }

    #[test]
    fn typing_inherits_marks_before_the_caret() {
        let mut doc = Document::from_markup("<p><strong>ab</strong>cd</p>");
        select(&mut doc, Selection::caret(vec![0], 2));
        doc.apply(EngineCommand::InsertText("X".into()));
        assert_eq!(doc.to_markup(), "<p><strong>abX</strong>cd</p>");
    }

    #[test]
    fn heading_is_set_not_toggled() {
        let mut doc = Document::from_markup("<p>Title</p>");
        assert_eq!(doc.apply(EngineCommand::SetHeading(HeadingLevel::H2)), Change::Content);
        assert_eq!(doc.to_markup(), "<h2>Title</h2>");
        assert!(doc.is_active(Capability::Heading(HeadingLevel::H2)));
        assert!(!doc.is_active(Capability::Paragraph));

        assert_eq!(doc.apply(EngineCommand::SetHeading(HeadingLevel::H2)), Change::None);
        assert_eq!(doc.to_markup(), "<h2>Title</h2>");

        assert_eq!(doc.apply(EngineCommand::SetParagraph), Change::Content);
        assert_eq!(doc.apply(EngineCommand::SetParagraph), Change::None);
        assert!(doc.is_active(Capability::Paragraph));
    }

    #[test]
    fn code_block_drops_marks_and_toggles_back() {
        let mut doc = Document::from_markup("<p><strong>let</strong> x</p>");
        assert_eq!(doc.apply(EngineCommand::ToggleCodeBlock), Change::Content);
        assert_eq!(doc.to_markup(), "<pre><code>let x</code></pre>");
        assert!(doc.is_active(Capability::CodeBlock));
        assert!(!doc.is_active(Capability::Mark(MarkKind::Bold)));
        assert_eq!(doc.apply(EngineCommand::ToggleMark(MarkKind::Bold)), Change::None);

        assert_eq!(doc.apply(EngineCommand::ToggleCodeBlock), Change::Content);
        assert_eq!(doc.to_markup(), "<p>let x</p>");
    }

    #[test]
    fn blockquote_wraps_and_lifts() {
        let mut doc = Document::from_markup("<p>quote me</p>");
        select(&mut doc, Selection::caret(vec![0], 3));

        assert_eq!(doc.apply(EngineCommand::ToggleBlockquote), Change::Content);
        assert_eq!(doc.to_markup(), "<blockquote><p>quote me</p></blockquote>");
        assert_eq!(doc.selection(), &Selection::caret(vec![0, 0], 3));
        assert!(doc.is_active(Capability::Blockquote));

        assert_eq!(doc.apply(EngineCommand::ToggleBlockquote), Change::Content);
        assert_eq!(doc.to_markup(), "<p>quote me</p>");
        assert_eq!(doc.selection(), &Selection::caret(vec![0], 3));
        assert!(!doc.is_active(Capability::Blockquote));
    }

    #[test]
    fn lifting_a_quote_keeps_its_siblings() {
        let mut doc = Document::from_markup("<blockquote><p>a</p><p>b</p></blockquote><p>c</p>");
        select(&mut doc, Selection::caret(vec![0, 1], 1));
        doc.apply(EngineCommand::ToggleBlockquote);
        assert_eq!(doc.to_markup(), "<p>a</p><p>b</p><p>c</p>");
        assert_eq!(doc.selection(), &Selection::caret(vec![1], 1));
    }

    #[test]
    fn list_toggles_wrap_switch_and_lift() {
        let mut doc = Document::from_markup("<p>a</p><p>b</p>");
        select(&mut doc, Selection::caret(vec![1], 0));

        doc.apply(EngineCommand::ToggleBulletList);
        assert_eq!(doc.to_markup(), "<p>a</p><ul><li><p>b</p></li></ul>");
        assert_eq!(doc.selection().path(), &[1, 0, 0]);
        assert!(doc.is_active(Capability::BulletList));

        doc.apply(EngineCommand::ToggleOrderedList);
        assert_eq!(doc.to_markup(), "<p>a</p><ol><li><p>b</p></li></ol>");
        assert!(doc.is_active(Capability::OrderedList));
        assert!(!doc.is_active(Capability::BulletList));

        doc.apply(EngineCommand::ToggleOrderedList);
        assert_eq!(doc.to_markup(), "<p>a</p><p>b</p>");
        assert_eq!(doc.selection().path(), &[1]);
    }

    #[test]
    fn lifting_a_middle_item_splits_the_list() {
        let mut doc = Document::from_markup(
            "<ul><li><p>a</p></li><li><p>b</p></li><li><p>c</p></li></ul>",
        );
        select(&mut doc, Selection::caret(vec![0, 1, 0], 1));
        doc.apply(EngineCommand::ToggleBulletList);
        assert_eq!(
            doc.to_markup(),
            "<ul><li><p>a</p></li></ul><p>b</p><ul><li><p>c</p></li></ul>"
        );
        assert_eq!(doc.selection(), &Selection::caret(vec![1], 1));
    }

    #[rstest]
    #[case(Align::Center, r#"<p style="text-align: center">x</p>"#)]
    #[case(Align::Right, r#"<p style="text-align: right">x</p>"#)]
    #[case(Align::Justify, r#"<p style="text-align: justify">x</p>"#)]
    fn alignment_is_exclusive(#[case] align: Align, #[case] expected: &str) {
        let mut doc = Document::from_markup("<p>x</p>");
        assert_eq!(doc.apply(EngineCommand::SetTextAlign(align)), Change::Content);
        assert_eq!(doc.to_markup(), expected);
        for other in Align::ALL {
            assert_eq!(doc.is_active(Capability::Align(other)), other == align);
        }
        assert_eq!(doc.apply(EngineCommand::SetTextAlign(align)), Change::None);
    }

    #[test]
    fn set_link_extends_over_the_existing_link() {
        let mut doc =
            Document::from_markup(r#"<p>see <a href="https://old.example">the docs</a> now</p>"#);
        select(&mut doc, Selection::caret(vec![0], 6));
        assert_eq!(doc.link_href().as_deref(), Some("https://old.example"));

        let change = doc.apply(EngineCommand::SetLink {
            href: "https://new.example".into(),
        });
        assert_eq!(change, Change::Content);
        assert_eq!(doc.selection(), &Selection::text(vec![0], 4, 12));
        assert_eq!(doc.link_href().as_deref(), Some("https://new.example"));
        assert!(doc.to_markup().contains(r#"href="https://new.example">the docs</a>"#));

        assert_eq!(doc.apply(EngineCommand::UnsetLink), Change::Content);
        assert_eq!(doc.to_markup(), "<p>see the docs now</p>");
        assert!(!doc.is_active(Capability::Link));
    }

    #[test]
    fn empty_href_removes_the_link() {
        let mut doc = Document::from_markup(r#"<p><a href="https://a.example">x</a></p>"#);
        select(&mut doc, Selection::caret(vec![0], 1));
        doc.apply(EngineCommand::SetLink { href: String::new() });
        assert_eq!(doc.to_markup(), "<p>x</p>");
    }

    #[test]
    fn link_on_range_without_link() {
        let mut doc = Document::from_markup("<p>click here</p>");
        select(&mut doc, Selection::text(vec![0], 6, 10));
        doc.apply(EngineCommand::SetLink {
            href: "https://example.com".into(),
        });
        assert_eq!(
            doc.to_markup(),
            r#"<p>click <a target="_blank" rel="noopener noreferrer nofollow" href="https://example.com">here</a></p>"#
        );
    }

    #[test]
    fn insert_table_replaces_an_empty_paragraph() {
        let mut doc = Document::new();
        let change = doc.apply(EngineCommand::InsertTable {
            rows: 3,
            cols: 3,
            header_row: true,
        });
        assert_eq!(change, Change::Content);
        let [Block::Table(table)] = doc.blocks() else {
            panic!("expected a single table, got {:?}", doc.blocks());
        };
        assert_eq!(table.rows.len(), 4);
        assert!(table.rows[0].cells.iter().all(|cell| cell.header));
        assert!(table.rows[1..].iter().all(|row| row.cells.len() == 3));
        assert_eq!(doc.selection(), &Selection::caret(vec![0, 0, 0, 0], 0));
        assert!(doc.is_active(Capability::Table));
        assert!(doc.is_active(Capability::HeaderRow));
    }

    #[test]
    fn insert_table_goes_after_a_non_empty_block() {
        let mut doc = Document::from_markup("<p>intro</p>");
        doc.apply(EngineCommand::InsertTable {
            rows: 1,
            cols: 1,
            header_row: false,
        });
        assert!(matches!(doc.blocks(), [Block::Paragraph(_), Block::Table(_)]));
        assert_eq!(doc.selection().path(), &[1, 0, 0, 0]);
    }

    #[test]
    fn insert_table_needs_rows_and_columns() {
        let mut doc = Document::new();
        let command = EngineCommand::InsertTable {
            rows: 0,
            cols: 3,
            header_row: true,
        };
        assert_eq!(doc.apply(command), Change::None);
        assert_eq!(doc.version(), 0);
    }

    fn table_doc() -> Document {
        let mut doc = Document::new();
        doc.apply(EngineCommand::InsertTable {
            rows: 2,
            cols: 2,
            header_row: true,
        });
        doc
    }

    #[test]
    fn table_op_legality_follows_the_selection() {
        let mut doc = table_doc();
        assert!(doc.can_perform(TableOp::AddRowAfter));
        assert!(doc.can_perform(TableOp::DeleteRow));
        assert!(doc.can_perform(TableOp::DeleteTable));
        assert!(!doc.can_perform(TableOp::MergeCells));
        assert!(!doc.can_perform(TableOp::SplitCell));

        select(
            &mut doc,
            Selection::cells(vec![0], CellCoord::new(1, 0), CellCoord::new(1, 1)),
        );
        assert!(doc.can_perform(TableOp::MergeCells));
        assert_eq!(doc.apply(EngineCommand::Table(TableOp::MergeCells)), Change::Content);
        assert_eq!(doc.selection(), &Selection::caret(vec![0, 1, 0, 0], 0));
        assert!(doc.can_perform(TableOp::SplitCell));
    }

    #[test]
    fn legality_check_leaves_the_document_alone() {
        let doc = table_doc();
        let before = doc.clone();
        for op in TableOp::ALL {
            doc.can_perform(op);
        }
        assert_eq!(doc, before);
    }

    #[test]
    fn no_table_ops_outside_a_table() {
        let mut doc = Document::from_markup("<p>plain</p>");
        for op in TableOp::ALL {
            assert!(!doc.can_perform(op), "{op:?} should be illegal");
            assert_eq!(doc.apply(EngineCommand::Table(op)), Change::None);
        }
    }

    #[test]
    fn add_row_before_keeps_the_caret_in_its_cell() {
        let mut doc = table_doc();
        select(&mut doc, Selection::caret(vec![0, 1, 1, 0], 0));
        doc.apply(EngineCommand::Table(TableOp::AddRowBefore));
        let Block::Table(table) = &doc.blocks()[0] else {
            panic!("table expected");
        };
        assert_eq!(table.rows.len(), 4);
        assert_eq!(doc.selection().path(), &[0, 2, 1, 0]);
    }

    #[test]
    fn toggle_header_row_and_column() {
        let mut doc = table_doc();
        assert!(doc.is_active(Capability::HeaderRow));
        assert!(!doc.is_active(Capability::HeaderColumn));

        doc.apply(EngineCommand::Table(TableOp::ToggleHeaderColumn));
        assert!(doc.is_active(Capability::HeaderColumn));
        assert!(doc.is_active(Capability::HeaderRow));

        // The corner stays a header while the column is one
        doc.apply(EngineCommand::Table(TableOp::ToggleHeaderRow));
        assert!(!doc.is_active(Capability::HeaderRow));
        assert!(doc.is_active(Capability::HeaderColumn));
        assert!(doc.is_active(Capability::HeaderCell));
    }

    #[test]
    fn delete_table_leaves_a_paragraph() {
        let mut doc = table_doc();
        assert_eq!(doc.apply(EngineCommand::Table(TableOp::DeleteTable)), Change::Content);
        assert_eq!(doc.to_markup(), "<p></p>");
        assert_eq!(doc.selection(), &Selection::caret(vec![0], 0));
    }

    #[test]
    fn delete_table_moves_the_caret_to_the_next_block() {
        let mut doc = Document::from_markup(
            "<p>before</p><table><tr><td><p>x</p></td></tr></table><p>after</p>",
        );
        select(&mut doc, Selection::caret(vec![1, 0, 0, 0], 0));
        doc.apply(EngineCommand::Table(TableOp::DeleteTable));
        assert_eq!(doc.to_markup(), "<p>before</p><p>after</p>");
        assert_eq!(doc.selection(), &Selection::caret(vec![1], 0));
    }

    #[test]
    fn cell_selection_formats_every_cell() {
        let mut doc = Document::from_markup(
            "<table><tr><td><p>a</p></td><td><p>b</p></td></tr></table>",
        );
        select(
            &mut doc,
            Selection::cells(vec![0], CellCoord::new(0, 0), CellCoord::new(0, 1)),
        );
        doc.apply(EngineCommand::ToggleMark(MarkKind::Bold));
        assert!(doc.is_active(Capability::Mark(MarkKind::Bold)));
        assert!(doc.to_markup().contains("<p><strong>a</strong></p>"));
        assert!(doc.to_markup().contains("<p><strong>b</strong></p>"));
    }

    #[test]
    fn invalid_selections_are_refused() {
        let mut doc = Document::from_markup("<p>abc</p>");
        assert_eq!(
            doc.set_selection(Selection::caret(vec![0], 9)),
            Err(SelectionError::OffsetOutOfRange { offset: 9, len: 3 })
        );
        assert_eq!(
            doc.set_selection(Selection::caret(vec![4], 0)),
            Err(SelectionError::NotATextBlock(vec![4]))
        );
        assert_eq!(
            doc.set_selection(Selection::cells(vec![0], CellCoord::default(), CellCoord::default())),
            Err(SelectionError::NotATable(vec![0]))
        );
        assert_eq!(doc.apply(EngineCommand::Select(Selection::caret(vec![0], 9))), Change::None);
    }

    #[test]
    fn version_counts_changes() {
        let mut doc = Document::from_markup("<p>abc</p>");
        doc.apply(EngineCommand::Select(Selection::caret(vec![0], 1)));
        doc.apply(EngineCommand::SetHeading(HeadingLevel::H1));
        doc.apply(EngineCommand::SetHeading(HeadingLevel::H1));
        assert_eq!(doc.version(), 2);
    }

    #[test]
    fn set_content_replaces_everything() {
        let mut doc = Document::from_markup("<p>old</p>");
        doc.apply(EngineCommand::SetContent("<h1>new</h1><p>text</p>".into()));
        assert_eq!(doc.to_markup(), "<h1>new</h1><p>text</p>");
        assert_eq!(doc.selection(), &Selection::caret(vec![0], 0));
    }
}
