//! Table grid mapping and structural table edits.
//!
//! Cells may span several rows and columns, so a cell's index inside its
//! row says little about where it sits on the grid. [`TableMap`] resolves
//! every grid slot to the cell covering it. Edits rebuild the map from
//! scratch before they look at the grid.

use super::model::{Block, Cell, MAX_COLSPAN, Row, Table};

/// A cell addressed by row index and index within that row.
pub type CellRef = (usize, usize);

/// Rectangle of grid slots. `bottom` and `right` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    pub top: usize,
    pub left: usize,
    pub bottom: usize,
    pub right: usize,
}

impl CellRect {
    pub fn new(top: usize, left: usize, bottom: usize, right: usize) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    pub fn width(&self) -> usize {
        self.right - self.left
    }

    pub fn height(&self) -> usize {
        self.bottom - self.top
    }

    pub fn covers(&self, other: &CellRect) -> bool {
        other.top >= self.top
            && other.left >= self.left
            && other.bottom <= self.bottom
            && other.right <= self.right
    }

    fn union(&self, other: &CellRect) -> CellRect {
        CellRect {
            top: self.top.min(other.top),
            left: self.left.min(other.left),
            bottom: self.bottom.max(other.bottom),
            right: self.right.max(other.right),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMap {
    pub width: usize,
    pub height: usize,
    /// Cell covering each slot, row-major. `None` marks a hole left by a
    /// short row.
    slots: Vec<Option<CellRef>>,
    /// Grid rectangle of every cell, indexed like the table's rows.
    rects: Vec<Vec<CellRect>>,
}

impl TableMap {
    pub fn new(table: &Table) -> Self {
        let height = table.rows.len();
        let mut occupied: Vec<Vec<bool>> = vec![Vec::new(); height];
        let mut rects = Vec::with_capacity(height);

        for (row_index, row) in table.rows.iter().enumerate() {
            let mut col = 0;
            let mut row_rects = Vec::with_capacity(row.cells.len());
            for cell in &row.cells {
                while occupied[row_index].get(col).copied().unwrap_or(false) {
                    col += 1;
                }
                let rowspan = cell.rowspan.clamp(1, height - row_index);
                let colspan = cell.colspan.clamp(1, MAX_COLSPAN);
                let right = col.checked_add(colspan).unwrap_or(col);
                for line in &mut occupied[row_index..row_index + rowspan] {
                    if line.len() < right {
                        line.resize(right, false);
                    }
                    line[col..right].fill(true);
                }
                row_rects.push(CellRect::new(row_index, col, row_index + rowspan, right));
                col = right;
            }
            rects.push(row_rects);
        }

        let width = occupied.iter().map(Vec::len).max().unwrap_or(0);
        let mut slots = vec![None; width * height];
        for (row_index, row_rects) in rects.iter().enumerate() {
            for (cell_index, rect) in row_rects.iter().enumerate() {
                for row in rect.top..rect.bottom {
                    for col in rect.left..rect.right {
                        slots[row * width + col] = Some((row_index, cell_index));
                    }
                }
            }
        }

        Self {
            width,
            height,
            slots,
            rects,
        }
    }

    pub fn cell_at(&self, row: usize, col: usize) -> Option<CellRef> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.slots[row * self.width + col]
    }

    pub fn rect(&self, cell: CellRef) -> CellRect {
        self.rects[cell.0][cell.1]
    }

    /// Distinct cells touching `rect`, ordered by where they start.
    pub fn cells_in(&self, rect: CellRect) -> Vec<CellRef> {
        let mut cells: Vec<CellRef> = Vec::new();
        for row in rect.top..rect.bottom.min(self.height) {
            for col in rect.left..rect.right.min(self.width) {
                if let Some(cell) = self.cell_at(row, col)
                    && !cells.contains(&cell)
                {
                    cells.push(cell);
                }
            }
        }
        cells.sort_by_key(|&cell| {
            let rect = self.rect(cell);
            (rect.top, rect.left)
        });
        cells
    }

    /// Smallest rectangle containing both slots that no cell crosses.
    pub fn rect_between(&self, a: (usize, usize), b: (usize, usize)) -> Option<CellRect> {
        let first = self.rect(self.cell_at(a.0, a.1)?);
        let second = self.rect(self.cell_at(b.0, b.1)?);
        let mut rect = first.union(&second);
        loop {
            let grown = self
                .cells_in(rect)
                .into_iter()
                .fold(rect, |acc, cell| acc.union(&self.rect(cell)));
            if grown == rect {
                return Some(rect);
            }
            rect = grown;
        }
    }

    /// Index in `row` at which a cell starting at grid column `col` belongs.
    pub fn insertion_index(&self, row: usize, col: usize) -> usize {
        self.rects
            .get(row)
            .map_or(0, |rects| rects.iter().filter(|rect| rect.left < col).count())
    }

    fn column_is_header(&self, table: &Table, col: usize) -> bool {
        (0..self.height).all(|row| self.header_at(table, row, col))
    }

    fn row_is_header(&self, table: &Table, row: usize) -> bool {
        (0..self.width).all(|col| self.header_at(table, row, col))
    }

    fn header_at(&self, table: &Table, row: usize, col: usize) -> bool {
        self.cell_at(row, col)
            .and_then(|cell| table.cell(cell))
            .is_some_and(|cell| cell.header)
    }
}

impl Table {
    /// A `rows` x `cols` table of empty cells, preceded by a header row
    /// when `header_row` is set.
    pub fn grid(rows: usize, cols: usize, header_row: bool) -> Self {
        let header = header_row.then(|| Row {
            cells: (0..cols).map(|_| Cell::empty(true)).collect(),
        });
        let body = (0..rows).map(|_| Row {
            cells: (0..cols).map(|_| Cell::empty(false)).collect(),
        });
        Table {
            rows: header.into_iter().chain(body).collect(),
        }
    }

    pub fn cell(&self, cell: CellRef) -> Option<&Cell> {
        self.rows.get(cell.0)?.cells.get(cell.1)
    }

    fn cell_mut(&mut self, cell: CellRef) -> Option<&mut Cell> {
        self.rows.get_mut(cell.0)?.cells.get_mut(cell.1)
    }

    pub fn map(&self) -> TableMap {
        TableMap::new(self)
    }

    /// Insert a column before grid column `col`.
    ///
    /// Each new cell copies the header flag of its neighbour, except that a
    /// column next to a header column does not become a header column.
    pub fn add_column(&mut self, col: usize) {
        let map = self.map();
        let reference_col = col.saturating_sub(1);
        let mut reference: Option<isize> = Some(if col > 0 { -1 } else { 0 });
        if map.width > 0 && map.column_is_header(self, reference_col) {
            reference = if col == 0 || col == map.width {
                None
            } else {
                Some(0)
            };
        }

        let mut inserts = Vec::new();
        let mut row = 0;
        while row < map.height {
            if let Some(cell) = map.cell_at(row, col)
                && col > 0
                && map.cell_at(row, col - 1) == Some(cell)
            {
                // Spans across the new column's position
                if let Some(spanning) = self.cell_mut(cell) {
                    spanning.colspan += 1;
                }
                row = map.rect(cell).bottom;
                continue;
            }
            let header = reference
                .and_then(|delta| offset(col, delta))
                .is_some_and(|ref_col| map.header_at(self, row, ref_col));
            inserts.push((row, map.insertion_index(row, col), header));
            row += 1;
        }

        for (row, index, header) in inserts {
            self.rows[row].cells.insert(index, Cell::empty(header));
        }
        self.normalize();
    }

    /// Insert a row before grid row `row`.
    pub fn add_row(&mut self, row: usize) {
        let map = self.map();
        let reference_row = row.saturating_sub(1);
        let mut reference: Option<isize> = Some(if row > 0 { -1 } else { 0 });
        if map.height > 0 && map.row_is_header(self, reference_row) {
            reference = if row == 0 || row == map.height {
                None
            } else {
                Some(0)
            };
        }

        let mut cells = Vec::new();
        let mut col = 0;
        while col < map.width {
            if let Some(cell) = map.cell_at(row, col)
                && row > 0
                && map.cell_at(row - 1, col) == Some(cell)
            {
                if let Some(spanning) = self.cell_mut(cell) {
                    spanning.rowspan += 1;
                }
                col = map.rect(cell).right;
                continue;
            }
            let header = reference
                .and_then(|delta| offset(row, delta))
                .is_some_and(|ref_row| map.header_at(self, ref_row, col));
            cells.push(Cell::empty(header));
            col += 1;
        }

        self.rows.insert(row.min(self.rows.len()), Row { cells });
        self.normalize();
    }

    /// Delete the columns covered by `rect`. Refuses to delete every column.
    pub fn delete_columns(&mut self, rect: CellRect) -> bool {
        let width = self.map().width;
        if rect.left == 0 && rect.right >= width {
            return false;
        }
        for col in (rect.left..rect.right.min(width)).rev() {
            self.remove_column(col);
        }
        self.normalize();
        true
    }

    fn remove_column(&mut self, col: usize) {
        let map = self.map();
        let mut removals = Vec::new();
        let mut row = 0;
        while row < map.height {
            let Some(cell) = map.cell_at(row, col) else {
                row += 1;
                continue;
            };
            let rect = map.rect(cell);
            if rect.width() > 1 {
                if let Some(spanning) = self.cell_mut(cell) {
                    spanning.colspan -= 1;
                }
            } else {
                removals.push(cell);
            }
            row = rect.bottom;
        }
        removals.sort_unstable();
        for (row, index) in removals.into_iter().rev() {
            self.rows[row].cells.remove(index);
        }
    }

    /// Delete the rows covered by `rect`. Refuses to delete every row.
    pub fn delete_rows(&mut self, rect: CellRect) -> bool {
        let height = self.rows.len();
        if rect.top == 0 && rect.bottom >= height {
            return false;
        }
        for row in (rect.top..rect.bottom.min(height)).rev() {
            self.remove_row(row);
        }
        self.normalize();
        true
    }

    fn remove_row(&mut self, row: usize) {
        let map = self.map();
        let mut shrink = Vec::new();
        let mut moved: Vec<(usize, Cell)> = Vec::new();
        let mut col = 0;
        while col < map.width {
            let Some(cell) = map.cell_at(row, col) else {
                col += 1;
                continue;
            };
            let rect = map.rect(cell);
            if rect.top < row {
                shrink.push(cell);
            } else if rect.bottom > row + 1
                && let Some(original) = self.cell(cell)
            {
                // Continues below: move it down into the next row
                let mut lowered = original.clone();
                lowered.rowspan -= 1;
                moved.push((rect.left, lowered));
            }
            col = rect.right;
        }

        for cell in shrink {
            if let Some(spanning) = self.cell_mut(cell) {
                spanning.rowspan -= 1;
            }
        }
        if row + 1 < map.height {
            moved.sort_by_key(|(left, _)| std::cmp::Reverse(*left));
            for (left, cell) in moved {
                let index = map.insertion_index(row + 1, left);
                self.rows[row + 1].cells.insert(index, cell);
            }
        }
        self.rows.remove(row);
    }

    /// Merge the cells covered by `rect` into its top-left cell.
    ///
    /// Needs more than one cell and no cell sticking out of the rectangle.
    /// Non-blank contents are concatenated in reading order.
    pub fn merge(&mut self, rect: CellRect) -> bool {
        let map = self.map();
        let cells = map.cells_in(rect);
        if cells.len() < 2 || cells.iter().any(|&cell| !rect.covers(&map.rect(cell))) {
            return false;
        }

        let mut content: Vec<Block> = cells
            .iter()
            .filter_map(|&cell| self.cell(cell))
            .filter(|cell| !cell.is_blank())
            .flat_map(|cell| cell.blocks.iter().cloned())
            .collect();
        if content.is_empty() {
            content.push(Block::empty_paragraph());
        }

        let (&target, rest) = match cells.split_first() {
            Some(split) => split,
            None => return false,
        };
        if let Some(merged) = self.cell_mut(target) {
            merged.colspan = rect.width();
            merged.rowspan = rect.height();
            merged.blocks = content;
        }
        let mut rest = rest.to_vec();
        rest.sort_unstable();
        for (row, index) in rest.into_iter().rev() {
            self.rows[row].cells.remove(index);
        }
        self.normalize();
        true
    }

    /// Split the single spanning cell covered by `rect` back into 1x1 cells.
    pub fn split(&mut self, rect: CellRect) -> bool {
        let map = self.map();
        let cells = map.cells_in(rect);
        let &[cell] = cells.as_slice() else {
            return false;
        };
        let span = map.rect(cell);
        if span.width() == 1 && span.height() == 1 {
            return false;
        }

        let Some(original) = self.cell_mut(cell) else {
            return false;
        };
        original.colspan = 1;
        original.rowspan = 1;
        let header = original.header;

        for row in span.top..span.bottom {
            let (first_col, index) = if row == span.top {
                (span.left + 1, cell.1 + 1)
            } else {
                (span.left, map.insertion_index(row, span.left))
            };
            for _ in first_col..span.right {
                self.rows[row].cells.insert(index, Cell::empty(header));
            }
        }
        self.normalize();
        true
    }

    /// Set the header flag of every cell touching `rect`. False when the
    /// rectangle holds no cells.
    pub fn set_header(&mut self, rect: CellRect, header: bool) -> bool {
        let cells = self.map().cells_in(rect);
        if cells.is_empty() {
            return false;
        }
        for cell in cells {
            if let Some(cell) = self.cell_mut(cell) {
                cell.header = header;
            }
        }
        true
    }

    /// Turn every cell in `rect` into a header cell, or back into plain
    /// cells when they all are headers already.
    pub fn toggle_header(&mut self, rect: CellRect) -> bool {
        let header = !self.all_headers(rect);
        self.set_header(rect, header)
    }

    /// Whether the whole first row is made of header cells.
    pub fn has_header_row(&self) -> bool {
        let map = self.map();
        map.height > 0 && map.width > 0 && map.row_is_header(self, 0)
    }

    /// Whether the whole first column is made of header cells.
    pub fn has_header_column(&self) -> bool {
        let map = self.map();
        map.height > 0 && map.width > 0 && map.column_is_header(self, 0)
    }

    pub fn all_headers(&self, rect: CellRect) -> bool {
        let cells = self.map().cells_in(rect);
        !cells.is_empty()
            && cells
                .iter()
                .filter_map(|&cell| self.cell(cell))
                .all(|cell| cell.header)
    }

    /// Repair the grid after an edit: drop rows with no cells (shrinking
    /// cells that spanned them), clamp spans that run off the table and
    /// fill short rows with empty cells.
    pub fn normalize(&mut self) {
        while let Some(empty) = self.rows.iter().position(|row| row.cells.is_empty()) {
            let map = self.map();
            let mut col = 0;
            while col < map.width {
                let Some(cell) = map.cell_at(empty, col) else {
                    col += 1;
                    continue;
                };
                if let Some(spanning) = self.cell_mut(cell) {
                    spanning.rowspan = spanning.rowspan.saturating_sub(1).max(1);
                }
                col = map.rect(cell).right;
            }
            self.rows.remove(empty);
        }

        let map = self.map();
        for (row_index, row) in self.rows.iter_mut().enumerate() {
            for (cell_index, cell) in row.cells.iter_mut().enumerate() {
                let rect = map.rect((row_index, cell_index));
                cell.rowspan = rect.height();
                cell.colspan = rect.width();
            }
            let holes = (0..map.width)
                .filter(|&col| map.cell_at(row_index, col).is_none())
                .count();
            row.cells.extend((0..holes).map(|_| Cell::empty(false)));
        }
    }
}

fn offset(index: usize, delta: isize) -> Option<usize> {
    index.checked_add_signed(delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::model::TextBlock;
    use pretty_assertions::assert_eq;

    /// Render the grid as one line per row: `H`/`.` per slot plus the cell's
    /// first text, spanning cells repeated.
    fn layout(table: &Table) -> Vec<String> {
        let map = table.map();
        (0..map.height)
            .map(|row| {
                (0..map.width)
                    .map(|col| match map.cell_at(row, col).and_then(|c| table.cell(c)) {
                        Some(cell) => {
                            let text = cell
                                .blocks
                                .first()
                                .and_then(Block::text_block)
                                .map(TextBlock::text)
                                .unwrap_or_default();
                            let kind = if cell.header { "H" } else { "." };
                            format!("{kind}{text}")
                        }
                        None => "?".to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }

    fn labelled(rows: &[&[&str]], header_row: bool) -> Table {
        let mut table = Table::default();
        for (index, labels) in rows.iter().enumerate() {
            table.rows.push(Row {
                cells: labels
                    .iter()
                    .map(|label| {
                        Cell::with_blocks(header_row && index == 0, vec![Block::paragraph(label)])
                    })
                    .collect(),
            });
        }
        table
    }

    #[test]
    fn grid_has_header_row() {
        let table = Table::grid(3, 3, true);
        assert_eq!(table.rows.len(), 4);
        assert!(table.rows[0].cells.iter().all(|c| c.header));
        assert!(table.rows[1..].iter().flat_map(|r| &r.cells).all(|c| !c.header));
        let map = table.map();
        assert_eq!((map.width, map.height), (3, 4));
    }

    #[test]
    fn map_resolves_spans() {
        let mut table = labelled(&[&["a", "b", "c"], &["d", "e"]], false);
        table.rows[0].cells[0].rowspan = 2;
        let map = table.map();
        assert_eq!(map.cell_at(1, 0), Some((0, 0)));
        assert_eq!(map.cell_at(1, 1), Some((1, 0)));
        assert_eq!(map.rect((1, 1)), CellRect::new(1, 2, 2, 3));
        assert_eq!(map.insertion_index(1, 2), 1);
    }

    #[test]
    fn map_caps_spans_set_in_code() {
        let mut table = labelled(&[&["a", "b"]], false);
        table.rows[0].cells[0].colspan = usize::MAX;
        table.rows[0].cells[0].rowspan = usize::MAX;
        let map = table.map();
        assert_eq!((map.width, map.height), (MAX_COLSPAN + 1, 1));
        assert_eq!(map.rect((0, 1)), CellRect::new(0, MAX_COLSPAN, 1, MAX_COLSPAN + 1));
    }

    #[test]
    fn rect_between_grows_over_spanning_cells() {
        let mut table = labelled(&[&["a", "b"], &["c", "d"]], false);
        table.rows[0].cells[0].colspan = 2;
        table.rows[0].cells.truncate(1);
        let map = table.map();
        assert_eq!(map.rect_between((1, 1), (0, 1)), Some(CellRect::new(0, 0, 2, 2)));
    }

    #[test]
    fn add_column_after_header_column_is_plain() {
        let mut table = labelled(&[&["a", "b"], &["c", "d"]], false);
        table.rows[0].cells[0].header = true;
        table.rows[1].cells[0].header = true;
        table.add_column(1);
        assert_eq!(layout(&table), vec!["Ha . .b", "Hc . .d"]);
    }

    #[test]
    fn add_row_below_header_row_is_plain() {
        let mut table = labelled(&[&["a", "b"], &["c", "d"]], true);
        table.add_row(1);
        assert_eq!(layout(&table), vec!["Ha Hb", ". .", ".c .d"]);
        table.add_row(0);
        assert_eq!(layout(&table), vec![". .", "Ha Hb", ". .", ".c .d"]);
    }

    #[test]
    fn add_row_through_rowspan_grows_it() {
        let mut table = labelled(&[&["a", "b"], &["c"]], false);
        table.rows[0].cells[0].rowspan = 2;
        table.add_row(1);
        assert_eq!(table.rows[0].cells[0].rowspan, 3);
        assert_eq!(layout(&table), vec![".a .b", ".a .", ".a .c"]);
    }

    #[test]
    fn delete_columns_refuses_whole_table() {
        let mut table = labelled(&[&["a", "b"]], false);
        assert!(!table.delete_columns(CellRect::new(0, 0, 1, 2)));
        assert!(table.delete_columns(CellRect::new(0, 1, 1, 2)));
        assert_eq!(layout(&table), vec![".a"]);
    }

    #[test]
    fn delete_row_moves_spanning_cell_down() {
        let mut table = labelled(&[&["a", "b"], &["c"], &["d", "e"]], false);
        table.rows[0].cells[0].rowspan = 2;
        assert!(table.delete_rows(CellRect::new(0, 0, 1, 2)));
        assert_eq!(layout(&table), vec![".a .c", ".d .e"]);
        assert_eq!(table.rows[0].cells[0].rowspan, 1);
    }

    #[test]
    fn merge_concatenates_non_blank_content() {
        let mut table = labelled(&[&["a", ""], &["c", "d"]], false);
        assert!(table.merge(CellRect::new(0, 0, 2, 2)));
        assert_eq!(table.rows.len(), 1);
        let merged = &table.rows[0].cells[0];
        assert_eq!((merged.colspan, merged.rowspan), (2, 1));
        let texts: Vec<String> = merged
            .blocks
            .iter()
            .filter_map(Block::text_block)
            .map(TextBlock::text)
            .collect();
        assert_eq!(texts, vec!["a", "c", "d"]);
    }

    #[test]
    fn merge_needs_two_cells_inside_the_rect() {
        let mut table = labelled(&[&["a", "b"], &["c", "d"]], false);
        assert!(!table.merge(CellRect::new(0, 0, 1, 1)));
        table.rows[0].cells[1].rowspan = 2;
        table.rows[1].cells.truncate(1);
        // (0,1) sticks out below a one-row rectangle
        assert!(!table.merge(CellRect::new(0, 0, 1, 2)));
    }

    #[test]
    fn split_restores_single_cells() {
        let mut table = labelled(&[&["a", "b", "c"], &["d", "e", "f"], &["g", "h", "i"]], false);
        assert!(table.merge(CellRect::new(0, 0, 2, 2)));
        assert!(table.split(CellRect::new(0, 0, 1, 1)));
        assert_eq!(layout(&table), vec![
            ".a . .c",
            ". . .f",
            ".g .h .i",
        ]);
        assert!(!table.split(CellRect::new(0, 0, 1, 1)));
    }

    #[test]
    fn toggle_header_flips_all_or_none() {
        let mut table = labelled(&[&["a", "b"], &["c", "d"]], false);
        table.rows[0].cells[0].header = true;
        let first_row = CellRect::new(0, 0, 1, 2);
        assert!(table.toggle_header(first_row));
        assert!(table.all_headers(first_row));
        assert!(table.has_header_row());
        assert!(!table.has_header_column());
        assert!(table.toggle_header(first_row));
        assert!(!table.rows[0].cells[0].header);
        assert!(!table.has_header_row());
    }

    #[test]
    fn normalize_fills_short_rows() {
        let mut table = labelled(&[&["a", "b"], &["c"]], false);
        table.normalize();
        assert_eq!(layout(&table), vec![".a .b", ".c ."]);
    }
}
