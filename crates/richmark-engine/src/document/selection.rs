use std::ops::Range;

/// A grid position inside a table (0-based).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub row: usize,
    pub col: usize,
}

impl CellCoord {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Current selection in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A caret or range inside one text block. Offsets are in chars.
    Text {
        block: Vec<usize>,
        anchor: usize,
        head: usize,
    },
    /// A rectangle of table cells, spanned by two grid positions.
    Cells {
        table: Vec<usize>,
        anchor: CellCoord,
        head: CellCoord,
    },
}

impl Selection {
    pub fn caret(block: Vec<usize>, offset: usize) -> Self {
        Selection::Text {
            block,
            anchor: offset,
            head: offset,
        }
    }

    pub fn text(block: Vec<usize>, anchor: usize, head: usize) -> Self {
        Selection::Text {
            block,
            anchor,
            head,
        }
    }

    pub fn cells(table: Vec<usize>, anchor: CellCoord, head: CellCoord) -> Self {
        Selection::Cells {
            table,
            anchor,
            head,
        }
    }

    /// Ordered char range of a text selection.
    pub fn range(&self) -> Option<Range<usize>> {
        match self {
            Selection::Text { anchor, head, .. } => Some(*anchor.min(head)..*anchor.max(head)),
            Selection::Cells { .. } => None,
        }
    }

    pub fn is_caret(&self) -> bool {
        matches!(self, Selection::Text { anchor, head, .. } if anchor == head)
    }

    /// Path of the block the selection starts in: the text block, or the
    /// table for a cell selection.
    pub fn path(&self) -> &[usize] {
        match self {
            Selection::Text { block, .. } => block,
            Selection::Cells { table, .. } => table,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No text block at {0:?}")]
    NotATextBlock(Vec<usize>),
    #[error("Offset {offset} is past the end of a {len}-character block")]
    OffsetOutOfRange { offset: usize, len: usize },
    #[error("No table at {0:?}")]
    NotATable(Vec<usize>),
    #[error("Cell {row},{col} is outside the table")]
    CellOutOfRange { row: usize, col: usize },
}
