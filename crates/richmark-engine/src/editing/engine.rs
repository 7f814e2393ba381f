//! The seam between the toolbar layer and a document engine.
//!
//! Everything above this trait (capability queries, dispatch, overlays,
//! export) talks to the engine only through [`DocumentEngine`]. The crate
//! ships one implementation, [`crate::document::Document`].

use serde::Serialize;

use crate::document::model::{Align, HeadingLevel, MarkKind};
use crate::document::selection::Selection;

/// A formatting state the engine can report as active at the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    Mark(MarkKind),
    Link,
    Paragraph,
    Heading(HeadingLevel),
    Blockquote,
    CodeBlock,
    BulletList,
    OrderedList,
    Align(Align),
    Table,
    HeaderRow,
    HeaderColumn,
    HeaderCell,
}

impl Capability {
    /// Every capability, in a stable order.
    pub fn all() -> Vec<Capability> {
        let mut all: Vec<Capability> = MarkKind::ALL.into_iter().map(Capability::Mark).collect();
        all.push(Capability::Link);
        all.push(Capability::Paragraph);
        all.extend(HeadingLevel::ALL.into_iter().map(Capability::Heading));
        all.extend([
            Capability::Blockquote,
            Capability::CodeBlock,
            Capability::BulletList,
            Capability::OrderedList,
        ]);
        all.extend(Align::ALL.into_iter().map(Capability::Align));
        all.extend([
            Capability::Table,
            Capability::HeaderRow,
            Capability::HeaderColumn,
            Capability::HeaderCell,
        ]);
        all
    }
}

/// Structural table operations whose legality depends on the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TableOp {
    AddRowBefore,
    AddRowAfter,
    AddColumnBefore,
    AddColumnAfter,
    DeleteRow,
    DeleteColumn,
    MergeCells,
    SplitCell,
    DeleteTable,
    ToggleHeaderRow,
    ToggleHeaderColumn,
    ToggleHeaderCell,
}

impl TableOp {
    pub const ALL: [TableOp; 12] = [
        TableOp::AddRowBefore,
        TableOp::AddRowAfter,
        TableOp::AddColumnBefore,
        TableOp::AddColumnAfter,
        TableOp::DeleteRow,
        TableOp::DeleteColumn,
        TableOp::MergeCells,
        TableOp::SplitCell,
        TableOp::DeleteTable,
        TableOp::ToggleHeaderRow,
        TableOp::ToggleHeaderColumn,
        TableOp::ToggleHeaderCell,
    ];
}

/// Commands an engine understands. Formatting commands act on the current
/// selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    ToggleMark(MarkKind),
    SetParagraph,
    SetHeading(HeadingLevel),
    ToggleBlockquote,
    ToggleCodeBlock,
    ToggleBulletList,
    ToggleOrderedList,
    SetTextAlign(Align),
    /// Apply a link to the selection, extended over an existing link.
    SetLink { href: String },
    /// Remove the link around the selection.
    UnsetLink,
    InsertTable {
        rows: usize,
        cols: usize,
        header_row: bool,
    },
    Table(TableOp),
    /// Replace the selection with text.
    InsertText(String),
    Select(Selection),
    /// Replace the whole document with parsed structural markup.
    SetContent(String),
}

/// What a command did to the engine's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Nothing happened (the command was not applicable).
    None,
    /// Only the selection or stored marks changed.
    Selection,
    /// The document content changed.
    Content,
}

impl Change {
    pub fn is_none(self) -> bool {
        self == Change::None
    }
}

/// A rich-text engine the toolbar can query and command.
pub trait DocumentEngine {
    /// The document serialized as structural markup.
    fn structural_markup(&self) -> String;

    /// Whether `capability` is active at the current selection.
    fn is_active(&self, capability: Capability) -> bool;

    /// Whether `op` could be applied at the current selection.
    fn can_perform(&self, op: TableOp) -> bool;

    /// Target of the link at the selection, if any.
    fn link_href(&self) -> Option<String>;

    fn apply(&mut self, command: EngineCommand) -> Change;

    /// Counter that grows on every selection or content change.
    fn version(&self) -> u64;
}
