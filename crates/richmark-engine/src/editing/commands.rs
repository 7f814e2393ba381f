use super::capability::SelectionContext;
use super::engine::{Capability, EngineCommand, TableOp};
use crate::document::model::{Align, HeadingLevel, MarkKind};

/// Block type picked from the style menu. Paragraph is the only "off"
/// state; picking the current heading again keeps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockStyle {
    Paragraph,
    Heading(HeadingLevel),
}

impl BlockStyle {
    pub const ALL: [BlockStyle; 7] = [
        BlockStyle::Paragraph,
        BlockStyle::Heading(HeadingLevel::H1),
        BlockStyle::Heading(HeadingLevel::H2),
        BlockStyle::Heading(HeadingLevel::H3),
        BlockStyle::Heading(HeadingLevel::H4),
        BlockStyle::Heading(HeadingLevel::H5),
        BlockStyle::Heading(HeadingLevel::H6),
    ];

    pub fn capability(self) -> Capability {
        match self {
            BlockStyle::Paragraph => Capability::Paragraph,
            BlockStyle::Heading(level) => Capability::Heading(level),
        }
    }

    /// The style the menu shows for `context`. Falls back to paragraph
    /// when the selection spans mixed blocks.
    pub fn current(context: &SelectionContext) -> BlockStyle {
        BlockStyle::ALL
            .into_iter()
            .find(|style| context.is_active(style.capability()))
            .unwrap_or(BlockStyle::Paragraph)
    }
}

/// One discrete user intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatCommand {
    ToggleMark(MarkKind),
    SetBlock(BlockStyle),
    ToggleBlockquote,
    ToggleCodeBlock,
    ToggleBulletList,
    ToggleOrderedList,
    SetAlign(Align),
    /// Insert a table of `rows` data rows under a header row.
    InsertTable { rows: usize, cols: usize },
    Table(TableOp),
    /// Set the link over the selection; an empty URL removes it.
    SetLink(String),
    UnsetLink,
}

/// Whether dispatch reached the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The engine applied a change.
    Applied,
    /// Nothing to do: the command was illegal, malformed, or had no effect.
    Ignored,
}

impl DispatchOutcome {
    pub fn is_applied(self) -> bool {
        self == DispatchOutcome::Applied
    }
}

impl FormatCommand {
    /// The engine command this intent maps to under `context`, or `None`
    /// when it must not reach the engine.
    pub fn resolve(&self, context: &SelectionContext) -> Option<EngineCommand> {
        if !context.is_ready() {
            return None;
        }
        let command = match self {
            FormatCommand::ToggleMark(kind) => EngineCommand::ToggleMark(*kind),
            FormatCommand::SetBlock(BlockStyle::Paragraph) => EngineCommand::SetParagraph,
            FormatCommand::SetBlock(BlockStyle::Heading(level)) => {
                EngineCommand::SetHeading(*level)
            }
            FormatCommand::ToggleBlockquote => EngineCommand::ToggleBlockquote,
            FormatCommand::ToggleCodeBlock => EngineCommand::ToggleCodeBlock,
            FormatCommand::ToggleBulletList => EngineCommand::ToggleBulletList,
            FormatCommand::ToggleOrderedList => EngineCommand::ToggleOrderedList,
            FormatCommand::SetAlign(align) => EngineCommand::SetTextAlign(*align),
            FormatCommand::InsertTable { rows, cols } => {
                if *rows == 0 || *cols == 0 {
                    return None;
                }
                EngineCommand::InsertTable {
                    rows: *rows,
                    cols: *cols,
                    header_row: true,
                }
            }
            FormatCommand::Table(op) => {
                if !context.is_legal(*op) {
                    return None;
                }
                EngineCommand::Table(*op)
            }
            FormatCommand::SetLink(url) => {
                if url.is_empty() {
                    if !context.is_active(Capability::Link) {
                        return None;
                    }
                    EngineCommand::UnsetLink
                } else {
                    EngineCommand::SetLink {
                        href: url.to_string(),
                    }
                }
            }
            FormatCommand::UnsetLink => {
                if !context.is_active(Capability::Link) {
                    return None;
                }
                EngineCommand::UnsetLink
            }
        };
        Some(command)
    }
}
