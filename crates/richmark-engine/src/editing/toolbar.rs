//! Toolbar view model.
//!
//! Every flag on every control comes from one [`SelectionContext`], so
//! what the toolbar shows and what dispatch accepts cannot disagree.

use std::fmt;

use super::capability::SelectionContext;
use super::commands::{BlockStyle, FormatCommand};
use super::engine::{Capability, TableOp};
use crate::document::model::{Align, HeadingLevel, MarkKind};
use crate::overlay::OverlayKind;

/// What pressing a control does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolbarAction {
    Dispatch(FormatCommand),
    Toggle(OverlayKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolbarButton {
    pub title: &'static str,
    pub active: bool,
    pub enabled: bool,
    pub action: ToolbarAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleOption {
    pub label: &'static str,
    pub style: BlockStyle,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolbar {
    pub styles: Vec<StyleOption>,
    pub groups: Vec<Vec<ToolbarButton>>,
    /// Structural table edits, shown in the table menu.
    pub table_menu: Vec<ToolbarButton>,
}

pub const STYLE_MENU_TITLE: &str = "Estilo de párrafo";
pub const TABLE_GRID_TITLE: &str = "Insertar tabla";
pub const TABLE_MENU_TITLE: &str = "Editar tabla";
pub const LINK_TITLE: &str = "Añadir/Editar enlace";
pub const UNLINK_TITLE: &str = "Quitar enlace";

pub fn style_label(style: BlockStyle) -> &'static str {
    match style {
        BlockStyle::Paragraph => "Párrafo",
        BlockStyle::Heading(HeadingLevel::H1) => "Título 1",
        BlockStyle::Heading(HeadingLevel::H2) => "Título 2",
        BlockStyle::Heading(HeadingLevel::H3) => "Título 3",
        BlockStyle::Heading(HeadingLevel::H4) => "Título 4",
        BlockStyle::Heading(HeadingLevel::H5) => "Título 5",
        BlockStyle::Heading(HeadingLevel::H6) => "Título 6",
    }
}

fn table_title(op: TableOp) -> &'static str {
    match op {
        TableOp::AddColumnBefore => "Añadir Columna Antes",
        TableOp::AddColumnAfter => "Añadir Columna Después",
        TableOp::DeleteColumn => "Eliminar Columna",
        TableOp::AddRowBefore => "Añadir Fila Antes",
        TableOp::AddRowAfter => "Añadir Fila Después",
        TableOp::DeleteRow => "Eliminar Fila",
        TableOp::DeleteTable => "Eliminar Tabla",
        TableOp::MergeCells => "Fusionar Celdas",
        TableOp::SplitCell => "Dividir Celda",
        TableOp::ToggleHeaderColumn => "Alternar Columna de Encabezado",
        TableOp::ToggleHeaderRow => "Alternar Fila de Encabezado",
        TableOp::ToggleHeaderCell => "Alternar Celda de Encabezado",
    }
}

const TABLE_MENU_ORDER: [TableOp; 12] = [
    TableOp::AddColumnBefore,
    TableOp::AddColumnAfter,
    TableOp::DeleteColumn,
    TableOp::AddRowBefore,
    TableOp::AddRowAfter,
    TableOp::DeleteRow,
    TableOp::DeleteTable,
    TableOp::MergeCells,
    TableOp::SplitCell,
    TableOp::ToggleHeaderColumn,
    TableOp::ToggleHeaderRow,
    TableOp::ToggleHeaderCell,
];

impl Toolbar {
    pub fn from_context(context: &SelectionContext) -> Self {
        let ready = context.is_ready();
        let current = BlockStyle::current(context);
        let styles = BlockStyle::ALL
            .into_iter()
            .map(|style| StyleOption {
                label: style_label(style),
                style,
                selected: ready && style == current,
            })
            .collect();

        let toggle = |title: &'static str, capability: Capability, command: FormatCommand| {
            ToolbarButton {
                title,
                active: context.is_active(capability),
                enabled: ready,
                action: ToolbarAction::Dispatch(command),
            }
        };
        let align = |title: &'static str, align: Align| {
            toggle(title, Capability::Align(align), FormatCommand::SetAlign(align))
        };

        let groups = vec![
            vec![
                ToolbarButton {
                    title: STYLE_MENU_TITLE,
                    active: false,
                    enabled: ready,
                    action: ToolbarAction::Toggle(OverlayKind::StyleMenu),
                },
                toggle(
                    "Negrita",
                    Capability::Mark(MarkKind::Bold),
                    FormatCommand::ToggleMark(MarkKind::Bold),
                ),
                toggle(
                    "Itálica",
                    Capability::Mark(MarkKind::Italic),
                    FormatCommand::ToggleMark(MarkKind::Italic),
                ),
                toggle(
                    "Subrayado",
                    Capability::Mark(MarkKind::Underline),
                    FormatCommand::ToggleMark(MarkKind::Underline),
                ),
            ],
            vec![
                toggle(
                    "Lista con viñetas",
                    Capability::BulletList,
                    FormatCommand::ToggleBulletList,
                ),
                toggle(
                    "Lista numerada",
                    Capability::OrderedList,
                    FormatCommand::ToggleOrderedList,
                ),
            ],
            vec![
                toggle("Cita", Capability::Blockquote, FormatCommand::ToggleBlockquote),
                toggle(
                    "Bloque de código",
                    Capability::CodeBlock,
                    FormatCommand::ToggleCodeBlock,
                ),
            ],
            vec![
                ToolbarButton {
                    title: LINK_TITLE,
                    active: context.is_active(Capability::Link),
                    enabled: ready,
                    action: ToolbarAction::Toggle(OverlayKind::LinkEditor),
                },
                ToolbarButton {
                    title: UNLINK_TITLE,
                    active: false,
                    enabled: context.is_active(Capability::Link),
                    action: ToolbarAction::Dispatch(FormatCommand::UnsetLink),
                },
            ],
            vec![
                align("Alinear a la izquierda", Align::Left),
                align("Alinear al centro", Align::Center),
                align("Alinear a la derecha", Align::Right),
                align("Justificar", Align::Justify),
            ],
            vec![
                ToolbarButton {
                    title: TABLE_GRID_TITLE,
                    active: false,
                    enabled: ready,
                    action: ToolbarAction::Toggle(OverlayKind::TableGrid),
                },
                ToolbarButton {
                    title: TABLE_MENU_TITLE,
                    active: false,
                    enabled: context.in_table(),
                    action: ToolbarAction::Toggle(OverlayKind::TableMenu),
                },
            ],
        ];

        let table_menu = TABLE_MENU_ORDER
            .into_iter()
            .map(|op| ToolbarButton {
                title: table_title(op),
                active: match op {
                    TableOp::ToggleHeaderRow => context.is_active(Capability::HeaderRow),
                    TableOp::ToggleHeaderColumn => context.is_active(Capability::HeaderColumn),
                    TableOp::ToggleHeaderCell => context.is_active(Capability::HeaderCell),
                    _ => false,
                },
                enabled: context.is_legal(op),
                action: ToolbarAction::Dispatch(FormatCommand::Table(op)),
            })
            .collect();

        Self {
            styles,
            groups,
            table_menu,
        }
    }

    pub fn buttons(&self) -> impl Iterator<Item = &ToolbarButton> {
        self.groups.iter().flatten().chain(&self.table_menu)
    }

    pub fn button(&self, title: &str) -> Option<&ToolbarButton> {
        self.buttons().find(|button| button.title == title)
    }

    /// Label of the selected style, if the engine is ready.
    pub fn current_style(&self) -> Option<&'static str> {
        self.styles
            .iter()
            .find(|option| option.selected)
            .map(|option| option.label)
    }
}

impl fmt::Display for ToolbarButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.active { "x" } else { " " };
        write!(f, "[{mark}] {}", self.title)?;
        if !self.enabled {
            write!(f, " (desactivado)")?;
        }
        Ok(())
    }
}

impl fmt::Display for Toolbar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{STYLE_MENU_TITLE}: {}", self.current_style().unwrap_or("-"))?;
        for group in &self.groups {
            for button in group {
                writeln!(f, "{button}")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "{TABLE_MENU_TITLE}:")?;
        for button in &self.table_menu {
            writeln!(f, "  {button}")?;
        }
        Ok(())
    }
}
