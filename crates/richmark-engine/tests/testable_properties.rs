use pretty_assertions::assert_eq;
use rstest::rstest;

use richmark_engine::document::Document;
use richmark_engine::document::model::{Block, HeadingLevel};
use richmark_engine::document::selection::Selection;
use richmark_engine::editing::{
    BlockStyle, Capability, DispatchOutcome, Editor, EngineCommand, FormatCommand,
};
use richmark_engine::export::canonicalize;
use richmark_engine::overlay::grid::{GridSelector, GridSize, InputMode};
use richmark_engine::overlay::{Placement, Rect, place};

fn editor(markup: &str) -> Editor<Document> {
    Editor::with_engine(Document::from_markup(markup), InputMode::Pointer)
}

#[rstest]
#[case(BlockStyle::Paragraph)]
#[case(BlockStyle::Heading(HeadingLevel::H1))]
#[case(BlockStyle::Heading(HeadingLevel::H2))]
#[case(BlockStyle::Heading(HeadingLevel::H3))]
#[case(BlockStyle::Heading(HeadingLevel::H4))]
#[case(BlockStyle::Heading(HeadingLevel::H5))]
#[case(BlockStyle::Heading(HeadingLevel::H6))]
fn block_style_is_active_after_setting_it(#[case] style: BlockStyle) {
    for start in ["<p>text</p>", "<h3>text</h3>"] {
        let mut editor = editor(start);
        editor.dispatch(FormatCommand::SetBlock(style));
        for other in BlockStyle::ALL {
            assert_eq!(
                editor.context().is_active(other.capability()),
                other == style,
                "{other:?} after setting {style:?} from {start}"
            );
        }
    }
}

#[rstest]
#[case("<p>plain</p>")]
#[case(r#"<table style="min-width: 50px"><colgroup><col style="min-width: 25px"><col style="min-width: 25px"></colgroup><tbody><tr><th colspan="1" rowspan="1"><p>a</p></th><th colspan="2" rowspan="1"><p></p></th></tr></tbody></table>"#)]
#[case("<table><tr><td><p><p>double</p></p></td></tr></table>")]
#[case("<table><tr><td class=\"c\"><p>a</p><p>b</p></td></tr></table><p>after</p>")]
#[case("<div><table><tr><th style=\"width: 1px\"><p><em>x</em></p></th></tr></table></div>")]
#[case("")]
fn canonicalizer_is_idempotent(#[case] markup: &str) {
    let once = canonicalize(markup);
    assert_eq!(canonicalize(&once), once);
}

#[test]
fn single_paragraph_cell_is_unwrapped() {
    assert_eq!(
        canonicalize("<table><tbody><tr><td><p>Hi</p></td></tr></tbody></table>"),
        "<table><tbody><tr><td>Hi</td></tr></tbody></table>"
    );
}

#[test]
fn pointer_grid_hover_and_click() {
    let mut grid = GridSelector::new(InputMode::Pointer);
    grid.hover(2, 3);
    assert_eq!(grid.staged(), GridSize::new(2, 3));

    let highlighted = (1..=10)
        .flat_map(|row| (1..=10).map(move |col| (row, col)))
        .filter(|(row, col)| grid.is_highlighted(*row, *col))
        .count();
    assert_eq!(highlighted, 6);
    assert!(grid.is_highlighted(2, 3));
    assert!(!grid.is_highlighted(3, 1));

    assert_eq!(grid.press(2, 3), Some(GridSize::new(2, 3)));
}

#[test]
fn pointer_grid_click_inserts_exactly_one_table() {
    let mut editor = Editor::with_engine(Document::new(), InputMode::Pointer);
    editor.grid_hover(2, 3);
    assert_eq!(editor.grid_press(2, 3), DispatchOutcome::Applied);
    let tables = editor
        .engine()
        .map(|document| {
            document
                .blocks()
                .iter()
                .filter(|block| matches!(block, Block::Table(_)))
                .count()
        })
        .unwrap_or_default();
    assert_eq!(tables, 1);
}

#[test]
fn touch_grid_tap_and_confirm() {
    let mut grid = GridSelector::new(InputMode::Touch);
    grid.press(4, 2);
    assert_eq!(grid.confirmed(), GridSize::new(4, 2));
    assert_eq!(grid.confirm_label().as_deref(), Some("Insertar 2x4"));

    assert_eq!(grid.confirm(), Some(GridSize::new(4, 2)));
    assert_eq!(grid.confirmed(), GridSize::NONE);
}

#[test]
fn link_round_trip() {
    let mut editor = editor("<p>see the docs</p>");
    let select = EngineCommand::Select(Selection::text(vec![0], 4, 8));

    editor.input(select.clone());
    editor.dispatch(FormatCommand::SetLink("https://example.com".to_string()));

    editor.input(select.clone());
    editor.open_overlay(richmark_engine::overlay::OverlayKind::LinkEditor, None);
    assert_eq!(editor.link_editor().url(), "https://example.com");

    editor.set_link_url("");
    editor.commit_link();
    editor.input(select);
    assert!(!editor.context().is_active(Capability::Link));
}

#[test]
fn placement_near_the_right_edge() {
    let trigger = Rect::new(950.0, 0.0, 32.0, 32.0);
    assert_eq!(place(trigger, 240.0, 1000.0), Placement::Right);

    let roomy = Rect::new(300.0, 0.0, 32.0, 32.0);
    assert_eq!(place(roomy, 240.0, 1000.0), Placement::Left);
}

#[test]
fn insert_table_has_a_header_row_and_three_data_rows() {
    let mut editor = Editor::with_engine(Document::new(), InputMode::Pointer);
    editor.dispatch(FormatCommand::InsertTable { rows: 3, cols: 3 });

    let Some(Block::Table(table)) = editor.engine().and_then(|d| d.blocks().first()) else {
        panic!("expected a table");
    };
    assert_eq!(table.rows.len(), 4);
    assert!(table.rows[0].cells.iter().all(|cell| cell.header));
    for row in &table.rows[1..] {
        assert_eq!(row.cells.len(), 3);
        assert!(row.cells.iter().all(|cell| !cell.header));
    }
}
