//! The editor session: sole writer of the document.
//!
//! [`Editor`] owns the engine and everything derived from it. Each event
//! handler runs to completion and leaves the selection context, the export
//! snapshot and the overlays consistent with the engine before returning.

use std::time::Instant;

use anyhow::Context;
use serde::Serialize;

use super::capability::SelectionContext;
use super::commands::{BlockStyle, DispatchOutcome, FormatCommand};
use super::engine::{Capability, Change, DocumentEngine, EngineCommand, TableOp};
use super::toolbar::Toolbar;
use crate::export::ExportSnapshot;
use crate::io::{DOCUMENT_KEY, Storage};
use crate::notification::{self, Notification, NotificationKind, Notifier};
use crate::overlay::grid::{GridSelector, GridSize, InputMode};
use crate::overlay::link::{LinkAction, LinkEditor, LinkKey};
use crate::overlay::{Layout, OverlayKind, OverlayManager, PointerDown};
use crate::services::{Clipboard, Identity};

/// Shown in an empty editor.
pub const PLACEHOLDER: &str = "Escribe tu contenido aquí...";

/// Which representation the host shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputView {
    #[default]
    Editor,
    Html,
    Markdown,
}

/// Result of a save or load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Done,
    /// Save and load are only offered to signed-in users.
    NotSignedIn,
    /// Load found nothing in the slot.
    NothingStored,
}

pub struct Editor<E> {
    engine: Option<E>,
    context: SelectionContext,
    export: ExportSnapshot,
    overlays: OverlayManager,
    link: LinkEditor,
    grid: GridSelector,
    view: OutputView,
    notifier: Notifier,
}

impl<E: DocumentEngine> Editor<E> {
    /// An editor whose engine is not ready yet. Every query reports
    /// nothing active and every command is ignored until [`Editor::attach`].
    pub fn new(input_mode: InputMode) -> Self {
        Self {
            engine: None,
            context: SelectionContext::default(),
            export: ExportSnapshot::default(),
            overlays: OverlayManager::mounted(),
            link: LinkEditor::new(),
            grid: GridSelector::new(input_mode),
            view: OutputView::default(),
            notifier: Notifier::new(),
        }
    }

    pub fn with_engine(engine: E, input_mode: InputMode) -> Self {
        let mut editor = Self::new(input_mode);
        editor.attach(engine);
        editor
    }

    pub fn attach(&mut self, engine: E) {
        self.engine = Some(engine);
        self.refresh(Change::Content);
    }

    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    pub fn context(&self) -> &SelectionContext {
        &self.context
    }

    pub fn export(&self) -> &ExportSnapshot {
        &self.export
    }

    pub fn toolbar(&self) -> Toolbar {
        Toolbar::from_context(&self.context)
    }

    /// Placeholder text while the document has no content.
    pub fn placeholder(&self) -> Option<&'static str> {
        (self.engine.is_some() && self.export.portable_text().is_empty()).then_some(PLACEHOLDER)
    }

    /// Run a user intent against the engine.
    ///
    /// Illegal or malformed intents are ignored, never reported as errors.
    pub fn dispatch(&mut self, command: FormatCommand) -> DispatchOutcome {
        let is_link = matches!(command, FormatCommand::SetLink(_) | FormatCommand::UnsetLink);
        let Some(engine_command) = command.resolve(&self.context) else {
            log::debug!("Ignored {command:?}");
            if is_link {
                self.close_overlay(OverlayKind::LinkEditor);
            }
            return DispatchOutcome::Ignored;
        };
        log::debug!("Dispatching {engine_command:?}");
        let change = self.apply(engine_command);
        if is_link {
            self.close_overlay(OverlayKind::LinkEditor);
        }
        if change.is_none() {
            DispatchOutcome::Ignored
        } else {
            DispatchOutcome::Applied
        }
    }

    /// Forward an editing event (typing, selection, content) to the engine.
    pub fn input(&mut self, command: EngineCommand) -> Change {
        self.apply(command)
    }

    fn apply(&mut self, command: EngineCommand) -> Change {
        let Some(engine) = self.engine.as_mut() else {
            return Change::None;
        };
        let change = engine.apply(command);
        self.refresh(change);
        change
    }

    /// Recompute everything derived from the engine.
    fn refresh(&mut self, change: Change) {
        if change.is_none() {
            return;
        }
        self.context = SelectionContext::query_optional(self.engine.as_ref());
        if change == Change::Content {
            if let Some(engine) = &self.engine {
                self.export = ExportSnapshot::from_markup(&engine.structural_markup());
            }
            if self.link.is_editing() && !self.context.is_active(Capability::Link) {
                self.close_overlay(OverlayKind::LinkEditor);
            }
        }
        log::debug!("Refreshed after {change:?}");
    }

    pub fn overlays(&self) -> &OverlayManager {
        &self.overlays
    }

    /// Open an overlay. The link editor is pre-filled from the selection.
    pub fn open_overlay(&mut self, kind: OverlayKind, layout: Option<Layout>) {
        let opened = match layout {
            Some(layout) => self.overlays.open(kind, layout),
            None => self.overlays.open_unplaced(kind),
        };
        if opened && kind == OverlayKind::LinkEditor {
            self.link.open(self.context.link_href());
        }
    }

    pub fn close_overlay(&mut self, kind: OverlayKind) {
        self.overlays.close(kind);
        self.after_close(kind);
    }

    pub fn toggle_overlay(&mut self, kind: OverlayKind, layout: Option<Layout>) {
        if self.overlays.is_open(kind) {
            self.close_overlay(kind);
        } else {
            self.open_overlay(kind, layout);
        }
    }

    fn after_close(&mut self, kind: OverlayKind) {
        match kind {
            OverlayKind::LinkEditor => self.link.cancel(),
            OverlayKind::TableGrid => self.grid.reset(),
            OverlayKind::StyleMenu | OverlayKind::TableMenu => {}
        }
    }

    /// A pointer press anywhere in the window.
    pub fn pointer_down(&mut self, press: &PointerDown) {
        for kind in self.overlays.pointer_down(press) {
            self.after_close(kind);
        }
    }

    /// Pick a block style from the style menu.
    pub fn choose_style(&mut self, style: BlockStyle) -> DispatchOutcome {
        let outcome = self.dispatch(FormatCommand::SetBlock(style));
        self.close_overlay(OverlayKind::StyleMenu);
        outcome
    }

    /// Run an entry of the table menu. The menu closes once it applies.
    pub fn table_menu(&mut self, op: TableOp) -> DispatchOutcome {
        let outcome = self.dispatch(FormatCommand::Table(op));
        if outcome.is_applied() {
            self.close_overlay(OverlayKind::TableMenu);
        }
        outcome
    }

    pub fn link_editor(&self) -> &LinkEditor {
        &self.link
    }

    /// The deferred focus request of the link input, once per open.
    pub fn tick(&mut self) -> bool {
        self.link.take_focus()
    }

    pub fn set_link_url(&mut self, url: impl Into<String>) {
        self.link.set_url(url);
    }

    pub fn link_key(&mut self, key: LinkKey) -> DispatchOutcome {
        match self.link.key(key) {
            Some(LinkAction::Commit(command)) => self.dispatch(command),
            Some(LinkAction::Cancel) => {
                self.close_overlay(OverlayKind::LinkEditor);
                DispatchOutcome::Ignored
            }
            None => DispatchOutcome::Ignored,
        }
    }

    /// The link editor's accept button.
    pub fn commit_link(&mut self) -> DispatchOutcome {
        self.link_key(LinkKey::Enter)
    }

    /// The link editor's cancel button.
    pub fn cancel_link(&mut self) {
        self.link_key(LinkKey::Escape);
    }

    pub fn grid(&self) -> &GridSelector {
        &self.grid
    }

    pub fn grid_hover(&mut self, row: usize, col: usize) {
        self.grid.hover(row, col);
    }

    pub fn grid_leave(&mut self) {
        self.grid.leave();
    }

    pub fn grid_press(&mut self, row: usize, col: usize) -> DispatchOutcome {
        match self.grid.press(row, col) {
            Some(size) => self.insert_table(size),
            None => DispatchOutcome::Ignored,
        }
    }

    /// The touch-mode confirmation control.
    pub fn grid_confirm(&mut self) -> DispatchOutcome {
        match self.grid.confirm() {
            Some(size) => self.insert_table(size),
            None => DispatchOutcome::Ignored,
        }
    }

    fn insert_table(&mut self, size: GridSize) -> DispatchOutcome {
        let outcome = self.dispatch(FormatCommand::InsertTable {
            rows: size.rows,
            cols: size.cols,
        });
        self.close_overlay(OverlayKind::TableGrid);
        outcome
    }

    pub fn view(&self) -> OutputView {
        self.view
    }

    pub fn set_view(&mut self, view: OutputView) {
        self.view = view;
    }

    /// The representation the current view shows. The editor view copies
    /// as portable text.
    pub fn output(&self) -> &str {
        match self.view {
            OutputView::Html => self.export.canonical_markup(),
            OutputView::Editor | OutputView::Markdown => self.export.portable_text(),
        }
    }

    pub fn copy_to_clipboard(&mut self, clipboard: &mut dyn Clipboard) -> bool {
        match clipboard.write_text(self.output()) {
            Ok(()) => {
                self.notify(notification::COPIED, NotificationKind::Info);
                true
            }
            Err(e) => {
                log::warn!("Copy to clipboard failed: {e}");
                self.notify(notification::COPY_FAILED, NotificationKind::Error);
                false
            }
        }
    }

    /// Whether the save and load controls are shown.
    pub fn can_persist(&self, identity: &dyn Identity) -> bool {
        identity.is_signed_in()
    }

    /// Store the canonical markup in the document slot.
    pub fn save(
        &mut self,
        identity: &dyn Identity,
        storage: &mut dyn Storage,
    ) -> anyhow::Result<PersistOutcome> {
        if !self.can_persist(identity) {
            return Ok(PersistOutcome::NotSignedIn);
        }
        match storage.store(DOCUMENT_KEY, self.export.canonical_markup()) {
            Ok(()) => {
                log::info!("Saved document to {DOCUMENT_KEY}");
                self.notify(notification::SAVED, NotificationKind::Info);
                Ok(PersistOutcome::Done)
            }
            Err(e) => {
                log::warn!("Saving document failed: {e}");
                self.notify(notification::SAVE_FAILED, NotificationKind::Error);
                Err(e).context("Failed to save document")
            }
        }
    }

    /// Replace the document with the one in the slot.
    pub fn load(
        &mut self,
        identity: &dyn Identity,
        storage: &dyn Storage,
    ) -> anyhow::Result<PersistOutcome> {
        if !self.can_persist(identity) {
            return Ok(PersistOutcome::NotSignedIn);
        }
        match storage.retrieve(DOCUMENT_KEY) {
            Ok(Some(markup)) => {
                self.apply(EngineCommand::SetContent(markup));
                log::info!("Loaded document from {DOCUMENT_KEY}");
                self.notify(notification::LOADED, NotificationKind::Info);
                Ok(PersistOutcome::Done)
            }
            Ok(None) => {
                log::info!("Nothing stored under {DOCUMENT_KEY}");
                self.notify(notification::NOTHING_SAVED, NotificationKind::Info);
                Ok(PersistOutcome::NothingStored)
            }
            Err(e) => {
                log::warn!("Loading document failed: {e}");
                self.notify(notification::LOAD_FAILED, NotificationKind::Error);
                Err(e).context("Failed to load document")
            }
        }
    }

    fn notify(&mut self, message: &str, kind: NotificationKind) {
        self.notifier.show(message, kind, Instant::now());
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification_at(Instant::now())
    }

    pub fn notification_at(&self, now: Instant) -> Option<&Notification> {
        self.notifier.visible(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::document::model::{HeadingLevel, MarkKind};
    use crate::document::selection::Selection;
    use crate::io::MemoryStorage;
    use crate::overlay::{PanelSize, Placement, Rect};
    use crate::services::{MemoryClipboard, StaticIdentity};
    use crate::tests::document_with_selection;
    use pretty_assertions::assert_eq;

    fn editor(markup: &str) -> Editor<Document> {
        Editor::with_engine(Document::from_markup(markup), InputMode::Pointer)
    }

    fn select(editor: &mut Editor<Document>, path: Vec<usize>, from: usize, to: usize) {
        editor.input(EngineCommand::Select(Selection::text(path, from, to)));
    }

    #[test]
    fn uninitialized_editor_ignores_everything() {
        let mut editor: Editor<Document> = Editor::new(InputMode::Pointer);
        assert!(!editor.context().is_ready());
        assert_eq!(
            editor.dispatch(FormatCommand::ToggleMark(MarkKind::Bold)),
            DispatchOutcome::Ignored
        );
        assert_eq!(editor.input(EngineCommand::InsertText("x".into())), Change::None);
        assert_eq!(editor.export(), &ExportSnapshot::default());
        assert_eq!(editor.placeholder(), None);
    }

    #[test]
    fn dispatch_refreshes_context_and_export_before_returning() {
        let mut editor = editor("<p>hello world</p>");
        select(&mut editor, vec![0], 0, 5);
        assert_eq!(
            editor.dispatch(FormatCommand::ToggleMark(MarkKind::Bold)),
            DispatchOutcome::Applied
        );
        assert!(editor.context().is_active(Capability::Mark(MarkKind::Bold)));
        assert_eq!(editor.export().portable_text(), "**hello** world");
        assert_eq!(
            editor.export().canonical_markup(),
            "<p><strong>hello</strong> world</p>"
        );
    }

    #[test]
    fn heading_is_set_not_toggled() {
        let mut editor = editor("<p>t</p>");
        let h2 = FormatCommand::SetBlock(BlockStyle::Heading(HeadingLevel::H2));
        assert!(editor.dispatch(h2.clone()).is_applied());
        assert_eq!(editor.dispatch(h2), DispatchOutcome::Ignored);
        assert_eq!(editor.context().heading_level(), Some(HeadingLevel::H2));
        assert_eq!(editor.export().portable_text(), "## t");
    }

    #[test]
    fn placeholder_shows_for_an_empty_document() {
        let mut editor = Editor::with_engine(Document::new(), InputMode::Pointer);
        assert_eq!(editor.placeholder(), Some(PLACEHOLDER));
        editor.input(EngineCommand::InsertText("hi".into()));
        assert_eq!(editor.placeholder(), None);
    }

    #[test]
    fn link_editor_round_trip() {
        let mut editor = editor("<p>click here</p>");
        select(&mut editor, vec![0], 6, 10);

        editor.open_overlay(OverlayKind::LinkEditor, None);
        assert!(editor.tick());
        assert_eq!(editor.link_editor().url(), "");
        editor.set_link_url("https://example.com");
        assert!(editor.link_key(LinkKey::Enter).is_applied());
        assert!(!editor.overlays().is_open(OverlayKind::LinkEditor));
        assert_eq!(
            editor.export().portable_text(),
            "click [here](https://example.com)"
        );

        select(&mut editor, vec![0], 6, 10);
        editor.open_overlay(OverlayKind::LinkEditor, None);
        assert_eq!(editor.link_editor().url(), "https://example.com");

        editor.set_link_url("");
        assert!(editor.commit_link().is_applied());
        assert!(!editor.context().is_active(Capability::Link));
        assert_eq!(editor.export().portable_text(), "click here");
    }

    #[test]
    fn cancel_leaves_the_document_alone() {
        let mut editor = editor("<p>text</p>");
        select(&mut editor, vec![0], 0, 4);
        editor.open_overlay(OverlayKind::LinkEditor, None);
        editor.set_link_url("https://nowhere.test");
        editor.cancel_link();
        assert!(!editor.overlays().is_open(OverlayKind::LinkEditor));
        assert!(!editor.context().is_active(Capability::Link));
        assert_eq!(editor.export().portable_text(), "text");
    }

    #[test]
    fn outside_press_cancels_the_link_editor() {
        let mut editor = editor("<p>text</p>");
        editor.open_overlay(OverlayKind::LinkEditor, None);
        editor.set_link_url("https://x.test");
        editor.pointer_down(&PointerDown::at(500.0, 500.0));
        assert!(!editor.overlays().is_open(OverlayKind::LinkEditor));
        assert!(!editor.link_editor().is_editing());
    }

    #[test]
    fn press_on_the_link_button_keeps_the_editor_open() {
        let mut editor = editor("<p>text</p>");
        editor.open_overlay(OverlayKind::LinkEditor, None);
        editor.pointer_down(&PointerDown::on_control(1.0, 1.0, "Añadir/Editar enlace"));
        assert!(editor.overlays().is_open(OverlayKind::LinkEditor));
    }

    #[test]
    fn link_editor_closes_when_the_link_goes_away() {
        let document = document_with_selection(
            r#"<p><a href="https://example.com">site</a> and more</p>"#,
            vec![0],
            (0, 4),
        );
        let mut editor = Editor::with_engine(document, InputMode::Pointer);
        editor.open_overlay(OverlayKind::LinkEditor, None);
        assert_eq!(editor.link_editor().url(), "https://example.com");

        assert!(editor.dispatch(FormatCommand::UnsetLink).is_applied());
        assert!(!editor.overlays().is_open(OverlayKind::LinkEditor));
    }

    #[test]
    fn pointer_grid_inserts_a_table() {
        let mut editor = Editor::with_engine(Document::new(), InputMode::Pointer);
        editor.open_overlay(OverlayKind::TableGrid, None);
        editor.grid_hover(2, 3);
        assert!(editor.grid_press(2, 3).is_applied());
        assert!(!editor.overlays().is_open(OverlayKind::TableGrid));
        assert!(editor.context().in_table());
        assert_eq!(
            editor.export().portable_text(),
            "|  |  |  |\n| --- | --- | --- |\n|  |  |  |\n|  |  |  |"
        );
    }

    #[test]
    fn touch_grid_waits_for_confirmation() {
        let mut editor = Editor::with_engine(Document::new(), InputMode::Touch);
        editor.open_overlay(OverlayKind::TableGrid, None);
        assert_eq!(editor.grid_press(4, 2), DispatchOutcome::Ignored);
        assert!(!editor.context().in_table());
        assert_eq!(editor.grid().confirm_label().as_deref(), Some("Insertar 2x4"));

        assert!(editor.grid_confirm().is_applied());
        assert!(editor.context().in_table());
        assert_eq!(editor.grid().confirmed(), GridSize::NONE);
    }

    #[test]
    fn dismissed_touch_grid_forgets_its_pick() {
        let mut editor = Editor::with_engine(Document::new(), InputMode::Touch);
        editor.open_overlay(OverlayKind::TableGrid, None);
        editor.grid_press(4, 2);
        editor.pointer_down(&PointerDown::at(5000.0, 5000.0));
        assert!(!editor.overlays().is_open(OverlayKind::TableGrid));

        editor.open_overlay(OverlayKind::TableGrid, None);
        assert_eq!(editor.grid().confirmed(), GridSize::NONE);
        assert_eq!(editor.grid().confirm_label(), None);
        assert_eq!(editor.grid_confirm(), DispatchOutcome::Ignored);
        assert!(!editor.context().in_table());
    }

    #[test]
    fn illegal_table_menu_entry_is_a_no_op() {
        let mut editor = editor("<p>x</p>");
        editor.open_overlay(OverlayKind::TableMenu, None);
        assert_eq!(editor.table_menu(TableOp::DeleteRow), DispatchOutcome::Ignored);
        assert!(editor.overlays().is_open(OverlayKind::TableMenu));
    }

    #[test]
    fn style_menu_closes_after_a_choice() {
        let mut editor = editor("<p>x</p>");
        let layout = Layout::new(Rect::new(960.0, 0.0, 30.0, 30.0), PanelSize {
            width: 160.0,
            height: 200.0,
        }, 1000.0);
        editor.open_overlay(OverlayKind::StyleMenu, Some(layout));
        assert_eq!(
            editor.overlays().state(OverlayKind::StyleMenu).map(|s| s.placement()),
            Some(Placement::Right)
        );
        assert!(editor.choose_style(BlockStyle::Heading(HeadingLevel::H1)).is_applied());
        assert!(!editor.overlays().is_open(OverlayKind::StyleMenu));
        assert_eq!(editor.export().portable_text(), "# x");
    }

    #[test]
    fn copy_uses_the_active_view() {
        let mut editor = editor("<h1>T</h1>");
        let mut clipboard = MemoryClipboard::new();

        editor.set_view(OutputView::Html);
        assert!(editor.copy_to_clipboard(&mut clipboard));
        assert_eq!(clipboard.contents(), Some("<h1>T</h1>"));

        editor.set_view(OutputView::Markdown);
        assert!(editor.copy_to_clipboard(&mut clipboard));
        assert_eq!(clipboard.contents(), Some("# T"));
        assert_eq!(
            editor.notification().map(|n| n.message.as_str()),
            Some(notification::COPIED)
        );
    }

    #[test]
    fn copy_failure_is_reported() {
        let mut editor = editor("<p>x</p>");
        let mut clipboard = MemoryClipboard::unavailable();
        assert!(!editor.copy_to_clipboard(&mut clipboard));
        let shown = editor.notification().map(|n| (n.message.as_str(), n.kind));
        assert_eq!(shown, Some((notification::COPY_FAILED, NotificationKind::Error)));
    }

    #[test]
    fn save_and_load_need_a_signed_in_user() {
        let mut editor = editor("<p>x</p>");
        let mut storage = MemoryStorage::new();
        let anonymous = StaticIdentity::anonymous();
        assert_eq!(
            editor.save(&anonymous, &mut storage).unwrap(),
            PersistOutcome::NotSignedIn
        );
        assert_eq!(storage.retrieve(DOCUMENT_KEY).unwrap(), None);
        assert_eq!(
            editor.load(&anonymous, &storage).unwrap(),
            PersistOutcome::NotSignedIn
        );
    }

    #[test]
    fn load_with_an_empty_slot_informs() {
        let mut editor = editor("<p>x</p>");
        let identity = StaticIdentity::signed_in("ada");
        assert_eq!(
            editor.load(&identity, &MemoryStorage::new()).unwrap(),
            PersistOutcome::NothingStored
        );
        let shown = editor.notification().map(|n| (n.message.as_str(), n.kind));
        assert_eq!(shown, Some((notification::NOTHING_SAVED, NotificationKind::Info)));
    }

    #[test]
    fn save_then_load_restores_the_document() {
        let identity = StaticIdentity::signed_in("ada");
        let mut storage = MemoryStorage::new();

        let mut first = editor("<h2>Kept</h2><p>body</p>");
        assert_eq!(first.save(&identity, &mut storage).unwrap(), PersistOutcome::Done);

        let mut second = editor("<p>other</p>");
        assert_eq!(second.load(&identity, &storage).unwrap(), PersistOutcome::Done);
        assert_eq!(second.export(), first.export());
        assert_eq!(second.export().portable_text(), "## Kept\n\nbody");
    }
}
