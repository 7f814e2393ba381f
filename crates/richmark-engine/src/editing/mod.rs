/*!
 * # Editing Layer
 *
 * The command-and-state synchronization layer between a rich-text engine
 * and the controls around it.
 *
 * ## Architecture Overview
 *
 * ### 1. The Engine Is an External Collaborator
 * - Everything here talks to the document through the **`DocumentEngine`**
 *   trait: structural markup out, activity and legality queries, commands in
 * - The crate ships [`crate::document::Document`] as the reference engine
 *
 * ### 2. Derived State as Snapshots
 * - **`SelectionContext`** answers "what is active" and "what is legal" for
 *   the whole toolbar at once
 * - **`ExportSnapshot`** holds canonical markup and the portable text
 *   serialized from it
 * - Both are rebuilt from scratch after every change and never patched
 *
 * ### 3. One Writer
 * - **`Editor`** is the only thing that mutates the engine
 * - A **`FormatCommand`** is resolved against the current context first;
 *   illegal or malformed intents never reach the engine
 * - Derived state is refreshed before `dispatch` returns, so the next
 *   event always sees current state
 *
 * ### 4. Legality as Data
 * - The toolbar disables controls from the same `SelectionContext` the
 *   dispatcher consults, so the two cannot disagree
 *
 * ## Module Structure
 *
 * - **`engine`**: the engine boundary, capabilities and engine commands
 * - **`capability`**: `SelectionContext`, the pure capability query
 * - **`commands`**: user intents and how they resolve to engine commands
 * - **`editor`**: the session that owns engine, overlays and export
 * - **`toolbar`**: the toolbar view model
 *
 * ## Usage Pattern
 *
 * ```rust
 * use richmark_engine::document::Document;
 * use richmark_engine::editing::*;
 * use richmark_engine::overlay::grid::InputMode;
 *
 * let mut editor = Editor::with_engine(Document::from_markup("<p>Title</p>"), InputMode::Pointer);
 *
 * // Toolbar intents go through dispatch
 * let outcome = editor.dispatch(FormatCommand::SetBlock(BlockStyle::Heading(
 *     richmark_engine::document::model::HeadingLevel::H1,
 * )));
 * assert_eq!(outcome, DispatchOutcome::Applied);
 *
 * // Derived state is already current
 * assert_eq!(editor.toolbar().current_style(), Some("Título 1"));
 * assert_eq!(editor.export().portable_text(), "# Title");
 * ```
 */

pub mod capability;
pub mod commands;
pub mod editor;
pub mod engine;
pub mod toolbar;

pub use capability::SelectionContext;
pub use commands::{BlockStyle, DispatchOutcome, FormatCommand};
pub use editor::{Editor, OutputView, PLACEHOLDER, PersistOutcome};
pub use engine::{Capability, Change, DocumentEngine, EngineCommand, TableOp};
pub use toolbar::{Toolbar, ToolbarAction, ToolbarButton};
