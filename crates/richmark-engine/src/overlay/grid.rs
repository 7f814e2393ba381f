//! Table size picker.
//!
//! A square grid of cells; the top-left block up to the staged cell is
//! highlighted. How a size gets committed depends on the [`InputMode`],
//! probed once when the picker is created:
//!
//! - **Pointer**: hovering stages a size, leaving the grid clears it and a
//!   click commits whatever is staged.
//! - **Touch**: a tap stages and confirms a size and shows a confirmation
//!   control; activating that control commits.

use serde::Serialize;

/// Largest number of rows or columns the grid offers.
pub const GRID_MAX: usize = 10;

const PROMPT: &str = "Selecciona una tabla";

/// A (rows, cols) pair; `(0, 0)` means nothing is picked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct GridSize {
    pub rows: usize,
    pub cols: usize,
}

impl GridSize {
    pub const NONE: GridSize = GridSize { rows: 0, cols: 0 };

    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Both dimensions are at least one.
    pub fn is_complete(&self) -> bool {
        self.rows >= 1 && self.cols >= 1
    }
}

/// How the runtime delivers input, fixed for the picker's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputMode {
    Pointer,
    Touch,
}

impl InputMode {
    /// Touch when the runtime reports touch support or can track at least
    /// one simultaneous touch point.
    pub fn probe(touch_events: bool, max_touch_points: u32) -> Self {
        if touch_events || max_touch_points > 0 {
            InputMode::Touch
        } else {
            InputMode::Pointer
        }
    }
}

/// Grid picker state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridSelector {
    mode: InputMode,
    staged: GridSize,
    confirmed: GridSize,
}

impl GridSelector {
    pub fn new(mode: InputMode) -> Self {
        Self {
            mode,
            staged: GridSize::NONE,
            confirmed: GridSize::NONE,
        }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn staged(&self) -> GridSize {
        self.staged
    }

    pub fn confirmed(&self) -> GridSize {
        self.confirmed
    }

    /// Pointer entered the cell at `row`, `col` (1-based).
    pub fn hover(&mut self, row: usize, col: usize) {
        if self.mode == InputMode::Pointer {
            self.staged = clamp(row, col);
        }
    }

    /// Pointer left the grid.
    pub fn leave(&mut self) {
        if self.mode == InputMode::Pointer {
            self.staged = GridSize::NONE;
        }
    }

    /// Forget any staged or confirmed size, whatever the input mode.
    pub fn reset(&mut self) {
        self.staged = GridSize::NONE;
        self.confirmed = GridSize::NONE;
    }

    /// A click or tap on the cell at `row`, `col` (1-based).
    ///
    /// In pointer mode this commits the staged size and returns it. In
    /// touch mode it stages and confirms the tapped cell and commits
    /// nothing.
    pub fn press(&mut self, row: usize, col: usize) -> Option<GridSize> {
        match self.mode {
            InputMode::Pointer => {
                let staged = self.staged;
                staged.is_complete().then(|| {
                    log::debug!("Grid picked {}x{}", staged.cols, staged.rows);
                    staged
                })
            }
            InputMode::Touch => {
                let size = clamp(row, col);
                self.staged = size;
                self.confirmed = size;
                None
            }
        }
    }

    /// Label of the confirmation control, shown in touch mode once a size
    /// is confirmed.
    pub fn confirm_label(&self) -> Option<String> {
        (self.mode == InputMode::Touch && self.confirmed.is_complete())
            .then(|| format!("Insertar {}x{}", self.confirmed.cols, self.confirmed.rows))
    }

    /// Activate the confirmation control. Commits the confirmed size and
    /// clears the picker.
    pub fn confirm(&mut self) -> Option<GridSize> {
        if self.mode != InputMode::Touch || !self.confirmed.is_complete() {
            return None;
        }
        let confirmed = self.confirmed;
        self.staged = GridSize::NONE;
        self.confirmed = GridSize::NONE;
        log::debug!("Grid confirmed {}x{}", confirmed.cols, confirmed.rows);
        Some(confirmed)
    }

    /// Whether the cell at `row`, `col` (1-based) is highlighted.
    pub fn is_highlighted(&self, row: usize, col: usize) -> bool {
        row >= 1 && col >= 1 && row <= self.staged.rows && col <= self.staged.cols
    }

    /// "cols x rows" for a staged size, otherwise a prompt.
    pub fn display(&self) -> String {
        if self.staged.is_complete() {
            format!("{} x {}", self.staged.cols, self.staged.rows)
        } else {
            PROMPT.to_string()
        }
    }
}

fn clamp(row: usize, col: usize) -> GridSize {
    GridSize::new(row.min(GRID_MAX), col.min(GRID_MAX))
}
