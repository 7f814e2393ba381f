/*!
 * # Overlays
 *
 * Transient panels shown next to a toolbar trigger: the style menu, the
 * table edit menu, the table size grid and the link editor.
 *
 * ## State
 *
 * Each overlay is its own `closed -> open -> closed` state machine
 * ([`OverlayState`]). Opening one never closes another; each one decides
 * on its own whether a pointer press happened outside of it.
 *
 * ## Placement
 *
 * Placement is computed once, when an overlay opens ([`place`]). A panel
 * that would run past the right edge of the viewport opens right-aligned
 * to its trigger, as long as there is room on the left for it.
 *
 * ## Outside presses
 *
 * Mounted overlays register a pointer-down listener with the
 * [`OverlayManager`]. A press closes an overlay when it lands outside the
 * overlay's panel and is not on the overlay's own trigger, recognized by
 * a label substring.
 */

pub mod grid;
pub mod link;

use std::collections::BTreeMap;

use serde::Serialize;

/// Gap kept between a panel and the viewport edge, in logical pixels.
pub const PLACEMENT_MARGIN: f64 = 8.0;

/// An axis-aligned rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right() && y >= self.top && y <= self.bottom()
    }
}

/// Which edge of the trigger a panel lines up with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Placement {
    /// Panel starts at the trigger's left edge and grows right.
    #[default]
    Left,
    /// Panel ends at the trigger's right edge and grows left.
    Right,
}

/// Decide where a panel of `panel_width` opens next to `anchor`.
pub fn place(anchor: Rect, panel_width: f64, viewport_width: f64) -> Placement {
    let needed = panel_width + PLACEMENT_MARGIN;
    let space_right = viewport_width - anchor.right();
    let space_left = anchor.left;
    if space_right < needed && space_left >= needed {
        Placement::Right
    } else {
        Placement::Left
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayKind {
    StyleMenu,
    TableMenu,
    TableGrid,
    LinkEditor,
}

impl OverlayKind {
    pub const ALL: [OverlayKind; 4] = [
        OverlayKind::StyleMenu,
        OverlayKind::TableMenu,
        OverlayKind::TableGrid,
        OverlayKind::LinkEditor,
    ];

    /// Substring of the trigger button's label.
    pub fn trigger_label(self) -> &'static str {
        match self {
            OverlayKind::StyleMenu => "Estilo",
            OverlayKind::TableMenu => "Editar tabla",
            OverlayKind::TableGrid => "Insertar tabla",
            OverlayKind::LinkEditor => "enlace",
        }
    }
}

/// A pointer press anywhere in the window.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerDown {
    pub x: f64,
    pub y: f64,
    /// Label of the control under the pointer, if it has one.
    pub target_label: Option<String>,
}

impl PointerDown {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            target_label: None,
        }
    }

    pub fn on_control(x: f64, y: f64, label: impl Into<String>) -> Self {
        Self {
            x,
            y,
            target_label: Some(label.into()),
        }
    }
}

/// Size of a panel as rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PanelSize {
    pub width: f64,
    pub height: f64,
}

/// Geometry known when an overlay opens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Layout {
    pub anchor: Rect,
    pub panel: PanelSize,
    pub viewport_width: f64,
}

impl Layout {
    pub fn new(anchor: Rect, panel: PanelSize, viewport_width: f64) -> Self {
        Self {
            anchor,
            panel,
            viewport_width,
        }
    }
}

/// Open/closed state and placement of one overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayState {
    kind: OverlayKind,
    open: bool,
    placement: Placement,
    anchor: Option<Rect>,
    panel: Option<Rect>,
}

impl OverlayState {
    pub fn new(kind: OverlayKind) -> Self {
        Self {
            kind,
            open: false,
            placement: Placement::Left,
            anchor: None,
            panel: None,
        }
    }

    pub fn kind(&self) -> OverlayKind {
        self.kind
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Where the panel sits, once opened with a known layout.
    pub fn panel(&self) -> Option<Rect> {
        self.panel
    }

    /// Open below the anchor, placing the panel for the viewport.
    pub fn open(&mut self, layout: Layout) {
        let Layout {
            anchor,
            panel,
            viewport_width,
        } = layout;
        self.placement = place(anchor, panel.width, viewport_width);
        let left = match self.placement {
            Placement::Left => anchor.left,
            Placement::Right => anchor.right() - panel.width,
        };
        self.anchor = Some(anchor);
        self.panel = Some(Rect::new(left, anchor.bottom(), panel.width, panel.height));
        self.open = true;
    }

    /// Open without layout information. Keeps the default placement.
    pub fn open_unplaced(&mut self) {
        self.placement = Placement::Left;
        self.anchor = None;
        self.panel = None;
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Whether a press counts as outside this overlay.
    pub fn is_outside(&self, press: &PointerDown) -> bool {
        let on_trigger = press
            .target_label
            .as_deref()
            .is_some_and(|label| label.contains(self.kind.trigger_label()));
        let in_panel = self.panel.is_some_and(|panel| panel.contains(press.x, press.y));
        let in_anchor = self
            .anchor
            .is_some_and(|anchor| anchor.contains(press.x, press.y));
        !(on_trigger || in_panel || in_anchor)
    }
}

/// Registered pointer-down listener handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

/// Overlay states plus the window-wide pointer-down listeners.
///
/// Every mounted overlay holds exactly one listener; unmounting removes it
/// and closes the overlay. A press is offered to every listener, and each
/// listener only looks at its own overlay.
#[derive(Debug, Clone, Default)]
pub struct OverlayManager {
    overlays: BTreeMap<OverlayKind, OverlayState>,
    listeners: BTreeMap<ListenerId, OverlayKind>,
    next_listener: u64,
}

impl OverlayManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager with every overlay kind mounted.
    pub fn mounted() -> Self {
        let mut manager = Self::new();
        for kind in OverlayKind::ALL {
            manager.mount(kind);
        }
        manager
    }

    /// Mount an overlay and register its listener. Mounting twice keeps
    /// the first listener.
    pub fn mount(&mut self, kind: OverlayKind) -> ListenerId {
        if let Some((id, _)) = self.listeners.iter().find(|(_, k)| **k == kind) {
            return *id;
        }
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.insert(id, kind);
        self.overlays.insert(kind, OverlayState::new(kind));
        log::debug!("Mounted {kind:?} overlay with listener {id:?}");
        id
    }

    pub fn unmount(&mut self, kind: OverlayKind) {
        self.listeners.retain(|_, k| *k != kind);
        self.overlays.remove(&kind);
        log::debug!("Unmounted {kind:?} overlay");
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn state(&self, kind: OverlayKind) -> Option<&OverlayState> {
        self.overlays.get(&kind)
    }

    pub fn is_open(&self, kind: OverlayKind) -> bool {
        self.state(kind).is_some_and(OverlayState::is_open)
    }

    /// Open `kind` with a layout. Returns `false` if it is not mounted.
    pub fn open(&mut self, kind: OverlayKind, layout: Layout) -> bool {
        match self.overlays.get_mut(&kind) {
            Some(state) => {
                state.open(layout);
                log::debug!("Opened {kind:?} overlay, placed {:?}", state.placement());
                true
            }
            None => false,
        }
    }

    pub fn open_unplaced(&mut self, kind: OverlayKind) -> bool {
        match self.overlays.get_mut(&kind) {
            Some(state) => {
                state.open_unplaced();
                true
            }
            None => false,
        }
    }

    pub fn close(&mut self, kind: OverlayKind) {
        if let Some(state) = self.overlays.get_mut(&kind) {
            state.close();
        }
    }

    /// Flip `kind` open or closed. Returns whether it is open afterwards.
    pub fn toggle(&mut self, kind: OverlayKind, layout: Layout) -> bool {
        if self.is_open(kind) {
            self.close(kind);
            false
        } else {
            self.open(kind, layout)
        }
    }

    /// Offer a press to every listener. Returns the overlays it closed.
    pub fn pointer_down(&mut self, press: &PointerDown) -> Vec<OverlayKind> {
        let kinds: Vec<OverlayKind> = self.listeners.values().copied().collect();
        let mut closed = Vec::new();
        for kind in kinds {
            if let Some(state) = self.overlays.get_mut(&kind)
                && state.is_open()
                && state.is_outside(press)
            {
                state.close();
                closed.push(kind);
            }
        }
        if !closed.is_empty() {
            log::debug!("Outside press closed {closed:?}");
        }
        closed
    }
}
