//! Link editor: a one-field overlay holding a pending URL.
//!
//! The editor itself never touches the document. [`LinkEditor::commit`]
//! hands back the command to dispatch, and the caller applies it.

use serde::Serialize;

use crate::editing::commands::FormatCommand;

pub const URL_PLACEHOLDER: &str = "https://ejemplo.com";

/// Keys the link input reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKey {
    Enter,
    Escape,
}

/// Link edit in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PendingLink {
    pub url: String,
    pub editing: bool,
}

/// What a key press asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    Commit(FormatCommand),
    Cancel,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkEditor {
    pending: PendingLink,
    focus_pending: bool,
}

impl LinkEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_editing(&self) -> bool {
        self.pending.editing
    }

    pub fn url(&self) -> &str {
        &self.pending.url
    }

    pub fn pending(&self) -> &PendingLink {
        &self.pending
    }

    /// Start editing, pre-filled with the link at the cursor. Focus is
    /// requested for the next tick, when the input exists.
    pub fn open(&mut self, current_href: Option<&str>) {
        self.pending = PendingLink {
            url: current_href.unwrap_or_default().to_string(),
            editing: true,
        };
        self.focus_pending = true;
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        if self.pending.editing {
            self.pending.url = url.into();
        }
    }

    /// Take the deferred focus request. `true` exactly once per open.
    pub fn take_focus(&mut self) -> bool {
        std::mem::take(&mut self.focus_pending) && self.pending.editing
    }

    /// Finish editing. An empty URL asks for the link to be removed.
    pub fn commit(&mut self) -> Option<FormatCommand> {
        if !self.pending.editing {
            return None;
        }
        let url = std::mem::take(&mut self.pending).url;
        self.focus_pending = false;
        Some(FormatCommand::SetLink(url))
    }

    /// Drop the pending URL without touching the document.
    pub fn cancel(&mut self) {
        self.pending = PendingLink::default();
        self.focus_pending = false;
    }

    pub fn key(&mut self, key: LinkKey) -> Option<LinkAction> {
        if !self.pending.editing {
            return None;
        }
        match key {
            LinkKey::Enter => self.commit().map(LinkAction::Commit),
            LinkKey::Escape => {
                self.cancel();
                Some(LinkAction::Cancel)
            }
        }
    }
}
