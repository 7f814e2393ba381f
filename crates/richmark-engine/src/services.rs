//! Identity and clipboard boundaries.

/// Answers whether someone is signed in. Only gates save and load.
pub trait Identity {
    fn is_signed_in(&self) -> bool;
}

/// A fixed identity: signed in when it carries a user name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticIdentity {
    user: Option<String>,
}

impl StaticIdentity {
    pub fn signed_in(user: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_user(user: Option<String>) -> Self {
        Self { user }
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }
}

impl Identity for StaticIdentity {
    fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),
}

pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// Clipboard held in memory. Can be switched off to exercise failures.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    contents: Option<String>,
    unavailable: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            contents: None,
            unavailable: true,
        }
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if self.unavailable {
            return Err(ClipboardError::Unavailable("clipboard is disabled".to_string()));
        }
        self.contents = Some(text.to_string());
        Ok(())
    }
}
