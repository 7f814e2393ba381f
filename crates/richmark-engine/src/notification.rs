//! Transient user-visible messages.

use std::time::{Duration, Instant};

/// How long a notification stays visible.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(3);

pub const COPIED: &str = "¡Copiado al portapapeles!";
pub const COPY_FAILED: &str = "No se pudo copiar al portapapeles";
pub const SAVED: &str = "Documento guardado";
pub const SAVE_FAILED: &str = "No se pudo guardar el documento";
pub const LOADED: &str = "Documento cargado";
pub const NOTHING_SAVED: &str = "No hay ningún documento guardado";
pub const LOAD_FAILED: &str = "No se pudo cargar el documento";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    shown_at: Instant,
}

impl Notification {
    pub fn is_visible_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) < NOTIFICATION_TTL
    }
}

/// Holds at most one notification; a new one replaces the old.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    current: Option<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, message: impl Into<String>, kind: NotificationKind, now: Instant) {
        let message = message.into();
        log::debug!("Notification: {message}");
        self.current = Some(Notification {
            message,
            kind,
            shown_at: now,
        });
    }

    /// The notification still visible at `now`.
    pub fn visible(&self, now: Instant) -> Option<&Notification> {
        self.current
            .as_ref()
            .filter(|notification| notification.is_visible_at(now))
    }

    /// Drop the notification once it has timed out.
    pub fn expire(&mut self, now: Instant) {
        if self.visible(now).is_none() {
            self.current = None;
        }
    }
}
