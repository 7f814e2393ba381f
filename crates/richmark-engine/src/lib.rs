pub mod document;
pub mod editing;
pub mod export;
pub mod io;
pub mod notification;
pub mod overlay;
pub mod services;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use document::Document;
pub use editing::*;
pub use export::ExportSnapshot;
pub use io::*;
pub use notification::{Notification, NotificationKind};
pub use services::*;
