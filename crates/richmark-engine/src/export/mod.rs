//! Export pipeline: canonical markup first, portable text from it.
//!
//! ```
//! use richmark_engine::export::ExportSnapshot;
//!
//! let snapshot = ExportSnapshot::from_markup(
//!     r#"<table style="min-width: 25px"><colgroup><col style="min-width: 25px"></colgroup><tbody><tr><th colspan="1" rowspan="1"><p>Hi</p></th></tr></tbody></table>"#,
//! );
//! assert_eq!(
//!     snapshot.canonical_markup(),
//!     "<table><tbody><tr><th>Hi</th></tr></tbody></table>"
//! );
//! assert_eq!(snapshot.portable_text(), "| Hi |\n| --- |");
//! ```

pub mod canonicalize;
pub mod serialize;

use serde::Serialize;

pub use canonicalize::canonicalize;
pub use serialize::serialize;

/// Both export representations of one document state.
///
/// The portable text is always serialized from the canonical markup held
/// next to it, never from raw engine output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportSnapshot {
    canonical_markup: String,
    portable_text: String,
}

impl ExportSnapshot {
    /// Run both stages over raw structural markup.
    pub fn from_markup(raw: &str) -> Self {
        let canonical_markup = canonicalize(raw);
        let portable_text = serialize(&canonical_markup);
        Self {
            canonical_markup,
            portable_text,
        }
    }

    pub fn canonical_markup(&self) -> &str {
        &self.canonical_markup
    }

    pub fn portable_text(&self) -> &str {
        &self.portable_text
    }
}
