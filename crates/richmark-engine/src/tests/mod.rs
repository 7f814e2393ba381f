use tempfile::TempDir;

use crate::document::Document;
use crate::document::selection::Selection;
use crate::editing::engine::DocumentEngine;

/// Create a temporary directory for file storage
pub fn create_test_storage_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Document loaded from markup with a text selection in block `path`
pub fn document_with_selection(markup: &str, path: Vec<usize>, range: (usize, usize)) -> Document {
    let mut document = Document::from_markup(markup);
    let version = document.version();
    document
        .set_selection(Selection::text(path, range.0, range.1))
        .unwrap();
    assert!(document.version() >= version);
    document
}
