//! # richmark-markup
//!
//! Reading and writing the structural markup produced by a rich-text
//! editing engine: the HTML subset made of paragraphs, headings, lists,
//! block quotes, code blocks, tables and inline marks.
//!
//! ## Architecture Overview
//!
//! ```text
//! Source Text → Lexer → Tokens → Parser → Events → Sink → Fragment
//!               (Logos)                             (owned tree)
//! ```
//!
//! 1. The [`lexer`] splits input into tags, comments and text with
//!    [Logos](https://docs.rs/logos). Every byte lands in some token.
//! 2. The [`parser`] turns tokens into open/text/close events, deciding
//!    implied end tags and void elements.
//! 3. The [`parser::sink`] replays events into a [`Fragment`] of owned
//!    [`Node`]s that callers are free to rewrite.
//! 4. [`render`] writes a tree back out. For any tree produced by the
//!    parser, `parse(render(tree))` renders identically.
//!
//! ## Quick Start
//!
//! ```
//! use richmark_markup::parse;
//!
//! let fragment = parse("<p>Hello <strong>world</strong></p>");
//! let paragraph = fragment.nodes[0].as_element().unwrap();
//! assert_eq!(paragraph.name, "p");
//! assert_eq!(paragraph.text_content(), "Hello world");
//! assert_eq!(fragment.render(), "<p>Hello <strong>world</strong></p>");
//! ```

pub mod lexer;
pub mod parser;
pub mod render;
pub mod tree;

pub use parser::parse;
pub use render::render;
pub use tree::{Attribute, Element, Fragment, Node, VOID_ELEMENTS, is_void};
