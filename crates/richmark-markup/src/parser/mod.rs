//! # Parser - Event-Based Tree Construction
//!
//! The parser walks the token stream and emits a flat list of [`Event`]s
//! describing the tree. The [`Sink`] replays those events into an owned
//! [`Fragment`]. Keeping structural decisions (implied end tags, void
//! elements, unmatched end tags) in the parser and construction in the sink
//! means the sink never has to repair anything.
//!
//! ## Error Tolerance
//!
//! Structural markup comes from an editing engine and is normally well
//! formed, but the parser never fails:
//!
//! - End tags close the nearest open element with the same name, closing
//!   anything opened inside it; end tags with no open match are dropped
//! - `<td>`, `<th>`, `<tr>`, `<li>` and table sections close a previous
//!   sibling of the same family that was left open
//! - Block elements close an open `<p>`
//! - Elements still open at end of input are closed
//!
//! ```
//! use richmark_markup::parse;
//!
//! let fragment = parse("<ul><li>one<li>two</ul>");
//! let list = fragment.nodes[0].as_element().unwrap();
//! assert_eq!(list.child_elements().count(), 2);
//! ```

pub mod event;
pub mod sink;

use crate::lexer::{Token, TokenKind, decode, end_tag_name, lex, lex_start_tag};
use crate::tree::{Fragment, is_void};
use event::Event;
use sink::Sink;

const BLOCK_ELEMENTS: &[&str] = &[
    "address",
    "blockquote",
    "div",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "hr",
    "ol",
    "p",
    "pre",
    "table",
    "ul",
];

/// Elements a stray `<p>` close does not cross.
const PARAGRAPH_SCOPE: &[&str] = &[
    "blockquote", "div", "li", "ol", "table", "td", "th", "ul",
];

/// Parse structural markup into a [`Fragment`].
pub fn parse(input: &str) -> Fragment {
    let tokens = lex(input);
    Parser::new(&tokens).parse()
}

/// The parser state machine.
pub struct Parser<'t, 'input> {
    tokens: &'t [Token<'input>],
    pos: usize,
    events: Vec<Event>,
    /// Names of currently open elements, outermost first
    open: Vec<String>,
}

impl<'t, 'input> Parser<'t, 'input> {
    pub fn new(tokens: &'t [Token<'input>]) -> Self {
        Self {
            tokens,
            pos: 0,
            events: Vec::new(),
            open: Vec::new(),
        }
    }

    /// Consume all tokens and build the tree.
    pub fn parse(mut self) -> Fragment {
        while let Some(token) = self.tokens.get(self.pos).copied() {
            self.step(token);
            self.pos += 1;
        }
        while !self.open.is_empty() {
            self.close();
        }
        Sink::new(self.events).finish()
    }

    fn step(&mut self, token: Token<'input>) {
        match token.kind {
            TokenKind::StartTag => self.start_tag(token.text),
            TokenKind::EndTag => self.end_tag(&end_tag_name(token.text)),
            TokenKind::Comment => {
                let body = token
                    .text
                    .trim_start_matches("<!--")
                    .trim_end_matches("-->");
                self.events.push(Event::Comment(body.to_string()));
            }
            TokenKind::Declaration => {}
            TokenKind::Text => self.events.push(Event::Text(decode(token.text))),
            TokenKind::Lt => self.events.push(Event::Text(token.text.to_string())),
        }
    }

    fn start_tag(&mut self, text: &str) {
        let tag = lex_start_tag(text);

        for _ in 0..self.implied_closes(&tag.name) {
            self.close();
        }

        let void = is_void(&tag.name) || tag.self_closing;
        self.events.push(Event::Open {
            name: tag.name.clone(),
            attributes: tag.attributes,
        });
        if void {
            self.events.push(Event::Close);
        } else {
            self.open.push(tag.name);
        }
    }

    fn end_tag(&mut self, name: &str) {
        if let Some(index) = self.open.iter().rposition(|open| open == name) {
            while self.open.len() > index {
                self.close();
            }
        }
    }

    fn close(&mut self) {
        self.open.pop();
        self.events.push(Event::Close);
    }

    /// How many open elements a new `name` element implicitly closes.
    fn implied_closes(&self, name: &str) -> usize {
        match name {
            "td" | "th" => self.closes_through(&["td", "th"], &["tr", "table"]),
            "tr" => self.closes_through(&["tr"], &["table"]),
            "thead" | "tbody" | "tfoot" => {
                self.closes_through(&["thead", "tbody", "tfoot"], &["table"])
            }
            "li" => self.closes_through(&["li"], &["ul", "ol"]),
            _ if BLOCK_ELEMENTS.contains(&name) => self.closes_through(&["p"], PARAGRAPH_SCOPE),
            _ => 0,
        }
    }

    fn closes_through(&self, targets: &[&str], boundary: &[&str]) -> usize {
        for (index, open) in self.open.iter().enumerate().rev() {
            if targets.contains(&open.as_str()) {
                return self.open.len() - index;
            }
            if boundary.contains(&open.as_str()) {
                return 0;
            }
        }
        0
    }
}
