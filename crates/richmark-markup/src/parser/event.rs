//! Parse events consumed by the [`Sink`](super::sink::Sink).

use crate::tree::Attribute;

/// One step of tree construction.
///
/// The parser decides structure (which element is open, when it closes);
/// the sink only replays these steps. Every `Open` is matched by exactly one
/// `Close`, either explicit, implied, or emitted at end of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open {
        name: String,
        attributes: Vec<Attribute>,
    },
    Text(String),
    Comment(String),
    Close,
}
