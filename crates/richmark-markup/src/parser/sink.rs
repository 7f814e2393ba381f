//! Converts a flat event list into an owned [`Fragment`].

use super::event::Event;
use crate::tree::{Element, Fragment, Node};

pub struct Sink {
    events: Vec<Event>,
}

impl Sink {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn finish(self) -> Fragment {
        let mut roots: Vec<Node> = Vec::new();
        let mut stack: Vec<Element> = Vec::new();

        for event in self.events {
            match event {
                Event::Open { name, attributes } => stack.push(Element {
                    name,
                    attributes,
                    children: Vec::new(),
                }),
                Event::Close => {
                    if let Some(element) = stack.pop() {
                        attach(&mut stack, &mut roots, Node::Element(element));
                    }
                }
                Event::Text(text) => attach(&mut stack, &mut roots, Node::Text(text)),
                Event::Comment(text) => attach(&mut stack, &mut roots, Node::Comment(text)),
            }
        }

        // The parser closes everything, but stay total on truncated streams
        while let Some(element) = stack.pop() {
            attach(&mut stack, &mut roots, Node::Element(element));
        }

        Fragment::new(roots)
    }
}

fn attach(stack: &mut [Element], roots: &mut Vec<Node>, node: Node) {
    let siblings = match stack.last_mut() {
        Some(parent) => &mut parent.children,
        None => roots,
    };

    // Adjacent text merges so that render → parse is a fixed point
    if let Node::Text(text) = &node {
        if text.is_empty() {
            return;
        }
        if let Some(Node::Text(previous)) = siblings.last_mut() {
            previous.push_str(text);
            return;
        }
    }
    siblings.push(node);
}
