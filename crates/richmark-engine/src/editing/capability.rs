use std::collections::BTreeSet;

use serde::Serialize;

use super::engine::{Capability, DocumentEngine, TableOp};
use crate::document::model::{Align, HeadingLevel};

/// Snapshot of what is active and what is legal at the selection.
///
/// Built in one go by [`SelectionContext::query`] and replaced wholesale
/// after every change; nothing patches it in place. The default value is
/// the snapshot for an engine that is not ready yet: nothing active and
/// nothing legal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionContext {
    ready: bool,
    active: BTreeSet<Capability>,
    legal: BTreeSet<TableOp>,
    link_href: Option<String>,
}

impl SelectionContext {
    /// Read the engine's current state. Never mutates the engine.
    pub fn query<E: DocumentEngine + ?Sized>(engine: &E) -> Self {
        let active = Capability::all()
            .into_iter()
            .filter(|capability| engine.is_active(*capability))
            .collect();
        let legal = TableOp::ALL
            .into_iter()
            .filter(|op| engine.can_perform(*op))
            .collect();
        Self {
            ready: true,
            active,
            legal,
            link_href: engine.link_href(),
        }
    }

    /// Query an engine that may not exist yet.
    pub fn query_optional<E: DocumentEngine>(engine: Option<&E>) -> Self {
        engine.map(Self::query).unwrap_or_default()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_active(&self, capability: Capability) -> bool {
        self.active.contains(&capability)
    }

    /// Whether a structural table operation may run right now.
    pub fn is_legal(&self, op: TableOp) -> bool {
        self.legal.contains(&op)
    }

    pub fn active(&self) -> impl Iterator<Item = Capability> + '_ {
        self.active.iter().copied()
    }

    pub fn legal(&self) -> impl Iterator<Item = TableOp> + '_ {
        self.legal.iter().copied()
    }

    pub fn link_href(&self) -> Option<&str> {
        self.link_href.as_deref()
    }

    /// The heading level of the selected blocks, when they share one.
    pub fn heading_level(&self) -> Option<HeadingLevel> {
        HeadingLevel::ALL
            .into_iter()
            .find(|level| self.is_active(Capability::Heading(*level)))
    }

    /// The alignment of the selected blocks, when they share one.
    pub fn alignment(&self) -> Option<Align> {
        Align::ALL
            .into_iter()
            .find(|align| self.is_active(Capability::Align(*align)))
    }

    pub fn in_table(&self) -> bool {
        self.is_active(Capability::Table)
    }
}
