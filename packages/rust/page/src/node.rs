//! Arena node storage for the headless page model.

use std::collections::BTreeMap;

/// Handle to a node in a [`Page`] arena.
///
/// Ids are never reused for the life of the page, so a handle held across
/// an await point stays valid; it may however point at a node that has
/// since been detached from the tree (check [`Page::is_attached`]).
///
/// [`Page`]: crate::Page
/// [`Page::is_attached`]: crate::Page::is_attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn element(data: ElementData) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Element(data),
        }
    }

    pub(crate) fn text(text: String) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Text(text),
        }
    }

    pub(crate) fn element_data(&self) -> Option<&ElementData> {
        match &self.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn element_data_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    /// Synthetic document root; never matched by queries.
    Document,
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct ElementData {
    pub(crate) tag: String,
    pub(crate) classes: Vec<String>,
    /// All attributes except `class`, which lives in `classes`.
    pub(crate) attrs: BTreeMap<String, String>,
}

impl ElementData {
    pub(crate) fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            classes: Vec::new(),
            attrs: BTreeMap::new(),
        }
    }

    pub(crate) fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}
