//! Headless model of a course-catalog page.
//!
//! The enrichment pipeline never drives a real browser. It works against
//! [`Page`], an arena DOM with just enough surface for the job: class
//! queries in document order, bounded ancestor walks, subtree insertion
//! parsed from real HTML, and child-list mutation observation with explicit
//! batch delivery via [`Page::flush_mutations`].
//!
//! Observation mirrors a child-list observer on a subtree: every insertion
//! under an observed root queues one [`MutationRecord`] listing the
//! top-level added nodes. Removals are not reported; nothing downstream
//! consumes them. The pipeline's own writes (badges, popups) queue records
//! like any other insertion and are filtered out by the detector, the same
//! way the page treats them.

mod html;
mod node;

pub use node::NodeId;

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

use node::{ElementData, Node, NodeKind};

// ---------------------------------------------------------------------------
// Mutation observation
// ---------------------------------------------------------------------------

/// One child-list change: the top-level nodes added by a single insertion.
#[derive(Debug, Clone)]
pub struct MutationRecord {
    pub added: Vec<NodeId>,
}

/// Handle for a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId(usize);

struct Observer {
    id: ObserverId,
    root: NodeId,
    pending: Vec<MutationRecord>,
    tx: UnboundedSender<Vec<MutationRecord>>,
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// An arena-backed DOM: nodes are owned by the page and addressed by
/// [`NodeId`]. Ids stay valid for the life of the page; detached nodes
/// simply become unreachable from the root.
pub struct Page {
    nodes: Vec<Node>,
    root: NodeId,
    observers: Vec<Observer>,
    next_observer_id: usize,
}

impl Page {
    /// An empty page: just the synthetic document root.
    pub fn new() -> Self {
        let root_node = Node {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Document,
        };
        Self {
            nodes: vec![root_node],
            root: NodeId(0),
            observers: Vec::new(),
            next_observer_id: 0,
        }
    }

    /// Parse a full HTML document into a fresh page.
    pub fn from_document(html: &str) -> Self {
        let mut page = Self::new();
        let root = page.root;
        html::graft_document(&mut page, root, html);
        page
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The document `<body>`, or the root when the page has none.
    pub fn body(&self) -> NodeId {
        self.first_with_tag(self.root, "body").unwrap_or(self.root)
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Allocate `node` and link it as the last child of `parent`, without
    /// queueing mutation records. Ingestion builds subtrees through this;
    /// the public mutators queue a record for the completed subtree.
    pub(crate) fn attach_new(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.nodes[id.0].parent = Some(parent);
        self.nodes[parent.0].children.push(id);
        id
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.node(id).element_data().is_some()
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.node(id).element_data().map(|data| data.tag.as_str())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)
            .element_data()
            .and_then(|data| data.attrs.get(name).map(String::as_str))
    }

    /// The element's `id` attribute.
    pub fn id_attr(&self, id: NodeId) -> Option<&str> {
        self.attr(id, "id")
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.node(id)
            .element_data()
            .is_some_and(|data| data.has_class(class))
    }

    /// Concatenated text of the node and its descendants, in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.node(current);
            if let NodeKind::Text(text) = &node.kind {
                out.push_str(text);
            }
            for &child in node.children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// All descendant elements of `scope` carrying `class`, in document
    /// order. `scope` itself is not considered.
    pub fn elements_with_class(&self, scope: NodeId, class: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.node(scope).children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if self.has_class(current, class) {
                out.push(current);
            }
            for &child in self.node(current).children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    pub fn first_with_class(&self, scope: NodeId, class: &str) -> Option<NodeId> {
        self.elements_with_class(scope, class).into_iter().next()
    }

    pub fn first_with_tag(&self, scope: NodeId, tag: &str) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.node(scope).children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if self.tag(current) == Some(tag) {
                return Some(current);
            }
            for &child in self.node(current).children.iter().rev() {
                stack.push(child);
            }
        }
        None
    }

    /// Walk upward from `start` (inclusive) looking for an element with
    /// `class`, following at most `limit` parent edges. Returns `None` when
    /// the walk reaches the document root or exhausts the limit; the caller
    /// decides how loud that failure is.
    pub fn ancestor_with_class(&self, start: NodeId, class: &str, limit: usize) -> Option<NodeId> {
        let mut current = start;
        for _ in 0..=limit {
            if self.has_class(current, class) {
                return Some(current);
            }
            current = self.node(current).parent?;
        }
        None
    }

    /// Whether `id` is still reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.node(current).parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Whether `id` is `ancestor` or lies inside its subtree.
    pub fn contains(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == ancestor {
                return true;
            }
            match self.node(current).parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Create a detached element. Attach it with [`Page::append_child`] or
    /// [`Page::replace_node`].
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::element(ElementData::new(tag)));
        id
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(data) = self.node_mut(id).element_data_mut() {
            if !data.has_class(class) {
                data.classes.push(class.to_string());
            }
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(data) = self.node_mut(id).element_data_mut() {
            data.attrs.insert(name.to_string(), value.to_string());
        }
    }

    /// Replace the node's children with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        let old_children = std::mem::take(&mut self.node_mut(id).children);
        for child in old_children {
            self.node_mut(child).parent = None;
        }
        let text_id = self.attach_new(id, Node::text(text.to_string()));
        self.queue_record(id, vec![text_id]);
    }

    /// Append a new text node to `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.attach_new(parent, Node::text(text.to_string()));
        self.queue_record(parent, vec![id]);
        id
    }

    /// Move `child` under `parent` as its last child.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            !self.contains(child, parent),
            "appending a node under its own descendant"
        );
        self.unlink(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
        self.queue_record(parent, vec![child]);
    }

    /// Swap `new` into `old`'s position; `old` becomes detached. Returns
    /// `false` (and changes nothing) when `old` has no parent.
    pub fn replace_node(&mut self, old: NodeId, new: NodeId) -> bool {
        let Some(parent) = self.node(old).parent else {
            trace!(?old, "replace target already detached");
            return false;
        };
        self.unlink(new);
        let siblings = &mut self.node_mut(parent).children;
        if let Some(slot) = siblings.iter().position(|&c| c == old) {
            siblings[slot] = new;
        } else {
            siblings.push(new);
        }
        self.node_mut(old).parent = None;
        self.node_mut(new).parent = Some(parent);
        self.queue_record(parent, vec![new]);
        true
    }

    /// Detach a node (and its subtree) from the tree. The id stays valid.
    pub fn detach(&mut self, id: NodeId) {
        self.unlink(id);
    }

    fn unlink(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            self.node_mut(parent).children.retain(|&c| c != id);
            self.node_mut(id).parent = None;
        }
    }

    /// Parse an HTML fragment and insert its nodes as the last children of
    /// `parent`. Returns the top-level inserted elements in document order;
    /// one mutation record covers the whole insertion.
    pub fn insert_fragment(&mut self, parent: NodeId, fragment: &str) -> Vec<NodeId> {
        let added = html::graft_fragment(self, parent, fragment);
        if !added.is_empty() {
            self.queue_record(parent, added.clone());
        }
        added
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    /// Watch `root` for child-list insertions anywhere in its subtree.
    /// Records accumulate until [`Page::flush_mutations`] delivers them as
    /// one batch on the returned channel.
    pub fn observe(&mut self, root: NodeId) -> (ObserverId, UnboundedReceiver<Vec<MutationRecord>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push(Observer {
            id,
            root,
            pending: Vec::new(),
            tx,
        });
        trace!(observer = id.0, ?root, "observer registered");
        (id, rx)
    }

    pub fn disconnect(&mut self, id: ObserverId) {
        self.observers.retain(|o| o.id != id);
    }

    /// Deliver all records accumulated since the last flush, one batch per
    /// observer. Observers whose receiver is gone are dropped.
    pub fn flush_mutations(&mut self) {
        let mut stale = Vec::new();
        for observer in &mut self.observers {
            if observer.pending.is_empty() {
                continue;
            }
            let batch = std::mem::take(&mut observer.pending);
            debug!(observer = observer.id.0, records = batch.len(), "delivering mutation batch");
            if observer.tx.send(batch).is_err() {
                stale.push(observer.id);
            }
        }
        for id in stale {
            self.disconnect(id);
        }
    }

    fn queue_record(&mut self, parent: NodeId, added: Vec<NodeId>) {
        if self.observers.is_empty() {
            return;
        }
        let interested: Vec<usize> = (0..self.observers.len())
            .filter(|&i| self.contains(self.observers[i].root, parent))
            .collect();
        for index in interested {
            self.observers[index].pending.push(MutationRecord {
                added: added.clone(),
            });
        }
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Serialize the node and its subtree back to HTML.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        match &node.kind {
            NodeKind::Document => {
                for &child in &node.children {
                    self.write_html(child, out);
                }
            }
            NodeKind::Text(text) => out.push_str(&escape_text(text)),
            NodeKind::Element(data) => {
                out.push('<');
                out.push_str(&data.tag);
                if !data.classes.is_empty() {
                    out.push_str(" class=\"");
                    out.push_str(&data.classes.join(" "));
                    out.push('"');
                }
                for (name, value) in &data.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                for &child in &node.children {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(&data.tag);
                out.push('>');
            }
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

// ---------------------------------------------------------------------------
// SharedPage
// ---------------------------------------------------------------------------

/// Cheaply clonable handle to a page shared between the watch loop and
/// in-flight enrichment tasks.
///
/// Access is closure-scoped, which keeps every page operation inside one
/// lock acquisition and makes it impossible to hold the guard across an
/// await point.
#[derive(Clone)]
pub struct SharedPage {
    inner: Arc<Mutex<Page>>,
}

impl SharedPage {
    pub fn new(page: Page) -> Self {
        Self {
            inner: Arc::new(Mutex::new(page)),
        }
    }

    /// Run `f` with exclusive access to the page.
    pub fn with<R>(&self, f: impl FnOnce(&mut Page) -> R) -> R {
        // Mutations never unwind mid-relink, so a poisoned lock still guards
        // a consistent tree.
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
