//! HTML ingestion: scraper-parsed markup grafted into the arena.

use ego_tree::NodeRef;
use scraper::Html;

use crate::node::{ElementData, Node};
use crate::{NodeId, Page};

/// Parse a full document and graft its `<html>` element under `parent`.
pub(crate) fn graft_document(page: &mut Page, parent: NodeId, html: &str) -> Option<NodeId> {
    let doc = Html::parse_document(html);
    graft_node(page, parent, *doc.root_element())
}

/// Parse a fragment and graft its top-level nodes under `parent`.
/// Returns the ids of the top-level *element* nodes, in document order.
pub(crate) fn graft_fragment(page: &mut Page, parent: NodeId, html: &str) -> Vec<NodeId> {
    let doc = Html::parse_fragment(html);
    doc.root_element()
        .children()
        .filter_map(|child| graft_node(page, parent, child))
        .collect()
}

/// Graft one scraper node (and its subtree) under `parent`, returning the
/// new id when the node was an element. Whitespace-only text runs,
/// comments, and doctypes are dropped.
fn graft_node(
    page: &mut Page,
    parent: NodeId,
    node: NodeRef<'_, scraper::Node>,
) -> Option<NodeId> {
    match node.value() {
        scraper::Node::Element(el) => {
            let mut data = ElementData::new(el.name());
            data.classes.extend(el.classes().map(str::to_string));
            for (name, value) in el.attrs() {
                if name != "class" {
                    data.attrs.insert(name.to_string(), value.to_string());
                }
            }
            let id = page.attach_new(parent, Node::element(data));
            for child in node.children() {
                graft_node(page, id, child);
            }
            Some(id)
        }
        scraper::Node::Text(text) => {
            if !text.trim().is_empty() {
                page.attach_new(parent, Node::text(text.to_string()));
            }
            None
        }
        _ => None,
    }
}
