//! Conversion between the generic parse tree and the document arena.
//!
//! Building a [`Document`] is two-pass: every anchor is registered while the
//! nodes are created, then every alias is resolved against the finished
//! registry, so an alias may appear before the anchor it names.

use crate::document::Document;
use crate::node::{Node, NodeId, NodeKind, NodeStyle};
use crate::raw::{RawDocument, RawNode, join_comment, split_comment};
use crate::scalar::{self, ScalarValue};

/// Build a document from a parsed raw document.
pub fn document_from_raw(raw: &RawDocument) -> Document {
    let mut doc = Document::new();
    doc.directives = raw.directives.clone();
    if let Some(root) = &raw.root {
        let id = build(&mut doc, root, false);
        doc.set_root(Some(id));
        let unresolved = doc.resolve_aliases();
        if unresolved > 0 {
            tracing::debug!(unresolved, "Document has unresolved aliases");
        }
    }
    doc
}

fn build(doc: &mut Document, raw: &RawNode, is_key: bool) -> NodeId {
    let mut node = Node::new(raw.kind);
    node.tag = raw.tag.clone();
    node.style = raw.style;
    node.head_comment = split_comment(&raw.head_comment);
    node.line_comment = split_comment(&raw.line_comment);
    node.foot_comment = split_comment(&raw.foot_comment);
    node.blank_lines_before = raw.blank_lines_before;
    node.line = raw.line;
    node.column = raw.column;
    match raw.kind {
        NodeKind::Scalar => {
            node.value = scalar::decode(&raw.value, raw.tag.as_deref(), raw.style, is_key);
            node.raw = Some(raw.value.clone());
        }
        NodeKind::Alias => node.value = ScalarValue::Str(raw.value.clone()),
        _ => {}
    }
    let id = doc.push(node);
    if let Some(anchor) = &raw.anchor {
        doc.register_anchor(anchor, id);
    }
    let mut children = Vec::with_capacity(raw.children.len());
    for (i, child) in raw.children.iter().enumerate() {
        let child_is_key = raw.kind == NodeKind::Mapping && i % 2 == 0;
        children.push(build(doc, child, child_is_key));
    }
    doc.set_children(id, children);
    id
}

/// Render a document back into the generic parse-tree shape.
pub fn document_to_raw(doc: &Document) -> RawDocument {
    RawDocument {
        directives: doc.directives.clone(),
        root: doc.root().map(|root| to_raw(doc, root, false)),
    }
}

fn to_raw(doc: &Document, id: NodeId, is_key: bool) -> RawNode {
    let node = &doc[id];
    let mut raw = RawNode::new(node.kind);
    raw.tag = node.tag.clone();
    raw.anchor = node.anchor.clone();
    raw.style = node.style;
    raw.head_comment = join_comment(&node.head_comment);
    raw.line_comment = join_comment(&node.line_comment);
    raw.foot_comment = join_comment(&node.foot_comment);
    raw.blank_lines_before = node.blank_lines_before;
    raw.line = node.line;
    raw.column = node.column;
    match node.kind {
        NodeKind::Scalar => {
            raw.value = node.text();
            raw.style = scalar_style(node, &raw.value, is_key);
        }
        NodeKind::Null => {
            raw.kind = NodeKind::Scalar;
            raw.value = "null".to_string();
            raw.style = NodeStyle::Default;
        }
        NodeKind::Alias => raw.value = node.text(),
        _ => {}
    }
    raw.children = node
        .children()
        .iter()
        .enumerate()
        .map(|(i, &child)| to_raw(doc, child, node.kind == NodeKind::Mapping && i % 2 == 0))
        .collect();
    raw
}

/// Pick a style that reads back as the node's current value.
fn scalar_style(node: &Node, text: &str, is_key: bool) -> NodeStyle {
    let quoted = matches!(
        node.style,
        NodeStyle::SingleQuoted | NodeStyle::DoubleQuoted | NodeStyle::Literal | NodeStyle::Folded
    );
    match &node.value {
        ScalarValue::Str(_) if !quoted && node.tag.is_none() => {
            let key_null = is_key && text == "null";
            if !key_null && scalar::decode_plain(text) != node.value {
                NodeStyle::DoubleQuoted
            } else if node.style == NodeStyle::Flow {
                NodeStyle::Default
            } else {
                node.style
            }
        }
        ScalarValue::Str(_) => node.style,
        _ if quoted && node.tag.is_none() => NodeStyle::Default,
        _ => node.style,
    }
}
