//! Structure-aware merging of two trees.
//!
//! Mappings are merged key by key, sequences are concatenated and any other
//! pairing takes the overlay's node. Comments present on the base survive
//! wherever the overlay has none of the same class. Inputs are never modified:
//! the result is built in a fresh arena from copies of both sides.

use std::collections::{HashMap, HashSet};

use crate::document::{Directive, Document};
use crate::node::{NodeId, NodeKind};
use crate::tree::Tree;

/// Merge `overlay` onto `base`.
///
/// The first documents of both trees are merged; any further documents are
/// appended, base's before overlay's.
pub fn merge(base: &Tree, overlay: &Tree) -> Tree {
    let mut documents = Vec::new();
    match (base.documents.first(), overlay.documents.first()) {
        (Some(b), Some(o)) => documents.push(merge_documents(b, o)),
        (Some(b), None) => documents.push(b.clone()),
        (None, Some(o)) => documents.push(o.clone()),
        (None, None) => {}
    }
    documents.extend(base.documents.iter().skip(1).cloned());
    documents.extend(overlay.documents.iter().skip(1).cloned());
    tracing::debug!(documents = documents.len(), "Merged trees");
    Tree::from_documents(documents)
}

/// Merge two documents into a new one.
pub fn merge_documents(base: &Document, overlay: &Document) -> Document {
    let mut merger = Merger {
        base,
        overlay,
        out: Document::new(),
        base_map: HashMap::new(),
        overlay_map: HashMap::new(),
    };

    if base.root().is_some() || overlay.root().is_some() {
        let root = merger.out.new_document_node();
        let base_root = base.root().map(|id| &base[id]);
        let overlay_root = overlay.root().map(|id| &overlay[id]);
        let head = base_root
            .map(|n| n.head_comment.clone())
            .filter(|c| !c.is_empty())
            .or_else(|| overlay_root.map(|n| n.head_comment.clone()))
            .unwrap_or_default();
        let foot = base_root
            .map(|n| n.foot_comment.clone())
            .filter(|c| !c.is_empty())
            .or_else(|| overlay_root.map(|n| n.foot_comment.clone()))
            .unwrap_or_default();
        merger.out[root].head_comment = head;
        merger.out[root].foot_comment = foot;

        let content = match (base.content(), overlay.content()) {
            (Some(b), Some(o)) => Some(merger.merge_node(b, o)),
            (Some(b), None) => Some(merger.import_base(b)),
            (None, Some(o)) => Some(merger.import_overlay(o)),
            (None, None) => None,
        };
        if let Some(content) = content {
            merger.out.set_children(root, vec![content]);
        }
        merger.out.set_root(Some(root));
    }

    merger.finish()
}

struct Merger<'a> {
    base: &'a Document,
    overlay: &'a Document,
    out: Document,
    base_map: HashMap<NodeId, NodeId>,
    overlay_map: HashMap<NodeId, NodeId>,
}

impl Merger<'_> {
    fn import_base(&mut self, id: NodeId) -> NodeId {
        self.out.import_subtree(self.base, id, &mut self.base_map)
    }

    fn import_overlay(&mut self, id: NodeId) -> NodeId {
        self.out.import_subtree(self.overlay, id, &mut self.overlay_map)
    }

    fn merge_node(&mut self, base_id: NodeId, overlay_id: NodeId) -> NodeId {
        let (base_kind, overlay_kind) = (self.base[base_id].kind, self.overlay[overlay_id].kind);
        match (base_kind, overlay_kind) {
            (NodeKind::Mapping, NodeKind::Mapping) => self.merge_mappings(base_id, overlay_id),
            (NodeKind::Sequence, NodeKind::Sequence) => self.merge_sequences(base_id, overlay_id),
            _ => self.take_overlay(base_id, overlay_id),
        }
    }

    /// A new container carrying base's presentation, filled in from overlay.
    fn container_from(&mut self, base_id: NodeId, overlay_id: NodeId) -> NodeId {
        let mut node = self.base[base_id].clone();
        node.children.clear();
        node.parent = None;
        node.key = None;
        let overlay = &self.overlay[overlay_id];
        if node.head_comment.is_empty() {
            node.head_comment = overlay.head_comment.clone();
        }
        if node.line_comment.is_empty() {
            node.line_comment = overlay.line_comment.clone();
        }
        if node.foot_comment.is_empty() {
            node.foot_comment = overlay.foot_comment.clone();
        }
        if node.anchor.is_none() {
            node.anchor = overlay.anchor.clone();
        }
        if node.tag.is_none() {
            node.tag = overlay.tag.clone();
        }
        let id = self.out.push(node);
        self.base_map.insert(base_id, id);
        self.overlay_map.insert(overlay_id, id);
        id
    }

    fn merge_mappings(&mut self, base_id: NodeId, overlay_id: NodeId) -> NodeId {
        let result = self.container_from(base_id, overlay_id);
        let base_pairs: Vec<(NodeId, NodeId)> = self.base.pairs(base_id).collect();
        let overlay_pairs: Vec<(NodeId, NodeId)> = self.overlay.pairs(overlay_id).collect();

        let overlay_key = |merger: &Self, key: &str| {
            overlay_pairs.iter().copied().find(|&(k, _)| {
                merger.overlay[k].kind == NodeKind::Scalar && merger.overlay[k].text() == key
            })
        };

        let mut children = Vec::with_capacity(base_pairs.len() * 2 + overlay_pairs.len() * 2);
        let mut base_keys = HashSet::new();
        for &(bk, bv) in &base_pairs {
            let shared = if self.base[bk].kind == NodeKind::Scalar {
                let text = self.base[bk].text();
                let found = overlay_key(self, &text);
                base_keys.insert(text);
                found
            } else {
                None
            };
            let key = self.import_base(bk);
            let value = match shared {
                Some((ok, ov)) => {
                    let both_maps = self.base[bv].kind == NodeKind::Mapping
                        && self.overlay[ov].kind == NodeKind::Mapping;
                    if both_maps {
                        self.merge_node(bv, ov)
                    } else {
                        self.override_key_comments(key, ok);
                        self.take_overlay(bv, ov)
                    }
                }
                None => self.import_base(bv),
            };
            children.push(key);
            children.push(value);
        }

        for &(ok, ov) in &overlay_pairs {
            let is_new = self.overlay[ok].kind != NodeKind::Scalar
                || !base_keys.contains(&self.overlay[ok].text());
            if is_new {
                let key = self.import_overlay(ok);
                let value = self.import_overlay(ov);
                children.push(key);
                children.push(value);
            }
        }

        self.out.set_children(result, children);
        result
    }

    fn override_key_comments(&mut self, key: NodeId, overlay_key: NodeId) {
        let source = &self.overlay[overlay_key];
        let (head, line, foot) = (
            source.head_comment.clone(),
            source.line_comment.clone(),
            source.foot_comment.clone(),
        );
        let target = &mut self.out[key];
        if !head.is_empty() {
            target.head_comment = head;
        }
        if !line.is_empty() {
            target.line_comment = line;
        }
        if !foot.is_empty() {
            target.foot_comment = foot;
        }
    }

    fn merge_sequences(&mut self, base_id: NodeId, overlay_id: NodeId) -> NodeId {
        let result = self.container_from(base_id, overlay_id);
        let mut children = Vec::new();
        for &item in self.base.children(base_id) {
            children.push(self.import_base(item));
        }
        for &item in self.overlay.children(overlay_id) {
            children.push(self.import_overlay(item));
        }
        self.out.set_children(result, children);
        result
    }

    /// Copy of the overlay node, with base comments filling empty classes.
    /// The base anchor is kept when the overlay has none so that base
    /// aliases still resolve.
    fn take_overlay(&mut self, base_id: NodeId, overlay_id: NodeId) -> NodeId {
        let id = self.import_overlay(overlay_id);
        let base = &self.base[base_id];
        let (head, line, foot, anchor) = (
            base.head_comment.clone(),
            base.line_comment.clone(),
            base.foot_comment.clone(),
            base.anchor.clone(),
        );
        let node = &mut self.out[id];
        if node.head_comment.is_empty() {
            node.head_comment = head;
        }
        if node.line_comment.is_empty() {
            node.line_comment = line;
        }
        if node.foot_comment.is_empty() {
            node.foot_comment = foot;
        }
        if node.anchor.is_none() && anchor.is_some() {
            node.anchor = anchor;
            self.base_map.insert(base_id, id);
        }
        id
    }

    fn finish(mut self) -> Document {
        let mut directives: Vec<Directive> = self.base.directives.clone();
        for directive in &self.overlay.directives {
            if !directives.iter().any(|d| d.name == directive.name) {
                directives.push(directive.clone());
            }
        }
        self.out.directives = directives;

        self.out.clear_anchors();
        let mut anchors: Vec<(String, NodeId)> = Vec::new();
        for (name, id) in self.base.anchors() {
            if let Some(&new_id) = self.base_map.get(&id) {
                anchors.push((name.to_string(), new_id));
            }
        }
        for (name, id) in self.overlay.anchors() {
            if let Some(&new_id) = self.overlay_map.get(&id) {
                anchors.push((name.to_string(), new_id));
            }
        }
        for (name, id) in anchors {
            if self.out[id].anchor.as_deref() == Some(name.as_str()) {
                self.out.register_anchor(&name, id);
            }
        }
        self.out.resolve_aliases();
        self.out
    }
}
