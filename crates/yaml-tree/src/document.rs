//! Arena-backed YAML document.
//!
//! A [`Document`] owns every node it contains. Nodes refer to each other by
//! [`NodeId`], so parent, key and alias links never own their targets and a
//! whole document can be cloned with a plain `Clone`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::{Index, IndexMut};

use crate::error::NodeError;
use crate::node::{Node, NodeId, NodeKind, Visit};
use crate::scalar::ScalarValue;

/// A `%NAME value` line preceding a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    pub name: String,
    pub value: String,
}

impl Directive {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parse a directive line such as `%YAML 1.2`.
    pub fn parse(line: &str) -> Option<Self> {
        let body = line.trim().strip_prefix('%')?;
        let mut parts = body.splitn(2, char::is_whitespace);
        let name = parts.next().filter(|n| !n.is_empty())?;
        let value = parts.next().unwrap_or("").trim();
        Some(Self::new(name, value))
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            write!(f, "%{}", self.name)
        } else {
            write!(f, "%{} {}", self.name, self.value)
        }
    }
}

/// A single YAML document: node arena, root, anchor registry and directives.
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    anchors: IndexMap<String, NodeId>,
    pub directives: Vec<Directive>,
}

impl Index<NodeId> for Document {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for Document {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Make `id` the document root. The node is detached from any parent.
    pub fn set_root(&mut self, id: Option<NodeId>) {
        if let Some(id) = id {
            if let Some(parent) = self.get(id).and_then(|node| node.parent) {
                self.detach(id, parent);
            }
        }
        self.root = id;
    }

    /// The document's content node: the root itself, or the single child of
    /// a Document-kind root.
    pub fn content(&self) -> Option<NodeId> {
        self.root.and_then(|root| self.content_of(root))
    }

    pub(crate) fn content_of(&self, id: NodeId) -> Option<NodeId> {
        match self[id].kind {
            NodeKind::Document => self[id].children.first().copied(),
            _ => Some(id),
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Number of nodes in the arena, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn new_node(&mut self, kind: NodeKind) -> NodeId {
        self.push(Node::new(kind))
    }

    pub fn new_scalar(&mut self, value: impl Into<ScalarValue>) -> NodeId {
        let mut node = Node::new(NodeKind::Scalar);
        node.value = value.into();
        self.push(node)
    }

    pub fn new_mapping(&mut self) -> NodeId {
        self.new_node(NodeKind::Mapping)
    }

    pub fn new_sequence(&mut self) -> NodeId {
        self.new_node(NodeKind::Sequence)
    }

    pub fn new_null(&mut self) -> NodeId {
        self.new_node(NodeKind::Null)
    }

    pub fn new_document_node(&mut self) -> NodeId {
        self.new_node(NodeKind::Document)
    }

    /// Create an unresolved alias to `name`. Call [`Document::resolve_aliases`]
    /// once the target is registered.
    pub fn new_alias(&mut self, name: &str) -> NodeId {
        let mut node = Node::new(NodeKind::Alias);
        node.value = ScalarValue::Str(name.to_string());
        node.alias = self.anchors.get(name).copied();
        self.push(node)
    }

    fn check(&self, id: NodeId) -> Result<(), NodeError> {
        if self.get(id).is_some() {
            Ok(())
        } else {
            Err(NodeError::NotFound(id.0))
        }
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, of: NodeId) -> bool {
        let mut current = Some(of);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self[id].parent;
        }
        false
    }

    fn check_attachable(&self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        self.check(parent)?;
        self.check(child)?;
        if self[child].parent.is_some() {
            return Err(NodeError::AlreadyAttached(child.0));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(NodeError::Cycle {
                parent: parent.0,
                child: child.0,
            });
        }
        Ok(())
    }

    fn expect_kind(&self, id: NodeId, kind: NodeKind) -> Result<(), NodeError> {
        self.check(id)?;
        if self[id].kind != kind {
            return Err(NodeError::WrongKind {
                expected: kind.to_string(),
                found: self[id].kind.to_string(),
            });
        }
        Ok(())
    }

    /// Append `child` to a container node.
    ///
    /// For mappings, children alternate key and value; a child appended at an
    /// odd position becomes the value of the preceding key.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        self.check(parent)?;
        match self[parent].kind {
            NodeKind::Document | NodeKind::Mapping | NodeKind::Sequence => {}
            found => {
                return Err(NodeError::WrongKind {
                    expected: "container".into(),
                    found: found.to_string(),
                });
            }
        }
        self.check_attachable(parent, child)?;
        self.attach(parent, child);
        Ok(())
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        let position = self[parent].children.len();
        let key = if self[parent].kind == NodeKind::Mapping && position % 2 == 1 {
            Some(self[parent].children[position - 1])
        } else {
            None
        };
        self[parent].children.push(child);
        self[child].parent = Some(parent);
        self[child].key = key;
    }

    pub fn add_key_value(
        &mut self,
        map: NodeId,
        key: NodeId,
        value: NodeId,
    ) -> Result<(), NodeError> {
        self.expect_kind(map, NodeKind::Mapping)?;
        self.check_attachable(map, key)?;
        self.check_attachable(map, value)?;
        if key == value {
            return Err(NodeError::AlreadyAttached(value.0));
        }
        self.attach(map, key);
        self.attach(map, value);
        Ok(())
    }

    pub fn add_sequence_item(&mut self, seq: NodeId, item: NodeId) -> Result<(), NodeError> {
        self.expect_kind(seq, NodeKind::Sequence)?;
        self.check_attachable(seq, item)?;
        self.attach(seq, item);
        Ok(())
    }

    /// Replace the child list of `id`, fixing parent and key links.
    ///
    /// Previous children that are not in the new list become detached.
    pub(crate) fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) {
        let old = std::mem::take(&mut self[id].children);
        for child in old {
            self[child].parent = None;
            self[child].key = None;
        }
        for child in children {
            self.attach(id, child);
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self[id].children
    }

    /// Key/value pairs of a mapping node.
    pub fn pairs(&self, map: NodeId) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        let children: &[NodeId] = if self[map].kind == NodeKind::Mapping {
            &self[map].children
        } else {
            &[]
        };
        children.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }

    /// Value of the first pair whose scalar key renders as `key`.
    pub fn get_map_value(&self, map: NodeId, key: &str) -> Option<NodeId> {
        self.pairs(map)
            .find(|(k, _)| self[*k].kind == NodeKind::Scalar && self[*k].text() == key)
            .map(|(_, v)| v)
    }

    pub fn is_null(&self, id: NodeId) -> bool {
        self[id].is_null()
    }

    /// Depth-first pre-order traversal starting at `start`.
    ///
    /// Returns [`Visit::Stop`] if the visitor stopped the walk early.
    pub fn walk<F>(&self, start: NodeId, mut visit: F) -> Visit
    where
        F: FnMut(NodeId, &Node) -> Visit,
    {
        self.walk_inner(start, &mut visit)
    }

    fn walk_inner<F>(&self, id: NodeId, visit: &mut F) -> Visit
    where
        F: FnMut(NodeId, &Node) -> Visit,
    {
        match visit(id, &self[id]) {
            Visit::Stop => return Visit::Stop,
            Visit::SkipChildren => return Visit::Continue,
            Visit::Continue => {}
        }
        for &child in &self[id].children {
            if self.walk_inner(child, visit) == Visit::Stop {
                return Visit::Stop;
            }
        }
        Visit::Continue
    }

    pub fn find<P>(&self, start: NodeId, mut predicate: P) -> Option<NodeId>
    where
        P: FnMut(NodeId, &Node) -> bool,
    {
        let mut found = None;
        self.walk(start, |id, node| {
            if predicate(id, node) {
                found = Some(id);
                Visit::Stop
            } else {
                Visit::Continue
            }
        });
        found
    }

    pub fn find_all<P>(&self, start: NodeId, mut predicate: P) -> Vec<NodeId>
    where
        P: FnMut(NodeId, &Node) -> bool,
    {
        let mut found = Vec::new();
        self.walk(start, |id, node| {
            if predicate(id, node) {
                found.push(id);
            }
            Visit::Continue
        });
        found
    }

    /// Location of a node from the document root, such as `$.servers[0].host`.
    ///
    /// Key nodes share the segment of their value.
    pub fn path(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self[current].parent {
            let position = self[parent]
                .children
                .iter()
                .position(|&c| c == current)
                .unwrap_or(0);
            match self[parent].kind {
                NodeKind::Mapping => {
                    let key = self[parent].children[position - position % 2];
                    segments.push(format!(".{}", self[key].text()));
                }
                NodeKind::Sequence => segments.push(format!("[{}]", position)),
                _ => {}
            }
            current = parent;
        }
        segments.reverse();
        format!("${}", segments.concat())
    }

    /// Detach a node from its parent.
    ///
    /// Removing either half of a mapping pair removes the whole pair.
    pub fn remove(&mut self, id: NodeId) -> Result<(), NodeError> {
        self.check(id)?;
        let parent = self[id].parent.ok_or(NodeError::RootNode)?;
        if self.detach(id, parent) {
            Ok(())
        } else {
            Err(NodeError::NotFound(id.0))
        }
    }

    /// Splice `id` out of `parent`. Returns `false` when `parent` does not
    /// list it.
    fn detach(&mut self, id: NodeId, parent: NodeId) -> bool {
        let Some(position) = self[parent].children.iter().position(|&c| c == id) else {
            return false;
        };
        let removed: Vec<NodeId> = if self[parent].kind == NodeKind::Mapping {
            let start = position - position % 2;
            let end = (start + 2).min(self[parent].children.len());
            self[parent].children.drain(start..end).collect()
        } else {
            vec![self[parent].children.remove(position)]
        };
        for child in removed {
            self[child].parent = None;
            self[child].key = None;
        }
        true
    }

    /// Put `replacement` where `id` is in its parent's child list.
    pub fn replace_with(&mut self, id: NodeId, replacement: NodeId) -> Result<(), NodeError> {
        self.check(id)?;
        let parent = self[id].parent.ok_or(NodeError::RootNode)?;
        self.check_attachable(parent, replacement)?;
        let position = self[parent]
            .children
            .iter()
            .position(|&c| c == id)
            .ok_or(NodeError::NotFound(id.0))?;
        self[parent].children[position] = replacement;
        let key = self[id].key.take();
        self[id].parent = None;
        self[replacement].parent = Some(parent);
        self[replacement].key = key;
        if self[parent].kind == NodeKind::Mapping && position % 2 == 0 {
            if let Some(&value) = self[parent].children.get(position + 1) {
                self[value].key = Some(replacement);
            }
        }
        Ok(())
    }

    /// Deep-copy a subtree inside this document. The copy is detached.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let source = self.clone();
        let mut mapping = HashMap::new();
        self.import_subtree(&source, id, &mut mapping)
    }

    /// Deep-copy a subtree of `source` into this document.
    ///
    /// `mapping` records source id to new id; nodes already present in it are
    /// reused instead of copied again. Alias links are carried over when their
    /// target has been imported, otherwise they stay unresolved.
    pub fn import_subtree(
        &mut self,
        source: &Document,
        id: NodeId,
        mapping: &mut HashMap<NodeId, NodeId>,
    ) -> NodeId {
        if let Some(&done) = mapping.get(&id) {
            return done;
        }
        let mut node = source[id].clone();
        let children = std::mem::take(&mut node.children);
        node.parent = None;
        node.key = None;
        let alias = node.alias.take();
        let new_id = self.push(node);
        mapping.insert(id, new_id);
        for child in children {
            let new_child = self.import_subtree(source, child, mapping);
            if self[new_child].parent.is_none() {
                self.attach(new_id, new_child);
            }
        }
        if let Some(target) = alias {
            self[new_id].alias = mapping.get(&target).copied();
        }
        new_id
    }

    /// Register `id` under anchor `name`; a later registration of the same
    /// name replaces the earlier one.
    pub fn register_anchor(&mut self, name: &str, id: NodeId) {
        self[id].anchor = Some(name.to_string());
        self.anchors.insert(name.to_string(), id);
    }

    pub fn anchor(&self, name: &str) -> Option<NodeId> {
        self.anchors.get(name).copied()
    }

    pub fn anchors(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.anchors.iter().map(|(name, &id)| (name.as_str(), id))
    }

    pub(crate) fn clear_anchors(&mut self) {
        self.anchors.clear();
    }

    /// Point every reachable alias at its registered anchor.
    ///
    /// Returns the number of aliases whose name is not registered.
    pub fn resolve_aliases(&mut self) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        let aliases = self.find_all(root, |_, node| node.kind == NodeKind::Alias);
        let mut unresolved = 0;
        for id in aliases {
            let target = self[id]
                .alias_name()
                .and_then(|name| self.anchors.get(name).copied());
            if target.is_none() {
                tracing::warn!(
                    alias = self[id].alias_name().unwrap_or_default(),
                    "Alias refers to an unknown anchor"
                );
                unresolved += 1;
            }
            self[id].alias = target;
        }
        unresolved
    }

    /// Follow alias links until a non-alias node is reached.
    ///
    /// Returns `None` for unresolved aliases and for alias chains that loop.
    pub fn resolve_alias(&self, id: NodeId) -> Option<NodeId> {
        let mut seen = HashSet::new();
        let mut current = id;
        while self[current].kind == NodeKind::Alias {
            if !seen.insert(current) {
                return None;
            }
            current = self[current].alias?;
        }
        Some(current)
    }

    /// Rebuild the anchor registry from the anchors of reachable nodes, then
    /// re-resolve aliases against it.
    pub fn rebuild_anchors(&mut self) -> usize {
        self.anchors.clear();
        if let Some(root) = self.root {
            let anchored = self.find_all(root, |_, node| node.anchor.is_some());
            for id in anchored {
                if let Some(name) = self[id].anchor.clone() {
                    self.anchors.insert(name, id);
                }
            }
        }
        self.resolve_aliases()
    }

    /// Compact single-line rendering of a subtree, for logs and diffs.
    pub fn display(&self, id: NodeId) -> NodeDisplay<'_> {
        NodeDisplay { doc: self, id }
    }
}

/// [`fmt::Display`] adapter returned by [`Document::display`].
pub struct NodeDisplay<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl fmt::Display for NodeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = &self.doc[self.id];
        match node.kind {
            NodeKind::Scalar | NodeKind::Null => f.write_str(&node.text()),
            NodeKind::Alias => write!(f, "*{}", node.text()),
            NodeKind::Document => match node.children.first() {
                Some(&child) => write!(f, "{}", self.doc.display(child)),
                None => Ok(()),
            },
            NodeKind::Sequence => {
                f.write_str("[")?;
                for (i, &child) in node.children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", self.doc.display(child))?;
                }
                f.write_str("]")
            }
            NodeKind::Mapping => {
                f.write_str("{")?;
                for (i, (key, value)) in self.doc.pairs(self.id).enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", self.doc.display(key), self.doc.display(value))?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId) {
        let mut doc = Document::new();
        let root = doc.new_mapping();
        doc.set_root(Some(root));
        let name = doc.new_scalar("name");
        let value = doc.new_scalar("demo");
        doc.add_key_value(root, name, value).unwrap();
        let items = doc.new_scalar("items");
        let seq = doc.new_sequence();
        doc.add_key_value(root, items, seq).unwrap();
        for i in 1..=3 {
            let item = doc.new_scalar(i64::from(i));
            doc.add_sequence_item(seq, item).unwrap();
        }
        (doc, root)
    }

    #[test]
    fn test_mapping_links() {
        let (doc, root) = sample();
        let value = doc.get_map_value(root, "name").unwrap();
        assert_eq!(doc[value].value, ScalarValue::Str("demo".into()));
        assert_eq!(doc[value].parent(), Some(root));
        let key = doc[value].key().unwrap();
        assert_eq!(doc[key].text(), "name");
        assert_eq!(doc.pairs(root).count(), 2);
    }

    #[test]
    fn test_attach_rejects_cycles_and_reparenting() {
        let (mut doc, root) = sample();
        let seq = doc.get_map_value(root, "items").unwrap();
        let first = doc.children(seq)[0];
        assert_eq!(
            doc.add_sequence_item(seq, first),
            Err(NodeError::AlreadyAttached(first.index()))
        );

        let inner = doc.new_sequence();
        doc.add_sequence_item(seq, inner).unwrap();
        assert!(matches!(
            doc.add_child(inner, root),
            Err(NodeError::Cycle { .. })
        ));
        assert!(matches!(
            doc.add_sequence_item(root, inner),
            Err(NodeError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_remove_mapping_value_removes_pair() {
        let (mut doc, root) = sample();
        let value = doc.get_map_value(root, "name").unwrap();
        doc.remove(value).unwrap();
        assert_eq!(doc.pairs(root).count(), 1);
        assert!(doc[value].parent().is_none());
        assert!(doc.get_map_value(root, "name").is_none());
    }

    #[test]
    fn test_root_cannot_be_removed_or_replaced() {
        let (mut doc, root) = sample();
        let other = doc.new_scalar("x");
        assert_eq!(doc.remove(root), Err(NodeError::RootNode));
        assert_eq!(doc.replace_with(root, other), Err(NodeError::RootNode));
        assert_eq!(doc.root(), Some(root));
    }

    #[test]
    fn test_replace_with_keeps_key_link() {
        let (mut doc, root) = sample();
        let value = doc.get_map_value(root, "name").unwrap();
        let replacement = doc.new_scalar("other");
        doc.replace_with(value, replacement).unwrap();
        assert_eq!(doc.get_map_value(root, "name"), Some(replacement));
        assert!(doc[replacement].key().is_some());
        assert!(doc[value].parent().is_none());
    }

    #[test]
    fn test_walk_find_and_path() {
        let (doc, root) = sample();
        let mut visited = 0;
        doc.walk(root, |_, _| {
            visited += 1;
            Visit::Continue
        });
        assert_eq!(visited, 8);

        let mut shallow = 0;
        doc.walk(root, |id, _| {
            shallow += 1;
            if id == root {
                Visit::Continue
            } else {
                Visit::SkipChildren
            }
        });
        assert_eq!(shallow, 5);

        let two = doc
            .find(root, |_, node| node.value == ScalarValue::Int(2))
            .unwrap();
        assert_eq!(doc.path(two), "$.items[1]");
        let ints = doc.find_all(root, |_, node| matches!(node.value, ScalarValue::Int(_)));
        assert_eq!(ints.len(), 3);
    }

    #[test]
    fn test_clone_subtree_is_detached_copy() {
        let (mut doc, root) = sample();
        let seq = doc.get_map_value(root, "items").unwrap();
        let copy = doc.clone_subtree(seq);
        assert_ne!(copy, seq);
        assert!(doc[copy].parent().is_none());
        assert_eq!(doc.children(copy).len(), 3);
        assert_eq!(doc.display(copy).to_string(), "[1, 2, 3]");
    }

    #[test]
    fn test_alias_resolution() {
        let mut doc = Document::new();
        let root = doc.new_sequence();
        doc.set_root(Some(root));
        let target = doc.new_scalar("shared");
        doc.register_anchor("s", target);
        let alias = doc.new_alias("s");
        let dangling = doc.new_alias("missing");
        doc.add_sequence_item(root, target).unwrap();
        doc.add_sequence_item(root, alias).unwrap();
        doc.add_sequence_item(root, dangling).unwrap();

        assert_eq!(doc.resolve_aliases(), 1);
        assert_eq!(doc.resolve_alias(alias), Some(target));
        assert_eq!(doc.resolve_alias(dangling), None);
    }

    #[test]
    fn test_alias_cycle_resolves_to_none() {
        let mut doc = Document::new();
        let a = doc.new_alias("b");
        let b = doc.new_alias("a");
        doc.register_anchor("a", a);
        doc.register_anchor("b", b);
        doc[a].alias = Some(b);
        doc[b].alias = Some(a);
        assert_eq!(doc.resolve_alias(a), None);
    }

    #[test]
    fn test_duplicate_anchor_last_wins() {
        let mut doc = Document::new();
        let first = doc.new_scalar(1);
        let second = doc.new_scalar(2);
        doc.register_anchor("x", first);
        doc.register_anchor("x", second);
        assert_eq!(doc.anchor("x"), Some(second));
        assert_eq!(doc.anchors().count(), 1);
    }

    #[test]
    fn test_directive_parse() {
        let directive = Directive::parse("%YAML 1.2").unwrap();
        assert_eq!(directive, Directive::new("YAML", "1.2"));
        assert_eq!(directive.to_string(), "%YAML 1.2");
        assert!(Directive::parse("not a directive").is_none());
    }
}
