//! Slash-separated path lookup.
//!
//! Segments are matched left to right against the current node set:
//!
//! - `name` selects the value of the first mapping key rendering as `name`
//! - `*` selects every child (keys and values alike for mappings)
//! - `[n]` selects the n-th item of a sequence; a bracketed segment that is
//!   not a non-negative integer selects nothing
//!
//! Segments are matched against the node itself, so a path starting at a
//! Document-kind node must begin with `*`. [`Document::query`] starts at
//! the document content instead. Segments that match nothing simply produce
//! no results.

use crate::document::Document;
use crate::node::{NodeId, NodeKind};

/// Resolve `path` starting at `start`. An empty path yields `start` itself.
pub fn query(doc: &Document, start: NodeId, path: &str) -> Vec<NodeId> {
    let mut current = vec![start];
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let mut next = Vec::new();
        for id in current {
            step(doc, id, segment, &mut next);
        }
        current = next;
        if current.is_empty() {
            break;
        }
    }
    current
}

fn step(doc: &Document, id: NodeId, segment: &str, out: &mut Vec<NodeId>) {
    let node = &doc[id];
    if segment == "*" {
        out.extend_from_slice(doc.children(id));
        return;
    }
    if let Some(inner) = segment.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        let index = inner.parse::<usize>().ok();
        if let (Some(index), NodeKind::Sequence) = (index, node.kind) {
            if let Some(&item) = doc.children(id).get(index) {
                out.push(item);
            }
        }
        return;
    }
    if node.kind == NodeKind::Mapping {
        if let Some(value) = doc.get_map_value(id, segment) {
            out.push(value);
        }
    }
}

impl Document {
    /// Resolve a query path from the document content.
    pub fn query(&self, path: &str) -> Vec<NodeId> {
        match self.content() {
            Some(content) => query(self, content, path),
            None => Vec::new(),
        }
    }
}
