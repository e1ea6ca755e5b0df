//! Structural comparison of two trees.
//!
//! Entries are reported with a path relative to the document content, such
//! as `.settings[2].host`, plus the index of the document they belong to.
//! Presentation changes (comments, style) are reported separately from value
//! changes so callers can filter them.

use serde::Serialize;
use std::fmt;

use crate::document::Document;
use crate::node::{NodeId, NodeKind, NodeStyle};
use crate::scalar::ScalarValue;
use crate::tree::Tree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    Added,
    Removed,
    Modified,
    CommentChanged,
    StyleChanged,
    /// Part of the taxonomy; items are compared by index, so this is never
    /// produced.
    Reordered,
}

impl DiffKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiffKind::Added => "added",
            DiffKind::Removed => "removed",
            DiffKind::Modified => "modified",
            DiffKind::CommentChanged => "comment_changed",
            DiffKind::StyleChanged => "style_changed",
            DiffKind::Reordered => "reordered",
        }
    }
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The side of a change an entry reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DiffValue {
    Scalar(ScalarValue),
    Alias(String),
    Kind(NodeKind),
    Style(NodeStyle),
    Tag(Option<String>),
    /// Outline of a collection.
    Text(String),
}

impl fmt::Display for DiffValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffValue::Scalar(value) => write!(f, "{}", value),
            DiffValue::Alias(name) => write!(f, "*{}", name),
            DiffValue::Kind(kind) => write!(f, "{}", kind),
            DiffValue::Style(style) => write!(f, "{}", style),
            DiffValue::Tag(Some(tag)) => f.write_str(tag),
            DiffValue::Tag(None) => f.write_str("(no tag)"),
            DiffValue::Text(text) => f.write_str(text),
        }
    }
}

/// One difference between two trees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffEntry {
    pub kind: DiffKind,
    pub document: usize,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<DiffValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<DiffValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_node: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_node: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_comment: Option<String>,
    pub description: String,
}

impl DiffEntry {
    fn new(kind: DiffKind, document: usize, path: &str, description: String) -> Self {
        Self {
            kind,
            document,
            path: path.to_string(),
            old_value: None,
            new_value: None,
            old_node: None,
            new_node: None,
            old_comment: None,
            new_comment: None,
            description,
        }
    }

    /// Whether the entry reports a value change rather than presentation.
    pub fn is_structural(&self) -> bool {
        !matches!(self.kind, DiffKind::CommentChanged | DiffKind::StyleChanged)
    }
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "." } else { &self.path };
        write!(f, "{} {}: {}", self.kind, path, self.description)
    }
}

/// Compare two trees document by document.
pub fn diff(old: &Tree, new: &Tree) -> Vec<DiffEntry> {
    let mut entries = Vec::new();
    let count = old.len().max(new.len());
    for index in 0..count {
        match (old.documents.get(index), new.documents.get(index)) {
            (Some(a), Some(b)) => entries.extend(diff_documents(index, a, b)),
            (Some(a), None) => {
                let mut differ = Differ::new(a, a, index);
                if let Some(root) = a.root() {
                    differ.removed("", root);
                }
                entries.extend(differ.entries);
            }
            (None, Some(b)) => {
                let mut differ = Differ::new(b, b, index);
                if let Some(root) = b.root() {
                    differ.added("", root);
                }
                entries.extend(differ.entries);
            }
            (None, None) => {}
        }
    }
    tracing::debug!(entries = entries.len(), "Computed tree diff");
    entries
}

/// Compare two documents; `index` is recorded on every entry.
pub fn diff_documents(index: usize, old: &Document, new: &Document) -> Vec<DiffEntry> {
    let mut differ = Differ::new(old, new, index);
    match (old.root(), new.root()) {
        (Some(a), Some(b)) => differ.diff_nodes(a, b, ""),
        (Some(a), None) => differ.removed("", a),
        (None, Some(b)) => differ.added("", b),
        (None, None) => {}
    }
    differ.entries
}

/// Compare two subtrees starting at `path`.
pub fn diff_nodes(
    old: &Document,
    old_id: NodeId,
    new: &Document,
    new_id: NodeId,
    path: &str,
) -> Vec<DiffEntry> {
    let mut differ = Differ::new(old, new, 0);
    differ.diff_nodes(old_id, new_id, path);
    differ.entries
}

fn summary(doc: &Document, id: NodeId) -> DiffValue {
    let node = &doc[id];
    match node.kind {
        NodeKind::Scalar | NodeKind::Null => DiffValue::Scalar(node.value.clone()),
        NodeKind::Alias => DiffValue::Alias(node.text()),
        _ => DiffValue::Text(doc.display(id).to_string()),
    }
}

fn key_text(doc: &Document, id: NodeId) -> String {
    doc.display(id).to_string()
}

struct Differ<'a> {
    old: &'a Document,
    new: &'a Document,
    document: usize,
    entries: Vec<DiffEntry>,
}

impl<'a> Differ<'a> {
    fn new(old: &'a Document, new: &'a Document, document: usize) -> Self {
        Self {
            old,
            new,
            document,
            entries: Vec::new(),
        }
    }

    fn entry(&self, kind: DiffKind, path: &str, description: String) -> DiffEntry {
        DiffEntry::new(kind, self.document, path, description)
    }

    fn added(&mut self, path: &str, id: NodeId) {
        let value = summary(self.new, id);
        let mut entry = self.entry(DiffKind::Added, path, format!("added {}", value));
        entry.new_value = Some(value);
        entry.new_node = Some(id);
        self.entries.push(entry);
    }

    fn removed(&mut self, path: &str, id: NodeId) {
        let value = summary(self.old, id);
        let mut entry = self.entry(DiffKind::Removed, path, format!("removed {}", value));
        entry.old_value = Some(value);
        entry.old_node = Some(id);
        self.entries.push(entry);
    }

    fn modified(&mut self, path: &str, a: NodeId, b: NodeId, old: DiffValue, new: DiffValue) {
        let description = match (&old, &new) {
            (DiffValue::Scalar(a), DiffValue::Scalar(b)) if a.type_name() != b.type_name() => {
                format!(
                    "changed from {} {} to {} {}",
                    a.type_name(),
                    a,
                    b.type_name(),
                    b
                )
            }
            _ => format!("changed from {} to {}", old, new),
        };
        let mut entry = self.entry(DiffKind::Modified, path, description);
        entry.old_value = Some(old);
        entry.new_value = Some(new);
        entry.old_node = Some(a);
        entry.new_node = Some(b);
        self.entries.push(entry);
    }

    fn diff_nodes(&mut self, a: NodeId, b: NodeId, path: &str) {
        let (old_doc, new_doc) = (self.old, self.new);
        let (old, new) = (&old_doc[a], &new_doc[b]);
        if old.kind != new.kind {
            self.modified(path, a, b, DiffValue::Kind(old.kind), DiffValue::Kind(new.kind));
            return;
        }

        match old.kind {
            NodeKind::Scalar if old.text() != new.text() => {
                let (before, after) = (old.value.clone(), new.value.clone());
                self.modified(path, a, b, DiffValue::Scalar(before), DiffValue::Scalar(after));
            }
            NodeKind::Alias if old.text() != new.text() => {
                let (before, after) = (old.text(), new.text());
                self.modified(path, a, b, DiffValue::Alias(before), DiffValue::Alias(after));
            }
            _ => {}
        }
        self.diff_presentation(a, b, path);

        match old.kind {
            NodeKind::Mapping => self.diff_mappings(a, b, path),
            NodeKind::Sequence => self.diff_sequences(a, b, path),
            NodeKind::Document => {
                let first_old = old_doc.children(a).first().copied();
                let first_new = new_doc.children(b).first().copied();
                match (first_old, first_new) {
                    (Some(x), Some(y)) => self.diff_nodes(x, y, path),
                    (Some(x), None) => self.removed(path, x),
                    (None, Some(y)) => self.added(path, y),
                    (None, None) => {}
                }
            }
            _ => {}
        }
    }

    fn diff_presentation(&mut self, a: NodeId, b: NodeId, path: &str) {
        let (old_doc, new_doc) = (self.old, self.new);
        let (old, new) = (&old_doc[a], &new_doc[b]);
        if old.style != new.style {
            let mut entry = self.entry(
                DiffKind::StyleChanged,
                path,
                format!("style changed from {} to {}", old.style, new.style),
            );
            entry.old_value = Some(DiffValue::Style(old.style));
            entry.new_value = Some(DiffValue::Style(new.style));
            entry.old_node = Some(a);
            entry.new_node = Some(b);
            self.entries.push(entry);
        }

        let classes = [
            ("head", &old.head_comment, &new.head_comment),
            ("line", &old.line_comment, &new.line_comment),
            ("foot", &old.foot_comment, &new.foot_comment),
        ];
        let mut changes = Vec::new();
        for (class, before, after) in classes {
            if before != after {
                let mut entry = self.entry(
                    DiffKind::CommentChanged,
                    path,
                    format!("{} comment changed", class),
                );
                entry.old_comment = Some(before.join("\n"));
                entry.new_comment = Some(after.join("\n"));
                entry.old_node = Some(a);
                entry.new_node = Some(b);
                changes.push(entry);
            }
        }
        self.entries.extend(changes);

        if old.tag != new.tag {
            let (before, after) = (old.tag.clone(), new.tag.clone());
            self.modified(path, a, b, DiffValue::Tag(before), DiffValue::Tag(after));
        }
    }

    fn diff_mappings(&mut self, a: NodeId, b: NodeId, path: &str) {
        let old_pairs: Vec<(String, NodeId, NodeId)> = self
            .old
            .pairs(a)
            .map(|(k, v)| (key_text(self.old, k), k, v))
            .collect();
        let new_pairs: Vec<(String, NodeId, NodeId)> = self
            .new
            .pairs(b)
            .map(|(k, v)| (key_text(self.new, k), k, v))
            .collect();

        for (name, _, value) in &old_pairs {
            if !new_pairs.iter().any(|(n, _, _)| n == name) {
                self.removed(&format!("{}.{}", path, name), *value);
            }
        }
        for (name, new_key, new_value) in &new_pairs {
            let child = format!("{}.{}", path, name);
            match old_pairs.iter().find(|(n, _, _)| n == name) {
                Some((_, old_key, old_value)) => {
                    self.diff_presentation(*old_key, *new_key, &child);
                    self.diff_nodes(*old_value, *new_value, &child);
                }
                None => self.added(&child, *new_value),
            }
        }
    }

    fn diff_sequences(&mut self, a: NodeId, b: NodeId, path: &str) {
        let (old_doc, new_doc) = (self.old, self.new);
        let old_items = old_doc.children(a);
        let new_items = new_doc.children(b);
        let shared = old_items.len().min(new_items.len());
        for i in 0..shared {
            self.diff_nodes(old_items[i], new_items[i], &format!("{}[{}]", path, i));
        }
        for (i, &item) in old_items.iter().enumerate().skip(shared) {
            self.removed(&format!("{}[{}]", path, i), item);
        }
        for (i, &item) in new_items.iter().enumerate().skip(shared) {
            self.added(&format!("{}[{}]", path, i), item);
        }
    }
}
