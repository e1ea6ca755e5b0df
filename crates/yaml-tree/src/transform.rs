//! Chainable node transformations.
//!
//! A [`Pipeline`] is an ordered list of [`NodeOperation`]s. Applying it to a
//! tree visits every node depth-first, a node before its children, and runs
//! the operations on it in chain order. Any operation may drop the node (and
//! with it the node's subtree) or swap in a replacement.
//!
//! A pipeline containing a `select` works differently: the first `select`
//! alone decides the output, keeping the nodes whose value matches its
//! predicate along with the mapping structure leading to them. No other
//! operation runs.
//!
//! # Example
//!
//! ```rust
//! use yaml_tree::{Pipeline, parse};
//!
//! let tree = parse("b: 1\na: 2\nsecret: x\n").unwrap();
//! let out = Pipeline::new()
//!     .remove_key("secret")
//!     .sort_keys()
//!     .apply(&tree)
//!     .unwrap();
//! assert_eq!(out.serialize(), "a: 2\nb: 1\n");
//! ```

use crate::document::Document;
use crate::error::{BoxError, TransformError};
use crate::node::{NodeId, NodeKind};
use crate::scalar::ScalarValue;
use crate::tree::Tree;

/// What an operation decided for the node it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep the node, possibly edited in place.
    Keep,
    /// Put this detached node of the same document in its place.
    Replace(NodeId),
    /// Drop the node and its subtree. Dropping either half of a mapping
    /// pair drops the pair.
    Remove,
}

/// A transformation applied to each visited node.
///
/// Operations must be `Send + Sync` so a pipeline can be shared between
/// threads.
pub trait NodeOperation: Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Apply the operation to `node`.
    ///
    /// # Errors
    ///
    /// An error aborts the whole pipeline run.
    fn apply(&self, doc: &mut Document, node: NodeId) -> Result<Step, BoxError>;
}

type Predicate = Box<dyn Fn(&Document, NodeId) -> bool + Send + Sync>;
type MapFn = Box<dyn Fn(&mut Document, NodeId) -> Result<Step, BoxError> + Send + Sync>;

enum Entry {
    Select(Predicate),
    Operation(Box<dyn NodeOperation>),
}

/// Ordered list of node operations.
#[derive(Default)]
pub struct Pipeline {
    entries: Vec<Entry>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only nodes whose value satisfies `predicate`, together with the
    /// mappings that lead to them.
    ///
    /// The predicate sees the whole document, so it can look at a value's
    /// key or parent through [`Node::key`](crate::Node::key) and
    /// [`Node::parent`](crate::Node::parent).
    pub fn select<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&Document, NodeId) -> bool + Send + Sync + 'static,
    {
        self.entries.push(Entry::Select(Box::new(predicate)));
        self
    }

    /// Run `f` on every node.
    pub fn map<F>(self, f: F) -> Self
    where
        F: Fn(&mut Document, NodeId) -> Step + Send + Sync + 'static,
    {
        self.then(FnOperation {
            name: "map",
            f: Box::new(move |doc: &mut Document, id: NodeId| -> Result<Step, BoxError> {
                Ok(f(doc, id))
            }),
        })
    }

    /// Run a fallible `f` on every node.
    pub fn try_map<F>(self, f: F) -> Self
    where
        F: Fn(&mut Document, NodeId) -> Result<Step, BoxError> + Send + Sync + 'static,
    {
        self.then(FnOperation {
            name: "try_map",
            f: Box::new(f),
        })
    }

    pub fn set_value(self, value: impl Into<ScalarValue>) -> Self {
        self.then(SetValue(value.into()))
    }

    pub fn add_comment(self, text: impl Into<String>) -> Self {
        self.then(AddComment::new(text))
    }

    pub fn remove_key(self, key: impl Into<String>) -> Self {
        self.then(RemoveKey(key.into()))
    }

    pub fn rename_key(self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.then(RenameKey {
            from: from.into(),
            to: to.into(),
        })
    }

    pub fn sort_keys(self) -> Self {
        self.then(SortKeys)
    }

    pub fn flatten(self) -> Self {
        self.then(Flatten)
    }

    /// Append a custom operation.
    pub fn then(mut self, operation: impl NodeOperation + 'static) -> Self {
        self.push(Box::new(operation));
        self
    }

    pub fn push(&mut self, operation: Box<dyn NodeOperation>) {
        self.entries.push(Entry::Operation(operation));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of all entries in chain order.
    pub fn operation_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| match entry {
                Entry::Select(_) => "select",
                Entry::Operation(op) => op.name(),
            })
            .collect()
    }

    /// Apply the pipeline to a copy of `tree`.
    ///
    /// # Errors
    ///
    /// Returns the first operation failure; `tree` is never modified.
    pub fn apply(&self, tree: &Tree) -> Result<Tree, TransformError> {
        let mut out = tree.clone();
        let selector = self.entries.iter().find_map(|entry| match entry {
            Entry::Select(predicate) => Some(predicate),
            Entry::Operation(_) => None,
        });
        let operations: Vec<&dyn NodeOperation> = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Operation(op) => Some(op.as_ref()),
                Entry::Select(_) => None,
            })
            .collect();

        for (index, doc) in out.documents.iter_mut().enumerate() {
            let Some(root) = doc.root() else {
                continue;
            };
            tracing::debug!(
                document = index,
                operations = ?self.operation_names(),
                "Applying pipeline"
            );
            let result = match selector {
                Some(predicate) => select_node(doc, root, predicate.as_ref()),
                None => apply_node(doc, root, &operations)?,
            };
            doc.set_root(result);
            doc.rebuild_anchors();
        }
        Ok(out)
    }
}

fn apply_node(
    doc: &mut Document,
    id: NodeId,
    operations: &[&dyn NodeOperation],
) -> Result<Option<NodeId>, TransformError> {
    let mut current = id;
    for op in operations {
        let step = op
            .apply(doc, current)
            .map_err(|source| TransformError::Operation {
                name: op.name().to_string(),
                source,
            })?;
        match step {
            Step::Keep => {}
            Step::Replace(replacement) => current = replacement,
            Step::Remove => return Ok(None),
        }
    }

    let children = doc.children(current).to_vec();
    let mut kept = Vec::with_capacity(children.len());
    if doc[current].kind == NodeKind::Mapping {
        for pair in children.chunks_exact(2) {
            let key = apply_node(doc, pair[0], operations)?;
            let value = apply_node(doc, pair[1], operations)?;
            if let (Some(key), Some(value)) = (key, value) {
                kept.push(key);
                kept.push(value);
            }
        }
    } else {
        for child in children {
            if let Some(child) = apply_node(doc, child, operations)? {
                kept.push(child);
            }
        }
    }
    doc.set_children(current, kept);
    Ok(Some(current))
}

fn select_node(
    doc: &mut Document,
    id: NodeId,
    predicate: &dyn Fn(&Document, NodeId) -> bool,
) -> Option<NodeId> {
    match doc[id].kind {
        NodeKind::Document => {
            let content = doc.children(id).first().copied()?;
            let selected = select_node(doc, content, predicate)?;
            doc.set_children(id, vec![selected]);
            Some(id)
        }
        NodeKind::Mapping => {
            let pairs: Vec<(NodeId, NodeId)> = doc.pairs(id).collect();
            let mut kept = Vec::new();
            for (key, value) in pairs {
                if predicate(doc, value) {
                    kept.extend([key, value]);
                } else if doc[value].kind == NodeKind::Mapping {
                    if let Some(value) = select_node(doc, value, predicate) {
                        kept.extend([key, value]);
                    }
                }
            }
            if kept.is_empty() {
                return None;
            }
            doc.set_children(id, kept);
            Some(id)
        }
        _ => predicate(doc, id).then_some(id),
    }
}

struct FnOperation {
    name: &'static str,
    f: MapFn,
}

impl NodeOperation for FnOperation {
    fn name(&self) -> &str {
        self.name
    }

    fn apply(&self, doc: &mut Document, node: NodeId) -> Result<Step, BoxError> {
        (self.f)(doc, node)
    }
}

fn is_key_named(doc: &Document, id: NodeId, name: &str) -> bool {
    doc[id].kind == NodeKind::Scalar && doc[id].text() == name
}

/// Set the value of every scalar, mapping keys included.
#[derive(Debug, Clone)]
pub struct SetValue(pub ScalarValue);

impl NodeOperation for SetValue {
    fn name(&self) -> &str {
        "set_value"
    }

    fn apply(&self, doc: &mut Document, node: NodeId) -> Result<Step, BoxError> {
        let node = &mut doc[node];
        if node.kind == NodeKind::Scalar {
            node.value = self.0.clone();
            node.raw = None;
        }
        Ok(Step::Keep)
    }
}

/// Append a head comment line to every node.
#[derive(Debug, Clone)]
pub struct AddComment(String);

impl AddComment {
    /// A missing `#` marker is added.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim_start().starts_with('#') {
            Self(text)
        } else {
            Self(format!("# {}", text))
        }
    }
}

impl NodeOperation for AddComment {
    fn name(&self) -> &str {
        "add_comment"
    }

    fn apply(&self, doc: &mut Document, node: NodeId) -> Result<Step, BoxError> {
        doc[node].head_comment.push(self.0.clone());
        Ok(Step::Keep)
    }
}

/// Drop every pair whose scalar key renders as the given name.
#[derive(Debug, Clone)]
pub struct RemoveKey(pub String);

impl NodeOperation for RemoveKey {
    fn name(&self) -> &str {
        "remove_key"
    }

    fn apply(&self, doc: &mut Document, node: NodeId) -> Result<Step, BoxError> {
        if doc[node].kind != NodeKind::Mapping {
            return Ok(Step::Keep);
        }
        let kept: Vec<NodeId> = doc
            .pairs(node)
            .filter(|&(key, _)| !is_key_named(doc, key, &self.0))
            .flat_map(|(key, value)| [key, value])
            .collect();
        if kept.len() != doc.children(node).len() {
            doc.set_children(node, kept);
        }
        Ok(Step::Keep)
    }
}

/// Rename the first scalar key spelled `from` in each mapping.
#[derive(Debug, Clone)]
pub struct RenameKey {
    pub from: String,
    pub to: String,
}

impl NodeOperation for RenameKey {
    fn name(&self) -> &str {
        "rename_key"
    }

    fn apply(&self, doc: &mut Document, node: NodeId) -> Result<Step, BoxError> {
        if doc[node].kind != NodeKind::Mapping {
            return Ok(Step::Keep);
        }
        let found = doc
            .pairs(node)
            .map(|(key, _)| key)
            .find(|&key| is_key_named(doc, key, &self.from));
        if let Some(key) = found {
            doc[key].value = ScalarValue::Str(self.to.clone());
            doc[key].raw = None;
        }
        Ok(Step::Keep)
    }
}

/// Stable sort of mapping pairs by rendered key text.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortKeys;

impl NodeOperation for SortKeys {
    fn name(&self) -> &str {
        "sort_keys"
    }

    fn apply(&self, doc: &mut Document, node: NodeId) -> Result<Step, BoxError> {
        if doc[node].kind != NodeKind::Mapping {
            return Ok(Step::Keep);
        }
        let mut pairs: Vec<(String, NodeId, NodeId)> = doc
            .pairs(node)
            .map(|(key, value)| (doc.display(key).to_string(), key, value))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        let children = pairs
            .into_iter()
            .flat_map(|(_, key, value)| [key, value])
            .collect();
        doc.set_children(node, children);
        Ok(Step::Keep)
    }
}

/// Collapse nested mappings into one level with dot-joined keys.
///
/// Comments on intermediate keys are dropped; the innermost key's comments
/// move to the joined key.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flatten;

impl Flatten {
    fn collect(
        doc: &Document,
        map: NodeId,
        prefix: &str,
        leaves: &mut Vec<(String, NodeId, NodeId)>,
        nested: &mut Vec<NodeId>,
    ) {
        for (key, value) in doc.pairs(map) {
            let name = doc.display(key).to_string();
            let path = if prefix.is_empty() {
                name
            } else {
                format!("{}.{}", prefix, name)
            };
            if doc[value].kind == NodeKind::Mapping {
                nested.push(value);
                Self::collect(doc, value, &path, leaves, nested);
            } else {
                leaves.push((path, key, value));
            }
        }
    }
}

impl NodeOperation for Flatten {
    fn name(&self) -> &str {
        "flatten"
    }

    fn apply(&self, doc: &mut Document, node: NodeId) -> Result<Step, BoxError> {
        if doc[node].kind != NodeKind::Mapping {
            return Ok(Step::Keep);
        }
        let mut leaves = Vec::new();
        let mut nested = Vec::new();
        Self::collect(doc, node, "", &mut leaves, &mut nested);
        if nested.is_empty() {
            return Ok(Step::Keep);
        }
        for map in nested {
            doc.set_children(map, Vec::new());
        }
        let mut children = Vec::with_capacity(leaves.len() * 2);
        for (path, old_key, value) in leaves {
            let key = doc.new_scalar(path);
            let (head, line, blank) = {
                let old = &doc[old_key];
                (old.head_comment.clone(), old.line_comment.clone(), old.blank_lines_before)
            };
            let key_node = &mut doc[key];
            key_node.head_comment = head;
            key_node.line_comment = line;
            key_node.blank_lines_before = blank;
            children.push(key);
            children.push(value);
        }
        doc.set_children(node, children);
        Ok(Step::Keep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::parse;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn run(pipeline: &Pipeline, text: &str) -> String {
        pipeline.apply(&parse(text).unwrap()).unwrap().serialize()
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let pipeline = Pipeline::new();
        assert!(pipeline.is_empty());
        let text = "# top\na: 1\n\nb:\n  - x # item\n";
        assert_eq!(run(&pipeline, text), text);
    }

    #[test]
    fn test_operation_names_in_order() {
        let pipeline = Pipeline::new()
            .remove_key("a")
            .rename_key("b", "c")
            .select(|_, _| true)
            .sort_keys();
        assert_eq!(pipeline.len(), 4);
        assert_eq!(
            pipeline.operation_names(),
            vec!["remove_key", "rename_key", "select", "sort_keys"]
        );
    }

    #[test]
    fn test_remove_key_at_every_depth() {
        let pipeline = Pipeline::new().remove_key("secret");
        let out = run(&pipeline, "secret: 1\nkeep:\n  secret: 2\n  ok: 3\n");
        assert_eq!(out, "keep:\n  ok: 3\n");
    }

    #[test]
    fn test_rename_key_keeps_comments() {
        let pipeline = Pipeline::new().rename_key("old", "new");
        let out = run(&pipeline, "# about\nold: 1 # one\n");
        assert_eq!(out, "# about\nnew: 1 # one\n");
    }

    #[test]
    fn test_order_sensitivity() {
        let text = "a: 1\nb: 2\n";
        let remove_then_rename = Pipeline::new().remove_key("a").rename_key("b", "a");
        assert_eq!(run(&remove_then_rename, text), "a: 2\n");
        let rename_then_remove = Pipeline::new().rename_key("b", "a").remove_key("a");
        assert_eq!(run(&rename_then_remove, text), "{}\n");
    }

    #[test]
    fn test_sort_keys_is_recursive() {
        let pipeline = Pipeline::new().sort_keys();
        let out = run(&pipeline, "b: 1\na:\n  z: 1\n  y: 2\n");
        assert_eq!(out, "a:\n  y: 2\n  z: 1\nb: 1\n");
    }

    #[test]
    fn test_flatten() {
        let pipeline = Pipeline::new().flatten();
        let out = run(&pipeline, "a:\n  b: 1\n  c:\n    d: 2\ne: [1, 2]\n");
        assert_eq!(out, "a.b: 1\na.c.d: 2\ne: [1, 2]\n");
    }

    #[test]
    fn test_set_value_reaches_keys_too() {
        let pipeline = Pipeline::new().set_value("x");
        let out = run(&pipeline, "- 1\n- 2\n");
        assert_eq!(out, "- x\n- x\n");
    }

    #[test]
    fn test_add_comment() {
        let pipeline = Pipeline::new().add_comment("generated");
        let tree = pipeline.apply(&parse("- 1\n").unwrap()).unwrap();
        let doc = &tree.documents[0];
        let seq = doc.content().unwrap();
        let item = doc.children(seq)[0];
        assert_eq!(doc[item].head_comment, vec!["# generated"]);
    }

    #[test]
    fn test_select_keeps_matching_paths() {
        let pipeline = Pipeline::new()
            .select(|doc, id| doc[id].value == ScalarValue::Int(1))
            .remove_key("a");
        let out = run(&pipeline, "a: 1\nb: 2\nc:\n  d: 1\n  e: 3\n");
        assert_eq!(out, "a: 1\nc:\n  d: 1\n");
    }

    #[test]
    fn test_select_by_key_name() {
        let under_config = |doc: &Document, id: NodeId| {
            let named = |id: Option<NodeId>| id.is_some_and(|key| doc[key].text() == "config");
            named(doc[id].key()) || doc[id].parent().is_some_and(|p| named(doc[p].key()))
        };
        let pipeline = Pipeline::new().select(under_config);
        let out = run(&pipeline, "config:\n  a: 1\n  b: 2\nmetadata:\n  c: 3\nother: 4\n");
        assert_eq!(out, "config:\n  a: 1\n  b: 2\n");
    }

    #[test]
    fn test_rename_key_stops_at_first_match() {
        let pipeline = Pipeline::new().rename_key("x", "y");
        let out = run(&pipeline, "{x: 1, x: 2}\n");
        assert_eq!(out, "{y: 1, x: 2}\n");
    }

    #[test]
    fn test_select_nothing_empties_document() {
        let pipeline = Pipeline::new().select(|_, _| false);
        let tree = pipeline.apply(&parse("a: 1\n").unwrap()).unwrap();
        assert!(tree.documents[0].root().is_none());
        assert_eq!(tree.serialize(), "");
    }

    #[test]
    fn test_map_can_drop_and_replace() {
        let pipeline = Pipeline::new().map(|doc, id| {
            if doc[id].kind != NodeKind::Scalar {
                return Step::Keep;
            }
            match doc[id].value.clone() {
                ScalarValue::Int(2) => Step::Remove,
                ScalarValue::Int(n) => Step::Replace(doc.new_scalar(n * 10)),
                _ => Step::Keep,
            }
        });
        let out = run(&pipeline, "- 1\n- 2\n- 3\n");
        assert_eq!(out, "- 10\n- 30\n");
    }

    #[test]
    fn test_error_names_operation_and_leaves_input() {
        let pipeline = Pipeline::new().try_map(|doc, id| {
            if doc[id].text() == "bad" {
                Err("refusing bad value".into())
            } else {
                Ok(Step::Keep)
            }
        });
        let tree = parse("ok: bad\n").unwrap();
        let err = pipeline.apply(&tree).unwrap_err();
        assert_eq!(
            err.to_string(),
            "transform 'try_map' failed: refusing bad value"
        );
        assert_eq!(tree.serialize(), "ok: bad\n");
    }

    #[test]
    fn test_anchors_rebuilt_after_removal() {
        let pipeline = Pipeline::new().remove_key("a");
        let tree = pipeline.apply(&parse("a: &x 1\nb: 2\n").unwrap()).unwrap();
        assert!(tree.documents[0].anchor("x").is_none());
    }

    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    impl NodeOperation for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn apply(&self, _doc: &mut Document, _node: NodeId) -> Result<Step, BoxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Step::Keep)
        }
    }

    #[test]
    fn test_custom_operation_visits_every_node() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new().then(Counting {
            calls: Arc::clone(&calls),
        });
        // document, mapping, both pairs, then the two sequence items
        run(&pipeline, "a: 1\nb:\n  - x\n  - y\n");
        assert_eq!(calls.load(Ordering::SeqCst), 8);
    }
}
