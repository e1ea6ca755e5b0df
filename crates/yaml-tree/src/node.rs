//! The node record stored in a [`Document`](crate::Document) arena.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::scalar::ScalarValue;

/// Index of a node inside its owning document.
///
/// Ids are only meaningful for the document that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Document,
    Mapping,
    Sequence,
    Scalar,
    Alias,
    Null,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Mapping => "mapping",
            NodeKind::Sequence => "sequence",
            NodeKind::Scalar => "scalar",
            NodeKind::Alias => "alias",
            NodeKind::Null => "null",
        }
    }

    pub fn is_collection(self) -> bool {
        matches!(self, NodeKind::Mapping | NodeKind::Sequence)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation hint recorded from the source or set by callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStyle {
    #[default]
    Default,
    Literal,
    Folded,
    SingleQuoted,
    DoubleQuoted,
    Flow,
    Tagged,
}

impl NodeStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeStyle::Default => "default",
            NodeStyle::Literal => "literal",
            NodeStyle::Folded => "folded",
            NodeStyle::SingleQuoted => "single_quoted",
            NodeStyle::DoubleQuoted => "double_quoted",
            NodeStyle::Flow => "flow",
            NodeStyle::Tagged => "tagged",
        }
    }
}

impl fmt::Display for NodeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Traversal signal returned by [`Document::walk`](crate::Document::walk) visitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    SkipChildren,
    Stop,
}

/// A single YAML node.
///
/// Presentation data (comments, style, spacing, source spelling) lives next to
/// the value so that an unchanged node renders exactly as it was read. The
/// structural links are private; edit them through `Document` so the parent,
/// key and child lists stay consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub value: ScalarValue,
    /// Explicit tag as written, such as `!!str` or `!custom`.
    pub tag: Option<String>,
    pub style: NodeStyle,
    pub anchor: Option<String>,
    /// Comment lines above the node, `#` included. Empty strings are blank lines.
    pub head_comment: Vec<String>,
    pub line_comment: Vec<String>,
    pub foot_comment: Vec<String>,
    pub blank_lines_before: usize,
    /// 1-based source line, 0 for nodes built in memory.
    pub line: usize,
    pub column: usize,
    /// Source spelling of a scalar (`0x1F`, `~`, `2.0`).
    pub raw: Option<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) key: Option<NodeId>,
    pub(crate) alias: Option<NodeId>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            value: ScalarValue::Null,
            tag: None,
            style: NodeStyle::Default,
            anchor: None,
            head_comment: Vec::new(),
            line_comment: Vec::new(),
            foot_comment: Vec::new(),
            blank_lines_before: 0,
            line: 0,
            column: 0,
            raw: None,
            metadata: BTreeMap::new(),
            children: Vec::new(),
            parent: None,
            key: None,
            alias: None,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Key node of the mapping pair this node is the value of.
    pub fn key(&self) -> Option<NodeId> {
        self.key
    }

    /// Anchor target of an alias node, once resolved.
    pub fn alias(&self) -> Option<NodeId> {
        self.alias
    }

    /// Name an alias node refers to.
    pub fn alias_name(&self) -> Option<&str> {
        match self.kind {
            NodeKind::Alias => self.value.as_str(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        match self.kind {
            NodeKind::Null => true,
            NodeKind::Scalar => self.value.is_null(),
            _ => false,
        }
    }

    /// Scalar text as it should be written: the source spelling while it
    /// still means the same value, otherwise the canonical rendering.
    pub fn text(&self) -> String {
        match self.kind {
            NodeKind::Scalar => {
                if let Some(raw) = &self.raw {
                    // keys spelled `null` decode as strings
                    let as_key = raw == "null" && self.value.as_str() == Some("null");
                    if as_key
                        || crate::scalar::decode(raw, self.tag.as_deref(), self.style, false)
                            == self.value
                    {
                        return raw.clone();
                    }
                }
                crate::scalar::render(&self.value)
            }
            NodeKind::Alias => self.alias_name().unwrap_or_default().to_string(),
            NodeKind::Null => "null".to_string(),
            _ => String::new(),
        }
    }

    pub fn has_comments(&self) -> bool {
        !self.head_comment.is_empty()
            || !self.line_comment.is_empty()
            || !self.foot_comment.is_empty()
    }
}
