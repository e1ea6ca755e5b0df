//! Generic parse-tree shape exchanged between the reader, the writer and the
//! adapter.
//!
//! A `RawNode` carries scalar text rather than typed values and comment blocks
//! as newline-joined strings, the way a YAML event reader reports them.

use crate::document::Directive;
use crate::node::{NodeKind, NodeStyle};

#[derive(Debug, Clone, PartialEq)]
pub struct RawNode {
    pub kind: NodeKind,
    pub tag: Option<String>,
    /// Scalar text, or the anchor name for aliases.
    pub value: String,
    pub style: NodeStyle,
    pub anchor: Option<String>,
    pub head_comment: String,
    pub line_comment: String,
    pub foot_comment: String,
    pub blank_lines_before: usize,
    pub line: usize,
    pub column: usize,
    pub children: Vec<RawNode>,
}

impl RawNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            tag: None,
            value: String::new(),
            style: NodeStyle::Default,
            anchor: None,
            head_comment: String::new(),
            line_comment: String::new(),
            foot_comment: String::new(),
            blank_lines_before: 0,
            line: 0,
            column: 0,
            children: Vec::new(),
        }
    }

    pub fn scalar(value: impl Into<String>) -> Self {
        let mut node = Self::new(NodeKind::Scalar);
        node.value = value.into();
        node
    }

    pub fn is_flow(&self) -> bool {
        self.style == NodeStyle::Flow
    }
}

/// One document as exchanged with the reader and writer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDocument {
    pub directives: Vec<Directive>,
    /// Document-kind node wrapping the content, or `None` for an empty document.
    pub root: Option<RawNode>,
}

/// Split a comment block into lines. Blank lines inside the block are kept
/// as empty strings.
pub fn split_comment(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n').map(|line| line.trim().to_string()).collect()
}

pub fn join_comment(lines: &[String]) -> String {
    lines.join("\n")
}
