//! Renders [`RawDocument`]s as block-style YAML text.

use crate::emitter::{CommentKind, EmitConfig, Emitter};
use crate::node::{NodeKind, NodeStyle};
use crate::raw::{RawDocument, RawNode, split_comment};

/// Render a document stream. Documents after the first are introduced with
/// `---`; a document with directives gets its directive lines and `---`.
/// A line comment on the document node is written after its `---`, which
/// then appears even for the first document.
pub fn write_documents(documents: &[RawDocument], config: &EmitConfig) -> String {
    let mut out = String::new();
    for (index, document) in documents.iter().enumerate() {
        let marker_comment = document
            .root
            .as_ref()
            .filter(|root| root.kind == NodeKind::Document)
            .map_or(String::new(), |root| root.line_comment.replace('\n', " "));
        for directive in &document.directives {
            out.push_str(&directive.to_string());
            out.push('\n');
        }
        if !marker_comment.is_empty() {
            out.push_str(&format!("--- {}\n", marker_comment));
        } else if index > 0 || !document.directives.is_empty() {
            out.push_str("---\n");
        }
        out.push_str(&write_document(document, config));
    }
    out
}

pub fn write_document(document: &RawDocument, config: &EmitConfig) -> String {
    let Some(root) = &document.root else {
        return String::new();
    };
    let mut writer = Writer {
        emitter: Emitter::new(config),
        step: config.indent.max(1),
    };
    if root.kind == NodeKind::Document {
        writer.comments(CommentKind::Head, &root.head_comment, 0);
        if let Some(content) = root.children.first() {
            writer.write_root(content);
        }
        writer.comments(CommentKind::Foot, &root.foot_comment, 0);
    } else {
        writer.write_root(root);
    }
    writer.emitter.finish()
}

struct Writer<'c> {
    emitter: Emitter<'c>,
    step: usize,
}

fn pad(indent: usize) -> String {
    " ".repeat(indent)
}

fn join_words(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

fn properties(node: &RawNode) -> String {
    let anchor = node.anchor.as_ref().map(|a| format!("&{}", a));
    join_words(&[anchor.as_deref().unwrap_or(""), node.tag.as_deref().unwrap_or("")])
}

fn is_block_collection(node: &RawNode) -> bool {
    node.kind.is_collection() && !node.is_flow() && !node.children.is_empty()
}

impl Writer<'_> {
    fn comments(&mut self, kind: CommentKind, block: &str, indent: usize) {
        for line in split_comment(block) {
            self.emitter.comment(kind, indent, &line);
        }
    }

    /// Blank lines and head comments above an entry.
    fn entry_head(&mut self, node: &RawNode, indent: usize) {
        self.emitter.blank_lines(node.blank_lines_before);
        self.comments(CommentKind::Head, &node.head_comment, indent);
    }

    fn write_root(&mut self, node: &RawNode) {
        self.entry_head(node, 0);
        self.write_value("", node, 0, "");
        self.comments(CommentKind::Foot, &node.foot_comment, 0);
    }

    /// Write `node` after `prefix` on the current line. Nested block content
    /// goes at `indent`.
    fn write_value(&mut self, prefix: &str, node: &RawNode, indent: usize, key_comment: &str) {
        let props = properties(node);
        let comment = join_words(&[
            &key_comment.replace('\n', " "),
            &node.line_comment.replace('\n', " "),
        ]);
        let suffix = if comment.is_empty() {
            String::new()
        } else {
            format!(" {}", comment)
        };

        if is_block_collection(node) {
            let header = join_words(&[prefix, &props]);
            if !header.is_empty() {
                self.emitter.content(&format!("{}{}", header, suffix));
            } else if !comment.is_empty() {
                self.emitter.comment(CommentKind::Head, indent, &comment);
            }
            match node.kind {
                NodeKind::Mapping => self.write_mapping(node, indent, None),
                _ => self.write_sequence(node, indent),
            }
            return;
        }

        if node.kind == NodeKind::Scalar
            && matches!(node.style, NodeStyle::Literal | NodeStyle::Folded)
            && self.block_scalar(prefix, &props, node, indent, &suffix)
        {
            return;
        }

        let mut text = self.inline_text(node, false);
        if prefix.is_empty() && text.is_empty() {
            text = "null".to_string();
        }
        let line = if prefix.is_empty() {
            text
        } else if text.is_empty() {
            prefix.to_string()
        } else {
            format!("{} {}", prefix, text)
        };
        self.emitter.content(&format!("{}{}", line, suffix));
    }

    /// `compact` carries the `- ` prefix when the mapping starts on a
    /// sequence item's line.
    fn write_mapping(&mut self, map: &RawNode, indent: usize, compact: Option<&str>) {
        let null = RawNode::scalar("");
        for (i, pair) in map.children.chunks(2).enumerate() {
            let key = &pair[0];
            let value = pair.get(1).unwrap_or(&null);
            let lead = match compact {
                Some(lead) if i == 0 => lead.to_string(),
                _ => {
                    self.entry_head(key, indent);
                    self.comments(CommentKind::Head, &value.head_comment, indent);
                    pad(indent)
                }
            };
            let prefix = format!("{}{}:", lead, self.key_text(key));
            self.write_value(&prefix, value, indent + self.step, &key.line_comment);
            let value_indent = if is_block_collection(value) {
                indent
            } else {
                indent + self.step
            };
            self.comments(CommentKind::Foot, &value.foot_comment, value_indent);
            self.comments(CommentKind::Foot, &key.foot_comment, indent);
        }
    }

    fn write_sequence(&mut self, seq: &RawNode, indent: usize) {
        for item in &seq.children {
            self.entry_head(item, indent);
            let compact = item.kind == NodeKind::Mapping
                && is_block_collection(item)
                && item.anchor.is_none()
                && item.tag.is_none()
                && item.line_comment.is_empty();
            if compact {
                let first_key = &item.children[0];
                self.entry_head(first_key, indent);
                if let Some(first_value) = item.children.get(1) {
                    self.comments(CommentKind::Head, &first_value.head_comment, indent);
                }
                let lead = format!("{}- ", pad(indent));
                self.write_mapping(item, indent + 2, Some(&lead));
            } else {
                let prefix = format!("{}-", pad(indent));
                self.write_value(&prefix, item, indent + 2, "");
            }
            self.comments(CommentKind::Foot, &item.foot_comment, indent);
        }
    }

    fn key_text(&self, key: &RawNode) -> String {
        match key.kind {
            NodeKind::Alias => format!("*{} ", key.value),
            NodeKind::Mapping | NodeKind::Sequence => self.flow_text(key),
            _ => {
                let text = join_words(&[&properties(key), &scalar_text(key, false)]);
                if text.is_empty() {
                    "null".to_string()
                } else {
                    text
                }
            }
        }
    }

    fn inline_text(&self, node: &RawNode, flow: bool) -> String {
        match node.kind {
            NodeKind::Mapping | NodeKind::Sequence => self.flow_text(node),
            NodeKind::Alias => format!("*{}", node.value),
            _ => {
                let text = scalar_text(node, flow);
                let text = if flow && text.is_empty() {
                    "null".to_string()
                } else {
                    text
                };
                join_words(&[&properties(node), &text])
            }
        }
    }

    fn flow_text(&self, node: &RawNode) -> String {
        let body = match node.kind {
            NodeKind::Mapping => {
                let pairs: Vec<String> = node
                    .children
                    .chunks(2)
                    .map(|pair| {
                        let key = &pair[0];
                        let mut key_text = self.inline_text(key, true);
                        if key.kind == NodeKind::Alias {
                            key_text.push(' ');
                        }
                        match pair.get(1) {
                            Some(value) => {
                                format!("{}: {}", key_text, self.inline_text(value, true))
                            }
                            None => format!("{}: null", key_text),
                        }
                    })
                    .collect();
                format!("{{{}}}", pairs.join(", "))
            }
            NodeKind::Sequence => {
                let items: Vec<String> = node
                    .children
                    .iter()
                    .map(|item| self.inline_text(item, true))
                    .collect();
                format!("[{}]", items.join(", "))
            }
            _ => return self.inline_text(node, true),
        };
        join_words(&[&properties(node), &body])
    }

    /// Write a literal or folded scalar. Returns `false` when the value
    /// cannot be written as a block, leaving the caller to quote it.
    fn block_scalar(
        &mut self,
        prefix: &str,
        props: &str,
        node: &RawNode,
        indent: usize,
        suffix: &str,
    ) -> bool {
        let value = node.value.as_str();
        let body = value.trim_end_matches('\n');
        if body.is_empty() || body.contains('\r') {
            return false;
        }
        let trailing = value.len() - body.len();
        let lines: Vec<&str> = body.split('\n').collect();
        let folded = node.style == NodeStyle::Folded;
        let leading_space = |line: &&str| line.starts_with([' ', '\t']);
        if folded && lines.iter().any(leading_space) {
            return false;
        }
        let needs_indicator = lines.first().is_some_and(leading_space);
        if needs_indicator && !prefix.ends_with(':') {
            return false;
        }

        let chomp = match trailing {
            0 => "-",
            1 => "",
            _ => "+",
        };
        let indicator = format!(
            "{}{}{}",
            if folded { ">" } else { "|" },
            if needs_indicator {
                self.step.to_string()
            } else {
                String::new()
            },
            chomp
        );
        let header = join_words(&[prefix, props, &indicator]);
        self.emitter.content(&format!("{}{}", header, suffix));

        let body_pad = pad(if indent == 0 { self.step } else { indent });
        for (i, line) in lines.iter().enumerate() {
            if line.is_empty() {
                self.emitter.verbatim("");
                continue;
            }
            // folding turns a single line break into a space
            if folded && i > 0 {
                self.emitter.verbatim("");
            }
            self.emitter.verbatim(&format!("{}{}", body_pad, line));
        }
        for _ in 1..trailing {
            self.emitter.verbatim("");
        }
        true
    }
}

/// Scalar text in the node's style, falling back to double quotes when the
/// requested style cannot represent it.
fn scalar_text(node: &RawNode, flow: bool) -> String {
    let value = node.value.as_str();
    match node.style {
        NodeStyle::DoubleQuoted | NodeStyle::Literal | NodeStyle::Folded => double_quoted(value),
        NodeStyle::SingleQuoted => {
            if value.chars().any(|c| c.is_control()) {
                double_quoted(value)
            } else {
                format!("'{}'", value.replace('\'', "''"))
            }
        }
        _ => {
            if value.is_empty() || is_plain_safe(value, flow) {
                value.to_string()
            } else {
                double_quoted(value)
            }
        }
    }
}

/// Whether `text` can be written as a plain scalar and read back unchanged.
pub(crate) fn is_plain_safe(text: &str, flow: bool) -> bool {
    let Some(first) = text.chars().next() else {
        return false;
    };
    if "!&*|>'\"%@`#,[]{}".contains(first) {
        return false;
    }
    if "-?:".contains(first) {
        match text.chars().nth(1) {
            None => return false,
            Some(c) if c.is_whitespace() => return false,
            _ => {}
        }
    }
    if text.starts_with("---") || text.starts_with("...") {
        return false;
    }
    if text != text.trim() || text.chars().any(|c| c.is_control()) {
        return false;
    }
    if text.contains(": ") || text.contains(" #") || text.ends_with(':') {
        return false;
    }
    if flow && text.contains([',', '[', ']', '{', '}']) {
        return false;
    }
    true
}

pub(crate) fn double_quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => out.push_str(&format!("\\x{:02X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
