//! Blank-line policy and the line sink the writer renders through.
//!
//! The writer reports what it wants to emit: recorded blank lines, comment
//! lines and content lines. [`Emitter`] is the only place that decides how
//! many blank lines actually reach the output, based on [`EmitConfig`].

use serde::{Deserialize, Serialize};

/// How recorded blank lines are treated on output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlankLinePolicy {
    /// Emit the blank lines that were read.
    #[default]
    KeepAsIs,
    /// Every section boundary gets exactly `normalized_count` blank lines.
    Normalize,
    /// No blank lines at all.
    Remove,
}

/// Output options for [`Tree::serialize_with`](crate::Tree::serialize_with).
///
/// All fields have defaults, so a partial configuration deserializes:
///
/// ```rust
/// use yaml_tree::{BlankLinePolicy, EmitConfig};
///
/// let config: EmitConfig = serde_json::from_str(r#"{"policy": "normalize"}"#).unwrap();
/// assert_eq!(config.policy, BlankLinePolicy::Normalize);
/// assert_eq!(config.normalized_count, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitConfig {
    pub policy: BlankLinePolicy,
    pub normalized_count: usize,
    /// Under `KeepAsIs`, separate marker comments from content above them.
    pub preserve_before_comments: bool,
    /// Keep at least one blank line after a foot comment block.
    pub preserve_after_comments: bool,
    /// Comment prefixes that open a new section, such as `# @schema`.
    pub comment_block_markers: Vec<String>,
    /// Spaces per nesting level.
    pub indent: usize,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            policy: BlankLinePolicy::KeepAsIs,
            normalized_count: 1,
            preserve_before_comments: true,
            preserve_after_comments: false,
            comment_block_markers: vec!["# @schema".to_string()],
            indent: 2,
        }
    }
}

impl EmitConfig {
    pub fn normalized(count: usize) -> Self {
        Self {
            policy: BlankLinePolicy::Normalize,
            normalized_count: count,
            ..Self::default()
        }
    }

    pub fn no_blank_lines() -> Self {
        Self {
            policy: BlankLinePolicy::Remove,
            preserve_before_comments: false,
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, policy: BlankLinePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent.max(1);
        self
    }

    pub fn with_preserve_after_comments(mut self, preserve: bool) -> Self {
        self.preserve_after_comments = preserve;
        self
    }

    fn is_marker(&self, comment: &str) -> bool {
        self.comment_block_markers
            .iter()
            .any(|marker| comment.starts_with(marker.as_str()))
    }
}

/// Where a comment line came from relative to its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommentKind {
    Head,
    Foot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Last {
    Start,
    Content,
    Comment(CommentKind),
}

/// Line sink applying the blank-line policy.
pub(crate) struct Emitter<'c> {
    config: &'c EmitConfig,
    out: String,
    pending: usize,
    last: Last,
}

impl<'c> Emitter<'c> {
    pub fn new(config: &'c EmitConfig) -> Self {
        Self {
            config,
            out: String::new(),
            pending: 0,
            last: Last::Start,
        }
    }

    /// Record blank lines read from the source.
    pub fn blank_lines(&mut self, count: usize) {
        self.pending += count;
    }

    /// Emit a comment line; an empty string is a blank line inside the block.
    pub fn comment(&mut self, kind: CommentKind, indent: usize, text: &str) {
        if text.is_empty() {
            self.pending += 1;
            return;
        }
        self.flush(Some((kind, text)));
        self.push_line(indent, text);
        self.last = Last::Comment(kind);
    }

    pub fn content(&mut self, line: &str) {
        self.flush(None);
        self.out.push_str(line);
        self.out.push('\n');
        self.last = Last::Content;
    }

    /// Emit a line that belongs to a scalar body; never subject to the policy.
    pub fn verbatim(&mut self, line: &str) {
        self.out.push_str(line);
        self.out.push('\n');
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn push_line(&mut self, indent: usize, text: &str) {
        self.out.extend(std::iter::repeat_n(' ', indent));
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn flush(&mut self, comment: Option<(CommentKind, &str)>) {
        let recorded = std::mem::take(&mut self.pending);
        let after_content = self.last == Last::Content;
        let mut count = match self.config.policy {
            BlankLinePolicy::KeepAsIs => {
                let marker = comment.is_some_and(|(_, text)| self.config.is_marker(text));
                if recorded == 0 && after_content && marker && self.config.preserve_before_comments
                {
                    1
                } else {
                    recorded
                }
            }
            BlankLinePolicy::Normalize => {
                let boundary = recorded > 0
                    || (after_content && matches!(comment, Some((CommentKind::Head, _))));
                if boundary && self.last != Last::Start {
                    self.config.normalized_count
                } else {
                    0
                }
            }
            BlankLinePolicy::Remove => 0,
        };
        if self.config.preserve_after_comments
            && self.config.policy != BlankLinePolicy::Remove
            && self.last == Last::Comment(CommentKind::Foot)
            && comment.is_none()
        {
            count = count.max(1);
        }
        for _ in 0..count {
            self.out.push('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(config: &EmitConfig, steps: &[(&str, usize)]) -> String {
        let mut emitter = Emitter::new(config);
        for (line, blanks) in steps {
            emitter.blank_lines(*blanks);
            if let Some(comment) = line.strip_prefix("head:") {
                emitter.comment(CommentKind::Head, 0, comment);
            } else if let Some(comment) = line.strip_prefix("foot:") {
                emitter.comment(CommentKind::Foot, 2, comment);
            } else {
                emitter.content(line);
            }
        }
        emitter.finish()
    }

    const STEPS: &[(&str, usize)] = &[
        ("a: 1", 0),
        ("b: 2", 3),
        ("head:# section", 0),
        ("c: 3", 0),
    ];

    #[test]
    fn test_keep_as_is() {
        let out = render(&EmitConfig::default(), STEPS);
        assert_eq!(out, "a: 1\n\n\n\nb: 2\n# section\nc: 3\n");
    }

    #[test]
    fn test_keep_as_is_separates_marker_comments() {
        let steps = &[("a: 1", 0), ("head:# @schema type: string", 0), ("b: x", 0)];
        let out = render(&EmitConfig::default(), steps);
        assert_eq!(out, "a: 1\n\n# @schema type: string\nb: x\n");

        let config = EmitConfig {
            preserve_before_comments: false,
            ..EmitConfig::default()
        };
        let out = render(&config, steps);
        assert_eq!(out, "a: 1\n# @schema type: string\nb: x\n");
    }

    #[test]
    fn test_normalize() {
        let out = render(&EmitConfig::normalized(1), STEPS);
        assert_eq!(out, "a: 1\n\nb: 2\n\n# section\nc: 3\n");

        let out = render(&EmitConfig::normalized(2), &[("a: 1", 4), ("b: 2", 1)]);
        assert_eq!(out, "a: 1\n\n\nb: 2\n");
    }

    #[test]
    fn test_remove() {
        let out = render(&EmitConfig::no_blank_lines(), STEPS);
        assert_eq!(out, "a: 1\nb: 2\n# section\nc: 3\n");
    }

    #[test]
    fn test_preserve_after_foot_comments() {
        let config = EmitConfig::default().with_preserve_after_comments(true);
        let out = render(&config, &[("a: 1", 0), ("foot:# done", 0), ("b: 2", 0)]);
        assert_eq!(out, "a: 1\n  # done\n\nb: 2\n");
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: EmitConfig =
            serde_json::from_str(r#"{"policy": "remove", "indent": 4}"#).unwrap();
        assert_eq!(config.policy, BlankLinePolicy::Remove);
        assert_eq!(config.indent, 4);
        assert!(config.preserve_before_comments);
        assert_eq!(config.comment_block_markers, vec!["# @schema"]);
    }
}
