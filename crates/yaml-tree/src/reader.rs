//! Reads YAML text into [`RawDocument`]s.
//!
//! Structure, scalar values and styles come from the `yaml-rust2` event
//! parser. The parser drops comments, blank lines and anchor names, so those
//! are recovered from the source text using the event markers: every line is
//! classified, lines owned by multi-line scalars and flow collections are set
//! aside, and the remaining comment and blank runs are attached to the
//! nearest entry (a mapping key or a block sequence item).

use once_cell::sync::Lazy;
use regex::Regex;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser, Tag};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use crate::document::Directive;
use crate::error::{Error, Result};
use crate::node::{NodeKind, NodeStyle};
use crate::raw::{RawDocument, RawNode};

static ANCHOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[\s\[{,])&([^\s,\[\]{}]+)").unwrap());
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[\s\[{,])(!(?:<[^>]*>|[^\s,\[\]{}]*))").unwrap());

const CORE_TAG_PREFIX: &str = "tag:yaml.org,2002:";

/// Parse every document in `text`.
///
/// Empty input yields a single empty document. A region holding only
/// comments yields a document whose root carries them as head comments.
pub fn read(text: &str) -> Result<Vec<RawDocument>> {
    let regions = split_regions(text);
    if regions.is_empty() {
        return Ok(vec![RawDocument::default()]);
    }
    let mut documents = Vec::with_capacity(regions.len());
    for (index, region) in regions.into_iter().enumerate() {
        documents.push(read_region(region, index)?);
    }
    tracing::debug!(documents = documents.len(), "Read YAML stream");
    Ok(documents)
}

/// The lines of one document, without separators or directives.
pub(crate) struct Region<'a> {
    /// 0-based line of the first region line in the whole input.
    pub first_line: usize,
    pub lines: Vec<&'a str>,
    pub directives: Vec<Directive>,
    /// Comment on the `---` line opening the region.
    pub marker_comment: Option<&'a str>,
}

/// Split a `---` or `...` marker line into the marker and whatever follows
/// it on the same line, such as a comment or the start of the content.
pub(crate) fn split_separator(line: &str) -> Option<&str> {
    let rest = line
        .strip_prefix("---")
        .or_else(|| line.strip_prefix("..."))?;
    if rest.is_empty() || rest.starts_with([' ', '\t']) {
        Some(rest.trim())
    } else {
        None
    }
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

struct Splitter<'a> {
    regions: Vec<Region<'a>>,
    lines: Vec<&'a str>,
    directives: Vec<Directive>,
    marker_comment: Option<&'a str>,
    first_line: usize,
}

impl Splitter<'_> {
    fn flush(&mut self) {
        if self.marker_comment.is_some() || self.lines.iter().any(|l| !is_blank(l)) {
            self.regions.push(Region {
                first_line: self.first_line,
                lines: std::mem::take(&mut self.lines),
                directives: std::mem::take(&mut self.directives),
                marker_comment: self.marker_comment.take(),
            });
        }
        self.lines.clear();
    }
}

/// Split input on `---` and `...` lines. Blank regions are skipped and `%`
/// lines ahead of a region's content become that region's directives.
/// Text after a marker, as in `--- |` or `--- # note`, opens the next region.
pub(crate) fn split_regions(text: &str) -> Vec<Region<'_>> {
    let mut split = Splitter {
        regions: Vec::new(),
        lines: Vec::new(),
        directives: Vec::new(),
        marker_comment: None,
        first_line: 0,
    };

    for (number, line) in text.lines().enumerate() {
        if let Some(rest) = split_separator(line) {
            split.flush();
            split.first_line = number + 1;
            if line.starts_with("---") && rest.starts_with('#') {
                split.marker_comment = Some(rest);
            } else if !rest.is_empty() {
                split.lines.push(rest);
                split.first_line = number;
            }
            continue;
        }
        if line.starts_with('%') && split.lines.iter().all(|l| is_blank(l)) {
            if let Some(directive) = Directive::parse(line) {
                split.directives.push(directive);
                split.lines.clear();
                split.first_line = number + 1;
                continue;
            }
        }
        if split.lines.is_empty() {
            split.first_line = number;
        }
        split.lines.push(line);
    }
    split.flush();
    split.regions
}

fn read_region(region: Region<'_>, index: usize) -> Result<RawDocument> {
    let marker_comment = region.marker_comment.unwrap_or_default().to_string();
    let comment_only = region
        .lines
        .iter()
        .all(|l| is_blank(l) || l.trim_start().starts_with('#'));
    if comment_only {
        let mut root = RawNode::new(NodeKind::Document);
        root.head_comment = comment_block(&region.lines);
        root.line_comment = marker_comment;
        return Ok(RawDocument {
            directives: region.directives,
            root: Some(root),
        });
    }

    let mut text = region.lines.join("\n");
    text.push('\n');
    let source = Source::new(&text);
    let mut builder = EventBuilder::new(&source);
    let mut parser = Parser::new_from_str(&text);
    parser
        .load(&mut builder, false)
        .map_err(|err| Error::Parse {
            document: index,
            message: err.to_string(),
        })?;

    let mut nodes = builder.nodes;
    let root = match builder.root {
        Some(root) => root,
        None => {
            let mut doc = RawNode::new(NodeKind::Document);
            doc.line_comment = marker_comment;
            return Ok(RawDocument {
                directives: region.directives,
                root: Some(doc),
            });
        }
    };

    let doc_foot = Annotator::new(&source, &mut nodes, root).run();

    let mut doc = RawNode::new(NodeKind::Document);
    doc.line_comment = marker_comment;
    doc.foot_comment = doc_foot.join("\n");
    doc.children.push(to_raw(&nodes, root, region.first_line));
    Ok(RawDocument {
        directives: region.directives,
        root: Some(doc),
    })
}

fn comment_block(lines: &[&str]) -> String {
    let start = lines.iter().position(|l| !is_blank(l)).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !is_blank(l)).map_or(start, |e| e + 1);
    lines[start..end]
        .iter()
        .map(|l| l.trim())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Region text with char-index lookups matching the parser's markers.
struct Source<'a> {
    text: &'a str,
    lines: Vec<&'a str>,
    line_starts: Vec<usize>,
    byte_of_char: Vec<usize>,
}

impl<'a> Source<'a> {
    fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        let mut byte_of_char = Vec::with_capacity(text.len() + 1);
        for (char_index, (byte, ch)) in text.char_indices().enumerate() {
            byte_of_char.push(byte);
            if ch == '\n' {
                line_starts.push(char_index + 1);
            }
        }
        byte_of_char.push(text.len());
        Self {
            text,
            lines: text.split('\n').collect(),
            line_starts,
            byte_of_char,
        }
    }

    fn char_count(&self) -> usize {
        self.byte_of_char.len() - 1
    }

    /// 0-based line and column of a char index.
    fn position(&self, index: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&index) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };
        (line, index - self.line_starts[line])
    }

    fn line_start(&self, line: usize) -> usize {
        self.line_starts[line.min(self.line_starts.len() - 1)]
    }

    fn slice(&self, from: usize, to: usize) -> &'a str {
        let from = self.byte_of_char[from.min(self.char_count())];
        let to = self.byte_of_char[to.min(self.char_count())];
        &self.text[from..to.max(from)]
    }

    fn rest(&self, index: usize) -> &'a str {
        &self.text[self.byte_of_char[index.min(self.char_count())]..]
    }
}

#[derive(Debug)]
struct ParsedNode {
    kind: NodeKind,
    style: NodeStyle,
    tag: Option<String>,
    anchor: Option<String>,
    value: String,
    start: usize,
    line: usize,
    col: usize,
    end_line: usize,
    children: Vec<usize>,
    in_flow: bool,
    /// Implicit empty scalar; its marker points at the following token.
    empty: bool,
    head: Vec<String>,
    line_comment: Vec<String>,
    foot: Vec<String>,
    blank_before: usize,
}

struct EventBuilder<'s> {
    source: &'s Source<'s>,
    nodes: Vec<ParsedNode>,
    stack: Vec<usize>,
    root: Option<usize>,
    last_index: usize,
    flow_depth: usize,
}

impl<'s> EventBuilder<'s> {
    fn new(source: &'s Source<'s>) -> Self {
        Self {
            source,
            nodes: Vec::new(),
            stack: Vec::new(),
            root: None,
            last_index: 0,
            flow_depth: 0,
        }
    }

    /// Text between the previous event and `index`, comments removed. Node
    /// properties (anchor, tag) always sit in this span.
    fn properties(&self, index: usize) -> String {
        let (line, _) = self.source.position(index);
        let from = self.last_index.min(self.source.line_start(line));
        self.source
            .slice(from, index)
            .split('\n')
            .map(|l| match comment_start(l) {
                Some(pos) => &l[..pos],
                None => l,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn open(&mut self, kind: NodeKind, index: usize, anchor_id: usize, tag: Option<&Tag>) -> usize {
        let props = if anchor_id > 0 || tag.is_some() {
            self.properties(index)
        } else {
            String::new()
        };
        let anchor = if anchor_id > 0 {
            ANCHOR_RE
                .captures_iter(&props)
                .last()
                .map(|caps| caps[1].to_string())
        } else {
            None
        };
        let tag = tag.map(|tag| {
            TAG_RE
                .captures_iter(&props)
                .last()
                .map(|caps| caps[1].to_string())
                .unwrap_or_else(|| tag_text(tag))
        });
        let (line, col) = self.source.position(index);
        self.nodes.push(ParsedNode {
            kind,
            style: NodeStyle::Default,
            tag,
            anchor,
            value: String::new(),
            start: index,
            line,
            col,
            end_line: line,
            children: Vec::new(),
            in_flow: self.flow_depth > 0,
            empty: false,
            head: Vec::new(),
            line_comment: Vec::new(),
            foot: Vec::new(),
            blank_before: 0,
        });
        self.nodes.len() - 1
    }

    fn attach(&mut self, id: usize) {
        match self.stack.last() {
            Some(&parent) => self.nodes[parent].children.push(id),
            None => {
                if self.root.is_none() {
                    self.root = Some(id);
                }
            }
        }
    }

    fn open_collection(
        &mut self,
        kind: NodeKind,
        index: usize,
        anchor_id: usize,
        tag: Option<&Tag>,
    ) {
        let id = self.open(kind, index, anchor_id, tag);
        if matches!(self.source.rest(index).chars().next(), Some('[' | '{')) {
            self.nodes[id].style = NodeStyle::Flow;
            self.flow_depth += 1;
        }
        self.attach(id);
        self.stack.push(id);
    }

    fn alias_name(&self, index: usize) -> String {
        self.source
            .rest(index)
            .trim_start_matches('*')
            .chars()
            .take_while(|c| !c.is_whitespace() && !",[]{}".contains(*c))
            .collect()
    }
}

fn tag_text(tag: &Tag) -> String {
    if tag.handle == CORE_TAG_PREFIX {
        format!("!!{}", tag.suffix)
    } else if tag.handle.starts_with('!') {
        format!("{}{}", tag.handle, tag.suffix)
    } else {
        format!("!<{}{}>", tag.handle, tag.suffix)
    }
}

fn scalar_style(style: TScalarStyle, tagged: bool) -> NodeStyle {
    match style {
        TScalarStyle::SingleQuoted => NodeStyle::SingleQuoted,
        TScalarStyle::DoubleQuoted => NodeStyle::DoubleQuoted,
        TScalarStyle::Literal => NodeStyle::Literal,
        TScalarStyle::Folded => NodeStyle::Folded,
        _ if tagged => NodeStyle::Tagged,
        _ => NodeStyle::Default,
    }
}

impl MarkedEventReceiver for EventBuilder<'_> {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        let index = marker.index().min(self.source.char_count());
        match ev {
            Event::Scalar(value, style, anchor_id, tag) => {
                let id = self.open(NodeKind::Scalar, index, anchor_id, tag.as_ref());
                let node = &mut self.nodes[id];
                node.style = scalar_style(style, node.tag.is_some());
                node.empty = value.is_empty()
                    && node.style == NodeStyle::Default
                    && node.anchor.is_none();
                node.value = value;
                self.attach(id);
            }
            Event::SequenceStart(anchor_id, tag) => {
                self.open_collection(NodeKind::Sequence, index, anchor_id, tag.as_ref());
            }
            Event::MappingStart(anchor_id, tag) => {
                self.open_collection(NodeKind::Mapping, index, anchor_id, tag.as_ref());
            }
            Event::SequenceEnd | Event::MappingEnd => {
                if let Some(id) = self.stack.pop() {
                    if self.nodes[id].style == NodeStyle::Flow {
                        self.flow_depth = self.flow_depth.saturating_sub(1);
                        self.nodes[id].end_line = self.source.position(index).0;
                    }
                }
            }
            Event::Alias(_) => {
                let name = self.alias_name(index);
                let id = self.open(NodeKind::Alias, index, 0, None);
                self.nodes[id].value = name;
                self.attach(id);
            }
            _ => return,
        }
        self.last_index = self.last_index.max(index);
    }
}

/// Find the comment at the end of a line, skipping `#` inside quoted spans.
pub(crate) fn trailing_comment(line: &str) -> Option<&str> {
    comment_start(line).map(|pos| line[pos..].trim_end())
}

/// Byte offset of the `#` starting a line's trailing comment.
fn comment_start(line: &str) -> Option<usize> {
    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;
    let mut i = 0;
    while i < chars.len() {
        let (pos, ch) = chars[i];
        match quote {
            Some('"') => {
                if ch == '\\' {
                    i += 1;
                } else if ch == '"' {
                    quote = None;
                }
            }
            Some(_) => {
                if ch == '\'' {
                    if chars.get(i + 1).map(|&(_, c)| c) == Some('\'') {
                        i += 1;
                    } else {
                        quote = None;
                    }
                }
            }
            None => {
                let at_token_start = prev.is_none_or(|p| p.is_whitespace() || "[{,".contains(p));
                if (ch == '"' || ch == '\'') && at_token_start {
                    quote = Some(ch);
                } else if ch == '#' && prev.is_none_or(char::is_whitespace) {
                    return Some(pos);
                }
            }
        }
        prev = Some(ch);
        i += 1;
    }
    None
}

fn indent_of(line: &str) -> usize {
    line.chars().take_while(|&c| c == ' ').count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineClass {
    Blank,
    Comment,
    Content,
    Covered,
}

/// A mapping key or block sequence item: the unit comments attach to.
#[derive(Debug, Clone, Copy)]
struct Entry {
    line: usize,
    col: usize,
    node: usize,
    /// Value of a mapping pair.
    value: Option<usize>,
}

struct Annotator<'a, 's> {
    source: &'a Source<'s>,
    nodes: &'a mut Vec<ParsedNode>,
    root: usize,
    covered: Vec<bool>,
    entries: Vec<Entry>,
    /// Item nodes keyed by the line of their dash.
    dash_items: Vec<(usize, usize)>,
}

impl<'a, 's> Annotator<'a, 's> {
    fn new(source: &'a Source<'s>, nodes: &'a mut Vec<ParsedNode>, root: usize) -> Self {
        let covered = vec![false; source.lines.len()];
        Self {
            source,
            nodes,
            root,
            covered,
            entries: Vec::new(),
            dash_items: Vec::new(),
        }
    }

    /// Attach comments and blank-line counts; returns the document foot.
    fn run(mut self) -> Vec<String> {
        self.scan(self.root, -1);
        self.entries.sort_by_key(|e| (e.line, e.col));

        let source = self.source;
        let lines = &source.lines;
        let classes: Vec<LineClass> = lines
            .iter()
            .enumerate()
            .map(|(n, line)| {
                if self.covered[n] {
                    LineClass::Covered
                } else if is_blank(line) {
                    LineClass::Blank
                } else if line.trim_start().starts_with('#') {
                    LineClass::Comment
                } else {
                    LineClass::Content
                }
            })
            .collect();

        let mut starts: Vec<Vec<usize>> = vec![Vec::new(); lines.len()];
        for (id, node) in self.nodes.iter().enumerate() {
            if !node.empty && node.line < starts.len() {
                starts[node.line].push(id);
            }
        }

        self.attach_line_comments(&classes, &starts);

        let mut doc_foot = Vec::new();
        let mut run: Vec<usize> = Vec::new();
        for (n, class) in classes.iter().enumerate() {
            match class {
                LineClass::Blank | LineClass::Comment => run.push(n),
                LineClass::Covered => run.clear(),
                LineClass::Content => {
                    let owner = self.line_owner(n, &starts);
                    if let Some(owner) = owner {
                        self.attach_run(&run, Some((n, owner)), &mut doc_foot);
                    }
                    run.clear();
                }
            }
        }
        self.attach_run(&run, None, &mut doc_foot);
        doc_foot
    }

    fn scan(&mut self, id: usize, owner_col: isize) {
        let (kind, style, in_flow, col) = {
            let n = &self.nodes[id];
            (n.kind, n.style, n.in_flow, n.col)
        };
        match kind {
            NodeKind::Scalar => match style {
                NodeStyle::Literal | NodeStyle::Folded => self.cover_block_scalar(id, owner_col),
                NodeStyle::SingleQuoted | NodeStyle::DoubleQuoted => self.cover_quoted(id),
                _ => {}
            },
            NodeKind::Mapping | NodeKind::Sequence if style == NodeStyle::Flow => {
                if !in_flow {
                    let node = &self.nodes[id];
                    for line in node.line + 1..=node.end_line {
                        self.mark_covered(line);
                    }
                }
                let children = self.nodes[id].children.clone();
                for child in children {
                    self.scan(child, col as isize);
                }
            }
            NodeKind::Mapping => {
                let children = self.nodes[id].children.clone();
                for (i, &child) in children.iter().enumerate() {
                    if i % 2 == 0 && !in_flow {
                        let line = self.nodes[child].line;
                        self.entries.push(Entry {
                            line,
                            col,
                            node: child,
                            value: children.get(i + 1).copied(),
                        });
                    }
                    self.scan(child, col as isize);
                }
            }
            NodeKind::Sequence => {
                let children = self.nodes[id].children.clone();
                let mut previous_dash: Option<usize> = None;
                for &child in &children {
                    if !in_flow {
                        let dash = self.dash_line(id, child, previous_dash);
                        previous_dash = Some(dash);
                        self.entries.push(Entry {
                            line: dash,
                            col,
                            node: child,
                            value: None,
                        });
                        self.dash_items.push((dash, child));
                    }
                    self.scan(child, col as isize);
                }
            }
            _ => {}
        }
    }

    fn mark_covered(&mut self, line: usize) {
        if let Some(slot) = self.covered.get_mut(line) {
            *slot = true;
        }
    }

    /// Line holding the `-` of a block sequence item.
    fn dash_line(&self, seq: usize, item: usize, previous: Option<usize>) -> usize {
        let seq_node = &self.nodes[seq];
        let Some(previous) = previous else {
            return seq_node.line;
        };
        let limit = self.nodes[item].line.max(previous + 1);
        for line in previous + 1..=limit {
            if self.covered.get(line).copied().unwrap_or(false) {
                continue;
            }
            let text = self.source.lines.get(line).copied().unwrap_or("");
            if indent_of(text) == seq_node.col {
                let rest = &text[seq_node.col..];
                if rest == "-" || rest.starts_with("- ") {
                    return line;
                }
            }
        }
        self.nodes[item].line
    }

    fn cover_block_scalar(&mut self, id: usize, owner_col: isize) {
        let header = self.nodes[id].line;
        let start = self.nodes[id].start;
        let indicators: String = self
            .source
            .rest(start)
            .chars()
            .skip(1)
            .take_while(|c| matches!(c, '+' | '-' | '0'..='9'))
            .collect();
        let explicit = indicators
            .chars()
            .find(char::is_ascii_digit)
            .and_then(|d| d.to_digit(10))
            .map(|d| owner_col.max(0) as usize + d as usize);

        let source = self.source;
        let lines = &source.lines;
        let mut body_indent = explicit;
        let mut last_content = header;
        let mut line = header + 1;
        while line < lines.len() {
            let text = lines[line];
            if is_blank(text) {
                line += 1;
                continue;
            }
            let indent = indent_of(text);
            let required = *body_indent.get_or_insert(indent);
            if (indent as isize) <= owner_col || indent < required {
                break;
            }
            last_content = line;
            line += 1;
        }
        // blank lines kept by `+` chomping are value newlines, not spacing
        let value = &self.nodes[id].value;
        let kept_blanks = (value.len() - value.trim_end_matches('\n').len()).saturating_sub(1);
        let end = (last_content + kept_blanks).min(line.saturating_sub(1).max(last_content));
        for covered in header + 1..=end {
            self.mark_covered(covered);
        }
    }

    fn cover_quoted(&mut self, id: usize) {
        let start = self.nodes[id].start;
        let mut chars = self.source.rest(start).chars();
        let Some(quote) = chars.next() else {
            return;
        };
        let mut offset = 1;
        let mut escaped = false;
        let mut pending_quote = false;
        let mut end = None;
        for ch in chars {
            if pending_quote {
                if ch == '\'' {
                    pending_quote = false;
                    offset += 1;
                    continue;
                }
                end = Some(offset - 1);
                break;
            }
            if quote == '"' {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == '"' {
                    end = Some(offset);
                    break;
                }
            } else if ch == '\'' {
                pending_quote = true;
            }
            offset += 1;
        }
        if pending_quote && end.is_none() {
            end = Some(offset - 1);
        }
        if let Some(end) = end {
            let (end_line, _) = self.source.position(start + end);
            let line = self.nodes[id].line;
            self.nodes[id].end_line = end_line;
            for covered in line + 1..=end_line {
                self.mark_covered(covered);
            }
        }
    }

    /// Node that comments and blank lines above line `n` belong to.
    fn line_owner(&self, n: usize, starts: &[Vec<usize>]) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.line == n)
            .map(|e| e.node)
            .or_else(|| starts[n].first().copied())
    }

    fn attach_line_comments(&mut self, classes: &[LineClass], starts: &[Vec<usize>]) {
        for (n, class) in classes.iter().enumerate() {
            if *class != LineClass::Content {
                continue;
            }
            let source = self.source;
            let Some(comment) = trailing_comment(source.lines[n]) else {
                continue;
            };
            let target = starts[n]
                .iter()
                .rev()
                .copied()
                .find(|&id| !self.nodes[id].in_flow)
                .or_else(|| {
                    self.dash_items
                        .iter()
                        .rev()
                        .find(|(line, _)| *line == n)
                        .map(|&(_, item)| item)
                })
                .or_else(|| {
                    self.nodes
                        .iter()
                        .position(|node| !node.empty && node.line > n)
                });
            if let Some(target) = target {
                self.nodes[target].line_comment.push(comment.to_string());
            }
        }
    }

    /// Attach a run of blank and comment lines sitting above line `next.0`
    /// (or at the end of the document when `next` is `None`).
    fn attach_run(
        &mut self,
        run: &[usize],
        next: Option<(usize, usize)>,
        doc_foot: &mut Vec<String>,
    ) {
        if run.is_empty() {
            return;
        }
        let source = self.source;
        let lines = &source.lines;
        let text_of = |n: usize| -> String {
            if is_blank(lines[n]) {
                String::new()
            } else {
                lines[n].trim().to_string()
            }
        };
        let col_next: isize = match next {
            Some((n, _)) => indent_of(lines[n]) as isize,
            None => -1,
        };

        // Comments indented deeper than the next line close the entry above.
        let mut foot_end = 0;
        for (k, &n) in run.iter().enumerate() {
            if is_blank(lines[n]) {
                continue;
            }
            if indent_of(lines[n]) as isize > col_next {
                foot_end = k + 1;
            } else {
                break;
            }
        }
        if foot_end > 0 {
            let first_comment = run[..foot_end]
                .iter()
                .find(|&&n| !is_blank(lines[n]))
                .map_or(0, |&n| indent_of(lines[n]));
            let start = run[0];
            let under_null = |e: &Entry| {
                first_comment > e.col && e.value.is_some_and(|v| self.nodes[v].empty)
            };
            let mut above = self.entries.iter().rev().filter(|e| e.line < start);
            let nearest = above.clone().next().copied();
            let entry = above
                .find(|e| e.col <= first_comment && e.col as isize > col_next)
                .copied()
                .or_else(|| nearest.filter(|e| under_null(e)));
            // a comment indented under a key without a value stays with the value
            let target = entry.map(|e| match e.value {
                Some(value) if under_null(&e) => value,
                _ => e.node,
            });
            let foot: Vec<String> = run[..foot_end].iter().map(|&n| text_of(n)).collect();
            match (target, next) {
                (Some(target), _) => self.nodes[target].foot.extend(foot),
                (None, None) => doc_foot.extend(foot),
                (None, Some(_)) => foot_end = 0,
            }
        }

        let Some((_, owner)) = next else {
            return;
        };
        let head = &run[foot_end..];
        let blanks = head.iter().take_while(|&&n| is_blank(lines[n])).count();
        let comments: Vec<String> = head[blanks..].iter().map(|&n| text_of(n)).collect();
        let node = &mut self.nodes[owner];
        node.blank_before += blanks;
        node.head.extend(comments);
    }
}

fn to_raw(nodes: &[ParsedNode], id: usize, first_line: usize) -> RawNode {
    let node = &nodes[id];
    let mut raw = RawNode::new(node.kind);
    raw.tag = node.tag.clone();
    raw.anchor = node.anchor.clone();
    raw.value = node.value.clone();
    raw.style = node.style;
    raw.head_comment = node.head.join("\n");
    raw.line_comment = node.line_comment.join("\n");
    raw.foot_comment = node.foot.join("\n");
    raw.blank_lines_before = node.blank_before;
    raw.line = first_line + node.line + 1;
    raw.column = node.col + 1;
    raw.children = node
        .children
        .iter()
        .map(|&child| to_raw(nodes, child, first_line))
        .collect();
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(text: &str) -> RawNode {
        let docs = read(text).unwrap();
        assert_eq!(docs.len(), 1);
        let root = docs[0].root.clone().unwrap();
        root.children[0].clone()
    }

    #[test]
    fn test_split_regions() {
        let regions = split_regions("%YAML 1.2\n---\na: 1\n---\n\n---\nb: 2\n...\n");
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].directives, vec![Directive::new("YAML", "1.2")]);
        assert_eq!(regions[0].lines, vec!["a: 1"]);
        assert_eq!(regions[0].first_line, 2);
        assert_eq!(regions[1].lines, vec!["b: 2"]);
        assert!(regions[1].directives.is_empty());
    }

    #[test]
    fn test_separator_lines_carrying_text() {
        let regions = split_regions("a: 1\n--- # second\nb: 2\n--- |\n  text\n...  # end\n");
        assert_eq!(regions.len(), 4);
        assert_eq!(regions[1].marker_comment, Some("# second"));
        assert_eq!(regions[1].lines, vec!["b: 2"]);
        assert_eq!(regions[2].lines, vec!["|", "  text"]);
        assert_eq!(regions[2].first_line, 3);
        assert_eq!(regions[3].lines, vec!["# end"]);
        assert!(split_separator("---x").is_none());
        assert!(split_separator("--- ").is_some());
    }

    #[test]
    fn test_documents_after_commented_separator() {
        let docs = read("a: 1\n--- # second\nb: 2\n--- |\n  text\n").unwrap();
        assert_eq!(docs.len(), 3);
        let second = docs[1].root.as_ref().unwrap();
        assert_eq!(second.line_comment, "# second");
        assert_eq!(second.children[0].children[0].value, "b");
        let third = &docs[2].root.as_ref().unwrap().children[0];
        assert_eq!(third.value, "text\n");
        assert_eq!(third.style, NodeStyle::Literal);
        assert_eq!(third.line, 4);
    }

    #[test]
    fn test_keep_chomp_blank_lines_belong_to_value() {
        let map = single("a: |+\n  keep\n\nb: 1\n");
        assert_eq!(map.children[1].value, "keep\n\n");
        assert_eq!(map.children[2].blank_lines_before, 0);

        let map = single("a: |\n  clip\n\nb: 1\n");
        assert_eq!(map.children[1].value, "clip\n");
        assert_eq!(map.children[2].blank_lines_before, 1);
    }

    #[test]
    fn test_comment_under_null_value() {
        let map = single("a:\n  # inside a\nb: 1\n");
        assert_eq!(map.children[1].foot_comment, "# inside a");
        assert!(map.children[0].foot_comment.is_empty());
        assert!(map.children[2].head_comment.is_empty());
    }

    #[test]
    fn test_empty_input_is_one_empty_document() {
        let docs = read("").unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].root.is_none());
    }

    #[test]
    fn test_comment_only_document() {
        let docs = read("\n# just a note\n\n# another\n\n").unwrap();
        let root = docs[0].root.as_ref().unwrap();
        assert_eq!(root.kind, NodeKind::Document);
        assert!(root.children.is_empty());
        assert_eq!(root.head_comment, "# just a note\n\n# another");
    }

    #[test]
    fn test_styles_tags_and_anchors() {
        let map = single("a: 'x'\nb: \"y\"\nc: !!str 12\nd: &base plain\ne: *base\nf: [1, 2]\n");
        let value = |i: usize| &map.children[i * 2 + 1];
        assert_eq!(value(0).style, NodeStyle::SingleQuoted);
        assert_eq!(value(1).style, NodeStyle::DoubleQuoted);
        assert_eq!(value(2).tag.as_deref(), Some("!!str"));
        assert_eq!(value(2).style, NodeStyle::Tagged);
        assert_eq!(value(3).anchor.as_deref(), Some("base"));
        assert_eq!(value(4).kind, NodeKind::Alias);
        assert_eq!(value(4).value, "base");
        assert_eq!(value(5).style, NodeStyle::Flow);
        assert_eq!(value(5).children.len(), 2);
    }

    #[test]
    fn test_head_line_and_blank_lines() {
        let map = single("# top\na: 1 # one\n\n\n# about b\nb: 2\n");
        let a = &map.children[0];
        assert_eq!(a.head_comment, "# top");
        assert_eq!(map.children[1].line_comment, "# one");
        let b = &map.children[2];
        assert_eq!(b.blank_lines_before, 2);
        assert_eq!(b.head_comment, "# about b");
        assert_eq!(b.line, 6);
    }

    #[test]
    fn test_foot_comments_attach_to_deeper_entry() {
        let map = single("a:\n  b: 1\n  # end of a\n\nc: 2\n");
        let inner = &map.children[1];
        assert_eq!(inner.children[0].foot_comment, "# end of a");
        assert_eq!(map.children[2].blank_lines_before, 1);
    }

    #[test]
    fn test_trailing_comment_becomes_document_foot() {
        let docs = read("a: 1\n\n# the end\n").unwrap();
        let root = docs[0].root.as_ref().unwrap();
        let map = &root.children[0];
        assert_eq!(map.children[0].foot_comment, "\n# the end");
        assert!(root.foot_comment.is_empty());

        let docs = read("plain\n# after\n").unwrap();
        assert_eq!(docs[0].root.as_ref().unwrap().foot_comment, "# after");
    }

    #[test]
    fn test_sequence_item_comments() {
        let seq = single("- a\n# before b\n- b # inline\n-\n  c: 1\n");
        assert_eq!(seq.children[1].head_comment, "# before b");
        assert_eq!(seq.children[1].line_comment, "# inline");
        assert_eq!(seq.children[2].kind, NodeKind::Mapping);
    }

    #[test]
    fn test_block_scalar_body_is_not_comment() {
        let map = single("text: |\n  line one\n  # not a comment\nnext: 1\n");
        assert_eq!(map.children[1].value, "line one\n# not a comment\n");
        assert_eq!(map.children[1].style, NodeStyle::Literal);
        assert!(map.children[2].head_comment.is_empty());
    }

    #[test]
    fn test_parse_error_reports_document() {
        let err = read("a: 1\n---\nb: [unclosed\n").unwrap_err();
        assert!(matches!(err, Error::Parse { document: 1, .. }));
    }

    #[test]
    fn test_trailing_comment_skips_quotes() {
        assert_eq!(trailing_comment("a: \"x # y\" # z"), Some("# z"));
        assert_eq!(trailing_comment("a: b#c"), None);
        assert_eq!(trailing_comment("a: it's # yes"), Some("# yes"));
        assert_eq!(trailing_comment("a: 'q''s # no'"), None);
    }
}
