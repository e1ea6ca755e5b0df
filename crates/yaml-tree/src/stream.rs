//! Document-at-a-time reading of multi-document input.

use std::io::BufRead;

use crate::error::{BoxError, StreamError};
use crate::reader::split_separator;
use crate::tree::Tree;

/// Reads a YAML stream line by line and hands each document to a callback
/// as soon as its terminating separator is seen.
///
/// ```rust
/// use yaml_tree::StreamParser;
///
/// let input = "a: 1\n---\nb: 2\n";
/// let mut keys = Vec::new();
/// let count = StreamParser::new(input.as_bytes())
///     .parse(|tree| {
///         let doc = &tree.documents[0];
///         let map = doc.content().unwrap();
///         keys.push(doc[doc.children(map)[0]].text());
///         Ok(())
///     })
///     .unwrap();
/// assert_eq!(count, 2);
/// assert_eq!(keys, vec!["a", "b"]);
/// ```
pub struct StreamParser<R> {
    reader: R,
}

struct Pending {
    text: String,
    /// 1-based line the buffered document starts on.
    start: usize,
    has_content: bool,
}

impl Pending {
    fn new(start: usize) -> Self {
        Self {
            text: String::new(),
            start,
            has_content: false,
        }
    }
}

impl<R: BufRead> StreamParser<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Parse the whole stream, calling `callback` once per document.
    ///
    /// Returns the number of documents delivered. An error from the
    /// callback stops the stream immediately.
    ///
    /// # Errors
    ///
    /// Read failures and parse failures carry the line they occurred at.
    pub fn parse<F>(self, mut callback: F) -> Result<usize, StreamError>
    where
        F: FnMut(Tree) -> Result<(), BoxError>,
    {
        let mut delivered = 0;
        let mut pending = Pending::new(1);

        for (index, line) in self.reader.lines().enumerate() {
            let number = index + 1;
            let line = line.map_err(|source| StreamError::Io {
                line: number,
                source,
            })?;
            if let Some(rest) = split_separator(&line) {
                // Directive-only buffers belong to the document that follows.
                if pending.has_content {
                    Self::deliver(&pending, &mut callback)?;
                    delivered += 1;
                    pending = Pending::new(number + 1);
                }
                if !rest.is_empty() {
                    if pending.text.is_empty() {
                        pending.start = number;
                    }
                    // a `---` line is kept whole so its comment stays on the marker
                    let kept = if line.starts_with("---") { line.as_str() } else { rest };
                    pending.text.push_str(kept);
                    pending.text.push('\n');
                    pending.has_content = true;
                }
                continue;
            }
            let trimmed = line.trim();
            if !trimmed.is_empty() && !trimmed.starts_with('%') {
                pending.has_content = true;
            }
            if pending.text.is_empty() && trimmed.is_empty() {
                pending.start = number + 1;
            } else {
                pending.text.push_str(&line);
                pending.text.push('\n');
            }
        }

        if pending.has_content {
            Self::deliver(&pending, &mut callback)?;
            delivered += 1;
        }
        tracing::debug!(documents = delivered, "Finished YAML stream");
        Ok(delivered)
    }

    fn deliver<F>(pending: &Pending, callback: &mut F) -> Result<(), StreamError>
    where
        F: FnMut(Tree) -> Result<(), BoxError>,
    {
        let tree = Tree::parse(&pending.text).map_err(|source| StreamError::Parse {
            line: pending.start,
            source,
        })?;
        tracing::debug!(line = pending.start, "Parsed streamed document");
        callback(tree).map_err(StreamError::Callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Read};

    fn collect(input: &str) -> Result<Vec<String>, StreamError> {
        let mut out = Vec::new();
        StreamParser::new(input.as_bytes()).parse(|tree| {
            out.push(tree.serialize());
            Ok(())
        })?;
        Ok(out)
    }

    #[test]
    fn test_documents_are_delivered_in_order() {
        let docs = collect("a: 1\n---\nb: 2\n...\n---\nc: 3\n").unwrap();
        assert_eq!(docs, vec!["a: 1\n", "b: 2\n", "c: 3\n"]);
    }

    #[test]
    fn test_separator_lines_with_content() {
        let docs = collect("a: 1\n--- # two\nb: 2\n--- |\n  text\n").unwrap();
        assert_eq!(docs, vec!["a: 1\n", "--- # two\nb: 2\n", "|\n  text\n"]);
    }

    #[test]
    fn test_directives_attach_to_following_document() {
        let docs = collect("%YAML 1.2\n---\na: 1\n").unwrap();
        assert_eq!(docs, vec!["%YAML 1.2\n---\na: 1\n"]);
    }

    #[test]
    fn test_empty_stream() {
        assert!(collect("").unwrap().is_empty());
        assert!(collect("---\n\n---\n").unwrap().is_empty());
    }

    #[test]
    fn test_comments_survive_streaming() {
        let docs = collect("# first\na: 1 # one\n---\n# second\nb: 2\n").unwrap();
        assert_eq!(docs, vec!["# first\na: 1 # one\n", "# second\nb: 2\n"]);
    }

    #[test]
    fn test_callback_error_stops_stream() {
        let mut seen = 0;
        let result = StreamParser::new("a: 1\n---\nb: 2\n".as_bytes()).parse(|_| {
            seen += 1;
            Err("stop".into())
        });
        assert!(matches!(result, Err(StreamError::Callback(_))));
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_parse_error_reports_document_start() {
        let result = collect("a: 1\n---\n\nb: [unclosed\n");
        match result {
            Err(StreamError::Parse { line, .. }) => assert_eq!(line, 4),
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    struct Failing;

    impl Read for Failing {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("disk gone"))
        }
    }

    #[test]
    fn test_read_error_reports_line() {
        let result = StreamParser::new(io::BufReader::new(Failing)).parse(|_| Ok(()));
        match result {
            Err(StreamError::Io { line, .. }) => assert_eq!(line, 1),
            other => panic!("expected an io error, got {:?}", other),
        }
    }
}
