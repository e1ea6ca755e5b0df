//! Error types for parsing, tree editing and transforms.

use thiserror::Error;

/// Result type alias for yaml-tree operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading or writing YAML text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The YAML reader rejected a document.
    #[error("YAML parse error in document {document}: {message}")]
    Parse { document: usize, message: String },

    /// Input bytes were not valid UTF-8.
    #[error("input is not valid UTF-8: {0}")]
    Utf8(String),

    /// A structural edit failed.
    #[error(transparent)]
    Node(#[from] NodeError),
}

/// Errors from structural edits on a [`Document`](crate::Document).
///
/// Every operation returning one of these leaves the document unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// Root nodes have no parent to be removed from or replaced in.
    #[error("cannot detach the root node")]
    RootNode,

    /// The node id does not belong to this document.
    #[error("node {0} does not exist")]
    NotFound(usize),

    /// The node has the wrong kind for the operation.
    #[error("expected a {expected} node, found {found}")]
    WrongKind { expected: String, found: String },

    /// The child is already attached somewhere else.
    #[error("node {0} already has a parent")]
    AlreadyAttached(usize),

    /// Attaching the child would make a node its own ancestor.
    #[error("attaching node {child} under node {parent} would create a cycle")]
    Cycle { parent: usize, child: usize },
}

/// Boxed error type returned by custom transform operations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while applying a [`Pipeline`](crate::Pipeline).
#[derive(Error, Debug)]
pub enum TransformError {
    /// A named operation failed; the input tree is untouched.
    #[error("transform '{name}' failed: {source}")]
    Operation {
        name: String,
        #[source]
        source: BoxError,
    },
}

/// Errors raised by the [`StreamParser`](crate::StreamParser).
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("failed to read input at line {line}: {source}")]
    Io {
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing document at line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: Error,
    },

    #[error("callback error: {0}")]
    Callback(#[source] BoxError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Parse {
            document: 1,
            message: "bad indentation".into(),
        };
        assert_eq!(
            err.to_string(),
            "YAML parse error in document 1: bad indentation"
        );

        let err: Error = NodeError::RootNode.into();
        assert_eq!(err.to_string(), "cannot detach the root node");
    }

    #[test]
    fn test_transform_error_keeps_source() {
        let err = TransformError::Operation {
            name: "flatten".into(),
            source: "boom".into(),
        };
        assert_eq!(err.to_string(), "transform 'flatten' failed: boom");
        assert!(std::error::Error::source(&err).is_some());
    }
}
