//! # yaml-tree
//!
//! Format-preserving YAML documents.
//!
//! YAML text is parsed into a [`Tree`] of [`Document`]s whose nodes remember
//! their comments, blank lines, quoting style, tags and anchors. Writing an
//! unchanged tree back reproduces that presentation; edits touch only what
//! they change.
//!
//! On top of the tree the crate provides:
//!
//! - [`merge`]: overlay one tree onto another, keeping base comments
//! - [`diff`]: structural comparison with relative paths
//! - [`query`]: slash-separated path lookup
//! - [`Pipeline`]: chainable node transformations
//! - [`StreamParser`]: document-at-a-time reading of large streams
//!
//! ## Design
//!
//! Each document is an arena: nodes live in a `Vec` and refer to their
//! parent, key and alias target by [`NodeId`]. Parsing is done by the
//! `yaml-rust2` event parser; comment and blank-line placement is recovered
//! from the source text around the event markers.
//!
//! Blank lines are decided in one place on output, according to the
//! [`EmitConfig`] passed to [`Tree::serialize_with`].
//!
//! ## Example
//!
//! ```rust
//! use yaml_tree::{diff, merge, parse, DiffKind};
//!
//! let base = parse("# ports\nhttp: 80 # default\n").unwrap();
//! let overlay = parse("http: 8080\nhttps: 8443\n").unwrap();
//!
//! let merged = merge(&base, &overlay);
//! assert_eq!(
//!     merged.serialize(),
//!     "# ports\nhttp: 8080 # default\nhttps: 8443\n"
//! );
//!
//! let changes = diff(&base, &merged);
//! assert_eq!(changes[0].kind, DiffKind::Modified);
//! assert_eq!(changes[0].path, ".http");
//! ```

mod adapter;
mod convert;
mod diff;
mod document;
mod emitter;
mod error;
mod merge;
mod node;
mod query;
mod raw;
mod reader;
mod scalar;
mod stream;
mod transform;
mod tree;
mod writer;

pub use adapter::{document_from_raw, document_to_raw};
pub use convert::merge_with_value;
pub use diff::{DiffEntry, DiffKind, DiffValue, diff, diff_documents, diff_nodes};
pub use document::{Directive, Document, NodeDisplay};
pub use emitter::{BlankLinePolicy, EmitConfig};
pub use error::{BoxError, Error, NodeError, Result, StreamError, TransformError};
pub use merge::{merge, merge_documents};
pub use node::{Node, NodeId, NodeKind, NodeStyle, Visit};
pub use query::query;
pub use raw::{RawDocument, RawNode};
pub use reader::read;
pub use scalar::ScalarValue;
pub use stream::StreamParser;
pub use transform::{
    AddComment, Flatten, NodeOperation, Pipeline, RemoveKey, RenameKey, SetValue, SortKeys, Step,
};
pub use tree::{Tree, parse, parse_bytes};
pub use writer::{write_document, write_documents};
