//! Multi-document container and the text entry points.

use crate::adapter::{document_from_raw, document_to_raw};
use crate::document::Document;
use crate::emitter::EmitConfig;
use crate::error::{Error, Result};
use crate::raw::RawDocument;
use crate::{reader, writer};

/// An ordered stream of documents.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    pub documents: Vec<Document>,
    current: usize,
}

/// Parse YAML text into a [`Tree`].
///
/// # Example
///
/// ```rust
/// let tree = yaml_tree::parse("# settings\nport: 8080\n").unwrap();
/// let doc = &tree.documents[0];
/// let map = doc.content().unwrap();
/// let port = doc.get_map_value(map, "port").unwrap();
/// assert_eq!(doc[port].text(), "8080");
/// assert_eq!(tree.serialize(), "# settings\nport: 8080\n");
/// ```
///
/// # Errors
///
/// Returns [`Error::Parse`] naming the failing document.
pub fn parse(text: &str) -> Result<Tree> {
    Tree::parse(text)
}

/// Parse UTF-8 bytes into a [`Tree`].
pub fn parse_bytes(bytes: &[u8]) -> Result<Tree> {
    let text = std::str::from_utf8(bytes).map_err(|err| Error::Utf8(err.to_string()))?;
    Tree::parse(text)
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Result<Self> {
        let documents = reader::read(text)?
            .iter()
            .map(document_from_raw)
            .collect::<Vec<_>>();
        let current = documents.len().saturating_sub(1);
        Ok(Self { documents, current })
    }

    pub fn from_documents(documents: Vec<Document>) -> Self {
        let current = documents.len().saturating_sub(1);
        Self { documents, current }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Append a document and make it current. Returns its index.
    pub fn add_document(&mut self, document: Document) -> usize {
        self.documents.push(document);
        self.current = self.documents.len() - 1;
        self.current
    }

    /// Move every document of `other` to the end of this tree.
    pub fn append(&mut self, other: Tree) {
        for document in other.documents {
            self.add_document(document);
        }
    }

    /// Document new content is being added to, if any.
    pub fn current(&self) -> Option<&Document> {
        self.documents.get(self.current)
    }

    pub fn current_mut(&mut self) -> Option<&mut Document> {
        self.documents.get_mut(self.current)
    }

    pub fn set_current(&mut self, index: usize) -> bool {
        if index < self.documents.len() {
            self.current = index;
            true
        } else {
            false
        }
    }

    /// Render with the default [`EmitConfig`].
    pub fn serialize(&self) -> String {
        self.serialize_with(&EmitConfig::default())
    }

    pub fn serialize_with(&self, config: &EmitConfig) -> String {
        let raw: Vec<RawDocument> = self.documents.iter().map(document_to_raw).collect();
        writer::write_documents(&raw, config)
    }
}
