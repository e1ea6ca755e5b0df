//! Conversion between document nodes and `serde_json::Value`.

use serde_json::{Map, Number, Value};

use crate::document::Document;
use crate::merge::merge;
use crate::node::{NodeId, NodeKind};
use crate::scalar::ScalarValue;
use crate::tree::Tree;

impl Document {
    /// Build a document whose content mirrors `value`.
    pub fn from_json(value: &Value) -> Self {
        let mut doc = Document::new();
        let root = doc.new_document_node();
        let content = doc.build_json(value);
        doc.set_children(root, vec![content]);
        doc.set_root(Some(root));
        doc
    }

    fn build_json(&mut self, value: &Value) -> NodeId {
        match value {
            Value::Null => self.new_scalar(ScalarValue::Null),
            Value::Bool(b) => self.new_scalar(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => self.new_scalar(i),
                None => self.new_scalar(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => self.new_scalar(s.as_str()),
            Value::Array(items) => {
                let seq = self.new_sequence();
                let children = items.iter().map(|item| self.build_json(item)).collect();
                self.set_children(seq, children);
                seq
            }
            Value::Object(entries) => {
                let map = self.new_mapping();
                let mut children = Vec::with_capacity(entries.len() * 2);
                for (key, item) in entries {
                    children.push(self.new_scalar(key.as_str()));
                    children.push(self.build_json(item));
                }
                self.set_children(map, children);
                map
            }
        }
    }

    /// Convert the subtree at `id` to a generic value.
    ///
    /// Aliases are expanded; unresolved or cyclic aliases become `null`.
    /// Mapping keys use their rendered text.
    pub fn to_json(&self, id: NodeId) -> Value {
        self.json_value(id, &mut Vec::new())
    }

    fn json_value(&self, id: NodeId, expanding: &mut Vec<NodeId>) -> Value {
        let node = &self[id];
        match node.kind {
            NodeKind::Document => match self.children(id).first() {
                Some(&content) => self.json_value(content, expanding),
                None => Value::Null,
            },
            NodeKind::Mapping => {
                expanding.push(id);
                let mut map = Map::new();
                for (key, value) in self.pairs(id) {
                    map.insert(self.display(key).to_string(), self.json_value(value, expanding));
                }
                expanding.pop();
                Value::Object(map)
            }
            NodeKind::Sequence => {
                expanding.push(id);
                let items = self
                    .children(id)
                    .iter()
                    .map(|&c| self.json_value(c, expanding))
                    .collect();
                expanding.pop();
                Value::Array(items)
            }
            // an alias back into a container being expanded is a cycle
            NodeKind::Alias => match self.resolve_alias(id) {
                Some(target) if !expanding.contains(&target) => self.json_value(target, expanding),
                _ => Value::Null,
            },
            NodeKind::Null => Value::Null,
            NodeKind::Scalar => scalar_to_json(&node.value),
        }
    }
}

fn scalar_to_json(value: &ScalarValue) -> Value {
    match value {
        ScalarValue::Null => Value::Null,
        ScalarValue::Bool(b) => Value::Bool(*b),
        ScalarValue::Int(i) => Value::Number((*i).into()),
        ScalarValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        ScalarValue::Str(s) => Value::String(s.clone()),
    }
}

impl Tree {
    /// A single-document tree mirroring `value`.
    pub fn from_json(value: &Value) -> Self {
        Tree::from_documents(vec![Document::from_json(value)])
    }

    /// Content of every document as generic values.
    pub fn to_json(&self) -> Vec<Value> {
        self.documents
            .iter()
            .map(|doc| doc.root().map_or(Value::Null, |root| doc.to_json(root)))
            .collect()
    }
}

/// Merge a generic value onto `base` with the usual merge rules.
pub fn merge_with_value(base: &Tree, overlay: &Value) -> Tree {
    merge(base, &Tree::from_json(overlay))
}
