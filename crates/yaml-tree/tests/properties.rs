//! Cross-module behaviour of merge, diff, query and transform.

use yaml_tree::{
    DiffKind, DiffValue, NodeKind, Pipeline, ScalarValue, Tree, diff, merge, parse, query,
};

fn tree(text: &str) -> Tree {
    parse(text).expect("parse failed")
}

#[test]
fn test_merge_key_union() {
    let merged = merge(&tree("a: 1\nb: 2\n"), &tree("b: 3\nc: 4\n"));
    let doc = &merged.documents[0];
    let map = doc.content().unwrap();
    let keys: Vec<String> = doc.pairs(map).map(|(k, _)| doc[k].text()).collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
    let b = doc.get_map_value(map, "b").unwrap();
    assert_eq!(doc[b].value, ScalarValue::Int(3));
}

#[test]
fn test_merge_preserves_head_comment() {
    let merged = merge(&tree("a: 1\n# keep me\nb: 2\n"), &tree("b: 3\n"));
    let doc = &merged.documents[0];
    let map = doc.content().unwrap();
    let (key, value) = doc.pairs(map).nth(1).unwrap();
    assert_eq!(doc[key].head_comment, vec!["# keep me"]);
    assert_eq!(doc[value].value, ScalarValue::Int(3));
}

#[test]
fn test_sequence_merge_is_concatenation() {
    let merged = merge(&tree("[1, 2]\n"), &tree("[3]\n"));
    let doc = &merged.documents[0];
    let seq = doc.content().unwrap();
    let items: Vec<ScalarValue> = doc
        .children(seq)
        .iter()
        .map(|&id| doc[id].value.clone())
        .collect();
    assert_eq!(
        items,
        vec![ScalarValue::Int(1), ScalarValue::Int(2), ScalarValue::Int(3)]
    );
}

#[test]
fn test_diff_self_identity() {
    let text = "# c\na: 1\nlist:\n  - x\n  - {k: v}\nref: &r 1\nuse: *r\n";
    let t = tree(text);
    assert!(diff(&t, &t).is_empty());
}

#[test]
fn test_diff_merge_duality() {
    let base = tree("a: 1\nb: 2\n");
    let overlay = tree("b: 3\nc: 4\n");
    let merged = merge(&base, &overlay);
    let changes = diff(&base, &merged);

    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].kind, DiffKind::Modified);
    assert_eq!(changes[0].path, ".b");
    assert_eq!(changes[0].old_value, Some(DiffValue::Scalar(ScalarValue::Int(2))));
    assert_eq!(changes[0].new_value, Some(DiffValue::Scalar(ScalarValue::Int(3))));
    assert_eq!(changes[1].kind, DiffKind::Added);
    assert_eq!(changes[1].path, ".c");
}

#[test]
fn test_query_wildcard_cardinality() {
    let t = tree("items:\n  - 1\n  - 2\n  - 3\nmeta:\n  a: 1\n  b: 2\n");
    let doc = &t.documents[0];
    let map = doc.content().unwrap();
    assert_eq!(query(doc, map, "items/*").len(), 3);
    // mappings yield keys and values
    assert_eq!(query(doc, map, "meta/*").len(), 4);
    let second = query(doc, map, "items/[1]");
    assert_eq!(doc[second[0]].value, ScalarValue::Int(2));
    // the document node has exactly one child
    assert_eq!(query(doc, doc.root().unwrap(), "*"), vec![map]);
}

#[test]
fn test_pipeline_order_sensitivity() {
    let t = tree("a: 1\nb: 2\n");
    let first = Pipeline::new().remove_key("a").rename_key("b", "a").apply(&t).unwrap();
    let second = Pipeline::new().rename_key("b", "a").remove_key("a").apply(&t).unwrap();
    assert_ne!(first.serialize(), second.serialize());

    let doc = &first.documents[0];
    let map = doc.content().unwrap();
    let a = doc.get_map_value(map, "a").unwrap();
    assert_eq!(doc[a].value, ScalarValue::Int(2));

    let doc = &second.documents[0];
    let map = doc.content().unwrap();
    assert_eq!(doc[map].kind, NodeKind::Mapping);
    assert!(doc.children(map).is_empty());
}

#[test]
fn test_remove_and_rename_do_not_commute() {
    let t = tree("x: 1\nz: 2\n");
    let removed_first = Pipeline::new()
        .remove_key("x")
        .rename_key("x", "y")
        .apply(&t)
        .unwrap();
    let renamed_first = Pipeline::new()
        .rename_key("x", "y")
        .remove_key("x")
        .apply(&t)
        .unwrap();
    assert_eq!(removed_first.serialize(), "z: 2\n");
    assert_eq!(renamed_first.serialize(), "y: 1\nz: 2\n");
}

#[test]
fn test_pipeline_leaves_input_untouched() {
    let t = tree("a: 1\nb:\n  c: 2\n");
    let before = t.serialize();
    let out = Pipeline::new().flatten().sort_keys().apply(&t).unwrap();
    assert_eq!(out.serialize(), "a: 1\nb.c: 2\n");
    assert_eq!(t.serialize(), before);
}
