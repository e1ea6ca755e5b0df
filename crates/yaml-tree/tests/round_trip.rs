//! Round-trip tests: unchanged trees must serialize back to their source,
//! and serializing is idempotent for generated documents.

use proptest::prelude::*;
use yaml_tree::{EmitConfig, parse};

fn round_trip(text: &str) -> String {
    parse(text).expect("parse failed").serialize()
}

#[test]
fn test_realistic_config_round_trips() {
    let text = "\
# Service configuration
name: api # the public name

# Network settings
server:
  host: 0.0.0.0
  port: 8080
  tls:
    enabled: true
    cert: \"/etc/ssl/cert.pem\"

defaults: &defaults
  retries: 3
  timeout: 2.5
production:
  settings: *defaults
  hosts:
    - a.example.com
    - b.example.com # backup

description: |
  First line.
  Second line.
";
    assert_eq!(round_trip(text), text);
}

#[test]
fn test_styles_and_tags_round_trip() {
    let text = "\
plain: text
single: 'quoted'
double: \"quoted\"
tagged: !!str 123
hex: 0x1F
tilde: ~
flow: [1, 2, 3]
map: {a: 1}
empty_list: []
empty_map: {}
";
    assert_eq!(round_trip(text), text);
}

#[test]
fn test_multi_document_with_directives() {
    let text = "%YAML 1.2\n---\na: 1\n---\n# second\nb: 2\n";
    assert_eq!(round_trip(text), text);
}

#[test]
fn test_blank_line_policies_snapshot() {
    let tree = parse("a: 1\n\n\n# @schema type: int\nb: 2\nc: 3\n").unwrap();

    insta::assert_snapshot!(tree.serialize_with(&EmitConfig::normalized(1)), @r"
a: 1

# @schema type: int
b: 2
c: 3
");

    insta::assert_snapshot!(tree.serialize_with(&EmitConfig::no_blank_lines()), @r"
a: 1
# @schema type: int
b: 2
c: 3
");
}

#[test]
fn test_edited_value_keeps_surroundings_snapshot() {
    let mut tree = parse("# top\nport: 80 # http\n\nhost: a\n").unwrap();
    let doc = &mut tree.documents[0];
    let map = doc.content().unwrap();
    let port = doc.get_map_value(map, "port").unwrap();
    doc[port].value = 8080.into();

    insta::assert_snapshot!(tree.serialize(), @r"
# top
port: 8080 # http

host: a
");
}

// ============================================================================
// Generated documents
// ============================================================================

#[derive(Debug, Clone)]
enum Value {
    Scalar(String),
    Block(Block),
    Sequence(Vec<String>),
    Mapping(Vec<Entry>),
}

#[derive(Debug, Clone, Copy)]
enum Chomp {
    Clip,
    Strip,
    /// `+` with this many trailing blank lines.
    Keep(usize),
}

#[derive(Debug, Clone)]
struct Block {
    folded: bool,
    lines: Vec<String>,
    chomp: Chomp,
}

#[derive(Debug, Clone)]
struct Entry {
    blank_lines: usize,
    head_comment: Option<String>,
    value: Value,
    line_comment: Option<String>,
}

/// Documents of a stream with the comment on their `---` line.
type Stream = Vec<(Option<String>, Vec<Entry>)>;

fn gen_scalar() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,8}",
        (0i64..100_000).prop_map(|i| i.to_string()),
        (0u32..1000).prop_map(|i| format!("{}.5", i)),
        Just("true".to_string()),
        Just("null".to_string()),
        Just("~".to_string()),
        "[a-z]{1,5} [a-z]{1,5}".prop_map(|s| format!("'{}'", s)),
        "[a-z]{1,5}".prop_map(|s| format!("\"{}: x\"", s)),
    ]
}

fn gen_comment() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[a-z]{1,10}".prop_map(|s| format!("# {}", s)))
}

fn gen_chomp() -> impl Strategy<Value = Chomp> {
    prop_oneof![
        Just(Chomp::Clip),
        Just(Chomp::Strip),
        (1usize..3).prop_map(Chomp::Keep),
    ]
}

// folded bodies stay on one line: a folded line break reads back as a space
fn gen_block() -> impl Strategy<Value = Block> {
    prop_oneof![
        (prop::collection::vec("[a-z]{1,8}( [a-z]{1,5})?", 1..4), gen_chomp()).prop_map(
            |(lines, chomp)| Block {
                folded: false,
                lines,
                chomp,
            }
        ),
        ("[a-z]{1,8}( [a-z]{1,5})?", gen_chomp()).prop_map(|(line, chomp)| Block {
            folded: true,
            lines: vec![line],
            chomp,
        }),
    ]
}

fn gen_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        3 => gen_scalar().prop_map(Value::Scalar),
        1 => gen_block().prop_map(Value::Block),
        1 => prop::collection::vec(gen_scalar(), 1..4).prop_map(Value::Sequence),
    ];
    leaf.prop_recursive(2, 16, 4, |inner| {
        prop::collection::vec(gen_entry(inner), 1..4).prop_map(Value::Mapping)
    })
}

fn gen_entry(value: impl Strategy<Value = Value>) -> impl Strategy<Value = Entry> {
    (0usize..3, gen_comment(), value, gen_comment()).prop_map(
        |(blank_lines, head_comment, value, line_comment)| Entry {
            blank_lines,
            head_comment,
            value,
            line_comment,
        },
    )
}

fn gen_document() -> impl Strategy<Value = Vec<Entry>> {
    prop::collection::vec(gen_entry(gen_value()), 1..6)
}

fn gen_stream() -> impl Strategy<Value = Stream> {
    prop::collection::vec((gen_comment(), gen_document()), 1..4)
}

fn render(entries: &[Entry], indent: usize, out: &mut String) {
    let pad = " ".repeat(indent);
    for (i, entry) in entries.iter().enumerate() {
        for _ in 0..entry.blank_lines {
            out.push('\n');
        }
        if let Some(comment) = &entry.head_comment {
            out.push_str(&format!("{}{}\n", pad, comment));
        }
        let key = format!("k{}_{}", indent, i);
        let line = |out: &mut String, text: &str| {
            out.push_str(text);
            if let Some(comment) = &entry.line_comment {
                out.push_str(&format!(" {}", comment));
            }
            out.push('\n');
        };
        match &entry.value {
            Value::Scalar(s) => line(out, &format!("{}{}: {}", pad, key, s)),
            Value::Block(block) => {
                let indicator = if block.folded { '>' } else { '|' };
                let chomp = match block.chomp {
                    Chomp::Clip => "",
                    Chomp::Strip => "-",
                    Chomp::Keep(_) => "+",
                };
                line(out, &format!("{}{}: {}{}", pad, key, indicator, chomp));
                for body in &block.lines {
                    out.push_str(&format!("{}  {}\n", pad, body));
                }
                if let Chomp::Keep(blanks) = block.chomp {
                    for _ in 0..blanks {
                        out.push('\n');
                    }
                }
            }
            Value::Sequence(items) => {
                line(out, &format!("{}{}:", pad, key));
                for item in items {
                    out.push_str(&format!("{}  - {}\n", pad, item));
                }
            }
            Value::Mapping(children) => {
                line(out, &format!("{}{}:", pad, key));
                render(children, indent + 2, out);
            }
        }
    }
}

fn render_stream(stream: &Stream) -> String {
    let mut out = String::new();
    for (i, (marker, entries)) in stream.iter().enumerate() {
        if i > 0 {
            match marker {
                Some(comment) => out.push_str(&format!("--- {}\n", comment)),
                None => out.push_str("---\n"),
            }
        }
        render(entries, 0, &mut out);
    }
    out
}

#[test]
fn test_keep_chomp_before_next_key() {
    let text = "a: |+\n  keep\n\nb: >-\n  folded\n\nc: 1\n";
    assert_eq!(round_trip(text), text);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Serializing a parsed document and parsing the output again is stable.
    #[test]
    fn test_serialize_is_idempotent(entries in gen_document()) {
        let mut text = String::new();
        render(&entries, 0, &mut text);

        let first = round_trip(&text);
        let second = round_trip(&first);
        prop_assert_eq!(&first, &second, "source:\n{}", text);
    }

    /// Without leading blank lines, generated documents survive unchanged.
    #[test]
    fn test_generated_documents_round_trip(entries in gen_document()) {
        let mut entries = entries;
        entries[0].blank_lines = 0;
        let mut text = String::new();
        render(&entries, 0, &mut text);

        prop_assert_eq!(round_trip(&text), text);
    }

    /// Multi-document streams keep every document and separator comment.
    #[test]
    fn test_generated_streams_round_trip(stream in gen_stream()) {
        let mut stream = stream;
        for (_, entries) in &mut stream {
            entries[0].blank_lines = 0;
        }
        let text = render_stream(&stream);

        let tree = parse(&text).unwrap();
        prop_assert_eq!(tree.len(), stream.len());
        prop_assert_eq!(tree.serialize(), text);
    }
}
