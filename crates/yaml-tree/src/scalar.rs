//! Typed scalar values and the rules that map scalar text to them.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::node::NodeStyle;

static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-+]?[0-9]+$").unwrap());
static HEX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]+$").unwrap());
static OCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0o[0-7]+$").unwrap());
static FLOAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?$").unwrap()
});
static INF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([-+]?)\.(inf|Inf|INF)$").unwrap());
static NAN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\.(nan|NaN|NAN)$").unwrap());

/// The typed value carried by a scalar node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ScalarValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// Name of the variant, as used in diff descriptions.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarValue::Null => "null",
            ScalarValue::Bool(_) => "bool",
            ScalarValue::Int(_) => "int",
            ScalarValue::Float(_) => "float",
            ScalarValue::Str(_) => "string",
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => f.write_str("null"),
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::Int(i) => write!(f, "{}", i),
            ScalarValue::Float(v) => f.write_str(&render_float(*v)),
            ScalarValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::Str(s.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::Str(s)
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Bool(b)
    }
}

impl From<i64> for ScalarValue {
    fn from(i: i64) -> Self {
        ScalarValue::Int(i)
    }
}

impl From<i32> for ScalarValue {
    fn from(i: i32) -> Self {
        ScalarValue::Int(i64::from(i))
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        ScalarValue::Float(v)
    }
}

impl From<()> for ScalarValue {
    fn from(_: ()) -> Self {
        ScalarValue::Null
    }
}

fn render_float(v: f64) -> String {
    if v.is_nan() {
        return ".nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { ".inf" } else { "-.inf" }.to_string();
    }
    let s = v.to_string();
    if s.contains(['.', 'e', 'E']) {
        s
    } else {
        format!("{}.0", s)
    }
}

fn parse_int(text: &str) -> Option<i64> {
    if INT_RE.is_match(text) {
        return text.parse().ok();
    }
    if HEX_RE.is_match(text) {
        return i64::from_str_radix(&text[2..], 16).ok();
    }
    if OCT_RE.is_match(text) {
        return i64::from_str_radix(&text[2..], 8).ok();
    }
    None
}

fn parse_float(text: &str) -> Option<f64> {
    if let Some(caps) = INF_RE.captures(text) {
        return Some(if &caps[1] == "-" {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }
    if NAN_RE.is_match(text) {
        return Some(f64::NAN);
    }
    if FLOAT_RE.is_match(text) {
        return text.parse().ok();
    }
    None
}

/// Resolve an untagged plain scalar.
pub fn decode_plain(text: &str) -> ScalarValue {
    match text {
        "true" => return ScalarValue::Bool(true),
        "false" => return ScalarValue::Bool(false),
        "null" | "~" | "" => return ScalarValue::Null,
        _ => {}
    }
    if let Some(i) = parse_int(text) {
        return ScalarValue::Int(i);
    }
    if let Some(f) = parse_float(text) {
        return ScalarValue::Float(f);
    }
    ScalarValue::Str(text.to_string())
}

/// Resolve scalar text using its explicit tag and presentation style.
///
/// Mapping keys spelled `null` stay strings so they remain addressable by name.
pub fn decode(text: &str, tag: Option<&str>, style: NodeStyle, is_key: bool) -> ScalarValue {
    if let Some(tag) = tag {
        return match tag {
            "!!str" => ScalarValue::Str(text.to_string()),
            "!!int" => parse_int(text)
                .map(ScalarValue::Int)
                .unwrap_or_else(|| ScalarValue::Str(text.to_string())),
            "!!float" => parse_float(text)
                .or_else(|| parse_int(text).map(|i| i as f64))
                .map(ScalarValue::Float)
                .unwrap_or_else(|| ScalarValue::Str(text.to_string())),
            "!!bool" => ScalarValue::Bool(text == "true"),
            "!!null" => ScalarValue::Null,
            _ => ScalarValue::Str(text.to_string()),
        };
    }
    match style {
        NodeStyle::SingleQuoted
        | NodeStyle::DoubleQuoted
        | NodeStyle::Literal
        | NodeStyle::Folded => ScalarValue::Str(text.to_string()),
        _ => {
            if is_key && text == "null" {
                return ScalarValue::Str(text.to_string());
            }
            decode_plain(text)
        }
    }
}

/// Canonical text for a value when no source spelling can be reused.
pub fn render(value: &ScalarValue) -> String {
    value.to_string()
}
