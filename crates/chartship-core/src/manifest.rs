//! In-place editing of hand-maintained YAML documents.
//!
//! `values.yaml` and `Chart.yaml` are edited by people as well as by the
//! release pipeline, so a stamp must not reflow them. [`YamlDocument`] parses
//! the text with `serde_yaml` to read fields, asks `marked_yaml` where the
//! addressed key starts, and writes by replacing only the bytes of the scalar
//! after it:
//!
//! ```text
//! image:
//!   name: jupyterhub/k8s-binderhub   # stamped by chartship
//!   tag: 'a1b2c3d'                   <- only `'a1b2c3d'` is rewritten
//! ```
//!
//! Key order, comments, blank lines, indentation and the quoting style of the
//! edited scalar all survive. Every edit is checked by re-parsing the whole
//! document and reading the field back.

use marked_yaml::types::{MarkedMappingNode, MarkedScalarNode, Node};
use serde_yaml::Value;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// A YAML document loaded for a read-modify-write cycle.
#[derive(Debug, Clone)]
pub struct YamlDocument {
    path: PathBuf,
    text: String,
    value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
}

/// Where a scalar lives in the source text.
#[derive(Debug)]
struct ScalarSpan {
    /// Byte range of the scalar token, quotes included.
    range: Range<usize>,
    style: ScalarStyle,
}

impl YamlDocument {
    /// Read and parse the document at `path`.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| crate::Error::ManifestRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(path.to_path_buf(), text)
    }

    /// Parse document text; `path` is used for error messages and [`save`](Self::save).
    pub fn parse(path: PathBuf, text: String) -> crate::Result<Self> {
        let value = serde_yaml::from_str(&text).map_err(|e| crate::Error::ManifestParse {
            path: path.clone(),
            source: e,
        })?;
        Ok(Self { path, text, value })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current document text, including any edits.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Read a scalar field as a string. Numbers and booleans are rendered.
    pub fn get_str(&self, field: &[&str]) -> crate::Result<String> {
        let value = self.lookup(field)?;
        scalar_to_string(value).ok_or_else(|| crate::Error::FieldNotScalar {
            path: self.path.clone(),
            field: field.join("."),
        })
    }

    /// Replace the scalar at `field` with the string `new_value`.
    ///
    /// The field must already exist as a scalar in a block mapping. A null
    /// field (`tag:`) is filled in.
    pub fn set_str(&mut self, field: &[&str], new_value: &str) -> crate::Result<()> {
        let dotted = field.join(".");
        let current = self.lookup(field)?;
        if matches!(current, Value::Mapping(_) | Value::Sequence(_)) {
            return Err(crate::Error::FieldNotScalar {
                path: self.path.clone(),
                field: dotted,
            });
        }

        let tree = marked_yaml::parse_yaml(0, &self.text).map_err(|e| {
            crate::Error::ManifestStructure {
                path: self.path.clone(),
                reason: e.to_string(),
            }
        })?;
        let span = locate_scalar(&self.text, &tree, field).ok_or_else(|| {
            crate::Error::UnsupportedLayout {
                path: self.path.clone(),
                field: dotted.clone(),
            }
        })?;

        let rendered = render_scalar(new_value, span.style);
        let replacement = if span.range.is_empty() {
            format!(" {rendered}")
        } else {
            rendered
        };

        let mut edited = String::with_capacity(self.text.len() + replacement.len());
        edited.push_str(&self.text[..span.range.start]);
        edited.push_str(&replacement);
        edited.push_str(&self.text[span.range.end..]);

        let reparsed: Value =
            serde_yaml::from_str(&edited).map_err(|e| crate::Error::ManifestParse {
                path: self.path.clone(),
                source: e,
            })?;
        let actual = lookup_in(&reparsed, field).and_then(scalar_to_string);
        if actual.as_deref() != Some(new_value) {
            return Err(crate::Error::EditVerify {
                path: self.path.clone(),
                field: dotted,
                expected: new_value.to_owned(),
                actual,
            });
        }

        tracing::debug!(
            path = %self.path.display(),
            field = %dotted,
            value = %new_value,
            "yaml field updated"
        );

        self.text = edited;
        self.value = reparsed;
        Ok(())
    }

    /// Write the document back to the path it was loaded from.
    pub fn save(&self) -> crate::Result<()> {
        std::fs::write(&self.path, &self.text).map_err(|e| crate::Error::ManifestWrite {
            path: self.path.clone(),
            source: e,
        })
    }

    fn lookup(&self, field: &[&str]) -> crate::Result<&Value> {
        lookup_in(&self.value, field).ok_or_else(|| crate::Error::FieldMissing {
            path: self.path.clone(),
            field: field.join("."),
        })
    }
}

fn lookup_in<'a>(root: &'a Value, field: &[&str]) -> Option<&'a Value> {
    field.iter().try_fold(root, |node, key| node.get(*key))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ── Locating scalars ──

/// Find the scalar for `field` from the key position reported by the parser.
///
/// Only block mapping entries are editable: the key must open its line. Returns
/// `None` for flow mappings, block scalars, and values spanning several lines.
fn locate_scalar(text: &str, tree: &Node, field: &[&str]) -> Option<ScalarSpan> {
    let (last, parents) = field.split_last()?;
    let mut mapping = tree.as_mapping()?;
    for key in parents {
        mapping = entry(mapping, key)?.1.as_mapping()?;
    }
    let (key_node, _) = entry(mapping, last)?;

    // marker lines and columns are 1-based
    let marker = key_node.span().start()?;
    let (line_start, line) = nth_line(text, marker.line().checked_sub(1)?)?;
    let from = line
        .char_indices()
        .nth(marker.column().saturating_sub(1))
        .map_or(line.len(), |(i, _)| i);
    let key_col = line.len() - line[from..].trim_start_matches(' ').len();
    if !line[..key_col].bytes().all(|b| b == b' ') {
        return None;
    }

    let (key, after_colon) = split_key(&line[key_col..])?;
    if key != *last {
        return None;
    }

    let value_text = after_colon.trim_start_matches([' ', '\t']);
    let value_start = line_start + line.len() - value_text.len();
    let colon_end = line_start + line.len() - after_colon.len();
    scalar_span(value_text, value_start, colon_end)
}

fn entry<'a>(
    mapping: &'a MarkedMappingNode,
    key: &str,
) -> Option<(&'a MarkedScalarNode, &'a Node)> {
    mapping.iter().find(|(k, _)| k.as_str() == key)
}

/// Byte offset and content (without line terminator) of the zero-based line `n`.
fn nth_line(text: &str, n: usize) -> Option<(usize, &str)> {
    let mut offset = 0;
    for (i, raw) in text.split_inclusive('\n').enumerate() {
        if i == n {
            return Some((offset, raw.trim_end_matches(['\n', '\r'])));
        }
        offset += raw.len();
    }
    None
}

/// Split `key: rest` into the unquoted key and the text after the colon.
fn split_key(content: &str) -> Option<(String, &str)> {
    let first = content.chars().next()?;
    if matches!(first, '{' | '[' | '?' | '&' | '*' | '!' | '|' | '>' | '%' | '@' | '`') {
        return None;
    }

    if first == '"' || first == '\'' {
        let close = closing_quote(content, first)?;
        let rest = &content[close + 1..];
        let after = rest.strip_prefix(':')?;
        if !(after.is_empty() || after.starts_with([' ', '\t'])) {
            return None;
        }
        let inner = &content[1..close];
        let key = if first == '\'' {
            inner.replace("''", "'")
        } else {
            inner.replace("\\\"", "\"")
        };
        return Some((key, after));
    }

    let bytes = content.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'#' && i > 0 && is_blank(bytes[i - 1]) {
            return None;
        }
        if b == b':' && (i + 1 == bytes.len() || is_blank(bytes[i + 1])) {
            let key = content[..i].trim_end();
            if key.is_empty() {
                return None;
            }
            return Some((key.to_owned(), &content[i + 1..]));
        }
    }
    None
}

/// Byte index of the quote closing a scalar that opens at index 0.
fn closing_quote(s: &str, quote: char) -> Option<usize> {
    let bytes = s.as_bytes();
    let q = quote as u8;
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if q == b'"' => i += 2,
            b if b == q => {
                if q == b'\'' && bytes.get(i + 1) == Some(&b'\'') {
                    i += 2;
                } else {
                    return Some(i);
                }
            }
            _ => i += 1,
        }
    }
    None
}

fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// The value part of a plain line with any trailing comment removed.
///
/// A `#` starts a comment at the beginning of the value or after a space or tab.
fn strip_comment(value: &str) -> &str {
    let bytes = value.as_bytes();
    let cut = (0..bytes.len())
        .find(|&i| bytes[i] == b'#' && (i == 0 || is_blank(bytes[i - 1])))
        .unwrap_or(value.len());
    value[..cut].trim_end_matches([' ', '\t'])
}

fn scalar_span(value_text: &str, value_start: usize, colon_end: usize) -> Option<ScalarSpan> {
    match value_text.chars().next() {
        None | Some('#') => Some(ScalarSpan {
            range: colon_end..colon_end,
            style: ScalarStyle::Plain,
        }),
        Some(q @ ('"' | '\'')) => {
            let close = closing_quote(value_text, q)?;
            let style = if q == '"' {
                ScalarStyle::DoubleQuoted
            } else {
                ScalarStyle::SingleQuoted
            };
            Some(ScalarSpan {
                range: value_start..value_start + close + 1,
                style,
            })
        }
        Some('|' | '>' | '{' | '[' | '&' | '*' | '!') => None,
        Some(_) => {
            let token = strip_comment(value_text);
            Some(ScalarSpan {
                range: value_start..value_start + token.len(),
                style: ScalarStyle::Plain,
            })
        }
    }
}

// ── Rendering scalars ──

fn render_scalar(value: &str, style: ScalarStyle) -> String {
    match style {
        ScalarStyle::DoubleQuoted => double_quoted(value),
        ScalarStyle::SingleQuoted => single_quoted(value),
        ScalarStyle::Plain if plain_reads_back(value) => value.to_owned(),
        ScalarStyle::Plain => single_quoted(value),
    }
}

/// Whether `value` written unquoted parses back as the same string.
///
/// Short hashes such as `1234567` or `12e4567` would otherwise become numbers.
fn plain_reads_back(value: &str) -> bool {
    if value.is_empty() || value.contains('\n') {
        return false;
    }
    matches!(serde_yaml::from_str::<Value>(value), Ok(Value::String(s)) if s == value)
}

fn single_quoted(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> YamlDocument {
        YamlDocument::parse(PathBuf::from("values.yaml"), text.to_owned()).unwrap()
    }

    #[test]
    fn split_key_handles_plain_and_quoted_keys() {
        assert_eq!(split_key("tag: abc"), Some(("tag".to_owned(), " abc")));
        assert_eq!(split_key("image:"), Some(("image".to_owned(), "")));
        assert_eq!(split_key("'a:b': c"), Some(("a:b".to_owned(), " c")));
        assert_eq!(split_key("\"tag\": x"), Some(("tag".to_owned(), " x")));
        assert_eq!(split_key("url: http://x"), Some(("url".to_owned(), " http://x")));
        assert_eq!(split_key("http://x"), None);
        assert_eq!(split_key("{a: b}"), None);
    }

    #[test]
    fn plain_scalar_keeps_trailing_comment() {
        let mut d = doc("image:\n  tag: old   # set by CI\n");
        d.set_str(&["image", "tag"], "abc1234").unwrap();
        assert_eq!(d.text(), "image:\n  tag: abc1234   # set by CI\n");
    }

    #[test]
    fn tab_separated_comment_is_kept() {
        let mut d = doc("image:\n  tag: old\t# set by CI\n");
        d.set_str(&["image", "tag"], "abc1234").unwrap();
        assert_eq!(d.text(), "image:\n  tag: abc1234\t# set by CI\n");
    }

    #[test]
    fn key_inside_multiline_string_is_not_matched() {
        let text = "description: \"line one\n  version: 9.9.9-zzz\"\nversion: 0.1.0-aaa\n";
        let mut d = doc(text);
        d.set_str(&["version"], "0.1.0-bbb").unwrap();
        assert_eq!(
            d.text(),
            "description: \"line one\n  version: 9.9.9-zzz\"\nversion: 0.1.0-bbb\n"
        );
        assert_eq!(d.get_str(&["description"]).unwrap(), "line one version: 9.9.9-zzz");
    }

    #[test]
    fn multiline_target_value_is_unsupported() {
        let mut d = doc("version: \"0.1.0\n  -abc\"\n");
        let err = d.set_str(&["version"], "0.2.0").unwrap_err();
        assert!(matches!(err, crate::Error::UnsupportedLayout { .. }), "got: {err}");
    }

    #[test]
    fn strip_comment_accepts_space_or_tab() {
        assert_eq!(strip_comment("abc # x"), "abc");
        assert_eq!(strip_comment("abc\t# x"), "abc");
        assert_eq!(strip_comment("a#b"), "a#b");
        assert_eq!(strip_comment("# only"), "");
    }

    #[test]
    fn numeric_looking_hash_is_quoted() {
        let mut d = doc("image:\n  tag: old\n");
        d.set_str(&["image", "tag"], "1234567").unwrap();
        assert_eq!(d.text(), "image:\n  tag: '1234567'\n");
        assert_eq!(d.get_str(&["image", "tag"]).unwrap(), "1234567");
    }

    #[test]
    fn exponent_looking_hash_is_quoted() {
        let mut d = doc("image:\n  tag: old\n");
        d.set_str(&["image", "tag"], "12e4567").unwrap();
        assert_eq!(d.get_str(&["image", "tag"]).unwrap(), "12e4567");
    }

    #[test]
    fn quoting_style_is_preserved() {
        let mut d = doc("a: 'x'\nb: \"y\"\n");
        d.set_str(&["a"], "it's").unwrap();
        d.set_str(&["b"], "say \"hi\"").unwrap();
        assert_eq!(d.text(), "a: 'it''s'\nb: \"say \\\"hi\\\"\"\n");
    }

    #[test]
    fn null_field_is_filled_in() {
        let mut d = doc("image:\n  tag:\n  name: x\n");
        d.set_str(&["image", "tag"], "abc").unwrap();
        assert_eq!(d.text(), "image:\n  tag: abc\n  name: x\n");
    }

    #[test]
    fn same_key_in_other_mapping_is_not_touched() {
        let text = "hub:\n  tag: keep\nimage:\n  name: n\n  tag: old\n";
        let mut d = doc(text);
        d.set_str(&["image", "tag"], "new").unwrap();
        assert_eq!(d.text(), "hub:\n  tag: keep\nimage:\n  name: n\n  tag: new\n");
    }

    #[test]
    fn sequence_entries_are_not_matched() {
        let text = "extra:\n  - tag: inner\n    name: x\ntag: outer\n";
        let mut d = doc(text);
        d.set_str(&["tag"], "v2").unwrap();
        assert_eq!(d.text(), "extra:\n  - tag: inner\n    name: x\ntag: v2\n");
    }

    #[test]
    fn block_scalar_contents_are_skipped() {
        let text = "notes: |\n  version: fake\nversion: 0.1.0-abc\n";
        let mut d = doc(text);
        d.set_str(&["version"], "0.1.0-def").unwrap();
        assert_eq!(d.text(), "notes: |\n  version: fake\nversion: 0.1.0-def\n");
    }

    #[test]
    fn flow_mapping_is_unsupported() {
        let mut d = doc("image: {name: x, tag: y}\n");
        let err = d.set_str(&["image", "tag"], "z").unwrap_err();
        assert!(matches!(err, crate::Error::UnsupportedLayout { .. }), "got: {err}");
    }

    #[test]
    fn missing_field_is_an_error() {
        let mut d = doc("image:\n  name: x\n");
        let err = d.set_str(&["image", "tag"], "z").unwrap_err();
        assert!(matches!(err, crate::Error::FieldMissing { .. }), "got: {err}");
    }

    #[test]
    fn mapping_field_is_not_scalar() {
        let mut d = doc("image:\n  name: x\n");
        let err = d.set_str(&["image"], "z").unwrap_err();
        assert!(matches!(err, crate::Error::FieldNotScalar { .. }), "got: {err}");
    }

    #[test]
    fn crlf_line_endings_survive() {
        let mut d = doc("image:\r\n  tag: old\r\n");
        d.set_str(&["image", "tag"], "abc").unwrap();
        assert_eq!(d.text(), "image:\r\n  tag: abc\r\n");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn any_value_reads_back(value in "[ -~]{1,24}") {
                let mut d = doc("# header\nimage:\n  name: n  # keep\n  tag: old\nother: 1\n");
                d.set_str(&["image", "tag"], &value).unwrap();
                prop_assert_eq!(d.get_str(&["image", "tag"]).unwrap(), value);
                prop_assert!(d.text().starts_with("# header\nimage:\n  name: n  # keep\n  tag: "));
                prop_assert!(d.text().ends_with("\nother: 1\n"));
            }

            #[test]
            fn hex_hashes_read_back(hash in "[0-9a-f]{7,10}") {
                let mut d = doc("image:\n  tag: old\n");
                d.set_str(&["image", "tag"], &hash).unwrap();
                prop_assert_eq!(d.get_str(&["image", "tag"]).unwrap(), hash);
            }
        }
    }
}
