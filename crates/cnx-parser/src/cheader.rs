//! Tolerant C/C++ header reader for header symbol collection.
//!
//! Full preprocessor expansion destroys source structure, so headers are
//! parsed raw unless a regex heuristic finds `#if` expressions the parser
//! cannot handle itself (anything beyond `0`, `1` and `defined(X)`); only
//! those are handed to the system preprocessor.
//!
//! The reader is deliberately loose: it extracts the symbols CNX code
//! might reference and ignores everything it does not understand.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Everything extracted from one header.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderSymbols {
    pub functions: Vec<CFunction>,
    pub variables: Vec<CVariable>,
    pub typedefs: Vec<CTypedef>,
    pub structs: Vec<CStruct>,
    pub enums: Vec<CEnum>,
    pub defines: Vec<CDefine>,
    /// Forward-declared struct/class names with no definition in sight.
    pub opaque_types: Vec<String>,
    /// C++ syntax markers were found.
    pub is_cpp: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CFunction {
    pub name: String,
    pub return_type: String,
    /// (type text, parameter name) pairs; the name may be empty.
    pub params: Vec<(String, String)>,
    pub line: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CVariable {
    pub name: String,
    pub type_text: String,
    pub line: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CTypedef {
    pub name: String,
    pub underlying: String,
    /// For `typedef struct tagX X;`, the tag behind the alias.
    pub tag: Option<String>,
    pub line: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CStruct {
    pub name: String,
    /// (type text, field name) pairs.
    pub fields: Vec<(String, String)>,
    /// Declared as a bare `struct X {...};` so use sites need the keyword.
    pub needs_keyword: bool,
    pub is_class: bool,
    pub line: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CEnum {
    pub name: String,
    pub members: Vec<(String, i64)>,
    pub line: u32,
}

/// An object-like macro with a numeric-looking value; usable as an array
/// dimension passthrough.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CDefine {
    pub name: String,
    pub value: String,
    pub line: u32,
}

static IF_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*#\s*if\s+(.+?)\s*$").expect("static regex"));

static SIMPLE_IF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^!?\s*defined\s*\(?\s*\w+\s*\)?$|^[01]$").expect("static regex"));

static FUNCTION_PROTO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:extern\s+)?([A-Za-z_][A-Za-z0-9_:<>\s\*&]*?)\s+\**([A-Za-z_][A-Za-z0-9_]*)\s*\(([^;{}]*)\)\s*;")
        .expect("static regex")
});

static EXTERN_VAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*extern\s+([A-Za-z_][A-Za-z0-9_:<>\s\*&]*?)\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?:\[[^\]]*\])?\s*;")
        .expect("static regex")
});

static OBJECT_DEFINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*#\s*define\s+([A-Za-z_][A-Za-z0-9_]*)\s+([0-9][0-9xXa-fA-F]*[uUlL]*)\s*$")
        .expect("static regex")
});

static CPP_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bclass\s+[A-Za-z_]|\bnamespace\s+[A-Za-z_{]|\btemplate\s*<|::|\benum\s+class\b")
        .expect("static regex")
});

/// Whether a header needs the external preprocessor: it contains an `#if`
/// whose expression the raw parser cannot evaluate.
pub fn needs_preprocessing(source: &str) -> bool {
    IF_DIRECTIVE
        .captures_iter(source)
        .any(|cap| !SIMPLE_IF.is_match(cap[1].trim()))
}

/// Syntactic C++ detection: `class`, `namespace`, `template`, `::` and
/// typed enums trip the monotone C++-required flag.
pub fn detect_cpp(source: &str) -> bool {
    CPP_MARKER.is_match(&strip_comments(source))
}

/// Extract symbols from a header. Never fails; unrecognized constructs
/// are skipped.
pub fn parse_header(source: &str) -> HeaderSymbols {
    let stripped = strip_comments(source);
    let mut out = HeaderSymbols {
        is_cpp: detect_cpp(source),
        ..HeaderSymbols::default()
    };

    collect_defines(&stripped, &mut out);
    collect_composites(&stripped, &mut out);
    collect_prototypes(&stripped, &mut out);
    collect_extern_vars(&stripped, &mut out);
    out
}

/// Replace comments with spaces, preserving offsets and newlines.
fn strip_comments(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
            while i < bytes.len() && bytes[i] != b'\n' {
                out.push(b' ');
                i += 1;
            }
        } else if bytes[i] == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'*' {
            while i < bytes.len() {
                if bytes[i] == b'*' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
                    out.push(b' ');
                    out.push(b' ');
                    i += 2;
                    break;
                }
                out.push(if bytes[i] == b'\n' { b'\n' } else { b' ' });
                i += 1;
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn line_of(source: &str, offset: usize) -> u32 {
    let count = source.as_bytes()[..offset.min(source.len())]
        .iter()
        .filter(|b| **b == b'\n')
        .count();
    u32::try_from(count + 1).unwrap_or(u32::MAX)
}

fn collect_defines(source: &str, out: &mut HeaderSymbols) {
    for cap in OBJECT_DEFINE.captures_iter(source) {
        let whole = cap.get(0).map(|m| m.start()).unwrap_or(0);
        out.defines.push(CDefine {
            name: cap[1].to_string(),
            value: cap[2].to_string(),
            line: line_of(source, whole),
        });
    }
}

/// structs, classes, enums and typedefs. Walks brace groups by hand so
/// nested bodies do not confuse the line-level regexes.
fn collect_composites(source: &str, out: &mut HeaderSymbols) {
    let bytes = source.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let boundary = i == 0 || {
            let prev = bytes[i - 1];
            !prev.is_ascii_alphanumeric() && prev != b'_'
        };
        if !boundary {
            i += 1;
            continue;
        }
        let rest = &source[i..];
        if let Some(after) = rest.strip_prefix("typedef") {
            if after.starts_with(' ') || after.starts_with('\t') {
                i += consume_typedef(source, i, out);
                continue;
            }
        }
        for (keyword, is_class) in [("struct", false), ("class", true), ("enum", false)] {
            if starts_word(rest, keyword) && !preceded_by_typedef(source, i) {
                let consumed = if keyword == "enum" {
                    consume_enum(source, i, out)
                } else {
                    consume_struct(source, i, keyword, is_class, out)
                };
                if consumed > 0 {
                    i += consumed;
                }
            }
        }
        i += 1;
    }
}

fn starts_word(text: &str, word: &str) -> bool {
    text.strip_prefix(word)
        .is_some_and(|rest| rest.starts_with([' ', '\t', '\n']))
}

fn preceded_by_typedef(source: &str, offset: usize) -> bool {
    source[..offset].trim_end().ends_with("typedef")
}

/// `typedef ...;` including `typedef struct {...} Name;`.
/// Returns bytes consumed.
fn consume_typedef(source: &str, start: usize, out: &mut HeaderSymbols) -> usize {
    let rest = &source[start..];
    let body_end = match find_statement_end(rest) {
        Some(end) => end,
        None => return "typedef".len(),
    };
    let stmt = &rest[..body_end];
    let line = line_of(source, start);
    let inner = stmt.trim_start_matches("typedef").trim();

    if let Some(brace) = inner.find('{') {
        // typedef struct [tag] { fields } Name;
        let head = inner[..brace].trim();
        let close = match matching_brace(inner, brace) {
            Some(close) => close,
            None => return body_end + 1,
        };
        let name = inner[close + 1..].trim().trim_end_matches(';').trim();
        if name.is_empty() {
            return body_end + 1;
        }
        if head.starts_with("enum") {
            let members = parse_enum_members(&inner[brace + 1..close]);
            out.enums.push(CEnum {
                name: name.to_string(),
                members,
                line,
            });
        } else {
            let fields = parse_struct_fields(&inner[brace + 1..close]);
            out.structs.push(CStruct {
                name: name.to_string(),
                fields,
                needs_keyword: false,
                is_class: head.starts_with("class"),
                line,
            });
        }
    } else {
        // typedef <underlying> Name;
        let words: Vec<&str> = inner.trim_end_matches(';').split_whitespace().collect();
        if words.len() >= 2 {
            let name = words[words.len() - 1].trim_start_matches('*');
            let underlying = words[..words.len() - 1].join(" ");
            let tag = if words.first() == Some(&"struct") && words.len() == 3 {
                Some(words[1].to_string())
            } else {
                None
            };
            out.typedefs.push(CTypedef {
                name: name.to_string(),
                underlying,
                tag,
                line,
            });
        }
    }
    body_end + 1
}

/// `struct X {...};`, `class X {...};` or the opaque `struct X;`.
fn consume_struct(
    source: &str,
    start: usize,
    keyword: &str,
    is_class: bool,
    out: &mut HeaderSymbols,
) -> usize {
    let rest = &source[start..];
    let after = rest[keyword.len()..].trim_start();
    let name: String = after
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if name.is_empty() {
        return 0;
    }
    let tail = after[name.len()..].trim_start();
    let line = line_of(source, start);
    if tail.starts_with(';') {
        out.opaque_types.push(name);
        return keyword.len();
    }
    if !tail.starts_with('{') && !tail.starts_with(':') {
        return 0;
    }
    let brace = match rest.find('{') {
        Some(b) => b,
        None => return 0,
    };
    let close = match matching_brace(rest, brace) {
        Some(c) => c,
        None => return 0,
    };
    let fields = parse_struct_fields(&rest[brace + 1..close]);
    out.structs.push(CStruct {
        name,
        fields,
        needs_keyword: !is_class,
        is_class,
        line,
    });
    close
}

fn consume_enum(source: &str, start: usize, out: &mut HeaderSymbols) -> usize {
    let rest = &source[start..];
    let mut after = rest["enum".len()..].trim_start();
    if let Some(stripped) = after.strip_prefix("class") {
        after = stripped.trim_start();
    }
    let name: String = after
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    let brace = match rest.find('{') {
        Some(b) => b,
        None => return 0,
    };
    let close = match matching_brace(rest, brace) {
        Some(c) => c,
        None => return 0,
    };
    if name.is_empty() {
        return close;
    }
    let members = parse_enum_members(&rest[brace + 1..close]);
    out.enums.push(CEnum {
        name,
        members,
        line: line_of(source, start),
    });
    close
}

fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    for (idx, b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// End of a `typedef` statement: the `;` after any balanced brace group.
fn find_statement_end(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    for (idx, b) in bytes.iter().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b';' if depth == 0 => return Some(idx),
            _ => {}
        }
    }
    None
}

fn parse_struct_fields(body: &str) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    for piece in body.split(';') {
        let piece = piece.trim();
        if piece.is_empty()
            || piece.contains('(')
            || piece.starts_with("public")
            || piece.starts_with("private")
            || piece.starts_with("protected")
        {
            continue;
        }
        let piece = piece.split('[').next().unwrap_or(piece).trim();
        let words: Vec<&str> = piece.split_whitespace().collect();
        if words.len() < 2 {
            continue;
        }
        let name = words[words.len() - 1].trim_start_matches('*');
        let ty = words[..words.len() - 1].join(" ");
        if name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_')
        {
            fields.push((ty, name.to_string()));
        }
    }
    fields
}

fn parse_enum_members(body: &str) -> Vec<(String, i64)> {
    let mut members = Vec::new();
    let mut next = 0i64;
    for piece in body.split(',') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        let (name, value) = match piece.split_once('=') {
            Some((name, value)) => {
                let parsed = parse_c_int(value.trim()).unwrap_or(next);
                (name.trim(), parsed)
            }
            None => (piece, next),
        };
        if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            continue;
        }
        members.push((name.to_string(), value));
        next = value + 1;
    }
    members
}

fn parse_c_int(text: &str) -> Option<i64> {
    let text = text.trim_end_matches(['u', 'U', 'l', 'L']);
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}

fn collect_prototypes(source: &str, out: &mut HeaderSymbols) {
    for cap in FUNCTION_PROTO.captures_iter(source) {
        let return_type = cap[1].trim().to_string();
        // The extern-variable and typedef regexes own those shapes.
        if return_type.starts_with("typedef") || return_type == "extern" {
            continue;
        }
        let name = cap[2].to_string();
        let params = parse_params(&cap[3]);
        let start = cap.get(0).map(|m| m.start()).unwrap_or(0);
        out.functions.push(CFunction {
            name,
            return_type,
            params,
            line: line_of(source, start),
        });
    }
}

fn parse_params(text: &str) -> Vec<(String, String)> {
    let text = text.trim();
    if text.is_empty() || text == "void" {
        return Vec::new();
    }
    text.split(',')
        .filter_map(|piece| {
            let piece = piece.trim();
            if piece.is_empty() {
                return None;
            }
            let words: Vec<&str> = piece.split_whitespace().collect();
            if words.len() == 1 {
                return Some((words[0].to_string(), String::new()));
            }
            let last = words[words.len() - 1];
            // A trailing word that is pure identifier is the param name.
            let name = last.trim_start_matches('*');
            if name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                Some((words[..words.len() - 1].join(" "), name.to_string()))
            } else {
                Some((piece.to_string(), String::new()))
            }
        })
        .collect()
}

fn collect_extern_vars(source: &str, out: &mut HeaderSymbols) {
    for cap in EXTERN_VAR.captures_iter(source) {
        let type_text = cap[1].trim().to_string();
        // Skip prototypes caught by the looser extern regex.
        if type_text.contains('(') {
            continue;
        }
        let start = cap.get(0).map(|m| m.start()).unwrap_or(0);
        out.variables.push(CVariable {
            name: cap[2].to_string(),
            type_text,
            line: line_of(source, start),
        });
    }
}

#[cfg(test)]
#[path = "tests/cheader_tests.rs"]
mod tests;
