//! Import extraction for Go source files.
//!
//! Files are parsed with the tree-sitter Go grammar, but only the file
//! header counts: the package clause, then every leading `import`
//! declaration. Syntax errors after the first other top-level declaration
//! are not reported.

use crate::error::{BuildError, Result};
use std::path::Path;
use std::str::Chars;
use tree_sitter::{Node, Parser};

/// A syntax error found while reading the import block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

impl SyntaxError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.line, self.message)
    }
}

/// One import spec as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Alias, `.` or `_` when present.
    pub name: Option<String>,
    /// The unquoted import path.
    pub path: String,
    pub line: usize,
}

/// Read a source file and return the import paths it declares, in order.
pub fn read_imports(path: &Path) -> Result<Vec<String>> {
    let src = std::fs::read_to_string(path).map_err(|source| BuildError::SourceRead {
        path: path.to_path_buf(),
        source,
    })?;
    let specs = parse_imports(&src).map_err(|e| BuildError::ImportParse {
        path: path.to_path_buf(),
        line: e.line,
        message: e.message,
    })?;

    Ok(specs
        .into_iter()
        .map(|spec| {
            if let Some(name) = &spec.name {
                tracing::trace!(
                    "{}:{} imports {} as {}",
                    path.display(),
                    spec.line,
                    spec.path,
                    name
                );
            }
            spec.path
        })
        .collect())
}

/// Parse the package clause and import declarations of Go source text.
pub fn parse_imports(src: &str) -> std::result::Result<Vec<ImportSpec>, SyntaxError> {
    let src = src.strip_prefix('\u{feff}').unwrap_or(src);
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_go::LANGUAGE.into())
        .map_err(|e| SyntaxError::new(1, format!("failed to load Go grammar: {e}")))?;
    let tree = parser
        .parse(src, None)
        .ok_or_else(|| SyntaxError::new(1, "parser produced no tree"))?;

    let bytes = src.as_bytes();
    let root = tree.root_node();
    let mut seen_package = false;
    let mut specs = Vec::new();

    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        match node.kind() {
            "comment" => {}
            "package_clause" if !seen_package => {
                check_clean(node, bytes)?;
                let name = node
                    .named_children(&mut node.walk())
                    .next()
                    .map(|n| text(n, bytes));
                if name == Some("_") {
                    return Err(SyntaxError::new(row(node), "invalid package name _"));
                }
                seen_package = true;
            }
            _ if !seen_package => {
                return Err(SyntaxError::new(
                    row(node),
                    format!("expected 'package', found {}", node.kind()),
                ));
            }
            "import_declaration" => {
                check_clean(node, bytes)?;
                collect_specs(node, bytes, &mut specs)?;
            }
            "ERROR" if !starts_declaration(node) => return Err(error_at(node, bytes)),
            _ => break,
        }
    }

    if !seen_package {
        return Err(SyntaxError::new(1, "expected 'package', found EOF"));
    }
    Ok(specs)
}

/// Keywords that open a top-level declaration other than an import.
const DECL_KEYWORDS: &[&str] = &["func", "var", "const", "type"];

fn starts_declaration(node: Node<'_>) -> bool {
    node.children(&mut node.walk())
        .next()
        .is_some_and(|first| DECL_KEYWORDS.contains(&first.kind()))
}

fn collect_specs(
    decl: Node<'_>,
    src: &[u8],
    out: &mut Vec<ImportSpec>,
) -> std::result::Result<(), SyntaxError> {
    let mut cursor = decl.walk();
    for child in decl.named_children(&mut cursor) {
        match child.kind() {
            "import_spec" => out.push(import_spec(child, src)?),
            "import_spec_list" => {
                let mut inner = child.walk();
                for spec in child
                    .named_children(&mut inner)
                    .filter(|n| n.kind() == "import_spec")
                {
                    out.push(import_spec(spec, src)?);
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn import_spec(node: Node<'_>, src: &[u8]) -> std::result::Result<ImportSpec, SyntaxError> {
    let line = row(node);
    let name = node
        .child_by_field_name("name")
        .map(|n| text(n, src).to_string());
    let literal = node
        .child_by_field_name("path")
        .map(|n| text(n, src))
        .ok_or_else(|| SyntaxError::new(line, "expected import path"))?;

    let path = unquote(literal)
        .and_then(|path| validate_import_path(&path).map(|()| path))
        .map_err(|reason| {
            SyntaxError::new(line, format!("invalid import path {literal}: {reason}"))
        })?;
    Ok(ImportSpec { name, path, line })
}

fn check_clean(node: Node<'_>, src: &[u8]) -> std::result::Result<(), SyntaxError> {
    first_error(node).map_or(Ok(()), |bad| Err(error_at(bad, src)))
}

/// The first `ERROR` or `MISSING` node in `node`'s subtree, in source order.
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    node.children(&mut cursor).find_map(first_error)
}

fn error_at(node: Node<'_>, src: &[u8]) -> SyntaxError {
    if node.is_missing() {
        return SyntaxError::new(row(node), format!("missing {}", node.kind()));
    }
    let snippet: String = text(node, src)
        .lines()
        .next()
        .unwrap_or_default()
        .chars()
        .take(32)
        .collect();
    SyntaxError::new(row(node), format!("unexpected {snippet:?}"))
}

fn row(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

fn text<'s>(node: Node<'_>, src: &'s [u8]) -> &'s str {
    node.utf8_text(src).unwrap_or_default()
}

/// Decode a Go string literal, interpreted or raw.
fn unquote(literal: &str) -> std::result::Result<String, String> {
    if let Some(raw) = literal.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
        return Ok(raw.replace('\r', ""));
    }
    let Some(body) = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
    else {
        return Err("not a string literal".into());
    };

    let mut out = Vec::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            push_char(&mut out, c);
            continue;
        }
        let Some(esc) = chars.next() else {
            return Err("escape sequence not terminated".into());
        };
        match esc {
            'a' => out.push(0x07),
            'b' => out.push(0x08),
            'f' => out.push(0x0c),
            'n' => out.push(b'\n'),
            'r' => out.push(b'\r'),
            't' => out.push(b'\t'),
            'v' => out.push(0x0b),
            '\\' => out.push(b'\\'),
            '"' => out.push(b'"'),
            'x' => out.push(digits(&mut chars, 2, 16)? as u8),
            '0'..='7' => {
                let value = esc.to_digit(8).unwrap_or_default() * 64 + digits(&mut chars, 2, 8)?;
                let byte = u8::try_from(value)
                    .map_err(|_| format!("octal escape value {value} > 255"))?;
                out.push(byte);
            }
            'u' | 'U' => {
                let width = if esc == 'u' { 4 } else { 8 };
                let code = digits(&mut chars, width, 16)?;
                let decoded = char::from_u32(code)
                    .ok_or_else(|| format!("escape sequence is invalid Unicode code point {code:#x}"))?;
                push_char(&mut out, decoded);
            }
            other => return Err(format!("unknown escape sequence \\{other}")),
        }
    }
    String::from_utf8(out).map_err(|_| "invalid UTF-8".into())
}

fn push_char(out: &mut Vec<u8>, c: char) {
    let mut buf = [0; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

/// Read exactly `count` digits in `radix`.
fn digits(chars: &mut Chars<'_>, count: usize, radix: u32) -> std::result::Result<u32, String> {
    (0..count).try_fold(0u32, |acc, _| {
        chars
            .next()
            .and_then(|c| c.to_digit(radix))
            .map(|d| acc * radix + d)
            .ok_or_else(|| "invalid escape sequence".to_string())
    })
}

const ILLEGAL_PATH_CHARS: &str = "!\"#$%&'()*,:;<=>?[\\]^{|}`\u{fffd}";

/// Reject import paths the Go toolchain would refuse.
fn validate_import_path(path: &str) -> std::result::Result<(), String> {
    if path.is_empty() {
        return Err("empty".into());
    }
    match path
        .chars()
        .find(|&c| !is_graphic(c) || c.is_whitespace() || ILLEGAL_PATH_CHARS.contains(c))
    {
        Some(bad) => Err(format!("illegal character {bad:?}")),
        None => Ok(()),
    }
}

/// Control, format, private-use and noncharacter code points are not graphic.
fn is_graphic(c: char) -> bool {
    !(c.is_control() || is_format(c) || is_private_use(c) || is_noncharacter(c))
}

fn is_format(c: char) -> bool {
    matches!(
        c,
        '\u{00ad}'
            | '\u{0600}'..='\u{0605}'
            | '\u{061c}'
            | '\u{06dd}'
            | '\u{070f}'
            | '\u{0890}'..='\u{0891}'
            | '\u{08e2}'
            | '\u{180e}'
            | '\u{200b}'..='\u{200f}'
            | '\u{202a}'..='\u{202e}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206f}'
            | '\u{feff}'
            | '\u{fff9}'..='\u{fffb}'
            | '\u{110bd}'
            | '\u{110cd}'
            | '\u{13430}'..='\u{1343f}'
            | '\u{1bca0}'..='\u{1bca3}'
            | '\u{1d173}'..='\u{1d17a}'
            | '\u{e0001}'
            | '\u{e0020}'..='\u{e007f}'
    )
}

fn is_private_use(c: char) -> bool {
    matches!(
        c,
        '\u{e000}'..='\u{f8ff}' | '\u{f0000}'..='\u{ffffd}' | '\u{100000}'..='\u{10fffd}'
    )
}

fn is_noncharacter(c: char) -> bool {
    matches!(c, '\u{fdd0}'..='\u{fdef}') || (c as u32) & 0xfffe == 0xfffe
}
