//! Reading the module path out of a `go.mod` descriptor.
//!
//! Only the `module` directive matters here. Other directives (and their
//! parenthesised blocks) are skipped without being validated.

use crate::error::{BuildError, Result};
use std::path::Path;

/// Filename of the module descriptor.
pub const GO_MOD: &str = "go.mod";

/// Read `<module_dir>/go.mod` and return the declared module path.
pub fn read_module_path(module_dir: &Path) -> Result<String> {
    let path = module_dir.join(GO_MOD);
    let data = std::fs::read_to_string(&path).map_err(|source| BuildError::DescriptorRead {
        path: path.clone(),
        source,
    })?;
    parse_module_path(&data).map_err(|message| BuildError::DescriptorParse { path, message })
}

/// Extract the module path from descriptor text.
///
/// Accepts `module example.com/m`, quoted paths and the block form
/// `module ( example.com/m )`.
pub fn parse_module_path(data: &str) -> std::result::Result<String, String> {
    let mut found: Option<String> = None;
    let mut block: Option<String> = None;

    for (idx, raw) in data.lines().enumerate() {
        let lineno = idx + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(verb) = block.as_deref() {
            if line == ")" {
                block = None;
            } else if verb == "module" {
                record(&mut found, parse_path(line, lineno)?, lineno)?;
            }
            continue;
        }

        let (verb, rest) = split_verb(line);
        if rest == "(" {
            block = Some(verb.to_string());
            continue;
        }
        if verb == "module" {
            record(&mut found, parse_path(rest, lineno)?, lineno)?;
        }
    }

    if block.is_some() {
        return Err("unterminated block: missing ')'".into());
    }
    found.ok_or_else(|| "no module directive found".to_string())
}

fn record(found: &mut Option<String>, path: String, lineno: usize) -> std::result::Result<(), String> {
    if found.is_some() {
        return Err(format!("line {lineno}: repeated module statement"));
    }
    *found = Some(path);
    Ok(())
}

/// Split a directive line into its verb and the (trimmed) remainder.
fn split_verb(line: &str) -> (&str, &str) {
    let end = line
        .find(|c: char| c.is_whitespace() || c == '(')
        .unwrap_or(line.len());
    (&line[..end], line[end..].trim())
}

fn parse_path(arg: &str, lineno: usize) -> std::result::Result<String, String> {
    let usage = || format!("line {lineno}: usage: module module/path");
    let arg = arg.trim();
    if arg.is_empty() {
        return Err(usage());
    }

    let path = match arg.chars().next() {
        Some(q @ ('"' | '`')) => {
            let inner = arg
                .strip_prefix(q)
                .and_then(|s| s.strip_suffix(q))
                .ok_or_else(|| format!("line {lineno}: invalid quoted string {arg}"))?;
            if inner.contains(q) || inner.contains('\\') {
                return Err(format!("line {lineno}: invalid quoted string {arg}"));
            }
            inner
        }
        _ => {
            if arg.contains(char::is_whitespace) || arg.contains('"') {
                return Err(usage());
            }
            arg
        }
    };

    if path.is_empty() {
        return Err(format!("line {lineno}: empty module path"));
    }
    Ok(path.to_string())
}

/// Drop a trailing `//` comment that is not inside a quoted string.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut prev = '\0';
    for (i, c) in line.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '`' => quote = Some(c),
            None if c == '/' && prev == '/' => return &line[..i - 1],
            None => {}
        }
        prev = c;
    }
    line
}
