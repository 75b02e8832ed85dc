//! Source inspection
//!
//! Finds the import paths a checked-out package refers to. Only the import
//! block at the top of each source file is read; parsing stops at the first
//! top-level declaration.

use crate::ResolverResult;
use grove_core::utils::repository_root;
use grove_core::GroveError;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

const SOURCE_EXTENSION: &str = "go";
const TEST_SUFFIX: &str = "_test.go";
const SKIPPED_DIRS: &[&str] = &["vendor", "testdata"];
const DECLARATION_KEYWORDS: &[&str] = &["func", "type", "var", "const"];

/// Import paths named by the import declarations in `source`, in source order
pub fn parse_imports(source: &str) -> Vec<String> {
    let mut imports = Vec::new();
    let mut in_group = false;
    let mut in_comment = false;

    for raw in source.lines() {
        let stripped = strip_comments(raw, &mut in_comment);
        let line = stripped.trim();
        if line.is_empty() {
            continue;
        }

        if in_group {
            in_group = group_line(line, &mut imports);
            continue;
        }

        if let Some(rest) = keyword(line, "import") {
            let rest = rest.trim_start();
            match rest.strip_prefix('(') {
                Some(inner) => in_group = group_line(inner, &mut imports),
                None => imports.extend(quoted_path(rest)),
            }
            continue;
        }

        if DECLARATION_KEYWORDS.iter().any(|kw| keyword(line, kw).is_some()) {
            break;
        }
    }
    imports
}

/// Handle the specs of a grouped import on one line; false once the group closes
fn group_line(line: &str, imports: &mut Vec<String>) -> bool {
    let (body, open) = match line.find(')') {
        Some(end) => (&line[..end], false),
        None => (line, true),
    };
    for spec in body.split(';') {
        imports.extend(quoted_path(spec));
    }
    open
}

/// `rest` when `line` starts with the keyword `kw` as a whole word
fn keyword<'a>(line: &'a str, kw: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(kw)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() || c == '(' || c == '"' || c == '`' => Some(rest),
        _ => None,
    }
}

/// The quoted path of an import spec such as `name "path"` or `` `path` ``
fn quoted_path(spec: &str) -> Option<String> {
    let start = spec.find(['"', '`'])?;
    let quote = spec[start..].chars().next()?;
    let body = &spec[start + 1..];
    let end = body.find(quote)?;
    let path = body[..end].trim();
    (!path.is_empty()).then(|| path.to_string())
}

/// Drop `//` and `/* */` comments, carrying block-comment state across lines
fn strip_comments(line: &str, in_comment: &mut bool) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if *in_comment {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                *in_comment = false;
            }
            continue;
        }
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '`' => {
                quote = Some(c);
                out.push(c);
            },
            '/' if chars.peek() == Some(&'/') => break,
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                *in_comment = true;
                out.push(' ');
            },
            _ => out.push(c),
        }
    }
    out
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name.starts_with('_') || SKIPPED_DIRS.contains(&name.as_ref())
}

fn is_source_file(entry: &DirEntry, include_tests: bool) -> bool {
    if !entry.file_type().is_file() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') || name.starts_with('_') {
        return false;
    }
    if !include_tests && name.ends_with(TEST_SUFFIX) {
        return false;
    }
    Path::new(name.as_ref())
        .extension()
        .map_or(false, |ext| ext == SOURCE_EXTENSION)
}

/// Every import named by the source files under `root`
pub fn scan_imports(root: &Path, include_tests: bool) -> ResolverResult<BTreeSet<String>> {
    let mut imports = BTreeSet::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e));

    for entry in walker {
        let entry =
            entry.map_err(|e| GroveError::io(format!("Failed to walk {}", root.display()), e.into()))?;
        if !is_source_file(&entry, include_tests) {
            continue;
        }
        let source = fs::read_to_string(entry.path())
            .map_err(|e| GroveError::io(format!("Failed to read {}", entry.path().display()), e))?;
        imports.extend(parse_imports(&source));
    }
    Ok(imports)
}

fn is_standard_library(import: &str) -> bool {
    let first = import.split('/').next().unwrap_or_default();
    !first.contains('.')
}

fn is_within(import: &str, package: &str) -> bool {
    import == package
        || import
            .strip_prefix(package)
            .map_or(false, |rest| rest.starts_with('/'))
}

/// Third-party repositories the tree at `root` imports.
///
/// Standard-library, relative and self imports are dropped; the rest are
/// folded onto their repository root so one repository yields one path.
pub fn discover(root: &Path, self_path: &str, include_tests: bool) -> ResolverResult<BTreeSet<String>> {
    let self_root = repository_root(self_path);
    let discovered: BTreeSet<String> = scan_imports(root, include_tests)?
        .into_iter()
        .filter(|import| !import.starts_with('.') && !import.starts_with('/'))
        .filter(|import| !is_standard_library(import))
        .filter(|import| !is_within(import, self_path) && !is_within(import, &self_root))
        .map(|import| repository_root(&import))
        .collect();

    debug!(package = %self_path, imports = discovered.len(), "inspected source tree");
    Ok(discovered)
}
