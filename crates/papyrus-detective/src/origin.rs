//! Attributing a template load to the line that caused it.
//!
//! Every loaded template gets a [`Frame`] recording the references
//! (`include`, `extends`, `import`, `from`) found in its source. While a page
//! renders, the session keeps a stack of the frames of the templates that are
//! executing right now. When another template is loaded, the innermost frames
//! of that stack are searched for the reference that asked for it.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use papyrus_static::LoadedTemplate;
use regex::Regex;
use serde::Serialize;

/// How many frames are inspected before attribution gives up.
pub const MAX_FRAME_DEPTH: usize = 10;

/// Line text reported when the source line cannot be read.
pub const UNKNOWN_LINE: &str = "<unknown>";

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{%[-+]?\s*(include|extends|import|from)\s+(.*?)\s*[-+]?%\}")
        .expect("directive pattern is valid")
});

/// Comments and raw blocks; directives inside them never run.
static OPAQUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{#.*?#\}|\{%[-+]?\s*raw\s*[-+]?%\}.*?\{%[-+]?\s*endraw\s*[-+]?%\}")
        .expect("opaque pattern is valid")
});

/// The directive a reference was made with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Include,
    Extends,
    Import,
    From,
}

impl ReferenceKind {
    fn parse(keyword: &str) -> Option<Self> {
        match keyword {
            "include" => Some(Self::Include),
            "extends" => Some(Self::Extends),
            "import" => Some(Self::Import),
            "from" => Some(Self::From),
            _ => None,
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            Self::Include => "include",
            Self::Extends => "extends",
            Self::Import => "import",
            Self::From => "from",
        };
        f.write_str(keyword)
    }
}

/// What a reference points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// One or more literal names; a list include picks the first that exists.
    Literal(Vec<String>),
    /// An expression only known at render time.
    Dynamic(String),
}

/// A template reference found in a template's source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub kind: ReferenceKind,
    pub target: Target,
    /// Byte offset of the directive's opening `{%`
    pub offset: usize,
    /// 1-based line of the directive's opening tag
    pub lineno: usize,
    /// That line, stripped
    pub line: String,
}

impl Reference {
    fn names(&self, name: &str) -> bool {
        matches!(&self.target, Target::Literal(names) if names.iter().any(|n| n == name))
    }

    fn is_dynamic(&self) -> bool {
        matches!(self.target, Target::Dynamic(_))
    }
}

/// Find every template reference in `source`.
pub fn scan_references(source: &str) -> Vec<Reference> {
    let lines: Vec<&str> = source.lines().collect();
    let opaque: Vec<_> = OPAQUE.find_iter(source).map(|m| m.range()).collect();

    DIRECTIVE
        .captures_iter(source)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if opaque.iter().any(|range| range.contains(&whole.start())) {
                return None;
            }
            let kind = ReferenceKind::parse(caps.get(1)?.as_str())?;
            let lineno = source[..whole.start()].matches('\n').count() + 1;
            let line = lines.get(lineno - 1).map(|l| l.trim()).unwrap_or_default();
            Some(Reference {
                kind,
                target: parse_target(caps.get(2)?.as_str()),
                offset: whole.start(),
                lineno,
                line: line.to_string(),
            })
        })
        .collect()
}

/// Parse the expression following a directive keyword.
///
/// Only the leading term matters: `"a.html" as m`, `"a.html" import x` and
/// `"a.html" ignore missing` all target `a.html`.
fn parse_target(expr: &str) -> Target {
    let expr = expr.trim_start();
    let literal = match expr.chars().next() {
        Some(quote @ ('"' | '\'')) => string_literal(expr, quote).map(|(s, _)| vec![s]),
        Some('[') => literal_list(&expr[1..]),
        _ => None,
    };
    literal.map_or_else(|| Target::Dynamic(expr.to_string()), Target::Literal)
}

/// Read a quoted literal at the start of `s`, returning it and the rest.
fn string_literal(s: &str, quote: char) -> Option<(String, &str)> {
    let body = &s[quote.len_utf8()..];
    let end = body.find(quote)?;
    let value = &body[..end];
    if value.contains('\\') {
        return None;
    }
    Some((value.to_string(), &body[end + quote.len_utf8()..]))
}

/// Read `"a", 'b']`, the remainder of a list of literals.
fn literal_list(mut rest: &str) -> Option<Vec<String>> {
    let mut names = Vec::new();
    loop {
        rest = rest.trim_start();
        if rest.starts_with(']') {
            return Some(names);
        }
        let quote = rest.chars().next().filter(|c| matches!(c, '"' | '\''))?;
        let (name, after) = string_literal(rest, quote)?;
        names.push(name);
        rest = after.trim_start();
        rest = rest.strip_prefix(',').unwrap_or(rest);
    }
}

/// Where a template reference occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateOrigin {
    /// Resolved path of the referencing template, its name if it has no file
    pub path: PathBuf,
    /// Name of the referencing template
    pub name: String,
    /// 1-based line number of the reference
    pub lineno: usize,
    /// The source line, stripped
    pub line: String,
    /// Directive used
    pub kind: ReferenceKind,
}

/// A loaded template and the references in its source.
#[derive(Debug, Clone)]
pub struct Frame {
    name: String,
    path: Option<PathBuf>,
    references: Vec<Reference>,
}

impl Frame {
    pub fn new(template: &LoadedTemplate) -> Self {
        Self {
            name: template.name.clone(),
            path: template.path.clone(),
            references: scan_references(&template.source),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    fn origin(&self, reference: &Reference) -> TemplateOrigin {
        let (path, line) = match &self.path {
            Some(path) => (
                path.clone(),
                line_from_file(path, reference.lineno).trim().to_string(),
            ),
            None => (PathBuf::from(&self.name), reference.line.clone()),
        };
        TemplateOrigin {
            path,
            name: self.name.clone(),
            lineno: reference.lineno,
            line,
            kind: reference.kind,
        }
    }
}

/// Find which frame loaded `name`.
///
/// `frames` is the stack of executing templates, outermost first. Looks at no
/// more than [`MAX_FRAME_DEPTH`] frames, innermost first. A
/// literal reference to `name` wins; failing that, the first dynamic
/// reference is taken as the likely culprit.
pub fn find_parent_template(frames: &[Frame], name: &str) -> Option<TemplateOrigin> {
    let window = || frames.iter().rev().take(MAX_FRAME_DEPTH);

    let literal = window().find_map(|frame| {
        frame
            .references
            .iter()
            .find(|r| r.names(name))
            .map(|r| (frame, r))
    });
    let (frame, reference) = literal.or_else(|| {
        window().find_map(|frame| {
            frame
                .references
                .iter()
                .find(|r| r.is_dynamic())
                .map(|r| (frame, r))
        })
    })?;

    Some(frame.origin(reference))
}

/// Read line `lineno` (1-based) of the file at `path`.
///
/// Returns [`UNKNOWN_LINE`] if the file cannot be read or is too short.
pub fn line_from_file(path: &Path, lineno: usize) -> String {
    let Ok(file) = File::open(path) else {
        return UNKNOWN_LINE.to_string();
    };
    BufReader::new(file)
        .lines()
        .nth(lineno.saturating_sub(1))
        .and_then(Result::ok)
        .filter(|_| lineno > 0)
        .unwrap_or_else(|| UNKNOWN_LINE.to_string())
}
