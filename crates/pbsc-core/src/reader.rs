//! Line-oriented section reader.
//!
//! Turns dataset text into a lazy sequence of [`Section`]s. Every body line
//! keeps its 1-based line number so later phases can point errors at it.

use crate::error::{CompileError, Location};
use std::iter::Peekable;

const BOM: char = '\u{feff}';

// ---------------------------------------------------------------------------
// Raw lines and values
// ---------------------------------------------------------------------------

/// A line of text with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub text: String,
    pub line: usize,
}

/// A body line of a section, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyLine {
    /// `key = value`
    Entry { key: String, value: RawLine },
    /// Anything else (table-style datasets).
    Row(RawLine),
}

/// Every occurrence of one key within a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValue {
    occurrences: Vec<RawLine>,
}

impl RawValue {
    pub fn single(text: impl Into<String>, line: usize) -> Self {
        Self {
            occurrences: vec![RawLine {
                text: text.into(),
                line,
            }],
        }
    }

    pub fn first(&self) -> &RawLine {
        &self.occurrences[0]
    }

    pub fn occurrences(&self) -> &[RawLine] {
        &self.occurrences
    }

    /// Whether the key occurred more than once.
    pub fn is_repeated(&self) -> bool {
        self.occurrences.len() > 1
    }

    pub fn line(&self) -> usize {
        self.first().line
    }
}

/// A `[name]` header and the body lines up to the next header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub line: usize,
    pub body: Vec<BodyLine>,
}

impl Section {
    /// Entries grouped by key, in order of each key's first occurrence.
    pub fn entries(&self) -> Vec<(&str, RawValue)> {
        let mut out: Vec<(&str, RawValue)> = Vec::new();
        for line in &self.body {
            if let BodyLine::Entry { key, value } = line {
                match out.iter().position(|(k, _)| *k == key.as_str()) {
                    Some(i) => out[i].1.occurrences.push(value.clone()),
                    None => out.push((
                        key.as_str(),
                        RawValue {
                            occurrences: vec![value.clone()],
                        },
                    )),
                }
            }
        }
        out
    }

    /// Bare rows in file order.
    pub fn rows(&self) -> impl Iterator<Item = &RawLine> {
        self.body.iter().filter_map(|line| match line {
            BodyLine::Row(row) => Some(row),
            BodyLine::Entry { .. } => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Comment stripping and prepped lines
// ---------------------------------------------------------------------------

/// Remove a `#` comment that is not inside double quotes.
pub fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '#' if !in_quotes => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Non-blank, comment-free, trimmed lines with their 1-based numbers.
pub struct PreppedLines<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
}

/// Iterate `text` as prepped lines: BOM removed, comments stripped, blank
/// lines skipped.
pub fn prepped_lines(text: &str) -> PreppedLines<'_> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    PreppedLines {
        lines: text.lines().enumerate(),
    }
}

impl<'a> Iterator for PreppedLines<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        for (index, line) in self.lines.by_ref() {
            let line = strip_comment(line).trim();
            if !line.is_empty() {
                return Some((index + 1, line));
            }
        }
        None
    }
}

/// The inside of a `[header]` line, if `line` is one.
pub fn header_name(line: &str) -> Option<&str> {
    line.strip_prefix('[')?.strip_suffix(']').map(str::trim)
}

/// Split `key = value`. The key must be a word (`[A-Za-z0-9_]+`).
pub fn split_entry(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((key, value.trim()))
}

// ---------------------------------------------------------------------------
// SectionReader
// ---------------------------------------------------------------------------

/// Lazy iterator over the sections of one dataset file.
///
/// Yields a [`CompileError::Grammar`] for a body line before the first
/// header or for an empty header, after which it yields nothing more.
pub struct SectionReader<'a> {
    file: &'a str,
    lines: Peekable<PreppedLines<'a>>,
    failed: bool,
}

impl<'a> SectionReader<'a> {
    pub fn new(file: &'a str, text: &'a str) -> Self {
        Self {
            file,
            lines: prepped_lines(text).peekable(),
            failed: false,
        }
    }

    fn fail(&mut self, line: usize, message: String) -> Option<Result<Section, CompileError>> {
        self.failed = true;
        let location = Location::file(self.file).at_line(line);
        Some(Err(CompileError::grammar(&location, message)))
    }
}

impl Iterator for SectionReader<'_> {
    type Item = Result<Section, CompileError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let (line_no, line) = self.lines.next()?;
        let name = match header_name(line) {
            Some("") => return self.fail(line_no, "section header has no name".to_string()),
            Some(name) => name.to_string(),
            None => {
                return self.fail(
                    line_no,
                    format!("expected a section at the beginning of the file, got \"{line}\""),
                );
            }
        };

        let mut body = Vec::new();
        while let Some(&(n, text)) = self.lines.peek() {
            if header_name(text).is_some() {
                break;
            }
            self.lines.next();
            body.push(match split_entry(text) {
                Some((key, value)) => BodyLine::Entry {
                    key: key.to_string(),
                    value: RawLine {
                        text: value.to_string(),
                        line: n,
                    },
                },
                None => BodyLine::Row(RawLine {
                    text: text.to_string(),
                    line: n,
                }),
            });
        }
        Some(Ok(Section {
            name,
            line: line_no,
            body,
        }))
    }
}
