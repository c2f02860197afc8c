//! Heading-section model for markdown drafts.
//!
//! A document is a preamble followed by an ordered list of sections, each a
//! heading at a fixed level plus the body up to the next heading at the same
//! level. Deeper headings stay inside the body.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

static EXTRA_BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("valid regex"));
static TABLE_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\|?\s*:?-{3,}:?\s*(?:\|\s*:?-{3,}:?\s*)*\|?\s*$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    pub body: String,
}

impl Section {
    pub fn new(heading: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            body: tidy_block(&body.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownDocument {
    level: usize,
    pub preamble: String,
    pub sections: Vec<Section>,
}

/// Heading text when `line` is a heading of exactly `level` hashes.
fn heading_at(line: &str, level: usize) -> Option<&str> {
    let t = line.trim_start();
    let hashes = t.chars().take_while(|c| *c == '#').count();
    if hashes != level {
        return None;
    }
    let rest = &t[level..];
    if rest.is_empty() || rest.starts_with([' ', '\t']) {
        Some(rest.trim())
    } else {
        None
    }
}

/// Drop leading blank lines and trailing whitespace, keep indentation.
pub fn tidy_block(text: &str) -> String {
    let mut lines: Vec<&str> = text.lines().collect();
    while lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    lines.join("\n").trim_end().to_string()
}

/// Collapse runs of blank lines into one and trim the ends.
pub fn collapse_blank_lines(text: &str) -> String {
    EXTRA_BLANK_LINES_RE
        .replace_all(text, "\n\n")
        .trim()
        .to_string()
}

impl MarkdownDocument {
    /// Split on `###` headings.
    pub fn parse(text: &str) -> Self {
        Self::parse_at(text, 3)
    }

    /// Split on headings of exactly `level` hashes.
    pub fn parse_at(text: &str, level: usize) -> Self {
        let mut preamble: Vec<&str> = Vec::new();
        let mut sections: Vec<(String, Vec<&str>)> = Vec::new();

        for line in text.lines() {
            if let Some(heading) = heading_at(line, level) {
                sections.push((heading.to_string(), Vec::new()));
            } else if let Some((_, body)) = sections.last_mut() {
                body.push(line);
            } else {
                preamble.push(line);
            }
        }

        Self {
            level,
            preamble: tidy_block(&preamble.join("\n")),
            sections: sections
                .into_iter()
                .map(|(heading, body)| Section::new(heading, body.join("\n")))
                .collect(),
        }
    }

    pub fn render(&self) -> String {
        let marker = "#".repeat(self.level);
        let mut blocks = Vec::with_capacity(self.sections.len() + 1);
        if !self.preamble.trim().is_empty() {
            blocks.push(self.preamble.trim_end().to_string());
        }
        for s in &self.sections {
            let body = tidy_block(&s.body);
            if body.is_empty() {
                blocks.push(format!("{marker} {}", s.heading));
            } else {
                blocks.push(format!("{marker} {}\n\n{body}", s.heading));
            }
        }
        blocks.join("\n\n")
    }

    pub fn find(&self, pred: impl Fn(&Section) -> bool) -> Option<&Section> {
        self.sections.iter().find(|s| pred(s))
    }

    pub fn find_mut(&mut self, pred: impl Fn(&Section) -> bool) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| pred(s))
    }

    pub fn push(&mut self, section: Section) {
        self.sections.push(section);
    }
}

/// Lower-cased heading with dash variants and punctuation folded to spaces.
pub fn fold_heading(heading: &str) -> String {
    let folded: String = heading
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '&' {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    folded
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Tables
// ============================================================================

/// A markdown table found in a block of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBlock {
    /// Line range, end exclusive.
    pub lines: Range<usize>,
    pub header: String,
}

/// Tables are runs of `|` lines whose second line is a separator row.
pub fn find_tables(text: &str) -> Vec<TableBlock> {
    let lines: Vec<&str> = text.lines().collect();
    let mut out = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if !lines[i].trim_start().starts_with('|') {
            i += 1;
            continue;
        }
        let start = i;
        while i < lines.len() && lines[i].trim_start().starts_with('|') {
            i += 1;
        }
        if i - start >= 2 && TABLE_SEPARATOR_RE.is_match(lines[start + 1]) {
            out.push(TableBlock {
                lines: start..i,
                header: lines[start].trim().to_string(),
            });
        }
    }

    out
}

/// Remove the tables `drop` selects; surrounding blank lines are collapsed.
pub fn remove_tables(text: &str, mut drop: impl FnMut(usize, &TableBlock) -> bool) -> String {
    let tables = find_tables(text);
    if tables.is_empty() {
        return text.to_string();
    }

    let mut removed = vec![false; text.lines().count()];
    for (i, t) in tables.iter().enumerate() {
        if drop(i, t) {
            removed[t.lines.clone()].iter_mut().for_each(|r| *r = true);
        }
    }

    let kept: Vec<&str> = text
        .lines()
        .zip(&removed)
        .filter(|(_, r)| !**r)
        .map(|(l, _)| l)
        .collect();
    EXTRA_BLANK_LINES_RE
        .replace_all(&kept.join("\n"), "\n\n")
        .into_owned()
}
