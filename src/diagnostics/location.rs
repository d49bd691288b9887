//! Source location tracking
//!
//! Maps dotted/bracketed field paths (`content[0].blocks[2].type`) back to
//! key positions in a stored document, so validators can point at the line a
//! problem originates from. Unresolvable paths degrade to the zero location;
//! a diagnostic still renders, just without a position.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A position within a source document
///
/// Line and column are 1-based; `0, 0` means "position unknown".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Location for a document whose exact position is unknown
    pub fn zero(file: impl Into<String>) -> Self {
        Self::new(file, 0, 0)
    }

    pub fn is_zero(&self) -> bool {
        self.line == 0 && self.column == 0
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            write!(f, "{}", self.file)
        } else {
            write!(f, "{}:{}:{}", self.file, self.line, self.column)
        }
    }
}

/// Position index over one stored JSON document
///
/// Built by a single scan of the document text. Object members are indexed
/// at their key position, array elements at their value position, using the
/// same `a.b[0].c` path syntax the validators emit.
#[derive(Debug, Clone)]
pub struct DocumentIndex {
    file: String,
    positions: HashMap<String, (u32, u32)>,
}

impl DocumentIndex {
    /// Index a document's JSON text
    ///
    /// Malformed input is tolerated: scanning stops at the first confusion
    /// and the paths indexed so far remain usable.
    pub fn new(file: impl Into<String>, text: &str) -> Self {
        let mut scanner = Scanner::new(text);
        let mut positions = HashMap::new();
        scanner.skip_ws();
        scanner.scan_value("", &mut positions);
        Self {
            file: file.into(),
            positions,
        }
    }

    /// Resolve a field path, degrading to the zero location
    pub fn resolve(&self, path: &str) -> SourceLocation {
        self.find(path)
            .unwrap_or_else(|| SourceLocation::zero(&self.file))
    }

    /// Resolve a field path, if it exists in the document
    pub fn find(&self, path: &str) -> Option<SourceLocation> {
        self.positions
            .get(path)
            .map(|&(line, column)| SourceLocation::new(&self.file, line, column))
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Character scanner with line/column bookkeeping
struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
}

impl Scanner {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    /// Scan one JSON value at `path`, indexing every member underneath
    fn scan_value(&mut self, path: &str, positions: &mut HashMap<String, (u32, u32)>) {
        self.skip_ws();
        match self.peek() {
            Some('{') => {
                self.bump();
                loop {
                    self.skip_ws();
                    match self.peek() {
                        Some('}') => {
                            self.bump();
                            break;
                        }
                        Some('"') => {
                            let key_pos = (self.line, self.column);
                            let key = self.scan_string();
                            let child = if path.is_empty() {
                                key
                            } else {
                                format!("{}.{}", path, key)
                            };
                            positions.insert(child.clone(), key_pos);
                            self.skip_ws();
                            if self.peek() == Some(':') {
                                self.bump();
                            } else {
                                return; // malformed, keep what we have
                            }
                            self.scan_value(&child, positions);
                            self.skip_ws();
                            if self.peek() == Some(',') {
                                self.bump();
                            }
                        }
                        _ => return,
                    }
                }
            }
            Some('[') => {
                self.bump();
                let mut index = 0usize;
                loop {
                    self.skip_ws();
                    match self.peek() {
                        Some(']') => {
                            self.bump();
                            break;
                        }
                        Some(_) => {
                            let child = format!("{}[{}]", path, index);
                            positions.insert(child.clone(), (self.line, self.column));
                            self.scan_value(&child, positions);
                            self.skip_ws();
                            if self.peek() == Some(',') {
                                self.bump();
                            }
                            index += 1;
                        }
                        None => return,
                    }
                }
            }
            Some('"') => {
                self.scan_string();
            }
            Some(_) => {
                // number, boolean, or null
                while matches!(self.peek(), Some(c) if !c.is_whitespace() && c != ',' && c != '}' && c != ']')
                {
                    self.bump();
                }
            }
            None => {}
        }
    }

    /// Scan a JSON string literal, returning its unescaped content
    fn scan_string(&mut self) -> String {
        let mut out = String::new();
        if self.peek() != Some('"') {
            return out;
        }
        self.bump();
        while let Some(ch) = self.bump() {
            match ch {
                '"' => break,
                '\\' => {
                    if let Some(esc) = self.bump() {
                        match esc {
                            'n' => out.push('\n'),
                            't' => out.push('\t'),
                            'r' => out.push('\r'),
                            'u' => {
                                // keep the raw escape; paths never contain them
                                out.push_str("\\u");
                            }
                            other => out.push(other),
                        }
                    }
                }
                other => out.push(other),
            }
        }
        out
    }
}
