//! Tokenizer - the lexical analyzer for the declaration subset.
//!
//! Turns source text into a flat token stream. The tokenizer is
//! deliberately fault-tolerant: it never fails, and characters it does
//! not recognize are skipped so that partial or malformed sources still
//! produce a usable stream for the parser and the import extractor.
//!
//! Two pieces of trivia survive tokenization because downstream phases
//! need them:
//! - `/** ... */` doc comments become a single [`TokenKind::JsDoc`]
//!   token carrying the trimmed comment body.
//! - Line breaks become [`TokenKind::Newline`] tokens, used to pair doc
//!   comments with the declaration that follows them.
//!
//! Ordinary `//` and `/* ... */` comments are discarded.

use serde::Serialize;
use std::fmt;

/// Keywords of the declaration subset.
const KEYWORDS: &[&str] = &[
    "interface",
    "type",
    "enum",
    "export",
    "extends",
    "const",
    "readonly",
    "import",
    "from",
    "as",
    "declare",
    "namespace",
    "module",
];

/// Built-in primitive type names (plus the boolean literals, which the
/// parser turns into literal types).
const PRIMITIVES: &[&str] = &[
    "string",
    "number",
    "boolean",
    "null",
    "undefined",
    "any",
    "unknown",
    "never",
    "void",
    "object",
    "bigint",
    "true",
    "false",
];

/// Characters that tokenize as single-character punctuation.
const PUNCTUATION: &str = "{}()[]:;,?|&=<>.*";

/// The classification of a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Keyword,
    Primitive,
    Identifier,
    String,
    Number,
    Punctuation,
    JsDoc,
    Newline,
    Eof,
}

impl TokenKind {
    /// Human-readable name used in parse errors.
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Keyword => "keyword",
            TokenKind::Primitive => "primitive",
            TokenKind::Identifier => "identifier",
            TokenKind::String => "string",
            TokenKind::Number => "number",
            TokenKind::Punctuation => "punctuation",
            TokenKind::JsDoc => "doc comment",
            TokenKind::Newline => "newline",
            TokenKind::Eof => "end of input",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single token with its source position (1-based line and column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    fn new(kind: TokenKind, value: impl Into<String>, line: usize, column: usize) -> Self {
        Token {
            kind,
            value: value.into(),
            line,
            column,
        }
    }

    /// Check for a punctuation token with the given value.
    pub fn is_punct(&self, value: &str) -> bool {
        self.kind == TokenKind::Punctuation && self.value == value
    }

    /// Check for a keyword token with the given value.
    pub fn is_keyword(&self, value: &str) -> bool {
        self.kind == TokenKind::Keyword && self.value == value
    }
}

/// Tokenize a full source string. Always succeeds and always ends the
/// stream with exactly one `eof` token.
pub fn tokenize(source: &str) -> Vec<Token> {
    Tokenizer::new(source).run()
}

struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
}

impl Tokenizer {
    fn new(source: &str) -> Self {
        Tokenizer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Token> {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '\n' => {
                    let (line, column) = (self.line, self.column);
                    self.advance();
                    self.push(TokenKind::Newline, "\n", line, column);
                }
                '/' => self.scan_slash(),
                '"' | '\'' | '`' => self.scan_string(c),
                '-' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => self.scan_number(),
                c if c.is_ascii_digit() => self.scan_number(),
                c if is_identifier_start(c) => self.scan_word(),
                c if PUNCTUATION.contains(c) => {
                    let (line, column) = (self.line, self.column);
                    self.advance();
                    self.push(TokenKind::Punctuation, c.to_string(), line, column);
                }
                _ => {
                    // Unknown character: skip it rather than failing.
                    self.advance();
                }
            }
        }
        let (line, column) = (self.line, self.column);
        self.push(TokenKind::Eof, "", line, column);
        self.tokens
    }

    /// Dispatch on `/`: doc comment, block comment, line comment, or a
    /// stray slash (skipped, `/` is not punctuation in this grammar).
    fn scan_slash(&mut self) {
        let (line, column) = (self.line, self.column);
        if self.peek_at(1) == Some('*') {
            // `/**/` is an empty block comment, not a doc comment.
            let is_doc = self.peek_at(2) == Some('*') && self.peek_at(3) != Some('/');
            self.advance(); // '/'
            self.advance(); // '*'
            if is_doc {
                self.advance(); // second '*'
            }
            let mut body = String::new();
            while let Some(c) = self.peek() {
                if c == '*' && self.peek_at(1) == Some('/') {
                    self.advance();
                    self.advance();
                    break;
                }
                body.push(c);
                self.advance();
            }
            if is_doc {
                self.push(TokenKind::JsDoc, body.trim().to_string(), line, column);
            }
        } else if self.peek_at(1) == Some('/') {
            // Line comment: discard up to (not including) the newline so
            // the newline token still fires.
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                self.advance();
            }
        } else {
            self.advance();
        }
    }

    /// Scan a quoted string. All three quote styles are accepted and a
    /// backslash escapes exactly one following character. Template
    /// strings are read as plain text; interpolation is not lexed.
    fn scan_string(&mut self, quote: char) {
        let (line, column) = (self.line, self.column);
        self.advance();
        let mut value = String::new();
        while let Some(c) = self.peek() {
            if c == quote {
                self.advance();
                break;
            }
            if c == '\\' {
                self.advance();
                if let Some(escaped) = self.peek() {
                    value.push(escaped);
                    self.advance();
                }
                continue;
            }
            value.push(c);
            self.advance();
        }
        self.push(TokenKind::String, value, line, column);
    }

    fn scan_number(&mut self) {
        let (line, column) = (self.line, self.column);
        let mut value = String::new();
        if self.peek() == Some('-') {
            value.push('-');
            self.advance();
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                value.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) {
            value.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    value.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.push(TokenKind::Number, value, line, column);
    }

    fn scan_word(&mut self) {
        let (line, column) = (self.line, self.column);
        let mut value = String::new();
        while let Some(c) = self.peek() {
            if is_identifier_part(c) {
                value.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let kind = if KEYWORDS.contains(&value.as_str()) {
            TokenKind::Keyword
        } else if PRIMITIVES.contains(&value.as_str()) {
            TokenKind::Primitive
        } else {
            TokenKind::Identifier
        };
        self.push(kind, value, line, column);
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(c) = self.chars.get(self.pos) {
            if *c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.pos += 1;
        }
    }

    fn push(&mut self, kind: TokenKind, value: impl Into<String>, line: usize, column: usize) {
        self.tokens.push(Token::new(kind, value, line, column));
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
