//! Indentation-sensitive lexer.
//!
//! Tracks a column-width stack to emit `Indent`/`Dedent` tokens the way
//! Python-family lexers do. Comments (`#` to end of line) are stripped.
//! Strings allow backslash escapes. Errors never abort the whole lex: this
//! module only tokenizes — error recovery and reporting live in the parser,
//! following the teacher's `parser::parse_program` "collect, don't throw"
//! style (`strip_block_comments` + per-line recovery), generalized here to a
//! real token stream because indentation can't be recovered per-line.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    At,
    Dollar,
    Question,
    Colon,
    LParen,
    RParen,
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Newline,
    Indent,
    Dedent,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub col: usize,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::At => write!(f, "'@'"),
            TokenKind::Dollar => write!(f, "'$'"),
            TokenKind::Question => write!(f, "'?'"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::Ident(s) => write!(f, "identifier '{s}'"),
            TokenKind::Str(s) => write!(f, "string \"{s}\""),
            TokenKind::Int(n) => write!(f, "int {n}"),
            TokenKind::Float(n) => write!(f, "float {n}"),
            TokenKind::Newline => write!(f, "NEWLINE"),
            TokenKind::Indent => write!(f, "INDENT"),
            TokenKind::Dedent => write!(f, "DEDENT"),
            TokenKind::Eof => write!(f, "EOF"),
        }
    }
}

struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    indent_stack: Vec<usize>,
    at_line_start: bool,
    tokens: Vec<Token>,
    _source: &'a str,
}

/// Lex `source` into a flat token stream (INDENT/DEDENT already resolved).
#[must_use]
pub fn lex(source: &str) -> Vec<Token> {
    let mut lx = Lexer {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        col: 1,
        indent_stack: vec![0],
        at_line_start: true,
        tokens: Vec::new(),
        _source: source,
    };
    lx.run();
    lx.tokens
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn push(&mut self, kind: TokenKind, line: usize, col: usize) {
        self.tokens.push(Token { kind, line, col });
    }

    fn run(&mut self) {
        loop {
            if self.at_line_start {
                if !self.handle_line_start() {
                    continue;
                }
            }
            let Some(c) = self.peek() else {
                self.close_out();
                break;
            };
            let (line, col) = (self.line, self.col);
            match c {
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                '\n' => {
                    self.advance();
                    self.push(TokenKind::Newline, line, col);
                    self.at_line_start = true;
                }
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '@' => {
                    self.advance();
                    self.push(TokenKind::At, line, col);
                }
                '$' => {
                    self.advance();
                    self.push(TokenKind::Dollar, line, col);
                }
                '?' => {
                    self.advance();
                    self.push(TokenKind::Question, line, col);
                }
                ':' => {
                    self.advance();
                    self.push(TokenKind::Colon, line, col);
                }
                '(' => {
                    self.advance();
                    self.push(TokenKind::LParen, line, col);
                }
                ')' => {
                    self.advance();
                    self.push(TokenKind::RParen, line, col);
                }
                '"' => self.lex_string(line, col),
                c if c.is_ascii_digit() || (c == '-' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit())) => {
                    self.lex_number(line, col);
                }
                c if is_ident_start(c) => self.lex_ident(line, col),
                _ => {
                    // Unknown character: consume it as a single-char ident
                    // token so the parser can report a precise "found" value
                    // rather than the lexer silently swallowing input.
                    self.advance();
                    self.push(TokenKind::Ident(c.to_string()), line, col);
                }
            }
        }
    }

    /// Consumes leading whitespace of a logical line, emits INDENT/DEDENT,
    /// and skips blank/comment-only lines entirely (they carry no
    /// indentation information). Returns `false` if the line was blank and
    /// the outer loop should re-enter at the next line start.
    fn handle_line_start(&mut self) -> bool {
        let start = self.pos;
        let mut width = 0usize;
        while let Some(c) = self.peek() {
            match c {
                ' ' => {
                    width += 1;
                    self.advance();
                }
                '\t' => {
                    width += 8 - (width % 8);
                    self.advance();
                }
                _ => break,
            }
        }
        match self.peek() {
            None => {
                self.at_line_start = false;
                return true;
            }
            Some('\n') | Some('#') => {
                // Blank or comment-only line: consume it, stay at line start.
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
                if self.peek() == Some('\n') {
                    self.advance();
                }
                let _ = start;
                return false;
            }
            _ => {}
        }
        let current = *self.indent_stack.last().unwrap();
        let line = self.line;
        if width > current {
            self.indent_stack.push(width);
            self.push(TokenKind::Indent, line, 1);
        } else {
            while width < *self.indent_stack.last().unwrap() {
                self.indent_stack.pop();
                self.push(TokenKind::Dedent, line, 1);
            }
        }
        self.at_line_start = false;
        true
    }

    fn close_out(&mut self) {
        if !matches!(self.tokens.last().map(|t| &t.kind), Some(TokenKind::Newline)) {
            self.push(TokenKind::Newline, self.line, self.col);
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.push(TokenKind::Dedent, self.line, self.col);
        }
        self.push(TokenKind::Eof, self.line, self.col);
    }

    fn lex_string(&mut self, line: usize, col: usize) {
        self.advance(); // opening quote
        let mut s = String::new();
        loop {
            match self.advance() {
                None => break,
                Some('"') => break,
                Some('\\') => {
                    if let Some(escaped) = self.advance() {
                        s.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            '"' => '"',
                            '\\' => '\\',
                            other => other,
                        });
                    }
                }
                Some(c) => s.push(c),
            }
        }
        self.push(TokenKind::Str(s), line, col);
    }

    fn lex_number(&mut self, line: usize, col: usize) {
        let mut s = String::new();
        if self.peek() == Some('-') {
            s.push(self.advance().unwrap());
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                s.push(self.advance().unwrap());
            } else {
                break;
            }
        }
        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            s.push(self.advance().unwrap());
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    s.push(self.advance().unwrap());
                } else {
                    break;
                }
            }
        }
        if is_float {
            self.push(TokenKind::Float(s.parse().unwrap_or(0.0)), line, col);
        } else {
            self.push(TokenKind::Int(s.parse().unwrap_or(0)), line, col);
        }
    }

    fn lex_ident(&mut self, line: usize, col: usize) {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                s.push(self.advance().unwrap());
            } else {
                break;
            }
        }
        self.push(TokenKind::Ident(s), line, col);
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
