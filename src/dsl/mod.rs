//! # DSL pipeline (C5)
//!
//! Lexer -> indentation-sensitive parser -> AST. See spec.md §4.5 for the
//! (informal) grammar; `*.sys2` source files are UTF-8, line-oriented, and
//! indentation-significant.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::*;
pub use lexer::{lex, Token, TokenKind};
pub use parser::{parse, ParseOutcome};
