//! Recursive-descent parser over the token stream from [`super::lexer`].
//!
//! The literal grammar in spec.md §4.5 requires every statement to begin
//! with `'@' Ident`, but the worked scenarios (e.g. `isA Rex Dog`) and
//! spec.md §3's description of anonymous statements going straight to the
//! KB make the `@name(:export)?` prefix optional in practice. This parser
//! treats it that way: a statement either starts with an optional
//! `@dest(:export)?` prefix, or goes straight into the operator/args body.
//!
//! Errors never abort parsing outright (following the teacher's
//! `parser::parse_program` "collect and continue" style): a malformed
//! statement is recorded and the parser resynchronizes at the next
//! plausible statement boundary (next NEWLINE at the current block depth).

use super::ast::{
    Compound, Expr, GraphDef, Literal, MacroDef, Program, Statement, StatementKind, TheoryDecl,
};
use super::lexer::{lex, Token, TokenKind};
use crate::error::SyntaxError;

/// Result of parsing: a best-effort AST plus any syntax errors encountered.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub program: Program,
    pub errors: Vec<SyntaxError>,
}

#[must_use]
pub fn parse(source: &str) -> ParseOutcome {
    let tokens = lex(source);
    let mut p = Parser {
        tokens,
        pos: 0,
        errors: Vec::new(),
    };
    let statements = p.parse_statements(0);
    ParseOutcome {
        program: Program::new(statements),
        errors: p.errors,
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<SyntaxError>,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map_or(&TokenKind::Eof, |t| &t.kind)
    }

    fn peek_pos(&self) -> (usize, usize) {
        self.tokens
            .get(self.pos)
            .map_or((0, 0), |t| (t.line, t.col))
    }

    fn advance(&mut self) -> Token {
        let t = self
            .tokens
            .get(self.pos)
            .cloned()
            .unwrap_or(Token {
                kind: TokenKind::Eof,
                line: 0,
                col: 0,
            });
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), TokenKind::Newline) {
            self.advance();
        }
    }

    fn error(&mut self, expected: &str) {
        let (line, col) = self.peek_pos();
        let found = self.peek().to_string();
        self.errors.push(SyntaxError {
            line,
            col,
            expected: expected.to_string(),
            found,
        });
    }

    /// Skips tokens until the next NEWLINE (consumed) or EOF, at the given
    /// block depth — used to recover after a malformed statement.
    fn synchronize(&mut self) {
        while !matches!(self.peek(), TokenKind::Newline | TokenKind::Eof) {
            self.advance();
        }
        if matches!(self.peek(), TokenKind::Newline) {
            self.advance();
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Option<String> {
        match self.peek().clone() {
            TokenKind::Ident(s) => {
                self.advance();
                Some(s)
            }
            _ => {
                self.error(expected);
                None
            }
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> bool {
        if std::mem::discriminant(self.peek()) == std::mem::discriminant(kind) {
            self.advance();
            true
        } else {
            self.error(expected);
            false
        }
    }

    /// Parses a run of statements until DEDENT (at nonzero depth) or EOF.
    fn parse_statements(&mut self, depth: usize) -> Vec<Statement> {
        let mut out = Vec::new();
        loop {
            self.skip_newlines();
            if self.at_eof() {
                break;
            }
            if depth > 0 && matches!(self.peek(), TokenKind::Dedent) {
                self.advance();
                break;
            }
            if depth > 0 && is_end_keyword(self.peek()) {
                break;
            }
            let before = self.pos;
            match self.parse_statement() {
                Some(stmt) => out.push(stmt),
                None => {
                    if self.pos == before {
                        self.synchronize();
                    }
                }
            }
        }
        out
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        let (line, col) = self.peek_pos();
        let mut dest = None;
        let mut export_name = None;
        if matches!(self.peek(), TokenKind::At) {
            self.advance();
            dest = self.expect_ident("identifier after '@'");
            if matches!(self.peek(), TokenKind::Colon) {
                self.advance();
                export_name = self.expect_ident("identifier after ':'");
            }
        }

        if let TokenKind::Ident(name) = self.peek().clone() {
            match name.as_str() {
                "macro" => return self.parse_macro(line, col, dest, export_name),
                "graph" => return self.parse_graph(line, col, dest, export_name),
                "theory" => return self.parse_theory(line, col, dest, export_name),
                _ => {}
            }
        }

        let operator = self.parse_expr()?;
        let mut args = Vec::new();
        while !matches!(self.peek(), TokenKind::Newline | TokenKind::Eof | TokenKind::Dedent) {
            match self.parse_expr() {
                Some(e) => args.push(e),
                None => break,
            }
        }
        if !matches!(self.peek(), TokenKind::Eof | TokenKind::Dedent) {
            self.expect(&TokenKind::Newline, "end of line");
        }
        Some(Statement {
            dest,
            export_name,
            kind: StatementKind::Body { operator, args },
            line,
            col,
        })
    }

    fn parse_expr(&mut self) -> Option<Expr> {
        match self.peek().clone() {
            TokenKind::Ident(s) => {
                self.advance();
                Some(Expr::Identifier(s))
            }
            TokenKind::Dollar => {
                self.advance();
                let name = self.expect_ident("identifier after '$'")?;
                Some(Expr::Reference(name))
            }
            TokenKind::Question => {
                self.advance();
                let name = self.expect_ident("identifier after '?'")?;
                Some(Expr::Hole(name))
            }
            TokenKind::Str(s) => {
                self.advance();
                Some(Expr::Literal(Literal::Str(s)))
            }
            TokenKind::Int(n) => {
                self.advance();
                Some(Expr::Literal(Literal::Int(n)))
            }
            TokenKind::Float(n) => {
                self.advance();
                Some(Expr::Literal(Literal::Float(n)))
            }
            TokenKind::LParen => {
                self.advance();
                let operator = self.parse_expr()?;
                let mut args = Vec::new();
                while !matches!(self.peek(), TokenKind::RParen | TokenKind::Newline | TokenKind::Eof) {
                    match self.parse_expr() {
                        Some(e) => args.push(e),
                        None => break,
                    }
                }
                self.expect(&TokenKind::RParen, "')'");
                Some(Expr::Compound(Box::new(Compound { operator, args })))
            }
            _ => {
                self.error("expression");
                None
            }
        }
    }

    fn parse_macro(
        &mut self,
        line: usize,
        col: usize,
        dest: Option<String>,
        export_name: Option<String>,
    ) -> Option<Statement> {
        self.advance(); // 'macro'
        let name = self.expect_ident("macro name")?;
        let mut params = Vec::new();
        while let TokenKind::Ident(_) = self.peek() {
            params.push(self.expect_ident("parameter name")?);
        }
        self.expect(&TokenKind::Newline, "end of line");
        self.expect(&TokenKind::Indent, "indented macro body");
        let body = self.parse_statements(1);
        self.expect_end();
        Some(Statement {
            dest,
            export_name,
            kind: StatementKind::Macro(MacroDef { name, params, body }),
            line,
            col,
        })
    }

    fn parse_graph(
        &mut self,
        line: usize,
        col: usize,
        dest: Option<String>,
        export_name: Option<String>,
    ) -> Option<Statement> {
        self.advance(); // 'graph'
        let name = self.expect_ident("graph name")?;
        let mut params = Vec::new();
        while let TokenKind::Ident(_) = self.peek() {
            params.push(self.expect_ident("parameter name")?);
        }
        self.expect(&TokenKind::Newline, "end of line");
        self.expect(&TokenKind::Indent, "indented graph body");
        let mut body = Vec::new();
        let mut return_expr = None;
        loop {
            self.skip_newlines();
            if matches!(self.peek(), TokenKind::Dedent) {
                self.advance();
                break;
            }
            if matches!(self.peek(), TokenKind::Ident(s) if s == "return") {
                self.advance();
                return_expr = self.parse_expr();
                if !matches!(self.peek(), TokenKind::Dedent) {
                    self.expect(&TokenKind::Newline, "end of line");
                }
                continue;
            }
            let before = self.pos;
            match self.parse_statement() {
                Some(s) => body.push(s),
                None => {
                    if self.pos == before {
                        self.synchronize();
                    }
                }
            }
        }
        self.expect_end();
        let return_expr = return_expr.unwrap_or_else(|| {
            self.error("'return' expression in graph body");
            Expr::Identifier(String::new())
        });
        Some(Statement {
            dest,
            export_name,
            kind: StatementKind::Graph(GraphDef {
                name,
                params,
                body,
                return_expr,
            }),
            line,
            col,
        })
    }

    fn parse_theory(
        &mut self,
        line: usize,
        col: usize,
        dest: Option<String>,
        export_name: Option<String>,
    ) -> Option<Statement> {
        self.advance(); // 'theory'
        let version = match self.peek().clone() {
            TokenKind::Int(n) => {
                self.advance();
                n
            }
            _ => {
                self.error("theory version number");
                0
            }
        };
        let name = self.expect_ident("theory name").unwrap_or_default();
        self.expect(&TokenKind::Newline, "end of line");
        self.expect(&TokenKind::Indent, "indented theory body");
        let body = self.parse_statements(1);
        self.expect_end();
        Some(Statement {
            dest,
            export_name,
            kind: StatementKind::Theory(TheoryDecl {
                version,
                name,
                body,
            }),
            line,
            col,
        })
    }

    fn expect_end(&mut self) {
        self.skip_newlines();
        match self.peek().clone() {
            TokenKind::Ident(s) if s == "end" => {
                self.advance();
            }
            _ => self.error("'end'"),
        }
        if !matches!(self.peek(), TokenKind::Eof) {
            self.expect(&TokenKind::Newline, "end of line");
        }
    }
}

fn is_end_keyword(kind: &TokenKind) -> bool {
    matches!(kind, TokenKind::Ident(s) if s == "end")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_anonymous_fact() {
        let out = parse("isA Rex Dog\n");
        assert!(out.errors.is_empty());
        assert_eq!(out.program.statements.len(), 1);
        let stmt = &out.program.statements[0];
        assert!(stmt.dest.is_none());
        match &stmt.kind {
            StatementKind::Body { operator, args } => {
                assert_eq!(*operator, Expr::Identifier("isA".into()));
                assert_eq!(args.len(), 2);
            }
            _ => panic!("expected body statement"),
        }
    }

    #[test]
    fn parses_named_statement_with_export() {
        let out = parse("@c1:pub isA Rex Dog\n");
        assert!(out.errors.is_empty());
        let stmt = &out.program.statements[0];
        assert_eq!(stmt.dest.as_deref(), Some("c1"));
        assert_eq!(stmt.export_name.as_deref(), Some("pub"));
    }

    #[test]
    fn parses_compound_expression() {
        let out = parse("prove (isA Rex ?x)\n");
        assert!(out.errors.is_empty());
        match &out.program.statements[0].kind {
            StatementKind::Body { args, .. } => {
                assert_eq!(args.len(), 1);
                assert!(matches!(args[0], Expr::Compound(_)));
            }
            _ => panic!("expected body statement"),
        }
    }

    #[test]
    fn parses_macro_block() {
        let out = parse("macro petOf a b\n  isA $a $b\nend\n");
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        match &out.program.statements[0].kind {
            StatementKind::Macro(m) => {
                assert_eq!(m.params, vec!["a".to_string(), "b".to_string()]);
                assert_eq!(m.body.len(), 1);
            }
            _ => panic!("expected macro"),
        }
    }

    #[test]
    fn parses_graph_block_with_return() {
        let out = parse("graph mk a\n  isA $a Dog\n  return $a\nend\n");
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        match &out.program.statements[0].kind {
            StatementKind::Graph(g) => {
                assert_eq!(g.body.len(), 1);
                assert_eq!(g.return_expr, Expr::Reference("a".into()));
            }
            _ => panic!("expected graph"),
        }
    }

    #[test]
    fn parses_theory_block() {
        let out = parse("theory 1 animals\n  isA Rex Dog\nend\n");
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        match &out.program.statements[0].kind {
            StatementKind::Theory(t) => {
                assert_eq!(t.version, 1);
                assert_eq!(t.name, "animals");
            }
            _ => panic!("expected theory"),
        }
    }

    #[test]
    fn malformed_statement_is_recorded_and_recovered() {
        let out = parse("@ \nisA Rex Dog\n");
        assert!(!out.errors.is_empty());
        assert_eq!(out.program.statements.len(), 1);
    }

    #[test]
    fn multiple_statements_parse_in_order() {
        let out = parse("isA Rex Dog\nisA Dog Mammal\n");
        assert!(out.errors.is_empty());
        assert_eq!(out.program.statements.len(), 2);
    }
}
