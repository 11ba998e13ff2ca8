//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including error types, helper methods, error recovery, and the main parse
//! entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `declarations`: top-level declarations, function signatures and types
//! - `statements`: blocks and statements (if, while, switch, ...)
//! - `expressions`: expressions with precedence climbing and UFCS rewriting
//!
//! # Error recovery
//!
//! Grammar errors do not abort the parse. The failing statement or declaration
//! is recorded, the scope stack is unwound to the depth it had when that
//! construct started, and the token stream is skipped to a synchronization
//! point. All recorded errors are returned together at the end.

use log::debug;
use rustc_hash::FxHashMap;

use crate::diagnostic::{Diagnostic, Module, Severity};
use crate::parser::ast::*;
use crate::parser::lexer::{Token, TokenKind};
use crate::parser::scope::ScopeStack;
use crate::source::SourceHandle;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("Expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("Redeclaration of '{0}'")]
    RedeclaredIdentifier(String),
    #[error("Use of undeclared name '{0}'")]
    UndeclaredName(String),
    #[error("Operand of '{0}' must be a variable")]
    InvalidOperand(&'static str),
    #[error("Multiple default cases in switch")]
    MultipleDefaultCases,
    #[error("Invalid integer literal '{0}'")]
    InvalidLiteral(String),
    #[error("Left-hand side of assignment is not assignable")]
    InvalidAssignmentTarget,
    #[error("{0} declarations are not supported")]
    Unsupported(&'static str),
}

/// Parser error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{location}: {kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub location: SourceLocation,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::at(
            Severity::Error,
            Module::Parser,
            &self.location,
            self.kind.to_string(),
        )
    }
}

/// Parse a token stream into a translation unit.
pub fn parse(tokens: Vec<Token>) -> Result<TranslationUnit, Vec<ParseError>> {
    Parser::from_tokens(tokens).parse_translation_unit()
}

/// Recursive descent parser for ents
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    pub(crate) scopes: ScopeStack,
    /// Known function names; `true` once a body has been parsed.
    pub(crate) functions: FxHashMap<String, bool>,
    pub(crate) errors: Vec<ParseError>,
}

impl Parser {
    /// Create a parser over `tokens`, appending an end-of-file token if missing.
    pub fn from_tokens(mut tokens: Vec<Token>) -> Self {
        if !tokens.last().map_or(false, |t| t.is(TokenKind::Eof)) {
            let location = match tokens.last() {
                Some(token) => token.location.clone(),
                None => SourceLocation::new(SourceHandle::new("<empty>", ""), 1, 1),
            };
            tokens.push(Token::new(TokenKind::Eof, "", location));
        }

        Self {
            tokens,
            position: 0,
            scopes: ScopeStack::new(),
            functions: FxHashMap::default(),
            errors: Vec::new(),
        }
    }

    /// Parse the entire token stream (top-level declarations)
    pub fn parse_translation_unit(mut self) -> Result<TranslationUnit, Vec<ParseError>> {
        let mut unit = TranslationUnit::new(self.current_location());

        while !self.is_at_end() {
            let depth = self.scopes.depth();
            match self.parse_top_level_declaration() {
                Ok(decl) => unit.declarations.push(decl),
                Err(err) => {
                    self.record_error(err);
                    self.scopes.truncate(depth);
                    self.synchronize_top_level();
                }
            }
        }

        if self.errors.is_empty() {
            Ok(unit)
        } else {
            Err(self.errors)
        }
    }

    // ===== Error recovery =====

    pub(crate) fn record_error(&mut self, err: ParseError) {
        debug!("recovering from parse error: {}", err);
        self.errors.push(err);
    }

    /// Skip to just past the next `;` at the current nesting level, or to the
    /// `}` closing the enclosing block (left unconsumed).
    pub(crate) fn synchronize_statement(&mut self) {
        let mut depth = 0usize;

        while !self.is_at_end() {
            match self.peek_kind() {
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::RBrace if depth == 0 => return,
                TokenKind::RBrace => {
                    depth -= 1;
                    self.advance();
                    if depth == 0 {
                        return;
                    }
                    continue;
                }
                TokenKind::LBrace => depth += 1,
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip past the end of the current top-level declaration.
    pub(crate) fn synchronize_top_level(&mut self) {
        let mut depth = 0usize;

        while !self.is_at_end() {
            let kind = self.peek_kind();
            self.advance();
            match kind {
                TokenKind::Semicolon if depth == 0 => return,
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.match_token(TokenKind::Semicolon);
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    // ===== Helper methods =====

    pub(crate) fn is_type_keyword(&self) -> bool {
        self.peek_kind().is_type_keyword()
    }

    pub(crate) fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    pub(crate) fn check_ahead(&self, n: usize, kind: TokenKind) -> bool {
        self.peek_ahead(n).map_or(false, |t| t.is(kind))
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.peek_kind() == TokenKind::Eof
    }

    pub(crate) fn peek(&self) -> &Token {
        // `from_tokens` guarantees a trailing Eof, which `advance` never passes.
        &self.tokens[self.position]
    }

    pub(crate) fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location.clone()
    }

    /// Error for a missing token, reported at the current token.
    pub(crate) fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        ParseError::new(
            ParseErrorKind::UnexpectedToken {
                expected: expected.into(),
                found: self.peek().to_string(),
            },
            self.current_location(),
        )
    }

    pub(crate) fn expect_token(&mut self, kind: TokenKind, ctx: &str) -> Result<(), ParseError> {
        if self.match_token(kind) {
            Ok(())
        } else {
            Err(self.unexpected(format!("{kind} {ctx}")))
        }
    }

    pub(crate) fn expect_lparen(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(TokenKind::LParen, ctx)
    }

    pub(crate) fn expect_rparen(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(TokenKind::RParen, ctx)
    }

    pub(crate) fn expect_lbrace(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(TokenKind::LBrace, ctx)
    }

    pub(crate) fn expect_rbrace(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(TokenKind::RBrace, ctx)
    }

    pub(crate) fn expect_semicolon(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(TokenKind::Semicolon, ctx)
    }

    pub(crate) fn expect_identifier(
        &mut self,
        ctx: &str,
    ) -> Result<(String, SourceLocation), ParseError> {
        if self.check(TokenKind::Ident) {
            let token = self.advance();
            Ok((token.text.clone(), token.location.clone()))
        } else {
            Err(self.unexpected(format!("identifier {ctx}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::scan;

    fn parse_source(source: &str) -> Result<TranslationUnit, Vec<ParseError>> {
        let tokens = scan(&SourceHandle::new("test.e", source)).expect("Lexing failed");
        parse(tokens)
    }

    fn error_kinds(source: &str) -> Vec<ParseErrorKind> {
        parse_source(source)
            .expect_err("Parsing should fail")
            .into_iter()
            .map(|e| e.kind)
            .collect()
    }

    #[test]
    fn test_parse_simple_function() {
        let unit = parse_source("fn main() -> dword { return 0; };").unwrap();

        assert_eq!(unit.declarations.len(), 1);
        match &unit.declarations[0] {
            Decl::FunctionDef(def) => {
                assert_eq!(def.decl.name, "main");
                assert_eq!(def.decl.params.len(), 0);
                assert_eq!(def.decl.return_type.base, BaseType::DWord);
                assert_eq!(def.body.statements.len(), 1);
            }
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_empty_input() {
        let unit = parse_source("  // nothing here\n").unwrap();
        assert!(unit.declarations.is_empty());
        assert!(parse(Vec::new()).unwrap().declarations.is_empty());
    }

    #[test]
    fn test_errors_accumulate_across_statements() {
        let kinds = error_kinds(
            "fn main() -> dword {\n  y = 1;\n  dword x = ;\n  z++;\n  return 0;\n}",
        );

        assert_eq!(kinds.len(), 3);
        assert_eq!(kinds[0], ParseErrorKind::UndeclaredName("y".to_string()));
        assert!(matches!(kinds[1], ParseErrorKind::UnexpectedToken { .. }));
        assert_eq!(kinds[2], ParseErrorKind::UndeclaredName("z".to_string()));
    }

    #[test]
    fn test_errors_accumulate_across_declarations() {
        let kinds = error_kinds("dword a = ;\nbyte b;\nbyte b;\nfn f( { };\nword c;");

        assert_eq!(kinds.len(), 3);
        assert!(matches!(kinds[0], ParseErrorKind::UnexpectedToken { .. }));
        assert_eq!(kinds[1], ParseErrorKind::RedeclaredIdentifier("b".to_string()));
        assert!(matches!(kinds[2], ParseErrorKind::UnexpectedToken { .. }));
    }

    #[test]
    fn test_recovery_unwinds_scopes() {
        // The broken definition must not leave its parameter frame behind.
        let kinds = error_kinds("fn f(dword a, ) { };\nfn g() { a = 1; };");
        assert_eq!(kinds.len(), 2);
        assert_eq!(kinds[1], ParseErrorKind::UndeclaredName("a".to_string()));
    }

    #[test]
    fn test_error_message_format() {
        let errors = parse_source("fn main() { return 0 }").unwrap_err();
        assert_eq!(
            errors[0].kind.to_string(),
            "Expected ';' after return value, found '}'"
        );
        assert_eq!(errors[0].location.line, 1);
        assert_eq!(errors[0].location.column, 22);
    }

    #[test]
    fn test_diagnostic_from_error() {
        let errors = parse_source("dword x;\ndword x;").unwrap_err();
        let diag = errors[0].to_diagnostic();

        assert_eq!(diag.module.tag(), "parser");
        assert_eq!(diag.line, 2);
        assert_eq!(diag.source_line.as_deref(), Some("dword x;"));
        assert_eq!(diag.message, "Redeclaration of 'x'");
    }
}
