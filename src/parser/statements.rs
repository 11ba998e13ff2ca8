//! Statement parsing implementation
//!
//! This module handles parsing of all ents statement types:
//!
//! - Local declarations: `dword x = 42;`
//! - Control flow: `if`/`else if`/`else`, `while`, `switch`
//! - Jump statements: `return`, `break`, `continue`
//! - Compound statements: `{ ... }`
//! - Assignments and expression statements: `x = y;`, `buf[i] = 0;`, `x++;`, `f(x);`
//!
//! # Grammar
//!
//! ```text
//! statement ::= local_decl | if_stmt | while_stmt | switch_stmt
//!             | return_stmt | break_stmt | continue_stmt | block
//!             | assignment | expr_stmt
//! if_stmt   ::= "if" "(" expression ")" block ("else" "if" "(" expression ")" block)*
//!               ("else" block)?
//! switch    ::= "switch" "(" expression ")" "{" case* default? case* "}"
//! case      ::= "case" expression ":" statement*
//! ```
//!
//! Statements are recovered one at a time: a failing statement is recorded
//! and skipped, and the enclosing block carries on with the next one.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, ParseErrorKind, Parser};

impl Parser {
    /// Parse `{ statements }` in a fresh scope frame.
    pub(crate) fn parse_block(&mut self, ctx: &str) -> Result<Block, ParseError> {
        self.scopes.push();
        let block = self.parse_block_in_current_scope(ctx);
        self.scopes.pop();
        block
    }

    /// Parse `{ statements }` declaring locals into the innermost frame.
    pub(crate) fn parse_block_in_current_scope(&mut self, ctx: &str) -> Result<Block, ParseError> {
        let loc = self.current_location();
        self.expect_lbrace(ctx)?;
        let statements = self.parse_statement_list(|kind: TokenKind| kind == TokenKind::RBrace);
        self.expect_rbrace("to close block")?;

        Ok(Block {
            statements,
            location: loc,
        })
    }

    /// Parse statements until `stop` matches the next token or input ends.
    fn parse_statement_list(&mut self, stop: fn(TokenKind) -> bool) -> NodeList<Stmt> {
        let mut statements = NodeList::new();

        while !stop(self.peek_kind()) && !self.is_at_end() {
            let depth = self.scopes.depth();
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.record_error(err);
                    self.scopes.truncate(depth);
                    self.synchronize_statement();
                }
            }
        }

        statements
    }

    /// Parse a statement
    pub(crate) fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_location();
        let kind = self.peek_kind();

        if kind.is_type_keyword() || kind.is_attribute_keyword() {
            let attributes = self.parse_attributes();
            return Ok(Stmt::VarDecl(self.parse_local_declaration(attributes)?));
        }

        match kind {
            TokenKind::LBrace => Ok(Stmt::Block(self.parse_block("to open block")?)),
            TokenKind::If => {
                self.advance();
                self.parse_if_statement(loc)
            }
            TokenKind::While => {
                self.advance();
                self.parse_while_statement(loc)
            }
            TokenKind::Switch => {
                self.advance();
                self.parse_switch_statement(loc)
            }
            TokenKind::Return => {
                self.advance();
                self.parse_return_statement(loc)
            }
            TokenKind::Break => {
                self.advance();
                self.expect_semicolon("after 'break'")?;
                Ok(Stmt::Break { location: loc })
            }
            TokenKind::Continue => {
                self.advance();
                self.expect_semicolon("after 'continue'")?;
                Ok(Stmt::Continue { location: loc })
            }
            TokenKind::Ident => self.parse_identifier_statement(),
            TokenKind::Struct
            | TokenKind::Union
            | TokenKind::Enum
            | TokenKind::Typedef
            | TokenKind::Asm => Err(self.unsupported(kind)),
            _ => self.parse_expression_statement(),
        }
    }

    /// Parse a local declaration: `type name;` or `type name = expr;`
    fn parse_local_declaration(
        &mut self,
        attributes: NodeList<Attribute>,
    ) -> Result<VarDecl, ParseError> {
        let loc = self.current_location();
        let var_type = self.parse_type("for local variable")?;
        let (name, name_loc) = self.expect_identifier("for local variable name")?;

        if self.scopes.is_declared_in_current(&name) {
            return Err(ParseError::new(
                ParseErrorKind::RedeclaredIdentifier(name),
                name_loc,
            ));
        }

        let init = if self.match_token(TokenKind::Eq) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect_semicolon("after variable declaration")?;
        self.scopes.declare(&name);

        Ok(VarDecl {
            name,
            var_type,
            init,
            attributes,
            location: loc,
        })
    }

    /// A statement led by a bare identifier, resolved against the scope stack.
    fn parse_identifier_statement(&mut self) -> Result<Stmt, ParseError> {
        let name = self.peek().text.clone();

        if self.scopes.is_declared(&name) || self.functions.contains_key(&name) {
            // Increments, assignments, indexed assignments, member and UFCS
            // chains, and calls all start as an expression.
            return self.parse_expression_statement();
        }

        Err(ParseError::new(
            ParseErrorKind::UndeclaredName(name),
            self.current_location(),
        ))
    }

    /// Parse `expr;` or `place = expr;`
    fn parse_expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_location();
        let expr = self.parse_expression()?;

        if self.check(TokenKind::Eq) {
            if !expr.is_place() {
                return Err(ParseError::new(
                    ParseErrorKind::InvalidAssignmentTarget,
                    self.current_location(),
                ));
            }
            self.advance();
            let value = self.parse_expression()?;
            self.expect_semicolon("after assignment")?;
            return Ok(Stmt::Assign {
                target: expr,
                value,
                location: loc,
            });
        }

        self.expect_semicolon("after expression")?;
        Ok(Stmt::Expr(expr))
    }

    /// Parse `( condition ) block` of an `if` or `else if`.
    fn parse_if_clause(&mut self, loc: SourceLocation) -> Result<IfStmt, ParseError> {
        self.expect_lparen("after 'if'")?;
        let condition = self.parse_expression()?;
        self.expect_rparen("after if condition")?;
        let then_branch = self.parse_block("to open if body")?;

        Ok(IfStmt {
            condition,
            then_branch,
            else_branch: None,
            location: loc,
        })
    }

    /// Parse an if statement; `else if` links are appended to the end of the chain.
    fn parse_if_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let mut head = self.parse_if_clause(loc)?;

        while self.check(TokenKind::Else) {
            let else_loc = self.current_location();
            self.advance();

            if self.match_token(TokenKind::If) {
                let nested = self.parse_if_clause(else_loc)?;
                head.attach_else(ElseBranch::If(nested));
            } else {
                let block = self.parse_block("after 'else'")?;
                head.attach_else(ElseBranch::Block(block));
                break;
            }
        }

        Ok(Stmt::If(head))
    }

    /// Parse while loop: while (condition) { body }
    fn parse_while_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.expect_lparen("after 'while'")?;
        let condition = self.parse_expression()?;
        self.expect_rparen("after while condition")?;
        let body = self.parse_block("to open while body")?;

        Ok(Stmt::While {
            condition,
            body,
            location: loc,
        })
    }

    /// Parse switch statement; case bodies share the switch's frame.
    fn parse_switch_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.expect_lparen("after 'switch'")?;
        let scrutinee = self.parse_expression()?;
        self.expect_rparen("after switch expression")?;
        self.expect_lbrace("to open switch body")?;

        self.scopes.push();
        let clauses = self.parse_switch_clauses();
        self.scopes.pop();
        let (cases, default) = clauses?;

        self.expect_rbrace("to close switch body")?;

        Ok(Stmt::Switch {
            scrutinee,
            cases,
            default,
            location: loc,
        })
    }

    fn parse_switch_clauses(
        &mut self,
    ) -> Result<(NodeList<SwitchCase>, Option<DefaultCase>), ParseError> {
        let mut cases = NodeList::new();
        let mut default: Option<DefaultCase> = None;
        let clause_end = |kind: TokenKind| {
            matches!(kind, TokenKind::Case | TokenKind::Default | TokenKind::RBrace)
        };

        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            let loc = self.current_location();

            if self.match_token(TokenKind::Case) {
                let value = self.parse_expression()?;
                self.expect_token(TokenKind::Colon, "after case value")?;
                let body = self.parse_statement_list(clause_end);
                cases.push(SwitchCase {
                    value,
                    body,
                    location: loc,
                });
            } else if self.match_token(TokenKind::Default) {
                self.expect_token(TokenKind::Colon, "after 'default'")?;
                let body = self.parse_statement_list(clause_end);
                if default.is_some() {
                    self.record_error(ParseError::new(ParseErrorKind::MultipleDefaultCases, loc));
                } else {
                    default = Some(DefaultCase {
                        body,
                        location: loc,
                    });
                }
            } else {
                return Err(self.unexpected("'case' or 'default' in switch body"));
            }
        }

        Ok((cases, default))
    }

    /// Parse return statement: return [expr];
    fn parse_return_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        if self.match_token(TokenKind::Semicolon) {
            return Ok(Stmt::Return {
                value: None,
                location: loc,
            });
        }

        let value = self.parse_expression()?;
        self.expect_semicolon("after return value")?;

        Ok(Stmt::Return {
            value: Some(value),
            location: loc,
        })
    }
}
