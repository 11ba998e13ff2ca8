//! Expression parsing implementation
//!
//! This module handles parsing of ents expressions using precedence climbing
//! for binary operators and recursive descent for other expression forms.
//!
//! # Supported Expressions
//!
//! - Literals: decimal, hexadecimal and binary integers, characters, strings
//! - Variables and calls, checked against the scope stack and known functions
//! - Binary operators: `* /`, `+ -`, comparisons, `&`, `|`, `&&`, `||`
//! - Unary operators: `+`, `-`, `!`, `&`, `*`, `++`, `--`
//! - Postfix: `[]`, `.`, `++`, `--`
//!
//! # Uniform Function Call Syntax
//!
//! `base.name(args)` is rewritten to `name(base, args)` while parsing, so the
//! tree never distinguishes the two spellings.
//!
//! # Precedence
//!
//! | level | operators           |
//! |-------|---------------------|
//! | 1     | `\|\|`              |
//! | 2     | `&&`                |
//! | 3     | `\|`                |
//! | 4     | `&`                 |
//! | 5     | `==` `!=`           |
//! | 6     | `<` `<=` `>` `>=`   |
//! | 7     | `+` `-`             |
//! | 8     | `*` `/`             |
//!
//! `&&` and `||` are not tokens: two adjacent `&` or `|` tokens form them.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, ParseErrorKind, Parser};

impl Parser {
    /// Parse expression (top-level entry point)
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(1)
    }

    /// Binary operator at the current position: operator, precedence, token count.
    fn binary_operator(&self) -> Option<(BinOp, u8, usize)> {
        let op = match self.peek_kind() {
            TokenKind::Pipe if self.is_doubled(TokenKind::Pipe) => (BinOp::Or, 1, 2),
            TokenKind::Amp if self.is_doubled(TokenKind::Amp) => (BinOp::And, 2, 2),
            TokenKind::Pipe => (BinOp::BitOr, 3, 1),
            TokenKind::Amp => (BinOp::BitAnd, 4, 1),
            TokenKind::EqEq => (BinOp::Eq, 5, 1),
            TokenKind::NotEq => (BinOp::Ne, 5, 1),
            TokenKind::Lt => (BinOp::Lt, 6, 1),
            TokenKind::Le => (BinOp::Le, 6, 1),
            TokenKind::Gt => (BinOp::Gt, 6, 1),
            TokenKind::Ge => (BinOp::Ge, 6, 1),
            TokenKind::Plus => (BinOp::Add, 7, 1),
            TokenKind::Minus => (BinOp::Sub, 7, 1),
            TokenKind::Star => (BinOp::Mul, 8, 1),
            TokenKind::Slash => (BinOp::Div, 8, 1),
            _ => return None,
        };
        Some(op)
    }

    /// Whether the current token is immediately followed by another `kind`.
    fn is_doubled(&self, kind: TokenKind) -> bool {
        match self.peek_ahead(1) {
            Some(next) if next.is(kind) => {
                let here = &self.peek().location;
                next.location.source == here.source
                    && next.location.line == here.line
                    && next.location.column == here.column + 1
            }
            _ => false,
        }
    }

    /// Parse binary operators at or above `min_precedence` (left-associative)
    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        while let Some((op, precedence, width)) = self.binary_operator() {
            if precedence < min_precedence {
                break;
            }

            let loc = self.current_location();
            for _ in 0..width {
                self.advance();
            }

            let right = self.parse_binary(precedence + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse unary (+ - ! & * ++ --)
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();

        let op = match self.peek_kind() {
            TokenKind::Plus => UnOp::Plus,
            TokenKind::Minus => UnOp::Neg,
            TokenKind::Bang => UnOp::Not,
            TokenKind::Amp => UnOp::AddrOf,
            TokenKind::Star => UnOp::Deref,
            TokenKind::PlusPlus => UnOp::PreInc,
            TokenKind::MinusMinus => UnOp::PreDec,
            _ => return self.parse_postfix(),
        };
        self.advance();

        let operand = self.parse_unary()?;
        self.make_unary(op, operand, loc)
    }

    /// Build a unary node, rejecting increments of anything but a variable.
    fn make_unary(&self, op: UnOp, operand: Expr, loc: SourceLocation) -> Result<Expr, ParseError> {
        if op.needs_variable() && operand.as_variable().is_none() {
            return Err(ParseError::new(
                ParseErrorKind::InvalidOperand(op.symbol()),
                loc,
            ));
        }

        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            location: loc,
        })
    }

    /// Parse postfix (++ -- [] . and UFCS calls)
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            let loc = self.current_location();

            match self.peek_kind() {
                TokenKind::PlusPlus => {
                    self.advance();
                    expr = self.make_unary(UnOp::PostInc, expr, loc)?;
                }
                TokenKind::MinusMinus => {
                    self.advance();
                    expr = self.make_unary(UnOp::PostDec, expr, loc)?;
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect_token(TokenKind::RBracket, "after array index")?;
                    expr = Expr::Index {
                        base: Box::new(expr),
                        index: Box::new(index),
                        location: loc,
                    };
                }
                TokenKind::Dot => {
                    self.advance();
                    let (member, member_loc) = self.expect_identifier("after '.'")?;

                    if self.check(TokenKind::LParen) {
                        // UFCS: the receiver becomes the first argument
                        self.ensure_function(&member, &member_loc)?;
                        self.advance();
                        let mut args = NodeList::new();
                        args.push(expr);
                        for arg in self.parse_argument_list()? {
                            args.push(arg);
                        }
                        self.expect_rparen("after function arguments")?;

                        expr = Expr::Call {
                            name: member,
                            args,
                            location: member_loc,
                        };
                    } else {
                        expr = Expr::Member {
                            base: Box::new(expr),
                            member,
                            location: loc,
                        };
                    }
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn ensure_function(&self, name: &str, loc: &SourceLocation) -> Result<(), ParseError> {
        if self.functions.contains_key(name) {
            Ok(())
        } else {
            Err(ParseError::new(
                ParseErrorKind::UndeclaredName(name.to_string()),
                loc.clone(),
            ))
        }
    }

    /// Parse argument list: (expr, expr, ...)
    fn parse_argument_list(&mut self) -> Result<NodeList<Expr>, ParseError> {
        let mut args = NodeList::new();

        if self.check(TokenKind::RParen) {
            return Ok(args);
        }

        loop {
            args.push(self.parse_expression()?);

            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }

        Ok(args)
    }

    /// Parse primary (literals, variables, calls, parenthesized expressions)
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();

        match self.peek_kind() {
            TokenKind::IntLiteral => {
                let text = self.advance().text.clone();
                let (value, radix) = parse_integer(&text).ok_or_else(|| {
                    ParseError::new(ParseErrorKind::InvalidLiteral(text.clone()), loc.clone())
                })?;
                Ok(Expr::IntLiteral {
                    value,
                    radix,
                    location: loc,
                })
            }
            TokenKind::CharLiteral => {
                let value = self.advance().text.chars().next().unwrap_or('\0');
                Ok(Expr::CharLiteral {
                    value,
                    location: loc,
                })
            }
            TokenKind::StringLiteral => {
                let value = self.advance().text.clone();
                Ok(Expr::StringLiteral {
                    value,
                    location: loc,
                })
            }
            TokenKind::Ident => {
                let name = self.advance().text.clone();

                if self.check(TokenKind::LParen) {
                    self.ensure_function(&name, &loc)?;
                    self.advance();
                    let args = self.parse_argument_list()?;
                    self.expect_rparen("after function arguments")?;
                    return Ok(Expr::Call {
                        name,
                        args,
                        location: loc,
                    });
                }

                if !self.scopes.is_declared(&name) && !self.functions.contains_key(&name) {
                    return Err(ParseError::new(ParseErrorKind::UndeclaredName(name), loc));
                }
                Ok(Expr::Variable {
                    name,
                    location: loc,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_rparen("after expression")?;
                Ok(expr)
            }
            _ => Err(self.unexpected("expression")),
        }
    }
}

/// Convert an integer literal spelling (`42`, `0x2A`, `0b101010`) to its value.
pub(crate) fn parse_integer(text: &str) -> Option<(u64, Radix)> {
    let (digits, radix) = match text.get(..2) {
        Some("0x" | "0X") => (&text[2..], Radix::Hexadecimal),
        Some("0b" | "0B") => (&text[2..], Radix::Binary),
        _ => (text, Radix::Decimal),
    };

    u64::from_str_radix(digits, radix.base())
        .ok()
        .map(|value| (value, radix))
}

#[cfg(test)]
mod tests {
    use super::parse_integer;
    use crate::parser::ast::*;
    use crate::parser::lexer::scan;
    use crate::parser::parse::{parse, ParseErrorKind};
    use crate::source::SourceHandle;

    const PRELUDE: &str = "fn b(dword x, dword y) -> dword;\n\
                           fn len(byte* s) -> dword;\n\
                           dword a;\ndword c;\nbyte* s;\n";

    /// Parse `expr` as the initializer of a global and return it.
    fn parse_expr(expr: &str) -> Expr {
        let source = format!("{PRELUDE}dword result = {expr};");
        let tokens = scan(&SourceHandle::new("expr.e", &source)).expect("Lexing failed");
        let unit = parse(tokens).expect("Parsing failed");
        match unit.find("result") {
            Some(Decl::Var(VarDecl {
                init: Some(init), ..
            })) => init.clone(),
            _ => panic!("Expected initialized global"),
        }
    }

    fn expr_error(expr: &str) -> ParseErrorKind {
        let source = format!("{PRELUDE}dword result = {expr};");
        let tokens = scan(&SourceHandle::new("expr.e", &source)).expect("Lexing failed");
        parse(tokens).expect_err("Parsing should fail").remove(0).kind
    }

    /// Render an expression fully parenthesized, to check tree shape.
    fn shape(expr: &Expr) -> String {
        match expr {
            Expr::IntLiteral { value, .. } => value.to_string(),
            Expr::CharLiteral { value, .. } => format!("{value:?}"),
            Expr::StringLiteral { value, .. } => format!("{value:?}"),
            Expr::Variable { name, .. } => name.clone(),
            Expr::Unary { op, operand, .. } => match op {
                UnOp::PostInc | UnOp::PostDec => format!("({}{})", shape(operand), op.symbol()),
                _ => format!("({}{})", op.symbol(), shape(operand)),
            },
            Expr::Binary {
                op, left, right, ..
            } => format!("({} {} {})", shape(left), op.symbol(), shape(right)),
            Expr::Call { name, args, .. } => {
                let args: Vec<String> = args.iter().map(shape).collect();
                format!("{}({})", name, args.join(", "))
            }
            Expr::Member { base, member, .. } => format!("{}.{}", shape(base), member),
            Expr::Index { base, index, .. } => format!("{}[{}]", shape(base), shape(index)),
        }
    }

    #[test]
    fn test_addition_of_variables() {
        match parse_expr("a + c") {
            Expr::Binary {
                op: BinOp::Add,
                left,
                right,
                ..
            } => {
                assert_eq!(left.as_variable(), Some("a"));
                assert_eq!(right.as_variable(), Some("c"));
            }
            other => panic!("Expected addition, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_precedence_and_associativity() {
        assert_eq!(shape(&parse_expr("1 + 2 * 3")), "(1 + (2 * 3))");
        assert_eq!(shape(&parse_expr("1 - 2 - 3")), "((1 - 2) - 3)");
        assert_eq!(shape(&parse_expr("8 / 4 / 2")), "((8 / 4) / 2)");
        assert_eq!(shape(&parse_expr("(1 + 2) * 3")), "((1 + 2) * 3)");
        assert_eq!(
            shape(&parse_expr("a < 1 == c >= 2")),
            "((a < 1) == (c >= 2))"
        );
        assert_eq!(
            shape(&parse_expr("a == 1 || c == 2 && a != c")),
            "((a == 1) || ((c == 2) && (a != c)))"
        );
        assert_eq!(shape(&parse_expr("a | c & 1")), "(a | (c & 1))");
    }

    #[test]
    fn test_logical_and_requires_adjacent_ampersands() {
        assert_eq!(shape(&parse_expr("a && c")), "(a && c)");
        assert_eq!(shape(&parse_expr("a & &c")), "(a & (&c))");
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(shape(&parse_expr("-a + !c")), "((-a) + (!c))");
        assert_eq!(shape(&parse_expr("*s + +1")), "((*s) + (+1))");
        assert_eq!(shape(&parse_expr("++a")), "(++a)");
        assert_eq!(shape(&parse_expr("a-- * 2")), "((a--) * 2)");
    }

    #[test]
    fn test_increment_operand_must_be_variable() {
        assert_eq!(expr_error("++1"), ParseErrorKind::InvalidOperand("++"));
        assert_eq!(expr_error("(a + c)++"), ParseErrorKind::InvalidOperand("++"));
        assert_eq!(expr_error("a++--"), ParseErrorKind::InvalidOperand("--"));
    }

    #[test]
    fn test_ufcs_matches_direct_call() {
        let method = parse_expr("a.b(c)");
        let direct = parse_expr("b(a, c)");

        assert_eq!(shape(&method), "b(a, c)");
        assert_eq!(shape(&method), shape(&direct));
        match method {
            Expr::Call { name, args, .. } => {
                assert_eq!(name, "b");
                assert_eq!(args.len(), 2);
                assert_eq!(args[0].as_variable(), Some("a"));
                assert_eq!(args[1].as_variable(), Some("c"));
            }
            _ => panic!("Expected call"),
        }
    }

    #[test]
    fn test_ufcs_chains_and_members() {
        assert_eq!(shape(&parse_expr("s.len().b(2)")), "b(len(s), 2)");
        assert_eq!(shape(&parse_expr("s.size")), "s.size");
        assert_eq!(shape(&parse_expr("s[a + 1].len()")), "len(s[(a + 1)])");
    }

    #[test]
    fn test_undeclared_names() {
        assert_eq!(
            expr_error("missing + 1"),
            ParseErrorKind::UndeclaredName("missing".to_string())
        );
        assert_eq!(
            expr_error("nothing(1)"),
            ParseErrorKind::UndeclaredName("nothing".to_string())
        );
        assert_eq!(
            expr_error("a.nothing()"),
            ParseErrorKind::UndeclaredName("nothing".to_string())
        );
    }

    #[test]
    fn test_literals() {
        assert!(matches!(
            parse_expr("0b1010"),
            Expr::IntLiteral {
                value: 10,
                radix: Radix::Binary,
                ..
            }
        ));
        assert!(matches!(parse_expr("'A'"), Expr::CharLiteral { value: 'A', .. }));
        assert!(matches!(
            parse_expr("\"hi\""),
            Expr::StringLiteral { ref value, .. } if value == "hi"
        ));
    }

    #[test]
    fn test_invalid_literals() {
        assert_eq!(
            expr_error("0x"),
            ParseErrorKind::InvalidLiteral("0x".to_string())
        );
        assert_eq!(
            expr_error("99999999999999999999999"),
            ParseErrorKind::InvalidLiteral("99999999999999999999999".to_string())
        );
    }

    #[test]
    fn test_parse_integer_spellings() {
        assert_eq!(parse_integer("0"), Some((0, Radix::Decimal)));
        assert_eq!(parse_integer("0x1F"), Some((31, Radix::Hexadecimal)));
        assert_eq!(parse_integer("0B11"), Some((3, Radix::Binary)));
        assert_eq!(parse_integer("0b"), None);
    }

    #[test]
    fn test_missing_operand() {
        assert!(matches!(
            expr_error("a +"),
            ParseErrorKind::UnexpectedToken { ref expected, .. } if expected == "expression"
        ));
    }
}
