//! Declaration parsing implementation
//!
//! This module handles parsing of top-level declarations in ents programs:
//!
//! - External declarations: `extern fn puts(byte* s) -> dword;`, `extern dword errno;`
//! - Function prototypes and definitions: `fn name(params) -> type;` / `{ ... };`
//! - Global variables: `qword counter = 0;`
//! - Type references, parameters and attribute lists
//!
//! # Grammar
//!
//! ```text
//! declaration  ::= "extern" attribute* (prototype | global_decl)
//!                | attribute* (function | global)
//! function     ::= prototype | signature block ";"?
//! prototype    ::= signature ";"
//! signature    ::= "fn" identifier "(" params ")" ("-" ">" type)?
//! params       ::= (param ("," param)* ("," "...")?)? | "..."
//! param        ::= attribute* type identifier
//! global       ::= global_decl | type identifier "=" expression ";"
//! global_decl  ::= type identifier ";"
//! type         ::= base_type "*"*
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use log::trace;

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, ParseErrorKind, Parser};

impl Parser {
    /// Parse a top-level declaration
    pub(crate) fn parse_top_level_declaration(&mut self) -> Result<Decl, ParseError> {
        let loc = self.current_location();

        if self.match_token(TokenKind::Extern) {
            let attributes = self.parse_attributes();
            let decl = if self.check(TokenKind::Function) {
                let decl = self.parse_signature(attributes)?;
                self.expect_semicolon("after extern function declaration")?;
                Decl::Function(decl)
            } else if self.is_type_keyword() {
                let var = self.parse_global_variable(attributes, false)?;
                Decl::Var(var)
            } else {
                return Err(self.unexpected("'fn' or a type after 'extern'"));
            };

            return Ok(Decl::Extern {
                decl: Box::new(decl),
                location: loc,
            });
        }

        let attributes = self.parse_attributes();
        match self.peek_kind() {
            TokenKind::Function => self.parse_function(attributes),
            kind if kind.is_type_keyword() => {
                Ok(Decl::Var(self.parse_global_variable(attributes, true)?))
            }
            kind @ (TokenKind::Struct
            | TokenKind::Union
            | TokenKind::Enum
            | TokenKind::Typedef
            | TokenKind::Asm) => Err(self.unsupported(kind)),
            _ => Err(self.unexpected("declaration")),
        }
    }

    /// Parse a function prototype or definition.
    ///
    /// The parameter frame stays open across the body and is popped once the
    /// optional trailing `;` has been consumed.
    fn parse_function(&mut self, attributes: NodeList<Attribute>) -> Result<Decl, ParseError> {
        self.scopes.push();
        let result = self.parse_function_rest(attributes);
        self.scopes.pop();
        result
    }

    fn parse_function_rest(&mut self, attributes: NodeList<Attribute>) -> Result<Decl, ParseError> {
        let decl = self.parse_signature_in_scope(attributes)?;

        if self.match_token(TokenKind::Semicolon) {
            trace!("parsed prototype of '{}'", decl.name);
            return Ok(Decl::Function(decl));
        }

        if !self.check(TokenKind::LBrace) {
            return Err(self.unexpected("';' or '{' after function signature"));
        }

        if self.functions.get(&decl.name).copied().unwrap_or(false) {
            return Err(ParseError::new(
                ParseErrorKind::RedeclaredIdentifier(decl.name.clone()),
                decl.location.clone(),
            ));
        }
        self.functions.insert(decl.name.clone(), true);

        // Parameters and body locals share one frame.
        let body = self.parse_block_in_current_scope("to open function body")?;
        self.match_token(TokenKind::Semicolon);

        trace!("parsed definition of '{}'", decl.name);
        Ok(Decl::FunctionDef(FunctionDef { decl, body }))
    }

    /// Parse a signature in a transient frame of its own (prototypes only).
    fn parse_signature(&mut self, attributes: NodeList<Attribute>) -> Result<FunctionDecl, ParseError> {
        self.scopes.push();
        let result = self.parse_signature_in_scope(attributes);
        self.scopes.pop();
        result
    }

    /// Parse `fn name(params) -> type`, registering the name and parameters.
    fn parse_signature_in_scope(
        &mut self,
        attributes: NodeList<Attribute>,
    ) -> Result<FunctionDecl, ParseError> {
        let loc = self.current_location();
        self.expect_token(TokenKind::Function, "to start function declaration")?;

        let (name, name_loc) = self.expect_identifier("after 'fn'")?;
        if self.scopes.is_global(&name) {
            return Err(ParseError::new(
                ParseErrorKind::RedeclaredIdentifier(name),
                name_loc,
            ));
        }
        // Registered before the body so recursive calls resolve.
        self.functions.entry(name.clone()).or_insert(false);

        self.expect_lparen("after function name")?;
        let (params, is_variadic) = self.parse_parameter_list()?;
        self.expect_rparen("after parameter list")?;

        let return_type = if self.check(TokenKind::Minus) && self.check_ahead(1, TokenKind::Gt) {
            self.advance();
            self.advance();
            self.parse_type("after '->'")?
        } else {
            Type::new(BaseType::Void, name_loc)
        };

        Ok(FunctionDecl {
            name,
            params,
            is_variadic,
            return_type,
            attributes,
            location: loc,
        })
    }

    /// Parse comma-separated parameters, declaring each name in the current frame.
    fn parse_parameter_list(&mut self) -> Result<(NodeList<Param>, bool), ParseError> {
        let mut params = NodeList::new();

        if self.check(TokenKind::RParen) {
            return Ok((params, false));
        }

        loop {
            if self.check(TokenKind::Dot) {
                self.parse_ellipsis()?;
                return Ok((params, true));
            }

            let loc = self.current_location();
            let attributes = self.parse_attributes();
            let param_type = self.parse_type("for parameter")?;
            let (name, name_loc) = self.expect_identifier("for parameter name")?;

            if !self.scopes.declare(&name) {
                return Err(ParseError::new(
                    ParseErrorKind::RedeclaredIdentifier(name),
                    name_loc,
                ));
            }

            params.push(Param {
                name,
                param_type,
                attributes,
                location: loc,
            });

            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }

        Ok((params, false))
    }

    /// `...` arrives as three `.` tokens.
    fn parse_ellipsis(&mut self) -> Result<(), ParseError> {
        for _ in 0..3 {
            self.expect_token(TokenKind::Dot, "in '...'")?;
        }
        if !self.check(TokenKind::RParen) {
            return Err(self.unexpected("')' after '...'"));
        }
        Ok(())
    }

    /// Parse a global variable; `extern` globals take no initializer.
    fn parse_global_variable(
        &mut self,
        attributes: NodeList<Attribute>,
        allow_init: bool,
    ) -> Result<VarDecl, ParseError> {
        let loc = self.current_location();
        let var_type = self.parse_type("for global variable")?;
        let (name, name_loc) = self.expect_identifier("for global variable name")?;

        if self.scopes.is_global(&name) || self.functions.contains_key(&name) {
            return Err(ParseError::new(
                ParseErrorKind::RedeclaredIdentifier(name),
                name_loc,
            ));
        }

        let init = if allow_init && self.match_token(TokenKind::Eq) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect_semicolon("after global variable declaration")?;
        self.scopes.declare(&name);

        Ok(VarDecl {
            name,
            var_type,
            init,
            attributes,
            location: loc,
        })
    }

    /// Parse type: base keyword followed by zero or more `*`
    pub(crate) fn parse_type(&mut self, ctx: &str) -> Result<Type, ParseError> {
        let loc = self.current_location();
        let kind = self.peek_kind();

        let base = match BaseType::from_token(kind) {
            Some(base) => base,
            None if matches!(
                kind,
                TokenKind::Struct | TokenKind::Union | TokenKind::Enum
            ) =>
            {
                return Err(self.unsupported(kind));
            }
            None => return Err(self.unexpected(format!("type {ctx}"))),
        };
        self.advance();

        let mut ty = Type::new(base, loc);
        while self.match_token(TokenKind::Star) {
            ty = ty.with_pointer();
        }
        Ok(ty)
    }

    /// Collect leading qualifier keywords.
    pub(crate) fn parse_attributes(&mut self) -> NodeList<Attribute> {
        let mut attributes = NodeList::new();
        while let Some(kind) = AttributeKind::from_token(self.peek_kind()) {
            attributes.push(Attribute {
                kind,
                location: self.current_location(),
            });
            self.advance();
        }
        attributes
    }

    pub(crate) fn unsupported(&self, kind: TokenKind) -> ParseError {
        let what = match kind {
            TokenKind::Struct => "struct",
            TokenKind::Union => "union",
            TokenKind::Enum => "enum",
            TokenKind::Typedef => "typedef",
            _ => "asm",
        };
        ParseError::new(ParseErrorKind::Unsupported(what), self.current_location())
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::lexer::scan;
    use crate::parser::parse::{parse, ParseErrorKind};
    use crate::source::SourceHandle;

    fn parse_ok(source: &str) -> TranslationUnit {
        let tokens = scan(&SourceHandle::new("decl.e", source)).expect("Lexing failed");
        parse(tokens).expect("Parsing failed")
    }

    fn first_error(source: &str) -> ParseErrorKind {
        let tokens = scan(&SourceHandle::new("decl.e", source)).expect("Lexing failed");
        parse(tokens).expect_err("Parsing should fail").remove(0).kind
    }

    #[test]
    fn test_prototype_and_definition() {
        let unit = parse_ok(
            "fn add(dword a, dword b) -> dword;\n\
             fn add(dword a, dword b) -> dword { return a + b; };",
        );

        assert_eq!(unit.declarations.len(), 2);
        match &unit.declarations[0] {
            Decl::Function(decl) => {
                assert_eq!(decl.name, "add");
                assert_eq!(decl.params.len(), 2);
                assert_eq!(decl.params[1].name, "b");
                assert_eq!(decl.return_type.base, BaseType::DWord);
            }
            _ => panic!("Expected prototype"),
        }
        assert!(matches!(unit.declarations[1], Decl::FunctionDef(_)));
        assert!(matches!(unit.find("add"), Some(Decl::FunctionDef(_))));
    }

    #[test]
    fn test_trailing_semicolon_after_body_is_optional() {
        let unit = parse_ok("fn a() { }\nfn b() { };");
        assert_eq!(unit.declarations.len(), 2);
    }

    #[test]
    fn test_extern_declarations() {
        let unit = parse_ok("extern fn printf(byte* fmt, ...) -> sdword;\nextern qword ticks;");

        match &unit.declarations[0] {
            Decl::Extern { decl, .. } => match decl.as_ref() {
                Decl::Function(f) => {
                    assert_eq!(f.name, "printf");
                    assert!(f.is_variadic);
                    assert_eq!(f.params[0].param_type.pointer_depth, 1);
                    assert_eq!(f.return_type.base, BaseType::SDWord);
                }
                _ => panic!("Expected extern function"),
            },
            _ => panic!("Expected extern"),
        }
        assert_eq!(unit.declarations[1].name(), "ticks");
        assert_eq!(unit.declarations[1].kind(), NodeKind::Extern);
    }

    #[test]
    fn test_extern_global_rejects_initializer() {
        assert!(matches!(
            first_error("extern dword x = 1;"),
            ParseErrorKind::UnexpectedToken { .. }
        ));
    }

    #[test]
    fn test_global_with_initializer_and_attributes() {
        let unit = parse_ok("static const byte** table = 0x10;");

        match &unit.declarations[0] {
            Decl::Var(var) => {
                assert_eq!(var.name, "table");
                assert_eq!(var.var_type.pointer_depth, 2);
                let attrs: Vec<_> = var.attributes.iter().map(|a| a.kind).collect();
                assert_eq!(attrs, vec![AttributeKind::Static, AttributeKind::Const]);
                assert!(matches!(
                    var.init,
                    Some(Expr::IntLiteral {
                        value: 16,
                        radix: Radix::Hexadecimal,
                        ..
                    })
                ));
            }
            _ => panic!("Expected global variable"),
        }
    }

    #[test]
    fn test_missing_return_type_is_void() {
        let unit = parse_ok("inline fn tick();");
        match &unit.declarations[0] {
            Decl::Function(decl) => {
                assert!(decl.return_type.is_void());
                assert_eq!(decl.attributes[0].kind, AttributeKind::Inline);
            }
            _ => panic!("Expected prototype"),
        }
    }

    #[test]
    fn test_duplicate_parameter() {
        assert_eq!(
            first_error("fn f(dword a, byte a);"),
            ParseErrorKind::RedeclaredIdentifier("a".to_string())
        );
    }

    #[test]
    fn test_parameter_may_shadow_global() {
        parse_ok("dword a;\nfn f(dword a) -> dword { return a; };");
    }

    #[test]
    fn test_redeclarations() {
        assert_eq!(
            first_error("word x;\nfn x();"),
            ParseErrorKind::RedeclaredIdentifier("x".to_string())
        );
        assert_eq!(
            first_error("fn x();\nword x;"),
            ParseErrorKind::RedeclaredIdentifier("x".to_string())
        );
        assert_eq!(
            first_error("fn f() { };\nfn f() { };"),
            ParseErrorKind::RedeclaredIdentifier("f".to_string())
        );
    }

    #[test]
    fn test_prototype_parameters_are_discarded() {
        assert_eq!(
            first_error("fn f(dword a);\nfn g() { a = 1; };"),
            ParseErrorKind::UndeclaredName("a".to_string())
        );
    }

    #[test]
    fn test_unsupported_aggregates() {
        assert_eq!(
            first_error("struct point { dword x; };"),
            ParseErrorKind::Unsupported("struct")
        );
        assert_eq!(
            first_error("fn f(enum e v);"),
            ParseErrorKind::Unsupported("enum")
        );
    }

    #[test]
    fn test_ellipsis_must_be_last() {
        assert!(matches!(
            first_error("extern fn f(..., dword a);"),
            ParseErrorKind::UnexpectedToken { .. }
        ));
    }
}
