// Integration tests for the lexer and parser

use ents::parser::ast::*;
use ents::parser::lexer::{scan, TokenKind};
use ents::parser::{parse, ParseError, ParseErrorKind};
use ents::source::SourceHandle;

fn parse_source(source: &str) -> Result<TranslationUnit, Vec<ParseError>> {
    let tokens = scan(&SourceHandle::new("test.e", source)).expect("Lexing failed");
    parse(tokens)
}

fn function<'a>(unit: &'a TranslationUnit, name: &str) -> &'a FunctionDef {
    match unit.find(name) {
        Some(Decl::FunctionDef(def)) => def,
        _ => panic!("Expected definition of {}", name),
    }
}

/// Call name and argument variable names, ignoring positions.
fn call_shape(expr: &Expr) -> (String, Vec<Option<String>>) {
    match expr {
        Expr::Call { name, args, .. } => (
            name.clone(),
            args.iter()
                .map(|arg| arg.as_variable().map(str::to_string))
                .collect(),
        ),
        other => panic!("Expected call, got {:?}", other.kind()),
    }
}

#[test]
fn test_add_function_tokens() {
    let source = SourceHandle::new("add.e", "fn add(dword a, dword b) -> dword { return a + b; }");
    let tokens = scan(&source).unwrap();
    let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();

    assert_eq!(kinds[0], TokenKind::Function);
    let idents: Vec<&str> = tokens
        .iter()
        .filter(|t| t.is(TokenKind::Ident))
        .map(|t| t.text.as_str())
        .collect();
    assert_eq!(idents, vec!["add", "a", "b", "a", "b"]);
    assert!(kinds
        .windows(2)
        .any(|pair| pair == [TokenKind::Minus, TokenKind::Gt]));
    assert_eq!(kinds.last(), Some(&TokenKind::Eof));
}

#[test]
fn test_add_function_tree() {
    let unit = parse_source("fn add(dword a, dword b) -> dword { return a + b; }").unwrap();
    let add = function(&unit, "add");

    assert_eq!(add.decl.params.len(), 2);
    match &add.body.statements[0] {
        Stmt::Return {
            value: Some(Expr::Binary {
                op: BinOp::Add,
                left,
                right,
                ..
            }),
            ..
        } => {
            assert_eq!(left.as_variable(), Some("a"));
            assert_eq!(right.as_variable(), Some("b"));
        }
        other => panic!("Expected return of a sum, got {:?}", other.kind()),
    }
}

#[test]
fn test_increment_requires_declaration() {
    let unit = parse_source("fn f() { dword x = 0; x++; }").unwrap();
    assert!(matches!(
        &function(&unit, "f").body.statements[1],
        Stmt::Expr(Expr::Unary { op: UnOp::PostInc, operand, .. }) if operand.as_variable() == Some("x")
    ));

    let errors = parse_source("fn f() { x++; }").unwrap_err();
    assert_eq!(errors[0].kind, ParseErrorKind::UndeclaredName("x".to_string()));

    let errors = parse_source("fn f() { ++3; }").unwrap_err();
    assert_eq!(errors[0].kind, ParseErrorKind::InvalidOperand("++"));
}

#[test]
fn test_ufcs_desugars_to_direct_call() {
    let unit = parse_source(
        "fn b(dword x, dword y) -> dword { return x; }\n\
         fn f(dword a, dword c) -> dword {\n\
             dword r = a.b(c);\n\
             dword s = b(a, c);\n\
             return r;\n\
         }",
    )
    .unwrap();
    let body = &function(&unit, "f").body;

    let init = |index: usize| match &body.statements[index] {
        Stmt::VarDecl(VarDecl { init: Some(expr), .. }) => expr.clone(),
        _ => panic!("Expected initialized local"),
    };
    let sugared = call_shape(&init(0));
    assert_eq!(sugared, call_shape(&init(1)));
    assert_eq!(
        sugared,
        ("b".to_string(), vec![Some("a".to_string()), Some("c".to_string())])
    );
}

#[test]
fn test_complete_program() {
    let source = r#"
extern fn puts(byte* s) -> sdword;
extern fn printf(byte* fmt, ...) -> sdword;

const dword limit = 0x10;
byte flags = 0b101;

fn classify(dword n) -> byte {
    switch (n) {
        case 0:
            return 'z';
        case 1:
            return 'o';
        default:
            return 'm';
    }
}

fn main() -> dword {
    dword i = 0;
    byte* name = "ents";
    while (i < limit && flags != 0) {
        if (i == 3) {
            i++;
            continue;
        } else if (i > 10 || i == 7) {
            break;
        } else {
            name.puts();
        }
        printf("%d\n", i.classify());
        i = i + 1;
    }
    return 0;
}
"#;
    let unit = parse_source(source).unwrap();

    let names: Vec<&str> = unit.declarations.iter().map(Decl::name).collect();
    assert_eq!(names, vec!["puts", "printf", "limit", "flags", "classify", "main"]);

    match unit.find("printf") {
        Some(Decl::Extern { decl, .. }) => match decl.as_ref() {
            Decl::Function(proto) => assert!(proto.is_variadic),
            _ => panic!("Expected prototype"),
        },
        _ => panic!("Expected extern"),
    }

    match &function(&unit, "classify").body.statements[0] {
        Stmt::Switch { cases, default, .. } => {
            assert_eq!(cases.len(), 2);
            assert!(default.is_some());
        }
        _ => panic!("Expected switch"),
    }

    let main = function(&unit, "main");
    match &main.body.statements[2] {
        Stmt::While { condition, body, .. } => {
            assert!(matches!(condition, Expr::Binary { op: BinOp::And, .. }));
            assert_eq!(body.statements.len(), 3);
            match &body.statements[0] {
                Stmt::If(stmt) => match stmt.else_branch.as_deref() {
                    Some(ElseBranch::If(nested)) => {
                        assert!(matches!(nested.condition, Expr::Binary { op: BinOp::Or, .. }));
                        assert!(matches!(
                            nested.else_branch.as_deref(),
                            Some(ElseBranch::Block(_))
                        ));
                    }
                    _ => panic!("Expected else-if"),
                },
                _ => panic!("Expected if"),
            }
        }
        _ => panic!("Expected while"),
    }
}

#[test]
fn test_errors_reported_together() {
    let errors = parse_source(
        "fn f() -> dword {\n  undefined();\n  return 0;\n}\n\
         fn g() {\n  switch (1) { default: break; default: break; }\n}\n\
         dword f;",
    )
    .unwrap_err();

    let kinds: Vec<ParseErrorKind> = errors.iter().map(|e| e.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![
            ParseErrorKind::UndeclaredName("undefined".to_string()),
            ParseErrorKind::MultipleDefaultCases,
            ParseErrorKind::RedeclaredIdentifier("f".to_string()),
        ]
    );
    assert_eq!(errors[0].location.line, 2);
    assert_eq!(errors[2].location.line, 8);
}

#[test]
fn test_aggregates_are_rejected() {
    let errors = parse_source("struct point { dword x; };\ndword after;").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0].kind, ParseErrorKind::Unsupported(_)));
}
