// Integration tests for the preprocessor

use std::path::Path;

use ents::driver::MemoryLoader;
use ents::preprocessor::{preprocess, PreprocessError, PreprocessErrorKind, Preprocessed, Preprocessor};

fn run(files: &[(&str, &str)]) -> Result<Preprocessed, PreprocessError> {
    let mut loader = MemoryLoader::new();
    for (path, text) in files {
        loader.insert(*path, *text);
    }
    preprocess(&loader, Path::new(files[0].0))
}

fn run_with(defines: &[(&str, &str)], source: &str) -> Result<Preprocessed, PreprocessError> {
    let loader = MemoryLoader::new().with_file("main.e", source);
    let mut preprocessor = Preprocessor::new(&loader);
    for (name, value) in defines {
        preprocessor.define(name, value)?;
    }
    preprocessor.run(Path::new("main.e"))
}

fn non_empty_lines(text: &str) -> Vec<&str> {
    text.lines().filter(|line| !line.trim().is_empty()).collect()
}

#[test]
fn test_header_wrapper_is_the_only_change() {
    let source = "header {\n    extern fn puts(byte* s) -> sdword;\n}\n\nfn main() -> dword {\n    return 0;\n}\n";
    let out = run(&[("main.e", source)]).unwrap();

    let expected = "\n    extern fn puts(byte* s) -> sdword;\n\n\nfn main() -> dword {\n    return 0;\n}\n";
    assert_eq!(out.text, expected);
    assert_eq!(out.text.lines().count(), source.lines().count());
}

#[test]
fn test_ifdef_keeps_or_removes_line() {
    let source = "@ifdef DEBUG\ndword trace;\n@endif\n";

    let undefined = run_with(&[], source).unwrap();
    assert!(non_empty_lines(&undefined.text).is_empty());

    let defined = run_with(&[("DEBUG", "1")], source).unwrap();
    assert_eq!(non_empty_lines(&defined.text), vec!["dword trace;"]);
}

#[test]
fn test_exactly_one_branch_selected() {
    let source = "@if A == 1\nbyte one;\n@elif A == 2\nbyte two;\n@else\nbyte other;\n@endif\n";

    for (value, expected) in [("1", "byte one;"), ("2", "byte two;"), ("7", "byte other;")] {
        let out = run_with(&[("A", value)], source).unwrap();
        assert_eq!(non_empty_lines(&out.text), vec![expected], "A = {}", value);
    }
}

#[test]
fn test_numeric_operands_compare_as_numbers() {
    let source = "@if N > 10\nbyte big;\n@else\nbyte small;\n@endif\n";

    // "2" > "10" as strings, but not as numbers.
    let out = run_with(&[("N", "2")], source).unwrap();
    assert_eq!(non_empty_lines(&out.text), vec!["byte small;"]);

    let out = run_with(&[("N", "20")], source).unwrap();
    assert_eq!(non_empty_lines(&out.text), vec!["byte big;"]);
}

#[test]
fn test_defines_visible_to_later_conditionals() {
    let source = "define ARCH x86\n@if ARCH == x86\nbyte arch;\n@endif\n";
    let out = run(&[("main.e", source)]).unwrap();

    assert_eq!(non_empty_lines(&out.text), vec!["byte arch;"]);
    assert_eq!(out.definitions.get("ARCH"), Some("x86"));
    assert_eq!(out.definitions.definition("ARCH").unwrap().line, 1);
}

#[test]
fn test_same_path_twice_is_cyclic() {
    let err = run(&[
        ("main.e", "include \"a.eh\"\ninclude \"a.eh\"\n"),
        ("a.eh", "header { }\n"),
    ])
    .unwrap_err();

    assert_eq!(err.kind, PreprocessErrorKind::CyclicInclude("a.eh".to_string()));
    assert_eq!((err.file.as_str(), err.line), ("main.e", 2));
}

#[test]
fn test_include_cycle_through_chain() {
    let err = run(&[
        ("main.e", "include \"a.eh\"\n"),
        ("a.eh", "include \"b.eh\"\n"),
        ("b.eh", "include \"a.eh\"\n"),
    ])
    .unwrap_err();

    assert!(matches!(err.kind, PreprocessErrorKind::CyclicInclude(_)));
    assert_eq!(err.file, "b.eh");
}

#[test]
fn test_definition_collision_between_includes() {
    let err = run(&[
        ("main.e", "include \"a.eh\"\ninclude \"b.eh\"\n"),
        ("a.eh", "define SIZE 4\n"),
        ("b.eh", "define SIZE 8\n"),
    ])
    .unwrap_err();

    assert_eq!(err.kind, PreprocessErrorKind::DuplicateDefinition("SIZE".to_string()));
    assert_eq!(err.line, 2);
}

#[test]
fn test_includes_listed_dependencies_first() {
    let out = run(&[
        ("main.e", "include \"a.eh\"\ninclude \"c.eh\"\n"),
        ("a.eh", "include \"b.eh\"\nheader { byte a; }\n"),
        ("b.eh", "header { byte b; }\n"),
        ("c.eh", "include \"b.eh\"\nheader { byte c; }\n"),
    ])
    .unwrap();

    let order: Vec<_> = out
        .includes
        .iter()
        .map(|header| header.path.display().to_string())
        .collect();
    assert_eq!(order, vec!["b.eh", "a.eh", "c.eh"]);
    assert_eq!(out.includes[0].text.trim(), "byte b;");
}

#[test]
fn test_only_header_content_is_exported() {
    let out = run(&[
        ("main.e", "include <lib.eh>\n"),
        ("lib.eh", "header {\nextern fn f() -> void;\n}\nfn g() -> void { }\n"),
    ])
    .unwrap();

    assert_eq!(out.includes[0].text, "\nextern fn f() -> void;\n\n\n");
}

#[test]
fn test_structural_errors_are_fatal() {
    let cases: [(&str, fn(&PreprocessErrorKind) -> bool); 6] = [
        ("@endif\n", |k| matches!(k, PreprocessErrorKind::UnbalancedConditional(_))),
        ("@if A == 1\n", |k| matches!(k, PreprocessErrorKind::UnbalancedConditional(_))),
        ("header {\nbyte b;\n", |k| matches!(k, PreprocessErrorKind::UnclosedHeaderBlock(1))),
        ("define EMPTY\n", |k| matches!(k, PreprocessErrorKind::MalformedDirective { .. })),
        ("@if A ~ 1\n@endif\n", |k| matches!(k, PreprocessErrorKind::UnsupportedOperator(_))),
        ("include \"missing.eh\"\n", |k| matches!(k, PreprocessErrorKind::FileNotFound(_))),
    ];

    for (source, check) in cases {
        let err = run(&[("main.e", source)]).unwrap_err();
        assert!(check(&err.kind), "{:?} for {:?}", err.kind, source);
    }
}

#[test]
fn test_error_carries_caret_context() {
    let err = run(&[("main.e", "byte a;\n  @else\n")]).unwrap_err();
    let diag = err.to_diagnostic();

    assert_eq!((diag.line, diag.column), (2, 3));
    assert_eq!(diag.source_line.as_deref(), Some("  @else"));
    assert!(diag.render(false).ends_with("compilation terminated.\n"));
}

#[test]
fn test_output_is_idempotent() {
    let source = "define X 1\n@ifdef X\nheader {\nbyte h;\n}\nfn f() -> void { }\n@endif\n";
    let first = run(&[("main.e", source)]).unwrap();
    let second = run(&[("main.e", first.text.as_str())]).unwrap();

    assert_eq!(second.text, first.text);
}
