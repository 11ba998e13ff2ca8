//! Line classification
//!
//! Each raw line is matched against the directive grammar:
//!
//! ```text
//! header {            define NAME VALUE      include "path" / include <path>
//! @ifdef NAME         @if SYMBOL OP VALUE    @elif SYMBOL OP VALUE
//! @else               @endif
//! ```
//!
//! Anything else is program text.

use std::sync::OnceLock;

use regex::Regex;

use super::PreprocessErrorKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive<'a> {
    IfDef(&'a str),
    If(&'a str),
    Elif(&'a str),
    Else,
    EndIf,
    /// `header {`; `brace` is the byte offset of the opening brace.
    HeaderStart { brace: usize },
    Define {
        name: &'a str,
        value: &'a str,
        /// 1-based column of the name
        column: usize,
    },
    Include {
        path: &'a str,
        /// 1-based column of the path
        column: usize,
    },
    Text,
}

struct Patterns {
    header: Regex,
    define: Regex,
    define_prefix: Regex,
    include: Regex,
    include_prefix: Regex,
    conditional: Regex,
    identifier: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        header: pattern(r"^\s*header\s*\{"),
        define: pattern(r"^\s*define\s+([A-Za-z_][A-Za-z0-9_]*)\s+(.*?)\s*$"),
        define_prefix: pattern(r"^\s*define\b"),
        include: pattern(r#"^\s*include\s*["<]([^">]+)[">]\s*$"#),
        include_prefix: pattern(r"^\s*include\b"),
        conditional: pattern(r"^\s*@([A-Za-z]+)\b\s*(.*?)\s*$"),
        identifier: pattern(r"^[A-Za-z_][A-Za-z0-9_]*$"),
    })
}

/// The patterns above are literals; a failure here is a programming error.
fn pattern(source: &str) -> Regex {
    Regex::new(source).unwrap_or_else(|err| panic!("invalid directive pattern {source:?}: {err}"))
}

fn malformed(directive: &'static str, line: &str) -> PreprocessErrorKind {
    PreprocessErrorKind::MalformedDirective {
        directive,
        text: line.trim().to_string(),
    }
}

/// Recognize `@ifdef`, `@if`, `@elif`, `@else` and `@endif`.
///
/// These are checked on every line, disabled or not, so that nesting stays
/// balanced. Other `@` words are left to [`classify`].
pub fn conditional(line: &str) -> Result<Option<Directive<'_>>, PreprocessErrorKind> {
    let p = patterns();
    let Some(caps) = p.conditional.captures(line) else {
        return Ok(None);
    };
    let word = caps.get(1).map_or("", |m| m.as_str());
    let rest = caps.get(2).map_or("", |m| m.as_str());

    let directive = match word {
        "ifdef" if p.identifier.is_match(rest) => Directive::IfDef(rest),
        "ifdef" => return Err(malformed("@ifdef directive", line)),
        "if" => Directive::If(rest),
        "elif" => Directive::Elif(rest),
        "else" if rest.is_empty() => Directive::Else,
        "endif" if rest.is_empty() => Directive::EndIf,
        "else" | "endif" => return Err(malformed("conditional directive", line)),
        _ => return Ok(None),
    };
    Ok(Some(directive))
}

/// Classify one raw line.
pub fn classify(line: &str) -> Result<Directive<'_>, PreprocessErrorKind> {
    let p = patterns();

    if let Some(directive) = conditional(line)? {
        return Ok(directive);
    }
    if p.conditional.is_match(line) {
        return Err(malformed("directive", line));
    }

    if let Some(m) = p.header.find(line) {
        return Ok(Directive::HeaderStart { brace: m.end() - 1 });
    }

    if let Some(caps) = p.define.captures(line) {
        if let (Some(name), Some(value)) = (caps.get(1), caps.get(2)) {
            if !value.as_str().is_empty() {
                return Ok(Directive::Define {
                    name: name.as_str(),
                    value: value.as_str(),
                    column: column_of(line, name.start()),
                });
            }
        }
        return Err(malformed("define statement", line));
    }
    if p.define_prefix.is_match(line) {
        return Err(malformed("define statement", line));
    }

    if let Some(path) = p.include.captures(line).and_then(|caps| caps.get(1)) {
        return Ok(Directive::Include {
            path: path.as_str(),
            column: column_of(line, path.start()),
        });
    }
    if p.include_prefix.is_match(line) {
        return Err(malformed("include statement", line));
    }

    Ok(Directive::Text)
}

/// 1-based column of the first non-blank character.
pub fn indent_column(line: &str) -> usize {
    let offset = line.len() - line.trim_start().len();
    column_of(line, offset)
}

/// Convert a byte offset into a 1-based character column.
pub fn column_of(line: &str, offset: usize) -> usize {
    line.get(..offset).map_or(1, |prefix| prefix.chars().count() + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conditionals() {
        assert_eq!(classify("@ifdef DEBUG"), Ok(Directive::IfDef("DEBUG")));
        assert_eq!(classify("  @if LEVEL >= 2  "), Ok(Directive::If("LEVEL >= 2")));
        assert_eq!(classify("@elif LEVEL == 1"), Ok(Directive::Elif("LEVEL == 1")));
        assert_eq!(classify("@else"), Ok(Directive::Else));
        assert_eq!(classify("\t@endif\r"), Ok(Directive::EndIf));
        assert_eq!(conditional("@pragma once"), Ok(None));
        assert_eq!(conditional("fn f();"), Ok(None));
    }

    #[test]
    fn test_malformed_conditionals() {
        assert!(matches!(
            classify("@ifdef"),
            Err(PreprocessErrorKind::MalformedDirective { directive: "@ifdef directive", .. })
        ));
        assert!(matches!(
            classify("@ifdef A B"),
            Err(PreprocessErrorKind::MalformedDirective { .. })
        ));
        assert!(matches!(
            classify("@endif trailing"),
            Err(PreprocessErrorKind::MalformedDirective { .. })
        ));
        assert_eq!(
            classify("@pragma once"),
            Err(PreprocessErrorKind::MalformedDirective {
                directive: "directive",
                text: "@pragma once".to_string()
            })
        );
    }

    #[test]
    fn test_header_start() {
        assert_eq!(classify("header {"), Ok(Directive::HeaderStart { brace: 7 }));
        assert_eq!(classify("  header{ fn f(); }"), Ok(Directive::HeaderStart { brace: 8 }));
        assert_eq!(classify("header"), Ok(Directive::Text));
    }

    #[test]
    fn test_define() {
        assert_eq!(
            classify("define LEVEL 2"),
            Ok(Directive::Define {
                name: "LEVEL",
                value: "2",
                column: 8
            })
        );
        assert_eq!(
            classify("  define ARCH x86 64  "),
            Ok(Directive::Define {
                name: "ARCH",
                value: "x86 64",
                column: 10
            })
        );
        assert!(matches!(
            classify("define LONELY"),
            Err(PreprocessErrorKind::MalformedDirective { directive: "define statement", .. })
        ));
        assert!(matches!(
            classify("define LONELY   "),
            Err(PreprocessErrorKind::MalformedDirective { .. })
        ));
    }

    #[test]
    fn test_include() {
        assert_eq!(
            classify("include \"lib/io.eh\""),
            Ok(Directive::Include {
                path: "lib/io.eh",
                column: 10
            })
        );
        assert_eq!(
            classify("include <io.eh>"),
            Ok(Directive::Include {
                path: "io.eh",
                column: 10
            })
        );
        assert!(matches!(
            classify("include io.eh"),
            Err(PreprocessErrorKind::MalformedDirective { directive: "include statement", .. })
        ));
    }

    #[test]
    fn test_program_text() {
        assert_eq!(classify("fn main() -> dword {"), Ok(Directive::Text));
        assert_eq!(classify("dword defined = 1;"), Ok(Directive::Text));
        assert_eq!(classify("included(1);"), Ok(Directive::Text));
        assert_eq!(classify(""), Ok(Directive::Text));
    }

    #[test]
    fn test_columns() {
        assert_eq!(indent_column("    @endif"), 5);
        assert_eq!(indent_column("x"), 1);
        assert_eq!(column_of("é define", 3), 3);
    }
}
