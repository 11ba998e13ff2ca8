//! User-facing diagnostics
//!
//! Every stage error is lowered into a [`Diagnostic`] before it reaches the
//! user. Rendering follows the compiler's established layout:
//!
//! ```text
//! ents: fatal error: [module: preprocessor] [file: main.e, line: 3, column: 1]
//!   @endif
//!   ^
//! Mismatched @endif encountered
//! compilation terminated.
//! ```

use colored::{Color, Colorize};
use std::fmt;

use crate::source::SourceLocation;

/// How bad a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    Error,
    Warning,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Fatal => "fatal error",
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }

    fn color(self) -> Color {
        match self {
            Severity::Fatal | Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        }
    }
}

/// Pipeline stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Module {
    Preprocessor,
    Lexer,
    Parser,
}

impl Module {
    pub fn tag(self) -> &'static str {
        match self {
            Module::Preprocessor => "preprocessor",
            Module::Lexer => "Lexer",
            Module::Parser => "parser",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub module: Module,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub source_line: Option<String>,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        module: Module,
        file: impl Into<String>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            module,
            file: file.into(),
            line,
            column,
            message: message.into(),
            source_line: None,
        }
    }

    /// Build a diagnostic positioned at `location`, quoting its source line.
    pub fn at(
        severity: Severity,
        module: Module,
        location: &SourceLocation,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            severity,
            module,
            location.source.name(),
            location.line,
            location.column,
            message,
        )
        .with_source_line(location.source_line())
    }

    pub fn with_source_line(mut self, source_line: Option<String>) -> Self {
        self.source_line = source_line;
        self
    }

    /// Render the diagnostic, optionally with terminal colours.
    pub fn render(&self, color: bool) -> String {
        let mut out = String::new();

        let header = format!("ents: {}:", self.severity.label());
        let location = format!(
            "[module: {}] [file: {}, line: {}, column: {}]",
            self.module, self.file, self.line, self.column
        );
        if color {
            out.push_str(&format!(
                "{} {}\n",
                header.color(self.severity.color()).bold(),
                location.bright_white().bold()
            ));
        } else {
            out.push_str(&format!("{header} {location}\n"));
        }

        if let Some(line) = &self.source_line {
            // Tabs keep their width so the caret lines up under them.
            let padding: String = line
                .chars()
                .take(self.column.saturating_sub(1))
                .map(|ch| if ch == '\t' { '\t' } else { ' ' })
                .collect();
            if color {
                out.push_str(&format!("  {}\n", line.bright_white().bold()));
                out.push_str(&format!("  {}{}\n", padding, "^".red().bold()));
            } else {
                out.push_str(&format!("  {line}\n"));
                out.push_str(&format!("  {padding}^\n"));
            }
        }

        out.push_str(&self.message);
        out.push('\n');

        if self.severity == Severity::Fatal {
            if color {
                out.push_str(&format!("{}\n", "compilation terminated.".bright_white().bold()));
            } else {
                out.push_str("compilation terminated.\n");
            }
        }

        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}
