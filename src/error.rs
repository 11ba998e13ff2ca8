//! Pipeline error type

use crate::diagnostic::Diagnostic;
use crate::parser::lexer::LexError;
use crate::parser::parse::ParseError;
use crate::preprocessor::PreprocessError;

/// Failure of one compilation, carrying every error of the failing stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("{0}")]
    Preprocess(#[from] PreprocessError),
    #[error("{} lexical error(s)", .0.len())]
    Lex(Vec<LexError>),
    #[error("{} parse error(s)", .0.len())]
    Parse(Vec<ParseError>),
}

impl CompileError {
    /// Diagnostics in source order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            CompileError::Preprocess(err) => vec![err.to_diagnostic()],
            CompileError::Lex(errors) => errors.iter().map(LexError::to_diagnostic).collect(),
            CompileError::Parse(errors) => errors.iter().map(ParseError::to_diagnostic).collect(),
        }
    }

    pub fn render(&self, color: bool) -> String {
        self.diagnostics()
            .iter()
            .map(|diag| diag.render(color))
            .collect()
    }
}

impl From<Vec<LexError>> for CompileError {
    fn from(errors: Vec<LexError>) -> Self {
        CompileError::Lex(errors)
    }
}

impl From<Vec<ParseError>> for CompileError {
    fn from(errors: Vec<ParseError>) -> Self {
        CompileError::Parse(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Severity;
    use crate::parser::lexer::scan;
    use crate::source::SourceHandle;

    #[test]
    fn test_lex_errors_become_diagnostics() {
        let source = SourceHandle::new("bad.e", "dword x = 1 $ 2;\nbyte c = 'ab';");
        let err = CompileError::from(scan(&source).unwrap_err());

        let diags = err.diagnostics();
        assert_eq!(err.to_string(), "2 lexical error(s)");
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].severity, Severity::Error);
        assert_eq!(diags[0].module.tag(), "Lexer");
        assert_eq!((diags[0].line, diags[0].column), (1, 13));
        assert_eq!(diags[1].line, 2);
        assert!(err.render(false).contains("Unexpected character '$'"));
    }
}
