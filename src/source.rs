//! Source registry
//!
//! Every file that enters the pipeline gets one [`SourceFile`], shared through a
//! reference-counted [`SourceHandle`]. Tokens, AST nodes and diagnostics hold
//! clones of the handle instead of copies of the path, and the lexer records the
//! start offset of every line on the file so a diagnostic can quote the offending
//! line without rescanning the text.

use std::cell::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A single registered source text.
pub struct SourceFile {
    path: PathBuf,
    text: String,
    line_starts: OnceCell<Vec<usize>>,
}

impl SourceFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Publish the line-start index computed while scanning.
    ///
    /// Only the first call has an effect; later scans of the same text would
    /// produce the same index anyway.
    pub(crate) fn record_line_starts(&self, starts: Vec<usize>) {
        let _ = self.line_starts.set(starts);
    }

    /// Returns the text of a 1-based line, without its line terminator.
    pub fn line(&self, line: usize) -> Option<&str> {
        if line == 0 {
            return None;
        }

        let start = match self.line_starts.get() {
            Some(starts) => *starts.get(line - 1)?,
            // Not scanned yet: fall back to a linear search.
            None => return self.text.lines().nth(line - 1),
        };

        let rest = self.text.get(start..)?;
        let end = rest.find('\n').unwrap_or(rest.len());
        Some(rest[..end].trim_end_matches('\r'))
    }
}

/// Shared, cheaply clonable reference to a [`SourceFile`].
#[derive(Clone)]
pub struct SourceHandle(Rc<SourceFile>);

impl SourceHandle {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self(Rc::new(SourceFile {
            path: path.into(),
            text: text.into(),
            line_starts: OnceCell::new(),
        }))
    }

    /// Display name used in diagnostics.
    pub fn name(&self) -> String {
        self.0.path.display().to_string()
    }

    /// Number of live holders of this handle.
    pub fn holders(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

impl std::ops::Deref for SourceHandle {
    type Target = SourceFile;

    fn deref(&self) -> &SourceFile {
        &self.0
    }
}

impl PartialEq for SourceHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for SourceHandle {}

// Path only; the text would be repeated at every node of an AST dump.
impl fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0.path)
    }
}

/// Position of a token or node in a registered source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub source: SourceHandle,
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(source: SourceHandle, line: usize, column: usize) -> Self {
        Self {
            source,
            line,
            column,
        }
    }

    /// The quoted source line, if the text is still available.
    pub fn source_line(&self) -> Option<String> {
        self.source.line(self.line).map(str::to_string)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source.name(), self.line, self.column)
    }
}

/// Owns one handle per registered text, in registration order.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    files: Vec<SourceHandle>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> SourceHandle {
        let handle = SourceHandle::new(path, text);
        self.files.push(handle.clone());
        handle
    }

    pub fn get(&self, path: &Path) -> Option<&SourceHandle> {
        self.files.iter().find(|file| file.path() == path)
    }

    pub fn files(&self) -> &[SourceHandle] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_lookup_without_index() {
        let handle = SourceHandle::new("a.e", "first\nsecond\r\nthird");
        assert_eq!(handle.line(1), Some("first"));
        assert_eq!(handle.line(2), Some("second"));
        assert_eq!(handle.line(3), Some("third"));
        assert_eq!(handle.line(4), None);
        assert_eq!(handle.line(0), None);
    }

    #[test]
    fn test_line_lookup_with_index() {
        let handle = SourceHandle::new("a.e", "ab\ncd\n\nef");
        handle.record_line_starts(vec![0, 3, 6, 7]);
        assert_eq!(handle.line(2), Some("cd"));
        assert_eq!(handle.line(3), Some(""));
        assert_eq!(handle.line(4), Some("ef"));
        assert_eq!(handle.line(5), None);
    }

    #[test]
    fn test_handle_sharing() {
        let mut registry = SourceRegistry::new();
        let handle = registry.register("main.e", "fn main();");
        let copy = handle.clone();

        assert_eq!(handle, copy);
        assert_eq!(handle.holders(), 3);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(Path::new("main.e")).is_some());

        drop(registry);
        assert_eq!(copy.holders(), 2);
    }

    #[test]
    fn test_handles_with_same_path_are_distinct() {
        let a = SourceHandle::new("x.e", "");
        let b = SourceHandle::new("x.e", "");
        assert_ne!(a, b);
    }
}
