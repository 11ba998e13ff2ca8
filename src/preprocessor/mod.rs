//! Line-oriented preprocessor
//!
//! Turns a root file into program text, the content of its `header { }`
//! blocks, a table of `define`d values and the list of included headers.
//!
//! # Directives
//!
//! - `header { ... }`: declarations shared with files that include this one
//! - `define NAME VALUE`: registers a compile-time value (never substituted)
//! - `include "path"` / `include <path>`: pulls in the header blocks of another file
//! - `@ifdef NAME`, `@if SYMBOL OP VALUE`, `@elif`, `@else`, `@endif`
//!
//! # Output layout
//!
//! Every input line produces exactly one output line, so token positions in
//! the output match the original file. Directive lines and disabled lines
//! become empty lines; the `header {` wrapper is blanked out.
//!
//! Included files are processed in header-only mode: only their header
//! block content is kept, but their `define`s and nested `include`s run.
//! Errors are fatal and stop the run at the first one.

pub mod condition;
pub mod conditional;
pub mod directive;
pub mod header;

use std::path::{Component, Path, PathBuf};

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::diagnostic::{Diagnostic, Module, Severity};
use crate::driver::SourceLoader;
use conditional::{ConditionalStack, Opener};
use directive::{indent_column, Directive};
use header::{Feed, HeaderBlock};

pub use condition::evaluate_condition;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreprocessErrorKind {
    #[error("Cannot open file '{0}'")]
    FileNotFound(String),
    #[error("Cyclic include: '{0}'")]
    CyclicInclude(String),
    #[error("Unclosed header block, brace balance {0}")]
    UnclosedHeaderBlock(i32),
    #[error("{0}")]
    UnbalancedConditional(&'static str),
    #[error("Malformed {directive}: '{text}'")]
    MalformedDirective { directive: &'static str, text: String },
    #[error("Nested header block")]
    NestedHeaderBlock,
    #[error("Macro '{0}' is already defined")]
    DuplicateDefinition(String),
    #[error("Unsupported operator: '{0}'")]
    UnsupportedOperator(String),
}

/// Preprocessor error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{file}:{line}:{column}: {kind}")]
pub struct PreprocessError {
    pub kind: PreprocessErrorKind,
    pub file: String,
    /// 0 when the error is not tied to a line (unreadable root file)
    pub line: usize,
    pub column: usize,
    pub source_line: Option<String>,
}

impl PreprocessError {
    fn unpositioned(kind: PreprocessErrorKind, file: &Path) -> Self {
        Self {
            kind,
            file: file.display().to_string(),
            line: 0,
            column: 0,
            source_line: None,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(
            Severity::Fatal,
            Module::Preprocessor,
            self.file.clone(),
            self.line,
            self.column,
            self.kind.to_string(),
        )
        .with_source_line(self.source_line.clone())
    }
}

/// A `define`d value and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub value: String,
    pub origin: PathBuf,
    pub line: usize,
}

impl Definition {
    pub fn new(value: impl Into<String>, origin: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            value: value.into(),
            origin: origin.into(),
            line,
        }
    }
}

/// Name → value table of one file, including what its includes defined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Definitions {
    entries: FxHashMap<String, Definition>,
}

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|def| def.value.as_str())
    }

    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Definition)> {
        self.entries.iter().map(|(name, def)| (name.as_str(), def))
    }

    /// Register `name`; an existing entry of the same name is an error.
    pub fn insert(&mut self, name: &str, definition: Definition) -> Result<(), PreprocessErrorKind> {
        if self.entries.contains_key(name) {
            return Err(PreprocessErrorKind::DuplicateDefinition(name.to_string()));
        }
        self.entries.insert(name.to_string(), definition);
        Ok(())
    }

    /// Merge an included file's table. The same definition reached through
    /// two include paths is not a collision.
    pub fn merge(&mut self, other: &Definitions) -> Result<(), PreprocessErrorKind> {
        for (name, definition) in &other.entries {
            match self.entries.get(name) {
                Some(existing) if existing == definition => {}
                Some(_) => return Err(PreprocessErrorKind::DuplicateDefinition(name.clone())),
                None => {
                    self.entries.insert(name.clone(), definition.clone());
                }
            }
        }
        Ok(())
    }
}

/// Header content of one included file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludedHeader {
    pub path: PathBuf,
    /// Line-aligned with the included file
    pub text: String,
}

/// Result of preprocessing a root file.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub path: PathBuf,
    /// Program text, line-aligned with the root file
    pub text: String,
    /// Content of the root file's own header blocks, line-aligned
    pub header_text: String,
    pub definitions: Definitions,
    /// Deduplicated; dependencies come before the files that include them
    pub includes: Vec<IncludedHeader>,
}

/// Preprocess `root`, reading files through `loader`.
pub fn preprocess(loader: &dyn SourceLoader, root: &Path) -> Result<Preprocessed, PreprocessError> {
    Preprocessor::new(loader).run(root)
}

pub struct Preprocessor<'a> {
    loader: &'a dyn SourceLoader,
    include_dirs: Vec<PathBuf>,
    predefined: Definitions,
    /// Files currently being processed, root first
    chain: Vec<PathBuf>,
    includes: Vec<IncludedHeader>,
}

impl<'a> Preprocessor<'a> {
    pub fn new(loader: &'a dyn SourceLoader) -> Self {
        Self {
            loader,
            include_dirs: Vec::new(),
            predefined: Definitions::new(),
            chain: Vec::new(),
            includes: Vec::new(),
        }
    }

    pub fn with_include_dirs(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.include_dirs.extend(dirs);
        self
    }

    /// Register a value visible to every file of the run.
    pub fn define(&mut self, name: &str, value: &str) -> Result<(), PreprocessError> {
        let origin = Path::new("<command line>");
        self.predefined
            .insert(name, Definition::new(value, origin, 0))
            .map_err(|kind| PreprocessError::unpositioned(kind, origin))
    }

    pub fn run(self, root: &Path) -> Result<Preprocessed, PreprocessError> {
        let text = self.loader.load(root).map_err(|_| {
            PreprocessError::unpositioned(
                PreprocessErrorKind::FileNotFound(root.display().to_string()),
                root,
            )
        })?;
        self.run_source(root, &text)
    }

    /// Preprocess `text` as if it had been read from `path`.
    pub fn run_source(mut self, path: &Path, text: &str) -> Result<Preprocessed, PreprocessError> {
        self.chain.push(normalize(path));
        let output = self.process(path, text)?;

        Ok(Preprocessed {
            path: path.to_path_buf(),
            text: output.text,
            header_text: output.header_text,
            definitions: output.definitions,
            includes: self.includes,
        })
    }

    fn process(&mut self, path: &Path, source: &str) -> Result<FileOutput, PreprocessError> {
        debug!("preprocessing {}", path.display());

        let mut run = FileRun::new(path, source, self.predefined.clone());
        for (index, line) in source.lines().enumerate() {
            self.process_line(&mut run, line, index + 1)?;
        }
        run.finish()
    }

    fn process_line(&mut self, run: &mut FileRun<'_>, line: &str, line_no: usize) -> Result<(), PreprocessError> {
        let in_header = run.header.is_some();

        let conditional = directive::conditional(line)
            .map_err(|kind| run.error(kind, line_no, indent_column(line)))?;
        if let Some(directive) = conditional {
            self.conditional(run, directive, line, line_no)?;
            run.emit("", in_header);
            return Ok(());
        }

        if !run.conditionals.is_active() {
            run.emit("", in_header);
            return Ok(());
        }

        let directive = directive::classify(line)
            .map_err(|kind| run.error(kind, line_no, indent_column(line)))?;

        match directive {
            Directive::HeaderStart { brace } if in_header => Err(run.error(
                PreprocessErrorKind::NestedHeaderBlock,
                line_no,
                directive::column_of(line, brace),
            )),
            Directive::HeaderStart { brace } => {
                let (block, content) = HeaderBlock::open(line, brace, line_no);
                run.header = block;
                run.emit(&content, true);
                Ok(())
            }
            Directive::Define {
                name,
                value,
                column,
            } => {
                let definition = Definition::new(value, run.path, line_no);
                run.definitions
                    .insert(name, definition)
                    .map_err(|kind| run.error(kind, line_no, column))?;
                debug!("{}:{}: define {} = {}", run.path.display(), line_no, name, value);
                run.emit("", in_header);
                Ok(())
            }
            Directive::Include { path, column } => {
                self.include(run, path, line_no, column)?;
                run.emit("", in_header);
                Ok(())
            }
            Directive::Text => {
                match run.header.as_mut().map(|block| block.feed(line)) {
                    Some(Feed::Continue(content)) => run.emit(content, true),
                    Some(Feed::Close(content)) => {
                        run.header = None;
                        run.emit(content, true);
                    }
                    None => run.emit(line, false),
                }
                Ok(())
            }
            // Handled above
            Directive::IfDef(_)
            | Directive::If(_)
            | Directive::Elif(_)
            | Directive::Else
            | Directive::EndIf => Ok(()),
        }
    }

    fn conditional(
        &self,
        run: &mut FileRun<'_>,
        directive: Directive<'_>,
        line: &str,
        line_no: usize,
    ) -> Result<(), PreprocessError> {
        let definitions = &run.definitions;
        let conditionals = &mut run.conditionals;

        let result = match directive {
            Directive::IfDef(name) => conditionals.open(Opener::IfDef, line_no, || {
                Ok::<_, PreprocessErrorKind>(definitions.contains(name))
            }),
            Directive::If(condition) => conditionals.open(Opener::If, line_no, || {
                evaluate_condition(condition, definitions)
            }),
            Directive::Elif(condition) => conditionals
                .elif(|| evaluate_condition(condition, definitions))
                .and_then(|open| {
                    open.then_some(()).ok_or(PreprocessErrorKind::UnbalancedConditional(
                        "Mismatched @elif encountered without a prior @if/@ifdef",
                    ))
                }),
            Directive::Else => conditionals.otherwise().then_some(()).ok_or(
                PreprocessErrorKind::UnbalancedConditional(
                    "Mismatched @else encountered without a prior @if/@ifdef",
                ),
            ),
            Directive::EndIf => conditionals
                .close()
                .then_some(())
                .ok_or(PreprocessErrorKind::UnbalancedConditional("Mismatched @endif encountered")),
            _ => Ok(()),
        };

        result.map_err(|kind| run.error(kind, line_no, indent_column(line)))
    }

    fn include(
        &mut self,
        run: &mut FileRun<'_>,
        spelled: &str,
        line_no: usize,
        column: usize,
    ) -> Result<(), PreprocessError> {
        let resolved = self.resolve(run.path, spelled).ok_or_else(|| {
            run.error(
                PreprocessErrorKind::FileNotFound(spelled.to_string()),
                line_no,
                column,
            )
        })?;

        if self.chain.contains(&resolved) || !run.included.insert(resolved.clone()) {
            return Err(run.error(
                PreprocessErrorKind::CyclicInclude(spelled.to_string()),
                line_no,
                column,
            ));
        }

        let text = self.loader.load(&resolved).map_err(|_| {
            run.error(
                PreprocessErrorKind::FileNotFound(spelled.to_string()),
                line_no,
                column,
            )
        })?;

        debug!(
            "{}:{}: entering include {}",
            run.path.display(),
            line_no,
            resolved.display()
        );
        self.chain.push(resolved.clone());
        let result = self.process(&resolved, &text);
        self.chain.pop();
        let output = result?;

        run.definitions
            .merge(&output.definitions)
            .map_err(|kind| run.error(kind, line_no, column))?;

        if !self.includes.iter().any(|header| header.path == resolved) {
            self.includes.push(IncludedHeader {
                path: resolved,
                text: output.header_text,
            });
        }
        Ok(())
    }

    /// Try the includer's directory, then the include directories, then the
    /// path as written. The result is normalized, so it identifies the file
    /// however the include was spelled.
    fn resolve(&self, includer: &Path, spelled: &str) -> Option<PathBuf> {
        let spelled = Path::new(spelled);
        let local = includer.parent().map(|dir| dir.join(spelled));

        local
            .into_iter()
            .chain(self.include_dirs.iter().map(|dir| dir.join(spelled)))
            .chain(std::iter::once(spelled.to_path_buf()))
            .map(|candidate| normalize(&candidate))
            .find(|candidate| self.loader.exists(candidate))
    }
}

/// Lexically collapse `.` and `..` components.
///
/// A `..` that cannot be collapsed is kept, except directly after the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

struct FileOutput {
    text: String,
    header_text: String,
    definitions: Definitions,
}

/// State of one file being processed.
struct FileRun<'f> {
    path: &'f Path,
    source: &'f str,
    definitions: Definitions,
    conditionals: ConditionalStack,
    header: Option<HeaderBlock>,
    /// Files included directly by this one
    included: FxHashSet<PathBuf>,
    text: String,
    header_text: String,
}

impl<'f> FileRun<'f> {
    fn new(path: &'f Path, source: &'f str, definitions: Definitions) -> Self {
        Self {
            path,
            source,
            definitions,
            conditionals: ConditionalStack::new(),
            header: None,
            included: FxHashSet::default(),
            text: String::with_capacity(source.len()),
            header_text: String::new(),
        }
    }

    /// Append one output line to the program text, and to the header text
    /// when it is header content.
    fn emit(&mut self, content: &str, header: bool) {
        self.text.push_str(content);
        self.text.push('\n');
        if header {
            self.header_text.push_str(content);
        }
        self.header_text.push('\n');
    }

    fn error(&self, kind: PreprocessErrorKind, line: usize, column: usize) -> PreprocessError {
        PreprocessError {
            kind,
            file: self.path.display().to_string(),
            line,
            column,
            source_line: self
                .source
                .lines()
                .nth(line.saturating_sub(1))
                .map(str::to_string),
        }
    }

    fn finish(self) -> Result<FileOutput, PreprocessError> {
        if let Some(block) = &self.header {
            return Err(self.error(
                PreprocessErrorKind::UnclosedHeaderBlock(block.balance()),
                block.opened_at,
                1,
            ));
        }

        if let Some(frame) = self.conditionals.innermost() {
            let message = match frame.opener {
                Opener::If => "Unterminated @if block",
                Opener::IfDef => "Unterminated @ifdef block",
            };
            return Err(self.error(
                PreprocessErrorKind::UnbalancedConditional(message),
                frame.line,
                1,
            ));
        }

        Ok(FileOutput {
            text: self.text,
            header_text: self.header_text,
            definitions: self.definitions,
        })
    }
}
