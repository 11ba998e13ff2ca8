//! Compilation pipeline
//!
//! ```text
//! path → Preprocessor → headers + text → Lexer (one handle per file) → Parser → TranslationUnit
//! ```
//!
//! Included header content is tokenized first, in include order, followed by
//! the root file. The streams are joined into one token sequence with a
//! single trailing end-of-file token, so declarations from headers are in
//! scope for the root file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use rustc_hash::FxHashMap;

use crate::config::FrontendConfig;
use crate::error::CompileError;
use crate::parser::ast::TranslationUnit;
use crate::parser::lexer::{scan, LexError, Token, TokenKind};
use crate::parser::parse::parse;
use crate::preprocessor::{Definitions, Preprocessed, Preprocessor};
use crate::source::{SourceHandle, SourceRegistry};

/// Where the preprocessor reads files from.
pub trait SourceLoader {
    fn exists(&self, path: &Path) -> bool;
    fn load(&self, path: &Path) -> io::Result<String>;
}

/// Reads from the file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn load(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

/// In-memory file map, used by tests and embedders.
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    files: FxHashMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.files.insert(path.into(), text.into());
    }
}

impl SourceLoader for MemoryLoader {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn load(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }
}

/// Output of a successful compilation.
#[derive(Debug)]
pub struct Compilation {
    pub unit: TranslationUnit,
    pub definitions: Definitions,
    /// Included files, dependencies first
    pub includes: Vec<PathBuf>,
    /// Every file that contributed tokens, headers first
    pub registry: SourceRegistry,
}

pub struct Frontend {
    config: FrontendConfig,
    loader: Box<dyn SourceLoader>,
}

impl Frontend {
    pub fn new(config: FrontendConfig) -> Self {
        Self {
            config,
            loader: Box::new(FsLoader),
        }
    }

    pub fn with_loader(mut self, loader: impl SourceLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn config(&self) -> &FrontendConfig {
        &self.config
    }

    /// Preprocess, tokenize and parse the file at `path`.
    pub fn compile(&self, path: &Path) -> Result<Compilation, CompileError> {
        let preprocessed = self.preprocessor()?.run(path)?;
        self.build(preprocessed)
    }

    /// Like [`compile`](Self::compile), with the root text supplied directly.
    /// Includes are still resolved relative to `path`.
    pub fn compile_source(&self, path: &Path, text: &str) -> Result<Compilation, CompileError> {
        let preprocessed = self.preprocessor()?.run_source(path, text)?;
        self.build(preprocessed)
    }

    fn preprocessor(&self) -> Result<Preprocessor<'_>, CompileError> {
        let mut preprocessor = Preprocessor::new(self.loader.as_ref())
            .with_include_dirs(self.config.include_dirs.iter().cloned());
        for (name, value) in &self.config.predefined {
            preprocessor.define(name, value)?;
        }
        Ok(preprocessor)
    }

    fn build(&self, preprocessed: Preprocessed) -> Result<Compilation, CompileError> {
        let Preprocessed {
            path,
            text,
            definitions,
            includes,
            ..
        } = preprocessed;

        let mut registry = SourceRegistry::new();
        let mut tokens = Vec::new();
        let mut lex_errors = Vec::new();
        let mut include_paths = Vec::with_capacity(includes.len());

        for header in includes {
            let handle = registry.register(&header.path, header.text);
            scan_header(&handle, &mut tokens, &mut lex_errors);
            include_paths.push(header.path);
        }

        // The root file supplies the single end-of-file token.
        let root = registry.register(&path, text);
        match scan(&root) {
            Ok(scanned) => tokens.extend(scanned),
            Err(errors) => lex_errors.extend(errors),
        }

        if !lex_errors.is_empty() {
            return Err(CompileError::Lex(lex_errors));
        }

        debug!(
            "parsing {} tokens from {} file(s)",
            tokens.len(),
            registry.len()
        );
        let unit = parse(tokens)?;

        Ok(Compilation {
            unit,
            definitions,
            includes: include_paths,
            registry,
        })
    }
}

/// Tokenize a header, appending its tokens without the end-of-file marker.
fn scan_header(source: &SourceHandle, tokens: &mut Vec<Token>, errors: &mut Vec<LexError>) {
    match scan(source) {
        Ok(scanned) => tokens.extend(scanned.into_iter().filter(|t| !t.is(TokenKind::Eof))),
        Err(scanned) => errors.extend(scanned),
    }
}

/// Compile a file from disk with the default configuration.
pub fn compile_file(path: impl AsRef<Path>) -> Result<Compilation, CompileError> {
    Frontend::new(FrontendConfig::default()).compile(path.as_ref())
}

/// Compile in-memory text; includes are read from disk relative to `path`.
pub fn compile_source(path: impl AsRef<Path>, text: &str) -> Result<Compilation, CompileError> {
    Frontend::new(FrontendConfig::default()).compile_source(path.as_ref(), text)
}
