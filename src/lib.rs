//! # Introduction
//!
//! ents is the front end of a compiler for a small C-like systems language:
//! fixed-width integer types, pointers, functions and the usual control
//! flow. It turns a source file, plus the files it includes, into a single
//! abstract syntax tree for a code generator to consume.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Preprocessor → Lexer → Parser (+ scope tracking) → AST
//! ```
//!
//! 1. [`preprocessor`]: conditional compilation, `define`d values,
//!    `include` and `header { }` blocks. Output stays line-aligned with the
//!    input so positions survive.
//! 2. [`parser::lexer`]: tokens carrying a shared [`source::SourceHandle`].
//! 3. [`parser`]: recursive descent with precedence climbing, checking
//!    declarations against a [`parser::scope::ScopeStack`] and rewriting
//!    `a.f(b)` into `f(a, b)`.
//! 4. [`driver`]: wires the stages together; [`error::CompileError`] and
//!    [`diagnostic::Diagnostic`] report what went wrong.
//!
//! ```no_run
//! let compilation = ents::compile_file("main.e")?;
//! print!("{}", ents::parser::printer::dump(&compilation.unit));
//! # Ok::<(), ents::CompileError>(())
//! ```

pub mod config;
pub mod diagnostic;
pub mod driver;
pub mod error;
pub mod parser;
pub mod preprocessor;
pub mod source;

pub use config::FrontendConfig;
pub use driver::{compile_file, compile_source, Compilation, Frontend};
pub use error::CompileError;
