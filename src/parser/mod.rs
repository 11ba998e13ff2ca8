//! ents source parser
//!
//! This module transforms preprocessed ents text into an Abstract Syntax Tree:
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parse`]: Parsing (tokens → AST), with declaration tracking in [`scope`]
//! - [`ast`]: AST node definitions
//! - [`printer`]: Indented tree dump for debugging
//!
//! # Supported language
//!
//! - Types: `void`, `byte`, `word`, `dword`, `qword` and their signed
//!   `s`-prefixed forms, with any number of `*`
//! - Declarations: globals, `fn` prototypes and definitions, `extern`, qualifiers
//! - Statements: locals, assignment, `if`/`else if`/`else`, `while`, `switch`,
//!   `return`, `break`, `continue`, blocks
//! - Expressions: arithmetic, comparison, bitwise and logical operators,
//!   increments, address-of and dereference, indexing, member access and
//!   uniform function call syntax
//! - No `struct`, `union`, `enum`, `typedef` or inline assembly; they are
//!   tokenized and rejected with an error
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with precedence climbing for binary operators.
//! No external parser generator dependencies.

pub mod ast;
mod declarations;
mod expressions;
pub mod lexer;
pub mod parse;
pub mod printer;
pub mod scope;
mod statements;

pub use parse::{parse, ParseError, ParseErrorKind, Parser};
