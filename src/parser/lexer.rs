//! Lexer (tokenizer) for ents source code
//!
//! Converts preprocessed text into a flat [`Token`] stream consumed by the
//! parser. Each token carries a [`SourceLocation`] that shares the scanned
//! file's [`SourceHandle`], so diagnostics can name the originating file.
//!
//! Errors do not stop the scan: the offending character or literal is skipped,
//! the error is recorded, and scanning resumes. All errors are returned together
//! once the end of input is reached.

use log::trace;
use std::fmt;

use crate::diagnostic::{Diagnostic, Module, Severity};
use crate::source::{SourceHandle, SourceLocation};

/// Every token kind the lexer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    IntLiteral,
    CharLiteral,
    StringLiteral,

    // Identifiers
    Ident,

    // Declaration keywords
    Function,
    Return,
    Struct,
    Union,
    Enum,
    Typedef,
    Extern,
    Asm,

    // Control flow keywords
    If,
    Else,
    While,
    Switch,
    Case,
    Default,
    Break,
    Continue,

    // Attribute keywords
    Const,
    Static,
    Inline,
    Volatile,
    Packed,
    Aligned,
    Noreturn,
    Deprecated,

    // Type keywords
    Void,
    Byte,
    Word,
    Dword,
    Qword,
    Sbyte,
    Sword,
    Sdword,
    Sqword,

    // Arithmetic
    Plus,  // +
    Minus, // -
    Star,  // *
    Slash, // /

    // Comparison
    EqEq,  // ==
    NotEq, // !=
    Lt,    // <
    Le,    // <=
    Gt,    // >
    Ge,    // >=

    // Logical and bitwise
    Bang, // !
    Amp,  // &
    Pipe, // |

    // Assignment
    Eq, // =

    // Increment/Decrement
    PlusPlus,   // ++
    MinusMinus, // --

    // Punctuation
    Dot,       // .
    Colon,     // :
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    LBracket,  // [
    RBracket,  // ]
    Semicolon, // ;
    Comma,     // ,

    // End of file
    Eof,
}

impl TokenKind {
    /// Fixed-width builtin type names, including `void`.
    pub fn is_type_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Void
                | TokenKind::Byte
                | TokenKind::Word
                | TokenKind::Dword
                | TokenKind::Qword
                | TokenKind::Sbyte
                | TokenKind::Sword
                | TokenKind::Sdword
                | TokenKind::Sqword
        )
    }

    /// Qualifier keywords that may prefix a declaration.
    pub fn is_attribute_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Const
                | TokenKind::Static
                | TokenKind::Inline
                | TokenKind::Volatile
                | TokenKind::Packed
                | TokenKind::Aligned
                | TokenKind::Noreturn
                | TokenKind::Deprecated
        )
    }

    /// Human-readable spelling used in error messages.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::IntLiteral => "integer literal",
            TokenKind::CharLiteral => "character literal",
            TokenKind::StringLiteral => "string literal",
            TokenKind::Ident => "identifier",
            TokenKind::Function => "'function'",
            TokenKind::Return => "'return'",
            TokenKind::Struct => "'struct'",
            TokenKind::Union => "'union'",
            TokenKind::Enum => "'enum'",
            TokenKind::Typedef => "'typedef'",
            TokenKind::Extern => "'extern'",
            TokenKind::Asm => "'asm'",
            TokenKind::If => "'if'",
            TokenKind::Else => "'else'",
            TokenKind::While => "'while'",
            TokenKind::Switch => "'switch'",
            TokenKind::Case => "'case'",
            TokenKind::Default => "'default'",
            TokenKind::Break => "'break'",
            TokenKind::Continue => "'continue'",
            TokenKind::Const => "'const'",
            TokenKind::Static => "'static'",
            TokenKind::Inline => "'inline'",
            TokenKind::Volatile => "'volatile'",
            TokenKind::Packed => "'packed'",
            TokenKind::Aligned => "'aligned'",
            TokenKind::Noreturn => "'noreturn'",
            TokenKind::Deprecated => "'deprecated'",
            TokenKind::Void => "'void'",
            TokenKind::Byte => "'byte'",
            TokenKind::Word => "'word'",
            TokenKind::Dword => "'dword'",
            TokenKind::Qword => "'qword'",
            TokenKind::Sbyte => "'sbyte'",
            TokenKind::Sword => "'sword'",
            TokenKind::Sdword => "'sdword'",
            TokenKind::Sqword => "'sqword'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::EqEq => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::Le => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::Ge => "'>='",
            TokenKind::Bang => "'!'",
            TokenKind::Amp => "'&'",
            TokenKind::Pipe => "'|'",
            TokenKind::Eq => "'='",
            TokenKind::PlusPlus => "'++'",
            TokenKind::MinusMinus => "'--'",
            TokenKind::Dot => "'.'",
            TokenKind::Colon => "':'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Semicolon => "';'",
            TokenKind::Comma => "','",
            TokenKind::Eof => "end of file",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Looks up the keyword table; `None` means a plain identifier.
pub fn keyword(ident: &str) -> Option<TokenKind> {
    let kind = match ident {
        "function" | "fn" => TokenKind::Function,
        "return" => TokenKind::Return,
        "struct" => TokenKind::Struct,
        "union" => TokenKind::Union,
        "enum" => TokenKind::Enum,
        "typedef" => TokenKind::Typedef,
        "extern" => TokenKind::Extern,
        "asm" => TokenKind::Asm,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "switch" => TokenKind::Switch,
        "case" => TokenKind::Case,
        "default" => TokenKind::Default,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "const" => TokenKind::Const,
        "static" => TokenKind::Static,
        "inline" => TokenKind::Inline,
        "volatile" => TokenKind::Volatile,
        "packed" => TokenKind::Packed,
        "aligned" => TokenKind::Aligned,
        "noreturn" => TokenKind::Noreturn,
        "deprecated" => TokenKind::Deprecated,
        "void" => TokenKind::Void,
        "byte" => TokenKind::Byte,
        "word" => TokenKind::Word,
        "dword" => TokenKind::Dword,
        "qword" => TokenKind::Qword,
        "sbyte" => TokenKind::Sbyte,
        "sword" => TokenKind::Sword,
        "sdword" => TokenKind::Sdword,
        "sqword" => TokenKind::Sqword,
        _ => return None,
    };
    Some(kind)
}

/// A single lexical token.
///
/// `text` is the identifier or keyword spelling, the full numeric spelling
/// (`0x1F`, `0b101`, `42`), or the unescaped value of a string or character
/// literal. Punctuation carries its own spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind,
            text: text.into(),
            location,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Ident => write!(f, "identifier '{}'", self.text),
            TokenKind::IntLiteral => write!(f, "integer literal {}", self.text),
            TokenKind::CharLiteral => write!(f, "character literal {:?}", self.text),
            TokenKind::StringLiteral => write!(f, "string literal {:?}", self.text),
            kind => f.write_str(kind.describe()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexErrorKind {
    #[error("Unterminated {0} literal")]
    UnterminatedLiteral(&'static str),
    #[error("Empty character literal")]
    EmptyCharacterLiteral,
    #[error("Unexpected character '{0}'")]
    UnexpectedCharacter(char),
    #[error("Unknown escape sequence '\\{0}'")]
    InvalidEscape(char),
    #[error("Unterminated block comment")]
    UnterminatedComment,
}

/// Lexer error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{location}: {kind}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub location: SourceLocation,
}

impl LexError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::at(
            Severity::Error,
            Module::Lexer,
            &self.location,
            self.kind.to_string(),
        )
    }
}

/// Scan a registered source into tokens, ending with an `Eof` token.
pub fn scan(source: &SourceHandle) -> Result<Vec<Token>, Vec<LexError>> {
    Lexer::new(source).tokenize()
}

/// Lexer for ents source code
pub struct Lexer {
    source: SourceHandle,
    input: Vec<char>,
    position: usize,
    offset: usize,
    line: usize,
    column: usize,
    line_starts: Vec<usize>,
    errors: Vec<LexError>,
}

impl Lexer {
    /// Create a new lexer over the text of `source`.
    pub fn new(source: &SourceHandle) -> Self {
        Self {
            source: source.clone(),
            input: source.text().chars().collect(),
            position: 0,
            offset: 0,
            line: 1,
            column: 1,
            line_starts: vec![0],
            errors: Vec::new(),
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(mut self) -> Result<Vec<Token>, Vec<LexError>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments();

            if self.is_at_end() {
                tokens.push(Token::new(TokenKind::Eof, "", self.current_location()));
                break;
            }

            if let Some(token) = self.next_token() {
                tokens.push(token);
            }
        }

        trace!(
            "scanned {} tokens from {} ({} lines)",
            tokens.len(),
            self.source.name(),
            self.line_starts.len()
        );
        self.source.record_line_starts(self.line_starts);

        if self.errors.is_empty() {
            Ok(tokens)
        } else {
            Err(self.errors)
        }
    }

    /// Get next token, or `None` after recording an error.
    fn next_token(&mut self) -> Option<Token> {
        let loc = self.current_location();
        let ch = self.advance()?;

        let (kind, text): (TokenKind, &str) = match ch {
            '"' => return self.string_literal(loc),
            '\'' => return self.char_literal(loc),
            '0'..='9' => return Some(self.number_literal(ch, loc)),
            'a'..='z' | 'A'..='Z' | '_' => return Some(self.identifier_or_keyword(ch, loc)),

            '+' => {
                if self.match_char('+') {
                    (TokenKind::PlusPlus, "++")
                } else {
                    (TokenKind::Plus, "+")
                }
            }
            '-' => {
                if self.match_char('-') {
                    (TokenKind::MinusMinus, "--")
                } else {
                    (TokenKind::Minus, "-")
                }
            }
            '=' => {
                if self.match_char('=') {
                    (TokenKind::EqEq, "==")
                } else {
                    (TokenKind::Eq, "=")
                }
            }
            '!' => {
                if self.match_char('=') {
                    (TokenKind::NotEq, "!=")
                } else {
                    (TokenKind::Bang, "!")
                }
            }
            '<' => {
                if self.match_char('=') {
                    (TokenKind::Le, "<=")
                } else {
                    (TokenKind::Lt, "<")
                }
            }
            '>' => {
                if self.match_char('=') {
                    (TokenKind::Ge, ">=")
                } else {
                    (TokenKind::Gt, ">")
                }
            }
            '*' => (TokenKind::Star, "*"),
            '/' => (TokenKind::Slash, "/"),
            '&' => (TokenKind::Amp, "&"),
            '|' => (TokenKind::Pipe, "|"),
            '.' => (TokenKind::Dot, "."),
            ':' => (TokenKind::Colon, ":"),
            '(' => (TokenKind::LParen, "("),
            ')' => (TokenKind::RParen, ")"),
            '{' => (TokenKind::LBrace, "{"),
            '}' => (TokenKind::RBrace, "}"),
            '[' => (TokenKind::LBracket, "["),
            ']' => (TokenKind::RBracket, "]"),
            ';' => (TokenKind::Semicolon, ";"),
            ',' => (TokenKind::Comma, ","),

            _ => {
                self.error(LexErrorKind::UnexpectedCharacter(ch), loc);
                return None;
            }
        };

        Some(Token::new(kind, text, loc))
    }

    /// Scan one character of a quoted literal, resolving escapes.
    ///
    /// Returns `None` at end of input. Invalid escapes are recorded and
    /// replaced by the escaped character itself.
    fn literal_char(&mut self, quote: char) -> Option<char> {
        let loc = self.current_location();
        let ch = self.advance()?;
        if ch != '\\' {
            return Some(ch);
        }

        let escaped = self.advance()?;
        let value = match escaped {
            'n' => '\n',
            't' => '\t',
            '\\' => '\\',
            c if c == quote => quote,
            other => {
                self.error(LexErrorKind::InvalidEscape(other), loc);
                other
            }
        };
        Some(value)
    }

    /// Parse string literal
    fn string_literal(&mut self, loc: SourceLocation) -> Option<Token> {
        let mut string = String::new();

        while let Some(ch) = self.peek() {
            if ch == '"' {
                self.advance();
                return Some(Token::new(TokenKind::StringLiteral, string, loc));
            }
            match self.literal_char('"') {
                Some(value) => string.push(value),
                None => break,
            }
        }

        self.error(LexErrorKind::UnterminatedLiteral("string"), loc);
        None
    }

    /// Parse character literal
    fn char_literal(&mut self, loc: SourceLocation) -> Option<Token> {
        match self.peek() {
            None | Some('\n') => {
                self.error(LexErrorKind::UnterminatedLiteral("character"), loc);
                return None;
            }
            Some('\'') => {
                self.advance();
                self.error(LexErrorKind::EmptyCharacterLiteral, loc);
                return None;
            }
            Some(_) => {}
        }

        let value = self.literal_char('\'');

        if value.is_some() && self.match_char('\'') {
            let text = value.map(String::from).unwrap_or_default();
            return Some(Token::new(TokenKind::CharLiteral, text, loc));
        }

        // Resynchronize at the closing quote or the end of the line.
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
            if ch == '\'' {
                break;
            }
        }
        self.error(LexErrorKind::UnterminatedLiteral("character"), loc);
        None
    }

    /// Parse numeric literal: decimal, `0x` hexadecimal or `0b` binary
    fn number_literal(&mut self, first_digit: char, loc: SourceLocation) -> Token {
        let mut num_str = String::new();
        num_str.push(first_digit);

        let is_digit: fn(char) -> bool = match (first_digit, self.peek()) {
            ('0', Some('x' | 'X')) => |c: char| c.is_ascii_hexdigit(),
            ('0', Some('b' | 'B')) => |c: char| c == '0' || c == '1',
            _ => |c: char| c.is_ascii_digit(),
        };

        if first_digit == '0' {
            if let Some(prefix @ ('x' | 'X' | 'b' | 'B')) = self.peek() {
                num_str.push(prefix);
                self.advance();
            }
        }

        while let Some(ch) = self.peek() {
            if is_digit(ch) {
                num_str.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::new(TokenKind::IntLiteral, num_str, loc)
    }

    /// Parse identifier or keyword
    fn identifier_or_keyword(&mut self, first_char: char, loc: SourceLocation) -> Token {
        let mut ident = String::new();
        ident.push(first_char);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let kind = keyword(&ident).unwrap_or(TokenKind::Ident);
        Token::new(kind, ident, loc)
    }

    /// Skip whitespace and comments
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => {
                    self.advance();
                }
                Some('/') => {
                    if self.peek_ahead(1) == Some('/') {
                        self.skip_line_comment();
                    } else if self.peek_ahead(1) == Some('*') {
                        self.skip_block_comment();
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    /// Skip single-line comment (// ...)
    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Skip multi-line comment (/* ... */)
    fn skip_block_comment(&mut self) {
        let start_loc = self.current_location();
        self.advance(); // skip '/'
        self.advance(); // skip '*'

        while !self.is_at_end() {
            if self.peek() == Some('*') && self.peek_ahead(1) == Some('/') {
                self.advance(); // skip '*'
                self.advance(); // skip '/'
                return;
            }
            self.advance();
        }

        self.error(LexErrorKind::UnterminatedComment, start_loc);
    }

    fn error(&mut self, kind: LexErrorKind, location: SourceLocation) {
        self.errors.push(LexError { kind, location });
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Peek at current character without consuming
    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek ahead n characters
    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    /// Advance to next character, maintaining the line-start index
    fn advance(&mut self) -> Option<char> {
        let ch = *self.input.get(self.position)?;
        self.position += 1;
        self.offset += ch.len_utf8();

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
            self.line_starts.push(self.offset);
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    /// Check if at end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get current source location
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.source.clone(), self.line, self.column)
    }
}
