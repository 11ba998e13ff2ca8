// AST (Abstract Syntax Tree) definitions for the ents front end
//
// The tree is owned top-down: every parent exclusively owns its children
// through `Box`, `Vec` or `NodeList`. The only shared data is the
// `SourceHandle` inside each node's `SourceLocation`.

use std::fmt;
use std::ops::Index;

pub use crate::source::SourceLocation;

use crate::parser::lexer::TokenKind;

/// Fixed-width builtin types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Void,
    Byte,
    Word,
    DWord,
    QWord,
    SByte,
    SWord,
    SDWord,
    SQWord,
}

impl BaseType {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        let base = match kind {
            TokenKind::Void => BaseType::Void,
            TokenKind::Byte => BaseType::Byte,
            TokenKind::Word => BaseType::Word,
            TokenKind::Dword => BaseType::DWord,
            TokenKind::Qword => BaseType::QWord,
            TokenKind::Sbyte => BaseType::SByte,
            TokenKind::Sword => BaseType::SWord,
            TokenKind::Sdword => BaseType::SDWord,
            TokenKind::Sqword => BaseType::SQWord,
            _ => return None,
        };
        Some(base)
    }

    pub fn name(self) -> &'static str {
        match self {
            BaseType::Void => "void",
            BaseType::Byte => "byte",
            BaseType::Word => "word",
            BaseType::DWord => "dword",
            BaseType::QWord => "qword",
            BaseType::SByte => "sbyte",
            BaseType::SWord => "sword",
            BaseType::SDWord => "sdword",
            BaseType::SQWord => "sqword",
        }
    }

    /// Storage size in bytes; `void` has none.
    pub fn size(self) -> usize {
        match self {
            BaseType::Void => 0,
            BaseType::Byte | BaseType::SByte => 1,
            BaseType::Word | BaseType::SWord => 2,
            BaseType::DWord | BaseType::SDWord => 4,
            BaseType::QWord | BaseType::SQWord => 8,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            BaseType::SByte | BaseType::SWord | BaseType::SDWord | BaseType::SQWord
        )
    }
}

/// Type reference: a base type plus pointer depth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    pub base: BaseType,
    pub pointer_depth: usize, // 0 = not pointer, 1 = *, 2 = **, etc.
    pub location: SourceLocation,
}

impl Type {
    pub fn new(base: BaseType, location: SourceLocation) -> Self {
        Type {
            base,
            pointer_depth: 0,
            location,
        }
    }

    pub fn with_pointer(mut self) -> Self {
        self.pointer_depth += 1;
        self
    }

    pub fn is_void(&self) -> bool {
        self.base == BaseType::Void && self.pointer_depth == 0
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.base.name(), "*".repeat(self.pointer_depth))
    }
}

/// Declaration qualifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Const,
    Volatile,
    Static,
    Inline,
    Packed,
    Aligned,
    Noreturn,
    Deprecated,
}

impl AttributeKind {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        let attr = match kind {
            TokenKind::Const => AttributeKind::Const,
            TokenKind::Volatile => AttributeKind::Volatile,
            TokenKind::Static => AttributeKind::Static,
            TokenKind::Inline => AttributeKind::Inline,
            TokenKind::Packed => AttributeKind::Packed,
            TokenKind::Aligned => AttributeKind::Aligned,
            TokenKind::Noreturn => AttributeKind::Noreturn,
            TokenKind::Deprecated => AttributeKind::Deprecated,
            _ => return None,
        };
        Some(attr)
    }

    pub fn name(self) -> &'static str {
        match self {
            AttributeKind::Const => "const",
            AttributeKind::Volatile => "volatile",
            AttributeKind::Static => "static",
            AttributeKind::Inline => "inline",
            AttributeKind::Packed => "packed",
            AttributeKind::Aligned => "aligned",
            AttributeKind::Noreturn => "noreturn",
            AttributeKind::Deprecated => "deprecated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub kind: AttributeKind,
    pub location: SourceLocation,
}

/// Ordered, append-only list of child nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeList<T> {
    items: Vec<T>,
}

impl<T> NodeList<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T> Default for NodeList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<usize> for NodeList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<T> FromIterator<T> for NodeList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a, T> IntoIterator for &'a NodeList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> IntoIterator for NodeList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Bitwise
    BitAnd,
    BitOr,
    // Logical
    And,
    Or,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Plus,    // +x
    Neg,     // -x
    Not,     // !x
    PreInc,  // ++x
    PreDec,  // --x
    PostInc, // x++
    PostDec, // x--
    Deref,   // *x
    AddrOf,  // &x
}

impl UnOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnOp::Plus => "+",
            UnOp::Neg => "-",
            UnOp::Not => "!",
            UnOp::PreInc | UnOp::PostInc => "++",
            UnOp::PreDec | UnOp::PostDec => "--",
            UnOp::Deref => "*",
            UnOp::AddrOf => "&",
        }
    }

    /// Increment and decrement operators need a variable operand.
    pub fn needs_variable(self) -> bool {
        matches!(
            self,
            UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec
        )
    }
}

/// Spelling of an integer literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radix {
    Binary,
    Decimal,
    Hexadecimal,
}

impl Radix {
    pub fn base(self) -> u32 {
        match self {
            Radix::Binary => 2,
            Radix::Decimal => 10,
            Radix::Hexadecimal => 16,
        }
    }
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    IntLiteral {
        value: u64,
        radix: Radix,
        location: SourceLocation,
    },
    CharLiteral {
        value: char,
        location: SourceLocation,
    },
    StringLiteral {
        value: String,
        location: SourceLocation,
    },
    Variable {
        name: String,
        location: SourceLocation,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        location: SourceLocation,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    /// Direct call, also produced by rewriting `base.name(args)`.
    Call {
        name: String,
        args: NodeList<Expr>,
        location: SourceLocation,
    },
    Member {
        base: Box<Expr>,
        member: String,
        location: SourceLocation,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
        location: SourceLocation,
    },
}

impl Expr {
    pub fn location(&self) -> &SourceLocation {
        match self {
            Expr::IntLiteral { location, .. }
            | Expr::CharLiteral { location, .. }
            | Expr::StringLiteral { location, .. }
            | Expr::Variable { location, .. }
            | Expr::Unary { location, .. }
            | Expr::Binary { location, .. }
            | Expr::Call { location, .. }
            | Expr::Member { location, .. }
            | Expr::Index { location, .. } => location,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Expr::IntLiteral { .. } => NodeKind::IntLiteral,
            Expr::CharLiteral { .. } => NodeKind::CharLiteral,
            Expr::StringLiteral { .. } => NodeKind::StringLiteral,
            Expr::Variable { .. } => NodeKind::Variable,
            Expr::Unary { .. } => NodeKind::Unary,
            Expr::Binary { .. } => NodeKind::Binary,
            Expr::Call { .. } => NodeKind::Call,
            Expr::Member { .. } => NodeKind::Member,
            Expr::Index { .. } => NodeKind::Index,
        }
    }

    /// Name of the referenced variable, if this is a variable reference.
    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Expr::Variable { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Whether the expression denotes a storage location.
    pub fn is_place(&self) -> bool {
        matches!(
            self,
            Expr::Variable { .. }
                | Expr::Index { .. }
                | Expr::Member { .. }
                | Expr::Unary {
                    op: UnOp::Deref,
                    ..
                }
        )
    }
}

/// Variable declaration, global or local
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarDecl {
    pub name: String,
    pub var_type: Type,
    pub init: Option<Expr>,
    pub attributes: NodeList<Attribute>,
    pub location: SourceLocation,
}

/// Function parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub param_type: Type,
    pub attributes: NodeList<Attribute>,
    pub location: SourceLocation,
}

/// Function prototype: everything but the body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: NodeList<Param>,
    pub is_variadic: bool,
    pub return_type: Type,
    pub attributes: NodeList<Attribute>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub decl: FunctionDecl,
    pub body: Block,
}

/// Top-level declarations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    Function(FunctionDecl),
    FunctionDef(FunctionDef),
    Var(VarDecl),
    Extern {
        decl: Box<Decl>,
        location: SourceLocation,
    },
}

impl Decl {
    pub fn location(&self) -> &SourceLocation {
        match self {
            Decl::Function(decl) => &decl.location,
            Decl::FunctionDef(def) => &def.decl.location,
            Decl::Var(var) => &var.location,
            Decl::Extern { location, .. } => location,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Decl::Function(_) => NodeKind::FunctionDecl,
            Decl::FunctionDef(_) => NodeKind::FunctionDef,
            Decl::Var(_) => NodeKind::VarDecl,
            Decl::Extern { .. } => NodeKind::Extern,
        }
    }

    /// Declared name, looking through `extern`.
    pub fn name(&self) -> &str {
        match self {
            Decl::Function(decl) => &decl.name,
            Decl::FunctionDef(def) => &def.decl.name,
            Decl::Var(var) => &var.name,
            Decl::Extern { decl, .. } => decl.name(),
        }
    }
}

/// Braced statement sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub statements: NodeList<Stmt>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Block,
    pub else_branch: Option<Box<ElseBranch>>,
    pub location: SourceLocation,
}

impl IfStmt {
    /// Attach `branch` at the end of the `else if` chain.
    pub fn attach_else(&mut self, branch: ElseBranch) {
        if let Some(ElseBranch::If(nested)) = self.else_branch.as_deref_mut() {
            nested.attach_else(branch);
            return;
        }
        self.else_branch = Some(Box::new(branch));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElseBranch {
    If(IfStmt),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchCase {
    pub value: Expr,
    pub body: NodeList<Stmt>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultCase {
    pub body: NodeList<Stmt>,
    pub location: SourceLocation,
}

/// Statements
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    VarDecl(VarDecl),
    Block(Block),
    If(IfStmt),
    While {
        condition: Expr,
        body: Block,
        location: SourceLocation,
    },
    Switch {
        scrutinee: Expr,
        cases: NodeList<SwitchCase>,
        default: Option<DefaultCase>,
        location: SourceLocation,
    },
    Return {
        value: Option<Expr>,
        location: SourceLocation,
    },
    Break {
        location: SourceLocation,
    },
    Continue {
        location: SourceLocation,
    },
    Assign {
        target: Expr,
        value: Expr,
        location: SourceLocation,
    },
    /// Calls and increments evaluated for their effect
    Expr(Expr),
}

impl Stmt {
    pub fn location(&self) -> &SourceLocation {
        match self {
            Stmt::VarDecl(var) => &var.location,
            Stmt::Block(block) => &block.location,
            Stmt::If(stmt) => &stmt.location,
            Stmt::While { location, .. }
            | Stmt::Switch { location, .. }
            | Stmt::Return { location, .. }
            | Stmt::Break { location }
            | Stmt::Continue { location }
            | Stmt::Assign { location, .. } => location,
            Stmt::Expr(expr) => expr.location(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Stmt::VarDecl(_) => NodeKind::VarDecl,
            Stmt::Block(_) => NodeKind::Block,
            Stmt::If(_) => NodeKind::If,
            Stmt::While { .. } => NodeKind::While,
            Stmt::Switch { .. } => NodeKind::Switch,
            Stmt::Return { .. } => NodeKind::Return,
            Stmt::Break { .. } => NodeKind::Break,
            Stmt::Continue { .. } => NodeKind::Continue,
            Stmt::Assign { .. } => NodeKind::Assign,
            Stmt::Expr(_) => NodeKind::ExprStmt,
        }
    }
}

/// Root of the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationUnit {
    pub declarations: NodeList<Decl>,
    pub location: SourceLocation,
}

impl TranslationUnit {
    pub fn new(location: SourceLocation) -> Self {
        TranslationUnit {
            declarations: NodeList::new(),
            location,
        }
    }

    /// Look up a top-level declaration by name; definitions win over prototypes.
    pub fn find(&self, name: &str) -> Option<&Decl> {
        self.declarations
            .iter()
            .filter(|decl| decl.name() == name)
            .max_by_key(|decl| matches!(decl, Decl::FunctionDef(_)))
    }
}

/// Tag of every node variant, for kind tests and debug output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    TranslationUnit,
    FunctionDecl,
    FunctionDef,
    VarDecl,
    Extern,
    Param,
    Attribute,
    TypeRef,
    Block,
    If,
    Else,
    While,
    Switch,
    Case,
    Default,
    Return,
    Break,
    Continue,
    Assign,
    ExprStmt,
    IntLiteral,
    CharLiteral,
    StringLiteral,
    Variable,
    Unary,
    Binary,
    Call,
    Member,
    Index,
}

impl NodeKind {
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::TranslationUnit => "TranslationUnit",
            NodeKind::FunctionDecl => "FunctionDecl",
            NodeKind::FunctionDef => "FunctionDef",
            NodeKind::VarDecl => "VarDecl",
            NodeKind::Extern => "Extern",
            NodeKind::Param => "Param",
            NodeKind::Attribute => "Attribute",
            NodeKind::TypeRef => "Type",
            NodeKind::Block => "Block",
            NodeKind::If => "If",
            NodeKind::Else => "Else",
            NodeKind::While => "While",
            NodeKind::Switch => "Switch",
            NodeKind::Case => "Case",
            NodeKind::Default => "Default",
            NodeKind::Return => "Return",
            NodeKind::Break => "Break",
            NodeKind::Continue => "Continue",
            NodeKind::Assign => "Assign",
            NodeKind::ExprStmt => "ExprStmt",
            NodeKind::IntLiteral => "IntLiteral",
            NodeKind::CharLiteral => "CharLiteral",
            NodeKind::StringLiteral => "StringLiteral",
            NodeKind::Variable => "Variable",
            NodeKind::Unary => "Unary",
            NodeKind::Binary => "Binary",
            NodeKind::Call => "Call",
            NodeKind::Member => "Member",
            NodeKind::Index => "Index",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
