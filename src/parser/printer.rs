//! Indented text dump of a translation unit
//!
//! One node per line, children indented by two spaces:
//!
//! ```text
//! TranslationUnit @1:1
//!   FunctionDef main -> dword @1:1
//!     Block @1:20
//!       Return @1:22
//!         IntLiteral 0 @1:29
//! ```

use std::fmt::Write;

use crate::parser::ast::*;

/// Render `unit` as an indented tree.
pub fn dump(unit: &TranslationUnit) -> String {
    let mut printer = Printer::default();
    printer.line(NodeKind::TranslationUnit, "", &unit.location);
    printer.nested(|p| {
        for decl in &unit.declarations {
            p.decl(decl);
        }
    });
    printer.out
}

#[derive(Default)]
struct Printer {
    out: String,
    depth: usize,
}

impl Printer {
    fn line(&mut self, kind: NodeKind, detail: &str, loc: &SourceLocation) {
        let _ = write!(self.out, "{:width$}{}", "", kind, width = self.depth * 2);
        if !detail.is_empty() {
            let _ = write!(self.out, " {detail}");
        }
        let _ = writeln!(self.out, " @{}:{}", loc.line, loc.column);
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self)) {
        self.depth += 1;
        f(self);
        self.depth -= 1;
    }

    fn attributes(&mut self, attributes: &NodeList<Attribute>) {
        for attr in attributes {
            self.line(NodeKind::Attribute, attr.kind.name(), &attr.location);
        }
    }

    fn decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Function(func) => self.signature(NodeKind::FunctionDecl, func, None),
            Decl::FunctionDef(def) => {
                self.signature(NodeKind::FunctionDef, &def.decl, Some(&def.body))
            }
            Decl::Var(var) => self.var(var),
            Decl::Extern { decl, location } => {
                self.line(NodeKind::Extern, "", location);
                self.nested(|p| p.decl(decl));
            }
        }
    }

    fn signature(&mut self, kind: NodeKind, func: &FunctionDecl, body: Option<&Block>) {
        let variadic = if func.is_variadic { " ..." } else { "" };
        let detail = format!("{}{} -> {}", func.name, variadic, func.return_type);
        self.line(kind, &detail, &func.location);

        self.nested(|p| {
            p.attributes(&func.attributes);
            for param in &func.params {
                let detail = format!("{} {}", param.param_type, param.name);
                p.line(NodeKind::Param, &detail, &param.location);
                p.nested(|p| p.attributes(&param.attributes));
            }
            if let Some(body) = body {
                p.block(body);
            }
        });
    }

    fn var(&mut self, var: &VarDecl) {
        let detail = format!("{} {}", var.var_type, var.name);
        self.line(NodeKind::VarDecl, &detail, &var.location);
        self.nested(|p| {
            p.attributes(&var.attributes);
            if let Some(init) = &var.init {
                p.expr(init);
            }
        });
    }

    fn block(&mut self, block: &Block) {
        self.line(NodeKind::Block, "", &block.location);
        self.nested(|p| p.statements(&block.statements));
    }

    fn statements(&mut self, statements: &NodeList<Stmt>) {
        for stmt in statements {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl(var) => self.var(var),
            Stmt::Block(block) => self.block(block),
            Stmt::If(if_stmt) => self.if_stmt(if_stmt),
            Stmt::While {
                condition,
                body,
                location,
            } => {
                self.line(NodeKind::While, "", location);
                self.nested(|p| {
                    p.expr(condition);
                    p.block(body);
                });
            }
            Stmt::Switch {
                scrutinee,
                cases,
                default,
                location,
            } => {
                self.line(NodeKind::Switch, "", location);
                self.nested(|p| {
                    p.expr(scrutinee);
                    for case in cases {
                        p.line(NodeKind::Case, "", &case.location);
                        p.nested(|p| {
                            p.expr(&case.value);
                            p.statements(&case.body);
                        });
                    }
                    if let Some(default) = default {
                        p.line(NodeKind::Default, "", &default.location);
                        p.nested(|p| p.statements(&default.body));
                    }
                });
            }
            Stmt::Return { value, location } => {
                self.line(NodeKind::Return, "", location);
                if let Some(value) = value {
                    self.nested(|p| p.expr(value));
                }
            }
            Stmt::Break { location } => self.line(NodeKind::Break, "", location),
            Stmt::Continue { location } => self.line(NodeKind::Continue, "", location),
            Stmt::Assign {
                target,
                value,
                location,
            } => {
                self.line(NodeKind::Assign, "", location);
                self.nested(|p| {
                    p.expr(target);
                    p.expr(value);
                });
            }
            Stmt::Expr(expr) => {
                self.line(NodeKind::ExprStmt, "", expr.location());
                self.nested(|p| p.expr(expr));
            }
        }
    }

    fn if_stmt(&mut self, stmt: &IfStmt) {
        self.line(NodeKind::If, "", &stmt.location);
        self.nested(|p| {
            p.expr(&stmt.condition);
            p.block(&stmt.then_branch);
            match stmt.else_branch.as_deref() {
                Some(ElseBranch::If(next)) => p.if_stmt(next),
                Some(ElseBranch::Block(block)) => {
                    p.line(NodeKind::Else, "", &block.location);
                    p.nested(|p| p.block(block));
                }
                None => {}
            }
        });
    }

    fn expr(&mut self, expr: &Expr) {
        let kind = expr.kind();
        let loc = expr.location();

        match expr {
            Expr::IntLiteral { value, .. } => self.line(kind, &value.to_string(), loc),
            Expr::CharLiteral { value, .. } => self.line(kind, &format!("{value:?}"), loc),
            Expr::StringLiteral { value, .. } => self.line(kind, &format!("{value:?}"), loc),
            Expr::Variable { name, .. } => self.line(kind, name, loc),
            Expr::Unary { op, operand, .. } => {
                self.line(kind, op.symbol(), loc);
                self.nested(|p| p.expr(operand));
            }
            Expr::Binary {
                op, left, right, ..
            } => {
                self.line(kind, op.symbol(), loc);
                self.nested(|p| {
                    p.expr(left);
                    p.expr(right);
                });
            }
            Expr::Call { name, args, .. } => {
                self.line(kind, name, loc);
                self.nested(|p| {
                    for arg in args {
                        p.expr(arg);
                    }
                });
            }
            Expr::Member { base, member, .. } => {
                self.line(kind, member, loc);
                self.nested(|p| p.expr(base));
            }
            Expr::Index { base, index, .. } => {
                self.line(kind, "", loc);
                self.nested(|p| {
                    p.expr(base);
                    p.expr(index);
                });
            }
        }
    }
}
