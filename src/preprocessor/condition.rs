//! `@if SYMBOL OP VALUE` evaluation
//!
//! When both the defined value and the operand are plain integers (an
//! optional `-` then digits) they are compared numerically; otherwise the
//! comparison is bytewise on the strings. An undefined symbol makes the
//! whole condition false.

use std::cmp::Ordering;

use super::{Definitions, PreprocessErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "==" => CompareOp::Eq,
            "!=" => CompareOp::Ne,
            ">" => CompareOp::Gt,
            ">=" => CompareOp::Ge,
            "<" => CompareOp::Lt,
            "<=" => CompareOp::Le,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
        }
    }
}

/// A parsed `SYMBOL OP VALUE` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition<'a> {
    pub symbol: &'a str,
    pub op: CompareOp,
    pub operand: &'a str,
}

impl<'a> Condition<'a> {
    /// Split `text` into exactly three whitespace-separated words.
    pub fn parse(text: &'a str) -> Result<Self, PreprocessErrorKind> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let [symbol, op, operand] = words[..] else {
            return Err(PreprocessErrorKind::MalformedDirective {
                directive: "condition",
                text: text.trim().to_string(),
            });
        };

        let op = CompareOp::from_symbol(op)
            .ok_or_else(|| PreprocessErrorKind::UnsupportedOperator(op.to_string()))?;

        Ok(Self {
            symbol,
            op,
            operand,
        })
    }

    pub fn evaluate(&self, definitions: &Definitions) -> bool {
        let Some(value) = definitions.get(self.symbol) else {
            return false;
        };

        let ordering = match (as_integer(value), as_integer(self.operand)) {
            (Some(left), Some(right)) => left.cmp(&right),
            _ => value.as_bytes().cmp(self.operand.as_bytes()),
        };
        self.op.holds(ordering)
    }
}

/// Parse and evaluate in one step.
pub fn evaluate_condition(text: &str, definitions: &Definitions) -> Result<bool, PreprocessErrorKind> {
    Ok(Condition::parse(text)?.evaluate(definitions))
}

fn as_integer(text: &str) -> Option<i64> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
