//! Formula AST data structures.
//!
//! Condition and pricing formulas share one expression language:
//! - `Expr`: the expression tree produced by the parser
//! - `BinaryOp` / `UnaryOp`: the operator sets
//! - `Value`: what an expression evaluates to

use std::fmt;

/// Result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Truth(bool),
    Text(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Truth(_) => "truth",
            Value::Text(_) => "text",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Truth(b) => write!(f, "{}", b),
            Value::Text(s) => write!(f, "'{}'", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

/// Expression tree. `Path` holds a dotted reference such as
/// `candle.previous.close`, split at the dots.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Text(String),
    Truth(bool),
    Path(Vec<String>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_type_names() {
        assert_eq!(Value::Number(1.0).type_name(), "number");
        assert_eq!(Value::Truth(true).type_name(), "truth");
        assert_eq!(Value::Text("up".into()).type_name(), "text");
    }

    #[test]
    fn value_display() {
        assert_eq!(Value::Number(1.5).to_string(), "1.5");
        assert_eq!(Value::Truth(false).to_string(), "false");
        assert_eq!(Value::Text("down".into()).to_string(), "'down'");
    }

    #[test]
    fn path_expression() {
        let expr = Expr::Path(vec!["candle".into(), "previous".into(), "close".into()]);
        assert!(matches!(expr, Expr::Path(ref parts) if parts.len() == 3));
    }

    #[test]
    fn binary_symbols() {
        assert_eq!(BinaryOp::GreaterEqual.symbol(), ">=");
        assert_eq!(BinaryOp::And.symbol(), "&&");
    }
}
