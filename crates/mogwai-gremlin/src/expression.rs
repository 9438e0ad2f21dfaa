//! Gremlin expressions
//!
//! Value computations used as step arguments and as statements inside
//! closure bodies.

use mogwai_core::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Literal {
    /// Runtime value of this constant
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Integer(i) => Value::Integer(*i),
            Literal::Float(f) => Value::Float(*f),
            Literal::String(s) => Value::String(s.clone()),
        }
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Boolean(v)
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Integer(v)
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Float(v)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::String(v.to_string())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::String(v)
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    Equality,
    Difference,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    And,
    Or,
    Add,
    Subtract,
    Multiply,
    Divide,
    Union,
    Intersection,
}

impl BinaryOperator {
    /// Every binary operator, in declaration order
    pub const ALL: [BinaryOperator; 14] = [
        BinaryOperator::Equality,
        BinaryOperator::Difference,
        BinaryOperator::Less,
        BinaryOperator::LessOrEqual,
        BinaryOperator::Greater,
        BinaryOperator::GreaterOrEqual,
        BinaryOperator::And,
        BinaryOperator::Or,
        BinaryOperator::Add,
        BinaryOperator::Subtract,
        BinaryOperator::Multiply,
        BinaryOperator::Divide,
        BinaryOperator::Union,
        BinaryOperator::Intersection,
    ];

    /// Script token
    pub fn token(self) -> &'static str {
        match self {
            BinaryOperator::Equality => "==",
            BinaryOperator::Difference => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessOrEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterOrEqual => ">=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Union => "|",
            BinaryOperator::Intersection => "&",
        }
    }

    /// Binding strength, higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Or => 1,
            BinaryOperator::And => 2,
            BinaryOperator::Union => 3,
            BinaryOperator::Intersection => 4,
            BinaryOperator::Equality | BinaryOperator::Difference => 5,
            BinaryOperator::Less
            | BinaryOperator::LessOrEqual
            | BinaryOperator::Greater
            | BinaryOperator::GreaterOrEqual => 6,
            BinaryOperator::Add | BinaryOperator::Subtract => 7,
            BinaryOperator::Multiply | BinaryOperator::Divide => 8,
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    Not,
    Negate,
}

impl UnaryOperator {
    /// Script token
    pub fn token(self) -> &'static str {
        match self {
            UnaryOperator::Not => "!",
            UnaryOperator::Negate => "-",
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A named binding: the current element, a closure parameter, a store
/// handle or an external parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableReference {
    name: String,
}

impl VariableReference {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Expression tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Constant value
    Literal(Literal),

    /// Named binding
    Variable(VariableReference),

    /// Feature navigation (`target.name`)
    Property {
        target: Box<Expression>,
        name: String,
    },

    /// List construction (`[a, b]`)
    List(Vec<Expression>),

    /// Prefix operation
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    /// Infix operation, operand order is significant
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl Expression {
    /// Direct sub-expressions, in rendering order
    pub fn operands(&self) -> Vec<&Expression> {
        match self {
            Expression::Literal(_) | Expression::Variable(_) => Vec::new(),
            Expression::Property { target, .. } => vec![target.as_ref()],
            Expression::List(items) => items.iter().collect(),
            Expression::Unary { operand, .. } => vec![operand.as_ref()],
            Expression::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
        }
    }

    /// Number of nodes in this expression tree
    pub fn node_count(&self) -> usize {
        1 + self.operands().iter().map(|e| e.node_count()).sum::<usize>()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::printer::Printer::default().print_expression(self))
    }
}
