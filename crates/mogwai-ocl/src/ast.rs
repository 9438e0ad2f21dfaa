//! OCL/ATL expression trees
//!
//! The immutable source form handed to the translator. Every node carries
//! the byte range it was parsed from so translation errors can point back
//! into the query text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte range in the source text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Span::new(range.start, range.end)
    }
}

/// Constant values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OclLiteral {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(String),
}

/// Binary operators of the source language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OclBinaryOp {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    And,
    Or,
    Implies,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl OclBinaryOp {
    pub fn token(self) -> &'static str {
        match self {
            OclBinaryOp::Equal => "=",
            OclBinaryOp::NotEqual => "<>",
            OclBinaryOp::Less => "<",
            OclBinaryOp::LessOrEqual => "<=",
            OclBinaryOp::Greater => ">",
            OclBinaryOp::GreaterOrEqual => ">=",
            OclBinaryOp::And => "and",
            OclBinaryOp::Or => "or",
            OclBinaryOp::Implies => "implies",
            OclBinaryOp::Add => "+",
            OclBinaryOp::Subtract => "-",
            OclBinaryOp::Multiply => "*",
            OclBinaryOp::Divide => "/",
        }
    }

    /// Binding strength, higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            OclBinaryOp::Implies => 1,
            OclBinaryOp::Or => 2,
            OclBinaryOp::And => 3,
            OclBinaryOp::Equal | OclBinaryOp::NotEqual => 4,
            OclBinaryOp::Less
            | OclBinaryOp::LessOrEqual
            | OclBinaryOp::Greater
            | OclBinaryOp::GreaterOrEqual => 5,
            OclBinaryOp::Add | OclBinaryOp::Subtract => 6,
            OclBinaryOp::Multiply | OclBinaryOp::Divide => 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OclUnaryOp {
    Not,
    Minus,
}

impl OclUnaryOp {
    pub fn token(self) -> &'static str {
        match self {
            OclUnaryOp::Not => "not ",
            OclUnaryOp::Minus => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionKind {
    Set,
    Bag,
    Sequence,
    OrderedSet,
}

impl CollectionKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Set" => Some(CollectionKind::Set),
            "Bag" => Some(CollectionKind::Bag),
            "Sequence" => Some(CollectionKind::Sequence),
            "OrderedSet" => Some(CollectionKind::OrderedSet),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CollectionKind::Set => "Set",
            CollectionKind::Bag => "Bag",
            CollectionKind::Sequence => "Sequence",
            CollectionKind::OrderedSet => "OrderedSet",
        }
    }
}

/// Iterator expressions (`source->name(v | body)`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IteratorKind {
    Select,
    Reject,
    Collect,
    Exists,
    ForAll,
}

impl IteratorKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "select" => Some(IteratorKind::Select),
            "reject" => Some(IteratorKind::Reject),
            "collect" => Some(IteratorKind::Collect),
            "exists" => Some(IteratorKind::Exists),
            "forAll" => Some(IteratorKind::ForAll),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IteratorKind::Select => "select",
            IteratorKind::Reject => "reject",
            IteratorKind::Collect => "collect",
            IteratorKind::Exists => "exists",
            IteratorKind::ForAll => "forAll",
        }
    }
}

/// A source expression with its location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OclExpression {
    pub kind: OclKind,
    pub span: Span,
}

/// Source expression node kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OclKind {
    Literal(OclLiteral),

    /// A variable, including `self`
    Variable(String),

    /// `MM!Type` outside of an `allInstances` call
    TypeReference {
        metamodel: Option<String>,
        name: String,
    },

    /// `Type.allInstances()` or `MM!Type.allInstances()`
    AllInstances {
        metamodel: Option<String>,
        class: String,
    },

    /// `source.feature`
    Navigation {
        source: Box<OclExpression>,
        feature: String,
    },

    /// `source.name(args)`
    OperationCall {
        source: Box<OclExpression>,
        name: String,
        arguments: Vec<OclExpression>,
    },

    /// `source->name(args)`
    CollectionCall {
        source: Box<OclExpression>,
        name: String,
        arguments: Vec<OclExpression>,
    },

    /// `source->select(v | body)` and friends
    Iterator {
        source: Box<OclExpression>,
        kind: IteratorKind,
        variable: Option<String>,
        body: Box<OclExpression>,
    },

    Binary {
        op: OclBinaryOp,
        left: Box<OclExpression>,
        right: Box<OclExpression>,
    },

    Unary {
        op: OclUnaryOp,
        operand: Box<OclExpression>,
    },

    /// `Set{a, b}`, `Sequence{…}`, …
    Collection {
        kind: CollectionKind,
        items: Vec<OclExpression>,
    },

    If {
        condition: Box<OclExpression>,
        then_branch: Box<OclExpression>,
        else_branch: Box<OclExpression>,
    },

    Let {
        variable: String,
        value: Box<OclExpression>,
        body: Box<OclExpression>,
    },
}

impl OclExpression {
    pub fn new(kind: OclKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Short description used in diagnostics: the node's text and location
    pub fn describe(&self) -> String {
        format!("`{}` ({})", self, self.span)
    }
}

impl fmt::Display for OclLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OclLiteral::Null => write!(f, "null"),
            OclLiteral::Boolean(b) => write!(f, "{}", b),
            OclLiteral::Integer(i) => write!(f, "{}", i),
            OclLiteral::Real(r) => write!(f, "{:?}", r),
            OclLiteral::String(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[OclExpression]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_operand(f: &mut fmt::Formatter<'_>, operand: &OclExpression) -> fmt::Result {
    match operand.kind {
        OclKind::Binary { .. } | OclKind::If { .. } | OclKind::Let { .. } => write!(f, "({})", operand),
        _ => write!(f, "{}", operand),
    }
}

impl fmt::Display for OclExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            OclKind::Literal(literal) => write!(f, "{}", literal),
            OclKind::Variable(name) => write!(f, "{}", name),
            OclKind::TypeReference { metamodel, name } => match metamodel {
                Some(mm) => write!(f, "{}!{}", mm, name),
                None => write!(f, "{}", name),
            },
            OclKind::AllInstances { metamodel, class } => match metamodel {
                Some(mm) => write!(f, "{}!{}.allInstances()", mm, class),
                None => write!(f, "{}.allInstances()", class),
            },
            OclKind::Navigation { source, feature } => {
                write_operand(f, source)?;
                write!(f, ".{}", feature)
            }
            OclKind::OperationCall {
                source,
                name,
                arguments,
            } => {
                write_operand(f, source)?;
                write!(f, ".{}(", name)?;
                write_list(f, arguments)?;
                write!(f, ")")
            }
            OclKind::CollectionCall {
                source,
                name,
                arguments,
            } => {
                write_operand(f, source)?;
                write!(f, "->{}(", name)?;
                write_list(f, arguments)?;
                write!(f, ")")
            }
            OclKind::Iterator {
                source,
                kind,
                variable,
                body,
            } => {
                write_operand(f, source)?;
                match variable {
                    Some(v) => write!(f, "->{}({} | {})", kind.name(), v, body),
                    None => write!(f, "->{}({})", kind.name(), body),
                }
            }
            OclKind::Binary { op, left, right } => {
                write_operand(f, left)?;
                write!(f, " {} ", op.token())?;
                write_operand(f, right)
            }
            OclKind::Unary { op, operand } => {
                write!(f, "{}", op.token())?;
                write_operand(f, operand)
            }
            OclKind::Collection { kind, items } => {
                write!(f, "{}{{", kind.name())?;
                write_list(f, items)?;
                write!(f, "}}")
            }
            OclKind::If {
                condition,
                then_branch,
                else_branch,
            } => write!(
                f,
                "if {} then {} else {} endif",
                condition, then_branch, else_branch
            ),
            OclKind::Let {
                variable,
                value,
                body,
            } => write!(f, "let {} = {} in {}", variable, value, body),
        }
    }
}
