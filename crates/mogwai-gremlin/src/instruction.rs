//! Gremlin instructions
//!
//! Traversal steps, closures wrapping nested instruction sequences, and
//! expression statements.

use crate::expression::Expression;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name bound inside a closure body when no parameter is declared
pub const IMPLICIT_PARAMETER: &str = "it";

/// A named traversal operation with ordered arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCall {
    name: String,
    arguments: Vec<Expression>,
}

impl StepCall {
    pub(crate) fn new(name: String, arguments: Vec<Expression>) -> Self {
        Self { name, arguments }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &[Expression] {
        &self.arguments
    }
}

/// A named block wrapping a nested instruction sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Closure {
    name: String,
    parameter: Option<String>,
    body: Vec<Instruction>,
}

impl Closure {
    pub(crate) fn new(name: String, parameter: Option<String>, body: Vec<Instruction>) -> Self {
        Self {
            name,
            parameter,
            body,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter, if any
    pub fn parameter(&self) -> Option<&str> {
        self.parameter.as_deref()
    }

    /// Name the body sees the current element under
    pub fn bound_name(&self) -> &str {
        self.parameter.as_deref().unwrap_or(IMPLICIT_PARAMETER)
    }

    pub fn body(&self) -> &[Instruction] {
        &self.body
    }
}

/// A statement of a script or closure body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Step(StepCall),
    Closure(Closure),
    Expression(Expression),
}

impl Instruction {
    /// Nested instructions (closure bodies only)
    pub fn children(&self) -> &[Instruction] {
        match self {
            Instruction::Closure(closure) => closure.body(),
            Instruction::Step(_) | Instruction::Expression(_) => &[],
        }
    }

    /// Expressions owned directly by this instruction
    pub fn expressions(&self) -> Vec<&Expression> {
        match self {
            Instruction::Step(step) => step.arguments().iter().collect(),
            Instruction::Expression(expr) => vec![expr],
            Instruction::Closure(_) => Vec::new(),
        }
    }

    /// Number of IR nodes (instructions and expressions) in this subtree
    pub fn node_count(&self) -> usize {
        1 + self
            .expressions()
            .iter()
            .map(|e| e.node_count())
            .sum::<usize>()
            + self.children().iter().map(|i| i.node_count()).sum::<usize>()
    }

    /// Closure nesting depth of this subtree (0 for leaves)
    pub fn depth(&self) -> usize {
        match self {
            Instruction::Closure(closure) => {
                1 + closure.body().iter().map(|i| i.depth()).max().unwrap_or(0)
            }
            Instruction::Step(_) | Instruction::Expression(_) => 0,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::printer::Printer::default().print_instruction(self))
    }
}
