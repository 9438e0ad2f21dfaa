//! Sealed Gremlin scripts
//!
//! A `Script` is the immutable tree produced by `ScriptBuilder::finish`.
//! It exposes read-only traversal, scope analysis, validation and the
//! JSON/binary serialized forms.

use crate::expression::{Expression, Literal};
use crate::instruction::Instruction;
use crate::printer::Printer;
use mogwai_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A node reached while walking a script
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Instruction(&'a Instruction),
    Expression(&'a Expression),
}

/// An ordered, sealed sequence of instructions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    instructions: Vec<Instruction>,
}

impl Script {
    pub(crate) fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Top-level instructions, in execution order
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// Total number of instructions and expressions in the tree
    pub fn node_count(&self) -> usize {
        self.instructions.iter().map(|i| i.node_count()).sum()
    }

    /// Deepest closure nesting
    pub fn depth(&self) -> usize {
        self.instructions.iter().map(|i| i.depth()).max().unwrap_or(0)
    }

    /// Depth-first, pre-order walk over every node
    pub fn walk<'a, F: FnMut(Node<'a>)>(&'a self, mut visit: F) {
        let mut stack: Vec<Node<'a>> = self
            .instructions
            .iter()
            .rev()
            .map(Node::Instruction)
            .collect();

        while let Some(node) = stack.pop() {
            visit(node);
            match node {
                Node::Instruction(instruction) => {
                    for child in instruction.children().iter().rev() {
                        stack.push(Node::Instruction(child));
                    }
                    for expr in instruction.expressions().into_iter().rev() {
                        stack.push(Node::Expression(expr));
                    }
                }
                Node::Expression(expr) => {
                    for operand in expr.operands().into_iter().rev() {
                        stack.push(Node::Expression(operand));
                    }
                }
            }
        }
    }

    /// Variables not bound by an enclosing closure, in first-occurrence order
    pub fn free_variables(&self) -> Vec<String> {
        let mut scope = Vec::new();
        let mut found = Vec::new();
        collect_instructions(&self.instructions, &mut scope, &mut found);
        found
    }

    /// Check that every name in the tree is a valid identifier and every
    /// float literal is finite
    pub fn validate(&self) -> Result<()> {
        validate_instructions(&self.instructions)
    }

    /// Render with default print options
    pub fn to_text(&self) -> String {
        Printer::default().print(self)
    }

    /// Serialize to the JSON form
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Load a script from its JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        let script: Script =
            serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))?;
        script.validate()?;
        Ok(script)
    }

    /// Serialize to the compact binary form
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Load a script from its binary form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let script: Script =
            bincode::deserialize(bytes).map_err(|e| Error::Deserialization(e.to_string()))?;
        script.validate()?;
        Ok(script)
    }
}

impl<'a> IntoIterator for &'a Script {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

fn collect_instructions<'a>(
    instructions: &'a [Instruction],
    scope: &mut Vec<&'a str>,
    found: &mut Vec<String>,
) {
    for instruction in instructions {
        match instruction {
            Instruction::Step(step) => {
                for argument in step.arguments() {
                    collect_expression(argument, scope, found);
                }
            }
            Instruction::Expression(expr) => collect_expression(expr, scope, found),
            Instruction::Closure(closure) => {
                scope.push(closure.bound_name());
                collect_instructions(closure.body(), scope, found);
                scope.pop();
            }
        }
    }
}

fn collect_expression(expr: &Expression, scope: &[&str], found: &mut Vec<String>) {
    if let Expression::Variable(variable) = expr {
        let name = variable.name();
        if !scope.contains(&name) && !found.iter().any(|f| f == name) {
            found.push(name.to_string());
        }
        return;
    }
    for operand in expr.operands() {
        collect_expression(operand, scope, found);
    }
}

/// Returns true if `name` is a script identifier
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_identifier(kind: &str, name: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(Error::Structural(format!("invalid {} name {:?}", kind, name)))
    }
}

fn validate_instructions(instructions: &[Instruction]) -> Result<()> {
    for instruction in instructions {
        match instruction {
            Instruction::Step(step) => {
                check_identifier("step", step.name())?;
                for argument in step.arguments() {
                    validate_expression(argument)?;
                }
            }
            Instruction::Closure(closure) => {
                check_identifier("closure", closure.name())?;
                if let Some(parameter) = closure.parameter() {
                    check_identifier("closure parameter", parameter)?;
                }
                validate_instructions(closure.body())?;
            }
            Instruction::Expression(expr) => validate_expression(expr)?,
        }
    }
    Ok(())
}

fn validate_expression(expr: &Expression) -> Result<()> {
    match expr {
        Expression::Variable(variable) => check_identifier("variable", variable.name())?,
        Expression::Property { name, .. } => check_identifier("property", name)?,
        Expression::Literal(Literal::Float(f)) if !f.is_finite() => {
            return Err(Error::Structural(format!(
                "float literal {} has no script form",
                f
            )));
        }
        _ => {}
    }
    for operand in expr.operands() {
        validate_expression(operand)?;
    }
    Ok(())
}
