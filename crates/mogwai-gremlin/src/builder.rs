//! Arena-based script construction
//!
//! Nodes under construction live in two arenas addressed by
//! `InstructionId` and `ExpressionId`. Every slot records its single owner,
//! so re-parenting and sharing are rejected at the point of the mutation.
//! `finish` consumes the arenas and produces the sealed `Script` tree.

use crate::expression::{BinaryOperator, Expression, Literal, UnaryOperator, VariableReference};
use crate::instruction::{Closure, Instruction, StepCall};
use crate::script::Script;
use mogwai_core::{Error, Result};
use std::fmt;
use tracing::debug;

/// Handle to an instruction under construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstructionId(usize);

/// Handle to an expression under construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExpressionId(usize);

impl fmt::Display for InstructionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instruction #{}", self.0)
    }
}

impl fmt::Display for ExpressionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expression #{}", self.0)
    }
}

/// Something instructions can be appended to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    /// The root instruction sequence
    Script,
    /// The body of a closure
    Closure(InstructionId),
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Container::Script => write!(f, "script"),
            Container::Closure(id) => write!(f, "closure {}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
    Container(Container),
    Instruction(InstructionId),
    Expression(ExpressionId),
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Container(c) => write!(f, "{}", c),
            Owner::Instruction(id) => write!(f, "{}", id),
            Owner::Expression(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug)]
enum InstructionNode {
    Step {
        name: String,
        arguments: Vec<ExpressionId>,
    },
    Closure {
        name: String,
        parameter: Option<String>,
        body: Vec<InstructionId>,
        sealed: bool,
    },
    Expression(ExpressionId),
}

#[derive(Debug)]
enum ExpressionNode {
    Literal(Literal),
    Variable(String),
    Property {
        target: ExpressionId,
        name: String,
    },
    List(Vec<ExpressionId>),
    Unary {
        op: UnaryOperator,
        operand: ExpressionId,
    },
    Binary {
        op: BinaryOperator,
        left: ExpressionId,
        right: ExpressionId,
    },
}

impl ExpressionNode {
    fn operands(&self) -> Vec<ExpressionId> {
        match self {
            ExpressionNode::Literal(_) | ExpressionNode::Variable(_) => Vec::new(),
            ExpressionNode::Property { target, .. } => vec![*target],
            ExpressionNode::List(items) => items.clone(),
            ExpressionNode::Unary { operand, .. } => vec![*operand],
            ExpressionNode::Binary { left, right, .. } => vec![*left, *right],
        }
    }
}

#[derive(Debug)]
struct Slot<T> {
    node: T,
    owner: Option<Owner>,
}

/// Append-only builder for Gremlin scripts
#[derive(Debug, Default)]
pub struct ScriptBuilder {
    instructions: Vec<Slot<InstructionNode>>,
    expressions: Vec<Slot<ExpressionNode>>,
    root: Vec<InstructionId>,
    root_sealed: bool,
}

impl ScriptBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Expressions ==========

    /// Create a constant
    pub fn literal<L: Into<Literal>>(&mut self, literal: L) -> ExpressionId {
        self.push_expression(ExpressionNode::Literal(literal.into()))
    }

    /// Create a variable reference
    pub fn variable<S: Into<String>>(&mut self, name: S) -> ExpressionId {
        self.push_expression(ExpressionNode::Variable(name.into()))
    }

    /// Create `target.name`, taking ownership of `target`
    pub fn property<S: Into<String>>(&mut self, target: ExpressionId, name: S) -> Result<ExpressionId> {
        let id = self.next_expression_id();
        self.claim_expressions(&[target], Owner::Expression(id))?;
        Ok(self.push_expression(ExpressionNode::Property {
            target,
            name: name.into(),
        }))
    }

    /// Create a list, taking ownership of its items
    pub fn list(&mut self, items: Vec<ExpressionId>) -> Result<ExpressionId> {
        let id = self.next_expression_id();
        self.claim_expressions(&items, Owner::Expression(id))?;
        Ok(self.push_expression(ExpressionNode::List(items)))
    }

    /// Create a prefix operation, taking ownership of its operand
    pub fn unary(&mut self, op: UnaryOperator, operand: ExpressionId) -> Result<ExpressionId> {
        let id = self.next_expression_id();
        self.claim_expressions(&[operand], Owner::Expression(id))?;
        Ok(self.push_expression(ExpressionNode::Unary { op, operand }))
    }

    /// Create an infix operation, taking ownership of both operands
    pub fn binary(
        &mut self,
        op: BinaryOperator,
        left: ExpressionId,
        right: ExpressionId,
    ) -> Result<ExpressionId> {
        let id = self.next_expression_id();
        self.claim_expressions(&[left, right], Owner::Expression(id))?;
        Ok(self.push_expression(ExpressionNode::Binary { op, left, right }))
    }

    // ========== Instructions ==========

    /// Create a step call, taking ownership of its arguments
    pub fn step<S: Into<String>>(&mut self, name: S, arguments: Vec<ExpressionId>) -> Result<InstructionId> {
        let id = self.next_instruction_id();
        self.claim_expressions(&arguments, Owner::Instruction(id))?;
        Ok(self.push_instruction(InstructionNode::Step {
            name: name.into(),
            arguments,
        }))
    }

    /// Create an expression statement, taking ownership of the expression
    pub fn expression(&mut self, expr: ExpressionId) -> Result<InstructionId> {
        let id = self.next_instruction_id();
        self.claim_expressions(&[expr], Owner::Instruction(id))?;
        Ok(self.push_instruction(InstructionNode::Expression(expr)))
    }

    /// Create an empty, open closure
    pub fn closure<S: Into<String>>(&mut self, name: S, parameter: Option<&str>) -> InstructionId {
        self.push_instruction(InstructionNode::Closure {
            name: name.into(),
            parameter: parameter.map(str::to_string),
            body: Vec::new(),
            sealed: false,
        })
    }

    // ========== Containment ==========

    /// Append an unowned instruction to an open container
    ///
    /// An owned instruction is always an ownership failure, whatever the
    /// state of the target container.
    pub fn append(&mut self, container: Container, instruction: InstructionId) -> Result<()> {
        let slot = self.instruction_slot(instruction)?;
        if let Some(owner) = slot.owner {
            return Err(Error::Ownership(format!(
                "{} is already owned by {}",
                instruction, owner
            )));
        }

        if self.is_sealed(container)? {
            return Err(Error::Structural(format!(
                "cannot append {} to sealed {}",
                instruction, container
            )));
        }

        if let Container::Closure(target) = container {
            if self.is_within(target, instruction) {
                return Err(Error::Structural(format!(
                    "appending {} to {} would create a cycle",
                    instruction, container
                )));
            }
        }

        self.instructions[instruction.0].owner = Some(Owner::Container(container));
        match container {
            Container::Script => self.root.push(instruction),
            Container::Closure(target) => {
                if let InstructionNode::Closure { body, .. } = &mut self.instructions[target.0].node {
                    body.push(instruction);
                }
            }
        }
        Ok(())
    }

    /// Make a container read-only
    pub fn seal(&mut self, container: Container) -> Result<()> {
        match container {
            Container::Script => {
                self.root_sealed = true;
                Ok(())
            }
            Container::Closure(id) => match &mut self.instruction_slot_mut(id)?.node {
                InstructionNode::Closure { sealed, .. } => {
                    *sealed = true;
                    Ok(())
                }
                _ => Err(Error::Structural(format!("{} is not a closure", id))),
            },
        }
    }

    /// Returns true if the container no longer accepts instructions
    pub fn is_sealed(&self, container: Container) -> Result<bool> {
        match container {
            Container::Script => Ok(self.root_sealed),
            Container::Closure(id) => match &self.instruction_slot(id)?.node {
                InstructionNode::Closure { sealed, .. } => Ok(*sealed),
                _ => Err(Error::Structural(format!("{} is not a closure", id))),
            },
        }
    }

    /// Instructions appended to a container, in order
    pub fn children(&self, container: Container) -> Result<&[InstructionId]> {
        match container {
            Container::Script => Ok(&self.root),
            Container::Closure(id) => match &self.instruction_slot(id)?.node {
                InstructionNode::Closure { body, .. } => Ok(body),
                _ => Err(Error::Structural(format!("{} is not a closure", id))),
            },
        }
    }

    /// Returns true if the instruction has been appended somewhere
    pub fn is_attached(&self, instruction: InstructionId) -> bool {
        self.instructions
            .get(instruction.0)
            .is_some_and(|slot| slot.owner.is_some())
    }

    /// Returns true if the expression has an owner
    pub fn is_claimed(&self, expr: ExpressionId) -> bool {
        self.expressions
            .get(expr.0)
            .is_some_and(|slot| slot.owner.is_some())
    }

    /// Number of nodes created so far
    pub fn node_count(&self) -> usize {
        self.instructions.len() + self.expressions.len()
    }

    /// Walk the tree depth-first from the root, checking that the walk
    /// terminates, that no node is reached twice and that every reached
    /// node records the parent it was reached from.
    pub fn check_tree(&self) -> Result<()> {
        let mut seen_instructions = vec![false; self.instructions.len()];
        let mut seen_expressions = vec![false; self.expressions.len()];

        let mut stack: Vec<(Owner, Node)> = self
            .root
            .iter()
            .rev()
            .map(|id| (Owner::Container(Container::Script), Node::Instruction(*id)))
            .collect();

        while let Some((parent, node)) = stack.pop() {
            match node {
                Node::Instruction(id) => {
                    let slot = self.instruction_slot(id)?;
                    if std::mem::replace(&mut seen_instructions[id.0], true) {
                        return Err(Error::Structural(format!("{} is reachable twice", id)));
                    }
                    if slot.owner != Some(parent) {
                        return Err(Error::Structural(format!(
                            "{} reached from {} but owned by {:?}",
                            id, parent, slot.owner
                        )));
                    }
                    match &slot.node {
                        InstructionNode::Step { arguments, .. } => {
                            for arg in arguments.iter().rev() {
                                stack.push((Owner::Instruction(id), Node::Expression(*arg)));
                            }
                        }
                        InstructionNode::Expression(expr) => {
                            stack.push((Owner::Instruction(id), Node::Expression(*expr)));
                        }
                        InstructionNode::Closure { body, .. } => {
                            for child in body.iter().rev() {
                                stack.push((
                                    Owner::Container(Container::Closure(id)),
                                    Node::Instruction(*child),
                                ));
                            }
                        }
                    }
                }
                Node::Expression(id) => {
                    let slot = self.expression_slot(id)?;
                    if std::mem::replace(&mut seen_expressions[id.0], true) {
                        return Err(Error::Structural(format!("{} is reachable twice", id)));
                    }
                    if slot.owner != Some(parent) {
                        return Err(Error::Structural(format!(
                            "{} reached from {} but owned by {:?}",
                            id, parent, slot.owner
                        )));
                    }
                    for operand in slot.node.operands().into_iter().rev() {
                        stack.push((Owner::Expression(id), Node::Expression(operand)));
                    }
                }
            }
        }
        Ok(())
    }

    /// Seal everything and produce the immutable script tree
    pub fn finish(mut self) -> Result<Script> {
        self.root_sealed = true;

        if let Some(index) = self.instructions.iter().position(|s| s.owner.is_none()) {
            return Err(Error::Structural(format!(
                "{} was never attached",
                InstructionId(index)
            )));
        }
        if let Some(index) = self.expressions.iter().position(|s| s.owner.is_none()) {
            return Err(Error::Structural(format!(
                "{} was never used",
                ExpressionId(index)
            )));
        }
        if cfg!(debug_assertions) {
            self.check_tree()?;
        }

        let mut assembler = Assembler {
            instructions: self.instructions.into_iter().map(|s| Some(s.node)).collect(),
            expressions: self.expressions.into_iter().map(|s| Some(s.node)).collect(),
        };
        let instructions = self
            .root
            .iter()
            .map(|id| assembler.instruction(*id))
            .collect::<Result<Vec<_>>>()?;

        let script = Script::new(instructions);
        debug!(
            "Sealed script with {} instructions ({} nodes)",
            script.len(),
            script.node_count()
        );
        Ok(script)
    }

    // ========== Private Helpers ==========

    fn next_expression_id(&self) -> ExpressionId {
        ExpressionId(self.expressions.len())
    }

    fn next_instruction_id(&self) -> InstructionId {
        InstructionId(self.instructions.len())
    }

    fn push_expression(&mut self, node: ExpressionNode) -> ExpressionId {
        let id = self.next_expression_id();
        self.expressions.push(Slot { node, owner: None });
        id
    }

    fn push_instruction(&mut self, node: InstructionNode) -> InstructionId {
        let id = self.next_instruction_id();
        self.instructions.push(Slot { node, owner: None });
        id
    }

    fn instruction_slot(&self, id: InstructionId) -> Result<&Slot<InstructionNode>> {
        self.instructions
            .get(id.0)
            .ok_or_else(|| Error::Structural(format!("unknown {}", id)))
    }

    fn instruction_slot_mut(&mut self, id: InstructionId) -> Result<&mut Slot<InstructionNode>> {
        self.instructions
            .get_mut(id.0)
            .ok_or_else(|| Error::Structural(format!("unknown {}", id)))
    }

    fn expression_slot(&self, id: ExpressionId) -> Result<&Slot<ExpressionNode>> {
        self.expressions
            .get(id.0)
            .ok_or_else(|| Error::Structural(format!("unknown {}", id)))
    }

    /// Claim all operands or none of them
    fn claim_expressions(&mut self, ids: &[ExpressionId], owner: Owner) -> Result<()> {
        for (i, id) in ids.iter().enumerate() {
            let slot = self.expression_slot(*id)?;
            if let Some(current) = slot.owner {
                return Err(Error::Ownership(format!(
                    "{} is already owned by {}",
                    id, current
                )));
            }
            if ids[..i].contains(id) {
                return Err(Error::Ownership(format!("{} used twice by {}", id, owner)));
            }
        }
        for id in ids {
            self.expressions[id.0].owner = Some(owner);
        }
        Ok(())
    }

    /// Returns true if `node` is `ancestor` or nested inside it
    fn is_within(&self, node: InstructionId, ancestor: InstructionId) -> bool {
        let mut current = node;
        loop {
            if current == ancestor {
                return true;
            }
            match self.instructions.get(current.0).and_then(|s| s.owner) {
                Some(Owner::Container(Container::Closure(parent))) => current = parent,
                _ => return false,
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Instruction(InstructionId),
    Expression(ExpressionId),
}

/// Moves arena nodes into the owned tree, each exactly once
struct Assembler {
    instructions: Vec<Option<InstructionNode>>,
    expressions: Vec<Option<ExpressionNode>>,
}

impl Assembler {
    fn instruction(&mut self, id: InstructionId) -> Result<Instruction> {
        let node = self
            .instructions
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or_else(|| Error::Structural(format!("{} assembled twice", id)))?;

        Ok(match node {
            InstructionNode::Step { name, arguments } => {
                let arguments = arguments
                    .into_iter()
                    .map(|arg| self.expression(arg))
                    .collect::<Result<Vec<_>>>()?;
                Instruction::Step(StepCall::new(name, arguments))
            }
            InstructionNode::Closure {
                name,
                parameter,
                body,
                ..
            } => {
                let body = body
                    .into_iter()
                    .map(|child| self.instruction(child))
                    .collect::<Result<Vec<_>>>()?;
                Instruction::Closure(Closure::new(name, parameter, body))
            }
            InstructionNode::Expression(expr) => Instruction::Expression(self.expression(expr)?),
        })
    }

    fn expression(&mut self, id: ExpressionId) -> Result<Expression> {
        let node = self
            .expressions
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or_else(|| Error::Structural(format!("{} assembled twice", id)))?;

        Ok(match node {
            ExpressionNode::Literal(literal) => Expression::Literal(literal),
            ExpressionNode::Variable(name) => Expression::Variable(VariableReference::new(name)),
            ExpressionNode::Property { target, name } => Expression::Property {
                target: Box::new(self.expression(target)?),
                name,
            },
            ExpressionNode::List(items) => Expression::List(
                items
                    .into_iter()
                    .map(|item| self.expression(item))
                    .collect::<Result<Vec<_>>>()?,
            ),
            ExpressionNode::Unary { op, operand } => Expression::Unary {
                op,
                operand: Box::new(self.expression(operand)?),
            },
            ExpressionNode::Binary { op, left, right } => Expression::Binary {
                op,
                left: Box::new(self.expression(left)?),
                right: Box::new(self.expression(right)?),
            },
        })
    }
}
