//! Mogwai Gremlin IR
//!
//! The intermediate representation produced by query translation.
//!
//! # Overview
//!
//! - `ScriptBuilder`: append-only arena with single-owner containment
//! - `Script`: the sealed instruction tree, shared read-only by executors
//! - `Printer`: deterministic Gremlin-Groovy text rendering
//! - JSON and binary script forms for caching compiled queries

pub mod builder;
pub mod expression;
pub mod instruction;
pub mod printer;
pub mod script;

pub use builder::{Container, ExpressionId, InstructionId, ScriptBuilder};
pub use expression::{BinaryOperator, Expression, Literal, UnaryOperator, VariableReference};
pub use instruction::{Closure, IMPLICIT_PARAMETER, Instruction, StepCall};
pub use printer::{PrintOptions, Printer};
pub use script::{Node, Script, is_identifier};
