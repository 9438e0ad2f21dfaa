//! Mogwai Graph Stores
//!
//! The interface to graph-backed model stores, plus an in-memory store
//! that executes scripts with a traversal interpreter.

pub mod memory;
pub mod store;
pub mod traversal;

pub use memory::MemoryGraph;
pub use store::{Binding, Environment, ModelStore, ResultSequence, TraversalRequest};
pub use traversal::TraversalMachine;
