//! Mogwai Core Library
//!
//! This crate provides the fundamental types, values and error handling
//! shared by every stage of the Mogwai query pipeline.
//!
//! # Overview
//!
//! Mogwai translates OCL/ATL navigation queries into Gremlin traversal
//! scripts, runs them against graph-backed model stores and maps the
//! returned graph elements back to model elements.
//!
//! # Modules
//!
//! - `error` - Error types and result aliases
//! - `id` - Store and element identification
//! - `value` - Runtime values flowing through traversals
//! - `types` - Model element types (labels, elements, edges)

pub mod error;
pub mod id;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use id::{ElementId, EntityId, IdGenerator, StoreId};
pub use types::{Direction, Edge, ElementRef, Label, ModelElement};
pub use value::{Properties, Value};
