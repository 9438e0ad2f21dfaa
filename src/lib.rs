//! Mogwai - OCL/ATL queries over graph-backed models
//!
//! This is the main library crate that re-exports all Mogwai components.

pub use mogwai_core as core;
pub use mogwai_graph as graph;
pub use mogwai_gremlin as gremlin;
pub use mogwai_ocl as ocl;
pub use mogwai_query as query;

// Re-export commonly used types
pub use mogwai_core::{
    Direction, Edge, ElementId, ElementRef, EntityId, Error, Label, ModelElement, Properties,
    Result, StoreId, Value,
};

pub use mogwai_graph::{Environment, MemoryGraph, ModelStore, ResultSequence};
pub use mogwai_gremlin::{PrintOptions, Printer, Script, ScriptBuilder};
pub use mogwai_ocl::{OclExpression, parse};
pub use mogwai_query::{
    Binder, Metamodel, MetaClass, Parameters, Query, QueryConfig, QueryExecutor, QueryKind,
    QueryResult, ResultValue, translate,
};
