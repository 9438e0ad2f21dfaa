//! Mogwai Query Engine
//!
//! Translates OCL expressions into Gremlin scripts, binds their free
//! variables and executes them against model stores.
//!
//! # Pipeline
//!
//! 1. `translator` lowers a parsed expression into a sealed `Script`
//! 2. `binder` resolves the script's free variables
//! 3. `executor` prints the script, runs it on the input store and maps
//!    the raw values back to model elements
//!
//! `Query` ties the three together for one source expression.

pub mod binder;
pub mod config;
pub mod executor;
pub mod metamodel;
pub mod query;
pub mod translator;

pub use binder::{Binder, INPUT, OUTPUT, Parameters};
pub use config::QueryConfig;
pub use executor::{ExecutionStats, QueryExecutor, QueryResult, ResultValue};
pub use metamodel::{Feature, FeatureKind, MetaClass, Metamodel};
pub use query::{Query, QueryKind};
pub use translator::{Translator, translate};
