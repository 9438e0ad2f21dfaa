//! Compiled queries and transformations

use crate::binder::Parameters;
use crate::config::QueryConfig;
use crate::executor::{QueryExecutor, QueryResult};
use crate::translator::Translator;
use mogwai_core::Result;
use mogwai_gremlin::{Printer, Script};
use mogwai_graph::ModelStore;
use mogwai_ocl::{OclExpression, parse};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// What a compiled query does with its stores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Reads the input store
    Query,
    /// Reads the input store and writes to an output store
    Transformation,
}

/// A source expression compiled into exactly one script
///
/// A `Query` only exists when translation succeeded. The script is shared
/// and never changes, so the query can execute any number of times.
pub struct Query {
    source: OclExpression,
    script: Arc<Script>,
    script_text: String,
    input: Arc<dyn ModelStore>,
    output: Option<Arc<dyn ModelStore>>,
    config: QueryConfig,
}

impl Query {
    /// Compile a query over `input`
    pub fn new(
        source: OclExpression,
        input: Arc<dyn ModelStore>,
        config: QueryConfig,
    ) -> Result<Self> {
        Self::compile(source, input, None, config)
    }

    /// Compile a transformation reading `input` and writing `output`
    pub fn transformation(
        source: OclExpression,
        input: Arc<dyn ModelStore>,
        output: Arc<dyn ModelStore>,
        config: QueryConfig,
    ) -> Result<Self> {
        Self::compile(source, input, Some(output), config)
    }

    /// Parse and compile a query over `input`
    pub fn parse(text: &str, input: Arc<dyn ModelStore>, config: QueryConfig) -> Result<Self> {
        Self::new(parse(text)?, input, config)
    }

    fn compile(
        source: OclExpression,
        input: Arc<dyn ModelStore>,
        output: Option<Arc<dyn ModelStore>>,
        config: QueryConfig,
    ) -> Result<Self> {
        let script = Translator::new(&config.metamodel)
            .check_invariants(config.check_invariants)
            .translate(&source)?;
        let script_text = Printer::new(config.print.clone()).print(&script);
        info!(
            "Compiled `{}` into {} instructions for store {}",
            source,
            script.len(),
            input.name()
        );

        Ok(Self {
            source,
            script: Arc::new(script),
            script_text,
            input,
            output,
            config,
        })
    }

    // ========== Accessors ==========

    pub fn source(&self) -> &OclExpression {
        &self.source
    }

    pub fn script(&self) -> &Arc<Script> {
        &self.script
    }

    /// Printed script
    pub fn script_text(&self) -> &str {
        &self.script_text
    }

    pub fn input(&self) -> &Arc<dyn ModelStore> {
        &self.input
    }

    pub fn output(&self) -> Option<&Arc<dyn ModelStore>> {
        self.output.as_ref()
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn kind(&self) -> QueryKind {
        if self.output.is_some() {
            QueryKind::Transformation
        } else {
            QueryKind::Query
        }
    }

    // ========== Execution ==========

    /// Executor bound to this query's stores and settings
    pub fn executor(&self) -> QueryExecutor {
        let executor = QueryExecutor::new(Arc::clone(&self.input))
            .with_print_options(self.config.print.clone())
            .with_result_limit(self.config.result_limit);
        match &self.output {
            Some(output) => executor.with_output(Arc::clone(output)),
            None => executor,
        }
    }

    /// Execute with the given parameter values
    pub fn execute(&self, parameters: &Parameters) -> Result<QueryResult> {
        self.executor().execute(&self.script, parameters)
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("source", &self.source.to_string())
            .field("kind", &self.kind())
            .field("input", &self.input.name())
            .field("output", &self.output.as_ref().map(|o| o.name().to_string()))
            .finish()
    }
}
