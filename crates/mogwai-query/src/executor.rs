//! Script execution
//!
//! Binds a script, prints it, hands it to the input store and wraps the
//! raw values in a `QueryResult` that maps them back to model elements.

use crate::binder::{Binder, Parameters};
use mogwai_core::{ElementRef, Error, ModelElement, Result, Value};
use mogwai_gremlin::{PrintOptions, Printer, Script};
use mogwai_graph::{Environment, ModelStore, ResultSequence, TraversalRequest};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// A mapped result value
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    /// A graph element resolved to its model element
    Element(ModelElement),
    Scalar(Value),
    List(Vec<ResultValue>),
}

impl ResultValue {
    pub fn as_element(&self) -> Option<&ModelElement> {
        match self {
            ResultValue::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            ResultValue::Scalar(value) => Some(value),
            _ => None,
        }
    }
}

/// Execution statistics
#[derive(Debug, Clone, Default)]
pub struct ExecutionStats {
    /// Values returned by the store
    pub raw_results: u64,
    /// Variables bound for the execution
    pub bindings: u64,
    pub execution_time_ms: u64,
}

/// Results of one script execution
///
/// Values are mapped lazily and iteration can be restarted any number of
/// times.
#[derive(Debug)]
pub struct QueryResult {
    sequence: ResultSequence,
    environment: Environment,
    limit: Option<usize>,
    stats: ExecutionStats,
}

impl QueryResult {
    /// Number of results yielded by `iter`
    pub fn len(&self) -> usize {
        match self.limit {
            Some(limit) => self.sequence.len().min(limit),
            None => self.sequence.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw values as returned by the store
    pub fn raw(&self) -> &ResultSequence {
        &self.sequence
    }

    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    /// Iterate over mapped values from the first one
    pub fn iter(&self) -> impl Iterator<Item = Result<ResultValue>> + '_ {
        self.sequence
            .iter()
            .take(self.len())
            .map(move |value| self.map_value(value))
    }

    /// Map every value, failing on the first unresolvable element
    pub fn values(&self) -> Result<Vec<ResultValue>> {
        self.iter().collect()
    }

    /// Mapped top-level elements, skipping scalars and lists
    pub fn elements(&self) -> Result<Vec<ModelElement>> {
        let mut elements = Vec::new();
        for value in self.iter() {
            if let ResultValue::Element(element) = value? {
                elements.push(element);
            }
        }
        Ok(elements)
    }

    fn map_value(&self, value: &Value) -> Result<ResultValue> {
        match value {
            Value::Element(reference) => self.resolve(*reference).map(ResultValue::Element),
            Value::List(items) => items
                .iter()
                .map(|item| self.map_value(item))
                .collect::<Result<Vec<_>>>()
                .map(ResultValue::List),
            scalar => Ok(ResultValue::Scalar(scalar.clone())),
        }
    }

    fn resolve(&self, reference: ElementRef) -> Result<ModelElement> {
        let Some(store) = self.environment.store_by_id(reference.store) else {
            warn!("No bound store owns element {:?}", reference);
            return Err(Error::ResultMapping(format!(
                "element {:?} belongs to no bound store",
                reference.element
            )));
        };
        match store.lookup(reference.element)? {
            Some(element) => Ok(element),
            None => {
                warn!(
                    "Element {:?} not found in store {}",
                    reference.element,
                    store.name()
                );
                Err(Error::ResultMapping(format!(
                    "element {:?} not found in store {}",
                    reference.element,
                    store.name()
                )))
            }
        }
    }
}

/// Runs scripts against a bound input store
pub struct QueryExecutor {
    input: Arc<dyn ModelStore>,
    output: Option<Arc<dyn ModelStore>>,
    printer: Printer,
    result_limit: Option<usize>,
}

impl QueryExecutor {
    pub fn new(input: Arc<dyn ModelStore>) -> Self {
        Self {
            input,
            output: None,
            printer: Printer::default(),
            result_limit: None,
        }
    }

    /// Builder: bind an output store
    pub fn with_output(mut self, output: Arc<dyn ModelStore>) -> Self {
        self.output = Some(output);
        self
    }

    /// Builder: set script text layout
    pub fn with_print_options(mut self, options: PrintOptions) -> Self {
        self.printer = Printer::new(options);
        self
    }

    /// Builder: cap the number of mapped results
    pub fn with_result_limit(mut self, limit: Option<usize>) -> Self {
        self.result_limit = limit;
        self
    }

    /// Execute a script
    ///
    /// The script is validated and bound first, so a malformed script or
    /// an unbound variable fails before any store call. The script itself
    /// is never modified.
    pub fn execute(&self, script: &Script, parameters: &Parameters) -> Result<QueryResult> {
        let start = Instant::now();
        script.validate()?;
        let environment = Binder::bind(script, &self.input, self.output.as_ref(), parameters)?;
        let text = self.printer.print(script);

        let request = TraversalRequest {
            script,
            text: &text,
            environment: &environment,
        };
        let sequence = self.input.execute(&request)?;

        let stats = ExecutionStats {
            raw_results: sequence.len() as u64,
            bindings: environment.len() as u64,
            execution_time_ms: start.elapsed().as_millis() as u64,
        };
        debug!(
            "Executed script on {}: {} raw results in {}ms",
            self.input.name(),
            stats.raw_results,
            stats.execution_time_ms
        );

        Ok(QueryResult {
            sequence,
            environment,
            limit: self.result_limit,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metamodel::Metamodel;
    use crate::translator::translate;
    use mogwai_core::{ElementId, EntityId, Properties};
    use mogwai_graph::MemoryGraph;
    use mogwai_gremlin::{BinaryOperator, Container, ScriptBuilder};
    use mogwai_ocl::parse;

    fn members() -> (MemoryGraph, Arc<dyn ModelStore>) {
        let graph = MemoryGraph::new("members");
        for (name, age) in [("Jim", 45), ("Cindy", 42), ("Brandon", 12)] {
            let properties: Properties = [
                ("firstName".to_string(), Value::from(name)),
                ("age".to_string(), Value::Integer(age)),
            ]
            .into_iter()
            .collect();
            graph
                .add_element_with_properties(["Member"], properties)
                .unwrap();
        }
        let store: Arc<dyn ModelStore> = Arc::new(graph.clone());
        (graph, store)
    }

    fn script(source: &str) -> Script {
        translate(&parse(source).unwrap(), &Metamodel::new()).unwrap()
    }

    #[test]
    fn test_elements_are_mapped() {
        let (_, store) = members();
        let executor = QueryExecutor::new(store);
        let mut parameters = Parameters::new();
        parameters.insert("threshold".to_string(), Value::Integer(18));

        let result = executor
            .execute(
                &script("Member.allInstances()->select(m | m.age > threshold)"),
                &parameters,
            )
            .unwrap();
        let names: Vec<_> = result
            .elements()
            .unwrap()
            .iter()
            .map(|e| e.get_property("firstName").cloned())
            .collect();
        assert_eq!(
            names,
            vec![Some(Value::from("Jim")), Some(Value::from("Cindy"))]
        );
        assert_eq!(result.stats().raw_results, 2);
        assert_eq!(result.stats().bindings, 2);
    }

    #[test]
    fn test_iteration_restarts() {
        let (_, store) = members();
        let result = QueryExecutor::new(store)
            .execute(&script("Member.allInstances()"), &Parameters::new())
            .unwrap();
        let first = result.values().unwrap();
        let second = result.values().unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[test]
    fn test_scalars_and_lists() {
        let (_, store) = members();
        let executor = QueryExecutor::new(store);
        let result = executor
            .execute(&script("Member.allInstances()->size()"), &Parameters::new())
            .unwrap();
        assert_eq!(
            result.values().unwrap(),
            vec![ResultValue::Scalar(Value::Integer(3))]
        );

        let result = executor
            .execute(&script("Set{1, 2}"), &Parameters::new())
            .unwrap();
        assert_eq!(
            result.values().unwrap(),
            vec![ResultValue::List(vec![
                ResultValue::Scalar(Value::Integer(1)),
                ResultValue::Scalar(Value::Integer(2)),
            ])]
        );
        assert!(result.elements().unwrap().is_empty());
    }

    #[test]
    fn test_result_limit_caps_mapped_values() {
        let (_, store) = members();
        let result = QueryExecutor::new(store)
            .with_result_limit(Some(2))
            .execute(&script("Member.allInstances()"), &Parameters::new())
            .unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.values().unwrap().len(), 2);
        assert_eq!(result.raw().len(), 3);
    }

    #[test]
    fn test_unresolvable_elements() {
        let (graph, store) = members();
        let executor = QueryExecutor::new(store);

        let mut parameters = Parameters::new();
        parameters.insert(
            "x".to_string(),
            Value::Element(ElementRef::new(graph.id(), ElementId::from_internal(999))),
        );
        let result = executor.execute(&script("x"), &parameters).unwrap();
        assert!(matches!(
            result.values(),
            Err(Error::ResultMapping(ref message)) if message.contains("not found")
        ));

        let elsewhere = MemoryGraph::new("elsewhere");
        parameters.insert(
            "x".to_string(),
            Value::Element(ElementRef::new(elsewhere.id(), ElementId::from_internal(1))),
        );
        let result = executor.execute(&script("x"), &parameters).unwrap();
        assert!(matches!(
            result.values(),
            Err(Error::ResultMapping(ref message)) if message.contains("no bound store")
        ));
    }

    #[test]
    fn test_script_executes_repeatedly() {
        let (_, store) = members();
        let executor = QueryExecutor::new(store);
        let script = script("Member.allInstances()->collect(m | m.firstName)");
        let before = script.clone();
        for _ in 0..3 {
            let result = executor.execute(&script, &Parameters::new()).unwrap();
            assert_eq!(result.len(), 3);
        }
        assert_eq!(script, before);
    }

    #[test]
    fn test_non_finite_literal_fails_before_binding() {
        let (graph, store) = members();
        let executor = QueryExecutor::new(store);

        // NaN > z
        let mut b = ScriptBuilder::new();
        let nan = b.literal(f64::NAN);
        let z = b.variable("z");
        let cmp = b.binary(BinaryOperator::Greater, nan, z).unwrap();
        let stmt = b.expression(cmp).unwrap();
        b.append(Container::Script, stmt).unwrap();
        let script = b.finish().unwrap();

        let err = executor.execute(&script, &Parameters::new()).unwrap_err();
        assert!(matches!(err, Error::Structural(_)), "{:?}", err);
        assert!(err.is_static());
        assert_eq!(graph.element_count().unwrap(), 3);
    }
}
