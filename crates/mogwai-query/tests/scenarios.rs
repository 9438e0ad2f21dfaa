//! End-to-end scenarios: translation, printing, binding and execution

use mogwai_core::{
    Direction, ElementId, Error, Label, ModelElement, Properties, Result, StoreId, Value,
};
use mogwai_graph::{MemoryGraph, ModelStore, ResultSequence, TraversalRequest};
use mogwai_gremlin::{
    BinaryOperator, Container, Expression, Instruction, Literal, ScriptBuilder, VariableReference,
};
use mogwai_ocl::parse;
use mogwai_query::{
    MetaClass, Metamodel, Parameters, Query, QueryConfig, QueryExecutor, translate,
};
use proptest::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Forwards to a memory graph and counts every store call
struct RecordingStore {
    inner: MemoryGraph,
    calls: AtomicUsize,
}

impl RecordingStore {
    fn new(inner: MemoryGraph) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl ModelStore for RecordingStore {
    fn id(&self) -> StoreId {
        self.inner.id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn lookup(&self, id: ElementId) -> Result<Option<ModelElement>> {
        self.record();
        self.inner.lookup(id)
    }

    fn elements(&self) -> Result<Vec<ModelElement>> {
        self.record();
        self.inner.elements()
    }

    fn adjacent(
        &self,
        id: ElementId,
        direction: Direction,
        label: Option<&str>,
    ) -> Result<Vec<ElementId>> {
        self.record();
        self.inner.adjacent(id, direction, label)
    }

    fn create_element(&self, labels: &[Label]) -> Result<ModelElement> {
        self.record();
        self.inner.create_element(labels)
    }

    fn set_property(&self, id: ElementId, key: &str, value: Value) -> Result<()> {
        self.record();
        self.inner.set_property(id, key, value)
    }

    fn execute(&self, request: &TraversalRequest<'_>) -> Result<ResultSequence> {
        self.record();
        self.inner.execute(request)
    }
}

fn three_elements() -> MemoryGraph {
    let graph = MemoryGraph::new("model");
    for attr in [0i64, 1, 2] {
        graph
            .add_element_with_properties(["C"], Properties::with("attr", attr))
            .unwrap();
    }
    graph
}

#[test]
fn test_scenario_a_difference_of_literals() {
    let script = translate(&parse("3 <> 5").unwrap(), &Metamodel::new()).unwrap();

    assert_eq!(
        script.instructions(),
        &[Instruction::Expression(Expression::Binary {
            op: BinaryOperator::Difference,
            left: Box::new(Expression::Literal(Literal::Integer(3))),
            right: Box::new(Expression::Literal(Literal::Integer(5))),
        })]
    );
    assert_eq!(script.to_text(), "3 != 5;\n");
}

#[test]
fn test_scenario_b_select_lowers_to_filter() {
    let metamodel = Metamodel::new().with_class(MetaClass::new("C").attribute("attr"));
    let script = translate(
        &parse("C.allInstances()->select(e | e.attr = 1)").unwrap(),
        &metamodel,
    )
    .unwrap();

    let Some(Instruction::Closure(filter)) = script.instructions().last() else {
        panic!("expected a closure, got {:?}", script.instructions());
    };
    assert_eq!(filter.name(), "filter");
    assert_eq!(
        filter.body(),
        &[Instruction::Expression(Expression::Binary {
            op: BinaryOperator::Equality,
            left: Box::new(Expression::Property {
                target: Box::new(Expression::Variable(VariableReference::new("e"))),
                name: "attr".to_string(),
            }),
            right: Box::new(Expression::Literal(Literal::Integer(1))),
        })]
    );
    assert!(script.to_text().ends_with("filter{ e.attr == 1; };\n"));
}

#[test]
fn test_scenario_c_one_matching_element() {
    let store = Arc::new(RecordingStore::new(three_elements()));

    // V(input); filter{ it.attr == 1; }
    let mut b = ScriptBuilder::new();
    let input = b.variable("input");
    let all = b.step("V", vec![input]).unwrap();
    b.append(Container::Script, all).unwrap();
    let filter = b.closure("filter", None);
    let it = b.variable("it");
    let attr = b.property(it, "attr").unwrap();
    let one = b.literal(1i64);
    let matches = b.binary(BinaryOperator::Equality, attr, one).unwrap();
    let statement = b.expression(matches).unwrap();
    b.append(Container::Closure(filter), statement).unwrap();
    b.append(Container::Script, filter).unwrap();
    let script = b.finish().unwrap();
    assert_eq!(script.len(), 2);

    let result = QueryExecutor::new(store.clone())
        .execute(&script, &Parameters::new())
        .unwrap();
    let elements = result.elements().unwrap();
    assert_eq!(elements.len(), 1);
    assert_eq!(elements[0].get_property("attr"), Some(&Value::Integer(1)));
    assert!(elements[0].has_label_name("C"));
    assert_eq!(result.stats().raw_results, 1);
    assert!(store.calls() > 0);
}

#[test]
fn test_scenario_d_unbound_variable_before_store_io() {
    let store = Arc::new(RecordingStore::new(three_elements()));
    let script = translate(
        &parse("C.allInstances()->select(e | e.attr = z)").unwrap(),
        &Metamodel::new(),
    )
    .unwrap();

    let err = QueryExecutor::new(store.clone())
        .execute(&script, &Parameters::new())
        .unwrap_err();
    assert!(matches!(err, Error::UnboundVariable(ref name) if name == "z"));
    assert!(err.is_static());
    assert_eq!(store.calls(), 0);
}

#[test]
fn test_query_over_family_model() {
    let metamodel = Metamodel::new()
        .with_class(
            MetaClass::new("Family")
                .attribute("lastName")
                .reference("father", "Member")
                .reference("sons", "Member"),
        )
        .with_class(MetaClass::new("Member").attribute("firstName").attribute("age"));

    let graph = MemoryGraph::new("families");
    let jim = graph
        .add_element_with_properties(
            ["Member"],
            [
                ("firstName".to_string(), Value::from("Jim")),
                ("age".to_string(), Value::Integer(45)),
            ]
            .into_iter()
            .collect(),
        )
        .unwrap();
    let brandon = graph
        .add_element_with_properties(
            ["Member"],
            [
                ("firstName".to_string(), Value::from("Brandon")),
                ("age".to_string(), Value::Integer(12)),
            ]
            .into_iter()
            .collect(),
        )
        .unwrap();
    let family = graph
        .add_element_with_properties(["Family"], Properties::with("lastName", "March"))
        .unwrap();
    graph.add_edge(family.id(), "father", jim.id()).unwrap();
    graph.add_edge(family.id(), "sons", brandon.id()).unwrap();

    let input: Arc<dyn ModelStore> = Arc::new(graph);
    let config = QueryConfig::new(metamodel);

    let fathers = Query::parse(
        "Family.allInstances().father->select(m | m.age > threshold)",
        Arc::clone(&input),
        config.clone(),
    )
    .unwrap();
    assert_eq!(
        fathers.script_text(),
        "V(input);\nhasLabel(\"Family\");\nout(\"father\");\nfilter{ m.age > threshold; };\n"
    );

    let mut parameters = Parameters::new();
    parameters.insert("threshold".to_string(), Value::Integer(18));
    let result = fathers.execute(&parameters).unwrap();
    let ids: Vec<_> = result.elements().unwrap().iter().map(|e| e.id()).collect();
    assert_eq!(ids, vec![jim.id()]);

    // the compiled script is reusable with other parameter values
    parameters.insert("threshold".to_string(), Value::Integer(50));
    assert!(fathers.execute(&parameters).unwrap().is_empty());

    let names = Query::parse(
        "Member.allInstances()->collect(m | m.firstName)",
        Arc::clone(&input),
        config.clone(),
    )
    .unwrap();
    let values: Vec<_> = names
        .execute(&Parameters::new())
        .unwrap()
        .values()
        .unwrap()
        .into_iter()
        .filter_map(|v| v.as_scalar().cloned())
        .collect();
    assert_eq!(values, vec![Value::from("Jim"), Value::from("Brandon")]);

    let any_minor = Query::parse(
        "Member.allInstances()->exists(m | m.age < 18)",
        input,
        config,
    )
    .unwrap();
    let result = any_minor.execute(&Parameters::new()).unwrap();
    assert_eq!(
        result.values().unwrap()[0].as_scalar(),
        Some(&Value::Boolean(true))
    );
}

#[test]
fn test_implicit_iterator_filters_on_current_element() {
    let graph = three_elements();
    let metamodel = Metamodel::new().with_class(MetaClass::new("C").attribute("attr"));
    let query = Query::parse(
        "C.allInstances()->select(attr > 0)",
        Arc::new(graph),
        QueryConfig::new(metamodel),
    )
    .unwrap();
    assert_eq!(
        query.script_text(),
        "V(input);\nhasLabel(\"C\");\nfilter{ it.attr > 0; };\n"
    );

    let result = query.execute(&Parameters::new()).unwrap();
    let attrs: Vec<_> = result
        .elements()
        .unwrap()
        .iter()
        .filter_map(|e| e.get_property("attr").cloned())
        .collect();
    assert_eq!(attrs, vec![Value::Integer(1), Value::Integer(2)]);
}

#[test]
fn test_transformation_writes_output_store() {
    // both stores share a name but stay distinct
    let input = Arc::new(RecordingStore::new(three_elements()));
    let output = MemoryGraph::new("model");
    assert_ne!(input.id(), output.id());

    // addV(output, "Person"); property("source", "C")
    let mut b = ScriptBuilder::new();
    let handle = b.variable("output");
    let label = b.literal("Person");
    let add = b.step("addV", vec![handle, label]).unwrap();
    b.append(Container::Script, add).unwrap();
    let key = b.literal("source");
    let value = b.literal("C");
    let set = b.step("property", vec![key, value]).unwrap();
    b.append(Container::Script, set).unwrap();
    let script = b.finish().unwrap();

    let result = QueryExecutor::new(input.clone())
        .with_output(Arc::new(output.clone()))
        .execute(&script, &Parameters::new())
        .unwrap();

    let created = result.elements().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].get_property("source"), Some(&Value::from("C")));
    assert_eq!(output.find_by_label("Person").unwrap().len(), 1);
    assert!(input.inner.find_by_label("Person").unwrap().is_empty());
    assert_eq!(input.inner.element_count().unwrap(), 3);
}

#[test]
fn test_config_from_json_drives_translation() {
    let json = serde_json::json!({
        "metamodel": {
            "classes": {
                "Family": {
                    "name": "Family",
                    "features": [
                        { "name": "sons", "kind": "Reference", "target": "Member" }
                    ]
                }
            }
        },
        "print": { "line_break": " " }
    });
    let config = QueryConfig::from_json(&json.to_string()).unwrap();
    let query = Query::parse(
        "Family.allInstances().sons",
        Arc::new(MemoryGraph::new("families")),
        config,
    )
    .unwrap();
    assert_eq!(
        query.script_text(),
        "V(input); hasLabel(\"Family\"); out(\"sons\"); "
    );
}

proptest! {
    #[test]
    fn prop_unbound_variables_fail_before_store_io(suffix in "[a-z0-9]{1,8}") {
        let name = format!("free_{}", suffix);
        let store = Arc::new(RecordingStore::new(three_elements()));
        let source = format!("C.allInstances()->select(e | e.attr = {})", name);
        let script = translate(&parse(&source).unwrap(), &Metamodel::new()).unwrap();

        let err = QueryExecutor::new(store.clone())
            .execute(&script, &Parameters::new())
            .unwrap_err();
        prop_assert!(matches!(err, Error::UnboundVariable(ref n) if *n == name));
        prop_assert_eq!(store.calls(), 0);
    }
}
