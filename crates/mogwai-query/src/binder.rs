//! Free variable binding
//!
//! Resolves every free variable of a script before anything touches a
//! store: the `input` and `output` handles, then external parameters.

use mogwai_core::{Error, Result, Value};
use mogwai_gremlin::Script;
use mogwai_graph::{Environment, ModelStore};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Variable naming the store a query reads from
pub const INPUT: &str = "input";

/// Variable naming the store a transformation writes to
pub const OUTPUT: &str = "output";

/// External parameter values by variable name
pub type Parameters = HashMap<String, Value>;

/// Builds execution environments for scripts
pub struct Binder;

impl Binder {
    /// Bind the free variables of `script`
    ///
    /// The input handle is always bound. The output handle is bound when
    /// present and must be a different store from the input. Any other free variable must have a parameter, otherwise
    /// binding fails with `UnboundVariable`.
    pub fn bind(
        script: &Script,
        input: &Arc<dyn ModelStore>,
        output: Option<&Arc<dyn ModelStore>>,
        parameters: &Parameters,
    ) -> Result<Environment> {
        for reserved in [INPUT, OUTPUT] {
            if parameters.contains_key(reserved) {
                return Err(Error::Configuration(format!(
                    "parameter `{}` shadows a store handle",
                    reserved
                )));
            }
        }

        let mut environment = Environment::new();
        environment.bind_store(INPUT, Arc::clone(input));
        if let Some(output) = output {
            if output.id() == input.id() {
                return Err(Error::Configuration(format!(
                    "output store `{}` is the input store",
                    output.name()
                )));
            }
            environment.bind_store(OUTPUT, Arc::clone(output));
        }

        for name in script.free_variables() {
            if environment.contains(&name) {
                continue;
            }
            match parameters.get(&name) {
                Some(value) => environment.bind_value(name, value.clone()),
                None => return Err(Error::UnboundVariable(name)),
            }
        }

        debug!(
            "Bound {} variables: {}",
            environment.len(),
            environment.names().collect::<Vec<_>>().join(", ")
        );
        Ok(environment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metamodel::Metamodel;
    use crate::translator::translate;
    use mogwai_graph::{Binding, MemoryGraph};
    use mogwai_ocl::parse;

    fn script(source: &str) -> Script {
        translate(&parse(source).unwrap(), &Metamodel::new()).unwrap()
    }

    fn store(name: &str) -> Arc<dyn ModelStore> {
        Arc::new(MemoryGraph::new(name))
    }

    #[test]
    fn test_binds_handles_and_parameters() {
        let script = script("Member.allInstances()->select(m | m.age > threshold)");
        let mut parameters = Parameters::new();
        parameters.insert("threshold".to_string(), Value::Integer(18));
        parameters.insert("unused".to_string(), Value::Integer(0));

        let environment = Binder::bind(&script, &store("in"), None, &parameters).unwrap();
        assert!(environment.store(INPUT).is_some());
        assert!(matches!(
            environment.get("threshold"),
            Some(Binding::Value(Value::Integer(18)))
        ));
        assert!(!environment.contains("unused"));
        assert!(!environment.contains(OUTPUT));
    }

    #[test]
    fn test_unbound_variable() {
        let script = script("x + z");
        let mut parameters = Parameters::new();
        parameters.insert("x".to_string(), Value::Integer(1));

        let err = Binder::bind(&script, &store("in"), None, &parameters).unwrap_err();
        assert!(matches!(err, Error::UnboundVariable(ref name) if name == "z"));
    }

    #[test]
    fn test_output_handle_only_when_bound() {
        let script = script("output");
        let err = Binder::bind(&script, &store("in"), None, &Parameters::new()).unwrap_err();
        assert!(matches!(err, Error::UnboundVariable(ref name) if name == "output"));

        let output = store("out");
        let environment =
            Binder::bind(&script, &store("in"), Some(&output), &Parameters::new()).unwrap();
        assert_eq!(environment.store(OUTPUT).map(|s| s.id()), Some(output.id()));
    }

    #[test]
    fn test_reserved_parameter_names() {
        let script = script("1");
        let mut parameters = Parameters::new();
        parameters.insert(INPUT.to_string(), Value::Null);
        assert!(matches!(
            Binder::bind(&script, &store("in"), None, &parameters),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_output_store_must_differ_from_input() {
        let script = script("output");
        let input = store("model");
        let err = Binder::bind(&script, &input, Some(&input), &Parameters::new()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "{:?}", err);

        // equal names are fine, identity is what matters
        let output = store("model");
        let environment =
            Binder::bind(&script, &input, Some(&output), &Parameters::new()).unwrap();
        assert_eq!(environment.store(INPUT).map(|s| s.id()), Some(input.id()));
        assert_eq!(environment.store(OUTPUT).map(|s| s.id()), Some(output.id()));
    }
}
