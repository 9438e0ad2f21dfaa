//! Model store interface
//!
//! A model store holds model elements as graph vertices and executes
//! traversal scripts against them. Executors only talk to stores through
//! this trait.

use mogwai_core::{Direction, ElementId, Label, ModelElement, Result, StoreId, Value};
use mogwai_gremlin::Script;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A graph-backed model store
pub trait ModelStore: Send + Sync {
    /// Store identifier, carried by every element reference it hands out
    fn id(&self) -> StoreId;

    /// Store name
    fn name(&self) -> &str;

    /// Get an element by ID
    fn lookup(&self, id: ElementId) -> Result<Option<ModelElement>>;

    /// All elements, in store order
    fn elements(&self) -> Result<Vec<ModelElement>>;

    /// Elements adjacent to `id`, optionally restricted to one edge label
    fn adjacent(
        &self,
        id: ElementId,
        direction: Direction,
        label: Option<&str>,
    ) -> Result<Vec<ElementId>>;

    /// Create a new element with the given labels
    fn create_element(&self, labels: &[Label]) -> Result<ModelElement>;

    /// Set an attribute value on an existing element
    fn set_property(&self, id: ElementId, key: &str, value: Value) -> Result<()>;

    /// Run a traversal script
    fn execute(&self, request: &TraversalRequest<'_>) -> Result<ResultSequence>;
}

/// What a script variable is bound to
#[derive(Clone)]
pub enum Binding {
    /// A store handle (`input`, `output`)
    Store(Arc<dyn ModelStore>),

    /// An external parameter value
    Value(Value),
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Store(store) => write!(f, "Store({})", store.name()),
            Binding::Value(value) => write!(f, "Value({})", value),
        }
    }
}

/// Variable bindings of one script execution
#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: BTreeMap<String, Binding>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a name to a store handle
    pub fn bind_store<S: Into<String>>(&mut self, name: S, store: Arc<dyn ModelStore>) {
        self.bindings.insert(name.into(), Binding::Store(store));
    }

    /// Bind a name to a value
    pub fn bind_value<S: Into<String>, V: Into<Value>>(&mut self, name: S, value: V) {
        self.bindings.insert(name.into(), Binding::Value(value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// The store bound under `name`, if any
    pub fn store(&self, name: &str) -> Option<&Arc<dyn ModelStore>> {
        match self.bindings.get(name) {
            Some(Binding::Store(store)) => Some(store),
            _ => None,
        }
    }

    /// Bound store with the given identifier
    pub fn store_by_id(&self, id: StoreId) -> Option<&Arc<dyn ModelStore>> {
        self.bindings.values().find_map(|binding| match binding {
            Binding::Store(store) if store.id() == id => Some(store),
            _ => None,
        })
    }

    /// Bound names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// A script handed to a store for execution
#[derive(Debug, Clone, Copy)]
pub struct TraversalRequest<'a> {
    /// Sealed script
    pub script: &'a Script,

    /// Printed form of the script
    pub text: &'a str,

    /// Resolved variable bindings
    pub environment: &'a Environment,
}

/// Ordered raw results of a traversal
///
/// Iterating never consumes the sequence: every call to `iter` starts
/// again from the first value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSequence {
    values: Vec<Value>,
}

impl ResultSequence {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl From<Vec<Value>> for ResultSequence {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl<'a> IntoIterator for &'a ResultSequence {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl IntoIterator for ResultSequence {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
