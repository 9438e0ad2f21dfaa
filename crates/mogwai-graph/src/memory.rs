//! In-memory model store
//!
//! A lock-protected property graph with insertion-ordered elements and
//! labelled edges. Scripts are executed by the `TraversalMachine`.

use crate::store::{ModelStore, ResultSequence, TraversalRequest};
use crate::traversal::TraversalMachine;
use mogwai_core::{
    Direction, Edge, ElementId, ElementRef, Error, IdGenerator, Label, ModelElement, Properties,
    Result, StoreId, Value,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Debug, Default)]
struct GraphState {
    /// Elements in insertion order
    elements: Vec<ModelElement>,

    /// Element ID to position in `elements`
    index: HashMap<ElementId, usize>,

    edges: Vec<Edge>,
}

/// An in-memory model store
#[derive(Debug)]
pub struct MemoryGraph {
    /// Store identifier
    id: StoreId,

    /// Name of the store
    name: String,

    /// ID generator for this store
    id_gen: Arc<IdGenerator>,

    state: Arc<RwLock<GraphState>>,
}

impl MemoryGraph {
    /// Create an empty store with a fresh ID
    ///
    /// The name is only for display, so two stores may share it.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            id: StoreId::new(),
            name: name.into(),
            id_gen: Arc::new(IdGenerator::new()),
            state: Arc::new(RwLock::new(GraphState::default())),
        }
    }

    // ========== Element Operations ==========

    /// Create a new element with the given labels
    pub fn add_element<I, L>(&self, labels: I) -> Result<ModelElement>
    where
        I: IntoIterator<Item = L>,
        L: Into<Label>,
    {
        self.add_element_with_properties(labels, Properties::new())
    }

    /// Create a new element with labels and attribute values
    pub fn add_element_with_properties<I, L>(
        &self,
        labels: I,
        properties: Properties,
    ) -> Result<ModelElement>
    where
        I: IntoIterator<Item = L>,
        L: Into<Label>,
    {
        let reference = ElementRef::new(self.id, self.id_gen.next_element_id());
        let mut element = ModelElement::with_labels(reference, labels);
        element.properties = properties;

        let mut state = self.write()?;
        let position = state.elements.len();
        state.index.insert(element.id(), position);
        state.elements.push(element.clone());

        debug!("Created element {:?} in store {}", element.id(), self.name);
        Ok(element)
    }

    /// Get an element by ID
    pub fn get_element(&self, id: ElementId) -> Result<Option<ModelElement>> {
        let state = self.read()?;
        Ok(state.index.get(&id).map(|&i| state.elements[i].clone()))
    }

    /// Find elements by label
    pub fn find_by_label(&self, label: &str) -> Result<Vec<ModelElement>> {
        let state = self.read()?;
        Ok(state
            .elements
            .iter()
            .filter(|e| e.has_label_name(label))
            .cloned()
            .collect())
    }

    pub fn element_count(&self) -> Result<usize> {
        Ok(self.read()?.elements.len())
    }

    // ========== Edge Operations ==========

    /// Create a labelled edge between two existing elements
    pub fn add_edge<L: Into<Label>>(
        &self,
        source: ElementId,
        label: L,
        target: ElementId,
    ) -> Result<Edge> {
        let mut state = self.write()?;
        for id in [source, target] {
            if !state.index.contains_key(&id) {
                return Err(Error::Execution(format!(
                    "element {:?} not found in store {}",
                    id, self.name
                )));
            }
        }

        let edge = Edge::new(source, label, target);
        state.edges.push(edge.clone());
        debug!(
            "Created edge {:?} -[{}]-> {:?} in store {}",
            source, edge.label, target, self.name
        );
        Ok(edge)
    }

    /// Edges touching an element
    pub fn edges(&self, id: ElementId, direction: Direction) -> Result<Vec<Edge>> {
        let state = self.read()?;
        Ok(state
            .edges
            .iter()
            .filter(|edge| match direction {
                Direction::Outgoing => edge.source == id,
                Direction::Incoming => edge.target == id,
                Direction::Both => edge.source == id || edge.target == id,
            })
            .cloned()
            .collect())
    }

    pub fn edge_count(&self) -> Result<usize> {
        Ok(self.read()?.edges.len())
    }

    // ========== Private Helpers ==========

    fn read(&self) -> Result<RwLockReadGuard<'_, GraphState>> {
        self.state
            .read()
            .map_err(|_| Error::Internal("Failed to acquire graph lock".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, GraphState>> {
        self.state
            .write()
            .map_err(|_| Error::Internal("Failed to acquire graph lock".to_string()))
    }
}

impl Clone for MemoryGraph {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            id_gen: Arc::clone(&self.id_gen),
            state: Arc::clone(&self.state),
        }
    }
}

impl ModelStore for MemoryGraph {
    fn id(&self) -> StoreId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, id: ElementId) -> Result<Option<ModelElement>> {
        self.get_element(id)
    }

    fn elements(&self) -> Result<Vec<ModelElement>> {
        Ok(self.read()?.elements.clone())
    }

    fn adjacent(
        &self,
        id: ElementId,
        direction: Direction,
        label: Option<&str>,
    ) -> Result<Vec<ElementId>> {
        Ok(self
            .edges(id, direction)?
            .into_iter()
            .filter(|edge| label.is_none_or(|l| edge.label.name() == l))
            .filter_map(|edge| match direction {
                Direction::Outgoing => Some(edge.target),
                Direction::Incoming => Some(edge.source),
                Direction::Both => edge.other(id),
            })
            .collect())
    }

    fn create_element(&self, labels: &[Label]) -> Result<ModelElement> {
        self.add_element(labels.iter().cloned())
    }

    fn set_property(&self, id: ElementId, key: &str, value: Value) -> Result<()> {
        let mut state = self.write()?;
        let position = *state.index.get(&id).ok_or_else(|| {
            Error::Execution(format!("element {:?} not found in store {}", id, self.name))
        })?;
        state.elements[position].set_property(key, value);
        Ok(())
    }

    fn execute(&self, request: &TraversalRequest<'_>) -> Result<ResultSequence> {
        debug!("Executing script on store {}:\n{}", self.name, request.text);
        let values = TraversalMachine::new(request.environment).run(request.script)?;
        debug!("Script on store {} produced {} values", self.name, values.len());
        Ok(ResultSequence::new(values))
    }
}
