//! Model element types for Mogwai
//!
//! Defines how model elements appear once stored as graph vertices: labels,
//! element references, elements and the edges between them.

use crate::id::{ElementId, StoreId};
use crate::value::{Properties, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A label for elements (metaclass name) or edges (reference name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Label(String);

impl Label {
    /// Create a new label
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    /// Get the label name
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of an edge traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Outgoing edge
    Outgoing,
    /// Incoming edge
    Incoming,
    /// Both directions
    Both,
}

/// A store-qualified reference to a graph element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    /// Store holding the element
    pub store: StoreId,

    /// Element identifier inside that store
    pub element: ElementId,
}

impl ElementRef {
    /// Create a new element reference
    pub fn new(store: StoreId, element: ElementId) -> Self {
        Self { store, element }
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.store, self.element)
    }
}

/// A model element as held by a graph-backed store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelElement {
    /// Store-qualified identity
    pub reference: ElementRef,

    /// Metaclass labels, in insertion order
    pub labels: Vec<Label>,

    /// Attribute values
    pub properties: Properties,
}

impl ModelElement {
    /// Create an element with labels
    pub fn with_labels<I, L>(reference: ElementRef, labels: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Label>,
    {
        let mut element = Self {
            reference,
            labels: Vec::new(),
            properties: Properties::new(),
        };
        for label in labels {
            element.add_label(label);
        }
        element
    }

    /// Element identifier inside its store
    pub fn id(&self) -> ElementId {
        self.reference.element
    }

    /// Add a label, ignoring duplicates
    pub fn add_label<L: Into<Label>>(&mut self, label: L) {
        let label = label.into();
        if !self.labels.contains(&label) {
            self.labels.push(label);
        }
    }

    /// Check if element has a label by name
    pub fn has_label_name(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.name() == name)
    }

    /// Set a property
    pub fn set_property<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        self.properties.set(key, value);
    }

    /// Get a property
    pub fn get_property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// A labelled edge between two elements of the same store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Reference name
    pub label: Label,

    /// Source element
    pub source: ElementId,

    /// Target element
    pub target: ElementId,
}

impl Edge {
    /// Create a new edge
    pub fn new<L: Into<Label>>(source: ElementId, label: L, target: ElementId) -> Self {
        Self {
            label: label.into(),
            source,
            target,
        }
    }

    /// Get the element ID at the other end of the edge
    pub fn other(&self, id: ElementId) -> Option<ElementId> {
        if self.source == id {
            Some(self.target)
        } else if self.target == id {
            Some(self.source)
        } else {
            None
        }
    }
}
