//! Metamodel descriptions
//!
//! The translator only needs to know which classes exist and whether a
//! feature is an attribute (vertex property) or a reference (edge).

use mogwai_core::Label;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a feature is stored in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    /// Vertex property
    Attribute,
    /// Outgoing edge labelled with the feature name
    Reference,
}

/// A structural feature of a class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Name of the feature
    pub name: String,

    /// Attribute or reference
    pub kind: FeatureKind,

    /// Class of the referenced elements (references only)
    pub target: Option<String>,
}

impl Feature {
    /// Create an attribute
    pub fn attribute(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FeatureKind::Attribute,
            target: None,
        }
    }

    /// Create a reference to elements of `target`
    pub fn reference(name: &str, target: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FeatureKind::Reference,
            target: Some(target.to_string()),
        }
    }

    pub fn is_reference(&self) -> bool {
        self.kind == FeatureKind::Reference
    }
}

/// A metaclass, stored as a vertex label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaClass {
    /// Name of the class
    pub name: String,

    /// Features by declaration order
    pub features: Vec<Feature>,
}

impl MetaClass {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            features: Vec::new(),
        }
    }

    /// Builder: add an attribute
    pub fn attribute(mut self, name: &str) -> Self {
        self.features.push(Feature::attribute(name));
        self
    }

    /// Builder: add a reference
    pub fn reference(mut self, name: &str, target: &str) -> Self {
        self.features.push(Feature::reference(name, target));
        self
    }

    /// Get a feature by name
    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.name == name)
    }

    /// Label of the vertices holding instances of this class
    pub fn label(&self) -> Label {
        Label::new(self.name.as_str())
    }
}

/// The classes known to the translator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metamodel {
    /// Classes by name
    pub classes: BTreeMap<String, MetaClass>,
}

impl Metamodel {
    /// Create a new empty metamodel
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class, returns false if the name is taken
    pub fn add_class(&mut self, class: MetaClass) -> bool {
        if self.classes.contains_key(&class.name) {
            return false;
        }
        self.classes.insert(class.name.clone(), class);
        true
    }

    /// Builder: add a class
    pub fn with_class(mut self, class: MetaClass) -> Self {
        self.add_class(class);
        self
    }

    /// Get a class by name
    pub fn class(&self, name: &str) -> Option<&MetaClass> {
        self.classes.get(name)
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Resolve a feature on a known class, or on any class when the
    /// owning class is unknown
    pub fn feature(&self, class: Option<&str>, name: &str) -> Option<&Feature> {
        match class.and_then(|c| self.class(c)) {
            Some(class) => class.feature(name),
            None => self.classes.values().find_map(|c| c.feature(name)),
        }
    }
}
