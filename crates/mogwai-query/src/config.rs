//! Query configuration

use crate::metamodel::Metamodel;
use mogwai_core::{Error, Result};
use mogwai_gremlin::PrintOptions;
use serde::{Deserialize, Serialize};

/// Settings shared by translation and execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Script text layout
    pub print: PrintOptions,

    /// Classes and features known to the translator
    pub metamodel: Metamodel,

    /// Maximum number of mapped results yielded per execution
    pub result_limit: Option<usize>,

    /// Verify the IR tree after every translation
    pub check_invariants: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            print: PrintOptions::default(),
            metamodel: Metamodel::default(),
            result_limit: None,
            check_invariants: true,
        }
    }
}

impl QueryConfig {
    /// Create a configuration for a metamodel
    pub fn new(metamodel: Metamodel) -> Self {
        Self {
            metamodel,
            ..Default::default()
        }
    }

    /// Load a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Builder: set print options
    pub fn print_options(mut self, print: PrintOptions) -> Self {
        self.print = print;
        self
    }

    /// Builder: cap the number of mapped results
    pub fn result_limit(mut self, limit: usize) -> Self {
        self.result_limit = Some(limit);
        self
    }

    /// Builder: skip the IR tree check after translation
    pub fn skip_invariant_checks(mut self) -> Self {
        self.check_invariants = false;
        self
    }
}
