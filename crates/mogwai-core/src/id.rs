//! Identification types for Mogwai
//!
//! Provides strongly-typed identifiers for model stores and the graph
//! elements they hold.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Internal numeric ID for efficient storage and lookup
pub type InternalId = u64;

/// Trait for all entity identifiers
pub trait EntityId: Clone + Copy + Eq + std::hash::Hash + fmt::Debug + fmt::Display {
    /// Create from internal numeric ID
    fn from_internal(id: InternalId) -> Self;

    /// Get the internal numeric representation
    fn as_internal(&self) -> InternalId;
}

/// Identifier for a model store
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreId(InternalId);

impl StoreId {
    /// Create a new random store ID
    ///
    /// Two stores never share an ID, even when they share a name.
    pub fn new() -> Self {
        Self(Uuid::new_v4().as_u128() as u64)
    }
}

impl Default for StoreId {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityId for StoreId {
    fn from_internal(id: InternalId) -> Self {
        Self(id)
    }

    fn as_internal(&self) -> InternalId {
        self.0
    }
}

impl fmt::Debug for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoreId({})", self.0)
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a graph element (vertex) inside one store
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(InternalId);

impl EntityId for ElementId {
    fn from_internal(id: InternalId) -> Self {
        Self(id)
    }

    fn as_internal(&self) -> InternalId {
        self.0
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({})", self.0)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier generator for sequential element IDs within a store
#[derive(Debug)]
pub struct IdGenerator {
    next_element_id: AtomicU64,
}

impl IdGenerator {
    /// Create a new ID generator
    pub fn new() -> Self {
        Self {
            next_element_id: AtomicU64::new(1),
        }
    }

    /// Generate the next element ID
    pub fn next_element_id(&self) -> ElementId {
        ElementId::from_internal(self.next_element_id.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_store_ids_differ() {
        assert_ne!(StoreId::new(), StoreId::new());
        let id = StoreId::from_internal(7);
        assert_eq!(id.as_internal(), 7);
        assert_eq!(format!("{:?}", id), "StoreId(7)");
    }

    #[test]
    fn test_element_id_from_internal() {
        let id = ElementId::from_internal(42);
        assert_eq!(id.as_internal(), 42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(format!("{:?}", id), "ElementId(42)");
    }

    #[test]
    fn test_id_generator() {
        let id_gen = IdGenerator::new();

        let e1 = id_gen.next_element_id();
        let e2 = id_gen.next_element_id();
        assert_ne!(e1, e2);
        assert_eq!(e1.as_internal() + 1, e2.as_internal());
        assert_eq!(e1.as_internal(), 1);
    }
}
