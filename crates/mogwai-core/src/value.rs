//! Runtime values
//!
//! Values flowing through traversals: scalar properties, lists and
//! references to graph elements.

use crate::types::ElementRef;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// A value produced or consumed by a traversal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null/missing value
    Null,

    /// Boolean value
    Boolean(bool),

    /// 64-bit signed integer
    Integer(i64),

    /// 64-bit floating point
    Float(f64),

    /// UTF-8 string
    String(String),

    /// Ordered list of values
    List(Vec<Value>),

    /// Reference to a graph element held by a store
    Element(ElementRef),
}

impl Value {
    /// Returns true if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if the value is a boolean
    pub fn is_boolean(&self) -> bool {
        matches!(self, Value::Boolean(_))
    }

    /// Returns true if the value is an integer or a float
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    /// Returns true if the value is a list
    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Returns true if the value references a graph element
    pub fn is_element(&self) -> bool {
        matches!(self, Value::Element(_))
    }

    /// Try to get as boolean
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get as string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as list reference
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get as element reference
    pub fn as_element(&self) -> Option<ElementRef> {
        match self {
            Value::Element(r) => Some(*r),
            _ => None,
        }
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Element(_) => "element",
        }
    }

    /// Equality with integer/float promotion, element-wise for lists
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                (*a as f64) == *b
            }
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            _ => self == other,
        }
    }

    /// Ordering between comparable values, `None` for incomparable pairs
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::String(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Element(r) => write!(f, "{}", r),
        }
    }
}

// Convenience From implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<ElementRef> for Value {
    fn from(v: ElementRef) -> Self {
        Value::Element(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

/// A collection of element properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    inner: HashMap<String, Value>,
}

impl Properties {
    /// Create an empty property collection
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    /// Create with a single property
    pub fn with<K: Into<String>, V: Into<Value>>(key: K, value: V) -> Self {
        let mut props = Self::new();
        props.set(key, value);
        props
    }

    /// Set a property value
    pub fn set<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        self.inner.insert(key.into(), value.into());
    }

    /// Get a property value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    /// Remove a property
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.inner.remove(key)
    }

    /// Check if a property exists
    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Get the number of properties
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate over properties
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.inner.iter()
    }
}

impl FromIterator<(String, Value)> for Properties {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{ElementId, EntityId, StoreId};

    #[test]
    fn test_value_types() {
        assert!(Value::Null.is_null());
        assert!(Value::Boolean(true).is_boolean());
        assert!(Value::Integer(42).is_number());
        assert!(Value::Float(0.5).is_number());
        assert!(Value::List(vec![]).is_list());
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::Boolean(true).as_boolean(), Some(true));
        assert_eq!(Value::Integer(42).as_integer(), Some(42));
        assert_eq!(Value::Integer(42).as_float(), Some(42.0));
        assert_eq!(Value::String("test".into()).as_str(), Some("test"));
        assert_eq!(Value::from(vec![1i64, 2]).as_list().map(|l| l.len()), Some(2));
    }

    #[test]
    fn test_loose_equality() {
        assert!(Value::Integer(1).loose_eq(&Value::Float(1.0)));
        assert!(Value::Float(2.0).loose_eq(&Value::Integer(2)));
        assert!(!Value::Integer(1).loose_eq(&Value::String("1".into())));
        assert!(Value::from(vec![1i64, 2]).loose_eq(&Value::List(vec![
            Value::Float(1.0),
            Value::Integer(2)
        ])));
    }

    #[test]
    fn test_compare() {
        assert_eq!(Value::Integer(1).compare(&Value::Integer(2)), Some(Ordering::Less));
        assert_eq!(Value::Float(2.5).compare(&Value::Integer(2)), Some(Ordering::Greater));
        assert_eq!(Value::from("b").compare(&Value::from("a")), Some(Ordering::Greater));
        assert_eq!(Value::Integer(1).compare(&Value::from("a")), None);
        assert_eq!(Value::Null.compare(&Value::Null), None);
    }

    #[test]
    fn test_display() {
        let element = ElementRef::new(StoreId::from_internal(7), ElementId::from_internal(3));
        let list = Value::List(vec![
            Value::Integer(1),
            Value::Float(2.0),
            Value::from("x"),
            Value::Element(element),
        ]);
        assert_eq!(list.to_string(), "[1, 2.0, \"x\", 7#3]");
    }

    #[test]
    fn test_properties() {
        let mut props = Properties::new();
        props.set("name", "Alice");
        props.set("age", 30i64);

        assert_eq!(props.len(), 2);
        assert!(props.contains("name"));
        assert_eq!(props.get("age").and_then(|v| v.as_integer()), Some(30));
        assert_eq!(props.remove("name"), Some(Value::from("Alice")));
        assert_eq!(Properties::with("k", true).len(), 1);
    }

    fn scalar() -> impl proptest::strategy::Strategy<Value = Value> {
        use proptest::prelude::*;
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Boolean),
            (-1000i64..1000).prop_map(Value::Integer),
            (-1000i64..1000).prop_map(|i| Value::Float(i as f64 / 4.0)),
            "[a-z]{0,4}".prop_map(Value::String),
        ]
    }

    proptest::proptest! {
        #[test]
        fn prop_loose_eq_is_symmetric(a in scalar(), b in scalar()) {
            proptest::prop_assert_eq!(a.loose_eq(&b), b.loose_eq(&a));
        }

        #[test]
        fn prop_compare_is_antisymmetric(a in scalar(), b in scalar()) {
            proptest::prop_assert_eq!(a.compare(&b).map(Ordering::reverse), b.compare(&a));
        }
    }
}
