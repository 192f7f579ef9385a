//! Object model seams
//!
//! The validator does not own an object model. It reads objects through
//! [`SemanticObject`] and counts field values through a [`FieldCountSource`].
//! [`DynObject`] is a small in-memory implementation for embedding and tests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declaration of one structural field on an object type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureInfo {
    pub name: String,
    /// Multi-valued (list) field
    pub many: bool,
    /// The field's type has an implicit default (enumerations, small
    /// integers), so a count of 0 may still mean "written once"
    pub implicit_zero: bool,
}

impl FeatureInfo {
    /// Single-valued field
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            many: false,
            implicit_zero: false,
        }
    }

    /// Multi-valued field
    pub fn many(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            many: true,
            implicit_zero: false,
        }
    }

    /// Single-valued field whose default value is indistinguishable from "unset"
    pub fn implicit(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            many: false,
            implicit_zero: true,
        }
    }
}

/// Read access to a semantic object
pub trait SemanticObject {
    /// Type tag matched against rule registrations and node type guards
    fn type_name(&self) -> &str;

    /// Every structural field the object's type declares
    fn features(&self) -> &[FeatureInfo];

    /// Number of values currently set on `field` (0 when unset)
    fn value_count(&self, field: &str) -> usize;

    /// Directly contained sub-objects, in field declaration order
    fn contents(&self) -> Vec<&Self>;

    fn feature(&self, name: &str) -> Option<&FeatureInfo> {
        self.features().iter().find(|f| f.name == name)
    }

    /// Volume of set values: list length for many-valued fields, 1 otherwise
    fn set_value_volume(&self) -> usize {
        self.features()
            .iter()
            .map(|f| match self.value_count(&f.name) {
                0 => 0,
                n if f.many => n,
                _ => 1,
            })
            .sum()
    }
}

/// Field-count collaborator
///
/// Decides which objects are skipped entirely and how many values of a
/// field count towards grammar cardinality.
pub trait FieldCountSource<O> {
    /// Objects excluded from validation
    fn is_transient(&self, obj: &O) -> bool;

    /// Number of values on `field` that the grammar has to account for
    fn count_non_transient_values(&self, obj: &O, field: &str) -> usize;
}

/// Counts every set value; no object is transient
#[derive(Debug, Clone, Copy, Default)]
pub struct SetValueCounter;

impl<O: SemanticObject> FieldCountSource<O> for SetValueCounter {
    fn is_transient(&self, _obj: &O) -> bool {
        false
    }

    fn count_non_transient_values(&self, obj: &O, field: &str) -> usize {
        obj.value_count(field)
    }
}

/// A field value of a [`DynObject`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Int(i64),
    Bool(bool),
    Enum(String),
    Object(Box<DynObject>),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn object(obj: DynObject) -> Self {
        Value::Object(Box::new(obj))
    }
}

/// In-memory semantic object with declared features and ordered values
///
/// # Example
///
/// ```
/// use csval_core::object::{DynObject, FeatureInfo, SemanticObject, Value};
///
/// let obj = DynObject::new("Entity")
///     .with_feature(FeatureInfo::single("name"))
///     .with_feature(FeatureInfo::many("features"))
///     .with_value("name", Value::text("Person"));
/// assert_eq!(obj.value_count("name"), 1);
/// assert_eq!(obj.value_count("features"), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynObject {
    type_name: String,
    features: Vec<FeatureInfo>,
    values: BTreeMap<String, Vec<Value>>,
}

impl DynObject {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            features: Vec::new(),
            values: BTreeMap::new(),
        }
    }

    /// Declare a feature (redeclaring a name replaces it)
    pub fn with_feature(mut self, feature: FeatureInfo) -> Self {
        self.features.retain(|f| f.name != feature.name);
        self.features.push(feature);
        self
    }

    /// Append a value to `field`
    pub fn with_value(mut self, field: impl Into<String>, value: Value) -> Self {
        self.push_value(field, value);
        self
    }

    /// Append `n` text values to `field`
    pub fn with_values(mut self, field: &str, n: usize) -> Self {
        for i in 0..n {
            self.push_value(field, Value::Text(format!("{}{}", field, i)));
        }
        self
    }

    pub fn push_value(&mut self, field: impl Into<String>, value: Value) {
        self.values.entry(field.into()).or_default().push(value);
    }

    /// Remove every value of `field`
    pub fn clear(&mut self, field: &str) {
        self.values.remove(field);
    }

    pub fn values(&self, field: &str) -> &[Value] {
        self.values.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl SemanticObject for DynObject {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn features(&self) -> &[FeatureInfo] {
        &self.features
    }

    fn value_count(&self, field: &str) -> usize {
        self.values.get(field).map_or(0, Vec::len)
    }

    fn contents(&self) -> Vec<&Self> {
        self.features
            .iter()
            .flat_map(|f| self.values(&f.name))
            .filter_map(|v| match v {
                Value::Object(obj) => Some(obj.as_ref()),
                _ => None,
            })
            .collect()
    }
}
