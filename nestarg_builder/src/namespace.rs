use std::collections::BTreeMap;

use crate::model::{Instance, Value};

/// The flat destination to value map exchanged with the flag-parsing engine.
///
/// After reconstruction, each registration destination holds its [`Instance`] and
/// [`subgroups`](Namespace::subgroups) maps every subgroup selector destination to the chosen variant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespace {
    values: BTreeMap<String, Value>,
    subgroups: BTreeMap<String, String>,
}

impl Namespace {
    /// Create an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-fill `dest` with `value` (builder style).
    pub fn with(mut self, dest: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(dest, value);
        self
    }

    /// The value at `dest`.
    pub fn get(&self, dest: &str) -> Option<&Value> {
        self.values.get(dest)
    }

    /// The record instance at `dest`.
    pub fn instance(&self, dest: &str) -> Option<&Instance> {
        self.get(dest).and_then(Value::as_instance)
    }

    /// Set (or replace) the value at `dest`.
    pub fn set(&mut self, dest: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(dest.into(), value.into());
    }

    /// Take the value at `dest` out of the namespace.
    pub fn remove(&mut self, dest: &str) -> Option<Value> {
        self.values.remove(dest)
    }

    /// Whether `dest` holds a value.
    pub fn contains(&self, dest: &str) -> bool {
        self.values.contains_key(dest)
    }

    /// The destinations holding values, in lexical order.
    pub fn destinations(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// The number of destinations holding values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no destination holds a value.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The chosen variant per subgroup selector destination (ex: `config.model -> "mlp"`).
    pub fn subgroups(&self) -> &BTreeMap<String, String> {
        &self.subgroups
    }

    pub(crate) fn choose(&mut self, selector: impl Into<String>, variant: impl Into<String>) {
        self.subgroups.insert(selector.into(), variant.into());
    }
}
