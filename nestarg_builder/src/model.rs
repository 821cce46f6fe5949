use crate::error::DecodeError;

/// The cardinality of inputs to match for an argument/option.
///
/// Inspired by argparse: <https://docs.python.org/3/library/argparse.html#nargs>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nargs {
    /// `N`: Precisely `N` values.
    Precisely(u8),
    /// `?`: Zero or one value.
    ZeroOrOne,
    /// `*`: May be any number of values, including `0`.
    Any,
    /// `+`: At least one value must be specified.
    AtLeastOne,
}

impl std::fmt::Display for Nargs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// How colliding option strings are handled when planning the parser.
///
/// Set once when constructing the [`ArgumentParser`](./struct.ArgumentParser.html).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictResolution {
    /// Qualify colliding flags with the shortest trailing destination path that tells them apart.
    #[default]
    Auto,
    /// Collisions are a configuration error; use distinct registration prefixes instead.
    None,
    /// Colliding flags use their full destination path.
    Explicit,
    /// Colliding flags of structurally identical records are fused into one multi-value flag.
    /// The `N` values are assigned to the `N` destinations in registration order.
    AlwaysMerge,
}

/// How option strings are generated for nested fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NestedFieldDisplay {
    /// The field name alone, qualified only as much as needed to avoid collisions.
    #[default]
    Shortest,
    /// The full destination path (ex: `--model.optimizer.lr`).
    FullPath,
    /// Both of the above.
    Both,
}

/// Whether option strings use `_`, `-`, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashesOrUnderscores {
    /// Keep the field names as declared (ex: `--no_cache`).
    #[default]
    Underscore,
    /// Replace underscores with dashes (ex: `--no-cache`).
    Dash,
    /// Offer both spellings.
    Both,
}

/// A dynamically typed value, as parsed from the Cli or assembled during reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The absence of a value (ex: an `Option<T>` that is `None`).
    None,
    /// Marker for an option that was given on the Cli without any value (ex: `--field`).
    /// Only ever found in a raw [`Namespace`](./struct.Namespace.html), never inside an [`Instance`].
    Empty,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string (also used for choices).
    Str(String),
    /// A sequence of values.
    List(Vec<Value>),
    /// A reconstructed record.
    Record(Instance),
    /// A reconstructed subgroup: the chosen variant name and its record.
    Variant(String, Box<Instance>),
}

impl Value {
    /// The short name of this value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Empty => "empty",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Record(_) => "record",
            Value::Variant(..) => "variant",
        }
    }

    /// Borrow the record inside a `Record` or `Variant` value.
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Record(instance) => Some(instance),
            Value::Variant(_, instance) => Some(instance),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Empty => write!(f, ""),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Str(value) => write!(f, "{value}"),
            Value::List(values) => {
                let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Record(instance) => write!(f, "{instance}"),
            Value::Variant(name, instance) => write!(f, "{name}:{instance}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Instance> for Value {
    fn from(value: Instance) -> Self {
        Value::Record(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(inner) => inner.into(),
            None => Value::None,
        }
    }
}

/// A reconstructed record: its type name and the field values in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    type_name: String,
    fields: Vec<(String, Value)>,
}

impl Instance {
    /// Create an empty instance of the named record type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::default(),
        }
    }

    /// Builder style [`Instance::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a field, replacing any previous value while keeping its position.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();

        match self.fields.iter_mut().find(|(n, _)| n == &name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Get a field value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// The record type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The field names, in order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Iterate over the `(name, value)` pairs, in order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// A copy of this instance under another type name (ex: to view a derived record as its base).
    pub fn retyped(&self, type_name: impl Into<String>) -> Instance {
        Instance {
            type_name: type_name.into(),
            fields: self.fields.clone(),
        }
    }

    /// A copy with the values at the dotted field paths replaced (ex: `("optimizer.lr", 0.1)`).
    ///
    /// Paths descend through nested records and the chosen variant of subgroups.
    /// Every path must name an existing field; `self` is left as is.
    pub fn replace<'a>(
        &self,
        changes: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Result<Instance, DecodeError> {
        let mut replaced = self.clone();

        for (path, value) in changes {
            let words: Vec<&str> = path.split('.').collect();
            replaced.replace_at(&words, value, path)?;
        }

        Ok(replaced)
    }

    fn replace_at(&mut self, words: &[&str], value: Value, path: &str) -> Result<(), DecodeError> {
        let missing = || {
            DecodeError::new(format!(
                "Cannot replace '{path}': {} has no such field.",
                self.type_name
            ))
        };
        let (name, rest) = words.split_first().ok_or_else(missing)?;
        let position = self
            .fields
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(missing)?;
        let existing = &mut self.fields[position].1;

        if rest.is_empty() {
            *existing = value;
            return Ok(());
        }

        match existing {
            Value::Record(nested) => nested.replace_at(rest, value, path),
            Value::Variant(_, nested) => nested.replace_at(rest, value, path),
            other => Err(DecodeError::new(format!(
                "Cannot replace '{path}': '{name}' is not a record (found {}).",
                other.kind()
            ))),
        }
    }
}

impl std::fmt::Display for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        write!(f, "{}({})", self.type_name, fields.join(", "))
    }
}
