use std::path::PathBuf;

use crate::error::DecodeError;
use crate::model::{Instance, Value};
use crate::record::FieldType;

/// The bridge between a Rust type and the dynamic [`Value`] tree.
///
/// Implemented here for the primitives, `String`, `PathBuf`, `Option<T>` and `Vec<T>`.
/// Implemented by the derive macros for records, choice enums and subgroup enums.
pub trait FieldValue: Sized {
    /// The declared type of a field holding `Self`.
    fn field_type() -> FieldType;

    /// Convert a reconstructed value into `Self`.
    fn from_value(value: &Value) -> Result<Self, DecodeError>;

    /// Convert `Self` into a value (ex: to use as a default).
    fn to_value(&self) -> Value;
}

fn mismatch(expected: &str, value: &Value) -> DecodeError {
    DecodeError::new(format!(
        "expected {expected}, found {kind} '{value}'.",
        kind = value.kind()
    ))
}

impl FieldValue for bool {
    fn field_type() -> FieldType {
        FieldType::Bool
    }

    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(mismatch("bool", other)),
        }
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

macro_rules! impl_int {
    ($($t:ty),*) => {
        $(
            impl FieldValue for $t {
                fn field_type() -> FieldType {
                    FieldType::Int
                }

                fn from_value(value: &Value) -> Result<Self, DecodeError> {
                    match value {
                        Value::Int(i) => <$t>::try_from(*i).map_err(|_| {
                            DecodeError::new(format!(
                                "{i} is out of range for {}.",
                                stringify!($t)
                            ))
                        }),
                        other => Err(mismatch("int", other)),
                    }
                }

                fn to_value(&self) -> Value {
                    Value::Int(i64::try_from(*self).unwrap_or(i64::MAX))
                }
            }
        )*
    };
}

impl_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FieldValue for f64 {
    fn field_type() -> FieldType {
        FieldType::Float
    }

    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            other => Err(mismatch("float", other)),
        }
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl FieldValue for f32 {
    fn field_type() -> FieldType {
        FieldType::Float
    }

    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        f64::from_value(value).map(|f| f as f32)
    }

    fn to_value(&self) -> Value {
        Value::Float(*self as f64)
    }
}

impl FieldValue for String {
    fn field_type() -> FieldType {
        FieldType::Str
    }

    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Str(s) => Ok(s.clone()),
            other => Err(mismatch("str", other)),
        }
    }

    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }
}

impl FieldValue for PathBuf {
    fn field_type() -> FieldType {
        FieldType::Str
    }

    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        String::from_value(value).map(PathBuf::from)
    }

    fn to_value(&self) -> Value {
        Value::Str(self.display().to_string())
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn field_type() -> FieldType {
        FieldType::optional(T::field_type())
    }

    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::None | Value::Empty => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::None,
        }
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn field_type() -> FieldType {
        FieldType::list(T::field_type())
    }

    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::List(values) => values.iter().map(T::from_value).collect(),
            other => Err(mismatch("list", other)),
        }
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(|v| v.to_value()).collect())
    }
}

impl Value {
    /// Borrow the record instance of type `type_name`.
    pub fn record_instance(&self, type_name: &str) -> Result<&Instance, DecodeError> {
        match self {
            Value::Record(instance) if instance.type_name() == type_name => Ok(instance),
            other => Err(mismatch(type_name, other)),
        }
    }
}

impl Instance {
    /// Convert the field `name` into `T`.
    /// An absent field converts from [`Value::None`], so that `Option<T>` fields may be left out.
    pub fn extract<T: FieldValue>(&self, name: &str) -> Result<T, DecodeError> {
        match self.get(name) {
            Some(value) => T::from_value(value),
            None => T::from_value(&Value::None).map_err(|_| {
                DecodeError::new(format!(
                    "{} is missing the field '{name}'.",
                    self.type_name()
                ))
            }),
        }
    }
}
