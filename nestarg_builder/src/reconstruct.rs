use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::error::ReconstructError;
use crate::model::{Instance, Value};
use crate::namespace::Namespace;
use crate::plan::{PlannedField, PlannedRecord, Walk};
use crate::record::{Field, FieldType};

/// The chosen variant per subgroup selector destination: the given value, else the planned default.
pub(crate) fn choices(walk: &Walk, namespace: &Namespace) -> BTreeMap<String, String> {
    let mut choices = BTreeMap::default();

    for field in walk.fields.iter().filter(|f| f.selector.is_some()) {
        let choice = match namespace.get(&field.dest) {
            Some(Value::Str(choice)) => Some(choice.clone()),
            _ => match field.default.materialize() {
                Some(Value::Str(choice)) => Some(choice),
                _ => None,
            },
        };

        if let Some(choice) = choice {
            choices.insert(field.dest.clone(), choice);
        }
    }

    choices
}

/// Whether each planned record is reachable through the chosen subgroup variants.
pub(crate) fn active_records(
    records: &[PlannedRecord],
    choices: &BTreeMap<String, String>,
) -> Vec<bool> {
    let mut active: Vec<bool> = Vec::with_capacity(records.len());

    for record in records {
        // Parents are always planned before their children.
        let parent_active = record.parent.map(|parent| active[parent]).unwrap_or(true);
        let chosen = match &record.variant {
            Some((selector, name)) => choices.get(selector) == Some(name),
            None => true,
        };
        active.push(parent_active && chosen);
    }

    active
}

/// Whether each planned record sits at or under an `Optional` record field defaulting to `None`.
///
/// The leaves of such records are never required: when none of them is given, the field collapses to `None`.
pub(crate) fn optional_records(records: &[PlannedRecord]) -> Vec<bool> {
    let mut optional: Vec<bool> = Vec::with_capacity(records.len());

    for record in records {
        let parent_optional = record.parent.map(|parent| optional[parent]).unwrap_or(false);
        optional.push(record.optional_none || parent_optional);
    }

    optional
}

/// Rebuild the record instances from the flat namespace, deepest records first.
///
/// The returned namespace holds each registration's instance at its destination, the chosen
/// subgroup variants, and any destination nothing claimed.
pub(crate) fn reconstruct(
    walk: &Walk,
    namespace: Namespace,
) -> Result<Namespace, ReconstructError> {
    let choices = choices(walk, &namespace);
    let active = active_records(&walk.records, &choices);
    let mut children: HashMap<(usize, &str), Vec<usize>> = HashMap::default();

    for (index, record) in walk.records.iter().enumerate() {
        if let (Some(parent), Some(field)) = (record.parent, &record.field) {
            children
                .entry((parent, field.as_str()))
                .or_default()
                .push(index);
        }
    }

    let mut reconstructor = Reconstructor {
        walk,
        planned: walk.fields.iter().map(|f| (f.dest.as_str(), f)).collect(),
        children,
        choices,
        built: vec![None; walk.records.len()],
        touched: vec![false; walk.records.len()],
        collapsible: optional_records(&walk.records),
        pending: vec![None; walk.records.len()],
        namespace,
    };

    for field in walk.fields.iter().filter(|f| f.selector.is_some()) {
        reconstructor.namespace.remove(&field.dest);

        if active[field.record] {
            if let Some(choice) = reconstructor.choices.get(&field.dest) {
                reconstructor.namespace.choose(field.dest.clone(), choice.clone());
            }
        }
    }

    for index in (0..walk.records.len()).rev() {
        if active[index] {
            reconstructor.build(index)?;
        } else {
            reconstructor.discard(index);
        }
    }

    let Reconstructor {
        mut namespace,
        mut built,
        ..
    } = reconstructor;

    for (index, record) in walk.records.iter().enumerate() {
        if record.parent.is_none() {
            if let Some(value) = built[index].take() {
                namespace.set(record.dest.clone(), value);
            }
        }
    }

    Ok(namespace)
}

struct Reconstructor<'w> {
    walk: &'w Walk,
    planned: HashMap<&'w str, &'w PlannedField>,
    children: HashMap<(usize, &'w str), Vec<usize>>,
    choices: BTreeMap<String, String>,
    built: Vec<Option<Value>>,
    /// Whether any destination in the record (or below) came from the namespace.
    touched: Vec<bool>,
    collapsible: Vec<bool>,
    /// The first failure in a collapsible record, raised only if its optional ancestor is given.
    pending: Vec<Option<ReconstructError>>,
    namespace: Namespace,
}

impl<'w> Reconstructor<'w> {
    fn discard(&mut self, index: usize) {
        let walk = self.walk;
        let record = &walk.records[index];

        for field in record.fields.iter() {
            let dest = format!("{}.{}", record.dest, field.name);

            if self.namespace.remove(&dest).is_some() {
                debug!("Discarding '{dest}' of an unchosen variant.");
            }
        }
    }

    fn build(&mut self, index: usize) -> Result<(), ReconstructError> {
        let walk = self.walk;
        let record = &walk.records[index];
        let mut instance = Instance::new(record.name.clone());
        let mut deferred: Vec<&Field> = Vec::default();

        for field in record.fields.iter() {
            if !field.init {
                deferred.push(field);
                continue;
            }

            let dest = format!("{}.{}", record.dest, field.name);
            let value = if field.cmd {
                self.planned_value(index, field, &dest)
            } else {
                unplanned_value(record, field, &dest)
            };

            if let Some(value) = self.hold(index, value)? {
                instance.set(field.name.clone(), value);
            }
        }

        // Non-constructor fields are set afterwards, from their defaults.
        for field in deferred {
            let dest = format!("{}.{}", record.dest, field.name);
            let value = unplanned_value(record, field, &dest);

            if let Some(value) = self.hold(index, value)? {
                instance.set(field.name.clone(), value);
            }
        }

        let pending = self.pending[index].take();
        let value = if record.optional_none && !self.touched[index] {
            Value::None
        } else {
            match (pending, record.parent) {
                (Some(error), Some(parent)) if !record.optional_none => {
                    self.pending[parent].get_or_insert(error);
                }
                (Some(error), _) => return Err(error),
                (None, _) => {}
            }

            Value::Record(instance)
        };
        self.built[index] = Some(value);

        if let Some(parent) = record.parent {
            self.touched[parent] |= self.touched[index];
        }

        Ok(())
    }

    /// Pass `value` through, unless it failed in a collapsible record: then keep the failure for later.
    fn hold(
        &mut self,
        index: usize,
        value: Result<Value, ReconstructError>,
    ) -> Result<Option<Value>, ReconstructError> {
        match value {
            Ok(value) => Ok(Some(value)),
            Err(error) if self.collapsible[index] => {
                self.pending[index].get_or_insert(error);
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    fn planned_value(
        &mut self,
        index: usize,
        field: &'w Field,
        dest: &str,
    ) -> Result<Value, ReconstructError> {
        let children = self
            .children
            .get(&(index, field.name.as_str()))
            .cloned()
            .unwrap_or_default();

        match &field.field_type {
            FieldType::Subgroup(_) => {
                let choice = self
                    .choices
                    .get(dest)
                    .cloned()
                    .ok_or_else(|| error(dest, &Value::None, "no variant was chosen."))?;
                let child = children
                    .into_iter()
                    .find(|child| {
                        self.walk.records[*child]
                            .variant
                            .as_ref()
                            .map(|(_, name)| name == &choice)
                            .unwrap_or(false)
                    })
                    .ok_or_else(|| {
                        error(
                            dest,
                            &Value::Str(choice.clone()),
                            "is not one of the variants.",
                        )
                    })?;

                match self.built[child].take() {
                    Some(Value::Record(instance)) => Ok(Value::Variant(choice, Box::new(instance))),
                    _ => unreachable!("internal error - the chosen variant must be built"),
                }
            }
            field_type if field_type.nested_record().is_some() => match children.first() {
                Some(child) => Ok(self.built[*child].take().unwrap_or(Value::None)),
                None => unreachable!("internal error - a nested record must be planned"),
            },
            _ => match self.namespace.remove(dest) {
                Some(value) => {
                    self.touched[index] = true;
                    decode(field, dest, value)
                }
                None => match self
                    .planned
                    .get(dest)
                    .and_then(|planned| planned.default.materialize())
                {
                    Some(value) => coerce(&field.field_type, value.clone())
                        .map_err(|message| error(dest, &value, &message)),
                    None => Err(error(dest, &Value::None, "is required but was not given.")),
                },
            },
        }
    }
}

/// The value of a field that cannot be given on the command line: its default.
fn unplanned_value(
    record: &PlannedRecord,
    field: &Field,
    dest: &str,
) -> Result<Value, ReconstructError> {
    let inherited = record
        .default
        .as_ref()
        .and_then(|instance| instance.get(&field.name))
        .cloned();

    match inherited.or_else(|| field.default.materialize()) {
        Some(value) => {
            coerce(&field.field_type, value.clone()).map_err(|message| error(dest, &value, &message))
        }
        None => Err(error(
            dest,
            &Value::None,
            "has no default and cannot be given on the command line.",
        )),
    }
}

fn decode(field: &Field, dest: &str, value: Value) -> Result<Value, ReconstructError> {
    if value == Value::Empty {
        return if field.field_type.is_optional() {
            Ok(Value::None)
        } else {
            Err(error(dest, &value, "expects a value."))
        };
    }

    match field.decoding_fn {
        Some(decoding_fn) => {
            decoding_fn(&value).map_err(|decode_error| error(dest, &value, decode_error.message()))
        }
        None => coerce(&field.field_type, value.clone()).map_err(|message| error(dest, &value, &message)),
    }
}

/// Convert `value` to the declared type, where the conversion is lossless.
fn coerce(field_type: &FieldType, value: Value) -> Result<Value, String> {
    match (field_type, value) {
        (FieldType::Optional(_), Value::None | Value::Empty) => Ok(Value::None),
        (FieldType::Optional(inner), value) => coerce(inner, value),
        (FieldType::Bool, Value::Bool(value)) => Ok(Value::Bool(value)),
        (FieldType::Int, Value::Int(value)) => Ok(Value::Int(value)),
        (FieldType::Float, Value::Int(value)) => Ok(Value::Float(value as f64)),
        (FieldType::Float, Value::Float(value)) => Ok(Value::Float(value)),
        (FieldType::Str, Value::Str(value)) => Ok(Value::Str(value)),
        (FieldType::Choice(choices), Value::Str(value)) => {
            if choices.contains(&value) {
                Ok(Value::Str(value))
            } else {
                Err(format!("'{value}' is not one of {choices:?}."))
            }
        }
        (FieldType::List(inner), Value::List(values)) => values
            .into_iter()
            .map(|value| coerce(inner, value))
            .collect::<Result<Vec<Value>, String>>()
            .map(Value::List),
        (FieldType::List(inner), value) => Ok(Value::List(vec![coerce(inner, value)?])),
        (FieldType::Union(members), value) => members
            .iter()
            .find_map(|member| coerce(member, value.clone()).ok())
            .ok_or_else(|| format!("a {} matches none of the union members.", value.kind())),
        (FieldType::Record(_), Value::Record(instance)) => Ok(Value::Record(instance)),
        (FieldType::Subgroup(_), Value::Variant(name, instance)) => Ok(Value::Variant(name, instance)),
        (field_type, value) => Err(format!(
            "expected {}, found {}.",
            describe(field_type),
            value.kind()
        )),
    }
}

fn describe(field_type: &FieldType) -> &'static str {
    match field_type {
        FieldType::Bool => "bool",
        FieldType::Int => "int",
        FieldType::Float => "float",
        FieldType::Str => "str",
        FieldType::Choice(_) => "choice",
        FieldType::Optional(_) => "optional",
        FieldType::List(_) => "list",
        FieldType::Union(_) => "union",
        FieldType::Record(_) => "record",
        FieldType::Subgroup(_) => "subgroup",
    }
}

fn error(dest: &str, value: &Value, message: &str) -> ReconstructError {
    ReconstructError {
        dest: dest.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}
