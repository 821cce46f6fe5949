use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::PlanError;
use crate::record::{Field, FieldType, RecordRef};

/// The memoized view of record declarations.
///
/// Entries are keyed by the record type, populated on first use and never invalidated.
/// Share one model between parsers with [`ArgumentParser::with_model`](./struct.ArgumentParser.html#method.with_model).
#[derive(Debug, Default)]
pub struct RecordModel {
    fields: RwLock<HashMap<TypeId, Arc<Vec<Field>>>>,
    headers: RwLock<HashMap<TypeId, RecordHeader>>,
    nested: RwLock<HashMap<TypeId, Arc<Vec<(String, RecordRef)>>>>,
}

/// The name and help of a record declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordHeader {
    pub(crate) name: String,
    pub(crate) help: Option<String>,
}

impl RecordModel {
    /// An empty model.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn header_of(&self, record: RecordRef) -> Result<RecordHeader, PlanError> {
        self.fields_of(record)?;

        match read(&self.headers).get(&record.id()) {
            Some(header) => Ok(header.clone()),
            None => unreachable!("internal error - the header is populated with the fields"),
        }
    }

    /// The fields of `record`, in declaration order, bases first.
    ///
    /// A field redeclared by a derived record replaces the base field in the base's position.
    pub fn fields_of(&self, record: RecordRef) -> Result<Arc<Vec<Field>>, PlanError> {
        self.fields_with(record, &mut Vec::default())
    }

    /// Every record nested below `record` (at any depth), keyed by its relative dotted path.
    ///
    /// Subgroup variants are keyed `field.variant`.
    pub fn nested_record_types(
        &self,
        record: RecordRef,
    ) -> Result<Arc<Vec<(String, RecordRef)>>, PlanError> {
        if let Some(nested) = read(&self.nested).get(&record.id()) {
            return Ok(nested.clone());
        }

        let mut nested = Vec::default();
        self.collect_nested(record, "", &mut vec![record], &mut nested)?;
        let nested = Arc::new(nested);
        Ok(write(&self.nested)
            .entry(record.id())
            .or_insert(nested)
            .clone())
    }

    fn fields_with(
        &self,
        record: RecordRef,
        stack: &mut Vec<RecordRef>,
    ) -> Result<Arc<Vec<Field>>, PlanError> {
        if let Some(fields) = read(&self.fields).get(&record.id()) {
            return Ok(fields.clone());
        }

        if stack.contains(&record) {
            return Err(PlanError::RecursiveType(cycle(stack, record)));
        }

        let declaration = record.declaration();
        debug!("Introspecting record '{}'.", declaration.name);
        stack.push(record);
        let mut fields: Vec<Field> = Vec::default();

        for base in &declaration.bases {
            for field in self.fields_with(*base, stack)?.iter() {
                compose(&mut fields, field.clone());
            }
        }

        stack.pop();
        let mut own_names = HashSet::new();

        for field in &declaration.fields {
            if field.name.is_empty()
                || field.name.contains('.')
                || field.name.chars().any(char::is_whitespace)
            {
                return Err(PlanError::UnsupportedType {
                    record: declaration.name.clone(),
                    reason: format!("invalid field name '{}'.", field.name),
                });
            }

            if !own_names.insert(field.name.clone()) {
                return Err(PlanError::UnsupportedType {
                    record: declaration.name.clone(),
                    reason: format!("duplicate field '{}'.", field.name),
                });
            }

            validate(&field.field_type, false).map_err(|reason| PlanError::UnsupportedType {
                record: declaration.name.clone(),
                reason: format!("field '{}' {reason}", field.name),
            })?;
            compose(&mut fields, field.clone());
        }

        write(&self.headers)
            .entry(record.id())
            .or_insert(RecordHeader {
                name: declaration.name.clone(),
                help: declaration.help.clone(),
            });
        let fields = Arc::new(fields);
        Ok(write(&self.fields)
            .entry(record.id())
            .or_insert(fields)
            .clone())
    }

    fn collect_nested(
        &self,
        record: RecordRef,
        path: &str,
        stack: &mut Vec<RecordRef>,
        nested: &mut Vec<(String, RecordRef)>,
    ) -> Result<(), PlanError> {
        for field in self.fields_of(record)?.iter() {
            let children: Vec<(String, RecordRef)> = match &field.field_type {
                FieldType::Subgroup(subgroup) => subgroup
                    .variants()
                    .iter()
                    .map(|(name, variant)| (format!("{}.{name}", field.name), *variant))
                    .collect(),
                field_type => match field_type.nested_record() {
                    Some(child) => vec![(field.name.clone(), child)],
                    None => Vec::default(),
                },
            };

            for (relative, child) in children {
                if stack.contains(&child) {
                    return Err(PlanError::RecursiveType(cycle(stack, child)));
                }

                let child_path = if path.is_empty() {
                    relative
                } else {
                    format!("{path}.{relative}")
                };
                nested.push((child_path.clone(), child));
                stack.push(child);
                self.collect_nested(child, &child_path, stack, nested)?;
                stack.pop();
            }
        }

        Ok(())
    }
}

fn compose(fields: &mut Vec<Field>, field: Field) {
    match fields.iter_mut().find(|f| f.name == field.name) {
        Some(existing) => *existing = field,
        None => fields.push(field),
    }
}

fn validate(field_type: &FieldType, contained: bool) -> Result<(), String> {
    match field_type {
        FieldType::Bool | FieldType::Int | FieldType::Float | FieldType::Str => Ok(()),
        FieldType::Choice(choices) => {
            if choices.is_empty() {
                Err("has no choices.".to_string())
            } else {
                Ok(())
            }
        }
        FieldType::Optional(inner) => match inner.as_ref() {
            FieldType::Optional(_) => Err("nests Optional in Optional.".to_string()),
            FieldType::Subgroup(_) => Err("cannot make a subgroup Optional.".to_string()),
            inner => validate(inner, contained),
        },
        FieldType::List(inner) => match inner.as_ref() {
            FieldType::List(_) => Err("nests List in List.".to_string()),
            FieldType::Optional(_) => Err("nests Optional in List.".to_string()),
            // Reported as an unsupported nesting when planned.
            FieldType::Record(_) => Ok(()),
            inner => validate(inner, true),
        },
        FieldType::Union(members) => {
            if members.is_empty() {
                return Err("has an empty Union.".to_string());
            }

            for member in members {
                match member {
                    FieldType::Bool
                    | FieldType::Int
                    | FieldType::Float
                    | FieldType::Str
                    | FieldType::Choice(_) => validate(member, true)?,
                    _ => return Err("may only Union scalar types.".to_string()),
                }
            }

            Ok(())
        }
        FieldType::Record(_) => Ok(()),
        FieldType::Subgroup(subgroup) => {
            if contained {
                return Err("cannot contain a subgroup.".to_string());
            }

            if subgroup.variants().is_empty() {
                return Err("has an empty subgroup.".to_string());
            }

            let names = subgroup.names();

            if names.iter().collect::<HashSet<_>>().len() != names.len() {
                return Err("has duplicate subgroup variants.".to_string());
            }

            match subgroup.default_variant() {
                Some(default) if !names.iter().any(|n| n == default) => Err(format!(
                    "defaults to the unknown subgroup variant '{default}'."
                )),
                _ => Ok(()),
            }
        }
    }
}

fn cycle(stack: &[RecordRef], repeat: RecordRef) -> String {
    stack
        .iter()
        .chain(std::iter::once(&repeat))
        .map(|r| r.type_name().rsplit("::").next().unwrap_or(r.type_name()))
        .collect::<Vec<_>>()
        .join(" -> ")
}

// Population is idempotent, so a poisoned lock still holds usable entries.
fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
