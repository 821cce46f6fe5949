use std::collections::HashSet;

use tracing::debug;

use crate::error::PlanError;
use crate::model::{Instance, Value};
use crate::plan::{AddedRecord, PlannedField, PlannedRecord, Qualifier, Walk};
use crate::record::{FieldDefault, FieldType, RecordModel, RecordRef};

struct Frame {
    record: RecordRef,
    dest: String,
    parent: Option<usize>,
    field: Option<String>,
    variant: Option<(String, String)>,
    prefix: String,
    default: Option<Instance>,
    optional_none: bool,
    min_words: usize,
}

/// Expand the registrations into planned records and fields, depth first in declaration order.
pub(crate) fn walk(model: &RecordModel, added: &[AddedRecord]) -> Result<Walk, PlanError> {
    let mut walk = Walk::default();

    for added_record in added {
        let dest = &added_record.dest;

        if dest.is_empty()
            || dest.split('.').any(|word| word.is_empty())
            || dest.chars().any(char::is_whitespace)
        {
            return Err(PlanError::InvalidDestination(dest.clone()));
        }

        // Fail fast on recursive declarations.
        model.nested_record_types(added_record.record)?;
        walk_record(
            model,
            &mut walk,
            Frame {
                record: added_record.record,
                dest: dest.clone(),
                parent: None,
                field: None,
                variant: None,
                prefix: added_record.prefix.clone(),
                default: added_record.default.clone(),
                optional_none: false,
                min_words: 0,
            },
        )?;
    }

    let mut destinations = HashSet::new();

    for dest in walk
        .records
        .iter()
        .map(|r| &r.dest)
        .chain(walk.fields.iter().map(|f| &f.dest))
    {
        if !destinations.insert(dest) {
            return Err(PlanError::DuplicateDestination(dest.clone()));
        }
    }

    debug!(
        "Walked {} records into {} fields.",
        walk.records.len(),
        walk.fields.len()
    );
    Ok(walk)
}

fn walk_record(model: &RecordModel, walk: &mut Walk, frame: Frame) -> Result<(), PlanError> {
    let fields = model.fields_of(frame.record)?;
    let header = model.header_of(frame.record)?;
    let index = walk.records.len();
    walk.records.push(PlannedRecord {
        record: frame.record,
        name: header.name,
        help: header.help,
        fields: fields.clone(),
        dest: frame.dest.clone(),
        parent: frame.parent,
        field: frame.field,
        variant: frame.variant,
        default: frame.default.clone(),
        optional_none: frame.optional_none,
    });
    let nested_min_words = if frame.min_words > 0 {
        frame.min_words + 1
    } else {
        0
    };

    for field in fields.iter() {
        if !field.cmd || !field.init {
            continue;
        }

        let dest = format!("{}.{}", frame.dest, field.name);

        if field.field_type.contains_record_list() {
            return Err(PlanError::UnsupportedNesting {
                dest,
                reason: "containers of records cannot be parsed from flags.".to_string(),
            });
        }

        let inherited = frame
            .default
            .as_ref()
            .and_then(|instance| instance.get(&field.name))
            .cloned();

        match &field.field_type {
            FieldType::Subgroup(subgroup) => {
                let (choice, choice_default) = match inherited {
                    Some(Value::Variant(name, instance)) => (Some(name), Some(*instance)),
                    _ => (subgroup.default_variant().map(String::from), None),
                };
                walk.fields.push(PlannedField {
                    record: index,
                    field: field.clone(),
                    dest: dest.clone(),
                    parent_dest: frame.dest.clone(),
                    prefix: frame.prefix.clone(),
                    default: match &choice {
                        Some(choice) => FieldDefault::Value(Value::Str(choice.clone())),
                        None => FieldDefault::Missing,
                    },
                    selector: Some(subgroup.names()),
                    min_words: frame.min_words,
                    qualifier: Qualifier::Words(0),
                    destinations: vec![dest.clone()],
                });

                for (name, variant) in subgroup.variants() {
                    let default = if choice.as_ref() == Some(name) {
                        choice_default.clone()
                    } else {
                        None
                    };
                    walk_record(
                        model,
                        walk,
                        Frame {
                            record: *variant,
                            dest: format!("{dest}.{name}"),
                            parent: Some(index),
                            field: Some(field.name.clone()),
                            variant: Some((dest.clone(), name.clone())),
                            prefix: frame.prefix.clone(),
                            default,
                            optional_none: false,
                            min_words: 1,
                        },
                    )?;
                }
            }
            field_type => match field_type.nested_record() {
                Some(child) => {
                    let child_default = match inherited {
                        Some(value) => Some(value),
                        None => field.default.materialize(),
                    };
                    let (default, optional_none) = match child_default {
                        Some(Value::Record(instance)) => (Some(instance), false),
                        Some(Value::None) => (None, field_type.is_optional()),
                        _ => (None, false),
                    };
                    walk_record(
                        model,
                        walk,
                        Frame {
                            record: child,
                            dest,
                            parent: Some(index),
                            field: Some(field.name.clone()),
                            variant: None,
                            prefix: frame.prefix.clone(),
                            default,
                            optional_none,
                            min_words: nested_min_words,
                        },
                    )?;
                }
                None => {
                    walk.fields.push(PlannedField {
                        record: index,
                        field: field.clone(),
                        dest: dest.clone(),
                        parent_dest: frame.dest.clone(),
                        prefix: frame.prefix.clone(),
                        default: match inherited {
                            Some(value) => FieldDefault::Value(value),
                            None => field.default.clone(),
                        },
                        selector: None,
                        min_words: frame.min_words,
                        qualifier: Qualifier::Words(0),
                        destinations: vec![dest],
                    });
                }
            },
        }
    }

    Ok(())
}
