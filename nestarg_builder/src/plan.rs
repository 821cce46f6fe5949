use std::sync::Arc;

use crate::error::PlanError;
use crate::model::*;
use crate::record::*;

pub(crate) mod flags;
pub(crate) mod resolver;
pub(crate) mod walker;

pub use flags::CandidateFlag;

/// The parser wide configuration read (but never changed) while planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Settings {
    pub(crate) conflict_resolution: ConflictResolution,
    pub(crate) nested_field_display: NestedFieldDisplay,
    pub(crate) dashes_or_underscores: DashesOrUnderscores,
    pub(crate) add_help: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            conflict_resolution: ConflictResolution::default(),
            nested_field_display: NestedFieldDisplay::default(),
            dashes_or_underscores: DashesOrUnderscores::default(),
            add_help: true,
        }
    }
}

/// One registration of a record type at a destination.
#[derive(Debug, Clone, PartialEq)]
pub struct AddedRecord {
    pub(crate) record: RecordRef,
    pub(crate) dest: String,
    pub(crate) prefix: String,
    pub(crate) default: Option<Instance>,
}

impl AddedRecord {
    /// Register `R` at the dotted destination `dest`.
    pub fn new<R: Record>(dest: impl Into<String>) -> Self {
        Self::of(RecordRef::of::<R>(), dest)
    }

    /// Register `record` at the dotted destination `dest`.
    pub fn of(record: RecordRef, dest: impl Into<String>) -> Self {
        Self {
            record,
            dest: dest.into(),
            prefix: String::default(),
            default: None,
        }
    }

    /// Prepend `prefix` to every option string of this registration (ex: `train_` for `--train_lr`).
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Take the defaults from `instance` rather than from the field declarations.
    pub fn default(mut self, instance: Instance) -> Self {
        self.default = Some(instance);
        self
    }

    /// The destination.
    pub fn dest(&self) -> &str {
        &self.dest
    }
}

/// How much of the destination path qualifies a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Qualifier {
    /// The trailing `k` words of the parent destination.
    Words(usize),
    /// The full destination path.
    Explicit,
}

/// A planned record: one registration or nested record field.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlannedRecord {
    pub(crate) record: RecordRef,
    pub(crate) name: String,
    pub(crate) help: Option<String>,
    pub(crate) fields: Arc<Vec<Field>>,
    pub(crate) dest: String,
    pub(crate) parent: Option<usize>,
    pub(crate) field: Option<String>,
    /// The subgroup selector destination and variant name, for the root of a subgroup variant.
    pub(crate) variant: Option<(String, String)>,
    pub(crate) default: Option<Instance>,
    /// An `Optional` record field defaulting to `None`.
    pub(crate) optional_none: bool,
}

/// A planned field: one leaf (or subgroup selector) at one destination.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlannedField {
    pub(crate) record: usize,
    pub(crate) field: Field,
    pub(crate) dest: String,
    pub(crate) parent_dest: String,
    pub(crate) prefix: String,
    pub(crate) default: FieldDefault,
    /// The variant names, when this is a subgroup selector.
    pub(crate) selector: Option<Vec<String>>,
    pub(crate) min_words: usize,
    pub(crate) qualifier: Qualifier,
    pub(crate) destinations: Vec<String>,
}

impl PlannedField {
    pub(crate) fn word_count(&self) -> usize {
        self.parent_dest.split('.').count()
    }

    /// The number of trailing parent words the flat flag uses.
    pub(crate) fn words(&self) -> usize {
        match self.qualifier {
            Qualifier::Words(k) => std::cmp::min(std::cmp::max(k, self.min_words), self.word_count()),
            Qualifier::Explicit => self.word_count(),
        }
    }

    pub(crate) fn is_merged(&self) -> bool {
        self.destinations.len() > 1
    }

    pub(crate) fn nargs(&self) -> Nargs {
        if self.is_merged() {
            return Nargs::Precisely(u8::try_from(self.destinations.len()).unwrap_or(u8::MAX));
        }

        if let Some(nargs) = self.field.overrides.nargs {
            return nargs;
        }

        let field_type = &self.field.field_type;

        if field_type.is_list() {
            Nargs::Any
        } else if self.field.positional {
            if self.default.is_missing() {
                Nargs::Precisely(1)
            } else {
                Nargs::ZeroOrOne
            }
        } else if field_type.is_bool() || field_type.is_optional() {
            Nargs::ZeroOrOne
        } else {
            Nargs::Precisely(1)
        }
    }
}

/// The result of walking the registrations.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Walk {
    pub(crate) records: Vec<PlannedRecord>,
    pub(crate) fields: Vec<PlannedField>,
}

/// Converts a raw token into a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Converter {
    /// `true`/`false` (also `yes`/`no`, `1`/`0`, `on`/`off`).
    Bool,
    /// An `i64`.
    Int,
    /// An `f64`.
    Float,
    /// The token as is.
    Str,
    /// The first converter to succeed.
    Union(Vec<Converter>),
}

impl Converter {
    pub(crate) fn of(field_type: &FieldType) -> Self {
        match field_type {
            FieldType::Bool => Converter::Bool,
            FieldType::Int => Converter::Int,
            FieldType::Float => Converter::Float,
            FieldType::Str | FieldType::Choice(_) => Converter::Str,
            FieldType::Optional(inner) | FieldType::List(inner) => Converter::of(inner),
            FieldType::Union(members) => Converter::Union(members.iter().map(Converter::of).collect()),
            FieldType::Record(_) | FieldType::Subgroup(_) => Converter::Str,
        }
    }

    /// Convert the token.
    pub fn convert(&self, token: &str) -> Result<Value, String> {
        match self {
            Converter::Bool => match token.to_ascii_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" | "on" => Ok(Value::Bool(true)),
                "false" | "f" | "no" | "n" | "0" | "off" => Ok(Value::Bool(false)),
                _ => Err(format!("'{token}' cannot convert to bool.")),
            },
            Converter::Int => token
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| format!("'{token}' cannot convert to int.")),
            Converter::Float => token
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| format!("'{token}' cannot convert to float.")),
            Converter::Str => Ok(Value::Str(token.to_string())),
            Converter::Union(members) => members
                .iter()
                .find_map(|member| member.convert(token).ok())
                .ok_or_else(|| format!("'{token}' cannot convert to any of {members:?}.")),
        }
    }
}

/// The declaration of one flag (or positional argument), ready for the flag-parsing engine.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagSpec {
    pub(crate) record: usize,
    pub(crate) option_strings: Vec<String>,
    pub(crate) negative_option_strings: Vec<String>,
    pub(crate) destinations: Vec<String>,
    pub(crate) nargs: Nargs,
    pub(crate) converter: Converter,
    pub(crate) choices: Vec<String>,
    pub(crate) required: bool,
    pub(crate) help: Option<String>,
    pub(crate) default: Option<Value>,
    pub(crate) positional: bool,
    pub(crate) metavar: Option<String>,
    /// An `Optional` field: given without a value it collapses to `None`.
    pub(crate) optional: bool,
}

impl FlagSpec {
    /// The option strings, shortest first (empty for positional arguments).
    pub fn option_strings(&self) -> &[String] {
        &self.option_strings
    }

    /// The negative option strings of a boolean flag (ex: `--no-cuda`).
    pub fn negative_option_strings(&self) -> &[String] {
        &self.negative_option_strings
    }

    /// The destinations fed by this flag; more than one when merged.
    pub fn destinations(&self) -> &[String] {
        &self.destinations
    }

    /// The arity.
    pub fn nargs(&self) -> Nargs {
        self.nargs
    }

    /// The value converter.
    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    /// The accepted values (empty when unrestricted).
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    /// Whether the flag must be given.
    pub fn required(&self) -> bool {
        self.required
    }

    /// The help message.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// The (display) default.
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Whether this is a positional argument.
    pub fn positional(&self) -> bool {
        self.positional
    }

    /// The name used in usage and error messages.
    pub fn display_name(&self) -> String {
        if let Some(metavar) = &self.metavar {
            if self.positional {
                return metavar.clone();
            }
        }

        match self.option_strings.last() {
            Some(option) => option.clone(),
            None => self
                .destinations
                .first()
                .and_then(|dest| dest.rsplit('.').next())
                .unwrap_or_default()
                .to_string(),
        }
    }

    pub(crate) fn metavar(&self) -> String {
        match &self.metavar {
            Some(metavar) => metavar.clone(),
            None => self
                .display_name()
                .trim_start_matches('-')
                .rsplit('.')
                .next()
                .unwrap_or_default()
                .to_ascii_uppercase()
                .replace('-', "_"),
        }
    }
}

/// A titled group of flags: one per planned record.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentGroup {
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) flags: Vec<FlagSpec>,
}

impl ArgumentGroup {
    /// The title (ex: `Config ['config']`).
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The description (the record help).
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The flags, in field declaration order.
    pub fn flags(&self) -> &[FlagSpec] {
        &self.flags
    }
}

/// The collision free set of flags handed to the flag-parsing engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParserPlan {
    pub(crate) groups: Vec<ArgumentGroup>,
}

impl ParserPlan {
    /// The argument groups, in registration (then nesting) order.
    pub fn groups(&self) -> &[ArgumentGroup] {
        &self.groups
    }

    /// Every flag, in plan order.
    pub fn flags(&self) -> impl Iterator<Item = &FlagSpec> {
        self.groups.iter().flat_map(|g| g.flags.iter())
    }

    /// The flag accepting `option`, if any.
    pub fn find(&self, option: &str) -> Option<&FlagSpec> {
        self.flags().find(|f| {
            f.option_strings.iter().any(|o| o == option)
                || f.negative_option_strings.iter().any(|o| o == option)
        })
    }

    /// Every option string (positive and negative), in plan order.
    pub fn option_strings(&self) -> Vec<&str> {
        self.flags()
            .flat_map(|f| {
                f.option_strings
                    .iter()
                    .chain(f.negative_option_strings.iter())
                    .map(|o| o.as_str())
            })
            .collect()
    }
}

/// Plan the registrations: walk, resolve the conflicts, and group the flags.
pub(crate) fn plan(
    model: &RecordModel,
    added: &[AddedRecord],
    settings: &Settings,
) -> Result<(Walk, ParserPlan), PlanError> {
    let walk = walker::walk(model, added)?;
    let fields = resolver::resolve_conflicts(walk.fields.clone(), &walk.records, settings)?;
    let plan = build_plan(&walk.records, &fields, settings)?;
    Ok((walk, plan))
}

pub(crate) fn build_plan(
    records: &[PlannedRecord],
    fields: &[PlannedField],
    settings: &Settings,
) -> Result<ParserPlan, PlanError> {
    let mut groups: Vec<ArgumentGroup> = records
        .iter()
        .map(|record| ArgumentGroup {
            title: String::default(),
            description: record.help.clone(),
            flags: Vec::default(),
        })
        .collect();
    let mut fed: Vec<Vec<&str>> = records.iter().map(|record| vec![record.dest.as_str()]).collect();

    for field in fields {
        let flag = flag_spec(field, settings)?;

        // A merged flag lives in its first record's group, which then stands for every record it feeds.
        for destination in &field.destinations {
            if let Some((parent, _)) = destination.rsplit_once('.') {
                if !fed[field.record].contains(&parent) {
                    fed[field.record].push(parent);
                }
            }
        }

        groups[field.record].flags.push(flag);
    }

    for ((group, record), dests) in groups.iter_mut().zip(records).zip(&fed) {
        let dests: Vec<String> = dests.iter().map(|dest| format!("'{dest}'")).collect();
        group.title = format!("{} [{}]", record.name, dests.join(", "));
    }

    groups.retain(|group| !group.flags.is_empty());
    Ok(ParserPlan { groups })
}

fn flag_spec(field: &PlannedField, settings: &Settings) -> Result<FlagSpec, PlanError> {
    let candidates = flags::candidate_flags(field, settings)?;
    let (negatives, positives): (Vec<CandidateFlag>, Vec<CandidateFlag>) =
        candidates.into_iter().partition(|c| c.negative);
    let nargs = field.nargs();
    let choices = match (&field.selector, &field.field.overrides.choices) {
        (_, Some(choices)) => choices.clone(),
        (Some(variants), None) => variants.clone(),
        (None, None) => field.field.field_type.choices(),
    };
    let required = field.field.overrides.required.unwrap_or_else(|| {
        field.default.is_missing()
            && !(field.field.positional && matches!(nargs, Nargs::Any | Nargs::ZeroOrOne))
    });
    let default = field.default.materialize().map(|value| match field.field.encoding_fn {
        Some(encoding_fn) => encoding_fn(&value),
        None => value,
    });

    Ok(FlagSpec {
        record: field.record,
        option_strings: positives.into_iter().map(|c| c.option).collect(),
        negative_option_strings: negatives.into_iter().map(|c| c.option).collect(),
        destinations: field.destinations.clone(),
        nargs,
        converter: Converter::of(&field.field.field_type),
        choices,
        required,
        help: field.field.description().map(String::from),
        default,
        positional: field.field.positional,
        metavar: field.field.overrides.metavar.clone(),
        optional: field.field.field_type.is_optional(),
    })
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// A planned field at `dest` for unit tests.
    pub(crate) fn planned(dest: &str, field: Field) -> PlannedField {
        let (parent_dest, _) = dest
            .rsplit_once('.')
            .expect("test destinations must be nested");
        PlannedField {
            record: 0,
            default: field.default.clone(),
            field,
            dest: dest.to_string(),
            parent_dest: parent_dest.to_string(),
            prefix: String::default(),
            selector: None,
            min_words: 0,
            qualifier: Qualifier::Words(0),
            destinations: vec![dest.to_string()],
        }
    }
}
