use std::any::TypeId;

use crate::error::DecodeError;
use crate::model::{Nargs, Value};

/// Converts a raw parsed value into the value stored in the record.
pub type DecodingFn = fn(&Value) -> Result<Value, DecodeError>;

/// Converts a record value into its display form (ex: for defaults in the help message).
pub type EncodingFn = fn(&Value) -> Value;

/// A record declaration: a named, ordered sequence of fields.
///
/// Implemented by `#[derive(Record)]`, or by hand:
/// ```
/// use nestarg_builder::*;
///
/// struct Optimizer;
///
/// impl Record for Optimizer {
///     fn declaration() -> RecordDecl {
///         RecordDecl::new("Optimizer")
///             .field(Field::new("lr", FieldType::Float).default(0.001))
///             .field(Field::new("momentum", FieldType::Optional(Box::new(FieldType::Float))))
///     }
/// }
/// ```
pub trait Record: 'static {
    /// Describe the record.
    fn declaration() -> RecordDecl;
}

/// A copyable handle on a [`Record`] type.
///
/// The declaration is only evaluated when asked for, so records may refer to each other freely.
#[derive(Clone, Copy)]
pub struct RecordRef {
    id: TypeId,
    type_name: &'static str,
    declaration: fn() -> RecordDecl,
}

impl RecordRef {
    /// The handle for `R`.
    pub fn of<R: Record>() -> Self {
        Self {
            id: TypeId::of::<R>(),
            type_name: std::any::type_name::<R>(),
            declaration: R::declaration,
        }
    }

    pub(crate) fn id(&self) -> TypeId {
        self.id
    }

    /// The Rust type name of the record.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Evaluate the declaration.
    pub fn declaration(&self) -> RecordDecl {
        (self.declaration)()
    }
}

impl PartialEq for RecordRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RecordRef {}

impl std::fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecordRef({})", self.type_name)
    }
}

/// The declared type of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// `bool`.
    Bool,
    /// Any integer.
    Int,
    /// Any floating point number.
    Float,
    /// A string (or string-like, such as a path).
    Str,
    /// One of the named choices (ex: a unit enum).
    Choice(Vec<String>),
    /// May be absent.
    Optional(Box<FieldType>),
    /// A sequence.
    List(Box<FieldType>),
    /// The first of the types to accept the value.
    Union(Vec<FieldType>),
    /// A nested record.
    Record(RecordRef),
    /// One of several alternative records, selected on the Cli.
    Subgroup(Subgroup),
}

impl FieldType {
    /// `FieldType::Optional(Box::new(inner))`.
    pub fn optional(inner: FieldType) -> Self {
        FieldType::Optional(Box::new(inner))
    }

    /// `FieldType::List(Box::new(inner))`.
    pub fn list(inner: FieldType) -> Self {
        FieldType::List(Box::new(inner))
    }

    /// `FieldType::Record(RecordRef::of::<R>())`.
    pub fn record<R: Record>() -> Self {
        FieldType::Record(RecordRef::of::<R>())
    }

    /// The nested record, when this is `Record(..)` or `Optional(Record(..))`.
    pub(crate) fn nested_record(&self) -> Option<RecordRef> {
        match self {
            FieldType::Record(record) => Some(*record),
            FieldType::Optional(inner) => match inner.as_ref() {
                FieldType::Record(record) => Some(*record),
                _ => None,
            },
            _ => None,
        }
    }

    /// Whether this is a container of records (ex: `List(Record(..))`).
    pub(crate) fn contains_record_list(&self) -> bool {
        match self {
            FieldType::List(inner) => {
                matches!(inner.as_ref(), FieldType::Record(_) | FieldType::Subgroup(_))
            }
            FieldType::Optional(inner) => inner.contains_record_list(),
            _ => false,
        }
    }

    pub(crate) fn is_optional(&self) -> bool {
        matches!(self, FieldType::Optional(_))
    }

    pub(crate) fn is_list(&self) -> bool {
        match self {
            FieldType::List(_) => true,
            FieldType::Optional(inner) => inner.is_list(),
            _ => false,
        }
    }

    pub(crate) fn is_bool(&self) -> bool {
        matches!(self, FieldType::Bool)
    }

    /// The declared choices, looking through `Optional`/`List`.
    pub(crate) fn choices(&self) -> Vec<String> {
        match self {
            FieldType::Choice(choices) => choices.clone(),
            FieldType::Optional(inner) | FieldType::List(inner) => inner.choices(),
            _ => Vec::default(),
        }
    }
}

/// The alternatives of a [`FieldType::Subgroup`].
#[derive(Debug, Clone, PartialEq)]
pub struct Subgroup {
    variants: Vec<(String, RecordRef)>,
    default: Option<String>,
}

impl Subgroup {
    /// An empty subgroup; add at least one variant.
    pub fn new() -> Self {
        Self {
            variants: Vec::default(),
            default: None,
        }
    }

    /// Add a variant, selected on the Cli by `name`.
    pub fn variant(mut self, name: impl Into<String>, record: RecordRef) -> Self {
        self.variants.push((name.into(), record));
        self
    }

    /// The variant chosen when the selector is not given.
    pub fn with_default(mut self, name: impl Into<String>) -> Self {
        self.default = Some(name.into());
        self
    }

    /// The `(name, record)` variants, in declaration order.
    pub fn variants(&self) -> &[(String, RecordRef)] {
        &self.variants
    }

    /// The default variant name.
    pub fn default_variant(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.variants.iter().map(|(name, _)| name.clone()).collect()
    }
}

impl Default for Subgroup {
    fn default() -> Self {
        Self::new()
    }
}

/// The default of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    /// No default; the field is required.
    Missing,
    /// A fixed default.
    Value(Value),
    /// A default produced on demand (ex: an empty list).
    Factory(fn() -> Value),
}

impl FieldDefault {
    /// The default value, calling the factory if necessary.
    pub fn materialize(&self) -> Option<Value> {
        match self {
            FieldDefault::Missing => None,
            FieldDefault::Value(value) => Some(value.clone()),
            FieldDefault::Factory(factory) => Some(factory()),
        }
    }

    pub(crate) fn is_missing(&self) -> bool {
        matches!(self, FieldDefault::Missing)
    }
}

/// Explicit flag settings, which take precedence over what the planner would infer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagOverrides {
    pub(crate) nargs: Option<Nargs>,
    pub(crate) choices: Option<Vec<String>>,
    pub(crate) required: Option<bool>,
    pub(crate) help: Option<String>,
    pub(crate) metavar: Option<String>,
}

/// A field of a [`RecordDecl`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub(crate) name: String,
    pub(crate) field_type: FieldType,
    pub(crate) default: FieldDefault,
    pub(crate) help: Option<String>,
    pub(crate) aliases: Vec<String>,
    pub(crate) positional: bool,
    pub(crate) cmd: bool,
    pub(crate) init: bool,
    pub(crate) decoding_fn: Option<DecodingFn>,
    pub(crate) encoding_fn: Option<EncodingFn>,
    pub(crate) overrides: FlagOverrides,
}

impl Field {
    /// A Cli visible, constructor initialized field without a default.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            default: FieldDefault::Missing,
            help: None,
            aliases: Vec::default(),
            positional: false,
            cmd: true,
            init: true,
            decoding_fn: None,
            encoding_fn: None,
            overrides: FlagOverrides::default(),
        }
    }

    /// Set a fixed default.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = FieldDefault::Value(value.into());
        self
    }

    /// Set a default factory.
    pub fn default_factory(mut self, factory: fn() -> Value) -> Self {
        self.default = FieldDefault::Factory(factory);
        self
    }

    /// Document the field.
    pub fn help(mut self, description: impl Into<String>) -> Self {
        self.help = Some(description.into());
        self
    }

    /// Add an alias.
    /// The alias may include its own leading dashes (ex: `-lr`); otherwise `--` is used.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Match the field positionally rather than by an option.
    pub fn positional(mut self) -> Self {
        self.positional = true;
        self
    }

    /// Hide the field from the Cli; it is always reconstructed from its default.
    pub fn hidden(mut self) -> Self {
        self.cmd = false;
        self
    }

    /// The field is set after the record is constructed, from its default.
    pub fn no_init(mut self) -> Self {
        self.init = false;
        self
    }

    /// Decode the parsed value with `decoding_fn` rather than the declared type.
    pub fn decoding_fn(mut self, decoding_fn: DecodingFn) -> Self {
        self.decoding_fn = Some(decoding_fn);
        self
    }

    /// Encode the value for display with `encoding_fn`.
    pub fn encoding_fn(mut self, encoding_fn: EncodingFn) -> Self {
        self.encoding_fn = Some(encoding_fn);
        self
    }

    /// Override the inferred arity.
    pub fn nargs(mut self, nargs: Nargs) -> Self {
        self.overrides.nargs = Some(nargs);
        self
    }

    /// Override the inferred choices.
    pub fn choices<S: Into<String>>(mut self, choices: impl IntoIterator<Item = S>) -> Self {
        self.overrides.choices = Some(choices.into_iter().map(|c| c.into()).collect());
        self
    }

    /// Override whether the field is required.
    pub fn required(mut self, required: bool) -> Self {
        self.overrides.required = Some(required);
        self
    }

    /// Override the help message shown for the flag.
    pub fn flag_help(mut self, description: impl Into<String>) -> Self {
        self.overrides.help = Some(description.into());
        self
    }

    /// Override the value placeholder shown in the help message.
    pub fn metavar(mut self, metavar: impl Into<String>) -> Self {
        self.overrides.metavar = Some(metavar.into());
        self
    }

    /// The field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared type.
    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    /// The declared default.
    pub fn field_default(&self) -> &FieldDefault {
        &self.default
    }

    /// The aliases, as declared.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Whether the field is positional.
    pub fn is_positional(&self) -> bool {
        self.positional
    }

    /// Whether the field gets a flag.
    pub fn is_cmd(&self) -> bool {
        self.cmd
    }

    /// Whether the field is constructor initialized.
    pub fn is_init(&self) -> bool {
        self.init
    }

    pub(crate) fn description(&self) -> Option<&str> {
        self.overrides.help.as_deref().or(self.help.as_deref())
    }
}

/// The description of a record type: its name, help, bases and own fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDecl {
    pub(crate) name: String,
    pub(crate) help: Option<String>,
    pub(crate) bases: Vec<RecordRef>,
    pub(crate) fields: Vec<Field>,
}

impl RecordDecl {
    /// An empty declaration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: None,
            bases: Vec::default(),
            fields: Vec::default(),
        }
    }

    /// Document the record; shown as the description of its argument group.
    pub fn help(mut self, description: impl Into<String>) -> Self {
        self.help = Some(description.into());
        self
    }

    /// Inherit the fields of `base`.
    /// Bases are composed in the order they are added, followed by the own fields.
    pub fn extends(mut self, base: RecordRef) -> Self {
        self.bases.push(base);
        self
    }

    /// Add an own field.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// The record name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The record help.
    pub fn description(&self) -> Option<&str> {
        self.help.as_deref()
    }
}
