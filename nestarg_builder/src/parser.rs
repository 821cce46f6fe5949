use std::collections::{BTreeMap, HashSet};
use std::env;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::engine::{Action, Engine};
use crate::error::{DecodeError, Error, ParseError};
use crate::model::*;
use crate::namespace::Namespace;
use crate::plan::{self, AddedRecord, ParserPlan, Settings};
use crate::reconstruct;
use crate::record::{FieldType, FieldValue, Record, RecordModel, RecordRef, Subgroup};

mod interface;
mod printer;

use self::interface::{ConsoleInterface, UserInterface};
use self::printer::{ErrorContext, Printer};

/// The command line parser for a set of record registrations.
///
/// Configure it with the builder methods, register records with [`add_record`](ArgumentParser::add_record),
/// then parse with [`parse_args`](ArgumentParser::parse_args) (or [`parse`](ArgumentParser::parse) for the Cli).
/// ```
/// use nestarg_builder::*;
///
/// struct Optimizer;
///
/// impl Record for Optimizer {
///     fn declaration() -> RecordDecl {
///         RecordDecl::new("Optimizer").field(Field::new("lr", FieldType::Float).default(0.001))
///     }
/// }
///
/// let parser = ArgumentParser::new("train").add_record::<Optimizer>("optimizer");
/// let outcome = parser.parse_args(&["--lr", "0.1"]).unwrap();
/// let optimizer = outcome.namespace().instance("optimizer").unwrap();
/// assert_eq!(optimizer.get("lr"), Some(&Value::Float(0.1)));
/// ```
#[derive(Debug)]
pub struct ArgumentParser {
    program: String,
    about: Option<String>,
    settings: Settings,
    model: Arc<RecordModel>,
    added: Vec<AddedRecord>,
}

impl ArgumentParser {
    /// Create a parser for `program` (used in the usage line).
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            about: None,
            settings: Settings::default(),
            model: Arc::new(RecordModel::new()),
            added: Vec::default(),
        }
    }

    /// Describe the program in the help message.
    pub fn about(mut self, description: impl Into<String>) -> Self {
        self.about = Some(description.into());
        self
    }

    /// Set how colliding option strings are handled (default: [`ConflictResolution::Auto`]).
    pub fn conflict_resolution(mut self, conflict_resolution: ConflictResolution) -> Self {
        self.settings.conflict_resolution = conflict_resolution;
        self
    }

    /// Set how the option strings of nested fields are spelled (default: [`NestedFieldDisplay::Shortest`]).
    pub fn nested_field_display(mut self, nested_field_display: NestedFieldDisplay) -> Self {
        self.settings.nested_field_display = nested_field_display;
        self
    }

    /// Set whether option strings use underscores, dashes or both (default: [`DashesOrUnderscores::Underscore`]).
    pub fn dashes_or_underscores(mut self, dashes_or_underscores: DashesOrUnderscores) -> Self {
        self.settings.dashes_or_underscores = dashes_or_underscores;
        self
    }

    /// Whether to reserve `-h/--help` (default: `true`).
    pub fn add_help(mut self, add_help: bool) -> Self {
        self.settings.add_help = add_help;
        self
    }

    /// Share the memoized record declarations with other parsers.
    pub fn with_model(mut self, model: Arc<RecordModel>) -> Self {
        self.model = model;
        self
    }

    /// Register `R` at the dotted destination `dest`.
    pub fn add_record<R: Record>(self, dest: impl Into<String>) -> Self {
        self.add_record_with(AddedRecord::new::<R>(dest))
    }

    /// Register a record with its prefix and default instance.
    ///
    /// Duplicate destinations are reported when planning.
    pub fn add_record_with(mut self, added: AddedRecord) -> Self {
        self.added.push(added);
        self
    }

    /// Plan the flags of the registrations, without parsing anything.
    pub fn plan(&self) -> Result<ParserPlan, Error> {
        let (_, parser_plan) = plan::plan(&self.model, &self.added, &self.settings)?;
        Ok(parser_plan)
    }

    /// The help message.
    pub fn help(&self) -> Result<String, Error> {
        let parser_plan = self.plan()?;
        Ok(self.printer(&parser_plan).render(&self.program))
    }

    /// Parse the tokens, keeping the ones nothing accepts.
    ///
    /// The values in `namespace` stand in for flags that are not given.
    /// The returned namespace holds each registration's [`Instance`] at its destination,
    /// and the chosen subgroup variants in [`Namespace::subgroups`].
    pub fn parse_known_args(
        &self,
        tokens: &[&str],
        namespace: Namespace,
    ) -> Result<(Namespace, Vec<String>), Error> {
        self.run(tokens, namespace).map_err(|(_, error)| error)
    }

    /// Parse the tokens; any token nothing accepts is an error.
    pub fn parse_args(&self, tokens: &[&str]) -> Result<ParseOutcome, Error> {
        self.run_args(tokens).map_err(|(_, error)| error)
    }

    /// Parse a command line string, split into tokens with shell-like quoting (ex: `--name 'a b'`).
    pub fn parse_str(&self, command_line: &str) -> Result<ParseOutcome, Error> {
        let tokens = shlex::split(command_line).ok_or_else(|| {
            ParseError(format!("Cannot split '{command_line}' into tokens: unbalanced quotes."))
        })?;
        let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();
        self.parse_args(&tokens)
    }

    /// A copy of `instance` (registered at `dest`) with some subgroups switched to other variants.
    ///
    /// Each selection pairs the dotted path of a subgroup field, relative to `dest`, with a variant name.
    /// The new variant is built from its declared defaults, as if parsed from no tokens.
    pub fn replace_subgroups<'a>(
        &self,
        dest: &str,
        instance: &Instance,
        selections: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Instance, Error> {
        let added = self
            .added
            .iter()
            .find(|added| added.dest() == dest)
            .ok_or_else(|| DecodeError::new(format!("No record is registered at '{dest}'.")))?;
        let mut replaced = instance.clone();

        for (path, name) in selections {
            let words: Vec<&str> = path.split('.').collect();
            let variant = self.variant_record(added.record, &replaced, &words, path, name)?;
            let value = Value::Variant(name.to_string(), Box::new(self.default_instance(variant)?));
            debug!("Replacing the subgroup '{dest}.{path}' with '{name}'.");
            replaced = replaced.replace([(path, value)])?;
        }

        Ok(replaced)
    }

    /// The record of variant `name` of the subgroup at `words`, descending from `record`.
    fn variant_record(
        &self,
        record: RecordRef,
        instance: &Instance,
        words: &[&str],
        path: &str,
        name: &str,
    ) -> Result<RecordRef, Error> {
        let invalid = |reason: String| {
            Error::from(DecodeError::new(format!(
                "Cannot replace the subgroup '{path}': {reason}"
            )))
        };
        let (word, rest) = words
            .split_first()
            .ok_or_else(|| invalid("the path is empty.".to_string()))?;
        let fields = self.model.fields_of(record)?;
        let field = fields
            .iter()
            .find(|field| field.name == *word)
            .ok_or_else(|| invalid(format!("{} has no field '{word}'.", instance.type_name())))?;

        match (&field.field_type, instance.get(word)) {
            (FieldType::Subgroup(subgroup), _) if rest.is_empty() => variant(subgroup, name)
                .ok_or_else(|| {
                    invalid(format!(
                        "'{name}' is not one of the variants {:?}.",
                        subgroup.names()
                    ))
                }),
            (FieldType::Subgroup(subgroup), Some(Value::Variant(chosen, nested))) => {
                match variant(subgroup, chosen) {
                    Some(next) => self.variant_record(next, nested, rest, path, name),
                    None => Err(invalid(format!("'{word}' holds the unknown variant '{chosen}'."))),
                }
            }
            (field_type, Some(Value::Record(nested))) if !rest.is_empty() => {
                match field_type.nested_record() {
                    Some(next) => self.variant_record(next, nested, rest, path, name),
                    None => Err(invalid(format!("'{word}' is not a record."))),
                }
            }
            (_, _) if rest.is_empty() => Err(invalid(format!("'{word}' is not a subgroup."))),
            (_, _) => Err(invalid(format!("'{word}' is not a record."))),
        }
    }

    /// The instance of `record` built from its declared defaults.
    fn default_instance(&self, record: RecordRef) -> Result<Instance, Error> {
        const DEST: &str = "variant";
        let walk = plan::walker::walk(&self.model, &[AddedRecord::of(record, DEST)])?;
        let namespace = reconstruct::reconstruct(&walk, Namespace::default())?;

        match namespace.instance(DEST) {
            Some(instance) => Ok(instance.clone()),
            None => Err(Error::from(DecodeError::new(format!(
                "{record:?} has no default instance."
            )))),
        }
    }

    /// Parse the tokens and convert the record at `dest` into `T`.
    pub fn parse_record<T: FieldValue>(&self, tokens: &[&str], dest: &str) -> Result<T, Error> {
        let outcome = self.parse_args(tokens)?;
        Ok(outcome.extract(dest)?)
    }

    /// Run the parser against the input tokens.
    ///
    /// Errors are printed (with the offending token highlighted) and returned as `Err(1)`.
    /// The help switch (`-h` or `--help`) prints the help message and returns `Err(0)`.
    pub fn parse_tokens(&self, tokens: &[&str]) -> Result<ParseOutcome, i32> {
        self.invoke(tokens, &ConsoleInterface::default())
    }

    /// Run the parser against the Cli [`env::args`].
    ///
    /// Errors are printed and exit with code `1` (via `std::process::exit`).
    /// The help switch (`-h` or `--help`) prints the help message and exits with code `0`.
    pub fn parse(&self) -> ParseOutcome {
        let command_input: Vec<String> = env::args().skip(1).collect();
        match self.parse_tokens(
            command_input
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<&str>>()
                .as_slice(),
        ) {
            Ok(outcome) => outcome,
            Err(exit_code) => {
                std::process::exit(exit_code);
            }
        }
    }

    fn invoke(
        &self,
        tokens: &[&str],
        user_interface: &(impl UserInterface + ?Sized),
    ) -> Result<ParseOutcome, i32> {
        match self.run_args(tokens) {
            Ok(outcome) => Ok(outcome),
            Err((_, Error::Help(message))) => {
                user_interface.print(message);
                Err(0)
            }
            Err((offset, error)) => {
                let exit_code = error.exit_code();
                user_interface.print_error(error);

                if let Some(offset) = offset {
                    user_interface.print_error_context(ErrorContext::new(offset, tokens));
                }

                Err(exit_code)
            }
        }
    }

    fn printer(&self, parser_plan: &ParserPlan) -> Printer {
        Printer::terminal(parser_plan, self.about.as_deref(), self.settings.add_help)
    }

    fn run_args(&self, tokens: &[&str]) -> Result<ParseOutcome, (Option<usize>, Error)> {
        let (namespace, unconsumed) = self.run(tokens, Namespace::default())?;

        if let Some(first) = unconsumed.first() {
            let offset = tokens
                .iter()
                .position(|token| *token == first.as_str())
                .map(|index| tokens[..index].iter().map(|t| t.len()).sum());
            return Err((
                offset,
                Error::from(ParseError(format!(
                    "Unrecognized arguments: {}.",
                    unconsumed.join(" ")
                ))),
            ));
        }

        let roots: HashSet<&str> = self.added.iter().map(|a| a.dest()).collect();

        for dest in namespace.destinations().filter(|d| !roots.contains(d)) {
            warn!("Leftover destination '{dest}' is not part of any registered record.");
        }

        Ok(ParseOutcome { namespace })
    }

    fn run(
        &self,
        tokens: &[&str],
        namespace: Namespace,
    ) -> Result<(Namespace, Vec<String>), (Option<usize>, Error)> {
        let (walk, parser_plan) =
            plan::plan(&self.model, &self.added, &self.settings).map_err(|e| (None, Error::from(e)))?;

        // 1. Find the chosen subgroup variants, skipping everything else.
        let selectors: HashSet<String> = walk
            .fields
            .iter()
            .filter(|f| f.selector.is_some())
            .map(|f| f.dest.clone())
            .collect();
        let chosen = if selectors.is_empty() {
            namespace.clone()
        } else {
            match Engine::selective(&parser_plan, &selectors)
                .map_err(|e| (None, Error::from(e)))?
                .consume(tokens, namespace.clone())
            {
                Ok(Action::Continue { namespace, .. }) => namespace,
                Ok(Action::PrintHelp) | Err(_) => namespace.clone(),
            }
        };
        let choices = reconstruct::choices(&walk, &chosen);
        let active = reconstruct::active_records(&walk.records, &choices);
        debug!("Pre-pass chose {choices:?}.");

        // 2. Parse for real; the flags of the variants not chosen, and of the records under an
        //    `Optional` field defaulting to `None`, are optional.
        let inactive: HashSet<usize> = active
            .iter()
            .enumerate()
            .filter(|(_, active)| !**active)
            .map(|(index, _)| index)
            .collect();
        let engine = Engine::chosen(&parser_plan, self.settings.add_help, &inactive)
            .map_err(|e| (None, Error::from(e)))?
            .relax(
                reconstruct::optional_records(&walk.records)
                    .into_iter()
                    .enumerate()
                    .filter(|(_, optional)| *optional)
                    .map(|(index, _)| index),
            );

        match engine.consume(tokens, namespace) {
            Ok(Action::Continue {
                namespace,
                unconsumed,
            }) => {
                // 3. Rebuild the records.
                let namespace =
                    reconstruct::reconstruct(&walk, namespace).map_err(|e| (None, Error::from(e)))?;
                Ok((namespace, unconsumed))
            }
            Ok(Action::PrintHelp) => Err((
                None,
                Error::Help(self.printer(&parser_plan).render(&self.program)),
            )),
            Err((offset, error)) => Err((Some(offset), Error::from(error))),
        }
    }
}

fn variant(subgroup: &Subgroup, name: &str) -> Option<RecordRef> {
    subgroup
        .variants()
        .iter()
        .find(|(variant, _)| variant == name)
        .map(|(_, record)| *record)
}

/// The result of [`ArgumentParser::parse_args`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    namespace: Namespace,
}

impl ParseOutcome {
    /// *Available using 'unit_test' crate feature only.*</br></br>
    /// Build a [`ParseOutcome`] around `namespace`, to test code which consumes parse results.
    ///
    /// ### Example
    /// ```ignore
    /// use nestarg_builder::*;
    ///
    /// let outcome = ParseOutcome::test_dummy(
    ///     Namespace::new().with("config", Instance::new("Optimizer").with("lr", 0.1)),
    /// );
    /// assert_eq!(outcome.namespace().instance("config").unwrap().get("lr"), Some(&Value::Float(0.1)));
    /// ```
    #[cfg(feature = "unit_test")]
    pub fn test_dummy(namespace: Namespace) -> Self {
        Self { namespace }
    }

    /// The value at `dest` (ex: a registration's [`Value::Record`]).
    pub fn get(&self, dest: &str) -> Option<&Value> {
        self.namespace.get(dest)
    }

    /// Convert the value at `dest` into `T`.
    pub fn extract<T: FieldValue>(&self, dest: &str) -> Result<T, DecodeError> {
        match self.namespace.get(dest) {
            Some(value) => T::from_value(value),
            None => Err(DecodeError::new(format!("No value at '{dest}'."))),
        }
    }

    /// The chosen variant per subgroup selector destination.
    pub fn subgroups(&self) -> &BTreeMap<String, String> {
        self.namespace.subgroups()
    }

    /// The reconstructed namespace.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Take the reconstructed namespace.
    pub fn into_namespace(self) -> Namespace {
        self.namespace
    }
}
