use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::constant::reserved_options;
use crate::error::ParseError;
use crate::matcher::*;
use crate::model::{Nargs, Value};
use crate::namespace::Namespace;
use crate::plan::{Converter, FlagSpec, ParserPlan};

impl From<MatchError> for ParseError {
    fn from(error: MatchError) -> Self {
        ParseError(error.to_string())
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum Action {
    Continue {
        namespace: Namespace,
        unconsumed: Vec<String>,
    },
    PrintHelp,
}

/// Parses tokens against a [`ParserPlan`] into a raw [`Namespace`].
///
/// Defaults are not applied here; a destination is only set when its flag was given.
pub(crate) struct Engine<'p> {
    flags: Vec<&'p FlagSpec>,
    token_matcher: TokenMatcher,
    relaxed: HashSet<usize>,
    lenient: bool,
}

impl<'p> std::fmt::Debug for Engine<'p> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine{..}").finish()
    }
}

impl<'p> Engine<'p> {
    #[cfg(test)]
    pub(crate) fn new(plan: &'p ParserPlan, add_help: bool) -> Result<Self, ParseError> {
        Self::build(plan, add_help, false, |_| true)
    }

    /// An engine for the chosen subgroup variants.
    ///
    /// The positional arguments of the `inactive` records are left out, so they never swallow tokens,
    /// and the flags of the `inactive` records are not required.
    pub(crate) fn chosen(
        plan: &'p ParserPlan,
        add_help: bool,
        inactive: &HashSet<usize>,
    ) -> Result<Self, ParseError> {
        let engine = Self::build(plan, add_help, false, |flag| {
            !(flag.positional && inactive.contains(&flag.record))
        })?;
        Ok(engine.relax(inactive.iter().copied()))
    }

    /// An engine that only knows the flags feeding `destinations`, and never fails.
    ///
    /// Everything else in the tokens is skipped as unconsumed.
    pub(crate) fn selective(
        plan: &'p ParserPlan,
        destinations: &HashSet<String>,
    ) -> Result<Self, ParseError> {
        Self::build(plan, false, true, |flag| {
            !flag.positional && flag.destinations.iter().any(|d| destinations.contains(d))
        })
    }

    fn build(
        plan: &'p ParserPlan,
        add_help: bool,
        lenient: bool,
        include: impl Fn(&FlagSpec) -> bool,
    ) -> Result<Self, ParseError> {
        let flags: Vec<&FlagSpec> = plan.flags().collect();
        let mut option_configs = Vec::default();
        let mut argument_configs = VecDeque::default();

        if add_help {
            for option in reserved_options() {
                option_configs.push(OptionConfig::new(option, Target::Help, Bound::Range(0, 0)));
            }
        }

        for (index, flag) in flags.iter().enumerate() {
            if !include(flag) {
                continue;
            }

            let bound = Bound::from(flag.nargs);

            if flag.positional {
                argument_configs.push_back(ArgumentConfig::new(
                    flag.metavar(),
                    Target::Flag(index),
                    bound,
                ));
            } else {
                for option in &flag.option_strings {
                    option_configs.push(OptionConfig::new(option, Target::Flag(index), bound));
                }

                for option in &flag.negative_option_strings {
                    option_configs.push(OptionConfig::negative(option, Target::Flag(index)));
                }
            }
        }

        let token_matcher = TokenMatcher::new(option_configs, argument_configs)
            .map_err(|error| ParseError(error.to_string()))?;

        Ok(Self {
            flags,
            token_matcher,
            relaxed: HashSet::default(),
            lenient,
        })
    }

    /// Do not require the flags of these planned records.
    pub(crate) fn relax(mut self, records: impl IntoIterator<Item = usize>) -> Self {
        self.relaxed.extend(records);
        self
    }

    pub(crate) fn consume(
        self,
        tokens: &[&str],
        namespace: Namespace,
    ) -> Result<Action, (usize, ParseError)> {
        let Engine {
            flags,
            mut token_matcher,
            relaxed,
            lenient,
        } = self;
        let mut namespace = namespace;

        // 1. Feed the raw token strings to the matcher.
        for token in tokens {
            let offset = token_matcher.offset();

            if let Err(error) = token_matcher.feed(token) {
                if !lenient {
                    return Err((offset, ParseError::from(error)));
                }
            }
        }

        let fed = token_matcher.offset();
        let matches = match token_matcher.close() {
            Ok(matches) | Err((_, _, matches))
                if matches.values.iter().any(|m| m.target == Target::Help) =>
            {
                return Ok(Action::PrintHelp);
            }
            Ok(matches) => matches,
            Err((_, _, matches)) if lenient => matches,
            Err((offset, error, _)) => return Err((offset, ParseError::from(error))),
        };

        // 2. Convert the matched raw strings, the last occurrence of a flag winning.
        for match_tokens in &matches.values {
            let flag = match match_tokens.target {
                Target::Flag(index) => flags[index],
                Target::Help => unreachable!("internal error - help must short circuit"),
            };

            match convert(flag, match_tokens) {
                Ok(values) => assign(flag, values, &mut namespace),
                Err(_) if lenient => {
                    debug!("Skipping unconvertible '{}'.", match_tokens.name);
                }
                Err(error) => return Err(error),
            };
        }

        // 3. Check the required flags (a pre-filled namespace counts).
        if !lenient {
            let missing: Vec<String> = flags
                .iter()
                .filter(|flag| flag.required && !relaxed.contains(&flag.record))
                .filter(|flag| !flag.destinations.iter().all(|d| namespace.contains(d)))
                .map(|flag| {
                    if flag.positional {
                        flag.metavar()
                    } else {
                        flag.display_name()
                    }
                })
                .collect();

            if !missing.is_empty() {
                return Err((
                    fed,
                    ParseError(format!(
                        "The following arguments are required: {}.",
                        missing.join(", ")
                    )),
                ));
            }
        }

        Ok(Action::Continue {
            namespace,
            unconsumed: matches.unconsumed,
        })
    }
}

fn convert(flag: &FlagSpec, match_tokens: &MatchTokens) -> Result<Vec<Value>, (usize, ParseError)> {
    if match_tokens.negative {
        return Ok(vec![Value::Bool(false)]);
    }

    let mut values = Vec::default();

    for (offset, token) in &match_tokens.values {
        if !flag.choices.is_empty() && !flag.choices.contains(token) {
            return Err((
                *offset,
                ParseError(format!(
                    "Invalid choice '{token}' for '{}' (choose from {}).",
                    match_tokens.name,
                    flag.choices
                        .iter()
                        .map(|c| format!("'{c}'"))
                        .collect::<Vec<_>>()
                        .join(", ")
                )),
            ));
        }

        let value = flag.converter.convert(token).map_err(|message| {
            (
                *offset,
                ParseError(format!("Invalid value for '{}': {message}", match_tokens.name)),
            )
        })?;
        values.push(value);
    }

    Ok(values)
}

fn assign(flag: &FlagSpec, mut values: Vec<Value>, namespace: &mut Namespace) {
    if flag.destinations.len() > 1 {
        // Merged: one value per destination, in registration order.
        for (dest, value) in flag.destinations.iter().zip(values) {
            namespace.set(dest.clone(), value);
        }

        return;
    }

    let value = match flag.nargs {
        Nargs::ZeroOrOne | Nargs::Precisely(1) => match values.pop() {
            Some(value) => value,
            None if flag.optional => Value::Empty,
            None if flag.converter == Converter::Bool => Value::Bool(true),
            None => Value::Empty,
        },
        Nargs::Precisely(0) => Value::Bool(true),
        Nargs::Precisely(_) | Nargs::Any | Nargs::AtLeastOne => Value::List(values),
    };

    for dest in &flag.destinations {
        namespace.set(dest.clone(), value.clone());
    }
}
