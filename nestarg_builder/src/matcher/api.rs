#[cfg(test)]
use rand::{distributions::Standard, prelude::Distribution, Rng};

use crate::matcher::MatchTokens;
use crate::model::Nargs;

pub(crate) type OffsetValue = (usize, String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Bound {
    Range(u8, u8),
    Lower(u8),
}

impl From<Nargs> for Bound {
    fn from(value: Nargs) -> Self {
        match value {
            Nargs::Precisely(n) => Bound::Range(n, n),
            Nargs::ZeroOrOne => Bound::Range(0, 1),
            Nargs::Any => Bound::Lower(0),
            Nargs::AtLeastOne => Bound::Lower(1),
        }
    }
}

#[cfg(test)]
impl Distribution<Bound> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Bound {
        match rng.gen_range(0..2) {
            0 => {
                let upper: u8 = rng.gen();

                if upper == 0 {
                    Bound::Range(0, upper)
                } else {
                    Bound::Range(rng.gen_range(0..upper), upper)
                }
            }
            1 => Bound::Lower(rng.gen()),
            _ => unreachable!("internal error - impossible gen_range()"),
        }
    }
}

/// What a match feeds: the help switch, or the flag at this index of the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Target {
    Help,
    Flag(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct ArgumentConfig {
    name: String,
    target: Target,
    bound: Bound,
}

impl ArgumentConfig {
    pub(crate) fn new(name: impl Into<String>, target: Target, bound: Bound) -> Self {
        Self {
            name: name.into(),
            target,
            bound,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn target(&self) -> Target {
        self.target
    }

    pub(crate) fn bound(&self) -> Bound {
        self.bound
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct OptionConfig {
    option: String,
    target: Target,
    negative: bool,
    bound: Bound,
}

impl OptionConfig {
    pub(crate) fn new(option: impl Into<String>, target: Target, bound: Bound) -> Self {
        Self {
            option: option.into(),
            target,
            negative: false,
            bound,
        }
    }

    /// The negative form of a boolean flag, which takes no values.
    pub(crate) fn negative(option: impl Into<String>, target: Target) -> Self {
        Self {
            option: option.into(),
            target,
            negative: true,
            bound: Bound::Range(0, 0),
        }
    }

    pub(crate) fn option(&self) -> &str {
        &self.option
    }

    pub(crate) fn target(&self) -> Target {
        self.target
    }

    pub(crate) fn is_negative(&self) -> bool {
        self.negative
    }

    pub(crate) fn bound(&self) -> Bound {
        self.bound
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Matches {
    pub values: Vec<MatchTokens>,
    /// The tokens nothing accepted, in order.
    pub unconsumed: Vec<String>,
}
