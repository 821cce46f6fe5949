use thiserror::Error;

use crate::matcher::api::*;

#[derive(Debug, PartialEq, Eq, Hash)]
pub(crate) struct MatchTokens {
    pub target: Target,
    pub name: String,
    pub negative: bool,
    pub values: Vec<OffsetValue>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(super) enum CloseError {
    #[error("too few values provided for '{name}' (provided={provided}, expected={expected}).")]
    TooFewValues {
        name: String,
        provided: usize,
        expected: u8,
    },

    #[error("too many values provided for '{name}' (provided={provided}, expected={expected}).")]
    TooManyValues {
        name: String,
        provided: usize,
        expected: u8,
    },
}

#[derive(Debug)]
pub(super) struct MatchBuffer {
    name: String,
    target: Target,
    negative: bool,
    bound: Bound,
    values: Vec<OffsetValue>,
}

impl MatchBuffer {
    pub(super) fn new(name: impl Into<String>, target: Target, bound: Bound) -> Self {
        Self {
            name: name.into(),
            target,
            negative: false,
            bound,
            values: Vec::default(),
        }
    }

    pub(super) fn of(option_config: &OptionConfig) -> Self {
        Self {
            negative: option_config.is_negative(),
            ..Self::new(
                option_config.option(),
                option_config.target(),
                option_config.bound(),
            )
        }
    }

    pub(super) fn push(&mut self, offset: usize, value: String) {
        self.values.push((offset, value));
    }

    pub(super) fn is_open(&self) -> bool {
        match self.bound {
            Bound::Range(_, n) => self.values.len() < n as usize,
            Bound::Lower(_) => true,
        }
    }

    pub(super) fn can_close(&self) -> bool {
        self.values.len() >= self.minimum() as usize
    }

    pub(super) fn close(self) -> Result<MatchTokens, CloseError> {
        let provided = self.values.len();
        let minimum = self.minimum();

        if provided < minimum as usize {
            return Err(CloseError::TooFewValues {
                name: self.name,
                provided,
                expected: minimum,
            });
        }

        if let Bound::Range(_, maximum) = self.bound {
            if provided > maximum as usize {
                return Err(CloseError::TooManyValues {
                    name: self.name,
                    provided,
                    expected: maximum,
                });
            }
        }

        Ok(MatchTokens {
            target: self.target,
            name: self.name,
            negative: self.negative,
            values: self.values,
        })
    }

    fn minimum(&self) -> u8 {
        match self.bound {
            Bound::Range(minimum, _) | Bound::Lower(minimum) => minimum,
        }
    }
}
