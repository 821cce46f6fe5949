use std::collections::{HashMap, VecDeque};
use thiserror::Error;

use crate::matcher::api::*;
use crate::matcher::model::*;

/// Ends option parsing; every later token is a value.
pub(crate) const TERMINATOR: &str = "--";

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum TokenMatcherError {
    #[error("Cannot duplicate the option '{0}'.")]
    DuplicateOption(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum MatchError {
    #[error("Not enough tokens provided to parameter '{0}'.")]
    Undercomplete(String),

    #[error("Too many tokens provided to parameter '{0}'.")]
    Overcomplete(String),
}

impl From<CloseError> for MatchError {
    fn from(error: CloseError) -> Self {
        match error {
            CloseError::TooFewValues { name, .. } => MatchError::Undercomplete(name),
            CloseError::TooManyValues { name, .. } => MatchError::Overcomplete(name),
        }
    }
}

/// Matches a token stream against option strings and positional arguments.
///
/// Options may repeat (each occurrence is its own match).
/// Unknown options, and values nothing accepts, are collected as unconsumed.
#[derive(Debug)]
pub(crate) struct TokenMatcher {
    options: HashMap<String, OptionConfig>,
    arguments: VecDeque<ArgumentConfig>,
    fed: usize,
    terminated: bool,
    matches: Vec<MatchTokens>,
    unconsumed: Vec<String>,
    buffer: Option<MatchBuffer>,
}

impl TokenMatcher {
    pub(crate) fn new(
        options: Vec<OptionConfig>,
        arguments: VecDeque<ArgumentConfig>,
    ) -> Result<Self, TokenMatcherError> {
        let mut option_configs = HashMap::default();

        for option_config in options.into_iter() {
            let option = option_config.option().to_string();

            if option_configs
                .insert(option.clone(), option_config)
                .is_some()
            {
                return Err(TokenMatcherError::DuplicateOption(option));
            }
        }

        Ok(Self {
            options: option_configs,
            arguments,
            fed: 0,
            terminated: false,
            matches: Vec::default(),
            unconsumed: Vec::default(),
            buffer: None,
        })
    }

    /// The offset (in characters fed) of the next token.
    pub(crate) fn offset(&self) -> usize {
        self.fed
    }

    pub(crate) fn feed(&mut self, token: &str) -> Result<(), MatchError> {
        let token_length = token.len();
        // 1. After the terminator, everything is a value.
        // 2. Find an option, such as:
        //  --initial
        //  --initial ..
        //  --initial=..
        //  -i ..
        // 3. Match against an argument (negative numbers included).
        let result = if self.terminated {
            self.match_argument(token)
        } else if token == TERMINATOR {
            self.terminated = true;
            self.update_buffer(None)
        } else if is_option(token) {
            self.match_option(token)
        } else {
            self.match_argument(token)
        };

        self.fed += token_length;
        result
    }

    fn match_argument(&mut self, token: &str) -> Result<(), MatchError> {
        if let Some(match_buffer) = self.buffer.as_mut() {
            if match_buffer.is_open() {
                match_buffer.push(self.fed, token.to_string());
                return Ok(());
            }
        }

        // Flip to the next argument.
        self.update_buffer(None)?;

        match self.arguments.pop_front() {
            Some(argument_config) => {
                let mut match_buffer = MatchBuffer::new(
                    argument_config.name(),
                    argument_config.target(),
                    argument_config.bound(),
                );
                match_buffer.push(self.fed, token.to_string());
                self.buffer.replace(match_buffer);
            }
            None => {
                self.unconsumed.push(token.to_string());
            }
        };

        Ok(())
    }

    fn match_option(&mut self, token: &str) -> Result<(), MatchError> {
        self.update_buffer(None)?;
        let (option, single_argument) = split_equals_delimiter(token);

        match self.options.get(option) {
            Some(option_config) => {
                let mut match_buffer = MatchBuffer::of(option_config);

                match single_argument {
                    Some(value) => {
                        // The 1 comes from the argument specifier '='.
                        match_buffer.push(self.fed + option.len() + 1, value.to_string());

                        // Options using k=v syntax cannot follow up with more values afterwards.
                        let match_tokens = match_buffer.close()?;
                        self.matches.push(match_tokens);
                    }
                    None => {
                        self.buffer.replace(match_buffer);
                    }
                };
            }
            None => {
                self.unconsumed.push(token.to_string());
            }
        };

        Ok(())
    }

    fn update_buffer(&mut self, next_buffer: Option<MatchBuffer>) -> Result<(), MatchError> {
        let previous_buffer = std::mem::replace(&mut self.buffer, next_buffer);

        if let Some(match_buffer) = previous_buffer {
            let match_tokens = match_buffer.close()?;
            self.matches.push(match_tokens);
        }

        Ok(())
    }

    /// Close the open match; positional arguments never fed are left out of the matches.
    pub(crate) fn close(mut self) -> Result<Matches, (usize, MatchError, Matches)> {
        let mut close_error: Option<CloseError> = None;

        if let Some(match_buffer) = self.buffer.take() {
            match match_buffer.close() {
                Ok(match_tokens) => {
                    self.matches.push(match_tokens);
                }
                Err(error) => {
                    close_error.replace(error);
                }
            };
        }

        let matches = Matches {
            values: self.matches,
            unconsumed: self.unconsumed,
        };

        match close_error {
            Some(error) => Err((self.fed, MatchError::from(error), matches)),
            None => Ok(matches),
        }
    }
}

fn is_option(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-') && token.parse::<f64>().is_err()
}

fn split_equals_delimiter(token: &str) -> (&str, Option<&str>) {
    match token.split_once('=') {
        Some((n, v)) => (n, Some(v)),
        None => (token, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn matcher(options: Vec<OptionConfig>, arguments: Vec<ArgumentConfig>) -> TokenMatcher {
        TokenMatcher::new(options, VecDeque::from(arguments)).unwrap()
    }

    fn values(match_tokens: &MatchTokens) -> Vec<&str> {
        match_tokens.values.iter().map(|(_, v)| v.as_str()).collect()
    }

    #[test]
    fn option_duplicate() {
        let options = vec![
            OptionConfig::new("--abc", Target::Flag(0), Bound::Range(1, 1)),
            OptionConfig::new("--abc", Target::Flag(1), Bound::Range(1, 1)),
        ];
        let error = TokenMatcher::new(options, VecDeque::default()).unwrap_err();
        assert_eq!(error, TokenMatcherError::DuplicateOption("--abc".to_string()));
    }

    #[rstest]
    #[case(Bound::Range(0, 0), 0, true)]
    #[case(Bound::Range(0, 1), 0, true)]
    #[case(Bound::Range(0, 1), 1, true)]
    #[case(Bound::Range(1, 1), 1, true)]
    #[case(Bound::Range(2, 2), 1, false)]
    #[case(Bound::Lower(0), 3, true)]
    #[case(Bound::Lower(1), 0, false)]
    fn option_bound(#[case] bound: Bound, #[case] feed: u8, #[case] expected_ok: bool) {
        // Setup
        let mut tm = matcher(
            vec![OptionConfig::new("--initial", Target::Flag(0), bound)],
            vec![],
        );
        let tokens: Vec<String> = (0..feed).map(|i| i.to_string()).collect();

        // Execute
        tm.feed("--initial").unwrap();
        for token in &tokens {
            tm.feed(token).unwrap();
        }
        let result = tm.close();

        // Verify
        if expected_ok {
            let mut offset = 9;
            assert_eq!(
                result.unwrap().values,
                vec![MatchTokens {
                    target: Target::Flag(0),
                    name: "--initial".to_string(),
                    negative: false,
                    values: tokens
                        .into_iter()
                        .map(|t| {
                            let length = t.len();
                            let out = (offset, t);
                            offset += length;
                            out
                        })
                        .collect(),
                }]
            );
        } else {
            let (offset, error, matches) = result.unwrap_err();
            assert_eq!(offset, 9 + feed as usize);
            assert_eq!(error, MatchError::Undercomplete("--initial".to_string()));
            assert_eq!(matches.values, vec![]);
        }
    }

    #[test]
    fn option_surplus_unconsumed() {
        // Setup
        let mut tm = matcher(
            vec![OptionConfig::new("--lr", Target::Flag(0), Bound::Range(1, 1))],
            vec![],
        );

        // Execute
        for token in ["--lr", "0.1", "0.2", "abc"] {
            tm.feed(token).unwrap();
        }
        let matches = tm.close().unwrap();

        // Verify
        assert_eq!(matches.values.len(), 1);
        assert_eq!(values(&matches.values[0]), vec!["0.1"]);
        assert_eq!(matches.unconsumed, vec!["0.2", "abc"]);
    }

    #[rstest]
    #[case("--lr=0.5")]
    #[case("-lr=0.5")]
    fn option_equals(#[case] token: &str) {
        let mut tm = matcher(
            vec![
                OptionConfig::new("--lr", Target::Flag(0), Bound::Range(1, 1)),
                OptionConfig::new("-lr", Target::Flag(0), Bound::Range(1, 1)),
            ],
            vec![],
        );
        tm.feed(token).unwrap();
        let matches = tm.close().unwrap();
        assert_eq!(values(&matches.values[0]), vec!["0.5"]);
        assert_eq!(matches.values[0].values[0].0, token.find('=').unwrap() + 1);
    }

    #[test]
    fn option_equals_overcomplete() {
        let mut tm = matcher(
            vec![OptionConfig::negative("--no-cuda", Target::Flag(0))],
            vec![],
        );
        assert_eq!(
            tm.feed("--no-cuda=1").unwrap_err(),
            MatchError::Overcomplete("--no-cuda".to_string())
        );
    }

    #[test]
    fn option_repeated() {
        // Setup
        let mut tm = matcher(
            vec![OptionConfig::new("--lr", Target::Flag(0), Bound::Range(1, 1))],
            vec![],
        );

        // Execute
        for token in ["--lr", "1", "--lr", "2"] {
            tm.feed(token).unwrap();
        }
        let matches = tm.close().unwrap();

        // Verify
        assert_eq!(
            matches.values.iter().map(values).collect::<Vec<_>>(),
            vec![vec!["1"], vec!["2"]]
        );
    }

    #[test]
    fn option_unknown() {
        let mut tm = matcher(
            vec![OptionConfig::new("--lr", Target::Flag(0), Bound::Range(1, 1))],
            vec![],
        );

        for token in ["--bogus", "x", "--lr", "1"] {
            tm.feed(token).unwrap();
        }

        let matches = tm.close().unwrap();
        assert_eq!(matches.unconsumed, vec!["--bogus", "x"]);
        assert_eq!(values(&matches.values[0]), vec!["1"]);
    }

    #[test]
    fn option_negative() {
        let mut tm = matcher(
            vec![
                OptionConfig::new("--cuda", Target::Flag(0), Bound::Range(0, 1)),
                OptionConfig::negative("--no-cuda", Target::Flag(0)),
            ],
            vec![],
        );
        tm.feed("--no-cuda").unwrap();
        let matches = tm.close().unwrap();
        assert!(matches.values[0].negative);
        assert_eq!(matches.values[0].target, Target::Flag(0));
    }

    #[rstest]
    #[case("-1")]
    #[case("-0.5")]
    #[case("-1e3")]
    #[case("-")]
    fn value_negative_number(#[case] token: &str) {
        let mut tm = matcher(
            vec![OptionConfig::new("--x", Target::Flag(0), Bound::Range(1, 1))],
            vec![],
        );
        tm.feed("--x").unwrap();
        tm.feed(token).unwrap();
        let matches = tm.close().unwrap();
        assert_eq!(values(&matches.values[0]), vec![token]);
    }

    #[test]
    fn argument() {
        // Setup
        let mut tm = matcher(
            vec![OptionConfig::new("--x", Target::Flag(0), Bound::Range(1, 1))],
            vec![
                ArgumentConfig::new("SOURCE", Target::Flag(1), Bound::Range(1, 1)),
                ArgumentConfig::new("ITEMS", Target::Flag(2), Bound::Lower(0)),
            ],
        );

        // Execute
        for token in ["a", "--x", "1", "b", "c"] {
            tm.feed(token).unwrap();
        }
        let matches = tm.close().unwrap();

        // Verify
        assert_eq!(
            matches
                .values
                .iter()
                .map(|m| (m.target, values(m)))
                .collect::<Vec<_>>(),
            vec![
                (Target::Flag(1), vec!["a"]),
                (Target::Flag(0), vec!["1"]),
                (Target::Flag(2), vec!["b", "c"]),
            ]
        );
        assert!(matches.unconsumed.is_empty());
    }

    #[test]
    fn argument_not_fed() {
        let tm = matcher(
            vec![],
            vec![ArgumentConfig::new("SOURCE", Target::Flag(0), Bound::Range(1, 1))],
        );
        let matches = tm.close().unwrap();
        assert_eq!(matches.values, vec![]);
    }

    #[test]
    fn terminator() {
        // Setup
        let mut tm = matcher(
            vec![OptionConfig::new("--x", Target::Flag(0), Bound::Lower(0))],
            vec![ArgumentConfig::new("REST", Target::Flag(1), Bound::Lower(0))],
        );

        // Execute
        for token in ["--x", "1", "--", "--x", "-2"] {
            tm.feed(token).unwrap();
        }
        let matches = tm.close().unwrap();

        // Verify
        assert_eq!(
            matches
                .values
                .iter()
                .map(|m| (m.target, values(m)))
                .collect::<Vec<_>>(),
            vec![
                (Target::Flag(0), vec!["1"]),
                (Target::Flag(1), vec!["--x", "-2"]),
            ]
        );
    }

    #[test]
    fn undercomplete_before_option() {
        let mut tm = matcher(
            vec![
                OptionConfig::new("--pair", Target::Flag(0), Bound::Range(2, 2)),
                OptionConfig::new("--x", Target::Flag(1), Bound::Range(1, 1)),
            ],
            vec![],
        );
        tm.feed("--pair").unwrap();
        tm.feed("1").unwrap();
        assert_eq!(
            tm.feed("--x").unwrap_err(),
            MatchError::Undercomplete("--pair".to_string())
        );
        assert_eq!(tm.offset(), 10);
    }
}
