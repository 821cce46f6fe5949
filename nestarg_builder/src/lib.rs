//! Builder module for `nestarg`.
//! See [documentation root](https://docs.rs/nestarg/latest/nestarg/index.html) for full details.
#![deny(missing_docs)]
mod constant;
mod engine;
mod error;
mod matcher;
mod model;
mod namespace;
mod parser;
mod plan;
mod reconstruct;
mod record;

pub use error::*;
pub use model::*;
pub use namespace::Namespace;
pub use parser::{ArgumentParser, ParseOutcome};
pub use plan::{AddedRecord, ArgumentGroup, CandidateFlag, Converter, FlagSpec, ParserPlan};
pub use record::*;

#[cfg(test)]
#[macro_use]
extern crate assert_matches;
