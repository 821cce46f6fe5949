//! `nestarg` builds a command line interface out of record declarations.
//!
//! Configuration in a machine learning (or any other parameter heavy) program tends to be deeply structured:
//! an experiment holds a model, the model holds two optimizers, each optimizer holds a learning rate.
//! `nestarg` lets you declare that structure once, as plain Rust structs, and derives the Cli from it.
//! Specifically, `nestarg` attempts to prioritize the following design concerns:
//! * *Nesting*:
//! Records may hold other records, to any depth, and every leaf field gets a flag.
//! * *Conflict free flags*:
//! When two fields would claim the same option string (ex: two `lr` fields), `nestarg` qualifies them just enough to tell them apart.
//! No flag is ever silently shared.
//! * *Alternatives*:
//! A field may be one of several records (a *subgroup*), selected on the Cli with a single choice flag.
//! * *Round trip*:
//! The parsed values are reconstructed into the same structure that was declared.
//!
//! # Usage
//! This page includes a few demos on using `nestarg`.
//! More examples are outlined in [the source](https://github.com/nestarg/nestarg/tree/main/demos).
//!
//! via [derive Api](./derive/index.html):
//! ```no_run
#![doc = include_str!("../demos/demo_gan.rs")]
//! ```
//! or equivalently via builder Api (this page):
//! ```no_run
#![doc = include_str!("../demos/demo_gan_b.rs")]
//! ```
//!
//! Both of these generate the same Cli program:
//! ```console
//! $ gan -h
//! usage: gan [-h] [--epochs EPOCHS] [--device DEVICE] [--generator.lr GENERATOR.LR] ..
//! Train a generative adversarial network.
//!
//! options:
//!  -h, --help                         Show this help message and exit.
//!
//! Training ['config']:
//!  --epochs EPOCHS                    Passes over the data. (default: 10)
//!  --device DEVICE                    {cpu, cuda} (default: cpu)
//!
//! Optimizer ['config.generator']:
//!  Settings for one optimizer.
//!  --generator.lr GENERATOR.LR        The learning rate. (default: 0.001)
//!  ..
//!
//! $ gan --generator.lr 0.1 --lr 0.2
//! Parse error: Unrecognized arguments: --lr 0.2.
//! --generator.lr 0.1 --lr 0.2
//!                    ^
//! ```
//!
//! # Derive Api
//! We highly recommend using the [derive Api](./derive/index.html) to declare your records.
//! The next section explains the structure and semantics of `nestarg` using the builder Api, which applies to both builder and derive Apis.
//!
//! # Builder Api
//! A record is any type implementing [`Record`], whose [`RecordDecl`] lists its fields in order.
//! Each [`Field`] has a name and a [`FieldType`]:
//! * `Bool`, `Int`, `Float`, `Str`: the leaf types, each parsed from a single token.
//! * `Choice`: a string restricted to the named choices.
//! * `Optional`, `List`: may be absent, or a sequence.
//! * `Record`: a nested record; its fields are flattened into the parser under the field's destination.
//! * `Subgroup`: one of several records, selected by name (see below).
//!
//! Register records on an [`ArgumentParser`] under a destination, then parse.
//! The values come back as a [`Namespace`] of reconstructed [`Instance`]s, or directly as your types via [`FieldValue`].
//!
//! ### Destinations
//! Every field has a dotted *destination*: the registration destination followed by the path of field names (ex: `config.generator.lr`).
//! Destinations are unique within a parser; registering the same destination twice is a [`PlanError`].
//!
//! ### Option Strings
//! By default, a field's option string is its name (ex: `--lr`).
//! When two fields collide, the [`ConflictResolution`] decides what happens:
//! * `Auto` (default): each colliding flag is prefixed by the shortest trailing part of its destination which makes it unique (ex: `--generator.lr` and `--discriminator.lr`).
//! * `Explicit`: colliding flags use their full destination.
//! * `AlwaysMerge`: colliding flags of identical records are merged into one flag taking one value per destination (ex: `--lr 0.1 0.2`).
//! * `None`: a collision is a configuration error.
//!
//! See also [`NestedFieldDisplay`] and [`DashesOrUnderscores`] to tune the spelling.
//! Booleans get a negative form (`--no-cuda`), and single character names (or aliases) get a single dash (`-v`).
//!
//! ### Subgroups
//! A [`Subgroup`] field is selected by a choice flag named after the field (ex: `--model conv`).
//! Only the chosen variant's fields are parsed; those of the other variants are hidden from the help and left out of the result.
//! The reconstructed value is a [`Value::Variant`] carrying the chosen name, also reported in [`ParseOutcome::subgroups`].
//!
//! ```no_run
#![doc = include_str!("../demos/demo_subgroups.rs")]
//! ```
//!
//! ### Defaults
//! A field without a default must be given on the Cli, unless it is a nested record (which is built from its own fields).
//! A nested record which is `Optional` and has no defaulted fields collapses back to `None` when none of its flags are given.
//!
//! # Cli Semantics
//! `nestarg` parses the Cli tokens according to the following set of rules.
//!
//! * Options are matched by their option string, and consume values according to their [`Nargs`].
//! * Positional fields are matched in declaration order.
//! * The value of a single value option may be attached with `=` (ex: `--lr=0.1`).
//! * `-h`/`--help` prints the help message, even when other tokens would fail to parse.
//! * Any token not consumed by a flag is an error for [`ArgumentParser::parse_args`], and returned to the caller by [`ArgumentParser::parse_known_args`].
//!
//! # Features
//! * `unit_test`: For features that help with unit testing.
pub mod derive;
pub use nestarg_builder::*;
