//! Derive Api for `nestarg` records.
//!
//! ### Getting Started
//! Declare a record as a struct with named fields, instrumented with `#[derive(Record)]`.
//! This implements [`Record`](../trait.Record.html) (to plan the Cli) and [`FieldValue`](../trait.FieldValue.html) (to convert the parsed record back into the struct).
//! Every field type must itself implement `FieldValue`: the primitives, `String`, `PathBuf`, `Option<T>`, `Vec<T>`, and any type instrumented with one of the derives on this page.
//!
//! ```no_run
#![doc = include_str!("../demos/demo_gan.rs")]
//! ```
//!
//! ### Field Configuration
//! The implicit rules follow the field type:
//! ```console
//! Type        | FieldType                 | Implicit default
//! -------------------------------------------------------------
//! bool        | FieldType::Bool           | false
//! integers    | FieldType::Int            |
//! f32, f64    | FieldType::Float          |
//! String      | FieldType::Str            |
//! Option<T>   | FieldType::Optional(..)   | None
//! Vec<T>      | FieldType::List(..)       | []
//! Record      | FieldType::Record(..)     | (built from its fields)
//! ```
//!
//! The following field attributes may be combined as necessary.
//! * `#[nestarg(default = E)]` sets the default to the expression `E`, of the field's type.
//! A string literal is converted with `From::from` (ex: for `String` or `PathBuf` fields).
//! * `#[nestarg(default)]` sets the default to `Default::default()`.
//! * `#[nestarg(help = "..")]` documents the field in the help message.
//! * `#[nestarg(alias = "..")]` adds an alternate option string; may be repeated.
//! An alias without leading dashes is given one (`-x`) or two (`--xyz`) depending on its length.
//! * `#[nestarg(positional)]` matches the field by position rather than by option string.
//! * `#[nestarg(nargs = N)]`, `#[nestarg(choices = [..])]` and `#[nestarg(metavar = "..")]` override the inferred flag configuration.
//! `N` must be a [Nargs](../enum.Nargs.html) variant.
//! * `#[nestarg(decoding_fn = F)]` and `#[nestarg(encoding_fn = F)]` convert values on the way in (from the Cli) and on the way out (for the help message).
//! * `#[nestarg(hidden)]` keeps the field out of the help message.
//! * `#[nestarg(no_init)]` keeps the field off the Cli; it always takes its default.
//! * `#[nestarg(base)]` inherits the fields of another record (see below).
//!
//! The struct itself may be configured with `#[nestarg(name = "..")]` (the record name shown in the help message) and `#[nestarg(help = "..")]`.
//!
//! ### Inheritance
//! A field marked `#[nestarg(base)]` is not a field on the Cli.
//! Instead, the fields of its record are declared first, ahead of the struct's own fields, as if they were written there.
//! A redeclared field replaces the inherited one in place.
//! ```ignore
//! #[derive(Record)]
//! struct Layer {
//!     #[nestarg(default = 64)]
//!     width: u32,
//! }
//!
//! #[derive(Record)]
//! struct Mlp {
//!     #[nestarg(base)]
//!     layer: Layer,
//!     depth: u32,
//!     // the above generates the flags: --width, --depth
//! }
//! ```
//!
//! ### Choices
//! In the case of unit enums, instrument with `#[derive(Choice)]`.
//! The Cli spelling of a variant is its name in snake case, unless configured with `#[nestarg(name = "..")]`.
//!
//! ```ignore
//! #[derive(Choice)]
//! enum Activation {
//!     Relu,
//!     // the above is spelled: relu
//!
//!     LeakyRelu,
//!     // the above is spelled: leaky_relu
//!
//!     #[nestarg(name = "tanh-like")]
//!     Tanh,
//!     // the above is spelled: tanh-like
//! }
//! ```
//!
//! ### Subgroups
//! In the case of enums whose variants each wrap one record, instrument with `#[derive(Subgroups)]`.
//! A field of this type becomes a choice flag selecting the variant, plus the flags of the chosen variant's record.
//! Variants are spelled the same way as choices; mark at most one with `#[nestarg(default)]`.
//!
//! ```no_run
#![doc = include_str!("../demos/demo_subgroups.rs")]
//! ```
pub use nestarg_derive::*;
