use proc_macro2::TokenStream as TokenStream2;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct DeriveValue {
    pub tokens: TokenStream2,
}

impl PartialEq for DeriveValue {
    fn eq(&self, other: &Self) -> bool {
        self.tokens.to_string() == other.tokens.to_string()
    }
}

impl Eq for DeriveValue {}

/// The contents of the `#[nestarg(..)]` attributes on one item.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct IntermediateAttributes {
    pub singletons: HashSet<String>,
    pub pairs: HashMap<String, Vec<DeriveValue>>,
}

impl IntermediateAttributes {
    pub fn first(&self, key: &str) -> Option<&DeriveValue> {
        self.pairs.get(key).and_then(|values| values.first())
    }

    pub fn all(&self, key: &str) -> Vec<DeriveValue> {
        self.pairs.get(key).cloned().unwrap_or_default()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum DeriveDefault {
    /// No default; the field must be given (or comes from a nested record).
    Missing,
    /// An expression of type `Value`, implied by the field type.
    Implicit(DeriveValue),
    /// An expression of the field type.
    Explicit(DeriveValue),
}

#[derive(Debug, PartialEq, Eq)]
pub struct DeriveField {
    pub field_name: syn::Ident,
    pub field_type: DeriveValue,
    pub base: bool,
    pub default: DeriveDefault,
    pub help: Option<DeriveValue>,
    pub aliases: Vec<DeriveValue>,
    pub positional: bool,
    pub hidden: bool,
    pub no_init: bool,
    pub nargs: Option<DeriveValue>,
    pub choices: Option<DeriveValue>,
    pub metavar: Option<DeriveValue>,
    pub decoding_fn: Option<DeriveValue>,
    pub encoding_fn: Option<DeriveValue>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct DeriveRecord {
    pub struct_name: syn::Ident,
    pub record_name: String,
    pub help: Option<DeriveValue>,
    pub fields: Vec<DeriveField>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct DeriveVariant {
    pub variant_name: syn::Ident,
    pub name: String,
    /// The record type wrapped by a subgroup variant.
    pub record: Option<DeriveValue>,
    pub default: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub struct DeriveChoice {
    pub enum_name: syn::Ident,
    pub variants: Vec<DeriveVariant>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct DeriveSubgroups {
    pub enum_name: syn::Ident,
    pub variants: Vec<DeriveVariant>,
}
