extern crate proc_macro;

mod generate;
mod load;
mod model;

use crate::model::{DeriveChoice, DeriveRecord, DeriveSubgroups};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;

pub(crate) const MACRO_ATTRIBUTE: &str = "nestarg";
pub(crate) const MACRO_RECORD: &str = "Record";
pub(crate) const MACRO_CHOICE: &str = "Choice";
pub(crate) const MACRO_SUBGROUPS: &str = "Subgroups";

/// Implement `nestarg::Record` and `nestarg::FieldValue` for a struct with named fields.
///
/// Every field type must implement `nestarg::FieldValue`.
#[proc_macro_derive(Record, attributes(nestarg))]
pub fn record(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as syn::DeriveInput);
    DeriveRecord::try_from(ast)
        .and_then(TokenStream2::try_from)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Implement `nestarg::FieldValue` for a unit enum, as a choice field.
#[proc_macro_derive(Choice, attributes(nestarg))]
pub fn choice(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as syn::DeriveInput);
    DeriveChoice::try_from(ast)
        .and_then(TokenStream2::try_from)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Implement `nestarg::FieldValue` for an enum of records, as a subgroup field.
#[proc_macro_derive(Subgroups, attributes(nestarg))]
pub fn subgroups(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as syn::DeriveInput);
    DeriveSubgroups::try_from(ast)
        .and_then(TokenStream2::try_from)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
