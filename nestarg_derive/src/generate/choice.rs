use proc_macro2::TokenStream as TokenStream2;
use quote::quote;

use crate::model::{DeriveChoice, DeriveSubgroups, DeriveValue, DeriveVariant};

impl TryFrom<DeriveChoice> for TokenStream2 {
    type Error = syn::Error;

    fn try_from(value: DeriveChoice) -> Result<Self, Self::Error> {
        let DeriveChoice {
            enum_name,
            variants,
        } = value;
        let names: Vec<&String> = variants.iter().map(|v| &v.name).collect();
        let idents: Vec<&syn::Ident> = variants.iter().map(|v| &v.variant_name).collect();
        let unknown = format!("Unknown choice '{{}}' for {enum_name}.");
        let expected = format!("expected {enum_name}, found {{}} '{{}}'.");

        Ok(quote! {
            impl ::nestarg::FieldValue for #enum_name {
                fn field_type() -> ::nestarg::FieldType {
                    ::nestarg::FieldType::Choice(::std::vec![ #( #names.to_string() ),* ])
                }

                fn from_value(value: &::nestarg::Value) -> ::std::result::Result<Self, ::nestarg::DecodeError> {
                    match value {
                        ::nestarg::Value::Str(choice) => match choice.as_str() {
                            #( #names => ::std::result::Result::Ok(#enum_name::#idents), )*
                            other => ::std::result::Result::Err(::nestarg::DecodeError::new(
                                ::std::format!(#unknown, other)
                            )),
                        },
                        other => ::std::result::Result::Err(::nestarg::DecodeError::new(
                            ::std::format!(#expected, other.kind(), other)
                        )),
                    }
                }

                fn to_value(&self) -> ::nestarg::Value {
                    match self {
                        #( #enum_name::#idents => ::nestarg::Value::Str(#names.to_string()), )*
                    }
                }
            }
        })
    }
}

impl TryFrom<DeriveSubgroups> for TokenStream2 {
    type Error = syn::Error;

    fn try_from(value: DeriveSubgroups) -> Result<Self, Self::Error> {
        let DeriveSubgroups {
            enum_name,
            variants,
        } = value;
        let mut names = Vec::default();
        let mut idents = Vec::default();
        let mut records = Vec::default();

        for DeriveVariant {
            variant_name,
            name,
            record,
            ..
        } in &variants
        {
            match record {
                Some(DeriveValue { tokens }) => {
                    names.push(name);
                    idents.push(variant_name);
                    records.push(tokens);
                }
                None => {
                    return Err(syn::Error::new(
                        variant_name.span(),
                        "Invalid - subgroup variant without a record.",
                    ));
                }
            }
        }

        let default = variants
            .iter()
            .find(|v| v.default)
            .map(|DeriveVariant { name, .. }| quote! { .with_default(#name) });
        let unknown = format!("Unknown subgroup '{{}}' for {enum_name}.");
        let expected = format!("expected {enum_name}, found {{}} '{{}}'.");

        Ok(quote! {
            impl ::nestarg::FieldValue for #enum_name {
                fn field_type() -> ::nestarg::FieldType {
                    ::nestarg::FieldType::Subgroup(
                        ::nestarg::Subgroup::new()
                            #( .variant(#names, ::nestarg::RecordRef::of::<#records>()) )*
                            #default
                    )
                }

                fn from_value(value: &::nestarg::Value) -> ::std::result::Result<Self, ::nestarg::DecodeError> {
                    match value {
                        ::nestarg::Value::Variant(name, instance) => match name.as_str() {
                            #(
                                #names => ::std::result::Result::Ok(#enum_name::#idents(
                                    <#records as ::nestarg::FieldValue>::from_value(
                                        &::nestarg::Value::Record((**instance).clone())
                                    )?
                                )),
                            )*
                            other => ::std::result::Result::Err(::nestarg::DecodeError::new(
                                ::std::format!(#unknown, other)
                            )),
                        },
                        other => ::std::result::Result::Err(::nestarg::DecodeError::new(
                            ::std::format!(#expected, other.kind(), other)
                        )),
                    }
                }

                fn to_value(&self) -> ::nestarg::Value {
                    let (name, value) = match self {
                        #(
                            #enum_name::#idents(inner) => (#names, ::nestarg::FieldValue::to_value(inner)),
                        )*
                    };

                    match value {
                        ::nestarg::Value::Record(instance) => {
                            ::nestarg::Value::Variant(name.to_string(), ::std::boxed::Box::new(instance))
                        }
                        other => other,
                    }
                }
            }
        })
    }
}
