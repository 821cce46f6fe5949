use crate::load::attribute::load_attributes;
use crate::load::snake_case;
use crate::model::{DeriveChoice, DeriveSubgroups, DeriveValue, DeriveVariant};
use crate::{MACRO_CHOICE, MACRO_SUBGROUPS};
use quote::ToTokens;

impl TryFrom<syn::DeriveInput> for DeriveChoice {
    type Error = syn::Error;

    fn try_from(value: syn::DeriveInput) -> Result<Self, Self::Error> {
        let variants = load_variants(&value, MACRO_CHOICE)?;

        for variant in &variants {
            if variant.record.is_some() {
                return Err(syn::Error::new(
                    variant.variant_name.span(),
                    format!("Invalid - {MACRO_CHOICE} variants cannot hold values."),
                ));
            }
        }

        Ok(DeriveChoice {
            enum_name: value.ident,
            variants,
        })
    }
}

impl TryFrom<syn::DeriveInput> for DeriveSubgroups {
    type Error = syn::Error;

    fn try_from(value: syn::DeriveInput) -> Result<Self, Self::Error> {
        let variants = load_variants(&value, MACRO_SUBGROUPS)?;

        for variant in &variants {
            if variant.record.is_none() {
                return Err(syn::Error::new(
                    variant.variant_name.span(),
                    format!("Invalid - {MACRO_SUBGROUPS} variants must hold exactly one record."),
                ));
            }
        }

        if variants.iter().filter(|v| v.default).count() > 1 {
            return Err(syn::Error::new(
                value.ident.span(),
                format!("Invalid - {MACRO_SUBGROUPS} cannot have multiple default variants."),
            ));
        }

        Ok(DeriveSubgroups {
            enum_name: value.ident,
            variants,
        })
    }
}

fn load_variants(value: &syn::DeriveInput, macro_name: &str) -> Result<Vec<DeriveVariant>, syn::Error> {
    if !value.generics.params.is_empty() {
        return Err(syn::Error::new(
            value.ident.span(),
            format!("Invalid - {macro_name} cannot be generic."),
        ));
    }

    match &value.data {
        syn::Data::Enum(de) => de
            .variants
            .iter()
            .map(DeriveVariant::try_from)
            .collect::<Result<Vec<_>, _>>(),
        _ => Err(syn::Error::new(
            value.ident.span(),
            format!("Invalid - {macro_name} only applies to 'enum' data structures."),
        )),
    }
}

impl TryFrom<&syn::Variant> for DeriveVariant {
    type Error = syn::Error;

    fn try_from(value: &syn::Variant) -> Result<Self, Self::Error> {
        let attributes = load_attributes(&value.attrs)?;
        let variant_name = value.ident.clone();
        let name = match attributes.first("name") {
            Some(DeriveValue { tokens }) => {
                let literal: syn::LitStr = syn::parse2(tokens.clone())?;
                literal.value()
            }
            None => snake_case(&variant_name),
        };
        let record = match &value.fields {
            syn::Fields::Unit => None,
            syn::Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
                fields.unnamed.first().map(|field| DeriveValue {
                    tokens: field.ty.to_token_stream(),
                })
            }
            _ => {
                return Err(syn::Error::new(
                    variant_name.span(),
                    "Invalid - variants are either unit or wrap exactly one record.",
                ));
            }
        };

        Ok(DeriveVariant {
            variant_name,
            name,
            record,
            default: attributes.singletons.contains("default"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proc_macro2::Span;
    use quote::quote;

    #[test]
    fn construct_choice() {
        // Setup
        let input: syn::DeriveInput = syn::parse_str(
            r#"
                #[derive(Choice)]
                enum Activation {
                    Relu,
                    #[nestarg(name = "tanh-like")]
                    Tanh,
                    LeakyRelu,
                }
            "#,
        )
        .unwrap();

        // Execute
        let choice = DeriveChoice::try_from(input).unwrap();

        // Verify
        assert_eq!(choice.enum_name, ident("Activation"));
        assert_eq!(
            choice
                .variants
                .iter()
                .map(|v| v.name.as_str())
                .collect::<Vec<_>>(),
            vec!["relu", "tanh-like", "leaky_relu"]
        );
    }

    #[test]
    fn construct_subgroups() {
        // Setup
        let input: syn::DeriveInput = syn::parse_str(
            r#"
                #[derive(Subgroups)]
                enum Model {
                    #[nestarg(default)]
                    Mlp(MlpConfig),
                    Conv(ConvConfig),
                }
            "#,
        )
        .unwrap();

        // Execute
        let subgroups = DeriveSubgroups::try_from(input).unwrap();

        // Verify
        assert_eq!(
            subgroups,
            DeriveSubgroups {
                enum_name: ident("Model"),
                variants: vec![
                    DeriveVariant {
                        variant_name: ident("Mlp"),
                        name: "mlp".to_string(),
                        record: Some(DeriveValue {
                            tokens: quote! { MlpConfig }
                        }),
                        default: true,
                    },
                    DeriveVariant {
                        variant_name: ident("Conv"),
                        name: "conv".to_string(),
                        record: Some(DeriveValue {
                            tokens: quote! { ConvConfig }
                        }),
                        default: false,
                    },
                ],
            }
        );
    }

    #[test]
    fn construct_invalid() {
        let input: syn::DeriveInput = syn::parse_str("enum Choice { A(Config) }").unwrap();
        assert!(DeriveChoice::try_from(input).is_err());

        let input: syn::DeriveInput = syn::parse_str("enum Model { A }").unwrap();
        assert!(DeriveSubgroups::try_from(input).is_err());

        let input: syn::DeriveInput =
            syn::parse_str("enum Model { #[nestarg(default)] A(X), #[nestarg(default)] B(Y) }")
                .unwrap();
        assert!(DeriveSubgroups::try_from(input).is_err());

        let input: syn::DeriveInput = syn::parse_str("enum Model { A(X, Y) }").unwrap();
        assert!(DeriveSubgroups::try_from(input).is_err());

        let input: syn::DeriveInput = syn::parse_str("struct Model { a: A }").unwrap();
        assert!(DeriveChoice::try_from(input).is_err());
    }

    fn ident(name: &str) -> syn::Ident {
        syn::Ident::new(name, Span::call_site())
    }
}
