use crate::model::{DeriveValue, IntermediateAttributes};
use crate::MACRO_ATTRIBUTE;
use quote::ToTokens;
use std::collections::{HashMap, HashSet};

impl TryFrom<&syn::Attribute> for IntermediateAttributes {
    type Error = syn::Error;

    fn try_from(value: &syn::Attribute) -> Result<Self, Self::Error> {
        let attributes_parser =
            syn::punctuated::Punctuated::<syn::Expr, syn::Token![,]>::parse_terminated;
        let expressions = value.parse_args_with(attributes_parser)?;
        let mut singletons = HashSet::default();
        let mut pairs: HashMap<String, Vec<DeriveValue>> = HashMap::default();

        for expression in expressions {
            match expression {
                syn::Expr::Assign(assignment) => {
                    let left = assignment.left.to_token_stream();
                    let values = pairs.entry(left.to_string()).or_default();
                    values.push(DeriveValue {
                        tokens: assignment.right.to_token_stream(),
                    });
                }
                syn::Expr::Path(path) if path.path.get_ident().is_some() => {
                    singletons.insert(path.path.to_token_stream().to_string());
                }
                _ => {
                    return Err(syn::Error::new_spanned(
                        &expression,
                        format!(
                            "Invalid - unparseable attribute `{}`.",
                            expression.to_token_stream()
                        ),
                    ));
                }
            };
        }

        Ok(Self { singletons, pairs })
    }
}

/// Merge every `#[nestarg(..)]` attribute of an item.
pub(crate) fn load_attributes(
    attributes: &[syn::Attribute],
) -> Result<IntermediateAttributes, syn::Error> {
    let mut merged = IntermediateAttributes::default();

    for attribute in attributes {
        if attribute.path().is_ident(MACRO_ATTRIBUTE) {
            let IntermediateAttributes { singletons, pairs } =
                IntermediateAttributes::try_from(attribute)?;
            merged.singletons.extend(singletons);

            for (key, values) in pairs {
                merged.pairs.entry(key).or_default().extend(values);
            }
        }
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proc_macro2::Literal;
    use quote::quote;
    use syn::parse_quote;

    #[test]
    fn construct_attributes_empty() {
        // Setup
        let attribute: syn::Attribute = parse_quote! {
            #[nestarg()]
        };

        // Execute
        let attributes = IntermediateAttributes::try_from(&attribute).unwrap();

        // Verify
        assert_eq!(attributes, IntermediateAttributes::default());
    }

    #[test]
    fn construct_attributes() {
        // Setup
        let attribute: syn::Attribute = parse_quote! {
            #[nestarg(positional, help = "123", default = 0.5 * 2.0)]
        };

        // Execute
        let attributes = IntermediateAttributes::try_from(&attribute).unwrap();

        // Verify
        assert_eq!(
            attributes,
            IntermediateAttributes {
                singletons: HashSet::from(["positional".to_string()]),
                pairs: HashMap::from([
                    (
                        "help".to_string(),
                        vec![DeriveValue {
                            tokens: Literal::string("123").into_token_stream(),
                        }]
                    ),
                    (
                        "default".to_string(),
                        vec![DeriveValue {
                            tokens: quote! { 0.5 * 2.0 },
                        }]
                    ),
                ])
            }
        );
    }

    #[test]
    fn load_attributes_merged() {
        // Setup
        let item: syn::ItemStruct = parse_quote! {
            #[nestarg(alias = "-l")]
            #[serde(rename = "ignored")]
            #[nestarg(alias = "--rate", hidden)]
            struct Config;
        };

        // Execute
        let attributes = load_attributes(&item.attrs).unwrap();

        // Verify
        assert_eq!(attributes.singletons, HashSet::from(["hidden".to_string()]));
        assert_eq!(
            attributes.all("alias"),
            vec![
                DeriveValue {
                    tokens: Literal::string("-l").into_token_stream(),
                },
                DeriveValue {
                    tokens: Literal::string("--rate").into_token_stream(),
                },
            ]
        );
        assert_eq!(attributes.first("rename"), None);
    }

    #[test]
    fn construct_attributes_invalid() {
        let attribute: syn::Attribute = parse_quote! {
            #[nestarg]
        };
        assert!(IntermediateAttributes::try_from(&attribute).is_err());
    }

    #[test]
    fn construct_attributes_invalid_expression() {
        let attribute: syn::Attribute = parse_quote! {
            #[nestarg(1 + 2)]
        };
        let error = IntermediateAttributes::try_from(&attribute).unwrap_err();
        assert_eq!(error.to_string(), "Invalid - unparseable attribute `1 + 2`.");
    }
}
