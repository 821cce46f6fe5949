use crate::load::attribute::load_attributes;
use crate::load::incompatible_error;
use crate::model::{DeriveDefault, DeriveField, DeriveRecord, DeriveValue};
use crate::MACRO_RECORD;
use quote::{quote, ToTokens};

impl TryFrom<syn::DeriveInput> for DeriveRecord {
    type Error = syn::Error;

    fn try_from(value: syn::DeriveInput) -> Result<Self, Self::Error> {
        let attributes = load_attributes(&value.attrs)?;
        let struct_name = value.ident.clone();

        if !value.generics.params.is_empty() {
            return Err(syn::Error::new(
                struct_name.span(),
                format!("Invalid - {MACRO_RECORD} cannot be generic."),
            ));
        }

        let record_name = match attributes.first("name") {
            Some(DeriveValue { tokens }) => {
                let literal: syn::LitStr = syn::parse2(tokens.clone())?;
                literal.value()
            }
            None => struct_name.to_string(),
        };

        match &value.data {
            syn::Data::Struct(ds) => {
                let fields = match ds {
                    syn::DataStruct {
                        fields: syn::Fields::Named(ref fields),
                        ..
                    } => fields
                        .named
                        .iter()
                        .map(DeriveField::try_from)
                        .collect::<Result<Vec<_>, _>>()?,
                    syn::DataStruct {
                        fields: syn::Fields::Unit,
                        ..
                    } => Vec::default(),
                    syn::DataStruct { .. } => {
                        return Err(syn::Error::new(
                            struct_name.span(),
                            format!("Invalid - {MACRO_RECORD} requires named fields."),
                        ));
                    }
                };

                Ok(DeriveRecord {
                    struct_name,
                    record_name,
                    help: attributes.first("help").cloned(),
                    fields,
                })
            }
            _ => Err(syn::Error::new(
                struct_name.span(),
                format!("Invalid - {MACRO_RECORD} only applies to 'struct' data structures."),
            )),
        }
    }
}

impl TryFrom<&syn::Field> for DeriveField {
    type Error = syn::Error;

    fn try_from(value: &syn::Field) -> Result<Self, Self::Error> {
        let attributes = load_attributes(&value.attrs)?;
        let field_name = match &value.ident {
            Some(ident) => ident.clone(),
            None => return Err(syn::Error::new_spanned(value, "Invalid - unnamed field.")),
        };
        let field_type = &value.ty;
        let base = attributes.singletons.contains("base");
        let positional = attributes.singletons.contains("positional");
        let explicit_default = attributes.first("default");
        let bare_default = attributes.singletons.contains("default");

        if base && positional {
            return Err(incompatible_error(
                &field_name,
                "#[nestarg(base)]",
                "#[nestarg(positional)]",
            ));
        }

        if base && (explicit_default.is_some() || bare_default) {
            return Err(incompatible_error(
                &field_name,
                "#[nestarg(base)]",
                "#[nestarg(default)]",
            ));
        }

        let default = match (explicit_default, bare_default) {
            (Some(_), true) => {
                return Err(incompatible_error(
                    &field_name,
                    "#[nestarg(default)]",
                    "#[nestarg(default = ..)]",
                ));
            }
            (Some(DeriveValue { tokens }), false) => {
                let expression: syn::Expr = syn::parse2(tokens.clone())?;

                match expression {
                    syn::Expr::Lit(syn::ExprLit {
                        lit: syn::Lit::Str(_),
                        ..
                    }) => DeriveDefault::Explicit(DeriveValue {
                        tokens: quote! { ::std::convert::From::from(#tokens) },
                    }),
                    _ => DeriveDefault::Explicit(DeriveValue {
                        tokens: tokens.clone(),
                    }),
                }
            }
            (None, true) => DeriveDefault::Explicit(DeriveValue {
                tokens: quote! { ::std::default::Default::default() },
            }),
            (None, false) => implicit_default(field_type),
        };

        Ok(DeriveField {
            field_name,
            field_type: DeriveValue {
                tokens: field_type.to_token_stream(),
            },
            base,
            default,
            help: attributes.first("help").cloned(),
            aliases: attributes.all("alias"),
            positional,
            hidden: attributes.singletons.contains("hidden"),
            no_init: attributes.singletons.contains("no_init"),
            nargs: attributes.first("nargs").cloned(),
            choices: attributes.first("choices").cloned(),
            metavar: attributes.first("metavar").cloned(),
            decoding_fn: attributes.first("decoding_fn").cloned(),
            encoding_fn: attributes.first("encoding_fn").cloned(),
        })
    }
}

// Option<T> defaults to None, bool to false, and Vec<T> to empty.
fn implicit_default(field_type: &syn::Type) -> DeriveDefault {
    let ident = match field_type {
        syn::Type::Path(path) => path.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    };

    match ident.as_deref() {
        Some("Option") => DeriveDefault::Implicit(DeriveValue {
            tokens: quote! { ::nestarg::Value::None },
        }),
        Some("bool") => DeriveDefault::Implicit(DeriveValue {
            tokens: quote! { ::nestarg::Value::Bool(false) },
        }),
        Some("Vec") => DeriveDefault::Implicit(DeriveValue {
            tokens: quote! { ::nestarg::Value::List(::std::vec::Vec::new()) },
        }),
        _ => DeriveDefault::Missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proc_macro2::{Literal, Span};

    #[test]
    fn construct_record_empty() {
        // Setup
        let input: syn::DeriveInput = syn::parse_str(
            r#"
                #[derive(Record)]
                struct Empty;
            "#,
        )
        .unwrap();

        // Execute
        let record = DeriveRecord::try_from(input).unwrap();

        // Verify
        assert_eq!(
            record,
            DeriveRecord {
                struct_name: ident("Empty"),
                record_name: "Empty".to_string(),
                help: None,
                fields: Vec::default(),
            }
        );
    }

    #[test]
    fn construct_record() {
        // Setup
        let input: syn::DeriveInput = syn::parse_str(
            r#"
                #[derive(Record)]
                #[nestarg(name = "Hyper", help = "The knobs.")]
                struct Hparams {
                    #[nestarg(default = 0.1, alias = "-l", help = "The rate.")]
                    lr: f64,
                    cuda: bool,
                }
            "#,
        )
        .unwrap();

        // Execute
        let record = DeriveRecord::try_from(input).unwrap();

        // Verify
        assert_eq!(record.struct_name, ident("Hparams"));
        assert_eq!(record.record_name, "Hyper");
        assert_eq!(
            record.help,
            Some(DeriveValue {
                tokens: Literal::string("The knobs.").into_token_stream(),
            })
        );
        assert_eq!(record.fields.len(), 2);
        assert_eq!(record.fields[0].field_name, ident("lr"));
        assert_eq!(
            record.fields[0].default,
            DeriveDefault::Explicit(DeriveValue {
                tokens: quote! { 0.1 }
            })
        );
        assert_eq!(
            record.fields[0].aliases,
            vec![DeriveValue {
                tokens: Literal::string("-l").into_token_stream(),
            }]
        );
        assert_eq!(
            record.fields[1].default,
            DeriveDefault::Implicit(DeriveValue {
                tokens: quote! { ::nestarg::Value::Bool(false) }
            })
        );
    }

    #[test]
    fn construct_field() {
        // Setup
        let input: syn::ItemStruct = syn::parse_str(
            r#"
                struct Files {
                    #[nestarg(positional, metavar = "SRC", default = "a.txt")]
                    source: String,
                    #[nestarg(hidden, no_init, default)]
                    seen: usize,
                    #[nestarg(nargs = Nargs::AtLeastOne, choices = ["x", "y"])]
                    tags: Vec<String>,
                    #[nestarg(decoding_fn = positive, encoding_fn = display)]
                    count: i64,
                    limit: Option<u32>,
                }
            "#,
        )
        .unwrap();

        // Execute
        let fields = input
            .fields
            .iter()
            .map(DeriveField::try_from)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        // Verify
        assert!(fields[0].positional);
        assert_eq!(
            fields[0].default,
            DeriveDefault::Explicit(DeriveValue {
                tokens: quote! { ::std::convert::From::from("a.txt") }
            })
        );
        assert_eq!(
            fields[0].metavar,
            Some(DeriveValue {
                tokens: Literal::string("SRC").into_token_stream(),
            })
        );
        assert!(fields[1].hidden && fields[1].no_init);
        assert_eq!(
            fields[1].default,
            DeriveDefault::Explicit(DeriveValue {
                tokens: quote! { ::std::default::Default::default() }
            })
        );
        assert_eq!(
            fields[2].nargs,
            Some(DeriveValue {
                tokens: quote! { Nargs::AtLeastOne }
            })
        );
        assert_eq!(
            fields[2].choices,
            Some(DeriveValue {
                tokens: quote! { ["x", "y"] }
            })
        );
        assert_eq!(
            fields[2].default,
            DeriveDefault::Implicit(DeriveValue {
                tokens: quote! { ::nestarg::Value::List(::std::vec::Vec::new()) }
            })
        );
        assert_eq!(
            fields[3].decoding_fn,
            Some(DeriveValue {
                tokens: quote! { positive }
            })
        );
        assert_eq!(fields[3].default, DeriveDefault::Missing);
        assert_eq!(
            fields[4].default,
            DeriveDefault::Implicit(DeriveValue {
                tokens: quote! { ::nestarg::Value::None }
            })
        );
        assert_eq!(
            fields[4].field_type,
            DeriveValue {
                tokens: quote! { Option<u32> }
            }
        );
    }

    #[test]
    fn construct_field_base() {
        // Setup
        let input: syn::ItemStruct = syn::parse_str(
            r#"
                struct Derived {
                    #[nestarg(base)]
                    parent: Parent,
                }
            "#,
        )
        .unwrap();

        // Execute
        let field = DeriveField::try_from(input.fields.iter().next().unwrap()).unwrap();

        // Verify
        assert!(field.base);
        assert_eq!(field.default, DeriveDefault::Missing);
    }

    #[test]
    fn construct_field_incompatible() {
        // Setup
        let input: syn::ItemStruct = syn::parse_str(
            r#"
                struct Derived {
                    #[nestarg(base, positional)]
                    parent: Parent,
                    #[nestarg(default, default = 1)]
                    count: i64,
                }
            "#,
        )
        .unwrap();

        // Execute
        let errors: Vec<String> = input
            .fields
            .iter()
            .map(|field| DeriveField::try_from(field).unwrap_err().to_string())
            .collect();

        // Verify
        assert_eq!(
            errors,
            vec![
                "Invalid - field cannot be both `#[nestarg(base)]` and `#[nestarg(positional)]`.",
                "Invalid - field cannot be both `#[nestarg(default)]` and `#[nestarg(default = ..)]`.",
            ]
        );
    }

    #[test]
    fn construct_record_invalid() {
        for source in [
            "enum Choice { A }",
            "struct Tuple(i64);",
            "struct Generic<T> { value: T }",
        ] {
            let input: syn::DeriveInput = syn::parse_str(source).unwrap();
            assert!(DeriveRecord::try_from(input).is_err(), "{source}");
        }
    }

    fn ident(name: &str) -> syn::Ident {
        syn::Ident::new(name, Span::call_site())
    }
}
