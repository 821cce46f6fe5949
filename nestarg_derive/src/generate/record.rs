use proc_macro2::TokenStream as TokenStream2;
use quote::quote;

use crate::model::{DeriveDefault, DeriveField, DeriveRecord, DeriveValue};

impl TryFrom<DeriveRecord> for TokenStream2 {
    type Error = syn::Error;

    fn try_from(value: DeriveRecord) -> Result<Self, Self::Error> {
        let DeriveRecord {
            struct_name,
            record_name,
            help,
            fields,
        } = value;
        let help = help.map(|DeriveValue { tokens }| quote! { .help(#tokens) });
        let declarations: Vec<TokenStream2> = fields.iter().map(declaration).collect();
        let extractions: Vec<TokenStream2> = fields.iter().map(extraction).collect();
        let settings: Vec<TokenStream2> = fields.iter().map(setting).collect();

        Ok(quote! {
            impl ::nestarg::Record for #struct_name {
                fn declaration() -> ::nestarg::RecordDecl {
                    ::nestarg::RecordDecl::new(#record_name) #help #( #declarations )*
                }
            }

            impl ::nestarg::FieldValue for #struct_name {
                fn field_type() -> ::nestarg::FieldType {
                    ::nestarg::FieldType::record::<#struct_name>()
                }

                fn from_value(value: &::nestarg::Value) -> ::std::result::Result<Self, ::nestarg::DecodeError> {
                    let instance = value.record_instance(#record_name)?;
                    ::std::result::Result::Ok(Self { #( #extractions )* })
                }

                fn to_value(&self) -> ::nestarg::Value {
                    let mut instance = ::nestarg::Instance::new(#record_name);
                    #( #settings )*
                    ::nestarg::Value::Record(instance)
                }
            }
        })
    }
}

fn declaration(field: &DeriveField) -> TokenStream2 {
    let DeriveField {
        field_name,
        field_type: DeriveValue { tokens: field_type },
        ..
    } = field;

    if field.base {
        return quote! {
            .extends(::nestarg::RecordRef::of::<#field_type>())
        };
    }

    let name = field_name.to_string();
    let default = match &field.default {
        DeriveDefault::Missing => None,
        DeriveDefault::Implicit(DeriveValue { tokens }) => Some(quote! {
            .default(#tokens)
        }),
        DeriveDefault::Explicit(DeriveValue { tokens }) => Some(quote! {
            .default_factory(|| {
                let value: #field_type = #tokens;
                ::nestarg::FieldValue::to_value(&value)
            })
        }),
    };
    let help = field.help.as_ref().map(|DeriveValue { tokens }| quote! { .help(#tokens) });
    let aliases = field.aliases.iter().map(|DeriveValue { tokens }| quote! { .alias(#tokens) });
    let positional = field.positional.then(|| quote! { .positional() });
    let hidden = field.hidden.then(|| quote! { .hidden() });
    let no_init = field.no_init.then(|| quote! { .no_init() });
    let overrides = [
        (&field.nargs, quote! { nargs }),
        (&field.choices, quote! { choices }),
        (&field.metavar, quote! { metavar }),
        (&field.decoding_fn, quote! { decoding_fn }),
        (&field.encoding_fn, quote! { encoding_fn }),
    ]
    .into_iter()
    .filter_map(|(value, method)| {
        value
            .as_ref()
            .map(|DeriveValue { tokens }| quote! { .#method(#tokens) })
    });

    quote! {
        .field(
            ::nestarg::Field::new(#name, <#field_type as ::nestarg::FieldValue>::field_type())
                #default #help #( #aliases )* #positional #hidden #no_init #( #overrides )*
        )
    }
}

fn extraction(field: &DeriveField) -> TokenStream2 {
    let DeriveField {
        field_name,
        field_type: DeriveValue { tokens: field_type },
        ..
    } = field;

    if field.base {
        // The base record views the same instance under its own name.
        quote! {
            #field_name: <#field_type as ::nestarg::FieldValue>::from_value(
                &::nestarg::Value::Record(
                    instance.retyped(<#field_type as ::nestarg::Record>::declaration().name())
                )
            )?,
        }
    } else {
        let name = field_name.to_string();
        quote! {
            #field_name: instance.extract(#name)?,
        }
    }
}

fn setting(field: &DeriveField) -> TokenStream2 {
    let field_name = &field.field_name;

    if field.base {
        quote! {
            if let ::nestarg::Value::Record(base) = ::nestarg::FieldValue::to_value(&self.#field_name) {
                for (name, value) in base.fields() {
                    instance.set(name, value.clone());
                }
            }
        }
    } else {
        let name = field_name.to_string();
        quote! {
            instance.set(#name, ::nestarg::FieldValue::to_value(&self.#field_name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::test::ident;

    fn field(name: &str, field_type: TokenStream2) -> DeriveField {
        DeriveField {
            field_name: ident(name),
            field_type: DeriveValue { tokens: field_type },
            base: false,
            default: DeriveDefault::Missing,
            help: None,
            aliases: Vec::default(),
            positional: false,
            hidden: false,
            no_init: false,
            nargs: None,
            choices: None,
            metavar: None,
            decoding_fn: None,
            encoding_fn: None,
        }
    }

    #[test]
    fn render_record_empty() {
        // Setup
        let record = DeriveRecord {
            struct_name: ident("Empty"),
            record_name: "Empty".to_string(),
            help: None,
            fields: Vec::default(),
        };

        // Execute
        let token_stream = TokenStream2::try_from(record).unwrap();

        // Verify
        assert_eq!(
            token_stream.to_string(),
            quote! {
                impl ::nestarg::Record for Empty {
                    fn declaration() -> ::nestarg::RecordDecl {
                        ::nestarg::RecordDecl::new("Empty")
                    }
                }

                impl ::nestarg::FieldValue for Empty {
                    fn field_type() -> ::nestarg::FieldType {
                        ::nestarg::FieldType::record::<Empty>()
                    }

                    fn from_value(value: &::nestarg::Value) -> ::std::result::Result<Self, ::nestarg::DecodeError> {
                        let instance = value.record_instance("Empty")?;
                        ::std::result::Result::Ok(Self { })
                    }

                    fn to_value(&self) -> ::nestarg::Value {
                        let mut instance = ::nestarg::Instance::new("Empty");
                        ::nestarg::Value::Record(instance)
                    }
                }
            }
            .to_string()
        );
    }

    #[test]
    fn render_record() {
        // Setup
        let mut lr = field("lr", quote! { f64 });
        lr.default = DeriveDefault::Explicit(DeriveValue {
            tokens: quote! { 0.1 },
        });
        lr.help = Some(DeriveValue {
            tokens: quote! { "The rate." },
        });
        lr.aliases = vec![DeriveValue {
            tokens: quote! { "-l" },
        }];
        let mut cuda = field("cuda", quote! { bool });
        cuda.default = DeriveDefault::Implicit(DeriveValue {
            tokens: quote! { ::nestarg::Value::Bool(false) },
        });
        let record = DeriveRecord {
            struct_name: ident("Hparams"),
            record_name: "Hyper".to_string(),
            help: Some(DeriveValue {
                tokens: quote! { "The knobs." },
            }),
            fields: vec![lr, cuda],
        };

        // Execute
        let token_stream = TokenStream2::try_from(record).unwrap();

        // Verify
        assert_eq!(
            token_stream.to_string(),
            quote! {
                impl ::nestarg::Record for Hparams {
                    fn declaration() -> ::nestarg::RecordDecl {
                        ::nestarg::RecordDecl::new("Hyper")
                            .help("The knobs.")
                            .field(
                                ::nestarg::Field::new("lr", <f64 as ::nestarg::FieldValue>::field_type())
                                    .default_factory(|| {
                                        let value: f64 = 0.1;
                                        ::nestarg::FieldValue::to_value(&value)
                                    })
                                    .help("The rate.")
                                    .alias("-l")
                            )
                            .field(
                                ::nestarg::Field::new("cuda", <bool as ::nestarg::FieldValue>::field_type())
                                    .default(::nestarg::Value::Bool(false))
                            )
                    }
                }

                impl ::nestarg::FieldValue for Hparams {
                    fn field_type() -> ::nestarg::FieldType {
                        ::nestarg::FieldType::record::<Hparams>()
                    }

                    fn from_value(value: &::nestarg::Value) -> ::std::result::Result<Self, ::nestarg::DecodeError> {
                        let instance = value.record_instance("Hyper")?;
                        ::std::result::Result::Ok(Self {
                            lr: instance.extract("lr")?,
                            cuda: instance.extract("cuda")?,
                        })
                    }

                    fn to_value(&self) -> ::nestarg::Value {
                        let mut instance = ::nestarg::Instance::new("Hyper");
                        instance.set("lr", ::nestarg::FieldValue::to_value(&self.lr));
                        instance.set("cuda", ::nestarg::FieldValue::to_value(&self.cuda));
                        ::nestarg::Value::Record(instance)
                    }
                }
            }
            .to_string()
        );
    }

    #[test]
    fn render_field_overrides() {
        // Setup
        let mut tags = field("tags", quote! { Vec<String> });
        tags.positional = true;
        tags.hidden = true;
        tags.no_init = true;
        tags.nargs = Some(DeriveValue {
            tokens: quote! { Nargs::AtLeastOne },
        });
        tags.metavar = Some(DeriveValue {
            tokens: quote! { "TAG" },
        });
        tags.decoding_fn = Some(DeriveValue {
            tokens: quote! { lower },
        });

        // Execute
        let token_stream = declaration(&tags);

        // Verify
        assert_eq!(
            token_stream.to_string(),
            quote! {
                .field(
                    ::nestarg::Field::new("tags", <Vec<String> as ::nestarg::FieldValue>::field_type())
                        .positional()
                        .hidden()
                        .no_init()
                        .nargs(Nargs::AtLeastOne)
                        .metavar("TAG")
                        .decoding_fn(lower)
                )
            }
            .to_string()
        );
    }

    #[test]
    fn render_base() {
        // Setup
        let mut parent = field("parent", quote! { Parent });
        parent.base = true;

        // Execute
        let declared = declaration(&parent);
        let extracted = extraction(&parent);
        let set = setting(&parent);

        // Verify
        assert_eq!(
            declared.to_string(),
            quote! { .extends(::nestarg::RecordRef::of::<Parent>()) }.to_string()
        );
        assert_eq!(
            extracted.to_string(),
            quote! {
                parent: <Parent as ::nestarg::FieldValue>::from_value(
                    &::nestarg::Value::Record(
                        instance.retyped(<Parent as ::nestarg::Record>::declaration().name())
                    )
                )?,
            }
            .to_string()
        );
        assert_eq!(
            set.to_string(),
            quote! {
                if let ::nestarg::Value::Record(base) = ::nestarg::FieldValue::to_value(&self.parent) {
                    for (name, value) in base.fields() {
                        instance.set(name, value.clone());
                    }
                }
            }
            .to_string()
        );
    }
}
