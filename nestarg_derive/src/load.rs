mod attribute;
mod choice;
mod record;

pub(self) fn incompatible_error(
    field_name: &syn::Ident,
    left: impl Into<String>,
    right: impl Into<String>,
) -> syn::Error {
    syn::Error::new(
        field_name.span(),
        format!(
            "Invalid - field cannot be both `{}` and `{}`.",
            left.into(),
            right.into(),
        ),
    )
}

/// The Cli spelling of a Rust identifier (ex: `ConvNet` becomes `conv_net`).
pub(self) fn snake_case(ident: &syn::Ident) -> String {
    let mut out = String::default();

    for (i, c) in ident.to_string().chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }

            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proc_macro2::Span;
    use rstest::rstest;

    #[rstest]
    #[case("Mlp", "mlp")]
    #[case("ConvNet", "conv_net")]
    #[case("Adam_W", "adam_w")]
    #[case("lower", "lower")]
    fn snake_case_ident(#[case] ident: &str, #[case] expected: &str) {
        assert_eq!(snake_case(&syn::Ident::new(ident, Span::call_site())), expected);
    }
}
