use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{DeriveInput, LitStr, parse_macro_input, spanned::Spanned};

use crate::utils;

/// Renders a struct as aligned `key = value` lines, one field per line.
///
/// Field attributes: `#[kv(name = "...")]` renames the key, `#[kv(fmt = "...")]`
/// picks `display` (default), `debug`, or `len`, and `#[kv(skip)]` hides the field.
pub fn derive_kv_display_inner(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let fields = match utils::named_fields(&input, "KvDisplay") {
        Ok(fields) => fields,
        Err(err) => return err.to_compile_error().into(),
    };
    let struct_ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut keys = Vec::new();
    let mut vals = Vec::new();

    for field in &fields.named {
        let Some(field_ident) = &field.ident else {
            continue;
        };
        let mut key = field_ident.to_string();
        let mut fmt_mode = String::from("display");
        let mut skip = false;

        for attr in &field.attrs {
            if !attr.path().is_ident("kv") {
                continue;
            }
            let parsed = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    skip = true;
                    return Ok(());
                }
                if meta.path.is_ident("name") {
                    let lit: LitStr = meta.value()?.parse()?;
                    key = lit.value();
                    return Ok(());
                }
                if meta.path.is_ident("fmt") {
                    let lit: LitStr = meta.value()?.parse()?;
                    fmt_mode = lit.value();
                    return Ok(());
                }
                Err(meta.error("unsupported kv attribute; expected name/fmt/skip"))
            });
            if let Err(err) = parsed {
                return err.to_compile_error().into();
            }
        }
        if skip {
            continue;
        }

        let val = match fmt_mode.as_str() {
            "display" => quote! { format!("{}", &self.#field_ident) },
            "debug" => quote! { format!("{:?}", &self.#field_ident) },
            "len" => quote! { format!("{}", self.#field_ident.len()) },
            other => {
                return syn::Error::new(field.span(), format!("unsupported kv fmt mode: {other}"))
                    .to_compile_error()
                    .into();
            }
        };
        keys.push(key);
        vals.push(val);
    }

    let width = keys.iter().map(String::len).max().unwrap_or(0);
    let lines: Vec<String> = keys
        .iter()
        .map(|key| format!("\t{key:<width$} = {{}}"))
        .collect();
    let format_lit = LitStr::new(&format!("\n{}", lines.join("\n")), Span::call_site());

    TokenStream::from(quote! {
        impl #impl_generics ::std::fmt::Display for #struct_ident #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, #format_lit, #(#vals),*)
            }
        }
    })
}
