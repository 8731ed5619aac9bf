use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, Field, Ident, parse_macro_input};

use crate::utils;

#[derive(Default)]
struct WithAttr {
    skip: bool,
    rename: Option<Ident>,
}

fn parse_with_attr(field: &Field) -> syn::Result<WithAttr> {
    let mut parsed = WithAttr::default();

    for attr in &field.attrs {
        if !attr.path().is_ident("with") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                parsed.skip = true;
                return Ok(());
            }
            if meta.path.is_ident("rename") {
                let lit: syn::LitStr = meta.value()?.parse()?;
                parsed.rename = Some(format_ident!("with_{}", lit.value()));
                return Ok(());
            }
            Err(meta.error("unsupported with attribute; expected skip/rename"))
        })?;
    }

    Ok(parsed)
}

/// Generates `with_<field>(self, value) -> Self` builders for every named field.
///
/// `Option<T>` fields take `impl Into<T>` and store `Some`.
pub fn derive_with_methods_inner(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let fields = match utils::named_fields(&input, "WithMethods") {
        Ok(fields) => fields,
        Err(err) => return err.to_compile_error().into(),
    };

    let struct_ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let mut methods = Vec::new();

    for field in &fields.named {
        let Some(field_ident) = &field.ident else {
            continue;
        };
        let attr = match parse_with_attr(field) {
            Ok(attr) => attr,
            Err(err) => return err.to_compile_error().into(),
        };
        if attr.skip {
            continue;
        }

        let method_ident = attr
            .rename
            .unwrap_or_else(|| format_ident!("with_{}", field_ident));

        let method = match utils::inner_of_option(&field.ty) {
            Some(inner) => quote! {
                pub fn #method_ident(mut self, #field_ident: impl Into<#inner>) -> Self {
                    self.#field_ident = Some(#field_ident.into());
                    self
                }
            },
            None => {
                let ty = &field.ty;
                quote! {
                    pub fn #method_ident(mut self, #field_ident: impl Into<#ty>) -> Self {
                        self.#field_ident = #field_ident.into();
                        self
                    }
                }
            }
        };
        methods.push(method);
    }

    TokenStream::from(quote! {
        impl #impl_generics #struct_ident #ty_generics #where_clause {
            #(#methods)*
        }
    })
}
