use syn::{
    AngleBracketedGenericArguments, Data, DeriveInput, Fields, FieldsNamed, GenericArgument,
    PathArguments, Type, TypePath, spanned::Spanned,
};

/// Returns `T` for `Option<T>`, `std::option::Option<T>` and `core::option::Option<T>`.
pub fn inner_of_option(ty: &Type) -> Option<&Type> {
    let Type::Path(TypePath { path, .. }) = ty else {
        return None;
    };

    let is_option = match path.segments.len() {
        1 => path.segments[0].ident == "Option",
        3 => {
            (path.segments[0].ident == "std" || path.segments[0].ident == "core")
                && path.segments[1].ident == "option"
                && path.segments[2].ident == "Option"
        }
        _ => false,
    };
    if !is_option {
        return None;
    }

    if let Some(seg) = path.segments.last()
        && let PathArguments::AngleBracketed(AngleBracketedGenericArguments { args, .. }) =
            &seg.arguments
        && args.len() == 1
        && let Some(GenericArgument::Type(inner)) = args.first()
    {
        return Some(inner);
    }
    None
}

/// Borrows the named fields of a struct or returns a spanned error naming the derive.
pub fn named_fields<'a>(input: &'a DeriveInput, derive: &str) -> syn::Result<&'a FieldsNamed> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new(
            input.span(),
            format!("{derive} can only be derived for structs"),
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new(
            input.ident.span(),
            format!("{derive} requires a struct with named fields"),
        ));
    };
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::inner_of_option;
    use syn::{Type, parse_quote};

    #[test]
    fn inner_of_option_unwraps_all_option_paths() {
        let types: [Type; 3] = [
            parse_quote!(Option<u32>),
            parse_quote!(std::option::Option<u32>),
            parse_quote!(core::option::Option<u32>),
        ];
        for ty in types {
            let inner = inner_of_option(&ty).expect("option type");
            let expected: Type = parse_quote!(u32);
            assert_eq!(inner, &expected);
        }
    }

    #[test]
    fn inner_of_option_ignores_other_types() {
        let ty: Type = parse_quote!(Vec<Option<u32>>);
        assert!(inner_of_option(&ty).is_none());
    }
}
