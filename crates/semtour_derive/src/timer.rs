use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemFn, LitStr, parse_macro_input};

pub fn timer_inner(attr: TokenStream, item: TokenStream) -> TokenStream {
    let label = if attr.is_empty() {
        None
    } else {
        match syn::parse::<LitStr>(attr) {
            Ok(lit) => Some(lit),
            Err(err) => return err.to_compile_error().into(),
        }
    };
    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = parse_macro_input!(item as ItemFn);

    let label = label
        .map(|lit| lit.value())
        .unwrap_or_else(|| sig.ident.to_string());

    TokenStream::from(quote! {
        #(#attrs)*
        #vis #sig {
            struct __TimerGuard(::std::time::Instant);

            impl ::core::ops::Drop for __TimerGuard {
                fn drop(&mut self) {
                    ::log::debug!(
                        "{}: elapsed={:.3}s",
                        #label,
                        self.0.elapsed().as_secs_f64()
                    );
                }
            }

            let __timer_guard = __TimerGuard(::std::time::Instant::now());
            #block
        }
    })
}
