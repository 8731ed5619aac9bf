//! Small derive and attribute macros shared by the `semtour` crates.

mod kv_display;
mod timer;
mod utils;
mod with_methods;

use proc_macro::TokenStream;

/// Logs the wall-clock time of the annotated function at `debug` level when it returns.
///
/// `#[timer("pipeline.embed")]` uses the given label, `#[timer]` falls back to the function name.
#[proc_macro_attribute]
pub fn timer(attr: TokenStream, item: TokenStream) -> TokenStream {
    timer::timer_inner(attr, item)
}

#[proc_macro_derive(KvDisplay, attributes(kv))]
pub fn derive_kv_display(item: TokenStream) -> TokenStream {
    kv_display::derive_kv_display_inner(item)
}

#[proc_macro_derive(WithMethods, attributes(with))]
pub fn derive_with_methods(item: TokenStream) -> TokenStream {
    with_methods::derive_with_methods_inner(item)
}
