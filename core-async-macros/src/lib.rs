//! Attribute macros that run an `async fn` on the `core_async` runtime.
//!
//! `#[core_async::test]` turns an async test into a plain `#[test]` that
//! drives its body with `core_async::runtime::block_on`; `#[core_async::main]`
//! does the same for a binary entry point.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, ItemFn};

#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(attr, item, true)
}

#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(attr, item, false)
}

fn expand(attr: TokenStream, item: TokenStream, is_test: bool) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new_spanned(
            TokenStream2::from(attr),
            "core_async attribute macros take no arguments",
        )
        .to_compile_error()
        .into();
    }

    let input = parse_macro_input!(item as ItemFn);
    if input.sig.asyncness.is_none() {
        return syn::Error::new_spanned(
            input.sig.fn_token,
            "core_async attribute macros require `async fn`",
        )
        .to_compile_error()
        .into();
    }

    let ItemFn {
        attrs,
        vis,
        mut sig,
        block,
    } = input;
    sig.asyncness = None;

    let test_attr = if is_test {
        quote!(#[test])
    } else {
        TokenStream2::new()
    };

    quote! {
        #(#attrs)*
        #test_attr
        #vis #sig {
            core_async::runtime::block_on(async move #block)
        }
    }
    .into()
}
