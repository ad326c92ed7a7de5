use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{Ident, ItemFn, LitStr, parse_macro_input};

fn static_name(prefix: &str, func: &ItemFn) -> Ident {
    let upper = func.sig.ident.to_string().to_uppercase();
    Ident::new(&format!("_{prefix}_REGISTER_{upper}"), Span::call_site())
}

fn non_empty(lit: &LitStr, what: &str) -> syn::Result<()> {
    if lit.value().trim().is_empty() {
        return Err(syn::Error::new(lit.span(), format!("{what} cannot be empty")));
    }
    Ok(())
}

fn expect_inputs(func: &ItemFn, count: usize, signature: &str) -> syn::Result<()> {
    if func.sig.inputs.len() != count {
        return Err(syn::Error::new_spanned(
            &func.sig,
            format!("expected a function of the form `{signature}`"),
        ));
    }
    if !func.sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &func.sig.generics,
            "registered functions cannot be generic",
        ));
    }
    Ok(())
}

/// Implementation of `#[register_module("path")]`.
///
/// Keeps the function and appends a `MODULE_REGISTRY` entry.  Async
/// functions are adapted to the synchronous factory signature by boxing
/// their future as a deferred value.
pub fn register_module(attr: TokenStream, item: TokenStream) -> TokenStream {
    let path = parse_macro_input!(attr as LitStr);
    let func = parse_macro_input!(item as ItemFn);

    let checked = non_empty(&path, "module path").and_then(|()| {
        expect_inputs(&func, 1, "fn(Arguments) -> FactoryResult")
    });
    if let Err(err) = checked {
        return err.into_compile_error().into();
    }

    let fn_name = &func.sig.ident;
    let static_name = static_name("MODULE", &func);

    let factory = if func.sig.asyncness.is_some() {
        quote! {
            |args| ::std::result::Result::Ok(::weave_core::Produced::deferred(#fn_name(args)))
        }
    } else {
        quote!(#fn_name)
    };

    quote! {
        #func

        #[::weave_core::linkme::distributed_slice(::weave_core::MODULE_REGISTRY)]
        #[linkme(crate = ::weave_core::linkme)]
        static #static_name: ::weave_core::ModuleEntry = ::weave_core::ModuleEntry {
            path: #path,
            factory: #factory,
        };
    }
    .into()
}

/// Implementation of `#[register_library("name")]`.
pub fn register_library(attr: TokenStream, item: TokenStream) -> TokenStream {
    let name = parse_macro_input!(attr as LitStr);
    let func = parse_macro_input!(item as ItemFn);

    let checked = non_empty(&name, "library name").and_then(|()| {
        if func.sig.asyncness.is_some() {
            return Err(syn::Error::new_spanned(
                &func.sig.asyncness,
                "libraries are loaded synchronously; remove `async`",
            ));
        }
        expect_inputs(&func, 0, "fn() -> ServiceValue")
    });
    if let Err(err) = checked {
        return err.into_compile_error().into();
    }

    let fn_name = &func.sig.ident;
    let static_name = static_name("LIBRARY", &func);

    quote! {
        #func

        #[::weave_core::linkme::distributed_slice(::weave_core::LIBRARY_REGISTRY)]
        #[linkme(crate = ::weave_core::linkme)]
        static #static_name: ::weave_core::LibraryEntry = ::weave_core::LibraryEntry {
            name: #name,
            load: #fn_name,
        };
    }
    .into()
}
