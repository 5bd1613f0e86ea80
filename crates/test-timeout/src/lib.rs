//! Test attributes that run each test on a watchdog thread so a wedged
//! reconnect loop fails the test instead of hanging the suite.
//!
//! - `#[test_timeout::timeout]` wraps a synchronous test.
//! - `#[test_timeout::tokio_timeout_test]` wraps an async test in a fresh
//!   current-thread runtime. Pass `paused` to start the runtime with a paused
//!   clock so timer-driven code can be stepped deterministically.
//!
//! Both accept an optional timeout in seconds, either bare (`(5)`) or named
//! (`(secs = 5)`). The default is 60 seconds.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{parse_macro_input, Attribute, Ident, ItemFn, LitInt, Token};

const DEFAULT_TIMEOUT_SECS: u64 = 60;

struct TestOptions {
    secs: u64,
    paused: bool,
}

impl Parse for TestOptions {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut options = TestOptions {
            secs: DEFAULT_TIMEOUT_SECS,
            paused: false,
        };
        while !input.is_empty() {
            if input.peek(LitInt) {
                let lit: LitInt = input.parse()?;
                options.secs = positive_secs(&lit)?;
            } else {
                let ident: Ident = input.parse()?;
                match ident.to_string().as_str() {
                    "paused" => options.paused = true,
                    "secs" => {
                        input.parse::<Token![=]>()?;
                        let lit: LitInt = input.parse()?;
                        options.secs = positive_secs(&lit)?;
                    }
                    other => {
                        return Err(syn::Error::new(
                            ident.span(),
                            format!("unknown test option `{other}`"),
                        ));
                    }
                }
            }
            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(options)
    }
}

fn positive_secs(lit: &LitInt) -> syn::Result<u64> {
    let secs: u64 = lit.base10_parse()?;
    if secs == 0 {
        return Err(syn::Error::new(
            lit.span(),
            "timeout must be greater than zero",
        ));
    }
    Ok(secs)
}

#[proc_macro_attribute]
pub fn tokio_timeout_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let options = parse_macro_input!(attr as TestOptions);
    let ItemFn {
        attrs,
        vis,
        mut sig,
        block,
    } = parse_macro_input!(item as ItemFn);

    if sig.asyncness.is_none() {
        return syn::Error::new_spanned(
            &sig.ident,
            "tokio_timeout_test can only be applied to async functions",
        )
        .to_compile_error()
        .into();
    }
    sig.asyncness = None;

    let attrs = strip_attrs(attrs, &["tokio", "test"]);
    let secs = options.secs;

    // A paused clock auto-advances whenever the runtime idles, which would
    // trip an in-runtime timeout immediately; the watchdog thread covers it.
    let (builder, run) = if options.paused {
        (
            quote! {
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .start_paused(true)
                    .build()
            },
            quote! { runtime.block_on(async move #block); },
        )
    } else {
        (
            quote! {
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
            },
            quote! {
                runtime.block_on(async move {
                    tokio::time::timeout(
                        std::time::Duration::from_secs(#secs),
                        async move #block,
                    )
                    .await
                    .expect("test timed out");
                });
            },
        )
    };

    let body = quote! {
        let runtime = #builder.expect("failed to build Tokio runtime");
        #run
    };

    watchdog(&attrs, &vis, &sig, secs, body).into()
}

#[proc_macro_attribute]
pub fn timeout(attr: TokenStream, item: TokenStream) -> TokenStream {
    let options = parse_macro_input!(attr as TestOptions);
    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = parse_macro_input!(item as ItemFn);

    if sig.asyncness.is_some() {
        return syn::Error::new_spanned(
            &sig.ident,
            "timeout expects a synchronous test function; use tokio_timeout_test",
        )
        .to_compile_error()
        .into();
    }
    if options.paused {
        return syn::Error::new_spanned(
            &sig.ident,
            "`paused` only applies to tokio_timeout_test",
        )
        .to_compile_error()
        .into();
    }

    let attrs = strip_attrs(attrs, &["test"]);
    watchdog(&attrs, &vis, &sig, options.secs, quote! { #block }).into()
}

/// Emits a `#[test]` that runs `body` on its own thread and fails if it has
/// not reported back within `secs`.
fn watchdog(
    attrs: &[Attribute],
    vis: &syn::Visibility,
    sig: &syn::Signature,
    secs: u64,
    body: TokenStream2,
) -> TokenStream2 {
    quote! {
        #[test]
        #(#attrs)*
        #vis #sig {
            let limit = std::time::Duration::from_secs(#secs);
            let (report, outcome) = std::sync::mpsc::channel();
            std::thread::spawn(move || {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    #body
                }));
                let _ = report.send(result);
            });
            match outcome.recv_timeout(limit) {
                Ok(Ok(())) => {}
                Ok(Err(payload)) => std::panic::resume_unwind(payload),
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                    panic!("test exceeded {}s", #secs)
                }
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    panic!("test thread exited without reporting a result")
                }
            }
        }
    }
}

/// Drops attributes whose path matches `path` exactly (`#[test]`,
/// `#[tokio::test]`) so the generated `#[test]` is the only one.
fn strip_attrs(attrs: Vec<Attribute>, path: &[&str]) -> Vec<Attribute> {
    attrs
        .into_iter()
        .filter(|attr| {
            let segments: Vec<String> = attr
                .path()
                .segments
                .iter()
                .map(|segment| segment.ident.to_string())
                .collect();
            segments != path
        })
        .collect()
}
