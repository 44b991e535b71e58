use proc_macro::TokenStream;
use quote::quote;
use syn::parse::Parser;
use syn::{parse_macro_input, ImplItem, Item, ItemFn, LitStr};

#[derive(Clone, Copy)]
enum Format {
    Table,
    Json,
    JsonPretty,
}

impl Format {
    fn to_tokens(self) -> proc_macro2::TokenStream {
        match self {
            Format::Table => quote!(probekit::Format::Table),
            Format::Json => quote!(probekit::Format::Json),
            Format::JsonPretty => quote!(probekit::Format::JsonPretty),
        }
    }
}

#[derive(Clone, Copy)]
enum Scope {
    Tree,
    Flat,
    Timeline,
}

impl Scope {
    fn to_tokens(self) -> proc_macro2::TokenStream {
        match self {
            Scope::Tree => quote!(probekit::Scope::Tree),
            Scope::Flat => quote!(probekit::Scope::Flat),
            Scope::Timeline => quote!(probekit::Scope::Timeline),
        }
    }
}

/// Installs a [`Profiler`](../probekit/struct.Profiler.html) for the duration of
/// the function and prints the merged call tree when it returns.
///
/// The function body itself is measured with a `WallClock`.
///
/// # Parameters
///
/// * `format` - Output format as a string: `"table"` (default), `"json"`, or `"json-pretty"`
///
/// # Examples
///
/// ```rust,no_run
/// #[probekit::main]
/// fn main() {
///     // Your code here
/// }
/// ```
///
/// ```rust,no_run
/// #[probekit::main(format = "json-pretty")]
/// fn main() {
///     // Your code here
/// }
/// ```
///
/// # Limitations
///
/// Only one profiler can be alive at a time. Creating a second one (either via this
/// macro or via [`ProfilerBuilder`](../probekit/struct.ProfilerBuilder.html)) will panic.
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;

    let mut format = Format::Table;

    if !attr.is_empty() {
        let parser = syn::meta::parser(|meta| {
            if meta.path.is_ident("format") {
                meta.input.parse::<syn::Token![=]>()?;
                let lit: LitStr = meta.input.parse()?;
                format =
                    match lit.value().as_str() {
                        "table" => Format::Table,
                        "json" => Format::Json,
                        "json-pretty" => Format::JsonPretty,
                        other => return Err(meta.error(format!(
                            "Unknown format {:?}. Expected one of: \"table\", \"json\", \"json-pretty\"",
                            other
                        ))),
                    };
                return Ok(());
            }

            Err(meta.error("Unknown parameter. Supported: format=\"..\""))
        });

        if let Err(e) = parser.parse2(proc_macro2::TokenStream::from(attr)) {
            return e.to_compile_error().into();
        }
    }

    let format_token = format.to_tokens();
    let asyncness = sig.asyncness.is_some();
    let fn_name = &sig.ident;

    let body = quote! {
        let caller_name: &'static str =
            concat!(module_path!(), "::", stringify!(#fn_name));
        let _probekit = probekit::ProfilerBuilder::new(caller_name)
            .format(#format_token)
            .build();
        let _probekit_main = probekit::AutoTuple::<(probekit::components::WallClock,)>::new(caller_name);
        #block
    };

    let wrapped_body = if asyncness {
        quote! { async { #body }.await }
    } else {
        body
    };

    let output = quote! {
        #vis #sig {
            #wrapped_body
        }
    };

    output.into()
}

/// Wraps a function body in an `AutoTuple` of the listed components, keyed by
/// the function path.
///
/// Without arguments a `WallClock` is used. `scope = "flat" | "timeline" | "tree"`
/// selects where the node is inserted in the call graph.
///
/// # Examples
///
/// ```rust,no_run
/// use probekit::components::{PeakRss, WallClock};
///
/// #[probekit::measure(WallClock, PeakRss)]
/// fn load() -> Vec<u8> {
///     vec![0; 1 << 20]
/// }
///
/// #[probekit::measure(scope = "flat")]
/// fn leaf() {}
/// ```
///
/// Async functions are measured too, but components that read per-thread
/// counters are only meaningful when the future stays on one thread.
#[proc_macro_attribute]
pub fn measure(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    let mut types: Vec<syn::Path> = Vec::new();
    let mut scope: Option<Scope> = None;

    if !attr.is_empty() {
        let parser = syn::meta::parser(|meta| {
            if meta.path.is_ident("scope") && meta.input.peek(syn::Token![=]) {
                meta.input.parse::<syn::Token![=]>()?;
                let lit: LitStr = meta.input.parse()?;
                scope = Some(match lit.value().as_str() {
                    "tree" => Scope::Tree,
                    "flat" => Scope::Flat,
                    "timeline" => Scope::Timeline,
                    other => {
                        return Err(meta.error(format!(
                            "Unknown scope {:?}. Expected one of: \"tree\", \"flat\", \"timeline\"",
                            other
                        )))
                    }
                });
                return Ok(());
            }

            if meta.input.is_empty() || meta.input.peek(syn::Token![,]) {
                types.push(meta.path.clone());
                return Ok(());
            }

            Err(meta.error("Expected a component type or scope=\"..\""))
        });

        if let Err(e) = parser.parse2(proc_macro2::TokenStream::from(attr)) {
            return e.to_compile_error().into();
        }
    }

    instrument(input, &types, scope).into()
}

fn instrument(input: ItemFn, types: &[syn::Path], scope: Option<Scope>) -> proc_macro2::TokenStream {
    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;

    let name = sig.ident.to_string();
    let asyncness = sig.asyncness.is_some();

    let components = if types.is_empty() {
        quote!((probekit::components::WallClock,))
    } else {
        quote!((#(#types,)*))
    };
    let options = match scope {
        Some(scope) => {
            let scope = scope.to_tokens();
            quote!(probekit::AutoOptions::default().scope(#scope))
        }
        None => quote!(probekit::AutoOptions::default()),
    };

    let guard_init = quote! {
        let _probekit_guard = probekit::AutoTuple::<#components>::with_options(
            concat!(module_path!(), "::", #name),
            #options,
        );
        #block
    };

    let wrapped = if asyncness {
        quote! { async { #guard_init }.await }
    } else {
        guard_init
    };

    quote! {
        #(#attrs)*
        #vis #sig {
            #wrapped
        }
    }
}

/// Marks a function to be excluded from [`measure_all`](macro@measure_all).
#[proc_macro_attribute]
pub fn skip(_attr: TokenStream, item: TokenStream) -> TokenStream {
    item
}

/// Applies [`measure`](macro@measure) with its default `WallClock` to every
/// function of a module or impl block, except those marked with
/// [`skip`](macro@skip).
///
/// ```rust,no_run
/// struct Parser;
///
/// #[probekit::measure_all]
/// impl Parser {
///     fn tokenize(&self) {}
///
///     #[probekit::skip]
///     fn peek(&self) {}
/// }
/// ```
#[proc_macro_attribute]
pub fn measure_all(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let parsed_item = parse_macro_input!(item as Item);

    match parsed_item {
        Item::Mod(mut module) => {
            if let Some((_brace, items)) = &mut module.content {
                for it in items.iter_mut() {
                    if let Item::Fn(func) = it {
                        if !has_skip(&func.attrs) {
                            let transformed = instrument(func.clone(), &[], None);
                            *func = match syn::parse2(transformed) {
                                Ok(func) => func,
                                Err(e) => return e.to_compile_error().into(),
                            };
                        }
                    }
                }
            }
            TokenStream::from(quote!(#module))
        }
        Item::Impl(mut impl_block) => {
            for item in impl_block.items.iter_mut() {
                if let ImplItem::Fn(method) = item {
                    if !has_skip(&method.attrs) {
                        let func = ItemFn {
                            attrs: method.attrs.clone(),
                            vis: method.vis.clone(),
                            sig: method.sig.clone(),
                            block: Box::new(method.block.clone()),
                        };
                        let transformed = instrument(func, &[], None);
                        *method = match syn::parse2(transformed) {
                            Ok(method) => method,
                            Err(e) => return e.to_compile_error().into(),
                        };
                    }
                }
            }
            TokenStream::from(quote!(#impl_block))
        }
        other => syn::Error::new_spanned(
            other,
            "measure_all can only be applied to modules or impl blocks",
        )
        .to_compile_error()
        .into(),
    }
}

fn has_skip(attrs: &[syn::Attribute]) -> bool {
    attrs.iter().any(|attr| {
        let path = attr.path();
        path.is_ident("skip")
            || (path.segments.len() == 2
                && path.segments[0].ident == "probekit"
                && path.segments[1].ident == "skip")
    })
}
