use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse::Parse, parse::ParseStream, parse_macro_input, FnArg, Ident, ItemFn, Pat, Result, Token};

/// Export a Rust function as a JNI native method.
///
/// The function itself is kept as an ordinary Rust item. The macro adds a
/// `#[no_mangle] extern "system"` forwarder whose symbol follows the JNI
/// naming scheme (`Java_<class>_<method>`), so the JVM can resolve it when the
/// library is loaded with `System.loadLibrary`.
///
/// ```ignore
/// use edgeframe::jni_export;
///
/// #[jni_export(class = "com.example.myapplication.MainActivity", method = "processFrame")]
/// fn process_frame<'local>(env: JNIEnv<'local>, this: JObject<'local>, ...) -> jbyteArray {
///     ...
/// }
/// ```
///
/// Options:
/// - `class = <LitStr>`: required. Fully qualified Java class, `.` or `/` separated.
/// - `method = <LitStr>`: optional, defaults to the lowerCamelCase form of the function name.
///
/// The forwarder is the only panic boundary: a panic in the function is caught,
/// a `java.lang.RuntimeException` is thrown through the first (`JNIEnv`)
/// argument, and the return type's `edgeframe::boundary::OnPanic` value is
/// returned. Unwinding never reaches the JVM.
#[proc_macro_attribute]
pub fn jni_export(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as JniExportArgs);
    let item_fn = parse_macro_input!(item as ItemFn);

    match expand_jni_export(args, item_fn) {
        Ok(ts) => ts.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

struct JniExportArgs {
    class: syn::LitStr,
    method: Option<syn::LitStr>,
}

impl Parse for JniExportArgs {
    fn parse(input: ParseStream<'_>) -> Result<Self> {
        let mut class: Option<syn::LitStr> = None;
        let mut method: Option<syn::LitStr> = None;

        while !input.is_empty() {
            let key: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            if key == "class" {
                class = Some(input.parse()?);
            } else if key == "method" {
                method = Some(input.parse()?);
            } else {
                return Err(syn::Error::new_spanned(key, "unknown argument; expected `class` or `method`"));
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        let class = class.ok_or_else(|| syn::Error::new(input.span(), "missing required argument: `class`"))?;

        Ok(Self { class, method })
    }
}

fn expand_jni_export(args: JniExportArgs, item_fn: ItemFn) -> Result<TokenStream2> {
    let sig = &item_fn.sig;

    if sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(sig.asyncness, "JNI exports cannot be async"));
    }
    if sig.variadic.is_some() {
        return Err(syn::Error::new_spanned(&sig.variadic, "JNI exports cannot be variadic"));
    }

    let class = args.class.value();
    if class.is_empty() {
        return Err(syn::Error::new_spanned(&args.class, "`class` must not be empty"));
    }
    let method = match &args.method {
        Some(lit) => lit.value(),
        None => lower_camel_case(&sig.ident.to_string()),
    };

    let symbol_name = jni_symbol(&class, &method);
    let symbol = format_ident!("{}", symbol_name);

    // Forwarder parameters are plain `ident: Type`, whatever patterns the
    // original function used (`mut env`, `_this`, ...).
    let mut params = Vec::new();
    let mut forwarded = Vec::new();
    for (index, input) in sig.inputs.iter().enumerate() {
        match input {
            FnArg::Receiver(recv) => {
                return Err(syn::Error::new_spanned(recv, "JNI exports must be free functions"));
            }
            FnArg::Typed(pat_type) => {
                let ident = match pat_type.pat.as_ref() {
                    Pat::Ident(pat_ident) => pat_ident.ident.clone(),
                    _ => format_ident!("__arg{}", index),
                };
                let ty = &pat_type.ty;
                params.push(quote! { #ident: #ty });
                forwarded.push(ident);
            }
        }
    }

    let env = forwarded
        .first()
        .cloned()
        .ok_or_else(|| syn::Error::new_spanned(&sig.inputs, "JNI exports take the JNIEnv as first argument"))?;

    let inner = &sig.ident;
    let generics = &sig.generics;
    let where_clause = &sig.generics.where_clause;
    let output = &sig.output;

    let expanded = quote! {
        #item_fn

        #[doc(hidden)]
        #[allow(non_snake_case)]
        #[unsafe(no_mangle)]
        pub extern "system" fn #symbol #generics (#(#params),*) #output #where_clause {
            // SAFETY: only used once the closure owning the original env has
            // unwound; the env pointer stays valid for the whole native call.
            let mut __panic_env = unsafe { #env.unsafe_clone() };
            match ::edgeframe::boundary::contain(#symbol_name, move || #inner(#(#forwarded),*)) {
                Some(value) => value,
                None => {
                    ::edgeframe::jni::throw_panic(&mut __panic_env, #symbol_name);
                    ::edgeframe::boundary::OnPanic::on_panic()
                }
            }
        }
    };

    Ok(expanded)
}

/// Build the short-form JNI symbol for `method` on `class`.
fn jni_symbol(class: &str, method: &str) -> String {
    format!("Java_{}_{}", mangle(class), mangle(method))
}

/// Escape one JNI name component.
///
/// Package separators become `_`; `_`, `;` and `[` become `_1`, `_2`, `_3`;
/// anything outside ASCII alphanumerics becomes `_0xxxx` per UTF-16 unit.
fn mangle(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    for ch in component.chars() {
        match ch {
            '.' | '/' => out.push('_'),
            '_' => out.push_str("_1"),
            ';' => out.push_str("_2"),
            '[' => out.push_str("_3"),
            c if c.is_ascii_alphanumeric() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("_0{:04x}", unit));
                }
            }
        }
    }
    out
}

fn lower_camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper_next = false;
    for ch in snake.trim_start_matches('_').chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}
