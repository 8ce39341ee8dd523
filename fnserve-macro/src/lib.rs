//! Procedural macros for the fnserve function server.
//!
//! This crate provides the `#[api_function]` attribute, which turns a plain
//! Rust function into an `ApiFunction` whose parameter table is derived from
//! the function signature.
//!
//! # Example
//!
//! ```ignore
//! use fnserve::prelude::*;
//!
//! /// Add two numbers.
//! #[api_function]
//! fn add(a: i64, b: i64) -> i64 {
//!     a + b
//! }
//!
//! // Generates `AddFunction`, declaring `a: integer` and `b: integer`.
//! ```

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, punctuated::Punctuated, Expr, ExprLit, FnArg, GenericArgument, ItemFn,
    Lit, Meta, Pat, PathArguments, ReturnType, Token, Type,
};

/// Attributes for the `#[api_function]` macro.
#[derive(Default, Debug)]
struct ApiFunctionAttrs {
    /// Reported function name.
    name: Option<String>,
    /// Optional description.
    description: Option<String>,
}

impl ApiFunctionAttrs {
    fn parse_meta_list(metas: Punctuated<Meta, Token![,]>) -> syn::Result<Self> {
        let mut attrs = ApiFunctionAttrs::default();

        for meta in metas {
            let nv = match meta {
                Meta::NameValue(nv) => nv,
                other => return Err(syn::Error::new_spanned(other, "expected name = value")),
            };

            let ident = nv
                .path
                .get_ident()
                .ok_or_else(|| syn::Error::new_spanned(&nv.path, "expected identifier"))?
                .to_string();

            let value = match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(lit_str),
                    ..
                }) => lit_str.value(),
                _ => return Err(syn::Error::new_spanned(&nv.value, "expected string literal")),
            };

            match ident.as_str() {
                "name" => attrs.name = Some(value),
                "description" => attrs.description = Some(value),
                _ => {
                    return Err(syn::Error::new_spanned(
                        nv.path,
                        format!("unknown attribute: {}", ident),
                    ))
                }
            }
        }

        Ok(attrs)
    }
}

/// Expose a function as an fnserve endpoint handler.
///
/// Generates a unit struct named `<PascalCaseName>Function` implementing
/// `fnserve::function::ApiFunction`. The original function is kept as is.
///
/// Parameter types map onto declared types as follows:
///
/// - integer primitives → `integer`
/// - `f32`, `f64` → `float`
/// - `String` → `string`
/// - `bool` → `boolean`
/// - `Vec<T>` → `list<T>`
/// - `Option<T>` → `T`, not required
/// - anything else → `any`, deserialized with serde
///
/// A `Result<T, E>` return reports `Err` as a handler failure (HTTP 500),
/// unless `E` is `fnserve::ApiError`, which is passed through unchanged.
///
/// # Attributes
///
/// - `name` (optional): reported name (default: the function name)
/// - `description` (optional): listing description (default: first doc line)
#[proc_macro_attribute]
pub fn api_function(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args with Punctuated::<Meta, Token![,]>::parse_terminated);
    let input_fn = parse_macro_input!(input as ItemFn);

    match generate_api_function(args, input_fn) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate_api_function(
    args: Punctuated<Meta, Token![,]>,
    input_fn: ItemFn,
) -> syn::Result<proc_macro2::TokenStream> {
    let attrs = ApiFunctionAttrs::parse_meta_list(args)?;
    let sig = &input_fn.sig;

    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "api_function does not support generic functions",
        ));
    }

    let fn_name = &sig.ident;
    let fn_vis = &input_fn.vis;
    let name = attrs.name.unwrap_or_else(|| fn_name.to_string());
    let description = match attrs.description.or_else(|| first_doc_line(&input_fn)) {
        Some(text) => quote!(::std::option::Option::Some(#text)),
        None => quote!(::std::option::Option::None),
    };
    let struct_name = format_ident!("{}Function", to_pascal_case(&fn_name.to_string()));

    let mut specs = Vec::new();
    let mut bindings = Vec::new();
    let mut arg_idents = Vec::new();

    for input in &sig.inputs {
        let typed = match input {
            FnArg::Typed(typed) => typed,
            FnArg::Receiver(recv) => {
                return Err(syn::Error::new_spanned(
                    recv,
                    "api_function cannot be used on methods",
                ))
            }
        };

        let ident = match &*typed.pat {
            Pat::Ident(pat) => &pat.ident,
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "parameters must be plain identifiers",
                ))
            }
        };

        let ty = &*typed.ty;
        if let Type::Reference(_) = ty {
            return Err(syn::Error::new_spanned(ty, "parameters must be owned types"));
        }

        let param_name = ident.to_string().trim_start_matches("r#").to_string();
        let param_type = param_type_tokens(ty);
        let required = option_inner(ty).is_none();

        specs.push(quote! {
            .param(::fnserve::function::ParamSpec::new(#param_name, #param_type, #required))
        });
        bindings.push(quote! {
            let #ident: #ty = __fnserve_args.get(#param_name)?;
        });
        arg_idents.push(ident);
    }

    let await_call = if sig.asyncness.is_some() {
        quote!(.await)
    } else {
        quote!()
    };

    let output = if returns_result(&sig.output) {
        quote! {
            match output {
                ::std::result::Result::Ok(value) => ::fnserve::function::to_data(value),
                ::std::result::Result::Err(err) => {
                    ::std::result::Result::Err(::fnserve::ApiError::from_handler(err))
                }
            }
        }
    } else {
        quote!(::fnserve::function::to_data(output))
    };

    let expanded = quote! {
        /// Generated endpoint handler.
        #[derive(Debug, Default, Clone, Copy)]
        #fn_vis struct #struct_name;

        impl #struct_name {
            /// Create a new instance of the handler.
            pub fn new() -> Self {
                Self
            }
        }

        #[::fnserve::__private::async_trait]
        impl ::fnserve::function::ApiFunction for #struct_name {
            fn name(&self) -> &str {
                #name
            }

            fn description(&self) -> ::std::option::Option<&str> {
                #description
            }

            fn parameters(&self) -> ::fnserve::function::ParameterSpec {
                ::fnserve::function::ParameterSpec::new()
                    #(#specs)*
            }

            #[allow(unused_variables)]
            async fn call(
                &self,
                __fnserve_args: ::fnserve::function::Args,
            ) -> ::std::result::Result<::fnserve::__private::Value, ::fnserve::ApiError> {
                #(#bindings)*
                let output = #fn_name(#(#arg_idents),*) #await_call;
                #output
            }
        }

        #input_fn
    };

    Ok(expanded)
}

/// Tokens building the `ParamType` for a Rust type.
fn param_type_tokens(ty: &Type) -> proc_macro2::TokenStream {
    let pt = quote!(::fnserve::function::ParamType);

    if let Some(inner) = option_inner(ty) {
        return param_type_tokens(inner);
    }

    let Some(segment) = last_segment(ty) else {
        return quote!(#pt::Any);
    };

    match segment.ident.to_string().as_str() {
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
        | "u128" | "usize" => quote!(#pt::Integer),
        "f32" | "f64" => quote!(#pt::Float),
        "String" => quote!(#pt::String),
        "bool" => quote!(#pt::Boolean),
        "Vec" => match first_generic(segment) {
            Some(inner) => {
                let inner = param_type_tokens(inner);
                quote!(#pt::List(::std::boxed::Box::new(#inner)))
            }
            None => quote!(#pt::Any),
        },
        _ => quote!(#pt::Any),
    }
}

fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(tp) if tp.qself.is_none() => tp.path.segments.last(),
        Type::Paren(paren) => last_segment(&paren.elem),
        Type::Group(group) => last_segment(&group.elem),
        _ => None,
    }
}

fn first_generic(segment: &syn::PathSegment) -> Option<&Type> {
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => args.args.iter().find_map(|arg| match arg {
            GenericArgument::Type(ty) => Some(ty),
            _ => None,
        }),
        _ => None,
    }
}

/// `Some(T)` when `ty` is `Option<T>`.
fn option_inner(ty: &Type) -> Option<&Type> {
    let segment = last_segment(ty)?;
    if segment.ident == "Option" {
        first_generic(segment)
    } else {
        None
    }
}

fn returns_result(output: &ReturnType) -> bool {
    match output {
        ReturnType::Default => false,
        ReturnType::Type(_, ty) => last_segment(ty)
            .map(|segment| segment.ident == "Result")
            .unwrap_or(false),
    }
}

/// First non-empty line of the function's doc comment.
fn first_doc_line(input_fn: &ItemFn) -> Option<String> {
    input_fn
        .attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .find_map(|attr| match &attr.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(lit_str),
                    ..
                }) => {
                    let line = lit_str.value().trim().to_string();
                    (!line.is_empty()).then_some(line)
                }
                _ => None,
            },
            _ => None,
        })
}

/// Convert a snake_case string to PascalCase.
fn to_pascal_case(s: &str) -> String {
    s.trim_start_matches("r#")
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(src: &str) -> Type {
        syn::parse_str(src).unwrap()
    }

    #[test]
    fn test_to_pascal_case() {
        assert_eq!(to_pascal_case("add"), "Add");
        assert_eq!(to_pascal_case("slow_square"), "SlowSquare");
        assert_eq!(to_pascal_case("r#type"), "Type");
    }

    #[test]
    fn test_param_type_mapping() {
        let render = |src: &str| param_type_tokens(&ty(src)).to_string().replace(' ', "");
        assert!(render("i64").ends_with("ParamType::Integer"));
        assert!(render("u8").ends_with("ParamType::Integer"));
        assert!(render("f32").ends_with("ParamType::Float"));
        assert!(render("std::string::String").ends_with("ParamType::String"));
        assert!(render("Option<bool>").ends_with("ParamType::Boolean"));
        assert!(render("Vec<f64>").contains("List(::std::boxed::Box::new(::fnserve::function::ParamType::Float))"));
        assert!(render("Point").ends_with("ParamType::Any"));
        assert!(render("(i64, i64)").ends_with("ParamType::Any"));
    }

    #[test]
    fn test_option_and_result_detection() {
        assert!(option_inner(&ty("Option<String>")).is_some());
        assert!(option_inner(&ty("String")).is_none());

        let output: ReturnType = syn::parse_str("-> Result<f64, String>").unwrap();
        assert!(returns_result(&output));
        let output: ReturnType = syn::parse_str("-> f64").unwrap();
        assert!(!returns_result(&output));
        assert!(!returns_result(&ReturnType::Default));
    }
}
