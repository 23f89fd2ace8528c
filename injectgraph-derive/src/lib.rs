//! Derive macros for `injectgraph`'s parameter- and result-object records.
//!
//! - `#[derive(Params)]` — a parameter-object record, the Rust analogue of
//!   `dig.In`: fields are flattened into the container's demand tree,
//!   tagged with `#[di(optional)]`, `#[di(name = "...")]`, or
//!   `#[di(group = "...")]`.
//! - `#[derive(Results)]` — a result-object record, the analogue of
//!   `dig.Out`: fields are flattened into the container's production
//!   tree, tagged the same way (`optional` has no meaning on results and
//!   is rejected).
//!
//! Field tags are parsed with `syn`'s `parse_nested_meta`, walking each
//! `#[di(...)]` attribute on a field to build up its shape before code
//! generation.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

enum FieldKind {
    Optional,
    Named(String),
    Group(String),
    Plain,
}

fn parse_di_attr(attrs: &[syn::Attribute]) -> syn::Result<FieldKind> {
    let mut optional = false;
    let mut name: Option<String> = None;
    let mut group: Option<String> = None;

    for attr in attrs {
        if !attr.path().is_ident("di") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("optional") {
                optional = true;
                return Ok(());
            }
            if meta.path.is_ident("name") {
                let value = meta.value()?;
                let lit: syn::LitStr = value.parse()?;
                name = Some(lit.value());
                return Ok(());
            }
            if meta.path.is_ident("group") {
                let value = meta.value()?;
                let lit: syn::LitStr = value.parse()?;
                group = Some(lit.value());
                return Ok(());
            }
            Err(meta.error("unrecognized `di` tag; expected `optional`, `name`, or `group`"))
        })?;
    }

    if name.is_some() && group.is_some() {
        return Err(syn::Error::new_spanned(
            &attrs[0],
            "a field cannot carry both `name` and `group`",
        ));
    }

    Ok(match (optional, name, group) {
        (true, None, None) => FieldKind::Optional,
        (false, Some(n), None) => FieldKind::Named(n),
        (false, None, Some(g)) => FieldKind::Group(g),
        (false, None, None) => FieldKind::Plain,
        (true, Some(_), _) | (true, _, Some(_)) => {
            return Err(syn::Error::new_spanned(
                &attrs[0],
                "`optional` cannot be combined with `name` or `group`",
            ));
        }
    })
}

/// Extract `T` from a field type written as `Arc<T>`.
fn extract_arc_inner(ty: &syn::Type) -> Option<&syn::Type> {
    generic_inner(ty, "Arc")
}

/// Extract `T` from a field type written as `Option<Arc<T>>`.
fn extract_option_arc_inner(ty: &syn::Type) -> Option<&syn::Type> {
    let option_inner = generic_inner(ty, "Option")?;
    extract_arc_inner(option_inner)
}

/// Extract `T` from a field type written as `Vec<Arc<T>>`.
fn extract_vec_arc_inner(ty: &syn::Type) -> Option<&syn::Type> {
    let vec_inner = generic_inner(ty, "Vec")?;
    extract_arc_inner(vec_inner)
}

fn generic_inner<'a>(ty: &'a syn::Type, wrapper: &str) -> Option<&'a syn::Type> {
    let syn::Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        syn::GenericArgument::Type(inner) => Some(inner),
        _ => None,
    })
}

#[proc_macro_derive(Params, attributes(di))]
pub fn derive_params(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_params(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_params(input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let type_name_str = name.to_string();
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input,
            "`#[derive(Params)]` only supports structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input,
            "`#[derive(Params)]` requires named fields",
        ));
    };

    let mut tree_entries = Vec::new();
    let mut build_entries = Vec::new();

    for field in &fields.named {
        let field_ident = field.ident.as_ref().expect("named field");
        let field_name_str = field_ident.to_string();
        let kind = parse_di_attr(&field.attrs)?;
        let ty = &field.ty;

        let (tree_tokens, build_tokens) = if let Some(inner) = extract_vec_arc_inner(ty) {
            if !matches!(kind, FieldKind::Group(_) | FieldKind::Plain) {
                return Err(syn::Error::new_spanned(
                    field,
                    "a `Vec<Arc<T>>` field should carry `#[di(group = \"...\")]`",
                ));
            }
            let group = match kind {
                FieldKind::Group(g) => g,
                _ => String::new(),
            };
            (
                quote! {
                    (#field_name_str, ::injectgraph::reflect::ParamNode::Leaf {
                        key: ::injectgraph::Key::group::<#inner>(#group),
                        optional: false,
                    })
                },
                quote! {
                    #field_ident: engine.require_group::<#inner>(&::injectgraph::Key::group::<#inner>(#group))?
                },
            )
        } else if let Some(inner) = extract_option_arc_inner(ty) {
            let name_tag = match &kind {
                FieldKind::Named(n) => n.clone(),
                FieldKind::Optional | FieldKind::Plain => String::new(),
                FieldKind::Group(_) => {
                    return Err(syn::Error::new_spanned(
                        field,
                        "an `Option<Arc<T>>` field cannot carry `#[di(group = \"...\")]`",
                    ));
                }
            };
            (
                quote! {
                    (#field_name_str, ::injectgraph::reflect::ParamNode::Leaf {
                        key: ::injectgraph::Key::named::<#inner>(#name_tag),
                        optional: true,
                    })
                },
                quote! {
                    #field_ident: engine.require::<#inner>(&::injectgraph::Key::named::<#inner>(#name_tag)).ok()
                },
            )
        } else if let Some(inner) = extract_arc_inner(ty) {
            let (name_tag, optional) = match &kind {
                FieldKind::Named(n) => (n.clone(), false),
                FieldKind::Optional => (String::new(), true),
                FieldKind::Plain => (String::new(), false),
                FieldKind::Group(_) => {
                    return Err(syn::Error::new_spanned(
                        field,
                        "an `Arc<T>` field cannot carry `#[di(group = \"...\")]`; use `Vec<Arc<T>>`",
                    ));
                }
            };
            let build = if optional {
                quote! { engine.require::<#inner>(&::injectgraph::Key::named::<#inner>(#name_tag)).ok() }
            } else {
                quote! { engine.require::<#inner>(&::injectgraph::Key::named::<#inner>(#name_tag))? }
            };
            (
                quote! {
                    (#field_name_str, ::injectgraph::reflect::ParamNode::Leaf {
                        key: ::injectgraph::Key::named::<#inner>(#name_tag),
                        optional: #optional,
                    })
                },
                quote! { #field_ident: #build },
            )
        } else {
            // Nested parameter-object record: delegate to its own `Param` impl.
            (
                quote! { (#field_name_str, <#ty as ::injectgraph::reflect::Param>::demand_tree()) },
                quote! { #field_ident: <#ty as ::injectgraph::reflect::Param>::resolve(engine)? },
            )
        };

        tree_entries.push(tree_tokens);
        build_entries.push(build_tokens);
    }

    Ok(quote! {
        impl ::injectgraph::reflect::Param for #name {
            fn demand_tree() -> ::injectgraph::reflect::ParamNode {
                ::injectgraph::reflect::ParamNode::Record {
                    type_name: #type_name_str,
                    fields: vec![#(#tree_entries),*],
                }
            }

            fn resolve(engine: &mut ::injectgraph::reflect::Engine<'_>) -> ::injectgraph::Result<Self> {
                Ok(#name {
                    #(#build_entries),*
                })
            }
        }

        impl ::injectgraph::reflect::ParamRecord for #name {}
    })
}

#[proc_macro_derive(Results, attributes(di))]
pub fn derive_results(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_results(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_results(input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let type_name_str = name.to_string();
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input,
            "`#[derive(Results)]` only supports structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input,
            "`#[derive(Results)]` requires named fields",
        ));
    };

    let mut tree_entries = Vec::new();
    let mut commit_entries = Vec::new();

    for field in &fields.named {
        let field_ident = field.ident.as_ref().expect("named field");
        let field_name_str = field_ident.to_string();
        let kind = parse_di_attr(&field.attrs)?;
        let ty = &field.ty;

        match kind {
            FieldKind::Optional => {
                return Err(syn::Error::new_spanned(
                    field,
                    "`optional` has no meaning on a result field",
                ));
            }
            FieldKind::Group(group) => {
                tree_entries.push(quote! {
                    (#field_name_str, ::injectgraph::reflect::ResultNode::Leaf {
                        key: ::injectgraph::Key::group::<#ty>(#group),
                    })
                });
                commit_entries.push(quote! {
                    staging.push_group(::injectgraph::Key::group::<#ty>(#group), ::std::sync::Arc::new(self.#field_ident));
                });
            }
            FieldKind::Named(n) => {
                tree_entries.push(quote! {
                    (#field_name_str, ::injectgraph::reflect::ResultNode::Leaf {
                        key: ::injectgraph::Key::named::<#ty>(#n),
                    })
                });
                commit_entries.push(quote! {
                    staging.push_single(::injectgraph::Key::named::<#ty>(#n), ::std::sync::Arc::new(self.#field_ident));
                });
            }
            FieldKind::Plain => {
                tree_entries.push(quote! {
                    (#field_name_str, ::injectgraph::reflect::ResultNode::Leaf {
                        key: ::injectgraph::Key::unnamed::<#ty>(),
                    })
                });
                commit_entries.push(quote! {
                    staging.push_single(::injectgraph::Key::unnamed::<#ty>(), ::std::sync::Arc::new(self.#field_ident));
                });
            }
        }
    }

    Ok(quote! {
        impl ::injectgraph::reflect::ResultRecord for #name {
            fn production_fields() -> Vec<(&'static str, ::injectgraph::reflect::ResultNode)> {
                vec![#(#tree_entries),*]
            }

            fn commit_fields(self, staging: &mut ::injectgraph::reflect::Staging) -> ::injectgraph::Result<()> {
                #(#commit_entries)*
                Ok(())
            }

            fn type_name() -> &'static str {
                #type_name_str
            }
        }
    })
}
