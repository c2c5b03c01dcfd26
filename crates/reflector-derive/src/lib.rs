// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, LitStr};

/// Options of a `#[reflect(...)]` attribute on a struct field.
#[derive(Default)]
struct FieldOptions {
    rename: Option<String>,
    skip: bool,
    single_value: bool,
    base: bool,
}

/// Parse the type-level `#[reflect(name = "...")]`.
fn type_name(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut name = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("reflect")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                name = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"`"))
            }
        })?;
    }
    Ok(name)
}

fn field_options(attrs: &[Attribute]) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("reflect")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                options.rename = Some(lit.value());
            } else if meta.path.is_ident("skip") {
                options.skip = true;
            } else if meta.path.is_ident("single_value") {
                options.single_value = true;
            } else if meta.path.is_ident("base") {
                options.base = true;
            } else {
                return Err(meta.error(
                    "expected one of `rename = \"...\"`, `skip`, `single_value`, `base`",
                ));
            }
            Ok(())
        })?;
    }
    Ok(options)
}

/// `#[derive(Reflect)]` macro: implements `reflector::Reflect`
///
/// Supports:
/// - Structs with named fields: one declared field per member
/// - Fieldless enums: name table plus text and binary codecs (the enum must
///   also derive `Clone`, `Copy`, `PartialEq` and `Default`)
///
/// Attributes:
/// - `#[reflect(name = "...")]` on the type: registered name (default: the
///   type's identifier)
/// - `#[reflect(rename = "...")]` on a field: declared field name
/// - `#[reflect(skip)]`: leave the member undeclared
/// - `#[reflect(single_value)]`: decode the whole enclosing text value into
///   the field when its key is missing
/// - `#[reflect(base)]`: the member is the base sub-object; its type must
///   implement `Reflect` too
///
/// Field types must be declared in the registry before values are encoded.
///
/// Example:
/// ```ignore
/// use reflector::Reflect;
///
/// #[derive(Reflect, Clone, Default)]
/// #[repr(C)]
/// struct Derived {
///     #[reflect(base)]
///     base: Base,
///     speed: i32,
///     #[reflect(skip)]
///     cache: Vec<u8>,
/// }
/// ```
#[proc_macro_derive(Reflect, attributes(reflect))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(&input.generics, "Generic types are not supported")
            .to_compile_error()
            .into();
    }

    let registered_name = match type_name(&input.attrs) {
        Ok(name) => name.unwrap_or_else(|| input.ident.to_string()),
        Err(err) => return err.to_compile_error().into(),
    };

    let expanded = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => derive_struct(&input, &registered_name, &fields.named),
            _ => Err(syn::Error::new_spanned(
                &input,
                "Only named fields are supported",
            )),
        },
        Data::Enum(data) => derive_enum(&input, &registered_name, data),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &input,
            "Only structs and enums are supported",
        )),
    };

    match expanded {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_struct(
    input: &DeriveInput,
    registered_name: &str,
    fields: &syn::punctuated::Punctuated<syn::Field, syn::token::Comma>,
) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let mut base_decl = None;
    let mut steps = Vec::new();

    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            return Err(syn::Error::new_spanned(field, "Field must have a name"));
        };
        let options = field_options(&field.attrs)?;
        if options.skip {
            continue;
        }

        if options.base {
            if base_decl.is_some() {
                return Err(syn::Error::new_spanned(
                    field,
                    "Only one `#[reflect(base)]` member is allowed",
                ));
            }
            let ty = &field.ty;
            // Declared before the builder borrows the registry.
            base_decl = Some(quote! {
                <#ty as ::reflector::Reflect>::declare(registry);
            });
            steps.push(quote! {
                let builder = builder.base(::reflector::field_of!(#name, #ident));
            });
            continue;
        }

        let field_name = options.rename.unwrap_or_else(|| ident.to_string());
        if options.single_value {
            steps.push(quote! {
                let builder = builder.field_with(
                    #field_name,
                    ::reflector::field_of!(#name, #ident),
                    (::reflector::codec::SingleValue,),
                );
            });
        } else {
            steps.push(quote! {
                let builder = builder.field(#field_name, ::reflector::field_of!(#name, #ident));
            });
        }
    }

    Ok(quote! {
        impl ::reflector::Reflect for #name {
            fn declare(registry: &mut ::reflector::Registry) {
                #base_decl
                let builder = registry.declare::<#name>(#registered_name);
                #(#steps)*
                builder.finish();
            }
        }
    })
}

fn derive_enum(
    input: &DeriveInput,
    registered_name: &str,
    data: &syn::DataEnum,
) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let mut variants = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "Only fieldless enums are supported",
            ));
        }
        let options = field_options(&variant.attrs)?;
        if options.skip || options.base || options.single_value {
            return Err(syn::Error::new_spanned(
                variant,
                "Enum variants only accept `rename`",
            ));
        }
        let ident = &variant.ident;
        let label = options.rename.unwrap_or_else(|| ident.to_string());
        variants.push((ident.clone(), label));
    }

    let to_arms = variants.iter().map(|(ident, _)| {
        quote! { #name::#ident => #name::#ident as i64 }
    });
    let from_arms = variants.iter().map(|(ident, _)| {
        quote! { r if r == #name::#ident as i64 => ::core::option::Option::Some(#name::#ident) }
    });
    let entries = variants.iter().map(|(ident, label)| {
        quote! { (#name::#ident, #label) }
    });

    Ok(quote! {
        impl ::reflector::codec::EnumRepr for #name {
            fn to_repr(self) -> i64 {
                match self {
                    #(#to_arms,)*
                }
            }

            fn from_repr(repr: i64) -> ::core::option::Option<Self> {
                match repr {
                    #(#from_arms,)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl ::reflector::Reflect for #name {
            fn declare(registry: &mut ::reflector::Registry) {
                ::reflector::codec::declare_enum::<#name>(
                    registry,
                    #registered_name,
                    ::reflector::codec::NamedValues::new([#(#entries),*]),
                );
            }
        }
    })
}
