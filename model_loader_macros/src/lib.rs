//! Procedural macros for model_loader
//!
//! This crate provides the `ModelSchema` derive macro, which describes a
//! struct's fields as a `model_loader::schema::Schema`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, LitStr, Type};

/// Derive `model_loader::schema::ModelSchema`.
///
/// Struct attribute: `#[model(table_name = "...", global_id = "...")]`.
/// Field attribute: `#[field(primary_key, unique, nullable, db_type = "...",
/// default = "...", comment = "...")]`. `Option<T>` fields are nullable.
#[proc_macro_derive(ModelSchema, attributes(model, field))]
pub fn derive_model_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct ModelArgs {
    table_name: Option<String>,
    global_id: Option<String>,
}

#[derive(Default)]
struct FieldArgs {
    primary_key: bool,
    unique: bool,
    nullable: bool,
    db_type: Option<String>,
    default: Option<String>,
    comment: Option<String>,
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "ModelSchema only supports structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(name, "ModelSchema only supports structs")),
    };

    let model = parse_model_args(&input.attrs)?;
    let global_id = model.global_id.unwrap_or_else(|| name.to_string());
    let table_name = match model.table_name {
        Some(table) => quote! { ::core::option::Option::Some(#table) },
        None => quote! { ::core::option::Option::None },
    };

    let mut field_tokens = Vec::new();
    for field in fields {
        let Some(ident) = &field.ident else { continue };
        let args = parse_field_args(&field.attrs)?;

        let (field_type, optional) = field_type_name(&field.ty);
        let field_name = ident.to_string();

        let mut builder = quote! {
            ::model_loader::schema::FieldDefinition::new(#field_name, #field_type)
        };
        if args.primary_key {
            builder = quote! { #builder.primary_key() };
        }
        if args.unique {
            builder = quote! { #builder.unique() };
        }
        if args.nullable || optional {
            builder = quote! { #builder.nullable() };
        }
        if let Some(db_type) = args.db_type {
            builder = quote! { #builder.db_type(#db_type) };
        }
        if let Some(default) = args.default {
            builder = quote! { #builder.default_value(#default) };
        }
        if let Some(comment) = args.comment {
            builder = quote! { #builder.comment(#comment) };
        }

        field_tokens.push(builder);
    }

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::model_loader::schema::ModelSchema for #name #ty_generics #where_clause {
            fn table_name() -> ::core::option::Option<&'static str> {
                #table_name
            }

            fn global_id() -> &'static str {
                #global_id
            }

            fn schema() -> ::model_loader::schema::Schema {
                ::model_loader::schema::Schema::from(vec![#(#field_tokens),*])
            }
        }
    })
}

fn parse_model_args(attrs: &[Attribute]) -> syn::Result<ModelArgs> {
    let mut args = ModelArgs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("model")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table_name") {
                args.table_name = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("global_id") {
                args.global_id = Some(meta.value()?.parse::<LitStr>()?.value());
            } else {
                return Err(meta.error("expected `table_name` or `global_id`"));
            }
            Ok(())
        })?;
    }
    Ok(args)
}

fn parse_field_args(attrs: &[Attribute]) -> syn::Result<FieldArgs> {
    let mut args = FieldArgs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("field")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("primary_key") {
                args.primary_key = true;
            } else if meta.path.is_ident("unique") {
                args.unique = true;
            } else if meta.path.is_ident("nullable") {
                args.nullable = true;
            } else if meta.path.is_ident("db_type") {
                args.db_type = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("default") {
                args.default = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("comment") {
                args.comment = Some(meta.value()?.parse::<LitStr>()?.value());
            } else {
                return Err(meta.error("unsupported field attribute"));
            }
            Ok(())
        })?;
    }
    Ok(args)
}

/// Type name without whitespace; `Option<T>` yields `T` and `true`
fn field_type_name(ty: &Type) -> (String, bool) {
    let compact: String = ty
        .to_token_stream()
        .to_string()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    for prefix in ["Option<", "std::option::Option<", "::std::option::Option<"] {
        if let Some(inner) = compact.strip_prefix(prefix).and_then(|rest| rest.strip_suffix('>')) {
            return (inner.to_string(), true);
        }
    }

    (compact, false)
}
