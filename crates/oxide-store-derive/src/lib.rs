//! Derive macro for oxide-store entities.
//!
//! `#[derive(Entity)]` writes the explicit accessor table the binding
//! registry resolves field names against, so no field is ever looked up by
//! name at runtime.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, Ident, Lit, Type};

/// Derives `oxide_store::Entity` for a struct with named fields.
///
/// The struct must also implement `Default`, and every stored field type
/// must implement `Clone`, `ToSqlValue` and `FromSqlValue`.
///
/// # Attributes
///
/// - `#[storage(key = KeyType)]` - The field key type (required)
///
/// # Field Attributes
///
/// - `#[primary_key]` - Marks the primary key, assigned by the caller
/// - `#[primary_key(identity)]` - Marks a primary key generated on insert
/// - `#[storage(name = "Name")]` - Entity-side field name descriptors refer
///   to (defaults to the Rust field name)
/// - `#[storage(text_enum)]` - An `Option<T>` field read by parsing the
///   cell's text with `T::from_str`
/// - `#[storage(skip)]` - Leaves the field out of the accessor table
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Default, Entity)]
/// #[storage(key = ContactField)]
/// struct Contact {
///     #[primary_key(identity)]
///     id: i64,
///     #[storage(name = "FullName")]
///     name: String,
///     #[storage(text_enum)]
///     status: Option<Status>,
///     #[storage(skip)]
///     dirty: bool,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(storage, primary_key))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_entity_impl(&input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

struct FieldInfo {
    ident: Ident,
    name: String,
    primary_key: Option<bool>,
    text_enum: bool,
}

#[derive(Default)]
struct FieldAttrs {
    name: Option<String>,
    primary_key: Option<bool>,
    text_enum: bool,
    skip: bool,
}

fn derive_entity_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let key_type = get_key_type(&input.attrs)?.ok_or_else(|| {
        syn::Error::new_spanned(
            struct_name,
            "Entity derive requires #[storage(key = FieldKeyType)]",
        )
    })?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Entity derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Entity derive only supports structs",
            ));
        }
    };

    let mut infos: Vec<FieldInfo> = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        if attrs.primary_key.is_some() && infos.iter().any(|f| f.primary_key.is_some()) {
            return Err(syn::Error::new_spanned(
                field,
                "only one field can be marked #[primary_key]",
            ));
        }
        infos.push(FieldInfo {
            name: attrs.name.unwrap_or_else(|| ident.to_string()),
            ident,
            primary_key: attrs.primary_key,
            text_enum: attrs.text_enum,
        });
    }

    let accessors: Vec<TokenStream2> = infos.iter().map(accessor_tokens).collect();
    let entity_name = struct_name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::oxide_store::Entity for #struct_name #ty_generics #where_clause {
            type Key = #key_type;

            #[allow(clippy::clone_on_copy, clippy::redundant_clone)]
            fn accessors() -> ::std::vec::Vec<::oxide_store::FieldAccessor<Self>> {
                ::std::vec![#(#accessors),*]
            }

            fn entity_name() -> &'static str {
                #entity_name
            }
        }
    })
}

fn accessor_tokens(info: &FieldInfo) -> TokenStream2 {
    let ident = &info.ident;
    let name = &info.name;

    let read = if info.text_enum {
        quote! { ::oxide_store::parse_text_enum(value)? }
    } else {
        quote! { ::oxide_store::FromSqlValue::from_sql_value(value)? }
    };

    let primary_key = match info.primary_key {
        Some(identity) => quote! { .primary_key(#identity) },
        None => quote! {},
    };

    quote! {
        ::oxide_store::FieldAccessor::new(
            #name,
            |entity: &Self| {
                ::oxide_store::ToSqlValue::to_sql_value(::std::clone::Clone::clone(&entity.#ident))
            },
            |entity: &mut Self, value: ::oxide_store::SqlValue| {
                entity.#ident = #read;
                ::std::result::Result::Ok(())
            },
        )
        #primary_key
    }
}

fn get_key_type(attrs: &[Attribute]) -> syn::Result<Option<Type>> {
    let mut key = None;
    for attr in attrs {
        if attr.path().is_ident("storage") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("key") {
                    key = Some(meta.value()?.parse::<Type>()?);
                    Ok(())
                } else {
                    Err(meta.error("unsupported storage attribute on struct"))
                }
            })?;
        }
    }
    Ok(key)
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if attr.path().is_ident("primary_key") {
            let mut identity = false;
            if !matches!(attr.meta, syn::Meta::Path(_)) {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("identity") {
                        identity = true;
                        Ok(())
                    } else {
                        Err(meta.error("expected `identity`"))
                    }
                })?;
            }
            result.primary_key = Some(identity);
        } else if attr.path().is_ident("storage") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    result.skip = true;
                } else if meta.path.is_ident("text_enum") {
                    result.text_enum = true;
                } else if meta.path.is_ident("name") {
                    let value: Expr = meta.value()?.parse()?;
                    if let Expr::Lit(lit) = &value {
                        if let Lit::Str(s) = &lit.lit {
                            result.name = Some(s.value());
                            return Ok(());
                        }
                    }
                    return Err(syn::Error::new_spanned(value, "expected a string literal"));
                } else {
                    return Err(meta.error("unsupported storage attribute on field"));
                }
                Ok(())
            })?;
        }
    }

    Ok(result)
}
