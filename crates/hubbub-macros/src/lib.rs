//! Procedural macros for hubbub.
//!
//! Provides `#[derive(ChannelSet)]`, which turns a struct of named channel
//! fields into something an `EventHub` can be built from.

mod attrs;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, Result};

use attrs::ChannelAttrs;

/// Derive `ChannelSet` for a struct whose named fields are channels.
///
/// Each field becomes a channel named after the field. Field attributes:
///
/// - `#[channel(rename = "name")]` uses a different channel name
/// - `#[channel(skip)]` leaves the field out of the set
///
/// # Example
///
/// ```ignore
/// use hubbub::prelude::*;
///
/// #[derive(ChannelSet)]
/// struct Channels {
///     saved: EventBus<u32>,
///     #[channel(rename = "toast")]
///     toasts: EventStack<String>,
///     #[channel(skip)]
///     debug_only: EventBus,
/// }
/// ```
#[proc_macro_derive(ChannelSet, attributes(channel))]
pub fn derive_channel_set(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// A field that takes part in the set.
struct ChannelField<'a> {
    ident: &'a Ident,
    name: String,
}

fn expand(input: &DeriveInput) -> Result<TokenStream2> {
    let fields = channel_fields(input)?;

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let entries = fields.iter().map(|field| {
        let member = field.ident;
        let name = &field.name;
        quote! {
            (#name, ::hubbub::core::channel::erase(&self.#member))
        }
    });

    Ok(quote! {
        impl #impl_generics ::hubbub::core::channel::ChannelSet
            for #ident #ty_generics #where_clause
        {
            fn channels(
                &self,
            ) -> ::std::vec::Vec<(
                &'static str,
                ::std::boxed::Box<dyn ::hubbub::core::channel::AnyChannel>,
            )> {
                ::std::vec![#(#entries),*]
            }
        }
    })
}

fn channel_fields(input: &DeriveInput) -> Result<Vec<ChannelField<'_>>> {
    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named,
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "`ChannelSet` needs named fields; the field names become channel names",
                ));
            }
        },
        Data::Enum(data) => {
            return Err(syn::Error::new_spanned(
                data.enum_token,
                "`ChannelSet` can only be derived for structs",
            ));
        }
        Data::Union(data) => {
            return Err(syn::Error::new_spanned(
                data.union_token,
                "`ChannelSet` can only be derived for structs",
            ));
        }
    };

    let mut fields: Vec<ChannelField<'_>> = Vec::new();
    for field in &named.named {
        let attrs = ChannelAttrs::from_field(field)?;
        if attrs.skip {
            continue;
        }

        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let name = attrs
            .rename
            .unwrap_or_else(|| ident.to_string().trim_start_matches("r#").to_owned());

        if fields.iter().any(|existing| existing.name == name) {
            return Err(syn::Error::new_spanned(
                field,
                format!("duplicate channel name `{name}`"),
            ));
        }
        fields.push(ChannelField { ident, name });
    }

    Ok(fields)
}
